//! Device: root of the object hierarchy
//!
//! A [`Device`] wraps one native device. Everything created from it (command
//! lists, queues, swapchains) holds a clone of its [`DeviceContext`], which
//! gives children access to the native device, the event registry and the
//! layer configuration without borrowing the device itself.
//!
//! There are two ways to create objects:
//! - the factory methods (`create_resource`, ...) create layer-owned objects.
//!   They fire no events and are tracked until destroyed through the device.
//! - the `on_create_*` call-site hooks stand in for the host's own creation
//!   calls. They fire the matching create event so observers can edit the
//!   description, and hand the object to the host untracked.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use super::desc::{
    Capability, DeviceApi, PipelineDesc, ResourceDesc, ResourceUsage, ResourceViewDesc,
    SamplerDesc, ShaderDesc, SubresourceData, SwapchainDesc,
};
use super::handle::{Pipeline, Resource, ResourceView, Sampler};
use super::object::{delegate_api_object, ApiObject, ApiObjectImpl, NativeObject};
use super::swapchain::{log_swapchain_desc, Swapchain};
use crate::addon::events::{
    CreatePipeline, CreateResource, CreateResourceView, CreateSampler, CreateSwapchain,
    DestroyDevice, InitDevice,
};
use crate::addon::EventRegistry;
use crate::backend::{AdapterInfo, BackendError, BackendResult, NativeDevice, NativeSwapchain};
use crate::config::LayerConfig;

/// Vertex shader of the full-screen copy: one triangle covering the viewport,
/// generated from the vertex index
const COPY_VERTEX_SHADER: &str = "\
void main(uint id : SV_VERTEXID, out float4 position : SV_POSITION, out float2 texcoord : TEXCOORD)
{
    texcoord.x = (id == 2) ? 2.0 : 0.0;
    texcoord.y = (id == 1) ? 2.0 : 0.0;
    position = float4(texcoord * float2(2.0, -2.0) + float2(-1.0, 1.0), 0.0, 1.0);
}
";

/// Pixel shader of the full-screen copy
const COPY_PIXEL_SHADER: &str = "\
Texture2D t0 : register(t0);
SamplerState s0 : register(s0);
float4 main(float4 position : SV_POSITION, float2 texcoord : TEXCOORD) : SV_TARGET
{
    return t0.Sample(s0, texcoord);
}
";

/// Device errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The native device rejected the call
    #[error("Native device call failed: {0}")]
    Backend(#[from] BackendError),

    /// The handle was not created through this device's factory
    #[error("{kind} {handle:#x} is not owned by this device")]
    UnknownHandle {
        /// Object category
        kind: &'static str,
        /// Raw handle value
        handle: u64,
    },
}

/// Categories of wrapped children a device keeps count of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    /// [`crate::api::command::CommandList`]
    CommandList,
    /// [`crate::api::command::CommandQueue`]
    CommandQueue,
    /// [`Swapchain`]
    Swapchain,
}

/// Identity of a device, composed into its API object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    /// Native graphics API
    pub api: DeviceApi,
    /// Adapter identification
    pub adapter: AdapterInfo,
}

#[derive(Default)]
struct LiveChildren {
    command_lists: AtomicUsize,
    command_queues: AtomicUsize,
    swapchains: AtomicUsize,
}

impl LiveChildren {
    fn counter(&self, kind: ChildKind) -> &AtomicUsize {
        match kind {
            ChildKind::CommandList => &self.command_lists,
            ChildKind::CommandQueue => &self.command_queues,
            ChildKind::Swapchain => &self.swapchains,
        }
    }
}

#[derive(Debug, Default)]
struct OwnedObjects {
    resources: HashSet<Resource>,
    views: HashSet<ResourceView>,
    samplers: HashSet<Sampler>,
    pipelines: HashSet<Pipeline>,
}

impl OwnedObjects {
    fn len(&self) -> usize {
        self.resources.len() + self.views.len() + self.samplers.len() + self.pipelines.len()
    }
}

struct DeviceContextInner {
    native: Mutex<Box<dyn NativeDevice>>,
    native_handle: u64,
    api: DeviceApi,
    registry: Arc<EventRegistry>,
    config: LayerConfig,
    copy_pipeline: Pipeline,
    copy_sampler: Sampler,
    children: LiveChildren,
    owned: Mutex<OwnedObjects>,
}

impl Drop for DeviceContextInner {
    fn drop(&mut self) {
        let native = self.native.get_mut().unwrap_or_else(PoisonError::into_inner);
        native.destroy_sampler(self.copy_sampler);
        native.destroy_pipeline(self.copy_pipeline);
        log::debug!("Released device {:#x}", self.native_handle);
    }
}

/// Shared state of a device, cloned into every child object
#[derive(Clone)]
pub struct DeviceContext {
    inner: Arc<DeviceContextInner>,
}

impl DeviceContext {
    /// Registry every object of this device fires events into
    pub fn registry(&self) -> &Arc<EventRegistry> {
        &self.inner.registry
    }

    /// Layer configuration the device was created with
    pub fn config(&self) -> &LayerConfig {
        &self.inner.config
    }

    /// Native graphics API
    pub fn api(&self) -> DeviceApi {
        self.inner.api
    }

    /// Run `f` with exclusive access to the native device
    pub fn with_native<R>(&self, f: impl FnOnce(&mut dyn NativeDevice) -> R) -> R {
        let mut native = self.inner.native.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **native)
    }

    /// Pipeline of the full-screen copy draw
    pub fn copy_pipeline(&self) -> Pipeline {
        self.inner.copy_pipeline
    }

    /// Sampler of the full-screen copy draw
    pub fn copy_sampler(&self) -> Sampler {
        self.inner.copy_sampler
    }

    /// Number of live wrapped children of one category
    pub fn live_children(&self, kind: ChildKind) -> usize {
        self.inner.children.counter(kind).load(Ordering::Acquire)
    }

    /// Whether two contexts belong to the same device
    pub fn same_device(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn child_created(&self, kind: ChildKind) {
        self.inner.children.counter(kind).fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn child_destroyed(&self, kind: ChildKind) {
        self.inner.children.counter(kind).fetch_sub(1, Ordering::AcqRel);
    }

    fn owned(&self) -> std::sync::MutexGuard<'_, OwnedObjects> {
        self.inner.owned.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NativeObject for DeviceContext {
    fn native_handle(&self) -> u64 {
        self.inner.native_handle
    }
}

impl std::fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceContext")
            .field("api", &self.inner.api)
            .field("native", &format_args!("{:#x}", self.inner.native_handle))
            .finish_non_exhaustive()
    }
}

/// Texture created by the layer for its own use, destroyed on drop
#[derive(Debug)]
pub struct OwnedResource {
    context: DeviceContext,
    handle: Resource,
}

impl OwnedResource {
    /// Create a resource through the native device
    pub fn create(
        context: &DeviceContext,
        desc: &ResourceDesc,
        initial_state: ResourceUsage,
    ) -> BackendResult<Self> {
        let handle = context.with_native(|native| native.create_resource(desc, None, initial_state))?;
        Ok(Self {
            context: context.clone(),
            handle,
        })
    }

    /// Native handle
    pub fn handle(&self) -> Resource {
        self.handle
    }
}

impl Drop for OwnedResource {
    fn drop(&mut self) {
        let handle = self.handle;
        self.context.with_native(|native| native.destroy_resource(handle));
    }
}

/// Resource view created by the layer for its own use, destroyed on drop
#[derive(Debug)]
pub struct OwnedResourceView {
    context: DeviceContext,
    handle: ResourceView,
}

impl OwnedResourceView {
    /// Create a view through the native device
    pub fn create(
        context: &DeviceContext,
        resource: Resource,
        desc: &ResourceViewDesc,
    ) -> BackendResult<Self> {
        let handle = context.with_native(|native| native.create_resource_view(resource, desc))?;
        Ok(Self {
            context: context.clone(),
            handle,
        })
    }

    /// Native handle
    pub fn handle(&self) -> ResourceView {
        self.handle
    }
}

impl Drop for OwnedResourceView {
    fn drop(&mut self) {
        let handle = self.handle;
        self.context.with_native(|native| native.destroy_resource_view(handle));
    }
}

/// Wrapped native device
pub struct Device {
    object: ApiObjectImpl<DeviceContext, DeviceProperties>,
}

delegate_api_object!(Device, object);

impl Device {
    /// Wrap a native device, firing events into the process-wide registry
    pub fn new(native: Box<dyn NativeDevice>, config: LayerConfig) -> Result<Self, DeviceError> {
        Self::with_registry(native, config, crate::addon::registry())
    }

    /// Wrap a native device, firing events into `registry`
    ///
    /// Creates the copy pipeline and sampler the MSAA copy-back draw needs,
    /// then fires [`InitDevice`].
    pub fn with_registry(
        mut native: Box<dyn NativeDevice>,
        config: LayerConfig,
        registry: Arc<EventRegistry>,
    ) -> Result<Self, DeviceError> {
        let api = native.api();
        let adapter = native.adapter_info();
        let native_handle = native.native_handle();

        let copy_pipeline = native.create_pipeline(&PipelineDesc::fullscreen_triangle(
            ShaderDesc::new(COPY_VERTEX_SHADER, "main"),
            ShaderDesc::new(COPY_PIXEL_SHADER, "main"),
        ))?;
        let copy_sampler = match native.create_sampler(&SamplerDesc::clamped(config.copy_filter.filter_mode())) {
            Ok(sampler) => sampler,
            Err(error) => {
                native.destroy_pipeline(copy_pipeline);
                return Err(error.into());
            }
        };

        log::info!(
            "Running on {} (vendor {:#x}, device {:#x}, {:?})",
            adapter.description,
            adapter.vendor_id,
            adapter.device_id,
            api
        );

        let context = DeviceContext {
            inner: Arc::new(DeviceContextInner {
                native: Mutex::new(native),
                native_handle,
                api,
                registry,
                config,
                copy_pipeline,
                copy_sampler,
                children: LiveChildren::default(),
                owned: Mutex::new(OwnedObjects::default()),
            }),
        };

        let device = Self {
            object: ApiObjectImpl::new(context, DeviceProperties { api, adapter }),
        };
        device.registry().invoke::<InitDevice>(|callback| callback(&device));

        Ok(device)
    }

    /// Shared state handed to child objects
    pub fn context(&self) -> &DeviceContext {
        self.object.orig()
    }

    /// Event registry of this device
    pub fn registry(&self) -> &Arc<EventRegistry> {
        self.context().registry()
    }

    /// Layer configuration
    pub fn config(&self) -> &LayerConfig {
        self.context().config()
    }

    /// Native graphics API
    pub fn api(&self) -> DeviceApi {
        self.object.capabilities().api
    }

    /// Adapter identification and API
    pub fn properties(&self) -> &DeviceProperties {
        self.object.capabilities()
    }

    /// Whether an optional feature is available
    pub fn check_capability(&self, capability: Capability) -> bool {
        self.context().with_native(|native| native.check_capability(capability))
    }

    /// Description of a live resource
    pub fn resource_desc(&self, resource: Resource) -> Option<ResourceDesc> {
        self.context().with_native(|native| native.resource_desc(resource))
    }

    /// Number of live wrapped children of one category
    pub fn live_children(&self, kind: ChildKind) -> usize {
        self.context().live_children(kind)
    }

    /// Number of factory-created objects not yet destroyed
    pub fn owned_object_count(&self) -> usize {
        self.context().owned().len()
    }

    /// Create a layer-owned resource
    pub fn create_resource(
        &self,
        desc: &ResourceDesc,
        initial_data: Option<&SubresourceData>,
        initial_state: ResourceUsage,
    ) -> Result<Resource, DeviceError> {
        let resource = self
            .context()
            .with_native(|native| native.create_resource(desc, initial_data, initial_state))?;
        self.context().owned().resources.insert(resource);
        Ok(resource)
    }

    /// Destroy a resource created by [`Device::create_resource`]
    pub fn destroy_resource(&self, resource: Resource) -> Result<(), DeviceError> {
        if !self.context().owned().resources.remove(&resource) {
            return Err(DeviceError::UnknownHandle { kind: "resource", handle: resource.handle });
        }
        self.context().with_native(|native| native.destroy_resource(resource));
        Ok(())
    }

    /// Create a layer-owned resource view
    pub fn create_resource_view(
        &self,
        resource: Resource,
        desc: &ResourceViewDesc,
    ) -> Result<ResourceView, DeviceError> {
        let view = self
            .context()
            .with_native(|native| native.create_resource_view(resource, desc))?;
        self.context().owned().views.insert(view);
        Ok(view)
    }

    /// Destroy a view created by [`Device::create_resource_view`]
    pub fn destroy_resource_view(&self, view: ResourceView) -> Result<(), DeviceError> {
        if !self.context().owned().views.remove(&view) {
            return Err(DeviceError::UnknownHandle { kind: "resource view", handle: view.handle });
        }
        self.context().with_native(|native| native.destroy_resource_view(view));
        Ok(())
    }

    /// Create a layer-owned sampler
    pub fn create_sampler(&self, desc: &SamplerDesc) -> Result<Sampler, DeviceError> {
        let sampler = self.context().with_native(|native| native.create_sampler(desc))?;
        self.context().owned().samplers.insert(sampler);
        Ok(sampler)
    }

    /// Destroy a sampler created by [`Device::create_sampler`]
    pub fn destroy_sampler(&self, sampler: Sampler) -> Result<(), DeviceError> {
        if !self.context().owned().samplers.remove(&sampler) {
            return Err(DeviceError::UnknownHandle { kind: "sampler", handle: sampler.handle });
        }
        self.context().with_native(|native| native.destroy_sampler(sampler));
        Ok(())
    }

    /// Create a layer-owned pipeline
    pub fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Pipeline, DeviceError> {
        let pipeline = self.context().with_native(|native| native.create_pipeline(desc))?;
        self.context().owned().pipelines.insert(pipeline);
        Ok(pipeline)
    }

    /// Destroy a pipeline created by [`Device::create_pipeline`]
    pub fn destroy_pipeline(&self, pipeline: Pipeline) -> Result<(), DeviceError> {
        if !self.context().owned().pipelines.remove(&pipeline) {
            return Err(DeviceError::UnknownHandle { kind: "pipeline", handle: pipeline.handle });
        }
        self.context().with_native(|native| native.destroy_pipeline(pipeline));
        Ok(())
    }

    /// Host resource creation call site
    ///
    /// Fires [`CreateResource`]. If an observer returns `true` its edited
    /// description is created, otherwise `desc` is created unchanged. The
    /// resource belongs to the host.
    pub fn on_create_resource(
        &self,
        desc: &ResourceDesc,
        initial_data: Option<&SubresourceData>,
        initial_state: ResourceUsage,
    ) -> Result<Resource, DeviceError> {
        let mut edited = *desc;
        let desc = if self
            .registry()
            .invoke_intercept::<CreateResource>(|callback| callback(self, &mut edited, initial_state))
        {
            &edited
        } else {
            desc
        };

        self.context()
            .with_native(|native| native.create_resource(desc, initial_data, initial_state))
            .map_err(|error| {
                log::warn!("Resource creation failed: {}", error);
                DeviceError::from(error)
            })
    }

    /// Host resource view creation call site, see [`Device::on_create_resource`]
    pub fn on_create_resource_view(
        &self,
        resource: Resource,
        desc: &ResourceViewDesc,
    ) -> Result<ResourceView, DeviceError> {
        let mut edited = *desc;
        let desc = if self
            .registry()
            .invoke_intercept::<CreateResourceView>(|callback| callback(self, resource, &mut edited))
        {
            &edited
        } else {
            desc
        };

        self.context()
            .with_native(|native| native.create_resource_view(resource, desc))
            .map_err(|error| {
                log::warn!("Resource view creation failed: {}", error);
                DeviceError::from(error)
            })
    }

    /// Host sampler creation call site, see [`Device::on_create_resource`]
    pub fn on_create_sampler(&self, desc: &SamplerDesc) -> Result<Sampler, DeviceError> {
        let mut edited = *desc;
        let desc = if self
            .registry()
            .invoke_intercept::<CreateSampler>(|callback| callback(self, &mut edited))
        {
            &edited
        } else {
            desc
        };

        self.context()
            .with_native(|native| native.create_sampler(desc))
            .map_err(|error| {
                log::warn!("Sampler creation failed: {}", error);
                DeviceError::from(error)
            })
    }

    /// Host pipeline creation call site, see [`Device::on_create_resource`]
    pub fn on_create_pipeline(&self, desc: &PipelineDesc) -> Result<Pipeline, DeviceError> {
        let mut edited = desc.clone();
        let desc = if self
            .registry()
            .invoke_intercept::<CreatePipeline>(|callback| callback(self, &mut edited))
        {
            &edited
        } else {
            desc
        };

        self.context()
            .with_native(|native| native.create_pipeline(desc))
            .map_err(|error| {
                log::warn!("Pipeline creation failed: {}", error);
                DeviceError::from(error)
            })
    }

    /// Host resource destruction call site
    pub fn on_destroy_resource(&self, resource: Resource) {
        self.context().with_native(|native| native.destroy_resource(resource));
    }

    /// Host resource view destruction call site
    pub fn on_destroy_resource_view(&self, view: ResourceView) {
        self.context().with_native(|native| native.destroy_resource_view(view));
    }

    /// Host sampler destruction call site
    pub fn on_destroy_sampler(&self, sampler: Sampler) {
        self.context().with_native(|native| native.destroy_sampler(sampler));
    }

    /// Host pipeline destruction call site
    pub fn on_destroy_pipeline(&self, pipeline: Pipeline) {
        self.context().with_native(|native| native.destroy_pipeline(pipeline));
    }

    /// Host swapchain creation call site
    ///
    /// Fires [`CreateSwapchain`] on a copy of `desc`; if an observer returns
    /// `true` the edited copy is what `create_native` receives. The new
    /// swapchain is initialized right away. An initialization failure is
    /// logged and the swapchain is returned uninitialized, so the host keeps
    /// running without effects.
    pub fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        create_native: impl FnOnce(&SwapchainDesc) -> BackendResult<Box<dyn NativeSwapchain>>,
    ) -> Result<Swapchain, DeviceError> {
        let mut edited = *desc;
        let desc = if self
            .registry()
            .invoke_intercept::<CreateSwapchain>(|callback| callback(&mut edited))
        {
            &edited
        } else {
            desc
        };

        if self.config().dump_swapchain_desc {
            log_swapchain_desc(desc);
        }

        let native = create_native(desc).map_err(|error| {
            log::warn!("Swapchain creation failed: {}", error);
            DeviceError::from(error)
        })?;

        let mut swapchain = Swapchain::new(self, native);
        if let Err(error) = swapchain.on_init(desc.window) {
            log::error!(
                "Failed to initialize effect runtime environment on swapchain {:#x}: {}",
                swapchain.get_native_object(),
                error
            );
        }

        Ok(swapchain)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let registry = Arc::clone(self.registry());
        let this: &Self = self;
        registry.invoke::<DestroyDevice>(|callback| callback(this));

        let context = self.context().clone();
        let leftovers = std::mem::take(&mut *context.owned());
        if leftovers.len() != 0 {
            log::warn!(
                "Device destroyed with {} layer-owned objects still alive, releasing them",
                leftovers.len()
            );
            context.with_native(|native| {
                leftovers.views.iter().for_each(|view| native.destroy_resource_view(*view));
                leftovers.resources.iter().for_each(|resource| native.destroy_resource(*resource));
                leftovers.pipelines.iter().for_each(|pipeline| native.destroy_pipeline(*pipeline));
                leftovers.samplers.iter().for_each(|sampler| native.destroy_sampler(*sampler));
            });
        }

        let lists = context.live_children(ChildKind::CommandList);
        let queues = context.live_children(ChildKind::CommandQueue);
        let swapchains = context.live_children(ChildKind::Swapchain);
        if lists + queues + swapchains > 0 {
            log::error!(
                "Device {:#x} destroyed while children are alive ({} command lists, {} command queues, {} swapchains)",
                context.native_handle(),
                lists,
                queues,
                swapchains
            );
        }
        debug_assert!(
            lists + queues + swapchains == 0,
            "device destroyed while children are alive"
        );
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("context", self.context())
            .field("properties", self.properties())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::desc::{MemoryHeap, ResourceViewType};
    use crate::api::format::Format;
    use crate::api::object::ApiObject;
    use crate::api::handle::Guid;
    use crate::backend::null::{NullDriver, NullOp};
    use std::sync::atomic::AtomicBool;

    fn device(driver: &NullDriver, registry: &Arc<EventRegistry>) -> Device {
        Device::with_registry(driver.create_device(), LayerConfig::default(), Arc::clone(registry)).unwrap()
    }

    #[test]
    fn test_device_creates_copy_objects() {
        let driver = NullDriver::new();
        let registry = Arc::new(EventRegistry::new());
        let device = device(&driver, &registry);

        assert_eq!(driver.live_pipelines(), 1);
        assert_eq!(driver.live_samplers(), 1);
        assert!(!device.context().copy_pipeline().is_null());

        drop(device);
        assert_eq!(driver.live_pipelines(), 0);
        assert_eq!(driver.live_samplers(), 0);
    }

    #[test]
    fn test_init_and_destroy_device_events() {
        let driver = NullDriver::new();
        let registry = Arc::new(EventRegistry::new());
        let initialized = Arc::new(AtomicBool::new(false));
        let destroyed = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&initialized);
        registry.register::<InitDevice>(Arc::new(move |device: &Device| {
            assert_eq!(device.api(), DeviceApi::D3D10);
            flag.store(true, Ordering::SeqCst);
        }));
        let flag = Arc::clone(&destroyed);
        registry.register::<DestroyDevice>(Arc::new(move |_device: &Device| {
            flag.store(true, Ordering::SeqCst);
        }));

        let device = device(&driver, &registry);
        assert!(initialized.load(Ordering::SeqCst));
        assert!(!destroyed.load(Ordering::SeqCst));
        drop(device);
        assert!(destroyed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_factory_objects_are_tracked() {
        let driver = NullDriver::new();
        let registry = Arc::new(EventRegistry::new());
        let device = device(&driver, &registry);

        let desc = ResourceDesc::texture_2d(8, 8, Format::R8G8B8A8Unorm, 1, ResourceUsage::SHADER_RESOURCE);
        let texture = device.create_resource(&desc, None, ResourceUsage::SHADER_RESOURCE).unwrap();
        let view = device
            .create_resource_view(texture, &ResourceViewDesc::texture_2d(Format::R8G8B8A8Unorm, false))
            .unwrap();
        assert_eq!(device.owned_object_count(), 2);
        assert_eq!(device.resource_desc(texture), Some(desc));

        device.destroy_resource_view(view).unwrap();
        device.destroy_resource(texture).unwrap();
        assert_eq!(device.owned_object_count(), 0);
        assert_eq!(
            device.destroy_resource(texture),
            Err(DeviceError::UnknownHandle { kind: "resource", handle: texture.handle })
        );
    }

    #[test]
    fn test_leftover_factory_objects_are_released() {
        let driver = NullDriver::new();
        let registry = Arc::new(EventRegistry::new());
        let device = device(&driver, &registry);

        device.create_resource(&ResourceDesc::buffer(256, ResourceUsage::VERTEX_BUFFER), None, ResourceUsage::VERTEX_BUFFER).unwrap();
        device.create_sampler(&SamplerDesc::clamped(crate::api::desc::FilterMode::Anisotropic)).unwrap();
        assert_eq!(driver.live_resources(), 1);

        drop(device);
        assert_eq!(driver.live_resources(), 0);
        assert_eq!(driver.live_samplers(), 0);
    }

    #[test]
    fn test_factory_failure_is_reported() {
        let driver = NullDriver::new();
        let registry = Arc::new(EventRegistry::new());
        let device = device(&driver, &registry);

        driver.fail_next(NullOp::CreateResource);
        let result = device.create_resource(&ResourceDesc::buffer(16, ResourceUsage::INDEX_BUFFER), None, ResourceUsage::INDEX_BUFFER);
        assert_eq!(result, Err(DeviceError::Backend(BackendError::OutOfMemory)));
        assert_eq!(device.owned_object_count(), 0);
    }

    #[test]
    fn test_create_resource_override_changes_driver_input() {
        let driver = NullDriver::new();
        let registry = Arc::new(EventRegistry::new());
        registry.register::<CreateResource>(Arc::new(
            |_device: &Device, desc: &mut ResourceDesc, _state: ResourceUsage| {
                desc.format = Format::R16G16B16A16Float;
                desc.heap = MemoryHeap::GpuOnly;
                true
            },
        ));
        let device = device(&driver, &registry);

        let desc = ResourceDesc::texture_2d(32, 32, Format::R8G8B8A8Unorm, 1, ResourceUsage::RENDER_TARGET);
        let texture = device.on_create_resource(&desc, None, ResourceUsage::RENDER_TARGET).unwrap();

        assert_eq!(driver.resource_desc(texture).map(|d| d.format), Some(Format::R16G16B16A16Float));
        // Host objects are not tracked by the device
        assert_eq!(device.owned_object_count(), 0);
        device.on_destroy_resource(texture);
    }

    #[test]
    fn test_create_edits_without_override_are_discarded() {
        let driver = NullDriver::new();
        let registry = Arc::new(EventRegistry::new());
        registry.register::<CreateResourceView>(Arc::new(
            |_device: &Device, _resource: Resource, desc: &mut ResourceViewDesc| {
                desc.ty = ResourceViewType::TextureCube;
                false
            },
        ));
        let device = device(&driver, &registry);

        let desc = ResourceDesc::texture_2d(4, 4, Format::R8G8B8A8Unorm, 1, ResourceUsage::SHADER_RESOURCE);
        let texture = device.on_create_resource(&desc, None, ResourceUsage::SHADER_RESOURCE).unwrap();
        let view_desc = ResourceViewDesc::texture_2d(Format::R8G8B8A8Unorm, false);
        let view = device.on_create_resource_view(texture, &view_desc).unwrap();

        assert_eq!(driver.view_desc(view), Some(view_desc));
        device.on_destroy_resource_view(view);
        device.on_destroy_resource(texture);
    }

    #[test]
    fn test_user_data_on_device() {
        let driver = NullDriver::new();
        let registry = Arc::new(EventRegistry::new());
        let device = device(&driver, &registry);
        let key = Guid(42);

        device.set_user_data(key, Some(Arc::new(7_u32)));
        assert_eq!(device.get_user_data_as::<u32>(&key).as_deref(), Some(&7));
        assert!(device.take_user_data(&key).is_some());
        assert_ne!(device.get_native_object(), 0);
    }

    #[test]
    fn test_observer_attaches_and_detaches_device_data() {
        const KEY: Guid = Guid(0xdef1ce);

        let driver = NullDriver::new();
        let registry = Arc::new(EventRegistry::new());
        let detached = Arc::new(AtomicBool::new(false));

        registry.register::<InitDevice>(Arc::new(|device: &Device| {
            device.set_user_data(KEY, Some(Arc::new(String::from("device state"))));
        }));
        let flag = Arc::clone(&detached);
        registry.register::<DestroyDevice>(Arc::new(move |device: &Device| {
            let data = device.take_user_data(&KEY);
            flag.store(data.is_some(), Ordering::SeqCst);
        }));

        let device = device(&driver, &registry);
        assert_eq!(
            device.get_user_data_as::<String>(&KEY).as_deref().map(String::as_str),
            Some("device state")
        );
        drop(device);
        assert!(detached.load(Ordering::SeqCst));
    }
}
