//! Swapchain wrapper and the present protocol
//!
//! A [`Swapchain`] owns exactly one [`EffectRuntime`]. When the host's back
//! buffer is multisampled the layer cannot sample it directly, so it keeps a
//! single-sample resolved copy: each present resolves into that copy, lets
//! the runtime render onto it, then draws it back into the multisampled
//! buffer with a full-screen triangle. The host's pipeline state is captured
//! before and restored after.

use std::sync::Arc;

use thiserror::Error;

use super::command::CommandQueue;
use super::desc::{PrimitiveTopology, ResourceDesc, ResourceUsage, ResourceViewDesc, SwapchainDesc, Viewport};
use super::device::{ChildKind, Device, DeviceContext, OwnedResource, OwnedResourceView};
use super::format::{format_to_default_typed, Format, SrgbVariant};
use super::handle::{Resource, ResourceView, WindowHandle};
use super::object::{delegate_api_object, ApiObject, ApiObjectImpl};
use super::state::StateBlock;
use crate::addon::events::{DestroySwapchain, InitSwapchain, Resize};
use crate::addon::EventRegistry;
use crate::backend::{BackendError, BackendResult, NativeSwapchain};
use crate::runtime::{EffectRuntime, RuntimeError};

/// Swapchain initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapchainError {
    /// The swapchain has no multisampled back buffer
    #[error("Swapchain back buffer is not multisampled")]
    NotMultisampled,

    /// The native swapchain did not report its description
    #[error("Failed to query swapchain description")]
    DescriptionUnavailable(#[source] BackendError),

    /// The native swapchain has no back buffer at this index
    #[error("Failed to retrieve back buffer {0}")]
    BackBufferUnavailable(u32),

    /// Creating the single-sample resolve texture failed
    #[error("Failed to create resolve texture")]
    ResolveTexture(#[source] BackendError),

    /// Creating the render target view on the back buffer failed
    #[error("Failed to create back buffer render target view")]
    RenderTargetView(#[source] BackendError),

    /// Creating the shader resource view on the resolve texture failed
    #[error("Failed to create resolve texture shader resource view")]
    ShaderResourceView(#[source] BackendError),

    /// Recreating the native back buffers failed
    #[error("Failed to resize swapchain buffers")]
    ResizeBuffers(#[source] BackendError),

    /// The effect runtime refused to initialize
    #[error("Effect runtime initialization failed: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Layer-owned objects of a multisampled swapchain
#[derive(Debug)]
///
/// Fields drop in declaration order: views go before the texture they view.
struct MultisampleTargets {
    render_target: OwnedResourceView,
    shader_resource: OwnedResourceView,
    resolved: OwnedResource,
}

impl MultisampleTargets {
    fn create(context: &DeviceContext, back_buffer: Resource, desc: &SwapchainDesc) -> Result<Self, SwapchainError> {
        let resolved = OwnedResource::create(
            context,
            &ResourceDesc::texture_2d(
                desc.width,
                desc.height,
                desc.format,
                1,
                ResourceUsage::RENDER_TARGET | ResourceUsage::SHADER_RESOURCE,
            ),
            ResourceUsage::SHADER_RESOURCE,
        )
        .map_err(SwapchainError::ResolveTexture)?;

        let render_target = OwnedResourceView::create(
            context,
            back_buffer,
            &ResourceViewDesc::texture_2d(desc.format, true),
        )
        .map_err(SwapchainError::RenderTargetView)?;

        let shader_resource = OwnedResourceView::create(
            context,
            resolved.handle(),
            &ResourceViewDesc::texture_2d(desc.format, false),
        )
        .map_err(SwapchainError::ShaderResourceView)?;

        Ok(Self {
            resolved,
            render_target,
            shader_resource,
        })
    }
}

/// Wrapped native swapchain
pub struct Swapchain {
    object: ApiObjectImpl<Box<dyn NativeSwapchain>, DeviceContext>,
    runtime: EffectRuntime,
    back_buffer: Resource,
    msaa: Option<MultisampleTargets>,
    width: u32,
    height: u32,
    format: Format,
    initialized: bool,
    app_state: StateBlock,
}

delegate_api_object!(Swapchain, object);

impl Swapchain {
    /// Wrap a native swapchain created by the host on `device`
    ///
    /// The swapchain starts uninitialized; call [`Swapchain::on_init`].
    pub fn new(device: &Device, native: Box<dyn NativeSwapchain>) -> Self {
        let context = device.context().clone();
        let runtime = EffectRuntime::new(Arc::clone(context.registry()), context.config().effects_enabled);

        context.child_created(ChildKind::Swapchain);
        Self {
            object: ApiObjectImpl::new(native, context),
            runtime,
            back_buffer: Resource::NULL,
            msaa: None,
            width: 0,
            height: 0,
            format: Format::Unknown,
            initialized: false,
            app_state: StateBlock::new(),
        }
    }

    /// Context of the owning device
    pub fn context(&self) -> &DeviceContext {
        self.object.capabilities()
    }

    fn registry(&self) -> Arc<EventRegistry> {
        Arc::clone(self.context().registry())
    }

    /// Set up the back buffer references and the effect runtime
    ///
    /// Fires [`InitSwapchain`] once the back buffer is known. On failure
    /// everything created so far is released, [`DestroySwapchain`] balances
    /// the init event, and the swapchain stays uninitialized.
    pub fn on_init(&mut self, window: WindowHandle) -> Result<(), SwapchainError> {
        if self.initialized {
            log::warn!("Swapchain {:#x} initialized twice, resetting first", self.get_native_object());
            self.on_reset();
        }

        let desc = self.object.orig().desc().map_err(|error| {
            log::error!("Failed to get swapchain description: {}", error);
            SwapchainError::DescriptionUnavailable(error)
        })?;
        let back_buffer = self.object.orig().back_buffer(0).ok_or_else(|| {
            log::error!("Failed to get swapchain back buffer");
            SwapchainError::BackBufferUnavailable(0)
        })?;

        self.back_buffer = back_buffer;
        self.width = desc.width;
        self.height = desc.height;
        self.format = desc.format;

        let registry = self.registry();
        let this: &Self = self;
        registry.invoke::<InitSwapchain>(|callback| callback(this));

        if desc.is_multisampled() {
            match MultisampleTargets::create(self.context(), back_buffer, &desc) {
                Ok(targets) => self.msaa = Some(targets),
                Err(error) => {
                    log::error!("Swapchain initialization failed: {:?}", error);
                    self.abort_init();
                    return Err(error);
                }
            }
        }

        if let Err(error) = self.runtime.on_init(window, self.width, self.height, self.format) {
            log::error!("Failed to initialize effect runtime: {}", error);
            self.abort_init();
            return Err(error.into());
        }

        self.initialized = true;
        log::debug!(
            "Initialized swapchain {:#x} ({}x{} {:?}, {} samples)",
            self.get_native_object(),
            self.width,
            self.height,
            self.format,
            desc.sample_count
        );
        Ok(())
    }

    fn abort_init(&mut self) {
        let registry = self.registry();
        let this: &Self = self;
        registry.invoke::<DestroySwapchain>(|callback| callback(this));
        self.release();
    }

    fn release(&mut self) {
        self.msaa = None;
        self.back_buffer = Resource::NULL;
        self.width = 0;
        self.height = 0;
        self.format = Format::Unknown;
    }

    /// Tear down the effect runtime and release layer-owned references
    ///
    /// Fires [`DestroySwapchain`] after the runtime was reset.
    pub fn on_reset(&mut self) {
        if !self.initialized {
            log::trace!("Reset of uninitialized swapchain {:#x} ignored", self.get_native_object());
            return;
        }

        self.runtime.on_reset();

        let registry = self.registry();
        let this: &Self = self;
        registry.invoke::<DestroySwapchain>(|callback| callback(this));

        self.release();
        self.initialized = false;
    }

    /// Run the present protocol on `queue`'s immediate command list
    ///
    /// No-op while uninitialized.
    pub fn on_present(&mut self, queue: &mut CommandQueue) {
        if !self.initialized {
            return;
        }
        let Some(command_list) = queue.immediate_command_list_mut() else {
            log::warn!("Queue has no immediate command list, skipping effects");
            return;
        };

        self.app_state.capture(command_list.native());

        if let Some(msaa) = &self.msaa {
            command_list.native_mut().resolve_resource(
                self.back_buffer,
                msaa.resolved.handle(),
                format_to_default_typed(self.format, SrgbVariant::Keep),
            );
        }

        self.runtime.on_present(command_list);

        if let Some(msaa) = &self.msaa {
            let context = self.object.capabilities();
            let native = command_list.native_mut();
            native.bind_pipeline(context.copy_pipeline());
            native.bind_primitive_topology(PrimitiveTopology::TriangleList);
            native.bind_vertex_buffers(0, &[Resource::NULL]);
            native.bind_samplers(0, &[context.copy_sampler()]);
            native.bind_shader_resource_views(0, &[msaa.shader_resource.handle()]);
            native.bind_viewports(&[Viewport::full(self.width, self.height)]);
            native.bind_render_targets(&[msaa.render_target.handle()], ResourceView::NULL);
            native.draw(3, 1, 0, 0);
        }

        self.app_state.apply_and_release(command_list.native_mut());
    }

    /// Notify observers of a resize and reset
    ///
    /// The host recreates its buffers afterwards and calls
    /// [`Swapchain::on_init`] again.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        let registry = self.registry();
        let this: &Self = self;
        registry.invoke::<Resize>(|callback| callback(this, width, height));
        self.on_reset();
    }

    /// Resize the native back buffers and reinitialize
    pub fn resize_buffers(&mut self, width: u32, height: u32, window: WindowHandle) -> Result<(), SwapchainError> {
        self.on_resize(width, height);
        self.object
            .orig_mut()
            .resize_buffers(width, height)
            .map_err(SwapchainError::ResizeBuffers)?;
        self.on_init(window)
    }

    pub(crate) fn present_native(&mut self) -> BackendResult<()> {
        self.object.orig_mut().present()
    }

    /// Back buffer at `index`
    pub fn back_buffer(&self, index: u32) -> Option<Resource> {
        if index >= self.back_buffer_count() {
            return None;
        }
        if index == 0 && !self.back_buffer.is_null() {
            return Some(self.back_buffer);
        }
        self.object.orig().back_buffer(index)
    }

    /// Single-sample back buffer at `index`
    ///
    /// The layer-owned resolve texture when multisampling, otherwise the
    /// back buffer itself.
    pub fn back_buffer_resolved(&self, index: u32) -> Option<Resource> {
        match &self.msaa {
            Some(msaa) if index < self.back_buffer_count() => Some(msaa.resolved.handle()),
            Some(_) => None,
            None => self.back_buffer(index),
        }
    }

    /// Render target view on the multisampled back buffer and shader
    /// resource view on the resolve texture
    pub fn multisample_views(&self) -> Result<(ResourceView, ResourceView), SwapchainError> {
        self.msaa
            .as_ref()
            .map(|msaa| (msaa.render_target.handle(), msaa.shader_resource.handle()))
            .ok_or(SwapchainError::NotMultisampled)
    }

    /// Number of back buffers
    pub fn back_buffer_count(&self) -> u32 {
        self.object.orig().back_buffer_count()
    }

    /// Index of the back buffer rendered this frame
    pub fn current_back_buffer_index(&self) -> u32 {
        self.object.orig().current_back_buffer_index()
    }

    /// Back buffer width recorded at init
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Back buffer height recorded at init
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Back buffer format recorded at init
    pub fn format(&self) -> Format {
        self.format
    }

    /// Whether `on_init` succeeded and no reset happened since
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether the layer resolves a multisampled back buffer
    pub fn is_multisampled(&self) -> bool {
        self.msaa.is_some()
    }

    /// The swapchain's effect runtime
    pub fn runtime(&self) -> &EffectRuntime {
        &self.runtime
    }

    /// The swapchain's effect runtime, mutably
    pub fn runtime_mut(&mut self) -> &mut EffectRuntime {
        &mut self.runtime
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.on_reset();
        self.context().child_destroyed(ChildKind::Swapchain);
    }
}

impl std::fmt::Debug for Swapchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swapchain")
            .field("native", &format_args!("{:#x}", self.get_native_object()))
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("initialized", &self.initialized)
            .field("multisampled", &self.is_multisampled())
            .finish()
    }
}

/// Log a swapchain description as a parameter table
pub(crate) fn log_swapchain_desc(desc: &SwapchainDesc) {
    const RULE: &str = "  +-----------------------------------------+-----------------------------------------+";

    log::info!("> Dumping swap chain description:");
    log::info!("{}", RULE);
    log::info!("  | {:<39} | {:<39} |", "Parameter", "Value");
    log::info!("{}", RULE);
    log::info!("  | {:<39} | {:>39} |", "width", desc.width);
    log::info!("  | {:<39} | {:>39} |", "height", desc.height);
    log::info!("  | {:<39} | {:>39} |", "format", format!("{:?}", desc.format));
    log::info!("  | {:<39} | {:>39} |", "sampleCount", desc.sample_count);
    log::info!("  | {:<39} | {:>39} |", "bufferCount", desc.buffer_count);
    log::info!("  | {:<39} | {:>39} |", "usage", format!("{:#x}", desc.usage.bits()));
    log::info!("  | {:<39} | {:>39} |", "window", format!("{:#x}", desc.window.0));
    log::info!("  | {:<39} | {:>39} |", "fullscreen", desc.fullscreen);
    log::info!("  | {:<39} | {:>39} |", "syncInterval", desc.sync_interval);
    log::info!("{}", RULE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::device::Device;
    use crate::backend::null::{NullDriver, NullOp};
    use crate::config::LayerConfig;

    const WINDOW: WindowHandle = WindowHandle(0x10);

    fn swapchain_desc(sample_count: u16) -> SwapchainDesc {
        SwapchainDesc {
            width: 800,
            height: 600,
            format: Format::R8G8B8A8Unorm,
            sample_count,
            buffer_count: 1,
            usage: ResourceUsage::RENDER_TARGET,
            window: WINDOW,
            fullscreen: false,
            sync_interval: 1,
        }
    }

    fn device(driver: &NullDriver) -> Device {
        Device::with_registry(driver.create_device(), LayerConfig::default(), Arc::new(EventRegistry::new())).unwrap()
    }

    #[test]
    fn test_init_without_msaa_aliases_resolved_buffer() {
        let driver = NullDriver::new();
        let device = device(&driver);
        let native = driver.create_swapchain(&swapchain_desc(1)).unwrap();
        let resources_before = driver.live_resources();

        let mut swapchain = Swapchain::new(&device, native);
        swapchain.on_init(WINDOW).unwrap();

        assert!(swapchain.is_initialized());
        assert!(!swapchain.is_multisampled());
        assert_eq!(swapchain.back_buffer_resolved(0), swapchain.back_buffer(0));
        assert_eq!(swapchain.multisample_views(), Err(SwapchainError::NotMultisampled));
        assert_eq!(driver.live_resources(), resources_before);
        assert_eq!(driver.live_views(), 0);
        assert_eq!((swapchain.width(), swapchain.height()), (800, 600));
    }

    #[test]
    fn test_init_with_msaa_creates_targets() {
        let driver = NullDriver::new();
        let device = device(&driver);
        let mut swapchain = Swapchain::new(&device, driver.create_swapchain(&swapchain_desc(4)).unwrap());
        let resources_before = driver.live_resources();

        swapchain.on_init(WINDOW).unwrap();
        assert!(swapchain.is_multisampled());
        assert_ne!(swapchain.back_buffer_resolved(0), swapchain.back_buffer(0));
        assert_eq!(driver.live_resources(), resources_before + 1);
        assert_eq!(driver.live_views(), 2);

        let resolved = swapchain.back_buffer_resolved(0).unwrap();
        let resolved_desc = driver.resource_desc(resolved).unwrap();
        assert_eq!(resolved_desc.samples, 1);
        assert!(resolved_desc.usage.contains(ResourceUsage::SHADER_RESOURCE | ResourceUsage::RENDER_TARGET));

        swapchain.on_reset();
        assert!(!swapchain.is_initialized());
        assert_eq!(driver.live_resources(), resources_before);
        assert_eq!(driver.live_views(), 0);
        assert!(driver.destroyed_while_viewed().is_empty());
    }

    #[test]
    fn test_msaa_allocation_failure_leaves_nothing_behind() {
        // Resolve texture, then render target view, then shader resource view
        let cases = [
            (NullOp::CreateResource, 0),
            (NullOp::CreateResourceView, 0),
            (NullOp::CreateResourceView, 1),
        ];
        for (failing, skip) in cases {
            let driver = NullDriver::new();
            let device = device(&driver);
            let mut swapchain = Swapchain::new(&device, driver.create_swapchain(&swapchain_desc(4)).unwrap());
            let resources_before = driver.live_resources();

            driver.fail_nth(failing, skip);
            let error = swapchain.on_init(WINDOW).unwrap_err();
            match (failing, skip) {
                (NullOp::CreateResource, _) => assert!(matches!(error, SwapchainError::ResolveTexture(_))),
                (_, 0) => assert!(matches!(error, SwapchainError::RenderTargetView(_))),
                _ => assert!(matches!(error, SwapchainError::ShaderResourceView(_))),
            }

            assert!(!swapchain.is_initialized());
            assert!(swapchain.multisample_views().is_err());
            assert_eq!(driver.live_resources(), resources_before);
            assert_eq!(driver.live_views(), 0);
        }
    }

    #[test]
    fn test_description_failure() {
        let driver = NullDriver::new();
        let device = device(&driver);
        let mut swapchain = Swapchain::new(&device, driver.create_swapchain(&swapchain_desc(1)).unwrap());

        driver.fail_next(NullOp::SwapchainDesc);
        assert_eq!(
            swapchain.on_init(WINDOW),
            Err(SwapchainError::DescriptionUnavailable(BackendError::DeviceLost))
        );
        assert!(!swapchain.is_initialized());
    }

    #[test]
    fn test_runtime_failure_releases_targets() {
        let driver = NullDriver::new();
        let device = device(&driver);
        let mut swapchain = Swapchain::new(&device, driver.create_swapchain(&swapchain_desc(4)).unwrap());

        let result = swapchain.on_init(WindowHandle(0));
        assert_eq!(result, Err(SwapchainError::Runtime(RuntimeError::InvalidWindow)));
        assert!(!swapchain.is_multisampled());
        assert_eq!(driver.live_views(), 0);
    }

    #[test]
    fn test_back_buffer_index_is_checked() {
        let driver = NullDriver::new();
        let device = device(&driver);
        let mut desc = swapchain_desc(1);
        desc.buffer_count = 2;
        let mut swapchain = Swapchain::new(&device, driver.create_swapchain(&desc).unwrap());
        swapchain.on_init(WINDOW).unwrap();

        assert_eq!(swapchain.back_buffer_count(), 2);
        assert!(swapchain.back_buffer(1).is_some());
        assert_ne!(swapchain.back_buffer(0), swapchain.back_buffer(1));
        assert!(swapchain.back_buffer(2).is_none());
    }
}
