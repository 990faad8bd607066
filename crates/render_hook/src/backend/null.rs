//! In-memory reference driver
//!
//! Implements every native trait without a GPU. Objects live in slot maps
//! shared by all objects of one [`NullDriver`], so a test can ask the driver
//! how many objects are alive, which descriptions it received and which
//! commands were recorded. Failures can be injected per operation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    AdapterInfo, BackendError, BackendResult, NativeCommandList, NativeDevice, NativeQueue,
    NativeSwapchain,
};
use crate::api::desc::{
    Capability, DeviceApi, PipelineDesc, PrimitiveTopology, QueueType, Rect, ResourceDesc,
    ResourceUsage, ResourceViewDesc, SamplerDesc, SubresourceData, SwapchainDesc, Viewport,
};
use crate::api::format::Format;
use crate::api::handle::{Pipeline, Resource, ResourceView, Sampler};
use crate::api::object::NativeObject;
use crate::api::state::PipelineStateSnapshot;
use crate::foundation::collections::{key_to_raw, raw_to_key, HandleMap};

/// Operations that can be made to fail with [`NullDriver::fail_next`] or
/// [`NullDriver::fail_nth`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullOp {
    /// `create_resource` fails with out of memory
    CreateResource,
    /// `create_resource_view` fails with out of memory
    CreateResourceView,
    /// `create_sampler` fails with out of memory
    CreateSampler,
    /// `create_pipeline` fails with out of memory
    CreatePipeline,
    /// Swapchain `desc` fails with device lost
    SwapchainDesc,
    /// Swapchain `present` fails with device lost
    Present,
}

/// A command recorded by a null command list or queue
#[derive(Debug, Clone, PartialEq)]
pub enum NullCommand {
    /// Non-indexed draw
    Draw {
        /// Vertex count
        vertex_count: u32,
        /// Instance count
        instance_count: u32,
        /// First vertex
        first_vertex: u32,
        /// First instance
        first_instance: u32,
    },
    /// Indexed draw
    DrawIndexed {
        /// Index count
        index_count: u32,
        /// Instance count
        instance_count: u32,
        /// First index
        first_index: u32,
        /// Vertex offset
        vertex_offset: i32,
        /// First instance
        first_instance: u32,
    },
    /// Compute dispatch
    Dispatch {
        /// Group counts
        groups: [u32; 3],
    },
    /// Full resource copy
    CopyResource {
        /// Source
        source: Resource,
        /// Destination
        destination: Resource,
    },
    /// Multisample resolve
    ResolveResource {
        /// Multisampled source
        source: Resource,
        /// Single-sample destination
        destination: Resource,
        /// Resolve format
        format: Format,
    },
    /// Render target clear
    ClearRenderTargetView {
        /// Cleared view
        view: ResourceView,
        /// Clear color
        color: [f32; 4],
    },
    /// Bound state changed (pipeline, buffers, views, viewports, ...)
    Bind,
    /// A captured state snapshot was applied
    ApplyState,
    /// Command list submitted to a queue
    Submit {
        /// Native handle of the submitted list
        command_list: u64,
    },
    /// Immediate command list flushed
    Flush,
    /// Swapchain presented
    Present {
        /// Native handle of the swapchain
        swapchain: u64,
    },
}

struct NullState {
    api: DeviceApi,
    resources: HandleMap<ResourceDesc>,
    views: HandleMap<(Resource, ResourceViewDesc)>,
    samplers: HandleMap<SamplerDesc>,
    pipelines: HandleMap<PipelineDesc>,
    /// Injected failures: operation and the number of calls to let through first
    pending_failures: Vec<(NullOp, usize)>,
    commands: Vec<NullCommand>,
    /// Resources destroyed while a view onto them was still alive
    destroyed_while_viewed: Vec<Resource>,
    next_object: u64,
}

impl NullState {
    fn take_failure(&mut self, op: NullOp) -> bool {
        let due = self
            .pending_failures
            .iter()
            .position(|(pending, skip)| *pending == op && *skip == 0);
        for (pending, skip) in &mut self.pending_failures {
            if *pending == op && *skip > 0 {
                *skip -= 1;
            }
        }

        match due {
            Some(index) => {
                self.pending_failures.remove(index);
                log::debug!("Injected failure for {:?}", op);
                true
            }
            None => false,
        }
    }

    fn next_object(&mut self) -> u64 {
        self.next_object += 1;
        self.next_object
    }

    fn create_resource(&mut self, desc: &ResourceDesc) -> BackendResult<Resource> {
        if self.take_failure(NullOp::CreateResource) {
            return Err(BackendError::OutOfMemory);
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::InvalidArgument(format!("zero sized resource {:?}", desc)));
        }
        Ok(Resource::new(key_to_raw(self.resources.insert(*desc))))
    }

    fn destroy_resource(&mut self, resource: Resource) {
        if self.views.values().any(|(viewed, _)| *viewed == resource) {
            log::warn!("Destroying resource {:?} while views onto it are alive", resource);
            self.destroyed_while_viewed.push(resource);
        }
        if self.resources.remove(raw_to_key(resource.handle)).is_none() {
            log::warn!("Destroying unknown resource {:?}", resource);
        }
    }
}

/// Shared handle to one in-memory driver instance
#[derive(Clone)]
pub struct NullDriver {
    state: Arc<Mutex<NullState>>,
}

impl NullDriver {
    /// Create a driver whose devices report Direct3D 10
    pub fn new() -> Self {
        Self::with_api(DeviceApi::D3D10)
    }

    /// Create a driver whose devices report `api`
    pub fn with_api(api: DeviceApi) -> Self {
        Self {
            state: Arc::new(Mutex::new(NullState {
                api,
                resources: HandleMap::new(),
                views: HandleMap::new(),
                samplers: HandleMap::new(),
                pipelines: HandleMap::new(),
                pending_failures: Vec::new(),
                commands: Vec::new(),
                destroyed_while_viewed: Vec::new(),
                next_object: 0x1000,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NullState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a native device
    pub fn create_device(&self) -> Box<dyn NativeDevice> {
        let handle = self.lock().next_object();
        Box::new(NullDevice {
            state: Arc::clone(&self.state),
            handle,
        })
    }

    /// Create a native graphics queue with an immediate command list
    pub fn create_queue(&self) -> Box<dyn NativeQueue> {
        let handle = self.lock().next_object();
        Box::new(NullQueue {
            state: Arc::clone(&self.state),
            handle,
        })
    }

    /// Create a native command list
    pub fn create_command_list(&self) -> Box<dyn NativeCommandList> {
        Box::new(NullCommandList::new(Arc::clone(&self.state)))
    }

    /// Create a native swapchain with `desc.buffer_count` back buffers
    pub fn create_swapchain(&self, desc: &SwapchainDesc) -> BackendResult<Box<dyn NativeSwapchain>> {
        let mut swapchain = NullSwapchain {
            state: Arc::clone(&self.state),
            handle: self.lock().next_object(),
            desc: *desc,
            back_buffers: Vec::new(),
            current: 0,
        };
        swapchain.desc.buffer_count = desc.buffer_count.max(1);
        swapchain.create_back_buffers()?;
        Ok(Box::new(swapchain))
    }

    /// Make the next call of `op` fail
    pub fn fail_next(&self, op: NullOp) {
        self.fail_nth(op, 0);
    }

    /// Make the call of `op` after `skip` successful ones fail
    pub fn fail_nth(&self, op: NullOp, skip: usize) {
        self.lock().pending_failures.push((op, skip));
    }

    /// Every command recorded so far
    pub fn commands(&self) -> Vec<NullCommand> {
        self.lock().commands.clone()
    }

    /// Forget recorded commands
    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    /// Resources that were destroyed before every view onto them
    pub fn destroyed_while_viewed(&self) -> Vec<Resource> {
        self.lock().destroyed_while_viewed.clone()
    }

    /// Live resources (including swapchain back buffers)
    pub fn live_resources(&self) -> usize {
        self.lock().resources.len()
    }

    /// Live resource views
    pub fn live_views(&self) -> usize {
        self.lock().views.len()
    }

    /// Live samplers
    pub fn live_samplers(&self) -> usize {
        self.lock().samplers.len()
    }

    /// Live pipelines
    pub fn live_pipelines(&self) -> usize {
        self.lock().pipelines.len()
    }

    /// Description a live resource was created with
    pub fn resource_desc(&self, resource: Resource) -> Option<ResourceDesc> {
        self.lock().resources.get(raw_to_key(resource.handle)).copied()
    }

    /// Description a live view was created with
    pub fn view_desc(&self, view: ResourceView) -> Option<ResourceViewDesc> {
        self.lock().views.get(raw_to_key(view.handle)).map(|(_, desc)| *desc)
    }

    /// Description a live sampler was created with
    pub fn sampler_desc(&self, sampler: Sampler) -> Option<SamplerDesc> {
        self.lock().samplers.get(raw_to_key(sampler.handle)).copied()
    }

    /// Description a live pipeline was created with
    pub fn pipeline_desc(&self, pipeline: Pipeline) -> Option<PipelineDesc> {
        self.lock().pipelines.get(raw_to_key(pipeline.handle)).cloned()
    }
}

impl Default for NullDriver {
    fn default() -> Self {
        Self::new()
    }
}

struct NullDevice {
    state: Arc<Mutex<NullState>>,
    handle: u64,
}

impl NullDevice {
    fn lock(&self) -> MutexGuard<'_, NullState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NativeObject for NullDevice {
    fn native_handle(&self) -> u64 {
        self.handle
    }
}

impl NativeDevice for NullDevice {
    fn api(&self) -> DeviceApi {
        self.lock().api
    }

    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            vendor_id: 0,
            device_id: 0,
            description: "Null reference device".to_string(),
        }
    }

    fn check_capability(&self, _capability: Capability) -> bool {
        true
    }

    fn create_resource(
        &mut self,
        desc: &ResourceDesc,
        _initial_data: Option<&SubresourceData>,
        _initial_state: ResourceUsage,
    ) -> BackendResult<Resource> {
        self.lock().create_resource(desc)
    }

    fn destroy_resource(&mut self, resource: Resource) {
        self.lock().destroy_resource(resource);
    }

    fn resource_desc(&self, resource: Resource) -> Option<ResourceDesc> {
        self.lock().resources.get(raw_to_key(resource.handle)).copied()
    }

    fn create_resource_view(
        &mut self,
        resource: Resource,
        desc: &ResourceViewDesc,
    ) -> BackendResult<ResourceView> {
        let mut state = self.lock();
        if state.take_failure(NullOp::CreateResourceView) {
            return Err(BackendError::OutOfMemory);
        }
        if !state.resources.contains_key(raw_to_key(resource.handle)) {
            return Err(BackendError::InvalidArgument(format!("view of unknown resource {:?}", resource)));
        }
        Ok(ResourceView::new(key_to_raw(state.views.insert((resource, *desc)))))
    }

    fn destroy_resource_view(&mut self, view: ResourceView) {
        if self.lock().views.remove(raw_to_key(view.handle)).is_none() {
            log::warn!("Destroying unknown resource view {:?}", view);
        }
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> BackendResult<Sampler> {
        let mut state = self.lock();
        if state.take_failure(NullOp::CreateSampler) {
            return Err(BackendError::OutOfMemory);
        }
        Ok(Sampler::new(key_to_raw(state.samplers.insert(*desc))))
    }

    fn destroy_sampler(&mut self, sampler: Sampler) {
        if self.lock().samplers.remove(raw_to_key(sampler.handle)).is_none() {
            log::warn!("Destroying unknown sampler {:?}", sampler);
        }
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc) -> BackendResult<Pipeline> {
        let mut state = self.lock();
        if state.take_failure(NullOp::CreatePipeline) {
            return Err(BackendError::OutOfMemory);
        }
        Ok(Pipeline::new(key_to_raw(state.pipelines.insert(desc.clone()))))
    }

    fn destroy_pipeline(&mut self, pipeline: Pipeline) {
        if self.lock().pipelines.remove(raw_to_key(pipeline.handle)).is_none() {
            log::warn!("Destroying unknown pipeline {:?}", pipeline);
        }
    }
}

struct NullCommandList {
    state: Arc<Mutex<NullState>>,
    handle: u64,
    bound: PipelineStateSnapshot,
}

impl NullCommandList {
    fn new(state: Arc<Mutex<NullState>>) -> Self {
        let handle = state.lock().unwrap_or_else(PoisonError::into_inner).next_object();
        Self {
            state,
            handle,
            bound: PipelineStateSnapshot::default(),
        }
    }

    fn record(&self, command: NullCommand) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .commands
            .push(command);
    }
}

/// Overwrite `slots` starting at `first`, growing as needed
fn bind_slots<T: Copy + Default>(slots: &mut Vec<T>, first: u32, values: &[T]) {
    let first = first as usize;
    if slots.len() < first + values.len() {
        slots.resize(first + values.len(), T::default());
    }
    slots[first..first + values.len()].copy_from_slice(values);
}

impl NativeObject for NullCommandList {
    fn native_handle(&self) -> u64 {
        self.handle
    }
}

impl NativeCommandList for NullCommandList {
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.record(NullCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.record(NullCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        self.record(NullCommand::Dispatch {
            groups: [group_count_x, group_count_y, group_count_z],
        });
    }

    fn copy_resource(&mut self, source: Resource, destination: Resource) {
        self.record(NullCommand::CopyResource { source, destination });
    }

    fn resolve_resource(&mut self, source: Resource, destination: Resource, format: Format) {
        self.record(NullCommand::ResolveResource {
            source,
            destination,
            format,
        });
    }

    fn clear_render_target_view(&mut self, view: ResourceView, color: &[f32; 4]) {
        self.record(NullCommand::ClearRenderTargetView { view, color: *color });
    }

    fn bind_pipeline(&mut self, pipeline: Pipeline) {
        self.bound.pipeline = pipeline;
        self.record(NullCommand::Bind);
    }

    fn bind_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.bound.topology = topology;
        self.record(NullCommand::Bind);
    }

    fn bind_viewports(&mut self, viewports: &[Viewport]) {
        self.bound.viewports = viewports.to_vec();
        self.record(NullCommand::Bind);
    }

    fn bind_scissor_rects(&mut self, rects: &[Rect]) {
        self.bound.scissor_rects = rects.to_vec();
        self.record(NullCommand::Bind);
    }

    fn bind_vertex_buffers(&mut self, first: u32, buffers: &[Resource]) {
        bind_slots(&mut self.bound.vertex_buffers, first, buffers);
        self.record(NullCommand::Bind);
    }

    fn bind_index_buffer(&mut self, buffer: Resource, format: Format) {
        self.bound.index_buffer = (buffer, format);
        self.record(NullCommand::Bind);
    }

    fn bind_render_targets(&mut self, render_targets: &[ResourceView], depth_stencil: ResourceView) {
        self.bound.render_targets = render_targets.to_vec();
        self.bound.depth_stencil = depth_stencil;
        self.record(NullCommand::Bind);
    }

    fn bind_shader_resource_views(&mut self, first: u32, views: &[ResourceView]) {
        bind_slots(&mut self.bound.shader_resources, first, views);
        self.record(NullCommand::Bind);
    }

    fn bind_samplers(&mut self, first: u32, samplers: &[Sampler]) {
        bind_slots(&mut self.bound.samplers, first, samplers);
        self.record(NullCommand::Bind);
    }

    fn capture_state(&self) -> PipelineStateSnapshot {
        self.bound.clone()
    }

    fn apply_state(&mut self, state: &PipelineStateSnapshot) {
        self.bound = state.clone();
        self.record(NullCommand::ApplyState);
    }
}

struct NullQueue {
    state: Arc<Mutex<NullState>>,
    handle: u64,
}

impl NativeObject for NullQueue {
    fn native_handle(&self) -> u64 {
        self.handle
    }
}

impl NativeQueue for NullQueue {
    fn queue_type(&self) -> QueueType {
        QueueType::GRAPHICS | QueueType::COMPUTE | QueueType::COPY
    }

    fn create_immediate_command_list(&mut self) -> Option<Box<dyn NativeCommandList>> {
        Some(Box::new(NullCommandList::new(Arc::clone(&self.state))))
    }

    fn submit(&mut self, command_list: &dyn NativeCommandList) -> BackendResult<()> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .commands
            .push(NullCommand::Submit {
                command_list: command_list.native_handle(),
            });
        Ok(())
    }

    fn flush(&mut self) -> BackendResult<()> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .commands
            .push(NullCommand::Flush);
        Ok(())
    }
}

struct NullSwapchain {
    state: Arc<Mutex<NullState>>,
    handle: u64,
    desc: SwapchainDesc,
    back_buffers: Vec<Resource>,
    current: u32,
}

impl NullSwapchain {
    fn lock(&self) -> MutexGuard<'_, NullState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_back_buffers(&mut self) -> BackendResult<()> {
        let desc = ResourceDesc::texture_2d(
            self.desc.width,
            self.desc.height,
            self.desc.format,
            self.desc.sample_count,
            self.desc.usage | ResourceUsage::RENDER_TARGET | ResourceUsage::PRESENT,
        );

        let mut created = Vec::with_capacity(self.desc.buffer_count as usize);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for _ in 0..self.desc.buffer_count {
            match state.create_resource(&desc) {
                Ok(resource) => created.push(resource),
                Err(error) => {
                    created.into_iter().for_each(|resource| state.destroy_resource(resource));
                    return Err(error);
                }
            }
        }
        drop(state);

        self.back_buffers = created;
        self.current = 0;
        Ok(())
    }

    fn destroy_back_buffers(&mut self) {
        let back_buffers = std::mem::take(&mut self.back_buffers);
        let mut state = self.lock();
        back_buffers.into_iter().for_each(|resource| state.destroy_resource(resource));
    }
}

impl NativeObject for NullSwapchain {
    fn native_handle(&self) -> u64 {
        self.handle
    }
}

impl NativeSwapchain for NullSwapchain {
    fn desc(&self) -> BackendResult<SwapchainDesc> {
        if self.lock().take_failure(NullOp::SwapchainDesc) {
            return Err(BackendError::DeviceLost);
        }
        Ok(self.desc)
    }

    fn back_buffer(&self, index: u32) -> Option<Resource> {
        self.back_buffers.get(index as usize).copied()
    }

    fn back_buffer_count(&self) -> u32 {
        self.desc.buffer_count
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.current
    }

    fn present(&mut self) -> BackendResult<()> {
        let handle = self.handle;
        let mut state = self.lock();
        if state.take_failure(NullOp::Present) {
            return Err(BackendError::DeviceLost);
        }
        state.commands.push(NullCommand::Present { swapchain: handle });
        drop(state);

        self.current = (self.current + 1) % self.desc.buffer_count;
        Ok(())
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> BackendResult<()> {
        self.destroy_back_buffers();
        self.desc.width = width;
        self.desc.height = height;
        self.create_back_buffers()
    }
}

impl Drop for NullSwapchain {
    fn drop(&mut self) {
        self.destroy_back_buffers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique_and_non_null() {
        let driver = NullDriver::new();
        let mut device = driver.create_device();
        let desc = ResourceDesc::buffer(64, ResourceUsage::VERTEX_BUFFER);

        let a = device.create_resource(&desc, None, ResourceUsage::VERTEX_BUFFER).unwrap();
        let b = device.create_resource(&desc, None, ResourceUsage::VERTEX_BUFFER).unwrap();
        assert!(!a.is_null());
        assert_ne!(a, b);

        device.destroy_resource(a);
        device.destroy_resource(b);
        assert_eq!(driver.live_resources(), 0);
    }

    #[test]
    fn test_failure_injection_hits_once() {
        let driver = NullDriver::new();
        let mut device = driver.create_device();

        driver.fail_next(NullOp::CreateSampler);
        assert_eq!(device.create_sampler(&SamplerDesc::default()), Err(BackendError::OutOfMemory));
        let sampler = device.create_sampler(&SamplerDesc::default()).unwrap();
        device.destroy_sampler(sampler);
    }

    #[test]
    fn test_failure_injection_skips_earlier_calls() {
        let driver = NullDriver::new();
        let mut device = driver.create_device();

        driver.fail_nth(NullOp::CreateSampler, 2);
        let first = device.create_sampler(&SamplerDesc::default()).unwrap();
        let second = device.create_sampler(&SamplerDesc::default()).unwrap();
        assert_eq!(device.create_sampler(&SamplerDesc::default()), Err(BackendError::OutOfMemory));
        let fourth = device.create_sampler(&SamplerDesc::default()).unwrap();

        for sampler in [first, second, fourth] {
            device.destroy_sampler(sampler);
        }
        assert_eq!(driver.live_samplers(), 0);
    }

    #[test]
    fn test_destroying_viewed_resource_is_flagged() {
        let driver = NullDriver::new();
        let mut device = driver.create_device();
        let desc = ResourceDesc::texture_2d(4, 4, Format::R8G8B8A8Unorm, 1, ResourceUsage::SHADER_RESOURCE);

        let texture = device.create_resource(&desc, None, ResourceUsage::SHADER_RESOURCE).unwrap();
        let view = device
            .create_resource_view(texture, &ResourceViewDesc::texture_2d(Format::R8G8B8A8Unorm, false))
            .unwrap();
        device.destroy_resource(texture);
        device.destroy_resource_view(view);

        assert_eq!(driver.destroyed_while_viewed(), vec![texture]);
    }

    #[test]
    fn test_view_of_unknown_resource_is_rejected() {
        let driver = NullDriver::new();
        let mut device = driver.create_device();
        let result = device.create_resource_view(Resource::new(0xdead), &ResourceViewDesc::default());
        assert!(matches!(result, Err(BackendError::InvalidArgument(_))));
    }

    #[test]
    fn test_swapchain_back_buffers_follow_resize() {
        let driver = NullDriver::new();
        let desc = SwapchainDesc {
            width: 320,
            height: 200,
            format: Format::B8G8R8A8Unorm,
            sample_count: 1,
            buffer_count: 2,
            ..SwapchainDesc::default()
        };
        let mut swapchain = driver.create_swapchain(&desc).unwrap();
        assert_eq!(driver.live_resources(), 2);

        swapchain.present().unwrap();
        assert_eq!(swapchain.current_back_buffer_index(), 1);

        swapchain.resize_buffers(640, 400).unwrap();
        assert_eq!(driver.live_resources(), 2);
        let back_buffer = swapchain.back_buffer(0).unwrap();
        assert_eq!(driver.resource_desc(back_buffer).map(|d| d.width), Some(640));

        drop(swapchain);
        assert_eq!(driver.live_resources(), 0);
    }

    #[test]
    fn test_apply_state_replaces_bindings() {
        let driver = NullDriver::new();
        let mut list = driver.create_command_list();
        list.bind_shader_resource_views(2, &[ResourceView::new(5)]);
        assert_eq!(
            list.capture_state().shader_resources,
            vec![ResourceView::NULL, ResourceView::NULL, ResourceView::new(5)]
        );

        list.apply_state(&PipelineStateSnapshot::default());
        assert!(list.capture_state().shader_resources.is_empty());
        assert_eq!(driver.commands().last(), Some(&NullCommand::ApplyState));
    }
}
