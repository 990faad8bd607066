//! Command lists and command queues
//!
//! Every recording method on [`CommandList`] that has a matching intercept
//! event fires it first; when an observer returns `true` the native command
//! is skipped. Binding methods without an event pass straight through.

use std::sync::Arc;

use super::desc::{PrimitiveTopology, QueueType, Rect, Viewport};
use super::device::{ChildKind, Device, DeviceContext};
use super::format::Format;
use super::handle::{Pipeline, Resource, ResourceView, Sampler};
use super::object::{delegate_api_object, ApiObject, ApiObjectImpl};
use super::swapchain::Swapchain;
use crate::addon::events::{
    BindPipeline, BindViewports, ClearRenderTargetView, CopyResource, DestroyCommandList,
    DestroyCommandQueue, Dispatch, Draw, DrawIndexed, ExecuteCommandList, InitCommandList,
    InitCommandQueue, Present, ResolveResource,
};
use crate::addon::EventRegistry;
use crate::backend::{BackendResult, NativeCommandList, NativeQueue};

/// Wrapped native command list
pub struct CommandList {
    object: ApiObjectImpl<Box<dyn NativeCommandList>, DeviceContext>,
}

delegate_api_object!(CommandList, object);

impl CommandList {
    /// Wrap a native command list recorded on `device`
    pub fn new(device: &Device, native: Box<dyn NativeCommandList>) -> Self {
        Self::with_context(device.context().clone(), native)
    }

    pub(crate) fn with_context(context: DeviceContext, native: Box<dyn NativeCommandList>) -> Self {
        context.child_created(ChildKind::CommandList);
        let list = Self {
            object: ApiObjectImpl::new(native, context),
        };
        list.registry().invoke::<InitCommandList>(|callback| callback(&list));
        list
    }

    /// Context of the owning device
    pub fn context(&self) -> &DeviceContext {
        self.object.capabilities()
    }

    fn registry(&self) -> &Arc<EventRegistry> {
        self.context().registry()
    }

    pub(crate) fn native(&self) -> &dyn NativeCommandList {
        &**self.object.orig()
    }

    pub(crate) fn native_mut(&mut self) -> &mut dyn NativeCommandList {
        &mut **self.object.orig_mut()
    }

    /// Draw non-indexed, instanced primitives
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        let this: &Self = self;
        if this.registry().invoke_intercept::<Draw>(|callback| {
            callback(this, vertex_count, instance_count, first_vertex, first_instance)
        }) {
            return;
        }
        self.native_mut().draw(vertex_count, instance_count, first_vertex, first_instance);
    }

    /// Draw indexed, instanced primitives
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        let this: &Self = self;
        if this.registry().invoke_intercept::<DrawIndexed>(|callback| {
            callback(this, index_count, instance_count, first_index, vertex_offset, first_instance)
        }) {
            return;
        }
        self.native_mut()
            .draw_indexed(index_count, instance_count, first_index, vertex_offset, first_instance);
    }

    /// Dispatch compute work
    pub fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        let this: &Self = self;
        if this.registry().invoke_intercept::<Dispatch>(|callback| {
            callback(this, group_count_x, group_count_y, group_count_z)
        }) {
            return;
        }
        self.native_mut().dispatch(group_count_x, group_count_y, group_count_z);
    }

    /// Copy the entire contents of `source` into `destination`
    pub fn copy_resource(&mut self, source: Resource, destination: Resource) {
        let this: &Self = self;
        if this
            .registry()
            .invoke_intercept::<CopyResource>(|callback| callback(this, source, destination))
        {
            return;
        }
        self.native_mut().copy_resource(source, destination);
    }

    /// Resolve a multisampled resource into a single-sample one
    pub fn resolve_resource(&mut self, source: Resource, destination: Resource, format: Format) {
        let this: &Self = self;
        if this
            .registry()
            .invoke_intercept::<ResolveResource>(|callback| callback(this, source, destination, format))
        {
            return;
        }
        self.native_mut().resolve_resource(source, destination, format);
    }

    /// Clear a render target view to `color`
    pub fn clear_render_target_view(&mut self, view: ResourceView, color: &[f32; 4]) {
        let this: &Self = self;
        if this
            .registry()
            .invoke_intercept::<ClearRenderTargetView>(|callback| callback(this, view, color))
        {
            return;
        }
        self.native_mut().clear_render_target_view(view, color);
    }

    /// Bind a pipeline state object
    pub fn bind_pipeline(&mut self, pipeline: Pipeline) {
        let this: &Self = self;
        if this
            .registry()
            .invoke_intercept::<BindPipeline>(|callback| callback(this, pipeline))
        {
            return;
        }
        self.native_mut().bind_pipeline(pipeline);
    }

    /// Bind viewports
    ///
    /// Observers may edit the list; the edited list is what the driver
    /// receives unless an observer suppresses the call.
    pub fn bind_viewports(&mut self, viewports: &[Viewport]) {
        let mut viewports = viewports.to_vec();
        let this: &Self = self;
        if this
            .registry()
            .invoke_intercept::<BindViewports>(|callback| callback(this, &mut viewports))
        {
            return;
        }
        self.native_mut().bind_viewports(&viewports);
    }

    /// Bind the primitive topology
    pub fn bind_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.native_mut().bind_primitive_topology(topology);
    }

    /// Bind scissor rectangles
    pub fn bind_scissor_rects(&mut self, rects: &[Rect]) {
        self.native_mut().bind_scissor_rects(rects);
    }

    /// Bind vertex buffers starting at `first`
    pub fn bind_vertex_buffers(&mut self, first: u32, buffers: &[Resource]) {
        self.native_mut().bind_vertex_buffers(first, buffers);
    }

    /// Bind the index buffer
    pub fn bind_index_buffer(&mut self, buffer: Resource, format: Format) {
        self.native_mut().bind_index_buffer(buffer, format);
    }

    /// Bind render targets and the depth stencil view
    pub fn bind_render_targets(&mut self, render_targets: &[ResourceView], depth_stencil: ResourceView) {
        self.native_mut().bind_render_targets(render_targets, depth_stencil);
    }

    /// Bind shader resource views starting at `first`
    pub fn bind_shader_resource_views(&mut self, first: u32, views: &[ResourceView]) {
        self.native_mut().bind_shader_resource_views(first, views);
    }

    /// Bind samplers starting at `first`
    pub fn bind_samplers(&mut self, first: u32, samplers: &[Sampler]) {
        self.native_mut().bind_samplers(first, samplers);
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        let registry = Arc::clone(self.registry());
        let this: &Self = self;
        registry.invoke::<DestroyCommandList>(|callback| callback(this));
        self.context().child_destroyed(ChildKind::CommandList);
    }
}

impl std::fmt::Debug for CommandList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommandList({:#x})", self.get_native_object())
    }
}

/// Wrapped native command queue
///
/// Queues own an immediate command list the layer records its own work on
/// (the MSAA resolve and copy-back during present).
pub struct CommandQueue {
    object: ApiObjectImpl<Box<dyn NativeQueue>, DeviceContext>,
    immediate: Option<CommandList>,
}

delegate_api_object!(CommandQueue, object);

impl CommandQueue {
    /// Wrap a native queue of `device`
    pub fn new(device: &Device, mut native: Box<dyn NativeQueue>) -> Self {
        let context = device.context().clone();
        let immediate = native
            .create_immediate_command_list()
            .map(|list| CommandList::with_context(context.clone(), list));

        context.child_created(ChildKind::CommandQueue);
        let queue = Self {
            object: ApiObjectImpl::new(native, context),
            immediate,
        };
        queue.registry().invoke::<InitCommandQueue>(|callback| callback(&queue));
        queue
    }

    /// Context of the owning device
    pub fn context(&self) -> &DeviceContext {
        self.object.capabilities()
    }

    fn registry(&self) -> &Arc<EventRegistry> {
        self.context().registry()
    }

    /// Kinds of work this queue accepts
    pub fn queue_type(&self) -> QueueType {
        self.object.orig().queue_type()
    }

    /// The queue's immediate command list
    pub fn immediate_command_list(&self) -> Option<&CommandList> {
        self.immediate.as_ref()
    }

    /// The queue's immediate command list, mutably
    pub fn immediate_command_list_mut(&mut self) -> Option<&mut CommandList> {
        self.immediate.as_mut()
    }

    /// Submit a recorded command list
    ///
    /// Fires [`ExecuteCommandList`] before the native submission.
    pub fn execute_command_list(&mut self, command_list: &CommandList) -> BackendResult<()> {
        let this: &Self = self;
        this.registry()
            .invoke::<ExecuteCommandList>(|callback| callback(this, command_list));
        self.object.orig_mut().submit(command_list.native())
    }

    /// Submit everything recorded on the immediate command list
    pub fn flush_immediate_command_list(&mut self) -> BackendResult<()> {
        self.object.orig_mut().flush()
    }

    /// Present `swapchain` from this queue
    ///
    /// Fires [`Present`], lets the swapchain run its present protocol on the
    /// immediate command list, flushes, then presents natively.
    pub fn present(&mut self, swapchain: &mut Swapchain) -> BackendResult<()> {
        let this: &Self = self;
        this.registry()
            .invoke::<Present>(|callback| callback(this, &*swapchain));

        swapchain.on_present(self);
        self.flush_immediate_command_list()?;
        swapchain.present_native()
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        let registry = Arc::clone(self.registry());
        let this: &Self = self;
        registry.invoke::<DestroyCommandQueue>(|callback| callback(this));
        self.context().child_destroyed(ChildKind::CommandQueue);
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommandQueue({:#x})", self.get_native_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::device::Device;
    use crate::backend::null::{NullCommand, NullDriver};
    use crate::config::LayerConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        device: Device,
        driver: NullDriver,
    }

    fn fixture(registry: &Arc<EventRegistry>) -> Fixture {
        let driver = NullDriver::new();
        let device = Device::with_registry(driver.create_device(), LayerConfig::default(), Arc::clone(registry)).unwrap();
        Fixture { device, driver }
    }

    #[test]
    fn test_draw_suppression_skips_native_draw() {
        let registry = Arc::new(EventRegistry::new());
        registry.register::<Draw>(Arc::new(
            |_list: &CommandList, vertex_count: u32, _instances: u32, _first: u32, _first_instance: u32| {
                vertex_count == 36
            },
        ));
        let fixture = fixture(&registry);
        let mut list = CommandList::new(&fixture.device, fixture.driver.create_command_list());

        list.draw(36, 1, 0, 0);
        list.draw(3, 1, 0, 0);

        let draws: Vec<_> = fixture
            .driver
            .commands()
            .into_iter()
            .filter(|command| matches!(command, NullCommand::Draw { .. }))
            .collect();
        assert_eq!(draws, vec![NullCommand::Draw { vertex_count: 3, instance_count: 1, first_vertex: 0, first_instance: 0 }]);
    }

    #[test]
    fn test_bind_viewports_edits_reach_driver() {
        let registry = Arc::new(EventRegistry::new());
        registry.register::<BindViewports>(Arc::new(|_list: &CommandList, viewports: &mut Vec<Viewport>| {
            for viewport in viewports.iter_mut() {
                viewport.width /= 2.0;
            }
            false
        }));
        let fixture = fixture(&registry);
        let mut list = CommandList::new(&fixture.device, fixture.driver.create_command_list());

        list.bind_viewports(&[Viewport::full(800, 600)]);
        assert_eq!(list.native().capture_state().viewports[0].width, 400.0);
    }

    #[test]
    fn test_command_list_lifecycle_events_and_counts() {
        let registry = Arc::new(EventRegistry::new());
        let live = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&live);
        registry.register::<InitCommandList>(Arc::new(move |_list: &CommandList| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = Arc::clone(&live);
        registry.register::<DestroyCommandList>(Arc::new(move |_list: &CommandList| {
            counter.fetch_sub(1, Ordering::SeqCst);
        }));

        let fixture = fixture(&registry);
        let list = CommandList::new(&fixture.device, fixture.driver.create_command_list());
        assert_eq!(live.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.device.live_children(ChildKind::CommandList), 1);

        drop(list);
        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert_eq!(fixture.device.live_children(ChildKind::CommandList), 0);
    }

    #[test]
    fn test_queue_owns_immediate_list_and_submits() {
        let registry = Arc::new(EventRegistry::new());
        let executed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&executed);
        registry.register::<ExecuteCommandList>(Arc::new(move |_queue: &CommandQueue, _list: &CommandList| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let fixture = fixture(&registry);
        let mut queue = CommandQueue::new(&fixture.device, fixture.driver.create_queue());
        assert!(queue.immediate_command_list().is_some());
        assert_eq!(fixture.device.live_children(ChildKind::CommandList), 1);

        let list = CommandList::new(&fixture.device, fixture.driver.create_command_list());
        queue.execute_command_list(&list).unwrap();
        assert_eq!(executed.load(Ordering::SeqCst), 1);
        assert!(fixture
            .driver
            .commands()
            .contains(&NullCommand::Submit { command_list: list.get_native_object() }));

        drop(list);
        drop(queue);
        assert_eq!(fixture.device.live_children(ChildKind::CommandList), 0);
        assert_eq!(fixture.device.live_children(ChildKind::CommandQueue), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "device destroyed while children are alive")]
    fn test_device_drop_with_live_children_asserts() {
        let registry = Arc::new(EventRegistry::new());
        let driver = NullDriver::new();
        let device = Device::with_registry(driver.create_device(), LayerConfig::default(), registry).unwrap();
        let list = CommandList::new(&device, driver.create_command_list());
        drop(device);
        drop(list);
    }
}
