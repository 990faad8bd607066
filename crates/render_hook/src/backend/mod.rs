//! Native driver boundary
//!
//! The layer never talks to a graphics API directly. Each backend wraps its
//! native objects in implementations of the traits below; the wrapper types
//! in [`crate::api`] drive them and fire events around every call.
//!
//! [`null`] is an in-memory reference driver used by the host simulator and
//! by tests. [`vulkan`] holds the Vulkan interop helpers a Vulkan backend is
//! built from.

pub mod null;
pub mod vulkan;

use thiserror::Error;

use crate::api::desc::{
    Capability, DeviceApi, PipelineDesc, PrimitiveTopology, QueueType, Rect, ResourceDesc,
    ResourceUsage, ResourceViewDesc, SamplerDesc, SubresourceData, SwapchainDesc, Viewport,
};
use crate::api::format::Format;
use crate::api::handle::{Pipeline, Resource, ResourceView, Sampler};
use crate::api::object::NativeObject;
use crate::api::state::PipelineStateSnapshot;

/// Native call failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Device or host memory exhausted
    #[error("Out of memory")]
    OutOfMemory,

    /// The driver rejected an argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not supported by this backend
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// The device was removed or reset
    #[error("Device lost")]
    DeviceLost,

    /// Backend specific result code
    #[error("Native call failed with code {0}")]
    Native(i32),
}

/// Result type for native calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Adapter identification reported by a native device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdapterInfo {
    /// PCI vendor identifier
    pub vendor_id: u32,
    /// PCI device identifier
    pub device_id: u32,
    /// Human readable adapter name
    pub description: String,
}

/// Native device: factory for resources, views, samplers and pipelines
pub trait NativeDevice: NativeObject + Send {
    /// Graphics API this device belongs to
    fn api(&self) -> DeviceApi;

    /// Adapter identification
    fn adapter_info(&self) -> AdapterInfo;

    /// Whether an optional feature is available
    fn check_capability(&self, capability: Capability) -> bool;

    /// Create a buffer or texture in the given initial state
    fn create_resource(
        &mut self,
        desc: &ResourceDesc,
        initial_data: Option<&SubresourceData>,
        initial_state: ResourceUsage,
    ) -> BackendResult<Resource>;

    /// Destroy a resource created by [`NativeDevice::create_resource`]
    fn destroy_resource(&mut self, resource: Resource);

    /// Description of a live resource
    fn resource_desc(&self, resource: Resource) -> Option<ResourceDesc>;

    /// Create a view onto a resource
    fn create_resource_view(
        &mut self,
        resource: Resource,
        desc: &ResourceViewDesc,
    ) -> BackendResult<ResourceView>;

    /// Destroy a resource view
    fn destroy_resource_view(&mut self, view: ResourceView);

    /// Create a sampler state object
    fn create_sampler(&mut self, desc: &SamplerDesc) -> BackendResult<Sampler>;

    /// Destroy a sampler state object
    fn destroy_sampler(&mut self, sampler: Sampler);

    /// Create a pipeline state object
    fn create_pipeline(&mut self, desc: &PipelineDesc) -> BackendResult<Pipeline>;

    /// Destroy a pipeline state object
    fn destroy_pipeline(&mut self, pipeline: Pipeline);
}

/// Native command list (or immediate context)
pub trait NativeCommandList: NativeObject + Send {
    /// Draw non-indexed, instanced primitives
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    /// Draw indexed, instanced primitives
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    /// Dispatch compute work
    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32);

    /// Copy the entire contents of one resource to another
    fn copy_resource(&mut self, source: Resource, destination: Resource);

    /// Resolve a multisampled resource into a single-sample one
    fn resolve_resource(&mut self, source: Resource, destination: Resource, format: Format);

    /// Clear a render target view
    fn clear_render_target_view(&mut self, view: ResourceView, color: &[f32; 4]);

    /// Bind a pipeline state object
    fn bind_pipeline(&mut self, pipeline: Pipeline);

    /// Bind the primitive topology
    fn bind_primitive_topology(&mut self, topology: PrimitiveTopology);

    /// Bind viewports starting at slot 0
    fn bind_viewports(&mut self, viewports: &[Viewport]);

    /// Bind scissor rectangles starting at slot 0
    fn bind_scissor_rects(&mut self, rects: &[Rect]);

    /// Bind vertex buffers starting at `first`
    fn bind_vertex_buffers(&mut self, first: u32, buffers: &[Resource]);

    /// Bind the index buffer
    fn bind_index_buffer(&mut self, buffer: Resource, format: Format);

    /// Bind render targets and the depth stencil view
    fn bind_render_targets(&mut self, render_targets: &[ResourceView], depth_stencil: ResourceView);

    /// Bind shader resource views starting at `first`
    fn bind_shader_resource_views(&mut self, first: u32, views: &[ResourceView]);

    /// Bind samplers starting at `first`
    fn bind_samplers(&mut self, first: u32, samplers: &[Sampler]);

    /// Snapshot of all currently bound pipeline state
    fn capture_state(&self) -> PipelineStateSnapshot;

    /// Rebind a previously captured snapshot
    fn apply_state(&mut self, state: &PipelineStateSnapshot);
}

/// Native command queue
pub trait NativeQueue: NativeObject + Send {
    /// Kinds of work this queue accepts
    fn queue_type(&self) -> QueueType;

    /// The queue's implicit command list, for APIs that have one
    ///
    /// Called once when the queue is wrapped.
    fn create_immediate_command_list(&mut self) -> Option<Box<dyn NativeCommandList>>;

    /// Submit a recorded command list
    fn submit(&mut self, command_list: &dyn NativeCommandList) -> BackendResult<()>;

    /// Submit everything recorded on the immediate command list so far
    fn flush(&mut self) -> BackendResult<()>;
}

/// Native swap chain
pub trait NativeSwapchain: NativeObject + Send {
    /// Current description of the swap chain
    fn desc(&self) -> BackendResult<SwapchainDesc>;

    /// Back buffer at `index`
    fn back_buffer(&self, index: u32) -> Option<Resource>;

    /// Number of back buffers
    fn back_buffer_count(&self) -> u32;

    /// Index of the back buffer the host renders to this frame
    fn current_back_buffer_index(&self) -> u32;

    /// Present the current back buffer
    fn present(&mut self) -> BackendResult<()>;

    /// Recreate the back buffers with a new size
    fn resize_buffers(&mut self, width: u32, height: u32) -> BackendResult<()>;
}
