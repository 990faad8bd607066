//! Pipeline state capture and restore
//!
//! The layer draws into the host's command stream during present. Whatever
//! it binds must be undone before control returns to the host, so the full
//! pipeline state is captured first and re-applied afterwards.

use super::desc::{PrimitiveTopology, Rect, Viewport};
use super::format::Format;
use super::handle::{Pipeline, Resource, ResourceView, Sampler};
use crate::backend::NativeCommandList;

/// Everything a command list has bound at one point in time
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineStateSnapshot {
    /// Bound pipeline state object
    pub pipeline: Pipeline,
    /// Primitive topology
    pub topology: PrimitiveTopology,
    /// Vertex buffers from slot 0
    pub vertex_buffers: Vec<Resource>,
    /// Index buffer and its format
    pub index_buffer: (Resource, Format),
    /// Render target views
    pub render_targets: Vec<ResourceView>,
    /// Depth stencil view
    pub depth_stencil: ResourceView,
    /// Shader resource views from slot 0
    pub shader_resources: Vec<ResourceView>,
    /// Samplers from slot 0
    pub samplers: Vec<Sampler>,
    /// Viewports
    pub viewports: Vec<Viewport>,
    /// Scissor rectangles
    pub scissor_rects: Vec<Rect>,
}

/// Scoped holder of one captured [`PipelineStateSnapshot`]
///
/// A block is either empty or holds exactly one snapshot. `apply_and_release`
/// restores the snapshot and empties the block again.
#[derive(Debug, Default)]
pub struct StateBlock {
    captured: Option<PipelineStateSnapshot>,
}

impl StateBlock {
    /// Create an empty state block
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current state of `command_list`
    ///
    /// Capturing twice without applying in between replaces the earlier
    /// snapshot.
    pub fn capture(&mut self, command_list: &dyn NativeCommandList) {
        if self.captured.is_some() {
            log::warn!("State block captured again before the previous snapshot was applied");
        }
        self.captured = Some(command_list.capture_state());
    }

    /// Whether a snapshot is held
    pub fn is_captured(&self) -> bool {
        self.captured.is_some()
    }

    /// Restore the held snapshot onto `command_list` and drop it
    ///
    /// Does nothing when no snapshot is held.
    pub fn apply_and_release(&mut self, command_list: &mut dyn NativeCommandList) {
        if let Some(state) = self.captured.take() {
            command_list.apply_state(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::null::NullDriver;

    #[test]
    fn test_capture_then_apply_restores_state() {
        let driver = NullDriver::new();
        let mut list = driver.create_command_list();

        list.bind_pipeline(Pipeline::new(7));
        list.bind_viewports(&[Viewport::full(640, 480)]);

        let mut block = StateBlock::new();
        block.capture(&*list);
        assert!(block.is_captured());
        let before = list.capture_state();

        list.bind_pipeline(Pipeline::new(9));
        list.bind_viewports(&[Viewport::full(16, 16)]);
        list.bind_render_targets(&[ResourceView::new(3)], ResourceView::NULL);

        block.apply_and_release(&mut *list);
        assert!(!block.is_captured());
        assert_eq!(list.capture_state(), before);
    }

    #[test]
    fn test_apply_without_capture_is_noop() {
        let driver = NullDriver::new();
        let mut list = driver.create_command_list();
        list.bind_pipeline(Pipeline::new(5));

        let mut block = StateBlock::new();
        block.apply_and_release(&mut *list);
        assert_eq!(list.capture_state().pipeline, Pipeline::new(5));
    }
}
