//! Effect runtime
//!
//! One runtime lives inside every swapchain and is keyed by the swapchain's
//! output window. It does not render anything itself: on present it hands
//! the command list to observers of [`PresentEffectRuntime`], which is where
//! post-processing add-ons record their work.

use std::sync::Arc;

use thiserror::Error;

use crate::addon::events::{DestroyEffectRuntime, InitEffectRuntime, PresentEffectRuntime};
use crate::addon::EventRegistry;
use crate::api::command::CommandList;
use crate::api::format::Format;
use crate::api::handle::WindowHandle;

/// Effect runtime initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// No output window
    #[error("Invalid output window")]
    InvalidWindow,

    /// Zero sized back buffer
    #[error("Invalid back buffer extent {width}x{height}")]
    InvalidExtent {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },

    /// Back buffer format unknown
    #[error("Unsupported back buffer format {0:?}")]
    UnsupportedFormat(Format),
}

/// Per-swapchain post-processing lifecycle
pub struct EffectRuntime {
    registry: Arc<EventRegistry>,
    window: WindowHandle,
    width: u32,
    height: u32,
    format: Format,
    frame_count: u64,
    initialized: bool,
    effects_enabled: bool,
}

impl EffectRuntime {
    /// Create an uninitialized runtime firing events into `registry`
    pub fn new(registry: Arc<EventRegistry>, effects_enabled: bool) -> Self {
        Self {
            registry,
            window: WindowHandle::default(),
            width: 0,
            height: 0,
            format: Format::Unknown,
            frame_count: 0,
            initialized: false,
            effects_enabled,
        }
    }

    /// Bind the runtime to a window and back buffer geometry
    ///
    /// Fires [`InitEffectRuntime`] on success.
    pub fn on_init(
        &mut self,
        window: WindowHandle,
        width: u32,
        height: u32,
        format: Format,
    ) -> Result<(), RuntimeError> {
        if window.is_null() {
            return Err(RuntimeError::InvalidWindow);
        }
        if width == 0 || height == 0 {
            return Err(RuntimeError::InvalidExtent { width, height });
        }
        if format == Format::Unknown {
            return Err(RuntimeError::UnsupportedFormat(format));
        }

        self.window = window;
        self.width = width;
        self.height = height;
        self.format = format;
        self.initialized = true;

        log::info!("Initialized effect runtime for window {:#x} ({}x{})", window.0, width, height);
        let registry = Arc::clone(&self.registry);
        let this: &Self = self;
        registry.invoke::<InitEffectRuntime>(|callback| callback(this));
        Ok(())
    }

    /// Unbind the runtime
    ///
    /// Fires [`DestroyEffectRuntime`]. No-op while uninitialized.
    pub fn on_reset(&mut self) {
        if !self.initialized {
            return;
        }

        let registry = Arc::clone(&self.registry);
        let this: &Self = self;
        registry.invoke::<DestroyEffectRuntime>(|callback| callback(this));

        self.initialized = false;
        self.width = 0;
        self.height = 0;
        log::debug!("Reset effect runtime for window {:#x}", self.window.0);
    }

    /// Render effects for one frame on `command_list`
    pub fn on_present(&mut self, command_list: &mut CommandList) {
        if !self.initialized {
            return;
        }

        if self.effects_enabled {
            let registry = Arc::clone(&self.registry);
            let this: &Self = self;
            registry.invoke::<PresentEffectRuntime>(|callback| callback(this, &mut *command_list));
        }
        self.frame_count += 1;
    }

    /// Output window
    pub fn window(&self) -> WindowHandle {
        self.window
    }

    /// Back buffer width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Back buffer height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Back buffer format
    pub fn format(&self) -> Format {
        self.format
    }

    /// Frames presented since creation
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Whether the runtime is bound to a window
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether present notifies effect observers
    pub fn effects_enabled(&self) -> bool {
        self.effects_enabled
    }

    /// Toggle effect rendering
    pub fn set_effects_enabled(&mut self, enabled: bool) {
        if self.effects_enabled != enabled {
            log::info!("Effects {}", if enabled { "enabled" } else { "disabled" });
        }
        self.effects_enabled = enabled;
    }
}

impl std::fmt::Debug for EffectRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRuntime")
            .field("window", &self.window)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("frame_count", &self.frame_count)
            .field("initialized", &self.initialized)
            .finish()
    }
}
