//! Layer configuration
//!
//! Settings the host can drop next to its executable to tune how the
//! interception layer behaves. Every field has a default so partial files work.

use serde::{Serialize, Deserialize};

use super::Config;
use crate::api::desc::FilterMode;

/// Filter used by the sampler that stretches the resolved image back into a
/// multisampled back buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CopyFilter {
    /// Nearest texel, exact when resolved and primary buffers have the same size
    #[default]
    Point,
    /// Bilinear filtering
    Linear,
}

impl CopyFilter {
    /// Sampler filter mode matching this copy filter
    pub fn filter_mode(self) -> FilterMode {
        match self {
            Self::Point => FilterMode::MinMagMipPoint,
            Self::Linear => FilterMode::MinMagMipLinear,
        }
    }
}

/// Interception layer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Default log level (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
    /// Whether effect runtimes notify observers on present
    pub effects_enabled: bool,
    /// Sampler filter for the MSAA copy-back draw
    pub copy_filter: CopyFilter,
    /// Skip Vulkan devices that are not created with the swapchain extension
    pub skip_devices_without_swapchain: bool,
    /// Log the full swapchain description table when a swapchain is created
    pub dump_swapchain_desc: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            effects_enabled: true,
            copy_filter: CopyFilter::Point,
            skip_devices_without_swapchain: true,
            dump_swapchain_desc: true,
        }
    }
}

impl Config for LayerConfig {}

impl LayerConfig {
    /// Log level parsed from [`LayerConfig::log_level`]
    pub fn level_filter(&self) -> log::LevelFilter {
        crate::foundation::logging::parse_level(&self.log_level)
    }
}
