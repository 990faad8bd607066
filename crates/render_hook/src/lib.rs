//! # Render Hook
//!
//! A graphics interception layer that sits between a host application and its
//! graphics driver. Native devices, command lists, queues and swapchains are
//! wrapped in API-neutral objects, and every notable operation on them is
//! reported to registered observers (add-ons) before it reaches the driver.
//!
//! ## Features
//!
//! - **API-neutral object model**: one device/command list/queue/swapchain
//!   interface over D3D and Vulkan style drivers
//! - **Typed event registry**: lifecycle notifications and intercept events
//!   that let observers edit descriptions or skip commands
//! - **Add-on management**: load and unload observer packages as a unit
//! - **MSAA presentation**: multisampled back buffers are resolved for effects
//!   and copied back, leaving the host's pipeline state untouched
//! - **Null backend**: a recording driver for tests and host simulations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use render_hook::prelude::*;
//! use render_hook::backend::null::NullDriver;
//!
//! struct DrawCounter;
//!
//! impl Addon for DrawCounter {
//!     fn name(&self) -> &str {
//!         "draw_counter"
//!     }
//!
//!     fn on_load(&mut self, scope: &mut AddonScope<'_>) {
//!         scope.register::<events::Draw>(Arc::new(
//!             |_list: &CommandList, vertices: u32, _instances: u32, _first: u32, _first_instance: u32| {
//!                 log::info!("draw of {} vertices", vertices);
//!                 false
//!             },
//!         ));
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut addons = AddonManager::new();
//!     addons.load(Box::new(DrawCounter))?;
//!
//!     let driver = NullDriver::new();
//!     let device = Device::new(driver.create_device(), LayerConfig::default())?;
//!     let mut queue = CommandQueue::new(&device, driver.create_queue());
//!     let desc = SwapchainDesc {
//!         width: 1280,
//!         height: 720,
//!         format: Format::R8G8B8A8Unorm,
//!         sample_count: 4,
//!         buffer_count: 2,
//!         window: WindowHandle(0x1),
//!         ..SwapchainDesc::default()
//!     };
//!     let mut swapchain = device.create_swapchain(&desc, |desc| driver.create_swapchain(desc))?;
//!
//!     queue.present(&mut swapchain)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod api;
pub mod addon;
pub mod backend;
pub mod runtime;

#[cfg(test)]
mod tests;

/// Common imports for layer users and add-on authors
pub mod prelude {
    pub use crate::{
        addon::{
            events, registry, Addon, AddonError, AddonEvent, AddonManager, AddonScope,
            EventRegistry,
        },
        api::{
            ApiObject, CommandList, CommandQueue, Device, DeviceApi, DeviceContext, DeviceError,
            Format, Guid, Pipeline, Resource, ResourceDesc, ResourceUsage, ResourceView,
            ResourceViewDesc, Sampler, SamplerDesc, Swapchain, SwapchainDesc, SwapchainError,
            Viewport, WindowHandle,
        },
        backend::{BackendError, BackendResult},
        config::{Config, ConfigError, LayerConfig},
        runtime::{EffectRuntime, RuntimeError},
    };
}
