//! Unified graphics object model
//!
//! This module provides:
//! - Opaque handles and 128-bit identifiers
//! - The API object wrapper with observer user data
//! - Formats and object descriptions shared by every backend
//! - Device, command list, command queue and swapchain wrappers
//! - Pipeline state capture and restore

pub mod command;
pub mod desc;
pub mod device;
pub mod format;
pub mod handle;
pub mod object;
pub mod state;
pub mod swapchain;

pub use command::{CommandList, CommandQueue};
pub use desc::*;
pub use device::{ChildKind, Device, DeviceContext, DeviceError, DeviceProperties, OwnedResource, OwnedResourceView};
pub use format::{format_to_default_typed, format_to_typeless, Format, SrgbVariant};
pub use handle::{Guid, Pipeline, Resource, ResourceView, Sampler, WindowHandle};
pub use object::{ApiObject, ApiObjectImpl, NativeObject, UserData, UserDataTable};
pub use state::{PipelineStateSnapshot, StateBlock};
pub use swapchain::{Swapchain, SwapchainError};
