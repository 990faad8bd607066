//! Add-on event system
//!
//! Observers (add-ons) register typed callbacks for the [`events`] the layer
//! fires around every wrapped call. Objects receive their registry when they
//! are created; hosts that do not care use the process-wide one returned by
//! [`registry`].

pub mod events;
pub mod manager;
pub mod registry;

use std::sync::Arc;

use once_cell::sync::Lazy;

pub use events::{AddonEvent, EventKind, InterceptEvent, LifecycleEvent};
pub use manager::{Addon, AddonError, AddonManager, AddonScope};
pub use registry::{Callback, EventRegistry};

static GLOBAL_REGISTRY: Lazy<Arc<EventRegistry>> = Lazy::new(|| {
    log::debug!("Creating process-wide event registry");
    Arc::new(EventRegistry::new())
});

/// The process-wide event registry
pub fn registry() -> Arc<EventRegistry> {
    Arc::clone(&GLOBAL_REGISTRY)
}
