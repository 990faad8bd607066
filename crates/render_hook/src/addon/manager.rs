//! Add-on load and unload bookkeeping

use std::sync::Arc;

use thiserror::Error;

use super::events::EventKind;
use super::registry::{Callback, EventRegistry};

/// Add-on management errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddonError {
    /// An add-on with this name is already loaded
    #[error("Add-on '{0}' is already loaded")]
    AlreadyLoaded(String),

    /// No add-on with this name is loaded
    #[error("Add-on '{0}' is not loaded")]
    NotLoaded(String),
}

/// An observer package that registers callbacks while loaded
pub trait Addon {
    /// Unique name of the add-on
    fn name(&self) -> &str;

    /// Register callbacks through `scope`
    fn on_load(&mut self, scope: &mut AddonScope<'_>);

    /// Called after the add-on's callbacks were removed
    fn on_unload(&mut self) {}
}

type Unregister = Box<dyn FnOnce(&EventRegistry) + Send>;

/// Registration handle passed to [`Addon::on_load`]
///
/// Every callback registered through a scope is remembered so that unloading
/// the add-on removes exactly those callbacks.
pub struct AddonScope<'a> {
    registry: &'a EventRegistry,
    registrations: Vec<Unregister>,
}

impl<'a> AddonScope<'a> {
    fn new(registry: &'a EventRegistry) -> Self {
        Self {
            registry,
            registrations: Vec::new(),
        }
    }

    /// Register `callback` for kind `E`
    pub fn register<E: EventKind>(&mut self, callback: Callback<E>) {
        self.registry.register::<E>(Arc::clone(&callback));
        self.registrations.push(Box::new(move |registry: &EventRegistry| {
            registry.unregister::<E>(&callback);
        }));
    }

    /// Number of callbacks registered through this scope
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }
}

struct LoadedAddon {
    addon: Box<dyn Addon>,
    registrations: Vec<Unregister>,
}

/// Loads and unloads add-ons against one registry
pub struct AddonManager {
    registry: Arc<EventRegistry>,
    loaded: Vec<LoadedAddon>,
}

impl AddonManager {
    /// Manager bound to the process-wide registry
    pub fn new() -> Self {
        Self::with_registry(super::registry())
    }

    /// Manager bound to a specific registry
    pub fn with_registry(registry: Arc<EventRegistry>) -> Self {
        Self {
            registry,
            loaded: Vec::new(),
        }
    }

    /// The registry add-ons register into
    pub fn registry(&self) -> &Arc<EventRegistry> {
        &self.registry
    }

    /// Load an add-on and let it register its callbacks
    pub fn load(&mut self, mut addon: Box<dyn Addon>) -> Result<(), AddonError> {
        let name = addon.name().to_string();
        if self.is_loaded(&name) {
            return Err(AddonError::AlreadyLoaded(name));
        }

        let mut scope = AddonScope::new(&self.registry);
        addon.on_load(&mut scope);
        let registrations = scope.registrations;

        log::info!("Loaded add-on '{}' ({} callbacks)", name, registrations.len());
        self.loaded.push(LoadedAddon { addon, registrations });
        Ok(())
    }

    /// Remove an add-on's callbacks and unload it
    pub fn unload(&mut self, name: &str) -> Result<(), AddonError> {
        let index = self
            .loaded
            .iter()
            .position(|loaded| loaded.addon.name() == name)
            .ok_or_else(|| AddonError::NotLoaded(name.to_string()))?;

        let loaded = self.loaded.remove(index);
        self.release(loaded);
        Ok(())
    }

    /// Unload every add-on, most recently loaded first
    pub fn unload_all(&mut self) {
        while let Some(loaded) = self.loaded.pop() {
            self.release(loaded);
        }
    }

    /// Whether an add-on with this name is loaded
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.iter().any(|loaded| loaded.addon.name() == name)
    }

    /// Names of loaded add-ons in load order
    pub fn loaded_names(&self) -> Vec<&str> {
        self.loaded.iter().map(|loaded| loaded.addon.name()).collect()
    }

    fn release(&self, loaded: LoadedAddon) {
        let LoadedAddon { mut addon, registrations } = loaded;
        for unregister in registrations {
            unregister(&self.registry);
        }
        addon.on_unload();
        log::info!("Unloaded add-on '{}'", addon.name());
    }
}

impl Default for AddonManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AddonManager {
    fn drop(&mut self) {
        self.unload_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::events::{CreateSwapchain, InitSwapchain};
    use crate::api::desc::SwapchainDesc;
    use crate::api::swapchain::Swapchain;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FormatForcer {
        unloaded: Arc<AtomicBool>,
    }

    impl Addon for FormatForcer {
        fn name(&self) -> &str {
            "format_forcer"
        }

        fn on_load(&mut self, scope: &mut AddonScope<'_>) {
            scope.register::<CreateSwapchain>(Arc::new(|desc: &mut SwapchainDesc| {
                desc.buffer_count = 3;
                true
            }));
            scope.register::<InitSwapchain>(Arc::new(|_swapchain: &Swapchain| {}));
        }

        fn on_unload(&mut self) {
            self.unloaded.store(true, Ordering::SeqCst);
        }
    }

    fn forcer() -> (Box<dyn Addon>, Arc<AtomicBool>) {
        let unloaded = Arc::new(AtomicBool::new(false));
        (Box::new(FormatForcer { unloaded: Arc::clone(&unloaded) }), unloaded)
    }

    #[test]
    fn test_unload_removes_exactly_its_callbacks() {
        let registry = Arc::new(EventRegistry::new());
        let foreign: Callback<CreateSwapchain> = Arc::new(|_desc: &mut SwapchainDesc| false);
        registry.register::<CreateSwapchain>(Arc::clone(&foreign));

        let mut manager = AddonManager::with_registry(Arc::clone(&registry));
        let (addon, unloaded) = forcer();
        manager.load(addon).unwrap();
        assert_eq!(registry.callback_count::<CreateSwapchain>(), 2);
        assert_eq!(registry.callback_count::<InitSwapchain>(), 1);

        manager.unload("format_forcer").unwrap();
        assert!(unloaded.load(Ordering::SeqCst));
        assert_eq!(registry.callback_count::<CreateSwapchain>(), 1);
        assert_eq!(registry.callback_count::<InitSwapchain>(), 0);
        assert!(registry.unregister::<CreateSwapchain>(&foreign));
    }

    #[test]
    fn test_load_twice_is_rejected() {
        let registry = Arc::new(EventRegistry::new());
        let mut manager = AddonManager::with_registry(Arc::clone(&registry));

        manager.load(forcer().0).unwrap();
        assert_eq!(
            manager.load(forcer().0),
            Err(AddonError::AlreadyLoaded("format_forcer".to_string()))
        );
        assert_eq!(registry.callback_count::<CreateSwapchain>(), 1);
        assert_eq!(manager.loaded_names(), vec!["format_forcer"]);
    }

    #[test]
    fn test_unload_unknown_name() {
        let mut manager = AddonManager::with_registry(Arc::new(EventRegistry::new()));
        assert_eq!(manager.unload("missing"), Err(AddonError::NotLoaded("missing".to_string())));
    }

    #[test]
    fn test_drop_unloads_everything() {
        let registry = Arc::new(EventRegistry::new());
        let (addon, unloaded) = forcer();
        {
            let mut manager = AddonManager::with_registry(Arc::clone(&registry));
            manager.load(addon).unwrap();
        }
        assert!(unloaded.load(Ordering::SeqCst));
        assert!(!registry.has_callbacks::<CreateSwapchain>());
    }
}
