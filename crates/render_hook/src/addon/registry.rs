//! Typed callback registry
//!
//! Callbacks are stored per [`AddonEvent`] in registration order. Dispatch
//! clones the callback list under a read lock and calls it after the lock is
//! released, so callbacks are free to register or unregister (the change is
//! seen by the next dispatch) and several threads may dispatch at once.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::events::{AddonEvent, EventKind, InterceptEvent, LifecycleEvent};

/// Shared handle to a registered callback of kind `E`
pub type Callback<E> = Arc<<E as EventKind>::Callback>;

struct Registration {
    /// Address of the callback allocation, used for identity on unregister
    addr: usize,
    /// `Arc<E::Callback>` for the kind this entry is filed under
    callback: Box<dyn Any + Send + Sync>,
}

fn callback_addr<E: EventKind>(callback: &Callback<E>) -> usize {
    Arc::as_ptr(callback).cast::<()>() as usize
}

/// Ordered callback lists keyed by event kind
#[derive(Default)]
pub struct EventRegistry {
    callbacks: RwLock<HashMap<AddonEvent, Vec<Registration>>>,
}

impl EventRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback for kind `E`
    ///
    /// The same callback may be registered more than once; it is then called
    /// once per registration.
    pub fn register<E: EventKind>(&self, callback: Callback<E>) {
        let registration = Registration {
            addr: callback_addr::<E>(&callback),
            callback: Box::new(callback),
        };

        let mut callbacks = self.callbacks.write().unwrap_or_else(PoisonError::into_inner);
        callbacks.entry(E::EVENT).or_default().push(registration);
        log::trace!("Registered callback for {:?}", E::EVENT);
    }

    /// Remove the first registration of `callback` for kind `E`
    ///
    /// Returns `false` when the callback is not registered.
    pub fn unregister<E: EventKind>(&self, callback: &Callback<E>) -> bool {
        let addr = callback_addr::<E>(callback);

        let mut callbacks = self.callbacks.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = callbacks.get_mut(&E::EVENT) else {
            return false;
        };
        let Some(index) = list.iter().position(|registration| registration.addr == addr) else {
            return false;
        };

        list.remove(index);
        if list.is_empty() {
            callbacks.remove(&E::EVENT);
        }
        log::trace!("Unregistered callback for {:?}", E::EVENT);
        true
    }

    /// Number of callbacks registered for kind `E`
    pub fn callback_count<E: EventKind>(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&E::EVENT)
            .map_or(0, Vec::len)
    }

    /// Whether any callback is registered for kind `E`
    pub fn has_callbacks<E: EventKind>(&self) -> bool {
        self.callback_count::<E>() > 0
    }

    /// Remove every registration of every kind
    pub fn clear(&self) {
        self.callbacks.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn snapshot<E: EventKind>(&self) -> Vec<Callback<E>> {
        let callbacks = self.callbacks.read().unwrap_or_else(PoisonError::into_inner);
        callbacks
            .get(&E::EVENT)
            .map(|list| {
                list.iter()
                    .filter_map(|registration| registration.callback.downcast_ref::<Callback<E>>())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Call every callback of lifecycle kind `E` in registration order
    ///
    /// `call` receives each callback and supplies the arguments.
    pub fn invoke<E: LifecycleEvent>(&self, mut call: impl FnMut(&E::Callback)) {
        for callback in self.snapshot::<E>() {
            call(&*callback);
        }
    }

    /// Call callbacks of intercept kind `E` in registration order until one
    /// returns `true`
    ///
    /// Returns whether any callback took over the operation. Arguments passed
    /// by mutable reference carry edits from earlier callbacks to later ones.
    pub fn invoke_intercept<E: InterceptEvent>(&self, mut call: impl FnMut(&E::Callback) -> bool) -> bool {
        for callback in self.snapshot::<E>() {
            if call(&*callback) {
                log::trace!("{:?} intercepted by an observer", E::EVENT);
                return true;
            }
        }
        false
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let callbacks = self.callbacks.read().unwrap_or_else(PoisonError::into_inner);
        let mut map = f.debug_map();
        for (event, list) in callbacks.iter() {
            map.entry(event, &list.len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addon::events::{CreateSwapchain, DestroySwapchain, InitEffectRuntime, InitSwapchain};
    use crate::api::desc::SwapchainDesc;
    use crate::api::swapchain::Swapchain;
    use crate::runtime::EffectRuntime;
    use std::sync::Mutex;

    #[test]
    fn test_intercept_runs_in_registration_order_and_sees_edits() {
        let registry = EventRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first_seen = Arc::clone(&seen);
        registry.register::<CreateSwapchain>(Arc::new(move |desc: &mut SwapchainDesc| {
            first_seen.lock().unwrap().push(("first", desc.width));
            desc.width = 1280;
            false
        }));
        let second_seen = Arc::clone(&seen);
        registry.register::<CreateSwapchain>(Arc::new(move |desc: &mut SwapchainDesc| {
            second_seen.lock().unwrap().push(("second", desc.width));
            desc.height = 720;
            false
        }));

        let mut desc = SwapchainDesc { width: 800, height: 600, ..SwapchainDesc::default() };
        let taken = registry.invoke_intercept::<CreateSwapchain>(|callback| callback(&mut desc));

        assert!(!taken);
        assert_eq!(*seen.lock().unwrap(), vec![("first", 800), ("second", 1280)]);
        assert_eq!((desc.width, desc.height), (1280, 720));
    }

    #[test]
    fn test_lifecycle_runs_every_callback_in_registration_order() {
        let registry = Arc::new(EventRegistry::new());
        let calls = Arc::new(Mutex::new(Vec::new()));

        for name in ["overlay", "stats", "capture"] {
            let calls = Arc::clone(&calls);
            registry.register::<InitEffectRuntime>(Arc::new(move |runtime: &EffectRuntime| {
                assert!(!runtime.is_initialized());
                calls.lock().unwrap().push(name);
            }));
        }

        let runtime = EffectRuntime::new(Arc::clone(&registry), true);
        registry.invoke::<InitEffectRuntime>(|callback| callback(&runtime));
        registry.invoke::<InitEffectRuntime>(|callback| callback(&runtime));

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["overlay", "stats", "capture", "overlay", "stats", "capture"]
        );
    }

    #[test]
    fn test_intercept_short_circuits_on_first_true() {
        let registry = EventRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for (name, result) in [("a", false), ("b", true), ("c", false)] {
            let calls = Arc::clone(&calls);
            registry.register::<CreateSwapchain>(Arc::new(move |_desc: &mut SwapchainDesc| {
                calls.lock().unwrap().push(name);
                result
            }));
        }

        let mut desc = SwapchainDesc::default();
        assert!(registry.invoke_intercept::<CreateSwapchain>(|callback| callback(&mut desc)));
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_intercept_without_callbacks_returns_false() {
        let registry = EventRegistry::new();
        let mut desc = SwapchainDesc::default();
        assert!(!registry.invoke_intercept::<CreateSwapchain>(|callback| callback(&mut desc)));
    }

    #[test]
    fn test_unregister_removes_first_matching_only() {
        let registry = EventRegistry::new();
        let callback: Callback<InitSwapchain> = Arc::new(|_swapchain: &Swapchain| {});
        let other: Callback<InitSwapchain> = Arc::new(|_swapchain: &Swapchain| {});

        registry.register::<InitSwapchain>(Arc::clone(&callback));
        registry.register::<InitSwapchain>(Arc::clone(&other));
        registry.register::<InitSwapchain>(Arc::clone(&callback));
        assert_eq!(registry.callback_count::<InitSwapchain>(), 3);

        assert!(registry.unregister::<InitSwapchain>(&callback));
        assert_eq!(registry.callback_count::<InitSwapchain>(), 2);
        assert!(registry.unregister::<InitSwapchain>(&callback));
        assert!(!registry.unregister::<InitSwapchain>(&callback));
        assert_eq!(registry.callback_count::<InitSwapchain>(), 1);
    }

    #[test]
    fn test_unregister_is_per_kind() {
        let registry = EventRegistry::new();
        let callback: Callback<InitSwapchain> = Arc::new(|_swapchain: &Swapchain| {});
        registry.register::<InitSwapchain>(Arc::clone(&callback));

        // Same signature, different kind
        let as_destroy: Callback<DestroySwapchain> = callback.clone();
        assert!(!registry.unregister::<DestroySwapchain>(&as_destroy));
        assert!(registry.has_callbacks::<InitSwapchain>());
    }

    #[test]
    fn test_callback_may_register_during_dispatch() {
        let registry = Arc::new(EventRegistry::new());
        let inner_registry = Arc::clone(&registry);

        registry.register::<CreateSwapchain>(Arc::new(move |_desc: &mut SwapchainDesc| {
            inner_registry.register::<CreateSwapchain>(Arc::new(|_desc: &mut SwapchainDesc| true));
            false
        }));

        let mut desc = SwapchainDesc::default();
        // The callback added during dispatch only runs on the next dispatch
        assert!(!registry.invoke_intercept::<CreateSwapchain>(|callback| callback(&mut desc)));
        assert!(registry.invoke_intercept::<CreateSwapchain>(|callback| callback(&mut desc)));
    }
}
