//! Generic API object wrapper
//!
//! Every object the layer hands to observers (device, command list, command
//! queue, swapchain) is an [`ApiObjectImpl`]: one native object paired with a
//! user data table and a set of composed capabilities. Observers use the
//! table to attach their own bookkeeping to an object without the object's
//! definition knowing about them.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::handle::Guid;

/// Opaque observer data stored in a user data table
pub type UserData = dyn Any + Send + Sync;

/// Native objects that can report their backend handle
pub trait NativeObject {
    /// The backend native handle as a 64-bit integer
    fn native_handle(&self) -> u64;
}

impl<T: NativeObject + ?Sized> NativeObject for Box<T> {
    fn native_handle(&self) -> u64 {
        (**self).native_handle()
    }
}

/// Uniform interface of every wrapped API object
///
/// Event callbacks only ever see shared references, so the user data
/// operations take `&self`; the table synchronizes internally.
pub trait ApiObject {
    /// Backend native handle of the wrapped object
    ///
    /// This is a read-only query; the value must never be used to take over
    /// ownership of the native object.
    fn get_native_object(&self) -> u64;

    /// Look up data previously attached under `guid`
    fn get_user_data(&self, guid: &Guid) -> Option<Arc<UserData>>;

    /// Attach data under `guid`, replacing any previous entry
    ///
    /// Passing `None` removes an existing entry and is a no-op when nothing
    /// is attached.
    fn set_user_data(&self, guid: Guid, data: Option<Arc<UserData>>);

    /// Remove and return the data attached under `guid`
    fn take_user_data(&self, guid: &Guid) -> Option<Arc<UserData>>;

    /// Typed lookup of attached data
    fn get_user_data_as<T: Any + Send + Sync>(&self, guid: &Guid) -> Option<Arc<T>>
    where
        Self: Sized,
    {
        self.get_user_data(guid)?.downcast::<T>().ok()
    }
}

struct UserDataEntry {
    guid: Guid,
    data: Arc<UserData>,
}

/// Table mapping 128-bit identifiers to observer data
///
/// Tables are small (a handful of add-ons at most), so a linear scan beats
/// hashing here.
#[derive(Default)]
pub struct UserDataTable {
    entries: Mutex<Vec<UserDataEntry>>,
}

impl UserDataTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<UserDataEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up an entry
    pub fn get(&self, guid: &Guid) -> Option<Arc<UserData>> {
        self.entries()
            .iter()
            .find(|entry| entry.guid == *guid)
            .map(|entry| Arc::clone(&entry.data))
    }

    /// Insert, overwrite or (with `None`) remove an entry
    pub fn set(&self, guid: Guid, data: Option<Arc<UserData>>) {
        let mut entries = self.entries();
        let position = entries.iter().position(|entry| entry.guid == guid);

        match (position, data) {
            (Some(index), Some(data)) => entries[index].data = data,
            (Some(index), None) => {
                entries.swap_remove(index);
            }
            (None, Some(data)) => entries.push(UserDataEntry { guid, data }),
            (None, None) => {}
        }
    }

    /// Remove and return an entry
    pub fn take(&self, guid: &Guid) -> Option<Arc<UserData>> {
        let mut entries = self.entries();
        let index = entries.iter().position(|entry| entry.guid == *guid)?;
        Some(entries.swap_remove(index).data)
    }

    /// Number of attached entries
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether nothing is attached
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl std::fmt::Debug for UserDataTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries().iter().map(|entry| entry.guid))
            .finish()
    }
}

/// A native object paired with a user data table and composed capabilities
///
/// `T` is the uniquely owned native reference; `C` holds the capability
/// state the concrete object type is built from (for example the owning
/// device of a command list). The wrapper is deliberately not `Clone`: an
/// API object has exactly one identity.
///
/// # Panics
///
/// Dropping a wrapper that still carries user data panics. Observers must
/// remove their attachments (typically in the matching destroy event) before
/// the object goes away.
pub struct ApiObjectImpl<T: NativeObject, C = ()> {
    orig: T,
    capabilities: C,
    user_data: UserDataTable,
}

impl<T: NativeObject, C> ApiObjectImpl<T, C> {
    /// Bind a wrapper to a native object
    pub fn new(orig: T, capabilities: C) -> Self {
        Self {
            orig,
            capabilities,
            user_data: UserDataTable::new(),
        }
    }

    /// The wrapped native object
    pub fn orig(&self) -> &T {
        &self.orig
    }

    /// The wrapped native object, mutably
    pub fn orig_mut(&mut self) -> &mut T {
        &mut self.orig
    }

    /// Composed capabilities
    pub fn capabilities(&self) -> &C {
        &self.capabilities
    }

    /// Composed capabilities, mutably
    pub fn capabilities_mut(&mut self) -> &mut C {
        &mut self.capabilities
    }

    /// Number of user data entries currently attached
    pub fn user_data_len(&self) -> usize {
        self.user_data.len()
    }
}

impl<T: NativeObject, C> ApiObject for ApiObjectImpl<T, C> {
    fn get_native_object(&self) -> u64 {
        self.orig.native_handle()
    }

    fn get_user_data(&self, guid: &Guid) -> Option<Arc<UserData>> {
        self.user_data.get(guid)
    }

    fn set_user_data(&self, guid: Guid, data: Option<Arc<UserData>>) {
        self.user_data.set(guid, data);
    }

    fn take_user_data(&self, guid: &Guid) -> Option<Arc<UserData>> {
        self.user_data.take(guid)
    }
}

impl<T: NativeObject, C> Drop for ApiObjectImpl<T, C> {
    fn drop(&mut self) {
        if !self.user_data.is_empty() && !std::thread::panicking() {
            panic!(
                "API object {:#x} destroyed with {} user data entries still attached: {:?}",
                self.orig.native_handle(),
                self.user_data.len(),
                self.user_data
            );
        }
    }
}

/// Implement [`ApiObject`] for a type by delegating to an [`ApiObjectImpl`] field
macro_rules! delegate_api_object {
    ($ty:ty, $field:ident) => {
        impl $crate::api::object::ApiObject for $ty {
            fn get_native_object(&self) -> u64 {
                self.$field.get_native_object()
            }

            fn get_user_data(
                &self,
                guid: &$crate::api::handle::Guid,
            ) -> Option<std::sync::Arc<$crate::api::object::UserData>> {
                self.$field.get_user_data(guid)
            }

            fn set_user_data(
                &self,
                guid: $crate::api::handle::Guid,
                data: Option<std::sync::Arc<$crate::api::object::UserData>>,
            ) {
                self.$field.set_user_data(guid, data);
            }

            fn take_user_data(
                &self,
                guid: &$crate::api::handle::Guid,
            ) -> Option<std::sync::Arc<$crate::api::object::UserData>> {
                self.$field.take_user_data(guid)
            }
        }
    };
}

pub(crate) use delegate_api_object;

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeNative(u64);

    impl NativeObject for FakeNative {
        fn native_handle(&self) -> u64 {
            self.0
        }
    }

    const KEY_A: Guid = Guid(0x1111_2222_3333_4444_5555_6666_7777_8888);
    const KEY_B: Guid = Guid(0xaaaa_bbbb_cccc_dddd_eeee_ffff_0000_1111);

    #[test]
    fn test_native_object_query() {
        let object = ApiObjectImpl::new(FakeNative(0xdead_beef), ());
        assert_eq!(object.get_native_object(), 0xdead_beef);
        assert_eq!(object.get_native_object(), 0xdead_beef);
    }

    #[test]
    fn test_get_after_set_returns_latest_value() {
        let object = ApiObjectImpl::new(FakeNative(1), ());

        object.set_user_data(KEY_A, Some(Arc::new(10_u32)));
        assert_eq!(object.get_user_data_as::<u32>(&KEY_A).as_deref(), Some(&10));

        object.set_user_data(KEY_A, Some(Arc::new(20_u32)));
        assert_eq!(object.get_user_data_as::<u32>(&KEY_A).as_deref(), Some(&20));
        assert_eq!(object.user_data_len(), 1);

        object.set_user_data(KEY_A, None);
        assert!(object.get_user_data(&KEY_A).is_none());
        assert_eq!(object.user_data_len(), 0);
    }

    #[test]
    fn test_keys_are_independent() {
        let object = ApiObjectImpl::new(FakeNative(1), ());

        object.set_user_data(KEY_A, Some(Arc::new("first")));
        object.set_user_data(KEY_B, Some(Arc::new(String::from("second"))));

        assert_eq!(object.get_user_data_as::<&'static str>(&KEY_A).as_deref(), Some(&"first"));
        assert_eq!(
            object.get_user_data_as::<String>(&KEY_B).as_deref().map(String::as_str),
            Some("second")
        );
        // Wrong type downcast reports not found
        assert!(object.get_user_data_as::<u64>(&KEY_A).is_none());

        object.set_user_data(KEY_A, None);
        assert!(object.get_user_data(&KEY_A).is_none());
        assert!(object.get_user_data(&KEY_B).is_some());

        object.take_user_data(&KEY_B);
    }

    #[test]
    fn test_remove_absent_key_is_noop() {
        let object = ApiObjectImpl::new(FakeNative(1), ());
        object.set_user_data(KEY_A, None);
        assert!(object.get_user_data(&KEY_A).is_none());
        assert!(object.take_user_data(&KEY_A).is_none());
    }

    #[test]
    fn test_take_user_data_returns_ownership() {
        let object = ApiObjectImpl::new(FakeNative(1), ());
        object.set_user_data(KEY_A, Some(Arc::new(vec![1_u8, 2, 3])));

        let data = object.take_user_data(&KEY_A).unwrap();
        assert_eq!(data.downcast_ref::<Vec<u8>>(), Some(&vec![1, 2, 3]));
        assert_eq!(object.user_data_len(), 0);
    }

    #[test]
    fn test_capabilities_are_composed() {
        #[derive(Debug, PartialEq)]
        struct Owner(u32);

        let mut object = ApiObjectImpl::new(FakeNative(1), Owner(3));
        assert_eq!(object.capabilities(), &Owner(3));
        object.capabilities_mut().0 = 4;
        assert_eq!(object.capabilities(), &Owner(4));
    }

    #[test]
    #[should_panic(expected = "user data entries still attached")]
    fn test_drop_with_user_data_panics() {
        let object = ApiObjectImpl::new(FakeNative(0x42), ());
        object.set_user_data(KEY_A, Some(Arc::new(1_u8)));
        drop(object);
    }
}
