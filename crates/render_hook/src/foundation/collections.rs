//! Specialized collection types

pub use slotmap::{SlotMap, DefaultKey};

use slotmap::{Key, KeyData};

/// Handle-based map using slot map for stable references
pub type HandleMap<T> = SlotMap<DefaultKey, T>;

/// Handle type for stable references
pub type Handle = DefaultKey;

/// Convert a slot map key into a raw 64-bit handle value
///
/// The value is never zero for a key produced by a [`SlotMap`], so it can be
/// used directly as a native object handle.
pub fn key_to_raw(key: Handle) -> u64 {
    key.data().as_ffi()
}

/// Convert a raw 64-bit handle value back into a slot map key
pub fn raw_to_key(raw: u64) -> Handle {
    KeyData::from_ffi(raw).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_handles_are_non_zero_and_stable() {
        let mut map: HandleMap<&str> = HandleMap::new();
        let a = map.insert("a");
        let b = map.insert("b");

        let raw_a = key_to_raw(a);
        assert_ne!(raw_a, 0);
        assert_ne!(raw_a, key_to_raw(b));
        assert_eq!(map.get(raw_to_key(raw_a)), Some(&"a"));
    }

    #[test]
    fn test_removed_handle_is_not_reused() {
        let mut map: HandleMap<u32> = HandleMap::new();
        let first = map.insert(1);
        let raw_first = key_to_raw(first);
        map.remove(first);

        let second = map.insert(2);
        assert_ne!(key_to_raw(second), raw_first);
        assert!(map.get(raw_to_key(raw_first)).is_none());
    }
}
