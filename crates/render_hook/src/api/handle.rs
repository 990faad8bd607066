//! Opaque handles identifying native objects
//!
//! A handle is a plain 64-bit value naming a native object without owning it.
//! Zero is the null sentinel. Handles never encode lifetime; whoever created
//! the native object (host application or device factory) controls destruction.

use std::fmt;

macro_rules! define_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name {
            /// Backend specific native value
            pub handle: u64,
        }

        impl $name {
            /// The "no object" sentinel
            pub const NULL: Self = Self { handle: 0 };

            /// Wrap a native value
            pub const fn new(handle: u64) -> Self {
                Self { handle }
            }

            /// Whether this handle refers to no object
            pub const fn is_null(self) -> bool {
                self.handle == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#x})"), self.handle)
            }
        }

        impl From<u64> for $name {
            fn from(handle: u64) -> Self {
                Self { handle }
            }
        }
    };
}

define_handle!(
    /// Handle to a buffer or texture
    Resource
);
define_handle!(
    /// Handle to a view onto a resource (render target, depth stencil, shader resource, ...)
    ResourceView
);
define_handle!(
    /// Handle to a graphics or compute pipeline state object
    Pipeline
);
define_handle!(
    /// Handle to a sampler state object
    Sampler
);

/// Native window handle the effect runtime is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    /// Whether no window is attached
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// 128-bit identifier used to key observer data attached to API objects
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(pub u128);

impl Guid {
    /// Build an identifier from its 16 raw bytes (little endian)
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_le_bytes(bytes))
    }

    /// Raw bytes of this identifier (little endian)
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0.to_le_bytes()
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({:032x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handles() {
        assert!(Resource::NULL.is_null());
        assert!(Resource::default().is_null());
        assert!(!Resource::new(42).is_null());
        assert_eq!(Sampler::from(7).handle, 7);
    }

    #[test]
    fn test_handle_debug_format() {
        assert_eq!(format!("{:?}", ResourceView::new(255)), "ResourceView(0xff)");
    }

    #[test]
    fn test_guid_bytes() {
        let bytes = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        let guid = Guid::from_bytes(bytes);
        assert_eq!(guid.to_bytes(), bytes);
        assert_ne!(guid, Guid(0));
    }
}
