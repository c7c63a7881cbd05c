//! Arena indices for the flat model
//!
//! Declarations, types and libraries all live in vectors owned by the
//! `Compilation`; everything else refers to them through these small
//! copyable handles.

use std::fmt;

macro_rules! define_id_type {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn as_raw(self) -> u32 {
                self.0
            }

            /// Position in the owning arena
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }

            pub const fn invalid() -> Self {
                Self(u32::MAX)
            }

            pub(crate) fn from_index(index: usize) -> Self {
                debug_assert!(index < u32::MAX as usize, "arena overflow");
                Self(index as u32)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", stringify!($name), self.0)
                } else {
                    write!(f, "{}(<invalid>)", stringify!($name))
                }
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.as_raw()
            }
        }
    };
}

define_id_type! {
    /// A declaration in the compilation-wide declaration arena
    DeclId
}

define_id_type! {
    /// An interned type in the typespace
    TypeId
}

define_id_type! {
    /// A library compiled (or attempted) by this compilation
    LibraryId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip_and_display() {
        let id = DeclId::from_index(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.as_raw(), 7);
        assert!(id.is_valid());
        assert_eq!(id.to_string(), "DeclId(7)");
    }

    #[test]
    fn test_default_is_invalid() {
        let id = TypeId::default();
        assert!(!id.is_valid());
        assert_eq!(id.to_string(), "TypeId(<invalid>)");
    }
}
