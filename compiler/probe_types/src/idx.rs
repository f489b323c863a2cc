//! Type handle.
//!
//! `TypeId` is the only way the rest of the compiler refers to a type.
//! Primitive scalars are pre-registered at fixed indices so they can be named
//! without a registry at hand.

use std::fmt;

/// A 32-bit index into the [`TypeRegistry`](crate::TypeRegistry).
///
/// Equality is handle equality. Two interned shapes with the same structure
/// compare equal; two structs with identical fields do not.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // === Primitive Types (indices 0-9) ===

    /// `void`, the type of statements.
    pub const VOID: Self = Self(0);
    /// `char`, the element type of strings.
    pub const CHAR: Self = Self(1);
    /// Signed 8-bit integer.
    pub const S8: Self = Self(2);
    /// Unsigned 8-bit integer.
    pub const U8: Self = Self(3);
    /// Signed 16-bit integer.
    pub const S16: Self = Self(4);
    /// Unsigned 16-bit integer.
    pub const U16: Self = Self(5);
    /// Signed 32-bit integer.
    pub const S32: Self = Self(6);
    /// Unsigned 32-bit integer.
    pub const U32: Self = Self(7);
    /// Signed 64-bit integer.
    pub const S64: Self = Self(8);
    /// Unsigned 64-bit integer.
    pub const U64: Self = Self(9);

    /// `int`, the result type of comparisons and small literals.
    pub const INT: Self = Self::S32;

    /// Number of pre-registered primitive types.
    pub const PRIMITIVE_COUNT: u32 = 10;

    /// Create a handle from a raw index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this is one of the pre-registered primitives.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::PRIMITIVE_COUNT
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}
