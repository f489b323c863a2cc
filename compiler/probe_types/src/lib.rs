//! Type system for the probe compiler.
//!
//! Every type lives in a [`TypeRegistry`] and is referenced by a 32-bit
//! [`TypeId`] handle. Types are immutable once registered; structural types
//! (pointers, arrays, maps, qualifiers) are interned so equal shapes share a
//! handle, while structs are nominal and get a fresh handle each time.
//!
//! # Queries
//!
//! - [`TypeRegistry::sizeof`] / [`TypeRegistry::alignof`] — byte layout
//! - [`TypeRegistry::offsetof`] — member offset inside a struct
//! - [`TypeRegistry::base`] — strip typedefs and `const`
//! - [`TypeRegistry::array_of`] / [`TypeRegistry::map_of`] /
//!   [`TypeRegistry::pointer_to`] — interned constructors
//!
//! # Layout
//!
//! Struct layout follows natural alignment: each field starts at the previous
//! field's end rounded up to its own alignment, and the struct size is rounded
//! up to the largest field alignment. Layout is computed once, when the struct
//! is registered, and cached in [`StructDef`].

mod data;
mod idx;
mod layout;
mod registry;

pub use data::{Field, MapBacking, Scalar, StructDef, TypeData};
pub use idx::TypeId;
pub use layout::LayoutError;
pub use registry::TypeRegistry;

/// Width of a native pointer on the execution target, in bytes.
pub const POINTER_SIZE: usize = 8;
