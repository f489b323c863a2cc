//! Type descriptors stored in the registry.

use crate::TypeId;

/// A fixed-width integer type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Scalar {
    /// Display name (`int`, `unsigned char`, ...).
    pub name: &'static str,
    /// Width in bytes: 1, 2, 4 or 8.
    pub size: u8,
    /// Whether the value is sign-extended when widened.
    pub signed: bool,
}

/// A named struct member.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A registered struct with its cached layout.
///
/// `offsets[i]` is the byte offset of `fields[i]`. Offsets are strictly
/// increasing for non-empty fields and `size` is a multiple of `align`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<Field>,
    pub offsets: Vec<usize>,
    pub size: usize,
    pub align: usize,
}

impl StructDef {
    /// Find a member and its offset by name.
    pub fn field(&self, name: &str) -> Option<(&Field, usize)> {
        self.fields
            .iter()
            .zip(&self.offsets)
            .find(|(f, _)| f.name == name)
            .map(|(f, &off)| (f, off))
    }
}

/// How a map is stored by the execution target.
///
/// Only [`MapBacking::Hash`] is produced by inference today; the per-CPU
/// variant exists so aggregations can be routed to it later.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MapBacking {
    Hash,
    PerCpuHash,
}

/// The descriptor behind a [`TypeId`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Void,
    Scalar(Scalar),
    Pointer {
        pointee: TypeId,
    },
    Array {
        elem: TypeId,
        len: usize,
    },
    Struct(StructDef),
    Map {
        key: TypeId,
        value: TypeId,
        backing: MapBacking,
    },
    Func {
        ret: TypeId,
        args: Vec<TypeId>,
        variadic: bool,
    },
    /// A named alias. Stripped by `base`.
    Typedef {
        name: String,
        target: TypeId,
    },
    /// A `const` qualifier. Stripped by `base`.
    Const(TypeId),
}
