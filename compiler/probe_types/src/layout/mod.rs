//! Size, alignment and member offset queries.

use std::fmt;

use crate::data::{Field, StructDef, TypeData};
use crate::{TypeId, TypeRegistry, POINTER_SIZE};

/// A struct could not be laid out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// A member has no size (function type).
    Unsized { field: String, ty: TypeId },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Unsized { field, ty } => {
                write!(f, "member `{field}` has unsized type {ty:?}")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

#[inline]
fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

pub(crate) fn layout_struct(
    types: &TypeRegistry,
    name: String,
    fields: Vec<Field>,
) -> Result<StructDef, LayoutError> {
    let mut offsets = Vec::with_capacity(fields.len());
    let mut end = 0;
    let mut struct_align = 1;

    for field in &fields {
        let unsized_field = || LayoutError::Unsized {
            field: field.name.clone(),
            ty: field.ty,
        };
        let size = types.sizeof(field.ty).ok_or_else(unsized_field)?;
        let align = types.alignof(field.ty).ok_or_else(unsized_field)?;

        let offset = align_up(end, align);
        offsets.push(offset);
        end = offset + size;
        struct_align = struct_align.max(align);
    }

    Ok(StructDef {
        name,
        fields,
        offsets,
        size: align_up(end, struct_align),
        align: struct_align,
    })
}

impl TypeRegistry {
    /// Strip typedefs and qualifiers.
    pub fn base(&self, mut id: TypeId) -> TypeId {
        loop {
            match self.get(id) {
                TypeData::Typedef { target, .. } => id = *target,
                TypeData::Const(inner) => id = *inner,
                _ => return id,
            }
        }
    }

    /// Size in bytes. `None` for function types.
    pub fn sizeof(&self, id: TypeId) -> Option<usize> {
        match self.get(self.base(id)) {
            TypeData::Void => Some(0),
            TypeData::Scalar(s) => Some(usize::from(s.size)),
            TypeData::Pointer { .. } | TypeData::Map { .. } => Some(POINTER_SIZE),
            TypeData::Array { elem, len } => self.sizeof(*elem).map(|s| s * len),
            TypeData::Struct(def) => Some(def.size),
            TypeData::Func { .. } => None,
            TypeData::Typedef { .. } | TypeData::Const(_) => {
                unreachable!("base() strips qualifiers")
            }
        }
    }

    /// Natural alignment in bytes. `None` for function types.
    pub fn alignof(&self, id: TypeId) -> Option<usize> {
        match self.get(self.base(id)) {
            TypeData::Void => Some(1),
            TypeData::Scalar(s) => Some(usize::from(s.size)),
            TypeData::Pointer { .. } | TypeData::Map { .. } => Some(POINTER_SIZE),
            TypeData::Array { elem, .. } => self.alignof(*elem),
            TypeData::Struct(def) => Some(def.align),
            TypeData::Func { .. } => None,
            TypeData::Typedef { .. } | TypeData::Const(_) => {
                unreachable!("base() strips qualifiers")
            }
        }
    }

    /// The struct definition behind `id`, if its base is a struct.
    pub fn struct_def(&self, id: TypeId) -> Option<&StructDef> {
        match self.get(self.base(id)) {
            TypeData::Struct(def) => Some(def),
            _ => None,
        }
    }

    /// Look up a struct member by name.
    pub fn field(&self, id: TypeId, name: &str) -> Option<&Field> {
        self.struct_def(id)?.field(name).map(|(f, _)| f)
    }

    /// Byte offset of `name` inside the struct `id`.
    pub fn offsetof(&self, id: TypeId, name: &str) -> Option<usize> {
        self.struct_def(id)?.field(name).map(|(_, off)| off)
    }

    /// Whether the base type is an integer scalar.
    pub fn is_scalar(&self, id: TypeId) -> bool {
        matches!(self.get(self.base(id)), TypeData::Scalar(_))
    }

    /// Whether the base type is a pointer.
    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.get(self.base(id)), TypeData::Pointer { .. })
    }

    /// Whether the base type is a map.
    pub fn is_map(&self, id: TypeId) -> bool {
        matches!(self.get(self.base(id)), TypeData::Map { .. })
    }

    /// Whether the value fits in a single register (scalar or pointer, at
    /// most 8 bytes).
    pub fn is_register_sized(&self, id: TypeId) -> bool {
        (self.is_scalar(id) || self.is_pointer(id))
            && self.sizeof(id).is_some_and(|s| s <= POINTER_SIZE)
    }

    /// Whether the base type is an array of `char`.
    pub fn is_string(&self, id: TypeId) -> bool {
        match self.get(self.base(id)) {
            TypeData::Array { elem, .. } => self.base(*elem) == TypeId::CHAR,
            _ => false,
        }
    }

    /// Whether a value of type `src` may be stored into a slot of type `dst`.
    ///
    /// Scalars must agree in width since both sides share one stack slot.
    pub fn compatible(&self, dst: TypeId, src: TypeId) -> bool {
        let (dst, src) = (self.base(dst), self.base(src));
        if dst == src {
            return true;
        }

        match (self.get(dst), self.get(src)) {
            (TypeData::Void, TypeData::Void) | (TypeData::Pointer { .. }, TypeData::Pointer { .. }) => {
                true
            }
            (TypeData::Scalar(a), TypeData::Scalar(b)) => a.size == b.size,
            (TypeData::Array { elem: a, len: la }, TypeData::Array { elem: b, len: lb }) => {
                la == lb && self.compatible(*a, *b)
            }
            (
                TypeData::Map {
                    key: ka,
                    value: va,
                    ..
                },
                TypeData::Map {
                    key: kb,
                    value: vb,
                    ..
                },
            ) => self.compatible(*ka, *kb) && self.compatible(*va, *vb),
            _ => false,
        }
    }
}
