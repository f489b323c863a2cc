//! Session-owned type registry.
//!
//! The registry stores every type descriptor and hands out [`TypeId`]s.
//!
//! # Design
//!
//! - Primitives occupy fixed indices, registered by [`TypeRegistry::new`]
//! - Structural shapes are interned through an `FxHashMap` keyed on the
//!   shape, so `array_of(char, 16)` always returns the same handle
//! - Structs are nominal: [`TypeRegistry::add_struct`] always allocates, and
//!   named structs are also indexed by name
//! - Nothing is ever mutated after it is pushed

use rustc_hash::FxHashMap;

use crate::data::{Field, MapBacking, Scalar, StructDef, TypeData};
use crate::layout::{self, LayoutError};
use crate::TypeId;

/// Interning key for structural (non-nominal) shapes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ShapeKey {
    Pointer(TypeId),
    Array(TypeId, usize),
    Map(TypeId, TypeId, MapBacking),
    Const(TypeId),
    Func(TypeId, Vec<TypeId>, bool),
}

/// Registry of all types known to a compilation session.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    types: Vec<TypeData>,
    shapes: FxHashMap<ShapeKey, TypeId>,
    by_name: FxHashMap<String, TypeId>,
    anon_count: u32,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

const fn scalar(name: &'static str, size: u8, signed: bool) -> TypeData {
    TypeData::Scalar(Scalar { name, size, signed })
}

impl TypeRegistry {
    /// Create a registry with the primitive scalars pre-registered.
    pub fn new() -> Self {
        let types = vec![
            TypeData::Void,
            scalar("char", 1, true),
            scalar("signed char", 1, true),
            scalar("unsigned char", 1, false),
            scalar("short", 2, true),
            scalar("unsigned short", 2, false),
            scalar("int", 4, true),
            scalar("unsigned int", 4, false),
            scalar("long", 8, true),
            scalar("unsigned long", 8, false),
        ];
        debug_assert_eq!(types.len(), TypeId::PRIMITIVE_COUNT as usize);

        let by_name = types
            .iter()
            .enumerate()
            .filter_map(|(i, t)| match t {
                TypeData::Scalar(s) => Some((s.name.to_owned(), TypeId::from_raw(i as u32))),
                TypeData::Void => Some(("void".to_owned(), TypeId::from_raw(i as u32))),
                _ => None,
            })
            .collect();

        Self {
            types,
            shapes: FxHashMap::default(),
            by_name,
            anon_count: 0,
        }
    }

    /// Number of registered types, primitives included.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always `false`: primitives are registered up front.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Get the descriptor behind a handle.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this registry.
    #[inline]
    #[track_caller]
    pub fn get(&self, id: TypeId) -> &TypeData {
        &self.types[id.index()]
    }

    /// Look up a named type (primitive, typedef or named struct).
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    fn push(&mut self, data: TypeData) -> TypeId {
        let id = TypeId::from_raw(self.types.len() as u32);
        self.types.push(data);
        id
    }

    fn intern(&mut self, key: ShapeKey, make: impl FnOnce() -> TypeData) -> TypeId {
        if let Some(&id) = self.shapes.get(&key) {
            return id;
        }
        let id = self.push(make());
        self.shapes.insert(key, id);
        id
    }

    // === Constructors ===

    /// Pointer to `pointee`.
    pub fn pointer_to(&mut self, pointee: TypeId) -> TypeId {
        self.intern(ShapeKey::Pointer(pointee), || TypeData::Pointer { pointee })
    }

    /// Fixed-length array of `elem`.
    pub fn array_of(&mut self, elem: TypeId, len: usize) -> TypeId {
        self.intern(ShapeKey::Array(elem, len), || TypeData::Array { elem, len })
    }

    /// Map from `key` to `value` with the given backing.
    pub fn map_of(&mut self, key: TypeId, value: TypeId, backing: MapBacking) -> TypeId {
        self.intern(ShapeKey::Map(key, value, backing), || TypeData::Map {
            key,
            value,
            backing,
        })
    }

    /// `const`-qualified `inner`.
    pub fn const_of(&mut self, inner: TypeId) -> TypeId {
        self.intern(ShapeKey::Const(inner), || TypeData::Const(inner))
    }

    /// Function type.
    pub fn func(&mut self, ret: TypeId, args: Vec<TypeId>, variadic: bool) -> TypeId {
        let key = ShapeKey::Func(ret, args.clone(), variadic);
        self.intern(key, || TypeData::Func {
            ret,
            args,
            variadic,
        })
    }

    /// Register a named alias for `target`.
    pub fn add_typedef(&mut self, name: impl Into<String>, target: TypeId) -> TypeId {
        let name = name.into();
        let id = self.push(TypeData::Typedef {
            name: name.clone(),
            target,
        });
        self.by_name.insert(name, id);
        id
    }

    /// Register a struct, computing its layout.
    ///
    /// Fails if any field has no size (function types).
    pub fn add_struct(
        &mut self,
        name: impl Into<String>,
        fields: Vec<Field>,
    ) -> Result<TypeId, LayoutError> {
        let name = name.into();
        let def = layout::layout_struct(self, name.clone(), fields)?;
        let id = self.push(TypeData::Struct(def));
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Register an anonymous struct under a generated, session-unique name.
    pub fn add_anon_struct(&mut self, fields: Vec<Field>) -> Result<TypeId, LayoutError> {
        let name = format!(":anon_{}", self.anon_count);
        let id = self.add_struct(name, fields)?;
        self.anon_count += 1;
        Ok(id)
    }

    // === Rendering ===

    /// Render a type the way it would be spelled in a declaration.
    pub fn display(&self, id: TypeId) -> String {
        match self.get(id) {
            TypeData::Void => "void".to_owned(),
            TypeData::Scalar(s) => s.name.to_owned(),
            TypeData::Pointer { pointee } => format!("{} *", self.display(*pointee)),
            TypeData::Array { elem, len } => format!("{}[{len}]", self.display(*elem)),
            TypeData::Struct(def) => format!("struct {}", def.name),
            TypeData::Map { key, value, .. } => {
                format!("{}[{}]", self.display(*value), self.display(*key))
            }
            TypeData::Func {
                ret,
                args,
                variadic,
            } => {
                let mut parts: Vec<String> = args.iter().map(|a| self.display(*a)).collect();
                if *variadic {
                    parts.push("...".to_owned());
                }
                format!("{} (*)({})", self.display(*ret), parts.join(", "))
            }
            TypeData::Typedef { name, .. } => name.clone(),
            TypeData::Const(inner) => format!("const {}", self.display(*inner)),
        }
    }
}

#[cfg(test)]
mod tests;
