//! Session map table.
//!
//! Maps are named with a leading `@` and have no declaration: the first
//! assignment that reaches inference fixes a map's key and value types, and
//! every later mention of the name resolves to the same descriptor.

use std::fmt;

use probe_types::{MapBacking, TypeId, TypeRegistry};
use rustc_hash::FxHashMap;

/// Stable handle of a map, embedded in `ldmap` instructions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct MapId(u32);

impl MapId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapDescriptor {
    pub id: MapId,
    pub name: String,
    pub key: TypeId,
    pub value: TypeId,
    pub backing: MapBacking,
    /// The interned `map_of(key, value, backing)` type.
    pub ty: TypeId,
}

/// What the loader needs to create a map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapSpec {
    pub id: MapId,
    pub name: String,
    pub key_size: usize,
    pub value_size: usize,
    pub backing: MapBacking,
}

/// Marker for [`MapTable::rollback`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// All maps known to a session.
#[derive(Clone, Debug, Default)]
pub struct MapTable {
    maps: Vec<MapDescriptor>,
    by_name: FxHashMap<String, MapId>,
}

/// Whether an identifier names a map.
pub fn is_map_name(name: &str) -> bool {
    name.starts_with('@')
}

impl MapTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<&MapDescriptor> {
        self.by_name.get(name).map(|id| &self.maps[id.index()])
    }

    /// # Panics
    /// Panics if `id` was rolled back or belongs to another session.
    #[track_caller]
    pub fn get(&self, id: MapId) -> &MapDescriptor {
        &self.maps[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &MapDescriptor> {
        self.maps.iter()
    }

    /// Fix the types of map `name`, or return the existing descriptor if
    /// it was already materialized.
    pub fn materialize(
        &mut self,
        types: &mut TypeRegistry,
        name: &str,
        key: TypeId,
        value: TypeId,
    ) -> &MapDescriptor {
        if let Some(&id) = self.by_name.get(name) {
            return &self.maps[id.index()];
        }

        let backing = MapBacking::Hash;
        let id = MapId::new(self.maps.len() as u32);
        let ty = types.map_of(key, value, backing);
        tracing::debug!(
            map = name,
            key = %types.display(key),
            value = %types.display(value),
            "materialized map"
        );

        self.maps.push(MapDescriptor {
            id,
            name: name.to_owned(),
            key,
            value,
            backing,
            ty,
        });
        self.by_name.insert(name.to_owned(), id);
        &self.maps[id.index()]
    }

    /// Loader-facing description of `id`.
    pub fn spec(&self, id: MapId, types: &TypeRegistry) -> MapSpec {
        let desc = self.get(id);
        MapSpec {
            id,
            name: desc.name.clone(),
            key_size: types.sizeof(desc.key).unwrap_or(0),
            value_size: types.sizeof(desc.value).unwrap_or(0),
            backing: desc.backing,
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.maps.len())
    }

    /// Forget every map materialized after `cp`.
    pub fn rollback(&mut self, cp: Checkpoint) {
        for desc in self.maps.drain(cp.0..) {
            tracing::debug!(map = %desc.name, "rolled back map");
            self.by_name.remove(&desc.name);
        }
    }
}
