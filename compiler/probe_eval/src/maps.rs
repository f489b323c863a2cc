//! Contents of the maps a program declares.
//!
//! Each value lives in its own [`RegionKind::MapValue`] region, so the
//! pointer a lookup returns stays valid until the entry is deleted, and an
//! overwrite through `update` is visible through earlier pointers.

use probe_codegen::{MapId, MapSpec};
use rustc_hash::FxHashMap;

use crate::memory::{Memory, RegionKind};
use crate::EvalError;

#[derive(Clone, Debug)]
struct MapState {
    spec: MapSpec,
    entries: FxHashMap<Vec<u8>, u64>,
}

#[derive(Clone, Debug, Default)]
pub struct MapStore {
    maps: FxHashMap<MapId, MapState>,
}

impl MapStore {
    pub fn new(specs: &[MapSpec]) -> Self {
        let maps = specs
            .iter()
            .map(|spec| {
                let state = MapState {
                    spec: spec.clone(),
                    entries: FxHashMap::default(),
                };
                (spec.id, state)
            })
            .collect();
        Self { maps }
    }

    pub fn spec(&self, id: MapId) -> Option<&MapSpec> {
        self.maps.get(&id).map(|m| &m.spec)
    }

    /// Number of entries in `id`; zero for undeclared maps.
    pub fn len(&self, id: MapId) -> usize {
        self.maps.get(&id).map_or(0, |m| m.entries.len())
    }

    fn state(&self, id: MapId) -> Result<&MapState, EvalError> {
        self.maps
            .get(&id)
            .ok_or(EvalError::UnknownMap(u64::from(id.raw())))
    }

    fn check_size(
        spec: &MapSpec,
        what: &'static str,
        expected: usize,
        found: usize,
    ) -> Result<(), EvalError> {
        if expected == found {
            return Ok(());
        }
        Err(EvalError::SizeMismatch {
            map: spec.id,
            what,
            expected,
            found,
        })
    }

    /// Address of the value stored under `key`.
    pub fn lookup(&self, id: MapId, key: &[u8]) -> Result<Option<u64>, EvalError> {
        let state = self.state(id)?;
        Self::check_size(&state.spec, "key", state.spec.key_size, key.len())?;
        Ok(state.entries.get(key).copied())
    }

    /// Insert or overwrite.
    pub fn update(
        &mut self,
        mem: &mut Memory,
        id: MapId,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), EvalError> {
        let state = self
            .maps
            .get_mut(&id)
            .ok_or(EvalError::UnknownMap(u64::from(id.raw())))?;
        Self::check_size(&state.spec, "key", state.spec.key_size, key.len())?;
        Self::check_size(&state.spec, "value", state.spec.value_size, value.len())?;

        match state.entries.get(key) {
            Some(&addr) => {
                mem.fill(addr, value);
            }
            None => {
                let addr = mem.map(RegionKind::MapValue, value.to_vec());
                state.entries.insert(key.to_vec(), addr);
            }
        }
        Ok(())
    }

    /// Remove `key`. Returns whether it was present.
    pub fn delete(&mut self, mem: &mut Memory, id: MapId, key: &[u8]) -> Result<bool, EvalError> {
        let state = self
            .maps
            .get_mut(&id)
            .ok_or(EvalError::UnknownMap(u64::from(id.raw())))?;
        Self::check_size(&state.spec, "key", state.spec.key_size, key.len())?;

        match state.entries.remove(key) {
            Some(addr) => {
                mem.unmap(addr);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Current value bytes under `key`.
    pub fn value<'m>(&self, mem: &'m Memory, id: MapId, key: &[u8]) -> Option<&'m [u8]> {
        let state = self.maps.get(&id)?;
        let addr = *state.entries.get(key)?;
        mem.slice(addr, state.spec.value_size)
    }
}
