//! Modelled address space.
//!
//! Memory is a set of disjoint regions, each with its own base address and
//! access rules. Consecutive regions are separated by an unmapped guard gap,
//! so running off the end of one never lands in the next.

use crate::EvalError;

/// First address handed out.
const FIRST_BASE: u64 = 0x1000_0000;

/// Regions start on this boundary and are followed by at least one
/// unmapped page.
const PAGE: u64 = 0x1000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionKind {
    Stack,
    Context,
    MapValue,
    Target,
}

impl RegionKind {
    /// Reachable with plain loads.
    pub fn loadable(self) -> bool {
        !matches!(self, RegionKind::Target)
    }

    /// Reachable with plain stores and helper writes.
    pub fn storable(self) -> bool {
        matches!(self, RegionKind::Stack | RegionKind::MapValue)
    }
}

#[derive(Clone, Debug)]
struct Region {
    base: u64,
    kind: RegionKind,
    bytes: Vec<u8>,
}

impl Region {
    fn range(&self, addr: u64, size: usize) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(addr.checked_sub(self.base)?).ok()?;
        let end = start.checked_add(size)?;
        (end <= self.bytes.len()).then_some(start..end)
    }
}

#[derive(Clone, Debug)]
pub struct Memory {
    regions: Vec<Region>,
    next: u64,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            next: FIRST_BASE,
        }
    }

    /// Map `bytes` at a fresh address and return it.
    pub fn map(&mut self, kind: RegionKind, bytes: Vec<u8>) -> u64 {
        let base = self.next;
        let len = bytes.len() as u64;
        self.next = base + len.div_ceil(PAGE) * PAGE + PAGE;
        tracing::trace!(?kind, base = format_args!("{base:#x}"), len, "map region");
        self.regions.push(Region { base, kind, bytes });
        base
    }

    /// Remove the region starting at `base`. Later accesses fault.
    pub fn unmap(&mut self, base: u64) {
        self.regions.retain(|r| r.base != base);
    }

    fn find(&self, addr: u64, size: usize) -> Option<(&Region, std::ops::Range<usize>)> {
        self.regions
            .iter()
            .find_map(|r| r.range(addr, size).map(|range| (r, range)))
    }

    fn find_mut(
        &mut self,
        addr: u64,
        size: usize,
    ) -> Option<(&mut Region, std::ops::Range<usize>)> {
        self.regions
            .iter_mut()
            .find_map(|r| r.range(addr, size).map(|range| (r, range)))
    }

    /// Kind of the region holding `addr..addr + size`, if it is mapped.
    pub fn kind(&self, addr: u64, size: usize) -> Option<RegionKind> {
        self.find(addr, size).map(|(r, _)| r.kind)
    }

    /// Raw view of mapped bytes, regardless of access rules.
    pub fn slice(&self, addr: u64, size: usize) -> Option<&[u8]> {
        self.find(addr, size).map(|(r, range)| &r.bytes[range])
    }

    /// Overwrite mapped bytes, regardless of access rules.
    pub fn fill(&mut self, addr: u64, data: &[u8]) -> bool {
        match self.find_mut(addr, data.len()) {
            Some((r, range)) => {
                r.bytes[range].copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    /// Bytes mapped from `addr` to the end of its region.
    pub fn available(&self, addr: u64) -> usize {
        self.find(addr, 1)
            .map_or(0, |(r, range)| r.bytes.len() - range.start)
    }

    /// Little-endian load of `size` bytes, zero-extended.
    pub fn load(&self, addr: u64, size: usize) -> Result<u64, EvalError> {
        match self.find(addr, size) {
            Some((r, range)) if r.kind.loadable() => {
                let mut word = [0u8; 8];
                word[..size].copy_from_slice(&r.bytes[range]);
                Ok(u64::from_le_bytes(word))
            }
            _ => Err(EvalError::UnsafeAccess {
                op: "load",
                addr,
                size,
            }),
        }
    }

    /// Little-endian store of the low `size` bytes of `value`.
    pub fn store(&mut self, addr: u64, size: usize, value: u64) -> Result<(), EvalError> {
        match self.find_mut(addr, size) {
            Some((r, range)) if r.kind.storable() => {
                r.bytes[range].copy_from_slice(&value.to_le_bytes()[..size]);
                Ok(())
            }
            _ => Err(EvalError::UnsafeAccess {
                op: "store",
                addr,
                size,
            }),
        }
    }

    /// Write helper output. The destination must be storable.
    pub fn write(&mut self, addr: u64, data: &[u8]) -> Result<(), EvalError> {
        match self.find_mut(addr, data.len()) {
            Some((r, range)) if r.kind.storable() => {
                r.bytes[range].copy_from_slice(data);
                Ok(())
            }
            _ => Err(EvalError::UnsafeAccess {
                op: "helper write",
                addr,
                size: data.len(),
            }),
        }
    }

    /// Read helper input. Any mapped region is readable.
    pub fn read(&self, addr: u64, size: usize) -> Option<Vec<u8>> {
        self.slice(addr, size).map(<[u8]>::to_vec)
    }
}
