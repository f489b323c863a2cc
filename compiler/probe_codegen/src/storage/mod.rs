//! Storage allocation for symbols.
//!
//! A symbol's storage stays [`Location::Unassigned`] until a codegen hook
//! calls [`Storage::init_sym`]. The decision is:
//!
//! 1. `VIRTUAL` symbols get nothing
//! 2. an offset pinned by a parent wins
//! 3. register-sized values without the `STACK` hint take a free register
//! 4. everything else gets a fresh stack reservation
//!
//! Stack reservations are 8-byte aligned, never overlap and are never freed
//! within one body. Registers are likewise never returned to the pool.

use probe_ir::{IrsHints, Location, Reg, Symbol};
use probe_types::{TypeId, TypeRegistry};

/// Stack or register allocation failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StorageError {
    StackExhausted {
        requested: usize,
        used: usize,
        max: usize,
    },
}

const SLOT_ALIGN: usize = 8;

/// Bump allocator over the frame below `r10`.
#[derive(Clone, Debug)]
pub struct StackFrame {
    used: usize,
    max: usize,
}

impl StackFrame {
    pub fn new(max: usize) -> Self {
        Self { used: 0, max }
    }

    /// Bytes reserved so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Reserve `size` bytes, returning the (negative) offset of the range.
    pub fn reserve(&mut self, size: usize) -> Result<i16, StorageError> {
        let padded = size.div_ceil(SLOT_ALIGN) * SLOT_ALIGN;
        let end = self.used + padded;
        if end > self.max || end > i16::MAX as usize {
            return Err(StorageError::StackExhausted {
                requested: padded,
                used: self.used,
                max: self.max,
            });
        }
        self.used = end;
        Ok(-(end as i16))
    }
}

/// Callee-saved registers available to values. `r6` is kept for the
/// context pointer.
#[derive(Clone, Debug)]
pub struct RegisterPool {
    free: Vec<Reg>,
}

impl Default for RegisterPool {
    fn default() -> Self {
        Self {
            // Popped from the back, so r7 goes first.
            free: vec![Reg::R9, Reg::R8, Reg::R7],
        }
    }
}

impl RegisterPool {
    pub fn take(&mut self) -> Option<Reg> {
        self.free.pop()
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }
}

/// Storage state of one probe body.
#[derive(Clone, Debug)]
pub struct Storage {
    pub frame: StackFrame,
    pub regs: RegisterPool,
}

impl Storage {
    pub fn new(max_stack: usize) -> Self {
        Self {
            frame: StackFrame::new(max_stack),
            regs: RegisterPool::default(),
        }
    }

    pub fn reserve(&mut self, size: usize) -> Result<i16, StorageError> {
        self.frame.reserve(size)
    }

    /// Assign storage to a symbol of type `ty`. No-op if already assigned.
    pub fn init_sym(
        &mut self,
        sym: &mut Symbol,
        ty: TypeId,
        types: &TypeRegistry,
    ) -> Result<(), StorageError> {
        let irs = &mut sym.irs;
        if irs.is_assigned() || irs.has(IrsHints::VIRTUAL) {
            return Ok(());
        }

        irs.size = types.sizeof(ty).unwrap_or(0);

        if let Some(off) = irs.stack {
            irs.loc = Location::Stack(off);
            return Ok(());
        }

        if !irs.has(IrsHints::STACK) && types.is_register_sized(ty) {
            if let Some(reg) = self.regs.take() {
                irs.loc = Location::Reg(reg);
                return Ok(());
            }
            tracing::trace!("register pool exhausted, spilling to stack");
        }

        let off = self.frame.reserve(irs.size)?;
        irs.loc = Location::Stack(off);
        irs.stack = Some(off);
        Ok(())
    }
}
