//! Per-node symbol: resolved type plus storage state.

use std::fmt;

use bitflags::bitflags;
use probe_types::TypeId;

/// A machine register of the execution target.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Reg(u8);

impl Reg {
    /// Helper return value.
    pub const R0: Self = Self(0);
    /// Helper arguments (clobbered by calls).
    pub const R1: Self = Self(1);
    pub const R2: Self = Self(2);
    pub const R3: Self = Self(3);
    pub const R4: Self = Self(4);
    pub const R5: Self = Self(5);
    /// Callee-saved; holds the context pointer.
    pub const R6: Self = Self(6);
    pub const R7: Self = Self(7);
    pub const R8: Self = Self(8);
    pub const R9: Self = Self(9);
    /// Read-only frame pointer.
    pub const R10: Self = Self(10);
    pub const BP: Self = Self::R10;

    /// Number of registers, frame pointer included.
    pub const COUNT: usize = 11;

    #[inline]
    pub const fn new(n: u8) -> Self {
        Self(n)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Where a symbol's value lives.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Location {
    #[default]
    Unassigned,
    Reg(Reg),
    /// Byte offset from the frame pointer (always negative).
    Stack(i16),
}

bitflags! {
    /// Storage hints pushed down by parents during pre-order codegen.
    #[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Debug)]
    pub struct IrsHints: u8 {
        /// Must live on the stack.
        const STACK = 1 << 0;
        /// About to be overwritten; skip loads.
        const LVAL = 1 << 1;
        /// Parent member access reads a sub-range; skip the aggregate load.
        const DOT = 1 << 2;
        /// Consumed at compile time; gets no storage.
        const VIRTUAL = 1 << 3;
    }
}

/// Storage record of a symbol.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Irs {
    pub loc: Location,
    /// Size of the value in bytes, set when storage is assigned.
    pub size: usize,
    /// Offset pinned by a parent before allocation (struct fields, shared
    /// assignment slots).
    pub stack: Option<i16>,
    pub hints: IrsHints,
}

impl Irs {
    #[inline]
    pub fn has(&self, hint: IrsHints) -> bool {
        self.hints.contains(hint)
    }

    /// Stack offset, if the value lives on the stack.
    #[inline]
    pub fn stack_offset(&self) -> Option<i16> {
        match self.loc {
            Location::Stack(off) => Some(off),
            _ => None,
        }
    }

    #[inline]
    pub fn reg(&self) -> Option<Reg> {
        match self.loc {
            Location::Reg(r) => Some(r),
            _ => None,
        }
    }

    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.loc != Location::Unassigned
    }
}

/// The symbol attached to every node.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Symbol {
    pub ty: Option<TypeId>,
    pub irs: Irs,
}

impl Symbol {
    #[inline]
    pub fn is_typed(&self) -> bool {
        self.ty.is_some()
    }
}
