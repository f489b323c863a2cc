//! Pseudo-instructions of the execution target.
//!
//! The set mirrors what the verifier-checked target accepts: 64-bit and
//! 32-bit ALU, sized loads and stores relative to a base register, 64-bit
//! immediates, map handle loads, forward jumps and helper calls.

use std::fmt;

use probe_ir::Reg;

use crate::maps::MapId;

/// Access width of a load or store.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Width {
    B,
    H,
    W,
    DW,
}

impl Width {
    /// Width for a value of `size` bytes, if it is a machine width.
    pub fn from_size(size: usize) -> Option<Self> {
        match size {
            1 => Some(Width::B),
            2 => Some(Width::H),
            4 => Some(Width::W),
            8 => Some(Width::DW),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            Width::B => 1,
            Width::H => 2,
            Width::W => 4,
            Width::DW => 8,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Width::B => "b",
            Width::H => "h",
            Width::W => "w",
            Width::DW => "dw",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AluOp {
    Mov,
    Add,
    Sub,
    /// Unary; the source operand is ignored.
    Neg,
}

/// Register or sign-extended 32-bit immediate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    Reg(Reg),
    Imm(i32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{r}"),
            Operand::Imm(v) => write!(f, "{v}"),
        }
    }
}

/// Helper functions callable from a probe.
///
/// Arguments go in `r1..r5`, the result comes back in `r0`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Helper {
    /// `(dst, size, src)`: bounds-checked read.
    ProbeRead,
    /// `(dst, size, src)`: bounds-checked read stopping at NUL.
    ProbeReadStr,
    /// `(map, key)`: value pointer or null.
    MapLookup,
    /// `(map, key, value, flags)`: insert or overwrite.
    MapUpdate,
    /// `(map, key)`.
    MapDelete,
}

impl Helper {
    pub fn name(self) -> &'static str {
        match self {
            Helper::ProbeRead => "probe_read",
            Helper::ProbeReadStr => "probe_read_str",
            Helper::MapLookup => "map_lookup_elem",
            Helper::MapUpdate => "map_update_elem",
            Helper::MapDelete => "map_delete_elem",
        }
    }
}

/// Jump target, resolved to an instruction index when the program is
/// finished.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Label(u32);

impl Label {
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Cond {
    Always,
    Eq(Reg, Operand),
    Ne(Reg, Operand),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Insn {
    Alu {
        /// 64-bit when set, otherwise 32-bit with a zero-extended result.
        wide: bool,
        op: AluOp,
        dst: Reg,
        src: Operand,
    },
    /// `dst = *(width *)(base + off)`, zero-extended.
    Load {
        width: Width,
        dst: Reg,
        base: Reg,
        off: i16,
    },
    /// `*(width *)(base + off) = src`, truncated.
    Store {
        width: Width,
        base: Reg,
        off: i16,
        src: Operand,
    },
    LoadImm64 {
        dst: Reg,
        imm: i64,
    },
    LoadMap {
        dst: Reg,
        map: MapId,
    },
    Jump {
        cond: Cond,
        target: Label,
    },
    Call(Helper),
    Exit,
}

fn mem(base: Reg, off: i16) -> String {
    if off < 0 {
        format!("[{base}{off}]")
    } else {
        format!("[{base}+{off}]")
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Insn::Alu { wide, op, dst, src } => {
                let name = match op {
                    AluOp::Mov => "mov",
                    AluOp::Add => "add",
                    AluOp::Sub => "sub",
                    AluOp::Neg => "neg",
                };
                let bits = if wide { "" } else { "32" };
                if op == AluOp::Neg {
                    write!(f, "{name}{bits} {dst}")
                } else {
                    write!(f, "{name}{bits} {dst}, {src}")
                }
            }
            Insn::Load {
                width,
                dst,
                base,
                off,
            } => write!(f, "ldx{} {dst}, {}", width.suffix(), mem(base, off)),
            Insn::Store {
                width,
                base,
                off,
                src: Operand::Reg(src),
            } => write!(f, "stx{} {}, {src}", width.suffix(), mem(base, off)),
            Insn::Store {
                width,
                base,
                off,
                src: Operand::Imm(imm),
            } => write!(f, "st{} {}, {imm}", width.suffix(), mem(base, off)),
            Insn::LoadImm64 { dst, imm } => write!(f, "lddw {dst}, {imm:#x}"),
            Insn::LoadMap { dst, map } => write!(f, "ldmap {dst}, {map:?}"),
            Insn::Jump { cond, target } => match cond {
                Cond::Always => write!(f, "ja {target:?}"),
                Cond::Eq(r, src) => write!(f, "jeq {r}, {src}, {target:?}"),
                Cond::Ne(r, src) => write!(f, "jne {r}, {src}, {target:?}"),
            },
            Insn::Call(helper) => write!(f, "call {}", helper.name()),
            Insn::Exit => write!(f, "exit"),
        }
    }
}
