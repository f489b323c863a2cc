//! Instruction emitter.
//!
//! [`Emitter`] owns the in-progress instruction stream of one probe body
//! and provides the storage-aware building blocks operators are written in:
//! moving a symbol into a register and back, copying between stack slots,
//! zero-filling, and bounds-checked reads into a symbol.
//!
//! # Design
//!
//! Labels are allocated up front and placed later. The target only accepts
//! forward jumps, so [`Emitter::finish`] checks that every jump lands on a
//! label placed after it and resolves labels to instruction indices.
//!
//! Scratch registers are `r0..r5`. Nothing is kept in them across the
//! emission of two different nodes.

use std::fmt;

use probe_ir::{Location, Reg, Symbol};

use crate::insn::{AluOp, Cond, Helper, Insn, Label, Operand, Width};
use crate::maps::MapId;

/// Finishing the stream failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("jump to label {0:?}, which was never placed")]
    UnplacedLabel(Label),
    #[error("backward jump at instruction {at} to label {target:?}")]
    BackwardJump { at: usize, target: Label },
}

/// A finished instruction stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub insns: Vec<Insn>,
    /// Instruction index of each label.
    pub labels: Vec<usize>,
    /// Bytes of stack used below `r10`.
    pub stack_size: usize,
}

impl Program {
    /// Instruction index a label resolves to.
    pub fn target(&self, label: Label) -> usize {
        self.labels[label.index()]
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pc, insn) in self.insns.iter().enumerate() {
            for (l, _) in self.labels.iter().enumerate().filter(|&(_, &at)| at == pc) {
                writeln!(f, "L{l}:")?;
            }
            writeln!(f, "  {insn}")?;
        }
        for (l, _) in self
            .labels
            .iter()
            .enumerate()
            .filter(|&(_, &at)| at == self.insns.len())
        {
            writeln!(f, "L{l}:")?;
        }
        Ok(())
    }
}

/// Builder for the instruction stream of one probe body.
pub struct Emitter {
    insns: Vec<Insn>,
    labels: Vec<Option<usize>>,
    abort: Label,
    check_status: bool,
}

fn width_of(size: usize) -> Width {
    match Width::from_size(size) {
        Some(w) => w,
        None => unreachable!("register transfer of a {size}-byte value"),
    }
}

/// Widest access no larger than `rem` that keeps `off` naturally aligned.
fn chunk(off: i16, rem: usize, max: usize) -> Width {
    [Width::DW, Width::W, Width::H, Width::B]
        .into_iter()
        .find(|w| {
            let n = w.bytes();
            n <= max && n <= rem && i32::from(off).rem_euclid(n as i32) == 0
        })
        .unwrap_or(Width::B)
}

impl Emitter {
    /// `check_status` makes [`Emitter::check_status`] emit an abort jump.
    pub fn new(check_status: bool) -> Self {
        let mut emitter = Self {
            insns: Vec::new(),
            labels: Vec::new(),
            abort: Label::new(0),
            check_status,
        };
        emitter.abort = emitter.alloc_label();
        emitter
    }

    pub fn insns(&self) -> &[Insn] {
        &self.insns
    }

    // === Labels ===

    pub fn alloc_label(&mut self) -> Label {
        let label = Label::new(self.labels.len() as u32);
        self.labels.push(None);
        label
    }

    /// Place `label` before the next emitted instruction.
    pub fn place_label(&mut self, label: Label) {
        self.labels[label.index()] = Some(self.insns.len());
    }

    /// Shared exit taken when a helper reports failure.
    pub fn abort_label(&self) -> Label {
        self.abort
    }

    // === Raw emission ===

    pub fn emit(&mut self, insn: Insn) {
        tracing::trace!(pc = self.insns.len(), %insn, "emit");
        self.insns.push(insn);
    }

    pub fn alu(&mut self, op: AluOp, dst: Reg, src: Operand) {
        self.emit(Insn::Alu {
            wide: true,
            op,
            dst,
            src,
        });
    }

    pub fn mov(&mut self, dst: Reg, src: Operand) {
        self.alu(AluOp::Mov, dst, src);
    }

    pub fn jump(&mut self, cond: Cond, target: Label) {
        self.emit(Insn::Jump { cond, target });
    }

    pub fn call(&mut self, helper: Helper) {
        self.emit(Insn::Call(helper));
    }

    /// Jump to the abort exit when `r0` is non-zero, if status checks are on.
    pub fn check_status(&mut self) {
        if self.check_status {
            self.jump(Cond::Ne(Reg::R0, Operand::Imm(0)), self.abort);
        }
    }

    /// `dst = r10 + off`
    pub fn ldbp(&mut self, dst: Reg, off: i16) {
        self.mov(dst, Operand::Reg(Reg::BP));
        self.alu(AluOp::Add, dst, Operand::Imm(i32::from(off)));
    }

    pub fn ldmap(&mut self, dst: Reg, map: MapId) {
        self.emit(Insn::LoadMap { dst, map });
    }

    /// Load a 64-bit constant, using the short form when it fits.
    pub fn load_imm(&mut self, dst: Reg, value: i64) {
        match i32::try_from(value) {
            Ok(imm) => self.mov(dst, Operand::Imm(imm)),
            Err(_) => self.emit(Insn::LoadImm64 { dst, imm: value }),
        }
    }

    // === Stack helpers ===

    /// Zero `size` bytes at `r10 + off`.
    pub fn bzero(&mut self, off: i16, size: usize) {
        let mut pos = 0;
        while pos < size {
            let at = off + pos as i16;
            let width = chunk(at, size - pos, 8);
            self.emit(Insn::Store {
                width,
                base: Reg::BP,
                off: at,
                src: Operand::Imm(0),
            });
            pos += width.bytes();
        }
    }

    /// Copy `size` bytes from `r10 + src` to `r10 + dst` through `r0`.
    pub fn stack_copy(&mut self, dst: i16, src: i16, size: usize) {
        if dst == src {
            return;
        }
        self.copy_chunks(Reg::BP, src, dst, size);
    }

    /// Copy `size` bytes from the safe pointer in `ptr` to `r10 + dst`.
    ///
    /// Only valid for memory the target lets us load from directly (map
    /// values, the stack). `r1` is used as scratch.
    pub fn copy_from_ptr(&mut self, ptr: Reg, dst: i16, size: usize) {
        self.copy_chunks(ptr, 0, dst, size);
    }

    fn copy_chunks(&mut self, base: Reg, src: i16, dst: i16, size: usize) {
        let scratch = if base == Reg::R0 { Reg::R1 } else { Reg::R0 };
        let mut pos = 0;
        while pos < size {
            let step = pos as i16;
            let src_w = chunk(src + step, size - pos, 8);
            let width = chunk(dst + step, size - pos, src_w.bytes());
            self.emit(Insn::Load {
                width,
                dst: scratch,
                base,
                off: src + step,
            });
            self.emit(Insn::Store {
                width,
                base: Reg::BP,
                off: dst + step,
                src: Operand::Reg(scratch),
            });
            pos += width.bytes();
        }
    }

    // === Symbol transfers ===

    /// Load a register-sized symbol into `dst`.
    pub fn sym_to_reg(&mut self, dst: Reg, sym: &Symbol) {
        match sym.irs.loc {
            Location::Reg(r) if r == dst => {}
            Location::Reg(r) => self.mov(dst, Operand::Reg(r)),
            Location::Stack(off) => self.emit(Insn::Load {
                width: width_of(sym.irs.size),
                dst,
                base: Reg::BP,
                off,
            }),
            Location::Unassigned => unreachable!("load of a symbol with no storage"),
        }
    }

    /// Store `src` into a register-sized symbol.
    pub fn reg_to_sym(&mut self, sym: &Symbol, src: Reg) {
        match sym.irs.loc {
            Location::Reg(r) if r == src => {}
            Location::Reg(r) => self.mov(r, Operand::Reg(src)),
            Location::Stack(off) => self.emit(Insn::Store {
                width: width_of(sym.irs.size),
                base: Reg::BP,
                off,
                src: Operand::Reg(src),
            }),
            Location::Unassigned => unreachable!("store to a symbol with no storage"),
        }
    }

    /// Place the value of `sym` at `r10 + off`. No-op if it is already there.
    pub fn sym_to_stack(&mut self, off: i16, sym: &Symbol) {
        match sym.irs.loc {
            Location::Reg(r) => self.emit(Insn::Store {
                width: width_of(sym.irs.size),
                base: Reg::BP,
                off,
                src: Operand::Reg(r),
            }),
            Location::Stack(src) => self.stack_copy(off, src, sym.irs.size),
            Location::Unassigned => unreachable!("copy of a symbol with no storage"),
        }
    }

    /// Copy `src` into `dst`'s storage.
    pub fn sym_to_sym(&mut self, dst: &Symbol, src: &Symbol) {
        match dst.irs.loc {
            Location::Reg(r) => self.sym_to_reg(r, src),
            Location::Stack(off) => self.sym_to_stack(off, src),
            Location::Unassigned => unreachable!("copy into a symbol with no storage"),
        }
    }

    /// Bounds-checked read of `sym.size` bytes from the address in `src`
    /// into the stack storage of `sym`, followed by a status check.
    pub fn read_to_sym(&mut self, sym: &Symbol, src: Reg) {
        let Location::Stack(off) = sym.irs.loc else {
            unreachable!("raw read into a symbol that is not on the stack")
        };
        if src != Reg::R3 {
            self.mov(Reg::R3, Operand::Reg(src));
        }
        self.ldbp(Reg::R1, off);
        self.mov(Reg::R2, Operand::Imm(sym.irs.size as i32));
        self.call(Helper::ProbeRead);
        self.check_status();
    }

    // === Finishing ===

    /// Resolve labels and check that every jump goes forward.
    pub fn finish(self, stack_size: usize) -> Result<Program, EmitError> {
        let mut labels = Vec::with_capacity(self.labels.len());
        for (i, at) in self.labels.iter().enumerate() {
            labels.push(at.unwrap_or(usize::MAX));
            if at.is_none() {
                let used = self.insns.iter().any(
                    |insn| matches!(insn, Insn::Jump { target, .. } if target.index() == i),
                );
                if used {
                    return Err(EmitError::UnplacedLabel(Label::new(i as u32)));
                }
            }
        }

        for (at, insn) in self.insns.iter().enumerate() {
            if let Insn::Jump { target, .. } = insn {
                if labels[target.index()] <= at {
                    return Err(EmitError::BackwardJump {
                        at,
                        target: *target,
                    });
                }
            }
        }

        Ok(Program {
            insns: self.insns,
            labels,
            stack_size,
        })
    }
}

#[cfg(test)]
mod tests;
