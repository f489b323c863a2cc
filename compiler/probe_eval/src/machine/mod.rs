//! The interpreter loop.
//!
//! # Design
//!
//! Registers are plain `u64`s. 64-bit ALU operations wrap, 32-bit ones
//! operate on the low halves and zero-extend the result, loads zero-extend
//! and stores truncate. Immediates are sign-extended to 64 bits first.
//!
//! Helper calls follow the target's convention: arguments in `r1..r5`, the
//! result in `r0`, and `r1..r5` are clobbered afterwards (set to
//! [`CLOBBER`]) so code that relies on them surviving a call is caught.
//!
//! Jumps only go forward, so every run ends after at most one visit per
//! instruction.

use probe_codegen::{AluOp, Cond, Helper, Insn, MapId, MapSpec, Operand, Program};
use probe_ir::Reg;

use crate::maps::MapStore;
use crate::memory::{Memory, RegionKind};
use crate::{EvalError, CLOBBER, EFAULT, ENOENT, STACK_POISON};

/// Stack bytes below the frame pointer.
const STACK_SIZE: usize = 512;

/// High bits of a map handle; the low 32 bits are the `MapId`.
const MAP_HANDLE_TAG: u64 = 0x4d41_5000_0000_0000;

/// An execution target for one program, with its maps and memory.
///
/// Map contents persist across [`Machine::run`]s, like maps shared by
/// successive firings of a probe.
#[derive(Clone, Debug)]
pub struct Machine {
    program: Program,
    mem: Memory,
    maps: MapStore,
    stack_base: u64,
    ctx: u64,
    regs: [u64; Reg::COUNT],
}

fn imm(v: i32) -> u64 {
    i64::from(v) as u64
}

impl Machine {
    pub fn new(program: Program, maps: &[MapSpec]) -> Self {
        let mut mem = Memory::new();
        let stack_base = mem.map(RegionKind::Stack, vec![STACK_POISON; STACK_SIZE]);
        let ctx = mem.map(RegionKind::Context, Vec::new());
        Self {
            program,
            mem,
            maps: MapStore::new(maps),
            stack_base,
            ctx,
            regs: [0; Reg::COUNT],
        }
    }

    /// Replace the context block with `args`, one 64-bit slot each.
    pub fn set_context(&mut self, args: &[u64]) {
        self.mem.unmap(self.ctx);
        let bytes = args.iter().flat_map(|a| a.to_le_bytes()).collect();
        self.ctx = self.mem.map(RegionKind::Context, bytes);
    }

    /// Map `bytes` as target memory, reachable only through read helpers.
    pub fn add_target(&mut self, bytes: &[u8]) -> u64 {
        self.mem.map(RegionKind::Target, bytes.to_vec())
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    /// Frame pointer value during a run.
    pub fn frame_pointer(&self) -> u64 {
        self.stack_base + STACK_SIZE as u64
    }

    /// `size` stack bytes at `r10 + off`, as left by the last run.
    pub fn stack(&self, off: i16, size: usize) -> Option<&[u8]> {
        let addr = self.frame_pointer().wrapping_add_signed(i64::from(off));
        self.mem.slice(addr, size)
    }

    pub fn map_value(&self, id: MapId, key: &[u8]) -> Option<&[u8]> {
        self.maps.value(&self.mem, id, key)
    }

    pub fn map_len(&self, id: MapId) -> usize {
        self.maps.len(id)
    }

    pub fn map_insert(&mut self, id: MapId, key: &[u8], value: &[u8]) -> Result<(), EvalError> {
        self.maps.update(&mut self.mem, id, key, value)
    }

    /// Run the program once and return `r0` at `exit`.
    pub fn run(&mut self) -> Result<i64, EvalError> {
        self.mem.fill(self.stack_base, &[STACK_POISON; STACK_SIZE]);
        self.regs = [0; Reg::COUNT];
        self.regs[Reg::R1.index()] = self.ctx;
        self.regs[Reg::BP.index()] = self.frame_pointer();

        let mut pc = 0;
        while let Some(&insn) = self.program.insns.get(pc) {
            tracing::trace!(pc, %insn, "step");
            pc += 1;
            match insn {
                Insn::Alu { wide, op, dst, src } => {
                    self.check_dst(dst, insn)?;
                    let src = self.operand(src);
                    let cur = self.reg(dst);
                    let value = if wide {
                        alu64(op, cur, src)
                    } else {
                        u64::from(alu32(op, cur as u32, src as u32))
                    };
                    self.set(dst, value);
                }
                Insn::Load {
                    width,
                    dst,
                    base,
                    off,
                } => {
                    self.check_dst(dst, insn)?;
                    let addr = self.reg(base).wrapping_add_signed(i64::from(off));
                    let value = self.mem.load(addr, width.bytes())?;
                    self.set(dst, value);
                }
                Insn::Store {
                    width,
                    base,
                    off,
                    src,
                } => {
                    let addr = self.reg(base).wrapping_add_signed(i64::from(off));
                    let value = self.operand(src);
                    self.mem.store(addr, width.bytes(), value)?;
                }
                Insn::LoadImm64 { dst, imm } => {
                    self.check_dst(dst, insn)?;
                    self.set(dst, imm as u64);
                }
                Insn::LoadMap { dst, map } => {
                    self.check_dst(dst, insn)?;
                    self.set(dst, MAP_HANDLE_TAG | u64::from(map.raw()));
                }
                Insn::Jump { cond, target } => {
                    let taken = match cond {
                        Cond::Always => true,
                        Cond::Eq(r, o) => self.reg(r) == self.operand(o),
                        Cond::Ne(r, o) => self.reg(r) != self.operand(o),
                    };
                    if taken {
                        pc = self.program.target(target);
                    }
                }
                Insn::Call(helper) => {
                    let ret = self.call(helper)?;
                    self.set(Reg::R0, ret as u64);
                    for r in 1..=5 {
                        self.regs[r] = CLOBBER;
                    }
                }
                Insn::Exit => return Ok(self.reg(Reg::R0) as i64),
            }
        }
        Err(EvalError::FellOffEnd)
    }

    // === Registers ===

    fn reg(&self, r: Reg) -> u64 {
        self.regs[r.index()]
    }

    fn set(&mut self, r: Reg, value: u64) {
        self.regs[r.index()] = value;
    }

    fn check_dst(&self, dst: Reg, insn: Insn) -> Result<(), EvalError> {
        if dst == Reg::BP {
            return Err(EvalError::FramePointerWrite(insn));
        }
        Ok(())
    }

    fn operand(&self, op: Operand) -> u64 {
        match op {
            Operand::Reg(r) => self.reg(r),
            Operand::Imm(v) => imm(v),
        }
    }

    // === Helpers ===

    fn map_arg(&self, r: Reg) -> Result<(MapId, MapSpec), EvalError> {
        let handle = self.reg(r);
        if handle & !0xffff_ffff != MAP_HANDLE_TAG {
            return Err(EvalError::NotAMap(r.index()));
        }
        let id = MapId::new(handle as u32);
        match self.maps.spec(id) {
            Some(spec) => Ok((id, spec.clone())),
            None => Err(EvalError::UnknownMap(handle)),
        }
    }

    /// Bytes at the address in `r`, which must be safe memory.
    fn safe_bytes(&self, r: Reg, size: usize) -> Result<Vec<u8>, EvalError> {
        let addr = self.reg(r);
        match self.mem.kind(addr, size) {
            Some(kind) if kind.loadable() => Ok(self.mem.read(addr, size).unwrap_or_default()),
            _ => Err(EvalError::UnsafeAccess {
                op: "helper argument",
                addr,
                size,
            }),
        }
    }

    fn call(&mut self, helper: Helper) -> Result<i64, EvalError> {
        let (r1, r2, r3) = (self.reg(Reg::R1), self.reg(Reg::R2), self.reg(Reg::R3));
        match helper {
            Helper::ProbeRead => {
                let size = r2 as usize;
                match self.mem.read(r3, size) {
                    Some(bytes) => {
                        self.mem.write(r1, &bytes)?;
                        Ok(0)
                    }
                    None => {
                        self.mem.write(r1, &vec![0; size])?;
                        Ok(EFAULT)
                    }
                }
            }
            Helper::ProbeReadStr => {
                let size = r2 as usize;
                if size == 0 {
                    return Ok(0);
                }
                let avail = self.mem.available(r3);
                let limit = (size - 1).min(avail);
                let src = self.mem.read(r3, limit).unwrap_or_default();
                let text: Vec<u8> = src.iter().copied().take_while(|&b| b != 0).collect();

                let terminated = text.len() < src.len() || text.len() == size - 1;
                if !terminated {
                    // Ran off mapped memory before a NUL or the size limit.
                    self.mem.write(r1, &vec![0; size])?;
                    return Ok(EFAULT);
                }
                let mut out = text;
                out.push(0);
                self.mem.write(r1, &out)?;
                Ok(out.len() as i64)
            }
            Helper::MapLookup => {
                let (id, spec) = self.map_arg(Reg::R1)?;
                let key = self.safe_bytes(Reg::R2, spec.key_size)?;
                Ok(self.maps.lookup(id, &key)?.map_or(0, |addr| addr as i64))
            }
            Helper::MapUpdate => {
                let (id, spec) = self.map_arg(Reg::R1)?;
                let key = self.safe_bytes(Reg::R2, spec.key_size)?;
                let value = self.safe_bytes(Reg::R3, spec.value_size)?;
                self.maps.update(&mut self.mem, id, &key, &value)?;
                Ok(0)
            }
            Helper::MapDelete => {
                let (id, spec) = self.map_arg(Reg::R1)?;
                let key = self.safe_bytes(Reg::R2, spec.key_size)?;
                let found = self.maps.delete(&mut self.mem, id, &key)?;
                Ok(if found { 0 } else { ENOENT })
            }
        }
    }
}

fn alu64(op: AluOp, dst: u64, src: u64) -> u64 {
    match op {
        AluOp::Mov => src,
        AluOp::Add => dst.wrapping_add(src),
        AluOp::Sub => dst.wrapping_sub(src),
        AluOp::Neg => dst.wrapping_neg(),
    }
}

fn alu32(op: AluOp, dst: u32, src: u32) -> u32 {
    match op {
        AluOp::Mov => src,
        AluOp::Add => dst.wrapping_add(src),
        AluOp::Sub => dst.wrapping_sub(src),
        AluOp::Neg => dst.wrapping_neg(),
    }
}
