use pretty_assertions::assert_eq;
use probe_ir::{Irs, IrsHints};

use super::*;

fn at(loc: Location, size: usize) -> Symbol {
    Symbol {
        ty: None,
        irs: Irs {
            loc,
            size,
            stack: None,
            hints: IrsHints::empty(),
        },
    }
}

fn st(width: Width, off: i16) -> Insn {
    Insn::Store {
        width,
        base: Reg::BP,
        off,
        src: Operand::Imm(0),
    }
}

#[test]
fn bzero_uses_widest_aligned_stores() {
    let mut e = Emitter::new(true);
    e.bzero(-13, 9);
    assert_eq!(
        e.insns(),
        &[st(Width::B, -13), st(Width::W, -12), st(Width::W, -8)][..]
    );
}

#[test]
fn bzero_of_aligned_slot() {
    let mut e = Emitter::new(true);
    e.bzero(-16, 12);
    assert_eq!(e.insns(), &[st(Width::DW, -16), st(Width::W, -8)][..]);
}

#[test]
fn symbol_transfers() {
    let mut e = Emitter::new(true);
    let in_reg = at(Location::Reg(Reg::R7), 8);
    let on_stack = at(Location::Stack(-8), 4);

    e.sym_to_reg(Reg::R7, &in_reg);
    assert!(e.insns().is_empty(), "same register is a no-op");

    e.sym_to_reg(Reg::R3, &in_reg);
    e.sym_to_reg(Reg::R3, &on_stack);
    e.reg_to_sym(&on_stack, Reg::R0);

    assert_eq!(
        e.insns(),
        &[
            Insn::Alu {
                wide: true,
                op: AluOp::Mov,
                dst: Reg::R3,
                src: Operand::Reg(Reg::R7)
            },
            Insn::Load {
                width: Width::W,
                dst: Reg::R3,
                base: Reg::BP,
                off: -8
            },
            Insn::Store {
                width: Width::W,
                base: Reg::BP,
                off: -8,
                src: Operand::Reg(Reg::R0)
            },
        ][..]
    );
}

#[test]
fn copy_to_same_slot_is_a_noop() {
    let mut e = Emitter::new(true);
    let sym = at(Location::Stack(-16), 16);
    e.sym_to_stack(-16, &sym);
    assert!(e.insns().is_empty());

    e.sym_to_stack(-32, &sym);
    assert_eq!(e.insns().len(), 4);
}

#[test]
fn read_to_sym_checks_status_when_enabled() {
    let sym = at(Location::Stack(-8), 8);

    let mut checked = Emitter::new(true);
    checked.read_to_sym(&sym, Reg::R0);
    assert_eq!(checked.insns().len(), 6);
    assert_eq!(
        checked.insns()[5],
        Insn::Jump {
            cond: Cond::Ne(Reg::R0, Operand::Imm(0)),
            target: checked.abort_label()
        }
    );

    let mut unchecked = Emitter::new(false);
    unchecked.read_to_sym(&sym, Reg::R3);
    assert_eq!(unchecked.insns().len(), 4);
    assert_eq!(unchecked.insns()[3], Insn::Call(Helper::ProbeRead));
}

#[test]
fn load_imm_picks_encoding() {
    let mut e = Emitter::new(true);
    e.load_imm(Reg::R0, -1);
    e.load_imm(Reg::R0, 1 << 40);
    assert_eq!(
        e.insns(),
        &[
            Insn::Alu {
                wide: true,
                op: AluOp::Mov,
                dst: Reg::R0,
                src: Operand::Imm(-1)
            },
            Insn::LoadImm64 {
                dst: Reg::R0,
                imm: 1 << 40
            },
        ][..]
    );
}

#[test]
fn finish_resolves_forward_labels() {
    let mut e = Emitter::new(true);
    let done = e.alloc_label();
    e.jump(Cond::Always, done);
    e.mov(Reg::R0, Operand::Imm(1));
    e.place_label(done);
    e.emit(Insn::Exit);

    let program = e.finish(0).unwrap();
    assert_eq!(program.target(done), 2);
}

#[test]
fn finish_rejects_unplaced_and_backward_jumps() {
    let mut e = Emitter::new(true);
    let nowhere = e.alloc_label();
    e.jump(Cond::Always, nowhere);
    assert_eq!(e.finish(0), Err(EmitError::UnplacedLabel(nowhere)));

    let mut e = Emitter::new(true);
    let back = e.alloc_label();
    e.place_label(back);
    e.jump(Cond::Always, back);
    assert_eq!(
        e.finish(0),
        Err(EmitError::BackwardJump {
            at: 0,
            target: back
        })
    );
}

#[test]
fn unused_abort_label_may_stay_unplaced() {
    let mut e = Emitter::new(false);
    e.emit(Insn::Exit);
    assert!(e.finish(0).is_ok());
}
