//! `strcmp(a, b)`: byte-wise string comparison.
//!
//! The comparison is unrolled over `min(sizeof a, sizeof b)` bytes since the
//! target has no loops. Each step subtracts `b[i]` from `a[i]` and leaves as
//! soon as the difference is non-zero or `b` hits its terminating zero. When
//! one side is a literal its bytes become immediates and it gets no storage;
//! a literal on the left is swapped to the right and the result negated.

use probe_ir::{IrsHints, NodeId, NodeKind, Reg};
use probe_types::TypeId;

use super::{Operator, Progress};
use crate::error::{Arity, CodegenError, CodegenWarning, TypeErrorKind};
use crate::infer::InferCx;
use crate::insn::{AluOp, Cond, Insn, Operand, Width};
use crate::lower::LowerCx;

pub struct Strcmp;

fn is_literal(cx: &InferCx<'_>, node: NodeId) -> bool {
    matches!(cx.graph.node(node).kind, NodeKind::Str(_))
}

impl Operator for Strcmp {
    fn name(&self) -> &'static str {
        "strcmp"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        if cx.ty(node).is_some() {
            return Ok(Progress::Done);
        }
        let (a, b) = (cx.graph.arg(node, 0), cx.graph.arg(node, 1));
        let (Some(_), Some(_)) = (cx.ty(a), cx.ty(b)) else {
            return Ok(Progress::Deferred);
        };

        // At most one side becomes an immediate.
        let literal = [b, a].into_iter().find(|&s| is_literal(cx, s));
        if let Some(lit) = literal {
            cx.hint(lit, IrsHints::VIRTUAL);
        }

        for side in [a, b] {
            if Some(side) == literal {
                continue;
            }
            let ty = cx.ty(side).unwrap_or(TypeId::VOID);
            if cx.types.is_map(ty) {
                return Err(cx.error(side, TypeErrorKind::MapValue { ty }));
            }
            if !cx.types.is_string(ty) {
                let span = cx.graph.span(side);
                cx.warn(CodegenWarning::NotAString {
                    node: side,
                    span,
                    ty,
                });
            }
        }

        cx.done(node, TypeId::INT)
    }

    fn ir_pre(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        for i in 0..2 {
            let side = cx.graph.arg(node, i);
            if !cx.sym(side).irs.has(IrsHints::VIRTUAL) {
                cx.hint(side, IrsHints::STACK);
            }
        }
        Ok(())
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let (mut a, mut b) = (cx.graph.arg(node, 0), cx.graph.arg(node, 1));
        let mut invert = false;
        if cx.sym(a).irs.has(IrsHints::VIRTUAL) {
            std::mem::swap(&mut a, &mut b);
            invert = true;
        }

        let literal: Option<Vec<u8>> = if cx.sym(b).irs.has(IrsHints::VIRTUAL) {
            let text = cx.graph.node(b).as_str().unwrap_or_default();
            let mut bytes = text.as_bytes().to_vec();
            bytes.push(0);
            Some(bytes)
        } else {
            None
        };

        cx.init_sym(node)?;
        let len = cx.size_of(a).min(cx.size_of(b));
        let dst = cx.sym(node).irs.reg().unwrap_or(Reg::R0);

        let a_off = cx.stack_of(a);
        let b_off = match literal {
            Some(_) => 0,
            None => cx.stack_of(b),
        };
        emit_compare(cx, dst, a_off, b_off, literal.as_deref(), len);

        if invert {
            cx.emit.alu(AluOp::Neg, dst, Operand::Imm(0));
        }

        let sym = cx.sym(node);
        cx.emit.reg_to_sym(&sym, dst);
        Ok(())
    }
}

fn emit_compare(
    cx: &mut LowerCx<'_>,
    dst: Reg,
    a: i16,
    b: i16,
    literal: Option<&[u8]>,
    len: usize,
) {
    if len == 0 {
        cx.emit.mov(dst, Operand::Imm(0));
        return;
    }

    let done = cx.emit.alloc_label();
    for i in 0..len {
        let step = i as i16;
        cx.emit.emit(Insn::Load {
            width: Width::B,
            dst,
            base: Reg::BP,
            off: a + step,
        });

        match literal {
            Some(bytes) => {
                let byte = bytes.get(i).copied().unwrap_or(0);
                cx.emit.alu(AluOp::Sub, dst, Operand::Imm(i32::from(byte)));
            }
            None => {
                cx.emit.emit(Insn::Load {
                    width: Width::B,
                    dst: Reg::R1,
                    base: Reg::BP,
                    off: b + step,
                });
                cx.emit.alu(AluOp::Sub, dst, Operand::Reg(Reg::R1));
            }
        }

        if i + 1 == len {
            break;
        }

        match literal {
            Some(bytes) if bytes.get(i).copied().unwrap_or(0) == 0 => break,
            Some(_) => {}
            None => cx.emit.jump(Cond::Eq(Reg::R1, Operand::Imm(0)), done),
        }
        cx.emit.jump(Cond::Ne(dst, Operand::Imm(0)), done);
    }
    cx.emit.place_label(done);
}
