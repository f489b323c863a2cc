//! Member access (`.`, `->`) and pointer dereference (`u*`).
//!
//! `p->m` is rewritten to `(*p).m` before inference, so only `.` and `u*`
//! generate code. When `.` sits directly on a `u*`, the dereference does not
//! load the whole aggregate: `.` reads just the member bytes through the
//! pointer instead.

use probe_ir::{ExprGraph, IrsHints, NodeId, Reg};
use probe_types::TypeData;

use super::{Operator, Progress};
use crate::error::{Arity, CodegenError, StaticErrorKind, TypeErrorKind};
use crate::infer::InferCx;
use crate::insn::{AluOp, Insn, Operand, Width};
use crate::lower::LowerCx;

fn validate_member(graph: &ExprGraph, node: NodeId) -> Result<(), CodegenError> {
    let member = graph.arg(node, 1);
    if graph.node(member).as_str().is_some() {
        return Ok(());
    }
    Err(CodegenError::Static {
        kind: StaticErrorKind::MemberName,
        node: member,
        span: graph.span(member),
    })
}

fn member_name(graph: &ExprGraph, node: NodeId) -> String {
    graph
        .node(graph.arg(node, 1))
        .as_str()
        .unwrap_or_default()
        .to_owned()
}

/// `p->m`, sugar for `(*p).m`.
pub struct Arrow;

impl Operator for Arrow {
    fn name(&self) -> &'static str {
        "->"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn static_validate(&self, graph: &ExprGraph, node: NodeId) -> Result<(), CodegenError> {
        validate_member(graph, node)
    }

    fn rewrite(&self, graph: &mut ExprGraph, node: NodeId) -> Option<NodeId> {
        let (ptr, member) = (graph.arg(node, 0), graph.arg(node, 1));
        let span = graph.span(node);

        let deref = graph.expr("u*", [ptr]);
        graph.set_span(deref, span);
        let dot = graph.expr(".", [deref, member]);
        graph.replace(node, dot);
        Some(dot)
    }
}

/// `s.m`
pub struct Dot;

impl Operator for Dot {
    fn name(&self) -> &'static str {
        "."
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn static_validate(&self, graph: &ExprGraph, node: NodeId) -> Result<(), CodegenError> {
        validate_member(graph, node)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        if cx.ty(node).is_some() {
            return Ok(Progress::Done);
        }
        let sou = cx.graph.arg(node, 0);
        let Some(ty) = cx.ty(sou) else {
            return Ok(Progress::Deferred);
        };

        if cx.types.struct_def(ty).is_none() {
            return Err(cx.error(node, TypeErrorKind::NotAggregate { ty }));
        }
        let name = member_name(cx.graph, node);
        let Some(field) = cx.types.field(ty, &name) else {
            return Err(cx.error(node, TypeErrorKind::NoMember { ty, member: name }));
        };
        let field_ty = field.ty;

        // The name is consumed here; it never needs storage.
        let member = cx.graph.arg(node, 1);
        cx.hint(member, IrsHints::VIRTUAL);
        cx.done(node, field_ty)
    }

    fn ir_pre(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let sou = cx.graph.arg(node, 0);
        if cx.graph.is_op(sou, "u*") {
            cx.hint(sou, IrsHints::DOT);
            // Read through the pointer with a helper, which needs a stack
            // destination.
            cx.hint(node, IrsHints::STACK);
        }
        Ok(())
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let sou = cx.graph.arg(node, 0);
        cx.init_sym(node)?;

        let name = member_name(cx.graph, node);
        let Some(offset) = cx.types.offsetof(cx.ty(sou), &name) else {
            unreachable!("member `{name}` vanished after inference")
        };
        let sym = cx.sym(node);

        if !cx.sym(sou).irs.is_assigned() {
            // `(*ptr).m` with the dereference left unloaded.
            let ptr = cx.sym(cx.graph.arg(sou, 0));
            cx.emit.sym_to_reg(Reg::R3, &ptr);
            if offset != 0 {
                cx.emit.alu(AluOp::Add, Reg::R3, Operand::Imm(offset as i32));
            }
            cx.emit.read_to_sym(&sym, Reg::R3);
            return Ok(());
        }

        let src = cx.stack_of(sou) + offset as i16;
        match sym.irs.reg() {
            Some(dst) => {
                let Some(width) = Width::from_size(sym.irs.size) else {
                    unreachable!("register holds a {}-byte member", sym.irs.size)
                };
                cx.emit.emit(Insn::Load {
                    width,
                    dst,
                    base: Reg::BP,
                    off: src,
                });
            }
            None => {
                let dst = cx.stack_of(node);
                cx.emit.stack_copy(dst, src, sym.irs.size);
            }
        }
        Ok(())
    }
}

/// `*p`
pub struct Deref;

impl Operator for Deref {
    fn name(&self) -> &'static str {
        "u*"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        if cx.ty(node).is_some() {
            return Ok(Progress::Done);
        }
        let ptr = cx.graph.arg(node, 0);
        let Some(ty) = cx.ty(ptr) else {
            return Ok(Progress::Deferred);
        };

        // `void *` and pointers to functions have nothing to read.
        let pointee = match cx.types.get(cx.types.base(ty)) {
            TypeData::Pointer { pointee } => Some(*pointee),
            _ => None,
        };
        match pointee {
            Some(pointee) if cx.types.sizeof(pointee).is_some_and(|s| s > 0) => {
                cx.done(node, pointee)
            }
            _ => Err(cx.error(node, TypeErrorKind::NotPointer { ty })),
        }
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let irs = cx.sym(node).irs;
        if irs.has(IrsHints::DOT) {
            // The parent `.` reads the member through our pointer.
            return Ok(());
        }

        cx.hint(node, IrsHints::STACK);
        cx.init_sym(node)?;
        if irs.has(IrsHints::LVAL) {
            return Ok(());
        }

        let ptr = cx.sym(cx.graph.arg(node, 0));
        cx.emit.sym_to_reg(Reg::R3, &ptr);
        let sym = cx.sym(node);
        cx.emit.read_to_sym(&sym, Reg::R3);
        Ok(())
    }
}
