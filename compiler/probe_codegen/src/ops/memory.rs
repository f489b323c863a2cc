//! `mem(ptr[, len])` and `str(ptr[, len])`: raw reads from arbitrary
//! addresses into the stack.

use probe_ir::{ExprGraph, IrsHints, NodeId, Reg};
use probe_types::TypeId;

use super::{Operator, Progress};
use crate::error::{Arity, CodegenError, StaticErrorKind, TypeErrorKind};
use crate::infer::InferCx;
use crate::insn::{Helper, Operand};
use crate::lower::LowerCx;

/// The optional length argument must be a literal.
fn validate_length(graph: &ExprGraph, node: NodeId) -> Result<(), CodegenError> {
    match graph.args(node).get(1) {
        Some(&len) if graph.node(len).as_num().is_none() => Err(CodegenError::Static {
            kind: StaticErrorKind::LengthNotConstant,
            node: len,
            span: graph.span(len),
        }),
        _ => Ok(()),
    }
}

/// Shared by `mem` and `str`: the result is `char[len]`.
fn infer_buffer(cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
    if cx.ty(node).is_some() {
        return Ok(Progress::Done);
    }
    let ptr = cx.graph.arg(node, 0);
    let Some(ptr_ty) = cx.ty(ptr) else {
        return Ok(Progress::Deferred);
    };

    if cx.types.is_map(ptr_ty) {
        return Err(cx.error(ptr, TypeErrorKind::MapValue { ty: ptr_ty }));
    }
    if !cx.types.is_register_sized(ptr_ty) {
        return Err(cx.error(node, TypeErrorKind::PointerCast { ty: ptr_ty }));
    }

    let mut size = cx.config.string_size;
    if let Some(&len) = cx.graph.args(node).get(1) {
        let value = cx.graph.node(len).as_num().unwrap_or(0);
        let max = cx.config.max_stack;
        match usize::try_from(value) {
            Ok(v) if (1..=max).contains(&v) => size = v,
            _ => {
                return Err(cx.error(
                    len,
                    TypeErrorKind::LengthOutOfRange { len: value, max },
                ))
            }
        }
        cx.hint(len, IrsHints::VIRTUAL);
    }

    let ty = cx.types.array_of(TypeId::CHAR, size);
    cx.done(node, ty)
}

/// Raw bytes.
pub struct Mem;

impl Operator for Mem {
    fn name(&self) -> &'static str {
        "mem"
    }

    fn arity(&self) -> Arity {
        Arity::Range(1, 2)
    }

    fn static_validate(&self, graph: &ExprGraph, node: NodeId) -> Result<(), CodegenError> {
        validate_length(graph, node)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        infer_buffer(cx, node)
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        cx.hint(node, IrsHints::STACK);
        cx.init_sym(node)?;

        let ptr = cx.sym(cx.graph.arg(node, 0));
        cx.emit.sym_to_reg(Reg::R3, &ptr);
        let sym = cx.sym(node);
        cx.emit.read_to_sym(&sym, Reg::R3);
        Ok(())
    }
}

/// NUL-terminated string, zero-padded to its full size.
pub struct Str;

impl Operator for Str {
    fn name(&self) -> &'static str {
        "str"
    }

    fn arity(&self) -> Arity {
        Arity::Range(1, 2)
    }

    fn static_validate(&self, graph: &ExprGraph, node: NodeId) -> Result<(), CodegenError> {
        validate_length(graph, node)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        infer_buffer(cx, node)
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        cx.hint(node, IrsHints::STACK);
        cx.init_sym(node)?;

        let sym = cx.sym(node);
        let off = cx.stack_of(node);
        cx.emit.bzero(off, sym.irs.size);

        cx.emit.ldbp(Reg::R1, off);
        cx.emit.mov(Reg::R2, Operand::Imm(sym.irs.size as i32));
        let ptr = cx.sym(cx.graph.arg(node, 0));
        cx.emit.sym_to_reg(Reg::R3, &ptr);
        // The helper returns a length, not a status.
        cx.emit.call(Helper::ProbeReadStr);
        Ok(())
    }
}
