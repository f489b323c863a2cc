//! Map element assignment (`@m[k] = v`) and deletion (`delete(@m[k])`).
//!
//! Both targets must be a subscript of a map identifier, which is checked
//! before inference. The target subscript is lowered with the `lval` hint,
//! so it only gets storage and never performs a lookup.

use probe_ir::{ExprGraph, IrsHints, NodeId, Reg};
use probe_types::TypeId;

use super::{Operator, Progress};
use crate::error::{Arity, CodegenError, StaticErrorKind, TypeErrorKind};
use crate::infer::InferCx;
use crate::insn::{Helper, Operand};
use crate::lower::LowerCx;
use crate::maps::is_map_name;

fn is_map_element(graph: &ExprGraph, node: NodeId) -> bool {
    graph.is_op(node, "[]")
        && graph
            .node(graph.arg(node, 0))
            .as_ident()
            .is_some_and(is_map_name)
}

fn validate_target(
    graph: &ExprGraph,
    node: NodeId,
    kind: StaticErrorKind,
) -> Result<(), CodegenError> {
    if is_map_element(graph, graph.arg(node, 0)) {
        return Ok(());
    }
    Err(CodegenError::Static {
        kind,
        node,
        span: graph.span(node),
    })
}

/// `r1 = map, r2 = &key` for the map element `elem`.
fn load_map_and_key(cx: &mut LowerCx<'_>, elem: NodeId) {
    let (map, key) = (cx.graph.arg(elem, 0), cx.graph.arg(elem, 1));
    let key_off = cx.stack_of(key);
    cx.ldmap(Reg::R1, map);
    cx.emit.ldbp(Reg::R2, key_off);
}

/// `@m[k] = v`
pub struct Assign;

impl Operator for Assign {
    fn name(&self) -> &'static str {
        "="
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn static_validate(&self, graph: &ExprGraph, node: NodeId) -> Result<(), CodegenError> {
        validate_target(graph, node, StaticErrorKind::AssignTarget)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        if cx.ty(node).is_some() {
            return Ok(Progress::Done);
        }
        let (lhs, rhs) = (cx.graph.arg(node, 0), cx.graph.arg(node, 1));
        let Some(rhs_ty) = cx.ty(rhs) else {
            return Ok(Progress::Deferred);
        };
        if cx.types.is_map(rhs_ty) {
            return Err(cx.error(rhs, TypeErrorKind::MapValue { ty: rhs_ty }));
        }
        cx.require_sized(rhs, rhs_ty)?;

        match cx.ty(lhs) {
            // Downward: the target subscript materializes the map from this.
            None => cx.set_ty(lhs, rhs_ty),
            Some(lhs_ty) if !cx.types.compatible(lhs_ty, rhs_ty) => {
                return Err(cx.error(
                    node,
                    TypeErrorKind::IncompatibleAssign {
                        lhs: lhs_ty,
                        rhs: rhs_ty,
                    },
                ));
            }
            Some(_) => {}
        }
        cx.done(node, TypeId::VOID)
    }

    fn ir_pre(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let (lhs, rhs) = (cx.graph.arg(node, 0), cx.graph.arg(node, 1));

        // One slot for both sides: the value is built where the update
        // reads it from.
        let size = cx.size_of(lhs);
        let off = cx.reserve(node, size)?;
        cx.pin(lhs, off);
        cx.hint(lhs, IrsHints::LVAL);
        cx.pin(rhs, off);

        let key = cx.graph.arg(lhs, 1);
        cx.hint(key, IrsHints::STACK);
        Ok(())
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let (lhs, rhs) = (cx.graph.arg(node, 0), cx.graph.arg(node, 1));
        let (dst, src) = (cx.sym(lhs), cx.sym(rhs));
        cx.emit.sym_to_sym(&dst, &src);

        let value = cx.stack_of(lhs);
        load_map_and_key(cx, lhs);
        cx.emit.ldbp(Reg::R3, value);
        cx.emit.mov(Reg::R4, Operand::Imm(0));
        cx.emit.call(Helper::MapUpdate);
        cx.emit.check_status();
        Ok(())
    }
}

/// `delete(@m[k])`
pub struct Delete;

impl Operator for Delete {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn static_validate(&self, graph: &ExprGraph, node: NodeId) -> Result<(), CodegenError> {
        validate_target(graph, node, StaticErrorKind::DeleteTarget)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        if cx.ty(node).is_none() {
            cx.set_ty(node, TypeId::VOID);
        }
        Ok(Progress::Done)
    }

    fn ir_pre(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let elem = cx.graph.arg(node, 0);
        cx.hint(elem, IrsHints::LVAL | IrsHints::STACK);
        Ok(())
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let elem = cx.graph.arg(node, 0);
        load_map_and_key(cx, elem);
        // Deleting an absent key is not a failure.
        cx.emit.call(Helper::MapDelete);
        Ok(())
    }
}
