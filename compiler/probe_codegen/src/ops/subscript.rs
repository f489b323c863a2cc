//! `src[key]`: map lookup, or array/pointer indexing.
//!
//! Inference runs both ways. With the container typed, the result is its
//! element type. With the result typed from above (an assignment target)
//! and the map still unknown, the map is materialized from the key type and
//! the result type. The first site to do so fixes the map for every use.
//!
//! Only map subscripts are lowered.

use probe_ir::{IrsHints, NodeId, Reg};
use probe_types::{TypeData, TypeId};

use super::{Operator, Progress};
use crate::error::{Arity, CodegenError, TypeErrorKind};
use crate::infer::InferCx;
use crate::insn::{Cond, Helper, Operand};
use crate::lower::LowerCx;
use crate::maps::is_map_name;

pub struct Subscript;

impl Subscript {
    fn infer_up(
        cx: &mut InferCx<'_>,
        node: NodeId,
        src_ty: TypeId,
        key: NodeId,
        key_ty: TypeId,
    ) -> Result<Progress, CodegenError> {
        let (elem, map_key) = match cx.types.get(cx.types.base(src_ty)) {
            TypeData::Map { key, value, .. } => (*value, Some(*key)),
            TypeData::Array { elem, .. } => (*elem, None),
            TypeData::Pointer { pointee } => (*pointee, None),
            _ => {
                let src = cx.graph.arg(node, 0);
                return Err(cx.error(src, TypeErrorKind::NotSubscriptable { ty: src_ty }));
            }
        };

        match map_key {
            Some(expected) => {
                if cx.types.is_map(key_ty) {
                    return Err(cx.error(key, TypeErrorKind::MapValue { ty: key_ty }));
                }
                cx.require_sized(key, key_ty)?;
                if !cx.types.compatible(expected, key_ty) {
                    return Err(cx.error(
                        key,
                        TypeErrorKind::MapKeyMismatch {
                            expected,
                            found: key_ty,
                        },
                    ));
                }
            }
            None => {
                if !cx.types.is_scalar(key_ty) {
                    return Err(cx.error(key, TypeErrorKind::NonScalarKey { ty: key_ty }));
                }
            }
        }

        match cx.ty(node) {
            None => cx.done(node, elem),
            // Typed from above while the map was typed elsewhere.
            Some(ty) if !cx.types.compatible(elem, ty) => Err(cx.error(
                node,
                TypeErrorKind::IncompatibleAssign { lhs: elem, rhs: ty },
            )),
            Some(_) => Ok(Progress::Done),
        }
    }

    fn infer_down(
        cx: &mut InferCx<'_>,
        node: NodeId,
        value: TypeId,
        key: NodeId,
        key_ty: TypeId,
    ) -> Result<Progress, CodegenError> {
        let src = cx.graph.arg(node, 0);
        let name = match cx.graph.node(src).as_ident() {
            Some(name) if is_map_name(name) => name.to_owned(),
            _ => return Ok(Progress::Deferred),
        };

        if cx.types.is_map(key_ty) {
            return Err(cx.error(key, TypeErrorKind::MapValue { ty: key_ty }));
        }
        cx.require_sized(key, key_ty)?;
        if cx.types.is_map(value) {
            return Err(cx.error(node, TypeErrorKind::MapValue { ty: value }));
        }
        cx.require_sized(node, value)?;

        let ty = cx.maps.materialize(cx.types, &name, key_ty, value).ty;
        cx.hint(src, IrsHints::VIRTUAL);
        cx.set_ty(src, ty);
        Ok(Progress::Done)
    }
}

impl Operator for Subscript {
    fn name(&self) -> &'static str {
        "[]"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        let (src, key) = (cx.graph.arg(node, 0), cx.graph.arg(node, 1));
        let Some(key_ty) = cx.ty(key) else {
            return Ok(Progress::Deferred);
        };

        match (cx.ty(src), cx.ty(node)) {
            (Some(src_ty), _) => Self::infer_up(cx, node, src_ty, key, key_ty),
            (None, Some(value)) => Self::infer_down(cx, node, value, key, key_ty),
            (None, None) => Ok(Progress::Deferred),
        }
    }

    fn ir_pre(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let src = cx.graph.arg(node, 0);
        if cx.types.is_map(cx.ty(src)) {
            // Helpers take the key by address.
            let key = cx.graph.arg(node, 1);
            cx.hint(key, IrsHints::STACK);
        }
        Ok(())
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let src = cx.graph.arg(node, 0);
        match cx.types.get(cx.types.base(cx.ty(src))) {
            TypeData::Map { .. } => {}
            TypeData::Array { .. } => unreachable!("array subscripts are not lowered"),
            TypeData::Pointer { .. } => unreachable!("pointer subscripts are not lowered"),
            _ => unreachable!("subscript of a non-container survived inference"),
        }

        cx.hint(node, IrsHints::STACK);
        cx.init_sym(node)?;
        let sym = cx.sym(node);
        if sym.irs.has(IrsHints::LVAL) {
            // About to be overwritten.
            return Ok(());
        }

        let key = cx.graph.arg(node, 1);
        let key_off = cx.stack_of(key);
        let dst = cx.stack_of(node);

        cx.ldmap(Reg::R1, src);
        cx.emit.ldbp(Reg::R2, key_off);
        cx.emit.call(Helper::MapLookup);

        let miss = cx.emit.alloc_label();
        let hit = cx.emit.alloc_label();
        cx.emit.jump(Cond::Eq(Reg::R0, Operand::Imm(0)), miss);
        cx.emit.copy_from_ptr(Reg::R0, dst, sym.irs.size);
        cx.emit.jump(Cond::Always, hit);

        cx.emit.place_label(miss);
        cx.emit.bzero(dst, sym.irs.size);
        cx.emit.place_label(hit);
        Ok(())
    }
}
