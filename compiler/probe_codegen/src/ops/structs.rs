//! Struct literals: `:struct(a, b, ...)`.
//!
//! The literal's type is a fresh anonymous struct with fields `f0..fN-1`
//! typed from the arguments. Arguments are built in place: each one is
//! pinned at its field offset inside the literal's stack region before it
//! is lowered, so the copy in `ir_post` is usually a no-op.

use probe_ir::{IrsHints, NodeId};
use probe_types::{Field, LayoutError};
use smallvec::SmallVec;

use super::{Operator, Progress};
use crate::error::{Arity, CodegenError, TypeErrorKind};
use crate::infer::InferCx;
use crate::lower::LowerCx;

pub struct StructLit;

fn field_offsets(cx: &LowerCx<'_>, node: NodeId) -> (SmallVec<[usize; 8]>, usize) {
    let Some(def) = cx.types.struct_def(cx.ty(node)) else {
        unreachable!("struct literal typed as a non-struct")
    };
    (def.offsets.iter().copied().collect(), def.size)
}

impl Operator for StructLit {
    fn name(&self) -> &'static str {
        ":struct"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(1)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        if cx.ty(node).is_some() {
            return Ok(Progress::Done);
        }

        let args: SmallVec<[NodeId; 4]> = cx.graph.args(node).iter().copied().collect();
        let mut fields = Vec::with_capacity(args.len());
        for (i, &arg) in args.iter().enumerate() {
            let Some(ty) = cx.ty(arg) else {
                return Ok(Progress::Deferred);
            };
            if cx.types.is_map(ty) {
                return Err(cx.error(arg, TypeErrorKind::MapValue { ty }));
            }
            cx.require_sized(arg, ty)?;
            fields.push(Field::new(format!("f{i}"), ty));
        }

        match cx.types.add_anon_struct(fields) {
            Ok(ty) => {
                tracing::debug!(ty = %cx.types.display(ty), "registered struct literal type");
                cx.done(node, ty)
            }
            Err(LayoutError::Unsized { field, ty }) => {
                let at = field
                    .strip_prefix('f')
                    .and_then(|i| i.parse::<usize>().ok())
                    .and_then(|i| args.get(i).copied())
                    .unwrap_or(node);
                Err(cx.error(at, TypeErrorKind::Unsized { ty }))
            }
        }
    }

    fn ir_pre(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        cx.hint(node, IrsHints::STACK);
        cx.init_sym(node)?;
        let base = cx.stack_of(node);
        let (offsets, size) = field_offsets(cx, node);

        let args: SmallVec<[NodeId; 4]> = cx.graph.args(node).iter().copied().collect();
        let mut end = 0;
        for (&arg, &offset) in args.iter().zip(&offsets) {
            if offset > end {
                cx.emit.bzero(base + end as i16, offset - end);
            }
            if !cx.sym(arg).irs.is_assigned() {
                cx.pin(arg, base + offset as i16);
            }
            end = offset + cx.size_of(arg);
        }
        if size > end {
            cx.emit.bzero(base + end as i16, size - end);
        }
        Ok(())
    }

    fn ir_post(&self, cx: &mut LowerCx<'_>, node: NodeId) -> Result<(), CodegenError> {
        let base = cx.stack_of(node);
        let (offsets, _) = field_offsets(cx, node);

        let args: SmallVec<[NodeId; 4]> = cx.graph.args(node).iter().copied().collect();
        for (&arg, &offset) in args.iter().zip(&offsets) {
            let sym = cx.sym(arg);
            if sym.irs.has(IrsHints::VIRTUAL) {
                continue;
            }
            cx.emit.sym_to_stack(base + offset as i16, &sym);
        }
        Ok(())
    }
}
