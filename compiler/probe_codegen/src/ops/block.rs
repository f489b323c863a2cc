//! `:block(s1, s2, ...)`: statements of a probe body, lowered in order.

use probe_ir::NodeId;
use probe_types::TypeId;

use super::{Operator, Progress};
use crate::error::{Arity, CodegenError};
use crate::infer::InferCx;

pub struct Block;

impl Operator for Block {
    fn name(&self) -> &'static str {
        ":block"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn type_infer(&self, cx: &mut InferCx<'_>, node: NodeId) -> Result<Progress, CodegenError> {
        if cx.ty(node).is_some() {
            return Ok(Progress::Done);
        }
        let pending = cx.graph.args(node).iter().any(|&s| cx.ty(s).is_none());
        if pending {
            return Ok(Progress::Deferred);
        }
        cx.done(node, TypeId::VOID)
    }
}
