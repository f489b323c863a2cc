//! Fixed-point type inference.
//!
//! Each pass visits every node reachable from the root in post-order and
//! runs its type-infer hook. Hooks may type the node itself (upward) or an
//! argument (downward, e.g. assignment typing its target), so one pass is
//! not always enough. Passes repeat until every node is typed, or until a
//! pass types nothing new, which is a deadlock reported at the first untyped
//! node in traversal order.

use probe_ir::{ExprGraph, IrsHints, NodeId};
use probe_types::{TypeId, TypeRegistry};

use crate::error::{CodegenError, CodegenWarning, TypeError, TypeErrorKind};
use crate::maps::MapTable;
use crate::ops::{Progress, Registry};
use crate::provider::Provider;
use crate::CodegenConfig;

/// What a run of the engine did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InferStats {
    pub passes: usize,
    /// Nodes that went from untyped to typed.
    pub newly_typed: usize,
}

/// State available to type-infer hooks.
pub struct InferCx<'a> {
    pub graph: &'a mut ExprGraph,
    pub types: &'a mut TypeRegistry,
    pub maps: &'a mut MapTable,
    pub provider: &'a dyn Provider,
    pub config: &'a CodegenConfig,
    pub warnings: &'a mut Vec<CodegenWarning>,
}

impl InferCx<'_> {
    #[inline]
    pub fn ty(&self, node: NodeId) -> Option<TypeId> {
        self.graph.sym(node).ty
    }

    #[inline]
    pub fn set_ty(&mut self, node: NodeId, ty: TypeId) {
        self.graph.sym_mut(node).ty = Some(ty);
    }

    /// Type `node` and report it done.
    pub fn done(&mut self, node: NodeId, ty: TypeId) -> Result<Progress, CodegenError> {
        self.set_ty(node, ty);
        Ok(Progress::Done)
    }

    pub fn hint(&mut self, node: NodeId, hints: IrsHints) {
        self.graph.sym_mut(node).irs.hints |= hints;
    }

    pub fn error(&self, node: NodeId, kind: TypeErrorKind) -> CodegenError {
        CodegenError::Type(TypeError {
            node,
            span: self.graph.span(node),
            kind,
        })
    }

    /// Fail with [`TypeErrorKind::Unsized`] at `node` unless a value of
    /// `ty` occupies at least one byte. `void` results (assignments,
    /// deletions) never get storage and cannot be stored or keyed on.
    pub fn require_sized(&self, node: NodeId, ty: TypeId) -> Result<(), CodegenError> {
        match self.types.sizeof(ty) {
            Some(size) if size > 0 => Ok(()),
            _ => Err(self.error(node, TypeErrorKind::Unsized { ty })),
        }
    }

    pub fn warn(&mut self, warning: CodegenWarning) {
        tracing::debug!(?warning, "codegen warning");
        self.warnings.push(warning);
    }
}

fn typed_count(graph: &ExprGraph, order: &[NodeId]) -> usize {
    order.iter().filter(|&&n| graph.sym(n).is_typed()).count()
}

/// Run inference from `root` to a fixed point.
pub fn infer(
    registry: &Registry,
    cx: &mut InferCx<'_>,
    root: NodeId,
) -> Result<InferStats, CodegenError> {
    let order = cx.graph.postorder(root);
    let initial = typed_count(cx.graph, &order);
    let mut stats = InferStats::default();
    let mut typed = initial;

    loop {
        stats.passes += 1;

        for &node in &order {
            let op = registry.dispatch(cx.graph, node)?;
            let progress = op.type_infer(cx, node)?;
            tracing::trace!(op = op.name(), ?node, ?progress, "type_infer");
        }

        let now = typed_count(cx.graph, &order);
        tracing::debug!(pass = stats.passes, typed = now, total = order.len(), "inference pass");

        if now == order.len() {
            stats.newly_typed = now - initial;
            return Ok(stats);
        }

        if now == typed {
            let stuck = order
                .iter()
                .copied()
                .find(|&n| !cx.graph.sym(n).is_typed())
                .unwrap_or(root);
            return Err(CodegenError::Unresolved {
                node: stuck,
                span: cx.graph.span(stuck),
            });
        }

        typed = now;
    }
}

#[cfg(test)]
mod tests;
