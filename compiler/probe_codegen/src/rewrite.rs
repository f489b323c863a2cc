//! Desugaring pass, run once before inference.
//!
//! Pre-order: a node is rewritten until its operator declines, then the
//! walk continues into the replacement's arguments.

use probe_ir::{ExprGraph, NodeId};
use smallvec::SmallVec;

use crate::error::CodegenError;
use crate::ops::Registry;
use crate::stack::ensure_sufficient_stack;

/// Rewrite the tree at `node`. Returns the node now occupying its place.
pub fn rewrite(
    registry: &Registry,
    graph: &mut ExprGraph,
    mut node: NodeId,
) -> Result<NodeId, CodegenError> {
    ensure_sufficient_stack(|| {
        loop {
            let op = registry.dispatch(graph, node)?;
            match op.rewrite(graph, node) {
                Some(replacement) => {
                    tracing::trace!(op = op.name(), from = ?node, to = ?replacement, "rewrite");
                    node = replacement;
                }
                None => break,
            }
        }

        let args: SmallVec<[NodeId; 4]> = graph.args(node).iter().copied().collect();
        for arg in args {
            rewrite(registry, graph, arg)?;
        }
        Ok(node)
    })
}
