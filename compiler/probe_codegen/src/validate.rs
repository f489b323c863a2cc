//! Structural checks, run before rewriting and inference.

use probe_ir::{ExprGraph, NodeId};

use crate::error::CodegenError;
use crate::ops::Registry;

/// Check every node under `root`: the operator exists, the argument count
/// fits its arity, and its own shape rules hold.
pub fn validate(registry: &Registry, graph: &ExprGraph, root: NodeId) -> Result<(), CodegenError> {
    for node in graph.postorder(root) {
        let op = registry.dispatch(graph, node)?;

        let found = graph.args(node).len();
        let expected = op.arity();
        if !expected.accepts(found) {
            return Err(CodegenError::Arity {
                op: op.name().to_owned(),
                expected,
                found,
                node,
                span: graph.span(node),
            });
        }

        op.static_validate(graph, node)?;
    }
    Ok(())
}
