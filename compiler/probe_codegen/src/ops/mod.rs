//! Built-in operators.
//!
//! Every operator is a zero-sized type implementing [`Operator`]. A hook
//! that an operator does not override is a no-op, so each file below only
//! spells out the phases its operator takes part in.
//!
//! | Operator   | rewrite | validate | infer | pre | post |
//! |------------|:-------:|:--------:|:-----:|:---:|:----:|
//! | `strcmp`   |         |          |   x   |  x  |  x   |
//! | `mem`      |         |    x     |   x   |     |  x   |
//! | `str`      |         |    x     |   x   |     |  x   |
//! | `->`       |    x    |    x     |       |     |      |
//! | `.`        |         |    x     |   x   |  x  |  x   |
//! | `u*`       |         |          |   x   |     |  x   |
//! | `[]`       |         |          |   x   |  x  |  x   |
//! | `:struct`  |         |          |   x   |  x  |  x   |
//! | `=`        |         |    x     |   x   |  x  |  x   |
//! | `delete`   |         |    x     |   x   |  x  |  x   |
//! | `:block`   |         |          |   x   |     |      |
//!
//! Leaves (identifiers, numbers, strings) go through the same trait via
//! [`leaf`], but are dispatched on node kind rather than by name.

mod assign;
mod block;
mod leaf;
mod member;
mod memory;
mod strcmp;
mod structs;
mod subscript;

use probe_ir::{ExprGraph, NodeId, NodeKind};
use rustc_hash::FxHashMap;

use crate::error::{Arity, CodegenError};
use crate::infer::InferCx;
use crate::lower::LowerCx;

/// Outcome of a type-infer hook that did not fail.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// The node is typed.
    Done,
    /// Operand types are not known yet; try again next pass.
    Deferred,
}

/// A built-in operator: a name, an arity and up to five hooks.
pub trait Operator: Sync {
    fn name(&self) -> &'static str;

    fn arity(&self) -> Arity;

    /// Replace `node` with an equivalent subtree built from other
    /// operators. Returns the replacement.
    fn rewrite(&self, _graph: &mut ExprGraph, _node: NodeId) -> Option<NodeId> {
        None
    }

    /// Type-independent shape checks, run before inference.
    fn static_validate(&self, _graph: &ExprGraph, _node: NodeId) -> Result<(), CodegenError> {
        Ok(())
    }

    /// Must return immediately, without mutation, when `node` is typed.
    fn type_infer(&self, _cx: &mut InferCx<'_>, _node: NodeId) -> Result<Progress, CodegenError> {
        Ok(Progress::Done)
    }

    /// Pre-order codegen: push storage hints down to arguments.
    fn ir_pre(&self, _cx: &mut LowerCx<'_>, _node: NodeId) -> Result<(), CodegenError> {
        Ok(())
    }

    /// Post-order codegen: emit this node's code and settle its storage.
    fn ir_post(&self, _cx: &mut LowerCx<'_>, _node: NodeId) -> Result<(), CodegenError> {
        Ok(())
    }
}

/// The closed set of named built-ins.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Strcmp,
    Mem,
    Str,
    Arrow,
    Dot,
    Deref,
    Subscript,
    Struct,
    Assign,
    Delete,
    Block,
}

impl Builtin {
    pub const ALL: [Builtin; 11] = [
        Builtin::Strcmp,
        Builtin::Mem,
        Builtin::Str,
        Builtin::Arrow,
        Builtin::Dot,
        Builtin::Deref,
        Builtin::Subscript,
        Builtin::Struct,
        Builtin::Assign,
        Builtin::Delete,
        Builtin::Block,
    ];

    pub fn operator(self) -> &'static dyn Operator {
        match self {
            Builtin::Strcmp => &strcmp::Strcmp,
            Builtin::Mem => &memory::Mem,
            Builtin::Str => &memory::Str,
            Builtin::Arrow => &member::Arrow,
            Builtin::Dot => &member::Dot,
            Builtin::Deref => &member::Deref,
            Builtin::Subscript => &subscript::Subscript,
            Builtin::Struct => &structs::StructLit,
            Builtin::Assign => &assign::Assign,
            Builtin::Delete => &assign::Delete,
            Builtin::Block => &block::Block,
        }
    }
}

/// Immutable name → operator table, built once per session.
pub struct Registry {
    by_name: FxHashMap<&'static str, &'static dyn Operator>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Registry {
    pub fn builtin() -> Self {
        let by_name = Builtin::ALL
            .iter()
            .map(|b| {
                let op = b.operator();
                (op.name(), op)
            })
            .collect();
        Self { by_name }
    }

    pub fn lookup(&self, name: &str) -> Option<&'static dyn Operator> {
        self.by_name.get(name).copied()
    }

    /// The operator handling `node`: built-in behaviour for leaves, the
    /// named operator otherwise.
    pub fn dispatch(
        &self,
        graph: &ExprGraph,
        node: NodeId,
    ) -> Result<&'static dyn Operator, CodegenError> {
        match &graph.node(node).kind {
            NodeKind::Ident(_) => Ok(&leaf::Ident),
            NodeKind::Num(_) => Ok(&leaf::Num),
            NodeKind::Str(_) => Ok(&leaf::Str),
            NodeKind::Expr(op) => self.lookup(op).ok_or_else(|| CodegenError::UnknownOperator {
                op: op.clone(),
                node,
                span: graph.span(node),
            }),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("ops", &names).finish()
    }
}

#[cfg(test)]
mod tests;
