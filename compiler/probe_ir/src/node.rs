//! Graph nodes.

use std::fmt;

use smallvec::SmallVec;

use crate::{Span, Symbol};

/// Index of a node in its [`ExprGraph`](crate::ExprGraph).
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// What a node is.
///
/// Operator nodes are named by the operator they apply (`"."`, `"[]"`,
/// `"strcmp"`, ...). Struct member names are carried as [`NodeKind::Str`]
/// leaves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Expr(String),
    Ident(String),
    Num(i64),
    Str(String),
}

/// A node in the expression graph.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub args: SmallVec<[NodeId; 4]>,
    pub parent: Option<NodeId>,
    pub span: Span,
    pub sym: Symbol,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, args: SmallVec<[NodeId; 4]>) -> Self {
        Self {
            kind,
            args,
            parent: None,
            span: Span::DUMMY,
            sym: Symbol::default(),
        }
    }

    /// Operator name, or `None` for leaves.
    pub fn op(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Expr(op) => Some(op),
            _ => None,
        }
    }

    /// Whether this is a number or string literal.
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Num(_) | NodeKind::Str(_))
    }

    pub fn as_num(&self) -> Option<i64> {
        match self.kind {
            NodeKind::Num(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}
