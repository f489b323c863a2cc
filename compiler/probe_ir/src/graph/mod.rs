//! Arena-backed expression graph.
//!
//! # Design
//!
//! Nodes live in a `Vec<Option<Node>>`; a [`NodeId`] is an index into it.
//! Freeing a node empties its slot. Slots are never reused, so a stale id
//! panics on access instead of aliasing a newer node.
//!
//! Constructors set the parent link of every argument, which is what
//! [`ExprGraph::replace`] relies on to find the slot to splice into and to
//! tell which of the old node's children were adopted by the replacement.

use std::fmt::Write as _;

use smallvec::SmallVec;

use crate::{Node, NodeId, NodeKind, Span, Symbol};

/// Arena of expression nodes with a single root.
#[derive(Clone, Debug, Default)]
pub struct ExprGraph {
    nodes: Vec<Option<Node>>,
    root: Option<NodeId>,
}

impl ExprGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        for &arg in &node.args {
            self.node_mut(arg).parent = Some(id);
        }
        self.nodes.push(Some(node));
        id
    }

    // === Construction ===

    /// Operator node applying `op` to `args`. Each argument is reparented.
    pub fn expr(&mut self, op: impl Into<String>, args: impl IntoIterator<Item = NodeId>) -> NodeId {
        let args: SmallVec<[NodeId; 4]> = args.into_iter().collect();
        self.push(Node::new(NodeKind::Expr(op.into()), args))
    }

    pub fn ident(&mut self, name: impl Into<String>) -> NodeId {
        self.push(Node::new(NodeKind::Ident(name.into()), SmallVec::new()))
    }

    pub fn num(&mut self, value: i64) -> NodeId {
        self.push(Node::new(NodeKind::Num(value), SmallVec::new()))
    }

    pub fn string(&mut self, value: impl Into<String>) -> NodeId {
        self.push(Node::new(NodeKind::Str(value.into()), SmallVec::new()))
    }

    pub fn set_span(&mut self, id: NodeId, span: Span) {
        self.node_mut(id).span = span;
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.node_mut(id).parent = None;
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    // === Access ===

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.index()), Some(Some(_)))
    }

    /// # Panics
    /// Panics if `id` was freed or never allocated.
    #[inline]
    #[track_caller]
    pub fn node(&self, id: NodeId) -> &Node {
        match self.nodes.get(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("access to freed or foreign node {id:?}"),
        }
    }

    #[inline]
    #[track_caller]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("access to freed or foreign node {id:?}"),
        }
    }

    #[inline]
    pub fn args(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).args
    }

    /// The `i`th argument.
    ///
    /// # Panics
    /// Panics if the node has fewer arguments; arity is validated before any
    /// hook runs.
    #[inline]
    #[track_caller]
    pub fn arg(&self, id: NodeId, i: usize) -> NodeId {
        self.node(id).args[i]
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[inline]
    pub fn sym(&self, id: NodeId) -> &Symbol {
        &self.node(id).sym
    }

    #[inline]
    pub fn sym_mut(&mut self, id: NodeId) -> &mut Symbol {
        &mut self.node_mut(id).sym
    }

    #[inline]
    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    /// Whether `id` is an application of `op`.
    pub fn is_op(&self, id: NodeId, op: &str) -> bool {
        self.node(id).op() == Some(op)
    }

    // === Rewriting ===

    /// Splice `new` into the position held by `old`, then free `old`.
    ///
    /// `new` takes over `old`'s argument slot in its parent (or the root) and
    /// inherits its span when it has none. Any descendant of `old` that was
    /// not reparented into `new` is freed along with it.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        let parent = self.node(old).parent;
        match parent {
            Some(p) => {
                let node = self.node_mut(p);
                if let Some(slot) = node.args.iter_mut().find(|a| **a == old) {
                    *slot = new;
                }
            }
            None => {
                if self.root == Some(old) {
                    self.root = Some(new);
                }
            }
        }

        let span = self.node(old).span;
        let replacement = self.node_mut(new);
        replacement.parent = parent;
        if replacement.span == Span::DUMMY {
            replacement.span = span;
        }

        self.free(old);
    }

    fn free(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(node) = self.nodes[id.index()].take() else {
                continue;
            };
            for arg in node.args {
                if self.contains(arg) && self.node(arg).parent == Some(id) {
                    pending.push(arg);
                }
            }
        }
    }

    // === Traversal ===

    /// Depth-first post-order from `start`, children in argument order.
    pub fn postorder(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![(start, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
                continue;
            }
            stack.push((id, true));
            for &arg in self.args(id).iter().rev() {
                stack.push((arg, false));
            }
        }
        out
    }

    // === Rendering ===

    /// Render `id` back to expression text for diagnostics.
    pub fn render(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        let op = match &node.kind {
            NodeKind::Ident(name) => {
                out.push_str(name);
                return;
            }
            NodeKind::Num(v) => {
                let _ = write!(out, "{v}");
                return;
            }
            NodeKind::Str(s) => {
                let _ = write!(out, "{s:?}");
                return;
            }
            NodeKind::Expr(op) => op.as_str(),
        };

        let args = &node.args;
        match (op, args.as_slice()) {
            ("." | "->", [base, member]) => {
                self.render_into(*base, out);
                out.push_str(op);
                match self.node(*member).as_str() {
                    Some(name) => out.push_str(name),
                    None => self.render_into(*member, out),
                }
            }
            ("u*", [inner]) => {
                out.push('*');
                self.render_into(*inner, out);
            }
            ("[]", [base, key]) => {
                self.render_into(*base, out);
                out.push('[');
                self.render_into(*key, out);
                out.push(']');
            }
            ("=", [lhs, rhs]) => {
                self.render_into(*lhs, out);
                out.push_str(" = ");
                self.render_into(*rhs, out);
            }
            ("delete", [target]) => {
                out.push_str("delete ");
                self.render_into(*target, out);
            }
            (":struct", _) => {
                out.push_str("{ ");
                self.render_list(args, ", ", out);
                out.push_str(" }");
            }
            (":block", _) => self.render_list(args, "; ", out),
            _ => {
                out.push_str(op);
                out.push('(');
                self.render_list(args, ", ", out);
                out.push(')');
            }
        }
    }

    fn render_list(&self, args: &[NodeId], sep: &str, out: &mut String) {
        for (i, &arg) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(sep);
            }
            self.render_into(arg, out);
        }
    }
}
