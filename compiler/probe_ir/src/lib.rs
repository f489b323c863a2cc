//! Expression graph for the probe compiler.
//!
//! A probe body is a tree of [`Node`]s stored in an [`ExprGraph`] arena and
//! addressed by [`NodeId`]. Every node carries exactly one [`Symbol`]: the
//! resolved type (filled in by inference) and its [`Irs`] storage record
//! (filled in by code generation).
//!
//! # Design
//!
//! - Nodes know their parent, so a rewrite can splice a new subtree into the
//!   parent's argument slot without a separate parent map
//! - Replaced nodes are freed from the arena; children that were reparented
//!   into the replacement survive
//! - Symbols are per node and mutated in place; nothing is shared

mod graph;
mod node;
mod span;
mod symbol;

pub use graph::ExprGraph;
pub use node::{Node, NodeId, NodeKind};
pub use span::{Span, SpanError};
pub use symbol::{Irs, IrsHints, Location, Reg, Symbol};

/// Compile-time size assertion.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}
