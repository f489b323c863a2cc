//! Code generation errors and warnings.
//!
//! Errors carry the node they were detected at and its span. They convert to
//! a [`Diagnostic`] via `to_diagnostic`, which renders the offending
//! expression and type names; the graph and registry are only needed then.

use std::fmt;

use probe_diagnostic::{Diagnostic, ErrorCode};
use probe_ir::{ExprGraph, NodeId, Span};
use probe_types::{TypeId, TypeRegistry};

use crate::emit::EmitError;

/// Accepted number of arguments.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "{k}"),
            Arity::Range(lo, hi) => write!(f, "{lo} to {hi}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

/// Structural problems found before inference.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StaticErrorKind {
    AssignTarget,
    DeleteTarget,
    MemberName,
    LengthNotConstant,
}

impl fmt::Display for StaticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticErrorKind::AssignTarget => write!(f, "only map elements can be assigned to"),
            StaticErrorKind::DeleteTarget => write!(f, "only map elements can be deleted"),
            StaticErrorKind::MemberName => write!(f, "expected a member name"),
            StaticErrorKind::LengthNotConstant => write!(f, "length must be a constant"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeErrorKind {
    IncompatibleAssign { lhs: TypeId, rhs: TypeId },
    NotPointer { ty: TypeId },
    NotAggregate { ty: TypeId },
    NoMember { ty: TypeId, member: String },
    NonScalarKey { ty: TypeId },
    NotSubscriptable { ty: TypeId },
    MapKeyMismatch { expected: TypeId, found: TypeId },
    PointerCast { ty: TypeId },
    LengthOutOfRange { len: i64, max: usize },
    MapValue { ty: TypeId },
    UnknownIdent { name: String },
    Unsized { ty: TypeId },
}

impl fmt::Display for TypeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeErrorKind::IncompatibleAssign { .. } => write!(f, "incompatible assignment"),
            TypeErrorKind::NotPointer { .. } => write!(f, "dereference of a non-pointer"),
            TypeErrorKind::NotAggregate { .. } => write!(f, "member access on a non-struct"),
            TypeErrorKind::NoMember { member, .. } => write!(f, "no member named `{member}`"),
            TypeErrorKind::NonScalarKey { .. } => write!(f, "subscript must be a scalar"),
            TypeErrorKind::NotSubscriptable { .. } => write!(f, "value is not subscriptable"),
            TypeErrorKind::MapKeyMismatch { .. } => write!(f, "map key type mismatch"),
            TypeErrorKind::PointerCast { .. } => write!(f, "value is too large for a pointer"),
            TypeErrorKind::LengthOutOfRange { len, max } => {
                write!(f, "length {len} is outside 1..={max}")
            }
            TypeErrorKind::MapValue { .. } => write!(f, "a map cannot be used as a value"),
            TypeErrorKind::UnknownIdent { name } => write!(f, "unknown identifier `{name}`"),
            TypeErrorKind::Unsized { .. } => write!(f, "value has no size"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("type error: {kind}")]
pub struct TypeError {
    pub node: NodeId,
    pub span: Span,
    pub kind: TypeErrorKind,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CodegenError {
    #[error("unknown operator `{op}`")]
    UnknownOperator { op: String, node: NodeId, span: Span },

    #[error("`{op}` takes {expected} argument(s), {found} given")]
    Arity {
        op: String,
        expected: Arity,
        found: usize,
        node: NodeId,
        span: Span,
    },

    #[error("{kind}")]
    Static {
        kind: StaticErrorKind,
        node: NodeId,
        span: Span,
    },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("unable to infer the type of an expression")]
    Unresolved { node: NodeId, span: Span },

    #[error("stack frame exhausted: {requested} more bytes needed, {used} of {max} in use")]
    StackExhausted {
        node: NodeId,
        span: Span,
        requested: usize,
        used: usize,
        max: usize,
    },

    #[error(transparent)]
    Emit(#[from] EmitError),
}

impl CodegenError {
    /// The node the error was detected at, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            CodegenError::UnknownOperator { node, .. }
            | CodegenError::Arity { node, .. }
            | CodegenError::Static { node, .. }
            | CodegenError::Type(TypeError { node, .. })
            | CodegenError::Unresolved { node, .. }
            | CodegenError::StackExhausted { node, .. } => Some(*node),
            CodegenError::Emit(_) => None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CodegenError::UnknownOperator { .. } => ErrorCode::E1001,
            CodegenError::Arity { .. } => ErrorCode::E1002,
            CodegenError::Static { kind, .. } => match kind {
                StaticErrorKind::AssignTarget => ErrorCode::E1003,
                StaticErrorKind::DeleteTarget => ErrorCode::E1004,
                StaticErrorKind::MemberName => ErrorCode::E1005,
                StaticErrorKind::LengthNotConstant => ErrorCode::E1006,
            },
            CodegenError::Type(err) => match err.kind {
                TypeErrorKind::IncompatibleAssign { .. } => ErrorCode::E2001,
                TypeErrorKind::NotPointer { .. } => ErrorCode::E2002,
                TypeErrorKind::NotAggregate { .. } => ErrorCode::E2003,
                TypeErrorKind::NoMember { .. } => ErrorCode::E2004,
                TypeErrorKind::NonScalarKey { .. } => ErrorCode::E2005,
                TypeErrorKind::NotSubscriptable { .. } => ErrorCode::E2006,
                TypeErrorKind::MapKeyMismatch { .. } => ErrorCode::E2007,
                TypeErrorKind::PointerCast { .. } => ErrorCode::E2008,
                TypeErrorKind::LengthOutOfRange { .. } => ErrorCode::E2009,
                TypeErrorKind::MapValue { .. } => ErrorCode::E2010,
                TypeErrorKind::UnknownIdent { .. } => ErrorCode::E2011,
                TypeErrorKind::Unsized { .. } => ErrorCode::E2013,
            },
            CodegenError::Unresolved { .. } => ErrorCode::E2012,
            CodegenError::StackExhausted { .. } => ErrorCode::E3001,
            CodegenError::Emit(_) => ErrorCode::E9001,
        }
    }

    /// Build a diagnostic naming the offending expression and types.
    pub fn to_diagnostic(&self, graph: &ExprGraph, types: &TypeRegistry) -> Diagnostic {
        let diag = Diagnostic::error(self.code());
        let expr = |node: NodeId| format!("`{}`", graph.render(node));
        let ty = |id: TypeId| format!("`{}`", types.display(id));

        match self {
            CodegenError::UnknownOperator { op, span, .. } => diag
                .with_message(format!("unknown operator `{op}`"))
                .with_label(*span, "not a built-in operator"),
            CodegenError::Arity {
                op,
                expected,
                found,
                span,
                ..
            } => diag
                .with_message(format!(
                    "`{op}` takes {expected} argument(s), {found} given"
                ))
                .with_label(*span, "wrong number of arguments"),
            CodegenError::Static { kind, node, span } => {
                let target = graph.args(*node).first().map(|&a| expr(a));
                let message = match (kind, target) {
                    (StaticErrorKind::AssignTarget, Some(t)) => {
                        format!("can't assign a value to {t}")
                    }
                    (StaticErrorKind::DeleteTarget, Some(t)) => {
                        format!("can't delete {t}, a map element was expected")
                    }
                    _ => kind.to_string(),
                };
                diag.with_message(message).with_label(*span, kind.to_string())
            }
            CodegenError::Type(err) => {
                let at = expr(err.node);
                let message = match &err.kind {
                    TypeErrorKind::IncompatibleAssign { lhs, rhs } => {
                        format!("can't assign a value of type {} to {at} of type {}", ty(*rhs), ty(*lhs))
                    }
                    TypeErrorKind::NotPointer { ty: t } => {
                        format!("can't dereference a value of type {}", ty(*t))
                    }
                    TypeErrorKind::NotAggregate { ty: t } => {
                        format!("{at} accesses a member of {}, which is not a struct", ty(*t))
                    }
                    TypeErrorKind::NoMember { ty: t, member } => {
                        format!("type {} has no member named `{member}`", ty(*t))
                    }
                    TypeErrorKind::NonScalarKey { ty: t } => {
                        format!("subscript must be a scalar value, found {}", ty(*t))
                    }
                    TypeErrorKind::NotSubscriptable { ty: t } => {
                        format!("value of type {} is not subscriptable", ty(*t))
                    }
                    TypeErrorKind::MapKeyMismatch { expected, found } => format!(
                        "map key of type {} used where the map is keyed by {}",
                        ty(*found),
                        ty(*expected)
                    ),
                    TypeErrorKind::PointerCast { ty: t } => {
                        format!("can not cast a value of type {} to a pointer", ty(*t))
                    }
                    TypeErrorKind::LengthOutOfRange { len, max } => {
                        format!("length {len} is outside the allowed range 1..={max}")
                    }
                    TypeErrorKind::MapValue { ty: t } => {
                        format!("map of type {} can't be used as a value", ty(*t))
                    }
                    TypeErrorKind::UnknownIdent { name } => format!("unknown identifier `{name}`"),
                    TypeErrorKind::Unsized { ty: t } => {
                        format!("{at} has type {}, which has no size", ty(*t))
                    }
                };
                diag.with_message(message).with_label(err.span, format!("in {at}"))
            }
            CodegenError::Unresolved { node, span } => diag
                .with_message(format!("unable to infer the type of {}", expr(*node)))
                .with_label(*span, "type unknown")
                .with_note("maps get their type from the first assignment to them"),
            CodegenError::StackExhausted {
                node,
                span,
                requested,
                used,
                max,
            } => diag
                .with_message(format!(
                    "{} needs {requested} bytes of stack, but {used} of {max} are in use",
                    expr(*node)
                ))
                .with_label(*span, "stack frame exhausted"),
            CodegenError::Emit(err) => diag
                .with_message(format!("internal error: {err}"))
                .with_note("this is a compiler bug"),
        }
    }
}

/// Non-fatal findings. Compilation continues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodegenWarning {
    /// A `strcmp` operand is not a string; its bytes are compared as-is.
    NotAString { node: NodeId, span: Span, ty: TypeId },
}

impl CodegenWarning {
    pub fn node(&self) -> NodeId {
        match self {
            CodegenWarning::NotAString { node, .. } => *node,
        }
    }

    pub fn to_diagnostic(&self, graph: &ExprGraph, types: &TypeRegistry) -> Diagnostic {
        match self {
            CodegenWarning::NotAString { node, span, ty } => {
                Diagnostic::warning(ErrorCode::W2001)
                    .with_message(format!(
                        "`{}` is of type `{}`, a string was expected",
                        graph.render(*node),
                        types.display(*ty)
                    ))
                    .with_label(*span, "compared byte by byte")
            }
        }
    }
}

#[cfg(test)]
mod tests;
