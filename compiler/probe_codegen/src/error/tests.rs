use pretty_assertions::assert_eq;
use probe_diagnostic::Severity;

use super::*;

fn graph_with_assign() -> (ExprGraph, NodeId, NodeId) {
    let mut g = ExprGraph::new();
    let m = g.ident("@m");
    let k = g.num(1);
    let target = g.expr("[]", [m, k]);
    let v = g.num(2);
    let assign = g.expr("=", [target, v]);
    g.set_span(assign, Span::new(0, 10));
    g.set_span(target, Span::new(0, 5));
    g.set_root(assign);
    (g, assign, target)
}

#[test]
fn arity_accepts() {
    assert!(Arity::Exact(2).accepts(2));
    assert!(!Arity::Exact(2).accepts(3));
    assert!(Arity::Range(1, 2).accepts(1));
    assert!(Arity::Range(1, 2).accepts(2));
    assert!(!Arity::Range(1, 2).accepts(0));
    assert!(Arity::AtLeast(0).accepts(0));
    assert!(!Arity::AtLeast(1).accepts(0));
    assert_eq!(Arity::Range(1, 2).to_string(), "1 to 2");
}

#[test]
fn codes_follow_error_class() {
    let (g, assign, target) = graph_with_assign();
    let span = g.span(assign);

    let structural = CodegenError::Static {
        kind: StaticErrorKind::AssignTarget,
        node: assign,
        span,
    };
    assert_eq!(structural.code(), ErrorCode::E1003);
    assert!(structural.code().is_structural_error());

    let typed = CodegenError::Type(TypeError {
        node: target,
        span,
        kind: TypeErrorKind::NotPointer { ty: TypeId::INT },
    });
    assert_eq!(typed.code(), ErrorCode::E2002);
    assert_eq!(typed.node(), Some(target));

    let stuck = CodegenError::Unresolved { node: target, span };
    assert_eq!(stuck.code(), ErrorCode::E2012);

    let emit = CodegenError::from(EmitError::BackwardJump {
        at: 3,
        target: crate::insn::Label::new(1),
    });
    assert_eq!(emit.code(), ErrorCode::E9001);
    assert_eq!(emit.node(), None);
}

#[test]
fn incompatible_assignment_names_both_types() {
    let (g, assign, _) = graph_with_assign();
    let types = TypeRegistry::new();
    let err = CodegenError::Type(TypeError {
        node: assign,
        span: g.span(assign),
        kind: TypeErrorKind::IncompatibleAssign {
            lhs: TypeId::U64,
            rhs: TypeId::INT,
        },
    });

    let diag = err.to_diagnostic(&g, &types);
    assert_eq!(diag.code, ErrorCode::E2001);
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(
        diag.message,
        "can't assign a value of type `int` to `@m[1] = 2` of type `unsigned long`"
    );
    assert_eq!(diag.primary_span(), Some(Span::new(0, 10)));
}

#[test]
fn static_error_renders_target() {
    let mut g = ExprGraph::new();
    let x = g.ident("x");
    let v = g.num(1);
    let assign = g.expr("=", [x, v]);
    g.set_root(assign);

    let err = CodegenError::Static {
        kind: StaticErrorKind::AssignTarget,
        node: assign,
        span: g.span(assign),
    };
    let diag = err.to_diagnostic(&g, &TypeRegistry::new());
    assert_eq!(diag.message, "can't assign a value to `x`");
}

#[test]
fn unresolved_carries_a_note() {
    let (g, _, target) = graph_with_assign();
    let err = CodegenError::Unresolved {
        node: target,
        span: g.span(target),
    };
    let diag = err.to_diagnostic(&g, &TypeRegistry::new());
    assert_eq!(diag.message, "unable to infer the type of `@m[1]`");
    assert_eq!(diag.notes.len(), 1);
}

#[test]
fn warnings_are_not_errors() {
    let (g, _, target) = graph_with_assign();
    let warning = CodegenWarning::NotAString {
        node: target,
        span: g.span(target),
        ty: TypeId::INT,
    };
    let diag = warning.to_diagnostic(&g, &TypeRegistry::new());
    assert_eq!(diag.code, ErrorCode::W2001);
    assert!(!diag.is_error());
    assert_eq!(warning.node(), target);
}
