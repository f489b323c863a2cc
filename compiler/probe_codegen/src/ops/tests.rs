use pretty_assertions::assert_eq;

use super::*;

#[test]
fn every_builtin_is_registered_under_its_name() {
    let registry = Registry::builtin();
    for builtin in Builtin::ALL {
        let op = builtin.operator();
        let found = registry.lookup(op.name()).map(|o| o.name());
        assert_eq!(found, Some(op.name()));
    }
}

#[test]
fn builtin_names_and_arities() {
    let registry = Registry::builtin();
    let cases = [
        ("strcmp", Arity::Exact(2)),
        ("mem", Arity::Range(1, 2)),
        ("str", Arity::Range(1, 2)),
        ("->", Arity::Exact(2)),
        (".", Arity::Exact(2)),
        ("u*", Arity::Exact(1)),
        ("[]", Arity::Exact(2)),
        (":struct", Arity::AtLeast(1)),
        ("=", Arity::Exact(2)),
        ("delete", Arity::Exact(1)),
        (":block", Arity::AtLeast(0)),
    ];
    for (name, arity) in cases {
        let op = registry.lookup(name).unwrap();
        assert_eq!(op.arity(), arity, "{name}");
    }
    assert!(registry.lookup("printf").is_none());
}

#[test]
fn dispatch_routes_leaves_by_kind() {
    let registry = Registry::builtin();
    let mut g = ExprGraph::new();
    let x = g.ident("x");
    let n = g.num(3);
    let s = g.string("abc");
    let call = g.expr("printf", [s]);

    assert_eq!(registry.dispatch(&g, x).unwrap().name(), ":ident");
    assert_eq!(registry.dispatch(&g, n).unwrap().name(), ":num");
    assert_eq!(registry.dispatch(&g, s).unwrap().name(), ":str");

    let err = registry.dispatch(&g, call).err().unwrap();
    assert!(matches!(
        err,
        CodegenError::UnknownOperator { ref op, node, .. } if op == "printf" && node == call
    ));
}

#[test]
fn debug_lists_operator_names() {
    let rendered = format!("{:?}", Registry::builtin());
    assert!(rendered.contains("\"strcmp\""));
    assert!(rendered.contains("\":block\""));
}
