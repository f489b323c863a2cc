use pretty_assertions::assert_eq;
use probe_ir::Symbol;
use probe_types::Field;

use super::*;
use crate::provider::ContextArgs;

struct Harness {
    types: TypeRegistry,
    maps: MapTable,
    config: CodegenConfig,
    warnings: Vec<CodegenWarning>,
    provider: ContextArgs,
    registry: Registry,
}

impl Harness {
    fn new(provider: ContextArgs) -> Self {
        Self {
            types: TypeRegistry::new(),
            maps: MapTable::new(),
            config: CodegenConfig::default(),
            warnings: Vec::new(),
            provider,
            registry: Registry::builtin(),
        }
    }

    fn run(&mut self, graph: &mut ExprGraph, root: NodeId) -> Result<InferStats, CodegenError> {
        let mut cx = InferCx {
            graph,
            types: &mut self.types,
            maps: &mut self.maps,
            provider: &self.provider,
            config: &self.config,
            warnings: &mut self.warnings,
        };
        infer(&self.registry, &mut cx, root)
    }
}

fn syms(graph: &ExprGraph, root: NodeId) -> Vec<Symbol> {
    graph.postorder(root).into_iter().map(|n| *graph.sym(n)).collect()
}

/// `@m[key] = value`
fn assign(g: &mut ExprGraph, map: &str, key: NodeId, value: NodeId) -> (NodeId, NodeId) {
    let m = g.ident(map);
    let target = g.expr("[]", [m, key]);
    (g.expr("=", [target, value]), target)
}

#[test]
fn assignment_types_its_target_downward() {
    let mut h = Harness::new(ContextArgs::new());
    let mut g = ExprGraph::new();
    let k = g.num(1);
    let v = g.num(2);
    let (root, target) = assign(&mut g, "@m", k, v);
    g.set_root(root);

    let stats = h.run(&mut g, root).unwrap();
    assert_eq!(stats.passes, 2);
    assert_eq!(stats.newly_typed, 5);

    assert_eq!(g.sym(root).ty, Some(TypeId::VOID));
    assert_eq!(g.sym(target).ty, Some(TypeId::INT));

    let desc = h.maps.lookup("@m").unwrap();
    assert_eq!((desc.key, desc.value), (TypeId::INT, TypeId::INT));
    assert_eq!(g.sym(g.arg(target, 0)).ty, Some(desc.ty));
}

#[test]
fn inference_is_idempotent() {
    let mut h = Harness::new(ContextArgs::new().with_arg("x", TypeId::U64));
    let mut g = ExprGraph::new();
    let k = g.ident("x");
    let v = g.ident("x");
    let (first, _) = assign(&mut g, "@m", k, v);
    let k2 = g.ident("x");
    let m = g.ident("@m");
    let read = g.expr("[]", [m, k2]);
    let root = g.expr(":block", [first, read]);
    g.set_root(root);

    h.run(&mut g, root).unwrap();
    let before = syms(&g, root);
    let types_before = h.types.len();

    let stats = h.run(&mut g, root).unwrap();
    assert_eq!(stats, InferStats { passes: 1, newly_typed: 0 });
    assert_eq!(syms(&g, root), before);
    assert_eq!(h.types.len(), types_before);
    assert_eq!(h.maps.len(), 1);
}

#[test]
fn reading_a_map_nobody_writes_deadlocks() {
    let mut h = Harness::new(ContextArgs::new());
    let mut g = ExprGraph::new();
    let m = g.ident("@never");
    let k = g.num(0);
    let read = g.expr("[]", [m, k]);
    g.set_root(read);

    let err = h.run(&mut g, read).unwrap_err();
    assert_eq!(
        err,
        CodegenError::Unresolved {
            node: m,
            span: g.span(m),
        }
    );
    assert!(h.maps.is_empty());
}

#[test]
fn first_assignment_fixes_the_map() {
    let mut h = Harness::new(ContextArgs::new().with_arg("y", TypeId::U64));
    let mut g = ExprGraph::new();
    let (k1, v1) = (g.num(1), g.num(1));
    let (first, _) = assign(&mut g, "@m", k1, v1);
    let k2 = g.num(2);
    let v2 = g.ident("y");
    let (second, second_target) = assign(&mut g, "@m", k2, v2);
    let root = g.expr(":block", [first, second]);
    g.set_root(root);

    let err = h.run(&mut g, root).unwrap_err();
    let CodegenError::Type(TypeError { node, kind, .. }) = err else {
        panic!("expected a type error, got {err:?}");
    };
    assert_eq!(node, second_target);
    assert_eq!(
        kind,
        TypeErrorKind::IncompatibleAssign {
            lhs: TypeId::INT,
            rhs: TypeId::U64,
        }
    );
}

#[test]
fn map_key_must_match() {
    let mut h = Harness::new(ContextArgs::new());
    let p_int = h.types.pointer_to(TypeId::INT);
    h.provider = ContextArgs::new().with_arg("p", p_int);

    let mut g = ExprGraph::new();
    let (k1, v1) = (g.num(1), g.num(1));
    let (first, _) = assign(&mut g, "@m", k1, v1);
    let k2 = g.ident("p");
    let v2 = g.num(2);
    let (second, _) = assign(&mut g, "@m", k2, v2);
    let root = g.expr(":block", [first, second]);
    g.set_root(root);

    let err = h.run(&mut g, root).unwrap_err();
    assert!(matches!(
        err,
        CodegenError::Type(TypeError {
            node,
            kind: TypeErrorKind::MapKeyMismatch { expected, .. },
            ..
        }) if node == k2 && expected == TypeId::INT
    ));
}

#[test]
fn member_access_through_a_pointer() {
    let mut h = Harness::new(ContextArgs::new());
    let task = h
        .types
        .add_struct(
            "task",
            vec![Field::new("flags", TypeId::U64), Field::new("pid", TypeId::INT)],
        )
        .unwrap();
    let ptr = h.types.pointer_to(task);
    h.provider = ContextArgs::new().with_arg("t", ptr);

    let mut g = ExprGraph::new();
    let t = g.ident("t");
    let deref = g.expr("u*", [t]);
    let member = g.string("pid");
    let dot = g.expr(".", [deref, member]);
    g.set_root(dot);

    let stats = h.run(&mut g, dot).unwrap();
    assert_eq!(stats.passes, 1);
    assert_eq!(g.sym(deref).ty, Some(task));
    assert_eq!(g.sym(dot).ty, Some(TypeId::INT));
}

#[test]
fn type_errors_name_the_detecting_node() {
    let mut h = Harness::new(ContextArgs::new().with_arg("x", TypeId::INT));

    let mut g = ExprGraph::new();
    let x = g.ident("x");
    let deref = g.expr("u*", [x]);
    g.set_root(deref);
    let err = h.run(&mut g, deref).unwrap_err();
    assert_eq!(err.node(), Some(deref));
    assert_eq!(err.code(), probe_diagnostic::ErrorCode::E2002);

    let mut g = ExprGraph::new();
    let x = g.ident("x");
    let member = g.string("pid");
    let dot = g.expr(".", [x, member]);
    g.set_root(dot);
    let err = h.run(&mut g, dot).unwrap_err();
    assert_eq!(err.code(), probe_diagnostic::ErrorCode::E2003);

    let mut g = ExprGraph::new();
    let unknown = g.ident("nope");
    g.set_root(unknown);
    let err = h.run(&mut g, unknown).unwrap_err();
    assert_eq!(err.code(), probe_diagnostic::ErrorCode::E2011);
}

#[test]
fn mem_length_is_checked() {
    let mut h = Harness::new(ContextArgs::new().with_arg("p", TypeId::U64));
    let mut g = ExprGraph::new();
    let p = g.ident("p");
    let len = g.num(4096);
    let read = g.expr("mem", [p, len]);
    g.set_root(read);

    let err = h.run(&mut g, read).unwrap_err();
    assert!(matches!(
        err,
        CodegenError::Type(TypeError {
            kind: TypeErrorKind::LengthOutOfRange { len: 4096, max: 512 },
            ..
        })
    ));

    let mut g = ExprGraph::new();
    let p = g.ident("p");
    let read = g.expr("str", [p]);
    g.set_root(read);
    h.run(&mut g, read).unwrap();
    let default = h.types.array_of(TypeId::CHAR, 128);
    assert_eq!(g.sym(read).ty, Some(default));
}

#[test]
fn strcmp_warns_on_non_strings() {
    let mut h = Harness::new(ContextArgs::new().with_arg("x", TypeId::INT));
    let mut g = ExprGraph::new();
    let x = g.ident("x");
    let lit = g.string("a");
    let cmp = g.expr("strcmp", [x, lit]);
    g.set_root(cmp);

    h.run(&mut g, cmp).unwrap();
    assert_eq!(g.sym(cmp).ty, Some(TypeId::INT));
    assert!(g.sym(lit).irs.has(IrsHints::VIRTUAL));
    assert_eq!(h.warnings.len(), 1);
    assert_eq!(h.warnings[0].node(), x);
}

#[test]
fn struct_literal_registers_an_anonymous_type() {
    let mut h = Harness::new(ContextArgs::new().with_arg("c", TypeId::U8));
    let mut g = ExprGraph::new();
    let c = g.ident("c");
    let n = g.num(7);
    let lit = g.expr(":struct", [c, n]);
    g.set_root(lit);

    h.run(&mut g, lit).unwrap();
    let ty = g.sym(lit).ty.unwrap();
    assert_eq!(h.types.display(ty), "struct :anon_0");
    assert_eq!(h.types.sizeof(ty), Some(8));
    assert_eq!(h.types.offsetof(ty, "f1"), Some(4));
}

fn type_error_kind(err: CodegenError) -> (NodeId, TypeErrorKind) {
    match err {
        CodegenError::Type(TypeError { node, kind, .. }) => (node, kind),
        other => panic!("expected a type error, got {other:?}"),
    }
}

#[test]
fn missing_member_is_named() {
    let mut h = Harness::new(ContextArgs::new());
    let task = h
        .types
        .add_struct("task", vec![Field::new("pid", TypeId::INT)])
        .unwrap();
    let ptr = h.types.pointer_to(task);
    h.provider = ContextArgs::new().with_arg("t", ptr);

    let mut g = ExprGraph::new();
    let t = g.ident("t");
    let deref = g.expr("u*", [t]);
    let member = g.string("comm");
    let dot = g.expr(".", [deref, member]);
    g.set_root(dot);

    let err = h.run(&mut g, dot).unwrap_err();
    assert_eq!(err.code(), probe_diagnostic::ErrorCode::E2004);
    assert_eq!(
        type_error_kind(err),
        (
            dot,
            TypeErrorKind::NoMember {
                ty: task,
                member: "comm".to_owned(),
            }
        )
    );
}

#[test]
fn array_subscript_needs_a_scalar_key() {
    let mut h = Harness::new(ContextArgs::new());
    let ints = h.types.array_of(TypeId::INT, 4);
    h.provider = ContextArgs::new().with_arg("a", ints);

    let mut g = ExprGraph::new();
    let a = g.ident("a");
    let key = g.string("x");
    let elem = g.expr("[]", [a, key]);
    g.set_root(elem);

    let err = h.run(&mut g, elem).unwrap_err();
    assert_eq!(err.code(), probe_diagnostic::ErrorCode::E2005);
    let key_ty = h.types.array_of(TypeId::CHAR, 2);
    assert_eq!(
        type_error_kind(err),
        (key, TypeErrorKind::NonScalarKey { ty: key_ty })
    );
}

#[test]
fn scalars_are_not_subscriptable() {
    let mut h = Harness::new(ContextArgs::new().with_arg("x", TypeId::INT));
    let mut g = ExprGraph::new();
    let x = g.ident("x");
    let zero = g.num(0);
    let elem = g.expr("[]", [x, zero]);
    g.set_root(elem);

    let err = h.run(&mut g, elem).unwrap_err();
    assert_eq!(err.code(), probe_diagnostic::ErrorCode::E2006);
    assert_eq!(
        type_error_kind(err),
        (x, TypeErrorKind::NotSubscriptable { ty: TypeId::INT })
    );
}

#[test]
fn mem_source_must_fit_a_register() {
    let mut h = Harness::new(ContextArgs::new());
    let wide = h
        .types
        .add_struct(
            "wide",
            vec![Field::new("a", TypeId::U64), Field::new("b", TypeId::U64)],
        )
        .unwrap();
    h.provider = ContextArgs::new().with_arg("w", wide);

    let mut g = ExprGraph::new();
    let w = g.ident("w");
    let read = g.expr("mem", [w]);
    g.set_root(read);

    let err = h.run(&mut g, read).unwrap_err();
    assert_eq!(err.code(), probe_diagnostic::ErrorCode::E2008);
    assert_eq!(
        type_error_kind(err),
        (read, TypeErrorKind::PointerCast { ty: wide })
    );
}

#[test]
fn void_and_function_pointers_cannot_be_dereferenced() {
    let mut h = Harness::new(ContextArgs::new());
    let void_ptr = h.types.pointer_to(TypeId::VOID);
    let callback = h.types.func(TypeId::VOID, vec![TypeId::INT], false);
    let callback_ptr = h.types.pointer_to(callback);
    h.provider = ContextArgs::new()
        .with_arg("v", void_ptr)
        .with_arg("cb", callback_ptr);

    for (name, ty) in [("v", void_ptr), ("cb", callback_ptr)] {
        let mut g = ExprGraph::new();
        let p = g.ident(name);
        let deref = g.expr("u*", [p]);
        g.set_root(deref);

        let err = h.run(&mut g, deref).unwrap_err();
        assert_eq!(type_error_kind(err), (deref, TypeErrorKind::NotPointer { ty }));
        assert_eq!(g.sym(deref).ty, None);
    }
}

#[test]
fn qualified_values_are_stored_by_their_base_type() {
    let mut h = Harness::new(ContextArgs::new());
    let pid_t = h.types.add_typedef("pid_t", TypeId::INT);
    let const_pid = h.types.const_of(pid_t);
    h.provider = ContextArgs::new().with_arg("pid", const_pid);

    let mut g = ExprGraph::new();
    let (k1, v1) = (g.num(1), g.num(1));
    let (first, _) = assign(&mut g, "@pids", k1, v1);
    let k2 = g.num(2);
    let v2 = g.ident("pid");
    let (second, target) = assign(&mut g, "@pids", k2, v2);
    let root = g.expr(":block", [first, second]);
    g.set_root(root);

    h.run(&mut g, root).unwrap();
    let target_ty = g.sym(target).ty.unwrap();
    assert_eq!(h.types.base(target_ty), TypeId::INT);
    assert_eq!(h.types.display(target_ty), "const pid_t");
    assert_eq!(h.maps.lookup("@pids").map(|d| d.value), Some(TypeId::INT));
}

#[test]
fn void_values_cannot_be_stored() {
    let mut h = Harness::new(ContextArgs::new());

    // @a[1] = (@b[2] = 3)
    let mut g = ExprGraph::new();
    let (k, v) = (g.num(2), g.num(3));
    let (inner, _) = assign(&mut g, "@b", k, v);
    let k = g.num(1);
    let (outer, _) = assign(&mut g, "@a", k, inner);
    g.set_root(outer);
    let err = h.run(&mut g, outer).unwrap_err();
    assert_eq!(err.code(), probe_diagnostic::ErrorCode::E2013);
    assert_eq!(
        type_error_kind(err),
        (inner, TypeErrorKind::Unsized { ty: TypeId::VOID })
    );
    assert!(h.maps.lookup("@a").is_none());

    // :struct(1, @b[2] = 3)
    let mut g = ExprGraph::new();
    let (k, v) = (g.num(2), g.num(3));
    let (inner, _) = assign(&mut g, "@b", k, v);
    let one = g.num(1);
    let lit = g.expr(":struct", [one, inner]);
    g.set_root(lit);
    let err = h.run(&mut g, lit).unwrap_err();
    assert_eq!(
        type_error_kind(err),
        (inner, TypeErrorKind::Unsized { ty: TypeId::VOID })
    );
    assert_eq!(g.sym(lit).ty, None);
}

#[test]
fn void_values_cannot_key_a_map() {
    let mut h = Harness::new(ContextArgs::new());
    let mut g = ExprGraph::new();
    let m = g.ident("@b");
    let k = g.num(1);
    let elem = g.expr("[]", [m, k]);
    let gone = g.expr("delete", [elem]);
    let one = g.num(1);
    let (root, _) = assign(&mut g, "@a", gone, one);
    g.set_root(root);

    let err = h.run(&mut g, root).unwrap_err();
    assert_eq!(
        type_error_kind(err),
        (gone, TypeErrorKind::Unsized { ty: TypeId::VOID })
    );
    assert!(h.maps.is_empty());
}
