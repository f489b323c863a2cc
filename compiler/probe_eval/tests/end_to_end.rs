//! Compile probe bodies and run them in the reference interpreter.

use pretty_assertions::assert_eq;
use probe_codegen::{CompiledProbe, ContextArgs, MapId, Session};
use probe_eval::{Machine, EFAULT};
use probe_ir::{ExprGraph, NodeId};
use probe_types::{Field, TypeId};
use proptest::prelude::*;

struct Probe {
    out: CompiledProbe,
    machine: Machine,
}

impl Probe {
    fn compile(session: &mut Session, graph: &mut ExprGraph, provider: &ContextArgs) -> Self {
        let out = session.compile(graph, provider).unwrap();
        let machine = Machine::new(out.program.clone(), &out.maps);
        Self { out, machine }
    }

    fn map(&self, name: &str) -> MapId {
        self.out
            .maps
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.id)
            .unwrap()
    }

    fn value(&self, map: &str, key: i32) -> Option<Vec<u8>> {
        self.machine
            .map_value(self.map(map), &key.to_le_bytes())
            .map(<[u8]>::to_vec)
    }

    fn int(&self, map: &str, key: i32) -> Option<i32> {
        let bytes = self.value(map, key)?;
        Some(i32::from_le_bytes(bytes[..4].try_into().unwrap()))
    }
}

fn elem(g: &mut ExprGraph, map: &str, key: i64) -> NodeId {
    let m = g.ident(map);
    let k = g.num(key);
    g.expr("[]", [m, k])
}

fn assign(g: &mut ExprGraph, map: &str, key: i64, value: NodeId) -> NodeId {
    let target = elem(g, map, key);
    g.expr("=", [target, value])
}

fn block(g: &mut ExprGraph, stmts: impl IntoIterator<Item = NodeId>) -> NodeId {
    let root = g.expr(":block", stmts);
    g.set_root(root);
    root
}

/// `strcmp` result sign for two byte strings of equal length.
fn expected_sign(a: &[u8], b: &[u8]) -> i32 {
    a.iter()
        .zip(b)
        .find(|(x, y)| x != y)
        .map_or(0, |(x, y)| (i32::from(*x) - i32::from(*y)).signum())
}

#[test]
fn absent_keys_read_zero_and_present_keys_the_last_write() {
    let mut session = Session::default();
    let mut g = ExprGraph::new();
    let five = g.num(5);
    let w1 = assign(&mut g, "@m", 1, five);
    let six = g.num(6);
    let w2 = assign(&mut g, "@m", 1, six);
    let hit = elem(&mut g, "@m", 1);
    let r1 = assign(&mut g, "@out", 0, hit);
    let miss = elem(&mut g, "@m", 2);
    let r2 = assign(&mut g, "@out", 1, miss);
    block(&mut g, [w1, w2, r1, r2]);

    let mut probe = Probe::compile(&mut session, &mut g, &ContextArgs::new());
    assert_eq!(probe.machine.run(), Ok(0));
    assert_eq!(probe.int("@out", 0), Some(6));
    assert_eq!(probe.int("@out", 1), Some(0));
    assert_eq!(probe.machine.map_len(probe.map("@m")), 1);
}

#[test]
fn delete_then_read_is_zero() {
    let mut session = Session::default();
    let mut g = ExprGraph::new();
    let five = g.num(5);
    let write = assign(&mut g, "@m", 1, five);
    let target = elem(&mut g, "@m", 1);
    let delete = g.expr("delete", [target]);
    let read = elem(&mut g, "@m", 1);
    let copy = assign(&mut g, "@out", 0, read);
    block(&mut g, [write, delete, copy]);

    let mut probe = Probe::compile(&mut session, &mut g, &ContextArgs::new());
    assert_eq!(probe.machine.run(), Ok(0));
    assert_eq!(probe.int("@out", 0), Some(0));
    assert_eq!(probe.machine.map_len(probe.map("@m")), 0);
}

#[test]
fn maps_persist_across_runs() {
    let mut session = Session::default();
    let provider = ContextArgs::new().with_arg("x", TypeId::U64);
    let mut g = ExprGraph::new();
    let x = g.ident("x");
    let root = assign(&mut g, "@last", 0, x);
    g.set_root(root);

    let mut probe = Probe::compile(&mut session, &mut g, &provider);
    probe.machine.set_context(&[7]);
    probe.machine.run().unwrap();
    probe.machine.set_context(&[0x1_0000_0001]);
    probe.machine.run().unwrap();

    assert_eq!(
        probe.value("@last", 0),
        Some(0x1_0000_0001u64.to_le_bytes().to_vec())
    );
}

#[test]
fn member_access_through_a_pointer_reads_target_memory() {
    let mut session = Session::default();
    let task = session
        .types
        .add_struct(
            "task",
            vec![Field::new("flags", TypeId::U64), Field::new("pid", TypeId::INT)],
        )
        .unwrap();
    let ptr = session.types.pointer_to(task);
    let provider = ContextArgs::new().with_arg("t", ptr);

    let mut g = ExprGraph::new();
    let t = g.ident("t");
    let pid = g.string("pid");
    let member = g.expr("->", [t, pid]);
    let root = assign(&mut g, "@pid", 0, member);
    g.set_root(root);

    let mut probe = Probe::compile(&mut session, &mut g, &provider);
    let mut image = vec![0xFFu8; 8];
    image.extend_from_slice(&4242i32.to_le_bytes());
    image.extend_from_slice(&[0; 4]);
    let addr = probe.machine.add_target(&image);
    probe.machine.set_context(&[addr]);

    assert_eq!(probe.machine.run(), Ok(0));
    assert_eq!(probe.int("@pid", 0), Some(4242));
}

#[test]
fn failed_raw_read_aborts_before_the_update() {
    let mut session = Session::default();
    let provider = ContextArgs::new().with_arg("p", TypeId::U64);
    let mut g = ExprGraph::new();
    let p = g.ident("p");
    let len = g.num(4);
    let read = g.expr("mem", [p, len]);
    let root = assign(&mut g, "@raw", 0, read);
    g.set_root(root);

    let mut probe = Probe::compile(&mut session, &mut g, &provider);
    probe.machine.set_context(&[16]);
    assert_eq!(probe.machine.run(), Ok(EFAULT));
    assert_eq!(probe.machine.map_len(probe.map("@raw")), 0);
}

#[test]
fn str_reads_stop_at_nul_and_zero_pad() {
    let mut session = Session::default();
    let provider = ContextArgs::new().with_arg("p", TypeId::U64);
    let mut g = ExprGraph::new();
    let p = g.ident("p");
    let len = g.num(8);
    let read = g.expr("str", [p, len]);
    let root = assign(&mut g, "@comm", 0, read);
    g.set_root(root);

    let mut probe = Probe::compile(&mut session, &mut g, &provider);
    let addr = probe.machine.add_target(b"hi\0garbage");
    probe.machine.set_context(&[addr]);

    assert_eq!(probe.machine.run(), Ok(0));
    assert_eq!(probe.value("@comm", 0), Some(b"hi\0\0\0\0\0\0".to_vec()));
}

#[test]
fn u8_u32_literal_is_eight_bytes_with_zeroed_padding() {
    let mut session = Session::default();
    let provider = ContextArgs::new().with_arg("b", TypeId::U8);
    let mut g = ExprGraph::new();
    let b = g.ident("b");
    let seven = g.num(7);
    let lit = g.expr(":struct", [b, seven]);
    let root = assign(&mut g, "@s", 0, lit);
    g.set_root(root);

    let mut probe = Probe::compile(&mut session, &mut g, &provider);
    let ty = g.sym(lit).ty.unwrap();
    assert_eq!(session.types.sizeof(ty), Some(8));
    assert_eq!(session.types.offsetof(ty, "f1"), Some(4));

    probe.machine.set_context(&[0x1FF]);
    assert_eq!(probe.machine.run(), Ok(0));
    assert_eq!(probe.value("@s", 0), Some(vec![0xFF, 0, 0, 0, 7, 0, 0, 0]));
}

fn ascii(max: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(1u8..=127, 1..=max)
}

fn same_length_pair() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    ascii(16).prop_flat_map(|a| {
        let n = a.len();
        (Just(a), prop::collection::vec(1u8..=127, n))
    })
}

/// `@r[0] = strcmp(str(pa, n + 1), str(pb, n + 1))`
fn run_strcmp_loaded(a: &[u8], b: &[u8]) -> i32 {
    let mut session = Session::default();
    let provider = ContextArgs::new()
        .with_arg("pa", TypeId::U64)
        .with_arg("pb", TypeId::U64);
    let size = a.len() as i64 + 1;

    let mut g = ExprGraph::new();
    let pa = g.ident("pa");
    let la = g.num(size);
    let sa = g.expr("str", [pa, la]);
    let pb = g.ident("pb");
    let lb = g.num(size);
    let sb = g.expr("str", [pb, lb]);
    let cmp = g.expr("strcmp", [sa, sb]);
    let root = assign(&mut g, "@r", 0, cmp);
    g.set_root(root);

    let mut probe = Probe::compile(&mut session, &mut g, &provider);
    let aa = probe.machine.add_target(a);
    let ab = probe.machine.add_target(b);
    probe.machine.set_context(&[aa, ab]);
    probe.machine.run().unwrap();
    probe.int("@r", 0).unwrap()
}

/// `@r[0] = strcmp(str(pa, n + 1), "b")`, or with the operands swapped.
fn run_strcmp_literal(a: &[u8], b: &[u8], literal_first: bool) -> i32 {
    let mut session = Session::default();
    let provider = ContextArgs::new().with_arg("pa", TypeId::U64);
    let size = a.len() as i64 + 1;

    let mut g = ExprGraph::new();
    let pa = g.ident("pa");
    let la = g.num(size);
    let sa = g.expr("str", [pa, la]);
    let lit = g.string(String::from_utf8(b.to_vec()).unwrap());
    let cmp = if literal_first {
        g.expr("strcmp", [lit, sa])
    } else {
        g.expr("strcmp", [sa, lit])
    };
    let root = assign(&mut g, "@r", 0, cmp);
    g.set_root(root);

    let mut probe = Probe::compile(&mut session, &mut g, &provider);
    let aa = probe.machine.add_target(a);
    probe.machine.set_context(&[aa]);
    probe.machine.run().unwrap();
    probe.int("@r", 0).unwrap()
}

#[test]
fn strcmp_of_identical_strings_is_zero() {
    assert_eq!(run_strcmp_loaded(b"sshd", b"sshd"), 0);
    assert_eq!(run_strcmp_literal(b"sshd", b"sshd", false), 0);
    assert_eq!(run_strcmp_literal(b"sshd", b"sshd", true), 0);
}

#[test]
fn strcmp_sign_follows_first_difference() {
    assert!(run_strcmp_loaded(b"abc", b"abd") < 0);
    assert!(run_strcmp_literal(b"abd", b"abc", false) > 0);
    assert!(run_strcmp_literal(b"abd", b"abc", true) < 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn strcmp_matches_bytewise_comparison((a, b) in same_length_pair()) {
        let expected = expected_sign(&a, &b);
        prop_assert_eq!(run_strcmp_loaded(&a, &b).signum(), expected);
        prop_assert_eq!(run_strcmp_literal(&a, &b, false).signum(), expected);
        prop_assert_eq!(run_strcmp_literal(&a, &b, true).signum(), -expected);
    }

    #[test]
    fn struct_padding_is_zero_for_any_first_field(byte in any::<u8>(), value in any::<i32>()) {
        let mut session = Session::default();
        let provider = ContextArgs::new().with_arg("b", TypeId::U8);
        let mut g = ExprGraph::new();
        let b = g.ident("b");
        let v = g.num(i64::from(value));
        let lit = g.expr(":struct", [b, v]);
        let root = assign(&mut g, "@s", 0, lit);
        g.set_root(root);

        let mut probe = Probe::compile(&mut session, &mut g, &provider);
        probe.machine.set_context(&[u64::from(byte)]);
        prop_assert_eq!(probe.machine.run(), Ok(0));

        let mut expected = vec![byte, 0, 0, 0];
        expected.extend_from_slice(&value.to_le_bytes());
        prop_assert_eq!(probe.value("@s", 0), Some(expected));
    }
}
