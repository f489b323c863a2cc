use pretty_assertions::assert_eq;

use super::*;

#[test]
fn primitives_have_fixed_handles() {
    let types = TypeRegistry::new();
    assert_eq!(types.len(), TypeId::PRIMITIVE_COUNT as usize);
    assert_eq!(types.lookup("int"), Some(TypeId::INT));
    assert_eq!(types.lookup("char"), Some(TypeId::CHAR));
    assert_eq!(types.lookup("void"), Some(TypeId::VOID));
    assert!(TypeId::U64.is_primitive());
}

#[test]
fn structural_shapes_are_interned() {
    let mut types = TypeRegistry::new();
    let a = types.array_of(TypeId::CHAR, 16);
    let b = types.array_of(TypeId::CHAR, 16);
    let c = types.array_of(TypeId::CHAR, 17);
    assert_eq!(a, b);
    assert_ne!(a, c);

    let m1 = types.map_of(TypeId::INT, TypeId::U64, MapBacking::Hash);
    let m2 = types.map_of(TypeId::INT, TypeId::U64, MapBacking::Hash);
    let m3 = types.map_of(TypeId::INT, TypeId::U64, MapBacking::PerCpuHash);
    assert_eq!(m1, m2);
    assert_ne!(m1, m3);

    assert_eq!(types.pointer_to(TypeId::INT), types.pointer_to(TypeId::INT));
}

#[test]
fn structs_are_nominal() {
    let mut types = TypeRegistry::new();
    let fields = vec![Field::new("a", TypeId::INT)];
    let s1 = types.add_struct("s", fields.clone()).unwrap();
    let s2 = types.add_anon_struct(fields.clone()).unwrap();
    let s3 = types.add_anon_struct(fields).unwrap();
    assert_ne!(s1, s2);
    assert_ne!(s2, s3);
    assert_eq!(types.lookup("s"), Some(s1));
    assert_eq!(types.lookup(":anon_0"), Some(s2));
    assert_eq!(types.lookup(":anon_1"), Some(s3));
}

#[test]
fn registered_types_never_change() {
    let mut types = TypeRegistry::new();
    let s = types
        .add_struct("frozen", vec![Field::new("a", TypeId::U8)])
        .unwrap();
    let before = types.get(s).clone();
    let _ = types.array_of(s, 4);
    let _ = types.add_anon_struct(vec![Field::new("b", s)]);
    assert_eq!(types.get(s), &before);
}

#[test]
fn display_renders_declarations() {
    let mut types = TypeRegistry::new();
    let s = types.array_of(TypeId::CHAR, 16);
    let p = types.pointer_to(TypeId::U32);
    let m = types.map_of(TypeId::INT, TypeId::U64, MapBacking::Hash);
    let st = types
        .add_struct("task", vec![Field::new("pid", TypeId::INT)])
        .unwrap();
    let c = types.const_of(TypeId::CHAR);

    assert_eq!(types.display(s), "char[16]");
    assert_eq!(types.display(p), "unsigned int *");
    assert_eq!(types.display(m), "unsigned long[int]");
    assert_eq!(types.display(st), "struct task");
    assert_eq!(types.display(c), "const char");
}
