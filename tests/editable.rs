//! Value container tests: slot synthesis, validate-before-commit writes, restrictions.

use rawlayout::types::{BOOL, CHAR, FLOAT, INT8_T, UINT16_T, UINT64_T, UINT8_T};
use rawlayout::{Editable, LayoutError, PointerField, StructBuilder, StructField, Value};

fn person() -> StructField {
    let mut b = StructBuilder::new();
    b.add_field("id", UINT64_T)
        .add_pointer_field("nickname", CHAR)
        .add_field("age", UINT8_T)
        .add_field("alive", BOOL)
        .add_field("initial", CHAR)
        .add_field_with_default("level", UINT8_T, 5);
    b.add_array("name", CHAR, 1, &[10]).unwrap();
    b.add_array("stats", UINT16_T, 1, &[6]).unwrap();
    b.build("person", "").unwrap()
}

// ==================== Initial values ====================

#[test]
fn scalar_defaults() {
    let e = Editable::from_struct(&person());
    assert_eq!(e.get("id").unwrap(), &Value::Int(0));
    assert_eq!(e.get("age").unwrap(), &Value::Int(0));
    assert_eq!(e.get("alive").unwrap(), &Value::Bool(false));
    assert_eq!(e.get("initial").unwrap(), &Value::from("\0"));
    assert_eq!(e.get("level").unwrap(), &Value::Int(5));
}

#[test]
fn array_defaults() {
    let e = Editable::from_struct(&person());
    assert_eq!(e.get("name").unwrap(), &Value::from("\0".repeat(9)));
    assert_eq!(e.get("stats").unwrap(), &Value::List(vec![Value::Int(0); 6]));
    assert_eq!(e.get("nickname").unwrap(), &Value::from(""));
}

#[test]
fn slots_follow_layout_order() {
    let e = Editable::from_struct(&person());
    let names: Vec<&str> = e.names().collect();
    assert_eq!(
        names,
        vec!["id", "nickname", "age", "alive", "initial", "level", "name", "stats"]
    );
    assert!(e.validate_all().is_ok());
}

// ==================== Writes ====================

#[test]
fn out_of_range_write_is_rejected() {
    let mut e = Editable::from_struct(&person());
    let err = e.set("age", 300).unwrap_err();
    match err {
        LayoutError::RestrictionViolation { field, value, rule } => {
            assert_eq!(field, "age");
            assert_eq!(value, Value::Int(300));
            assert_eq!(rule, "field_value");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(e.get("age").unwrap(), &Value::Int(0));
    e.set("age", 255).unwrap();
    assert_eq!(e.get("age").unwrap(), &Value::Int(255));
}

#[test]
fn wrong_kind_is_rejected_first() {
    let mut e = Editable::from_struct(&person());
    assert_eq!(e.set("age", 1.5).unwrap_err().rule(), Some("field_type"));
    assert_eq!(e.set("alive", 1).unwrap_err().rule(), Some("field_type"));
    e.set("alive", true).unwrap();
    assert_eq!(e.set("initial", "ab").unwrap_err().rule(), Some("field_size"));
    e.set("initial", 'z').unwrap();
}

#[test]
fn fixed_text_length_is_exact() {
    let mut e = Editable::from_struct(&person());
    e.set("name", "Charmander").unwrap_err();
    assert_eq!(e.get("name").unwrap(), &Value::from("\0".repeat(9)));
    e.set("name", "Bulbasaur").unwrap();
    assert_eq!(e.get("name").unwrap(), &Value::from("Bulbasaur"));
    let err = e.set("name", "Ivysaur").unwrap_err();
    assert_eq!(err.rule(), Some("field_size"));
    assert_eq!(e.get("name").unwrap(), &Value::from("Bulbasaur"));
}

#[test]
fn fixed_list_checks_kind_then_length() {
    let mut e = Editable::from_struct(&person());
    let bad_kind = Value::List(vec![Value::Bool(true); 6]);
    assert_eq!(e.set("stats", bad_kind).unwrap_err().rule(), Some("field_type"));
    let short = Value::List(vec![Value::Int(1); 5]);
    assert_eq!(e.set("stats", short).unwrap_err().rule(), Some("field_size"));
    let ok = Value::List((0..6).map(Value::from).collect());
    e.set("stats", ok.clone()).unwrap();
    assert_eq!(e.get("stats").unwrap(), &ok);
}

#[test]
fn pointer_text_is_unbounded() {
    let mut e = Editable::from_struct(&person());
    e.set("nickname", "a very long nickname indeed").unwrap();
    assert_eq!(e.set("nickname", 3).unwrap_err().rule(), Some("field_type"));
}

#[test]
fn unknown_attribute() {
    let mut e = Editable::from_struct(&person());
    assert!(matches!(e.get("height"), Err(LayoutError::UnknownAttribute(_))));
    assert!(matches!(e.set("height", 3), Err(LayoutError::UnknownAttribute(_))));
    assert!(matches!(e.set("*nickname", "x"), Err(LayoutError::UnknownAttribute(_))));
}

// ==================== Restrictions ====================

#[test]
fn added_restriction_runs_after_builtin_rules() {
    let mut e = Editable::from_struct(&person());
    e.add_restriction("age", "adult", |v| v.as_i128().is_some_and(|x| x >= 18));
    assert_eq!(e.set("age", 300).unwrap_err().rule(), Some("field_value"));
    assert_eq!(e.set("age", 12).unwrap_err().rule(), Some("adult"));
    e.set("age", 30).unwrap();

    let rules: Vec<&str> = e.restriction("age").unwrap().rule_names().collect();
    assert_eq!(rules, vec!["field_type", "field_value", "adult"]);
}

#[test]
fn restriction_on_missing_or_nested_is_noop() {
    let inner = StructBuilder::new().add_field("x", UINT8_T).build("inner", "").unwrap();
    let outer = StructBuilder::new().add_struct(&inner, true, "pos").build("outer", "").unwrap();
    let mut e = Editable::from_struct(&outer);
    e.add_restriction("missing", "never", |_| false)
        .add_restriction("pos", "never", |_| false);
    assert!(e.restriction("pos").is_none());
    assert!(e.validate_all().is_ok());
}

#[test]
fn validate_all_reports_invalid_state() {
    let mut e = Editable::from_struct(&person());
    e.set("age", 10).unwrap();
    // Tightening a rule after the fact is caught by a full re-check.
    e.add_restriction("age", "adult", |v| v.as_i128().is_some_and(|x| x >= 18));
    assert_eq!(e.validate_all().unwrap_err().rule(), Some("adult"));
}

// ==================== Arrays ====================

#[test]
fn flexible_arrays() {
    let mut b = StructBuilder::new();
    b.add_array("data", UINT8_T, 0, &[]).unwrap();
    b.add_array("text", CHAR, 0, &[]).unwrap();
    b.add_array("blobs", "blob", 0, &[]).unwrap();
    let mut e = Editable::from_struct(&b.build("s", "").unwrap());

    assert_eq!(e.get("data").unwrap(), &Value::List(vec![]));
    assert_eq!(e.get("text").unwrap(), &Value::from(""));
    e.set("data", Value::List((0..100).map(Value::from).collect())).unwrap();
    assert!(e.set("data", Value::List(vec![Value::Real(1.0)])).is_err());
    e.set("text", "any length").unwrap();
    e.set("blobs", Value::List(vec![Value::Bool(true), Value::Int(3)])).unwrap();
}

#[test]
fn matrix_checks_outer_length_only() {
    let mut b = StructBuilder::new();
    b.add_array("tiles", UINT8_T, 2, &[3, 4]).unwrap();
    b.add_array("labels", CHAR, 2, &[2, 8]).unwrap();
    let mut e = Editable::from_struct(&b.build("s", "").unwrap());

    let tiles = e.get("tiles").unwrap().as_list().unwrap();
    assert_eq!(tiles.len(), 3);
    assert!(tiles.iter().all(|row| row.len() == Some(4)));
    let labels = e.get("labels").unwrap().as_list().unwrap();
    assert_eq!(labels, &[Value::from("\0".repeat(7)), Value::from("\0".repeat(7))]);

    // Inner rows are not re-validated.
    let ragged = Value::List(vec![
        Value::List(vec![Value::Int(1)]),
        Value::List(vec![]),
        Value::Bool(false),
    ]);
    e.set("tiles", ragged).unwrap();
    let wrong_outer = Value::List(vec![Value::List(vec![]); 4]);
    assert_eq!(e.set("tiles", wrong_outer).unwrap_err().rule(), Some("field_size"));
    assert_eq!(e.set("tiles", 1).unwrap_err().rule(), Some("field_type"));
}

#[test]
fn resize_then_validate() {
    let mut e = Editable::from_struct(&person());
    let mut stats = e.get("stats").unwrap().clone();
    stats.as_list_mut().unwrap().push(Value::Int(7));
    assert!(e.set("stats", stats).is_err());
    assert!(e.validate_all().is_ok());
}

#[test]
fn pointer_to_array_behaves_like_the_array() {
    let mut b = StructBuilder::new();
    b.add_pointer_of_array("rows", INT8_T, 1, &[4]).unwrap();
    b.add_array_of_pointers(&PointerField::of_type("ids", UINT64_T), 1, &[3])
        .unwrap();
    let mut e = Editable::from_struct(&b.build("s", "").unwrap());
    assert_eq!(e.get("rows").unwrap(), &Value::List(vec![Value::Int(0); 4]));
    assert_eq!(e.get("ids").unwrap(), &Value::List(vec![Value::Int(0); 3]));
    assert!(e.set("rows", Value::List(vec![Value::Int(0); 5])).is_err());
}

// ==================== Nesting ====================

#[test]
fn nested_struct_is_a_container() {
    let flags = StructBuilder::new()
        .add_bit_field("enable", UINT8_T, 2)
        .add_field("gain", FLOAT)
        .build("flags", "")
        .unwrap();
    let outer = StructBuilder::new()
        .add_field("id", UINT16_T)
        .add_struct(&flags, true, "flags")
        .build("outer", "")
        .unwrap();
    let mut e = Editable::from_struct(&outer);

    let nested = e.get_struct("flags").unwrap();
    assert_eq!(nested.get("gain").unwrap(), &Value::Real(0.0));

    let nested = e.get_struct_mut("flags").unwrap();
    nested.set("gain", 2.5).unwrap();
    assert!(nested.set("gain", 1e38).is_err());
    assert!(nested.set("enable", 4).is_err());
    assert_eq!(
        e.get_struct("flags").unwrap().get("gain").unwrap(),
        &Value::Real(2.5)
    );
    assert!(matches!(e.get_struct("id"), Err(LayoutError::UnknownAttribute(_))));
    assert!(e.validate_all().is_ok());
}

#[test]
fn struct_reference_member_is_opaque() {
    let flags = StructBuilder::new().add_field("x", UINT8_T).build("flags", "").unwrap();
    let outer = StructBuilder::new().add_struct_field("f", &flags).build("outer", "").unwrap();
    let mut e = Editable::from_struct(&outer);
    assert_eq!(e.get("f").unwrap(), &Value::Int(0));
    e.set("f", "anything").unwrap();
}

#[test]
fn equal_containers() {
    let a = Editable::from_struct(&person());
    let mut b = Editable::from_struct(&person());
    assert_eq!(a, b);
    b.set("age", 1).unwrap();
    assert_ne!(a, b);
}

#[test]
fn lookalike_struct_cannot_replace_nested_rules() {
    let point = StructBuilder::new()
        .add_field("x", UINT8_T)
        .build("point", "")
        .unwrap();
    let lookalike = StructBuilder::new()
        .add_field("x", FLOAT)
        .build("point", "")
        .unwrap();
    let shape = |p: &StructField| {
        StructBuilder::new()
            .add_field("id", UINT16_T)
            .add_struct(p, true, "p")
            .build("shape", "")
            .unwrap()
    };
    let outer = StructBuilder::new()
        .add_struct(&shape(&point), true, "s")
        .build("outer", "")
        .unwrap();
    let mut e = Editable::from_struct(&outer);

    let mut impostor = Editable::from_struct(&shape(&lookalike));
    impostor.get_struct_mut("p").unwrap().set("x", 2.5).unwrap();
    let err = e.set("s", impostor).unwrap_err();
    assert_eq!(err.rule(), Some("field_type"));

    let mut whole = Editable::from_struct(&shape(&lookalike));
    whole.set("id", 4).unwrap();
    whole.get_struct_mut("p").unwrap().set("x", 9.0).unwrap();
    assert_eq!(e.set("s", whole).unwrap_err().rule(), Some("field_type"));

    let mut same = Editable::from_struct(&shape(&point));
    same.set("id", 4).unwrap();
    same.get_struct_mut("p").unwrap().set("x", 9).unwrap();
    e.set("s", same).unwrap();

    let nested = e.get_struct_mut("s").unwrap().get_struct_mut("p").unwrap();
    assert_eq!(nested.get("x").unwrap(), &Value::Int(9));
    assert_eq!(nested.set("x", 2.5).unwrap_err().rule(), Some("field_type"));
    assert!(e.validate_all().is_ok());
}
