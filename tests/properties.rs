use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use osi_types::{
    intersection, literal, number, object, object_with, partial, partial_with, string, BasicType, DetailKind, Mode,
    Object, ObjectOptions, PathSegment, Type, ValidationOptions, Value,
};
use serde_json::json;

fn v(j: serde_json::Value) -> Value {
    Value::from(j)
}

#[test]
fn identity_on_success() {
    let ty = object([("a", number()), ("b", partial([("c", string())]))]);
    let input = v(json!({"a": 1, "b": {"c": "x"}, "extra": null}));
    assert!(ty.is(&input));
    let success = ty.validate_with(&input, &mut ValidationOptions::check()).unwrap();
    assert!(success.value.strict_eq(&input));
}

#[test]
fn construct_round_trip() {
    let ty = object([("a", number())]);
    let out = ty.construct(&v(json!({"a": 1}))).unwrap();
    assert_eq!(out, v(json!({"a": 1})));
    assert!(ty.check(&out).is_ok());
}

#[test]
fn validation_is_deterministic() {
    let ty = object([("a", number()), ("b", string()), ("c", literal(3))]);
    let input = v(json!({"a": "x", "c": 4}));
    let first = ty.validate(&input).unwrap_err();
    let second = ty.validate(&input).unwrap_err();
    let summary = |f: &osi_types::Failure| -> Vec<(Option<String>, Vec<PathSegment>)> {
        f.details().iter().map(|d| (d.tag().map(str::to_string), d.path.clone())).collect()
    };
    assert_eq!(summary(&first), summary(&second));
    assert_eq!(first.details().len(), 3);
}

fn counted_node(calls: Arc<AtomicUsize>) -> Type {
    Type::recursive("Node", move |node| {
        intersection([object([("value", number())]), partial([("next", node.clone())])])
            .unwrap()
            .with_validation(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
    })
}

#[test]
fn cyclic_input_terminates() {
    let calls = Arc::new(AtomicUsize::new(0));
    let node = counted_node(calls.clone());

    let a = Object::new();
    let b = Object::new();
    a.insert("value", Value::from(1));
    b.insert("value", Value::from(2));
    b.insert("next", Value::Object(a.clone()));
    a.insert("next", Value::Object(b.clone()));
    let input = Value::Object(a);

    let mut options = ValidationOptions::new(Mode::Check);
    assert!(node.validate_with(&input, &mut options).is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let first_pass = options.visited_len();

    // a second walk over the same graph within the same context is answered from the guard
    assert!(node.validate_with(&input, &mut options).is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(options.visited_len(), first_pass);
}

#[test]
fn cyclic_input_failure_is_reported() {
    let node = counted_node(Arc::new(AtomicUsize::new(0)));
    let a = Object::new();
    let b = Object::new();
    a.insert("value", Value::from(1));
    b.insert("value", Value::from("two"));
    b.insert("next", Value::Object(a.clone()));
    a.insert("next", Value::Object(b));
    let failure = node.validate(&Value::Object(a)).unwrap_err();
    assert_eq!(failure.details().len(), 1);
    assert_eq!(failure.details()[0].path, vec![PathSegment::from("next"), PathSegment::from("value")]);
}

fn plain_node() -> Type {
    Type::recursive("Node", |node| {
        intersection([object([("value", number())]), partial([("next", node.clone())])]).unwrap()
    })
}

#[test]
fn derived_recursive_types_keep_resolving() {
    let nested = v(json!({"value": 1, "next": {"value": 2, "next": {"value": 3}}}));
    let invalid = v(json!({"value": 1, "next": {"value": "x"}}));

    let branded = plain_node().with_brand("BrandedNode");
    assert!(branded.validate(&nested).is_ok());
    assert!(!branded.is(&invalid));

    let renamed = plain_node().with_name("Chain");
    assert!(renamed.is(&nested));

    let checked = plain_node().with_validation(|_| true);
    assert!(checked.is(&nested));

    let cast = plain_node().auto_cast_all();
    assert!(cast.is(&nested));
    assert!(!cast.is(&invalid));
}

#[test]
fn recursive_type_names() {
    let node = counted_node(Arc::new(AtomicUsize::new(0)));
    assert_eq!(node.name(), "Node");
    let next = &node.props().unwrap()["next"];
    assert_eq!(next.name(), "Node");
    assert!(node.is(&v(json!({"value": 1, "next": {"value": 2}}))));
    assert!(!node.is(&v(json!({"value": 1, "next": {"value": "x"}}))));
}

#[test]
fn partial_semantics() {
    let ty = object([("a", number())]);
    let p = ty.to_partial().unwrap();
    assert!(p.validate(&v(json!({}))).is_ok());
    assert!(p.validate(&v(json!({"a": "x"}))).is_err());

    let explicit_undefined = Value::object([("a", Value::Undefined)]);
    assert!(partial([("a", number())]).validate(&explicit_undefined).is_ok());
}

// With strict missing keys a present `undefined` is a value, not an absence:
// it is validated against the child and its failure is reported at the key.
#[test]
fn strict_partial_validates_present_undefined_at_the_key() {
    let strict = partial_with(ObjectOptions { strict_missing_keys: true, ..Default::default() }, [("a", number())]);
    let explicit_undefined = Value::object([("a", Value::Undefined)]);
    let failure = strict.validate(&explicit_undefined).unwrap_err();
    assert_eq!(failure.details().len(), 1);
    assert_eq!(failure.details()[0].kind, Some(DetailKind::invalid_basic_type(BasicType::Number)));
    assert_eq!(failure.details()[0].path, vec![PathSegment::from("a")]);
    assert!(strict.validate(&v(json!({}))).is_ok());
}

#[test]
fn unknown_properties() {
    let closed = object_with(ObjectOptions { allow_unknown_properties: false, ..Default::default() }, [("a", number())]);
    let failure = closed.validate(&v(json!({"a": 1, "b": 2}))).unwrap_err();
    assert_eq!(failure.details().len(), 1);
    assert_eq!(failure.details()[0].kind, Some(DetailKind::UnknownProperty { property: "b".into() }));
}

#[test]
fn intersection_merge() {
    let ty = intersection([object([("a", number())]), object([("b", string())])]).unwrap();
    assert_eq!(ty.construct(&v(json!({"a": 1, "b": "x"}))).unwrap(), v(json!({"a": 1, "b": "x"})));
    let failure = ty.validate(&v(json!({"a": "x", "b": "x"}))).unwrap_err();
    assert_eq!(failure.details().len(), 1);
    assert_eq!(failure.details()[0].path, vec![PathSegment::from("a")]);
}

#[test]
fn intersection_guard() {
    assert!(intersection([object([("a", number())]), string()]).is_err());
    assert!(object([("a", number())]).and(&number()).is_err());
}

#[test]
fn literal_kinds() {
    let five = literal(5);
    assert!(five.is(&Value::from(5)));
    assert!(!five.is(&Value::from("5")));
    assert_eq!(five.validate(&Value::from("5")).unwrap_err().details()[0].tag(), Some("invalid basic type"));
    assert!(!five.is(&Value::from(6)));
    assert_eq!(five.validate(&Value::from(6)).unwrap_err().details()[0].tag(), Some("invalid literal"));
}

#[test]
fn with_config_does_not_mutate_base() {
    let base = number();
    let inputs = [Value::from(-5), Value::from(5), Value::from(500), Value::from("x")];
    let before: Vec<bool> = inputs.iter().map(|i| base.is(i)).collect();
    let cfg = json!({"min": 0, "max": 10}).as_object().cloned().unwrap();
    let bounded = base.with_config("Bounded", cfg);
    let after: Vec<bool> = inputs.iter().map(|i| base.is(i)).collect();
    assert_eq!(before, after);
    assert_eq!(before, vec![true, true, true, false]);
    assert_eq!(inputs.iter().map(|i| bounded.is(i)).collect::<Vec<_>>(), vec![false, true, false, false]);
}

#[test]
fn construct_does_not_touch_input() {
    let ty = object([("n", number().auto_cast())]);
    let input = v(json!({"n": "7", "other": true}));
    let out = ty.construct(&input).unwrap();
    assert_eq!(out, v(json!({"n": 7})));
    assert_eq!(input, v(json!({"n": "7", "other": true})));
}

#[test]
fn parser_failures_are_labelled_inside_objects() {
    let ty = object([("n", number().auto_cast())]);
    let failure = ty.validate(&v(json!({"n": "seven"}))).unwrap_err();
    let d = &failure.details()[0];
    assert_eq!(d.path, vec![PathSegment::from("n")]);
    assert_eq!(d.context.as_deref(), Some("parser"));
    assert_eq!(
        d.kind,
        Some(DetailKind::CustomMessage { message: "could not autocast value: \"seven\"".into(), omit_input: true })
    );
    let err = ty.construct(&v(json!({"n": "seven"}))).unwrap_err();
    assert_eq!(err.to_string(), "errors in [{ n: number.autoCast }]:\n- [parser] at <n>: could not autocast value: \"seven\"");
}
