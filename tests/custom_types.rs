use osi_types::{
    create_result, object, number, AutoCastFailure, BasicType, DetailKind, MessageDetail, Shape, Type, TypeImpl,
    ValidationOptions, ValidationResult, Value,
};
use serde_json::{json, Map};

/// An array of numbers, reported with its own detail kind.
struct NumberList;

impl TypeImpl for NumberList {
    fn name(&self) -> String {
        "number[]".into()
    }

    fn basic_type(&self) -> BasicType {
        BasicType::Array
    }

    fn validate(&self, this: &Type, input: &Value, _: &mut ValidationOptions) -> ValidationResult {
        let Some(arr) = input.as_array() else {
            return create_result(this, input, input.clone(), DetailKind::invalid_basic_type(BasicType::Array));
        };
        let bad: Vec<MessageDetail> = arr
            .items()
            .iter()
            .enumerate()
            .filter(|(_, item)| item.as_f64().is_none())
            .map(|(i, _)| {
                let mut fields = Map::new();
                fields.insert("index".into(), json!(i));
                MessageDetail::new(DetailKind::Other { kind: "invalid element".into(), fields })
            })
            .collect();
        create_result(this, input, input.clone(), bad)
    }

    fn has_auto_cast(&self) -> bool {
        true
    }

    fn auto_cast(&self, input: &Value) -> Result<Value, AutoCastFailure> {
        match input {
            Value::Array(_) => Ok(input.clone()),
            Value::Number(_) => Ok(Value::array([input.clone()])),
            _ => Err(AutoCastFailure),
        }
    }
}

#[test]
fn custom_kind_plugs_into_objects() {
    let list = Type::new(NumberList);
    assert!(matches!(list.shape(), Shape::Opaque));
    let ty = object([("scores", list)]);
    assert!(ty.is(&Value::from(json!({"scores": [1, 2]}))));

    let failure = ty.validate(&Value::from(json!({"scores": [1, "x", 3, null]}))).unwrap_err();
    let tags: Vec<_> = failure.details().iter().map(|d| d.tag().unwrap().to_string()).collect();
    assert_eq!(tags, vec!["invalid element", "invalid element"]);
    match &failure.details()[1].kind {
        Some(DetailKind::Other { fields, .. }) => assert_eq!(fields.get("index"), Some(&json!(3))),
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn custom_kind_auto_casts_through_auto_cast_all() {
    let ty = object([("scores", Type::new(NumberList))]).auto_cast_all();
    let out = ty.construct(&Value::from(json!({"scores": 5}))).unwrap();
    assert_eq!(out, Value::from(json!({"scores": [5]})));
}

#[test]
fn and_then_guards_a_function() {
    let sum = object([("a", number()), ("b", number())]).and_then(|value| {
        let obj = value.as_object().cloned().unwrap_or_default();
        let get = |k: &str| obj.get(k).and_then(|v| v.as_f64()).unwrap_or_default();
        get("a") + get("b")
    });
    assert_eq!(sum(&Value::from(json!({"a": 1, "b": 2}))).unwrap(), 3.0);
    let err = sum(&Value::from(json!({"a": 1}))).unwrap_err();
    assert_eq!(err.details()[0].context.as_deref(), Some("precondition"));
    assert_eq!(err.details()[0].tag(), Some("missing property"));
}

#[test]
fn errors_travel_through_anyhow() {
    fn parse(input: &Value) -> anyhow::Result<Value> {
        Ok(object([("a", number())]).construct(input)?)
    }
    let err = parse(&Value::from(json!({}))).unwrap_err();
    let validation = err.downcast_ref::<osi_types::ValidationError>().unwrap();
    assert_eq!(validation.details()[0].tag(), Some("missing property"));
}
