//! Exact-value types.

use std::sync::Arc;

use crate::print::{js_string, print_literal};
use crate::result::{create_result, DetailKind, Success};
use crate::types::primitive::{boolean_auto_cast, number_auto_cast};
use crate::types::{AutoCastFailure, Shape, Type, TypeParts};
use crate::value::{BasicType, Literal, Value};

/// A type accepting exactly `value`, compared strictly.
pub fn literal(value: impl Into<Literal>) -> Type {
    let value = value.into();
    let expected = value.clone();
    let cast_to = value.clone();
    Type::from_parts(TypeParts {
        name: print_literal(&value),
        basic_type: value.basic_type(),
        is_default_name: true,
        literal_domain: Some(vec![value.clone()]),
        shape: Shape::Literal(value),
        validator: Arc::new(move |this, input, _| {
            if expected.matches(input) {
                return Ok(Success::new(input.clone()));
            }
            let kind = if input.basic_type() != expected.basic_type() {
                DetailKind::InvalidBasicType {
                    expected: expected.basic_type(),
                    expected_value: Some(expected.clone()),
                }
            } else {
                DetailKind::InvalidLiteral { expected: expected.clone() }
            };
            create_result(this, input, input.clone(), kind)
        }),
        auto_caster: Some(Arc::new(move |input| auto_cast(&cast_to, input))),
    })
}

fn auto_cast(lit: &Literal, input: &Value) -> Result<Value, AutoCastFailure> {
    match lit.basic_type() {
        BasicType::String => Ok(Value::String(js_string(input))),
        BasicType::Number => number_auto_cast(input),
        BasicType::Boolean => boolean_auto_cast(input),
        BasicType::Null | BasicType::Undefined if input.is_nullish() => Ok(lit.to_value()),
        _ => Err(AutoCastFailure),
    }
}

pub fn null_type() -> Type {
    literal(Literal::Null)
}

pub fn undefined_type() -> Type {
    literal(Literal::Undefined)
}

pub fn void_type() -> Type {
    undefined_type()
}
