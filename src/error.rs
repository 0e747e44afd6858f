//! Error types.
//!
//! Validation failures travel as [`Failure`] values; the types here are
//! what the throwing entry points (`check`, `construct`, `assert`,
//! `and_then`) and type construction return.

use std::fmt;

use thiserror::Error;

use crate::print::print_value;
use crate::result::{DetailKind, Failure, MessageDetail};
use crate::value::BasicType;

/// One failing validation, aggregating every detail that was collected.
#[derive(Debug, Clone)]
pub struct ValidationError {
    failure: Failure,
}

impl ValidationError {
    pub fn from_failure(failure: Failure) -> Self {
        Self { failure }
    }

    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    pub fn details(&self) -> &[MessageDetail] {
        self.failure.details()
    }

    pub fn into_failure(self) -> Failure {
        self.failure
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failure = &self.failure;
        write!(f, "errors in [{}]:", failure.ty().name())?;
        for detail in failure.details() {
            write!(f, "\n- {}", render_detail(detail))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Short, one-line rendering of a detail. Full message wording belongs to
/// an external formatter.
pub fn render_detail(detail: &MessageDetail) -> String {
    let mut out = String::new();
    if let Some(ctx) = &detail.context {
        out.push_str(&format!("[{ctx}] "));
    }
    if !detail.path.is_empty() {
        let mut path = String::new();
        for seg in &detail.path {
            if !path.is_empty() && matches!(seg, crate::result::PathSegment::Key(_)) {
                path.push('.');
            }
            path.push_str(&seg.to_string());
        }
        out.push_str(&format!("at <{path}>: "));
    }
    let type_name = detail.ty.as_ref().map(|t| t.name().to_string()).unwrap_or_default();
    let got = detail.input.as_ref().map(print_value).unwrap_or_else(|| "undefined".into());
    let message = match &detail.kind {
        None => format!("expected a [{type_name}], got: {got}"),
        Some(DetailKind::InvalidBasicType { expected, expected_value: Some(v) }) => {
            format!("expected a [{expected}] ({v}), got: {got}")
        }
        Some(DetailKind::InvalidBasicType { expected, .. }) => {
            let article = if matches!(expected, BasicType::Object | BasicType::Array) { "an" } else { "a" };
            format!("expected {article} [{expected}], got: {got}")
        }
        Some(DetailKind::InvalidLiteral { expected }) => format!("expected [{expected}], got: {got}"),
        Some(DetailKind::MissingProperty { property }) => {
            format!("missing property <{property}> [{type_name}]")
        }
        Some(DetailKind::UnknownProperty { property }) => format!("unknown property <{property}>"),
        Some(DetailKind::CustomMessage { message, omit_input: true }) => message.clone(),
        Some(DetailKind::CustomMessage { message, .. }) => format!("{message}, got: {got}"),
        Some(DetailKind::Other { kind, .. }) => format!("{kind} [{type_name}], got: {got}"),
    };
    out.push_str(&message);
    out
}

/// Misuse detected while building a type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("can only create an intersection of objects, got: {}", .names.join(" and "))]
    NotObjectLike { names: Vec<String> },

    #[error("an intersection needs at least one member")]
    EmptyIntersection,

    #[error("overlapping properties are not allowed in this intersection: {}", .keys.join(" and "))]
    OverlappingProperties { keys: Vec<String> },

    #[error("[{name}] is not an object type")]
    NotAnObjectType { name: String },

    #[error("unions of [{left}] and [{right}] need the union type implementation")]
    UnionUnavailable { left: String, right: String },
}

/// Conversion between [`crate::Value`] and other representations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("cyclic value at <{path}> cannot be converted to JSON")]
    Cyclic { path: String },

    #[error("a value of basic type [{basic_type}] is not a literal")]
    NotALiteral { basic_type: BasicType },
}

/// Crate-level error for operations that cross several stages.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("at JSON path {path} → {message}")]
    Deserialize { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::object::object;
    use crate::types::primitive::{number, string};
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_summary_lists_every_detail() {
        let ty = object([("a", number()), ("b", string())]).with_name("Pair");
        let err = ty.construct(&Value::from(json!({"a": "x"}))).unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("errors in [Pair]:"), "{text}");
        assert_eq!(err.details().len(), 2);
        assert!(text.contains("at <a>: expected a [number], got: \"x\""), "{text}");
        assert!(text.contains("missing property <b> [string]"), "{text}");
    }

    #[test]
    fn test_type_error_messages() {
        let err = TypeError::NotObjectLike { names: vec!["string".into(), "number".into()] };
        assert_eq!(err.to_string(), "can only create an intersection of objects, got: string and number");
    }

    #[test]
    fn test_validation_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<ValidationError>();
        assert_send_sync::<Error>();
    }
}
