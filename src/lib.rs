//! Runtime validation and parsing of untyped values.
//!
//! A [`Type`] describes an expected shape. `check` validates input as-is,
//! `construct` may run parsers and rebuild it, and `validate` returns the
//! full [`ValidationResult`] with every failure detail.
//!
//! ```
//! use osi_types::{object, number, string, Value};
//! use serde_json::json;
//!
//! let user = object([("id", number()), ("name", string())]).with_name("User");
//! let ok = user.construct(&Value::from(json!({"id": 1, "name": "ada"}))).unwrap();
//! assert_eq!(ok, Value::from(json!({"id": 1, "name": "ada"})));
//!
//! let err = user.construct(&Value::from(json!({"id": "1"}))).unwrap_err();
//! assert_eq!(err.details().len(), 2);
//! ```
pub mod error;
pub mod options;
pub mod path_de;
pub mod print;
pub mod result;
pub mod types;
pub mod value;

pub use error::{ConvertError, Error, TypeError, ValidationError};
pub use options::{Mode, ValidationOptions};
pub use result::{
    create_result, DetailKind, Failure, MessageDetail, PathSegment, Reason, Success, ValidationResult, Verdict,
};
pub use types::intersection::{intersection, intersection_named, intersection_with, IntersectionOptions, OverlapPolicy};
pub use types::literal::{literal, null_type, undefined_type, void_type};
pub use types::object::{object, object_named, object_with, partial, partial_named, partial_with, ObjectOptions};
pub use types::primitive::{boolean, number, string, unknown, unknown_record};
pub use types::{
    AutoCastFailure, Extended, ParserOptions, PossibleDiscriminator, Properties, PropertiesInfo, PropertyInfo, Shape,
    Type, TypeConfig, TypeImpl,
};
pub use value::{Array, BasicType, Literal, Object, Value};
