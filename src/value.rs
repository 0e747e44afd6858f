//! The untyped input universe.
//!
//! Arrays and objects are shared handles: cloning a [`Value`] never copies
//! their contents, and two handles are the *same input* when they point at
//! the same allocation. Handles can be mutated after creation, which is what
//! makes cyclic input graphs expressible.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};

use crate::error::ConvertError;
use crate::print::{print_literal, print_value};

// ------------------------------ Basic types ------------------------------ //

/// Coarse classification used for cheap mismatch checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasicType {
    Object,
    String,
    Number,
    Boolean,
    Null,
    Undefined,
    Array,
    Mixed,
}

impl BasicType {
    pub fn as_str(self) -> &'static str {
        match self {
            BasicType::Object => "object",
            BasicType::String => "string",
            BasicType::Number => "number",
            BasicType::Boolean => "boolean",
            BasicType::Null => "null",
            BasicType::Undefined => "undefined",
            BasicType::Array => "array",
            BasicType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --------------------------------- Value --------------------------------- //

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Array),
    Object(Object),
}

/// Shared, ordered string-keyed record.
#[derive(Clone, Default)]
pub struct Object(Arc<RwLock<IndexMap<String, Value>>>);

/// Shared list.
#[derive(Clone, Default)]
pub struct Array(Arc<RwLock<Vec<Value>>>);

impl Value {
    /// Build an object value from key/value pairs (insertion order is kept).
    pub fn object<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(entries.into_iter().collect())
    }

    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::Array(items.into_iter().collect())
    }

    pub fn basic_type(&self) -> BasicType {
        match self {
            Value::Undefined => BasicType::Undefined,
            Value::Null => BasicType::Null,
            Value::Bool(_) => BasicType::Boolean,
            Value::Number(_) => BasicType::Number,
            Value::String(_) => BasicType::String,
            Value::Array(_) => BasicType::Array,
            Value::Object(_) => BasicType::Object,
        }
    }

    /// Address of the shared allocation for reference-like values.
    ///
    /// Scalars have no identity: they cannot take part in reference cycles.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(a.id()),
            Value::Object(o) => Some(o.id()),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `null` or `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Strict equality: scalars compare by value, arrays and objects by
    /// identity. `NaN` is never equal to itself.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Convert into JSON.
    ///
    /// `undefined` object entries are dropped, `undefined` array items and
    /// non-finite numbers become `null`. Cyclic graphs are rejected.
    pub fn to_json(&self) -> Result<serde_json::Value, ConvertError> {
        let mut stack = Vec::new();
        to_json_inner(self, &mut stack, &mut String::new())
    }
}

fn to_json_inner(
    value: &Value,
    stack: &mut Vec<usize>,
    path: &mut String,
) -> Result<serde_json::Value, ConvertError> {
    if let Some(id) = value.identity() {
        if stack.contains(&id) {
            return Err(ConvertError::Cyclic { path: path.clone() });
        }
        stack.push(id);
    }
    let out = match value {
        Value::Undefined | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => json_number(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(arr) => {
            let mut out = Vec::with_capacity(arr.len());
            for (i, item) in arr.items().iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{i}]"));
                out.push(to_json_inner(item, stack, path)?);
                path.truncate(len);
            }
            serde_json::Value::Array(out)
        }
        Value::Object(obj) => {
            let mut out = Map::new();
            for (k, v) in obj.entries() {
                if v.is_undefined() {
                    continue;
                }
                let len = path.len();
                path.push('.');
                path.push_str(&k);
                out.insert(k, to_json_inner(&v, stack, path)?);
                path.truncate(len);
            }
            serde_json::Value::Object(out)
        }
    };
    if value.identity().is_some() {
        stack.pop();
    }
    Ok(out)
}

/// Prefer integral JSON numbers when the float is exactly integral.
fn json_number(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        serde_json::Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl PartialEq for Value {
    /// Structural equality; shared handles short-circuit.
    ///
    /// Two distinct cyclic graphs never finish comparing.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b) || a.items() == b.items(),
            (Value::Object(a), Value::Object(b)) => {
                a.ptr_eq(b) || {
                    a.len() == b.len()
                        && a.entries()
                            .iter()
                            .all(|(k, v)| b.get(k).is_some_and(|other| *v == other))
                }
            }
            _ => self.strict_eq(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_value(self))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_value(self))
    }
}

// ------------------------------ Conversions ------------------------------ //

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(xs) => Value::array(xs.into_iter().map(Value::from)),
            serde_json::Value::Object(m) => {
                Value::object(m.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Literal> for Value {
    fn from(l: Literal) -> Self {
        l.to_value()
    }
}

// ----------------------------- Object / Array ---------------------------- //

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    /// Insert through the shared handle; every clone observes the change.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.write().insert(key.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Snapshot of the entries; the lock is released before returning.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let map: IndexMap<String, Value> = iter.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Object(Arc::new(RwLock::new(map)))
    }
}

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    pub fn push(&self, value: Value) {
        self.0.write().push(value);
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn items(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Array(Arc::new(RwLock::new(iter.into_iter().collect())))
    }
}

// -------------------------------- Literal -------------------------------- //

/// A scalar value that a literal type can hold or a literal domain can list.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(OrderedFloat<f64>),
    String(String),
}

impl Literal {
    pub fn basic_type(&self) -> BasicType {
        match self {
            Literal::Undefined => BasicType::Undefined,
            Literal::Null => BasicType::Null,
            Literal::Bool(_) => BasicType::Boolean,
            Literal::Number(_) => BasicType::Number,
            Literal::String(_) => BasicType::String,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Undefined => Value::Undefined,
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(n.0),
            Literal::String(s) => Value::String(s.clone()),
        }
    }

    /// Strict equality against an input value.
    pub fn matches(&self, value: &Value) -> bool {
        self.to_value().strict_eq(value)
    }
}

impl TryFrom<&Value> for Literal {
    type Error = ConvertError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Undefined => Ok(Literal::Undefined),
            Value::Null => Ok(Literal::Null),
            Value::Bool(b) => Ok(Literal::Bool(*b)),
            Value::Number(n) => Ok(Literal::Number(OrderedFloat(*n))),
            Value::String(s) => Ok(Literal::String(s.clone())),
            other => Err(ConvertError::NotALiteral { basic_type: other.basic_type() }),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Number(OrderedFloat(n))
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Number(OrderedFloat(n as f64))
    }
}

impl From<i32> for Literal {
    fn from(n: i32) -> Self {
        Literal::Number(OrderedFloat(n as f64))
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_literal(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_key_order() {
        let v = Value::from(json!({"b": 1, "a": [true, null]}));
        let obj = v.as_object().unwrap();
        assert_eq!(obj.keys(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(v.basic_type(), BasicType::Object);
    }

    #[test]
    fn test_clone_shares_identity() {
        let v = Value::from(json!({"a": 1}));
        let w = v.clone();
        assert!(v.strict_eq(&w));
        assert_eq!(v.identity(), w.identity());

        let other = Value::from(json!({"a": 1}));
        assert!(!v.strict_eq(&other));
        assert_eq!(v, other);
    }

    #[test]
    fn test_scalars_have_no_identity() {
        assert_eq!(Value::from(1).identity(), None);
        assert_eq!(Value::from("x").identity(), None);
        assert_eq!(Value::Undefined.identity(), None);
    }

    #[test]
    fn test_nan_is_not_strictly_equal() {
        let nan = Value::Number(f64::NAN);
        assert!(!nan.strict_eq(&nan));
    }

    #[test]
    fn test_to_json_drops_undefined_entries() {
        let v = Value::object([
            ("a", Value::from(1)),
            ("b", Value::Undefined),
            ("c", Value::array([Value::Undefined, Value::from(1.5)])),
        ]);
        assert_eq!(v.to_json().unwrap(), json!({"a": 1, "c": [null, 1.5]}));
    }

    #[test]
    fn test_to_json_rejects_cycles() {
        let obj = Object::new();
        obj.insert("self", Value::Object(obj.clone()));
        let err = Value::Object(obj).to_json().unwrap_err();
        assert!(matches!(err, ConvertError::Cyclic { ref path } if path == ".self"));
    }

    #[test]
    fn test_literal_round_trip() {
        let lit = Literal::from(5);
        assert!(lit.matches(&Value::from(5)));
        assert!(!lit.matches(&Value::from("5")));
        assert_eq!(Literal::try_from(&Value::from("x")).unwrap(), Literal::from("x"));
        assert!(Literal::try_from(&Value::object::<&str, _>([])).is_err());
    }

    #[test]
    fn test_object_equality_ignores_key_order() {
        let a = Value::from(json!({"a": 1, "b": [1, 2]}));
        let b = Value::from(json!({"b": [1, 2], "a": 1}));
        assert_eq!(a, b);
        assert_ne!(a, Value::from(json!({"a": 1, "c": [1, 2]})));
        assert_ne!(a, Value::from(json!({"a": 1})));
    }
}
