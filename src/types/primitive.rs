//! Minimal scalar leaves and the shared auto-cast rules.
//!
//! These plug into the core through [`TypeImpl`] like any user-defined
//! kind would.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

use crate::options::ValidationOptions;
use crate::print::js_string;
use crate::result::{create_result, DetailKind, Success, ValidationResult};
use crate::types::{AutoCastFailure, Type, TypeConfig, TypeImpl};
use crate::value::{BasicType, Literal, Value};

// ----------------------------- Auto-cast rules ---------------------------- //

/// Numbers pass through; non-blank numeric strings are parsed.
pub fn number_auto_cast(input: &Value) -> Result<Value, AutoCastFailure> {
    match input {
        Value::Number(_) => Ok(input.clone()),
        Value::String(s) if !s.trim().is_empty() => {
            let s = s.trim();
            match s.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Value::Number(n)),
                // `inf` and `nan` parse too, only the script spellings count
                Ok(n) if matches!(s, "Infinity" | "+Infinity" | "-Infinity") => Ok(Value::Number(n)),
                _ => Err(AutoCastFailure),
            }
        }
        _ => Err(AutoCastFailure),
    }
}

/// Booleans pass through; `"true"` and `"false"` are converted.
pub fn boolean_auto_cast(input: &Value) -> Result<Value, AutoCastFailure> {
    match input {
        Value::Bool(_) => Ok(input.clone()),
        Value::String(s) if s == "true" => Ok(Value::Bool(true)),
        Value::String(s) if s == "false" => Ok(Value::Bool(false)),
        _ => Err(AutoCastFailure),
    }
}

/// Scalars convert to their string form.
pub fn string_auto_cast(input: &Value) -> Result<Value, AutoCastFailure> {
    match input {
        Value::String(_) => Ok(input.clone()),
        Value::Number(_) | Value::Bool(_) => Ok(Value::String(js_string(input))),
        _ => Err(AutoCastFailure),
    }
}

// --------------------------------- string -------------------------------- //

struct StringImpl;

impl TypeImpl for StringImpl {
    fn name(&self) -> String {
        "string".into()
    }

    fn basic_type(&self) -> BasicType {
        BasicType::String
    }

    fn validate(&self, this: &Type, input: &Value, _: &mut ValidationOptions) -> ValidationResult {
        let Some(s) = input.as_str() else {
            return create_result(this, input, input.clone(), DetailKind::invalid_basic_type(BasicType::String));
        };
        create_result(this, input, input.clone(), string_violations(this.config(), s))
    }

    fn has_auto_cast(&self) -> bool {
        true
    }

    fn auto_cast(&self, input: &Value) -> Result<Value, AutoCastFailure> {
        string_auto_cast(input)
    }
}

/// Config keys: `minLength`, `maxLength`, `pattern`.
fn string_violations(config: &TypeConfig, s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let len = s.chars().count() as u64;
    if let Some(min) = config.get("minLength").and_then(|v| v.as_u64()) {
        if len < min {
            out.push(format!("expected a string with at least {min} characters"));
        }
    }
    if let Some(max) = config.get("maxLength").and_then(|v| v.as_u64()) {
        if len > max {
            out.push(format!("expected a string with at most {max} characters"));
        }
    }
    if let Some(pattern) = config.get("pattern").and_then(|v| v.as_str()) {
        match compiled_pattern(pattern) {
            Ok(re) if re.is_match(s) => {}
            Ok(_) => out.push(format!("expected a string matching pattern /{pattern}/")),
            Err(e) => out.push(format!("invalid pattern /{pattern}/: {e}")),
        }
    }
    out
}

// compiled `pattern` configs, shared by every string type
static PATTERNS: Lazy<Mutex<HashMap<String, Result<Regex, String>>>> = Lazy::new(Default::default);

fn compiled_pattern(pattern: &str) -> Result<Regex, String> {
    PATTERNS
        .lock()
        .entry(pattern.to_string())
        .or_insert_with(|| Regex::new(pattern).map_err(|e| e.to_string()))
        .clone()
}

pub fn string() -> Type {
    Type::new(StringImpl)
}

// --------------------------------- number -------------------------------- //

struct NumberImpl;

impl TypeImpl for NumberImpl {
    fn name(&self) -> String {
        "number".into()
    }

    fn basic_type(&self) -> BasicType {
        BasicType::Number
    }

    fn validate(&self, this: &Type, input: &Value, _: &mut ValidationOptions) -> ValidationResult {
        let Some(n) = input.as_f64() else {
            return create_result(this, input, input.clone(), DetailKind::invalid_basic_type(BasicType::Number));
        };
        if n.is_nan() {
            return create_result(this, input, input.clone(), "expected a number, got NaN");
        }
        let config = this.config();
        let mut violations = Vec::new();
        if let Some(min) = config.get("min").and_then(|v| v.as_f64()) {
            if n < min {
                violations.push(format!("expected a number of at least {min}"));
            }
        }
        if let Some(max) = config.get("max").and_then(|v| v.as_f64()) {
            if n > max {
                violations.push(format!("expected a number of at most {max}"));
            }
        }
        create_result(this, input, input.clone(), violations)
    }

    fn has_auto_cast(&self) -> bool {
        true
    }

    fn auto_cast(&self, input: &Value) -> Result<Value, AutoCastFailure> {
        number_auto_cast(input)
    }
}

pub fn number() -> Type {
    Type::new(NumberImpl)
}

// -------------------------------- boolean -------------------------------- //

struct BooleanImpl;

impl TypeImpl for BooleanImpl {
    fn name(&self) -> String {
        "boolean".into()
    }

    fn basic_type(&self) -> BasicType {
        BasicType::Boolean
    }

    fn validate(&self, this: &Type, input: &Value, _: &mut ValidationOptions) -> ValidationResult {
        match input {
            Value::Bool(_) => Ok(Success::new(input.clone())),
            _ => create_result(this, input, input.clone(), DetailKind::invalid_basic_type(BasicType::Boolean)),
        }
    }

    fn has_auto_cast(&self) -> bool {
        true
    }

    fn auto_cast(&self, input: &Value) -> Result<Value, AutoCastFailure> {
        boolean_auto_cast(input)
    }

    fn literal_domain(&self) -> Option<Vec<Literal>> {
        Some(vec![false.into(), true.into()])
    }
}

pub fn boolean() -> Type {
    Type::new(BooleanImpl)
}

// -------------------------------- unknown -------------------------------- //

struct UnknownImpl;

impl TypeImpl for UnknownImpl {
    fn name(&self) -> String {
        "unknown".into()
    }

    fn basic_type(&self) -> BasicType {
        BasicType::Mixed
    }

    fn validate(&self, _: &Type, input: &Value, _: &mut ValidationOptions) -> ValidationResult {
        Ok(Success::new(input.clone()))
    }
}

/// Accepts anything.
pub fn unknown() -> Type {
    Type::new(UnknownImpl)
}

struct UnknownRecordImpl;

impl TypeImpl for UnknownRecordImpl {
    fn name(&self) -> String {
        "Record<string, unknown>".into()
    }

    fn basic_type(&self) -> BasicType {
        BasicType::Object
    }

    fn validate(&self, this: &Type, input: &Value, _: &mut ValidationOptions) -> ValidationResult {
        match input {
            Value::Object(_) => Ok(Success::new(input.clone())),
            _ => create_result(this, input, input.clone(), DetailKind::invalid_basic_type(BasicType::Object)),
        }
    }
}

/// Accepts any object, whatever its keys.
pub fn unknown_record() -> Type {
    Type::new(UnknownRecordImpl)
}
