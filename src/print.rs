//! Compact renderings of values and type names.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::PropertiesInfo;
use crate::value::{Literal, Value};

// nesting depth after which composite values print as `{...}` / `[...]`
const MAX_PRINT_DEPTH: usize = 3;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("static regex"));

pub fn print_literal(lit: &Literal) -> String {
    match lit {
        Literal::Undefined => "undefined".to_string(),
        Literal::Null => "null".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Number(n) => format_number(n.0),
        Literal::String(s) => quote(s),
    }
}

/// Render a value for names and messages. Bounded in depth, so safe on
/// cyclic graphs.
pub fn print_value(value: &Value) -> String {
    let mut out = String::new();
    print_into(value, 0, &mut out);
    out
}

fn print_into(value: &Value, depth: usize, out: &mut String) {
    match value {
        Value::Undefined => out.push_str("undefined"),
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&format_number(*n)),
        Value::String(s) => out.push_str(&quote(s)),
        Value::Array(arr) => {
            if depth >= MAX_PRINT_DEPTH {
                out.push_str("[...]");
                return;
            }
            out.push('[');
            for (i, item) in arr.items().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_into(item, depth + 1, out);
            }
            out.push(']');
        }
        Value::Object(obj) => {
            if depth >= MAX_PRINT_DEPTH {
                out.push_str("{...}");
                return;
            }
            let entries = obj.entries();
            if entries.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{ ");
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&print_key(k));
                out.push_str(": ");
                print_into(v, depth + 1, out);
            }
            out.push_str(" }");
        }
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn print_key(key: &str) -> String {
    if IDENTIFIER.is_match(key) { key.to_string() } else { quote(key) }
}

/// Numbers the way a script runtime prints them: `1`, `1.5`, `NaN`,
/// `Infinity`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        if n == 0.0 { "0".to_string() } else { format!("{n:.0}") }
    } else {
        format!("{n}")
    }
}

/// Loose string conversion used by string auto-casting.
pub fn js_string(value: &Value) -> String {
    js_string_inner(value, &mut Vec::new())
}

fn js_string_inner(value: &Value, stack: &mut Vec<usize>) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.clone(),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Array(arr) => {
            let id = value.identity().unwrap_or_default();
            if stack.contains(&id) {
                return String::new();
            }
            stack.push(id);
            let parts: Vec<String> = arr
                .items()
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => js_string_inner(other, stack),
                })
                .collect();
            stack.pop();
            parts.join(",")
        }
    }
}

// ------------------------------ Type names ------------------------------- //

/// Which surrounding operator a name is about to be embedded in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Embedding {
    /// joined with ` & `
    Intersection,
    /// followed by `.suffix`
    Postfix,
}

/// Wrap `name` in parentheses when it contains a top-level operator that
/// binds looser than the embedding.
pub fn brackets_if_needed(name: &str, embedding: Embedding) -> String {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut prev = '\0';
    let mut needs = false;
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if c == '"' && prev != '\\' {
                in_string = false;
            }
        } else {
            match c {
                '"' => in_string = true,
                '(' | '[' | '{' | '<' => depth += 1,
                ')' | ']' | '}' | '>' => depth -= 1,
                '|' | '&' if depth == 0 => {
                    let spaced = i > 0 && chars[i - 1] == ' ' && chars.get(i + 1) == Some(&' ');
                    if spaced && (c == '|' || embedding == Embedding::Postfix) {
                        needs = true;
                    }
                }
                _ => {}
            }
        }
        prev = c;
    }
    if needs { format!("({name})") } else { name.to_string() }
}

/// `{ a: number, b?: string }`
pub fn default_object_rep(props_info: &PropertiesInfo) -> String {
    if props_info.is_empty() {
        return "{}".to_string();
    }
    let fields: Vec<String> = props_info
        .iter()
        .map(|(key, info)| {
            format!(
                "{}{}: {}",
                print_key(key),
                if info.partial { "?" } else { "" },
                info.ty.name()
            )
        })
        .collect();
    format!("{{ {} }}", fields.join(", "))
}

/// `<Name>.<extension>`, bracketed when needed.
pub fn extension_name(name: &str, extension: &str) -> String {
    format!("{}.{extension}", brackets_if_needed(name, Embedding::Postfix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_print_value() {
        let v = Value::from(json!({"a": 1, "b-c": ["x", null]}));
        assert_eq!(print_value(&v), r#"{ a: 1, "b-c": ["x", null] }"#);
        assert_eq!(print_value(&Value::Undefined), "undefined");
    }

    #[test]
    fn test_print_value_is_bounded_on_cycles() {
        let obj = crate::value::Object::new();
        obj.insert("me", Value::Object(obj.clone()));
        assert_eq!(print_value(&Value::Object(obj)), "{ me: { me: { me: {...} } } }");
    }

    #[test]
    fn test_js_string() {
        assert_eq!(js_string(&Value::from(12)), "12");
        assert_eq!(js_string(&Value::Null), "null");
        assert_eq!(js_string(&Value::from(json!([1, null, "a"]))), "1,,a");
        assert_eq!(js_string(&Value::from(json!({}))), "[object Object]");
    }

    #[test]
    fn test_brackets_if_needed() {
        assert_eq!(brackets_if_needed("A | B", Embedding::Intersection), "(A | B)");
        assert_eq!(brackets_if_needed("A & B", Embedding::Intersection), "A & B");
        assert_eq!(brackets_if_needed("A & B", Embedding::Postfix), "(A & B)");
        assert_eq!(brackets_if_needed("{ a: A | B }", Embedding::Postfix), "{ a: A | B }");
        assert_eq!(extension_name("number", "autoCast"), "number.autoCast");
    }
}
