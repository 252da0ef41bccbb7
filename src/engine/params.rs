//! `{{name}}` placeholder substitution for query and endpoint templates

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// String form used when a parameter lands in text: strings unquoted, other
/// scalars via display, composites as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Replace every `{{name}}` with its parameter. Unknown placeholders stay verbatim.
pub fn substitute(template: &str, parameters: &Map<String, Value>) -> String {
    if parameters.is_empty() || !template.contains("{{") {
        return template.to_string();
    }

    placeholder_pattern()
        .replace_all(template, |caps: &Captures| match parameters.get(&caps[1]) {
            Some(value) => value_to_text(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}
