use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::borrow::Cow;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Replace every `{{key}}` in `text` with the string form of `inputs[key]`.
///
/// String values are inserted as-is, other JSON values in their JSON text form.
/// Placeholders whose key is not in `inputs` are left untouched.
pub fn interpolate<'a>(text: &'a str, inputs: &Map<String, Value>) -> Cow<'a, str> {
    if inputs.is_empty() {
        return Cow::Borrowed(text);
    }
    PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| match inputs.get(&caps[1]) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => caps[0].to_string(),
    })
}

/// Distinct placeholder keys in order of first appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        let key = &caps[1];
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}
