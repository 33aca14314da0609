//! Top-level-sequence YAML decoding
//!
//! Mirrors the JSON rules: the document must be a sequence of mappings.
//! Tags are transparent, mapping keys are stringified, and nested mappings
//! survive as maps.

use crate::error::DecodeError;
use crate::types::{FileFormat, RawRow, RawValue};
use serde_yaml::Value;

/// Decode YAML bytes into ordered rows
pub(super) fn decode(bytes: &[u8]) -> Result<Vec<RawRow>, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8 {
        message: e.to_string(),
    })?;

    let document: Value = serde_yaml::from_str(text).map_err(|e| {
        let location = e.location();
        DecodeError::YamlSyntax {
            message: e.to_string(),
            line: location.as_ref().map(|l| l.line()),
            column: location.map(|l| l.column()),
        }
    })?;

    let Value::Sequence(elements) = untag(document) else {
        return Err(DecodeError::NotAnArray {
            format: FileFormat::Yaml,
        });
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| match untag(element) {
            Value::Mapping(fields) => Ok(fields
                .into_iter()
                .map(|(key, value)| (stringify(key), raw_value(value)))
                .collect()),
            _ => Err(DecodeError::NonObjectElement {
                format: FileFormat::Yaml,
                index,
            }),
        })
        .collect()
}

/// Strip YAML tags; the pipeline only cares about the underlying value
fn untag(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) => untag(tagged.value),
        other => other,
    }
}

fn raw_value(value: Value) -> RawValue {
    match untag(value) {
        Value::Null => RawValue::Null,
        Value::Bool(b) => RawValue::Bool(b),
        Value::Number(n) => RawValue::Number(n.as_f64().unwrap_or_default()),
        Value::String(s) => RawValue::String(s),
        Value::Sequence(items) => RawValue::List(items.into_iter().map(stringify).collect()),
        Value::Mapping(fields) => RawValue::Map(
            fields
                .into_iter()
                .map(|(key, value)| (stringify(key), raw_value(value)))
                .collect(),
        ),
        // untag already flattened this arm
        Value::Tagged(tagged) => raw_value(tagged.value),
    }
}

/// Sequence items and mapping keys become plain strings
fn stringify(value: Value) -> String {
    match untag(value) {
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_json::to_string(&other).unwrap_or_default(),
    }
}
