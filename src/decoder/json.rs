//! Top-level-array JSON decoding
//!
//! The document must be an array; every element must be a non-null object.
//! Scalars keep their JSON types, arrays are flattened to string lists, and
//! nested objects survive as maps for the mapping layer to walk.

use crate::error::DecodeError;
use crate::types::{FileFormat, RawRow, RawValue};
use serde_json::Value;

/// Decode JSON bytes into ordered rows
pub(super) fn decode(bytes: &[u8]) -> Result<Vec<RawRow>, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8 {
        message: e.to_string(),
    })?;

    let document: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::JsonSyntax {
            // serde_json embeds "at line L column C" in its message
            message: e.to_string(),
        })?;

    let Value::Array(elements) = document else {
        return Err(DecodeError::NotAnArray {
            format: FileFormat::Json,
        });
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| match element {
            Value::Object(fields) => Ok(fields
                .into_iter()
                .map(|(name, value)| (name, raw_value(value)))
                .collect()),
            _ => Err(DecodeError::NonObjectElement {
                format: FileFormat::Json,
                index,
            }),
        })
        .collect()
}

fn raw_value(value: Value) -> RawValue {
    match value {
        Value::Null => RawValue::Null,
        Value::Bool(b) => RawValue::Bool(b),
        Value::Number(n) => RawValue::Number(n.as_f64().unwrap_or_default()),
        Value::String(s) => RawValue::String(s),
        Value::Array(items) => RawValue::List(items.into_iter().map(stringify).collect()),
        Value::Object(fields) => RawValue::Map(
            fields
                .into_iter()
                .map(|(name, value)| (name, raw_value(value)))
                .collect(),
        ),
    }
}

/// List elements become strings; non-string elements keep their JSON text
fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
