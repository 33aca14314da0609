//! Field extraction and validation helpers shared by the entity mappers
//!
//! Everything here is a pure function over [`RawRow`]/[`RawValue`]. The
//! extraction helpers implement the common coercion rules: strings are
//! trimmed, empty strings count as "not provided", numbers and booleans
//! have textual fallbacks, and list fields accept native lists or a single
//! comma-separated string.

use crate::types::{RawRow, RawValue, ValidationError};
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use url::Url;
use uuid::Uuid;

/// Owner types accepted on any record
pub const OWNER_TYPES: [&str; 3] = ["personal", "family", "system"];

/// Date formats tried in order before falling back to RFC 3339
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

static HEX_COLOR: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$"));

/// Coerce one raw value to a trimmed, non-empty string
fn coerce_string(value: &RawValue) -> Option<String> {
    match value {
        RawValue::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        RawValue::Number(n) => {
            // whole numbers print without a trailing ".0"
            if n.fract() == 0.0 && n.abs() < 1e15 {
                Some(format!("{}", *n as i64))
            } else {
                Some(n.to_string())
            }
        }
        RawValue::Bool(b) => Some(b.to_string()),
        RawValue::Null | RawValue::List(_) | RawValue::Map(_) => None,
    }
}

fn coerce_number(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Number(n) => Some(*n),
        RawValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract a trimmed string field; absent/null/empty all count as unset
pub fn string_field(row: &RawRow, name: &str) -> Option<String> {
    row.get(name).and_then(coerce_string)
}

/// Extract a numeric field, accepting numbers or numeric strings
pub fn number_field(row: &RawRow, name: &str) -> Option<f64> {
    row.get(name).and_then(coerce_number)
}

/// Extract a date field via [`parse_date`]
pub fn date_field(row: &RawRow, name: &str) -> Option<NaiveDate> {
    string_field(row, name).and_then(|s| parse_date(&s))
}

/// Extract a list field: native lists and comma-separated strings both
/// yield trimmed, non-empty elements; an empty result counts as unset
pub fn list_field(row: &RawRow, name: &str) -> Option<Vec<String>> {
    let items: Vec<String> = match row.get(name)? {
        RawValue::List(items) => items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        RawValue::String(s) => s
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        _ => return None,
    };
    (!items.is_empty()).then_some(items)
}

/// Extract an identifier field, keeping it only in canonical UUID form
pub fn uuid_field(row: &RawRow, name: &str) -> Option<Uuid> {
    string_field(row, name)
        .filter(|s| valid_uuid(s))
        .and_then(|s| Uuid::parse_str(&s).ok())
}

/// String lookup inside a nested mapping, with the same coercion rules as
/// [`string_field`]
pub fn map_string(map: &BTreeMap<String, RawValue>, key: &str) -> Option<String> {
    map.get(key).and_then(coerce_string)
}

/// Number lookup inside a nested mapping
pub fn map_number(map: &BTreeMap<String, RawValue>, key: &str) -> Option<f64> {
    map.get(key).and_then(coerce_number)
}

/// Date lookup inside a nested mapping
pub fn map_date(map: &BTreeMap<String, RawValue>, key: &str) -> Option<NaiveDate> {
    map_string(map, key).and_then(|s| parse_date(&s))
}

/// True for the canonical hyphenated UUID textual form only
pub fn valid_uuid(value: &str) -> bool {
    // parse_str also accepts braced/bare forms; the length pins it down
    value.len() == 36 && Uuid::parse_str(value).is_ok()
}

/// True for '#'-prefixed 6- or 8-digit hex colors
pub fn valid_hex_color(value: &str) -> bool {
    HEX_COLOR.as_ref().map(|re| re.is_match(value)).unwrap_or(false)
}

/// True when the value parses as an absolute URL
pub fn valid_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Prefix a hex color with '#' when the user left it off
pub fn normalize_hex_color(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.starts_with('#') {
        trimmed.to_string()
    } else {
        format!("#{trimmed}")
    }
}

/// Parse a date from the accepted textual forms.
///
/// Tries `YYYY-MM-DD`, `YYYY/MM/DD` and `MM/DD/YYYY`, then falls back to the
/// date part of an RFC 3339 timestamp.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Normalized owner shape shared by every entity draft.
///
/// Both fields stay optional strings so malformed inputs survive mapping and
/// are reported by validation instead of silently disappearing.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OwnerDraft {
    /// One of personal/family/system once validated
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub owner_type: Option<String>,
    /// Owning family, required when `owner_type` is family
    #[serde(rename = "familyId", skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
}

/// The default owner for entities that require one
pub fn personal_owner() -> OwnerDraft {
    OwnerDraft {
        owner_type: Some("personal".to_string()),
        family_id: None,
    }
}

/// Normalize an owner supplied either nested (`owner: {type, familyId}`) or
/// flattened (`ownerType`/`ownerFamilyId`, the only shape CSV can express).
///
/// Returns `None` when neither shape carries a usable value; entity mappers
/// decide whether that means "default to personal" or "leave unset".
pub fn owner_from_row(row: &RawRow) -> Option<OwnerDraft> {
    if let Some(map) = row.get("owner").and_then(RawValue::as_map) {
        let owner_type = map_string(map, "type");
        let family_id = map_string(map, "familyId");
        if owner_type.is_some() || family_id.is_some() {
            return Some(OwnerDraft {
                owner_type,
                family_id,
            });
        }
    }

    let owner_type = string_field(row, "ownerType");
    let family_id = string_field(row, "ownerFamilyId");
    if owner_type.is_some() || family_id.is_some() {
        return Some(OwnerDraft {
            owner_type,
            family_id,
        });
    }
    None
}

/// Validate an owner against the shared rule: type must be one of
/// [`OWNER_TYPES`], and family-owned records need a family id.
pub fn validate_owner(
    owner: Option<&OwnerDraft>,
    required: bool,
    errors: &mut Vec<ValidationError>,
) {
    let Some(owner) = owner else {
        if required {
            errors.push(ValidationError::error("owner", "Owner is required"));
        }
        return;
    };

    match owner.owner_type.as_deref() {
        None => errors.push(ValidationError::error("owner.type", "Owner type is required")),
        Some(t) if !OWNER_TYPES.contains(&t) => errors.push(ValidationError::error(
            "owner.type",
            "Owner type must be personal, family, or system",
        )),
        _ => {}
    }

    if owner.owner_type.as_deref() == Some("family") && owner.family_id.is_none() {
        errors.push(ValidationError::error(
            "owner.familyId",
            "Family ID is required when owner type is family",
        ));
    }
}

/// Report a present-but-malformed raw `id`.
///
/// Mapping silently drops ids that are not in canonical UUID form, so this
/// check runs against the original raw value rather than the draft.
pub fn validate_id(row: &RawRow, errors: &mut Vec<ValidationError>) {
    if let Some(raw) = string_field(row, "id") {
        if !valid_uuid(&raw) {
            errors.push(ValidationError::error("id", "Invalid UUID format"));
        }
    }
}
