//! Label mapping and validation

use super::common::{
    OwnerDraft, normalize_hex_color, owner_from_row, personal_owner, string_field, uuid_field,
    valid_hex_color, validate_id, validate_owner,
};
use super::FieldMapper;
use crate::types::{HasRecordId, RawRow, ValidationError, ValidationReport};
use serde::Serialize;
use uuid::Uuid;

/// Creation-request shape for a label
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDraft {
    /// Client-supplied identifier, kept only in canonical UUID form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Hex color, '#'-prefixed after mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Owning principal; defaults to a personal owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerDraft>,
}

impl HasRecordId for LabelDraft {
    fn record_id(&self) -> Option<&Uuid> {
        self.id.as_ref()
    }
}

/// Maps raw rows to [`LabelDraft`] and validates them
#[derive(Clone, Copy, Debug, Default)]
pub struct LabelMapper;

impl FieldMapper for LabelMapper {
    type Draft = LabelDraft;

    fn map_fields(&self, row: &RawRow) -> LabelDraft {
        LabelDraft {
            id: uuid_field(row, "id"),
            name: string_field(row, "name"),
            color: string_field(row, "color").map(|c| normalize_hex_color(&c)),
            owner: owner_from_row(row).or_else(|| Some(personal_owner())),
        }
    }

    fn validate(&self, draft: &LabelDraft, row: &RawRow) -> ValidationReport {
        let mut errors = Vec::new();
        validate_id(row, &mut errors);

        if draft.name.is_none() {
            errors.push(ValidationError::error("name", "Name is required"));
        }

        match draft.color.as_deref() {
            None => errors.push(ValidationError::error("color", "Color is required")),
            Some(color) if !valid_hex_color(color) => errors.push(ValidationError::error(
                "color",
                "Color must be a hex value like #RRGGBB or #RRGGBBAA",
            )),
            _ => {}
        }

        validate_owner(draft.owner.as_ref(), true, &mut errors);
        ValidationReport::from_errors(errors)
    }
}
