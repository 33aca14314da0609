//! Provider mapping and validation

use super::common::{
    OwnerDraft, list_field, owner_from_row, string_field, uuid_field, valid_url, validate_id,
    validate_owner,
};
use super::FieldMapper;
use crate::types::{HasRecordId, RawRow, ValidationError, ValidationReport};
use serde::Serialize;
use uuid::Uuid;

/// Creation-request shape for a provider
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDraft {
    /// Client-supplied identifier, kept only in canonical UUID form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Link describing the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Provider home page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Icon image link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Pricing page link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_page_url: Option<String>,
    /// Label names to attach
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    /// Owning principal; providers may be unowned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerDraft>,
}

impl HasRecordId for ProviderDraft {
    fn record_id(&self) -> Option<&Uuid> {
        self.id.as_ref()
    }
}

/// Maps raw rows to [`ProviderDraft`] and validates them
#[derive(Clone, Copy, Debug, Default)]
pub struct ProviderMapper;

impl FieldMapper for ProviderMapper {
    type Draft = ProviderDraft;

    fn map_fields(&self, row: &RawRow) -> ProviderDraft {
        ProviderDraft {
            id: uuid_field(row, "id"),
            name: string_field(row, "name"),
            description: string_field(row, "description"),
            url: string_field(row, "url"),
            icon_url: string_field(row, "iconUrl"),
            pricing_page_url: string_field(row, "pricingPageUrl"),
            labels: list_field(row, "labels"),
            owner: owner_from_row(row),
        }
    }

    fn validate(&self, draft: &ProviderDraft, row: &RawRow) -> ValidationReport {
        let mut errors = Vec::new();
        validate_id(row, &mut errors);

        if draft.name.is_none() {
            errors.push(ValidationError::error("name", "Name is required"));
        }

        let links = [
            ("description", &draft.description),
            ("url", &draft.url),
            ("iconUrl", &draft.icon_url),
            ("pricingPageUrl", &draft.pricing_page_url),
        ];
        for (field, value) in links {
            if let Some(value) = value {
                if !valid_url(value) {
                    errors.push(ValidationError::error(field, "Invalid URL format"));
                }
            }
        }

        validate_owner(draft.owner.as_ref(), false, &mut errors);
        ValidationReport::from_errors(errors)
    }
}
