//! Subscription mapping and validation
//!
//! Subscriptions carry the richest shape of the three entities: dates, a
//! recurrency enumeration, an optional custom price, an optional payer and
//! an optional free trial. Nested objects may arrive ready-made (JSON/YAML)
//! or as flattened sibling fields (CSV); both normalize to the same draft.

use super::common::{
    OwnerDraft, date_field, list_field, map_date, map_number, map_string, number_field,
    owner_from_row, personal_owner, string_field, uuid_field, validate_id, validate_owner,
};
use super::FieldMapper;
use crate::types::{HasRecordId, RawRow, RawValue, ValidationError, ValidationReport};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Recurrency values accepted on a subscription
pub const RECURRENCIES: [&str; 6] = [
    "daily", "weekly", "monthly", "quarterly", "yearly", "custom",
];

/// Payer types accepted on a subscription
pub const PAYER_TYPES: [&str; 2] = ["family", "family_member"];

/// Price override attached to a subscription
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPriceDraft {
    /// Amount, zero or greater
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Three-letter currency code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Who pays for the subscription when it is not the owner
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerDraft {
    /// One of family/family_member once validated
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub payer_type: Option<String>,
    /// Paying family
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    /// Paying member, required for family_member payers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
}

/// Free-trial window attached to a subscription
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeTrialDraft {
    /// First day of the trial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Last day of the trial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// Creation-request shape for a subscription
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDraft {
    /// Client-supplied identifier, kept only in canonical UUID form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Provider this subscription belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// First billed day
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Last billed day, on or after the start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Billing cadence, lower-cased during mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrency: Option<String>,
    /// Cadence interval when recurrency is custom
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_recurrency: Option<f64>,
    /// Price override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_price: Option<CustomPriceDraft>,
    /// Paying principal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<PayerDraft>,
    /// Free-trial window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_trial: Option<FreeTrialDraft>,
    /// Label names to attach
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    /// Family members sharing the subscription
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_users: Option<Vec<String>>,
    /// Owning principal; defaults to a personal owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerDraft>,
}

impl HasRecordId for SubscriptionDraft {
    fn record_id(&self) -> Option<&Uuid> {
        self.id.as_ref()
    }
}

/// Maps raw rows to [`SubscriptionDraft`] and validates them
#[derive(Clone, Copy, Debug, Default)]
pub struct SubscriptionMapper;

impl FieldMapper for SubscriptionMapper {
    type Draft = SubscriptionDraft;

    fn map_fields(&self, row: &RawRow) -> SubscriptionDraft {
        SubscriptionDraft {
            id: uuid_field(row, "id"),
            provider_id: string_field(row, "providerId"),
            start_date: date_field(row, "startDate"),
            end_date: date_field(row, "endDate"),
            recurrency: string_field(row, "recurrency").map(|r| r.to_lowercase()),
            custom_recurrency: number_field(row, "customRecurrency"),
            custom_price: custom_price_from_row(row),
            payer: payer_from_row(row),
            free_trial: free_trial_from_row(row),
            labels: list_field(row, "labels"),
            family_users: list_field(row, "familyUsers"),
            owner: owner_from_row(row).or_else(|| Some(personal_owner())),
        }
    }

    fn validate(&self, draft: &SubscriptionDraft, row: &RawRow) -> ValidationReport {
        let mut errors = Vec::new();
        validate_id(row, &mut errors);

        if draft.provider_id.is_none() {
            errors.push(ValidationError::error("providerId", "Provider ID is required"));
        }

        if draft.start_date.is_none() {
            // distinguish unparsable from absent using the original value
            let message = if string_field(row, "startDate").is_some() {
                "Invalid date format"
            } else {
                "Start date is required"
            };
            errors.push(ValidationError::error("startDate", message));
        }

        match (draft.start_date, draft.end_date) {
            (_, None) if string_field(row, "endDate").is_some() => {
                errors.push(ValidationError::error("endDate", "Invalid date format"));
            }
            (Some(start), Some(end)) if end < start => {
                errors.push(ValidationError::error(
                    "endDate",
                    "End date must be after start date",
                ));
            }
            _ => {}
        }

        match draft.recurrency.as_deref() {
            None => errors.push(ValidationError::error("recurrency", "Recurrency is required")),
            Some(r) if !RECURRENCIES.contains(&r) => errors.push(ValidationError::error(
                "recurrency",
                "Recurrency must be one of daily, weekly, monthly, quarterly, yearly, custom",
            )),
            _ => {}
        }

        if let Some(n) = draft.custom_recurrency {
            if n <= 0.0 {
                errors.push(ValidationError::error(
                    "customRecurrency",
                    "Custom recurrency must be a positive number",
                ));
            }
        }

        if let Some(price) = &draft.custom_price {
            validate_custom_price(price, &mut errors);
        }
        if let Some(payer) = &draft.payer {
            validate_payer(payer, &mut errors);
        }
        if let Some(trial) = &draft.free_trial {
            validate_free_trial(trial, &mut errors);
        }

        validate_owner(draft.owner.as_ref(), true, &mut errors);
        ValidationReport::from_errors(errors)
    }
}

fn validate_custom_price(price: &CustomPriceDraft, errors: &mut Vec<ValidationError>) {
    match price.value {
        None => errors.push(ValidationError::error(
            "customPrice.value",
            "Custom price value is required",
        )),
        Some(value) if value < 0.0 => errors.push(ValidationError::error(
            "customPrice.value",
            "Custom price value must be zero or greater",
        )),
        _ => {}
    }

    let currency_ok = price
        .currency
        .as_deref()
        .is_some_and(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()));
    if !currency_ok {
        errors.push(ValidationError::error(
            "customPrice.currency",
            "Currency must be a 3-letter code",
        ));
    }
}

fn validate_payer(payer: &PayerDraft, errors: &mut Vec<ValidationError>) {
    match payer.payer_type.as_deref() {
        None => errors.push(ValidationError::error("payer.type", "Payer type is required")),
        Some(t) if !PAYER_TYPES.contains(&t) => errors.push(ValidationError::error(
            "payer.type",
            "Payer type must be family or family_member",
        )),
        _ => {}
    }

    if payer.family_id.is_none() {
        errors.push(ValidationError::error(
            "payer.familyId",
            "Payer family ID is required",
        ));
    }

    if payer.payer_type.as_deref() == Some("family_member") && payer.member_id.is_none() {
        errors.push(ValidationError::error(
            "payer.memberId",
            "Member ID is required when payer type is family_member",
        ));
    }
}

fn validate_free_trial(trial: &FreeTrialDraft, errors: &mut Vec<ValidationError>) {
    if trial.start_date.is_none() {
        errors.push(ValidationError::error(
            "freeTrial.startDate",
            "Free trial start date is required",
        ));
    }
    if trial.end_date.is_none() {
        errors.push(ValidationError::error(
            "freeTrial.endDate",
            "Free trial end date is required",
        ));
    }
    if let (Some(start), Some(end)) = (trial.start_date, trial.end_date) {
        if end < start {
            errors.push(ValidationError::error(
                "freeTrial.endDate",
                "End date must be after start date",
            ));
        }
    }
}

fn custom_price_from_row(row: &RawRow) -> Option<CustomPriceDraft> {
    if let Some(map) = row.get("customPrice").and_then(RawValue::as_map) {
        let value = map_number(map, "value");
        let currency = map_string(map, "currency");
        if value.is_some() || currency.is_some() {
            return Some(CustomPriceDraft { value, currency });
        }
    }

    let value = number_field(row, "customPriceValue");
    let currency = string_field(row, "customPriceCurrency");
    if value.is_some() || currency.is_some() {
        return Some(CustomPriceDraft { value, currency });
    }
    None
}

fn payer_from_row(row: &RawRow) -> Option<PayerDraft> {
    if let Some(map) = row.get("payer").and_then(RawValue::as_map) {
        let payer_type = map_string(map, "type");
        let family_id = map_string(map, "familyId");
        let member_id = map_string(map, "memberId");
        if payer_type.is_some() || family_id.is_some() || member_id.is_some() {
            return Some(PayerDraft {
                payer_type,
                family_id,
                member_id,
            });
        }
    }

    let payer_type = string_field(row, "payerType");
    let family_id = string_field(row, "payerFamilyId");
    let member_id = string_field(row, "payerMemberId");
    if payer_type.is_some() || family_id.is_some() || member_id.is_some() {
        return Some(PayerDraft {
            payer_type,
            family_id,
            member_id,
        });
    }
    None
}

fn free_trial_from_row(row: &RawRow) -> Option<FreeTrialDraft> {
    if let Some(map) = row.get("freeTrial").and_then(RawValue::as_map) {
        let start_date = map_date(map, "startDate");
        let end_date = map_date(map, "endDate");
        if start_date.is_some() || end_date.is_some() {
            return Some(FreeTrialDraft {
                start_date,
                end_date,
            });
        }
    }

    let start_date = date_field(row, "freeTrialStartDate");
    let end_date = date_field(row, "freeTrialEndDate");
    if start_date.is_some() || end_date.is_some() {
        return Some(FreeTrialDraft {
            start_date,
            end_date,
        });
    }
    None
}
