//! Field mapping and validation for the importable entities
//!
//! Each entity gets one unit-struct mapper implementing [`FieldMapper`]:
//! `map_fields` bridges a loosely-typed [`RawRow`] to the entity's typed,
//! all-optional draft shape, and `validate` independently judges whether
//! that draft is acceptable to submit. Both are pure functions of their
//! input, so every rule is unit-testable in isolation.
//!
//! Shared coercion rules (trimming, empty-as-unset, list splitting, owner
//! normalization, date/URL/UUID/hex checks) live in the `common` submodule.

mod common;
mod label;
mod provider;
mod subscription;

pub use common::OwnerDraft;
pub use label::{LabelDraft, LabelMapper};
pub use provider::{ProviderDraft, ProviderMapper};
pub use subscription::{
    CustomPriceDraft, FreeTrialDraft, PAYER_TYPES, PayerDraft, RECURRENCIES, SubscriptionDraft,
    SubscriptionMapper,
};

use crate::types::{ParsedRecord, RawRow, ValidationReport};

/// Bridge from raw decoded rows to an entity's creation-request shape.
///
/// `validate` receives the original row alongside the draft: some rules
/// (like a present-but-malformed `id`) report on values that mapping
/// intentionally dropped.
pub trait FieldMapper {
    /// The entity's typed, all-optional draft shape
    type Draft;

    /// Convert one raw row into a draft; never fails, malformed fields are
    /// simply left unset
    fn map_fields(&self, row: &RawRow) -> Self::Draft;

    /// Check every rule in one pass and report all violations
    fn validate(&self, draft: &Self::Draft, row: &RawRow) -> ValidationReport;
}

/// Map and validate every decoded row, assigning each record its position.
///
/// This is the glue between decoder output and importer input: the returned
/// records keep file order, and their `index` values are the handles later
/// passed to [`BulkImporter::import_records`](crate::importer::BulkImporter::import_records).
pub fn build_records<M: FieldMapper>(mapper: &M, rows: &[RawRow]) -> Vec<ParsedRecord<M::Draft>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let data = mapper.map_fields(row);
            let report = mapper.validate(&data, row);
            ParsedRecord {
                index,
                data,
                validation_errors: report.errors,
                is_valid: report.is_valid,
            }
        })
        .collect()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawValue;

    fn label_row(name: &str, color: &str) -> RawRow {
        let mut row = RawRow::new();
        row.insert("name", name);
        row.insert("color", color);
        row
    }

    #[test]
    fn build_records_assigns_indices_in_row_order() {
        let rows = vec![
            label_row("Entertainment", "#FF5733"),
            label_row("Gym", "#00FF00"),
        ];
        let records = build_records(&LabelMapper, &rows);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, 0);
        assert_eq!(records[0].data.name.as_deref(), Some("Entertainment"));
        assert_eq!(records[1].index, 1);
        assert_eq!(records[1].data.name.as_deref(), Some("Gym"));
        assert!(records.iter().all(|r| r.is_valid));
    }

    #[test]
    fn build_records_keeps_invalid_rows_with_their_errors() {
        let mut bad = RawRow::new();
        bad.insert("color", "nope");
        let rows = vec![label_row("Gym", "#00FF00"), bad];
        let records = build_records(&LabelMapper, &rows);

        assert!(records[0].is_valid);
        assert!(!records[1].is_valid);
        assert!(records[1]
            .validation_errors
            .iter()
            .any(|e| e.field == "name"));
        assert_eq!(records[1].index, 1, "invalid rows keep their position");
    }

    #[test]
    fn build_records_handles_an_empty_decode() {
        let records = build_records(&SubscriptionMapper, &[]);
        assert!(records.is_empty());
    }

    #[test]
    fn mappers_share_the_owner_rules() {
        let mut row = RawRow::new();
        row.insert("name", "x");
        row.insert("color", "#00FF00");
        row.insert("ownerType", "family");
        row.insert("ownerFamilyId", "f-1");

        let label = LabelMapper.map_fields(&row);
        let provider = ProviderMapper.map_fields(&row);
        assert_eq!(label.owner, provider.owner);
        assert_eq!(
            label.owner,
            Some(OwnerDraft {
                owner_type: Some("family".to_string()),
                family_id: Some("f-1".to_string()),
            })
        );
    }

    #[test]
    fn raw_value_from_impls_cover_the_mapper_inputs() {
        let mut row = RawRow::new();
        row.insert("s", "text");
        row.insert("n", 1.5);
        row.insert("b", true);
        row.insert("l", vec!["a".to_string()]);

        assert_eq!(row.get("s"), Some(&RawValue::String("text".to_string())));
        assert_eq!(row.get("n"), Some(&RawValue::Number(1.5)));
        assert_eq!(row.get("b"), Some(&RawValue::Bool(true)));
        assert_eq!(row.get("l"), Some(&RawValue::List(vec!["a".to_string()])));
    }
}
