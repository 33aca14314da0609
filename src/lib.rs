//! # subimport
//!
//! Embeddable bulk-import pipeline for subscription tracker applications.
//!
//! ## Design Philosophy
//!
//! subimport is designed to be:
//! - **Format-agnostic** - CSV, JSON and YAML uploads decode to one row shape
//! - **Tolerant on input** - mapping never fails; problems become validation
//!   errors on the record, reported all at once
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to run events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use subimport::{
//!     BulkImporter, FileDecoder, HttpSubmitter, ImportFile, ImporterConfig, LabelMapper,
//!     build_records,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Decode an uploaded file into rows (format sniffed from the name)
//!     let file = ImportFile::load("labels.csv").await?;
//!     let rows = FileDecoder::new().parse(&file)?;
//!
//!     // Map and validate every row; nothing is dropped
//!     let records = build_records(&LabelMapper, &rows);
//!     let indices: Vec<usize> = records.iter().map(|r| r.index).collect();
//!
//!     // Submit them, one at a time, to the backend's create endpoint
//!     let submitter = HttpSubmitter::new("https://api.example.com/labels".parse()?);
//!     let importer = BulkImporter::new(records, Arc::new(submitter), ImporterConfig::default());
//!
//!     // Subscribe to run events
//!     let mut events = importer.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     importer.import_records(&indices).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// File decoding (CSV, JSON, YAML) into raw rows
pub mod decoder;
/// Error types
pub mod error;
/// Sequential bulk-import orchestration
pub mod importer;
/// Per-entity field mapping and validation
pub mod mapper;
/// Retry classification and backoff computation
pub mod retry;
/// Record submission over HTTP
pub mod submit;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{ImporterConfig, RetryPolicy};
pub use decoder::{FileDecoder, ImportFile};
pub use error::{DecodeError, Error, Result, SubmitError};
pub use importer::BulkImporter;
pub use mapper::{
    FieldMapper, LabelDraft, LabelMapper, OwnerDraft, ProviderDraft, ProviderMapper,
    SubscriptionDraft, SubscriptionMapper, build_records,
};
pub use submit::{HttpSubmitter, RecordSubmitter};
pub use types::{
    FileFormat, HasRecordId, ImportEvent, ImportProgress, ImportState, ImportStatus, ParsedRecord,
    RawRow, RawValue, ValidationError, ValidationReport,
};

/// Decode `file` and run `mapper` over every row it contains.
///
/// One-call convenience for the common decode-then-map sequence; the
/// returned records are ready to hand to [`BulkImporter::new`]. Decoding
/// failures surface as [`Error`]; mapping itself never fails.
///
/// # Example
///
/// ```no_run
/// use subimport::{ImportFile, LabelMapper, parse_and_map};
///
/// # async fn example() -> subimport::Result<()> {
/// let file = ImportFile::load("labels.csv").await?;
/// let records = parse_and_map(&file, &LabelMapper)?;
/// println!("{} rows, {} valid", records.len(),
///     records.iter().filter(|r| r.is_valid).count());
/// # Ok(())
/// # }
/// ```
pub fn parse_and_map<M: FieldMapper>(
    file: &ImportFile,
    mapper: &M,
) -> Result<Vec<ParsedRecord<M::Draft>>> {
    let rows = FileDecoder::new().parse(file)?;
    Ok(build_records(mapper, &rows))
}
