//! Core types and events for the import pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A single decoded value from an uploaded file, before any type coercion.
///
/// Decoders produce these; mappers pattern-match on them. The set of variants
/// is deliberately closed: every mapper can handle every shape a decoder can
/// emit, and the compiler checks it.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    /// A textual value (all CSV cells decode to this)
    String(String),
    /// A numeric value (JSON/YAML numbers, lossy to f64)
    Number(f64),
    /// A boolean value
    Bool(bool),
    /// An explicit null
    Null,
    /// A list of strings (non-string elements are stringified by decoders)
    List(Vec<String>),
    /// A nested mapping (owner/payer/customPrice/freeTrial style objects)
    Map(BTreeMap<String, RawValue>),
}

impl RawValue {
    /// Borrow the inner string if this value is textual
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Borrow the inner mapping if this value is a nested object
    pub fn as_map(&self) -> Option<&BTreeMap<String, RawValue>> {
        match self {
            RawValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::String(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::String(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(items: Vec<String>) -> Self {
        RawValue::List(items)
    }
}

/// One decoded record from an uploaded file: field name to raw value.
///
/// Produced fresh per decode and immutable afterwards. A row has no identity
/// beyond its position in the decoded sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRow {
    fields: BTreeMap<String, RawValue>,
}

impl RawRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    /// Number of fields in the row
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the row has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over the fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RawValue)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, RawValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Severity of a validation finding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks submission of the record
    Error,
    /// Informational only; does not block submission
    Warning,
}

/// A field-scoped rule violation found during validation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. "owner.familyId")
    pub field: String,
    /// Human-readable description of the violation
    pub message: String,
    /// Whether this finding blocks submission
    pub severity: Severity,
}

impl ValidationError {
    /// Create an error-severity finding
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// Create a warning-severity finding
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

/// Outcome of validating one draft record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff no error-severity findings exist
    pub is_valid: bool,
    /// Every violated rule, in the order the rules were checked
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Build a report from findings, deriving validity from their severities
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        let is_valid = !errors.iter().any(|e| e.severity == Severity::Error);
        Self { is_valid, errors }
    }

    /// A report with no findings
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }
}

/// One row after mapping and validation: the immutable input to the importer
#[derive(Clone, Debug, Serialize)]
pub struct ParsedRecord<T> {
    /// Position of the source row in the decoded sequence (stable)
    pub index: usize,
    /// The mapped draft, with all-optional fields
    pub data: T,
    /// Findings from validation, complete (never fail-fast)
    pub validation_errors: Vec<ValidationError>,
    /// True iff no error-severity findings were recorded
    pub is_valid: bool,
}

/// Access to the optional client-supplied identifier on a mapped record.
///
/// The importer uses this to phrase conflict messages ("Entity with ID …
/// already exists") without knowing anything else about the record type.
pub trait HasRecordId {
    /// The record's identifier, when the source row supplied a valid one
    fn record_id(&self) -> Option<&Uuid>;
}

/// Lifecycle state of one record within a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportState {
    /// Not yet reached by the run
    Pending,
    /// Submission (or a retry of it) is underway
    Importing,
    /// Settled: the remote operation accepted the record
    Success,
    /// Settled: validation failed or the remote operation was rejected
    Error,
}

impl ImportState {
    /// True for the settled states (success, error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportState::Success | ImportState::Error)
    }
}

/// Per-record status, replaced (never merged) on every transition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportStatus {
    /// Current lifecycle state
    pub state: ImportState,
    /// Human-readable failure message, present only in the error state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportStatus {
    /// Status for a record the run has not reached yet
    pub fn pending() -> Self {
        Self {
            state: ImportState::Pending,
            error: None,
        }
    }

    /// Status for a record whose submission is underway
    pub fn importing() -> Self {
        Self {
            state: ImportState::Importing,
            error: None,
        }
    }

    /// Terminal status for an accepted record
    pub fn success() -> Self {
        Self {
            state: ImportState::Success,
            error: None,
        }
    }

    /// Terminal status for a rejected record
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: ImportState::Error,
            error: Some(message.into()),
        }
    }
}

/// Aggregate progress of one run, recomputed after every settle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    /// Number of indices requested for this run
    pub total: usize,
    /// Records that settled successfully
    pub completed: usize,
    /// Records that settled with an error
    pub failed: usize,
    /// True while completed + failed < total
    pub in_progress: bool,
}

impl ImportProgress {
    /// Fresh progress for a run over `total` records
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            in_progress: total > 0,
        }
    }

    /// Recompute the in_progress flag from the counters
    pub fn recalculate(&mut self) {
        self.in_progress = self.completed + self.failed < self.total;
    }
}

/// File format sniffed from an upload's name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Comma-separated values (`.csv`)
    Csv,
    /// JSON document (`.json`)
    Json,
    /// YAML document (`.yaml` / `.yml`)
    Yaml,
    /// Anything else; never decoded
    Unknown,
}

impl FileFormat {
    /// Sniff the format from a file name's extension, case-insensitively
    pub fn from_name(name: &str) -> Self {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => FileFormat::Csv,
            "json" => FileFormat::Json,
            "yaml" | "yml" => FileFormat::Yaml,
            _ => FileFormat::Unknown,
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FileFormat::Csv => "CSV",
            FileFormat::Json => "JSON",
            FileFormat::Yaml => "YAML",
            FileFormat::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Event emitted while a run progresses
///
/// Observational only: every guarantee lives in the status map and progress
/// counters, which consumers can snapshot at any time.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEvent {
    /// A bulk run began
    RunStarted {
        /// Number of indices in the run
        total: usize,
    },

    /// A record transitioned to importing
    RecordStarted {
        /// Index of the record
        index: usize,
    },

    /// A record's submission failed transiently and will be re-attempted
    RecordRetrying {
        /// Index of the record
        index: usize,
        /// Upcoming attempt number (1 = first retry)
        attempt: u32,
        /// Backoff that will elapse before the attempt
        delay_ms: u64,
    },

    /// A record settled
    RecordFinished {
        /// Index of the record
        index: usize,
        /// Terminal state (success or error)
        state: ImportState,
        /// Failure message when the state is error
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Aggregate counters changed
    ProgressUpdated {
        /// Snapshot taken right after a settle
        progress: ImportProgress,
    },

    /// The run loop exited
    RunFinished {
        /// Final counters for the run
        progress: ImportProgress,
        /// True when the loop exited through cancellation
        cancelled: bool,
    },
}
