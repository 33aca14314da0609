//! Error types for subimport
//!
//! Three layers mirror the pipeline:
//! - [`Error`] - fatal problems surfaced to the immediate caller (size limit,
//!   unsupported format, decode failures, I/O)
//! - [`DecodeError`] - structural and syntax failures while decoding a file,
//!   each carrying whatever line/column locations the underlying parser gave
//! - [`SubmitError`] - the typed shape of a remote create operation's
//!   rejection; classified into user-facing messages and a retry decision

use crate::types::FileFormat;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for subimport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for subimport
#[derive(Debug, Error)]
pub enum Error {
    /// Input exceeds the decoder's size limit; reported before any parsing
    #[error("file too large: {actual} bytes exceeds the {max} byte limit")]
    FileTooLarge {
        /// Size of the provided input in bytes
        actual: u64,
        /// Configured maximum in bytes
        max: u64,
    },

    /// The file name's extension is not one of csv/json/yaml/yml
    #[error("unsupported file format '{name}': use CSV, JSON, or YAML")]
    UnsupportedFormat {
        /// Name of the rejected file
        name: String,
    },

    /// Decoding failed after format sniffing succeeded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// I/O error while reading an import file from disk
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One malformed CSV location: line number plus parser message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvIssue {
    /// 1-based line number in the input (the header is line 1)
    pub line: u64,
    /// What the parser objected to
    pub message: String,
}

impl std::fmt::Display for CsvIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Structural and syntax failures while decoding a file
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The document is not syntactically valid JSON; the message carries the
    /// parser's line/column location
    #[error("invalid JSON: {message}")]
    JsonSyntax {
        /// Parser-reported reason, including its location text
        message: String,
    },

    /// The document is not syntactically valid YAML
    #[error("invalid YAML: {message}")]
    YamlSyntax {
        /// Parser-reported reason
        message: String,
        /// 1-based line of the mark, when the parser exposed one
        line: Option<usize>,
        /// 1-based column of the mark, when the parser exposed one
        column: Option<usize>,
    },

    /// A JSON/YAML document whose top level is not an array of records
    #[error("{format} input must be a top-level array of records")]
    NotAnArray {
        /// Format that was being decoded
        format: FileFormat,
    },

    /// A JSON/YAML array element that is not a non-null object
    #[error("{format} array element at index {index} is not an object")]
    NonObjectElement {
        /// Format that was being decoded
        format: FileFormat,
        /// Position of the offending element in the top-level array
        index: usize,
    },

    /// One or more malformed CSV rows
    #[error("CSV decode failed with {} malformed row(s)", .issues.len())]
    Csv {
        /// Every malformed location found before decoding stopped
        issues: Vec<CsvIssue>,
    },

    /// The input bytes are not valid UTF-8
    #[error("file is not valid UTF-8: {message}")]
    InvalidUtf8 {
        /// Description of where the encoding broke
        message: String,
    },
}

impl DecodeError {
    /// Flatten this failure into `(line, message)` location pairs.
    ///
    /// CSV failures enumerate every malformed row; YAML carries the parser's
    /// mark when one was exposed; the remaining variants have no line and
    /// yield their display text.
    pub fn locations(&self) -> Vec<(Option<u64>, String)> {
        match self {
            DecodeError::Csv { issues } => issues
                .iter()
                .map(|issue| (Some(issue.line), issue.message.clone()))
                .collect(),
            DecodeError::YamlSyntax { message, line, .. } => {
                vec![(line.map(|l| l as u64), message.clone())]
            }
            other => vec![(None, other.to_string())],
        }
    }
}

/// Typed shape of a remote create operation's rejection.
///
/// This is the library-side rendition of the HTTP-style descriptor importers
/// receive from backends: a server response with a status (and possibly a
/// message), a transport failure with no response at all, or anything else.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The server answered with a non-success status
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Response {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body, when present
        message: Option<String>,
    },

    /// No response arrived (connection failure or timeout)
    #[error("network failure: {}", if *.timeout { "request timed out" } else { "no response received" })]
    Network {
        /// True when the failure was a timeout rather than a dead connection
        timeout: bool,
    },

    /// A rejection that matches none of the known shapes
    #[error("{}", .message.as_deref().unwrap_or("Failed to import record"))]
    Other {
        /// Raw message carried by the rejection, when present
        message: Option<String>,
    },
}

impl SubmitError {
    /// Classify this rejection into the user-facing message recorded in the
    /// record's terminal status.
    ///
    /// `record_id` is the record's own identifier, used to phrase conflict
    /// messages; it comes from the [`HasRecordId`](crate::types::HasRecordId)
    /// seam so the importer never inspects record internals.
    pub fn user_message(&self, record_id: Option<&Uuid>) -> String {
        match self {
            SubmitError::Response { status, message } => {
                let message = message.as_deref();
                match status {
                    400 => format!(
                        "Validation error: {}",
                        message.unwrap_or("Bad request")
                    ),
                    401 => format!(
                        "Authentication error: {}",
                        message.unwrap_or("Unauthorized")
                    ),
                    404 => message.unwrap_or("Not found").to_string(),
                    409 => match record_id {
                        Some(id) => {
                            format!("UUID conflict: Entity with ID {id} already exists")
                        }
                        None => "UUID conflict: entity already exists".to_string(),
                    },
                    429 => "Rate limit exceeded, please try again later".to_string(),
                    500..=599 => format!(
                        "Server error: {}",
                        message.unwrap_or("Internal server error")
                    ),
                    _ => message
                        .unwrap_or("Failed to import record")
                        .to_string(),
                }
            }
            SubmitError::Network { timeout: true } => {
                "Network error: request timed out".to_string()
            }
            SubmitError::Network { timeout: false } => {
                "Network error: no response received".to_string()
            }
            SubmitError::Other { message } => message
                .as_deref()
                .unwrap_or("Failed to import record")
                .to_string(),
        }
    }
}
