//! Header-based CSV decoding
//!
//! The first record names the fields; every following record becomes one
//! [`RawRow`] keyed by those names. All cell values stay strings. Rows whose
//! cells are all empty after trimming are skipped rather than reported.

use crate::error::{CsvIssue, DecodeError};
use crate::types::{RawRow, RawValue};
use csv::{ErrorKind, ReaderBuilder, StringRecord, Trim};

/// Decode CSV bytes into ordered rows.
///
/// In non-chunked mode every malformed record is collected so the caller can
/// report them all at once. In chunked mode (large inputs) decoding stops at
/// the first malformed record, and `on_progress` sees intermediate 0-100
/// percentages derived from the reader's byte position. A final 100 is
/// emitted on success in both modes.
pub(super) fn decode(
    bytes: &[u8],
    chunked: bool,
    on_progress: &mut impl FnMut(u8),
) -> Result<Vec<RawRow>, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8 {
        message: e.to_string(),
    })?;

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(err) => {
            return Err(DecodeError::Csv {
                issues: vec![issue_for(&err, 1)],
            });
        }
    };

    let total = bytes.len() as u64;
    let mut last_percent = 0u8;
    let mut rows = Vec::new();
    let mut issues = Vec::new();
    let mut record = StringRecord::new();

    loop {
        // read_record instead of the records() iterator so the reader's byte
        // position stays queryable between records
        let line = reader.position().line();
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                if let Some(row) = row_from_record(&headers, &record) {
                    rows.push(row);
                }
            }
            Err(err) => {
                issues.push(issue_for(&err, line));
                if chunked {
                    return Err(DecodeError::Csv { issues });
                }
            }
        }

        if chunked && total > 0 {
            let percent = (reader.position().byte().saturating_mul(100) / total).min(100) as u8;
            if percent > last_percent {
                last_percent = percent;
                on_progress(percent);
            }
        }
    }

    if !issues.is_empty() {
        return Err(DecodeError::Csv { issues });
    }

    if last_percent != 100 {
        on_progress(100);
    }
    Ok(rows)
}

/// Turn one well-formed record into a row, or `None` for all-empty records
fn row_from_record(headers: &StringRecord, record: &StringRecord) -> Option<RawRow> {
    if record.iter().all(str::is_empty) {
        return None;
    }
    let mut row = RawRow::new();
    for (name, value) in headers.iter().zip(record.iter()) {
        if !name.is_empty() {
            row.insert(name, RawValue::String(value.to_string()));
        }
    }
    Some(row)
}

/// Build a located issue from a parser error, preferring the parser's own
/// position over the line observed before the read
fn issue_for(err: &csv::Error, fallback_line: u64) -> CsvIssue {
    let line = err
        .position()
        .map(|pos| pos.line())
        .unwrap_or(fallback_line);
    let message = match err.kind() {
        ErrorKind::UnequalLengths { expected_len, len, .. } => {
            format!("expected {expected_len} fields, found {len}")
        }
        _ => err.to_string(),
    };
    CsvIssue { line, message }
}
