//! File decoding: named byte blobs in, ordered raw rows out
//!
//! Split into focused submodules:
//! - `csv` - header-based CSV decoding with incremental progress
//! - `json` - top-level-array JSON decoding
//! - `yaml` - top-level-sequence YAML decoding
//!
//! The decoder owns format sniffing and the size limit; each submodule owns
//! one format's structural rules.

mod csv;
mod json;
mod yaml;

use crate::error::{Error, Result};
use crate::types::{FileFormat, RawRow};
use std::path::Path;

/// Hard cap on input size: anything larger is rejected before parsing
pub const MAX_IMPORT_SIZE: usize = 10 * 1024 * 1024;

/// Inputs at or above this size are decoded incrementally with progress
pub const CHUNKED_DECODE_THRESHOLD: usize = 5 * 1024 * 1024;

/// A named byte blob handed to the decoder
///
/// Only the name's extension and the byte content are ever consulted.
#[derive(Clone, Debug)]
pub struct ImportFile {
    /// File name, used for format sniffing
    pub name: String,
    /// Raw content
    pub bytes: Vec<u8>,
}

impl ImportFile {
    /// Create an import file from a name and its content
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an import file from disk, deriving the name from the path
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { name, bytes })
    }

    /// Size of the content in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the content is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Format-sniffing decoder for CSV/JSON/YAML import files
#[derive(Clone, Debug)]
pub struct FileDecoder {
    max_size: usize,
    chunk_threshold: usize,
}

impl Default for FileDecoder {
    fn default() -> Self {
        Self {
            max_size: MAX_IMPORT_SIZE,
            chunk_threshold: CHUNKED_DECODE_THRESHOLD,
        }
    }
}

impl FileDecoder {
    /// Decoder with the standard limits (10 MiB cap, 5 MiB chunk threshold)
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder with custom limits; `chunk_threshold` above `max_size`
    /// effectively disables incremental decoding
    pub fn with_limits(max_size: usize, chunk_threshold: usize) -> Self {
        Self {
            max_size,
            chunk_threshold,
        }
    }

    /// Sniff the format from the file name and decode the content.
    ///
    /// Fails fast on oversized input (before any parsing) and on unknown
    /// extensions (before touching the bytes). Structural problems surface
    /// as [`DecodeError`](crate::error::DecodeError) values carrying the
    /// locations the underlying parser reported.
    pub fn parse(&self, file: &ImportFile) -> Result<Vec<RawRow>> {
        self.parse_with_progress(file, |_| {})
    }

    /// Like [`parse`](Self::parse), reporting progress as 0-100 percentages.
    ///
    /// Progress is purely observational. Small inputs may jump straight to
    /// 100; inputs at or above the chunk threshold report intermediate
    /// percentages as CSV records are consumed. On success the observer
    /// always sees a final 100.
    pub fn parse_with_progress(
        &self,
        file: &ImportFile,
        mut on_progress: impl FnMut(u8),
    ) -> Result<Vec<RawRow>> {
        if file.len() > self.max_size {
            return Err(Error::FileTooLarge {
                actual: file.len() as u64,
                max: self.max_size as u64,
            });
        }

        let format = FileFormat::from_name(&file.name);
        tracing::debug!(name = %file.name, %format, size = file.len(), "decoding import file");

        let rows = match format {
            FileFormat::Csv => {
                let chunked = file.len() >= self.chunk_threshold;
                csv::decode(&file.bytes, chunked, &mut on_progress)?
            }
            FileFormat::Json => {
                let rows = json::decode(&file.bytes)?;
                on_progress(100);
                rows
            }
            FileFormat::Yaml => {
                let rows = yaml::decode(&file.bytes)?;
                on_progress(100);
                rows
            }
            FileFormat::Unknown => {
                return Err(Error::UnsupportedFormat {
                    name: file.name.clone(),
                });
            }
        };

        tracing::debug!(name = %file.name, rows = rows.len(), "import file decoded");
        Ok(rows)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::types::RawValue;

    #[test]
    fn oversized_input_fails_before_parsing() {
        let decoder = FileDecoder::with_limits(100, 50);
        // 101 bytes of garbage that would also fail any parser; the size
        // check must win because it runs first
        let file = ImportFile::new("big.json", vec![b'{'; 101]);

        match decoder.parse(&file) {
            Err(Error::FileTooLarge { actual, max }) => {
                assert_eq!(actual, 101);
                assert_eq!(max, 100);
            }
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn input_at_the_limit_is_accepted() {
        let decoder = FileDecoder::with_limits(2, 100);
        let file = ImportFile::new("ok.json", "[]");
        assert!(decoder.parse(&file).unwrap().is_empty());
    }

    #[test]
    fn unknown_extension_is_rejected_without_decoding() {
        let decoder = FileDecoder::new();
        // content is valid JSON; the extension alone must sink it
        let file = ImportFile::new("records.xlsx", "[{\"name\": \"x\"}]");

        match decoder.parse(&file) {
            Err(Error::UnsupportedFormat { name }) => assert_eq!(name, "records.xlsx"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn dispatches_by_extension() {
        let decoder = FileDecoder::new();

        let csv = ImportFile::new("labels.csv", "name,color\nGym,#FF0000\n");
        let json = ImportFile::new("labels.json", r#"[{"name": "Gym"}]"#);
        let yaml = ImportFile::new("labels.yml", "- name: Gym\n");

        assert_eq!(decoder.parse(&csv).unwrap().len(), 1);
        assert_eq!(decoder.parse(&json).unwrap().len(), 1);
        assert_eq!(decoder.parse(&yaml).unwrap().len(), 1);
    }

    #[test]
    fn progress_reaches_100_for_every_format() {
        let decoder = FileDecoder::new();
        for (name, content) in [
            ("a.csv", "name\nGym\n"),
            ("a.json", r#"[{"name": "Gym"}]"#),
            ("a.yaml", "- name: Gym\n"),
        ] {
            let mut last = 0u8;
            decoder
                .parse_with_progress(&ImportFile::new(name, content), |p| last = p)
                .unwrap();
            assert_eq!(last, 100, "{name} should finish at 100");
        }
    }

    #[test]
    fn chunked_csv_reports_intermediate_progress() {
        // Tiny threshold so a small file takes the incremental path
        let decoder = FileDecoder::with_limits(10_000, 16);
        let mut content = String::from("name,color\n");
        for i in 0..50 {
            content.push_str(&format!("label-{i},#00FF0{}\n", i % 10));
        }

        let mut seen = Vec::new();
        let rows = decoder
            .parse_with_progress(&ImportFile::new("big.csv", content), |p| seen.push(p))
            .unwrap();

        assert_eq!(rows.len(), 50);
        assert!(seen.len() > 2, "expected intermediate updates, got {seen:?}");
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "not monotonic: {seen:?}");
        assert_eq!(*seen.last().unwrap(), 100);
    }

    #[test]
    fn chunked_csv_aborts_on_first_malformed_row() {
        let decoder = FileDecoder::with_limits(10_000, 8);
        let content = "name,color\nGym,#FF0000\nonlyonefield\nSpa,#00FF00\n";

        match decoder.parse(&ImportFile::new("bad.csv", content)) {
            Err(Error::Decode(DecodeError::Csv { issues })) => {
                assert_eq!(issues.len(), 1, "chunked decode stops at the first issue");
                assert_eq!(issues[0].line, 3);
            }
            other => panic!("expected CSV decode failure, got {other:?}"),
        }
    }

    #[test]
    fn decoded_rows_preserve_file_order() {
        let decoder = FileDecoder::new();
        let file = ImportFile::new("ordered.csv", "name\nfirst\nsecond\nthird\n");
        let rows = decoder.parse(&file).unwrap();

        let names: Vec<_> = rows
            .iter()
            .map(|r| r.get("name").and_then(RawValue::as_str).unwrap().to_string())
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn import_file_load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("providers.json");
        tokio::fs::write(&path, r#"[{"name": "Netflix"}]"#)
            .await
            .unwrap();

        let file = ImportFile::load(&path).await.unwrap();
        assert_eq!(file.name, "providers.json");
        assert_eq!(FileDecoder::new().parse(&file).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn import_file_load_propagates_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.csv");
        assert!(matches!(ImportFile::load(&missing).await, Err(Error::Io(_))));
    }
}
