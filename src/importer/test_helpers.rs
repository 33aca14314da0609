//! Shared test helpers for exercising the importer against a scripted submitter.

use crate::config::{ImporterConfig, RetryPolicy};
use crate::error::SubmitError;
use crate::importer::BulkImporter;
use crate::submit::RecordSubmitter;
use crate::types::{HasRecordId, ImportEvent, ParsedRecord, ValidationError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Minimal record type for importer tests: a tag to recognize it by and an
/// optional identifier for conflict-message assertions.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct TestRecord {
    pub(crate) tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<Uuid>,
}

impl TestRecord {
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: None,
        }
    }
}

impl HasRecordId for TestRecord {
    fn record_id(&self) -> Option<&Uuid> {
        self.id.as_ref()
    }
}

/// Submitter with scripted per-record failures and full call recording.
///
/// Each submission pops the front of the record's scripted error queue; an
/// empty (or absent) queue means the call succeeds. Calls are recorded in
/// arrival order by tag, and the peak number of simultaneous in-flight
/// submissions is tracked for sequentiality assertions.
pub(crate) struct MockSubmitter {
    failures: Mutex<HashMap<String, VecDeque<SubmitError>>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicU32,
    peak_in_flight: AtomicU32,
    delay: Option<Duration>,
}

impl MockSubmitter {
    pub(crate) fn new() -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicU32::new(0),
            peak_in_flight: AtomicU32::new(0),
            delay: None,
        }
    }

    /// A submitter whose every call takes `delay` before answering
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    /// Script the next `errors.len()` calls for `tag` to fail, in order.
    /// Calls after the queue drains succeed.
    pub(crate) fn script_failures(&self, tag: &str, errors: Vec<SubmitError>) {
        self.failures
            .lock()
            .unwrap()
            .insert(tag.to_string(), errors.into());
    }

    /// Tags of every submission so far, in arrival order
    pub(crate) fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of submissions that were ever in flight at once
    pub(crate) fn peak_in_flight(&self) -> u32 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSubmitter<TestRecord> for MockSubmitter {
    async fn submit(&self, record: &TestRecord) -> Result<Value, SubmitError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().unwrap().push(record.tag.clone());
        let scripted = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&record.tag)
            .and_then(VecDeque::pop_front);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match scripted {
            Some(error) => Err(error),
            None => Ok(json!({ "id": record.tag })),
        }
    }
}

/// A record that passed validation
pub(crate) fn valid_record(index: usize, tag: &str) -> ParsedRecord<TestRecord> {
    ParsedRecord {
        index,
        data: TestRecord::new(tag),
        validation_errors: Vec::new(),
        is_valid: true,
    }
}

/// A record that failed validation and must never reach the submitter
pub(crate) fn invalid_record(index: usize, tag: &str) -> ParsedRecord<TestRecord> {
    ParsedRecord {
        index,
        data: TestRecord::new(tag),
        validation_errors: vec![ValidationError::error("name", "Name is required")],
        is_valid: false,
    }
}

/// Config with millisecond-scale delays so tests finish quickly
pub(crate) fn fast_config() -> ImporterConfig {
    ImporterConfig {
        delay_between_calls: Duration::from_millis(1),
        retry: RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
            jitter: false,
        },
    }
}

/// Importer over `records` wired to a fresh [`MockSubmitter`], using
/// [`fast_config`]. Returns the submitter too so tests can script and
/// inspect it.
pub(crate) fn create_test_importer(
    records: Vec<ParsedRecord<TestRecord>>,
) -> (BulkImporter<TestRecord>, Arc<MockSubmitter>) {
    let submitter = Arc::new(MockSubmitter::new());
    let importer = BulkImporter::new(records, submitter.clone(), fast_config());
    (importer, submitter)
}

/// A scripted transient failure
pub(crate) fn server_error() -> SubmitError {
    SubmitError::Response {
        status: 500,
        message: Some("Internal Server Error".to_string()),
    }
}

/// A scripted permanent rejection
pub(crate) fn bad_request(message: &str) -> SubmitError {
    SubmitError::Response {
        status: 400,
        message: Some(message.to_string()),
    }
}

/// Receive events until `RunFinished` arrives. Panics if no event shows up
/// for five seconds, so a stuck run fails fast instead of hanging the test.
pub(crate) async fn collect_run_events(
    events: &mut tokio::sync::broadcast::Receiver<ImportEvent>,
) -> Vec<ImportEvent> {
    let mut seen = Vec::new();
    loop {
        match tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
            Ok(Ok(event)) => {
                let finished = matches!(event, ImportEvent::RunFinished { .. });
                seen.push(event);
                if finished {
                    return seen;
                }
            }
            Ok(Err(_)) => return seen,
            Err(_) => panic!("timed out waiting for RunFinished, saw: {seen:#?}"),
        }
    }
}

/// Wait for one event matching `predicate`, skipping the rest
pub(crate) async fn wait_for_event(
    events: &mut tokio::sync::broadcast::Receiver<ImportEvent>,
    predicate: impl Fn(&ImportEvent) -> bool,
) -> ImportEvent {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
            Ok(Ok(event)) if predicate(&event) => return event,
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => panic!("event channel closed while waiting: {e}"),
            Err(_) => panic!("timed out waiting for a matching event"),
        }
    }
}
