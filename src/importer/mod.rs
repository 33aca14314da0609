//! Sequential bulk-import orchestration
//!
//! [`BulkImporter`] drives previously mapped and validated records through a
//! caller-supplied [`RecordSubmitter`], strictly one at a time, with
//! classified retries, cooperative cancellation and live per-record status.
//!
//! The handle is cheaply cloneable; every clone shares the same run state,
//! so one task can drive [`import_records`](BulkImporter::import_records)
//! while another polls [`progress`](BulkImporter::progress) or calls
//! [`cancel_import`](BulkImporter::cancel_import).

mod run;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::config::ImporterConfig;
use crate::submit::RecordSubmitter;
use crate::types::{ImportEvent, ImportProgress, ImportStatus, ParsedRecord};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Mutable state of the current (or most recent) run
pub(crate) struct RunState {
    /// Per-index status, replaced (never merged) on every transition
    pub(crate) statuses: RwLock<HashMap<usize, ImportStatus>>,
    /// Aggregate counters, recomputed after every settle
    pub(crate) progress: RwLock<ImportProgress>,
    /// True while a bulk run is active
    pub(crate) importing: AtomicBool,
    /// Cancellation token for the current run; replaced at every run start
    pub(crate) cancel: RwLock<CancellationToken>,
}

impl RunState {
    fn new() -> Self {
        Self {
            statuses: RwLock::new(HashMap::new()),
            progress: RwLock::new(ImportProgress::default()),
            importing: AtomicBool::new(false),
            cancel: RwLock::new(CancellationToken::new()),
        }
    }
}

/// Sequential importer over one batch of mapped records.
///
/// Records are immutable once handed over; all run-scoped mutation happens
/// in the shared [`RunState`]. Cloning the handle never copies records.
pub struct BulkImporter<T> {
    /// Mapped records keyed by their stable index
    pub(crate) records: Arc<HashMap<usize, ParsedRecord<T>>>,
    /// Remote create operation
    pub(crate) submitter: Arc<dyn RecordSubmitter<T>>,
    /// Throttle and retry configuration
    pub(crate) config: Arc<ImporterConfig>,
    /// State shared by every clone of the handle
    pub(crate) run_state: Arc<RunState>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<ImportEvent>,
}

// manual impl: deriving Clone would needlessly require T: Clone
impl<T> Clone for BulkImporter<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            submitter: Arc::clone(&self.submitter),
            config: Arc::clone(&self.config),
            run_state: Arc::clone(&self.run_state),
            event_tx: self.event_tx.clone(),
        }
    }
}

impl<T> BulkImporter<T> {
    /// Create an importer over `records`, submitting through `submitter`.
    ///
    /// Records keep the `index` assigned at mapping time; those indices are
    /// the handles callers pass to
    /// [`import_records`](BulkImporter::import_records).
    pub fn new(
        records: Vec<ParsedRecord<T>>,
        submitter: Arc<dyn RecordSubmitter<T>>,
        config: ImporterConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            records: Arc::new(records.into_iter().map(|r| (r.index, r)).collect()),
            submitter,
            config: Arc::new(config),
            run_state: Arc::new(RunState::new()),
            event_tx,
        }
    }

    /// Look up one mapped record by index
    pub fn record(&self, index: usize) -> Option<&ParsedRecord<T>> {
        self.records.get(&index)
    }

    /// Number of records available for import
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Status of one record index; `None` before the index is first touched
    pub async fn status(&self, index: usize) -> Option<ImportStatus> {
        self.run_state.statuses.read().await.get(&index).cloned()
    }

    /// Snapshot of every tracked status
    pub async fn statuses(&self) -> HashMap<usize, ImportStatus> {
        self.run_state.statuses.read().await.clone()
    }

    /// Aggregate progress of the current or most recent run
    pub async fn progress(&self) -> ImportProgress {
        *self.run_state.progress.read().await
    }

    /// True while a bulk run is active
    pub fn is_importing(&self) -> bool {
        self.run_state.importing.load(Ordering::SeqCst)
    }

    /// Subscribe to run lifecycle events
    ///
    /// Subscribers joining mid-run receive only events emitted after the
    /// subscription. Slow subscribers may observe lagged receives.
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.event_tx.subscribe()
    }

    /// Request cooperative cancellation of the active run.
    ///
    /// An outstanding remote call is never aborted: the run stops before the
    /// next index or the next retry attempt, whichever comes first. Indices
    /// not yet reached stay pending.
    pub async fn cancel_import(&self) {
        tracing::info!("import cancellation requested");
        self.run_state.cancel.read().await.cancel();
    }

    pub(crate) fn emit_event(&self, event: ImportEvent) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}
