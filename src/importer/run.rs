//! The bulk run loop and the per-record attempt machinery

use super::BulkImporter;
use crate::retry::{IsRetryable, retry_delay};
use crate::types::{
    HasRecordId, ImportEvent, ImportProgress, ImportState, ImportStatus, ParsedRecord,
};
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

/// How one record's attempt loop ended
enum AttemptOutcome {
    /// The remote operation accepted the record
    Success,
    /// Settled with a classified, user-facing message
    Failed(String),
    /// Cancelled between attempts; the record never settled
    Cancelled,
}

impl<T> BulkImporter<T>
where
    T: HasRecordId + Send + Sync,
{
    /// Run a bulk import over `indices`, in exactly that order.
    ///
    /// One record is in flight at a time: a later index's first attempt
    /// never begins before the earlier index settles. Invalid records settle
    /// to error without a remote call. After every settle except the last
    /// (or a cancelled run's final one) the loop sleeps the configured
    /// inter-call delay.
    ///
    /// Calling this while a run is active is a silent no-op. The call
    /// returns when the run ends, whether by exhaustion or cancellation;
    /// drive it from a spawned task to keep a UI responsive.
    pub async fn import_records(&self, indices: &[usize]) {
        if self
            .run_state
            .importing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("import_records called while a run is active; ignoring");
            return;
        }

        let total = indices.len();
        tracing::info!(total, "bulk import run starting");

        // fresh token so a cancellation of a previous run cannot leak in
        let cancel = CancellationToken::new();
        *self.run_state.cancel.write().await = cancel.clone();

        {
            let mut statuses = self.run_state.statuses.write().await;
            statuses.clear();
            for &index in indices {
                statuses.insert(index, ImportStatus::pending());
            }
        }
        *self.run_state.progress.write().await = ImportProgress::new(total);

        self.emit_event(ImportEvent::RunStarted { total });

        let mut cancelled = false;
        for (position, &index) in indices.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(index, "run cancelled; unreached records stay pending");
                cancelled = true;
                break;
            }

            if !self.run_record(index, &cancel).await {
                // cancelled between retry attempts; the record is pending again
                cancelled = true;
                break;
            }

            let is_last = position + 1 == indices.len();
            if !is_last && !cancel.is_cancelled() {
                tokio::time::sleep(self.config.delay_between_calls).await;
            }
        }

        self.run_state.importing.store(false, Ordering::SeqCst);
        let progress = *self.run_state.progress.read().await;
        tracing::info!(
            completed = progress.completed,
            failed = progress.failed,
            total = progress.total,
            cancelled,
            "bulk import run finished"
        );
        self.emit_event(ImportEvent::RunFinished {
            progress,
            cancelled,
        });
    }

    /// Re-run submission for a single already-settled index.
    ///
    /// The record's previous contribution to the counters is removed before
    /// it settles again, so a failed record that now succeeds moves one
    /// count from failed to completed. Other indices are never touched.
    /// Validation is not re-checked.
    ///
    /// Must not be called while a bulk run is active; that exclusion is the
    /// caller's responsibility.
    pub async fn retry_record(&self, index: usize) {
        let Some(record) = self.records.get(&index) else {
            tracing::warn!(index, "retry requested for an unknown index; ignoring");
            return;
        };

        let Some(previous) = self.status(index).await else {
            tracing::warn!(index, "retry requested before any run touched the record; ignoring");
            return;
        };
        if !previous.state.is_terminal() {
            tracing::warn!(
                index,
                state = ?previous.state,
                "retry requested for an unsettled record; ignoring"
            );
            return;
        }

        tracing::info!(index, "retrying record");

        // remove the previous settle's contribution so this one counts once
        {
            let mut progress = self.run_state.progress.write().await;
            match previous.state {
                ImportState::Success => {
                    progress.completed = progress.completed.saturating_sub(1);
                }
                ImportState::Error => progress.failed = progress.failed.saturating_sub(1),
                _ => {}
            }
            progress.recalculate();
        }

        // fresh token so an old run's cancellation cannot leak into the retry
        let cancel = CancellationToken::new();
        *self.run_state.cancel.write().await = cancel.clone();

        self.mark_importing(index).await;
        match self.attempt_submission(index, record, &cancel).await {
            AttemptOutcome::Success => self.settle_success(index).await,
            AttemptOutcome::Failed(message) => self.settle_error(index, message).await,
            AttemptOutcome::Cancelled => {
                self.run_state
                    .statuses
                    .write()
                    .await
                    .insert(index, ImportStatus::pending());
            }
        }
    }

    /// Drive one index to a settle. Returns false when cancellation struck
    /// between attempts, leaving the record pending and the run cut short.
    async fn run_record(&self, index: usize, cancel: &CancellationToken) -> bool {
        let Some(record) = self.records.get(&index) else {
            tracing::warn!(index, "no record at this index; settling as failed");
            self.settle_error(index, "Record not found".to_string()).await;
            return true;
        };

        if !record.is_valid {
            tracing::debug!(
                index,
                errors = record.validation_errors.len(),
                "record failed validation; skipping submission"
            );
            self.settle_error(index, "Record has validation errors".to_string())
                .await;
            return true;
        }

        self.mark_importing(index).await;
        match self.attempt_submission(index, record, cancel).await {
            AttemptOutcome::Success => {
                self.settle_success(index).await;
                true
            }
            AttemptOutcome::Failed(message) => {
                self.settle_error(index, message).await;
                true
            }
            AttemptOutcome::Cancelled => {
                self.run_state
                    .statuses
                    .write()
                    .await
                    .insert(index, ImportStatus::pending());
                false
            }
        }
    }

    /// The per-record attempt loop: up to `max_retries + 1` submissions with
    /// capped exponential backoff between them.
    ///
    /// Cancellation is sampled once per retry, after the backoff and before
    /// the new attempt; an in-flight submission is never aborted.
    async fn attempt_submission(
        &self,
        index: usize,
        record: &ParsedRecord<T>,
        cancel: &CancellationToken,
    ) -> AttemptOutcome {
        let policy = &self.config.retry;
        let mut last_error = None;

        for attempt in 0..=policy.max_retries {
            if attempt > 0 && cancel.is_cancelled() {
                tracing::info!(index, "cancelled before retry attempt");
                return AttemptOutcome::Cancelled;
            }

            let error = match self.submitter.submit(&record.data).await {
                Ok(_) => {
                    if attempt > 0 {
                        tracing::info!(
                            index,
                            attempts = attempt + 1,
                            "submission succeeded after retry"
                        );
                    }
                    return AttemptOutcome::Success;
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                let message = error.user_message(record.data.record_id());
                tracing::error!(error = %error, index, "submission rejected permanently");
                return AttemptOutcome::Failed(message);
            }

            if attempt < policy.max_retries {
                let delay = retry_delay(policy, attempt);
                let delay_ms = delay.as_millis() as u64;
                tracing::warn!(
                    error = %error,
                    index,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms,
                    "submission failed, retrying"
                );
                self.emit_event(ImportEvent::RecordRetrying {
                    index,
                    attempt: attempt + 1,
                    delay_ms,
                });
                tokio::time::sleep(delay).await;
            }

            last_error = Some(error);
        }

        // every attempt failed retryably and the budget is spent
        let message = last_error
            .map(|e| e.user_message(record.data.record_id()))
            .unwrap_or_else(|| "Failed to import record".to_string());
        tracing::error!(
            index,
            attempts = policy.max_retries + 1,
            "submission failed after exhausting retries"
        );
        AttemptOutcome::Failed(message)
    }

    async fn mark_importing(&self, index: usize) {
        self.run_state
            .statuses
            .write()
            .await
            .insert(index, ImportStatus::importing());
        self.emit_event(ImportEvent::RecordStarted { index });
    }

    async fn settle_success(&self, index: usize) {
        self.run_state
            .statuses
            .write()
            .await
            .insert(index, ImportStatus::success());
        let progress = {
            let mut progress = self.run_state.progress.write().await;
            progress.completed += 1;
            progress.recalculate();
            *progress
        };
        tracing::debug!(index, "record imported");
        self.emit_event(ImportEvent::RecordFinished {
            index,
            state: ImportState::Success,
            error: None,
        });
        self.emit_event(ImportEvent::ProgressUpdated { progress });
    }

    async fn settle_error(&self, index: usize, message: String) {
        self.run_state
            .statuses
            .write()
            .await
            .insert(index, ImportStatus::error(message.clone()));
        let progress = {
            let mut progress = self.run_state.progress.write().await;
            progress.failed += 1;
            progress.recalculate();
            *progress
        };
        tracing::debug!(index, error = %message, "record failed");
        self.emit_event(ImportEvent::RecordFinished {
            index,
            state: ImportState::Error,
            error: Some(message),
        });
        self.emit_event(ImportEvent::ProgressUpdated { progress });
    }
}
