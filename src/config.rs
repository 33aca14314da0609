//! Configuration types for the import pipeline

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration accepted by the importer at construction
///
/// Every field has a sensible default, so `ImporterConfig::default()` works
/// out of the box and partial documents deserialize cleanly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImporterConfig {
    /// Pause between consecutive record submissions (default: 150 ms)
    ///
    /// Applied after every settle except the last one of a run. This
    /// throttles the call rate independently of the retry backoff.
    #[serde(default = "default_delay_between_calls", with = "duration_ms_serde")]
    pub delay_between_calls: Duration,

    /// Retry behavior for transient submission failures
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            delay_between_calls: default_delay_between_calls(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Retry configuration for transient submission failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt (default: 3)
    ///
    /// A record is submitted at most `max_retries + 1` times.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry (default: 1 second)
    ///
    /// Doubles on each subsequent retry of the same record.
    #[serde(default = "default_base_delay", with = "duration_ms_serde")]
    pub base_delay: Duration,

    /// Cap applied to the exponential backoff (default: 10 seconds)
    #[serde(default = "default_max_backoff", with = "duration_ms_serde")]
    pub max_backoff: Duration,

    /// Add random jitter to backoff delays (default: false)
    ///
    /// Off by default so consecutive backoffs grow strictly; enable when
    /// many importers share one backend.
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
            jitter: false,
        }
    }
}

fn default_delay_between_calls() -> Duration {
    Duration::from_millis(150)
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(10)
}

// Duration serialization helper (integer milliseconds; the delays here are
// sub-second, so second precision would truncate them)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
