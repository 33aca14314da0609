//! Remote submission seam and the bundled HTTP adapter
//!
//! The importer drives any [`RecordSubmitter`]; tests and embedders supply
//! their own. [`HttpSubmitter`] is the batteries-included implementation:
//! one JSON POST per record against a fixed endpoint.

use crate::error::SubmitError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Default per-request timeout for [`HttpSubmitter`]
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Asynchronous create operation for one mapped record.
///
/// Implementations return the remote side's success payload, or a
/// [`SubmitError`] describing the rejection. The importer classifies the
/// error into a user-facing message and a retry decision; implementations
/// should not retry internally.
#[async_trait]
pub trait RecordSubmitter<T>: Send + Sync {
    /// Submit one record for creation
    async fn submit(&self, record: &T) -> Result<Value, SubmitError>;
}

/// Submits drafts as JSON POST requests to a single endpoint
#[derive(Clone, Debug)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    endpoint: Url,
    auth_header: Option<String>,
    timeout: Duration,
}

impl HttpSubmitter {
    /// Adapter posting to `endpoint` with the default timeout and no auth
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            auth_header: None,
            timeout: DEFAULT_SUBMIT_TIMEOUT,
        }
    }

    /// Send this value as the `Authorization` header on every request
    pub fn with_auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = Some(header.into());
        self
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl<T: Serialize + Send + Sync> RecordSubmitter<T> for HttpSubmitter {
    async fn submit(&self, record: &T) -> Result<Value, SubmitError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(record)
            .timeout(self.timeout);
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            // surface the body's top-level message when the server sent one
            let message = response.json::<Value>().await.ok().and_then(|body| {
                body.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
            return Err(SubmitError::Response {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Value>().await.unwrap_or(Value::Null))
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SubmitError::Network { timeout: true }
        } else if err.is_connect() {
            SubmitError::Network { timeout: false }
        } else if let Some(status) = err.status() {
            SubmitError::Response {
                status: status.as_u16(),
                message: None,
            }
        } else {
            SubmitError::Other {
                message: Some(err.to_string()),
            }
        }
    }
}
