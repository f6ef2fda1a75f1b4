//! Deterministic provider for tests and offline runs.

use std::sync::{Arc, Mutex};

use super::{InferenceError, ModelProvider, ModelRequest};
use crate::document::ApiCredential;

/// Returns a scripted response and records every request it receives.
///
/// Clones share their call log, so a test can keep one handle and give the
/// other to the client.
///
/// # Example
///
/// ```rust
/// use rs_xpath_extract::inference::{MockProvider, ModelProvider, ModelRequest};
/// use rs_xpath_extract::ApiCredential;
///
/// let provider = MockProvider::new("{}");
/// let request = ModelRequest {
///     model: "gpt-4o".into(),
///     prompt: "hello".into(),
///     schema_name: "s".into(),
///     schema: serde_json::json!({}),
/// };
/// let key = ApiCredential::new("sk-test")?;
/// assert_eq!(provider.complete(&request, &key).unwrap(), "{}");
/// assert_eq!(provider.call_count(), 1);
/// # Ok::<(), rs_xpath_extract::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    response: Result<String, InferenceError>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl MockProvider {
    /// Answers every request with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Ok(response.into()),
            requests: Arc::default(),
        }
    }

    /// Fails every request with `error`.
    #[must_use]
    pub fn failing(error: InferenceError) -> Self {
        Self {
            response: Err(error),
            requests: Arc::default(),
        }
    }

    /// Number of `complete` calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().map_or(0, |requests| requests.len())
    }

    /// The most recent request, if any.
    #[must_use]
    pub fn last_request(&self) -> Option<ModelRequest> {
        self.requests
            .lock()
            .ok()
            .and_then(|requests| requests.last().cloned())
    }

    /// The prompt of the most recent request, if any.
    #[must_use]
    pub fn last_prompt(&self) -> Option<String> {
        self.last_request().map(|request| request.prompt)
    }
}

impl ModelProvider for MockProvider {
    fn complete(
        &self,
        request: &ModelRequest,
        _credential: &ApiCredential,
    ) -> Result<String, InferenceError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.response.clone()
    }
}
