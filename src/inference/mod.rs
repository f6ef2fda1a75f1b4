//! Selector inference.
//!
//! [`SelectorInference`] turns a reduced document into a validated
//! [`SelectorSet`] with exactly one model call. The transport sits behind
//! [`ModelProvider`] so the client can run against OpenAI or a scripted
//! [`MockProvider`].

mod mock;
mod openai;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::document::{ApiCredential, ReducedDocument};
use crate::error::Result;
use crate::options::Options;
use crate::selectors::SelectorSet;
use crate::trace::{self, TraceCollector, TraceEvent, TraceOutcome};

pub use mock::MockProvider;
pub use openai::OpenAiProvider;

/// Name of the structured-response schema sent with the request.
pub const SCHEMA_NAME: &str = "selector_set";

/// Failures of the model call itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("model call timed out after {0} s")]
    Timeout(u64),

    /// The provider rejected the credential (401/403).
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limited by provider")]
    RateLimited,

    /// Any other non-success status.
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// The response body did not have the chat-completion shape.
    #[error("unexpected response envelope: {0}")]
    InvalidEnvelope(String),

    /// The model declined to answer.
    #[error("model refused: {0}")]
    Refusal(String),

    /// The HTTP client could not be constructed.
    #[error("client setup failed: {0}")]
    Client(String),
}

/// One structured-output request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    /// The single user turn.
    pub prompt: String,
    pub schema_name: String,
    /// JSON schema the response must follow.
    pub schema: Value,
}

/// A generative model behind a request/response call.
///
/// Implementations make one outbound call per `complete` and return the
/// model's message text untouched; validation happens in the caller.
pub trait ModelProvider: Send + Sync {
    /// Sends `request` and returns the raw response text.
    ///
    /// # Errors
    ///
    /// Returns an [`InferenceError`] for transport, authentication or
    /// provider failures.
    fn complete(
        &self,
        request: &ModelRequest,
        credential: &ApiCredential,
    ) -> std::result::Result<String, InferenceError>;
}

/// Builds the instruction embedding `reduced`.
#[must_use]
pub fn build_prompt(reduced: &ReducedDocument) -> String {
    format!(
        "You are a scraping expert. Return valid XPath selectors for title, date, and content \
         from this HTML.\n\
         Respond with a JSON object with exactly these keys:\n\
         - \"title_selector\": XPath matching the article title element\n\
         - \"date_selector\": XPath matching the publication date element\n\
         - \"date_format_pattern\": how the date text is formatted, e.g. YYYY-MM-DD\n\
         - \"content_selector\": XPath matching the element(s) holding the article body, \
         such as its paragraphs\n\n\
         {}",
        reduced.as_str()
    )
}

/// Selector inference client.
pub struct SelectorInference {
    provider: Box<dyn ModelProvider>,
    model: String,
    project: String,
    collector: Option<Arc<dyn TraceCollector>>,
}

impl std::fmt::Debug for SelectorInference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorInference")
            .field("model", &self.model)
            .field("project", &self.project)
            .field("tracing", &self.collector.is_some())
            .finish_non_exhaustive()
    }
}

impl SelectorInference {
    /// Creates a client over `provider` without tracing.
    #[must_use]
    pub fn new(provider: impl ModelProvider + 'static, model: impl Into<String>) -> Self {
        Self {
            provider: Box::new(provider),
            model: model.into(),
            project: String::new(),
            collector: None,
        }
    }

    /// Creates an OpenAI-backed client configured from `options`, tracing
    /// included when `options.trace` is set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] for invalid options, or
    /// [`InferenceError::Client`] if an HTTP client cannot be built.
    pub fn from_options(options: &Options) -> Result<Self> {
        options.validate()?;
        let provider = OpenAiProvider::new(&options.endpoint, options.request_timeout())?;
        let mut inference = Self::new(provider, &options.model);
        if let Some(trace_options) = &options.trace {
            let collector = trace::collector_for(trace_options)
                .map_err(|e| InferenceError::Client(e.to_string()))?;
            inference = inference.with_collector(&trace_options.project, Arc::from(collector));
        }
        Ok(inference)
    }

    /// Attaches a trace collector; events carry `project` as their label.
    #[must_use]
    pub fn with_collector(
        mut self,
        project: impl Into<String>,
        collector: Arc<dyn TraceCollector>,
    ) -> Self {
        self.project = project.into();
        self.collector = Some(collector);
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Waits for trace events still being delivered. No-op without a
    /// collector.
    pub fn flush_traces(&self) {
        if let Some(collector) = &self.collector {
            collector.flush();
        }
    }

    /// Infers the selector set for `reduced`.
    ///
    /// Makes exactly one provider call; there is no retry and no caching.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Inference`] when the call fails,
    /// [`crate::Error::SchemaValidation`] when the response is not a valid
    /// selector set.
    pub fn infer(&self, reduced: &ReducedDocument, credential: &ApiCredential) -> Result<SelectorSet> {
        let request = ModelRequest {
            model: self.model.clone(),
            prompt: build_prompt(reduced),
            schema_name: SCHEMA_NAME.to_string(),
            schema: SelectorSet::json_schema(),
        };

        info!(model = %self.model, prompt_chars = request.prompt.chars().count(), "inferring selectors");
        let started_at = Utc::now();
        let clock = Instant::now();

        let result = self
            .provider
            .complete(&request, credential)
            .map_err(crate::Error::from)
            .and_then(|raw| SelectorSet::from_model_output(&raw));

        if let Some(collector) = &self.collector {
            let outcome = match &result {
                Ok(_) => TraceOutcome::Success,
                Err(e) => TraceOutcome::Failure(e.to_string()),
            };
            collector.record(&TraceEvent {
                name: trace::INFER_EVENT.to_string(),
                project: self.project.clone(),
                model: self.model.clone(),
                started_at,
                elapsed_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
                outcome,
            });
        }

        if let Ok(selectors) = &result {
            debug!(
                title = selectors.title_selector(),
                date = selectors.date_selector(),
                content = selectors.content_selector(),
                "selectors inferred"
            );
        }
        result
    }
}
