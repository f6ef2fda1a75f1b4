//! Reduce, infer, evaluate.

use tracing::info;

use crate::document::{ApiCredential, RawDocument};
use crate::error::Result;
use crate::evaluator;
use crate::inference::{ModelProvider, SelectorInference};
use crate::options::Options;
use crate::reducer;
use crate::result::PipelineOutput;

/// One configured pipeline. Holds no per-document state, so a single
/// instance can process any number of documents.
#[derive(Debug)]
pub struct Pipeline {
    inference: SelectorInference,
    max_reduced_chars: usize,
    content_limit: usize,
}

impl Pipeline {
    /// Builds an OpenAI-backed pipeline from `options`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] for invalid options, or an inference
    /// error if the HTTP client cannot be built.
    pub fn from_options(options: &Options) -> Result<Self> {
        Ok(Self::new(SelectorInference::from_options(options)?, options))
    }

    /// Builds a pipeline over a custom provider, limits taken from `options`.
    /// Trace settings in `options` are not applied.
    #[must_use]
    pub fn with_provider(provider: impl ModelProvider + 'static, options: &Options) -> Self {
        Self::new(SelectorInference::new(provider, &options.model), options)
    }

    /// Builds a pipeline over an already configured client.
    #[must_use]
    pub fn new(inference: SelectorInference, options: &Options) -> Self {
        Self {
            inference,
            max_reduced_chars: options.max_reduced_chars,
            content_limit: options.content_limit,
        }
    }

    /// Runs all three stages on `raw`.
    ///
    /// # Errors
    ///
    /// Reduction, inference and schema validation errors propagate.
    /// Extraction misses and locator faults never do.
    pub fn run(&self, raw: &RawDocument, credential: &ApiCredential) -> Result<PipelineOutput> {
        let reduced = reducer::reduce_with_limit(raw, self.max_reduced_chars)?;
        let selectors = self.inference.infer(&reduced, credential)?;
        let result = evaluator::evaluate(raw, &selectors, self.content_limit);
        info!(
            title_found = result.title_found(),
            date_found = result.date_found(),
            content_chars = result.content.chars().count(),
            "extraction complete"
        );
        Ok(PipelineOutput { selectors, result })
    }

    #[must_use]
    pub fn content_limit(&self) -> usize {
        self.content_limit
    }

    /// See [`SelectorInference::flush_traces`].
    pub fn flush_traces(&self) {
        self.inference.flush_traces();
    }
}
