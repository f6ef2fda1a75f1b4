//! Error types for rs-xpath-extract.
//!
//! This module defines the errors that propagate out of the pipeline.
//! Extraction faults are deliberately absent: the locator evaluator turns
//! them into fallback values instead of returning them.

use crate::inference::InferenceError;

/// Error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input could not be reduced (non-textual input).
    #[error("Document reduction failed: {0}")]
    Reduction(String),

    /// The model call failed (transport, authentication or provider error).
    #[error("Selector inference failed: {0}")]
    Inference(#[from] InferenceError),

    /// The model response did not have the shape of a selector set.
    ///
    /// `raw_response` carries the untouched model output for diagnosis.
    #[error("Model response failed schema validation: {reason}")]
    SchemaValidation {
        /// What was wrong with the response.
        reason: String,
        /// The response text as returned by the model.
        raw_response: String,
    },

    /// No API credential was supplied.
    #[error("API credential is missing or empty")]
    MissingCredential,

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading a document or configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the raw model response attached to a schema validation failure.
    #[must_use]
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::SchemaValidation { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
