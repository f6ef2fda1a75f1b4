//! # rs-xpath-extract
//!
//! Extracts the title, publication date and body of news article pages by
//! asking a language model for page-specific XPath locators, then applying
//! them to the original HTML.
//!
//! Three stages run in order for each document:
//!
//! 1. [`reduce`] strips scripts, styles, page chrome and comments and bounds
//!    the markup to 12,000 characters.
//! 2. [`SelectorInference`] sends the reduced markup to the model once and
//!    validates the four-field [`SelectorSet`] it returns.
//! 3. [`evaluate`] runs the locators against the unreduced document. Misses
//!    and broken locators produce fallback text, never errors.
//!
//! ## Quick Start
//!
//! ```rust
//! use rs_xpath_extract::{evaluate, RawDocument, SelectorSet};
//!
//! let raw = RawDocument::new(
//!     r#"<html><body><h1>Vaccine Update</h1><span class="date">2024-05-01</span>
//!     <p>Para one.</p><p>Para two.</p></body></html>"#,
//! );
//! let selectors = SelectorSet::new("//h1", "//span[@class='date']", "YYYY-MM-DD", "//p")?;
//!
//! let result = evaluate(&raw, &selectors, 2_000);
//! assert_eq!(result.title, "Vaccine Update");
//! assert_eq!(result.date, "2024-05-01");
//! assert_eq!(result.content, "Para one. Para two.");
//! # Ok::<(), rs_xpath_extract::Error>(())
//! ```
//!
//! With a model, [`Pipeline::run`] chains all three stages:
//!
//! ```rust
//! use rs_xpath_extract::inference::MockProvider;
//! use rs_xpath_extract::{ApiCredential, Options, Pipeline, RawDocument};
//!
//! let provider = MockProvider::new(
//!     r#"{"title_selector":"//h1","date_selector":"//time","date_format_pattern":"ISO 8601","content_selector":"//p"}"#,
//! );
//! let pipeline = Pipeline::with_provider(provider, &Options::default());
//! let key = ApiCredential::new("sk-test")?;
//!
//! let output = pipeline.run(&RawDocument::new("<h1>Hello</h1><p>World</p>"), &key)?;
//! assert_eq!(output.result.title, "Hello");
//! assert_eq!(output.result.date, "Date not found");
//! # Ok::<(), rs_xpath_extract::Error>(())
//! ```

mod document;
mod error;
mod options;
mod pipeline;
mod result;
mod selectors;

/// DOM operations adapter over `dom_query`.
pub mod dom;

/// Character encoding detection and transcoding.
pub mod encoding;

/// Removal of non-content markup before inference.
pub mod reducer;

/// Model-backed selector inference.
pub mod inference;

/// Trace events around inference calls.
pub mod trace;

/// XPath locator language.
pub mod xpath;

/// Application of selector sets to documents.
pub mod evaluator;

/// Character-based text helpers.
pub mod text;

// Public API - re-exports
pub use document::{list_candidates, ApiCredential, RawDocument, ReducedDocument, PREVIEW_CHARS};
pub use error::{Error, Result};
pub use evaluator::{evaluate, DATE_NOT_FOUND, EXTRACTION_FAILED, TITLE_NOT_FOUND};
pub use inference::{InferenceError, ModelProvider, SelectorInference};
pub use options::{Options, TraceOptions};
pub use pipeline::Pipeline;
pub use reducer::reduce;
pub use result::{ExtractionResult, PipelineOutput};
pub use selectors::SelectorSet;

/// Applies `selectors` to the HTML file at `path` with the default content
/// limit, decoding it from its declared charset.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read.
pub fn evaluate_file(
    path: impl AsRef<std::path::Path>,
    selectors: &SelectorSet,
) -> Result<ExtractionResult> {
    let raw = RawDocument::load(path)?;
    Ok(evaluate(&raw, selectors, evaluator::DEFAULT_CONTENT_LIMIT))
}
