//! Result types for extraction output.

use serde::{Deserialize, Serialize};

use crate::selectors::SelectorSet;

/// Fields extracted from one document.
///
/// Each field holds the extracted text or a fallback sentinel; see
/// [`crate::evaluator`] for the sentinel values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Trimmed text of the first title match.
    pub title: String,

    /// Trimmed text of the first date match, not normalized.
    pub date: String,

    /// Non-empty content matches joined by single spaces, truncated to the
    /// content limit. Empty when nothing matched.
    pub content: String,
}

impl ExtractionResult {
    /// Whether the title lookup fell back to a sentinel.
    #[must_use]
    pub fn title_found(&self) -> bool {
        self.title != crate::evaluator::TITLE_NOT_FOUND
            && self.title != crate::evaluator::EXTRACTION_FAILED
    }

    /// Whether the date lookup fell back to a sentinel.
    #[must_use]
    pub fn date_found(&self) -> bool {
        self.date != crate::evaluator::DATE_NOT_FOUND
            && self.date != crate::evaluator::EXTRACTION_FAILED
    }
}

/// Output of a full pipeline run: the selectors the model chose, which an
/// operator may inspect or edit, and what they extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutput {
    pub selectors: SelectorSet,
    pub result: ExtractionResult,
}
