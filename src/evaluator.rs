//! Locator evaluation.
//!
//! Applies a [`SelectorSet`] to the original document. Nothing here returns
//! an error: misses become sentinels, and a locator that cannot be compiled
//! or evaluated turns the whole result into the failure form.

use tracing::{debug, warn};

use crate::document::RawDocument;
use crate::dom;
use crate::result::ExtractionResult;
use crate::selectors::SelectorSet;
use crate::text;
use crate::xpath::{DocumentIndex, Node, XPath, XPathError};

/// Title when the title locator matches nothing.
pub const TITLE_NOT_FOUND: &str = "Title not found";

/// Date when the date locator matches nothing.
pub const DATE_NOT_FOUND: &str = "Date not found";

/// Title and date when a locator fails to compile or evaluate.
pub const EXTRACTION_FAILED: &str = "Extraction failed";

/// Default maximum length of the content field, in characters.
pub const DEFAULT_CONTENT_LIMIT: usize = 2_000;

/// Extracts title, date and content from `raw` with `selectors`.
///
/// Pure: the same inputs always give the same result.
#[must_use]
pub fn evaluate(raw: &RawDocument, selectors: &SelectorSet, content_limit: usize) -> ExtractionResult {
    let doc = dom::parse(raw.as_str());
    let index = DocumentIndex::new(&doc);

    match try_evaluate(&index, selectors, content_limit) {
        Ok(result) => result,
        Err(e) => {
            warn!("locator evaluation failed: {e}");
            ExtractionResult {
                title: EXTRACTION_FAILED.to_string(),
                date: EXTRACTION_FAILED.to_string(),
                content: e.to_string(),
            }
        }
    }
}

fn try_evaluate(
    index: &DocumentIndex<'_>,
    selectors: &SelectorSet,
    content_limit: usize,
) -> Result<ExtractionResult, XPathError> {
    let title_nodes = select(index, selectors.title_selector())?;
    let date_nodes = select(index, selectors.date_selector())?;
    let content_nodes = select(index, selectors.content_selector())?;
    debug!(
        title_matches = title_nodes.len(),
        date_matches = date_nodes.len(),
        content_matches = content_nodes.len(),
        "locators evaluated"
    );

    Ok(ExtractionResult {
        title: first_text(&title_nodes).unwrap_or_else(|| TITLE_NOT_FOUND.to_string()),
        date: first_text(&date_nodes).unwrap_or_else(|| DATE_NOT_FOUND.to_string()),
        content: joined_text(&content_nodes, content_limit),
    })
}

fn select<'a>(index: &DocumentIndex<'a>, locator: &str) -> Result<Vec<Node<'a>>, XPathError> {
    XPath::compile(locator)?.select_in(index)
}

/// Trimmed text of the first match. A first match with blank text still
/// counts as found.
fn first_text(nodes: &[Node<'_>]) -> Option<String> {
    nodes.first().map(|node| node.text().trim().to_string())
}

fn joined_text(nodes: &[Node<'_>], limit: usize) -> String {
    let joined = nodes
        .iter()
        .map(|node| node.text().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    text::truncate_chars(&joined, limit).to_string()
}
