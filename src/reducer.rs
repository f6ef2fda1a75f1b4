//! Document reduction.
//!
//! Strips the elements that never carry article fields and bounds the
//! result so it fits a model prompt.

use tracing::debug;

use crate::document::{RawDocument, ReducedDocument};
use crate::dom;
use crate::error::{Error, Result};
use crate::text;

/// Elements removed before the document is shown to the model.
pub const NOISE_TAGS: [&str; 6] = ["script", "style", "header", "footer", "nav", "aside"];

/// Elements whose content is inert. html5ever parks it in a separate
/// fragment that neither selection nor the comment walk reaches.
pub const INERT_TAGS: [&str; 1] = ["template"];

/// Maximum length of a reduced document, in characters.
pub const MAX_REDUCED_CHARS: usize = 12_000;

/// Reduces `raw` to at most [`MAX_REDUCED_CHARS`] characters.
///
/// # Errors
///
/// Returns [`Error::Reduction`] for non-textual input. Malformed markup is
/// never an error.
pub fn reduce(raw: &RawDocument) -> Result<ReducedDocument> {
    reduce_with_limit(raw, MAX_REDUCED_CHARS)
}

/// Like [`reduce`], truncating to `max_chars` characters instead.
///
/// # Errors
///
/// Returns [`Error::Reduction`] for non-textual input.
pub fn reduce_with_limit(raw: &RawDocument, max_chars: usize) -> Result<ReducedDocument> {
    let html = raw.as_str();
    if html.contains('\0') {
        return Err(Error::Reduction(
            "input contains NUL bytes and is not textual markup".into(),
        ));
    }

    // Parsed into a fresh tree; `raw` is never touched.
    let doc = dom::parse(html);
    dom::remove_tags(&doc, &INERT_TAGS);
    dom::remove_tags(&doc, &NOISE_TAGS);
    dom::remove_comments(&doc);
    let serialized = dom::serialize(&doc);

    let reduced = text::truncate_chars(&serialized, max_chars).to_string();
    debug!(
        raw_chars = text::char_len(html),
        serialized_chars = text::char_len(&serialized),
        reduced_chars = text::char_len(&reduced),
        "document reduced"
    );
    Ok(ReducedDocument::new(reduced))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_noise_and_comments() {
        let raw = RawDocument::new(
            r#"<html><head><style>p{}</style><script>var x;</script></head>
            <body><header>Logo</header><nav>Menu</nav>
            <!-- tracking pixel -->
            <article><h1>Story</h1><p>Body</p></article>
            <aside>Related</aside><footer>(c)</footer></body></html>"#,
        );
        let reduced = reduce(&raw).unwrap();
        let out = reduced.as_str();
        for tag in NOISE_TAGS {
            assert!(!out.contains(&format!("<{tag}")), "{tag} survived: {out}");
        }
        assert!(!out.contains("<!--"));
        assert!(!out.contains("Menu"));
        assert!(out.contains("<h1>Story</h1>"));
        assert!(out.contains("<p>Body</p>"));
    }

    #[test]
    fn test_truncates_by_characters() {
        let body = "é".repeat(20_000);
        let raw = RawDocument::new(format!("<html><body><p>{body}</p></body></html>"));
        let reduced = reduce(&raw).unwrap();
        assert_eq!(reduced.char_len(), MAX_REDUCED_CHARS);

        let short = reduce_with_limit(&raw, 10).unwrap();
        assert_eq!(short.char_len(), 10);
    }

    #[test]
    fn test_malformed_markup_degrades() {
        let raw = RawDocument::new("<div><p>unclosed <b>bold <i>mixed</div></p><<>>");
        let reduced = reduce(&raw).unwrap();
        assert!(reduced.as_str().contains("unclosed"));
    }

    #[test]
    fn test_raw_is_untouched() {
        let html = "<body><script>x()</script><p>a</p></body>";
        let raw = RawDocument::new(html);
        reduce(&raw).unwrap();
        assert_eq!(raw.as_str(), html);
    }

    #[test]
    fn test_template_content_is_dropped() {
        let raw = RawDocument::new(
            "<html><head><template><!-- tpl comment --><style>p{}</style></template></head>\
             <body><template><!-- tpl comment --><script>t()</script><p>in tpl</p></template>\
             <p>visible</p></body></html>",
        );
        let reduced = reduce(&raw).unwrap();
        let out = reduced.as_str();
        assert!(!out.contains("<!--"), "comment survived: {out}");
        assert!(!out.contains("<script"), "script survived: {out}");
        assert!(!out.contains("<style"), "style survived: {out}");
        assert!(!out.contains("<template"));
        assert!(out.contains("<p>visible</p>"));
    }

    #[test]
    fn test_non_textual_input_fails() {
        let raw = RawDocument::new("\u{0}\u{0}PNG\u{0}");
        assert!(matches!(reduce(&raw), Err(Error::Reduction(_))));
    }
}
