//! Charset detection for saved article pages.
//!
//! Pages saved from a browser or fetched by a crawler keep the encoding the
//! site served them in. Before the reducer or the evaluator sees them they
//! are decoded to UTF-8, honouring a byte order mark first and a charset
//! declaration in the document head second.

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::sync::LazyLock;

/// How many leading bytes are scanned for a charset declaration.
const SNIFF_LEN: usize = 1024;

/// Matches both `<meta charset=...>` and
/// `<meta http-equiv="Content-Type" content="...; charset=...">`.
#[allow(clippy::expect_used)]
static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\b[^>]*?\bcharset\s*=\s*["']?\s*([A-Za-z0-9_.:\-]+)"#)
        .expect("META_CHARSET_RE regex")
});

/// Finds the charset label declared in the head of the document, if any.
#[must_use]
pub fn declared_charset(html: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&html[..html.len().min(SNIFF_LEN)]);
    META_CHARSET_RE
        .captures(&head)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Picks the encoding for a document.
///
/// A byte order mark wins over a declaration; unknown labels and missing
/// declarations fall back to UTF-8.
#[must_use]
pub fn sniff_encoding(html: &[u8]) -> &'static Encoding {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(html) {
        return encoding;
    }

    declared_charset(html)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

/// Decodes document bytes to a UTF-8 string.
///
/// Malformed sequences become U+FFFD; decoding never fails.
///
/// # Examples
///
/// ```
/// use rs_xpath_extract::encoding::decode_document;
///
/// let html = b"<html><head><meta charset=\"ISO-8859-1\"></head><body>Caf\xE9</body></html>";
/// assert!(decode_document(html).contains("Café"));
/// ```
#[must_use]
pub fn decode_document(html: &[u8]) -> String {
    let encoding = sniff_encoding(html);
    // decode() strips a matching BOM and replaces invalid sequences.
    let (decoded, _used, _had_errors) = encoding.decode(html);
    decoded.into_owned()
}
