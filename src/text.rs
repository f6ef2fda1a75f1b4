//! Character-count helpers shared by the reducer and the evaluator.

/// Returns the prefix of `text` holding at most `max_chars` characters.
///
/// Counts Unicode scalar values, not bytes, so the cut never lands inside a
/// multi-byte character.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Number of characters (Unicode scalar values) in `text`.
#[inline]
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_shorter_than_limit_is_identity() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let text = "déjà vu";
        assert_eq!(truncate_chars(text, 4), "déjà");
        assert_eq!(char_len(truncate_chars(text, 4)), 4);
    }

    #[test]
    fn test_truncate_to_zero() {
        assert_eq!(truncate_chars("anything", 0), "");
    }
}
