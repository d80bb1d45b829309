// Output formatting: terminal display of verdicts.

pub mod terminal;

/// Shorten `text` to `max_chars` characters, marking the cut with "...".
///
/// Counts characters, not bytes, so upstream error bodies containing
/// multi-byte text are cut on a valid boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_short_text_untouched() {
        assert_eq!(truncate_chars("timeout", 10), "timeout");
    }

    #[test]
    fn test_truncate_chars_exact_length_untouched() {
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abcd", 3), "abc...");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("ééééé", 2), "éé...");
    }
}
