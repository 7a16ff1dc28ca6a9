//! Text helpers: derived titles and offset slicing.

use crate::defaults::DERIVED_TITLE_CHARS;

/// Derive a display title from segment content.
///
/// Takes the first non-empty line, trimmed, truncated on a char boundary.
/// Returns "Untitled" for blank content.
pub fn derive_title(content: &str) -> String {
    let line = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("Untitled");
    line.chars().take(DERIVED_TITLE_CHARS).collect()
}

/// Slice document text by character offsets, clamping to the text length.
///
/// Offsets arriving from the provider are character positions into the
/// document's plain text; byte indexing would split multi-byte characters.
pub fn slice_by_chars(text: &str, start: i32, end: i32) -> String {
    let start = start.max(0) as usize;
    let end = end.max(0) as usize;
    if end <= start {
        return String::new();
    }
    text.chars().skip(start).take(end - start).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_title_first_line() {
        assert_eq!(derive_title("gas station hands\nmore text"), "gas station hands");
    }

    #[test]
    fn test_derive_title_skips_blank_lines() {
        assert_eq!(derive_title("\n\n  opener  \nrest"), "opener");
    }

    #[test]
    fn test_derive_title_empty() {
        assert_eq!(derive_title(""), "Untitled");
        assert_eq!(derive_title("   \n  "), "Untitled");
    }

    #[test]
    fn test_derive_title_truncates() {
        let long = "x".repeat(500);
        assert_eq!(derive_title(&long).chars().count(), 60);
    }

    #[test]
    fn test_slice_by_chars_basic() {
        assert_eq!(slice_by_chars("hello world", 6, 11), "world");
    }

    #[test]
    fn test_slice_by_chars_multibyte() {
        // é and 日 are multi-byte in UTF-8; char offsets must still work.
        assert_eq!(slice_by_chars("café 日本", 5, 7), "日本");
    }

    #[test]
    fn test_slice_by_chars_clamps_past_end() {
        assert_eq!(slice_by_chars("abc", 1, 100), "bc");
    }

    #[test]
    fn test_slice_by_chars_empty_on_inverted_range() {
        assert_eq!(slice_by_chars("abc", 2, 2), "");
        assert_eq!(slice_by_chars("abc", 3, 1), "");
    }
}
