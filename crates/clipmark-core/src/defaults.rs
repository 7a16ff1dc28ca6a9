//! Default values and constants shared across clipmark crates.

/// Default segment palette: 10 visually distinct hex colors.
///
/// Used when the user has not configured a palette of their own.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#F94144", "#F3722C", "#F9C74F", "#90BE6D", "#43AA8B", "#4D908E", "#577590", "#277DA1",
    "#9B5DE5", "#F15BB5",
];

/// Categories seeded for every new user: (name, icon, sort order).
pub const DEFAULT_CATEGORIES: [(&str, &str, i32); 4] = [
    ("Bit", "mic", 0),
    ("Idea", "bulb", 1),
    ("Story", "book", 2),
    ("Reference", "link", 3),
];

/// Snippet length when no query is present (prefix fallback).
pub const SNIPPET_PREFIX_CHARS: usize = 200;

/// Maximum characters of a derived segment title.
pub const DERIVED_TITLE_CHARS: usize = 60;

/// Session lifetime in hours unless overridden by SESSION_TTL_HOURS.
pub const SESSION_TTL_HOURS: i64 = 24 * 14;

/// Facet lists are capped to the top N values by count.
pub const FACET_LIMIT: i64 = 20;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_palette_is_distinct_hex() {
        let unique: HashSet<_> = DEFAULT_PALETTE.iter().collect();
        assert_eq!(unique.len(), DEFAULT_PALETTE.len());
        for color in DEFAULT_PALETTE {
            assert_eq!(color.len(), 7);
            assert!(color.starts_with('#'));
            assert!(color[1..].chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_default_categories_ordered() {
        let orders: Vec<i32> = DEFAULT_CATEGORIES.iter().map(|(_, _, o)| *o).collect();
        let mut sorted = orders.clone();
        sorted.sort_unstable();
        assert_eq!(orders, sorted);
    }
}
