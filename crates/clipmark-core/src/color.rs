//! Color assignment heuristic.
//!
//! Picks a display color for a new segment so that colors within one
//! document stay maximally distinct while cycling fairly across all of a
//! user's documents. The selection itself is pure; the caller loads usage
//! history and records the assignment afterwards (a required side effect).

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Global usage history for one palette color.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageStats {
    pub last_used_at: Option<DateTime<Utc>>,
    pub use_count: i64,
}

/// Select a color for a new segment.
///
/// * `palette`: ordered hex colors (user-configured or the default).
/// * `used_in_document`: colors already used by other segments in the
///   target document.
/// * `usage`: global per-color usage history; colors never recorded are
///   treated as maximally stale and preferred first.
///
/// If the palette has colors unused within the document, the one
/// least-recently used globally wins. Once every palette color appears in
/// the document, degrades to the color with the lowest global use count.
/// Ties break by palette order. Never errors; an empty palette falls back
/// to the first default color.
pub fn select_color(
    palette: &[String],
    used_in_document: &HashSet<String>,
    usage: &HashMap<String, UsageStats>,
) -> String {
    if palette.is_empty() {
        return crate::defaults::DEFAULT_PALETTE[0].to_string();
    }

    let unused: Vec<&String> = palette
        .iter()
        .filter(|c| !used_in_document.contains(*c))
        .collect();

    if !unused.is_empty() {
        // Least-recently-used globally. None sorts before any timestamp,
        // so never-used colors win; min_by_key is stable, so palette order
        // breaks ties.
        return unused
            .into_iter()
            .min_by_key(|c| usage.get(*c).and_then(|s| s.last_used_at))
            .cloned()
            .unwrap_or_else(|| palette[0].clone());
    }

    // Every palette color already appears in the document: reuse is
    // inevitable, degrade to lowest global use count.
    palette
        .iter()
        .min_by_key(|c| usage.get(*c).map(|s| s.use_count).unwrap_or(0))
        .cloned()
        .unwrap_or_else(|| palette[0].clone())
}
