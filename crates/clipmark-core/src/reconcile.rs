//! Reconciliation diff: stored segments vs a live document snapshot.
//!
//! The diff itself is pure. The sync service fetches the snapshot, runs
//! [`diff_segments`], and applies the resulting plan inside one
//! transaction.

use uuid::Uuid;

use crate::models::{ConflictKind, Segment, SyncConflict};
use crate::text::slice_by_chars;
use crate::traits::DocumentSnapshot;

/// How one stored segment compares to its live marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentChange {
    /// Marker present, offsets and text both match.
    Unchanged,
    /// Text differs from the stored copy (offsets may also differ).
    /// Text change takes priority in classification.
    TextChanged {
        start_offset: i32,
        end_offset: i32,
        content: String,
    },
    /// Offsets drifted but the sliced text is identical.
    Repositioned { start_offset: i32, end_offset: i32 },
    /// Named range is gone. The segment is surfaced for manual resolution,
    /// never deleted or mutated.
    Orphaned,
}

/// One segment's reconciliation verdict.
#[derive(Debug, Clone)]
pub struct SegmentDiff {
    pub segment_id: Uuid,
    pub change: SegmentChange,
}

/// Full reconciliation plan for a document.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub diffs: Vec<SegmentDiff>,
    pub updated: usize,
    pub repositioned: usize,
    pub orphaned: Vec<Uuid>,
    pub conflicts: Vec<SyncConflict>,
}

/// Compare every stored segment against the snapshot's named ranges.
pub fn diff_segments(stored: &[Segment], snapshot: &DocumentSnapshot) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for segment in stored {
        let change = match snapshot.ranges.get(&segment.id) {
            None => {
                plan.orphaned.push(segment.id);
                plan.conflicts.push(SyncConflict {
                    kind: ConflictKind::MarkerMissing,
                    segment_id: Some(segment.id),
                    detail: format!(
                        "marker for segment \"{}\" not found in document",
                        segment.display_title()
                    ),
                });
                SegmentChange::Orphaned
            }
            Some(range) => {
                let live_text = slice_by_chars(&snapshot.text, range.start, range.end);
                let text_changed = live_text != segment.content;
                let moved =
                    range.start != segment.start_offset || range.end != segment.end_offset;

                if text_changed {
                    plan.updated += 1;
                    SegmentChange::TextChanged {
                        start_offset: range.start,
                        end_offset: range.end,
                        content: live_text,
                    }
                } else if moved {
                    plan.repositioned += 1;
                    SegmentChange::Repositioned {
                        start_offset: range.start,
                        end_offset: range.end,
                    }
                } else {
                    SegmentChange::Unchanged
                }
            }
        };

        plan.diffs.push(SegmentDiff {
            segment_id: segment.id,
            change,
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MarkerRange;
    use chrono::Utc;
    use std::collections::HashMap;

    fn segment(id: Uuid, start: i32, end: i32, content: &str) -> Segment {
        let now = Utc::now();
        Segment {
            id,
            user_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            start_offset: start,
            end_offset: end,
            content: content.to_string(),
            title: None,
            color: "#F94144".to_string(),
            is_primary: true,
            word_count: content.split_whitespace().count() as i32,
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot(text: &str, ranges: &[(Uuid, i32, i32)]) -> DocumentSnapshot {
        DocumentSnapshot {
            title: "Doc".to_string(),
            text: text.to_string(),
            ranges: ranges
                .iter()
                .map(|(id, s, e)| (*id, MarkerRange { start: *s, end: *e }))
                .collect(),
            last_modified_at: None,
        }
    }

    #[test]
    fn test_unchanged_segment_produces_no_work() {
        let id = Uuid::new_v4();
        let stored = vec![segment(id, 0, 5, "hello")];
        let snap = snapshot("hello world", &[(id, 0, 5)]);

        let plan = diff_segments(&stored, &snap);
        assert_eq!(plan.updated, 0);
        assert_eq!(plan.repositioned, 0);
        assert!(plan.orphaned.is_empty());
        assert_eq!(plan.diffs[0].change, SegmentChange::Unchanged);
    }

    #[test]
    fn test_idempotent_after_applying_plan() {
        // Apply the plan's updates to the stored copy, re-diff: no changes.
        let id = Uuid::new_v4();
        let stored = vec![segment(id, 0, 5, "stale")];
        let snap = snapshot("fresh text here", &[(id, 0, 5)]);

        let plan = diff_segments(&stored, &snap);
        assert_eq!(plan.updated, 1);

        let updated = match &plan.diffs[0].change {
            SegmentChange::TextChanged {
                start_offset,
                end_offset,
                content,
            } => segment(id, *start_offset, *end_offset, content),
            other => panic!("expected TextChanged, got {:?}", other),
        };

        let second = diff_segments(&[updated], &snap);
        assert_eq!(second.updated, 0);
        assert_eq!(second.repositioned, 0);
        assert!(second.orphaned.is_empty());
    }

    #[test]
    fn test_missing_marker_is_orphaned_not_deleted() {
        let id = Uuid::new_v4();
        let stored = vec![segment(id, 0, 5, "hello")];
        let snap = snapshot("hello", &[]);

        let plan = diff_segments(&stored, &snap);
        assert_eq!(plan.orphaned, vec![id]);
        assert_eq!(plan.conflicts.len(), 1);
        assert_eq!(plan.conflicts[0].kind, ConflictKind::MarkerMissing);
        assert_eq!(plan.conflicts[0].segment_id, Some(id));
        // The diff still lists the segment; nothing marks it for deletion.
        assert_eq!(plan.diffs[0].change, SegmentChange::Orphaned);
    }

    #[test]
    fn test_reposition_without_text_change() {
        let id = Uuid::new_v4();
        let stored = vec![segment(id, 0, 5, "hello")];
        // Text inserted before the marker: same content, shifted offsets.
        let snap = snapshot("say: hello world", &[(id, 5, 10)]);

        let plan = diff_segments(&stored, &snap);
        assert_eq!(plan.updated, 0);
        assert_eq!(plan.repositioned, 1);
        assert_eq!(
            plan.diffs[0].change,
            SegmentChange::Repositioned {
                start_offset: 5,
                end_offset: 10
            }
        );
    }

    #[test]
    fn test_text_change_takes_priority_over_reposition() {
        let id = Uuid::new_v4();
        let stored = vec![segment(id, 0, 5, "hello")];
        // Both text and offsets differ: classified as TextChanged only.
        let snap = snapshot("xx howdy yy", &[(id, 3, 8)]);

        let plan = diff_segments(&stored, &snap);
        assert_eq!(plan.updated, 1);
        assert_eq!(plan.repositioned, 0);
        match &plan.diffs[0].change {
            SegmentChange::TextChanged {
                start_offset,
                end_offset,
                content,
            } => {
                assert_eq!((*start_offset, *end_offset), (3, 8));
                assert_eq!(content, "howdy");
            }
            other => panic!("expected TextChanged, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_document() {
        let unchanged = Uuid::new_v4();
        let moved = Uuid::new_v4();
        let edited = Uuid::new_v4();
        let orphan = Uuid::new_v4();

        let stored = vec![
            segment(unchanged, 0, 3, "abc"),
            segment(moved, 4, 7, "def"),
            segment(edited, 8, 11, "ghi"),
            segment(orphan, 12, 15, "jkl"),
        ];
        let snap = snapshot(
            "abc Xdef ZZZ mno",
            &[(unchanged, 0, 3), (moved, 5, 8), (edited, 9, 12)],
        );

        let plan = diff_segments(&stored, &snap);
        assert_eq!(plan.updated, 1);
        assert_eq!(plan.repositioned, 1);
        assert_eq!(plan.orphaned, vec![orphan]);
        assert_eq!(plan.diffs.len(), 4);
    }

    #[test]
    fn test_multibyte_document_text() {
        let id = Uuid::new_v4();
        let stored = vec![segment(id, 0, 4, "日本語だ")];
        let snap = snapshot("前置き 日本語だ", &[(id, 4, 8)]);

        let plan = diff_segments(&stored, &snap);
        assert_eq!(plan.updated, 0);
        assert_eq!(plan.repositioned, 1);
    }
}
