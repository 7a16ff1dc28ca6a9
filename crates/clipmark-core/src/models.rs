//! Core data models for clipmark.
//!
//! These types are shared across all clipmark crates and represent the
//! core domain entities: users, documents, segments, categories, tags,
//! associations, and the sync/search result shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// USER TYPES
// =============================================================================

/// An authenticated user. All entities are strictly scoped to an owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub google_id: String,
    pub email: String,
    pub display_name: Option<String>,
    /// Drive folder watched by whole-folder sync. None until configured.
    pub watch_folder_id: Option<String>,
    /// Configured palette; None falls back to the default 10-color palette.
    pub palette: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload produced by the OAuth callback.
#[derive(Debug, Clone)]
pub struct UpsertUserRequest {
    pub google_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

// =============================================================================
// DOCUMENT TYPES
// =============================================================================

/// A registered external document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    /// External-provider file id, unique per user.
    pub provider_file_id: String,
    pub title: String,
    pub folder_id: Option<String>,
    /// Soft-delete flag. Inactive documents are skipped by sync and listing.
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for registering a document.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDocumentRequest {
    pub provider_file_id: String,
    pub title: Option<String>,
    pub folder_id: Option<String>,
}

// =============================================================================
// SEGMENT TYPES
// =============================================================================

/// A user-delimited excerpt of a source document.
///
/// Invariant: `end_offset > start_offset`, always.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub category_id: Uuid,
    pub start_offset: i32,
    pub end_offset: i32,
    /// Denormalized text content, re-sliced from the live document on sync.
    pub content: String,
    pub title: Option<String>,
    /// 7-character hex color assigned at creation.
    pub color: String,
    /// False for association-created copies.
    pub is_primary: bool,
    pub word_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Segment {
    /// Display title: stored title or a text-derived default.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(t) if !t.is_empty() => t.clone(),
            _ => crate::text::derive_title(&self.content),
        }
    }
}

/// Request for creating a segment by explicit capture.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSegmentRequest {
    pub document_id: Uuid,
    pub category_id: Uuid,
    pub start_offset: i32,
    pub end_offset: i32,
    pub content: String,
    pub title: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

/// Request for updating segment fields. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSegmentRequest {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Request for updating a segment's marker (offsets + re-sliced text).
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMarkersRequest {
    pub start_offset: i32,
    pub end_offset: i32,
    pub content: String,
}

/// Segment with attached tags and association count, for detail responses.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentDetail {
    #[serde(flatten)]
    pub segment: Segment,
    pub tags: Vec<Tag>,
    /// Segments linked to or from this one.
    pub associations_count: i64,
}

/// Validate segment offsets before persistence.
///
/// Rejects `end_offset <= start_offset` and negative starts.
pub fn validate_offsets(start_offset: i32, end_offset: i32) -> crate::Result<()> {
    if start_offset < 0 {
        return Err(crate::Error::InvalidInput(format!(
            "start_offset must be non-negative, got {}",
            start_offset
        )));
    }
    if end_offset <= start_offset {
        return Err(crate::Error::InvalidInput(format!(
            "end_offset ({}) must be greater than start_offset ({})",
            end_offset, start_offset
        )));
    }
    Ok(())
}

// =============================================================================
// CATEGORY TYPES
// =============================================================================

/// A user-scoped segment category. Segment deletion never cascades from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub sort_order: i32,
    /// True for rows seeded at first login.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category with the number of segments referencing it.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub segment_count: i64,
}

/// Request for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
}

/// Request for updating a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
}

// =============================================================================
// TAG TYPES
// =============================================================================

/// Optional tag type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    Subject,
    Technique,
    Theme,
    Status,
}

impl TagType {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Subject => "subject",
            TagType::Technique => "technique",
            TagType::Theme => "theme",
            TagType::Status => "status",
        }
    }

    /// Parse from the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "subject" => Some(TagType::Subject),
            "technique" => Some(TagType::Technique),
            "theme" => Some(TagType::Theme),
            "status" => Some(TagType::Status),
            _ => None,
        }
    }
}

/// A user-scoped tag, many-to-many with segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub tag_type: Option<TagType>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// ASSOCIATION TYPES
// =============================================================================

/// Kind of directed edge between two segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationType {
    Derivative,
    Callback,
    Reference,
    Version,
}

impl AssociationType {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationType::Derivative => "derivative",
            AssociationType::Callback => "callback",
            AssociationType::Reference => "reference",
            AssociationType::Version => "version",
        }
    }

    /// Parse from the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "derivative" => Some(AssociationType::Derivative),
            "callback" => Some(AssociationType::Callback),
            "reference" => Some(AssociationType::Reference),
            "version" => Some(AssociationType::Version),
            _ => None,
        }
    }

    /// Whether associating creates a copy segment at the target site.
    ///
    /// Derivative and callback edges materialize a non-primary copy that
    /// inherits the source's category and color. Reference and version
    /// edges only link existing segments.
    pub fn creates_copy(&self) -> bool {
        matches!(self, AssociationType::Derivative | AssociationType::Callback)
    }
}

/// A directed, typed edge between a source and target segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentAssociation {
    pub id: Uuid,
    pub source_segment_id: Uuid,
    pub target_segment_id: Uuid,
    pub association_type: AssociationType,
    pub created_at: DateTime<Utc>,
}

/// Request to associate a segment with another.
///
/// With `target_segment_id`, only the edge is created. Without it, the
/// association type must be one that creates a copy (derivative or
/// callback); the copy lands in `document_id` (default: the source's
/// document) at the given offsets (default: the source's).
#[derive(Debug, Clone, Deserialize)]
pub struct AssociateRequest {
    pub association_type: AssociationType,
    pub target_segment_id: Option<Uuid>,
    pub document_id: Option<Uuid>,
    pub start_offset: Option<i32>,
    pub end_offset: Option<i32>,
}

/// Edge direction relative to the segment being inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationDirection {
    Outgoing,
    Incoming,
}

/// An association edge plus the segment at its other end.
#[derive(Debug, Clone, Serialize)]
pub struct AssociationLink {
    pub association: SegmentAssociation,
    pub direction: AssociationDirection,
    pub segment: Segment,
}

// =============================================================================
// COLOR USAGE
// =============================================================================

/// Per-user, per-color usage history. Input to color assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorUsage {
    pub user_id: Uuid,
    pub color: String,
    pub last_used_at: DateTime<Utc>,
    pub use_count: i64,
}

// =============================================================================
// SYNC TYPES
// =============================================================================

/// Sync action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    FullSync,
    DocumentSync,
    MarkerRepair,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::FullSync => "full_sync",
            SyncAction::DocumentSync => "document_sync",
            SyncAction::MarkerRepair => "marker_repair",
        }
    }
}

/// Outcome status of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Failed,
    Partial,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
            SyncStatus::Partial => "partial",
        }
    }
}

/// Kind of conflict surfaced by reconciliation for manual resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The segment's named range no longer exists in the live document.
    MarkerMissing,
    /// The document itself became unreachable mid-sync.
    DocumentInaccessible,
}

/// A typed conflict with a human-readable detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConflict {
    pub kind: ConflictKind,
    pub segment_id: Option<Uuid>,
    pub detail: String,
}

/// Result of reconciling a single document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSyncResult {
    pub document_id: Uuid,
    pub status: SyncStatus,
    /// Segments whose text changed (position may also have changed).
    pub updated_segments: usize,
    /// Segments whose position changed but text did not.
    pub repositioned_segments: usize,
    /// Stored segments whose marker is gone. Never deleted by sync.
    pub orphaned_segments: Vec<Uuid>,
    pub conflicts: Vec<SyncConflict>,
}

impl DocumentSyncResult {
    /// A failed result carrying a single document-level conflict.
    pub fn failed(document_id: Uuid, detail: String) -> Self {
        Self {
            document_id,
            status: SyncStatus::Failed,
            updated_segments: 0,
            repositioned_segments: 0,
            orphaned_segments: Vec::new(),
            conflicts: vec![SyncConflict {
                kind: ConflictKind::DocumentInaccessible,
                segment_id: None,
                detail,
            }],
        }
    }
}

/// Per-document error collected during a folder-wide sync.
#[derive(Debug, Clone, Serialize)]
pub struct FolderSyncError {
    pub document_id: Uuid,
    pub provider_file_id: String,
    pub message: String,
}

/// Aggregate result of a whole-folder sync.
#[derive(Debug, Clone, Serialize)]
pub struct FolderSyncResult {
    pub status: SyncStatus,
    pub documents_synced: usize,
    pub documents_added: usize,
    pub documents_removed: usize,
    pub segments_updated: usize,
    pub errors: Vec<FolderSyncError>,
}

/// One row of the append-only sync audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct SyncLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: SyncAction,
    pub status: SyncStatus,
    pub details: JsonValue,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SEARCH TYPES
// =============================================================================

/// AND/OR logic for tag filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagLogic {
    #[default]
    Or,
    And,
}

/// Sort key for search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSort {
    #[default]
    Relevance,
    Created,
    Updated,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Filter set for a search. Every active filter narrows via AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
    #[serde(default)]
    pub tag_logic: TagLogic,
    #[serde(default)]
    pub document_ids: Vec<Uuid>,
    pub is_primary: Option<bool>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

/// A search request: free-text query plus filters, pagination, and sort.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    /// Empty string means "match all, filtered only".
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub filters: SearchFilters,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub sort: SearchSort,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Maximum search page size.
pub const SEARCH_MAX_LIMIT: i64 = 200;

/// Default search page size.
pub const SEARCH_DEFAULT_LIMIT: i64 = 50;

impl SearchRequest {
    /// Clamp limit to [1, 200] (default 50) and offset to >= 0.
    pub fn normalized_page(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(SEARCH_DEFAULT_LIMIT)
            .clamp(1, SEARCH_MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }

    /// Effective sort: relevance without a query degrades to created-desc.
    pub fn effective_sort(&self) -> (SearchSort, SortDirection) {
        if self.sort == SearchSort::Relevance && self.query.trim().is_empty() {
            (SearchSort::Created, SortDirection::Desc)
        } else {
            (self.sort, self.direction)
        }
    }
}

/// A single ranked search hit with denormalized display fields.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub segment: Segment,
    pub category_name: String,
    pub category_icon: Option<String>,
    pub document_title: String,
    pub tags: Vec<Tag>,
    pub associations_count: i64,
    /// Query-relevant highlighted snippet; fixed-length prefix without a query.
    pub snippet: String,
    /// ts_rank score; 0.0 when there is no query.
    pub score: f32,
}

/// Facet count for one value of a dimension.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FacetCount {
    pub id: Uuid,
    pub name: String,
    pub count: i64,
}

/// Complete search response: ranked hits, total, and independent facets.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    /// Total matching rows for the same predicate, independent of paging.
    pub total: i64,
    pub category_facets: Vec<FacetCount>,
    pub tag_facets: Vec<FacetCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_offsets_accepts_valid_range() {
        assert!(validate_offsets(0, 1).is_ok());
        assert!(validate_offsets(10, 250).is_ok());
    }

    #[test]
    fn test_validate_offsets_rejects_equal() {
        assert!(validate_offsets(5, 5).is_err());
    }

    #[test]
    fn test_validate_offsets_rejects_inverted() {
        assert!(validate_offsets(10, 3).is_err());
    }

    #[test]
    fn test_validate_offsets_rejects_negative_start() {
        assert!(validate_offsets(-1, 5).is_err());
    }

    #[test]
    fn test_association_type_roundtrip() {
        for t in [
            AssociationType::Derivative,
            AssociationType::Callback,
            AssociationType::Reference,
            AssociationType::Version,
        ] {
            assert_eq!(AssociationType::parse(t.as_str()), Some(t));
        }
        assert_eq!(AssociationType::parse("unknown"), None);
    }

    #[test]
    fn test_association_copy_semantics() {
        assert!(AssociationType::Derivative.creates_copy());
        assert!(AssociationType::Callback.creates_copy());
        assert!(!AssociationType::Reference.creates_copy());
        assert!(!AssociationType::Version.creates_copy());
    }

    #[test]
    fn test_tag_type_roundtrip() {
        for t in [
            TagType::Subject,
            TagType::Technique,
            TagType::Theme,
            TagType::Status,
        ] {
            assert_eq!(TagType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_normalized_page_defaults() {
        let req = SearchRequest::default();
        assert_eq!(req.normalized_page(), (50, 0));
    }

    #[test]
    fn test_normalized_page_clamps() {
        let req = SearchRequest {
            limit: Some(10_000),
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(req.normalized_page(), (200, 0));

        let req = SearchRequest {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(req.normalized_page().0, 1);
    }

    #[test]
    fn test_relevance_sort_degrades_without_query() {
        let req = SearchRequest {
            query: "   ".to_string(),
            sort: SearchSort::Relevance,
            direction: SortDirection::Asc,
            ..Default::default()
        };
        assert_eq!(
            req.effective_sort(),
            (SearchSort::Created, SortDirection::Desc)
        );
    }

    #[test]
    fn test_relevance_sort_kept_with_query() {
        let req = SearchRequest {
            query: "gas station".to_string(),
            sort: SearchSort::Relevance,
            ..Default::default()
        };
        assert_eq!(req.effective_sort().0, SearchSort::Relevance);
    }

    #[test]
    fn test_explicit_sort_not_degraded() {
        let req = SearchRequest {
            query: String::new(),
            sort: SearchSort::Updated,
            direction: SortDirection::Asc,
            ..Default::default()
        };
        assert_eq!(
            req.effective_sort(),
            (SearchSort::Updated, SortDirection::Asc)
        );
    }
}
