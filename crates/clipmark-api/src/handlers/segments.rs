//! Segment CRUD, marker updates, tagging, and associations.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use clipmark_core::{
    AssociateRequest, CreateSegmentRequest, MarkerRange, UpdateMarkersRequest,
    UpdateSegmentRequest,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::responses::success;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListSegmentsQuery {
    pub document_id: Uuid,
}

/// List a document's segments in offset order.
pub async fn list_segments(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListSegmentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // The document lookup doubles as the ownership check.
    state.db.documents.get(auth.user_id, query.document_id).await?;
    let segments = state
        .db
        .segments
        .list_for_document(auth.user_id, query.document_id)
        .await?;
    Ok(success(segments))
}

/// Capture a new segment and mark it in the live document.
pub async fn create_segment(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(req): axum::Json<CreateSegmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.db.documents.get(auth.user_id, req.document_id).await?;
    let detail = state.db.segments.create(auth.user_id, req).await?;

    // Marker failure leaves an orphan for the next sync, not a failed
    // capture.
    match state.credentials.resolve(auth.user_id).await {
        Ok(credential) => {
            if let Err(err) = state
                .provider
                .create_marker(
                    &credential,
                    &document.provider_file_id,
                    detail.segment.id,
                    MarkerRange {
                        start: detail.segment.start_offset,
                        end: detail.segment.end_offset,
                    },
                )
                .await
            {
                warn!(
                    subsystem = "api",
                    component = "segments",
                    op = "create",
                    segment_id = %detail.segment.id,
                    error = %err,
                    "Failed to create provider marker"
                );
            }
        }
        Err(err) => warn!(
            subsystem = "api",
            component = "segments",
            op = "create",
            error = %err,
            "No provider credential; segment created without marker"
        ),
    }

    Ok(success(detail))
}

/// Fetch one segment with tags and association count.
pub async fn get_segment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.db.segments.get(auth.user_id, id).await?;
    Ok(success(detail))
}

/// Update segment fields.
pub async fn update_segment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    axum::Json(req): axum::Json<UpdateSegmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let segment = state.db.segments.update(auth.user_id, id, req).await?;
    Ok(success(segment))
}

#[derive(Debug, Deserialize)]
pub struct DeleteSegmentQuery {
    #[serde(default)]
    pub cascade_associations: bool,
}

/// Delete a segment; optionally cascade to association-created children.
pub async fn delete_segment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteSegmentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.db.segments.get(auth.user_id, id).await?;
    let document = state
        .db
        .documents
        .get(auth.user_id, detail.segment.document_id)
        .await?;

    state
        .db
        .segments
        .delete(auth.user_id, id, query.cascade_associations)
        .await?;

    // Best-effort marker cleanup in the live document.
    if let Ok(credential) = state.credentials.resolve(auth.user_id).await {
        if let Err(err) = state
            .provider
            .delete_marker(&credential, &document.provider_file_id, id)
            .await
        {
            warn!(
                subsystem = "api",
                component = "segments",
                op = "delete",
                segment_id = %id,
                error = %err,
                "Failed to delete provider marker"
            );
        }
    }

    Ok(success(serde_json::json!({ "deleted": true })))
}

/// Repair a segment's marker: new offsets plus re-sliced text, and the
/// named range recreated in the live document.
pub async fn update_markers(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    axum::Json(req): axum::Json<UpdateMarkersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let segment = state.db.segments.update_markers(auth.user_id, id, req).await?;
    let document = state
        .db
        .documents
        .get(auth.user_id, segment.document_id)
        .await?;

    if let Ok(credential) = state.credentials.resolve(auth.user_id).await {
        let replaced = async {
            state
                .provider
                .delete_marker(&credential, &document.provider_file_id, id)
                .await?;
            state
                .provider
                .create_marker(
                    &credential,
                    &document.provider_file_id,
                    id,
                    MarkerRange {
                        start: segment.start_offset,
                        end: segment.end_offset,
                    },
                )
                .await
        }
        .await;
        if let Err(err) = replaced {
            warn!(
                subsystem = "api",
                component = "segments",
                op = "update_markers",
                segment_id = %id,
                error = %err,
                "Failed to recreate provider marker"
            );
        }
    }

    state
        .db
        .sync
        .append_log(
            auth.user_id,
            clipmark_core::SyncAction::MarkerRepair,
            clipmark_core::SyncStatus::Success,
            serde_json::json!({
                "segment_id": id,
                "start_offset": segment.start_offset,
                "end_offset": segment.end_offset,
            }),
        )
        .await?;

    Ok(success(segment))
}

#[derive(Debug, Deserialize)]
pub struct ReplaceTagsRequest {
    pub tag_ids: Vec<Uuid>,
}

/// Replace the segment's tag set.
pub async fn replace_tags(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    axum::Json(req): axum::Json<ReplaceTagsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = state
        .db
        .segments
        .replace_tags(auth.user_id, id, &req.tag_ids)
        .await?;
    Ok(success(tags))
}

/// Associate a segment with another (or spawn a derived copy).
pub async fn associate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    axum::Json(req): axum::Json<AssociateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (association, created) = state.db.segments.associate(auth.user_id, id, req).await?;

    // A freshly created copy gets its own marker in its document.
    if let Some(copy) = &created {
        if let Ok(credential) = state.credentials.resolve(auth.user_id).await {
            if let Ok(document) = state
                .db
                .documents
                .get(auth.user_id, copy.document_id)
                .await
            {
                if let Err(err) = state
                    .provider
                    .create_marker(
                        &credential,
                        &document.provider_file_id,
                        copy.id,
                        MarkerRange {
                            start: copy.start_offset,
                            end: copy.end_offset,
                        },
                    )
                    .await
                {
                    warn!(
                        subsystem = "api",
                        component = "segments",
                        op = "associate",
                        segment_id = %copy.id,
                        error = %err,
                        "Failed to create provider marker for copy"
                    );
                }
            }
        }
    }

    Ok(success(serde_json::json!({
        "association": association,
        "created_segment": created,
    })))
}

/// List a segment's associations in both directions.
pub async fn list_associations(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let links = state.db.segments.list_associations(auth.user_id, id).await?;
    Ok(success(links))
}
