//! Document registration, listing, and per-document sync.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use clipmark_core::{
    CreateSegmentRequest, MarkerRange, RegisterDocumentRequest,
};
use clipmark_provider::marker_name;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::responses::success;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// List the caller's documents.
pub async fn list_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state
        .db
        .documents
        .list(auth.user_id, query.include_inactive)
        .await?;
    Ok(success(documents))
}

/// Register a document by provider file id.
///
/// When no title is supplied, the live document is fetched so the stored
/// title matches the provider's.
pub async fn register_document(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(req): axum::Json<RegisterDocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.provider_file_id.trim().is_empty() {
        return Err(ApiError::BadRequest("provider_file_id is required".to_string()));
    }

    let (title, last_modified_at) = match req.title {
        Some(title) => (title, None),
        None => {
            let credential = state.credentials.resolve(auth.user_id).await?;
            let snapshot = state
                .provider
                .fetch_snapshot(&credential, &req.provider_file_id)
                .await?;
            (snapshot.title, snapshot.last_modified_at)
        }
    };

    let document = state
        .db
        .documents
        .register(
            auth.user_id,
            req.provider_file_id.trim(),
            &title,
            req.folder_id.as_deref(),
            last_modified_at,
        )
        .await?;
    Ok(success(document))
}

/// Fetch one document.
pub async fn get_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.db.documents.get(auth.user_id, id).await?;
    Ok(success(document))
}

/// Hard-delete a document. Its segments cascade.
pub async fn delete_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.documents.hard_delete(auth.user_id, id).await?;
    Ok(success(serde_json::json!({ "deleted": true })))
}

/// Trigger reconciliation for one document.
pub async fn sync_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.sync.sync_document(auth.user_id, id).await?;
    Ok(success(result))
}

/// Capture flow: register a document and create its first segment from a
/// text selection in one call.
#[derive(Debug, Deserialize)]
pub struct FromSelectionRequest {
    pub provider_file_id: String,
    pub title: Option<String>,
    pub category_id: Uuid,
    pub start_offset: i32,
    pub end_offset: i32,
    pub content: String,
    pub segment_title: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

pub async fn from_selection(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(req): axum::Json<FromSelectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let credential = state.credentials.resolve(auth.user_id).await?;

    let title = match &req.title {
        Some(title) => title.clone(),
        None => {
            state
                .provider
                .fetch_snapshot(&credential, &req.provider_file_id)
                .await?
                .title
        }
    };

    let document = state
        .db
        .documents
        .register(auth.user_id, req.provider_file_id.trim(), &title, None, None)
        .await?;

    let segment = state
        .db
        .segments
        .create(
            auth.user_id,
            CreateSegmentRequest {
                document_id: document.id,
                category_id: req.category_id,
                start_offset: req.start_offset,
                end_offset: req.end_offset,
                content: req.content,
                title: req.segment_title,
                tag_ids: req.tag_ids,
            },
        )
        .await?;

    // The segment exists locally either way; a marker failure surfaces as
    // an orphan at the next sync rather than failing the capture.
    if let Err(err) = state
        .provider
        .create_marker(
            &credential,
            &document.provider_file_id,
            segment.segment.id,
            MarkerRange {
                start: segment.segment.start_offset,
                end: segment.segment.end_offset,
            },
        )
        .await
    {
        warn!(
            subsystem = "api",
            component = "documents",
            op = "from_selection",
            segment_id = %segment.segment.id,
            marker = %marker_name(segment.segment.id),
            error = %err,
            "Failed to create provider marker"
        );
    }

    Ok(success(serde_json::json!({
        "document": document,
        "segment": segment,
    })))
}
