//! Tag CRUD, autocomplete, and bulk creation.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clipmark_core::{Tag, TagType};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::responses::success;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub segment_count: i64,
}

/// List the caller's tags with segment counts.
pub async fn list_tags(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let tags = state.db.tags.list(auth.user_id).await?;
    let tags: Vec<TagWithCount> = tags
        .into_iter()
        .map(|(tag, segment_count)| TagWithCount { tag, segment_count })
        .collect();
    Ok(success(tags))
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub tag_type: Option<TagType>,
}

/// Create a tag.
pub async fn create_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(req): axum::Json<CreateTagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state
        .db
        .tags
        .create(auth.user_id, &req.name, req.tag_type)
        .await?;
    Ok(success(tag))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    /// Replaces the classification; omit or null to clear it.
    pub tag_type: Option<TagType>,
}

/// Update a tag. The type classification is replaced wholesale.
pub async fn update_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    axum::Json(req): axum::Json<UpdateTagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state
        .db
        .tags
        .update(auth.user_id, id, req.name.as_deref(), Some(req.tag_type))
        .await?;
    Ok(success(tag))
}

/// Delete a tag. Segment attachments cascade; segments survive.
pub async fn delete_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.tags.delete(auth.user_id, id).await?;
    Ok(success(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    pub q: String,
    pub limit: Option<i64>,
}

/// Prefix autocomplete.
pub async fn autocomplete(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<AutocompleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = state
        .db
        .tags
        .autocomplete(auth.user_id, &query.q, query.limit.unwrap_or(10))
        .await?;
    Ok(success(tags))
}

#[derive(Debug, Deserialize)]
pub struct BulkTagsRequest {
    pub names: Vec<String>,
}

/// Create any missing tags from a list of names.
pub async fn bulk_create(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(req): axum::Json<BulkTagsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.names.is_empty() {
        return Err(ApiError::BadRequest("names cannot be empty".to_string()));
    }
    let tags = state.db.tags.bulk_create(auth.user_id, &req.names).await?;
    Ok(success(tags))
}
