//! Sync endpoints: whole-folder sync, per-document sync, and status.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::responses::success;
use crate::state::AppState;

/// Reconcile every document in the caller's watch folder.
pub async fn full_sync(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.sync.sync_folder(auth.user_id).await?;
    Ok(success(result))
}

/// Reconcile one document by id.
pub async fn sync_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.sync.sync_document(auth.user_id, document_id).await?;
    Ok(success(result))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub limit: Option<i64>,
}

/// Recent sync log entries, newest first.
pub async fn sync_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = state
        .db
        .sync
        .recent_logs(auth.user_id, query.limit.unwrap_or(20))
        .await?;
    Ok(success(logs))
}
