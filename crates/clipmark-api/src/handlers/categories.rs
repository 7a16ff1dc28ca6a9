//! Category CRUD, reorder, and deletion with segment migration.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;

use clipmark_core::{CreateCategoryRequest, UpdateCategoryRequest};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::responses::success;
use crate::state::AppState;

/// List categories in sort order with segment counts.
pub async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.db.categories.list(auth.user_id).await?;
    Ok(success(categories))
}

/// Create a category.
pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(req): axum::Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.db.categories.create(auth.user_id, req).await?;
    Ok(success(category))
}

/// Update a category.
pub async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    axum::Json(req): axum::Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.db.categories.update(auth.user_id, id, req).await?;
    Ok(success(category))
}

#[derive(Debug, Deserialize)]
pub struct DeleteCategoryQuery {
    pub migrate_to: Option<Uuid>,
}

/// Delete a category, migrating its segments when a target is given.
pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteCategoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .categories
        .delete(auth.user_id, id, query.migrate_to)
        .await?;
    Ok(success(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ordered_ids: Vec<Uuid>,
}

/// Reorder all categories in one transaction.
pub async fn reorder_categories(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(req): axum::Json<ReorderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .categories
        .reorder(auth.user_id, &req.ordered_ids)
        .await?;
    let categories = state.db.categories.list(auth.user_id).await?;
    Ok(success(categories))
}
