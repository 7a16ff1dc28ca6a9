//! Faceted full-text search endpoint.

use axum::extract::State;
use axum::response::IntoResponse;

use clipmark_core::SearchRequest;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::responses::{success_paginated, PaginationMeta};
use crate::state::AppState;

/// Run a search with filters, pagination, and facets.
pub async fn search(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(req): axum::Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = req.normalized_page();
    let response = state.db.search.search(auth.user_id, &req).await?;
    let total = response.total;
    Ok(success_paginated(
        response,
        PaginationMeta {
            total,
            limit,
            offset,
        },
    ))
}
