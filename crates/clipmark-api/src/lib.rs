//! # clipmark-api
//!
//! HTTP API server for clipmark: axum handlers over the database layer
//! and the Google document provider.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod responses;
pub mod services;
pub mod state;

use axum::http::Request;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::AppState;

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Liveness probe.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Auth
        .route("/auth/google", get(handlers::auth::google_login))
        .route("/auth/google/callback", get(handlers::auth::google_callback))
        .route(
            "/auth/me",
            get(handlers::auth::me).put(handlers::auth::update_preferences),
        )
        .route("/auth/logout", post(handlers::auth::logout))
        // Documents
        .route(
            "/documents",
            get(handlers::documents::list_documents).post(handlers::documents::register_document),
        )
        .route(
            "/documents/from-selection",
            post(handlers::documents::from_selection),
        )
        .route(
            "/documents/:id",
            get(handlers::documents::get_document).delete(handlers::documents::delete_document),
        )
        .route("/documents/:id/sync", post(handlers::documents::sync_document))
        // Segments
        .route(
            "/segments",
            get(handlers::segments::list_segments).post(handlers::segments::create_segment),
        )
        .route(
            "/segments/:id",
            get(handlers::segments::get_segment)
                .put(handlers::segments::update_segment)
                .delete(handlers::segments::delete_segment),
        )
        .route("/segments/:id/markers", put(handlers::segments::update_markers))
        .route("/segments/:id/tags", put(handlers::segments::replace_tags))
        .route("/segments/:id/associate", post(handlers::segments::associate))
        .route(
            "/segments/:id/associations",
            get(handlers::segments::list_associations),
        )
        // Categories
        .route(
            "/categories",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route("/categories/reorder", put(handlers::categories::reorder_categories))
        .route(
            "/categories/:id",
            put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        // Tags
        .route(
            "/tags",
            get(handlers::tags::list_tags).post(handlers::tags::create_tag),
        )
        .route("/tags/autocomplete", get(handlers::tags::autocomplete))
        .route("/tags/bulk", post(handlers::tags::bulk_create))
        .route(
            "/tags/:id",
            put(handlers::tags::update_tag).delete(handlers::tags::delete_tag),
        )
        // Search
        .route("/search", post(handlers::search::search))
        // Sync
        .route("/sync/full", post(handlers::sync::full_sync))
        .route("/sync/status", get(handlers::sync::sync_status))
        .route(
            "/sync/document/:document_id",
            post(handlers::sync::sync_document),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
