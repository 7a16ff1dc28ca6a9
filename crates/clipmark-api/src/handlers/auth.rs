//! Google OAuth login flow and session management.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect};
use serde::Deserialize;
use tracing::info;

use clipmark_core::UpsertUserRequest;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::responses::success;
use crate::state::AppState;

/// Begin the OAuth flow: redirect to Google's consent screen.
pub async fn google_login(State(state): State<AppState>) -> impl IntoResponse {
    let csrf_state = uuid::Uuid::new_v4().to_string();
    Redirect::temporary(&state.oauth.authorize_url(&csrf_state))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    #[allow(dead_code)]
    pub state: Option<String>,
}

/// OAuth callback: exchange the code, upsert the user, issue a session.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state.oauth.exchange_code(&query.code).await?;
    let userinfo = state.oauth.fetch_userinfo(&tokens.access_token).await?;

    let (user, created) = state
        .db
        .users
        .upsert_from_oauth(UpsertUserRequest {
            google_id: userinfo.id,
            email: userinfo.email,
            display_name: userinfo.name,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_expires_at: tokens.expires_at,
        })
        .await?;

    if created {
        state.db.categories.seed_defaults(user.id).await?;
        info!(
            subsystem = "api",
            component = "auth",
            op = "signup",
            user_id = %user.id,
            "New user registered"
        );
    }

    let token = state
        .db
        .sessions
        .create(user.id, state.config.session_ttl_hours)
        .await?;

    Ok(success(serde_json::json!({
        "token": token,
        "user": user,
    })))
}

/// The authenticated user's profile.
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.db.users.get(auth.user_id).await?;
    Ok(success(user))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    /// Empty string clears the watch folder.
    pub watch_folder_id: Option<String>,
    /// Empty list reverts to the default palette.
    pub palette: Option<Vec<String>>,
}

fn validate_palette(palette: &[String]) -> Result<(), ApiError> {
    for color in palette {
        let valid = color.len() == 7
            && color.starts_with('#')
            && color[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(ApiError::BadRequest(format!(
                "invalid palette color: {}",
                color
            )));
        }
    }
    Ok(())
}

/// Update the caller's watch folder and palette.
pub async fn update_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(req): axum::Json<UpdatePreferencesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(folder) = &req.watch_folder_id {
        let folder = folder.trim();
        state
            .db
            .users
            .set_watch_folder(auth.user_id, (!folder.is_empty()).then_some(folder))
            .await?;
    }

    if let Some(palette) = &req.palette {
        validate_palette(palette)?;
        state
            .db
            .users
            .set_palette(
                auth.user_id,
                (!palette.is_empty()).then_some(palette.as_slice()),
            )
            .await?;
    }

    let user = state.db.users.get(auth.user_id).await?;
    Ok(success(user))
}

/// Revoke the calling session.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    state.db.sessions.revoke(token).await?;
    Ok(success(serde_json::json!({ "logged_out": true })))
}
