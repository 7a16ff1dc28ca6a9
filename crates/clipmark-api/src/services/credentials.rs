//! Per-request provider credential resolution.
//!
//! Credentials are built from each user's stored tokens and threaded
//! explicitly into provider calls. An access token within a minute of
//! expiry is refreshed and the rotation persisted before use.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use clipmark_core::{Error, ProviderCredential, Result};
use clipmark_db::Database;
use clipmark_provider::GoogleOAuthClient;

/// Refresh ahead of actual expiry so an in-flight call doesn't race it.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Resolves a user's stored tokens into a usable provider credential.
#[derive(Clone)]
pub struct CredentialResolver {
    db: Database,
    oauth: Arc<GoogleOAuthClient>,
}

impl CredentialResolver {
    pub fn new(db: Database, oauth: Arc<GoogleOAuthClient>) -> Self {
        Self { db, oauth }
    }

    /// Resolve the credential for a user, refreshing if necessary.
    pub async fn resolve(&self, user_id: Uuid) -> Result<ProviderCredential> {
        let tokens = self.db.users.provider_tokens(user_id).await?;

        let access_token = tokens.access_token.ok_or_else(|| {
            Error::Unauthorized("no provider credential on file; re-authenticate".to_string())
        })?;

        let expired = tokens
            .token_expires_at
            .map(|expires_at| expires_at <= Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS))
            .unwrap_or(false);

        if !expired {
            return Ok(ProviderCredential { access_token });
        }

        let refresh_token = tokens.refresh_token.ok_or_else(|| {
            Error::Unauthorized("provider token expired; re-authenticate".to_string())
        })?;

        debug!(
            subsystem = "api",
            component = "credentials",
            op = "refresh",
            user_id = %user_id,
            "Access token expired; refreshing"
        );

        let refreshed = self.oauth.refresh_access_token(&refresh_token).await?;
        self.db
            .users
            .store_access_token(user_id, &refreshed.access_token, refreshed.expires_at)
            .await?;

        Ok(ProviderCredential {
            access_token: refreshed.access_token,
        })
    }
}
