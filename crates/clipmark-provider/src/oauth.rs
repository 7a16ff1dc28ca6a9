//! Google OAuth2 client: authorization URL, code exchange, token refresh,
//! and userinfo fetch.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use clipmark_core::{Error, Result};

/// Google's OAuth2 authorization endpoint.
pub const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's OAuth2 token endpoint.
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Google's userinfo endpoint.
pub const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Scopes requested: document content, folder listing, identity.
pub const SCOPES: &str = "https://www.googleapis.com/auth/documents \
                          https://www.googleapis.com/auth/drive.readonly \
                          openid email profile";

/// HTTP timeout for OAuth calls (seconds).
const OAUTH_TIMEOUT_SECS: u64 = 30;

/// OAuth application configuration.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl GoogleOAuthConfig {
    /// Read configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let get = |key: &str| {
            std::env::var(key).map_err(|_| Error::Config(format!("{} not set", key)))
        };
        Ok(Self {
            client_id: get("GOOGLE_CLIENT_ID")?,
            client_secret: get("GOOGLE_CLIENT_SECRET")?,
            redirect_uri: get("GOOGLE_REDIRECT_URI")?,
        })
    }
}

/// Tokens returned by an exchange or refresh.
#[derive(Debug, Clone)]
pub struct ProviderTokens {
    pub access_token: String,
    /// Present on first consent; refreshes keep the original.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Google account identity from the userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// Google OAuth2 client.
pub struct GoogleOAuthClient {
    client: Client,
    config: GoogleOAuthConfig,
}

impl GoogleOAuthClient {
    /// Create a new client for the given application configuration.
    pub fn new(config: GoogleOAuthConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(OAUTH_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }

    /// Build the authorization redirect URL.
    ///
    /// `access_type=offline` + `prompt=consent` so Google issues a refresh
    /// token; tokens are resolved per request from storage afterwards.
    pub fn authorize_url(&self, state: &str) -> String {
        let mut url = reqwest::Url::parse(AUTH_ENDPOINT).expect("valid auth endpoint");
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        url.to_string()
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderTokens> {
        debug!(
            subsystem = "provider",
            component = "oauth",
            op = "exchange_code",
            "Exchanging authorization code"
        );
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        self.token_request(&params).await
    }

    /// Refresh an access token using a stored refresh token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<ProviderTokens> {
        info!(
            subsystem = "provider",
            component = "oauth",
            op = "refresh",
            "Refreshing provider access token"
        );
        let params = [
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];
        self.token_request(&params).await
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<ProviderTokens> {
        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(params)
            .send()
            .await
            .map_err(Error::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(Error::from)?;
        Ok(ProviderTokens {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        })
    }

    /// Fetch the authenticated account's identity.
    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleUserInfo> {
        let response = self
            .client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(Error::from)?;

        if !response.status().is_success() {
            return Err(Error::Unauthorized(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        response.json().await.map_err(Error::from)
    }
}
