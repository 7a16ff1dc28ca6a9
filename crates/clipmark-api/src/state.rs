//! Shared application state.

use std::sync::Arc;

use clipmark_core::DocumentProvider;
use clipmark_db::Database;
use clipmark_provider::GoogleOAuthClient;

use crate::config::ApiConfig;
use crate::services::{CredentialResolver, SyncService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub provider: Arc<dyn DocumentProvider>,
    pub oauth: Arc<GoogleOAuthClient>,
    pub credentials: CredentialResolver,
    pub sync: SyncService,
    pub config: ApiConfig,
}

impl AppState {
    /// Assemble state from its parts.
    pub fn new(
        db: Database,
        provider: Arc<dyn DocumentProvider>,
        oauth: Arc<GoogleOAuthClient>,
        config: ApiConfig,
    ) -> Self {
        let credentials = CredentialResolver::new(db.clone(), oauth.clone());
        let sync = SyncService::new(db.clone(), provider.clone(), credentials.clone());
        Self {
            db,
            provider,
            oauth,
            credentials,
            sync,
            config,
        }
    }
}
