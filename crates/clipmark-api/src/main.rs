//! clipmark-api - HTTP API server for clipmark

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipmark_api::config::ApiConfig;
use clipmark_api::state::AppState;
use clipmark_db::Database;
use clipmark_provider::{GoogleDocsProvider, GoogleOAuthClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipmark=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env()?;
    clipmark_api::error::expose_internal_errors(!config.environment.is_production());

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;
    clipmark_db::log_pool_metrics(db.pool());
    info!(
        subsystem = "api",
        op = "startup",
        "Database connected and migrations applied"
    );

    let purged = db.sessions.purge_expired().await?;
    if purged > 0 {
        info!(
            subsystem = "api",
            op = "startup",
            purged,
            "Removed expired sessions"
        );
    }

    let oauth = Arc::new(GoogleOAuthClient::new(config.oauth.clone()));
    let provider = Arc::new(GoogleDocsProvider::new());
    let state = AppState::new(db, provider, oauth, config.clone());

    let app = clipmark_api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(
        subsystem = "api",
        op = "startup",
        port = config.port,
        "clipmark-api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!(subsystem = "api", op = "shutdown", "Shutting down");
}
