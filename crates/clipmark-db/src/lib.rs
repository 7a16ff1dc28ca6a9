//! # clipmark-db
//!
//! PostgreSQL database layer for clipmark.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for all core entities
//! - Faceted full-text search with PostgreSQL tsvector
//! - The composable predicate builder shared by search and facets
//!
//! ## Example
//!
//! ```rust,ignore
//! use clipmark_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/clipmark").await?;
//!     let docs = db.documents.list(user_id, false).await?;
//!     println!("{} active documents", docs.len());
//!     Ok(())
//! }
//! ```

pub mod categories;
pub mod colors;
pub mod documents;
pub mod pool;
pub mod search;
pub mod segment_filter;
pub mod segments;
pub mod sessions;
pub mod sync;
pub mod tags;
pub mod users;

#[cfg(test)]
mod tests;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use clipmark_core::*;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// Re-export repository implementations
pub use categories::{validate_category_name, PgCategoryRepository};
pub use colors::{pick_color_tx, record_usage_tx, PgColorRepository};
pub use documents::PgDocumentRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use search::PgSegmentSearch;
pub use segment_filter::{bind_params, FacetDimension, QueryParam, SegmentFilterBuilder};
pub use segments::PgSegmentRepository;
pub use sessions::PgSessionRepository;
pub use sync::{PgSyncRepository, SyncLock};
pub use tags::{validate_tag_name, PgTagRepository};
pub use users::{PgUserRepository, StoredProviderTokens};

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// User repository.
    pub users: PgUserRepository,
    /// Session repository for bearer-token auth.
    pub sessions: PgSessionRepository,
    /// Document repository.
    pub documents: PgDocumentRepository,
    /// Segment repository.
    pub segments: PgSegmentRepository,
    /// Category repository.
    pub categories: PgCategoryRepository,
    /// Tag repository.
    pub tags: PgTagRepository,
    /// Color assignment repository.
    pub colors: PgColorRepository,
    /// Faceted full-text search.
    pub search: PgSegmentSearch,
    /// Sync persistence: audit log, plan application, per-user locks.
    pub sync: PgSyncRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool.clone()),
            documents: PgDocumentRepository::new(pool.clone()),
            segments: PgSegmentRepository::new(pool.clone()),
            categories: PgCategoryRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            colors: PgColorRepository::new(pool.clone()),
            search: PgSegmentSearch::new(pool.clone()),
            sync: PgSyncRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
