//! Document repository implementation.

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use clipmark_core::{new_v7, Document, Error, Result};

/// PostgreSQL implementation of the document repository.
pub struct PgDocumentRepository {
    pool: Pool<Postgres>,
}

pub(crate) fn map_row_to_document(row: sqlx::postgres::PgRow) -> Document {
    Document {
        id: row.get("id"),
        user_id: row.get("user_id"),
        provider_file_id: row.get("provider_file_id"),
        title: row.get("title"),
        folder_id: row.get("folder_id"),
        is_active: row.get("is_active"),
        last_synced_at: row.get("last_synced_at"),
        last_modified_at: row.get("last_modified_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl PgDocumentRepository {
    /// Create a new PgDocumentRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Register a document for a user.
    ///
    /// Re-registering an existing provider file reactivates it and
    /// refreshes the title rather than failing the unique constraint.
    pub async fn register(
        &self,
        user_id: Uuid,
        provider_file_id: &str,
        title: &str,
        folder_id: Option<&str>,
        last_modified_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Document> {
        let row = sqlx::query(
            r#"
            INSERT INTO document (id, user_id, provider_file_id, title, folder_id, last_modified_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, provider_file_id) DO UPDATE SET
                title = EXCLUDED.title,
                folder_id = COALESCE(EXCLUDED.folder_id, document.folder_id),
                last_modified_at = COALESCE(EXCLUDED.last_modified_at, document.last_modified_at),
                is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(new_v7())
        .bind(user_id)
        .bind(provider_file_id)
        .bind(title)
        .bind(folder_id)
        .bind(last_modified_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(map_row_to_document(row))
    }

    /// Fetch a document owned by the given user.
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Document> {
        let row = sqlx::query("SELECT * FROM document WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::DocumentNotFound(id))?;
        Ok(map_row_to_document(row))
    }

    /// List a user's documents, optionally including inactive ones.
    pub async fn list(&self, user_id: Uuid, include_inactive: bool) -> Result<Vec<Document>> {
        let sql = if include_inactive {
            "SELECT * FROM document WHERE user_id = $1 ORDER BY created_at DESC"
        } else {
            "SELECT * FROM document WHERE user_id = $1 AND is_active ORDER BY created_at DESC"
        };
        let rows = sqlx::query(sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.into_iter().map(map_row_to_document).collect())
    }

    /// List active documents keyed for folder-sync diffing.
    pub async fn list_active(&self, user_id: Uuid) -> Result<Vec<Document>> {
        self.list(user_id, false).await
    }

    /// Soft-delete: mark inactive. Used when a document becomes
    /// unreachable or leaves the watch folder.
    pub async fn deactivate(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE document SET is_active = FALSE WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::DocumentNotFound(id));
        }
        Ok(())
    }

    /// Hard delete. Segments cascade.
    pub async fn hard_delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM document WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::DocumentNotFound(id));
        }
        Ok(())
    }
}
