//! User repository implementation.

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use clipmark_core::{new_v7, Error, Result, UpsertUserRequest, User};

/// Stored provider tokens for a user, used to resolve per-request
/// credentials.
#[derive(Debug, Clone)]
pub struct StoredProviderTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// PostgreSQL implementation of the user repository.
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

fn map_row_to_user(row: sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        google_id: row.get("google_id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        watch_folder_id: row.get("watch_folder_id"),
        palette: row.get("palette"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert or update a user from an OAuth callback.
    ///
    /// Matches on google_id; refreshes email, display name, and stored
    /// provider tokens. Returns the user together with a flag telling the
    /// caller whether the row was newly created (new users get default
    /// categories seeded).
    pub async fn upsert_from_oauth(&self, req: UpsertUserRequest) -> Result<(User, bool)> {
        let id = new_v7();
        let row = sqlx::query(
            r#"
            INSERT INTO app_user (
                id, google_id, email, display_name,
                access_token, refresh_token, token_expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (google_id) DO UPDATE SET
                email = EXCLUDED.email,
                display_name = COALESCE(EXCLUDED.display_name, app_user.display_name),
                access_token = EXCLUDED.access_token,
                refresh_token = COALESCE(EXCLUDED.refresh_token, app_user.refresh_token),
                token_expires_at = EXCLUDED.token_expires_at
            RETURNING *, (xmax = 0) AS inserted
            "#,
        )
        .bind(id)
        .bind(&req.google_id)
        .bind(&req.email)
        .bind(&req.display_name)
        .bind(&req.access_token)
        .bind(&req.refresh_token)
        .bind(req.token_expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let inserted: bool = row.get("inserted");
        Ok((map_row_to_user(row), inserted))
    }

    /// Fetch a user by id.
    pub async fn get(&self, id: Uuid) -> Result<User> {
        let row = sqlx::query("SELECT * FROM app_user WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(format!("user {}", id)))?;
        Ok(map_row_to_user(row))
    }

    /// Set or clear the watched Drive folder.
    pub async fn set_watch_folder(&self, id: Uuid, folder_id: Option<&str>) -> Result<()> {
        let result = sqlx::query("UPDATE app_user SET watch_folder_id = $2 WHERE id = $1")
            .bind(id)
            .bind(folder_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    /// Replace the user's configured palette. Empty clears back to default.
    pub async fn set_palette(&self, id: Uuid, palette: Option<&[String]>) -> Result<()> {
        let result = sqlx::query("UPDATE app_user SET palette = $2 WHERE id = $1")
            .bind(id)
            .bind(palette)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    /// Load the stored provider tokens for credential resolution.
    pub async fn provider_tokens(&self, id: Uuid) -> Result<StoredProviderTokens> {
        let row = sqlx::query(
            "SELECT access_token, refresh_token, token_expires_at FROM app_user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("user {}", id)))?;

        Ok(StoredProviderTokens {
            access_token: row.get("access_token"),
            refresh_token: row.get("refresh_token"),
            token_expires_at: row.get("token_expires_at"),
        })
    }

    /// Persist a rotated access token after a refresh.
    pub async fn store_access_token(
        &self,
        id: Uuid,
        access_token: &str,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE app_user SET access_token = $2, token_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(access_token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}
