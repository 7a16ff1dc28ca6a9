//! Session repository: opaque bearer tokens stored hashed.

use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use clipmark_core::{Error, Result};

/// PostgreSQL implementation of the session repository.
///
/// Tokens are random strings handed to the client once; only their SHA-256
/// hash is stored, so a database leak does not leak usable credentials.
pub struct PgSessionRepository {
    pool: Pool<Postgres>,
}

impl PgSessionRepository {
    /// Create a new PgSessionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Generate a cryptographically secure random token string.
    fn generate_token(length: usize) -> String {
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| {
                let idx = rng.gen_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }

    /// Hash a token using SHA256.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Create a session and return the plaintext token (shown once).
    pub async fn create(&self, user_id: Uuid, ttl_hours: i64) -> Result<String> {
        let token = format!("cm_{}", Self::generate_token(48));
        let expires_at = Utc::now() + Duration::hours(ttl_hours);

        sqlx::query(
            "INSERT INTO session (token_hash, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(Self::hash_token(&token))
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(token)
    }

    /// Resolve a bearer token to its user id. Expired sessions are invalid.
    pub async fn resolve(&self, token: &str) -> Result<Uuid> {
        let row = sqlx::query(
            "SELECT user_id FROM session WHERE token_hash = $1 AND expires_at > now()",
        )
        .bind(Self::hash_token(token))
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::Unauthorized("invalid or expired session".to_string()))?;

        Ok(row.get("user_id"))
    }

    /// Revoke a session by token.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM session WHERE token_hash = $1")
            .bind(Self::hash_token(token))
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Delete expired sessions. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = PgSessionRepository::hash_token("cm_abc");
        let b = PgSessionRepository::hash_token("cm_abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_token_differs_per_token() {
        assert_ne!(
            PgSessionRepository::hash_token("cm_one"),
            PgSessionRepository::hash_token("cm_two")
        );
    }

    #[test]
    fn test_generate_token_length_and_charset() {
        let token = PgSessionRepository::generate_token(48);
        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
