//! Color assignment repository.
//!
//! Loads the inputs for the pure selector in `clipmark_core::color` and
//! records usage afterwards. Recording is a required side effect of every
//! assignment; the segment-creation path runs both inside its transaction
//! so a failed insert never skews the usage history.

use std::collections::{HashMap, HashSet};

use sqlx::{Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use clipmark_core::{select_color, ColorUsage, Error, Result, UsageStats};

/// Pick a color for a new segment in the given document, inside an open
/// transaction. Does not record usage; pair with [`record_usage_tx`].
pub async fn pick_color_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    document_id: Uuid,
) -> Result<String> {
    let palette: Option<Vec<String>> =
        sqlx::query_scalar("SELECT palette FROM app_user WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .flatten();
    let palette = match palette {
        Some(p) if !p.is_empty() => p,
        _ => clipmark_core::defaults::DEFAULT_PALETTE
            .iter()
            .map(|c| c.to_string())
            .collect(),
    };

    let used_rows = sqlx::query(
        "SELECT DISTINCT color FROM segment WHERE document_id = $1 AND user_id = $2",
    )
    .bind(document_id)
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(Error::Database)?;
    let used_in_document: HashSet<String> =
        used_rows.iter().map(|row| row.get("color")).collect();

    let usage_rows = sqlx::query(
        "SELECT color, last_used_at, use_count FROM color_usage WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(Error::Database)?;
    let usage: HashMap<String, UsageStats> = usage_rows
        .iter()
        .map(|row| {
            (
                row.get("color"),
                UsageStats {
                    last_used_at: Some(row.get("last_used_at")),
                    use_count: row.get("use_count"),
                },
            )
        })
        .collect();

    Ok(select_color(&palette, &used_in_document, &usage))
}

/// Record a color assignment: increment count, refresh timestamp.
pub async fn record_usage_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    color: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO color_usage (user_id, color, last_used_at, use_count)
        VALUES ($1, $2, now(), 1)
        ON CONFLICT (user_id, color) DO UPDATE SET
            last_used_at = now(),
            use_count = color_usage.use_count + 1
        "#,
    )
    .bind(user_id)
    .bind(color)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;
    Ok(())
}

/// PostgreSQL implementation of the color-assignment repository.
pub struct PgColorRepository {
    pool: Pool<Postgres>,
}

impl PgColorRepository {
    /// Create a new PgColorRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Assign a color for a new segment and record its usage.
    pub async fn assign(&self, user_id: Uuid, document_id: Uuid) -> Result<String> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let color = pick_color_tx(&mut tx, user_id, document_id).await?;
        record_usage_tx(&mut tx, user_id, &color).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(color)
    }

    /// Current usage history for a user, most recently used first.
    pub async fn usage_for(&self, user_id: Uuid) -> Result<Vec<ColorUsage>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, color, last_used_at, use_count
            FROM color_usage
            WHERE user_id = $1
            ORDER BY last_used_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| ColorUsage {
                user_id: row.get("user_id"),
                color: row.get("color"),
                last_used_at: row.get("last_used_at"),
                use_count: row.get("use_count"),
            })
            .collect())
    }
}
