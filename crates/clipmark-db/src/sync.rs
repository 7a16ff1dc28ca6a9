//! Sync persistence: the audit log, transactional plan application, and
//! the per-user advisory lock that serializes folder syncs.

use sqlx::pool::PoolConnection;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use clipmark_core::{
    new_v7, Error, ReconcilePlan, Result, SegmentChange, SyncAction, SyncLogEntry, SyncStatus,
};

/// Lock class discriminator for `pg_try_advisory_lock`, shared by every
/// clipmark instance pointed at the same database.
const SYNC_LOCK_CLASS: i32 = 0x636c_6970; // "clip"

/// A held per-user sync lock.
///
/// Session-scoped advisory locks survive a pooled connection's return to
/// the pool, so the guard owns the connection and must be released via
/// [`SyncLock::release`] on every exit path.
pub struct SyncLock {
    conn: PoolConnection<Postgres>,
    key: i32,
}

impl SyncLock {
    /// Release the lock and return the connection to the pool.
    pub async fn release(mut self) -> Result<()> {
        sqlx::query("SELECT pg_advisory_unlock($1, $2)")
            .bind(SYNC_LOCK_CLASS)
            .bind(self.key)
            .execute(&mut *self.conn)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

/// PostgreSQL implementation of the sync repository.
pub struct PgSyncRepository {
    pool: Pool<Postgres>,
}

impl PgSyncRepository {
    /// Create a new PgSyncRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Try to take the per-user sync lock.
    ///
    /// Returns Conflict if another sync for the same user currently holds
    /// it, so concurrent folder syncs fail fast instead of racing.
    pub async fn acquire_user_lock(&self, user_id: Uuid) -> Result<SyncLock> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let key = Self::lock_key(user_id);

        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1, $2)")
            .bind(SYNC_LOCK_CLASS)
            .bind(key)
            .fetch_one(&mut *conn)
            .await
            .map_err(Error::Database)?;

        if !acquired {
            return Err(Error::Conflict(
                "a sync is already running for this user".to_string(),
            ));
        }
        Ok(SyncLock { conn, key })
    }

    fn lock_key(user_id: Uuid) -> i32 {
        let bytes = user_id.as_bytes();
        i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Apply a reconciliation plan and the document's refreshed metadata
    /// in one all-or-nothing transaction.
    ///
    /// Orphaned segments are deliberately untouched: they stay behind as
    /// conflicts for manual resolution.
    pub async fn apply_plan(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        document_title: &str,
        last_modified_at: Option<chrono::DateTime<chrono::Utc>>,
        plan: &ReconcilePlan,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        for diff in &plan.diffs {
            match &diff.change {
                SegmentChange::TextChanged {
                    start_offset,
                    end_offset,
                    content,
                } => {
                    sqlx::query(
                        r#"
                        UPDATE segment
                        SET start_offset = $3, end_offset = $4, content = $5
                        WHERE id = $1 AND user_id = $2
                        "#,
                    )
                    .bind(diff.segment_id)
                    .bind(user_id)
                    .bind(start_offset)
                    .bind(end_offset)
                    .bind(content)
                    .execute(&mut *tx)
                    .await
                    .map_err(Error::Database)?;
                }
                SegmentChange::Repositioned {
                    start_offset,
                    end_offset,
                } => {
                    sqlx::query(
                        r#"
                        UPDATE segment
                        SET start_offset = $3, end_offset = $4
                        WHERE id = $1 AND user_id = $2
                        "#,
                    )
                    .bind(diff.segment_id)
                    .bind(user_id)
                    .bind(start_offset)
                    .bind(end_offset)
                    .execute(&mut *tx)
                    .await
                    .map_err(Error::Database)?;
                }
                SegmentChange::Unchanged | SegmentChange::Orphaned => {}
            }
        }

        sqlx::query(
            r#"
            UPDATE document
            SET title = $3,
                last_synced_at = now(),
                last_modified_at = COALESCE($4, last_modified_at)
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(document_id)
        .bind(user_id)
        .bind(document_title)
        .bind(last_modified_at)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    /// Append one row to the audit trail. Never read by business logic.
    pub async fn append_log(
        &self,
        user_id: Uuid,
        action: SyncAction,
        status: SyncStatus,
        details: serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_log (id, user_id, action, status, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(new_v7())
        .bind(user_id)
        .bind(action.as_str())
        .bind(status.as_str())
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Most recent sync log rows for a user.
    pub async fn recent_logs(&self, user_id: Uuid, limit: i64) -> Result<Vec<SyncLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM sync_log
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit.clamp(1, 100))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                let action_str: String = row.get("action");
                let status_str: String = row.get("status");
                let action = match action_str.as_str() {
                    "full_sync" => SyncAction::FullSync,
                    "document_sync" => SyncAction::DocumentSync,
                    "marker_repair" => SyncAction::MarkerRepair,
                    other => {
                        return Err(Error::Internal(format!("unknown sync action: {}", other)))
                    }
                };
                let status = match status_str.as_str() {
                    "success" => SyncStatus::Success,
                    "failed" => SyncStatus::Failed,
                    "partial" => SyncStatus::Partial,
                    other => {
                        return Err(Error::Internal(format!("unknown sync status: {}", other)))
                    }
                };
                Ok(SyncLogEntry {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    action,
                    status,
                    details: row.get("details"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }
}
