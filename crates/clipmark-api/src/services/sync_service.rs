//! Sync service: single-document reconciliation and whole-folder
//! orchestration.
//!
//! Reconciliation fetches the live snapshot, runs the pure diff from
//! `clipmark_core::reconcile`, and applies the plan in one transaction.
//! Folder sync wraps reconciliation per document under a per-user lock;
//! individual document failures are collected, never fatal to the batch.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use clipmark_core::{
    diff_segments, DocumentProvider, DocumentSyncResult, Error, FolderSyncError,
    FolderSyncResult, Result, SyncAction, SyncStatus,
};
use clipmark_db::Database;

use crate::services::CredentialResolver;

/// Drives reconciliation against the external document provider.
#[derive(Clone)]
pub struct SyncService {
    db: Database,
    provider: Arc<dyn DocumentProvider>,
    credentials: CredentialResolver,
}

impl SyncService {
    pub fn new(
        db: Database,
        provider: Arc<dyn DocumentProvider>,
        credentials: CredentialResolver,
    ) -> Self {
        Self {
            db,
            provider,
            credentials,
        }
    }

    /// Reconcile one document's stored segments with its live content.
    ///
    /// Provider access-loss deactivates the document and returns a
    /// failed-status result without raising. Any unexpected error aborts
    /// the whole apply transaction and is logged as a failed sync.
    pub async fn sync_document(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> Result<DocumentSyncResult> {
        let start = Instant::now();
        let document = self.db.documents.get(user_id, document_id).await?;
        let credential = self.credentials.resolve(user_id).await?;

        let snapshot = match self
            .provider
            .fetch_snapshot(&credential, &document.provider_file_id)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(err) if err.is_access_lost() => {
                warn!(
                    subsystem = "sync",
                    component = "reconcile",
                    op = "sync_document",
                    user_id = %user_id,
                    document_id = %document_id,
                    "Provider access lost; deactivating document"
                );
                self.db.documents.deactivate(user_id, document_id).await?;
                self.db
                    .sync
                    .append_log(
                        user_id,
                        SyncAction::DocumentSync,
                        SyncStatus::Failed,
                        json!({
                            "document_id": document_id,
                            "reason": err.to_string(),
                        }),
                    )
                    .await?;
                return Ok(DocumentSyncResult::failed(document_id, err.to_string()));
            }
            Err(err) => {
                self.log_failure(user_id, document_id, &err).await;
                return Err(err);
            }
        };

        let stored = self
            .db
            .segments
            .list_for_document(user_id, document_id)
            .await?;
        let plan = diff_segments(&stored, &snapshot);

        if let Err(err) = self
            .db
            .sync
            .apply_plan(
                user_id,
                document_id,
                &snapshot.title,
                snapshot.last_modified_at,
                &plan,
            )
            .await
        {
            self.log_failure(user_id, document_id, &err).await;
            return Err(err);
        }

        self.db
            .sync
            .append_log(
                user_id,
                SyncAction::DocumentSync,
                SyncStatus::Success,
                json!({
                    "document_id": document_id,
                    "updated_segments": plan.updated,
                    "repositioned_segments": plan.repositioned,
                    "orphaned_segments": plan.orphaned.len(),
                }),
            )
            .await?;

        info!(
            subsystem = "sync",
            component = "reconcile",
            op = "sync_document",
            user_id = %user_id,
            document_id = %document_id,
            updated = plan.updated,
            repositioned = plan.repositioned,
            orphaned = plan.orphaned.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Document reconciled"
        );

        Ok(DocumentSyncResult {
            document_id,
            status: SyncStatus::Success,
            updated_segments: plan.updated,
            repositioned_segments: plan.repositioned,
            orphaned_segments: plan.orphaned,
            conflicts: plan.conflicts,
        })
    }

    async fn log_failure(&self, user_id: Uuid, document_id: Uuid, err: &Error) {
        let logged = self
            .db
            .sync
            .append_log(
                user_id,
                SyncAction::DocumentSync,
                SyncStatus::Failed,
                json!({
                    "document_id": document_id,
                    "reason": err.to_string(),
                }),
            )
            .await;
        if let Err(log_err) = logged {
            warn!(
                subsystem = "sync",
                component = "reconcile",
                user_id = %user_id,
                error = %log_err,
                "Failed to write sync log entry"
            );
        }
    }

    /// Reconcile every document in the user's watch folder.
    ///
    /// Fails outright only on missing configuration, lock contention, or
    /// folder-listing failure. Per-document errors are collected in the
    /// result and do not abort the batch.
    pub async fn sync_folder(&self, user_id: Uuid) -> Result<FolderSyncResult> {
        let user = self.db.users.get(user_id).await?;
        let folder_id = user.watch_folder_id.ok_or_else(|| {
            Error::Config("no watch folder configured for this user".to_string())
        })?;

        // Serialize folder syncs per user; a concurrent run fails fast.
        let lock = self.db.sync.acquire_user_lock(user_id).await?;
        let result = self.sync_folder_locked(user_id, &folder_id).await;
        lock.release().await?;

        match result {
            Ok(summary) => {
                self.db
                    .sync
                    .append_log(
                        user_id,
                        SyncAction::FullSync,
                        summary.status,
                        json!({
                            "documents_synced": summary.documents_synced,
                            "documents_added": summary.documents_added,
                            "documents_removed": summary.documents_removed,
                            "segments_updated": summary.segments_updated,
                            "errors": summary.errors.len(),
                        }),
                    )
                    .await?;
                Ok(summary)
            }
            Err(err) => {
                let logged = self
                    .db
                    .sync
                    .append_log(
                        user_id,
                        SyncAction::FullSync,
                        SyncStatus::Failed,
                        json!({ "reason": err.to_string() }),
                    )
                    .await;
                if let Err(log_err) = logged {
                    warn!(
                        subsystem = "sync",
                        component = "folder_sync",
                        user_id = %user_id,
                        error = %log_err,
                        "Failed to write sync log entry"
                    );
                }
                Err(err)
            }
        }
    }

    async fn sync_folder_locked(&self, user_id: Uuid, folder_id: &str) -> Result<FolderSyncResult> {
        let start = Instant::now();
        let credential = self.credentials.resolve(user_id).await?;

        // Listing failure fails the whole operation.
        let listed = self.provider.list_folder(&credential, folder_id).await?;
        let registered = self.db.documents.list_active(user_id).await?;

        let mut result = FolderSyncResult {
            status: SyncStatus::Success,
            documents_synced: 0,
            documents_added: 0,
            documents_removed: 0,
            segments_updated: 0,
            errors: Vec::new(),
        };

        for file in &listed {
            match registered
                .iter()
                .find(|doc| doc.provider_file_id == file.provider_file_id)
            {
                Some(doc) => match self.sync_document(user_id, doc.id).await {
                    Ok(doc_result) if doc_result.status == SyncStatus::Success => {
                        result.documents_synced += 1;
                        result.segments_updated +=
                            doc_result.updated_segments + doc_result.repositioned_segments;
                    }
                    Ok(doc_result) => {
                        result.errors.push(FolderSyncError {
                            document_id: doc.id,
                            provider_file_id: file.provider_file_id.clone(),
                            message: doc_result
                                .conflicts
                                .first()
                                .map(|c| c.detail.clone())
                                .unwrap_or_else(|| "sync failed".to_string()),
                        });
                    }
                    Err(err) => {
                        result.errors.push(FolderSyncError {
                            document_id: doc.id,
                            provider_file_id: file.provider_file_id.clone(),
                            message: err.to_string(),
                        });
                    }
                },
                None => {
                    let registered = self
                        .db
                        .documents
                        .register(
                            user_id,
                            &file.provider_file_id,
                            &file.title,
                            Some(folder_id),
                            file.last_modified_at,
                        )
                        .await;
                    match registered {
                        Ok(_) => result.documents_added += 1,
                        Err(err) => result.errors.push(FolderSyncError {
                            document_id: Uuid::nil(),
                            provider_file_id: file.provider_file_id.clone(),
                            message: err.to_string(),
                        }),
                    }
                }
            }
        }

        // Anything registered but no longer listed left the folder.
        for doc in &registered {
            let still_listed = listed
                .iter()
                .any(|file| file.provider_file_id == doc.provider_file_id);
            if !still_listed {
                match self.db.documents.deactivate(user_id, doc.id).await {
                    Ok(()) => result.documents_removed += 1,
                    Err(err) => result.errors.push(FolderSyncError {
                        document_id: doc.id,
                        provider_file_id: doc.provider_file_id.clone(),
                        message: err.to_string(),
                    }),
                }
            }
        }

        if !result.errors.is_empty() {
            result.status = SyncStatus::Partial;
        }

        info!(
            subsystem = "sync",
            component = "folder_sync",
            op = "sync_folder",
            user_id = %user_id,
            synced = result.documents_synced,
            added = result.documents_added,
            removed = result.documents_removed,
            errors = result.errors.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Folder sync completed"
        );

        Ok(result)
    }
}
