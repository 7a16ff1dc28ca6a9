//! Sync service integration tests against a live test database, with the
//! provider mocked.
//!
//! `#[ignore]`d by default; run with:
//!
//! ```sh
//! cargo test -p clipmark-api -- --ignored
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use clipmark_api::services::{CredentialResolver, SyncService};
use clipmark_core::{
    CreateSegmentRequest, DocumentSnapshot, Error, MarkerRange, ProviderFile, SyncStatus,
};
use clipmark_db::test_fixtures::{connect_test, create_test_user};
use clipmark_db::Database;
use clipmark_provider::{GoogleOAuthClient, GoogleOAuthConfig, MockProvider};

struct TestHarness {
    db: Database,
    provider: Arc<MockProvider>,
    sync: SyncService,
    user_id: Uuid,
}

async fn harness() -> TestHarness {
    let db = connect_test().await.expect("test database unavailable");
    let user_id = create_test_user(&db).await.expect("create user");

    let oauth = Arc::new(GoogleOAuthClient::new(GoogleOAuthConfig {
        client_id: "test".to_string(),
        client_secret: "test".to_string(),
        redirect_uri: "http://localhost/callback".to_string(),
    }));
    let provider = Arc::new(MockProvider::new());
    let credentials = CredentialResolver::new(db.clone(), oauth);
    let sync = SyncService::new(db.clone(), provider.clone(), credentials);

    TestHarness {
        db,
        provider,
        sync,
        user_id,
    }
}

fn snapshot(title: &str, text: &str, ranges: &[(Uuid, i32, i32)]) -> DocumentSnapshot {
    DocumentSnapshot {
        title: title.to_string(),
        text: text.to_string(),
        ranges: ranges
            .iter()
            .map(|(id, start, end)| {
                (
                    *id,
                    MarkerRange {
                        start: *start,
                        end: *end,
                    },
                )
            })
            .collect(),
        last_modified_at: None,
    }
}

async fn register_with_segment(
    h: &TestHarness,
    file_id: &str,
    content: &str,
) -> (Uuid, Uuid) {
    let document = h
        .db
        .documents
        .register(h.user_id, file_id, "Doc", None, None)
        .await
        .expect("register document");
    let category_id = h
        .db
        .categories
        .list(h.user_id)
        .await
        .expect("list categories")
        .first()
        .expect("seeded categories")
        .category
        .id;
    let segment = h
        .db
        .segments
        .create(
            h.user_id,
            CreateSegmentRequest {
                document_id: document.id,
                category_id,
                start_offset: 0,
                end_offset: content.chars().count() as i32,
                content: content.to_string(),
                title: None,
                tag_ids: Vec::new(),
            },
        )
        .await
        .expect("create segment");
    (document.id, segment.segment.id)
}

#[tokio::test]
#[ignore]
async fn test_reconciliation_updates_drifted_segment_and_is_idempotent() {
    let h = harness().await;
    let (document_id, segment_id) = register_with_segment(&h, "file-drift", "gas station hands").await;

    // The document grew a prefix: same text, new offsets and title.
    h.provider.set_snapshot(
        "file-drift",
        snapshot(
            "Set List v2",
            "NEW OPENER gas station hands",
            &[(segment_id, 11, 28)],
        ),
    );

    let first = h
        .sync
        .sync_document(h.user_id, document_id)
        .await
        .expect("first sync");
    assert_eq!(first.status, SyncStatus::Success);
    assert_eq!(first.repositioned_segments, 1);
    assert_eq!(first.updated_segments, 0);
    assert!(first.orphaned_segments.is_empty());

    let stored = h
        .db
        .segments
        .get(h.user_id, segment_id)
        .await
        .expect("segment");
    assert_eq!(stored.segment.start_offset, 11);
    assert_eq!(stored.segment.end_offset, 28);

    let document = h
        .db
        .documents
        .get(h.user_id, document_id)
        .await
        .expect("document");
    assert_eq!(document.title, "Set List v2");
    assert!(document.last_synced_at.is_some());

    // Second run with no external change: no work.
    let second = h
        .sync
        .sync_document(h.user_id, document_id)
        .await
        .expect("second sync");
    assert_eq!(second.updated_segments, 0);
    assert_eq!(second.repositioned_segments, 0);
    assert!(second.orphaned_segments.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_text_change_classification_beats_reposition() {
    let h = harness().await;
    let (document_id, segment_id) = register_with_segment(&h, "file-edit", "original punchline").await;

    h.provider.set_snapshot(
        "file-edit",
        snapshot("Doc", "xx rewritten punchline yy", &[(segment_id, 3, 22)]),
    );

    let result = h
        .sync
        .sync_document(h.user_id, document_id)
        .await
        .expect("sync");
    assert_eq!(result.updated_segments, 1);
    assert_eq!(result.repositioned_segments, 0);

    let stored = h.db.segments.get(h.user_id, segment_id).await.expect("segment");
    assert_eq!(stored.segment.content, "rewritten punchline");
}

#[tokio::test]
#[ignore]
async fn test_missing_marker_becomes_orphan_and_survives() {
    let h = harness().await;
    let (document_id, segment_id) = register_with_segment(&h, "file-orphan", "lost bit").await;

    // Live document has no range for the segment.
    h.provider
        .set_snapshot("file-orphan", snapshot("Doc", "totally different text", &[]));

    let result = h
        .sync
        .sync_document(h.user_id, document_id)
        .await
        .expect("sync");
    assert_eq!(result.orphaned_segments, vec![segment_id]);
    assert_eq!(result.conflicts.len(), 1);

    // The orphan is surfaced, never deleted or mutated.
    let stored = h.db.segments.get(h.user_id, segment_id).await.expect("segment");
    assert_eq!(stored.segment.content, "lost bit");
}

#[tokio::test]
#[ignore]
async fn test_access_lost_deactivates_without_error() {
    let h = harness().await;
    let (document_id, _) = register_with_segment(&h, "file-revoked", "bit").await;
    h.provider.revoke("file-revoked");

    let result = h
        .sync
        .sync_document(h.user_id, document_id)
        .await
        .expect("access loss is not an error");
    assert_eq!(result.status, SyncStatus::Failed);

    let document = h
        .db
        .documents
        .get(h.user_id, document_id)
        .await
        .expect("document");
    assert!(!document.is_active);
}

#[tokio::test]
#[ignore]
async fn test_folder_sync_registers_and_removes() {
    let h = harness().await;
    h.db
        .users
        .set_watch_folder(h.user_id, Some("folder-1"))
        .await
        .expect("set folder");

    // One already-registered document that left the folder, one new file.
    let (gone_doc_id, _) = register_with_segment(&h, "file-gone", "old bit").await;
    h.provider.set_folder(
        "folder-1",
        vec![ProviderFile {
            provider_file_id: "file-new".to_string(),
            title: "Fresh Doc".to_string(),
            last_modified_at: None,
        }],
    );
    h.provider
        .set_snapshot("file-new", snapshot("Fresh Doc", "new material", &[]));

    let result = h.sync.sync_folder(h.user_id).await.expect("folder sync");
    assert_eq!(result.documents_added, 1);
    assert_eq!(result.documents_removed, 1);
    assert_eq!(result.status, SyncStatus::Success);

    let gone = h
        .db
        .documents
        .get(h.user_id, gone_doc_id)
        .await
        .expect("document");
    assert!(!gone.is_active);

    // Sync history recorded.
    let logs = h.db.sync.recent_logs(h.user_id, 10).await.expect("logs");
    assert!(!logs.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_folder_sync_without_configuration_fails() {
    let h = harness().await;
    let err = h.sync.sync_folder(h.user_id).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
#[ignore]
async fn test_folder_sync_collects_per_document_errors() {
    let h = harness().await;
    h.db
        .users
        .set_watch_folder(h.user_id, Some("folder-2"))
        .await
        .expect("set folder");

    let (_healthy_doc, healthy_segment) =
        register_with_segment(&h, "file-ok", "good bit").await;
    let (broken_doc, _) = register_with_segment(&h, "file-broken", "bad bit").await;

    h.provider.set_folder(
        "folder-2",
        vec![
            ProviderFile {
                provider_file_id: "file-ok".to_string(),
                title: "OK".to_string(),
                last_modified_at: None,
            },
            ProviderFile {
                provider_file_id: "file-broken".to_string(),
                title: "Broken".to_string(),
                last_modified_at: None,
            },
        ],
    );
    h.provider.set_snapshot(
        "file-ok",
        snapshot("OK", "good bit", &[(healthy_segment, 0, 8)]),
    );
    h.provider.revoke("file-broken");

    let result = h.sync.sync_folder(h.user_id).await.expect("folder sync");

    // One failure does not abort the batch.
    assert_eq!(result.documents_synced, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].document_id, broken_doc);
    assert_eq!(result.status, SyncStatus::Partial);
}
