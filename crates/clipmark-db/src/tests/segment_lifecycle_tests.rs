//! Segment lifecycle tests: creation, association cascade/promote,
//! category deletion rules.

use uuid::Uuid;

use clipmark_core::{
    AssociateRequest, AssociationType, CreateCategoryRequest, CreateSegmentRequest, Error,
};

use crate::test_fixtures::{connect_test, create_test_document, create_test_user};
use crate::Database;

async fn setup() -> (Database, Uuid, Uuid) {
    let db = connect_test().await.expect("test database unavailable");
    let user_id = create_test_user(&db).await.expect("create user");
    let document_id = create_test_document(&db, user_id).await.expect("create doc");
    (db, user_id, document_id)
}

async fn bit_category(db: &Database, user_id: Uuid) -> Uuid {
    db.categories
        .list(user_id)
        .await
        .expect("list categories")
        .into_iter()
        .find(|c| c.category.name == "Bit")
        .expect("seeded Bit category")
        .category
        .id
}

fn capture(document_id: Uuid, category_id: Uuid, content: &str) -> CreateSegmentRequest {
    CreateSegmentRequest {
        document_id,
        category_id,
        start_offset: 0,
        end_offset: content.chars().count() as i32,
        content: content.to_string(),
        title: None,
        tag_ids: Vec::new(),
    }
}

#[tokio::test]
#[ignore]
async fn test_create_segment_assigns_distinct_colors() {
    let (db, user_id, document_id) = setup().await;
    let category_id = bit_category(&db, user_id).await;

    let mut colors = std::collections::HashSet::new();
    for i in 0..10 {
        let detail = db
            .segments
            .create(user_id, capture(document_id, category_id, &format!("bit {}", i)))
            .await
            .expect("create segment");
        colors.insert(detail.segment.color.clone());
    }
    // First N segments over the default 10-color palette get N distinct colors.
    assert_eq!(colors.len(), 10);
}

#[tokio::test]
#[ignore]
async fn test_standalone_color_assignment_records_usage() {
    let (db, user_id, document_id) = setup().await;

    let color = db
        .colors
        .assign(user_id, document_id)
        .await
        .expect("assign color");
    assert_eq!(color.len(), 7);

    let usage = db.colors.usage_for(user_id).await.expect("usage history");
    let entry = usage
        .iter()
        .find(|u| u.color == color)
        .expect("assignment recorded");
    assert_eq!(entry.use_count, 1);
}

#[tokio::test]
#[ignore]
async fn test_offset_invariant_rejected_before_persistence() {
    let (db, user_id, document_id) = setup().await;
    let category_id = bit_category(&db, user_id).await;

    let mut req = capture(document_id, category_id, "text");
    req.start_offset = 8;
    req.end_offset = 8;

    let err = db.segments.create(user_id, req).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
#[ignore]
async fn test_callback_copy_inherits_category_and_color() {
    let (db, user_id, document_id) = setup().await;
    let category_id = bit_category(&db, user_id).await;

    let s1 = db
        .segments
        .create(user_id, capture(document_id, category_id, "gas station hands"))
        .await
        .expect("create s1");

    let (edge, copy) = db
        .segments
        .associate(
            user_id,
            s1.segment.id,
            AssociateRequest {
                association_type: AssociationType::Callback,
                target_segment_id: None,
                document_id: None,
                start_offset: None,
                end_offset: None,
            },
        )
        .await
        .expect("associate");

    let s2 = copy.expect("callback creates a copy");
    assert_eq!(edge.association_type, AssociationType::Callback);
    assert_eq!(s2.category_id, s1.segment.category_id);
    assert_eq!(s2.color, s1.segment.color);
    assert!(!s2.is_primary);
}

#[tokio::test]
#[ignore]
async fn test_delete_without_cascade_promotes_children() {
    let (db, user_id, document_id) = setup().await;
    let category_id = bit_category(&db, user_id).await;

    let s1 = db
        .segments
        .create(user_id, capture(document_id, category_id, "gas station hands"))
        .await
        .expect("create s1");
    let (_, copy) = db
        .segments
        .associate(
            user_id,
            s1.segment.id,
            AssociateRequest {
                association_type: AssociationType::Callback,
                target_segment_id: None,
                document_id: None,
                start_offset: None,
                end_offset: None,
            },
        )
        .await
        .expect("associate");
    let s2 = copy.unwrap();

    db.segments
        .delete(user_id, s1.segment.id, false)
        .await
        .expect("delete without cascade");

    let s2_after = db.segments.get(user_id, s2.id).await.expect("s2 survives");
    assert!(s2_after.segment.is_primary, "promoted to primary");
}

#[tokio::test]
#[ignore]
async fn test_delete_with_cascade_removes_children() {
    let (db, user_id, document_id) = setup().await;
    let category_id = bit_category(&db, user_id).await;

    let s1 = db
        .segments
        .create(user_id, capture(document_id, category_id, "gas station hands"))
        .await
        .expect("create s1");
    let (_, copy) = db
        .segments
        .associate(
            user_id,
            s1.segment.id,
            AssociateRequest {
                association_type: AssociationType::Callback,
                target_segment_id: None,
                document_id: None,
                start_offset: None,
                end_offset: None,
            },
        )
        .await
        .expect("associate");
    let s2 = copy.unwrap();

    db.segments
        .delete(user_id, s1.segment.id, true)
        .await
        .expect("delete with cascade");

    let err = db.segments.get(user_id, s2.id).await.unwrap_err();
    assert!(matches!(err, Error::SegmentNotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_category_deletion_requires_migration_target() {
    let (db, user_id, document_id) = setup().await;
    let category_id = bit_category(&db, user_id).await;

    db.segments
        .create(user_id, capture(document_id, category_id, "joke"))
        .await
        .expect("create segment");

    // Non-empty category without migrate_to: business-rule error.
    let err = db
        .categories
        .delete(user_id, category_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // Self-migration rejected.
    let err = db
        .categories
        .delete(user_id, category_id, Some(category_id))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // Valid target reassigns and succeeds.
    let other = db
        .categories
        .create(
            user_id,
            CreateCategoryRequest {
                name: "Archive".to_string(),
                icon: None,
                sort_order: None,
            },
        )
        .await
        .expect("create target category");

    db.categories
        .delete(user_id, category_id, Some(other.id))
        .await
        .expect("delete with migration");

    let segments = db
        .segments
        .list_for_document(user_id, document_id)
        .await
        .expect("list");
    assert!(segments.iter().all(|s| s.category_id == other.id));
}
