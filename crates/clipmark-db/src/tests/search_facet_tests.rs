//! Search and facet tests: AND/OR tag logic and facet independence.

use uuid::Uuid;

use clipmark_core::{
    CreateSegmentRequest, SearchFilters, SearchRequest, TagLogic,
};

use crate::test_fixtures::{connect_test, create_test_document, create_test_user};
use crate::Database;

async fn setup() -> (Database, Uuid, Uuid, Uuid) {
    let db = connect_test().await.expect("test database unavailable");
    let user_id = create_test_user(&db).await.expect("create user");
    let document_id = create_test_document(&db, user_id).await.expect("create doc");
    let category_id = db
        .categories
        .list(user_id)
        .await
        .expect("list categories")
        .first()
        .expect("seeded categories")
        .category
        .id;
    (db, user_id, document_id, category_id)
}

async fn tagged_segment(
    db: &Database,
    user_id: Uuid,
    document_id: Uuid,
    category_id: Uuid,
    content: &str,
    tag_ids: Vec<Uuid>,
) -> Uuid {
    db.segments
        .create(
            user_id,
            CreateSegmentRequest {
                document_id,
                category_id,
                start_offset: 0,
                end_offset: content.chars().count() as i32,
                content: content.to_string(),
                title: None,
                tag_ids,
            },
        )
        .await
        .expect("create segment")
        .segment
        .id
}

#[tokio::test]
#[ignore]
async fn test_tag_and_logic_requires_all_tags() {
    let (db, user_id, document_id, category_id) = setup().await;

    let a = db.tags.create(user_id, "opener", None).await.expect("tag a").id;
    let b = db.tags.create(user_id, "closer", None).await.expect("tag b").id;
    let c = db.tags.create(user_id, "riff", None).await.expect("tag c").id;

    let abc = tagged_segment(&db, user_id, document_id, category_id, "all three", vec![a, b, c])
        .await;
    let _only_a =
        tagged_segment(&db, user_id, document_id, category_id, "just one", vec![a]).await;

    let req = SearchRequest {
        filters: SearchFilters {
            tag_ids: vec![a, b],
            tag_logic: TagLogic::And,
            ..Default::default()
        },
        ..Default::default()
    };
    let response = db.search.search(user_id, &req).await.expect("search");

    // {a,b,c} matches {a,b} under AND; {a} alone does not.
    assert_eq!(response.total, 1);
    assert_eq!(response.hits[0].segment.id, abc);

    let req = SearchRequest {
        filters: SearchFilters {
            tag_ids: vec![a, b],
            tag_logic: TagLogic::Or,
            ..Default::default()
        },
        ..Default::default()
    };
    let response = db.search.search(user_id, &req).await.expect("search");
    assert_eq!(response.total, 2);
}

#[tokio::test]
#[ignore]
async fn test_facets_ignore_their_own_dimension() {
    let (db, user_id, document_id, category_id) = setup().await;

    let other_category = db
        .categories
        .list(user_id)
        .await
        .expect("list")
        .iter()
        .map(|c| c.category.id)
        .find(|id| *id != category_id)
        .expect("second seeded category");

    let tag = db.tags.create(user_id, "crowd", None).await.expect("tag").id;

    tagged_segment(&db, user_id, document_id, category_id, "in bit", vec![tag]).await;
    tagged_segment(&db, user_id, document_id, other_category, "in idea", vec![tag]).await;

    // Main results narrowed to one category.
    let filtered = SearchRequest {
        filters: SearchFilters {
            category_ids: vec![category_id],
            ..Default::default()
        },
        ..Default::default()
    };
    let with_filter = db.search.search(user_id, &filtered).await.expect("search");
    assert_eq!(with_filter.total, 1);

    // The tag facet ignores the category filter: both segments count.
    let tag_facet = with_filter
        .tag_facets
        .iter()
        .find(|f| f.id == tag)
        .expect("tag facet present");
    assert_eq!(tag_facet.count, 2);

    // And the category facet still shows both categories for refinement.
    assert!(with_filter.category_facets.iter().any(|f| f.id == other_category));

    // Tag facets match an unfiltered search's tag facets exactly.
    let unfiltered = db
        .search
        .search(user_id, &SearchRequest::default())
        .await
        .expect("search");
    assert_eq!(with_filter.tag_facets, unfiltered.tag_facets);
}

#[tokio::test]
#[ignore]
async fn test_full_text_ranking_and_snippet() {
    let (db, user_id, document_id, category_id) = setup().await;

    tagged_segment(
        &db,
        user_id,
        document_id,
        category_id,
        "the gas station attendant stared at my hands",
        vec![],
    )
    .await;
    tagged_segment(&db, user_id, document_id, category_id, "unrelated material", vec![]).await;

    let req = SearchRequest {
        query: "gas station".to_string(),
        ..Default::default()
    };
    let response = db.search.search(user_id, &req).await.expect("search");

    assert_eq!(response.total, 1);
    let hit = &response.hits[0];
    assert!(hit.score > 0.0);
    assert!(hit.snippet.contains("<mark>"));

    // Empty query: match-all, zero scores, prefix snippets.
    let response = db
        .search
        .search(user_id, &SearchRequest::default())
        .await
        .expect("search");
    assert_eq!(response.total, 2);
    assert!(response.hits.iter().all(|h| h.score == 0.0));
    assert!(response.hits.iter().all(|h| !h.snippet.contains("<mark>")));
}
