//! Full-text segment search with independent facets.
//!
//! One `SegmentFilterBuilder` predicate drives the main listing, the
//! total count, and both facet queries; each facet rebuilds the predicate
//! with its own dimension excluded so the UI can show "what if" counts.

use std::collections::HashMap;
use std::time::Instant;

use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use clipmark_core::{
    Error, FacetCount, Result, SearchHit, SearchRequest, SearchResponse, SearchSort,
    SortDirection, Tag,
};

use crate::segment_filter::{bind_params, FacetDimension, SegmentFilterBuilder};
use crate::segments::map_row_to_segment;
use crate::tags::map_row_to_tag;

/// Faceted full-text search over segments using PostgreSQL tsvector.
pub struct PgSegmentSearch {
    pool: Pool<Postgres>,
}

fn order_clause(sort: SearchSort, direction: SortDirection) -> String {
    let dir = match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    match sort {
        SearchSort::Relevance => format!("score {}, s.created_at DESC, s.id", dir),
        SearchSort::Created => format!("s.created_at {}, s.id", dir),
        SearchSort::Updated => format!("s.updated_at {}, s.id", dir),
    }
}

impl PgSegmentSearch {
    /// Create a new PgSegmentSearch with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Run a search: ranked hits, total count, and facet breakdowns.
    ///
    /// Read-only; identical calls against unchanged data return identical
    /// results.
    pub async fn search(&self, user_id: Uuid, req: &SearchRequest) -> Result<SearchResponse> {
        let start = Instant::now();
        let builder = SegmentFilterBuilder::from_request(user_id, req);
        let (limit, offset) = req.normalized_page();
        let (sort, direction) = req.effective_sort();

        let hits = self.fetch_hits(&builder, req, limit, offset, sort, direction).await?;
        let total = self.fetch_total(&builder).await?;
        let category_facets = self.fetch_category_facets(&builder).await?;
        let tag_facets = self.fetch_tag_facets(&builder).await?;

        debug!(
            subsystem = "search",
            component = "segment_search",
            op = "search",
            user_id = %user_id,
            result_count = hits.len(),
            total,
            duration_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(SearchResponse {
            hits,
            total,
            category_facets,
            tag_facets,
        })
    }

    async fn fetch_hits(
        &self,
        builder: &SegmentFilterBuilder,
        req: &SearchRequest,
        limit: i64,
        offset: i64,
        sort: SearchSort,
        direction: SortDirection,
    ) -> Result<Vec<SearchHit>> {
        // With a query, $1 is the query text for scoring/highlighting and
        // the builder's own clauses start after it. Without one, the score
        // is a constant zero and the snippet is a fixed-length prefix.
        let (select_extras, param_offset) = if builder.has_query() {
            (
                "ts_rank(s.search_vector, websearch_to_tsquery('english', $1)) AS score, \
                 ts_headline('english', s.content, websearch_to_tsquery('english', $1), \
                 'StartSel=<mark>, StopSel=</mark>, MaxWords=30, MinWords=10') AS snippet"
                    .to_string(),
                1,
            )
        } else {
            (
                format!(
                    "0.0::float4 AS score, left(s.content, {}) AS snippet",
                    clipmark_core::defaults::SNIPPET_PREFIX_CHARS
                ),
                0,
            )
        };

        let (where_clause, params) = builder.build(param_offset);
        let limit_idx = param_offset + params.len() + 1;

        let sql = format!(
            r#"
            SELECT s.*,
                   c.name AS category_name,
                   c.icon AS category_icon,
                   d.title AS document_title,
                   (SELECT COUNT(*) FROM segment_association a
                    WHERE a.source_segment_id = s.id OR a.target_segment_id = s.id
                   ) AS associations_count,
                   {select_extras}
            FROM segment s
            JOIN category c ON c.id = s.category_id
            JOIN document d ON d.id = s.document_id
            WHERE {where_clause}
            ORDER BY {order}
            LIMIT ${limit_idx} OFFSET ${offset_idx}
            "#,
            select_extras = select_extras,
            where_clause = where_clause,
            order = order_clause(sort, direction),
            limit_idx = limit_idx,
            offset_idx = limit_idx + 1,
        );

        let mut q = sqlx::query(&sql);
        if builder.has_query() {
            q = q.bind(req.query.trim());
        }
        q = bind_params(q, &params);
        q = q.bind(limit).bind(offset);

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;

        let segment_ids: Vec<Uuid> = rows.iter().map(|row| row.get("id")).collect();
        let mut tags_by_segment = self.tags_for_segments(&segment_ids).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let segment = map_row_to_segment(row);
                let tags = tags_by_segment.remove(&segment.id).unwrap_or_default();
                SearchHit {
                    category_name: row.get("category_name"),
                    category_icon: row.get("category_icon"),
                    document_title: row.get("document_title"),
                    associations_count: row.get("associations_count"),
                    snippet: row.get("snippet"),
                    score: row.get("score"),
                    segment,
                    tags,
                }
            })
            .collect())
    }

    /// Total rows matching the same predicate, independent of paging.
    async fn fetch_total(&self, builder: &SegmentFilterBuilder) -> Result<i64> {
        let (where_clause, params) = builder.build(0);
        let sql = format!("SELECT COUNT(*) AS total FROM segment s WHERE {}", where_clause);

        let row = bind_params(sqlx::query(&sql), &params)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.get("total"))
    }

    /// Category counts under every active filter except the category
    /// filter itself.
    async fn fetch_category_facets(&self, builder: &SegmentFilterBuilder) -> Result<Vec<FacetCount>> {
        let (where_clause, params) = builder.build_excluding(0, FacetDimension::Category);
        let sql = format!(
            r#"
            SELECT c.id, c.name, COUNT(*) AS count
            FROM segment s
            JOIN category c ON c.id = s.category_id
            WHERE {}
            GROUP BY c.id, c.name
            ORDER BY count DESC, c.name
            LIMIT {}
            "#,
            where_clause,
            clipmark_core::defaults::FACET_LIMIT,
        );

        let rows = bind_params(sqlx::query(&sql), &params)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|row| FacetCount {
                id: row.get("id"),
                name: row.get("name"),
                count: row.get("count"),
            })
            .collect())
    }

    /// Tag counts under every active filter except the tag filter itself.
    async fn fetch_tag_facets(&self, builder: &SegmentFilterBuilder) -> Result<Vec<FacetCount>> {
        let (where_clause, params) = builder.build_excluding(0, FacetDimension::Tag);
        let sql = format!(
            r#"
            SELECT t.id, t.name, COUNT(DISTINCT s.id) AS count
            FROM segment s
            JOIN segment_tag st ON st.segment_id = s.id
            JOIN tag t ON t.id = st.tag_id
            WHERE {}
            GROUP BY t.id, t.name
            ORDER BY count DESC, t.name
            LIMIT {}
            "#,
            where_clause,
            clipmark_core::defaults::FACET_LIMIT,
        );

        let rows = bind_params(sqlx::query(&sql), &params)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|row| FacetCount {
                id: row.get("id"),
                name: row.get("name"),
                count: row.get("count"),
            })
            .collect())
    }

    /// Batch-load tags for a page of hits.
    async fn tags_for_segments(
        &self,
        segment_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Tag>>> {
        if segment_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT st.segment_id, t.*
            FROM segment_tag st
            JOIN tag t ON t.id = st.tag_id
            WHERE st.segment_id = ANY($1::uuid[])
            ORDER BY t.name
            "#,
        )
        .bind(segment_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut by_segment: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in &rows {
            let segment_id: Uuid = row.get("segment_id");
            by_segment.entry(segment_id).or_default().push(map_row_to_tag(row));
        }
        Ok(by_segment)
    }
}
