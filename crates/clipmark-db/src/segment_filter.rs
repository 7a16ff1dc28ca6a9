//! Composable predicate builder for segment search and faceting.
//!
//! Every active filter becomes one named clause owning its own parameter
//! bindings, so SQL assembly never juggles parameter indices by hand. The
//! same builder produces the main WHERE predicate, the count predicate,
//! and, via [`SegmentFilterBuilder::build_excluding`], the facet
//! predicates, which reuse every clause except the facet's own dimension.

use uuid::Uuid;

use clipmark_core::{SearchFilters, SearchRequest, TagLogic};

/// Type-safe parameter binding for SQL queries.
#[derive(Debug, Clone)]
pub enum QueryParam {
    /// Single UUID parameter.
    Uuid(Uuid),
    /// Array of UUIDs (for ANY operations).
    UuidArray(Vec<Uuid>),
    /// Integer parameter.
    Int(i64),
    /// Timestamp parameter.
    Timestamp(chrono::DateTime<chrono::Utc>),
    /// Boolean parameter.
    Bool(bool),
    /// String parameter.
    String(String),
}

/// A filter dimension that facet computation can exclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetDimension {
    Category,
    Tag,
}

/// One named WHERE clause with its own parameters.
///
/// `sql` contains `{}` placeholders, one per parameter, replaced with
/// `$n` at assembly time.
struct FilterClause {
    dimension: Option<FacetDimension>,
    sql: &'static str,
    params: Vec<QueryParam>,
}

/// Generates owner-scoped WHERE fragments for segment queries.
///
/// The owner-id clause is always present; the base predicate can never
/// be assembled without it.
pub struct SegmentFilterBuilder {
    user_id: Uuid,
    query: String,
    filters: SearchFilters,
}

impl SegmentFilterBuilder {
    /// Build from a search request for the given owner.
    pub fn from_request(user_id: Uuid, req: &SearchRequest) -> Self {
        Self {
            user_id,
            query: req.query.trim().to_string(),
            filters: req.filters.clone(),
        }
    }

    /// Whether a non-empty text query is part of the predicate.
    pub fn has_query(&self) -> bool {
        !self.query.is_empty()
    }

    /// Build the full WHERE fragment with all clauses active.
    ///
    /// `param_offset` is the number of parameters already bound before
    /// this fragment. Returns the SQL and the parameters in order.
    pub fn build(&self, param_offset: usize) -> (String, Vec<QueryParam>) {
        self.assemble(param_offset, None)
    }

    /// Build the WHERE fragment with one facet dimension excluded.
    ///
    /// Category facet counts reflect all other active filters but ignore
    /// any category filter, and symmetrically for tags.
    pub fn build_excluding(
        &self,
        param_offset: usize,
        exclude: FacetDimension,
    ) -> (String, Vec<QueryParam>) {
        self.assemble(param_offset, Some(exclude))
    }

    fn clauses(&self) -> Vec<FilterClause> {
        let mut clauses = vec![FilterClause {
            dimension: None,
            sql: "s.user_id = {}",
            params: vec![QueryParam::Uuid(self.user_id)],
        }];

        if !self.query.is_empty() {
            clauses.push(FilterClause {
                dimension: None,
                sql: "s.search_vector @@ websearch_to_tsquery('english', {})",
                params: vec![QueryParam::String(self.query.clone())],
            });
        }

        if !self.filters.category_ids.is_empty() {
            clauses.push(FilterClause {
                dimension: Some(FacetDimension::Category),
                sql: "s.category_id = ANY({}::uuid[])",
                params: vec![QueryParam::UuidArray(self.filters.category_ids.clone())],
            });
        }

        if !self.filters.tag_ids.is_empty() {
            match self.filters.tag_logic {
                // OR: at least one of the given tags.
                TagLogic::Or => clauses.push(FilterClause {
                    dimension: Some(FacetDimension::Tag),
                    sql: "EXISTS (SELECT 1 FROM segment_tag st WHERE st.segment_id = s.id \
                          AND st.tag_id = ANY({}::uuid[]))",
                    params: vec![QueryParam::UuidArray(self.filters.tag_ids.clone())],
                }),
                // AND: the count of distinct matched tags must equal the
                // filter set's size.
                TagLogic::And => clauses.push(FilterClause {
                    dimension: Some(FacetDimension::Tag),
                    sql: "(SELECT COUNT(DISTINCT st.tag_id) FROM segment_tag st \
                          WHERE st.segment_id = s.id AND st.tag_id = ANY({}::uuid[])) = {}",
                    params: vec![
                        QueryParam::UuidArray(self.filters.tag_ids.clone()),
                        QueryParam::Int(self.filters.tag_ids.len() as i64),
                    ],
                }),
            }
        }

        if !self.filters.document_ids.is_empty() {
            clauses.push(FilterClause {
                dimension: None,
                sql: "s.document_id = ANY({}::uuid[])",
                params: vec![QueryParam::UuidArray(self.filters.document_ids.clone())],
            });
        }

        if let Some(is_primary) = self.filters.is_primary {
            clauses.push(FilterClause {
                dimension: None,
                sql: "s.is_primary = {}",
                params: vec![QueryParam::Bool(is_primary)],
            });
        }

        if let Some(after) = self.filters.created_after {
            clauses.push(FilterClause {
                dimension: None,
                sql: "s.created_at >= {}",
                params: vec![QueryParam::Timestamp(after)],
            });
        }

        if let Some(before) = self.filters.created_before {
            clauses.push(FilterClause {
                dimension: None,
                sql: "s.created_at <= {}",
                params: vec![QueryParam::Timestamp(before)],
            });
        }

        clauses
    }

    fn assemble(
        &self,
        param_offset: usize,
        exclude: Option<FacetDimension>,
    ) -> (String, Vec<QueryParam>) {
        let mut fragments = Vec::new();
        let mut params = Vec::new();
        let mut param_idx = param_offset;

        for clause in self.clauses() {
            if clause.dimension.is_some() && clause.dimension == exclude {
                continue;
            }
            let mut sql = String::from(clause.sql);
            for param in clause.params {
                param_idx += 1;
                sql = sql.replacen("{}", &format!("${}", param_idx), 1);
                params.push(param);
            }
            fragments.push(sql);
        }

        (fragments.join(" AND "), params)
    }
}

/// Bind a parameter list to a query in order.
pub fn bind_params<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    params: &'q [QueryParam],
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    for param in params {
        q = match param {
            QueryParam::Uuid(id) => q.bind(*id),
            QueryParam::UuidArray(ids) => q.bind(ids),
            QueryParam::Int(val) => q.bind(*val),
            QueryParam::Timestamp(ts) => q.bind(*ts),
            QueryParam::Bool(b) => q.bind(*b),
            QueryParam::String(s) => q.bind(s),
        };
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clipmark_core::SortDirection;

    fn request(query: &str, filters: SearchFilters) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            filters,
            limit: None,
            offset: None,
            sort: Default::default(),
            direction: SortDirection::Desc,
        }
    }

    #[test]
    fn test_owner_clause_always_present() {
        let user_id = Uuid::new_v4();
        let builder = SegmentFilterBuilder::from_request(user_id, &request("", Default::default()));
        let (sql, params) = builder.build(0);

        assert_eq!(sql, "s.user_id = $1");
        assert_eq!(params.len(), 1);
        assert!(matches!(params[0], QueryParam::Uuid(id) if id == user_id));
    }

    #[test]
    fn test_param_offset_shifts_indices() {
        let builder = SegmentFilterBuilder::from_request(
            Uuid::new_v4(),
            &request("gas station", Default::default()),
        );
        let (sql, params) = builder.build(2);

        assert_eq!(
            sql,
            "s.user_id = $3 AND s.search_vector @@ websearch_to_tsquery('english', $4)"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_all_filters_compose_with_and() {
        let now = Utc::now();
        let filters = SearchFilters {
            category_ids: vec![Uuid::new_v4()],
            tag_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            tag_logic: TagLogic::Or,
            document_ids: vec![Uuid::new_v4()],
            is_primary: Some(true),
            created_after: Some(now),
            created_before: Some(now),
        };
        let builder = SegmentFilterBuilder::from_request(Uuid::new_v4(), &request("q", filters));
        let (sql, params) = builder.build(0);

        // owner + query + category + tag + document + primary + 2 dates
        assert_eq!(params.len(), 8);
        assert_eq!(sql.matches(" AND ").count(), 7);
        // Parameter numbering is dense and ordered.
        for i in 1..=8 {
            assert!(sql.contains(&format!("${}", i)), "missing ${} in {}", i, sql);
        }
        assert!(!sql.contains("$9"));
    }

    #[test]
    fn test_tag_and_logic_counts_distinct_matches() {
        let tag_ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let filters = SearchFilters {
            tag_ids: tag_ids.clone(),
            tag_logic: TagLogic::And,
            ..Default::default()
        };
        let builder = SegmentFilterBuilder::from_request(Uuid::new_v4(), &request("", filters));
        let (sql, params) = builder.build(0);

        assert!(sql.contains("COUNT(DISTINCT st.tag_id)"));
        assert!(sql.ends_with("= $3"));
        assert!(matches!(params[2], QueryParam::Int(3)));
    }

    #[test]
    fn test_tag_or_logic_uses_exists() {
        let filters = SearchFilters {
            tag_ids: vec![Uuid::new_v4()],
            tag_logic: TagLogic::Or,
            ..Default::default()
        };
        let builder = SegmentFilterBuilder::from_request(Uuid::new_v4(), &request("", filters));
        let (sql, _) = builder.build(0);

        assert!(sql.contains("EXISTS (SELECT 1 FROM segment_tag"));
        assert!(!sql.contains("COUNT(DISTINCT"));
    }

    #[test]
    fn test_category_facet_excludes_only_category_clause() {
        let filters = SearchFilters {
            category_ids: vec![Uuid::new_v4()],
            tag_ids: vec![Uuid::new_v4()],
            tag_logic: TagLogic::Or,
            ..Default::default()
        };
        let builder =
            SegmentFilterBuilder::from_request(Uuid::new_v4(), &request("joke", filters));

        let (full_sql, full_params) = builder.build(0);
        let (facet_sql, facet_params) = builder.build_excluding(0, FacetDimension::Category);

        assert!(full_sql.contains("s.category_id = ANY"));
        assert!(!facet_sql.contains("s.category_id = ANY"));
        // The tag clause and text clause survive.
        assert!(facet_sql.contains("segment_tag"));
        assert!(facet_sql.contains("websearch_to_tsquery"));
        assert_eq!(facet_params.len(), full_params.len() - 1);
    }

    #[test]
    fn test_tag_facet_excludes_only_tag_clause() {
        let filters = SearchFilters {
            category_ids: vec![Uuid::new_v4()],
            tag_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            tag_logic: TagLogic::And,
            ..Default::default()
        };
        let builder = SegmentFilterBuilder::from_request(Uuid::new_v4(), &request("", filters));

        let (facet_sql, facet_params) = builder.build_excluding(0, FacetDimension::Tag);

        assert!(!facet_sql.contains("segment_tag"));
        assert!(facet_sql.contains("s.category_id = ANY"));
        // owner + category only; AND-logic tag clause dropped both params.
        assert_eq!(facet_params.len(), 2);
        // Indices renumber densely after the exclusion.
        assert!(facet_sql.contains("$1") && facet_sql.contains("$2"));
        assert!(!facet_sql.contains("$3"));
    }

    #[test]
    fn test_blank_query_adds_no_text_clause() {
        let builder =
            SegmentFilterBuilder::from_request(Uuid::new_v4(), &request("   ", Default::default()));
        let (sql, params) = builder.build(0);

        assert!(!sql.contains("websearch_to_tsquery"));
        assert_eq!(params.len(), 1);
        assert!(!builder.has_query());
    }
}
