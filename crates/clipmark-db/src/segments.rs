//! Segment repository implementation.

use sqlx::{Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use clipmark_core::{
    new_v7, validate_offsets, AssociateRequest, AssociationDirection, AssociationLink,
    AssociationType, CreateSegmentRequest, Error, Result, Segment, SegmentAssociation,
    SegmentDetail, Tag, UpdateMarkersRequest, UpdateSegmentRequest,
};

use crate::colors::{pick_color_tx, record_usage_tx};
use crate::tags::map_row_to_tag;

/// PostgreSQL implementation of the segment repository.
pub struct PgSegmentRepository {
    pool: Pool<Postgres>,
}

pub(crate) fn map_row_to_segment(row: &sqlx::postgres::PgRow) -> Segment {
    Segment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        document_id: row.get("document_id"),
        category_id: row.get("category_id"),
        start_offset: row.get("start_offset"),
        end_offset: row.get("end_offset"),
        content: row.get("content"),
        title: row.get("title"),
        color: row.get("color"),
        is_primary: row.get("is_primary"),
        word_count: row.get("word_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn map_row_to_association(row: &sqlx::postgres::PgRow) -> Result<SegmentAssociation> {
    let type_str: String = row.get("association_type");
    let association_type = AssociationType::parse(&type_str)
        .ok_or_else(|| Error::Internal(format!("unknown association type: {}", type_str)))?;
    Ok(SegmentAssociation {
        id: row.get("id"),
        source_segment_id: row.get("source_segment_id"),
        target_segment_id: row.get("target_segment_id"),
        association_type,
        created_at: row.get("created_at"),
    })
}

impl PgSegmentRepository {
    /// Create a new PgSegmentRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Verify every tag id belongs to the user, then attach them.
    async fn attach_tags_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        segment_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<()> {
        for tag_id in tag_ids {
            let result = sqlx::query(
                r#"
                INSERT INTO segment_tag (segment_id, tag_id)
                SELECT $1, id FROM tag WHERE id = $2 AND user_id = $3
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(segment_id)
            .bind(tag_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
            if result.rows_affected() == 0 {
                // Either the tag doesn't exist/isn't owned, or it's already
                // attached; distinguish to keep the error honest.
                let owned: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM tag WHERE id = $1 AND user_id = $2)",
                )
                .bind(tag_id)
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await
                .map_err(Error::Database)?;
                if !owned {
                    return Err(Error::NotFound(format!("tag {}", tag_id)));
                }
            }
        }
        Ok(())
    }

    /// Create a segment by explicit capture.
    ///
    /// One transaction: ownership checks, color assignment (usage recorded
    /// as part of the same transaction), insert, tag attachment.
    pub async fn create(&self, user_id: Uuid, req: CreateSegmentRequest) -> Result<SegmentDetail> {
        validate_offsets(req.start_offset, req.end_offset)?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let document_owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM document WHERE id = $1 AND user_id = $2 AND is_active)",
        )
        .bind(req.document_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;
        if !document_owned {
            return Err(Error::DocumentNotFound(req.document_id));
        }

        let category_owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM category WHERE id = $1 AND user_id = $2)",
        )
        .bind(req.category_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;
        if !category_owned {
            return Err(Error::NotFound(format!("category {}", req.category_id)));
        }

        let color = pick_color_tx(&mut tx, user_id, req.document_id).await?;
        record_usage_tx(&mut tx, user_id, &color).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO segment (
                id, user_id, document_id, category_id,
                start_offset, end_offset, content, title, color, is_primary
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE)
            RETURNING *
            "#,
        )
        .bind(new_v7())
        .bind(user_id)
        .bind(req.document_id)
        .bind(req.category_id)
        .bind(req.start_offset)
        .bind(req.end_offset)
        .bind(&req.content)
        .bind(&req.title)
        .bind(&color)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;
        let segment = map_row_to_segment(&row);

        Self::attach_tags_tx(&mut tx, user_id, segment.id, &req.tag_ids).await?;

        tx.commit().await.map_err(Error::Database)?;

        self.get(user_id, segment.id).await
    }

    /// Fetch a segment with tags and association count.
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<SegmentDetail> {
        let row = sqlx::query("SELECT * FROM segment WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::SegmentNotFound(id))?;
        let segment = map_row_to_segment(&row);

        let tags = self.tags_for(id).await?;
        let associations_count = self.associations_count(id).await?;

        Ok(SegmentDetail {
            segment,
            tags,
            associations_count,
        })
    }

    /// Tags attached to a segment, name-ordered.
    pub async fn tags_for(&self, segment_id: Uuid) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            r#"
            SELECT t.* FROM tag t
            JOIN segment_tag st ON st.tag_id = t.id
            WHERE st.segment_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(segment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(map_row_to_tag).collect())
    }

    /// Count of association edges touching a segment, either direction.
    pub async fn associations_count(&self, segment_id: Uuid) -> Result<i64> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM segment_association
            WHERE source_segment_id = $1 OR target_segment_id = $1
            "#,
        )
        .bind(segment_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)
    }

    /// All segments of a document. Reconciliation input.
    pub async fn list_for_document(&self, user_id: Uuid, document_id: Uuid) -> Result<Vec<Segment>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM segment
            WHERE document_id = $1 AND user_id = $2
            ORDER BY start_offset
            "#,
        )
        .bind(document_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(map_row_to_segment).collect())
    }

    /// Update segment fields (title, category, user-edited content).
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: UpdateSegmentRequest,
    ) -> Result<Segment> {
        if let Some(category_id) = req.category_id {
            let owned: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM category WHERE id = $1 AND user_id = $2)",
            )
            .bind(category_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
            if !owned {
                return Err(Error::NotFound(format!("category {}", category_id)));
            }
        }

        let row = sqlx::query(
            r#"
            UPDATE segment SET
                category_id = COALESCE($3, category_id),
                title = COALESCE($4, title),
                content = COALESCE($5, content)
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(req.category_id)
        .bind(&req.title)
        .bind(&req.content)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::SegmentNotFound(id))?;

        Ok(map_row_to_segment(&row))
    }

    /// Update a segment's marker: offsets plus re-sliced text.
    pub async fn update_markers(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: UpdateMarkersRequest,
    ) -> Result<Segment> {
        validate_offsets(req.start_offset, req.end_offset)?;

        let row = sqlx::query(
            r#"
            UPDATE segment SET
                start_offset = $3,
                end_offset = $4,
                content = $5
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(req.start_offset)
        .bind(req.end_offset)
        .bind(&req.content)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::SegmentNotFound(id))?;

        Ok(map_row_to_segment(&row))
    }

    /// Replace the segment's tag set in one transaction.
    pub async fn replace_tags(&self, user_id: Uuid, id: Uuid, tag_ids: &[Uuid]) -> Result<Vec<Tag>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM segment WHERE id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;
        if !owned {
            return Err(Error::SegmentNotFound(id));
        }

        sqlx::query("DELETE FROM segment_tag WHERE segment_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        Self::attach_tags_tx(&mut tx, user_id, id, tag_ids).await?;

        tx.commit().await.map_err(Error::Database)?;

        self.tags_for(id).await
    }

    /// Delete a segment.
    ///
    /// Association-created children (non-primary targets of this segment's
    /// outgoing edges) are deleted too when `cascade_associations` is set;
    /// otherwise they are promoted to primary and survive. Edges cascade
    /// with the row either way.
    pub async fn delete(&self, user_id: Uuid, id: Uuid, cascade_associations: bool) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM segment WHERE id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;
        if !owned {
            return Err(Error::SegmentNotFound(id));
        }

        if cascade_associations {
            sqlx::query(
                r#"
                DELETE FROM segment WHERE id IN (
                    SELECT target_segment_id FROM segment_association
                    WHERE source_segment_id = $1
                ) AND is_primary = FALSE AND user_id = $2
                "#,
            )
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        } else {
            sqlx::query(
                r#"
                UPDATE segment SET is_primary = TRUE WHERE id IN (
                    SELECT target_segment_id FROM segment_association
                    WHERE source_segment_id = $1
                ) AND is_primary = FALSE AND user_id = $2
                "#,
            )
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        sqlx::query("DELETE FROM segment WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    /// Associate a segment with another.
    ///
    /// Copy-creating kinds (derivative, callback) without an explicit
    /// target materialize a non-primary copy inheriting the source's
    /// category and color. Direct children only, no propagation through
    /// the wider association graph. Returns the edge and the copy if one
    /// was created.
    pub async fn associate(
        &self,
        user_id: Uuid,
        source_id: Uuid,
        req: AssociateRequest,
    ) -> Result<(SegmentAssociation, Option<Segment>)> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let source_row = sqlx::query("SELECT * FROM segment WHERE id = $1 AND user_id = $2")
            .bind(source_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::SegmentNotFound(source_id))?;
        let source = map_row_to_segment(&source_row);

        let (target_id, created) = match req.target_segment_id {
            Some(target_id) => {
                if target_id == source_id {
                    return Err(Error::InvalidInput(
                        "cannot associate a segment with itself".to_string(),
                    ));
                }
                let owned: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM segment WHERE id = $1 AND user_id = $2)",
                )
                .bind(target_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
                if !owned {
                    return Err(Error::SegmentNotFound(target_id));
                }
                (target_id, None)
            }
            None => {
                if !req.association_type.creates_copy() {
                    return Err(Error::InvalidInput(format!(
                        "association type '{}' requires target_segment_id",
                        req.association_type.as_str()
                    )));
                }

                let document_id = req.document_id.unwrap_or(source.document_id);
                let start_offset = req.start_offset.unwrap_or(source.start_offset);
                let end_offset = req.end_offset.unwrap_or(source.end_offset);
                validate_offsets(start_offset, end_offset)?;

                let document_owned: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM document WHERE id = $1 AND user_id = $2 AND is_active)",
                )
                .bind(document_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
                if !document_owned {
                    return Err(Error::DocumentNotFound(document_id));
                }

                // The copy inherits category and color from its source.
                let row = sqlx::query(
                    r#"
                    INSERT INTO segment (
                        id, user_id, document_id, category_id,
                        start_offset, end_offset, content, title, color, is_primary
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE)
                    RETURNING *
                    "#,
                )
                .bind(new_v7())
                .bind(user_id)
                .bind(document_id)
                .bind(source.category_id)
                .bind(start_offset)
                .bind(end_offset)
                .bind(&source.content)
                .bind(&source.title)
                .bind(&source.color)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
                let copy = map_row_to_segment(&row);
                (copy.id, Some(copy))
            }
        };

        let edge_row = sqlx::query(
            r#"
            INSERT INTO segment_association (id, source_segment_id, target_segment_id, association_type)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new_v7())
        .bind(source_id)
        .bind(target_id)
        .bind(req.association_type.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;
        let association = map_row_to_association(&edge_row)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok((association, created))
    }

    /// List a segment's associations in both directions, with the segment
    /// at the other end of each edge.
    pub async fn list_associations(&self, user_id: Uuid, id: Uuid) -> Result<Vec<AssociationLink>> {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM segment WHERE id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        if !owned {
            return Err(Error::SegmentNotFound(id));
        }

        // Association columns aliased so they don't collide with s.*.
        let rows = sqlx::query(
            r#"
            SELECT a.id AS association_id,
                   a.source_segment_id, a.target_segment_id, a.association_type,
                   a.created_at AS association_created_at,
                   s.*
            FROM segment_association a
            JOIN segment s
              ON s.id = CASE WHEN a.source_segment_id = $1
                             THEN a.target_segment_id
                             ELSE a.source_segment_id END
            WHERE a.source_segment_id = $1 OR a.target_segment_id = $1
            ORDER BY a.created_at
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                let type_str: String = row.get("association_type");
                let association_type = AssociationType::parse(&type_str).ok_or_else(|| {
                    Error::Internal(format!("unknown association type: {}", type_str))
                })?;
                let association = SegmentAssociation {
                    id: row.get("association_id"),
                    source_segment_id: row.get("source_segment_id"),
                    target_segment_id: row.get("target_segment_id"),
                    association_type,
                    created_at: row.get("association_created_at"),
                };
                let direction = if association.source_segment_id == id {
                    AssociationDirection::Outgoing
                } else {
                    AssociationDirection::Incoming
                };
                Ok(AssociationLink {
                    direction,
                    segment: map_row_to_segment(row),
                    association,
                })
            })
            .collect()
    }
}
