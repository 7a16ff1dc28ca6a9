//! Tag repository implementation.

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use clipmark_core::{new_v7, Error, Result, Tag, TagType};

use crate::escape_like;

/// Validate a tag name.
///
/// Rules:
/// - Length between 1-100 characters
/// - Allowed characters: alphanumeric, spaces, hyphens (-), underscores (_)
pub fn validate_tag_name(tag: &str) -> std::result::Result<(), String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Err("Tag name cannot be empty".to_string());
    }
    if trimmed.len() > 100 {
        return Err("Tag name must be 100 characters or less".to_string());
    }

    let invalid_chars: Vec<char> = trimmed
        .chars()
        .filter(|c| !c.is_alphanumeric() && *c != '-' && *c != '_' && *c != ' ')
        .collect();

    if !invalid_chars.is_empty() {
        let chars_display: String = invalid_chars
            .iter()
            .take(5)
            .map(|c| format!("'{}'", c))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(format!(
            "Tag contains invalid characters: {}. Only alphanumeric characters, spaces, hyphens, and underscores are allowed",
            chars_display
        ));
    }

    Ok(())
}

/// PostgreSQL implementation of the tag repository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

pub(crate) fn map_row_to_tag(row: &sqlx::postgres::PgRow) -> Tag {
    let tag_type: Option<String> = row.get("tag_type");
    Tag {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        tag_type: tag_type.as_deref().and_then(TagType::parse),
        created_at: row.get("created_at"),
    }
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create a tag. Duplicate names per user surface as Conflict.
    pub async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        tag_type: Option<TagType>,
    ) -> Result<Tag> {
        validate_tag_name(name).map_err(Error::InvalidInput)?;

        let row = sqlx::query(
            r#"
            INSERT INTO tag (id, user_id, name, tag_type)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new_v7())
        .bind(user_id)
        .bind(name.trim())
        .bind(tag_type.map(|t| t.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(map_row_to_tag(&row))
    }

    /// Create any of the given names that don't exist yet, returning the
    /// full tag rows for all of them. One transaction.
    pub async fn bulk_create(&self, user_id: Uuid, names: &[String]) -> Result<Vec<Tag>> {
        for name in names {
            validate_tag_name(name).map_err(Error::InvalidInput)?;
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut tags = Vec::with_capacity(names.len());

        for name in names {
            let row = sqlx::query(
                r#"
                INSERT INTO tag (id, user_id, name)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
                RETURNING *
                "#,
            )
            .bind(new_v7())
            .bind(user_id)
            .bind(name.trim())
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;
            tags.push(map_row_to_tag(&row));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(tags)
    }

    /// List all of a user's tags with their segment counts.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<(Tag, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT t.*,
                   (SELECT COUNT(*) FROM segment_tag st WHERE st.tag_id = t.id) AS segment_count
            FROM tag t
            WHERE t.user_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let count: i64 = row.get("segment_count");
                (map_row_to_tag(&row), count)
            })
            .collect())
    }

    /// Prefix autocomplete, case-insensitive, capped.
    pub async fn autocomplete(&self, user_id: Uuid, prefix: &str, limit: i64) -> Result<Vec<Tag>> {
        let pattern = format!("{}%", escape_like(prefix.trim()));
        let rows = sqlx::query(
            r#"
            SELECT * FROM tag
            WHERE user_id = $1 AND name ILIKE $2 ESCAPE '\'
            ORDER BY name
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(pattern)
        .bind(limit.clamp(1, 50))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(map_row_to_tag).collect())
    }

    /// Rename a tag or change its type.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        name: Option<&str>,
        tag_type: Option<Option<TagType>>,
    ) -> Result<Tag> {
        if let Some(name) = name {
            validate_tag_name(name).map_err(Error::InvalidInput)?;
        }

        // tag_type is a double Option: None leaves it alone, Some(None) clears.
        let row = match tag_type {
            None => sqlx::query(
                r#"
                UPDATE tag SET name = COALESCE($3, name)
                WHERE id = $1 AND user_id = $2
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(user_id)
            .bind(name.map(str::trim))
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?,
            Some(new_type) => sqlx::query(
                r#"
                UPDATE tag SET name = COALESCE($3, name), tag_type = $4
                WHERE id = $1 AND user_id = $2
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(user_id)
            .bind(name.map(str::trim))
            .bind(new_type.map(|t| t.as_str()))
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?,
        };

        let row = row.ok_or_else(|| Error::NotFound(format!("tag {}", id)))?;
        Ok(map_row_to_tag(&row))
    }

    /// Delete a tag. Junction rows cascade; segments are untouched.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tag WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("tag {}", id)));
        }
        Ok(())
    }
}
