//! Category repository implementation.

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use clipmark_core::{
    new_v7, Category, CategoryWithCount, CreateCategoryRequest, Error, Result,
    UpdateCategoryRequest,
};

/// Validate a category name.
pub fn validate_category_name(name: &str) -> std::result::Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Category name cannot be empty".to_string());
    }
    if trimmed.len() > 100 {
        return Err("Category name must be 100 characters or less".to_string());
    }
    Ok(())
}

/// PostgreSQL implementation of the category repository.
pub struct PgCategoryRepository {
    pool: Pool<Postgres>,
}

fn map_row_to_category(row: &sqlx::postgres::PgRow) -> Category {
    Category {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        icon: row.get("icon"),
        sort_order: row.get("sort_order"),
        is_default: row.get("is_default"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl PgCategoryRepository {
    /// Create a new PgCategoryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Seed the default categories for a new user. Idempotent.
    pub async fn seed_defaults(&self, user_id: Uuid) -> Result<()> {
        for (name, icon, sort_order) in clipmark_core::defaults::DEFAULT_CATEGORIES {
            sqlx::query(
                r#"
                INSERT INTO category (id, user_id, name, icon, sort_order, is_default)
                VALUES ($1, $2, $3, $4, $5, TRUE)
                ON CONFLICT (user_id, name) DO NOTHING
                "#,
            )
            .bind(new_v7())
            .bind(user_id)
            .bind(name)
            .bind(icon)
            .bind(sort_order)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }

    /// Create a category.
    pub async fn create(&self, user_id: Uuid, req: CreateCategoryRequest) -> Result<Category> {
        validate_category_name(&req.name).map_err(Error::InvalidInput)?;

        let sort_order = match req.sort_order {
            Some(order) => order,
            // Append after the current maximum.
            None => {
                sqlx::query_scalar::<_, Option<i32>>(
                    "SELECT MAX(sort_order) FROM category WHERE user_id = $1",
                )
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?
                .map(|max| max + 1)
                .unwrap_or(0)
            }
        };

        let row = sqlx::query(
            r#"
            INSERT INTO category (id, user_id, name, icon, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new_v7())
        .bind(user_id)
        .bind(req.name.trim())
        .bind(&req.icon)
        .bind(sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(map_row_to_category(&row))
    }

    /// List categories in sort order with their segment counts.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<CategoryWithCount>> {
        let rows = sqlx::query(
            r#"
            SELECT c.*,
                   (SELECT COUNT(*) FROM segment s WHERE s.category_id = c.id) AS segment_count
            FROM category c
            WHERE c.user_id = $1
            ORDER BY c.sort_order, c.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let segment_count: i64 = row.get("segment_count");
                CategoryWithCount {
                    category: map_row_to_category(&row),
                    segment_count,
                }
            })
            .collect())
    }

    /// Fetch one category owned by the user.
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Category> {
        let row = sqlx::query("SELECT * FROM category WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(format!("category {}", id)))?;
        Ok(map_row_to_category(&row))
    }

    /// Update name, icon, or sort order.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: UpdateCategoryRequest,
    ) -> Result<Category> {
        if let Some(name) = &req.name {
            validate_category_name(name).map_err(Error::InvalidInput)?;
        }

        let row = sqlx::query(
            r#"
            UPDATE category SET
                name = COALESCE($3, name),
                icon = COALESCE($4, icon),
                sort_order = COALESCE($5, sort_order)
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(&req.icon)
        .bind(req.sort_order)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("category {}", id)))?;

        Ok(map_row_to_category(&row))
    }

    /// Delete a category.
    ///
    /// Deletion never cascades to segments: a category with referencing
    /// segments requires `migrate_to`, which reassigns them first inside
    /// the same transaction. Self-migration is rejected.
    pub async fn delete(&self, user_id: Uuid, id: Uuid, migrate_to: Option<Uuid>) -> Result<()> {
        if migrate_to == Some(id) {
            return Err(Error::Conflict(
                "cannot migrate segments into the category being deleted".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let segment_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM segment WHERE category_id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        match migrate_to {
            None if segment_count > 0 => {
                return Err(Error::Conflict(format!(
                    "category has {} segments; provide migrate_to to reassign them",
                    segment_count
                )));
            }
            Some(target) => {
                // The target must exist and belong to the same user.
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM category WHERE id = $1 AND user_id = $2)",
                )
                .bind(target)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
                if !exists {
                    return Err(Error::NotFound(format!("category {}", target)));
                }

                sqlx::query(
                    "UPDATE segment SET category_id = $3 WHERE category_id = $1 AND user_id = $2",
                )
                .bind(id)
                .bind(user_id)
                .bind(target)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            }
            None => {}
        }

        let result = sqlx::query("DELETE FROM category WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("category {}", id)));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    /// Reorder categories in one transaction.
    ///
    /// `ordered_ids` is the full desired order; each id gets its index as
    /// sort_order. Ids not owned by the user are rejected.
    pub async fn reorder(&self, user_id: Uuid, ordered_ids: &[Uuid]) -> Result<()> {
        if ordered_ids.is_empty() {
            return Err(Error::InvalidInput("ordered_ids cannot be empty".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        for (index, id) in ordered_ids.iter().enumerate() {
            let result = sqlx::query(
                "UPDATE category SET sort_order = $3 WHERE id = $1 AND user_id = $2",
            )
            .bind(id)
            .bind(user_id)
            .bind(index as i32)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            if result.rows_affected() == 0 {
                return Err(Error::NotFound(format!("category {}", id)));
            }
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_category_name_rejects_empty() {
        assert!(validate_category_name("").is_err());
        assert!(validate_category_name("   ").is_err());
    }

    #[test]
    fn test_validate_category_name_rejects_overlong() {
        assert!(validate_category_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_category_name_accepts_normal() {
        assert!(validate_category_name("Bit").is_ok());
        assert!(validate_category_name("Crowd work").is_ok());
    }
}
