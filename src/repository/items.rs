//! Catalog items repository

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::item::{CatalogItem, CreateItem},
};

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List items, optionally only those with a copy on the shelf
    pub async fn list(&self, available_only: bool) -> AppResult<Vec<CatalogItem>> {
        let items = sqlx::query_as::<_, CatalogItem>(
            r#"
            SELECT * FROM library_items
            WHERE NOT $1 OR available_stock > 0
            ORDER BY name, id
            "#,
        )
        .bind(available_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Get item by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<CatalogItem> {
        sqlx::query_as::<_, CatalogItem>("SELECT * FROM library_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Library item with id {} not found", id)))
    }

    /// Get item by ID and hold its row lock until the transaction ends
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<CatalogItem> {
        sqlx::query_as::<_, CatalogItem>("SELECT * FROM library_items WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Library item with id {} not found", id)))
    }

    /// Create an item with every copy on the shelf
    pub async fn create(&self, data: &CreateItem, added_by: i32) -> AppResult<CatalogItem> {
        sqlx::query_as::<_, CatalogItem>(
            r#"
            INSERT INTO library_items (name, writer, identifier, total_stock, available_stock, added_by)
            VALUES ($1, $2, $3, $4, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.writer)
        .bind(&data.identifier)
        .bind(data.total_stock)
        .bind(added_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "An item with this identifier already exists"))
    }

    /// Persist descriptive fields and stock counts of a locked item
    pub async fn save(&self, conn: &mut PgConnection, item: &CatalogItem) -> AppResult<CatalogItem> {
        sqlx::query_as::<_, CatalogItem>(
            r#"
            UPDATE library_items
            SET name = $2, writer = $3, identifier = $4,
                total_stock = $5, available_stock = $6, last_modified = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.writer)
        .bind(&item.identifier)
        .bind(item.total_stock)
        .bind(item.available_stock)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "An item with this identifier already exists"))
    }

    /// Persist the shelf count of a locked item
    pub async fn save_stock(&self, conn: &mut PgConnection, item: &CatalogItem) -> AppResult<()> {
        sqlx::query(
            "UPDATE library_items SET available_stock = $2, last_modified = NOW() WHERE id = $1",
        )
        .bind(item.id)
        .bind(item.available_stock)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Delete an item that has no active loans
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        self.lock(&mut tx, id).await?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lending_records WHERE item_id = $1 AND is_returned = FALSE",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if active > 0 {
            return Err(AppError::Conflict(format!(
                "Library item {} has {} copies on loan",
                id, active
            )));
        }

        sqlx::query("DELETE FROM library_items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
