//! Items repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Item, NewItem},
};

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get item by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// List all items by name
    pub async fn list(&self) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>("SELECT * FROM items ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Insert an item keyed by its code, leaving an existing one untouched
    pub async fn ensure(&self, item: &NewItem) -> AppResult<Item> {
        sqlx::query(
            r#"
            INSERT INTO items (name, item_code, stock, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (item_code) DO NOTHING
            "#,
        )
        .bind(&item.name)
        .bind(&item.item_code)
        .bind(item.stock)
        .bind(&item.description)
        .execute(&self.pool)
        .await?;

        let stored = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE item_code = $1")
            .bind(&item.item_code)
            .fetch_one(&self.pool)
            .await?;
        Ok(stored)
    }

    /// Count items
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
