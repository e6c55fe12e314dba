//! Borrowings repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{Borrowing, BorrowingDetails, BorrowingStatus, NewBorrowing, UserShort},
};

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrowing by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    /// Decrement stock and insert an approved borrowing in one transaction.
    ///
    /// The stock guard lives in the UPDATE itself, so two transactions racing
    /// for the last unit serialize on the item row and only one sees a match.
    pub async fn create_approved(&self, new: &NewBorrowing) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(new.user_id)
            .fetch_one(&mut *tx)
            .await?;
        if !user_exists {
            return Err(AppError::NotFound(format!("User with id {} not found", new.user_id)));
        }

        let remaining: Option<i32> = sqlx::query_scalar(
            "UPDATE items SET stock = stock - 1 WHERE id = $1 AND stock > 0 RETURNING stock",
        )
        .bind(new.item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(remaining) = remaining else {
            let item_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE id = $1)")
                .bind(new.item_id)
                .fetch_one(&mut *tx)
                .await?;
            tx.rollback().await?;
            return Err(if item_exists {
                AppError::StockUnavailable("Stock unavailable".to_string())
            } else {
                AppError::NotFound(format!("Item with id {} not found", new.item_id))
            });
        };

        let borrowing = sqlx::query_as::<_, Borrowing>(
            r#"
            INSERT INTO borrowings (user_id, item_id, borrow_date, due_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.item_id)
        .bind(new.borrow_date)
        .bind(new.due_date)
        .bind(BorrowingStatus::Approved)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(item_id = new.item_id, remaining, "Stock decremented");
        Ok(borrowing)
    }

    /// Mark a borrowing returned and increment its item's stock in one transaction
    pub async fn mark_returned(&self, id: i64, returned_at: DateTime<Utc>) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Borrowing>(
            r#"
            UPDATE borrowings SET status = $1, returned_at = $2
            WHERE id = $3 AND status IN ($4, $5)
            RETURNING *
            "#,
        )
        .bind(BorrowingStatus::Returned)
        .bind(returned_at)
        .bind(id)
        .bind(BorrowingStatus::Approved)
        .bind(BorrowingStatus::Overdue)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(borrowing) = updated else {
            tx.rollback().await?;
            // Missing row, already returned, or never lent
            let current = self.get_by_id(id).await?;
            return Err(super::return_refused(current.status));
        };

        sqlx::query("UPDATE items SET stock = stock + 1 WHERE id = $1")
            .bind(borrowing.item_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(borrowing)
    }

    /// Whether a borrowing was created for the user at or after `since`
    pub async fn exists_for_user_since(&self, user_id: i64, since: DateTime<Utc>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrowings WHERE user_id = $1 AND created_at >= $2)",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// List borrowings with item and user, newest first
    pub async fn list(&self, user_id: Option<i64>, now: DateTime<Utc>) -> AppResult<Vec<BorrowingDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT b.*, i.name AS item_name, i.item_code,
                   u.name AS user_name, u.email AS user_email, u.role AS user_role
            FROM borrowings b
            JOIN items i ON b.item_id = i.id
            JOIN users u ON b.user_id = u.id
            WHERE ($1::BIGINT IS NULL OR b.user_id = $1)
            ORDER BY b.created_at DESC, b.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let borrowing = Borrowing {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                item_id: row.try_get("item_id")?,
                borrow_date: row.try_get("borrow_date")?,
                due_date: row.try_get("due_date")?,
                returned_at: row.try_get("returned_at")?,
                status: row.try_get("status")?,
                admin_note: row.try_get("admin_note")?,
                created_at: row.try_get("created_at")?,
            };
            result.push(BorrowingDetails {
                is_overdue: borrowing.is_overdue(now),
                item_name: row.try_get("item_name")?,
                item_code: row.try_get("item_code")?,
                user: UserShort {
                    id: borrowing.user_id,
                    name: row.try_get("user_name")?,
                    email: row.try_get("user_email")?,
                    role: row.try_get("user_role")?,
                },
                borrowing,
            });
        }

        Ok(result)
    }

    /// Count borrowings currently out
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowings WHERE status IN ('approved', 'overdue')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count borrowings out past their due date
    pub async fn count_overdue(&self, now: DateTime<Utc>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM borrowings
            WHERE status = 'overdue' OR (status = 'approved' AND due_date < $1)
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
