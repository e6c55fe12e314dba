//! Repository layer for persistence
//!
//! Services talk to storage through [`LendingStore`]. [`Repository`] is the
//! PostgreSQL implementation; [`memory::MemoryRepository`] keeps everything in
//! process and backs the `memory` storage backend and the tests.

pub mod borrowings;
pub mod items;
pub mod memory;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        Borrowing, BorrowingDetails, BorrowingStatus, Item, LendingStats, NewBorrowing, NewItem,
        NewUser, User,
    },
};

/// Persistence operations the lending core depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LendingStore: Send + Sync {
    async fn find_user(&self, id: i64) -> AppResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Insert a user unless one with the same email exists; returns the stored user
    async fn ensure_user(&self, user: NewUser) -> AppResult<User>;

    async fn find_item(&self, id: i64) -> AppResult<Option<Item>>;

    async fn list_items(&self) -> AppResult<Vec<Item>>;

    /// Insert an item unless one with the same code exists; returns the stored item
    async fn ensure_item(&self, item: NewItem) -> AppResult<Item>;

    /// Take one unit of stock and record an approved borrowing, as one unit.
    ///
    /// Fails with `StockUnavailable` (and changes nothing) when the item has no
    /// stock left at the time of the call, `NotFound` when the item or user
    /// does not exist.
    async fn create_approved_borrowing(&self, borrowing: &NewBorrowing) -> AppResult<Borrowing>;

    /// Mark a borrowing returned and put its unit back in stock, as one unit.
    ///
    /// Only approved or overdue borrowings can be returned; any other status
    /// fails with `BusinessRule` and leaves stock untouched.
    async fn return_borrowing(&self, id: i64, returned_at: DateTime<Utc>) -> AppResult<Borrowing>;

    /// Whether a borrowing for `user_id` was created at or after `since`
    async fn borrowing_created_since(&self, user_id: i64, since: DateTime<Utc>) -> AppResult<bool>;

    /// Borrowings newest first, optionally restricted to one user
    async fn list_borrowings(&self, user_id: Option<i64>, now: DateTime<Utc>) -> AppResult<Vec<BorrowingDetails>>;

    async fn stats(&self, now: DateTime<Utc>) -> AppResult<LendingStats>;

    /// Connectivity check used by readiness probes
    async fn ping(&self) -> AppResult<()>;
}

/// Error for a return attempted on a borrowing that holds no unit of stock
pub(crate) fn return_refused(status: BorrowingStatus) -> AppError {
    match status {
        BorrowingStatus::Returned => AppError::BusinessRule("Item already returned".to_string()),
        other => AppError::BusinessRule(format!("A {} borrowing cannot be returned", other)),
    }
}

/// PostgreSQL repository holding the connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub items: items::ItemsRepository,
    pub users: users::UsersRepository,
    pub borrowings: borrowings::BorrowingsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            items: items::ItemsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            borrowings: borrowings::BorrowingsRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl LendingStore for Repository {
    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        self.users.get_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.users.get_by_email(email).await
    }

    async fn ensure_user(&self, user: NewUser) -> AppResult<User> {
        self.users.ensure(&user).await
    }

    async fn find_item(&self, id: i64) -> AppResult<Option<Item>> {
        self.items.get_by_id(id).await
    }

    async fn list_items(&self) -> AppResult<Vec<Item>> {
        self.items.list().await
    }

    async fn ensure_item(&self, item: NewItem) -> AppResult<Item> {
        self.items.ensure(&item).await
    }

    async fn create_approved_borrowing(&self, borrowing: &NewBorrowing) -> AppResult<Borrowing> {
        self.borrowings.create_approved(borrowing).await
    }

    async fn return_borrowing(&self, id: i64, returned_at: DateTime<Utc>) -> AppResult<Borrowing> {
        self.borrowings.mark_returned(id, returned_at).await
    }

    async fn borrowing_created_since(&self, user_id: i64, since: DateTime<Utc>) -> AppResult<bool> {
        self.borrowings.exists_for_user_since(user_id, since).await
    }

    async fn list_borrowings(&self, user_id: Option<i64>, now: DateTime<Utc>) -> AppResult<Vec<BorrowingDetails>> {
        self.borrowings.list(user_id, now).await
    }

    async fn stats(&self, now: DateTime<Utc>) -> AppResult<LendingStats> {
        Ok(LendingStats {
            total_items: self.items.count().await?,
            active_borrowings: self.borrowings.count_active().await?,
            overdue_items: self.borrowings.count_overdue(now).await?,
        })
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
