//! In-process storage backend.
//!
//! All tables live behind one async mutex, so every trait operation is
//! atomic with respect to the others.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::LendingStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        Borrowing, BorrowingDetails, BorrowingStatus, Item, ItemStatus, LendingStats, NewBorrowing,
        NewItem, NewUser, User, UserShort,
    },
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    items: Vec<Item>,
    borrowings: Vec<Borrowing>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite an item's stock (test and demo helper)
    pub async fn set_stock(&self, item_id: i64, stock: i32) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let item = tables
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;
        item.stock = stock.max(0);
        Ok(())
    }

    /// Overwrite a borrowing's creation time (test helper)
    pub async fn backdate_borrowing(&self, id: i64, created_at: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let borrowing = tables
            .borrowings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;
        borrowing.created_at = created_at;
        Ok(())
    }

    /// Overwrite a borrowing's status without touching stock (test helper)
    pub async fn set_borrowing_status(&self, id: i64, status: BorrowingStatus) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let borrowing = tables
            .borrowings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;
        borrowing.status = status;
        Ok(())
    }
}

#[async_trait]
impl LendingStore for MemoryRepository {
    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.lock().await.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn ensure_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.users.iter().find(|u| u.email == user.email) {
            return Ok(existing.clone());
        }
        let stored = User {
            id: tables.next_id(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.push(stored.clone());
        Ok(stored)
    }

    async fn find_item(&self, id: i64) -> AppResult<Option<Item>> {
        Ok(self.tables.lock().await.items.iter().find(|i| i.id == id).cloned())
    }

    async fn list_items(&self) -> AppResult<Vec<Item>> {
        let mut items = self.tables.lock().await.items.clone();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn ensure_item(&self, item: NewItem) -> AppResult<Item> {
        if item.stock < 0 {
            return Err(AppError::Validation("Stock cannot be negative".to_string()));
        }
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.items.iter().find(|i| i.item_code == item.item_code) {
            return Ok(existing.clone());
        }
        let stored = Item {
            id: tables.next_id(),
            name: item.name,
            item_code: item.item_code,
            stock: item.stock,
            description: item.description,
            image_path: None,
            status: ItemStatus::Available,
            created_at: Utc::now(),
        };
        tables.items.push(stored.clone());
        Ok(stored)
    }

    async fn create_approved_borrowing(&self, new: &NewBorrowing) -> AppResult<Borrowing> {
        let mut tables = self.tables.lock().await;

        if !tables.users.iter().any(|u| u.id == new.user_id) {
            return Err(AppError::NotFound(format!("User with id {} not found", new.user_id)));
        }

        let id = tables.next_id();
        let item = tables
            .items
            .iter_mut()
            .find(|i| i.id == new.item_id)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", new.item_id)))?;

        if item.stock <= 0 {
            return Err(AppError::StockUnavailable("Stock unavailable".to_string()));
        }
        item.stock -= 1;

        let borrowing = Borrowing {
            id,
            user_id: new.user_id,
            item_id: new.item_id,
            borrow_date: new.borrow_date,
            due_date: new.due_date,
            returned_at: None,
            status: BorrowingStatus::Approved,
            admin_note: None,
            created_at: Utc::now(),
        };
        tables.borrowings.push(borrowing.clone());
        Ok(borrowing)
    }

    async fn return_borrowing(&self, id: i64, returned_at: DateTime<Utc>) -> AppResult<Borrowing> {
        let mut tables = self.tables.lock().await;

        let borrowing = tables
            .borrowings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;

        if !borrowing.status.is_lent() {
            return Err(super::return_refused(borrowing.status));
        }
        borrowing.status = BorrowingStatus::Returned;
        borrowing.returned_at = Some(returned_at);
        let returned = borrowing.clone();

        if let Some(item) = tables.items.iter_mut().find(|i| i.id == returned.item_id) {
            item.stock += 1;
        }
        Ok(returned)
    }

    async fn borrowing_created_since(&self, user_id: i64, since: DateTime<Utc>) -> AppResult<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .borrowings
            .iter()
            .any(|b| b.user_id == user_id && b.created_at >= since))
    }

    async fn list_borrowings(&self, user_id: Option<i64>, now: DateTime<Utc>) -> AppResult<Vec<BorrowingDetails>> {
        let tables = self.tables.lock().await;

        let mut details: Vec<BorrowingDetails> = tables
            .borrowings
            .iter()
            .filter(|b| user_id.map_or(true, |id| b.user_id == id))
            .filter_map(|b| {
                let item = tables.items.iter().find(|i| i.id == b.item_id)?;
                let user = tables.users.iter().find(|u| u.id == b.user_id)?;
                Some(BorrowingDetails {
                    is_overdue: b.is_overdue(now),
                    item_name: item.name.clone(),
                    item_code: item.item_code.clone(),
                    user: UserShort::from(user.clone()),
                    borrowing: b.clone(),
                })
            })
            .collect();

        details.sort_by(|a, b| {
            b.borrowing
                .created_at
                .cmp(&a.borrowing.created_at)
                .then(b.borrowing.id.cmp(&a.borrowing.id))
        });
        Ok(details)
    }

    async fn stats(&self, now: DateTime<Utc>) -> AppResult<LendingStats> {
        let tables = self.tables.lock().await;
        let out = |b: &&Borrowing| {
            matches!(b.status, BorrowingStatus::Approved | BorrowingStatus::Overdue)
        };
        Ok(LendingStats {
            total_items: tables.items.len() as i64,
            active_borrowings: tables.borrowings.iter().filter(out).count() as i64,
            overdue_items: tables.borrowings.iter().filter(|b| b.is_overdue(now)).count() as i64,
        })
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
