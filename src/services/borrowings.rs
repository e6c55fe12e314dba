//! Borrowing service: commit on scan approval, returns and listings

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{Borrowing, BorrowingDetails, LendingStats, NewBorrowing},
    repository::LendingStore,
};

/// Interprets due dates in the lending desk's local calendar
#[derive(Debug, Clone, Copy)]
pub struct DueDatePolicy {
    offset: FixedOffset,
}

impl DueDatePolicy {
    pub fn new(utc_offset_minutes: i32) -> AppResult<Self> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            AppError::Internal(format!("Invalid UTC offset: {} minutes", utc_offset_minutes))
        })?;
        Ok(Self { offset })
    }

    /// Local calendar date at `now`
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Check `date` is today or later and return the last second of that
    /// local day as a UTC instant
    pub fn resolve(&self, date: NaiveDate, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        let today = self.today(now);
        if date < today {
            return Err(AppError::Validation(format!(
                "Return date {} is before today ({})",
                date, today
            )));
        }

        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
        self.offset
            .from_local_datetime(&date.and_time(end_of_day))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| AppError::Validation(format!("Invalid return date {}", date)))
    }
}

#[derive(Clone)]
pub struct BorrowingsService {
    store: Arc<dyn LendingStore>,
    due_dates: DueDatePolicy,
}

impl BorrowingsService {
    pub fn new(store: Arc<dyn LendingStore>, due_dates: DueDatePolicy) -> Self {
        Self { store, due_dates }
    }

    pub fn due_dates(&self) -> DueDatePolicy {
        self.due_dates
    }

    /// Create an approved borrowing and take one unit of stock.
    ///
    /// Stock is checked again here, inside the store's atomic step, because it
    /// may have changed since the admin's lookup.
    pub async fn commit(&self, user_id: i64, item_id: i64, due_date: NaiveDate) -> AppResult<Borrowing> {
        let now = Utc::now();
        let due_date = self.due_dates.resolve(due_date, now)?;

        let borrowing = self
            .store
            .create_approved_borrowing(&NewBorrowing {
                user_id,
                item_id,
                borrow_date: now,
                due_date,
            })
            .await
            .map_err(|e| {
                if let AppError::StockUnavailable(_) = e {
                    tracing::warn!(user_id, item_id, "Borrow commit lost the stock race");
                }
                e
            })?;

        tracing::info!(
            borrowing_id = borrowing.id,
            user_id,
            item_id,
            due_date = %borrowing.due_date,
            "Borrowing approved"
        );
        Ok(borrowing)
    }

    /// Mark a borrowing returned and put the item back in stock
    pub async fn return_item(&self, borrowing_id: i64) -> AppResult<Borrowing> {
        let borrowing = self.store.return_borrowing(borrowing_id, Utc::now()).await?;
        tracing::info!(borrowing_id, item_id = borrowing.item_id, "Item returned");
        Ok(borrowing)
    }

    /// Borrowings of one user, newest first
    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<BorrowingDetails>> {
        self.store.list_borrowings(Some(user_id), Utc::now()).await
    }

    /// All borrowings, newest first
    pub async fn list_all(&self) -> AppResult<Vec<BorrowingDetails>> {
        self.store.list_borrowings(None, Utc::now()).await
    }

    pub async fn stats(&self) -> AppResult<LendingStats> {
        self.store.stats(Utc::now()).await
    }
}
