//! Server side of the QR-scan handshake.
//!
//! The borrower's browser and the admin's scanner never talk to each other.
//! The admin writes the borrower's scan status slot (`scanning` on lookup,
//! `approved` on commit, `waiting` on cancel) and the borrower polls it.
//! Slots expire on their own, so an abandoned scan quietly falls back to
//! `waiting`.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::ScanConfig,
    error::{AppError, AppResult},
    models::{Borrowing, BorrowIntent, LookupResult, ScanStatus},
    qr,
    repository::LendingStore,
    services::{borrowings::BorrowingsService, lookup::LookupService, scan_status::ScanStatusStore},
};

/// Admin's approval of a scanned request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProcessScan {
    #[validate(range(min = 1, message = "user_id must be positive"))]
    pub user_id: i64,
    #[validate(range(min = 1, message = "item_id must be positive"))]
    pub item_id: i64,
    /// Last day of the loan, in the lending desk's calendar
    pub return_date: NaiveDate,
}

#[derive(Clone)]
pub struct ScanService {
    store: Arc<dyn LendingStore>,
    scan_status: Arc<dyn ScanStatusStore>,
    lookup: LookupService,
    borrowings: BorrowingsService,
    config: ScanConfig,
}

impl ScanService {
    pub fn new(
        store: Arc<dyn LendingStore>,
        scan_status: Arc<dyn ScanStatusStore>,
        lookup: LookupService,
        borrowings: BorrowingsService,
        config: ScanConfig,
    ) -> Self {
        Self {
            store,
            scan_status,
            lookup,
            borrowings,
            config,
        }
    }

    /// Build the QR text for a borrower who opened the borrow dialog.
    ///
    /// Only items with stock left can be requested.
    pub async fn issue_intent(&self, user_id: i64, item_id: i64) -> AppResult<(BorrowIntent, String)> {
        let item = self
            .store
            .find_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;
        if !item.in_stock() {
            return Err(AppError::StockUnavailable(format!("{} is out of stock", item.name)));
        }

        let intent = BorrowIntent::new(user_id, item_id);
        Ok((intent, qr::encode_intent(&intent)))
    }

    /// Resolve a decoded request and tell the borrower an admin is on it
    pub async fn lookup(&self, user_id: i64, item_id: i64) -> AppResult<LookupResult> {
        self.lookup.lookup(user_id, item_id).await
    }

    /// Decode raw QR text and look it up in one step
    pub async fn lookup_payload(&self, text: &str) -> AppResult<(BorrowIntent, LookupResult)> {
        let intent = qr::decode(text)?;
        let result = self.lookup.lookup(intent.user_id, intent.item_id).await?;
        Ok((intent, result))
    }

    /// Reset the borrower's slot to `waiting`. Safe to repeat.
    pub async fn cancel_scan(&self, user_id: i64) -> AppResult<()> {
        if self.store.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }
        self.scan_status
            .put(user_id, ScanStatus::Waiting, self.config.waiting_ttl())
            .await?;
        tracing::info!(user_id, "Scan cancelled");
        Ok(())
    }

    /// Status as the borrower should see it.
    ///
    /// The slot write on approval can race with a poll, and a slot can expire
    /// before the borrower reads it. Whenever the slot does not say
    /// `approved`, a borrowing created for this user within the reconcile
    /// window is taken as the approval instead.
    pub async fn check_status(&self, user_id: i64) -> AppResult<ScanStatus> {
        let status = self.scan_status.get(user_id).await?;
        if status == ScanStatus::Approved {
            return Ok(status);
        }

        if self.recently_approved(user_id).await? {
            tracing::debug!(user_id, slot = %status, "Reconciled missed approval");
            return Ok(ScanStatus::Approved);
        }
        Ok(status)
    }

    /// Whether a borrowing for the user was created within the reconcile window
    pub async fn recently_approved(&self, user_id: i64) -> AppResult<bool> {
        let since = Utc::now() - self.config.reconcile_window();
        self.store.borrowing_created_since(user_id, since).await
    }

    /// Commit the borrowing and signal `approved` to the borrower.
    ///
    /// A failure to write the slot after a successful commit is logged but not
    /// returned: the loan exists, and status checks reconcile from it.
    pub async fn process_scan(&self, request: &ProcessScan) -> AppResult<Borrowing> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let borrowing = self
            .borrowings
            .commit(request.user_id, request.item_id, request.return_date)
            .await?;

        if let Err(e) = self
            .scan_status
            .put(request.user_id, ScanStatus::Approved, self.config.approved_ttl())
            .await
        {
            tracing::warn!(
                user_id = request.user_id,
                borrowing_id = borrowing.id,
                "Could not signal approval, borrower will reconcile: {}",
                e
            );
        }

        Ok(borrowing)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        self.config.poll_interval()
    }
}
