//! Scan lookup: resolve a scanned intent into what the admin reviews

use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::{LookupResult, ScanStatus},
    repository::LendingStore,
    services::scan_status::ScanStatusStore,
};

#[derive(Clone)]
pub struct LookupService {
    store: Arc<dyn LendingStore>,
    scan_status: Arc<dyn ScanStatusStore>,
    scanning_ttl: Duration,
}

impl LookupService {
    pub fn new(
        store: Arc<dyn LendingStore>,
        scan_status: Arc<dyn ScanStatusStore>,
        scanning_ttl: Duration,
    ) -> Self {
        Self {
            store,
            scan_status,
            scanning_ttl,
        }
    }

    /// Resolve user and item names and the current stock.
    ///
    /// Nothing persistent changes, but a successful lookup marks the user's
    /// slot `scanning`: this is how the requester learns an admin picked up
    /// the code. An unknown id leaves the slot alone.
    pub async fn lookup(&self, user_id: i64, item_id: i64) -> AppResult<LookupResult> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;
        let item = self
            .store
            .find_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;

        self.scan_status
            .put(user_id, ScanStatus::Scanning, self.scanning_ttl)
            .await?;

        tracing::info!(user_id, item_id, stock = item.stock, "Borrow request scanned");

        Ok(LookupResult {
            user_name: user.name,
            item_name: item.name,
            item_stock: item.stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Item, ItemStatus, User, UserRole};
    use crate::repository::MockLendingStore;
    use crate::services::scan_status::MockScanStatusStore;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn user(id: i64) -> User {
        User {
            id,
            name: "Regular User".to_string(),
            email: "user@user.com".to_string(),
            password_hash: String::new(),
            role: UserRole::User,
            created_at: Utc::now(),
        }
    }

    fn item(id: i64, stock: i32) -> Item {
        Item {
            id,
            name: "Projector Epson".to_string(),
            item_code: "ITM-002".to_string(),
            stock,
            description: None,
            image_path: None,
            status: ItemStatus::Available,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_lookup_marks_slot_scanning() {
        let mut store = MockLendingStore::new();
        store.expect_find_user().with(eq(4)).returning(|id| Ok(Some(user(id))));
        store.expect_find_item().with(eq(2)).returning(|id| Ok(Some(item(id, 0))));

        let mut status = MockScanStatusStore::new();
        status
            .expect_put()
            .with(eq(4), eq(ScanStatus::Scanning), eq(Duration::from_secs(120)))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = LookupService::new(Arc::new(store), Arc::new(status), Duration::from_secs(120));
        let result = service.lookup(4, 2).await.unwrap();
        assert_eq!(result.user_name, "Regular User");
        assert_eq!(result.item_name, "Projector Epson");
        assert_eq!(result.item_stock, 0);
    }

    #[tokio::test]
    async fn test_lookup_unknown_item_leaves_slot() {
        let mut store = MockLendingStore::new();
        store.expect_find_user().returning(|id| Ok(Some(user(id))));
        store.expect_find_item().returning(|_| Ok(None));

        let mut status = MockScanStatusStore::new();
        status.expect_put().never();

        let service = LookupService::new(Arc::new(store), Arc::new(status), Duration::from_secs(120));
        let result = service.lookup(4, 99).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lookup_unknown_user() {
        let mut store = MockLendingStore::new();
        store.expect_find_user().returning(|_| Ok(None));
        store.expect_find_item().never();

        let mut status = MockScanStatusStore::new();
        status.expect_put().never();

        let service = LookupService::new(Arc::new(store), Arc::new(status), Duration::from_secs(120));
        assert!(matches!(service.lookup(42, 1).await, Err(AppError::NotFound(_))));
    }
}
