//! Business logic services

pub mod auth;
pub mod borrowings;
pub mod catalog;
pub mod lookup;
pub mod redis;
pub mod scan;
pub mod scan_status;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    error::AppResult,
    repository::LendingStore,
};

use self::scan_status::ScanStatusStore;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub borrowings: borrowings::BorrowingsService,
    pub scan: scan::ScanService,
    pub store: Arc<dyn LendingStore>,
    pub scan_status: Arc<dyn ScanStatusStore>,
}

impl Services {
    /// Create all services over the given storage and scan status store
    pub fn new(
        store: Arc<dyn LendingStore>,
        scan_status: Arc<dyn ScanStatusStore>,
        config: &AppConfig,
    ) -> AppResult<Self> {
        let due_dates = borrowings::DueDatePolicy::new(config.scan.utc_offset_minutes)?;
        let borrowings = borrowings::BorrowingsService::new(store.clone(), due_dates);
        let lookup = lookup::LookupService::new(
            store.clone(),
            scan_status.clone(),
            config.scan.scanning_ttl(),
        );

        Ok(Self {
            auth: auth::AuthService::new(store.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(store.clone()),
            scan: scan::ScanService::new(
                store.clone(),
                scan_status.clone(),
                lookup,
                borrowings.clone(),
                config.scan.clone(),
            ),
            borrowings,
            store,
            scan_status,
        })
    }

    /// Check both backing stores answer
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await?;
        self.scan_status.ping().await
    }
}
