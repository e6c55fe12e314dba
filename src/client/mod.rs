//! The two sides of the QR-scan handshake as client state machines.
//!
//! [`admin::AdminScanController`] drives an admin's scanning session and
//! [`user::UserPollClient`] drives a borrower's borrow dialog. Neither knows
//! how it reaches the server: they talk through [`AdminBackend`] and
//! [`UserBackend`], implemented in-process over [`Services`] and over HTTP by
//! [`http::HttpBackend`].

pub mod admin;
pub mod http;
pub mod user;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Borrowing, Item, LookupResult, ScanStatus},
    services::{scan::ProcessScan, Services},
};

/// Server operations an admin scanner needs
#[async_trait]
pub trait AdminBackend: Send + Sync {
    async fn lookup(&self, user_id: i64, item_id: i64) -> AppResult<LookupResult>;

    async fn cancel_scan(&self, user_id: i64) -> AppResult<()>;

    async fn process_scan(&self, request: &ProcessScan) -> AppResult<Borrowing>;
}

/// Server operations a borrower's session needs, always for its own user
#[async_trait]
pub trait UserBackend: Send + Sync {
    fn user_id(&self) -> i64;

    async fn fetch_item(&self, item_id: i64) -> AppResult<Item>;

    async fn check_status(&self) -> AppResult<ScanStatus>;

    async fn cancel_own_scan(&self) -> AppResult<()>;
}

#[async_trait]
impl AdminBackend for Services {
    async fn lookup(&self, user_id: i64, item_id: i64) -> AppResult<LookupResult> {
        self.scan.lookup(user_id, item_id).await
    }

    async fn cancel_scan(&self, user_id: i64) -> AppResult<()> {
        self.scan.cancel_scan(user_id).await
    }

    async fn process_scan(&self, request: &ProcessScan) -> AppResult<Borrowing> {
        self.scan.process_scan(request).await
    }
}

/// A borrower session served by in-process services
#[derive(Clone)]
pub struct LocalUserSession {
    services: Services,
    user_id: i64,
}

impl LocalUserSession {
    pub fn new(services: Services, user_id: i64) -> Self {
        Self { services, user_id }
    }
}

#[async_trait]
impl UserBackend for LocalUserSession {
    fn user_id(&self) -> i64 {
        self.user_id
    }

    async fn fetch_item(&self, item_id: i64) -> AppResult<Item> {
        self.services.catalog.get_item(item_id).await
    }

    async fn check_status(&self) -> AppResult<ScanStatus> {
        self.services.scan.check_status(self.user_id).await
    }

    async fn cancel_own_scan(&self) -> AppResult<()> {
        self.services.scan.cancel_scan(self.user_id).await
    }
}
