//! Borrower side of the scan handshake.
//!
//! Opening the borrow dialog shows a QR code and starts polling the
//! borrower's scan status. The dialog adopts whatever the server reports and
//! ends either when the server says `approved` or when the borrower closes it.
//! `approved` is final: only opening a new dialog starts over.

use std::time::Duration;

use tokio::{
    sync::oneshot,
    time::{interval_at, Instant, MissedTickBehavior},
};

use super::UserBackend;
use crate::{
    error::{AppError, AppResult},
    models::{Item, ScanStatus},
    qr,
};

/// How a borrow dialog ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// An admin approved the request
    Approved,
    /// The borrower closed the dialog first
    Closed,
}

#[derive(Debug, Clone)]
struct BorrowDialog {
    item: Item,
    payload: String,
}

pub struct UserPollClient<B> {
    backend: B,
    interval: Duration,
    status: ScanStatus,
    dialog: Option<BorrowDialog>,
}

impl<B: UserBackend> UserPollClient<B> {
    pub fn new(backend: B, interval: Duration) -> Self {
        Self {
            backend,
            interval,
            status: ScanStatus::Waiting,
            dialog: None,
        }
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    /// QR text of the open dialog
    pub fn payload(&self) -> Option<&str> {
        self.dialog.as_ref().map(|d| d.payload.as_str())
    }

    pub fn item(&self) -> Option<&Item> {
        self.dialog.as_ref().map(|d| &d.item)
    }

    /// Open the borrow dialog for an item and return the QR text to show
    pub async fn open(&mut self, item_id: i64) -> AppResult<&str> {
        let item = self.backend.fetch_item(item_id).await?;
        if !item.in_stock() {
            return Err(AppError::StockUnavailable(format!("{} is out of stock", item.name)));
        }

        let payload = qr::encode(self.backend.user_id(), item.id);
        self.status = ScanStatus::Waiting;
        let dialog = self.dialog.insert(BorrowDialog { item, payload });
        Ok(dialog.payload.as_str())
    }

    /// Ask the server once and adopt its answer.
    ///
    /// A failed poll keeps the current status; the next tick tries again.
    /// Once approved the server is no longer asked.
    pub async fn poll_once(&mut self) -> ScanStatus {
        if self.status == ScanStatus::Approved {
            return self.status;
        }

        match self.backend.check_status().await {
            Ok(status) if status != self.status => {
                tracing::debug!(from = %self.status, to = %status, "Scan status changed");
                self.status = status;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Status poll failed: {}", e),
        }
        self.status
    }

    /// Poll until the request is approved or `close` fires.
    ///
    /// Dropping the sender counts as closing. Closing tells the server to
    /// reset the slot. Without an open dialog there is nothing to poll and
    /// the call ends at once as `Closed`.
    pub async fn run(&mut self, mut close: oneshot::Receiver<()>) -> PollOutcome {
        if self.dialog.is_none() {
            return PollOutcome::Closed;
        }

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut close => {
                    if let Err(e) = self.close().await {
                        tracing::warn!("Cancel on close failed: {}", e);
                    }
                    return PollOutcome::Closed;
                }
                _ = ticker.tick() => {
                    if self.poll_once().await == ScanStatus::Approved {
                        self.dialog = None;
                        return PollOutcome::Approved;
                    }
                }
            }
        }
    }

    /// Close the dialog and reset the borrower's slot to `waiting`
    pub async fn close(&mut self) -> AppResult<()> {
        self.dialog = None;
        if self.status == ScanStatus::Approved {
            return Ok(());
        }
        self.status = ScanStatus::Waiting;
        self.backend.cancel_own_scan().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{AdminBackend, LocalUserSession},
        config::AppConfig,
        models::{NewItem, NewUser, UserRole},
        repository::{memory::MemoryRepository, LendingStore},
        services::{scan::ProcessScan, scan_status::MemoryScanStatusStore, Services},
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tokio_test::{assert_err, assert_ok};

    const TICK: Duration = Duration::from_millis(2000);

    async fn fixture(stock: i32) -> (Services, i64, i64) {
        let (services, _, user_id, item_id) = fixture_with_repo(stock).await;
        (services, user_id, item_id)
    }

    async fn fixture_with_repo(stock: i32) -> (Services, Arc<MemoryRepository>, i64, i64) {
        let repo = Arc::new(MemoryRepository::new());
        let user_id = repo
            .ensure_user(NewUser {
                name: "Regular User".to_string(),
                email: "user@user.com".to_string(),
                password_hash: String::new(),
                role: UserRole::User,
            })
            .await
            .unwrap()
            .id;
        let item_id = repo
            .ensure_item(NewItem {
                name: "Mouse Logitech".to_string(),
                item_code: "ITM-004".to_string(),
                stock,
                description: None,
            })
            .await
            .unwrap()
            .id;
        let services = Services::new(
            repo.clone(),
            Arc::new(MemoryScanStatusStore::new()),
            &AppConfig::default(),
        )
        .unwrap();
        (services, repo, user_id, item_id)
    }

    fn approval(user_id: i64, item_id: i64) -> ProcessScan {
        ProcessScan {
            user_id,
            item_id,
            return_date: (Utc::now() + chrono::Duration::days(3)).date_naive(),
        }
    }

    /// Session whose status checks fail a given number of times first
    struct FlakySession {
        inner: LocalUserSession,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl UserBackend for FlakySession {
        fn user_id(&self) -> i64 {
            self.inner.user_id()
        }

        async fn fetch_item(&self, item_id: i64) -> AppResult<Item> {
            self.inner.fetch_item(item_id).await
        }

        async fn check_status(&self) -> AppResult<ScanStatus> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AppError::Internal("connection refused".to_string()));
            }
            self.inner.check_status().await
        }

        async fn cancel_own_scan(&self) -> AppResult<()> {
            self.inner.cancel_own_scan().await
        }
    }

    #[tokio::test]
    async fn test_open_encodes_intent() {
        let (services, user_id, item_id) = fixture(3).await;
        let mut client = UserPollClient::new(LocalUserSession::new(services, user_id), TICK);

        let payload = client.open(item_id).await.unwrap().to_string();
        let intent = qr::decode(&payload).unwrap();
        assert_eq!((intent.user_id, intent.item_id), (user_id, item_id));
        assert_eq!(client.item().map(|i| i.stock), Some(3));
    }

    #[tokio::test]
    async fn test_open_requires_stock() {
        let (services, user_id, item_id) = fixture(0).await;
        let mut client = UserPollClient::new(LocalUserSession::new(services, user_id), TICK);
        let err = assert_err!(client.open(item_id).await);
        assert!(matches!(err, AppError::StockUnavailable(_)));
        assert!(client.payload().is_none());
    }

    #[tokio::test]
    async fn test_poll_adopts_server_status() {
        let (services, user_id, item_id) = fixture(1).await;
        let mut client =
            UserPollClient::new(LocalUserSession::new(services.clone(), user_id), TICK);
        client.open(item_id).await.unwrap();

        assert_eq!(client.poll_once().await, ScanStatus::Waiting);
        assert_ok!(services.lookup(user_id, item_id).await);
        assert_eq!(client.poll_once().await, ScanStatus::Scanning);
        assert_ok!(services.cancel_scan(user_id).await);
        assert_eq!(client.poll_once().await, ScanStatus::Waiting);
    }

    #[tokio::test]
    async fn test_approved_is_final() {
        let (services, repo, user_id, item_id) = fixture_with_repo(2).await;
        let mut client =
            UserPollClient::new(LocalUserSession::new(services.clone(), user_id), TICK);
        client.open(item_id).await.unwrap();

        assert_ok!(services.lookup(user_id, item_id).await);
        let borrowing = services.process_scan(&approval(user_id, item_id)).await.unwrap();
        assert_eq!(client.poll_once().await, ScanStatus::Approved);

        // The server forgets the approval, the client does not
        repo.backdate_borrowing(borrowing.id, Utc::now() - chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert_ok!(services.cancel_scan(user_id).await);
        assert_eq!(services.scan.check_status(user_id).await.unwrap(), ScanStatus::Waiting);
        assert_eq!(client.poll_once().await, ScanStatus::Approved);
        assert_ok!(client.close().await);
        assert_eq!(client.status(), ScanStatus::Approved);

        // A new dialog starts over
        client.open(item_id).await.unwrap();
        assert_eq!(client.status(), ScanStatus::Waiting);
        assert_eq!(client.poll_once().await, ScanStatus::Waiting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_without_dialog_returns_at_once() {
        let (services, user_id, item_id) = fixture(1).await;
        let mut client =
            UserPollClient::new(LocalUserSession::new(services.clone(), user_id), TICK);
        assert_ok!(services.lookup(user_id, item_id).await);

        let (_close_tx, close_rx) = oneshot::channel();
        let started = Instant::now();
        assert_eq!(client.run(close_rx).await, PollOutcome::Closed);
        assert_eq!(started.elapsed(), Duration::ZERO);

        // Nothing was polled and nothing was cancelled
        assert_eq!(client.status(), ScanStatus::Waiting);
        assert_eq!(
            services.scan.check_status(user_id).await.unwrap(),
            ScanStatus::Scanning
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sees_approval_within_two_ticks() {
        let (services, user_id, item_id) = fixture(1).await;
        let mut client =
            UserPollClient::new(LocalUserSession::new(services.clone(), user_id), TICK);
        client.open(item_id).await.unwrap();

        services.lookup(user_id, item_id).await.unwrap();
        services.process_scan(&approval(user_id, item_id)).await.unwrap();

        let (_close_tx, close_rx) = oneshot::channel();
        let started = Instant::now();
        let outcome = client.run(close_rx).await;

        assert_eq!(outcome, PollOutcome::Approved);
        assert!(started.elapsed() <= TICK * 2);
        assert!(client.payload().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_failed_polls() {
        let (services, user_id, item_id) = fixture(1).await;
        let session = FlakySession {
            inner: LocalUserSession::new(services.clone(), user_id),
            failures: AtomicUsize::new(2),
        };
        let mut client = UserPollClient::new(session, TICK);
        client.open(item_id).await.unwrap();
        services.lookup(user_id, item_id).await.unwrap();

        let (_close_tx, close_rx) = oneshot::channel();
        let run = tokio::spawn(async move {
            let outcome = client.run(close_rx).await;
            (outcome, client.status())
        });

        tokio::time::sleep(TICK * 3).await;
        services.process_scan(&approval(user_id, item_id)).await.unwrap();

        let (outcome, status) = run.await.unwrap();
        assert_eq!(outcome, PollOutcome::Approved);
        assert_eq!(status, ScanStatus::Approved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_scan() {
        let (services, user_id, item_id) = fixture(1).await;
        let mut client =
            UserPollClient::new(LocalUserSession::new(services.clone(), user_id), TICK);
        client.open(item_id).await.unwrap();
        services.lookup(user_id, item_id).await.unwrap();

        let (close_tx, close_rx) = oneshot::channel();
        let run = tokio::spawn(async move { client.run(close_rx).await });

        tokio::time::sleep(TICK + TICK / 2).await;
        close_tx.send(()).unwrap();

        assert_eq!(run.await.unwrap(), PollOutcome::Closed);
        assert_eq!(
            services.scan.check_status(user_id).await.unwrap(),
            ScanStatus::Waiting
        );
    }
}
