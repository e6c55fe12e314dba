//! Scan status store: the per-user, time-expiring slot both sides of the
//! QR handshake look at.
//!
//! The store is a signaling channel, not a source of truth. A slot that was
//! never written, or whose TTL elapsed, reads as [`ScanStatus::Waiting`].
//! Every `put` overwrites the slot and restarts its TTL (last write wins).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    error::{AppError, AppResult},
    models::ScanStatus,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScanStatusStore: Send + Sync {
    /// Overwrite the slot for `user_id` and restart its TTL
    async fn put(&self, user_id: i64, status: ScanStatus, ttl: Duration) -> AppResult<()>;

    /// Current slot value, `Waiting` when absent or expired
    async fn get(&self, user_id: i64) -> AppResult<ScanStatus>;

    /// Connectivity check used by readiness probes
    async fn ping(&self) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    status: ScanStatus,
    expires_at: Instant,
}

/// In-process store backed by a map. Expired slots are ignored on read and
/// removed by [`MemoryScanStatusStore::sweep`].
#[derive(Debug, Default)]
pub struct MemoryScanStatusStore {
    slots: Mutex<HashMap<i64, Slot>>,
}

impl MemoryScanStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared store and start a background task sweeping expired
    /// slots every `interval`. The task stops once the store is dropped.
    pub fn with_sweeper(interval: Duration) -> Arc<Self> {
        let store = Arc::new(Self::new());
        let weak = Arc::downgrade(&store);
        tokio::spawn(sweep_loop(weak, interval));
        store
    }

    /// Remove expired slots, returning how many were dropped
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.lock();
        let before = slots.len();
        slots.retain(|_, slot| slot.expires_at > now);
        before - slots.len()
    }

    /// Number of slots held, expired or not
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, Slot>> {
        // A poisoned map only ever holds plain data; keep serving it
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn sweep_loop(store: Weak<MemoryScanStatusStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(store) = store.upgrade() else {
            break;
        };
        let removed = store.sweep();
        if removed > 0 {
            tracing::debug!(removed, "Swept expired scan status slots");
        }
    }
}

#[async_trait]
impl ScanStatusStore for MemoryScanStatusStore {
    async fn put(&self, user_id: i64, status: ScanStatus, ttl: Duration) -> AppResult<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| AppError::ScanStore(format!("TTL {:?} out of range", ttl)))?;
        self.lock().insert(user_id, Slot { status, expires_at });
        Ok(())
    }

    async fn get(&self, user_id: i64) -> AppResult<ScanStatus> {
        let now = Instant::now();
        Ok(self
            .lock()
            .get(&user_id)
            .filter(|slot| slot.expires_at > now)
            .map(|slot| slot.status)
            .unwrap_or_default())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(120);

    #[tokio::test]
    async fn test_absent_slot_reads_waiting() {
        let store = MemoryScanStatusStore::new();
        assert_eq!(store.get(1).await.unwrap(), ScanStatus::Waiting);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryScanStatusStore::new();
        store.put(1, ScanStatus::Scanning, TTL).await.unwrap();
        store.put(1, ScanStatus::Approved, TTL).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), ScanStatus::Approved);
        store.put(1, ScanStatus::Waiting, TTL).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), ScanStatus::Waiting);
        assert_eq!(store.get(2).await.unwrap(), ScanStatus::Waiting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_expires_after_ttl() {
        let store = MemoryScanStatusStore::new();
        store.put(1, ScanStatus::Scanning, TTL).await.unwrap();

        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        assert_eq!(store.get(1).await.unwrap(), ScanStatus::Scanning);

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(store.get(1).await.unwrap(), ScanStatus::Waiting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_restarts_ttl() {
        let store = MemoryScanStatusStore::new();
        store.put(1, ScanStatus::Scanning, TTL).await.unwrap();
        tokio::time::advance(Duration::from_secs(100)).await;
        store.put(1, ScanStatus::Scanning, TTL).await.unwrap();
        tokio::time::advance(Duration::from_secs(100)).await;
        assert_eq!(store.get(1).await.unwrap(), ScanStatus::Scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_drops_expired_slots() {
        let store = MemoryScanStatusStore::with_sweeper(Duration::from_secs(30));
        store.put(1, ScanStatus::Scanning, Duration::from_secs(10)).await.unwrap();
        store.put(2, ScanStatus::Approved, Duration::from_secs(600)).await.unwrap();
        assert_eq!(store.len(), 2);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(2).await.unwrap(), ScanStatus::Approved);
    }
}
