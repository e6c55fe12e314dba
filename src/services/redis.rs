//! Redis-backed scan status store, for deployments running several server
//! processes behind one load balancer

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use crate::{
    error::{AppError, AppResult},
    models::ScanStatus,
    services::scan_status::ScanStatusStore,
};

#[derive(Clone)]
pub struct RedisScanStatusStore {
    client: Client,
}

impl RedisScanStatusStore {
    /// Create a new Redis store and check the server answers
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::ScanStore(format!("Failed to create Redis client: {}", e)))?;

        let store = Self { client };
        store.ping().await?;
        Ok(store)
    }

    fn key(user_id: i64) -> String {
        format!("scan_status:{}", user_id)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::ScanStore(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl ScanStatusStore for RedisScanStatusStore {
    async fn put(&self, user_id: i64, status: ScanStatus, ttl: Duration) -> AppResult<()> {
        let mut conn = self.connection().await?;
        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(Self::key(user_id), status.as_str(), seconds)
            .await
            .map_err(|e| AppError::ScanStore(format!("Failed to store scan status in Redis: {}", e)))
    }

    async fn get(&self, user_id: i64) -> AppResult<ScanStatus> {
        let mut conn = self.connection().await?;
        let stored: Option<String> = conn
            .get(Self::key(user_id))
            .await
            .map_err(|e| AppError::ScanStore(format!("Failed to get scan status from Redis: {}", e)))?;

        Ok(match stored {
            Some(value) => value.parse().unwrap_or_else(|e: String| {
                tracing::warn!(user_id, "Ignoring unreadable scan status: {}", e);
                ScanStatus::Waiting
            }),
            None => ScanStatus::Waiting,
        })
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::ScanStore(format!("Redis connection test failed: {}", e)))?;
        Ok(())
    }
}
