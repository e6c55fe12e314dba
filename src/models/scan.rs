//! Types exchanged during the QR-scan borrow handshake

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Progress of a borrow request as seen by the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// No admin is looking at the request (also the value of an absent slot)
    #[default]
    Waiting,
    /// An admin scanned the code and is reviewing it
    Scanning,
    /// The borrowing was created
    Approved,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Waiting => "waiting",
            ScanStatus::Scanning => "scanning",
            ScanStatus::Approved => "approved",
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(ScanStatus::Waiting),
            "scanning" => Ok(ScanStatus::Scanning),
            "approved" => Ok(ScanStatus::Approved),
            _ => Err(format!("Invalid scan status: {}", s)),
        }
    }
}

/// The (user, item) pair a user wants to borrow, carried by the QR code.
///
/// Never persisted. `issued_at` is informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BorrowIntent {
    pub user_id: i64,
    pub item_id: i64,
    pub issued_at: Option<DateTime<Utc>>,
}

impl BorrowIntent {
    pub fn new(user_id: i64, item_id: i64) -> Self {
        Self {
            user_id,
            item_id,
            issued_at: Some(Utc::now()),
        }
    }
}

/// What an admin sees after scanning a code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LookupResult {
    pub user_name: String,
    pub item_name: String,
    pub item_stock: i32,
}
