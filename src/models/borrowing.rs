//! Borrowing (loan) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::user::UserShort;

/// Borrowing lifecycle status.
///
/// Scan approvals create borrowings directly as `Approved`; `Pending` and
/// `Rejected` are kept for records written by other tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowingStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
    Overdue,
}

impl BorrowingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowingStatus::Pending => "pending",
            BorrowingStatus::Approved => "approved",
            BorrowingStatus::Rejected => "rejected",
            BorrowingStatus::Returned => "returned",
            BorrowingStatus::Overdue => "overdue",
        }
    }

    /// Whether a unit of stock is out with the borrower
    pub fn is_lent(&self) -> bool {
        matches!(self, BorrowingStatus::Approved | BorrowingStatus::Overdue)
    }
}

impl std::fmt::Display for BorrowingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BorrowingStatus::Pending),
            "approved" => Ok(BorrowingStatus::Approved),
            "rejected" => Ok(BorrowingStatus::Rejected),
            "returned" => Ok(BorrowingStatus::Returned),
            "overdue" => Ok(BorrowingStatus::Overdue),
            _ => Err(format!("Invalid borrowing status: {}", s)),
        }
    }
}

text_column_enum!(BorrowingStatus);

/// Borrowing record from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i64,
    pub user_id: i64,
    pub item_id: i64,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: BorrowingStatus,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Borrowing {
    /// An approved borrowing past its due date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            BorrowingStatus::Overdue => true,
            BorrowingStatus::Approved => self.due_date < now,
            _ => false,
        }
    }
}

/// Borrowing to create on scan approval
#[derive(Debug, Clone, PartialEq)]
pub struct NewBorrowing {
    pub user_id: i64,
    pub item_id: i64,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Borrowing with its item and borrower, for listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingDetails {
    #[serde(flatten)]
    pub borrowing: Borrowing,
    pub item_name: String,
    pub item_code: String,
    pub user: UserShort,
    pub is_overdue: bool,
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LendingStats {
    pub total_items: i64,
    pub active_borrowings: i64,
    pub overdue_items: i64,
}
