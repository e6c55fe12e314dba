//! Borrowable item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Item availability as set by administrators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Available,
    Unavailable,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Unavailable => "unavailable",
        }
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(ItemStatus::Available),
            "unavailable" => Ok(ItemStatus::Unavailable),
            _ => Err(format!("Invalid item status: {}", s)),
        }
    }
}

text_column_enum!(ItemStatus);

/// Item record. `stock` counts the units currently on the shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub item_code: String,
    pub stock: i32,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Item to insert (used by seeding)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewItem {
    pub name: String,
    pub item_code: String,
    pub stock: i32,
    pub description: Option<String>,
}
