//! Shared setup for the integration tests

use std::sync::Arc;

use gearloan_server::{
    repository::memory::MemoryRepository,
    services::{scan_status::MemoryScanStatusStore, Services},
    AppConfig, AppState,
};

pub const ADMIN: (&str, &str) = ("admin@admin.com", "A1234567?");
pub const USER: (&str, &str) = ("user@user.com", "password");

/// Application state over in-memory backends, seeded with the demo data
pub async fn seeded_state() -> AppState {
    let config = AppConfig::default();
    let services = Services::new(
        Arc::new(MemoryRepository::new()),
        Arc::new(MemoryScanStatusStore::new()),
        &config,
    )
    .expect("Failed to create services");
    services
        .catalog
        .seed_demo_data()
        .await
        .expect("Failed to seed demo data");

    AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    }
}

/// Id of a seeded item by its code
pub async fn item_id(state: &AppState, item_code: &str) -> i64 {
    state
        .services
        .catalog
        .list_items()
        .await
        .expect("Failed to list items")
        .into_iter()
        .find(|item| item.item_code == item_code)
        .map(|item| item.id)
        .expect("No such seeded item")
}
