//! Catalog service: browsing items and demo seeding

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Item, NewItem, NewUser, UserRole},
    repository::LendingStore,
    services::auth::hash_password,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn LendingStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn LendingStore>) -> Self {
        Self { store }
    }

    pub async fn list_items(&self) -> AppResult<Vec<Item>> {
        self.store.list_items().await
    }

    pub async fn get_item(&self, id: i64) -> AppResult<Item> {
        self.store
            .find_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// Insert the demo accounts and inventory. Existing rows are kept as is.
    pub async fn seed_demo_data(&self) -> AppResult<()> {
        let accounts = [
            ("Admin User", "admin@admin.com", "A1234567?", UserRole::Admin),
            ("Regular User", "user@user.com", "password", UserRole::User),
        ];
        for (name, email, password, role) in accounts {
            if self.store.find_user_by_email(email).await?.is_some() {
                continue;
            }
            self.store
                .ensure_user(NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    password_hash: hash_password(password)?,
                    role,
                })
                .await?;
        }

        let inventory = [
            ("Laptop Dell Latitude", "ITM-001", 5),
            ("Projector Epson", "ITM-002", 2),
            ("Speaker JBL", "ITM-003", 1),
            ("Mouse Logitech", "ITM-004", 10),
            ("HDMI Cable", "ITM-005", 15),
        ];
        for (name, item_code, stock) in inventory {
            self.store
                .ensure_item(NewItem {
                    name: name.to_string(),
                    item_code: item_code.to_string(),
                    stock,
                    description: None,
                })
                .await?;
        }

        tracing::info!("Demo data seeded");
        Ok(())
    }
}
