//! Authentication service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{User, UserClaims, UserShort},
    repository::LendingStore,
};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn LendingStore>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn LendingStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Check credentials and return a bearer token with the user
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&user.password_hash, password) {
            tracing::info!(email, "Rejected login");
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    /// Issue a token for a user
    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
            iat: now,
        };
        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Current user's public profile
    pub async fn me(&self, user_id: i64) -> AppResult<UserShort> {
        self.store
            .find_user(user_id)
            .await?
            .map(UserShort::from)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))
    }
}

/// Hash a password with Argon2 and a random salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(stored_hash: &str, password: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
