//! API handlers for Gearloan REST endpoints

pub mod auth;
pub mod borrowings;
pub mod health;
pub mod items;
pub mod openapi;
pub mod scan;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Catalog
        .route("/items", get(items::list_items))
        .route("/items/:id", get(items::get_item))
        // Admin scanning desk
        .route("/admin/scan", post(scan::process_scan))
        .route("/admin/scan/lookup", post(scan::lookup))
        .route("/admin/scan/cancel", post(scan::cancel_scan))
        .route("/admin/borrowings", get(borrowings::list_all))
        .route("/admin/borrowings/:id/return", post(borrowings::return_item))
        .route("/admin/dashboard", get(borrowings::dashboard))
        // Borrower
        .route("/user/scan/intent", post(scan::issue_intent))
        .route("/user/scan/check-status", get(scan::check_status))
        .route("/user/scan/cancel", post(scan::cancel_own_scan))
        .route("/user/borrowings", get(borrowings::list_mine))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
