//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, borrowings, health, items, scan};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gearloan API",
        version = "0.3.0",
        description = "Equipment lending REST API with QR-scan borrowing"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Items
        items::list_items,
        items::get_item,
        // Scan handshake
        scan::lookup,
        scan::cancel_scan,
        scan::process_scan,
        scan::issue_intent,
        scan::check_status,
        scan::cancel_own_scan,
        // Borrowings
        borrowings::list_all,
        borrowings::return_item,
        borrowings::dashboard,
        borrowings::list_mine,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            crate::models::UserShort,
            crate::models::UserRole,
            // Items
            crate::models::Item,
            crate::models::ItemStatus,
            // Scan
            scan::LookupRequest,
            scan::LookupResponse,
            scan::CancelRequest,
            scan::StatusResponse,
            scan::IntentRequest,
            scan::IntentResponse,
            crate::models::ScanStatus,
            crate::models::BorrowIntent,
            crate::models::LookupResult,
            crate::services::scan::ProcessScan,
            // Borrowings
            crate::models::Borrowing,
            crate::models::BorrowingStatus,
            crate::models::BorrowingDetails,
            crate::models::LendingStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "items", description = "Equipment catalog"),
        (name = "scan", description = "QR-scan borrow handshake"),
        (name = "borrowings", description = "Borrowing history and returns")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_scan_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/admin/scan", "/admin/scan/lookup", "/user/scan/check-status"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
