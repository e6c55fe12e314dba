//! QR-scan handshake endpoints.
//!
//! Borrowers get a payload for their QR code and poll their status; admins
//! look the scanned code up, then approve or cancel it.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{Borrowing, BorrowIntent, LookupResult, ScanStatus},
    services::scan::ProcessScan,
};

use super::AuthenticatedUser;

/// Lookup request: either the decoded ids or the raw QR text
#[derive(Deserialize, ToSchema)]
pub struct LookupRequest {
    pub user_id: Option<i64>,
    pub item_id: Option<i64>,
    /// Raw QR text, used instead of the ids when present
    pub payload: Option<String>,
}

/// Lookup response
#[derive(Serialize, ToSchema)]
pub struct LookupResponse {
    pub user_id: i64,
    pub item_id: i64,
    #[serde(flatten)]
    pub result: LookupResult,
}

#[derive(Deserialize, ToSchema)]
pub struct CancelRequest {
    pub user_id: i64,
}

/// Scan status of a borrower
#[derive(Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: ScanStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct IntentRequest {
    pub item_id: i64,
}

/// QR payload for the borrow dialog
#[derive(Serialize, ToSchema)]
pub struct IntentResponse {
    /// Text to render as a QR code
    pub payload: String,
    pub intent: BorrowIntent,
    /// How often the dialog should poll its status
    pub poll_interval_ms: u64,
}

/// Look up a scanned request and mark the borrower as being scanned
#[utoipa::path(
    post,
    path = "/admin/scan/lookup",
    tag = "scan",
    security(("bearer_auth" = [])),
    request_body = LookupRequest,
    responses(
        (status = 200, description = "Request resolved", body = LookupResponse),
        (status = 400, description = "Malformed payload or missing fields"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User or item not found")
    )
)]
pub async fn lookup(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<LookupRequest>,
) -> AppResult<Json<LookupResponse>> {
    claims.require_admin()?;

    let scan = &state.services.scan;
    let (user_id, item_id, result) = match (request.payload, request.user_id, request.item_id) {
        (Some(text), _, _) => {
            let (intent, result) = scan.lookup_payload(&text).await?;
            (intent.user_id, intent.item_id, result)
        }
        (None, Some(user_id), Some(item_id)) => {
            let result = scan.lookup(user_id, item_id).await?;
            (user_id, item_id, result)
        }
        (None, user_id, _) => {
            let missing = if user_id.is_none() { "user_id" } else { "item_id" };
            return Err(AppError::MissingFields(format!("Missing field: {}", missing)));
        }
    };

    Ok(Json(LookupResponse {
        user_id,
        item_id,
        result,
    }))
}

/// Abandon a scanned request and reset the borrower to waiting
#[utoipa::path(
    post,
    path = "/admin/scan/cancel",
    tag = "scan",
    security(("bearer_auth" = [])),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Borrower reset to waiting", body = StatusResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn cancel_scan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CancelRequest>,
) -> AppResult<Json<StatusResponse>> {
    claims.require_admin()?;

    state.services.scan.cancel_scan(request.user_id).await?;
    Ok(Json(StatusResponse {
        status: ScanStatus::Waiting,
    }))
}

/// Approve a scanned request: create the borrowing and take one unit of stock
#[utoipa::path(
    post,
    path = "/admin/scan",
    tag = "scan",
    security(("bearer_auth" = [])),
    request_body = ProcessScan,
    responses(
        (status = 201, description = "Borrowing created", body = Borrowing),
        (status = 400, description = "Invalid ids or return date in the past"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User or item not found"),
        (status = 409, description = "Item out of stock")
    )
)]
pub async fn process_scan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<ProcessScan>,
) -> AppResult<(StatusCode, Json<Borrowing>)> {
    claims.require_admin()?;

    let borrowing = state.services.scan.process_scan(&request).await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// Get a QR payload for borrowing an item
#[utoipa::path(
    post,
    path = "/user/scan/intent",
    tag = "scan",
    security(("bearer_auth" = [])),
    request_body = IntentRequest,
    responses(
        (status = 200, description = "Payload issued", body = IntentResponse),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item out of stock")
    )
)]
pub async fn issue_intent(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<IntentRequest>,
) -> AppResult<Json<IntentResponse>> {
    claims.require_user()?;

    let scan = &state.services.scan;
    let (intent, payload) = scan.issue_intent(claims.user_id, request.item_id).await?;

    Ok(Json(IntentResponse {
        payload,
        intent,
        poll_interval_ms: scan.poll_interval().as_millis() as u64,
    }))
}

/// Current scan status of the calling borrower
#[utoipa::path(
    get,
    path = "/user/scan/check-status",
    tag = "scan",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current status", body = StatusResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn check_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StatusResponse>> {
    claims.require_user()?;

    let status = state.services.scan.check_status(claims.user_id).await?;
    Ok(Json(StatusResponse { status }))
}

/// Close the borrow dialog and reset the caller to waiting
#[utoipa::path(
    post,
    path = "/user/scan/cancel",
    tag = "scan",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reset to waiting", body = StatusResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn cancel_own_scan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StatusResponse>> {
    claims.require_user()?;

    state.services.scan.cancel_scan(claims.user_id).await?;
    Ok(Json(StatusResponse {
        status: ScanStatus::Waiting,
    }))
}
