//! Borrowing history, returns and dashboard

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{Borrowing, BorrowingDetails, LendingStats},
};

use super::AuthenticatedUser;

/// List every borrowing, newest first
#[utoipa::path(
    get,
    path = "/admin/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All borrowings", body = Vec<BorrowingDetails>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_all(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    claims.require_admin()?;

    let borrowings = state.services.borrowings.list_all().await?;
    Ok(Json(borrowings))
}

/// Mark a borrowed item as returned
#[utoipa::path(
    post,
    path = "/admin/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Item returned", body = Borrowing),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Borrowing not found"),
        (status = 422, description = "Item already returned")
    )
)]
pub async fn return_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Borrowing>> {
    claims.require_admin()?;

    let borrowing = state.services.borrowings.return_item(id).await?;
    Ok(Json(borrowing))
}

/// Lending statistics for the admin dashboard
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard counters", body = LendingStats),
        (status = 403, description = "Admin only")
    )
)]
pub async fn dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<LendingStats>> {
    claims.require_admin()?;

    let stats = state.services.borrowings.stats().await?;
    Ok(Json(stats))
}

/// The caller's own borrowings, newest first
#[utoipa::path(
    get,
    path = "/user/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own borrowings", body = Vec<BorrowingDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_mine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    claims.require_user()?;

    let borrowings = state.services.borrowings.list_for_user(claims.user_id).await?;
    Ok(Json(borrowings))
}
