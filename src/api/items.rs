//! Item (catalog) endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::AppResult, models::Item};

use super::AuthenticatedUser;

/// List all items
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "List of items", body = Vec<Item>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_items(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Item>>> {
    let items = state.services.catalog.list_items().await?;
    Ok(Json(items))
}

/// Get item details
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Item>> {
    let item = state.services.catalog.get_item(id).await?;
    Ok(Json(item))
}
