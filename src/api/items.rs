//! Catalog item endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        item::{CatalogItem, CreateItem, UpdateItem},
        user::Capability,
    },
    AppState,
};

use super::{AppJson, AppPath, AuthenticatedUser};

/// List all catalog items
#[utoipa::path(
    get,
    path = "/library-items",
    tag = "items",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "List of items", body = Vec<CatalogItem>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<CatalogItem>>> {
    let items = state.services.catalog.list_items(false).await?;
    Ok(Json(items))
}

/// List items with at least one copy available
#[utoipa::path(
    get,
    path = "/library-items/available",
    tag = "items",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Available items", body = Vec<CatalogItem>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_available_items(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<CatalogItem>>> {
    let items = state.services.catalog.list_items(true).await?;
    Ok(Json(items))
}

/// Get item details by ID
#[utoipa::path(
    get,
    path = "/library-items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = CatalogItem),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<CatalogItem>> {
    let item = state.services.catalog.get_item(id).await?;
    Ok(Json(item))
}

/// Create a new item
#[utoipa::path(
    post,
    path = "/library-items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = CatalogItem),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator privileges required"),
        (status = 409, description = "Identifier already exists")
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(item): AppJson<CreateItem>,
) -> AppResult<(StatusCode, Json<CatalogItem>)> {
    claims.require(Capability::ManageCatalog)?;

    let created = state.services.catalog.create_item(item, claims.user_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an item
#[utoipa::path(
    put,
    path = "/library-items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = CatalogItem),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
    AppJson(item): AppJson<UpdateItem>,
) -> AppResult<Json<CatalogItem>> {
    claims.require(Capability::ManageCatalog)?;

    let updated = state.services.catalog.update_item(id, item).await?;
    Ok(Json(updated))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/library-items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item has copies on loan")
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    claims.require(Capability::ManageCatalog)?;

    state.services.catalog.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
