//! Penalty endpoints (read-only)

use axum::{
    extract::State,
    Json,
};

use crate::{error::AppResult, models::penalty::Penalty, AppState};

use super::{AppPath, AuthenticatedUser};

/// List penalties (own penalties for regular users)
#[utoipa::path(
    get,
    path = "/penalties",
    tag = "penalties",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Penalties", body = Vec<Penalty>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_penalties(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Penalty>>> {
    let penalties = state.services.penalties.list_penalties(&claims).await?;
    Ok(Json(penalties))
}

/// Get a penalty
#[utoipa::path(
    get,
    path = "/penalties/{id}",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Penalty ID")
    ),
    responses(
        (status = 200, description = "Penalty", body = Penalty),
        (status = 404, description = "Penalty not found")
    )
)]
pub async fn get_penalty(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<Penalty>> {
    let penalty = state.services.penalties.get_penalty(&claims, id).await?;
    Ok(Json(penalty))
}
