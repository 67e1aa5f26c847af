//! Lending record endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        loan::{CreateLendingRecord, LendingRecord},
        user::Capability,
    },
    AppState,
};

use super::{AppJson, AppPath, AuthenticatedUser};

/// Late fee of a lending record
#[derive(Serialize, ToSchema)]
pub struct PenaltyResponse {
    pub lending_record: i32,
    pub penalty: Decimal,
}

/// List lending records (own records for regular users)
#[utoipa::path(
    get,
    path = "/lending-records",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Lending records", body = Vec<LendingRecord>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_lending_records(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LendingRecord>>> {
    let records = state.services.loans.list_loans(&claims).await?;
    Ok(Json(records))
}

/// Get a lending record
#[utoipa::path(
    get,
    path = "/lending-records/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Lending record ID")
    ),
    responses(
        (status = 200, description = "Lending record", body = LendingRecord),
        (status = 404, description = "Lending record not found")
    )
)]
pub async fn get_lending_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<LendingRecord>> {
    let record = state.services.loans.get_loan(&claims, id).await?;
    Ok(Json(record))
}

/// Borrow an item
#[utoipa::path(
    post,
    path = "/lending-records",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLendingRecord,
    responses(
        (status = 201, description = "Item borrowed", body = LendingRecord),
        (status = 400, description = "Item unavailable or borrowing limit reached", body = crate::error::ErrorResponse),
        (status = 403, description = "Regular users only"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn create_lending_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<CreateLendingRecord>,
) -> AppResult<(StatusCode, Json<LendingRecord>)> {
    claims.require(Capability::Borrow)?;

    let record = state
        .services
        .loans
        .create_loan(claims.user_id, request.item)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Late fee owed for a lending record
#[utoipa::path(
    get,
    path = "/lending-records/{id}/penalty",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Lending record ID")
    ),
    responses(
        (status = 200, description = "Raised penalty, or the fee if returned now", body = PenaltyResponse),
        (status = 404, description = "Lending record not found")
    )
)]
pub async fn get_lending_record_penalty(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<PenaltyResponse>> {
    let penalty = state.services.penalties.current_penalty(&claims, id).await?;
    Ok(Json(PenaltyResponse {
        lending_record: id,
        penalty,
    }))
}
