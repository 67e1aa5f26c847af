//! Return transaction endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;

use crate::{
    error::AppResult,
    models::{
        loan::{CreateReturn, ReturnDetails},
        user::Capability,
    },
    AppState,
};

use super::{AppJson, AppPath, AuthenticatedUser};

/// List return transactions (own returns for regular users)
#[utoipa::path(
    get,
    path = "/return-transactions",
    tag = "returns",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Return transactions", body = Vec<ReturnDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_returns(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReturnDetails>>> {
    let returns = state.services.loans.list_returns(&claims).await?;
    Ok(Json(returns))
}

/// Get a return transaction
#[utoipa::path(
    get,
    path = "/return-transactions/{id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Return transaction ID")
    ),
    responses(
        (status = 200, description = "Return transaction", body = ReturnDetails),
        (status = 404, description = "Return transaction not found")
    )
)]
pub async fn get_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<ReturnDetails>> {
    let details = state.services.loans.get_return(&claims, id).await?;
    Ok(Json(details))
}

/// Return a borrowed item
#[utoipa::path(
    post,
    path = "/return-transactions",
    tag = "returns",
    security(("bearer_auth" = [])),
    request_body = CreateReturn,
    responses(
        (status = 201, description = "Item returned", body = ReturnDetails),
        (status = 400, description = "Already returned", body = crate::error::ErrorResponse),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Lending record not found")
    )
)]
pub async fn create_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<CreateReturn>,
) -> AppResult<(StatusCode, Json<ReturnDetails>)> {
    claims.require(Capability::Return)?;

    let details = state
        .services
        .loans
        .return_loan(
            &claims,
            request.lending_record,
            request.penalty_paid.unwrap_or(Decimal::ZERO),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(details)))
}
