//! Payment endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        penalty::{CreatePayment, Payment},
        user::Capability,
    },
    AppState,
};

use super::{AppJson, AppPath, AuthenticatedUser};

/// List payments (own payments for regular users)
#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Payments", body = Vec<Payment>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_payments(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = state.services.penalties.list_payments(&claims).await?;
    Ok(Json(payments))
}

/// Get a payment
#[utoipa::path(
    get,
    path = "/payments/{id}",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Payment", body = Payment),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn get_payment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<Payment>> {
    let payment = state.services.penalties.get_payment(&claims, id).await?;
    Ok(Json(payment))
}

/// Record a payment, settling the referenced penalty
#[utoipa::path(
    post,
    path = "/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    request_body = CreatePayment,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 400, description = "Item not yet returned or invalid amount", body = crate::error::ErrorResponse),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Lending record or penalty not found")
    )
)]
pub async fn create_payment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(payment): AppJson<CreatePayment>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    claims.require(Capability::Pay)?;

    let created = state.services.penalties.record_payment(&claims, payment).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
