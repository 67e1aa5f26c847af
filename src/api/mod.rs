//! API handlers for the lending REST endpoints

pub mod auth;
pub mod health;
pub mod items;
pub mod loans;
pub mod openapi;
pub mod payments;
pub mod penalties;
pub mod returns;
pub mod users;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

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

/// JSON body extractor whose rejections use the `AppError` payload
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path parameter extractor whose rejections use the `AppError` payload
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

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
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        // Catalog
        .route("/library-items", get(items::list_items).post(items::create_item))
        .route("/library-items/available", get(items::list_available_items))
        .route(
            "/library-items/:id",
            get(items::get_item).put(items::update_item).delete(items::delete_item),
        )
        // Loans
        .route("/lending-records", get(loans::list_lending_records).post(loans::create_lending_record))
        .route("/lending-records/:id", get(loans::get_lending_record))
        .route("/lending-records/:id/penalty", get(loans::get_lending_record_penalty))
        // Returns
        .route("/return-transactions", get(returns::list_returns).post(returns::create_return))
        .route("/return-transactions/:id", get(returns::get_return))
        // Penalties and payments
        .route("/penalties", get(penalties::list_penalties))
        .route("/penalties/:id", get(penalties::get_penalty))
        .route("/payments", get(payments::list_payments).post(payments::create_payment))
        .route("/payments/:id", get(payments::get_payment))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
