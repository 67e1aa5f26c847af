//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, health, items, loans, payments, penalties, returns, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lending API",
        version = "0.1.0",
        description = "Library lending REST API: catalog, loans, returns, late fees and payments"
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
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Items
        items::list_items,
        items::list_available_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::delete_item,
        // Loans
        loans::list_lending_records,
        loans::get_lending_record,
        loans::create_lending_record,
        loans::get_lending_record_penalty,
        // Returns
        returns::list_returns,
        returns::get_return,
        returns::create_return,
        // Penalties
        penalties::list_penalties,
        penalties::get_penalty,
        // Payments
        payments::list_payments,
        payments::get_payment,
        payments::create_payment,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Users
            crate::models::user::AccountType,
            crate::models::user::User,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            // Items
            crate::models::item::CatalogItem,
            crate::models::item::CreateItem,
            crate::models::item::UpdateItem,
            // Loans
            crate::models::loan::LendingRecord,
            crate::models::loan::CreateLendingRecord,
            loans::PenaltyResponse,
            // Returns
            crate::models::loan::ReturnTransaction,
            crate::models::loan::ReturnDetails,
            crate::models::loan::CreateReturn,
            // Penalties and payments
            crate::models::penalty::Penalty,
            crate::models::penalty::Payment,
            crate::models::penalty::CreatePayment,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User management"),
        (name = "items", description = "Catalog item management"),
        (name = "loans", description = "Lending records"),
        (name = "returns", description = "Return transactions"),
        (name = "penalties", description = "Late return penalties"),
        (name = "payments", description = "Penalty payments")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
