//! Penalty and payment models, and the late fee rule

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Late fee for an item due at `due_date` and returned at `returned_at`.
///
/// Only whole days count: a return 36 hours late is charged for one day.
pub fn compute_penalty(due_date: DateTime<Utc>, returned_at: DateTime<Utc>, daily_rate: Decimal) -> Decimal {
    if returned_at <= due_date {
        return Decimal::ZERO;
    }
    let days_late = (returned_at - due_date).num_days();
    daily_rate * Decimal::from(days_late)
}

/// Charge raised against a late lending record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Penalty {
    pub id: i32,
    pub lending_record_id: i32,
    pub amount: Decimal,
    pub is_paid: bool,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Money received against a lending record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: i32,
    pub lending_record_id: i32,
    pub penalty_id: Option<i32>,
    pub payment_date: DateTime<Utc>,
    pub amount_settled: Decimal,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Create payment request.
///
/// Any payment that references a penalty settles it in full; partial
/// payments are not tracked.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePayment {
    pub lending_record: i32,
    pub penalty: Option<i32>,
    pub amount_settled: Decimal,
}
