//! Lending record and return transaction models

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::penalty::compute_penalty;

/// Lifecycle state of a lending record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    Active,
    Returned,
}

/// A loan of one copy of a catalog item to a borrower
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LendingRecord {
    pub id: i32,
    pub borrower_id: i32,
    pub item_id: i32,
    pub date_borrowed: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub is_returned: bool,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl LendingRecord {
    pub fn status(&self) -> LoanStatus {
        if self.is_returned {
            LoanStatus::Returned
        } else {
            LoanStatus::Active
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_returned && now > self.due_date
    }
}

/// Default due date for a loan started at `borrowed`
pub fn default_due_date(borrowed: DateTime<Utc>, loan_period_days: i64) -> DateTime<Utc> {
    borrowed + Duration::days(loan_period_days)
}

/// Create lending record request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateLendingRecord {
    /// Catalog item to borrow
    pub item: i32,
}

/// The one-time return of a lending record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReturnTransaction {
    pub id: i32,
    pub lending_record_id: i32,
    pub date_returned: DateTime<Utc>,
    /// Amount handed over at the desk when returning
    pub penalty_paid: Decimal,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Return transaction with the late fee derived from its lending record
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnDetails {
    #[serde(flatten)]
    pub transaction: ReturnTransaction,
    pub due_date: DateTime<Utc>,
    /// Late fee owed for this return
    pub penalty: Decimal,
}

impl ReturnDetails {
    pub fn new(transaction: ReturnTransaction, due_date: DateTime<Utc>, daily_rate: Decimal) -> Self {
        let penalty = compute_penalty(due_date, transaction.date_returned, daily_rate);
        Self {
            transaction,
            due_date,
            penalty,
        }
    }
}

/// Create return transaction request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateReturn {
    pub lending_record: i32,
    #[serde(default)]
    pub penalty_paid: Option<Decimal>,
}
