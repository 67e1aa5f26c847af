//! Penalty engine: late fees and their settlement

use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        penalty::{compute_penalty, CreatePayment, Payment, Penalty},
        user::{Capability, UserClaims},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct PenaltiesService {
    repository: Repository,
    config: LendingConfig,
}

impl PenaltiesService {
    pub fn new(repository: Repository, config: LendingConfig) -> Self {
        Self { repository, config }
    }

    /// Late fee of a lending record visible to `actor`: the raised penalty
    /// once returned, otherwise what a return right now would cost
    pub async fn current_penalty(&self, actor: &UserClaims, lending_record_id: i32) -> AppResult<Decimal> {
        let record = self.repository.loans.get_by_id(lending_record_id).await?;
        if let Some(borrower) = actor.visible_borrower() {
            if borrower != record.borrower_id {
                return Err(AppError::NotFound(format!(
                    "Lending record with id {} not found",
                    lending_record_id
                )));
            }
        }

        if record.is_returned {
            let raised = self
                .repository
                .penalties
                .get_by_lending_record(record.id)
                .await?;
            return Ok(raised.map(|p| p.amount).unwrap_or(Decimal::ZERO));
        }

        let now = Utc::now();
        if !record.is_overdue(now) {
            return Ok(Decimal::ZERO);
        }
        Ok(compute_penalty(record.due_date, now, self.config.daily_penalty_rate))
    }

    pub async fn get_penalty(&self, actor: &UserClaims, id: i32) -> AppResult<Penalty> {
        self.repository
            .penalties
            .get_by_id(id, actor.visible_borrower())
            .await
    }

    pub async fn list_penalties(&self, actor: &UserClaims) -> AppResult<Vec<Penalty>> {
        self.repository.penalties.list(actor.visible_borrower()).await
    }

    pub async fn get_payment(&self, actor: &UserClaims, id: i32) -> AppResult<Payment> {
        self.repository
            .penalties
            .get_payment(id, actor.visible_borrower())
            .await
    }

    pub async fn list_payments(&self, actor: &UserClaims) -> AppResult<Vec<Payment>> {
        self.repository
            .penalties
            .list_payments(actor.visible_borrower())
            .await
    }

    /// Record a payment by `actor` against one of their returned loans.
    ///
    /// A referenced penalty is marked paid exactly once, whatever the amount.
    pub async fn record_payment(&self, actor: &UserClaims, payment: CreatePayment) -> AppResult<Payment> {
        if payment.amount_settled <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Amount settled must be greater than zero".to_string(),
            ));
        }

        let mut tx = self.repository.begin().await?;

        let record = self.repository.loans.lock(&mut tx, payment.lending_record).await?;
        if record.borrower_id != actor.user_id {
            return Err(AppError::Authorization(
                "Only the borrower can pay for this lending record".to_string(),
            ));
        }
        if !record.is_returned {
            return Err(AppError::NotReturned(record.id));
        }
        let borrower = self.repository.users.lock(&mut tx, record.borrower_id).await?;
        borrower.account_type.require(Capability::Pay)?;

        if let Some(penalty_id) = payment.penalty {
            let penalty = self.repository.penalties.lock(&mut tx, penalty_id).await?;
            if penalty.lending_record_id != record.id {
                return Err(AppError::Validation(format!(
                    "Penalty {} does not belong to lending record {}",
                    penalty_id, record.id
                )));
            }
            if !penalty.is_paid {
                self.repository.penalties.mark_paid(&mut tx, penalty.id).await?;
                tracing::info!(penalty_id = penalty.id, amount = %penalty.amount, "Penalty settled");
            }
        }

        let created = self
            .repository
            .penalties
            .create_payment(&mut tx, record.id, payment.penalty, payment.amount_settled)
            .await?;

        tx.commit().await?;

        tracing::info!(
            payment_id = created.id,
            loan_id = record.id,
            amount = %created.amount_settled,
            "Payment recorded"
        );
        Ok(created)
    }
}
