//! Loan lifecycle service: borrowing and returning items

use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        item::Restock,
        loan::{default_due_date, LendingRecord, LoanStatus, ReturnDetails},
        user::{Capability, UserClaims},
    },
    repository::{loans::ReturnRow, Repository},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LendingConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LendingConfig) -> Self {
        Self { repository, config }
    }

    /// Borrow one copy of `item_id` for `borrower_id`.
    ///
    /// The borrower row and the item row stay locked until commit, so the
    /// availability check, the limit check, the stock decrement and the
    /// insert are applied together or not at all.
    pub async fn create_loan(&self, borrower_id: i32, item_id: i32) -> AppResult<LendingRecord> {
        let mut tx = self.repository.begin().await?;

        let borrower = self.repository.users.lock(&mut tx, borrower_id).await?;
        borrower.account_type.require(Capability::Borrow)?;
        let mut item = self.repository.items.lock(&mut tx, item_id).await?;

        item.lend()?;

        let active = self.repository.loans.count_active(&mut tx, borrower_id).await?;
        if active >= self.config.max_active_loans {
            return Err(AppError::BorrowingLimitReached(active));
        }

        self.repository.items.save_stock(&mut tx, &item).await?;

        let now = Utc::now();
        let due_date = default_due_date(now, self.config.loan_period_days);
        let record = self
            .repository
            .loans
            .create(&mut tx, borrower_id, item_id, now, due_date)
            .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = record.id,
            borrower_id,
            item_id,
            available_stock = item.available_stock,
            "Item lent"
        );
        Ok(record)
    }

    /// Return a lending record, restock the item and raise any late fee
    pub async fn return_loan(
        &self,
        actor: &UserClaims,
        lending_record_id: i32,
        penalty_paid: Decimal,
    ) -> AppResult<ReturnDetails> {
        if penalty_paid < Decimal::ZERO {
            return Err(AppError::Validation("Penalty paid cannot be negative".to_string()));
        }

        let mut tx = self.repository.begin().await?;

        let record = self.repository.loans.lock(&mut tx, lending_record_id).await?;
        if record.borrower_id != actor.user_id {
            return Err(AppError::Authorization(
                "Only the borrower can return this item".to_string(),
            ));
        }
        if record.status() == LoanStatus::Returned {
            return Err(AppError::AlreadyReturned(record.id));
        }
        // The token's role may be stale; the locked row is authoritative
        let borrower = self.repository.users.lock(&mut tx, record.borrower_id).await?;
        borrower.account_type.require(Capability::Return)?;

        let now = Utc::now();
        let transaction = self
            .repository
            .loans
            .create_return(&mut tx, record.id, now, penalty_paid)
            .await?;

        let mut item = self.repository.items.lock(&mut tx, record.item_id).await?;
        if item.return_item() == Restock::Capped {
            tracing::warn!(
                item_id = item.id,
                total_stock = item.total_stock,
                "Returned copy would exceed total stock, count left at total"
            );
        }
        self.repository.items.save_stock(&mut tx, &item).await?;

        let details = ReturnDetails::new(transaction, record.due_date, self.config.daily_penalty_rate);
        if details.penalty > Decimal::ZERO {
            let penalty = self
                .repository
                .penalties
                .create(&mut tx, record.id, details.penalty)
                .await?;
            tracing::info!(
                penalty_id = penalty.id,
                loan_id = record.id,
                amount = %penalty.amount,
                "Late return penalty raised"
            );
        }

        tx.commit().await?;

        tracing::info!(loan_id = record.id, item_id = item.id, "Item returned");
        Ok(details)
    }

    /// Get a lending record visible to `actor`
    pub async fn get_loan(&self, actor: &UserClaims, id: i32) -> AppResult<LendingRecord> {
        let record = self.repository.loans.get_by_id(id).await?;
        match actor.visible_borrower() {
            Some(borrower) if borrower != record.borrower_id => Err(AppError::NotFound(format!(
                "Lending record with id {} not found",
                id
            ))),
            _ => Ok(record),
        }
    }

    /// List the lending records visible to `actor`
    pub async fn list_loans(&self, actor: &UserClaims) -> AppResult<Vec<LendingRecord>> {
        self.repository.loans.list(actor.visible_borrower()).await
    }

    /// Get a return transaction visible to `actor`
    pub async fn get_return(&self, actor: &UserClaims, id: i32) -> AppResult<ReturnDetails> {
        let row = self.repository.loans.get_return(id).await?;
        match actor.visible_borrower() {
            Some(borrower) if borrower != row.borrower_id => Err(AppError::NotFound(format!(
                "Return transaction with id {} not found",
                id
            ))),
            _ => Ok(self.details(row)),
        }
    }

    /// List the return transactions visible to `actor`
    pub async fn list_returns(&self, actor: &UserClaims) -> AppResult<Vec<ReturnDetails>> {
        let rows = self
            .repository
            .loans
            .list_returns(actor.visible_borrower())
            .await?;
        Ok(rows.into_iter().map(|row| self.details(row)).collect())
    }

    fn details(&self, row: ReturnRow) -> ReturnDetails {
        ReturnDetails::new(row.transaction, row.due_date, self.config.daily_penalty_rate)
    }
}
