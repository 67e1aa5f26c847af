//! Penalties and payments repository

use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::penalty::{Payment, Penalty},
};

#[derive(Clone)]
pub struct PenaltiesRepository {
    pool: Pool<Postgres>,
}

impl PenaltiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Raise a penalty against a lending record
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        lending_record_id: i32,
        amount: Decimal,
    ) -> AppResult<Penalty> {
        sqlx::query_as::<_, Penalty>(
            r#"
            INSERT INTO penalties (lending_record_id, amount)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(lending_record_id)
        .bind(amount)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(e, "A penalty already exists for this lending record")
        })
    }

    /// Get penalty by ID, restricted to one borrower when `borrower_id` is set
    pub async fn get_by_id(&self, id: i32, borrower_id: Option<i32>) -> AppResult<Penalty> {
        sqlx::query_as::<_, Penalty>(
            r#"
            SELECT p.* FROM penalties p
            JOIN lending_records l ON l.id = p.lending_record_id
            WHERE p.id = $1 AND ($2::int IS NULL OR l.borrower_id = $2)
            "#,
        )
        .bind(id)
        .bind(borrower_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Penalty with id {} not found", id)))
    }

    /// Penalty raised against a lending record, if any
    pub async fn get_by_lending_record(&self, lending_record_id: i32) -> AppResult<Option<Penalty>> {
        let penalty = sqlx::query_as::<_, Penalty>(
            "SELECT * FROM penalties WHERE lending_record_id = $1",
        )
        .bind(lending_record_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(penalty)
    }

    /// List penalties, optionally for a single borrower
    pub async fn list(&self, borrower_id: Option<i32>) -> AppResult<Vec<Penalty>> {
        let penalties = sqlx::query_as::<_, Penalty>(
            r#"
            SELECT p.* FROM penalties p
            JOIN lending_records l ON l.id = p.lending_record_id
            WHERE $1::int IS NULL OR l.borrower_id = $1
            ORDER BY p.created_on DESC, p.id DESC
            "#,
        )
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(penalties)
    }

    /// Lock a penalty for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Penalty> {
        sqlx::query_as::<_, Penalty>("SELECT * FROM penalties WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Penalty with id {} not found", id)))
    }

    /// Flag a locked penalty as settled
    pub async fn mark_paid(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE penalties SET is_paid = TRUE, updated_on = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Record a payment
    pub async fn create_payment(
        &self,
        conn: &mut PgConnection,
        lending_record_id: i32,
        penalty_id: Option<i32>,
        amount_settled: Decimal,
    ) -> AppResult<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (lending_record_id, penalty_id, amount_settled)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(lending_record_id)
        .bind(penalty_id)
        .bind(amount_settled)
        .fetch_one(&mut *conn)
        .await?;
        Ok(payment)
    }

    /// Get payment by ID, restricted to one borrower when `borrower_id` is set
    pub async fn get_payment(&self, id: i32, borrower_id: Option<i32>) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.* FROM payments p
            JOIN lending_records l ON l.id = p.lending_record_id
            WHERE p.id = $1 AND ($2::int IS NULL OR l.borrower_id = $2)
            "#,
        )
        .bind(id)
        .bind(borrower_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment with id {} not found", id)))
    }

    /// List payments, optionally for a single borrower
    pub async fn list_payments(&self, borrower_id: Option<i32>) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.* FROM payments p
            JOIN lending_records l ON l.id = p.lending_record_id
            WHERE $1::int IS NULL OR l.borrower_id = $1
            ORDER BY p.payment_date DESC, p.id DESC
            "#,
        )
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }
}
