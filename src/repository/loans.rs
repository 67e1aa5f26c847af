//! Lending records and return transactions repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::loan::{LendingRecord, ReturnTransaction},
};

/// A return transaction joined with the loan it closed
pub struct ReturnRow {
    pub transaction: ReturnTransaction,
    pub borrower_id: i32,
    pub due_date: DateTime<Utc>,
}

const RETURN_COLUMNS: &str = r#"
    SELECT r.*, l.borrower_id, l.due_date
    FROM return_transactions r
    JOIN lending_records l ON l.id = r.lending_record_id
"#;

fn return_row(row: &sqlx::postgres::PgRow) -> Result<ReturnRow, sqlx::Error> {
    Ok(ReturnRow {
        transaction: ReturnTransaction {
            id: row.try_get("id")?,
            lending_record_id: row.try_get("lending_record_id")?,
            date_returned: row.try_get("date_returned")?,
            penalty_paid: row.try_get("penalty_paid")?,
            created_on: row.try_get("created_on")?,
            updated_on: row.try_get("updated_on")?,
        },
        borrower_id: row.try_get("borrower_id")?,
        due_date: row.try_get("due_date")?,
    })
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get lending record by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<LendingRecord> {
        sqlx::query_as::<_, LendingRecord>("SELECT * FROM lending_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lending record with id {} not found", id)))
    }

    /// List lending records, newest first, optionally for a single borrower
    pub async fn list(&self, borrower_id: Option<i32>) -> AppResult<Vec<LendingRecord>> {
        let records = sqlx::query_as::<_, LendingRecord>(
            r#"
            SELECT * FROM lending_records
            WHERE $1::int IS NULL OR borrower_id = $1
            ORDER BY date_borrowed DESC, id DESC
            "#,
        )
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Lock a lending record for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<LendingRecord> {
        sqlx::query_as::<_, LendingRecord>("SELECT * FROM lending_records WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lending record with id {} not found", id)))
    }

    /// Count a borrower's unreturned loans
    pub async fn count_active(&self, conn: &mut PgConnection, borrower_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lending_records WHERE borrower_id = $1 AND is_returned = FALSE",
        )
        .bind(borrower_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(count)
    }

    /// Insert an active lending record
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        borrower_id: i32,
        item_id: i32,
        date_borrowed: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<LendingRecord> {
        let record = sqlx::query_as::<_, LendingRecord>(
            r#"
            INSERT INTO lending_records (borrower_id, item_id, date_borrowed, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(borrower_id)
        .bind(item_id)
        .bind(date_borrowed)
        .bind(due_date)
        .fetch_one(&mut *conn)
        .await?;
        Ok(record)
    }

    /// Record the return of a locked lending record and flip its flag
    pub async fn create_return(
        &self,
        conn: &mut PgConnection,
        lending_record_id: i32,
        date_returned: DateTime<Utc>,
        penalty_paid: Decimal,
    ) -> AppResult<ReturnTransaction> {
        let transaction = sqlx::query_as::<_, ReturnTransaction>(
            r#"
            INSERT INTO return_transactions (lending_record_id, date_returned, penalty_paid)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(lending_record_id)
        .bind(date_returned)
        .bind(penalty_paid)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::AlreadyReturned(lending_record_id)
            }
            _ => AppError::Database(e),
        })?;

        sqlx::query(
            "UPDATE lending_records SET is_returned = TRUE, updated_on = NOW() WHERE id = $1",
        )
        .bind(lending_record_id)
        .execute(&mut *conn)
        .await?;

        Ok(transaction)
    }

    /// Get a return transaction with its loan's borrower and due date
    pub async fn get_return(&self, id: i32) -> AppResult<ReturnRow> {
        let sql = format!("{} WHERE r.id = $1", RETURN_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Return transaction with id {} not found", id)))?;
        Ok(return_row(&row)?)
    }

    /// List return transactions, optionally for a single borrower
    pub async fn list_returns(&self, borrower_id: Option<i32>) -> AppResult<Vec<ReturnRow>> {
        let sql = format!(
            "{} WHERE $1::int IS NULL OR l.borrower_id = $1 ORDER BY r.date_returned DESC, r.id DESC",
            RETURN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(borrower_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| return_row(row).map_err(AppError::from))
            .collect()
    }
}
