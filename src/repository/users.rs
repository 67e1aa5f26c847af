//! Users repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{AccountType, User},
};

const DUPLICATE_USER: &str = "A user with this username or email already exists";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username (case-insensitive)
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Lock a user row for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// List all users
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Whether any administrator account exists
    pub async fn administrator_exists(&self) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE account_type = 'administrator')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a user with an already hashed password
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        account_type: AccountType,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password, account_type)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(account_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_USER))
    }

    /// Update a user; `None` fields are left unchanged
    pub async fn update(
        &self,
        id: i32,
        username: Option<&str>,
        email: Option<&str>,
        password_hash: Option<&str>,
        account_type: Option<AccountType>,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                password = COALESCE($4, password),
                account_type = COALESCE($5, account_type),
                last_updated = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(account_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_USER))?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Delete a user with no unreturned loans, along with their lending history
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        self.lock(&mut tx, id).await?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lending_records WHERE borrower_id = $1 AND is_returned = FALSE",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if active > 0 {
            return Err(AppError::Conflict(format!(
                "User {} still has {} unreturned loans",
                id, active
            )));
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
