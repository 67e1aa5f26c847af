//! Repository layer for database operations
//!
//! Methods taking a `&mut PgConnection` are meant to run inside a
//! transaction opened by the service layer; the rest use the pool.

pub mod items;
pub mod loans;
pub mod penalties;
pub mod users;

use sqlx::{Pool, Postgres, Transaction};

use crate::error::AppResult;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub items: items::ItemsRepository,
    pub users: users::UsersRepository,
    pub loans: loans::LoansRepository,
    pub penalties: penalties::PenaltiesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            items: items::ItemsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            penalties: penalties::PenaltiesRepository::new(pool.clone()),
            pool,
        }
    }

    /// Start a transaction; row locks taken inside it are released on commit or drop
    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }
}
