//! Catalog item model and its stock ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// A lendable title with a finite number of copies
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CatalogItem {
    pub id: i32,
    pub name: String,
    pub writer: String,
    /// ISBN or other short identifier, unique when present
    pub identifier: Option<String>,
    pub total_stock: i32,
    /// Copies currently on the shelf
    pub available_stock: i32,
    pub date_added: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_by: Option<i32>,
}

/// Outcome of putting a copy back on the shelf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restock {
    Restocked,
    /// The shelf was already full; the count was left at `total_stock`
    Capped,
}

impl CatalogItem {
    pub fn is_available(&self) -> bool {
        self.available_stock > 0
    }

    /// Take one copy off the shelf
    pub fn lend(&mut self) -> AppResult<()> {
        if !self.is_available() {
            return Err(AppError::ItemUnavailable(format!(
                "The item '{}' is currently not available",
                self.name
            )));
        }
        self.available_stock -= 1;
        Ok(())
    }

    /// Put one copy back, never exceeding `total_stock`
    pub fn return_item(&mut self) -> Restock {
        if self.available_stock >= self.total_stock {
            self.available_stock = self.total_stock;
            Restock::Capped
        } else {
            self.available_stock += 1;
            Restock::Restocked
        }
    }

    /// Change the number of owned copies, shifting the shelf count by the same delta
    pub fn resize(&mut self, total_stock: i32) -> AppResult<()> {
        if total_stock <= 0 {
            return Err(AppError::Validation(
                "Total stock must be greater than zero".to_string(),
            ));
        }
        let available = self.available_stock + (total_stock - self.total_stock);
        if available < 0 {
            return Err(AppError::Validation(format!(
                "Total stock cannot drop below the {} copies currently on loan",
                self.total_stock - self.available_stock
            )));
        }
        self.total_stock = total_stock;
        self.available_stock = available;
        Ok(())
    }
}

/// Blank identifiers are stored as NULL so they never collide
pub fn normalize_identifier(identifier: Option<String>) -> Option<String> {
    identifier
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Create item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "Writer must be 1 to 255 characters"))]
    pub writer: String,
    #[validate(length(max = 13, message = "Identifier must be at most 13 characters"))]
    pub identifier: Option<String>,
    #[validate(range(min = 1, message = "Total stock must be greater than zero"))]
    pub total_stock: i32,
}

/// Update item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Writer must be 1 to 255 characters"))]
    pub writer: Option<String>,
    #[validate(length(max = 13, message = "Identifier must be at most 13 characters"))]
    pub identifier: Option<String>,
    #[validate(range(min = 1, message = "Total stock must be greater than zero"))]
    pub total_stock: Option<i32>,
}
