//! Data models for the lending server

pub mod item;
pub mod loan;
pub mod penalty;
pub mod user;

// Re-export commonly used types
pub use item::CatalogItem;
pub use loan::{LendingRecord, ReturnDetails, ReturnTransaction};
pub use penalty::{Payment, Penalty};
pub use user::{AccountType, Capability, User, UserClaims};
