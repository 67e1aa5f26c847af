//! User model, roles and the capability-based access policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Account type of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Administrator,
    Regular,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Administrator => "administrator",
            AccountType::Regular => "regular",
        }
    }

    /// Operations this account type is allowed to perform
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            AccountType::Administrator => &[
                Capability::ManageCatalog,
                Capability::ManageUsers,
                Capability::ViewAllRecords,
            ],
            AccountType::Regular => &[Capability::Borrow, Capability::Return, Capability::Pay],
        }
    }

    /// Fail with `Authorization` unless this account type grants `capability`
    pub fn require(self, capability: Capability) -> Result<(), AppError> {
        if authorize(self, capability) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Account type '{}' is not allowed to {}",
                self,
                capability.describe()
            )))
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "administrator" => Ok(AccountType::Administrator),
            "regular" => Ok(AccountType::Regular),
            _ => Err(format!("Invalid account type: {}", s)),
        }
    }
}

// SQLx conversion for AccountType (stored as text)
impl sqlx::Type<Postgres> for AccountType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for AccountType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for AccountType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// A permission checked before an operation touches any state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create, update and delete catalog items
    ManageCatalog,
    /// List and delete users, change account types
    ManageUsers,
    /// See every lending record, return, penalty and payment
    ViewAllRecords,
    Borrow,
    Return,
    Pay,
}

impl Capability {
    fn describe(&self) -> &'static str {
        match self {
            Capability::ManageCatalog => "manage the catalog",
            Capability::ManageUsers => "manage users",
            Capability::ViewAllRecords => "view all records",
            Capability::Borrow => "borrow items",
            Capability::Return => "return items",
            Capability::Pay => "record payments",
        }
    }
}

/// Pure authorization predicate over (role, requested operation)
pub fn authorize(account_type: AccountType, capability: Capability) -> bool {
    account_type.capabilities().contains(&capability)
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing, default)]
    pub password: String,
    pub account_type: AccountType,
    pub date_created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3 to 150 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub account_type: AccountType,
}

/// Update user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3 to 150 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    /// Only administrators may change this
    pub account_type: Option<AccountType>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub account_type: AccountType,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn can(&self, capability: Capability) -> bool {
        authorize(self.account_type, capability)
    }

    /// Fail with `Authorization` unless the account type grants `capability`
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        self.account_type.require(capability)
    }

    /// Allow managers of users, or the user acting on their own account
    pub fn require_self_or(&self, user_id: i32, capability: Capability) -> Result<(), AppError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            self.require(capability)
        }
    }

    /// Borrower filter for record listings: `None` means every borrower
    pub fn visible_borrower(&self) -> Option<i32> {
        if self.can(Capability::ViewAllRecords) {
            None
        } else {
            Some(self.user_id)
        }
    }
}
