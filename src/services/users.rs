//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{AccountType, Capability, CreateUser, UpdateUser, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate user by username and return a JWT token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !verify_password(&user.password, password)? {
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(user_id = user.id, account_type = %user.account_type, "User logged in");
        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            account_type: user.account_type,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Create the configured administrator when the database has none
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<()> {
        let Some(admin) = self.config.bootstrap_admin.clone() else {
            return Ok(());
        };

        if self.repository.users.administrator_exists().await? {
            return Ok(());
        }

        let created = self
            .create_user(CreateUser {
                username: admin.username,
                email: admin.email,
                password: admin.password,
                account_type: AccountType::Administrator,
            })
            .await?;

        tracing::info!(user_id = created.id, username = %created.username, "Bootstrap administrator created");
        Ok(())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// List all users
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    /// Create a new user
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;

        let password = hash_password(&user.password)?;
        let created = self
            .repository
            .users
            .create(&user.username, &user.email, &password, user.account_type)
            .await?;

        tracing::info!(user_id = created.id, account_type = %created.account_type, "User created");
        Ok(created)
    }

    /// Update an existing user on behalf of `actor`
    pub async fn update_user(&self, actor: &UserClaims, id: i32, user: UpdateUser) -> AppResult<User> {
        actor.require_self_or(id, Capability::ManageUsers)?;
        if user.account_type.is_some() {
            actor.require(Capability::ManageUsers)?;
        }
        user.validate()?;

        let password = user.password.as_deref().map(hash_password).transpose()?;

        self.repository
            .users
            .update(
                id,
                user.username.as_deref(),
                user.email.as_deref(),
                password.as_deref(),
                user.account_type,
            )
            .await
    }

    /// Delete a user
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}

/// Verify a password against an argon2 hash
fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}
