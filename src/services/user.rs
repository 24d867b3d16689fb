//! User service
//!
//! Registration, credential checks and token-to-user resolution.

use crate::config::BootstrapConfig;
use crate::db::is_unique_violation;
use crate::db::repositories::UserRepository;
use crate::models::{CreateUserInput, User, UserRole};
use crate::services::password::{dummy_verify, hash_password, verify_password};
use crate::services::token::Claims;
use anyhow::Context;
use std::sync::Arc;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Bad credentials, or a token that no longer matches an active user
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Username or email already registered
    #[error("{0}")]
    UserExists(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

const INVALID_CREDENTIALS: &str = "Incorrect username or password";

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Register a new user. The role defaults to editor.
    ///
    /// The username/email lookups give friendly messages; the unique indexes
    /// still decide races between concurrent registrations.
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(
                "Username already registered".to_string(),
            ));
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(
                "Email already registered".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(
            input.username,
            input.email,
            password_hash,
            input.role.unwrap_or_default(),
        );

        let created = self.user_repo.create(&user).await.map_err(|e| {
            if is_unique_violation(&e) {
                UserServiceError::UserExists("Username or email already registered".to_string())
            } else {
                UserServiceError::InternalError(e)
            }
        })?;

        tracing::info!(user_id = created.id, username = %created.username, "User registered");
        Ok(created)
    }

    /// Check a username/password pair.
    ///
    /// Unknown users, wrong passwords and inactive accounts all produce the
    /// same error. Unknown users still pay for one Argon2 verification.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, UserServiceError> {
        let user = match self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to look up user")?
        {
            Some(user) => user,
            None => {
                dummy_verify(password);
                tracing::warn!(username = %username, "Login failed: unknown user");
                return Err(UserServiceError::AuthenticationError(
                    INVALID_CREDENTIALS.to_string(),
                ));
            }
        };

        let valid = verify_password(password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            tracing::warn!(username = %username, "Login failed: wrong password");
            return Err(UserServiceError::AuthenticationError(
                INVALID_CREDENTIALS.to_string(),
            ));
        }

        if !user.is_active {
            tracing::warn!(username = %username, "Login failed: inactive account");
            return Err(UserServiceError::AuthenticationError(
                INVALID_CREDENTIALS.to_string(),
            ));
        }

        Ok(user)
    }

    /// Resolve verified token claims to the persisted user.
    ///
    /// Fails if the user is gone, inactive, or was renamed since issuance.
    pub async fn resolve_claims(&self, claims: &Claims) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(claims.uid)
            .await
            .context("Failed to load token subject")?
            .filter(|user| user.username == claims.sub && user.is_active)
            .ok_or_else(|| {
                UserServiceError::AuthenticationError(
                    "Could not validate credentials".to_string(),
                )
            })?;

        Ok(user)
    }

    /// Create the configured admin account unless that username already
    /// exists. Returns the created user, if any.
    pub async fn bootstrap_admin(
        &self,
        config: &BootstrapConfig,
    ) -> Result<Option<User>, UserServiceError> {
        if !config.enabled {
            return Ok(None);
        }

        if self
            .user_repo
            .get_by_username(&config.username)
            .await
            .context("Failed to check bootstrap user")?
            .is_some()
        {
            tracing::info!(username = %config.username, "Bootstrap admin already exists");
            return Ok(None);
        }

        let admin = self
            .register(CreateUserInput {
                username: config.username.clone(),
                email: config.email.clone(),
                password: config.password.clone(),
                role: Some(UserRole::Admin),
            })
            .await?;

        tracing::warn!(
            username = %admin.username,
            "Created bootstrap admin account; disable bootstrap and rotate the password"
        );
        Ok(Some(admin))
    }
}

fn validate_register_input(input: &CreateUserInput) -> Result<(), UserServiceError> {
    if input.username.trim().is_empty() {
        return Err(UserServiceError::ValidationError(
            "Username cannot be empty".to_string(),
        ));
    }

    if input.password.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Password cannot be empty".to_string(),
        ));
    }

    if !is_valid_email(&input.email) {
        return Err(UserServiceError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }

    Ok(())
}

/// `local@domain` with a non-empty local part, no whitespace, and a dot
/// inside the domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .map(|(head, tail)| !head.is_empty() && !tail.is_empty() && !tail.ends_with('.'))
            .unwrap_or(false)
}
