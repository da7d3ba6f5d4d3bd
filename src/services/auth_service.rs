//! Domain service for sign-up, sign-in and session management.
//!
//! Both variants write the signed-in user into the shared
//! [`SessionStore`](crate::services::session::SessionStore), which the
//! catalog adapters read.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use crate::models::User;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User already exists")]
    UserExists,

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),

    #[error("{0}")]
    Backend(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SignUpOutcome {
    SignedIn { user: User },
    ConfirmationRequired { email: String },
}

impl SignUpOutcome {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::SignedIn { user } => format!("Signed up as {}", user.email),
            Self::ConfirmationRequired { .. } => {
                "Please check your email for confirmation link".to_string()
            }
        }
    }
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    fn current_user(&self) -> Option<User>;

    /// Receiver that observes every session change.
    fn subscribe(&self) -> watch::Receiver<Option<User>>;

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UserExists`] when the email is already registered locally
    /// - [`AuthError::WeakPassword`] when the password is too short
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Sends a password reset email.
    async fn reset_password(&self, email: &str) -> Result<(), AuthError>;
}
