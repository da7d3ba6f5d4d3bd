//! Auth adapter over the on-device key-value store.

use std::sync::Arc;

use anyhow::Context;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::constants::{limits::MIN_PASSWORD_LENGTH, storage_keys};
use crate::domain::UserId;
use crate::models::user::name_from_email;
use crate::models::{StoredAccount, User};
use crate::services::auth_service::{AuthError, AuthService, SignUpOutcome};
use crate::services::session::SessionStore;
use crate::storage::{KeyValueStore, read_json, write_json};

pub struct LocalAuth {
    store: Arc<dyn KeyValueStore>,
    session: SessionStore,
    accounts_lock: Mutex<()>,
}

impl LocalAuth {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, session: SessionStore) -> Self {
        Self {
            store,
            session,
            accounts_lock: Mutex::new(()),
        }
    }

    /// Session to start with: the persisted one when present, otherwise the
    /// demo identity. An unreadable session key falls back to the demo
    /// identity too.
    #[must_use]
    pub fn initial_user(store: &dyn KeyValueStore) -> Option<User> {
        match read_json::<User>(store, storage_keys::SESSION) {
            Ok(Some(user)) => Some(user),
            Ok(None) => Some(User::demo()),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable saved session");
                Some(User::demo())
            }
        }
    }

    /// Re-reads the persisted session when `key` is the session key, so a
    /// sign-in or sign-out made by another process becomes visible here.
    pub fn handle_storage_change(&self, key: &str) {
        if key != storage_keys::SESSION {
            return;
        }

        match read_json::<User>(self.store.as_ref(), storage_keys::SESSION) {
            Ok(user) => {
                if self.session.current() != user {
                    self.session.set(user);
                }
            }
            Err(e) => {
                warn!(error = %e, "Error parsing saved user");
                if let Err(e) = self.store.remove(storage_keys::SESSION) {
                    warn!(error = %e, "Failed to clear saved user");
                }
                self.session.set(None);
            }
        }
    }

    /// Forwards storage notifications to [`Self::handle_storage_change`]
    /// until the store is dropped.
    pub fn watch_storage(self: Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.store.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => self.handle_storage_change(&change.key),
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!("Storage watcher lagged by {} messages", count);
                        self.handle_storage_change(storage_keys::SESSION);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn accounts(&self) -> Result<Vec<StoredAccount>, AuthError> {
        Ok(read_json(self.store.as_ref(), storage_keys::USERS)?.unwrap_or_default())
    }

    fn establish(&self, user: &User) -> Result<(), AuthError> {
        write_json(self.store.as_ref(), storage_keys::SESSION, user)?;
        self.session.set(Some(user.clone()));
        Ok(())
    }
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[async_trait]
impl AuthService for LocalAuth {
    fn current_user(&self) -> Option<User> {
        self.session.current()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.session.subscribe()
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let _guard = self.accounts_lock.lock().await;
        let mut accounts = self.accounts()?;

        if accounts.iter().any(|a| a.user.email == email) {
            return Err(AuthError::UserExists);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
        }

        let owned = password.to_string();
        let password_hash = task::spawn_blocking(move || hash_password(&owned))
            .await
            .context("Password hashing task panicked")??;

        let now = Utc::now();
        let user = User {
            id: UserId::new(now.timestamp_millis().to_string()),
            email: email.to_string(),
            name: name_from_email(email),
            created_at: now.to_rfc3339(),
        };

        accounts.push(StoredAccount {
            user: user.clone(),
            password_hash,
        });
        write_json(self.store.as_ref(), storage_keys::USERS, &accounts)?;
        self.establish(&user)?;
        info!(user_id = %user.id, "Signed up");

        Ok(SignUpOutcome::SignedIn { user })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let account = self
            .accounts()?
            .into_iter()
            .find(|a| a.user.email == email)
            .ok_or(AuthError::InvalidCredentials)?;

        let owned = password.to_string();
        let hash = account.password_hash.clone();
        let is_valid = task::spawn_blocking(move || verify_password(&owned, &hash))
            .await
            .context("Password verification task panicked")??;
        if !is_valid {
            debug!(email, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        self.establish(&account.user)?;
        info!(user_id = %account.user.id, "Signed in");
        Ok(account.user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.store.remove(storage_keys::SESSION)?;
        self.session.set(None);
        info!("Signed out");
        Ok(())
    }

    async fn reset_password(&self, _email: &str) -> Result<(), AuthError> {
        Err(AuthError::Unsupported("Password reset"))
    }
}
