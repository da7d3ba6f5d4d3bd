//! Auth adapter over the hosted identity service.
//!
//! The access token is kept on the shared [`SupabaseClient`] so catalog
//! requests run as the signed-in user, and persisted under the
//! `remote_session` key so the next process starts signed in.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::clients::supabase::{AuthSession, AuthUser, SignUpResponse};
use crate::clients::{SupabaseClient, SupabaseError};
use crate::constants::storage_keys;
use crate::domain::UserId;
use crate::models::User;
use crate::models::user::name_from_email;
use crate::services::auth_service::{AuthError, AuthService, SignUpOutcome};
use crate::services::session::SessionStore;
use crate::storage::{KeyValueStore, read_json, write_json};

const PROFILE_TABLE: &str = "users";

#[derive(Debug, Serialize, Deserialize)]
struct SavedSession {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<ProfileRow> for User {
    fn from(row: ProfileRow) -> Self {
        let email = row.email.unwrap_or_default();
        Self {
            id: row.id,
            name: row.name.unwrap_or_else(|| name_from_email(&email)),
            email,
            created_at: row.created_at.unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct ProfileInsert<'a> {
    id: &'a str,
    email: Option<&'a str>,
    name: String,
}

fn backend(err: &SupabaseError) -> AuthError {
    match err {
        SupabaseError::Api { message, .. } => AuthError::Backend(message.clone()),
        other => AuthError::Backend(other.to_string()),
    }
}

pub struct RemoteAuth {
    client: Arc<SupabaseClient>,
    store: Arc<dyn KeyValueStore>,
    session: SessionStore,
}

impl RemoteAuth {
    #[must_use]
    pub fn new(
        client: Arc<SupabaseClient>,
        store: Arc<dyn KeyValueStore>,
        session: SessionStore,
    ) -> Self {
        Self {
            client,
            store,
            session,
        }
    }

    /// Picks up a session saved by an earlier process and reloads its profile.
    pub async fn restore(&self) {
        let saved = match read_json::<SavedSession>(
            self.store.as_ref(),
            storage_keys::REMOTE_SESSION,
        ) {
            Ok(Some(saved)) => saved,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable saved session");
                return;
            }
        };

        self.client.set_access_token(Some(saved.access_token));
        let auth_user = AuthUser {
            id: saved.user_id,
            email: saved.email,
            created_at: None,
        };
        let user = self.load_profile(&auth_user).await;
        self.session.set(user);
    }

    /// Profile row for `user`, created on first sign-in. Any failure yields
    /// `None`.
    async fn load_profile(&self, user: &AuthUser) -> Option<User> {
        let filter = format!("eq.{}", user.id);
        match self
            .client
            .select_single::<ProfileRow>(PROFILE_TABLE, &[("select", "*"), ("id", &filter)])
            .await
        {
            Ok(row) => Some(row.into()),
            Err(e) if e.is_not_found() => {
                info!(user_id = %user.id, "User record does not exist, creating one");
                let row = ProfileInsert {
                    id: &user.id,
                    email: user.email.as_deref(),
                    name: user
                        .email
                        .as_deref()
                        .map_or_else(|| "User".to_string(), name_from_email),
                };
                match self.client.insert::<_, ProfileRow>(PROFILE_TABLE, &row).await {
                    Ok(created) => Some(created.into()),
                    Err(e) => {
                        error!(error = %e, "Error creating user record");
                        None
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Error fetching user profile");
                None
            }
        }
    }

    async fn establish(&self, auth: AuthSession) -> Result<User, AuthError> {
        self.client.set_access_token(Some(auth.access_token.clone()));

        let Some(user) = self.load_profile(&auth.user).await else {
            self.session.set(None);
            return Err(AuthError::Backend("Could not load user profile".to_string()));
        };

        let saved = SavedSession {
            access_token: auth.access_token,
            refresh_token: auth.refresh_token,
            user_id: auth.user.id,
            email: auth.user.email,
        };
        write_json(self.store.as_ref(), storage_keys::REMOTE_SESSION, &saved)?;
        self.session.set(Some(user.clone()));
        Ok(user)
    }
}

#[async_trait]
impl AuthService for RemoteAuth {
    fn current_user(&self) -> Option<User> {
        self.session.current()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.session.subscribe()
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        match self
            .client
            .sign_up(email, password)
            .await
            .map_err(|e| backend(&e))?
        {
            SignUpResponse::Session(auth) => {
                let user = self.establish(auth).await?;
                info!(user_id = %user.id, "Signed up");
                Ok(SignUpOutcome::SignedIn { user })
            }
            SignUpResponse::Pending(pending) => {
                info!(user_id = %pending.id, "Sign-up awaiting email confirmation");
                Ok(SignUpOutcome::ConfirmationRequired {
                    email: pending.email.unwrap_or_else(|| email.to_string()),
                })
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let auth = self
            .client
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| match e {
                SupabaseError::Api { status: 400 | 401, .. } => AuthError::InvalidCredentials,
                other => backend(&other),
            })?;

        let user = self.establish(auth).await?;
        info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.client.sign_out().await.map_err(|e| backend(&e))?;

        self.client.set_access_token(None);
        self.store.remove(storage_keys::REMOTE_SESSION)?;
        self.session.set(None);
        info!("Signed out");
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        self.client.recover(email).await.map_err(|e| backend(&e))?;
        info!("Password reset requested");
        Ok(())
    }
}
