//! Observable holder of the signed-in user.
//!
//! Constructed once at startup and handed to both the auth adapter (the only
//! writer) and the catalog adapters (readers).

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::User;

#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Option<User>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(initial: Option<User>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn current(&self) -> Option<User> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.tx.subscribe()
    }

    /// Replaces the session and wakes every subscriber.
    pub fn set(&self, user: Option<User>) {
        match &user {
            Some(u) => tracing::debug!(user_id = %u.id, "Session established"),
            None => tracing::debug!("Session cleared"),
        }
        self.tx.send_replace(user);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    #[tokio::test]
    async fn subscribers_see_every_change() {
        let session = SessionStore::new(None);
        let mut rx = session.subscribe();

        session.set(Some(User::demo()));
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().as_ref().map(|u| u.id.clone()),
            Some(UserId::new("1"))
        );

        session.set(None);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
        assert!(session.current().is_none());
    }
}
