use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clients::SupabaseClient;
use crate::config::Config;
use crate::domain::BackendKind;
use crate::domain::events::CatalogEvent;
use crate::services::{
    AuthService, CatalogStore, LocalAuth, LocalCatalog, RemoteAuth, RemoteCatalog, SessionStore,
};
use crate::storage::{FileStore, KeyValueStore};

/// Everything a command or request handler needs, built once from config.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub session: SessionStore,

    pub catalog: Arc<dyn CatalogStore>,

    pub auth: Arc<dyn AuthService>,

    pub event_bus: broadcast::Sender<CatalogEvent>,

    background: Vec<Arc<JoinHandle<()>>>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let files = Arc::new(FileStore::open(&config.storage.data_dir).with_context(|| {
            format!("Failed to open data directory {}", config.storage.data_dir)
        })?);

        match config.storage.backend {
            BackendKind::Local => {
                let poller = files
                    .clone()
                    .watch_directory(config.storage.watch_interval());
                let mut state = Self::local(config, files);
                state.background.push(Arc::new(poller));
                Ok(state)
            }
            BackendKind::Remote => Self::remote(config, files).await,
        }
    }

    /// Local adapters over `store`. A background task re-reads the saved
    /// session whenever `store` reports a change to it; for a [`FileStore`]
    /// that includes writes from other processes once
    /// [`FileStore::watch_directory`] runs.
    #[must_use]
    pub fn local(config: Config, store: Arc<dyn KeyValueStore>) -> Self {
        let session = SessionStore::new(LocalAuth::initial_user(store.as_ref()));
        let catalog = Arc::new(LocalCatalog::new(store.clone(), session.clone()));
        let auth = Arc::new(LocalAuth::new(store, session.clone()));
        let watcher = auth.clone().watch_storage();
        info!(backend = %BackendKind::Local, "Catalog backend ready");

        let mut state = Self::with_parts(config, session, catalog, auth);
        state.background.push(Arc::new(watcher));
        state
    }

    /// Hosted adapters. `store` only keeps the identity session between runs.
    pub async fn remote(config: Config, store: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let client = Arc::new(
            SupabaseClient::new(&config.remote.client_config())
                .context("Failed to build hosted backend client")?,
        );
        let session = SessionStore::new(None);
        let auth = RemoteAuth::new(client.clone(), store, session.clone());
        auth.restore().await;
        let catalog = Arc::new(RemoteCatalog::new(client, session.clone()));
        info!(backend = %BackendKind::Remote, url = %config.remote.url, "Catalog backend ready");

        Ok(Self::with_parts(config, session, catalog, Arc::new(auth)))
    }

    #[must_use]
    pub fn with_parts(
        config: Config,
        session: SessionStore,
        catalog: Arc<dyn CatalogStore>,
        auth: Arc<dyn AuthService>,
    ) -> Self {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size.max(1));
        Self {
            config: Arc::new(config),
            session,
            catalog,
            auth,
            event_bus,
            background: Vec::new(),
        }
    }

    /// Sends `event` to current subscribers. Having none is not an error.
    pub fn publish(&self, event: CatalogEvent) {
        if self.event_bus.send(event).is_err() {
            debug!("No event subscribers");
        }
    }

    /// Stops background tasks owned by this state.
    pub fn shutdown(&self) {
        for task in &self.background {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn local_state_starts_with_demo_user() {
        let state = SharedState::local(Config::default(), Arc::new(MemoryStore::new()));
        assert_eq!(state.catalog.kind(), BackendKind::Local);
        assert_eq!(state.auth.current_user(), Some(User::demo()));
        assert_eq!(state.catalog.fetch().await.unwrap().len(), 2);
        state.shutdown();
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let state = SharedState::local(Config::default(), Arc::new(MemoryStore::new()));
        let mut rx = state.event_bus.subscribe();
        state.publish(CatalogEvent::SessionChanged { user_id: None });
        assert!(matches!(
            rx.recv().await.unwrap(),
            CatalogEvent::SessionChanged { user_id: None }
        ));
        drop(rx);
        state.publish(CatalogEvent::SessionChanged { user_id: None });
    }
}
