use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domain::events::CatalogEvent;
use crate::models::Anime;
use crate::services::CatalogStore;
use crate::state::SharedState;

mod anime;
pub mod auth;
mod error;
pub mod events;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: SharedState,

    pub start_time: std::time::Instant,
}

impl AppState {
    #[must_use]
    pub fn new(shared: SharedState) -> Arc<Self> {
        Arc::new(Self {
            shared,
            start_time: std::time::Instant::now(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogStore {
        self.shared.catalog.as_ref()
    }

    #[must_use]
    pub fn event_bus(&self) -> &tokio::sync::broadcast::Sender<CatalogEvent> {
        &self.shared.event_bus
    }

    /// Freshly loaded collection.
    pub async fn collection(&self) -> Result<Vec<Anime>, ApiError> {
        Ok(self.catalog().fetch().await?)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/anime", get(anime::list_anime).post(anime::add_anime))
        .route(
            "/anime/{id}",
            get(anime::get_anime)
                .put(anime::update_anime)
                .delete(anime::remove_anime),
        )
        .route("/anime/{id}/links", post(anime::add_links))
        .route("/refresh", post(system::refresh))
        .route("/genres", get(system::get_genres))
        .route("/constants", get(system::get_constants))
        .route("/stats", get(system::get_stats))
        .route("/export", get(system::export))
        .route("/health", get(system::health))
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/reset", post(auth::reset_password))
        .route("/auth/me", get(auth::me))
        .merge(events::router())
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
