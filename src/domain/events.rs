//! Domain events for the application.
//!
//! Catalog and session changes are published on a broadcast bus so that
//! long-running consumers (the HTTP server, an attached shell) can react
//! without polling.

use serde::Serialize;

use super::{AnimeId, BackendKind};

/// Events describing state changes of the catalog or the session.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum CatalogEvent {
    Refreshed {
        backend: BackendKind,
        count: usize,
    },
    AnimeAdded {
        anime_id: AnimeId,
        title: String,
        failed_children: usize,
    },
    AnimeUpdated {
        anime_id: AnimeId,
    },
    AnimeDeleted {
        anime_id: AnimeId,
    },
    LinksAdded {
        anime_id: AnimeId,
        inserted: usize,
        failed: usize,
    },
    SessionChanged {
        user_id: Option<String>,
    },
}

impl CatalogEvent {
    /// Stable snake_case name, used as the SSE event type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Refreshed { .. } => "refreshed",
            Self::AnimeAdded { .. } => "anime_added",
            Self::AnimeUpdated { .. } => "anime_updated",
            Self::AnimeDeleted { .. } => "anime_deleted",
            Self::LinksAdded { .. } => "links_added",
            Self::SessionChanged { .. } => "session_changed",
        }
    }
}
