//! Persistence interface shared by the local and remote catalog adapters.
//!
//! Exactly one adapter is active at a time. Callers hold it as
//! `Arc<dyn CatalogStore>` and never know which backend they talk to.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{AnimeId, BackendKind, EpisodeId};
use crate::models::{Anime, AnimePatch, NewAnime, NewLink};
use crate::storage::StorageError;

/// Errors surfaced by a top-level catalog operation.
///
/// Failures of nested child inserts are not errors; they are recorded in the
/// operation's report instead.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("Episode not found")]
    EpisodeNotFound,

    #[error("Failed to {operation}: {message}")]
    Backend { operation: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    pub fn backend(operation: &str, message: impl ToString) -> Self {
        Self::Backend {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildKind {
    Episode,
    Link,
    Subtitle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChildStatus {
    Inserted { id: String },
    Skipped { reason: String },
    Failed { message: String },
}

/// Result of one attempted child insert.
///
/// `path` holds zero-based positions in the submitted input: `[episode]`,
/// `[episode, link]` or `[episode, link, subtitle]`. Link batches have no
/// episode level, so their paths start at the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildOutcome {
    pub kind: ChildKind,
    pub path: Vec<usize>,
    #[serde(flatten)]
    pub status: ChildStatus,
}

impl ChildOutcome {
    pub fn inserted(kind: ChildKind, path: Vec<usize>, id: impl ToString) -> Self {
        Self {
            kind,
            path,
            status: ChildStatus::Inserted { id: id.to_string() },
        }
    }

    pub fn skipped(kind: ChildKind, path: Vec<usize>, reason: impl ToString) -> Self {
        Self {
            kind,
            path,
            status: ChildStatus::Skipped {
                reason: reason.to_string(),
            },
        }
    }

    pub fn failed(kind: ChildKind, path: Vec<usize>, message: impl ToString) -> Self {
        Self {
            kind,
            path,
            status: ChildStatus::Failed {
                message: message.to_string(),
            },
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.status, ChildStatus::Failed { .. })
    }

    #[must_use]
    pub const fn is_inserted(&self) -> bool {
        matches!(self.status, ChildStatus::Inserted { .. })
    }
}

fn failures_in(outcomes: &[ChildOutcome]) -> impl Iterator<Item = &ChildOutcome> {
    outcomes.iter().filter(|o| o.is_failure())
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateReport {
    /// The anime as returned by the backend, when it returned one.
    pub anime: Option<Anime>,
    pub outcomes: Vec<ChildOutcome>,
}

impl CreateReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        failures_in(&self.outcomes).next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChildOutcome> {
        failures_in(&self.outcomes)
    }

    #[must_use]
    pub fn inserted_count(&self, kind: ChildKind) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.kind == kind && o.is_inserted())
            .count()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkBatchReport {
    pub episode_id: Option<EpisodeId>,
    pub outcomes: Vec<ChildOutcome>,
}

impl LinkBatchReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        failures_in(&self.outcomes).next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChildOutcome> {
        failures_in(&self.outcomes)
    }

    #[must_use]
    pub fn inserted_count(&self, kind: ChildKind) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.kind == kind && o.is_inserted())
            .count()
    }
}

#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Reloads the collection from the backing store and returns it.
    ///
    /// # Errors
    ///
    /// The held collection is emptied before an error is returned, so
    /// [`CatalogStore::snapshot`] never shows stale data after a failed read.
    async fn fetch(&self) -> Result<Vec<Anime>, CatalogError>;

    /// The collection currently held in memory. Performs no I/O.
    async fn snapshot(&self) -> Vec<Anime>;

    /// Creates an anime together with its episodes, links and subtitles.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotAuthenticated`] when the local adapter has no user
    /// - [`CatalogError::Backend`] when the top-level insert fails
    async fn add(&self, anime: NewAnime) -> Result<CreateReport, CatalogError>;

    /// Merges `patch` into the stored anime. Episodes are left alone.
    async fn update(&self, id: &AnimeId, patch: AnimePatch) -> Result<(), CatalogError>;

    async fn delete(&self, id: &AnimeId) -> Result<(), CatalogError>;

    async fn add_links_to_episode(
        &self,
        episode_id: &EpisodeId,
        links: Vec<NewLink>,
    ) -> Result<LinkBatchReport, CatalogError>;

    /// Adds links to the episode of `anime_id` with the given number, first
    /// updating that episode's language when it differs from the default.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EpisodeNotFound`] when no episode matches.
    async fn add_links_to_anime(
        &self,
        anime_id: &AnimeId,
        episode_number: Option<u32>,
        links: Vec<NewLink>,
        language: &str,
    ) -> Result<LinkBatchReport, CatalogError>;

    fn kind(&self) -> BackendKind;
}
