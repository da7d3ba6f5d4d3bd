//! Draft state behind the "add anime" and "bulk link upload" pages.
//!
//! Drafts form a tree (anime → episodes → links → subtitles). Every node
//! carries a [`NodeId`] that stays stable while siblings are added or
//! removed, and all edits address nodes by that id.

pub mod anime_form;
pub mod draft;
pub mod link_upload;
pub mod payload;
pub mod validation;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::limits;
use crate::services::CatalogError;

pub use anime_form::AnimeForm;
pub use draft::{
    AnimeDraft, EpisodeDraft, EpisodeField, LinkDraft, LinkField, SubtitleDraft, SubtitleField,
};
pub use link_upload::{LinkUploadForm, UploadSummary};
pub use payload::{AnimePayload, LinkPayload, LinksPayload};
pub use validation::{UrlWarning, check_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic source of [`NodeId`]s for one form.
#[derive(Debug, Default)]
pub(crate) struct NodeIds {
    next: u64,
}

impl NodeIds {
    pub(crate) fn next(&mut self) -> NodeId {
        self.next += 1;
        NodeId(self.next)
    }
}

fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Episode count must be at least {}", limits::MIN_EPISODE_COUNT)]
    EpisodeCountTooLow,

    #[error("Episode count cannot exceed {}", limits::MAX_EPISODE_COUNT)]
    EpisodeCountTooHigh,

    #[error("Maximum {} links allowed per episode", limits::MAX_LINKS_PER_EPISODE)]
    TooManyLinks,

    #[error("Maximum {} subtitles allowed per link", limits::MAX_SUBTITLES_PER_LINK)]
    TooManySubtitles,

    #[error("Title is required")]
    TitleRequired,

    #[error("At least one genre must be selected")]
    GenreRequired,

    #[error("At least one episode is required")]
    EpisodeRequired,

    #[error("Episodes {} need at least one valid link", join_numbers(.episodes))]
    MissingLinks { episodes: Vec<u32> },

    #[error("No form entry with id {0}")]
    UnknownNode(NodeId),

    #[error("Please select an anime")]
    AnimeRequired,

    #[error("Add at least one link with a platform and URL")]
    NoValidLinks,

    #[error("{0}")]
    Invalid(String),
}

/// Failure of a form submission. The draft is left untouched either way.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] FormError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
