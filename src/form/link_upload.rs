use serde::Serialize;
use tracing::info;

use crate::constants::DEFAULT_EPISODE_LANGUAGE;
use crate::domain::AnimeId;
use crate::models::NewLink;
use crate::services::{CatalogStore, LinkBatchReport};

use super::draft::{LinkDraft, LinkField, SubtitleDraft, SubtitleField, usable_links};
use super::validation::UrlWarning;
use super::{FormError, NodeId, NodeIds, SubmitError};

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub message: String,
    pub report: LinkBatchReport,
}

/// State of the bulk link upload page: links for one episode of an
/// existing anime.
#[derive(Debug)]
pub struct LinkUploadForm {
    anime_id: Option<AnimeId>,
    episode_number: Option<u32>,
    language: String,
    links: Vec<LinkDraft>,
    ids: NodeIds,
}

impl Default for LinkUploadForm {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkUploadForm {
    /// Starts with one blank link row.
    #[must_use]
    pub fn new() -> Self {
        let mut ids = NodeIds::default();
        let first = LinkDraft::new(ids.next());
        Self {
            anime_id: None,
            episode_number: None,
            language: DEFAULT_EPISODE_LANGUAGE.to_string(),
            links: vec![first],
            ids,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Selecting a different anime clears the episode choice.
    pub fn select_anime(&mut self, anime_id: Option<AnimeId>) {
        self.anime_id = anime_id;
        self.episode_number = None;
    }

    /// `None` targets the anime's first episode.
    pub const fn select_episode(&mut self, episode_number: Option<u32>) {
        self.episode_number = episode_number;
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    #[must_use]
    pub const fn anime_id(&self) -> Option<&AnimeId> {
        self.anime_id.as_ref()
    }

    #[must_use]
    pub const fn episode_number(&self) -> Option<u32> {
        self.episode_number
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn links(&self) -> &[LinkDraft] {
        &self.links
    }

    fn link_mut(&mut self, id: NodeId) -> Result<&mut LinkDraft, FormError> {
        self.links
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(FormError::UnknownNode(id))
    }

    fn subtitle_mut(&mut self, id: NodeId) -> Result<&mut SubtitleDraft, FormError> {
        self.links
            .iter_mut()
            .flat_map(|l| l.subtitles.iter_mut())
            .find(|s| s.id == id)
            .ok_or(FormError::UnknownNode(id))
    }

    /// Swaps the link rows for ones built with this form's id source.
    pub(crate) fn replace_links(&mut self, build: impl FnOnce(&mut NodeIds) -> Vec<LinkDraft>) {
        self.links = build(&mut self.ids);
    }

    pub fn add_link(&mut self) -> NodeId {
        let id = self.ids.next();
        self.links.push(LinkDraft::new(id));
        id
    }

    pub fn remove_link(&mut self, id: NodeId) -> Result<(), FormError> {
        let pos = self
            .links
            .iter()
            .position(|l| l.id == id)
            .ok_or(FormError::UnknownNode(id))?;
        self.links.remove(pos);
        Ok(())
    }

    pub fn update_link(
        &mut self,
        id: NodeId,
        field: LinkField,
    ) -> Result<Option<UrlWarning>, FormError> {
        Ok(self.link_mut(id)?.apply(field))
    }

    pub fn add_subtitle(&mut self, link: NodeId) -> Result<NodeId, FormError> {
        let id = self.ids.next();
        self.link_mut(link)?.subtitles.push(SubtitleDraft::new(id));
        Ok(id)
    }

    pub fn remove_subtitle(&mut self, id: NodeId) -> Result<(), FormError> {
        for link in &mut self.links {
            if let Some(pos) = link.subtitles.iter().position(|s| s.id == id) {
                link.subtitles.remove(pos);
                return Ok(());
            }
        }
        Err(FormError::UnknownNode(id))
    }

    pub fn update_subtitle(&mut self, id: NodeId, field: SubtitleField) -> Result<(), FormError> {
        self.subtitle_mut(id)?.apply(field);
        Ok(())
    }

    pub fn attach_subtitle_file(
        &mut self,
        id: NodeId,
        file_name: Option<&str>,
    ) -> Result<(), FormError> {
        self.subtitle_mut(id)?.attach_file(file_name);
        Ok(())
    }

    /// Links with platform and url, carrying only complete subtitles.
    #[must_use]
    pub fn valid_links(&self) -> Vec<NewLink> {
        usable_links(&self.links)
    }

    /// Sends the valid links to `store` and resets the form on success.
    pub async fn submit(&mut self, store: &dyn CatalogStore) -> Result<UploadSummary, SubmitError> {
        let anime_id = self.anime_id.clone().ok_or(FormError::AnimeRequired)?;
        let links = self.valid_links();
        if links.is_empty() {
            return Err(FormError::NoValidLinks.into());
        }

        let count = links.len();
        let language = self.language.clone();
        let report = store
            .add_links_to_anime(&anime_id, self.episode_number, links, &language)
            .await?;

        info!(anime_id = %anime_id, count, language = %language, "Uploaded links");
        self.reset();
        Ok(UploadSummary {
            message: format!("Successfully added {count} links in {language}!"),
            report,
        })
    }
}
