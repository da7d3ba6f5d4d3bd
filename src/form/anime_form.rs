use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::constants::limits;
use crate::models::NewAnime;
use crate::models::anime::non_empty;
use crate::services::{CatalogStore, CreateReport};

use super::draft::{
    AnimeDraft, EpisodeDraft, EpisodeField, LinkDraft, LinkField, SubtitleDraft, SubtitleField,
};
use super::validation::{UrlWarning, validate_anime};
use super::{FormError, NodeId, NodeIds, SubmitError};

/// State of the "add anime" page.
#[derive(Debug)]
pub struct AnimeForm {
    draft: AnimeDraft,
    episode_count: u32,
    episodes: Vec<EpisodeDraft>,
    expanded: BTreeSet<NodeId>,
    ids: NodeIds,
}

impl Default for AnimeForm {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimeForm {
    /// An empty form with a single episode.
    #[must_use]
    pub fn new() -> Self {
        let mut ids = NodeIds::default();
        let first = EpisodeDraft::new(ids.next(), 1);
        Self {
            draft: AnimeDraft::default(),
            episode_count: 1,
            episodes: vec![first],
            expanded: BTreeSet::new(),
            ids,
        }
    }

    /// Builds a form around episodes assembled elsewhere, enforcing the
    /// same limits as interactive editing.
    pub(crate) fn from_parts(
        draft: AnimeDraft,
        episodes: Vec<EpisodeDraft>,
        ids: NodeIds,
    ) -> Result<Self, FormError> {
        if episodes.len() > limits::MAX_EPISODE_COUNT as usize {
            return Err(FormError::EpisodeCountTooHigh);
        }
        for ep in &episodes {
            if ep.links.len() > limits::MAX_LINKS_PER_EPISODE {
                return Err(FormError::TooManyLinks);
            }
            if ep
                .links
                .iter()
                .any(|l| l.subtitles.len() > limits::MAX_SUBTITLES_PER_LINK)
            {
                return Err(FormError::TooManySubtitles);
            }
        }

        Ok(Self {
            draft,
            episode_count: u32::try_from(episodes.len()).unwrap_or(limits::MAX_EPISODE_COUNT),
            episodes,
            expanded: BTreeSet::new(),
            ids,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub const fn draft(&self) -> &AnimeDraft {
        &self.draft
    }

    pub const fn draft_mut(&mut self) -> &mut AnimeDraft {
        &mut self.draft
    }

    #[must_use]
    pub const fn episode_count(&self) -> u32 {
        self.episode_count
    }

    #[must_use]
    pub fn episodes(&self) -> &[EpisodeDraft] {
        &self.episodes
    }

    #[must_use]
    pub fn episode(&self, id: NodeId) -> Option<&EpisodeDraft> {
        self.episodes.iter().find(|ep| ep.id == id)
    }

    #[must_use]
    pub fn link(&self, id: NodeId) -> Option<&LinkDraft> {
        self.episodes
            .iter()
            .flat_map(|ep| ep.links.iter())
            .find(|l| l.id == id)
    }

    fn episode_mut(&mut self, id: NodeId) -> Result<&mut EpisodeDraft, FormError> {
        self.episodes
            .iter_mut()
            .find(|ep| ep.id == id)
            .ok_or(FormError::UnknownNode(id))
    }

    fn link_mut(&mut self, id: NodeId) -> Result<&mut LinkDraft, FormError> {
        self.episodes
            .iter_mut()
            .flat_map(|ep| ep.links.iter_mut())
            .find(|l| l.id == id)
            .ok_or(FormError::UnknownNode(id))
    }

    fn subtitle_mut(&mut self, id: NodeId) -> Result<&mut SubtitleDraft, FormError> {
        self.episodes
            .iter_mut()
            .flat_map(|ep| ep.links.iter_mut())
            .flat_map(|l| l.subtitles.iter_mut())
            .find(|s| s.id == id)
            .ok_or(FormError::UnknownNode(id))
    }

    /// Grows or shrinks the episode list to `count`. Added episodes are
    /// numbered after the current last position; removed ones lose their
    /// expanded state.
    pub fn set_episode_count(&mut self, count: u32) -> Result<(), FormError> {
        if count < limits::MIN_EPISODE_COUNT {
            warn!(count, "Rejected episode count");
            return Err(FormError::EpisodeCountTooLow);
        }
        if count > limits::MAX_EPISODE_COUNT {
            warn!(count, "Rejected episode count");
            return Err(FormError::EpisodeCountTooHigh);
        }

        let target = count as usize;
        if target > self.episodes.len() {
            let current = u32::try_from(self.episodes.len()).unwrap_or(count);
            for number in current + 1..=count {
                let id = self.ids.next();
                self.episodes.push(EpisodeDraft::new(id, number));
            }
        } else if target < self.episodes.len() {
            for removed in self.episodes.drain(target..) {
                self.expanded.remove(&removed.id);
            }
        }
        self.episode_count = count;
        Ok(())
    }

    pub fn update_episode(&mut self, id: NodeId, field: EpisodeField) -> Result<(), FormError> {
        self.episode_mut(id)?.apply(field);
        Ok(())
    }

    /// Flips the expanded state and returns the new one.
    pub fn toggle_expanded(&mut self, id: NodeId) -> Result<bool, FormError> {
        self.episode_mut(id)?;
        if self.expanded.remove(&id) {
            Ok(false)
        } else {
            self.expanded.insert(id);
            Ok(true)
        }
    }

    pub fn expand_all(&mut self) {
        self.expanded = self.episodes.iter().map(|ep| ep.id).collect();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    #[must_use]
    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn add_link(&mut self, episode: NodeId) -> Result<NodeId, FormError> {
        let id = self.ids.next();
        let ep = self.episode_mut(episode)?;
        if ep.links.len() >= limits::MAX_LINKS_PER_EPISODE {
            return Err(FormError::TooManyLinks);
        }
        ep.links.push(LinkDraft::new(id));
        Ok(id)
    }

    pub fn remove_link(&mut self, link: NodeId) -> Result<(), FormError> {
        for ep in &mut self.episodes {
            if let Some(pos) = ep.links.iter().position(|l| l.id == link) {
                ep.links.remove(pos);
                return Ok(());
            }
        }
        Err(FormError::UnknownNode(link))
    }

    /// Edits a link. A url edit may come back with an advisory warning; the
    /// value is stored regardless.
    pub fn update_link(
        &mut self,
        link: NodeId,
        field: LinkField,
    ) -> Result<Option<UrlWarning>, FormError> {
        Ok(self.link_mut(link)?.apply(field))
    }

    pub fn add_subtitle(&mut self, link: NodeId) -> Result<NodeId, FormError> {
        let id = self.ids.next();
        let target = self.link_mut(link)?;
        if target.subtitles.len() >= limits::MAX_SUBTITLES_PER_LINK {
            return Err(FormError::TooManySubtitles);
        }
        target.subtitles.push(SubtitleDraft::new(id));
        Ok(id)
    }

    pub fn remove_subtitle(&mut self, subtitle: NodeId) -> Result<(), FormError> {
        for link in self.episodes.iter_mut().flat_map(|ep| ep.links.iter_mut()) {
            if let Some(pos) = link.subtitles.iter().position(|s| s.id == subtitle) {
                link.subtitles.remove(pos);
                return Ok(());
            }
        }
        Err(FormError::UnknownNode(subtitle))
    }

    pub fn update_subtitle(
        &mut self,
        subtitle: NodeId,
        field: SubtitleField,
    ) -> Result<(), FormError> {
        self.subtitle_mut(subtitle)?.apply(field);
        Ok(())
    }

    pub fn attach_subtitle_file(
        &mut self,
        subtitle: NodeId,
        file_name: Option<&str>,
    ) -> Result<(), FormError> {
        self.subtitle_mut(subtitle)?.attach_file(file_name);
        Ok(())
    }

    pub fn toggle_genre(&mut self, genre: &str) {
        self.draft.toggle_genre(genre);
    }

    /// Submit-time checks: title, then genres, then episodes, then links.
    pub fn validate(&self) -> Result<(), FormError> {
        validate_anime(&self.draft.title, &self.draft.genres, &self.episodes)
    }

    /// Flattens the draft into the insert shape. `episode_count` is always
    /// the number of episode drafts.
    #[must_use]
    pub fn to_new_anime(&self) -> NewAnime {
        NewAnime {
            title: self.draft.title.trim().to_string(),
            description: non_empty(&self.draft.description),
            synopsis: non_empty(&self.draft.synopsis),
            thumbnail_url: non_empty(&self.draft.thumbnail_url),
            rating: self.draft.rating,
            release_year: self.draft.release_year,
            status: self.draft.status,
            episode_count: u32::try_from(self.episodes.len()).ok(),
            studio_name: non_empty(&self.draft.studio_name),
            genres: self.draft.genres.clone(),
            episodes: self
                .episodes
                .iter()
                .map(EpisodeDraft::to_new_episode)
                .collect(),
        }
    }

    /// Validates and hands the flattened draft to `store`. The draft is left
    /// as-is; callers reset it after a successful submit.
    pub async fn submit(&self, store: &dyn CatalogStore) -> Result<CreateReport, SubmitError> {
        self.validate()?;
        let report = store.add(self.to_new_anime()).await?;
        info!(
            title = %self.draft.title,
            episodes = self.episodes.len(),
            complete = report.is_complete(),
            "Submitted anime form"
        );
        Ok(report)
    }

    /// Toast text for a successful submit.
    #[must_use]
    pub fn success_message(&self) -> String {
        let n = self.episodes.len();
        format!(
            "Successfully added \"{}\" with {n} episode{}!",
            self.draft.title,
            if n == 1 { "" } else { "s" }
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::User;
    use crate::services::{LocalCatalog, SessionStore};
    use crate::storage::MemoryStore;

    fn first_episode(form: &AnimeForm) -> NodeId {
        form.episodes()[0].id
    }

    fn fill_link(form: &mut AnimeForm, episode: NodeId) -> NodeId {
        let link = form.add_link(episode).unwrap();
        form.update_link(link, LinkField::Platform("Mega".to_string()))
            .unwrap();
        form.update_link(link, LinkField::Url("https://mega.nz/x".to_string()))
            .unwrap();
        link
    }

    #[test]
    fn new_form_has_one_episode() {
        let form = AnimeForm::new();
        assert_eq!(form.episode_count(), 1);
        assert_eq!(form.episodes().len(), 1);
        assert_eq!(form.episodes()[0].episode_number, 1);
        assert_eq!(form.episodes()[0].season, 1);
        assert_eq!(form.episodes()[0].language, "Japanese");
    }

    #[test]
    fn episode_count_grows_and_shrinks() {
        let mut form = AnimeForm::new();
        form.set_episode_count(4).unwrap();
        let numbers: Vec<u32> = form.episodes().iter().map(|e| e.episode_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);

        let third = form.episodes()[2].id;
        let first = first_episode(&form);
        form.toggle_expanded(third).unwrap();
        form.toggle_expanded(first).unwrap();

        form.set_episode_count(2).unwrap();
        assert_eq!(form.episodes().len(), 2);
        assert_eq!(form.episode_count(), 2);
        assert!(form.is_expanded(first));
        assert!(!form.is_expanded(third));
        assert!(form.episode(third).is_none());
    }

    #[test]
    fn episode_count_out_of_range_is_rejected_without_change() {
        let mut form = AnimeForm::new();
        form.set_episode_count(3).unwrap();

        assert_eq!(form.set_episode_count(0), Err(FormError::EpisodeCountTooLow));
        assert_eq!(
            form.set_episode_count(1001),
            Err(FormError::EpisodeCountTooHigh)
        );
        assert_eq!(form.episodes().len(), 3);
        assert_eq!(form.episode_count(), 3);
    }

    #[test]
    fn node_ids_survive_sibling_removal() {
        let mut form = AnimeForm::new();
        let ep = first_episode(&form);
        let a = form.add_link(ep).unwrap();
        let b = form.add_link(ep).unwrap();

        form.remove_link(a).unwrap();
        form.update_link(b, LinkField::Quality("720p".to_string()))
            .unwrap();

        assert_eq!(form.link(b).unwrap().quality, "720p");
        assert_eq!(form.remove_link(a), Err(FormError::UnknownNode(a)));
    }

    #[test]
    fn link_and_subtitle_limits() {
        let mut form = AnimeForm::new();
        let ep = first_episode(&form);
        for _ in 0..10 {
            form.add_link(ep).unwrap();
        }
        assert_eq!(form.add_link(ep), Err(FormError::TooManyLinks));
        assert_eq!(form.episodes()[0].links.len(), 10);

        let link = form.episodes()[0].links[0].id;
        for _ in 0..5 {
            form.add_subtitle(link).unwrap();
        }
        assert_eq!(form.add_subtitle(link), Err(FormError::TooManySubtitles));
        assert_eq!(form.link(link).unwrap().subtitles.len(), 5);
    }

    #[test]
    fn url_edits_warn_but_store_the_value() {
        let mut form = AnimeForm::new();
        let ep = first_episode(&form);
        let link = form.add_link(ep).unwrap();

        let warning = form
            .update_link(link, LinkField::Url("mega.nz/file/abc".to_string()))
            .unwrap();
        assert!(warning.is_some());
        assert_eq!(form.link(link).unwrap().url, "mega.nz/file/abc");
    }

    #[test]
    fn subtitle_edits_and_file_attachment() {
        let mut form = AnimeForm::new();
        let ep = first_episode(&form);
        let link = form.add_link(ep).unwrap();
        let sub = form.add_subtitle(link).unwrap();

        form.update_subtitle(sub, SubtitleField::Language("English".to_string()))
            .unwrap();
        form.attach_subtitle_file(sub, Some("ep1.srt")).unwrap();
        let stored = &form.link(link).unwrap().subtitles[0];
        assert_eq!(stored.file_path, "uploads/ep1.srt");

        form.remove_subtitle(sub).unwrap();
        assert!(form.link(link).unwrap().subtitles.is_empty());
    }

    #[test]
    fn expand_and_collapse_all() {
        let mut form = AnimeForm::new();
        form.set_episode_count(3).unwrap();
        form.expand_all();
        assert!(form.episodes().iter().all(|e| form.is_expanded(e.id)));
        form.collapse_all();
        assert!(form.episodes().iter().all(|e| !form.is_expanded(e.id)));
    }

    #[test]
    fn validation_fails_fast_in_order() {
        let mut form = AnimeForm::new();
        assert_eq!(form.validate(), Err(FormError::TitleRequired));

        form.draft_mut().title = "  ".to_string();
        assert_eq!(form.validate(), Err(FormError::TitleRequired));

        form.draft_mut().title = "Frieren".to_string();
        assert_eq!(form.validate(), Err(FormError::GenreRequired));

        form.toggle_genre("Fantasy");
        form.set_episode_count(3).unwrap();
        let second = form.episodes()[1].id;
        fill_link(&mut form, second);

        let err = form.validate().unwrap_err();
        assert_eq!(err, FormError::MissingLinks { episodes: vec![1, 3] });
        assert_eq!(err.to_string(), "Episodes 1, 3 need at least one valid link");
    }

    #[test]
    fn link_without_url_does_not_count() {
        let mut form = AnimeForm::new();
        form.draft_mut().title = "X".to_string();
        form.toggle_genre("Action");
        let ep = first_episode(&form);
        let link = form.add_link(ep).unwrap();
        form.update_link(link, LinkField::Platform("Mega".to_string()))
            .unwrap();

        assert_eq!(
            form.validate(),
            Err(FormError::MissingLinks { episodes: vec![1] })
        );
    }

    #[test]
    fn flattening_sets_count_and_drops_empty_optionals() {
        let mut form = AnimeForm::new();
        form.draft_mut().title = "Frieren".to_string();
        form.set_episode_count(2).unwrap();
        let first = first_episode(&form);
        fill_link(&mut form, first);
        form.add_link(first).unwrap();

        let new = form.to_new_anime();
        assert_eq!(new.episode_count, Some(2));
        assert_eq!(new.description, None);
        assert_eq!(new.studio_name, None);
        assert_eq!(new.episodes[0].links.len(), 1);
        assert!(new.episodes[1].links.is_empty());
    }

    #[test]
    fn success_message_pluralizes() {
        let mut form = AnimeForm::new();
        form.draft_mut().title = "Frieren".to_string();
        assert_eq!(
            form.success_message(),
            "Successfully added \"Frieren\" with 1 episode!"
        );
        form.set_episode_count(2).unwrap();
        assert_eq!(
            form.success_message(),
            "Successfully added \"Frieren\" with 2 episodes!"
        );
    }

    #[tokio::test]
    async fn submit_keeps_draft_on_validation_and_catalog_errors() {
        let session = SessionStore::new(None);
        let store = LocalCatalog::new(Arc::new(MemoryStore::new()), session.clone());

        let mut form = AnimeForm::new();
        let err = form.submit(&store).await.unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(FormError::TitleRequired)));

        form.draft_mut().title = "Frieren".to_string();
        form.toggle_genre("Fantasy");
        let ep = first_episode(&form);
        fill_link(&mut form, ep);

        let err = form.submit(&store).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Catalog(crate::services::CatalogError::NotAuthenticated)
        ));
        assert_eq!(form.draft().title, "Frieren");
        assert_eq!(form.episodes()[0].links.len(), 1);

        session.set(Some(User::demo()));
        let report = form.submit(&store).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.anime.unwrap().title, "Frieren");
    }
}
