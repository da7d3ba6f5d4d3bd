//! Editable draft nodes. All text fields hold whatever the user typed;
//! normalisation happens when the draft is flattened for submission.

use chrono::Datelike;
use serde::Serialize;

use crate::constants::{DEFAULT_EPISODE_LANGUAGE, DEFAULT_SEASON};
use crate::domain::AnimeStatus;
use crate::models::anime::non_empty;
use crate::models::{NewEpisode, NewLink, NewSubtitle};

use super::NodeId;
use super::validation::{UrlWarning, check_url, link_is_usable, subtitle_is_usable};

/// Top-level fields of the anime being added.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimeDraft {
    pub title: String,
    pub description: String,
    pub synopsis: String,
    pub thumbnail_url: String,
    pub studio_name: String,
    pub genres: Vec<String>,
    pub rating: f64,
    pub release_year: i32,
    pub status: AnimeStatus,
}

impl Default for AnimeDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            synopsis: String::new(),
            thumbnail_url: String::new(),
            studio_name: String::new(),
            genres: Vec::new(),
            rating: 5.0,
            release_year: chrono::Local::now().year(),
            status: AnimeStatus::Upcoming,
        }
    }
}

impl AnimeDraft {
    /// Adds `genre` when absent, removes it when present. Order of first
    /// selection is kept.
    pub fn toggle_genre(&mut self, genre: &str) {
        if let Some(pos) = self.genres.iter().position(|g| g == genre) {
            self.genres.remove(pos);
        } else {
            self.genres.push(genre.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeDraft {
    pub id: NodeId,
    pub episode_number: u32,
    pub season: u32,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub thumbnail_url: String,
    pub language: String,
    pub links: Vec<LinkDraft>,
}

impl EpisodeDraft {
    #[must_use]
    pub fn new(id: NodeId, episode_number: u32) -> Self {
        Self {
            id,
            episode_number,
            season: DEFAULT_SEASON,
            title: String::new(),
            description: String::new(),
            duration: String::new(),
            thumbnail_url: String::new(),
            language: DEFAULT_EPISODE_LANGUAGE.to_string(),
            links: Vec::new(),
        }
    }

    pub fn apply(&mut self, field: EpisodeField) {
        match field {
            EpisodeField::EpisodeNumber(n) => self.episode_number = n,
            EpisodeField::Season(s) => self.season = s,
            EpisodeField::Title(v) => self.title = v,
            EpisodeField::Description(v) => self.description = v,
            EpisodeField::Duration(v) => self.duration = v,
            EpisodeField::ThumbnailUrl(v) => self.thumbnail_url = v,
            EpisodeField::Language(v) => self.language = v,
        }
    }

    /// Flattened insert shape. Links without platform and url are dropped.
    #[must_use]
    pub fn to_new_episode(&self) -> NewEpisode {
        NewEpisode {
            episode_number: self.episode_number,
            season: Some(self.season),
            title: non_empty(&self.title),
            description: non_empty(&self.description),
            duration: non_empty(&self.duration),
            thumbnail_url: non_empty(&self.thumbnail_url),
            language: Some(self.language.clone()),
            links: usable_links(&self.links),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeField {
    EpisodeNumber(u32),
    Season(u32),
    Title(String),
    Description(String),
    Duration(String),
    ThumbnailUrl(String),
    Language(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkDraft {
    pub id: NodeId,
    pub platform: String,
    pub url: String,
    pub quality: String,
    pub file_size: String,
    pub subtitles: Vec<SubtitleDraft>,
}

impl LinkDraft {
    #[must_use]
    pub const fn new(id: NodeId) -> Self {
        Self {
            id,
            platform: String::new(),
            url: String::new(),
            quality: String::new(),
            file_size: String::new(),
            subtitles: Vec::new(),
        }
    }

    /// Applies the edit. Returns the advisory warning for a suspicious url.
    pub fn apply(&mut self, field: LinkField) -> Option<UrlWarning> {
        match field {
            LinkField::Platform(v) => self.platform = v,
            LinkField::Url(v) => {
                let warning = check_url(&v);
                self.url = v;
                return warning;
            }
            LinkField::Quality(v) => self.quality = v,
            LinkField::FileSize(v) => self.file_size = v,
        }
        None
    }

    #[must_use]
    pub fn to_new_link(&self) -> NewLink {
        NewLink {
            platform: self.platform.clone(),
            url: self.url.clone(),
            quality: non_empty(&self.quality),
            file_size: non_empty(&self.file_size),
            subtitles: self
                .subtitles
                .iter()
                .filter(|s| subtitle_is_usable(s))
                .map(SubtitleDraft::to_new_subtitle)
                .collect(),
        }
    }
}

pub(crate) fn usable_links(links: &[LinkDraft]) -> Vec<NewLink> {
    links
        .iter()
        .filter(|l| link_is_usable(l))
        .map(LinkDraft::to_new_link)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkField {
    Platform(String),
    Url(String),
    Quality(String),
    FileSize(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleDraft {
    pub id: NodeId,
    pub language: String,
    pub url: String,
    pub file_path: String,
    pub file_name: String,
}

impl SubtitleDraft {
    #[must_use]
    pub const fn new(id: NodeId) -> Self {
        Self {
            id,
            language: String::new(),
            url: String::new(),
            file_path: String::new(),
            file_name: String::new(),
        }
    }

    pub fn apply(&mut self, field: SubtitleField) {
        match field {
            SubtitleField::Language(v) => self.language = v,
            SubtitleField::Url(v) => self.url = v,
        }
    }

    /// Records an attached file as `uploads/<name>`. `None` detaches.
    pub fn attach_file(&mut self, file_name: Option<&str>) {
        match file_name {
            Some(name) => {
                self.file_path = format!("uploads/{name}");
                self.file_name = name.to_string();
            }
            None => {
                self.file_path.clear();
                self.file_name.clear();
            }
        }
    }

    #[must_use]
    pub fn to_new_subtitle(&self) -> NewSubtitle {
        NewSubtitle {
            language: self.language.clone(),
            url: non_empty(&self.url),
            file_path: non_empty(&self.file_path),
            file_name: non_empty(&self.file_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleField {
    Language(String),
    Url(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn id(n: u64) -> NodeId {
        NodeId(n)
    }

    #[test]
    fn genre_toggle_adds_then_removes() {
        let mut draft = AnimeDraft::default();
        draft.toggle_genre("Action");
        draft.toggle_genre("Drama");
        draft.toggle_genre("Action");
        assert_eq!(draft.genres, vec!["Drama".to_string()]);
    }

    #[test]
    fn new_draft_defaults() {
        let draft = AnimeDraft::default();
        assert!((draft.rating - 5.0).abs() < f64::EPSILON);
        assert_eq!(draft.status, AnimeStatus::Upcoming);
        assert!(draft.release_year >= 2024);
    }

    #[test]
    fn attaching_a_file_sets_upload_path() {
        let mut sub = SubtitleDraft::new(id(1));
        sub.attach_file(Some("ep1.en.srt"));
        assert_eq!(sub.file_path, "uploads/ep1.en.srt");
        assert_eq!(sub.file_name, "ep1.en.srt");
        sub.attach_file(None);
        assert!(sub.file_path.is_empty() && sub.file_name.is_empty());
    }

    #[test]
    fn flattening_drops_incomplete_children() {
        let mut link = LinkDraft::new(id(1));
        link.apply(LinkField::Platform("Mega".to_string()));
        assert!(link.apply(LinkField::Url("https://mega.nz/x".to_string())).is_none());

        let mut complete = SubtitleDraft::new(id(2));
        complete.apply(SubtitleField::Language("English".to_string()));
        complete.attach_file(Some("a.srt"));
        let mut no_source = SubtitleDraft::new(id(3));
        no_source.apply(SubtitleField::Language("French".to_string()));
        link.subtitles = vec![complete, no_source];

        let mut ep = EpisodeDraft::new(id(4), 1);
        ep.links = vec![link, LinkDraft::new(id(5))];

        let flat = ep.to_new_episode();
        assert_eq!(flat.links.len(), 1);
        assert_eq!(flat.links[0].quality, None);
        assert_eq!(flat.links[0].subtitles.len(), 1);
        assert_eq!(flat.links[0].subtitles[0].file_path.as_deref(), Some("uploads/a.srt"));
        assert_eq!(flat.title, None);
        assert_eq!(flat.language.as_deref(), Some("Japanese"));
    }
}
