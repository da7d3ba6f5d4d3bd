//! JSON input for the forms, used by the HTTP API and the CLI.

use serde::Deserialize;

use crate::constants::{DEFAULT_EPISODE_LANGUAGE, DEFAULT_SEASON, limits};
use crate::domain::{AnimeId, AnimeStatus};

use super::draft::{AnimeDraft, EpisodeDraft, LinkDraft, SubtitleDraft};
use super::{AnimeForm, FormError, LinkUploadForm, NodeIds};

#[derive(Debug, Clone, Deserialize)]
pub struct AnimePayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub studio_name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub status: Option<AnimeStatus>,
    #[serde(default)]
    pub episodes: Vec<EpisodePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpisodePayload {
    #[serde(default)]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub links: Vec<LinkPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkPayload {
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub file_size: String,
    #[serde(default)]
    pub subtitles: Vec<SubtitlePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubtitlePayload {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub url: String,
    /// Name of an attached subtitle file.
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Links for one episode of an existing anime.
#[derive(Debug, Clone, Deserialize)]
pub struct LinksPayload {
    #[serde(default)]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
    pub links: Vec<LinkPayload>,
}

fn link_draft(payload: LinkPayload, ids: &mut NodeIds) -> LinkDraft {
    let mut link = LinkDraft::new(ids.next());
    link.platform = payload.platform;
    link.url = payload.url;
    link.quality = payload.quality;
    link.file_size = payload.file_size;
    link.subtitles = payload
        .subtitles
        .into_iter()
        .map(|sub| {
            let mut draft = SubtitleDraft::new(ids.next());
            draft.language = sub.language;
            draft.url = sub.url;
            draft.attach_file(sub.file_name.as_deref().filter(|n| !n.is_empty()));
            draft
        })
        .collect();
    link
}

impl AnimePayload {
    /// Builds a form holding this payload. Limit violations and out-of-range
    /// scalars are rejected here; the usual submit checks still apply.
    pub fn into_form(self) -> Result<AnimeForm, FormError> {
        let mut draft = AnimeDraft {
            title: self.title,
            description: self.description,
            synopsis: self.synopsis,
            thumbnail_url: self.thumbnail_url,
            studio_name: self.studio_name,
            ..AnimeDraft::default()
        };
        for genre in &self.genres {
            if !draft.genres.contains(genre) {
                draft.genres.push(genre.clone());
            }
        }
        if let Some(rating) = self.rating {
            if !(0.0..=limits::MAX_RATING).contains(&rating) {
                return Err(FormError::Invalid(format!(
                    "Rating must be between 0 and {}",
                    limits::MAX_RATING
                )));
            }
            draft.rating = rating;
        }
        if let Some(year) = self.release_year {
            if year < limits::MIN_RELEASE_YEAR {
                return Err(FormError::Invalid(format!(
                    "Release year must be {} or later",
                    limits::MIN_RELEASE_YEAR
                )));
            }
            draft.release_year = year;
        }
        if let Some(status) = self.status {
            draft.status = status;
        }

        let mut ids = NodeIds::default();
        let mut episodes = Vec::with_capacity(self.episodes.len());
        for (index, ep) in self.episodes.into_iter().enumerate() {
            let number = ep
                .episode_number
                .unwrap_or_else(|| u32::try_from(index + 1).unwrap_or(u32::MAX));
            let mut episode = EpisodeDraft::new(ids.next(), number);
            episode.season = ep.season.unwrap_or(DEFAULT_SEASON);
            episode.title = ep.title;
            episode.description = ep.description;
            episode.duration = ep.duration;
            episode.thumbnail_url = ep.thumbnail_url;
            episode.language = ep
                .language
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| DEFAULT_EPISODE_LANGUAGE.to_string());
            episode.links = ep
                .links
                .into_iter()
                .map(|link| link_draft(link, &mut ids))
                .collect();
            episodes.push(episode);
        }

        AnimeForm::from_parts(draft, episodes, ids)
    }
}

impl LinksPayload {
    pub fn into_form(self, anime_id: AnimeId) -> LinkUploadForm {
        let mut form = LinkUploadForm::new();
        form.select_anime(Some(anime_id));
        form.select_episode(self.episode_number);
        if let Some(language) = self.language.filter(|l| !l.is_empty()) {
            form.set_language(language);
        }
        form.replace_links(|ids| {
            self.links
                .into_iter()
                .map(|link| link_draft(link, ids))
                .collect()
        });
        form
    }
}
