use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EPISODE_LANGUAGE, DEFAULT_SEASON};
use crate::domain::{AnimeId, AnimeStatus, EpisodeId, LinkId, SubtitleId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    pub id: AnimeId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub release_year: i32,
    #[serde(default)]
    pub episode_count: u32,
    #[serde(default)]
    pub studio_id: Option<String>,
    #[serde(default)]
    pub studio_name: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub status: AnimeStatus,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub added_by: Option<UserId>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

impl Anime {
    #[must_use]
    pub fn total_links(&self) -> usize {
        self.episodes.iter().map(|ep| ep.links.len()).sum()
    }

    #[must_use]
    pub fn find_episode(&self, episode_number: u32) -> Option<&Episode> {
        self.episodes
            .iter()
            .find(|ep| ep.episode_number == episode_number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    #[serde(default)]
    pub anime_id: AnimeId,
    pub episode_number: u32,
    #[serde(default = "default_season")]
    pub season: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub platform: String,
    pub url: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub file_size: Option<String>,
    #[serde(default)]
    pub subtitles: Vec<Subtitle>,
}

/// A caption track. Either `url` or `file_path`/`file_name` is expected to be
/// set, but nothing enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtitle {
    pub id: SubtitleId,
    pub language: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

pub(crate) const fn default_season() -> u32 {
    DEFAULT_SEASON
}

pub(crate) fn default_language() -> String {
    DEFAULT_EPISODE_LANGUAGE.to_string()
}

/// Insert shape for a new anime and its nested children.
///
/// Optional text fields are `None` rather than empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnime {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub rating: f64,
    pub release_year: i32,
    pub status: AnimeStatus,
    #[serde(default)]
    pub episode_count: Option<u32>,
    #[serde(default)]
    pub studio_name: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub episodes: Vec<NewEpisode>,
}

impl NewAnime {
    /// Declared episode count, falling back to the number of episodes supplied.
    #[must_use]
    pub fn resolved_episode_count(&self) -> u32 {
        match self.episode_count {
            Some(n) if n > 0 => n,
            _ => u32::try_from(self.episodes.len()).unwrap_or(u32::MAX),
        }
    }

    /// Synopsis, falling back to the description.
    #[must_use]
    pub fn resolved_synopsis(&self) -> String {
        self.synopsis
            .clone()
            .or_else(|| self.description.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEpisode {
    pub episode_number: u32,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub links: Vec<NewLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLink {
    pub platform: String,
    pub url: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub file_size: Option<String>,
    #[serde(default)]
    pub subtitles: Vec<NewSubtitle>,
}

impl NewLink {
    /// Both platform and url carry non-whitespace text.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.platform.trim().is_empty() && !self.url.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubtitle {
    pub language: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl NewSubtitle {
    /// Has a language and something to load it from.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let has_source = self.url.as_deref().is_some_and(|u| !u.is_empty())
            || self.file_path.as_deref().is_some_and(|p| !p.is_empty());
        !self.language.is_empty() && has_source
    }
}

/// Partial update of the top-level anime fields. Episodes are never touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AnimeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

impl AnimePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges the set fields into `anime`. An empty studio name or thumbnail
    /// clears the stored value.
    pub fn apply_to(&self, anime: &mut Anime) {
        if let Some(title) = &self.title {
            anime.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            anime.description.clone_from(description);
        }
        if let Some(synopsis) = &self.synopsis {
            anime.synopsis.clone_from(synopsis);
        }
        if let Some(year) = self.release_year {
            anime.release_year = year;
        }
        if let Some(count) = self.episode_count {
            anime.episode_count = count;
        }
        if let Some(studio) = &self.studio_name {
            anime.studio_name = non_empty(studio);
        }
        if let Some(rating) = self.rating {
            anime.rating = rating;
        }
        if let Some(status) = self.status {
            anime.status = status;
        }
        if let Some(thumbnail) = &self.thumbnail_url {
            anime.thumbnail_url = non_empty(thumbnail);
        }
        if let Some(genres) = &self.genres {
            anime.genres.clone_from(genres);
        }
        if let Some(archived) = self.is_archived {
            anime.is_archived = archived;
        }
    }
}

/// Trims `value` and maps an empty result to `None`.
#[must_use]
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
