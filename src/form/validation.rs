use serde::Serialize;
use url::Url;

use crate::constants::limits::URL_WARNING_MIN_LENGTH;

use super::FormError;
use super::draft::{EpisodeDraft, LinkDraft, SubtitleDraft};

/// Advisory notice for a URL that is probably missing its scheme. Never
/// blocks an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlWarning {
    pub message: String,
}

/// Flags values that do not parse as URLs, are longer than a few characters
/// (shorter ones are assumed to still be typed) and lack an `http` prefix.
#[must_use]
pub fn check_url(value: &str) -> Option<UrlWarning> {
    if value.is_empty() || Url::parse(value).is_ok() {
        return None;
    }
    if value.chars().count() > URL_WARNING_MIN_LENGTH && !value.starts_with("http") {
        return Some(UrlWarning {
            message: "URL should start with http:// or https://".to_string(),
        });
    }
    None
}

pub(crate) fn link_is_usable(link: &LinkDraft) -> bool {
    !link.platform.trim().is_empty() && !link.url.trim().is_empty()
}

pub(crate) fn subtitle_is_usable(subtitle: &SubtitleDraft) -> bool {
    !subtitle.language.is_empty() && (!subtitle.url.is_empty() || !subtitle.file_path.is_empty())
}

/// Checks run on submit, stopping at the first failure.
pub(crate) fn validate_anime(
    title: &str,
    genres: &[String],
    episodes: &[EpisodeDraft],
) -> Result<(), FormError> {
    if title.trim().is_empty() {
        return Err(FormError::TitleRequired);
    }
    if genres.is_empty() {
        return Err(FormError::GenreRequired);
    }
    if episodes.is_empty() {
        return Err(FormError::EpisodeRequired);
    }

    let missing: Vec<u32> = episodes
        .iter()
        .filter(|ep| !ep.links.iter().any(link_is_usable))
        .map(|ep| ep.episode_number)
        .collect();
    if !missing.is_empty() {
        return Err(FormError::MissingLinks { episodes: missing });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_warning_only_for_long_schemeless_text() {
        assert_eq!(check_url(""), None);
        assert_eq!(check_url("https://mega.nz/file/abc"), None);
        assert_eq!(check_url("mega.nz"), None);
        assert!(check_url("mega.nz/file/abc").is_some());
        assert_eq!(check_url("httpmega.nz/file/abc"), None);
    }
}
