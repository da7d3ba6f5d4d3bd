use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Anime;

/// Criteria of the list page. Empty strings match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimeFilter {
    pub search: String,
    pub genre: String,
    pub status: String,
    pub min_rating: String,
}

impl AnimeFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.is_empty()
            && self.genre.is_empty()
            && self.status.is_empty()
            && self.min_rating.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn matches(&self, anime: &Anime) -> bool {
        let search = self.search.to_lowercase();
        self.matches_with(anime, &search, self.rating_floor())
    }

    /// Matching anime in their original order.
    #[must_use]
    pub fn apply<'a>(&self, anime: &'a [Anime]) -> Vec<&'a Anime> {
        let search = self.search.to_lowercase();
        let floor = self.rating_floor();
        anime
            .iter()
            .filter(|a| self.matches_with(a, &search, floor))
            .collect()
    }

    /// `None` when the rating criterion is unset, `Some(None)` when it is set
    /// but carries no leading integer.
    fn rating_floor(&self) -> Option<Option<i64>> {
        if self.min_rating.is_empty() {
            None
        } else {
            Some(leading_int(&self.min_rating))
        }
    }

    fn matches_with(&self, anime: &Anime, search: &str, floor: Option<Option<i64>>) -> bool {
        if !anime.title.to_lowercase().contains(search) {
            return false;
        }
        if !self.genre.is_empty() && !anime.genres.iter().any(|g| g == &self.genre) {
            return false;
        }
        if !self.status.is_empty() && anime.status.as_str() != self.status {
            return false;
        }
        match floor {
            None => true,
            Some(None) => false,
            #[allow(clippy::cast_precision_loss)]
            Some(Some(min)) => anime.rating >= min as f64,
        }
    }
}

/// Parses an optionally signed run of leading digits, ignoring leading
/// whitespace and whatever follows the digits.
fn leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
}

/// Distinct genres across the collection, in first-seen order.
#[must_use]
pub fn genre_choices(anime: &[Anime]) -> Vec<String> {
    let mut seen = HashSet::new();
    anime
        .iter()
        .flat_map(|a| a.genres.iter())
        .filter(|g| seen.insert(g.as_str()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid => f.write_str("grid"),
            Self::List => f.write_str("list"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "list" => Ok(Self::List),
            other => Err(format!("Invalid view mode: {other}. Expected grid or list")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnimeStatus;

    fn anime(title: &str, genres: &[&str], status: AnimeStatus, rating: f64) -> Anime {
        serde_json::from_value(serde_json::json!({
            "id": title.to_lowercase(),
            "title": title,
            "genres": genres,
            "status": status,
            "rating": rating,
        }))
        .unwrap()
    }

    fn collection() -> Vec<Anime> {
        vec![
            anime("Attack on Titan", &["Action", "Drama"], AnimeStatus::Completed, 9.0),
            anime("Demon Slayer", &["Action", "Supernatural"], AnimeStatus::Ongoing, 8.7),
            anime("Clannad", &["Drama", "Romance"], AnimeStatus::Completed, 7.9),
        ]
    }

    fn titles<'a>(found: &[&'a Anime]) -> Vec<&'a str> {
        found.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn empty_filter_keeps_everything_in_order() {
        let all = collection();
        let filter = AnimeFilter::default();
        assert!(filter.is_empty());
        assert_eq!(
            titles(&filter.apply(&all)),
            vec!["Attack on Titan", "Demon Slayer", "Clannad"]
        );
    }

    #[test]
    fn criteria_are_combined() {
        let all = collection();
        let filter = AnimeFilter {
            search: "TITAN".to_string(),
            genre: "Drama".to_string(),
            status: "completed".to_string(),
            min_rating: "9".to_string(),
        };
        assert_eq!(titles(&filter.apply(&all)), vec!["Attack on Titan"]);

        let filter = AnimeFilter {
            genre: "Drama".to_string(),
            status: "ongoing".to_string(),
            ..AnimeFilter::default()
        };
        assert!(filter.apply(&all).is_empty());
    }

    #[test]
    fn rating_uses_leading_integer() {
        let all = collection();
        let filter = AnimeFilter {
            min_rating: "8.9".to_string(),
            ..AnimeFilter::default()
        };
        assert_eq!(
            titles(&filter.apply(&all)),
            vec!["Attack on Titan", "Demon Slayer"]
        );

        let filter = AnimeFilter {
            min_rating: "high".to_string(),
            ..AnimeFilter::default()
        };
        assert!(filter.apply(&all).is_empty());
        assert!(!filter.matches(&all[0]));
    }

    #[test]
    fn min_rating_is_inclusive_and_keeps_order() {
        let all = vec![
            anime("Low", &["Drama"], AnimeStatus::Ongoing, 5.0),
            anime("Mid", &["Drama"], AnimeStatus::Ongoing, 7.0),
            anime("High", &["Drama"], AnimeStatus::Ongoing, 9.0),
        ];
        let filter = AnimeFilter {
            min_rating: "7".to_string(),
            ..AnimeFilter::default()
        };
        let ratings: Vec<f64> = filter.apply(&all).iter().map(|a| a.rating).collect();
        assert_eq!(ratings, vec![7.0, 9.0]);
    }

    #[test]
    fn leading_int_parsing() {
        assert_eq!(leading_int("7"), Some(7));
        assert_eq!(leading_int(" 8abc"), Some(8));
        assert_eq!(leading_int("-2"), Some(-2));
        assert_eq!(leading_int("abc"), None);
    }

    #[test]
    fn genre_choices_are_distinct_in_first_seen_order() {
        assert_eq!(
            genre_choices(&collection()),
            vec!["Action", "Drama", "Supernatural", "Romance"]
        );
        assert!(genre_choices(&[]).is_empty());
    }

    #[test]
    fn view_mode_parses() {
        assert_eq!("List".parse::<ViewMode>(), Ok(ViewMode::List));
        assert_eq!(ViewMode::default().to_string(), "grid");
        assert!("table".parse::<ViewMode>().is_err());
    }
}
