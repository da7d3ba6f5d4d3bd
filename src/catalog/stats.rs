use std::collections::HashMap;

use serde::Serialize;

use crate::domain::AnimeStatus;
use crate::models::Anime;

const TOP_GENRE_COUNT: usize = 3;

/// Figures shown on the settings page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub total_anime: usize,
    pub total_links: usize,
    pub completed_anime: usize,
    pub ongoing_anime: usize,
    /// One decimal place, `"0"` for an empty collection.
    pub average_rating: String,
    /// Up to three `"<genre> (<count>)"` entries, most frequent first.
    pub top_genres: Vec<String>,
}

impl CatalogStats {
    #[must_use]
    pub fn compute(anime: &[Anime]) -> Self {
        let count_status =
            |status: AnimeStatus| anime.iter().filter(|a| a.status == status).count();

        let average_rating = if anime.is_empty() {
            "0".to_string()
        } else {
            let sum: f64 = anime.iter().map(|a| a.rating).sum();
            #[allow(clippy::cast_precision_loss)]
            let avg = sum / anime.len() as f64;
            format!("{avg:.1}")
        };

        Self {
            total_anime: anime.len(),
            total_links: anime.iter().map(Anime::total_links).sum(),
            completed_anime: count_status(AnimeStatus::Completed),
            ongoing_anime: count_status(AnimeStatus::Ongoing),
            average_rating,
            top_genres: top_genres(anime),
        }
    }
}

fn top_genres(anime: &[Anime]) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for genre in anime.iter().flat_map(|a| a.genres.iter()) {
        let count = counts.entry(genre.as_str()).or_insert(0);
        if *count == 0 {
            order.push(genre);
        }
        *count += 1;
    }

    // Stable sort keeps first-seen order among ties.
    order.sort_by_key(|g| std::cmp::Reverse(counts[g]));
    order
        .into_iter()
        .take(TOP_GENRE_COUNT)
        .map(|g| format!("{g} ({})", counts[g]))
        .collect()
}
