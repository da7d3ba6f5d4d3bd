//! Two demonstration titles written into a new user's collection the first
//! time it is read.

use chrono::Utc;

use crate::domain::{AnimeId, AnimeStatus, EpisodeId, LinkId, SubtitleId, UserId};
use crate::models::{Anime, Episode, Link, Subtitle};

use super::local_catalog::generate_id;

const SAMPLE_THUMBNAIL: &str = "https://images.pexels.com/photos/1040160/pexels-photo-1040160.jpeg?auto=compress&cs=tinysrgb&w=300&h=400&fit=crop";

struct SampleLink {
    url: &'static str,
    file_size: &'static str,
    subtitle_url: Option<&'static str>,
}

struct SampleAnime {
    title: &'static str,
    description: &'static str,
    synopsis: &'static str,
    release_year: i32,
    episode_count: u32,
    studio: &'static str,
    rating: f64,
    status: AnimeStatus,
    genres: &'static [&'static str],
    episode_title: &'static str,
    episode_description: &'static str,
    link: SampleLink,
}

const SAMPLES: &[SampleAnime] = &[
    SampleAnime {
        title: "Attack on Titan",
        description: "Humanity fights for survival against giant humanoid Titans",
        synopsis: "Humanity fights for survival against giant humanoid Titans in a post-apocalyptic world. Eren Yeager and his friends join the military to fight back against these mysterious creatures.",
        release_year: 2013,
        episode_count: 3,
        studio: "Mappa",
        rating: 9.2,
        status: AnimeStatus::Completed,
        genres: &["Action", "Drama", "Fantasy"],
        episode_title: "To You, in 2000 Years",
        episode_description: "The first episode of Attack on Titan",
        link: SampleLink {
            url: "https://example.com/aot-ep1",
            file_size: "500MB",
            subtitle_url: Some("https://example.com/aot-ep1-en.srt"),
        },
    },
    SampleAnime {
        title: "Demon Slayer",
        description: "Tanjiro becomes a demon slayer to save his sister",
        synopsis: "Tanjiro Kamado becomes a demon slayer to save his sister Nezuko, who has been turned into a demon. A tale of family, determination, and supernatural battles.",
        release_year: 2019,
        episode_count: 2,
        studio: "Ufotable",
        rating: 8.7,
        status: AnimeStatus::Ongoing,
        genres: &["Action", "Supernatural", "Historical"],
        episode_title: "Cruelty",
        episode_description: "The beginning of Tanjiro's journey",
        link: SampleLink {
            url: "https://example.com/ds-ep1",
            file_size: "480MB",
            subtitle_url: None,
        },
    },
];

/// Builds the seed collection for `owner`. Every node gets a fresh id and
/// each episode points at its own anime.
#[must_use]
pub fn sample_collection(owner: &UserId) -> Vec<Anime> {
    let now = Utc::now().to_rfc3339();

    SAMPLES
        .iter()
        .map(|sample| {
            let anime_id = AnimeId::new(generate_id());

            let subtitles = sample
                .link
                .subtitle_url
                .map(|url| Subtitle {
                    id: SubtitleId::new(generate_id()),
                    language: "English".to_string(),
                    url: Some(url.to_string()),
                    file_path: None,
                    file_name: None,
                })
                .into_iter()
                .collect();

            let episode = Episode {
                id: EpisodeId::new(generate_id()),
                anime_id: anime_id.clone(),
                episode_number: 1,
                season: 1,
                title: Some(sample.episode_title.to_string()),
                description: Some(sample.episode_description.to_string()),
                duration: Some("24:00".to_string()),
                thumbnail_url: None,
                language: crate::constants::DEFAULT_EPISODE_LANGUAGE.to_string(),
                created_at: now.clone(),
                updated_at: now.clone(),
                links: vec![Link {
                    id: LinkId::new(generate_id()),
                    platform: "WatchDT".to_string(),
                    url: sample.link.url.to_string(),
                    quality: Some("1080p".to_string()),
                    file_size: Some(sample.link.file_size.to_string()),
                    subtitles,
                }],
            };

            Anime {
                id: anime_id,
                title: sample.title.to_string(),
                description: sample.description.to_string(),
                synopsis: sample.synopsis.to_string(),
                release_year: sample.release_year,
                episode_count: sample.episode_count,
                studio_id: None,
                studio_name: Some(sample.studio.to_string()),
                rating: sample.rating,
                status: sample.status,
                thumbnail_url: Some(SAMPLE_THUMBNAIL.to_string()),
                created_at: now.clone(),
                updated_at: now.clone(),
                added_by: Some(owner.clone()),
                is_archived: false,
                genres: sample.genres.iter().map(ToString::to_string).collect(),
                episodes: vec![episode],
            }
        })
        .collect()
}
