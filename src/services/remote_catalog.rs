//! Catalog adapter backed by a hosted `PostgREST` database.
//!
//! Every mutation is followed by a full re-fetch; the held collection is
//! always replaced wholesale. Child rows are written one request at a time
//! and a failing child never aborts its siblings.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::clients::{SupabaseClient, SupabaseError};
use crate::constants::{DEFAULT_EPISODE_LANGUAGE, DEFAULT_SEASON};
use crate::domain::{AnimeId, AnimeStatus, BackendKind, EpisodeId, LinkId, SubtitleId, UserId};
use crate::models::anime::{default_language, non_empty};
use crate::models::{Anime, AnimePatch, Episode, Link, NewAnime, NewLink, NewSubtitle, Subtitle};
use crate::services::catalog_service::{
    CatalogError, CatalogStore, ChildKind, ChildOutcome, CreateReport, LinkBatchReport,
};
use crate::services::session::SessionStore;

const ANIME_TABLE: &str = "anime";
const EPISODES_TABLE: &str = "episodes";
const LINKS_TABLE: &str = "episode_links";
const SUBTITLES_TABLE: &str = "subtitles";

const NESTED_SELECT: &str = "*,episodes(*,episode_links(*))";

#[derive(Debug, Deserialize)]
struct AnimeRow {
    id: AnimeId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    synopsis: Option<String>,
    #[serde(default)]
    release_year: Option<i32>,
    #[serde(default)]
    episode_count: Option<u32>,
    #[serde(default)]
    studio_id: Option<String>,
    #[serde(default)]
    studio_name: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    status: AnimeStatus,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    added_by: Option<UserId>,
    #[serde(default)]
    is_archived: bool,
    #[serde(default)]
    genres: Option<Vec<String>>,
    #[serde(default)]
    episodes: Vec<EpisodeRow>,
}

#[derive(Debug, Deserialize)]
struct EpisodeRow {
    id: EpisodeId,
    #[serde(default)]
    anime_id: AnimeId,
    episode_number: u32,
    #[serde(default)]
    season: Option<u32>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    episode_links: Vec<LinkRow>,
}

#[derive(Debug, Deserialize)]
struct LinkRow {
    id: LinkId,
    platform: String,
    url: String,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default)]
    file_size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubtitleRow {
    id: SubtitleId,
    language: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

#[derive(Debug, Deserialize)]
struct EpisodeRef {
    id: EpisodeId,
    anime_id: AnimeId,
}

impl From<SubtitleRow> for Subtitle {
    fn from(row: SubtitleRow) -> Self {
        Self {
            id: row.id,
            language: row.language,
            url: row.url,
            file_path: row.file_path,
            file_name: row.file_name,
        }
    }
}

impl AnimeRow {
    /// Subtitles are stored per anime, so every link of the anime receives
    /// the full list.
    fn into_anime(self, subtitles: &[Subtitle]) -> Anime {
        let episodes = self
            .episodes
            .into_iter()
            .map(|ep| Episode {
                id: ep.id,
                anime_id: ep.anime_id,
                episode_number: ep.episode_number,
                season: ep.season.unwrap_or(DEFAULT_SEASON),
                title: ep.title,
                description: ep.description,
                duration: ep.duration,
                thumbnail_url: ep.thumbnail_url,
                language: ep.language.unwrap_or_else(default_language),
                created_at: ep.created_at.unwrap_or_default(),
                updated_at: ep.updated_at.unwrap_or_default(),
                links: ep
                    .episode_links
                    .into_iter()
                    .map(|link| Link {
                        id: link.id,
                        platform: link.platform,
                        url: link.url,
                        quality: link.quality,
                        file_size: link.file_size,
                        subtitles: subtitles.to_vec(),
                    })
                    .collect(),
            })
            .collect();

        Anime {
            id: self.id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            synopsis: self.synopsis.unwrap_or_default(),
            release_year: self.release_year.unwrap_or_default(),
            episode_count: self.episode_count.unwrap_or_default(),
            studio_id: self.studio_id,
            studio_name: self.studio_name,
            rating: self.rating.unwrap_or_default(),
            status: self.status,
            thumbnail_url: self.thumbnail_url,
            created_at: self.created_at.unwrap_or_default(),
            updated_at: self.updated_at.unwrap_or_default(),
            added_by: self.added_by,
            is_archived: self.is_archived,
            genres: self.genres.unwrap_or_default(),
            episodes,
        }
    }
}

#[derive(Serialize)]
struct AnimeInsert<'a> {
    title: &'a str,
    description: &'a str,
    synopsis: String,
    release_year: i32,
    episode_count: u32,
    studio_name: Option<String>,
    rating: f64,
    status: AnimeStatus,
    thumbnail_url: Option<String>,
    genres: &'a [String],
    is_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    added_by: Option<UserId>,
}

#[derive(Serialize)]
struct EpisodeInsert<'a> {
    anime_id: &'a AnimeId,
    episode_number: u32,
    season: u32,
    title: Option<String>,
    description: Option<String>,
    duration: Option<String>,
    thumbnail_url: Option<String>,
    language: String,
}

#[derive(Serialize)]
struct LinkInsert<'a> {
    episode_id: &'a EpisodeId,
    platform: &'a str,
    url: &'a str,
    quality: Option<String>,
    file_size: Option<String>,
}

#[derive(Serialize)]
struct SubtitleInsert<'a> {
    anime_id: &'a AnimeId,
    language: &'a str,
    url: Option<String>,
    file_path: Option<String>,
    file_name: Option<String>,
}

#[derive(Serialize)]
struct AnimeUpdate {
    #[serde(flatten)]
    patch: AnimePatch,
    updated_at: String,
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

pub struct RemoteCatalog {
    client: Arc<SupabaseClient>,
    session: SessionStore,
    held: RwLock<Vec<Anime>>,
}

impl RemoteCatalog {
    #[must_use]
    pub fn new(client: Arc<SupabaseClient>, session: SessionStore) -> Self {
        Self {
            client,
            session,
            held: RwLock::new(Vec::new()),
        }
    }

    async fn subtitles_for(&self, anime_id: &AnimeId) -> Vec<Subtitle> {
        let filter = eq(anime_id);
        match self
            .client
            .select::<SubtitleRow>(SUBTITLES_TABLE, &[("select", "*"), ("anime_id", &filter)])
            .await
        {
            Ok(rows) => rows.into_iter().map(Subtitle::from).collect(),
            Err(e) => {
                warn!(anime_id = %anime_id, error = %e, "Failed to fetch subtitles");
                Vec::new()
            }
        }
    }

    /// Re-fetch after a mutation. A failure is logged and leaves an empty
    /// collection behind.
    async fn refresh(&self) {
        if let Err(e) = self.fetch().await {
            debug!(error = %e, "Refresh after mutation failed");
        }
    }

    /// Inserts `links` under `episode_id`, then each link's complete subtitles
    /// keyed by `anime_id`. `prefix` is prepended to every outcome path.
    async fn insert_links(
        &self,
        episode_id: &EpisodeId,
        anime_id: &AnimeId,
        links: &[NewLink],
        prefix: &[usize],
        outcomes: &mut Vec<ChildOutcome>,
    ) {
        for (l, link) in links.iter().enumerate() {
            let mut path = prefix.to_vec();
            path.push(l);

            let platform = link.platform.trim();
            let url = link.url.trim();
            if platform.is_empty() || url.is_empty() {
                warn!("Skipping link with missing platform or URL");
                outcomes.push(ChildOutcome::skipped(
                    ChildKind::Link,
                    path,
                    "missing platform or URL",
                ));
                continue;
            }

            let row = LinkInsert {
                episode_id,
                platform,
                url,
                quality: link.quality.as_deref().and_then(non_empty),
                file_size: link.file_size.as_deref().and_then(non_empty),
            };
            match self.client.insert::<_, IdRow>(LINKS_TABLE, &row).await {
                Ok(created) => {
                    debug!(link_id = %created.id, "Link created");
                    outcomes.push(ChildOutcome::inserted(
                        ChildKind::Link,
                        path.clone(),
                        created.id,
                    ));
                }
                Err(e) => {
                    error!(error = %e, "Error inserting episode link");
                    outcomes.push(ChildOutcome::failed(ChildKind::Link, path, e));
                    continue;
                }
            }

            for (s, subtitle) in link.subtitles.iter().enumerate() {
                let mut sub_path = path.clone();
                sub_path.push(s);
                self.insert_subtitle(anime_id, subtitle, sub_path, outcomes)
                    .await;
            }
        }
    }

    async fn insert_subtitle(
        &self,
        anime_id: &AnimeId,
        subtitle: &NewSubtitle,
        path: Vec<usize>,
        outcomes: &mut Vec<ChildOutcome>,
    ) {
        if !subtitle.is_complete() {
            outcomes.push(ChildOutcome::skipped(
                ChildKind::Subtitle,
                path,
                "missing language or source",
            ));
            return;
        }

        let row = SubtitleInsert {
            anime_id,
            language: &subtitle.language,
            url: subtitle.url.as_deref().and_then(non_empty),
            file_path: subtitle.file_path.as_deref().and_then(non_empty),
            file_name: subtitle.file_name.as_deref().and_then(non_empty),
        };
        match self.client.insert::<_, IdRow>(SUBTITLES_TABLE, &row).await {
            Ok(created) => {
                outcomes.push(ChildOutcome::inserted(ChildKind::Subtitle, path, created.id));
            }
            Err(e) => {
                error!(error = %e, "Error inserting subtitle");
                outcomes.push(ChildOutcome::failed(ChildKind::Subtitle, path, e));
            }
        }
    }

    /// Looks up the episode by number, or the lowest-numbered episode when
    /// no number is given.
    async fn find_episode(
        &self,
        anime_id: &AnimeId,
        episode_number: Option<u32>,
    ) -> Result<EpisodeRef, CatalogError> {
        let anime_filter = eq(anime_id);
        let lookup = match episode_number {
            Some(number) => {
                let number_filter = eq(number);
                self.client
                    .select_single::<EpisodeRef>(
                        EPISODES_TABLE,
                        &[
                            ("select", "id,anime_id"),
                            ("anime_id", &anime_filter),
                            ("episode_number", &number_filter),
                        ],
                    )
                    .await
                    .map(Some)
            }
            None => self
                .client
                .select::<EpisodeRef>(
                    EPISODES_TABLE,
                    &[
                        ("select", "id,anime_id"),
                        ("anime_id", &anime_filter),
                        ("order", "episode_number.asc"),
                        ("limit", "1"),
                    ],
                )
                .await
                .map(|rows| rows.into_iter().next()),
        };

        match lookup {
            Ok(Some(episode)) => Ok(episode),
            Ok(None) => Err(CatalogError::EpisodeNotFound),
            Err(e) => {
                debug!(error = %e, "Episode lookup failed");
                Err(CatalogError::EpisodeNotFound)
            }
        }
    }
}

fn backend(operation: &str, err: &SupabaseError) -> CatalogError {
    error!(error = %err, "Failed to {operation}");
    CatalogError::backend(operation, err)
}

#[async_trait]
impl CatalogStore for RemoteCatalog {
    async fn fetch(&self) -> Result<Vec<Anime>, CatalogError> {
        let rows = match self
            .client
            .select::<AnimeRow>(
                ANIME_TABLE,
                &[
                    ("select", NESTED_SELECT),
                    ("is_archived", "eq.false"),
                    ("order", "created_at.desc"),
                ],
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                self.held.write().await.clear();
                return Err(backend("fetch anime", &e));
            }
        };

        let mut anime = Vec::with_capacity(rows.len());
        for row in rows {
            let subtitles = self.subtitles_for(&row.id).await;
            anime.push(row.into_anime(&subtitles));
        }
        debug!(count = anime.len(), "Fetched anime");

        let mut held = self.held.write().await;
        held.clone_from(&anime);
        Ok(anime)
    }

    async fn snapshot(&self) -> Vec<Anime> {
        self.held.read().await.clone()
    }

    async fn add(&self, new: NewAnime) -> Result<CreateReport, CatalogError> {
        let row = AnimeInsert {
            title: &new.title,
            description: new.description.as_deref().unwrap_or_default(),
            synopsis: new.resolved_synopsis(),
            release_year: new.release_year,
            episode_count: new.resolved_episode_count(),
            studio_name: new.studio_name.as_deref().and_then(non_empty),
            rating: new.rating,
            status: new.status,
            thumbnail_url: new.thumbnail_url.as_deref().and_then(non_empty),
            genres: &new.genres,
            is_archived: false,
            added_by: self.session.current().map(|u| u.id),
        };

        let created: AnimeRow = self
            .client
            .insert(ANIME_TABLE, &row)
            .await
            .map_err(|e| backend("add anime", &e))?;
        info!(anime_id = %created.id, title = %created.title, "Anime created");

        let anime_id = created.id.clone();
        let mut outcomes = Vec::new();

        for (e, episode) in new.episodes.iter().enumerate() {
            let row = EpisodeInsert {
                anime_id: &anime_id,
                episode_number: episode.episode_number,
                season: episode.season.unwrap_or(DEFAULT_SEASON),
                title: episode.title.as_deref().and_then(non_empty),
                description: episode.description.as_deref().and_then(non_empty),
                duration: episode.duration.as_deref().and_then(non_empty),
                thumbnail_url: episode.thumbnail_url.as_deref().and_then(non_empty),
                language: episode
                    .language
                    .as_deref()
                    .and_then(non_empty)
                    .unwrap_or_else(default_language),
            };

            let episode_id = match self.client.insert::<_, IdRow>(EPISODES_TABLE, &row).await {
                Ok(created) => EpisodeId::new(created.id),
                Err(err) => {
                    error!(
                        episode = episode.episode_number,
                        error = %err,
                        "Error inserting episode"
                    );
                    outcomes.push(ChildOutcome::failed(ChildKind::Episode, vec![e], err));
                    for l in 0..episode.links.len() {
                        outcomes.push(ChildOutcome::skipped(
                            ChildKind::Link,
                            vec![e, l],
                            "episode was not inserted",
                        ));
                    }
                    continue;
                }
            };
            debug!(
                episode_id = %episode_id,
                season = row.season,
                language = %row.language,
                "Episode created"
            );
            outcomes.push(ChildOutcome::inserted(ChildKind::Episode, vec![e], &episode_id));

            self.insert_links(&episode_id, &anime_id, &episode.links, &[e], &mut outcomes)
                .await;
        }

        self.refresh().await;

        let report = CreateReport {
            anime: Some(created.into_anime(&[])),
            outcomes,
        };
        if report.is_complete() {
            info!(anime_id = %anime_id, "Anime added successfully");
        } else {
            warn!(
                anime_id = %anime_id,
                failed = report.failures().count(),
                "Anime added with failed children"
            );
        }
        Ok(report)
    }

    async fn update(&self, id: &AnimeId, patch: AnimePatch) -> Result<(), CatalogError> {
        let body = AnimeUpdate {
            patch,
            updated_at: Utc::now().to_rfc3339(),
        };
        let filter = eq(id);
        self.client
            .update(ANIME_TABLE, &[("id", &filter)], &body)
            .await
            .map_err(|e| backend("update anime", &e))?;
        info!(anime_id = %id, "Updated anime");

        self.refresh().await;
        Ok(())
    }

    async fn delete(&self, id: &AnimeId) -> Result<(), CatalogError> {
        let filter = eq(id);
        self.client
            .delete(ANIME_TABLE, &[("id", &filter)])
            .await
            .map_err(|e| backend("delete anime", &e))?;
        info!(anime_id = %id, "Deleted anime");

        self.refresh().await;
        Ok(())
    }

    async fn add_links_to_episode(
        &self,
        episode_id: &EpisodeId,
        links: Vec<NewLink>,
    ) -> Result<LinkBatchReport, CatalogError> {
        let filter = eq(episode_id);
        let episode: EpisodeRef = self
            .client
            .select_single(EPISODES_TABLE, &[("select", "id,anime_id"), ("id", &filter)])
            .await
            .map_err(|_| CatalogError::EpisodeNotFound)?;

        let mut outcomes = Vec::new();
        self.insert_links(&episode.id, &episode.anime_id, &links, &[], &mut outcomes)
            .await;
        self.refresh().await;

        Ok(LinkBatchReport {
            episode_id: Some(episode.id),
            outcomes,
        })
    }

    async fn add_links_to_anime(
        &self,
        anime_id: &AnimeId,
        episode_number: Option<u32>,
        links: Vec<NewLink>,
        language: &str,
    ) -> Result<LinkBatchReport, CatalogError> {
        let episode = self.find_episode(anime_id, episode_number).await?;

        if !language.is_empty() && language != DEFAULT_EPISODE_LANGUAGE {
            let filter = eq(&episode.id);
            if let Err(e) = self
                .client
                .update(
                    EPISODES_TABLE,
                    &[("id", &filter)],
                    &serde_json::json!({ "language": language }),
                )
                .await
            {
                warn!(error = %e, "Could not update episode language");
            }
        }

        let mut outcomes = Vec::new();
        self.insert_links(&episode.id, anime_id, &links, &[], &mut outcomes)
            .await;
        info!(
            anime_id = %anime_id,
            episode_id = %episode.id,
            inserted = outcomes.iter().filter(|o| o.is_inserted()).count(),
            "Added links"
        );
        self.refresh().await;

        Ok(LinkBatchReport {
            episode_id: Some(episode.id),
            outcomes,
        })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }
}
