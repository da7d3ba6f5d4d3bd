//! Catalog adapter backed by the on-device key-value store.
//!
//! Each user's collection is one JSON document under `anime_data_<user_id>`.
//! Mutations patch the in-memory copy and write the whole document back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::constants::{DEFAULT_EPISODE_LANGUAGE, DEFAULT_SEASON, storage_keys};
use crate::domain::{AnimeId, BackendKind, EpisodeId, LinkId, SubtitleId, UserId};
use crate::models::anime::non_empty;
use crate::models::{Anime, AnimePatch, Episode, Link, NewAnime, NewLink, Subtitle, User};
use crate::services::catalog_service::{
    CatalogError, CatalogStore, ChildKind, ChildOutcome, CreateReport, LinkBatchReport,
};
use crate::services::sample_data::sample_collection;
use crate::services::session::SessionStore;
use crate::storage::{KeyValueStore, read_json, write_json};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Unix milliseconds followed by nine random base-36 characters.
#[must_use]
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
        .collect();
    format!("{}{suffix}", Utc::now().timestamp_millis())
}

#[must_use]
pub fn collection_key(user_id: &UserId) -> String {
    format!("{}{user_id}", storage_keys::COLLECTION_PREFIX)
}

#[derive(Default)]
struct Held {
    owner: Option<UserId>,
    anime: Vec<Anime>,
}

pub struct LocalCatalog {
    store: Arc<dyn KeyValueStore>,
    session: SessionStore,
    held: RwLock<Held>,
}

impl LocalCatalog {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, session: SessionStore) -> Self {
        Self {
            store,
            session,
            held: RwLock::new(Held::default()),
        }
    }

    /// Reads the user's document, seeding the sample titles when absent.
    /// Any failure degrades to an empty collection.
    fn load_or_seed(&self, user: &User) -> Vec<Anime> {
        let key = collection_key(&user.id);
        match read_json::<Vec<Anime>>(self.store.as_ref(), &key) {
            Ok(Some(anime)) => anime,
            Ok(None) => {
                let seeded = sample_collection(&user.id);
                if let Err(e) = write_json(self.store.as_ref(), &key, &seeded) {
                    warn!(error = %e, user_id = %user.id, "Failed to persist sample collection");
                }
                info!(user_id = %user.id, count = seeded.len(), "Seeded sample collection");
                seeded
            }
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "Failed to read anime collection");
                Vec::new()
            }
        }
    }

    /// Makes sure `held` belongs to the current user before it is mutated.
    fn require_user(&self, held: &mut Held) -> Result<User, CatalogError> {
        let user = self.session.current().ok_or(CatalogError::NotAuthenticated)?;
        if held.owner.as_ref() != Some(&user.id) {
            held.anime = self.load_or_seed(&user);
            held.owner = Some(user.id.clone());
        }
        Ok(user)
    }

    fn persist(&self, user: &User, anime: &[Anime]) -> Result<(), CatalogError> {
        write_json(self.store.as_ref(), &collection_key(&user.id), anime)?;
        Ok(())
    }
}

fn build_link(new: NewLink, path: &[usize], outcomes: &mut Vec<ChildOutcome>) -> Link {
    let link_id = LinkId::new(generate_id());
    let subtitles = new
        .subtitles
        .into_iter()
        .enumerate()
        .map(|(s, sub)| {
            let id = SubtitleId::new(generate_id());
            let mut sub_path = path.to_vec();
            sub_path.push(s);
            outcomes.push(ChildOutcome::inserted(ChildKind::Subtitle, sub_path, &id));
            Subtitle {
                id,
                language: sub.language,
                url: sub.url.as_deref().and_then(non_empty),
                file_path: sub.file_path.as_deref().and_then(non_empty),
                file_name: sub.file_name.as_deref().and_then(non_empty),
            }
        })
        .collect();

    outcomes.push(ChildOutcome::inserted(ChildKind::Link, path.to_vec(), &link_id));
    Link {
        id: link_id,
        platform: new.platform,
        url: new.url,
        quality: new.quality.as_deref().and_then(non_empty),
        file_size: new.file_size.as_deref().and_then(non_empty),
        subtitles,
    }
}

fn append_links(episode: &mut Episode, links: Vec<NewLink>) -> Vec<ChildOutcome> {
    let mut outcomes = Vec::new();
    for (i, new) in links.into_iter().enumerate() {
        let link = build_link(new, &[i], &mut outcomes);
        episode.links.push(link);
    }
    episode.updated_at = Utc::now().to_rfc3339();
    outcomes
}

#[async_trait]
impl CatalogStore for LocalCatalog {
    async fn fetch(&self) -> Result<Vec<Anime>, CatalogError> {
        let mut held = self.held.write().await;
        match self.session.current() {
            None => {
                *held = Held::default();
            }
            Some(user) => {
                held.anime = self.load_or_seed(&user);
                held.owner = Some(user.id);
            }
        }
        Ok(held.anime.clone())
    }

    async fn snapshot(&self) -> Vec<Anime> {
        self.held.read().await.anime.clone()
    }

    async fn add(&self, new: NewAnime) -> Result<CreateReport, CatalogError> {
        let mut held = self.held.write().await;
        let user = self.require_user(&mut held)?;

        let now = Utc::now().to_rfc3339();
        let anime_id = AnimeId::new(generate_id());
        let episode_count = new.resolved_episode_count();
        let synopsis = new.resolved_synopsis();
        let mut outcomes = Vec::new();

        let episodes = new
            .episodes
            .into_iter()
            .enumerate()
            .map(|(e, ep)| {
                let id = EpisodeId::new(generate_id());
                outcomes.push(ChildOutcome::inserted(ChildKind::Episode, vec![e], &id));
                let links = ep
                    .links
                    .into_iter()
                    .enumerate()
                    .map(|(l, link)| build_link(link, &[e, l], &mut outcomes))
                    .collect();
                Episode {
                    id,
                    anime_id: anime_id.clone(),
                    episode_number: ep.episode_number,
                    season: ep.season.unwrap_or(DEFAULT_SEASON),
                    title: ep.title.as_deref().and_then(non_empty),
                    description: ep.description.as_deref().and_then(non_empty),
                    duration: ep.duration.as_deref().and_then(non_empty),
                    thumbnail_url: ep.thumbnail_url.as_deref().and_then(non_empty),
                    language: ep
                        .language
                        .filter(|l| !l.is_empty())
                        .unwrap_or_else(|| DEFAULT_EPISODE_LANGUAGE.to_string()),
                    created_at: now.clone(),
                    updated_at: now.clone(),
                    links,
                }
            })
            .collect();

        let anime = Anime {
            id: anime_id,
            title: new.title,
            description: new.description.unwrap_or_default(),
            synopsis,
            release_year: new.release_year,
            episode_count,
            studio_id: None,
            studio_name: new.studio_name.as_deref().and_then(non_empty),
            rating: new.rating,
            status: new.status,
            thumbnail_url: new.thumbnail_url.as_deref().and_then(non_empty),
            created_at: now.clone(),
            updated_at: now,
            added_by: Some(user.id.clone()),
            is_archived: false,
            genres: new.genres,
            episodes,
        };

        held.anime.push(anime.clone());
        self.persist(&user, &held.anime)?;
        info!(anime_id = %anime.id, title = %anime.title, "Added anime");

        Ok(CreateReport {
            anime: Some(anime),
            outcomes,
        })
    }

    async fn update(&self, id: &AnimeId, patch: AnimePatch) -> Result<(), CatalogError> {
        let mut held = self.held.write().await;
        let user = self.require_user(&mut held)?;

        if let Some(anime) = held.anime.iter_mut().find(|a| &a.id == id) {
            patch.apply_to(anime);
            anime.updated_at = Utc::now().to_rfc3339();
            info!(anime_id = %id, "Updated anime");
        }
        self.persist(&user, &held.anime)
    }

    async fn delete(&self, id: &AnimeId) -> Result<(), CatalogError> {
        let mut held = self.held.write().await;
        let user = self.require_user(&mut held)?;

        held.anime.retain(|a| &a.id != id);
        self.persist(&user, &held.anime)?;
        info!(anime_id = %id, "Deleted anime");
        Ok(())
    }

    async fn add_links_to_episode(
        &self,
        episode_id: &EpisodeId,
        links: Vec<NewLink>,
    ) -> Result<LinkBatchReport, CatalogError> {
        let mut held = self.held.write().await;
        let user = self.require_user(&mut held)?;

        let (anime, episode) = held
            .anime
            .iter_mut()
            .find_map(|a| {
                let idx = a.episodes.iter().position(|ep| &ep.id == episode_id)?;
                Some((a, idx))
            })
            .map(|(a, idx)| {
                a.updated_at = Utc::now().to_rfc3339();
                (a.id.clone(), &mut a.episodes[idx])
            })
            .ok_or(CatalogError::EpisodeNotFound)?;

        let outcomes = append_links(episode, links);
        self.persist(&user, &held.anime)?;
        info!(anime_id = %anime, episode_id = %episode_id, count = outcomes.len(), "Added links");

        Ok(LinkBatchReport {
            episode_id: Some(episode_id.clone()),
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
        let episode_id = {
            let mut held = self.held.write().await;
            self.require_user(&mut held)?;

            let anime = held
                .anime
                .iter_mut()
                .find(|a| &a.id == anime_id)
                .ok_or(CatalogError::EpisodeNotFound)?;

            let idx = episode_number
                .and_then(|n| anime.episodes.iter().position(|ep| ep.episode_number == n))
                .or_else(|| (!anime.episodes.is_empty()).then_some(0))
                .ok_or(CatalogError::EpisodeNotFound)?;

            let episode = &mut anime.episodes[idx];
            if !language.is_empty() && language != DEFAULT_EPISODE_LANGUAGE {
                episode.language = language.to_string();
            }
            episode.id.clone()
        };

        self.add_links_to_episode(&episode_id, links).await
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnimeStatus;
    use crate::models::{NewEpisode, NewSubtitle};
    use crate::storage::MemoryStore;

    fn catalog() -> (LocalCatalog, Arc<MemoryStore>, SessionStore) {
        let store = Arc::new(MemoryStore::new());
        let session = SessionStore::new(Some(User::demo()));
        let catalog = LocalCatalog::new(store.clone(), session.clone());
        (catalog, store, session)
    }

    fn new_link(platform: &str, url: &str) -> NewLink {
        NewLink {
            platform: platform.to_string(),
            url: url.to_string(),
            quality: Some(String::new()),
            file_size: None,
            subtitles: vec![],
        }
    }

    fn new_anime(title: &str, episodes: u32) -> NewAnime {
        NewAnime {
            title: title.to_string(),
            description: Some("desc".to_string()),
            synopsis: None,
            thumbnail_url: Some(String::new()),
            rating: 7.0,
            release_year: 2024,
            status: AnimeStatus::Ongoing,
            episode_count: None,
            studio_name: None,
            genres: vec!["Action".to_string()],
            episodes: (1..=episodes)
                .map(|n| NewEpisode {
                    episode_number: n,
                    season: None,
                    title: None,
                    description: None,
                    duration: None,
                    thumbnail_url: None,
                    language: None,
                    links: vec![NewLink {
                        subtitles: vec![NewSubtitle {
                            language: "English".to_string(),
                            url: Some("https://example.com/en.srt".to_string()),
                            file_path: None,
                            file_name: None,
                        }],
                        ..new_link("Mega", "https://mega.nz/x")
                    }],
                })
                .collect(),
        }
    }

    #[test]
    fn generated_ids_have_millis_prefix_and_base36_suffix() {
        let id = generate_id();
        assert!(id.len() >= 13 + 9);
        let (millis, suffix) = id.split_at(id.len() - 9);
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        assert!(suffix.bytes().all(|b| BASE36.contains(&b)));
        assert_ne!(generate_id(), generate_id());
    }

    #[tokio::test]
    async fn first_fetch_seeds_and_persists_samples() {
        let (catalog, store, _) = catalog();

        let anime = catalog.fetch().await.unwrap();
        assert_eq!(anime.len(), 2);
        assert!(store.get("anime_data_1").unwrap().is_some());

        let again = catalog.fetch().await.unwrap();
        assert_eq!(anime[0].id, again[0].id);
    }

    #[tokio::test]
    async fn fetch_without_user_is_empty() {
        let (catalog, store, session) = catalog();
        session.set(None);

        assert!(catalog.fetch().await.unwrap().is_empty());
        assert!(store.get("anime_data_1").unwrap().is_none());
        assert!(matches!(
            catalog.delete(&AnimeId::new("x")).await,
            Err(CatalogError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn corrupt_document_degrades_to_empty() {
        let (catalog, store, _) = catalog();
        store.set("anime_data_1", "{ not json").unwrap();

        assert!(catalog.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_normalizes_optional_fields_and_links_episodes() {
        let (catalog, store, _) = catalog();
        store.set("anime_data_1", "[]").unwrap();
        catalog.fetch().await.unwrap();

        let report = catalog.add(new_anime("Frieren", 2)).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.inserted_count(ChildKind::Episode), 2);
        assert_eq!(report.inserted_count(ChildKind::Link), 2);
        assert_eq!(report.inserted_count(ChildKind::Subtitle), 2);

        let created = report.anime.unwrap();
        assert_eq!(created.episode_count, 2);
        assert_eq!(created.synopsis, "desc");
        assert_eq!(created.thumbnail_url, None);
        assert_eq!(created.added_by, Some(UserId::new("1")));
        assert!(created.episodes.iter().all(|ep| ep.anime_id == created.id));
        assert_eq!(created.episodes[0].language, "Japanese");
        assert_eq!(created.episodes[0].links[0].quality, None);

        let stored: Vec<Anime> = read_json(store.as_ref(), "anime_data_1").unwrap().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, created.id);
    }

    #[tokio::test]
    async fn mutation_without_prior_fetch_keeps_stored_data() {
        let (catalog, store, _) = catalog();
        let seeded = sample_collection(&UserId::new("1"));
        write_json(store.as_ref(), "anime_data_1", &seeded).unwrap();

        catalog.add(new_anime("Mushishi", 1)).await.unwrap();

        let stored: Vec<Anime> = read_json(store.as_ref(), "anime_data_1").unwrap().unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn update_merges_and_unknown_id_is_noop() {
        let (catalog, _, _) = catalog();
        let anime = catalog.fetch().await.unwrap();
        let target = anime[0].id.clone();

        catalog
            .update(
                &target,
                AnimePatch {
                    rating: Some(6.5),
                    ..AnimePatch::default()
                },
            )
            .await
            .unwrap();
        catalog
            .update(&AnimeId::new("missing"), AnimePatch::default())
            .await
            .unwrap();

        let after = catalog.snapshot().await;
        assert_eq!(after.len(), 2);
        assert!((after[0].rating - 6.5).abs() < f64::EPSILON);
        assert_eq!(after[0].episodes, anime[0].episodes);
    }

    #[tokio::test]
    async fn delete_removes_only_target() {
        let (catalog, _, _) = catalog();
        let anime = catalog.fetch().await.unwrap();

        catalog.delete(&anime[0].id).await.unwrap();

        let after = catalog.snapshot().await;
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, anime[1].id);

        catalog.delete(&AnimeId::new("missing")).await.unwrap();
        assert_eq!(catalog.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn added_anime_reads_back_as_the_same_tree() {
        let (catalog, store, session) = catalog();
        catalog.fetch().await.unwrap();
        let created = catalog
            .add(new_anime("Frieren", 2))
            .await
            .unwrap()
            .anime
            .unwrap();

        let reopened = LocalCatalog::new(store.clone(), session.clone());
        let fetched = reopened.fetch().await.unwrap();
        let stored = fetched.iter().find(|a| a.id == created.id).unwrap();

        assert_eq!(stored, &created);
        assert_eq!(stored.episodes.len(), 2);
        assert_eq!(stored.episodes[1].links[0].subtitles.len(), 1);
    }

    #[tokio::test]
    async fn links_go_to_numbered_episode_and_update_language() {
        let (catalog, store, _) = catalog();
        store.set("anime_data_1", "[]").unwrap();
        let created = catalog.add(new_anime("Mob", 3)).await.unwrap().anime.unwrap();

        let report = catalog
            .add_links_to_anime(
                &created.id,
                Some(2),
                vec![new_link("Terabox", "https://tb.example/2")],
                "Hindi",
            )
            .await
            .unwrap();
        assert_eq!(report.inserted_count(ChildKind::Link), 1);

        let after = catalog.snapshot().await;
        let ep2 = after[0].find_episode(2).unwrap();
        assert_eq!(ep2.links.len(), 2);
        assert_eq!(ep2.language, "Hindi");
        assert_eq!(after[0].find_episode(1).unwrap().links.len(), 1);
    }

    #[tokio::test]
    async fn links_fall_back_to_first_episode() {
        let (catalog, _, _) = catalog();
        let anime = catalog.fetch().await.unwrap();

        catalog
            .add_links_to_anime(&anime[1].id, None, vec![new_link("Mega", "https://m/1")], "")
            .await
            .unwrap();

        let after = catalog.snapshot().await;
        assert_eq!(after[1].episodes[0].links.len(), 2);
        assert_eq!(after[1].episodes[0].language, "Japanese");
    }

    #[tokio::test]
    async fn links_to_unknown_anime_or_episode_fail() {
        let (catalog, _, _) = catalog();
        catalog.fetch().await.unwrap();

        let err = catalog
            .add_links_to_anime(&AnimeId::new("nope"), Some(1), vec![], "")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::EpisodeNotFound));

        let err = catalog
            .add_links_to_episode(&EpisodeId::new("nope"), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::EpisodeNotFound));
    }
}
