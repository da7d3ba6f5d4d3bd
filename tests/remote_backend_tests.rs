use anishelf::clients::{SupabaseClient, SupabaseConfig};
use anishelf::constants::storage_keys;
use anishelf::form::AnimePayload;
use anishelf::models::{Anime, User};
use anishelf::services::{
    AuthError, AuthService, CatalogStore, ChildKind, LocalCatalog, RemoteAuth, RemoteCatalog,
    SessionStore,
};
use anishelf::storage::{KeyValueStore, MemoryStore};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// In-memory stand-in for the hosted database and identity service.
#[derive(Default)]
struct FakeBackend {
    tables: HashMap<String, Vec<Value>>,
    next_id: u64,
    fail_episode_number: Option<u64>,
    bearers: Vec<String>,
}

type Shared = Arc<Mutex<FakeBackend>>;

impl FakeBackend {
    fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.get(table).cloned().unwrap_or_default()
    }

    fn seed(&mut self, table: &str, row: Value) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => render(a).cmp(&render(b)),
    }
}

fn matches_filters(row: &Value, query: &HashMap<String, String>) -> bool {
    query
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "select" | "order" | "limit"))
        .all(|(key, filter)| {
            let expected = filter.strip_prefix("eq.").unwrap_or(filter);
            row.get(key).map(render).as_deref() == Some(expected)
        })
}

fn select_rows(db: &FakeBackend, table: &str, query: &HashMap<String, String>) -> Vec<Value> {
    let mut rows: Vec<Value> = db
        .rows(table)
        .into_iter()
        .filter(|row| matches_filters(row, query))
        .collect();

    if let Some(order) = query.get("order") {
        let (field, direction) = order.split_once('.').unwrap_or((order.as_str(), "asc"));
        rows.sort_by(|a, b| {
            let ord = compare(&a[field], &b[field]);
            if direction == "desc" { ord.reverse() } else { ord }
        });
    }
    if let Some(limit) = query.get("limit").and_then(|l| l.parse::<usize>().ok()) {
        rows.truncate(limit);
    }

    if table == "anime" {
        for anime in &mut rows {
            let episodes: Vec<Value> = db
                .rows("episodes")
                .into_iter()
                .filter(|ep| ep["anime_id"] == anime["id"])
                .map(|mut ep| {
                    let links: Vec<Value> = db
                        .rows("episode_links")
                        .into_iter()
                        .filter(|l| l["episode_id"] == ep["id"])
                        .collect();
                    ep["episode_links"] = Value::Array(links);
                    ep
                })
                .collect();
            anime["episodes"] = Value::Array(episodes);
        }
    }
    rows
}

fn api_error(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({ "code": code, "message": message }))).into_response()
}

fn record_bearer(db: &Shared, headers: &HeaderMap) {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        db.lock().unwrap().bearers.push(value.to_string());
    }
}

async fn rest_select(
    State(db): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    record_bearer(&db, &headers);
    let rows = select_rows(&db.lock().unwrap(), &table, &query);
    let single = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == SINGLE_OBJECT);

    if !single {
        return Json(Value::Array(rows)).into_response();
    }
    match rows.as_slice() {
        [row] => Json(row.clone()).into_response(),
        _ => api_error(
            StatusCode::NOT_ACCEPTABLE,
            "PGRST116",
            "JSON object requested, multiple (or no) rows returned",
        ),
    }
}

async fn rest_insert(
    State(db): State<Shared>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(mut row): Json<Value>,
) -> Response {
    record_bearer(&db, &headers);
    let mut db = db.lock().unwrap();

    if table == "episodes"
        && db.fail_episode_number.is_some()
        && row["episode_number"].as_u64() == db.fail_episode_number
    {
        return api_error(StatusCode::CONFLICT, "23505", "duplicate key value");
    }

    db.next_id += 1;
    if row.get("id").is_none() {
        row["id"] = json!(format!("{table}-{}", db.next_id));
    }
    row["created_at"] = json!(format!("2024-01-01T00:00:{:02}Z", db.next_id));
    db.seed(&table, row.clone());
    (StatusCode::CREATED, Json(row)).into_response()
}

async fn rest_update(
    State(db): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> StatusCode {
    let mut db = db.lock().unwrap();
    if let Some(rows) = db.tables.get_mut(&table) {
        for row in rows.iter_mut().filter(|r| matches_filters(r, &query)) {
            if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
    }
    StatusCode::NO_CONTENT
}

async fn rest_delete(
    State(db): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    let mut db = db.lock().unwrap();
    if let Some(rows) = db.tables.get_mut(&table) {
        rows.retain(|r| !matches_filters(r, &query));
    }
    StatusCode::NO_CONTENT
}

async fn token(Json(body): Json<Value>) -> Response {
    if body["password"] != "secret1" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
        )
            .into_response();
    }
    let email = render(&body["email"]);
    Json(json!({
        "access_token": format!("jwt-{email}"),
        "refresh_token": "refresh",
        "user": { "id": format!("uid-{email}"), "email": email }
    }))
    .into_response()
}

async fn signup(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "id": "uid-pending", "email": body["email"] }))
}

async fn spawn_backend(db: Shared) -> String {
    let app = Router::new()
        .route(
            "/rest/v1/{table}",
            get(rest_select)
                .post(rest_insert)
                .patch(rest_update)
                .delete(rest_delete),
        )
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/logout", post(|| async { StatusCode::NO_CONTENT }))
        .with_state(db);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(url: &str) -> Arc<SupabaseClient> {
    Arc::new(
        SupabaseClient::new(&SupabaseConfig {
            url: url.to_string(),
            api_key: "anon-key".to_string(),
            timeout: None,
        })
        .unwrap(),
    )
}

fn seeded() -> Shared {
    let mut db = FakeBackend::default();
    db.seed(
        "anime",
        json!({ "id": "a1", "title": "Frieren", "status": "ongoing", "rating": 9.3,
                "genres": ["Fantasy"], "is_archived": false, "created_at": "2023-10-01" }),
    );
    db.seed(
        "anime",
        json!({ "id": "a0", "title": "Archived", "is_archived": true, "created_at": "2023-09-01" }),
    );
    db.seed(
        "episodes",
        json!({ "id": "e2", "anime_id": "a1", "episode_number": 2, "language": "English" }),
    );
    db.seed(
        "episodes",
        json!({ "id": "e1", "anime_id": "a1", "episode_number": 1 }),
    );
    db.seed(
        "episode_links",
        json!({ "id": "l1", "episode_id": "e1", "platform": "Mega", "url": "https://mega.nz/1" }),
    );
    db.seed(
        "episode_links",
        json!({ "id": "l2", "episode_id": "e2", "platform": "Terabox", "url": "https://terabox.com/2" }),
    );
    db.seed(
        "subtitles",
        json!({ "id": "s1", "anime_id": "a1", "language": "English", "url": "https://subs/1.srt" }),
    );
    Arc::new(Mutex::new(db))
}

fn payload() -> AnimePayload {
    serde_json::from_value(json!({
        "title": "Dungeon Meshi",
        "genres": ["Fantasy", "Comedy"],
        "rating": 8.4,
        "episodes": [
            { "links": [{ "platform": "Mega", "url": "https://mega.nz/dm1",
                          "subtitles": [{ "language": "English", "url": "https://subs/dm1.srt" }] }] },
            { "links": [{ "platform": "Mega", "url": "https://mega.nz/dm2" }] },
            { "links": [{ "platform": "Mega", "url": "https://mega.nz/dm3" }] }
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn fetch_skips_archived_and_spreads_subtitles_over_every_link() {
    let db = seeded();
    let url = spawn_backend(db.clone()).await;
    let catalog = RemoteCatalog::new(client(&url), SessionStore::new(None));

    let anime = catalog.fetch().await.unwrap();
    assert_eq!(anime.len(), 1);
    let frieren = &anime[0];
    assert_eq!(frieren.title, "Frieren");
    assert_eq!(frieren.episodes.len(), 2);
    assert!(
        frieren
            .episodes
            .iter()
            .flat_map(|e| e.links.iter())
            .all(|l| l.subtitles.len() == 1 && l.subtitles[0].language == "English")
    );
    assert_eq!(catalog.snapshot().await.len(), 1);

    let bearers = db.lock().unwrap().bearers.clone();
    assert!(bearers.iter().all(|b| b == "Bearer anon-key"));
}

#[tokio::test]
async fn failed_fetch_clears_the_snapshot() {
    let broken = RemoteCatalog::new(client("http://127.0.0.1:1"), SessionStore::new(None));
    assert!(broken.fetch().await.is_err());
    assert!(broken.snapshot().await.is_empty());
}

#[tokio::test]
async fn failing_episode_insert_is_reported_without_aborting_siblings() {
    let db = seeded();
    db.lock().unwrap().fail_episode_number = Some(2);
    let url = spawn_backend(db.clone()).await;
    let catalog = RemoteCatalog::new(client(&url), SessionStore::new(None));

    let form = payload().into_form().unwrap();
    let report = form.submit(&catalog).await.unwrap();

    assert_eq!(report.failures().count(), 1);
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.kind, ChildKind::Episode);
    assert_eq!(failure.path, vec![1]);
    assert_eq!(report.inserted_count(ChildKind::Episode), 2);
    assert_eq!(report.inserted_count(ChildKind::Link), 2);
    assert_eq!(report.inserted_count(ChildKind::Subtitle), 1);

    let created = report.anime.unwrap();
    assert_eq!(created.title, "Dungeon Meshi");
    assert_eq!(created.episode_count, 3);

    let held = catalog.snapshot().await;
    let stored = held.iter().find(|a| a.id == created.id).unwrap();
    assert_eq!(stored.episodes.len(), 2);

    let subtitle = db
        .lock()
        .unwrap()
        .rows("subtitles")
        .into_iter()
        .find(|s| s["url"] == "https://subs/dm1.srt")
        .unwrap();
    assert_eq!(render(&subtitle["anime_id"]), created.id.to_string());
}

fn two_subtitled_links() -> AnimePayload {
    serde_json::from_value(json!({
        "title": "Kaiju No. 8",
        "genres": ["Action"],
        "episodes": [
            { "links": [
                { "platform": "Mega", "url": "https://mega.nz/k1",
                  "subtitles": [{ "language": "English", "url": "https://subs/k1-en.srt" }] },
                { "platform": "Terabox", "url": "https://terabox.com/k1",
                  "subtitles": [{ "language": "Spanish", "url": "https://subs/k1-es.srt" }] }
            ] }
        ]
    }))
    .unwrap()
}

fn subtitle_languages(all: &[Anime], title: &str) -> Vec<Vec<String>> {
    let anime = all.iter().find(|a| a.title == title).unwrap();
    anime.episodes[0]
        .links
        .iter()
        .map(|l| l.subtitles.iter().map(|s| s.language.clone()).collect())
        .collect()
}

#[tokio::test]
async fn subtitles_stay_per_link_locally_but_attach_to_every_remote_link() {
    let local = LocalCatalog::new(
        Arc::new(MemoryStore::new()),
        SessionStore::new(Some(User::demo())),
    );
    let report = two_subtitled_links()
        .into_form()
        .unwrap()
        .submit(&local)
        .await
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(
        subtitle_languages(&local.fetch().await.unwrap(), "Kaiju No. 8"),
        vec![vec!["English"], vec!["Spanish"]]
    );

    let url = spawn_backend(Arc::new(Mutex::new(FakeBackend::default()))).await;
    let remote = RemoteCatalog::new(client(&url), SessionStore::new(None));
    let report = two_subtitled_links()
        .into_form()
        .unwrap()
        .submit(&remote)
        .await
        .unwrap();
    assert_eq!(report.inserted_count(ChildKind::Subtitle), 2);

    let mut per_link = subtitle_languages(&remote.fetch().await.unwrap(), "Kaiju No. 8");
    for languages in &mut per_link {
        languages.sort();
    }
    assert_eq!(
        per_link,
        vec![vec!["English", "Spanish"], vec!["English", "Spanish"]]
    );
}

#[tokio::test]
async fn links_without_episode_number_go_to_the_lowest_episode() {
    let db = seeded();
    let url = spawn_backend(db.clone()).await;
    let catalog = RemoteCatalog::new(client(&url), SessionStore::new(None));

    let mut form = serde_json::from_value::<anishelf::form::LinksPayload>(json!({
        "language": "Hindi",
        "links": [{ "platform": "Mediafire", "url": "https://mediafire.com/f1" }]
    }))
    .unwrap()
    .into_form(anishelf::domain::AnimeId::new("a1"));
    let summary = form.submit(&catalog).await.unwrap();

    assert_eq!(summary.message, "Successfully added 1 links in Hindi!");
    assert_eq!(
        summary.report.episode_id.as_ref().map(ToString::to_string),
        Some("e1".to_string())
    );
    let rows = db.lock().unwrap().rows("episodes");
    let e1 = rows.iter().find(|e| e["id"] == "e1").unwrap();
    assert_eq!(e1["language"], "Hindi");

    let err = catalog
        .add_links_to_anime(
            &anishelf::domain::AnimeId::new("a1"),
            Some(7),
            vec![],
            "Japanese",
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        anishelf::services::CatalogError::EpisodeNotFound
    ));
}

#[tokio::test]
async fn sign_in_creates_profile_and_authorizes_catalog_requests() {
    let db = seeded();
    let url = spawn_backend(db.clone()).await;
    let client = client(&url);
    let store = Arc::new(MemoryStore::new());
    let session = SessionStore::new(None);
    let auth = RemoteAuth::new(client.clone(), store.clone(), session.clone());

    let err = auth
        .sign_in("mika@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    let user = auth.sign_in("mika@example.com", "secret1").await.unwrap();
    assert_eq!(user.name, "mika");
    assert_eq!(session.current(), Some(user.clone()));
    assert_eq!(db.lock().unwrap().rows("users").len(), 1);
    assert!(store.get(storage_keys::REMOTE_SESSION).unwrap().is_some());

    let catalog = RemoteCatalog::new(client.clone(), session.clone());
    let report = payload().into_form().unwrap().submit(&catalog).await.unwrap();
    let added_by = db
        .lock()
        .unwrap()
        .rows("anime")
        .into_iter()
        .find(|a| a["title"] == "Dungeon Meshi")
        .map(|a| render(&a["added_by"]));
    assert_eq!(added_by, Some(user.id.to_string()));
    assert!(report.is_complete());
    assert!(
        db.lock()
            .unwrap()
            .bearers
            .contains(&"Bearer jwt-mika@example.com".to_string())
    );

    let restored_session = SessionStore::new(None);
    let restored = RemoteAuth::new(client.clone(), store.clone(), restored_session.clone());
    restored.restore().await;
    assert_eq!(restored_session.current().map(|u| u.id), Some(user.id));
    assert_eq!(db.lock().unwrap().rows("users").len(), 1);

    auth.sign_out().await.unwrap();
    assert!(session.current().is_none());
    assert!(store.get(storage_keys::REMOTE_SESSION).unwrap().is_none());
}

#[tokio::test]
async fn sign_up_without_session_needs_confirmation() {
    let url = spawn_backend(seeded()).await;
    let auth = RemoteAuth::new(
        client(&url),
        Arc::new(MemoryStore::new()),
        SessionStore::new(None),
    );

    let outcome = auth.sign_up("new@example.com", "secret1").await.unwrap();
    assert_eq!(
        outcome.message(),
        anishelf::services::SignUpOutcome::ConfirmationRequired {
            email: "new@example.com".to_string()
        }
        .message()
    );
    assert!(auth.current_user().is_none());
}
