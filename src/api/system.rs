//! Read-only endpoints backing the settings page and form pickers.

use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::catalog::{CatalogStats, ExportDocument, export_file_name, genre_choices};
use crate::constants::{self, limits};
use crate::domain::events::CatalogEvent;
use crate::domain::{AnimeStatus, BackendKind};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: BackendKind,
    pub uptime_seconds: u64,
    pub signed_in: bool,
}

#[derive(Debug, Serialize)]
pub struct FormLimits {
    pub min_episode_count: u32,
    pub max_episode_count: u32,
    pub max_links_per_episode: usize,
    pub max_subtitles_per_link: usize,
    pub min_password_length: usize,
}

#[derive(Debug, Serialize)]
pub struct SeasonOption {
    pub value: u32,
    pub label: String,
}

/// Picker values for the add-anime and bulk upload forms.
#[derive(Debug, Serialize)]
pub struct ConstantsResponse {
    pub supported_platforms: &'static [&'static str],
    pub common_platforms: &'static [&'static str],
    pub episode_languages: &'static [&'static str],
    pub subtitle_languages: &'static [&'static str],
    pub subtitle_formats: &'static [&'static str],
    pub anime_genres: &'static [&'static str],
    pub statuses: [AnimeStatus; 3],
    pub seasons: Vec<SeasonOption>,
    pub rating_filter_presets: &'static [u8],
    pub default_episode_language: &'static str,
    pub limits: FormLimits,
}

/// `GET /api/health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.catalog().kind(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        signed_in: state.shared.session.current().is_some(),
    }))
}

/// `GET /api/constants`
pub async fn get_constants() -> Json<ApiResponse<ConstantsResponse>> {
    Json(ApiResponse::success(ConstantsResponse {
        supported_platforms: constants::SUPPORTED_PLATFORMS,
        common_platforms: constants::COMMON_PLATFORMS,
        episode_languages: constants::EPISODE_LANGUAGES,
        subtitle_languages: constants::SUBTITLE_LANGUAGES,
        subtitle_formats: constants::SUBTITLE_FORMATS,
        anime_genres: constants::ANIME_GENRES,
        statuses: AnimeStatus::ALL,
        seasons: constants::seasons()
            .map(|(value, label)| SeasonOption { value, label })
            .collect(),
        rating_filter_presets: constants::RATING_FILTER_PRESETS,
        default_episode_language: constants::DEFAULT_EPISODE_LANGUAGE,
        limits: FormLimits {
            min_episode_count: limits::MIN_EPISODE_COUNT,
            max_episode_count: limits::MAX_EPISODE_COUNT,
            max_links_per_episode: limits::MAX_LINKS_PER_EPISODE,
            max_subtitles_per_link: limits::MAX_SUBTITLES_PER_LINK,
            min_password_length: limits::MIN_PASSWORD_LENGTH,
        },
    }))
}

/// `POST /api/refresh`: reloads the collection and tells subscribers.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<usize>>, ApiError> {
    let count = state.collection().await?.len();
    state.shared.publish(CatalogEvent::Refreshed {
        backend: state.catalog().kind(),
        count,
    });
    Ok(Json(ApiResponse::success(count)))
}

/// `GET /api/genres`: genres in use, for the list filter.
pub async fn get_genres(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let all = state.collection().await?;
    Ok(Json(ApiResponse::success(genre_choices(&all))))
}

/// `GET /api/stats`
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<CatalogStats>>, ApiError> {
    let all = state.collection().await?;
    Ok(Json(ApiResponse::success(CatalogStats::compute(&all))))
}

/// `GET /api/export`: the collection as a downloadable JSON file.
pub async fn export(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let doc = ExportDocument::new(state.collection().await?);
    let body = doc
        .to_pretty_json()
        .map_err(|e| ApiError::internal(format!("Failed to serialize export: {e}")))?;
    let file_name = export_file_name(chrono::Local::now().date_naive());

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}
