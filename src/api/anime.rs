use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::validation::{validate_anime_id, validate_episode_number};
use super::{AnimeSummaryDto, ApiError, ApiResponse, AppState, CreateAnimeResponse, MessageResponse};
use crate::catalog::AnimeFilter;
use crate::constants::limits;
use crate::domain::events::CatalogEvent;
use crate::domain::AnimeId;
use crate::form::{AnimePayload, LinksPayload, UploadSummary};
use crate::models::{Anime, AnimePatch};
use crate::services::ChildKind;

async fn find_anime(state: &AppState, id: &AnimeId) -> Result<Anime, ApiError> {
    state
        .collection()
        .await?
        .into_iter()
        .find(|a| &a.id == id)
        .ok_or_else(|| ApiError::not_found("Anime", id))
}

pub async fn list_anime(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AnimeFilter>,
) -> Result<Json<ApiResponse<Vec<AnimeSummaryDto>>>, ApiError> {
    let all = state.collection().await?;
    let rows = filter
        .apply(&all)
        .into_iter()
        .cloned()
        .map(AnimeSummaryDto::from)
        .collect();

    Ok(Json(ApiResponse::success(rows)))
}

pub async fn get_anime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Anime>>, ApiError> {
    let id = validate_anime_id(&id)?;
    let anime = find_anime(&state, &id).await?;
    Ok(Json(ApiResponse::success(anime)))
}

/// Runs the payload through the add-anime form, so the same limits and
/// validation apply as for interactive entry.
pub async fn add_anime(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AnimePayload>,
) -> Result<(StatusCode, Json<ApiResponse<CreateAnimeResponse>>), ApiError> {
    let form = payload.into_form()?;
    let report = form.submit(state.catalog()).await?;

    if let Some(anime) = &report.anime {
        state.shared.publish(CatalogEvent::AnimeAdded {
            anime_id: anime.id.clone(),
            title: anime.title.clone(),
            failed_children: report.failures().count(),
        });
    }

    let response = CreateAnimeResponse {
        message: form.success_message(),
        report,
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

pub async fn update_anime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<AnimePatch>,
) -> Result<Json<ApiResponse<Anime>>, ApiError> {
    let id = validate_anime_id(&id)?;
    if patch.is_empty() {
        return Err(ApiError::validation("No fields to update"));
    }
    if patch
        .rating
        .is_some_and(|r| !(0.0..=limits::MAX_RATING).contains(&r))
    {
        return Err(ApiError::validation("Rating must be between 0 and 10"));
    }
    find_anime(&state, &id).await?;

    state.catalog().update(&id, patch).await?;
    state.shared.publish(CatalogEvent::AnimeUpdated {
        anime_id: id.clone(),
    });

    let updated = state
        .catalog()
        .snapshot()
        .await
        .into_iter()
        .find(|a| a.id == id)
        .ok_or_else(|| ApiError::not_found("Anime", &id))?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn remove_anime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_anime_id(&id)?;
    let anime = find_anime(&state, &id).await?;

    state.catalog().delete(&id).await?;
    state.shared.publish(CatalogEvent::AnimeDeleted {
        anime_id: id.clone(),
    });

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Removed \"{}\"",
        anime.title
    )))))
}

pub async fn add_links(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<LinksPayload>,
) -> Result<Json<ApiResponse<UploadSummary>>, ApiError> {
    let id = validate_anime_id(&id)?;
    if let Some(number) = payload.episode_number {
        validate_episode_number(number)?;
    }
    let mut form = payload.into_form(id.clone());
    let summary = form.submit(state.catalog()).await?;

    state.shared.publish(CatalogEvent::LinksAdded {
        anime_id: id,
        inserted: summary.report.inserted_count(ChildKind::Link),
        failed: summary.report.failures().count(),
    });

    Ok(Json(ApiResponse::success(summary)))
}
