use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;

use super::validation::validate_email;
use super::{
    ApiError, ApiResponse, AppState, CredentialsRequest, EmailRequest, MessageResponse,
    SessionResponse,
};
use crate::domain::events::CatalogEvent;
use crate::models::User;
use crate::services::SignUpOutcome;

fn session_changed(state: &AppState, user: Option<&User>) {
    state.shared.publish(CatalogEvent::SessionChanged {
        user_id: user.map(|u| u.id.to_string()),
    });
}

/// `POST /api/auth/signup`
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SignUpOutcome>>), ApiError> {
    let email = validate_email(&req.email)?;
    let outcome = state.shared.auth.sign_up(email, &req.password).await?;
    if let SignUpOutcome::SignedIn { user } = &outcome {
        session_changed(&state, Some(user));
    }
    Ok((StatusCode::CREATED, Json(ApiResponse::success(outcome))))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let email = validate_email(&req.email)?;
    let user = state.shared.auth.sign_in(email, &req.password).await?;
    session_changed(&state, Some(&user));
    Ok(Json(ApiResponse::success(user)))
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.shared.auth.sign_out().await?;
    session_changed(&state, None);
    Ok(Json(ApiResponse::success(MessageResponse::new("Signed out"))))
}

/// `POST /api/auth/reset`
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validate_email(&req.email)?;
    state.shared.auth.reset_password(email).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password reset email sent",
    ))))
}

/// `GET /api/auth/me`
pub async fn me(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SessionResponse>> {
    Json(ApiResponse::success(SessionResponse {
        user: state.shared.auth.current_user(),
    }))
}
