use serde::{Deserialize, Serialize};

use crate::models::{Anime, User};
use crate::services::CreateReport;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// List-page row: the anime plus figures the cards show.
#[derive(Debug, Serialize)]
pub struct AnimeSummaryDto {
    #[serde(flatten)]
    pub anime: Anime,
    pub total_links: usize,
}

impl From<Anime> for AnimeSummaryDto {
    fn from(anime: Anime) -> Self {
        Self {
            total_links: anime.total_links(),
            anime,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateAnimeResponse {
    pub message: String,
    pub report: CreateReport,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
