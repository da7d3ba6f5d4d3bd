use super::ApiError;
use crate::domain::AnimeId;

pub fn validate_anime_id(id: &str) -> Result<AnimeId, ApiError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Anime ID cannot be empty"));
    }
    Ok(AnimeId::new(trimmed))
}

pub fn validate_episode_number(episode: u32) -> Result<u32, ApiError> {
    if episode == 0 {
        return Err(ApiError::validation(format!(
            "Invalid episode number: {episode}. Episode must be a positive integer"
        )));
    }
    Ok(episode)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Email cannot be empty"));
    }
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(trimmed),
        _ => Err(ApiError::validation(format!("Invalid email address: {trimmed}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_anime_id() {
        assert_eq!(validate_anime_id(" a1 ").unwrap(), AnimeId::new("a1"));
        assert!(validate_anime_id("").is_err());
        assert!(validate_anime_id("   ").is_err());
    }

    #[test]
    fn test_validate_episode_number() {
        assert!(validate_episode_number(1).is_ok());
        assert!(validate_episode_number(0).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(" a@b.co ").unwrap(), "a@b.co");
        assert!(validate_email("").is_err());
        assert!(validate_email("nobody").is_err());
        assert!(validate_email("@b.co").is_err());
    }
}
