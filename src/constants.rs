pub const SUPPORTED_PLATFORMS: &[&str] = &[
    "WatchDT",
    "Mega",
    "Mediafire",
    "Google Drive",
    "Terabox",
    "Direct Download",
];

/// Streaming services offered as quick picks next to the hosting platforms.
pub const COMMON_PLATFORMS: &[&str] = &[
    "YouTube",
    "Dailymotion",
    "Vimeo",
    "Netflix",
    "Crunchyroll",
    "HiDive",
];

pub const EPISODE_LANGUAGES: &[&str] = &[
    "Hindi",
    "English",
    "Japanese",
    "Korean",
    "Chinese (Simplified)",
    "Chinese (Traditional)",
    "Spanish",
    "French",
    "German",
    "Portuguese",
    "Russian",
    "Arabic",
];

pub const SUBTITLE_LANGUAGES: &[&str] = &[
    "English",
    "Hindi",
    "Japanese",
    "Korean",
    "Chinese (Simplified)",
    "Chinese (Traditional)",
    "Spanish",
    "French",
    "German",
    "Portuguese",
    "Russian",
    "Arabic",
];

pub const SUBTITLE_FORMATS: &[&str] = &["SRT", "VTT", "ASS", "SSA", "SUB"];

pub const ANIME_GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Comedy",
    "Drama",
    "Fantasy",
    "Horror",
    "Romance",
    "Sci-Fi",
    "Slice of Life",
    "Sports",
    "Supernatural",
    "Thriller",
    "Mystery",
    "Historical",
    "Mecha",
    "School",
    "Military",
    "Music",
    "Psychological",
    "Ecchi",
    "Shounen",
    "Shoujo",
    "Seinen",
    "Josei",
    "Isekai",
    "Harem",
    "Reverse Harem",
    "Yaoi",
    "Yuri",
];

pub const DEFAULT_EPISODE_LANGUAGE: &str = "Japanese";

pub const DEFAULT_SEASON: u32 = 1;

pub const MAX_SEASON: u32 = 20;

/// Minimum-rating presets offered by the list filter.
pub const RATING_FILTER_PRESETS: &[u8] = &[8, 7, 6, 5];

pub mod limits {

    pub const MIN_EPISODE_COUNT: u32 = 1;

    pub const MAX_EPISODE_COUNT: u32 = 1000;

    pub const MAX_LINKS_PER_EPISODE: usize = 10;

    pub const MAX_SUBTITLES_PER_LINK: usize = 5;

    pub const MIN_PASSWORD_LENGTH: usize = 6;

    /// Non-URL strings at or below this length are still being typed.
    pub const URL_WARNING_MIN_LENGTH: usize = 10;

    pub const MIN_RELEASE_YEAR: i32 = 1900;

    pub const MAX_RATING: f64 = 10.0;
}

pub mod storage_keys {

    pub const USERS: &str = "anime_app_users";

    pub const SESSION: &str = "anime_app_user";

    pub const REMOTE_SESSION: &str = "remote_session";

    pub const COLLECTION_PREFIX: &str = "anime_data_";
}

pub mod intervals {
    use std::time::Duration;

    pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

    pub const DELETE_CONFIRM_WINDOW: Duration = Duration::from_secs(3);
}

#[must_use]
pub fn seasons() -> impl Iterator<Item = (u32, String)> {
    (DEFAULT_SEASON..=MAX_SEASON).map(|n| (n, format!("Season {n}")))
}
