//! Domain types for the catalog with strong typing.
//!
//! Identifiers are opaque strings (the hosted backend hands out UUIDs, the
//! local store generates its own), wrapped in newtypes so an episode id can
//! never be passed where an anime id is expected.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Unique identifier for an anime record.
    ///
    /// ```rust
    /// use anishelf::domain::AnimeId;
    ///
    /// let id = AnimeId::new("a1");
    /// assert_eq!(id.as_str(), "a1");
    /// assert_eq!(id.to_string(), "a1");
    /// ```
    AnimeId
);
string_id!(
    /// Unique identifier for an episode.
    EpisodeId
);
string_id!(
    /// Unique identifier for a streaming/download link.
    LinkId
);
string_id!(
    /// Unique identifier for a subtitle track.
    SubtitleId
);
string_id!(
    /// Unique identifier for a user account.
    UserId
);

/// Airing status of an anime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimeStatus {
    Ongoing,
    Completed,
    #[default]
    Upcoming,
}

impl AnimeStatus {
    pub const ALL: [Self; 3] = [Self::Ongoing, Self::Completed, Self::Upcoming];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Upcoming => "upcoming",
        }
    }

    /// Capitalised label used for badges.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ongoing => "Ongoing",
            Self::Completed => "Completed",
            Self::Upcoming => "Upcoming",
        }
    }
}

impl fmt::Display for AnimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            "upcoming" => Ok(Self::Upcoming),
            other => Err(format!(
                "Invalid status: {other}. Expected ongoing, completed or upcoming"
            )),
        }
    }
}

/// Which persistence adapter backs the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}
