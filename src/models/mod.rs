pub mod anime;
pub mod user;

pub use anime::{
    Anime, AnimePatch, Episode, Link, NewAnime, NewEpisode, NewLink, NewSubtitle, Subtitle,
};
pub use user::{StoredAccount, User};
