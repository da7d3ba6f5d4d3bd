//! CLI module - Command-line interface for anishelf
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::catalog::ViewMode;
use crate::domain::AnimeStatus;

/// anishelf - Anime catalog manager
/// Keeps anime, episodes, streaming links and subtitles in a local store or
/// a hosted backend
#[derive(Parser)]
#[command(name = "anishelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List anime in the collection
    #[command(alias = "ls", alias = "l")]
    List {
        /// Case-insensitive title search
        #[arg(long, short)]
        search: Option<String>,
        /// Only anime with this genre
        #[arg(long, short)]
        genre: Option<String>,
        /// Only anime with this status
        #[arg(long)]
        status: Option<AnimeStatus>,
        /// Minimum rating
        #[arg(long)]
        min_rating: Option<String>,
        /// Output layout
        #[arg(long, default_value = "grid")]
        view: ViewMode,
    },

    /// Show one anime with its episodes and links
    #[command(alias = "i", alias = "info")]
    Show {
        /// Anime ID
        id: String,
    },

    /// Add an anime from a JSON draft file
    #[command(alias = "a")]
    Add {
        /// Path to the draft (same shape as the API payload)
        file: PathBuf,
    },

    /// Change top-level fields of an anime
    Update {
        /// Anime ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        synopsis: Option<String>,
        #[arg(long)]
        release_year: Option<i32>,
        #[arg(long)]
        episode_count: Option<u32>,
        #[arg(long)]
        studio: Option<String>,
        #[arg(long)]
        rating: Option<f64>,
        #[arg(long)]
        status: Option<AnimeStatus>,
        #[arg(long)]
        thumbnail: Option<String>,
        /// Replaces the genre list; repeat for several genres
        #[arg(long = "genre")]
        genres: Vec<String>,
    },

    /// Remove an anime
    #[command(alias = "rm", alias = "r")]
    Remove {
        /// Anime ID
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Add links to an episode of an anime
    Links {
        /// Anime ID
        anime_id: String,
        /// Episode number; the first episode when omitted
        episode_number: Option<u32>,
        /// Link as `platform=url`; repeat for several links
        #[arg(long = "link", required = true)]
        links: Vec<String>,
        /// Episode language
        #[arg(long, default_value = crate::constants::DEFAULT_EPISODE_LANGUAGE)]
        language: String,
        /// Quality label applied to every link
        #[arg(long)]
        quality: Option<String>,
    },

    /// Show collection statistics
    Stats,

    /// Export the collection as JSON
    Export {
        /// Target directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Create an account
    Signup {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign in
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out
    Logout,

    /// Send a password reset email
    ResetPassword { email: String },

    /// Start the HTTP API server
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
