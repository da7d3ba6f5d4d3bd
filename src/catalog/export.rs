use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::Anime;

/// Top-level shape of an exported collection: `{ "anime": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub anime: Vec<Anime>,
}

impl ExportDocument {
    #[must_use]
    pub fn new(anime: Vec<Anime>) -> Self {
        Self { anime }
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the document into `dir` under the dated export name and
    /// returns the full path.
    pub fn write_to_dir(&self, dir: &Path, date: NaiveDate) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(export_file_name(date));
        let json = self.to_pretty_json().context("Failed to serialize export")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), count = self.anime.len(), "Exported collection");
        Ok(path)
    }
}

#[must_use]
pub fn export_file_name(date: NaiveDate) -> String {
    format!("anime_data_{}.json", date.format("%Y-%m-%d"))
}
