//! Read-side views over the held collection: list filtering, settings
//! statistics and JSON export.

pub mod export;
pub mod filter;
pub mod stats;

pub use export::{ExportDocument, export_file_name};
pub use filter::{AnimeFilter, ViewMode, genre_choices};
pub use stats::CatalogStats;
