//! Page-level controller tying the forms, the list view and notifications
//! to a single catalog adapter.
//!
//! [`Shell`] is an embeddable controller for an interactive front end. The
//! bundled CLI and HTTP API drive the forms and catalog directly and do not
//! construct it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{AnimeFilter, CatalogStats, ExportDocument, ViewMode};
use crate::constants::intervals::DELETE_CONFIRM_WINDOW;
use crate::domain::AnimeId;
use crate::form::{AnimeForm, LinkUploadForm, SubmitError};
use crate::models::{Anime, AnimePatch, User};
use crate::notify::Notifications;
use crate::services::CatalogStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    #[default]
    AnimeList,
    AddAnime,
    BulkUpload,
    Settings,
}

impl Page {
    pub const ALL: [Self; 4] = [
        Self::AnimeList,
        Self::AddAnime,
        Self::BulkUpload,
        Self::Settings,
    ];

    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::AnimeList => "anime-list",
            Self::AddAnime => "add-anime",
            Self::BulkUpload => "bulk-upload",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Page {
    type Err = String;

    /// Unknown slugs fall back to the list page.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::ALL
            .into_iter()
            .find(|p| p.slug() == s)
            .unwrap_or_default())
    }
}

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStep {
    /// First click: confirmation armed until the window closes.
    Armed,
    Deleted,
}

#[derive(Debug, Clone)]
struct PendingDelete {
    id: AnimeId,
    armed_at: Instant,
}

pub struct Shell {
    store: Arc<dyn CatalogStore>,
    page: Page,
    selected: Option<AnimeId>,
    anime_form: AnimeForm,
    link_form: LinkUploadForm,
    filter: AnimeFilter,
    view_mode: ViewMode,
    notifications: Notifications,
    pending_delete: Option<PendingDelete>,
    confirm_window: Duration,
    user: User,
}

impl Shell {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            page: Page::default(),
            selected: None,
            anime_form: AnimeForm::new(),
            link_form: LinkUploadForm::new(),
            filter: AnimeFilter::default(),
            view_mode: ViewMode::default(),
            notifications: Notifications::new(),
            pending_delete: None,
            confirm_window: DELETE_CONFIRM_WINDOW,
            user: User::guest(),
        }
    }

    #[must_use]
    pub const fn page(&self) -> Page {
        self.page
    }

    pub fn navigate(&mut self, page: Page) {
        debug!(from = %self.page, to = %page, "Navigate");
        self.page = page;
    }

    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// The guest identity cannot sign out; the request is only logged.
    pub fn sign_out(&self) {
        info!(user = %self.user.name, "Sign out requested for guest session");
    }

    #[must_use]
    pub const fn selected(&self) -> Option<&AnimeId> {
        self.selected.as_ref()
    }

    /// Expands `id`, or collapses it when it is already the expanded card.
    pub fn toggle_selected(&mut self, id: &AnimeId) {
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        } else {
            self.selected = Some(id.clone());
        }
    }

    pub const fn anime_form(&self) -> &AnimeForm {
        &self.anime_form
    }

    pub const fn anime_form_mut(&mut self) -> &mut AnimeForm {
        &mut self.anime_form
    }

    pub const fn link_form(&self) -> &LinkUploadForm {
        &self.link_form
    }

    pub const fn link_form_mut(&mut self) -> &mut LinkUploadForm {
        &mut self.link_form
    }

    pub const fn filter_mut(&mut self) -> &mut AnimeFilter {
        &mut self.filter
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    #[must_use]
    pub const fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub const fn notifications(&mut self) -> &mut Notifications {
        &mut self.notifications
    }

    /// Reloads the collection from the adapter. Failures become an error
    /// toast and the held collection stays as the adapter left it.
    pub async fn refresh(&mut self) -> Vec<Anime> {
        match self.store.fetch().await {
            Ok(anime) => anime,
            Err(e) => {
                self.notifications.error(e.to_string());
                self.store.snapshot().await
            }
        }
    }

    /// The held collection narrowed by the current filter.
    pub async fn visible_anime(&self) -> Vec<Anime> {
        let all = self.store.snapshot().await;
        self.filter.apply(&all).into_iter().cloned().collect()
    }

    pub async fn stats(&self) -> CatalogStats {
        CatalogStats::compute(&self.store.snapshot().await)
    }

    pub async fn submit_new_anime(&mut self) -> bool {
        match self.anime_form.submit(self.store.as_ref()).await {
            Ok(report) => {
                self.notifications.success(self.anime_form.success_message());
                let failed = report.failures().count();
                if failed > 0 {
                    self.notifications.warning(format!(
                        "{failed} episode, link or subtitle insert(s) failed and were skipped"
                    ));
                }
                self.anime_form.reset();
                self.navigate(Page::AnimeList);
                true
            }
            Err(e) => {
                self.notify_submit_error(&e);
                false
            }
        }
    }

    pub async fn submit_links(&mut self) -> bool {
        match self.link_form.submit(self.store.as_ref()).await {
            Ok(summary) => {
                self.notifications.success(summary.message);
                let failed = summary.report.failures().count();
                if failed > 0 {
                    self.notifications
                        .warning(format!("{failed} link or subtitle insert(s) failed"));
                }
                true
            }
            Err(e) => {
                self.notify_submit_error(&e);
                false
            }
        }
    }

    fn notify_submit_error(&mut self, err: &SubmitError) {
        self.notifications.error(err.to_string());
    }

    pub async fn update_anime(&mut self, id: &AnimeId, patch: AnimePatch) -> bool {
        match self.store.update(id, patch).await {
            Ok(()) => true,
            Err(e) => {
                self.notifications.error(e.to_string());
                false
            }
        }
    }

    pub async fn request_delete(&mut self, id: &AnimeId) -> DeleteStep {
        self.request_delete_at(id, Instant::now()).await
    }

    /// First call for an id arms the confirmation; a second call for the
    /// same id inside the window deletes it.
    pub async fn request_delete_at(&mut self, id: &AnimeId, now: Instant) -> DeleteStep {
        let confirmed = self.pending_delete.as_ref().is_some_and(|p| {
            &p.id == id && now.saturating_duration_since(p.armed_at) < self.confirm_window
        });

        if !confirmed {
            self.pending_delete = Some(PendingDelete {
                id: id.clone(),
                armed_at: now,
            });
            return DeleteStep::Armed;
        }

        self.pending_delete = None;
        if let Err(e) = self.store.delete(id).await {
            self.notifications.error(e.to_string());
        } else if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        DeleteStep::Deleted
    }

    pub async fn export(&mut self, dir: &Path) -> Option<PathBuf> {
        let doc = ExportDocument::new(self.store.snapshot().await);
        match doc.write_to_dir(dir, chrono::Local::now().date_naive()) {
            Ok(path) => {
                self.notifications.success("Data exported successfully!");
                Some(path)
            }
            Err(e) => {
                debug!(error = %e, "Export failed");
                self.notifications.error("Failed to export data");
                None
            }
        }
    }
}
