//! Transient notifications raised by the shell.
//!
//! Owned by [`crate::shell::Shell`]; an embedding front end reads the queue
//! with [`Notifications::active`] on each render.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::constants::intervals::NOTIFICATION_TTL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl fmt::Display for ToastLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
    #[serde(skip)]
    pub raised_at: Instant,
}

impl Toast {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.raised_at) >= ttl
    }
}

#[derive(Debug)]
pub struct Notifications {
    toasts: VecDeque<Toast>,
    ttl: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifications {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_ttl(NOTIFICATION_TTL)
    }

    #[must_use]
    pub const fn with_ttl(ttl: Duration) -> Self {
        Self {
            toasts: VecDeque::new(),
            ttl,
        }
    }

    pub fn push(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.push_at(level, message, Instant::now());
    }

    pub fn push_at(&mut self, level: ToastLevel, message: impl Into<String>, now: Instant) {
        let message = message.into();
        match level {
            ToastLevel::Error => error!(message = %message, "Notification"),
            ToastLevel::Warning => warn!(message = %message, "Notification"),
            ToastLevel::Success | ToastLevel::Info => {
                info!(level = %level, message = %message, "Notification");
            }
        }
        self.toasts.push_back(Toast {
            level,
            message,
            raised_at: now,
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(ToastLevel::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ToastLevel::Error, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(ToastLevel::Warning, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ToastLevel::Info, message);
    }

    /// Drops expired toasts and returns the rest, oldest first.
    pub fn active(&mut self, now: Instant) -> Vec<Toast> {
        let ttl = self.ttl;
        self.toasts.retain(|t| !t.is_expired(now, ttl));
        self.toasts.iter().cloned().collect()
    }

    /// Most recent toast regardless of age.
    #[must_use]
    pub fn latest(&self) -> Option<&Toast> {
        self.toasts.back()
    }

    pub fn dismiss_all(&mut self) {
        self.toasts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toasts_expire_after_ttl() {
        let start = Instant::now();
        let mut notes = Notifications::new();
        notes.push_at(ToastLevel::Success, "saved", start);
        notes.push_at(ToastLevel::Error, "failed", start + Duration::from_secs(2));

        let active = notes.active(start + Duration::from_millis(2500));
        assert_eq!(active.len(), 2);

        let active = notes.active(start + Duration::from_secs(3));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, "failed");

        assert!(notes.active(start + Duration::from_secs(6)).is_empty());
    }

    #[test]
    fn latest_and_dismiss() {
        let mut notes = Notifications::default();
        notes.warning("partial");
        notes.info("hello");
        assert_eq!(notes.latest().map(|t| t.level), Some(ToastLevel::Info));
        notes.dismiss_all();
        assert!(notes.latest().is_none());
    }
}
