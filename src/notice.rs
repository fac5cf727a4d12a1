//! Transient notices (toasts) shown after a user action.
//!
//! DESIGN
//! ======
//! One slot per screen: a new notice replaces the previous one, and a notice
//! stops being visible once its TTL elapses. Time is passed in explicitly
//! (`*_at` variants) so expiry is testable without sleeping.

use std::time::{Duration, Instant};

use crate::config::DEFAULT_NOTICE_TTL_SECS;

#[cfg(test)]
#[path = "notice_test.rs"]
mod tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

impl NoticeKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub posted_at: Instant,
}

#[derive(Clone, Debug)]
pub struct NoticeBoard {
    ttl: Duration,
    current: Option<Notice>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_NOTICE_TTL_SECS))
    }
}

impl NoticeBoard {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn post(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.post_at(kind, message, Instant::now());
    }

    pub fn post_at(&mut self, kind: NoticeKind, message: impl Into<String>, now: Instant) {
        let message = message.into();
        match kind {
            NoticeKind::Error => tracing::warn!(%message, "error notice"),
            NoticeKind::Success | NoticeKind::Warning => tracing::debug!(kind = kind.label(), %message, "notice"),
        }
        self.current = Some(Notice { kind, message, posted_at: now });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.post(NoticeKind::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.post(NoticeKind::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.post(NoticeKind::Error, message);
    }

    /// Currently visible notice, if any.
    #[must_use]
    pub fn visible(&self) -> Option<&Notice> {
        self.visible_at(Instant::now())
    }

    #[must_use]
    pub fn visible_at(&self, now: Instant) -> Option<&Notice> {
        self.current
            .as_ref()
            .filter(|notice| now.saturating_duration_since(notice.posted_at) < self.ttl)
    }

    /// Most recent notice regardless of expiry.
    #[must_use]
    pub fn last(&self) -> Option<&Notice> {
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}
