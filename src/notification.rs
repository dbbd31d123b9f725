//! Transient error/success notices.
//!
//! There is one slot per kind. Raising a notice replaces whatever was in its
//! slot; the other slot is untouched. Notices expire after a fixed TTL, which
//! the owner enforces by calling [`Notifications::expire`] with the current
//! time (the session does this from `tick`).

use crate::config::DEFAULT_NOTIFICATION_TTL;
use serde::Serialize;
use std::time::{Duration, Instant};

/// A visible notice and the moment it was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub raised_at: Instant,
}

/// Which slot a notice lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Success,
}

#[derive(Debug, Clone)]
pub struct Notifications {
    error: Option<Notice>,
    success: Option<Notice>,
    ttl: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Self {
            error: None,
            success: None,
            ttl,
        }
    }

    pub fn raise(&mut self, severity: Severity, message: impl Into<String>, now: Instant) {
        let notice = Some(Notice {
            message: message.into(),
            raised_at: now,
        });
        match severity {
            Severity::Error => self.error = notice,
            Severity::Success => self.success = notice,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_ref().map(|n| n.message.as_str())
    }

    pub fn success(&self) -> Option<&str> {
        self.success.as_ref().map(|n| n.message.as_str())
    }

    pub fn dismiss(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error = None,
            Severity::Success => self.success = None,
        }
    }

    pub fn clear(&mut self) {
        self.error = None;
        self.success = None;
    }

    /// Drop every notice that has been visible for at least the TTL.
    ///
    /// Returns the severities that were dismissed.
    pub fn expire(&mut self, now: Instant) -> Vec<Severity> {
        let ttl = self.ttl;
        let stale = |slot: &Option<Notice>| {
            slot.as_ref()
                .is_some_and(|n| now.saturating_duration_since(n.raised_at) >= ttl)
        };

        let mut dismissed = Vec::new();
        if stale(&self.error) {
            self.error = None;
            dismissed.push(Severity::Error);
        }
        if stale(&self.success) {
            self.success = None;
            dismissed.push(Severity::Success);
        }
        dismissed
    }

    /// Earliest instant at which a visible notice will expire.
    pub fn next_expiry(&self) -> Option<Instant> {
        [&self.error, &self.success]
            .into_iter()
            .flatten()
            .map(|n| n.raised_at + self.ttl)
            .min()
    }
}
