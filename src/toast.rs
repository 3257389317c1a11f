//! In-app transient messages.
//!
//! The second notification channel: short messages shown in the toast strip
//! for a few seconds.  Always available, independent of desktop alerts.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long a toast stays on screen.
pub const TOAST_LIFETIME: Duration = Duration::from_secs(4);

/// Only the newest few toasts are kept.
const MAX_TOASTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub text: String,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct Toasts {
    queue: VecDeque<Toast>,
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: ToastLevel, text: impl Into<String>) {
        self.push_at(level, text, Instant::now());
    }

    pub fn push_at(&mut self, level: ToastLevel, text: impl Into<String>, now: Instant) {
        if self.queue.len() == MAX_TOASTS {
            self.queue.pop_front();
        }
        self.queue.push_back(Toast {
            level,
            text: text.into(),
            expires_at: now + TOAST_LIFETIME,
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(ToastLevel::Info, text);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(ToastLevel::Success, text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(ToastLevel::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(ToastLevel::Error, text);
    }

    /// Drop toasts whose lifetime has passed.
    pub fn expire(&mut self, now: Instant) {
        self.queue.retain(|t| t.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toasts_expire_after_their_lifetime() {
        let mut toasts = Toasts::new();
        let t0 = Instant::now();
        toasts.push_at(ToastLevel::Info, "hello", t0);

        toasts.expire(t0 + Duration::from_secs(1));
        assert_eq!(toasts.len(), 1);

        toasts.expire(t0 + TOAST_LIFETIME);
        assert!(toasts.is_empty());
    }

    #[test]
    fn only_the_newest_toasts_are_kept() {
        let mut toasts = Toasts::new();
        for i in 0..(MAX_TOASTS + 2) {
            toasts.info(format!("msg {i}"));
        }
        assert_eq!(toasts.len(), MAX_TOASTS);
        assert_eq!(toasts.iter().next().unwrap().text, "msg 2");
    }
}
