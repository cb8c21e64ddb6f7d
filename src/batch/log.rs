//! Operator-facing run log.

use std::collections::VecDeque;

use chrono::{DateTime, Local};

/// Number of entries the run keeps.
pub const LOG_CAPACITY: usize = 20;

/// Repository name used for entries about the run itself.
pub const SYSTEM_SOURCE: &str = "SYSTEM";

/// Icons used as log tags.
pub mod icons {
    pub const INFO: &str = "💡";
    pub const SUCCESS: &str = "✨";
    pub const WARNING: &str = "⚡";
    pub const ERROR: &str = "💥";
    pub const SCANNING: &str = "🔍";
    pub const PULL: &str = "⬇️";
    pub const CONFIG: &str = "⚙️";
    pub const REMOVE: &str = "🗑️";
    pub const COMMIT: &str = "💾";
    pub const PUSH: &str = "🚀";
    pub const COMPLETE: &str = "🎉";
}

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Default tag for entries of this level.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Info => icons::INFO,
            Self::Success => icons::SUCCESS,
            Self::Warning => icons::WARNING,
            Self::Error => icons::ERROR,
        }
    }
}

/// One immutable line of the run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    /// Repository name, or [`SYSTEM_SOURCE`].
    pub repository: String,
    pub message: String,
    pub tag: &'static str,
}

impl LogEntry {
    /// Creates an entry stamped with the current local time.
    pub fn new(level: LogLevel, repository: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            repository: repository.into(),
            message: message.into(),
            tag: level.tag(),
        }
    }

    pub fn info(repository: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, repository, message)
    }

    pub fn success(repository: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, repository, message)
    }

    pub fn warning(repository: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, repository, message)
    }

    pub fn error(repository: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, repository, message)
    }

    /// An info entry attributed to the run rather than a repository.
    pub fn system(message: impl Into<String>) -> Self {
        Self::info(SYSTEM_SOURCE, message)
    }

    /// Replaces the level's default tag.
    #[must_use]
    pub fn with_tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }
}

/// Bounded log that discards its oldest entries first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRing {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogRing {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl LogRing {
    /// Creates a ring holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The newest `n` entries, oldest first.
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn entry(n: usize) -> LogEntry {
        LogEntry::info("repo", format!("entry {n}"))
    }

    #[test]
    fn ring_discards_oldest() {
        let mut ring = LogRing::default();
        ring.extend((0..25).map(entry));

        assert_eq!(ring.len(), LOG_CAPACITY);
        assert_eq!(ring.iter().next().unwrap().message, "entry 5");
        assert_eq!(ring.iter().next_back().unwrap().message, "entry 24");
    }

    #[test]
    fn latest_returns_tail_in_order() {
        let mut ring = LogRing::default();
        ring.extend((0..5).map(entry));

        let tail: Vec<_> = ring.latest(2).map(|e| e.message.as_str()).collect();
        assert_eq!(tail, vec!["entry 3", "entry 4"]);
        assert_eq!(ring.latest(10).count(), 5);
    }

    #[test]
    fn tags_follow_level_unless_overridden() {
        assert_eq!(LogEntry::error("a", "boom").tag, icons::ERROR);
        assert_eq!(
            LogEntry::success("a", "pushed").with_tag(icons::PUSH).tag,
            icons::PUSH
        );
        assert_eq!(LogEntry::system("start").repository, SYSTEM_SOURCE);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn ring_never_exceeds_capacity(capacity in 0usize..40, pushes in 0usize..100) {
                let mut ring = LogRing::with_capacity(capacity);
                ring.extend((0..pushes).map(entry));

                prop_assert_eq!(ring.len(), pushes.min(capacity));
                let last = ring.iter().next_back().map(|newest| newest.message.clone());
                if let Some(last) = last {
                    prop_assert_eq!(last, format!("entry {}", pushes - 1));
                }
            }
        }
    }
}
