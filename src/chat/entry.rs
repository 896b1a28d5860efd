use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a timeline entry, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

impl EntryId {
    fn next() -> Self {
        Self(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Bot placeholder shown while a reply is awaited.
    Pending,
    /// Bot reply being revealed.
    Streaming,
    Final,
    Error,
}

/// One chat bubble.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEntry {
    pub id: EntryId,
    pub sender: Sender,
    pub text: String,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
}

impl MessageEntry {
    pub fn new(sender: Sender, text: impl Into<String>, status: EntryStatus) -> Self {
        Self {
            id: EntryId::next(),
            sender,
            text: text.into(),
            status,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text, EntryStatus::Final)
    }

    pub fn pending(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text, EntryStatus::Pending)
    }

    pub fn streaming() -> Self {
        Self::new(Sender::Bot, String::new(), EntryStatus::Streaming)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text, EntryStatus::Error)
    }
}
