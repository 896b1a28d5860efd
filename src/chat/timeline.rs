use super::entry::{EntryId, EntryStatus, MessageEntry};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Change notification published after every timeline update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimelineSignal {
    /// Bumped on every update.
    pub revision: u64,
    /// Bumped only when content grew; views scroll to the latest entry on change.
    pub scroll_generation: u64,
}

struct Inner {
    entries: Mutex<Vec<MessageEntry>>,
    signal: watch::Sender<TimelineSignal>,
}

/// Ordered, insertion-order list of chat entries shared by the chat components.
///
/// Every mutation is a functional update over the previous entries, applied
/// under one lock, so concurrent writers never work from stale snapshots.
#[derive(Clone)]
pub struct ChatTimeline {
    inner: Arc<Inner>,
}

impl Default for ChatTimeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatTimeline {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(TimelineSignal::default());
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(Vec::new()),
                signal,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MessageEntry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(Vec<MessageEntry>) -> Vec<MessageEntry>,
    {
        let grew = {
            let mut entries = self.lock();
            let before = content_size(&entries);
            *entries = f(std::mem::take(&mut *entries));
            debug_assert!(
                invariants_hold(&entries),
                "timeline holds more than one pending or streaming entry"
            );
            let after = content_size(&entries);
            after.0 > before.0 || after.1 > before.1
        };

        self.inner.signal.send_modify(|signal| {
            signal.revision += 1;
            if grew {
                signal.scroll_generation += 1;
            }
        });
    }

    pub fn replace(&self, entries: Vec<MessageEntry>) {
        self.update(|_| entries);
    }

    pub fn snapshot(&self) -> Vec<MessageEntry> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimelineSignal> {
        self.inner.signal.subscribe()
    }
}

fn content_size(entries: &[MessageEntry]) -> (usize, usize) {
    let chars = entries.iter().map(|e| e.text.chars().count()).sum();
    (entries.len(), chars)
}

/// At most one pending and at most one streaming entry.
pub fn invariants_hold(entries: &[MessageEntry]) -> bool {
    let count = |status| entries.iter().filter(|e| e.status == status).count();
    count(EntryStatus::Pending) <= 1 && count(EntryStatus::Streaming) <= 1
}

pub fn appended(
    mut entries: Vec<MessageEntry>,
    new: impl IntoIterator<Item = MessageEntry>,
) -> Vec<MessageEntry> {
    entries.extend(new);
    entries
}

pub fn without_pending(mut entries: Vec<MessageEntry>) -> Vec<MessageEntry> {
    entries.retain(|e| e.status != EntryStatus::Pending);
    entries
}

/// Rewrites the text of `id` only while it is still in `expected` status.
pub fn with_text_if(
    mut entries: Vec<MessageEntry>,
    id: EntryId,
    expected: EntryStatus,
    text: &str,
) -> Vec<MessageEntry> {
    if let Some(entry) = entries
        .iter_mut()
        .find(|e| e.id == id && e.status == expected)
    {
        entry.text.clear();
        entry.text.push_str(text);
    }
    entries
}

/// Settles `id` to `text` with final status, whatever it showed before.
pub fn finalized(mut entries: Vec<MessageEntry>, id: EntryId, text: &str) -> Vec<MessageEntry> {
    if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
        entry.text.clear();
        entry.text.push_str(text);
        entry.status = EntryStatus::Final;
    }
    entries
}
