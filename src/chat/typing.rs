use super::entry::{EntryId, EntryStatus};
use super::timeline::{finalized, with_text_if, ChatTimeline};
use crate::config::TypingConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Writes the full reply into the entry exactly once, whichever timer gets here first.
struct Finalizer {
    entry_id: EntryId,
    full_text: String,
    finalized: AtomicBool,
    timeline: ChatTimeline,
    done: watch::Sender<bool>,
}

impl Finalizer {
    fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }

    fn finalize(&self, by: &'static str) -> bool {
        if self
            .finalized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::trace!(entry_id = %self.entry_id, by = by, "Reveal already finalized");
            return false;
        }

        tracing::debug!(entry_id = %self.entry_id, by = by, "Reveal finalized");
        self.timeline
            .update(|prev| finalized(prev, self.entry_id, &self.full_text));
        self.done.send_replace(true);
        true
    }
}

struct ActiveReveal {
    finalizer: Arc<Finalizer>,
    ticker: AbortHandle,
    safety: AbortHandle,
}

impl ActiveReveal {
    fn cancel(self) {
        self.ticker.abort();
        self.safety.abort();
        self.finalizer.finalize("superseded");
    }
}

/// Completion handle for one reveal.
pub struct RevealHandle {
    entry_id: EntryId,
    done: watch::Receiver<bool>,
}

impl RevealHandle {
    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    pub fn is_finished(&self) -> bool {
        *self.done.borrow()
    }

    /// Resolves once the entry holds its full text.
    pub async fn finished(mut self) {
        // The sender lives in the finalizer, which both timers keep alive until it fires.
        let _ = self.done.wait_for(|done| *done).await;
    }
}

/// Progressive reveal of finalized bot replies.
///
/// Each reveal runs a ticker that exposes a few characters per tick and an
/// independent safety timer that forces the full text after a fixed ceiling.
/// Both go through one compare-and-swap guard, so the entry is finalized once.
pub struct TypingRenderer {
    timeline: ChatTimeline,
    pacing: TypingConfig,
    active: Mutex<Option<ActiveReveal>>,
}

impl TypingRenderer {
    pub fn new(timeline: ChatTimeline, pacing: TypingConfig) -> Self {
        Self {
            timeline,
            pacing,
            active: Mutex::new(None),
        }
    }

    /// Settles any reveal in progress to its full text and stops its timers.
    pub fn cancel_active(&self) {
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            tracing::debug!(entry_id = %previous.finalizer.entry_id, "Cancelling reveal in progress");
            previous.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|reveal| !reveal.finalizer.is_finalized())
    }

    /// Start revealing `text` into the streaming entry `entry_id`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, entry_id: EntryId, text: impl Into<String>) -> RevealHandle {
        self.cancel_active();

        let full_text = text.into();
        let chars: Vec<char> = full_text.chars().collect();
        let tick = self.pacing.tick_interval(chars.len());
        let chunk = self.pacing.chunk_size(chars.len());
        let ceiling = self.pacing.safety_ceiling();

        let (done_tx, done_rx) = watch::channel(false);
        let finalizer = Arc::new(Finalizer {
            entry_id,
            full_text,
            finalized: AtomicBool::new(false),
            timeline: self.timeline.clone(),
            done: done_tx,
        });

        tracing::debug!(
            entry_id = %entry_id,
            chars = chars.len(),
            tick_ms = tick.as_millis() as u64,
            chunk = chunk,
            "Starting reveal"
        );

        let safety = {
            let finalizer = Arc::clone(&finalizer);
            tokio::spawn(async move {
                tokio::time::sleep(ceiling).await;
                if finalizer.finalize("safety timer") {
                    tracing::warn!(entry_id = %finalizer.entry_id, "Reveal forced to completion");
                }
            })
        };
        let safety_abort = safety.abort_handle();

        let ticker = {
            let finalizer = Arc::clone(&finalizer);
            let timeline = self.timeline.clone();
            let safety_abort = safety_abort.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tick);
                interval.tick().await;

                let mut revealed = 0;
                while revealed < chars.len() {
                    interval.tick().await;
                    if finalizer.is_finalized() {
                        return;
                    }
                    revealed = (revealed + chunk).min(chars.len());
                    if revealed < chars.len() {
                        let partial: String = chars[..revealed].iter().collect();
                        timeline.update(|prev| {
                            with_text_if(prev, finalizer.entry_id, EntryStatus::Streaming, &partial)
                        });
                    }
                }

                if finalizer.finalize("ticker") {
                    safety_abort.abort();
                }
            })
        };

        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActiveReveal {
            finalizer,
            ticker: ticker.abort_handle(),
            safety: safety_abort,
        });

        RevealHandle {
            entry_id,
            done: done_rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::entry::MessageEntry;
    use crate::chat::timeline::appended;
    use std::time::Duration;
    use tokio::time::Instant;

    fn streaming_entry(timeline: &ChatTimeline) -> EntryId {
        let entry = MessageEntry::streaming();
        let id = entry.id;
        timeline.update(|prev| appended(prev, [entry]));
        id
    }

    fn text_of(timeline: &ChatTimeline, id: EntryId) -> (String, EntryStatus) {
        let entry = timeline
            .snapshot()
            .into_iter()
            .find(|e| e.id == id)
            .unwrap();
        (entry.text, entry.status)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_completes_with_full_text() {
        let timeline = ChatTimeline::new();
        let renderer = TypingRenderer::new(timeline.clone(), TypingConfig::default());
        let id = streaming_entry(&timeline);

        let handle = renderer.start(id, "Hello");
        assert!(!handle.is_finished());
        handle.finished().await;

        assert_eq!(text_of(&timeline, id), ("Hello".to_string(), EntryStatus::Final));
        assert!(!renderer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_is_progressive() {
        let timeline = ChatTimeline::new();
        let renderer = TypingRenderer::new(timeline.clone(), TypingConfig::default());
        let id = streaming_entry(&timeline);

        // 20 chars: 2000ms / 20 = 100ms, clamped to 30ms per char.
        let _handle = renderer.start(id, "abcdefghijklmnopqrst");
        tokio::time::sleep(Duration::from_millis(95)).await;

        let (text, status) = text_of(&timeline, id);
        assert_eq!(status, EntryStatus::Streaming);
        assert_eq!(text, "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_reply_reveals_in_chunks() {
        let timeline = ChatTimeline::new();
        let renderer = TypingRenderer::new(timeline.clone(), TypingConfig::default());
        let id = streaming_entry(&timeline);

        let long = "x".repeat(600);
        let start = Instant::now();
        let handle = renderer.start(id, long.clone());
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(text_of(&timeline, id).0.len(), 3);

        handle.finished().await;
        // 200 ticks of 10ms, well under the safety ceiling.
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(text_of(&timeline, id).0, long);
    }

    #[tokio::test(start_paused = true)]
    async fn test_safety_timer_completes_stalled_reveal() {
        let timeline = ChatTimeline::new();
        let stalled = TypingConfig {
            min_interval_ms: 3_600_000,
            max_interval_ms: 3_600_000,
            ..TypingConfig::default()
        };
        let renderer = TypingRenderer::new(timeline.clone(), stalled);
        let id = streaming_entry(&timeline);

        let start = Instant::now();
        let handle = renderer.start(id, "Your room is ready.");
        handle.finished().await;

        assert!(start.elapsed() <= Duration::from_millis(10_010));
        assert_eq!(
            text_of(&timeline, id),
            ("Your room is ready.".to_string(), EntryStatus::Final)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_reveal_cancels_previous() {
        let timeline = ChatTimeline::new();
        let renderer = TypingRenderer::new(timeline.clone(), TypingConfig::default());

        let first = streaming_entry(&timeline);
        let first_handle = renderer.start(first, "first reply that is still typing");
        tokio::time::sleep(Duration::from_millis(40)).await;

        // The previous entry is settled before the next streaming entry appears.
        renderer.cancel_active();
        assert!(first_handle.is_finished());
        let second = streaming_entry(&timeline);
        let second_handle = renderer.start(second, "second");
        second_handle.finished().await;

        // Let any stray timers of the first reveal run out.
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(
            text_of(&timeline, first),
            ("first reply that is still typing".to_string(), EntryStatus::Final)
        );
        assert_eq!(text_of(&timeline, second), ("second".to_string(), EntryStatus::Final));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_happens_once() {
        let timeline = ChatTimeline::new();
        let id = streaming_entry(&timeline);
        let (done, _rx) = watch::channel(false);
        let finalizer = Finalizer {
            entry_id: id,
            full_text: "done".to_string(),
            finalized: AtomicBool::new(false),
            timeline: timeline.clone(),
            done,
        };

        let rx = timeline.subscribe();
        let before = rx.borrow().revision;
        assert!(finalizer.finalize("ticker"));
        assert!(!finalizer.finalize("safety timer"));
        assert_eq!(rx.borrow().revision, before + 1);
        assert_eq!(text_of(&timeline, id), ("done".to_string(), EntryStatus::Final));
    }
}
