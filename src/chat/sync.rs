use super::entry::{EntryId, EntryStatus, MessageEntry, Sender};
use super::fallback::failure_message;
use super::timeline::{appended, with_text_if, without_pending, ChatTimeline};
use super::typing::{RevealHandle, TypingRenderer};
use crate::api::utils::with_deadline;
use crate::api::{ReplyBundle, SessionApi, NO_RESPONSE};
use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::session::SessionStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

const PLACEHOLDER_FRAMES: [&str; 4] = ["Thinking", "Thinking.", "Thinking..", "Thinking..."];

/// Where the send lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Validating,
    CreatingSession,
    Sending,
    AwaitingReply,
    Completed,
    Failed,
}

impl SyncState {
    fn in_flight(self) -> bool {
        matches!(
            self,
            Self::Validating | Self::CreatingSession | Self::Sending | Self::AwaitingReply
        )
    }
}

/// What happened to one `send_message` call.
pub enum SendOutcome {
    /// Blank input, nothing was sent.
    Ignored,
    /// Another send is still in flight; this one was dropped.
    Busy,
    /// The reply is being revealed into the timeline.
    Delivered(RevealHandle),
    /// The send failed and an error entry was shown in its place.
    Failed(ChatError),
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub send_timeout: Duration,
    pub create_timeout: Duration,
    pub placeholder_interval: Duration,
    pub session_title: String,
}

impl From<&ChatConfig> for SyncSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            send_timeout: config.send_timeout(),
            create_timeout: config.history_timeout(),
            placeholder_interval: config.placeholder_interval(),
            session_title: config.default_session_title.clone(),
        }
    }
}

/// Marks a send as in flight; resets the state machine if the send future is dropped early.
struct InFlight<'a> {
    state: &'a Mutex<SyncState>,
    timeline: &'a ChatTimeline,
    settled: bool,
}

impl InFlight<'_> {
    fn transition(&self, next: SyncState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(from = ?*state, to = ?next, "Send state transition");
        *state = next;
    }

    fn settle(mut self, terminal: SyncState) {
        self.transition(terminal);
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Send abandoned before completion");
            self.timeline.update(without_pending);
            self.transition(SyncState::Idle);
        }
    }
}

/// Drives one user message from input to a terminal timeline entry.
pub struct MessageSynchronizer<A: SessionApi> {
    api: Arc<A>,
    store: Arc<Mutex<SessionStore>>,
    timeline: ChatTimeline,
    renderer: Arc<TypingRenderer>,
    settings: SyncSettings,
    state: Mutex<SyncState>,
}

impl<A: SessionApi> MessageSynchronizer<A> {
    pub fn new(
        api: Arc<A>,
        store: Arc<Mutex<SessionStore>>,
        timeline: ChatTimeline,
        renderer: Arc<TypingRenderer>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            api,
            store,
            timeline,
            renderer,
            settings,
            state: Mutex::new(SyncState::Idle),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True from validation until the reply (or failure) lands in the timeline.
    pub fn is_busy(&self) -> bool {
        self.state().in_flight()
    }

    fn store(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the state machine, or `None` while another send is in flight.
    fn begin(&self) -> Option<InFlight<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.in_flight() {
            tracing::debug!(state = ?*state, "Send rejected, previous send still in flight");
            return None;
        }
        *state = SyncState::Validating;
        Some(InFlight {
            state: &self.state,
            timeline: &self.timeline,
            settled: false,
        })
    }

    pub async fn send_message(&self, input: &str) -> SendOutcome {
        let text = input.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring blank input");
            return SendOutcome::Ignored;
        }

        let Some(flight) = self.begin() else {
            return SendOutcome::Busy;
        };

        let session_id = match self.resolve_session(&flight).await {
            Ok(id) => id,
            Err(error) => {
                tracing::error!(error = %error, "Could not obtain a chat session");
                let message = failure_message(&error, input);
                self.timeline.update(|prev| {
                    appended(prev, [MessageEntry::user(text), MessageEntry::error(message)])
                });
                flight.settle(SyncState::Failed);
                return SendOutcome::Failed(error);
            }
        };

        flight.transition(SyncState::Sending);
        let placeholder = MessageEntry::pending(PLACEHOLDER_FRAMES[PLACEHOLDER_FRAMES.len() - 1]);
        let placeholder_id = placeholder.id;
        self.timeline
            .update(|prev| appended(prev, [MessageEntry::user(text), placeholder]));

        flight.transition(SyncState::AwaitingReply);
        let started = Instant::now();
        let result = self.await_reply(session_id, text, placeholder_id).await;
        tracing::info!(
            session_id = session_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Reply round-trip finished"
        );

        let reply = match result {
            Ok(bundle) => bundle,
            Err(ChatError::Parse(detail)) => {
                tracing::warn!(detail = %detail, "Unrecognized reply body");
                ReplyBundle::Empty
            }
            Err(error) => {
                tracing::error!(session_id = session_id, error = %error, "Send failed");
                let message = failure_message(&error, input);
                self.timeline.update(|prev| {
                    appended(without_pending(prev), [MessageEntry::error(message)])
                });
                flight.settle(SyncState::Failed);
                return SendOutcome::Failed(error);
            }
        };

        let handle = self.reveal(reply.display_text());
        flight.settle(SyncState::Completed);
        SendOutcome::Delivered(handle)
    }

    /// Current session id, creating a session when there is no usable one.
    async fn resolve_session(&self, flight: &InFlight<'_>) -> Result<u64> {
        let current = {
            let mut store = self.store();
            match store.current().map(|s| (s.valid_id(), s.id.clone())) {
                Some((Some(id), _)) => Some(id),
                Some((None, raw)) => {
                    tracing::warn!(raw_id = ?raw, "Discarding session with invalid id");
                    store.clear_current();
                    None
                }
                None => None,
            }
        };
        if let Some(id) = current {
            return Ok(id);
        }

        flight.transition(SyncState::CreatingSession);
        let session = with_deadline(
            "session creation",
            self.settings.create_timeout,
            self.api.create_session(&self.settings.session_title),
        )
        .await?;

        let id = session.valid_id().ok_or_else(|| {
            ChatError::Validation(format!(
                "backend created a session without a usable id: {:?}",
                session.id
            ))
        })?;
        tracing::info!(session_id = id, "Created chat session");

        let mut store = self.store();
        store.set_current(session.clone());
        store.append_session(session);
        Ok(id)
    }

    async fn await_reply(&self, session_id: u64, text: &str, placeholder: EntryId) -> Result<ReplyBundle> {
        let post = with_deadline(
            "message send",
            self.settings.send_timeout,
            self.api.post_message(session_id, text, Sender::User),
        );
        tokio::pin!(post);

        let mut dots = tokio::time::interval(self.settings.placeholder_interval);
        dots.tick().await;
        let mut frame = 0;

        loop {
            tokio::select! {
                result = &mut post => return result,
                _ = dots.tick() => {
                    let label = PLACEHOLDER_FRAMES[frame % PLACEHOLDER_FRAMES.len()];
                    frame += 1;
                    self.timeline
                        .update(|prev| with_text_if(prev, placeholder, EntryStatus::Pending, label));
                }
            }
        }
    }

    /// Swaps the placeholder for a streaming entry in one update and starts the reveal.
    fn reveal(&self, text: &str) -> RevealHandle {
        self.renderer.cancel_active();

        let entry = MessageEntry::streaming();
        let entry_id = entry.id;
        self.timeline
            .update(|prev| appended(without_pending(prev), [entry]));

        self.renderer.start(entry_id, if text.is_empty() { NO_RESPONSE } else { text })
    }
}
