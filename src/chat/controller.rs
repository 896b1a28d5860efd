use super::sync::{MessageSynchronizer, SendOutcome, SyncSettings, SyncState};
use super::timeline::ChatTimeline;
use super::typing::TypingRenderer;
use crate::api::utils::with_deadline;
use crate::api::{Session, SessionApi};
use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::session::SessionStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Owns the chat screen state: session store, timeline, renderer and synchronizer.
pub struct ChatController<A: SessionApi> {
    api: Arc<A>,
    store: Arc<Mutex<SessionStore>>,
    timeline: ChatTimeline,
    renderer: Arc<TypingRenderer>,
    synchronizer: MessageSynchronizer<A>,
    history_timeout: Duration,
}

impl<A: SessionApi> ChatController<A> {
    pub fn new(api: A, config: &ChatConfig) -> Self {
        let api = Arc::new(api);
        let store = Arc::new(Mutex::new(SessionStore::new()));
        let timeline = ChatTimeline::new();
        let renderer = Arc::new(TypingRenderer::new(timeline.clone(), config.typing));
        let synchronizer = MessageSynchronizer::new(
            Arc::clone(&api),
            Arc::clone(&store),
            timeline.clone(),
            Arc::clone(&renderer),
            SyncSettings::from(config),
        );

        Self {
            api,
            store,
            timeline,
            renderer,
            synchronizer,
            history_timeout: config.history_timeout(),
        }
    }

    fn store(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn timeline(&self) -> &ChatTimeline {
        &self.timeline
    }

    pub fn state(&self) -> SyncState {
        self.synchronizer.state()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.store().current().cloned()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.store().list_sessions().to_vec()
    }

    fn ensure_idle(&self, action: &str) -> Result<()> {
        if self.synchronizer.is_busy() {
            return Err(ChatError::Validation(format!(
                "cannot {} while a message is still being sent",
                action
            )));
        }
        Ok(())
    }

    pub async fn send(&self, input: &str) -> SendOutcome {
        self.synchronizer.send_message(input).await
    }

    /// Reloads the session list; the most recent session becomes current if none is.
    pub async fn refresh_sessions(&self) -> Result<Vec<Session>> {
        let sessions = self.api.list_sessions().await?;
        tracing::debug!(count = sessions.len(), "Fetched session list");

        let mut store = self.store();
        if store.current().is_none() {
            if let Some(latest) = sessions.first() {
                store.set_current(latest.clone());
            }
        }
        store.replace_sessions(sessions.clone());
        Ok(sessions)
    }

    /// Makes `session` current and loads its messages into the timeline.
    ///
    /// A failed fetch leaves the timeline as it was. Refused while a send is in flight.
    pub async fn open_session(&self, session: Session) -> Result<usize> {
        self.ensure_idle("switch chats")?;
        let id = session.valid_id().ok_or_else(|| {
            ChatError::Validation(format!("session id {:?} is not a positive integer", session.id))
        })?;

        if self.renderer.is_active() {
            self.renderer.cancel_active();
        }
        self.store().set_current(session);

        let entries = with_deadline(
            "history fetch",
            self.history_timeout,
            self.api.fetch_messages(id),
        )
        .await
        .inspect_err(|e| tracing::warn!(session_id = id, error = %e, "Failed to load history"))?;

        let count = entries.len();
        self.timeline.replace(entries);
        tracing::info!(session_id = id, messages = count, "Opened session");
        Ok(count)
    }

    /// Drops the current session; the next message starts a new one.
    pub fn start_new_session(&self) -> Result<()> {
        self.ensure_idle("start a new chat")?;
        self.renderer.cancel_active();
        self.store().clear_current();
        if !self.timeline.is_empty() {
            self.timeline.replace(Vec::new());
        }
        Ok(())
    }
}
