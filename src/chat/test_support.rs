use super::entry::{MessageEntry, Sender};
use super::sync::SyncSettings;
use crate::api::{ReplyBundle, Session, SessionApi};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub(crate) fn settings() -> SyncSettings {
    SyncSettings {
        send_timeout: Duration::from_secs(120),
        create_timeout: Duration::from_secs(10),
        placeholder_interval: Duration::from_millis(500),
        session_title: "New Chat".to_string(),
    }
}

/// How the scripted backend answers one `post_message`.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Paired(String),
    LegacyResponse(String),
    LegacyText(String),
    Empty,
    Unparsable,
    Status(u16),
    Offline,
    Hang,
}

impl Reply {
    pub(crate) fn paired(text: &str) -> Self {
        Self::Paired(text.to_string())
    }

    pub(crate) fn legacy_response(text: &str) -> Self {
        Self::LegacyResponse(text.to_string())
    }

    pub(crate) fn legacy_text(text: &str) -> Self {
        Self::LegacyText(text.to_string())
    }

    async fn resolve(self) -> Result<ReplyBundle> {
        match self {
            Self::Paired(text) => Ok(ReplyBundle::Paired {
                user_message: None,
                bot_message: text,
            }),
            Self::LegacyResponse(text) => Ok(ReplyBundle::Legacy {
                response: Some(text),
                text: None,
            }),
            Self::LegacyText(text) => Ok(ReplyBundle::Legacy {
                response: None,
                text: Some(text),
            }),
            Self::Empty => Ok(ReplyBundle::Empty),
            Self::Unparsable => Err(ChatError::Parse("reply is not JSON".to_string())),
            Self::Status(status) => Err(ChatError::Http {
                status,
                body: "scripted failure".to_string(),
            }),
            Self::Offline => Err(ChatError::Network("connection refused".to_string())),
            Self::Hang => std::future::pending().await,
        }
    }
}

/// In-memory backend with scripted answers.
pub(crate) struct ScriptedApi {
    replies: Mutex<VecDeque<Reply>>,
    repeat: Option<Reply>,
    gate: Option<Arc<Notify>>,
    next_session: AtomicU64,
    fail_create: bool,
    create_hangs: bool,
    sessions: Vec<Session>,
    history: Vec<(Sender, String)>,
    history_hangs: bool,
    created: AtomicUsize,
    posts: Mutex<Vec<(u64, String)>>,
}

impl ScriptedApi {
    fn with_replies(replies: Vec<Reply>, repeat: Option<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            repeat,
            gate: None,
            next_session: AtomicU64::new(100),
            fail_create: false,
            create_hangs: false,
            sessions: Vec::new(),
            history: Vec::new(),
            history_hangs: false,
            created: AtomicUsize::new(0),
            posts: Mutex::new(Vec::new()),
        }
    }

    /// Answers every post with `reply`.
    pub(crate) fn replying(reply: Reply) -> Self {
        Self::with_replies(Vec::new(), Some(reply))
    }

    /// Answers posts with `replies` in order, then with an empty bundle.
    pub(crate) fn sequence(replies: Vec<Reply>) -> Self {
        Self::with_replies(replies, None)
    }

    /// Holds every post until the returned gate is notified.
    pub(crate) fn gated(reply: Reply) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let mut api = Self::replying(reply);
        api.gate = Some(Arc::clone(&gate));
        (api, gate)
    }

    pub(crate) fn with_next_session(self, id: u64) -> Self {
        self.next_session.store(id, Ordering::SeqCst);
        self
    }

    pub(crate) fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub(crate) fn with_hanging_create(mut self) -> Self {
        self.create_hangs = true;
        self
    }

    pub(crate) fn with_sessions(mut self, sessions: Vec<Session>) -> Self {
        self.sessions = sessions;
        self
    }

    pub(crate) fn with_history(mut self, history: &[(Sender, &str)]) -> Self {
        self.history = history
            .iter()
            .map(|(sender, text)| (*sender, text.to_string()))
            .collect();
        self
    }

    pub(crate) fn with_hanging_history(mut self) -> Self {
        self.history_hangs = true;
        self
    }

    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub(crate) fn posts(&self) -> Vec<(u64, String)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionApi for ScriptedApi {
    async fn create_session(&self, title: &str) -> Result<Session> {
        if self.fail_create {
            return Err(ChatError::Network("connection refused".to_string()));
        }
        if self.create_hangs {
            std::future::pending::<()>().await;
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        Ok(Session::new(id, title))
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        Ok(self.sessions.clone())
    }

    async fn fetch_messages(&self, _session_id: u64) -> Result<Vec<MessageEntry>> {
        if self.history_hangs {
            std::future::pending::<()>().await;
        }
        Ok(self
            .history
            .iter()
            .map(|(sender, text)| match sender {
                Sender::User => MessageEntry::user(text.clone()),
                Sender::Bot => MessageEntry::new(Sender::Bot, text.clone(), super::EntryStatus::Final),
            })
            .collect())
    }

    async fn post_message(&self, session_id: u64, text: &str, _sender: Sender) -> Result<ReplyBundle> {
        self.posts.lock().unwrap().push((session_id, text.to_string()));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        let reply = next.or_else(|| self.repeat.clone()).unwrap_or(Reply::Empty);
        reply.resolve().await
    }
}
