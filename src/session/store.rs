use crate::api::Session;

/// In-memory holder of the active session and the known session list.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    current: Option<Session>,
    /// Most recent first.
    sessions: Vec<Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn set_current(&mut self, session: Session) {
        self.current = Some(session);
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Records a newly known session at the front of the list.
    /// A session already listed under the same id is replaced.
    pub fn append_session(&mut self, session: Session) {
        if session.id.is_some() {
            self.sessions.retain(|s| s.id != session.id);
        }
        self.sessions.insert(0, session);
    }

    /// Replaces the list with what the backend returned, keeping its order.
    pub fn replace_sessions(&mut self, sessions: Vec<Session>) {
        self.sessions = sessions;
    }

    pub fn list_sessions(&self) -> &[Session] {
        &self.sessions
    }
}
