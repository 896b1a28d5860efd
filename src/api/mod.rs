pub mod client;
pub mod types;
pub mod utils;

pub use client::HttpSessionClient;
pub use types::*;

use crate::chat::{MessageEntry, Sender};
use crate::error::Result;
use async_trait::async_trait;

/// Network boundary to the backend session and message endpoints.
///
/// Deadlines and session id validity are enforced by callers.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn create_session(&self, title: &str) -> Result<Session>;

    /// Most recent first, exactly as the backend orders them.
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    async fn fetch_messages(&self, session_id: u64) -> Result<Vec<MessageEntry>>;

    async fn post_message(&self, session_id: u64, text: &str, sender: Sender) -> Result<ReplyBundle>;
}
