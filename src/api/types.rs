use crate::chat::{EntryStatus, MessageEntry, Sender};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Text shown when a reply carries nothing displayable.
pub const NO_RESPONSE: &str = "No response.";

/// A conversation thread as the backend reports it.
///
/// The id is kept in its raw textual form because sessions can come from
/// state that was never validated; use [`Session::valid_id`] before sending.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Session {
    #[serde(default, deserialize_with = "deserialize_raw_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id: Some(id.to_string()),
            title: title.into(),
            created_at: Some(Utc::now()),
        }
    }

    /// The id as a positive integer, or `None` when it cannot be used for a send.
    pub fn valid_id(&self) -> Option<u64> {
        self.id
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|id| *id > 0)
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled Chat"
        } else {
            &self.title
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Integer(i64),
    Float(f64),
    Text(String),
}

fn deserialize_raw_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawId>::deserialize(deserializer)?;
    Ok(raw.map(|id| match id {
        RawId::Integer(n) => n.to_string(),
        RawId::Float(f) => f.to_string(),
        RawId::Text(s) => s,
    }))
}

fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Accepts RFC 3339 as well as the naive UTC timestamps the backend stores.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Serialize)]
pub struct NewSessionRequest<'a> {
    pub title: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PostMessageRequest<'a> {
    pub session_id: u64,
    pub message: &'a str,
    pub sender: Sender,
}

/// One row of `GET /api/chat/session/{id}`.
#[derive(Debug, Deserialize)]
pub struct StoredMessage {
    pub sender: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl StoredMessage {
    pub fn into_entry(self) -> MessageEntry {
        let sender = if self.sender.eq_ignore_ascii_case("user") {
            Sender::User
        } else {
            Sender::Bot
        };
        let mut entry = MessageEntry::new(sender, self.message, EntryStatus::Final);
        if let Some(timestamp) = self.timestamp {
            entry.created_at = timestamp;
        }
        entry
    }
}

/// Reply to `POST /api/chat/message`, decoded once by shape.
///
/// Two reply formats have coexisted on the backend, so both are accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBundle {
    /// `{user_message: {message}, bot_message: {message}}`
    Paired {
        user_message: Option<String>,
        bot_message: String,
    },
    /// `{response}` or `{text}`
    Legacy {
        response: Option<String>,
        text: Option<String>,
    },
    /// Anything without displayable text, including `{}`.
    Empty,
}

impl ReplyBundle {
    pub fn detect(value: &Value) -> Self {
        fn text_field(object: &Value, key: &str) -> Option<String> {
            object
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        if let Some(bot_message) = value
            .get("bot_message")
            .and_then(|m| text_field(m, "message"))
        {
            return Self::Paired {
                user_message: value
                    .get("user_message")
                    .and_then(|m| text_field(m, "message")),
                bot_message,
            };
        }

        let response = text_field(value, "response");
        let text = text_field(value, "text");
        if response.is_some() || text.is_some() {
            return Self::Legacy { response, text };
        }

        Self::Empty
    }

    /// Displayable reply text: paired bot message, then `response`, then `text`.
    pub fn display_text(&self) -> &str {
        match self {
            Self::Paired { bot_message, .. } => bot_message,
            Self::Legacy {
                response: Some(response),
                ..
            } => response,
            Self::Legacy {
                text: Some(text), ..
            } => text,
            Self::Legacy { .. } | Self::Empty => NO_RESPONSE,
        }
    }
}
