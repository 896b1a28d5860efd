use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Server responded with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unrecognized reply: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<ChatError>,
    },
}

impl ChatError {
    /// Short follow-up advice for the terminal, when there is any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Network(_) => Some("Check that the hotel backend is reachable and try again"),
            Self::Timeout(_) => Some("The assistant may be busy, resend your message in a moment"),
            Self::Auth(_) => Some("Sign in again and pass the new token with --token"),
            Self::Config(_) => {
                Some("Check ~/.concierge/config.toml and .concierge/config.local.toml")
            }
            Self::Context { source, .. } => source.hint(),
            _ => None,
        }
    }
}

/// Classifies transport failures at the client boundary.
impl From<reqwest::Error> for ChatError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ChatError::Timeout(error.to_string())
        } else if error.is_decode() {
            ChatError::Parse(error.to_string())
        } else if let Some(status) = error.status() {
            ChatError::Http {
                status: status.as_u16(),
                body: error.to_string(),
            }
        } else {
            ChatError::Network(error.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
