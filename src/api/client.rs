use super::types::*;
use super::utils::{check_response_status, REQUEST_TIMEOUT};
use super::SessionApi;
use crate::chat::{MessageEntry, Sender};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

/// HTTP implementation of the session/message API.
#[derive(Clone)]
pub struct HttpSessionClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        reqwest::Url::parse(base_url)
            .map_err(|e| ChatError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ChatError::Config(format!("Invalid token format: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SessionApi for HttpSessionClient {
    async fn create_session(&self, title: &str) -> Result<Session> {
        tracing::debug!(title = title, "POST /api/session/new");
        let response = self
            .client
            .post(self.url("/api/session/new"))
            .json(&NewSessionRequest { title })
            .send()
            .await?;
        let response = check_response_status(response).await?;
        Ok(response.json::<Session>().await?)
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        tracing::debug!("GET /api/session/list");
        let response = self.client.get(self.url("/api/session/list")).send().await?;
        let response = check_response_status(response).await?;
        Ok(response.json::<Vec<Session>>().await?)
    }

    async fn fetch_messages(&self, session_id: u64) -> Result<Vec<MessageEntry>> {
        tracing::debug!(session_id = session_id, "GET /api/chat/session/{{id}}");
        let response = self
            .client
            .get(self.url(&format!("/api/chat/session/{}", session_id)))
            .send()
            .await?;
        let response = check_response_status(response).await?;
        let stored = response.json::<Vec<StoredMessage>>().await?;
        Ok(stored.into_iter().map(StoredMessage::into_entry).collect())
    }

    async fn post_message(&self, session_id: u64, text: &str, sender: Sender) -> Result<ReplyBundle> {
        tracing::debug!(session_id = session_id, "POST /api/chat/message");
        let response = self
            .client
            .post(self.url("/api/chat/message"))
            .json(&PostMessageRequest {
                session_id,
                message: text,
                sender,
            })
            .send()
            .await?;
        let response = check_response_status(response).await?;

        let body = response.text().await?;
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ChatError::Parse(format!("reply is not JSON: {}", e)))?;
        Ok(ReplyBundle::detect(&value))
    }
}
