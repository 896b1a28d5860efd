use crate::error::{ChatError, Result};
use std::future::Future;
use std::time::Duration;

/// Outer bound on any single HTTP exchange; callers apply tighter deadlines.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub async fn check_response_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    tracing::error!(
        status = %status,
        error = %error_text,
        "Backend request failed"
    );

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ChatError::Auth(format!("status {}: {}", status, error_text)));
    }

    Err(ChatError::Http {
        status: status.as_u16(),
        body: error_text,
    })
}

/// Run `operation` under a caller-enforced deadline.
/// Expiry is reported as [`ChatError::Timeout`]; the operation is dropped.
pub async fn with_deadline<F, T>(operation: &str, deadline: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation = operation,
                deadline_ms = deadline.as_millis() as u64,
                "Deadline exceeded"
            );
            Err(ChatError::Timeout(format!(
                "{} did not complete within {}ms",
                operation,
                deadline.as_millis()
            )))
        }
    }
}
