use serde_json::Value;
use shared::ValidationError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Network error: {0}")]
    Connectivity(String),
    #[error("Request timeout. The AI server might be busy.")]
    Timeout,
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ClientError {
    /// Classifies a transport failure so a slow server is told apart from an unreachable one.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Unexpected(format!("Malformed response: {}", err))
        } else if err.is_connect() || err.is_request() {
            ClientError::Connectivity(err.to_string())
        } else {
            ClientError::Unexpected(err.to_string())
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout)
    }
}

/// Pulls a human message out of an error body. FastAPI sends `detail` as a
/// string, or as a list of `{msg}` objects for form validation failures.
pub(crate) fn error_message(body: &Value) -> Option<String> {
    match body.get("detail") {
        Some(Value::String(detail)) if !detail.trim().is_empty() => {
            return Some(detail.clone());
        }
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
        _ => {}
    }

    ["error", "message"].iter().find_map(|key| {
        body.get(*key)
            .and_then(Value::as_str)
            .filter(|message| !message.trim().is_empty())
            .map(str::to_string)
    })
}
