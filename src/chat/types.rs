use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// Parses a raw request body. An empty body counts as `{}`.
    pub fn from_body(body: &[u8]) -> Result<Self, ServiceError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| ServiceError::BadRequest(e.to_string()))
    }

    /// The user text; a missing or null field reads as empty.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub status: &'static str,
}

impl ChatReply {
    pub fn success(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            status: "success",
        }
    }
}

/// Exactly one of a reply or an error per request.
pub type ChatResponse = Result<ChatReply, ServiceError>;
