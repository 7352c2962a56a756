use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evidence::Evidence;

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatReply {
    answer: String,
    #[serde(default)]
    retrieved_image: Option<String>,
    #[serde(default)]
    page_number: Option<u32>,
}

/// A decoded reply from the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub evidence: Option<Evidence>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {0}")]
    Status(StatusCode),
    #[error("malformed reply: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("malformed evidence image: {0}")]
    Image(#[from] base64::DecodeError),
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    endpoint: String,
}

impl BackendClient {
    pub fn new(base_url: &str, chat_path: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let path = chat_path.trim_start_matches('/');
        Self {
            client: Client::new(),
            endpoint: format!("{}/{}", base, path),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn ask(&self, query: &str) -> Result<Answer, ApiError> {
        tracing::debug!(endpoint = %self.endpoint, "posting query");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { query })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        let body = response.text().await?;
        let reply: ChatReply = serde_json::from_str(&body)?;
        let evidence = Evidence::from_reply(reply.retrieved_image.as_deref(), reply.page_number)?;

        tracing::debug!(
            answer_len = reply.answer.len(),
            has_evidence = evidence.is_some(),
            page = ?reply.page_number,
            "reply decoded"
        );

        Ok(Answer {
            text: reply.answer,
            evidence,
        })
    }
}
