use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Shown when the service answers without a usable reply
pub const NO_RESPONSE: &str = "No response";

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("reply request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("reply service returned status {0}")]
    Status(StatusCode),
    #[error("reply service did not answer within {0:?}")]
    Timeout(Duration),
    #[error("reply service panicked")]
    Panicked,
}

/// Maps a user message to a complete assistant reply
#[async_trait]
pub trait ReplyService: Send + Sync {
    async fn fetch_reply(&self, message: &str) -> Result<String, ReplyError>;
}

#[derive(Serialize)]
struct ReplyRequest {
    prompt: String,
}

#[derive(Deserialize)]
struct ReplyResponse {
    #[serde(default)]
    reply: Option<String>,
}

/// Wrap the user's message in the health-assistant prompt template
pub fn build_prompt(message: &str) -> String {
    format!(
        "\nYou are a helpful health assistant.\nUser: {}\nAI:\n",
        message
    )
}

#[derive(Clone)]
pub struct ReplyClient {
    client: Client,
    endpoint: String,
}

impl ReplyClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReplyService for ReplyClient {
    async fn fetch_reply(&self, message: &str) -> Result<String, ReplyError> {
        let request = ReplyRequest {
            prompt: build_prompt(message),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReplyError::Status(response.status()));
        }

        let reply_response: ReplyResponse = response.json().await?;
        Ok(reply_response
            .reply
            .filter(|reply| !reply.is_empty())
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }
}
