//! Thin client for the external AI chat webhook
//!
//! The assistant itself lives outside this system. We forward the question
//! with a conversation id and hand back whatever text comes out.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable holding the webhook endpoint
pub const AI_WEBHOOK_URL_ENV: &str = "COFRE_AI_WEBHOOK_URL";
/// Optional bearer token for the webhook
pub const AI_WEBHOOK_TOKEN_ENV: &str = "COFRE_AI_WEBHOOK_TOKEN";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize)]
struct WebhookRequest<'a> {
    question: &'a str,
    #[serde(rename = "conversationId")]
    conversation_id: &'a str,
    #[serde(rename = "userId")]
    user_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct WebhookResponse {
    output: String,
}

/// Client for the chat webhook
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl ChatClient {
    pub fn new(url: String, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, url, token })
    }

    /// Build a client from `COFRE_AI_WEBHOOK_URL` / `COFRE_AI_WEBHOOK_TOKEN`.
    /// Returns None when no URL is configured.
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(AI_WEBHOOK_URL_ENV).ok() {
            Some(url) if !url.is_empty() => {
                let token = std::env::var(AI_WEBHOOK_TOKEN_ENV).ok();
                Ok(Some(Self::new(url, token)?))
            }
            _ => Ok(None),
        }
    }

    /// Forward a question and return the assistant's answer
    pub async fn ask(
        &self,
        user_id: i64,
        conversation_id: &str,
        question: &str,
    ) -> Result<String> {
        debug!(user_id, conversation_id, "Forwarding chat question");

        let mut request = self.client.post(&self.url).json(&WebhookRequest {
            question,
            conversation_id,
            user_id,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("Chat webhook did not respond: {}", e))
            } else {
                Error::External(format!("Chat webhook unreachable: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "Chat webhook returned {}: {}",
                status, body
            )));
        }

        let parsed: WebhookResponse = response
            .json()
            .await
            .map_err(|e| Error::External(format!("Chat webhook response malformed: {}", e)))?;

        Ok(parsed.output)
    }
}
