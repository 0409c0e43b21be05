use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{ExplainError, TextGenerator};
use crate::config::{require, ConfigError, OpenAiConfig};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiClient {
    /// `http` must already carry `timeout`; it is only kept here for error reporting.
    pub fn from_config(
        config: &OpenAiConfig,
        http: reqwest::Client,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let api_key = require(&config.api_key, "OPEN_AI_KEY")?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url().trim_end_matches('/')),
            model: config.model().to_string(),
            api_key: api_key.to_string(),
            timeout,
        })
    }

    fn classify(&self, error: reqwest::Error) -> ExplainError {
        if error.is_timeout() {
            ExplainError::Timeout(self.timeout)
        } else if error.is_connect() {
            ExplainError::ServiceUnavailable(error.to_string())
        } else {
            ExplainError::Request(error)
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ExplainError> {
        let payload = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        debug!(prompt_bytes = prompt.len(), "sending chat completion request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ExplainError::ServiceUnavailable(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(ExplainError::Status(status));
        }

        let body = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| self.classify(e))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ExplainError::EmptyResponse)
    }
}
