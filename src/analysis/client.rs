use crate::analysis::AnalysisError;
use crate::config::{resolve_api_key, SummarizerConfig};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

const SYSTEM_PROMPT: &str = "You are a helpful policy analysis assistant.";

/// Outcome of one chat-completions call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    /// `choices[0].message.content`, trimmed
    Text(String),
    /// `error.message` reported by the service
    ApiError(String),
    /// A body that is neither a completion nor an error
    Malformed(String),
    /// The request never produced a readable body
    Failed(String),
}

impl ModelReply {
    /// Classifies a decoded response body
    pub fn from_json(body: &Value) -> Self {
        if let Some(content) = body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
        {
            return Self::Text(content.trim().to_string());
        }
        if let Some(message) = body.pointer("/error/message").and_then(Value::as_str) {
            return Self::ApiError(message.to_string());
        }
        Self::Malformed(body.to_string())
    }

    /// Returns the text, or an error describing why there is none
    pub fn into_text(self) -> Result<String, AnalysisError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::ApiError(message) => Err(AnalysisError::Model(format!("API error: {}", message))),
            Self::Malformed(body) => Err(AnalysisError::Model(format!(
                "unexpected response: {}",
                body
            ))),
            Self::Failed(reason) => Err(AnalysisError::Model(format!(
                "request failed: {}",
                reason
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Client for an OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone)]
pub struct ModelClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    referer: Option<String>,
}

impl ModelClient {
    /// Creates a client with a bounded request timeout
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        referer: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            referer,
        })
    }

    /// Creates a client from the `[summarizer]` section
    ///
    /// Fails when the API key environment variable is unset.
    pub fn from_config(config: &SummarizerConfig) -> crate::Result<Self> {
        let api_key = resolve_api_key(config)?;
        Ok(Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
            config.referer.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one user prompt and classifies the reply
    ///
    /// The response body is decoded regardless of HTTP status, since error
    /// payloads carry the service's explanation.
    pub async fn ask(&self, prompt: &str) -> ModelReply {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request);
        if let Some(referer) = &self.referer {
            builder = builder.header(reqwest::header::REFERER, referer);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Summarizer request failed: {}", e);
                return ModelReply::Failed(e.to_string());
            }
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ModelReply::Failed(e.to_string()),
        };

        let reply = match serde_json::from_str::<Value>(&body) {
            Ok(value) => ModelReply::from_json(&value),
            Err(_) => ModelReply::Malformed(body),
        };
        if !matches!(reply, ModelReply::Text(_)) {
            warn!("Summarizer returned no text: {:?}", reply);
        }
        reply
    }
}
