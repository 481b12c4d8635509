//! OpenAI-compatible chat backend
//!
//! Talks to any server exposing the `/chat/completions` protocol
//! (vLLM, llama.cpp server, OpenAI itself). The endpoint comes from an
//! explicit base URL or the `LLM_BASE_URL` environment variable.

use crate::backend::{BackendError, ChatBackend, ChatRequest, ChatResponse, FinishReason};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const BASE_URL_ENV: &str = "LLM_BASE_URL";

/// Client for an OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireContent,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

impl OpenAiBackend {
    /// Create a backend for the given base URL and model
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Create a backend from the `LLM_BASE_URL` environment variable
    ///
    /// # Errors
    /// - `BackendError::Endpoint` if the variable is unset
    pub fn from_env(model: impl Into<String>) -> Result<Self, BackendError> {
        let base_url = std::env::var(BASE_URL_ENV).map_err(|_| {
            BackendError::Endpoint(format!(
                "set the {BASE_URL_ENV} environment variable (e.g. http://localhost:8000/v1)"
            ))
        })?;
        Ok(Self::new(base_url, model))
    }

    /// Model name sent with every request
    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(WireMessage {
                role: "system",
                content: &request.system,
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: &request.user,
        });

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        tracing::debug!(
            "Sending chat completion request (model={}, max_tokens={})",
            self.model,
            request.max_tokens
        );

        let body = WireRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let wire: WireResponse = response.json().await?;

        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Malformed("response contained no choices".to_string()))?;

        let text = choice.message.content.unwrap_or_default();
        let finish = FinishReason::from_wire(choice.finish_reason.as_deref());
        tracing::debug!("Got response: {} chars, finish={finish:?}", text.len());

        Ok(ChatResponse { text, finish })
    }
}
