//! Chat backend contract
//!
//! The pipelines depend on this trait only; the concrete wire protocol
//! is an implementation detail of the backend crate. Transport failures
//! propagate uncaught: retry/backoff policy belongs to the caller, not
//! to the core.

use async_trait::async_trait;

/// Backend-reported completion signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Clean completion
    Stop,
    /// Output cut off by the max-token limit
    Length,
    /// Anything else (content filter, missing field, ...)
    Other,
}

impl FinishReason {
    /// Map a wire-level finish_reason string
    #[must_use]
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            Some("stop") => Self::Stop,
            Some("length") => Self::Length,
            _ => Self::Other,
        }
    }

    /// Whether the response was cut off by the output-length limit
    #[inline]
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Length)
    }
}

/// A single chat completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// System instructions
    pub system: String,
    /// User instructions
    pub user: String,
    /// Output-length allowance
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl ChatRequest {
    /// Create a request with the given prompts
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 8192,
            temperature: 0.3,
        }
    }

    /// With output-length allowance
    #[inline]
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// With sampling temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A completed chat response
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Raw response text
    pub text: String,
    /// Completion signal
    pub finish: FinishReason,
}

/// Transport-level backend failures
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Endpoint not configured
    #[error("backend endpoint not configured: {0}")]
    Endpoint(String),

    /// HTTP transport failure
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// Opaque chat completion capability
///
/// Blocking request/response: the only suspension point in the whole
/// pipeline is this call.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one chat completion request
    ///
    /// # Errors
    /// - `BackendError` on any transport-level failure
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for &T {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        (**self).chat(request).await
    }
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for std::sync::Arc<T> {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        (**self).chat(request).await
    }
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Box<T> {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        (**self).chat(request).await
    }
}
