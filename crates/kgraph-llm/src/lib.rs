//! kgraph LLM - Chat backend contract and response resilience
//!
//! Everything the pipelines need to talk to a language model:
//! - `ChatBackend`: the opaque request/response capability seam
//! - `OpenAiBackend`: client for any OpenAI-compatible endpoint (vLLM etc.)
//! - Response resilience: fence stripping and truncated-JSON repair
//!
//! The resilience layer never fails; it degrades to an empty document
//! and logs, because callers treat an unparseable response as "zero new
//! entities", not as a pipeline abort.

#![warn(unreachable_pub)]

pub mod backend;
pub mod openai;
pub mod resilience;

pub use backend::{BackendError, ChatBackend, ChatRequest, ChatResponse, FinishReason};
pub use openai::OpenAiBackend;
pub use resilience::parse_json_response;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
