//! # Gateway Providers
//!
//! Upstream adapters for the chat stream gateway.
//!
//! Each adapter speaks one provider's native streaming protocol and yields
//! canonical [`gateway_core::DeltaEvent`]s:
//! - OpenAI chat completions (SSE, `choices[0].delta.content`)
//! - Google Gemini `streamGenerateContent` (SSE, candidate text parts)
//! - Anthropic Messages (SSE, typed events, `text_delta` only)
//! - Perplexity chat completions (raw line protocol, reassembled locally)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anthropic;
pub mod config;
mod error;
pub mod gemini;
pub mod openai;
pub mod perplexity;
pub mod registry;
mod sse;

// Re-export main types
pub use anthropic::AnthropicAdapter;
pub use config::AdapterConfig;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;
pub use perplexity::PerplexityAdapter;
pub use registry::{build_adapter, AdapterRegistry};
