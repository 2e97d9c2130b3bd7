//! # Gateway Core
//!
//! Core types, traits, and error handling for the chat stream gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - The validated single-turn generation request
//! - Provider identifiers and the provider adapter trait
//! - Credential resolution (caller key over configured default)
//! - Canonical delta events, outbound framing and line reassembly
//! - Error types and handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credential;
pub mod error;
pub mod provider;
pub mod request;
pub mod streaming;

// Re-export commonly used types
pub use credential::{Credential, CredentialResolver, CredentialSource};
pub use error::{GatewayError, GatewayResult};
pub use provider::{DeltaStream, ProviderAdapter, ProviderKind};
pub use request::{ChatStreamBody, GenerationRequest};
pub use streaming::{
    encode_delta, parse_data_line, split_lines, DataLine, DeltaEvent, LineBuffer, LineTooLong,
    DONE_FRAME, DONE_SENTINEL, MAX_LINE_BYTES,
};
