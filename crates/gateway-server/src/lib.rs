//! # Gateway Server
//!
//! HTTP server for the chat stream gateway.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Streaming and non-streaming chat endpoints
//! - Stream normalization into `data:` records
//! - Preference endpoints behind a session boundary
//! - Health, readiness and metrics endpoints
//! - Graceful shutdown handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod preferences;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;
pub mod stream;

// Re-export main types
pub use error::{ApiError, ErrorBody};
pub use handlers::{ChatResponse, HealthResponse};
pub use preferences::{InMemoryPreferenceStore, PreferenceMode, PreferenceStore, UserPreferences};
pub use routes::create_router;
pub use server::{shutdown_signal, Server};
pub use session::{HeaderSessionProvider, SessionProvider, UserIdentity};
pub use state::{AppState, AppStateBuilder};
pub use stream::{normalize, NormalizeOptions};
