//! # Gateway Config
//!
//! Configuration management for the chat stream gateway.
//!
//! Configuration is read once at startup from an optional YAML or TOML file,
//! overlaid with environment variables, validated, and then shared read-only.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod loader;

pub use config::{
    AuthSettings, GatewayConfig, LogFormat, LoggingSettings, ProviderSettings, ProvidersConfig,
    ServerSettings, StreamSettings,
};
pub use error::ConfigError;
pub use loader::{apply_env_overrides, ConfigFormat, ConfigLoader};
