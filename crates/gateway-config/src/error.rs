//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration file {path:?}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML/TOML for the expected shape.
    #[error("Failed to parse configuration file {path:?}: {message}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The file extension does not map to a known format.
    #[error("Unsupported configuration format for {path:?} (expected .yaml, .yml or .toml)")]
    UnsupportedFormat {
        /// File path.
        path: PathBuf,
    },

    /// An environment variable holds a value of the wrong type.
    #[error("Invalid value for {variable}: {message}")]
    Environment {
        /// Variable name.
        variable: String,
        /// What was wrong with it.
        message: String,
    },

    /// The configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}
