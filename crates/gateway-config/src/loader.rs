//! Configuration loading.

use crate::config::{GatewayConfig, LogFormat, ProvidersConfig};
use crate::error::ConfigError;
use gateway_core::ProviderKind;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use validator::Validate;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML
    Yaml,
    /// TOML
    Toml,
}

impl ConfigFormat {
    /// Detect the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }

    /// Parse configuration text in this format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` when the text is malformed.
    pub fn parse(self, path: &Path, content: &str) -> Result<GatewayConfig, ConfigError> {
        let parsed = match self {
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }
}

/// Loads configuration from a file and the environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    use_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader that reads only the environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            file: None,
            use_env: true,
        }
    }

    /// Read this file before applying environment overrides.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Skip environment overrides.
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Load, overlay and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, an environment
    /// variable is malformed, or validation fails.
    pub async fn load(&self) -> Result<GatewayConfig, ConfigError> {
        let mut config = match &self.file {
            Some(path) => {
                let format = ConfigFormat::from_path(path).ok_or_else(|| {
                    ConfigError::UnsupportedFormat { path: path.clone() }
                })?;
                let content =
                    tokio::fs::read_to_string(path)
                        .await
                        .map_err(|source| ConfigError::Io {
                            path: path.clone(),
                            source,
                        })?;
                info!(path = %path.display(), "Loaded configuration file");
                format.parse(path, &content)?
            }
            None => GatewayConfig::default(),
        };

        if self.use_env {
            apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Overlay environment variables onto a configuration.
///
/// `lookup` returns the value of a variable, or `None` if unset.
///
/// # Errors
///
/// Returns `ConfigError::Environment` for a variable that cannot be parsed.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(host) = lookup("GATEWAY_HOST") {
        config.server.host = host;
    }
    if let Some(port) = lookup("GATEWAY_PORT") {
        config.server.port = port.trim().parse().map_err(|_| ConfigError::Environment {
            variable: "GATEWAY_PORT".to_string(),
            message: format!("'{port}' is not a valid port"),
        })?;
    }
    if let Some(level) = lookup("GATEWAY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = lookup("GATEWAY_LOG_FORMAT") {
        config.logging.format = match format.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            other => {
                return Err(ConfigError::Environment {
                    variable: "GATEWAY_LOG_FORMAT".to_string(),
                    message: format!("'{other}' is not one of pretty, json"),
                })
            }
        };
    }
    if let Some(domains) = lookup("ALLOWED_DOMAINS") {
        config.auth.allowed_domains = domains
            .split(',')
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
    }

    for kind in ProviderKind::ALL {
        let settings = config.providers.get_mut(kind);
        let variable = settings
            .api_key_env
            .clone()
            .unwrap_or_else(|| ProvidersConfig::default_api_key_env(kind).to_string());

        if let Some(key) = lookup(&variable) {
            debug!(provider = kind.as_str(), variable = %variable, "Using API key from environment");
            settings.api_key = Some(SecretString::new(key.trim().to_string()));
        }
    }

    Ok(())
}
