//! Adapter registry.
//!
//! Built once at startup and shared read-only; lookups take no locks.

use crate::anthropic::AnthropicAdapter;
use crate::config::AdapterConfig;
use crate::gemini::GeminiAdapter;
use crate::openai::OpenAiAdapter;
use crate::perplexity::PerplexityAdapter;
use gateway_core::{GatewayError, ProviderAdapter, ProviderKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Build the adapter matching `config.kind`.
///
/// # Errors
/// Returns error if the HTTP client cannot be created
pub fn build_adapter(config: AdapterConfig) -> Result<Arc<dyn ProviderAdapter>, GatewayError> {
    let adapter: Arc<dyn ProviderAdapter> = match config.kind {
        ProviderKind::ChatGpt => Arc::new(OpenAiAdapter::new(config)?),
        ProviderKind::Gemini => Arc::new(GeminiAdapter::new(config)?),
        ProviderKind::Claude => Arc::new(AnthropicAdapter::new(config)?),
        ProviderKind::Perplexity => Arc::new(PerplexityAdapter::new(config)?),
    };
    Ok(adapter)
}

/// Adapters keyed by provider.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with one adapter per config.
    ///
    /// # Errors
    /// Returns error if any adapter cannot be built
    pub fn from_configs(
        configs: impl IntoIterator<Item = AdapterConfig>,
    ) -> Result<Self, GatewayError> {
        configs
            .into_iter()
            .try_fold(Self::new(), |registry, config| {
                Ok(registry.with_adapter(build_adapter(config)?))
            })
    }

    /// Build a registry with all four adapters on their built-in defaults.
    ///
    /// # Errors
    /// Returns error if any adapter cannot be built
    pub fn with_defaults() -> Result<Self, GatewayError> {
        Self::from_configs(ProviderKind::ALL.map(AdapterConfig::for_provider))
    }

    /// Register an adapter, replacing any previous one for the same provider
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        let kind = adapter.kind();
        info!(provider = kind.as_str(), model = adapter.model(), "Registered provider adapter");
        self.adapters.insert(kind, adapter);
    }

    /// Builder form of [`register`](Self::register)
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Look up the adapter for a provider.
    ///
    /// # Errors
    /// Returns `UnsupportedProvider` if no adapter is registered
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn ProviderAdapter>, GatewayError> {
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or_else(|| GatewayError::unsupported_provider(kind.as_str()))
    }

    /// Registered providers, in stable order
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.adapters.contains_key(kind))
            .collect()
    }

    /// Number of registered adapters
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether no adapter is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}
