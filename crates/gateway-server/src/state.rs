//! Shared application state.
//!
//! Everything here is built once at startup and read without locks on the
//! request path.

use std::sync::Arc;

use gateway_config::GatewayConfig;
use gateway_core::{CredentialResolver, GatewayError, ProviderKind};
use gateway_providers::AdapterRegistry;
use gateway_telemetry::{Metrics, NoopObserver, StreamObserver, Telemetry};

use crate::error::ApiError;
use crate::preferences::{InMemoryPreferenceStore, PreferenceStore};
use crate::session::{HeaderSessionProvider, SessionProvider};

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Gateway configuration
    pub config: Arc<GatewayConfig>,
    /// Provider adapters
    pub registry: Arc<AdapterRegistry>,
    /// Default credentials
    pub resolver: Arc<CredentialResolver>,
    /// Stream lifecycle sink
    pub observer: Arc<dyn StreamObserver>,
    /// Metrics rendered at `/metrics`, when enabled
    pub metrics: Option<Arc<Metrics>>,
    /// Preference storage
    pub preferences: Arc<dyn PreferenceStore>,
    /// Caller identification
    pub sessions: Arc<dyn SessionProvider>,
}

impl AppState {
    /// Start building state
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }

    /// Report a pre-stream failure and turn it into a response error
    pub fn reject(&self, provider: Option<ProviderKind>, error: GatewayError) -> ApiError {
        self.observer.request_rejected(provider, &error);
        ApiError::from(error)
    }
}

/// Builder for [`AppState`]
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<GatewayConfig>,
    registry: Option<AdapterRegistry>,
    resolver: Option<CredentialResolver>,
    observer: Option<Arc<dyn StreamObserver>>,
    metrics: Option<Arc<Metrics>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    sessions: Option<Arc<dyn SessionProvider>>,
}

impl AppStateBuilder {
    /// Set the configuration
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the adapter registry
    #[must_use]
    pub fn registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the credential resolver (defaults to the one built from config)
    #[must_use]
    pub fn resolver(mut self, resolver: CredentialResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Report to telemetry and expose its metrics
    #[must_use]
    pub fn telemetry(mut self, telemetry: Telemetry) -> Self {
        self.metrics = Some(Arc::new(telemetry.metrics().clone()));
        self.observer = Some(Arc::new(telemetry));
        self
    }

    /// Report to a custom observer
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Set the preference store
    #[must_use]
    pub fn preferences(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(store);
        self
    }

    /// Set the session provider
    #[must_use]
    pub fn sessions(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Build the state
    ///
    /// # Errors
    /// Returns error if the session provider cannot be built from config
    pub fn build(self) -> Result<AppState, GatewayError> {
        let config = self.config.unwrap_or_default();
        let resolver = self
            .resolver
            .unwrap_or_else(|| config.credential_resolver());
        let sessions = match self.sessions {
            Some(sessions) => sessions,
            None => Arc::new(HeaderSessionProvider::from_settings(&config.auth)?),
        };

        Ok(AppState {
            registry: Arc::new(self.registry.unwrap_or_default()),
            resolver: Arc::new(resolver),
            observer: self.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
            metrics: self.metrics,
            preferences: self
                .preferences
                .unwrap_or_else(|| Arc::new(InMemoryPreferenceStore::new())),
            sessions,
            config: Arc::new(config),
        })
    }
}
