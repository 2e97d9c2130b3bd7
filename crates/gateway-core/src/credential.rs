//! Credential resolution.
//!
//! A caller-supplied key always takes precedence over the key configured for
//! the process, so users can bring their own key without any configuration
//! change. Resolution fails before any upstream connection is attempted.

use crate::error::GatewayError;
use crate::provider::ProviderKind;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Supplied with the request.
    Caller,
    /// Configured for the whole process.
    Configured,
}

impl CredentialSource {
    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Caller => "caller",
            Self::Configured => "configured",
        }
    }
}

/// A secret scoped to exactly one provider.
#[derive(Debug, Clone)]
pub struct Credential {
    provider: ProviderKind,
    secret: SecretString,
    source: CredentialSource,
}

impl Credential {
    /// Create a credential.
    #[must_use]
    pub fn new(provider: ProviderKind, secret: SecretString, source: CredentialSource) -> Self {
        Self {
            provider,
            secret,
            source,
        }
    }

    /// Provider the credential belongs to.
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Where the credential came from.
    #[must_use]
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// The raw key, for use as a header value only.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

/// Picks the credential for a request.
///
/// Built once at startup from configuration and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    defaults: HashMap<ProviderKind, SecretString>,
}

impl CredentialResolver {
    /// Create a resolver without any configured keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the process-wide key for a provider. Blank keys are ignored.
    #[must_use]
    pub fn with_default(mut self, provider: ProviderKind, key: SecretString) -> Self {
        if !is_blank(&key) {
            self.defaults.insert(provider, key);
        }
        self
    }

    /// Whether a process-wide key exists for the provider.
    #[must_use]
    pub fn has_default(&self, provider: ProviderKind) -> bool {
        self.defaults.contains_key(&provider)
    }

    /// Providers that have a process-wide key.
    #[must_use]
    pub fn configured_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.has_default(*kind))
            .collect()
    }

    /// Resolve the credential for `provider`.
    ///
    /// A non-blank caller key wins; otherwise the configured key is used.
    pub fn resolve(
        &self,
        provider: ProviderKind,
        caller_key: Option<&SecretString>,
    ) -> Result<Credential, GatewayError> {
        if let Some(key) = caller_key.filter(|key| !is_blank(key)) {
            return Ok(Credential::new(provider, key.clone(), CredentialSource::Caller));
        }

        self.defaults
            .get(&provider)
            .map(|key| Credential::new(provider, key.clone(), CredentialSource::Configured))
            .ok_or_else(|| GatewayError::no_credential(provider))
    }
}

fn is_blank(key: &SecretString) -> bool {
    key.expose_secret().trim().is_empty()
}
