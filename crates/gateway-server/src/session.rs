//! Session boundary.
//!
//! Sign-in itself happens in front of the gateway. The gateway only needs to
//! know who is calling, which it learns from a [`SessionProvider`].

use async_trait::async_trait;
use gateway_config::AuthSettings;
use gateway_core::GatewayError;
use http::{HeaderMap, HeaderName};
use tracing::debug;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// E-mail address, used as the user id
    pub email: String,
}

impl UserIdentity {
    /// Domain part of the e-mail address, lowercased
    #[must_use]
    pub fn domain(&self) -> Option<String> {
        self.email
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_ascii_lowercase())
            .filter(|domain| !domain.is_empty())
    }
}

/// Identifies the caller of a request.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Identify the caller from request headers.
    ///
    /// Fails with `Unauthorized` when no user can be identified and with
    /// `Forbidden` when the user is not allowed in.
    async fn identify(&self, headers: &HeaderMap) -> Result<UserIdentity, GatewayError>;
}

/// Trusts a header set by an authenticating proxy in front of the gateway.
#[derive(Debug, Clone)]
pub struct HeaderSessionProvider {
    header: HeaderName,
    allowed_domains: Vec<String>,
}

impl HeaderSessionProvider {
    /// Create a provider reading `header`, restricted to `allowed_domains`
    /// (empty allows any domain).
    ///
    /// # Errors
    /// Returns a configuration error if `header` is not a valid header name
    pub fn new(
        header: &str,
        allowed_domains: impl IntoIterator<Item = String>,
    ) -> Result<Self, GatewayError> {
        let header = HeaderName::try_from(header).map_err(|e| {
            GatewayError::configuration(format!("Invalid user header name {header:?}: {e}"))
        })?;

        Ok(Self {
            header,
            allowed_domains: allowed_domains
                .into_iter()
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        })
    }

    /// Create a provider from the auth settings
    ///
    /// # Errors
    /// Returns a configuration error if the header name is invalid
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, GatewayError> {
        Self::new(&settings.user_header, settings.allowed_domains.iter().cloned())
    }

    fn domain_allowed(&self, identity: &UserIdentity) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        identity
            .domain()
            .is_some_and(|domain| self.allowed_domains.contains(&domain))
    }
}

#[async_trait]
impl SessionProvider for HeaderSessionProvider {
    async fn identify(&self, headers: &HeaderMap) -> Result<UserIdentity, GatewayError> {
        let email = headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GatewayError::unauthorized("Unauthorized"))?;

        let identity = UserIdentity {
            email: email.to_string(),
        };

        if !self.domain_allowed(&identity) {
            debug!(domain = ?identity.domain(), "User domain not in allow-list");
            return Err(GatewayError::forbidden("Email domain is not allowed"));
        }

        Ok(identity)
    }
}
