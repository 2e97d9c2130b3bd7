//! Per-user preferences.
//!
//! Preferences hold the user's provider choice and any keys they bring. The
//! gateway reads and writes them through a [`PreferenceStore`]; persistence
//! lives behind that trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_core::{GatewayError, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;

/// How the provider is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceMode {
    /// The gateway picks
    #[default]
    Auto,
    /// The user picks `selected_llm`
    Manual,
}

/// Stored preferences for one user.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    /// Selection mode
    pub mode: PreferenceMode,
    /// Provider chosen in manual mode
    #[serde(rename = "selectedLLM")]
    pub selected_llm: Option<ProviderKind>,
    /// User's own OpenAI key
    pub openai_api_key: String,
    /// User's own Gemini key
    pub gemini_api_key: String,
    /// User's own Anthropic key
    pub claude_api_key: String,
    /// User's own Perplexity key
    pub perplexity_api_key: String,
    /// Last write, set by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserPreferences {
    /// The user's key for a provider, if set
    #[must_use]
    pub fn api_key(&self, provider: ProviderKind) -> Option<&str> {
        let key = match provider {
            ProviderKind::ChatGpt => &self.openai_api_key,
            ProviderKind::Gemini => &self.gemini_api_key,
            ProviderKind::Claude => &self.claude_api_key,
            ProviderKind::Perplexity => &self.perplexity_api_key,
        };
        (!key.trim().is_empty()).then_some(key.as_str())
    }
}

impl fmt::Debug for UserPreferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.api_key(*kind).is_some())
            .map(ProviderKind::as_str)
            .collect();

        f.debug_struct("UserPreferences")
            .field("mode", &self.mode)
            .field("selected_llm", &self.selected_llm)
            .field("keys_for", &keys)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Storage for user preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Preferences for a user, if any were saved
    async fn get(&self, user_id: &str) -> Result<Option<UserPreferences>, GatewayError>;

    /// Insert or replace a user's preferences, returning what was stored
    async fn upsert(
        &self,
        user_id: &str,
        preferences: UserPreferences,
    ) -> Result<UserPreferences, GatewayError>;
}

/// Process-local preference store.
#[derive(Default)]
pub struct InMemoryPreferenceStore {
    entries: RwLock<HashMap<String, UserPreferences>>,
}

impl InMemoryPreferenceStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserPreferences>, GatewayError> {
        Ok(self.entries.read().await.get(user_id).cloned())
    }

    async fn upsert(
        &self,
        user_id: &str,
        mut preferences: UserPreferences,
    ) -> Result<UserPreferences, GatewayError> {
        preferences.updated_at = Some(Utc::now());
        self.entries
            .write()
            .await
            .insert(user_id.to_string(), preferences.clone());
        Ok(preferences)
    }
}
