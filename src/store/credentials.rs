// Per-provider API key storage

use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use super::{now_timestamp, Database};
use crate::error::StoreError;
use crate::resolver::Provider;

/// User supplied provider keys; empty string means "not configured"
#[derive(Clone, Default, PartialEq)]
pub struct ApiKeySet {
    pub openai: String,
    pub anthropic: String,
    pub google: String,
}

impl ApiKeySet {
    /// Key for a provider; OpenRouter keys are never user supplied
    pub fn get(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAI => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Google => &self.google,
            Provider::OpenRouter => "",
        }
    }

    fn slot(&mut self, provider: Provider) -> Option<&mut String> {
        match provider {
            Provider::OpenAI => Some(&mut self.openai),
            Provider::Anthropic => Some(&mut self.anthropic),
            Provider::Google => Some(&mut self.google),
            Provider::OpenRouter => None,
        }
    }

    /// Which providers have a key, without exposing the keys
    pub fn status(&self) -> KeyStatus {
        KeyStatus {
            openai: !self.openai.trim().is_empty(),
            anthropic: !self.anthropic.trim().is_empty(),
            google: !self.google.trim().is_empty(),
        }
    }
}

impl std::fmt::Debug for ApiKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeySet")
            .field("status", &self.status())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeyStatus {
    pub openai: bool,
    pub anthropic: bool,
    pub google: bool,
}

/// Holds per-provider API keys
pub trait CredentialStore: Send + Sync {
    /// Stored key, or an empty string when none is set
    fn get(&self, provider: Provider) -> Result<String, StoreError>;

    /// Insert or replace the key for a provider
    fn save(&self, provider: Provider, key: &str) -> Result<(), StoreError>;

    /// Remove the key for a provider; removing a missing key is not an error
    fn delete(&self, provider: Provider) -> Result<(), StoreError>;

    /// All user keys at once
    fn load(&self) -> Result<ApiKeySet, StoreError> {
        let mut keys = ApiKeySet::default();
        for provider in USER_PROVIDERS {
            if let Some(slot) = keys.slot(provider) {
                *slot = self.get(provider)?;
            }
        }
        Ok(keys)
    }
}

/// Providers whose keys users may store
const USER_PROVIDERS: [Provider; 3] = [Provider::OpenAI, Provider::Anthropic, Provider::Google];

fn check_user_provider(provider: Provider) -> Result<(), StoreError> {
    if USER_PROVIDERS.contains(&provider) {
        Ok(())
    } else {
        Err(StoreError::Invalid(format!(
            "{} keys are managed by the deployment and cannot be stored",
            provider.display_name()
        )))
    }
}

/// SQLite-backed credential store
#[derive(Clone)]
pub struct SqliteCredentialStore {
    db: Database,
}

impl SqliteCredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn get(&self, provider: Provider) -> Result<String, StoreError> {
        let conn = self.db.lock()?;
        let key: Option<String> = conn
            .query_row(
                "SELECT api_key FROM api_keys WHERE provider = ?",
                [provider.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(key.unwrap_or_default())
    }

    fn save(&self, provider: Provider, key: &str) -> Result<(), StoreError> {
        check_user_provider(provider)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(StoreError::Invalid("API key cannot be empty".to_string()));
        }

        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO api_keys (provider, api_key, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(provider) DO UPDATE SET api_key = excluded.api_key, updated_at = excluded.updated_at",
            params![provider.as_str(), key, now_timestamp()],
        )?;
        tracing::info!(provider = %provider, "Saved API key");
        Ok(())
    }

    fn delete(&self, provider: Provider) -> Result<(), StoreError> {
        check_user_provider(provider)?;
        let conn = self.db.lock()?;
        let removed = conn.execute(
            "DELETE FROM api_keys WHERE provider = ?",
            [provider.as_str()],
        )?;
        tracing::info!(provider = %provider, removed, "Deleted API key");
        Ok(())
    }
}
