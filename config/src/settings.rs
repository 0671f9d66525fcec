//! Application settings management

use crate::{crypto, PathManager};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

/// Application settings stored in settings.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Owner of the local thread database. Defaults to the OS username
    /// when unset.
    pub resource_id: Option<String>,
    /// Whether web search starts enabled for new sessions
    #[serde(default)]
    pub web_search: bool,
    /// Model used by the search provider (e.g. "sonar")
    pub search_model: Option<String>,
    /// Override for the search provider's base URL
    pub search_base_url: Option<String>,
    /// Encrypted API keys (provider name -> encrypted key)
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = PathManager::settings_path() else {
            return Self::default();
        };

        let Ok(content) = fs::read_to_string(&path) else {
            return Self::default();
        };

        toml::from_str(&content).unwrap_or_default()
    }

    /// Save settings to the settings file
    pub fn save(&self) -> Result<(), String> {
        let path = PathManager::settings_path().ok_or("Could not determine settings path")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(&path, content).map_err(|e| format!("Failed to write settings: {}", e))?;
        Ok(())
    }

    /// The effective resource id for this install.
    pub fn resource_id(&self) -> String {
        self.resource_id
            .clone()
            .unwrap_or_else(whoami::username)
    }

    /// Get a decrypted API key for a provider.
    /// Returns None if not set or decryption fails.
    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        self.api_keys
            .get(provider)
            .and_then(|encrypted| crypto::decrypt_string(encrypted).ok())
    }

    /// Set an API key for a provider (encrypts before storing).
    pub fn set_api_key(&mut self, provider: &str, api_key: &str) -> Result<(), String> {
        let encrypted = crypto::encrypt_string(api_key)?;
        self.api_keys.insert(provider.to_string(), encrypted);
        Ok(())
    }

    /// Remove an API key for a provider.
    pub fn remove_api_key(&mut self, provider: &str) {
        self.api_keys.remove(provider);
    }

    /// Check if an API key is set for a provider.
    pub fn has_api_key(&self, provider: &str) -> bool {
        self.api_keys.contains_key(provider)
    }

    /// Get the list of providers with configured API keys.
    pub fn configured_providers(&self) -> Vec<String> {
        self.api_keys.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_round_trip() {
        let mut settings = Settings::default();
        settings.set_api_key("perplexity", "pplx-12345").unwrap();
        assert!(settings.has_api_key("perplexity"));
        // Stored form is encrypted, not the raw key
        assert_ne!(settings.api_keys["perplexity"], "pplx-12345");
        assert_eq!(
            settings.get_api_key("perplexity").as_deref(),
            Some("pplx-12345")
        );

        settings.remove_api_key("perplexity");
        assert!(!settings.has_api_key("perplexity"));
    }

    #[test]
    fn test_resource_id_defaults_to_username() {
        let settings = Settings::default();
        assert!(!settings.resource_id().is_empty());

        let named = Settings {
            resource_id: Some("traveler".to_string()),
            ..Default::default()
        };
        assert_eq!(named.resource_id(), "traveler");
    }
}
