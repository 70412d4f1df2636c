//! Server configuration read from the environment.

use std::path::PathBuf;

use serde::Deserialize;
use storyteller_core::quota::{Entitlements, QuotaPolicy};
use storyteller_providers::deepgram::{DEFAULT_DEEPGRAM_BASE_URL, DeepgramConfig};
use storyteller_providers::xai::{DEFAULT_XAI_BASE_URL, DEFAULT_XAI_MODEL, XaiConfig};

use crate::error::AppError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_AUDIO_DIR: &str = "public/audio";

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub xai: XaiConfig,
    pub deepgram: DeepgramConfig,
    /// Directory synthesized audio is written to and served from.
    pub audio_dir: PathBuf,
    pub quota: QuotaPolicy,
}

/// Shape of the entitlements file. Classes left out keep their defaults.
#[derive(Debug, Default, Deserialize)]
struct EntitlementsFile {
    guest: Option<Entitlements>,
    regular: Option<Entitlements>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| AppError::Config(format!("{key} environment variable must be set")))
        };
        let optional =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => DEFAULT_PORT,
        };
        let quota = match lookup("ENTITLEMENTS_PATH") {
            Some(path) => load_entitlements(&path)?,
            None => QuotaPolicy::default(),
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: optional("HOST", DEFAULT_HOST),
            port,
            xai: XaiConfig {
                api_key: required("XAI_API_KEY")?,
                base_url: optional("XAI_BASE_URL", DEFAULT_XAI_BASE_URL),
                model: optional("XAI_MODEL", DEFAULT_XAI_MODEL),
            },
            deepgram: DeepgramConfig {
                api_key: required("DEEPGRAM_API_KEY")?,
                base_url: optional("DEEPGRAM_BASE_URL", DEFAULT_DEEPGRAM_BASE_URL),
            },
            audio_dir: PathBuf::from(optional("AUDIO_DIR", DEFAULT_AUDIO_DIR)),
            quota,
        })
    }
}

fn load_entitlements(path: &str) -> Result<QuotaPolicy, AppError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read entitlements file {path}: {e}")))?;
    parse_entitlements(&raw)
        .map_err(|e| AppError::Config(format!("invalid entitlements file {path}: {e}")))
}

fn parse_entitlements(raw: &str) -> Result<QuotaPolicy, serde_yaml::Error> {
    let file: EntitlementsFile = serde_yaml::from_str(raw)?;
    let defaults = QuotaPolicy::default();
    Ok(QuotaPolicy {
        guest: file.guest.unwrap_or(defaults.guest),
        regular: file.regular.unwrap_or(defaults.regular),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    fn minimal() -> HashMap<String, String> {
        env(&[
            ("DATABASE_URL", "postgres://localhost/storyteller"),
            ("XAI_API_KEY", "xai-key"),
            ("DEEPGRAM_API_KEY", "dg-key"),
        ])
    }

    #[test]
    fn test_defaults_apply_when_optional_variables_are_unset() {
        // Arrange
        let vars = minimal();

        // Act
        let config = AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();

        // Assert
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.xai.base_url, "https://api.x.ai/v1");
        assert_eq!(config.xai.model, "grok-3-mini-beta");
        assert_eq!(config.deepgram.base_url, "https://api.deepgram.com");
        assert_eq!(config.audio_dir, PathBuf::from("public/audio"));
        assert_eq!(config.quota, QuotaPolicy::default());
    }

    #[test]
    fn test_missing_database_url_is_a_config_error() {
        let mut vars = minimal();
        vars.remove("DATABASE_URL");

        let result = AppConfig::from_lookup(|key| vars.get(key).cloned());

        assert!(matches!(
            result,
            Err(AppError::Config(message)) if message.contains("DATABASE_URL")
        ));
    }

    #[test]
    fn test_invalid_port_is_a_config_error() {
        let mut vars = minimal();
        vars.insert("PORT".to_owned(), "eighty".to_owned());

        let result = AppConfig::from_lookup(|key| vars.get(key).cloned());

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_entitlements_override_only_listed_classes() {
        let quota = parse_entitlements("guest:\n  maxMessagesPerDay: 2\n").unwrap();

        assert_eq!(quota.guest.max_messages_per_day, 2);
        assert_eq!(quota.regular.max_messages_per_day, 20);
    }

    #[test]
    fn test_malformed_entitlements_are_rejected() {
        let result = parse_entitlements("guest: [not, a, map]");

        assert!(result.is_err());
    }
}
