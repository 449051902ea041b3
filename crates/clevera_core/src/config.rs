//! Runtime configuration for the sync layer.
//!
//! # Responsibility
//! - Describe the store namespace layout and profile defaults.
//! - Load configuration from JSON with every field defaulted.
//!
//! # Invariants
//! - A validated config never yields an invalid store path segment.
//! - `experience_per_level` is always positive after validation.

use crate::logging::LoggingConfig;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Errors from loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Sync layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Top-level collection holding one document per user.
    pub namespace_root: String,
    pub profile_collection: String,
    pub profile_document: String,
    pub topics_collection: String,
    pub sets_collection: String,
    pub terms_collection: String,
    /// Used when the identity carries no display name.
    pub default_display_name: String,
    pub experience_per_level: u64,
    pub logging: LoggingConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            namespace_root: "users".to_string(),
            profile_collection: "userProfile".to_string(),
            profile_document: "profile".to_string(),
            topics_collection: "topics".to_string(),
            sets_collection: "sets".to_string(),
            terms_collection: "terms".to_string(),
            default_display_name: "New User".to_string(),
            experience_per_level: 100,
            logging: LoggingConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let segments = [
            ("namespace_root", &self.namespace_root),
            ("profile_collection", &self.profile_collection),
            ("profile_document", &self.profile_document),
            ("topics_collection", &self.topics_collection),
            ("sets_collection", &self.sets_collection),
            ("terms_collection", &self.terms_collection),
        ];
        for (field, value) in segments {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("`{field}` must not be blank")));
            }
            if value.contains('/') {
                return Err(ConfigError::Invalid(format!(
                    "`{field}` must be a single path segment, got `{value}`"
                )));
            }
        }
        if self.experience_per_level == 0 {
            return Err(ConfigError::Invalid(
                "`experience_per_level` must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
