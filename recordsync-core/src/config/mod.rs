//! Configuration management for recordsync
//!
//! Defaults, overridable from a TOML file or from environment variables
//! of the form `RECORDSYNC_<KEY>`.

use crate::core_records::{ChangeScope, ScopeRules};
use crate::logging::{LogConfig, LogLevel};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Record synchronization settings
    #[serde(default)]
    pub records: RecordsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which records are forwarded to the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Boolean record property marking local-only records
    pub locked_field: String,

    /// Record scope whose user edits are written to the document
    pub sync_scope: ChangeScope,

    /// Record type prefixes in session scope (view state, never synchronized)
    pub session_types: Vec<String>,

    /// Record type prefixes in presence scope
    pub presence_types: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        let rules = ScopeRules::default();
        Self {
            locked_field: "isLocked".to_string(),
            sync_scope: ChangeScope::Document,
            session_types: rules.session_types,
            presence_types: rules.presence_types,
        }
    }
}

impl RecordsConfig {
    /// Classification rules for `sync_scope` filtering
    pub fn scope_rules(&self) -> ScopeRules {
        ScopeRules { session_types: self.session_types.clone(), presence_types: self.presence_types.clone() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json_format: false, with_timestamp: true, with_target: true }
    }
}

impl LoggingConfig {
    /// Subscriber settings for `init_logging_with_config`
    pub fn to_log_config(&self) -> Result<LogConfig, ConfigError> {
        let level: LogLevel = self
            .level
            .parse()
            .map_err(|_| ConfigError::invalid("logging.level", format!("unknown level '{}'", self.level)))?;
        Ok(LogConfig::new(level)
            .json_format(self.json_format)
            .with_timestamp(self.with_timestamp)
            .with_target(self.with_target))
    }
}

impl Config {
    /// Defaults overridden from environment variables
    ///
    /// Example: RECORDSYNC_LOCKED_FIELD=localOnly
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from the environment, leaving unset ones alone
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(field) = env::var("RECORDSYNC_LOCKED_FIELD") {
            self.records.locked_field = field;
        }
        if let Ok(scope) = env::var("RECORDSYNC_SYNC_SCOPE") {
            self.records.sync_scope =
                scope.parse().map_err(|reason| ConfigError::Env { var: "RECORDSYNC_SYNC_SCOPE", reason })?;
        }
        if let Ok(types) = env::var("RECORDSYNC_SESSION_TYPES") {
            self.records.session_types = split_list(&types);
        }
        if let Ok(types) = env::var("RECORDSYNC_PRESENCE_TYPES") {
            self.records.presence_types = split_list(&types);
        }

        if let Ok(level) = env::var("RECORDSYNC_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = env::var("RECORDSYNC_LOG_JSON") {
            self.logging.json_format = json.parse().map_err(|e: std::str::ParseBoolError| ConfigError::Env {
                var: "RECORDSYNC_LOG_JSON",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

        let config: Self = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.records.locked_field.trim().is_empty() {
            return Err(ConfigError::invalid("records.locked_field", "must not be empty"));
        }

        let mut types = self.records.session_types.iter().chain(&self.records.presence_types);
        if types.any(|t| t.is_empty() || t.contains(':')) {
            return Err(ConfigError::invalid("records.session_types", "type prefixes must be non-empty and contain no ':'"));
        }
        if let Some(shared) = self.records.session_types.iter().find(|t| self.records.presence_types.contains(*t)) {
            return Err(ConfigError::invalid(
                "records.presence_types",
                format!("'{}' is also listed as a session type", shared),
            ));
        }

        if LogLevel::parse(&self.logging.level).is_none() {
            return Err(ConfigError::invalid("logging.level", format!("unknown level '{}'", self.logging.level)));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|t| !t.is_empty()).map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.records.locked_field, "isLocked");
        assert_eq!(config.records.sync_scope, ChangeScope::Document);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.records.locked_field = "  ".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "warning".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recordsync.toml");

        let mut config = Config::default();
        config.records.locked_field = "localOnly".to_string();
        config.records.sync_scope = ChangeScope::All;
        config.logging.json_format = true;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[records]\nlocked_field = \"draft\"\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.records.locked_field, "draft");
        assert_eq!(loaded.records.sync_scope, ChangeScope::Document);
        assert_eq!(loaded.logging, LoggingConfig::default());
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Config::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "records = [").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_to_log_config() {
        let logging = LoggingConfig { level: "debug".to_string(), ..LoggingConfig::default() };
        let log_config = logging.to_log_config().unwrap();
        assert_eq!(log_config.level, LogLevel::Debug);

        let bad = LoggingConfig { level: "loud".to_string(), ..LoggingConfig::default() };
        assert!(matches!(bad.to_log_config(), Err(ConfigError::Invalid { field: "logging.level", .. })));
    }

    #[test]
    fn test_scope_types_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scopes.toml");
        std::fs::write(&path, "[records]\nsession_types = [\"cursor\", \"viewport\"]\npresence_types = []\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        let rules = loaded.records.scope_rules();
        assert_eq!(rules.classify(&"viewport:1".into()), ChangeScope::Session);
        assert_eq!(rules.classify(&"camera:1".into()), ChangeScope::Document);
        assert_eq!(rules.classify(&"instance_presence:u1".into()), ChangeScope::Document);
    }

    #[test]
    fn test_overlapping_scope_types_rejected() {
        let mut config = Config::default();
        config.records.presence_types.push("camera".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "records.presence_types", .. })));

        let mut config = Config::default();
        config.records.session_types.push("bad:prefix".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" cursor, viewport ,,"), vec!["cursor".to_string(), "viewport".to_string()]);
    }
}
