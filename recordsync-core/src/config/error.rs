//! Errors raised while loading, overriding or saving a recordsync config

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode config as TOML: {0}")]
    Encode(#[from] toml::ser::Error),

    /// A `RECORDSYNC_*` variable holds a value that does not parse
    #[error("{var}: {reason}")]
    Env { var: &'static str, reason: String },

    /// A setting parsed but is not usable
    #[error("invalid records/logging setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { field, reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_setting() {
        let err = ConfigError::invalid("locked_field", "must not be empty");
        assert_eq!(err.to_string(), "invalid records/logging setting `locked_field`: must not be empty");

        let err = ConfigError::Env { var: "RECORDSYNC_SYNC_SCOPE", reason: "unknown change scope 'x'".to_string() };
        assert!(err.to_string().starts_with("RECORDSYNC_SYNC_SCOPE"));
    }

    #[test]
    fn test_read_error_keeps_path_and_source() {
        let err = ConfigError::Read {
            path: PathBuf::from("/etc/recordsync.toml"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/etc/recordsync.toml"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
