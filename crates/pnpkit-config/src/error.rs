//! Error types for configuration loading.

use pnpkit_core::ConfigError;
use std::io;
use thiserror::Error;

/// Errors that can occur while loading a machine configuration file.
#[derive(Error, Debug)]
pub enum ConfigFileError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] io::Error),

    /// The configuration file is not valid TOML.
    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration parsed but its contents are inconsistent.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_passthrough() {
        let err: ConfigFileError = ConfigError::MissingConfig.into();
        assert_eq!(
            err.to_string(),
            "This machine backend needs a configuration (board origin, bed level, tapes)"
        );
    }
}
