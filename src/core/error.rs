use std::path::PathBuf;

use thiserror::Error;

/// A label string that does not belong to the sentiment label set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("unknown sentiment label `{0}` (expected negative, neutral or positive)")]
    Unknown(String),
}

/// Failure while reading `sentiment.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
