use std::path::PathBuf;

use thiserror::Error;

/// Why a retraining run stopped. None of these touch an existing artifact.
#[derive(Debug, Error)]
pub enum RetrainError {
    #[error("correction log {0} does not exist; collect some corrections with the app first")]
    MissingLog(PathBuf),

    #[error("failed to read correction log {path}: {source}")]
    ReadLog {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("correction log {path} has no `{column}` column")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error(
        "invalid label `{label}` on line {line} of the correction log \
         (expected negative, neutral or positive)"
    )]
    InvalidLabel { line: u64, label: String },

    #[error("correction log has no usable rows")]
    NoUsableRows,

    #[error("another retraining run holds {0}; remove it if no run is active")]
    Locked(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Model(#[from] anyhow::Error),
}
