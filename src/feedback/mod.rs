//! Append-only CSV log of human corrections.
//!
//! Columns are `timestamp,text,model_prediction,user_correction`. The file is
//! opened, appended and closed on every save, and each record goes out in a
//! single write so concurrent sessions never interleave inside a row.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::core::Sentiment;

pub const HEADER: [&str; 4] = ["timestamp", "text", "model_prediction", "user_correction"];

/// One row of the correction log.
///
/// Label columns are kept as strings: the log is an external file and the
/// retraining job validates them itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub timestamp: String,
    pub text: String,
    pub model_prediction: String,
    pub user_correction: String,
}

/// Outcome of a save, shown to the user as a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    MissingCorrection,
    MissingText,
    Failed(String),
}

impl SaveStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveStatus::Saved)
    }

    pub fn message(&self) -> String {
        match self {
            SaveStatus::Saved => "Correction saved. Thank you!".to_string(),
            SaveStatus::MissingCorrection => {
                "Please select the correct sentiment before saving.".to_string()
            }
            SaveStatus::MissingText => "There is no text to correct.".to_string(),
            SaveStatus::Failed(reason) => format!("Could not save the correction: {reason}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorrectionLog {
    path: PathBuf,
}

impl CorrectionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Record a correction of `model_prediction` for `text`.
    ///
    /// Never returns an error: validation problems and I/O failures come back
    /// as a [`SaveStatus`] and nothing is appended.
    pub fn save(
        &self,
        text: &str,
        model_prediction: Sentiment,
        user_correction: Option<Sentiment>,
    ) -> SaveStatus {
        let Some(correction) = user_correction else {
            return SaveStatus::MissingCorrection;
        };
        if text.trim().is_empty() {
            return SaveStatus::MissingText;
        }

        match self.append(text, model_prediction, correction) {
            Ok(()) => {
                tracing::info!(
                    "Saved correction {model_prediction} -> {correction} to {}",
                    self.path.display()
                );
                SaveStatus::Saved
            }
            Err(e) => {
                tracing::error!("Failed to save correction: {e:#}");
                SaveStatus::Failed(format!("{e:#}"))
            }
        }
    }

    fn append(&self, text: &str, model_prediction: Sentiment, correction: Sentiment) -> Result<()> {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("failed to format timestamp")?;
        let record = CorrectionRecord {
            timestamp,
            text: text.to_string(),
            model_prediction: model_prediction.as_str().to_string(),
            user_correction: correction.as_str().to_string(),
        };
        let mut row = encode_row(&record)?;

        self.ensure_header()?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("failed to stat {}", self.path.display()))?
            .len();
        if len == 0 {
            // Pre-existing empty file: the header goes out in the same write as the row.
            tracing::info!("Writing header to empty correction log {}", self.path.display());
            let mut buf = encode_header()?;
            buf.append(&mut row);
            row = buf;
        }
        file.write_all(&row)
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(())
    }

    /// Creates the log with its header row if it does not exist yet.
    ///
    /// The header is written to a temp file and linked into place without
    /// overwriting, so the file never becomes visible without its header.
    fn ensure_header(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let header = encode_header()?;
        let mut staged = tempfile::NamedTempFile::new_in(&parent)?;
        staged.write_all(&header)?;
        match staged.persist_noclobber(&self.path) {
            Ok(_) => {
                tracing::info!("Created correction log {}", self.path.display());
                Ok(())
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.error)
                .with_context(|| format!("failed to create {}", self.path.display())),
        }
    }

    pub fn read_records(&self) -> Result<Vec<CorrectionRecord>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: CorrectionRecord =
                row.with_context(|| format!("malformed row in {}", self.path.display()))?;
            records.push(record);
        }
        Ok(records)
    }
}

fn encode_header() -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to encode header: {}", e.error()))
}

fn encode_row(record: &CorrectionRecord) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.serialize(record)?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to encode correction row: {}", e.error()))
}
