//! Which model artifact to load, and how a new one replaces the old.
//!
//! Every entry point goes through [`resolve_artifact`]; nothing else checks
//! for the fine-tuned directory.

use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::MODEL_NAME;

/// Presence of this file marks a directory as a loadable artifact.
pub const CONFIG_MARKER: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// The pretrained base model on the Hugging Face Hub.
    Base,
    /// A local fine-tuned directory, stored as an absolute path.
    FineTuned(PathBuf),
}

impl ArtifactSource {
    pub fn is_fine_tuned(&self) -> bool {
        matches!(self, ArtifactSource::FineTuned(_))
    }
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactSource::Base => write!(f, "base model {MODEL_NAME}"),
            ArtifactSource::FineTuned(path) => write!(f, "fine-tuned model at {}", path.display()),
        }
    }
}

pub fn is_valid_artifact(dir: &Path) -> bool {
    dir.is_dir() && dir.join(CONFIG_MARKER).is_file()
}

/// Sibling directory that holds the previous artifact while a new one is swapped in.
fn backup_path(target: &Path) -> Option<PathBuf> {
    let name = target.file_name()?.to_string_lossy();
    Some(target.with_file_name(format!(".{name}.previous")))
}

/// Moves a valid backup back to `target` when a swap was interrupted after the
/// old artifact was moved aside. Returns whether anything was restored.
pub fn recover_interrupted_swap(target: &Path) -> Result<bool> {
    if target.exists() {
        return Ok(false);
    }
    let Some(backup) = backup_path(target) else {
        return Ok(false);
    };
    if !is_valid_artifact(&backup) {
        return Ok(false);
    }
    fs::rename(&backup, target).with_context(|| {
        format!("failed to restore {} from {}", target.display(), backup.display())
    })?;
    tracing::warn!(
        "Restored artifact {} from interrupted swap backup {}",
        target.display(),
        backup.display()
    );
    Ok(true)
}

/// Picks the fine-tuned directory if it exists and carries [`CONFIG_MARKER`],
/// otherwise the base model. An artifact left aside by an interrupted swap is
/// moved back first.
pub fn resolve_artifact(fine_tuned_dir: Option<&Path>) -> ArtifactSource {
    if let Some(dir) = fine_tuned_dir {
        if let Err(e) = recover_interrupted_swap(dir) {
            tracing::warn!("{e:#}");
        }
    }
    let source = match fine_tuned_dir {
        Some(dir) if is_valid_artifact(dir) => match std::path::absolute(dir) {
            Ok(abs) => ArtifactSource::FineTuned(abs),
            Err(e) => {
                tracing::warn!("Could not make {} absolute ({e}); using base model", dir.display());
                ArtifactSource::Base
            }
        },
        Some(dir) => {
            tracing::debug!("No valid artifact at {}", dir.display());
            ArtifactSource::Base
        }
        None => ArtifactSource::Base,
    };
    tracing::info!("Selected {source}");
    source
}

/// Writes a new artifact into a staging directory next to `target`, then swaps
/// it into place.
///
/// `write` fills the staging directory. If it fails, or leaves no
/// [`CONFIG_MARKER`], the staging directory is discarded and any existing
/// artifact at `target` is untouched. Returns the absolute target path.
pub fn persist_artifact<F>(target: &Path, write: F) -> Result<PathBuf>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = target
        .file_name()
        .with_context(|| format!("artifact path {} has no file name", target.display()))?
        .to_string_lossy()
        .into_owned();
    fs::create_dir_all(&parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    recover_interrupted_swap(target)?;

    let staging = tempfile::Builder::new()
        .prefix(&format!(".{name}.staging-"))
        .tempdir_in(&parent)
        .with_context(|| format!("failed to create staging directory in {}", parent.display()))?;

    write(staging.path())?;
    if !is_valid_artifact(staging.path()) {
        anyhow::bail!("staged artifact is missing {CONFIG_MARKER}");
    }

    let backup = backup_path(target)
        .with_context(|| format!("artifact path {} has no file name", target.display()))?;
    if backup.exists() {
        fs::remove_dir_all(&backup)
            .with_context(|| format!("failed to clear stale backup {}", backup.display()))?;
    }

    let had_previous = target.exists();
    if had_previous {
        fs::rename(target, &backup)
            .with_context(|| format!("failed to move aside {}", target.display()))?;
    }

    if let Err(e) = fs::rename(staging.path(), target) {
        if had_previous {
            if let Err(restore) = fs::rename(&backup, target) {
                tracing::error!(
                    "Failed to restore previous artifact from {}: {restore}",
                    backup.display()
                );
            }
        }
        return Err(e).with_context(|| format!("failed to move new artifact to {}", target.display()));
    }

    if had_previous {
        if let Err(e) = fs::remove_dir_all(&backup) {
            tracing::warn!("Could not remove previous artifact {}: {e}", backup.display());
        }
    }

    std::path::absolute(target).context("failed to resolve artifact path")
}
