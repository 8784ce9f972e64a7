//! Fixed model identity plus the runtime settings shared by every entry point.
//!
//! The model identifier and label set are compile-time constants. Paths and
//! training hyperparameters come from an optional `sentiment.toml` in the
//! working directory; a missing file yields [`Settings::default`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ConfigError;
use crate::pipelines::utils::DeviceRequest;

/// Base model repository on the Hugging Face Hub.
pub const MODEL_NAME: &str = "cardiffnlp/twitter-roberta-base-sentiment-latest";

/// Settings file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "sentiment.toml";

/// Accuracy below which the drift monitor raises an alert.
pub const DRIFT_THRESHOLD: f32 = 0.65;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// CUDA, then Metal, then CPU.
    #[default]
    Auto,
    Cpu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub correction_log: PathBuf,
    pub fine_tuned_dir: PathBuf,
    /// Labeled CSV (`text,label`) used by the benchmark command.
    pub benchmark_dataset: PathBuf,
    pub benchmark_sample_size: usize,
    pub sample_seed: u64,
    pub drift_threshold: f32,
    pub device: DevicePreference,
    pub training: TrainingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            correction_log: PathBuf::from("flagged_data_corrected.csv"),
            fine_tuned_dir: PathBuf::from("fine_tuned_model"),
            benchmark_dataset: PathBuf::from("data/tweet_eval_sentiment_test.csv"),
            benchmark_sample_size: 1000,
            sample_seed: 42,
            drift_threshold: DRIFT_THRESHOLD,
            device: DevicePreference::Auto,
            training: TrainingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub eval_fraction: f64,
    pub seed: u64,
    pub logging_steps: usize,
    /// Below this many usable rows the job warns but still runs.
    pub min_rows_warning: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            learning_rate: 1e-5,
            epochs: 1,
            batch_size: 4,
            eval_fraction: 0.2,
            seed: 42,
            logging_steps: 10,
            min_rows_warning: 5,
        }
    }
}

impl Settings {
    /// Load `sentiment.toml` from the working directory, or defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE_NAME))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No settings file at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn device_request(&self) -> DeviceRequest {
        match self.device {
            DevicePreference::Auto => DeviceRequest::Default,
            DevicePreference::Cpu => DeviceRequest::Cpu,
        }
    }

    /// Lock file guarding concurrent retraining runs against the same artifact.
    pub fn retrain_lock_path(&self) -> PathBuf {
        let mut name = self
            .fine_tuned_dir
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "fine_tuned_model".into());
        name.push(".lock");
        self.fine_tuned_dir.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("sentiment.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.drift_threshold, 0.65);
        assert_eq!(settings.training.learning_rate, 1e-5);
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentiment.toml");
        std::fs::write(
            &path,
            "correction_log = \"logs/corrections.csv\"\ndevice = \"cpu\"\n\n[training]\nbatch_size = 8\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.correction_log, PathBuf::from("logs/corrections.csv"));
        assert_eq!(settings.device, DevicePreference::Cpu);
        assert_eq!(settings.training.batch_size, 8);
        assert_eq!(settings.training.epochs, 1);
        assert_eq!(settings.fine_tuned_dir, PathBuf::from("fine_tuned_model"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentiment.toml");
        std::fs::write(&path, "benchmark_sample_size = \"lots\"").unwrap();
        assert!(matches!(
            Settings::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn lock_path_sits_next_to_the_artifact() {
        let settings = Settings {
            fine_tuned_dir: PathBuf::from("models/fine_tuned_model"),
            ..Settings::default()
        };
        assert_eq!(
            settings.retrain_lock_path(),
            PathBuf::from("models/fine_tuned_model.lock")
        );
    }
}
