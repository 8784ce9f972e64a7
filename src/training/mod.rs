//! Offline retraining on the correction log.
//!
//! ## Main Types
//!
//! - [`retrain`] - Validate the log, fine-tune the base model once, replace the artifact
//! - [`RetrainError`] - Data problems that abort a run before any artifact changes
//! - [`RetrainOutcome`] - Where the artifact went and how it scored
//!
//! Every failure leaves an existing fine-tuned artifact as it was.

pub mod data;
pub mod error;
pub mod lock;
pub mod trainer;

pub use data::{load_training_rows, split_rows, TrainingRow};
pub use error::RetrainError;
pub use lock::RunLock;
pub use trainer::{EpochSummary, FineTuner};

use std::fmt;
use std::path::PathBuf;

use crate::artifact::{persist_artifact, ArtifactSource};
use crate::core::Settings;
use crate::loaders::ModelFiles;
use crate::pipelines::utils::describe_device;

#[derive(Debug, Clone, PartialEq)]
pub struct RetrainOutcome {
    pub artifact_path: PathBuf,
    pub train_rows: usize,
    pub eval_rows: usize,
    pub eval_accuracy: f32,
}

impl fmt::Display for RetrainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Saved fine-tuned model to {}", self.artifact_path.display())?;
        writeln!(f, "Train rows: {}", self.train_rows)?;
        writeln!(f, "Eval rows: {}", self.eval_rows)?;
        write!(f, "Eval accuracy: {:.4}", self.eval_accuracy)
    }
}

/// Fine-tunes the base model on the correction log named in `settings` and
/// replaces `settings.fine_tuned_dir` with the result.
pub fn retrain(settings: &Settings) -> Result<RetrainOutcome, RetrainError> {
    retrain_with(settings, || {
        ModelFiles::locate(&ArtifactSource::Base).map_err(RetrainError::from)
    })
}

/// `base` is only called once the log has been read and validated, so data
/// errors never trigger a download.
pub(crate) fn retrain_with<F>(settings: &Settings, base: F) -> Result<RetrainOutcome, RetrainError>
where
    F: FnOnce() -> Result<ModelFiles, RetrainError>,
{
    let _lock = RunLock::acquire(&settings.retrain_lock_path())?;
    let training = &settings.training;

    let rows = load_training_rows(&settings.correction_log)?;
    if rows.is_empty() {
        return Err(RetrainError::NoUsableRows);
    }
    if rows.len() < training.min_rows_warning {
        tracing::warn!(
            "Only {} corrections available; training may not be effective. \
             Collect at least 10-20 before retraining.",
            rows.len()
        );
    }

    let (train_rows, eval_rows) = split_rows(rows, training.eval_fraction, training.seed);
    tracing::info!(
        "Split into {} train and {} eval rows",
        train_rows.len(),
        eval_rows.len()
    );

    let device = settings.device_request().resolve()?;
    let files = base()?;
    tracing::info!("Fine-tuning the base model on {}", describe_device(&device));
    let mut tuner = FineTuner::from_files(&files, &device)?;
    tuner.train(&train_rows, training)?;
    let eval_accuracy = tuner.accuracy(&eval_rows, training.batch_size)?;
    tracing::info!("Eval accuracy {eval_accuracy:.4}");

    let artifact_path = persist_artifact(&settings.fine_tuned_dir, |dir| tuner.save(dir))?;
    tracing::info!("Saved fine-tuned model to {}", artifact_path.display());

    Ok(RetrainOutcome {
        artifact_path,
        train_rows: train_rows.len(),
        eval_rows: eval_rows.len(),
        eval_accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{resolve_artifact, CONFIG_MARKER};
    use crate::core::{DevicePreference, Sentiment};
    use crate::feedback::CorrectionLog;
    use crate::pipelines::sentiment_analysis_pipeline::{
        SentimentAnalysisPipelineBuilder, SentimentClassifier,
    };
    use crate::test_support;
    use std::path::Path;

    fn settings_in(dir: &Path) -> Settings {
        Settings {
            correction_log: dir.join("flagged_data_corrected.csv"),
            fine_tuned_dir: dir.join("fine_tuned_model"),
            device: DevicePreference::Cpu,
            ..Settings::default()
        }
    }

    fn no_download() -> Result<ModelFiles, RetrainError> {
        panic!("base model must not be fetched")
    }

    #[test]
    fn missing_log_aborts_before_loading_a_model() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        assert!(matches!(
            retrain_with(&settings, no_download),
            Err(RetrainError::MissingLog(_))
        ));
        assert!(!settings.retrain_lock_path().exists());
    }

    #[test]
    fn invalid_label_leaves_the_existing_artifact_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        test_support::write_tiny_artifact(&settings.fine_tuned_dir);
        let before = std::fs::read(settings.fine_tuned_dir.join(CONFIG_MARKER)).unwrap();

        std::fs::write(
            &settings.correction_log,
            "timestamp,text,model_prediction,user_correction\n\
             2024-01-01T00:00:00Z,good,positive,negative\n\
             2024-01-01T00:00:01Z,meh,neutral,positivo\n",
        )
        .unwrap();

        let err = retrain_with(&settings, no_download).unwrap_err();
        assert!(matches!(err, RetrainError::InvalidLabel { .. }), "{err}");
        let after = std::fs::read(settings.fine_tuned_dir.join(CONFIG_MARKER)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn empty_log_has_no_usable_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        std::fs::write(
            &settings.correction_log,
            "timestamp,text,model_prediction,user_correction\n,,,\n",
        )
        .unwrap();
        assert!(matches!(
            retrain_with(&settings, no_download),
            Err(RetrainError::NoUsableRows)
        ));
    }

    #[test]
    fn concurrent_run_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        let _held = RunLock::acquire(&settings.retrain_lock_path()).unwrap();
        assert!(matches!(
            retrain_with(&settings, no_download),
            Err(RetrainError::Locked(_))
        ));
    }

    #[test]
    fn retrained_artifact_replaces_the_old_one_and_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        let base_dir = tmp.path().join("base");
        test_support::write_tiny_artifact(&base_dir);
        test_support::write_tiny_artifact(&settings.fine_tuned_dir);

        let log = CorrectionLog::new(&settings.correction_log);
        let samples = [
            ("good great", Sentiment::Positive),
            ("bad awful", Sentiment::Negative),
            ("the package arrived", Sentiment::Neutral),
            ("love it", Sentiment::Positive),
            ("hate it", Sentiment::Negative),
            ("it is ok", Sentiment::Neutral),
            ("great package", Sentiment::Positive),
        ];
        for (text, label) in samples {
            assert!(log.save(text, Sentiment::Neutral, Some(label)).is_saved());
        }

        let outcome = retrain_with(&settings, || {
            ModelFiles::from_dir(&base_dir).map_err(RetrainError::from)
        })
        .unwrap();
        assert_eq!(outcome.train_rows + outcome.eval_rows, 7);
        assert_eq!(outcome.eval_rows, 2);
        assert!(outcome.artifact_path.is_absolute());
        assert!(!settings.retrain_lock_path().exists());

        let source = resolve_artifact(Some(&settings.fine_tuned_dir));
        assert!(source.is_fine_tuned());
        let pipeline = SentimentAnalysisPipelineBuilder::new(source)
            .cpu()
            .build()
            .unwrap();
        let prediction = pipeline.classify("good").unwrap();
        assert!((0.0..=1.0).contains(&prediction.confidence));
    }
}
