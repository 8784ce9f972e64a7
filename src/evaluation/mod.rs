//! Accuracy and per-class reports for a [`SentimentClassifier`] over labeled text.
//!
//! Used by the benchmark command (large seeded sample), the drift monitor
//! (small curated sets) and the retraining job's post-epoch check.

pub mod dataset;
pub mod drift;
pub mod golden;
pub mod metrics;

pub use dataset::{load_labeled_csv, seeded_sample, RawSample};
pub use drift::{check_drift, DriftAlert};
pub use metrics::{ClassStats, ClassificationReport, ConfusionMatrix};

use std::fmt;

use crate::core::Sentiment;
use crate::pipelines::sentiment_analysis_pipeline::SentimentClassifier;

/// Text with its ground-truth label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSample {
    pub text: String,
    pub label: Sentiment,
}

impl LabeledSample {
    pub fn new(text: impl Into<String>, label: Sentiment) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }

    /// Accepts a label name in any case, or a column index such as `"2"`.
    /// Returns `None` when the label is outside the label set.
    pub fn from_raw(text: impl Into<String>, label: &str) -> Option<Self> {
        let label = label.parse::<Sentiment>().ok().or_else(|| {
            label
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(Sentiment::from_index)
        })?;
        Some(Self::new(text, label))
    }
}

/// Keeps the samples whose label belongs to the label set.
pub fn normalize_samples<I>(raw: I) -> Vec<LabeledSample>
where
    I: IntoIterator<Item = RawSample>,
{
    let mut dropped = 0usize;
    let samples: Vec<_> = raw
        .into_iter()
        .filter_map(|r| {
            let sample = LabeledSample::from_raw(r.text, &r.label);
            if sample.is_none() {
                dropped += 1;
            }
            sample
        })
        .collect();
    if dropped > 0 {
        tracing::warn!("Dropped {dropped} samples with labels outside the label set");
    }
    samples
}

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub accuracy: f32,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
}

impl EvaluationReport {
    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        let report = ClassificationReport::from_confusion(&confusion);
        Self {
            accuracy: confusion.accuracy(),
            confusion,
            report,
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.confusion.total()
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Accuracy: {:.4} ({} samples)",
            self.accuracy,
            self.sample_count()
        )?;
        writeln!(f)?;
        writeln!(f, "Classification report:")?;
        write!(f, "{}", self.report)?;
        writeln!(f)?;
        writeln!(f, "Confusion matrix:")?;
        write!(f, "{}", self.confusion)
    }
}

/// Runs `classifier` over every sample and scores the predictions.
pub fn evaluate<C>(classifier: &C, samples: &[LabeledSample]) -> anyhow::Result<EvaluationReport>
where
    C: SentimentClassifier + ?Sized,
{
    if samples.is_empty() {
        anyhow::bail!("no labeled samples to evaluate");
    }

    tracing::info!("Evaluating {} samples", samples.len());
    let texts: Vec<&str> = samples.iter().map(|s| s.text.as_str()).collect();
    let predictions = classifier.classify_batch(&texts)?;
    if predictions.len() != samples.len() {
        anyhow::bail!(
            "classifier returned {} predictions for {} inputs",
            predictions.len(),
            samples.len()
        );
    }

    let mut confusion = ConfusionMatrix::new();
    for (sample, prediction) in samples.iter().zip(&predictions) {
        confusion.add(sample.label, prediction.label);
    }
    Ok(EvaluationReport::from_confusion(confusion))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipelines::sentiment_analysis_pipeline::Prediction;

    /// Labels text by keyword, defaulting to neutral.
    pub(crate) struct KeywordClassifier;

    impl SentimentClassifier for KeywordClassifier {
        fn classify_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Prediction>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    let scores = if lower.contains("love") || lower.contains("great") {
                        [0.1, 0.1, 0.8]
                    } else if lower.contains("hate") || lower.contains("awful") {
                        [0.8, 0.1, 0.1]
                    } else {
                        [0.1, 0.8, 0.1]
                    };
                    Prediction::from_scores(*t, scores)
                })
                .collect())
        }
    }

    #[test]
    fn from_raw_accepts_names_and_indices() {
        assert_eq!(
            LabeledSample::from_raw("x", "Positive").map(|s| s.label),
            Some(Sentiment::Positive)
        );
        assert_eq!(
            LabeledSample::from_raw("x", "0").map(|s| s.label),
            Some(Sentiment::Negative)
        );
        assert!(LabeledSample::from_raw("x", "mixed").is_none());
        assert!(LabeledSample::from_raw("x", "3").is_none());
    }

    #[test]
    fn unknown_ground_truth_labels_are_dropped() {
        let raw = vec![
            RawSample::new("I love it", "POSITIVE"),
            RawSample::new("meh", "sarcastic"),
            RawSample::new("I hate it", "negative"),
        ];
        let samples = normalize_samples(raw);
        assert_eq!(samples.len(), 2);

        let report = evaluate(&KeywordClassifier, &samples).unwrap();
        assert_eq!(report.sample_count(), 2);
        assert!((report.accuracy - 1.0).abs() < 1e-6);
    }

    #[test]
    fn evaluate_scores_mistakes() {
        let samples = vec![
            LabeledSample::new("great stuff", Sentiment::Positive),
            LabeledSample::new("the box is blue", Sentiment::Neutral),
            LabeledSample::new("love waiting two hours", Sentiment::Negative),
            LabeledSample::new("awful", Sentiment::Negative),
        ];
        let report = evaluate(&KeywordClassifier, &samples).unwrap();
        assert!((report.accuracy - 0.75).abs() < 1e-6);
        assert_eq!(
            report.confusion.get(Sentiment::Negative, Sentiment::Positive),
            1
        );
        assert!(report.to_string().contains("Accuracy: 0.7500"));
    }

    #[test]
    fn empty_sample_is_an_error() {
        assert!(evaluate(&KeywordClassifier, &[]).is_err());
    }
}
