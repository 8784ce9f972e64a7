//! Accuracy-threshold drift check. The alert is advisory; nothing acts on it.

use std::fmt;

use super::{evaluate, EvaluationReport, LabeledSample};
use crate::pipelines::sentiment_analysis_pipeline::SentimentClassifier;

#[derive(Debug, Clone)]
pub struct DriftAlert {
    pub accuracy: f32,
    pub threshold: f32,
    /// `accuracy < threshold`.
    pub triggered: bool,
    pub report: EvaluationReport,
}

impl fmt::Display for DriftAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy on new data: {:.4}", self.accuracy)?;
        writeln!(f, "Minimum accuracy threshold: {:.2}", self.threshold)?;
        if self.triggered {
            writeln!(f, "ALERT: performance drift detected, accuracy fell below the threshold.")?;
            write!(f, "Consider retraining the model.")
        } else {
            write!(f, "OK: model performance is stable.")
        }
    }
}

/// Evaluates `samples` and compares accuracy with `threshold`.
///
/// Returns `Ok(None)` when there are no samples to score.
pub fn check_drift<C>(
    classifier: &C,
    samples: &[LabeledSample],
    threshold: f32,
) -> anyhow::Result<Option<DriftAlert>>
where
    C: SentimentClassifier + ?Sized,
{
    if samples.is_empty() {
        tracing::warn!("No valid samples for the drift check");
        return Ok(None);
    }

    let report = evaluate(classifier, samples)?;
    let triggered = report.accuracy < threshold;
    if triggered {
        tracing::warn!(
            "Accuracy {:.4} is below the drift threshold {threshold:.2}",
            report.accuracy
        );
    } else {
        tracing::info!(
            "Accuracy {:.4} meets the drift threshold {threshold:.2}",
            report.accuracy
        );
    }

    Ok(Some(DriftAlert {
        accuracy: report.accuracy,
        threshold,
        triggered,
        report,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Sentiment, DRIFT_THRESHOLD};
    use crate::evaluation::golden::flagged_samples;
    use crate::evaluation::tests::KeywordClassifier;

    #[test]
    fn no_samples_means_no_alert() {
        assert!(check_drift(&KeywordClassifier, &[], DRIFT_THRESHOLD)
            .unwrap()
            .is_none());
    }

    #[test]
    fn sarcasm_trips_a_keyword_model() {
        let alert = check_drift(&KeywordClassifier, &flagged_samples(), DRIFT_THRESHOLD)
            .unwrap()
            .unwrap();
        assert!(alert.triggered);
        assert!(alert.accuracy < DRIFT_THRESHOLD);
        assert!(alert.to_string().contains("ALERT"));
    }

    #[test]
    fn accurate_model_is_stable() {
        let samples = vec![
            LabeledSample::new("I love it", Sentiment::Positive),
            LabeledSample::new("I hate it", Sentiment::Negative),
            LabeledSample::new("It is Tuesday", Sentiment::Neutral),
        ];
        let alert = check_drift(&KeywordClassifier, &samples, DRIFT_THRESHOLD)
            .unwrap()
            .unwrap();
        assert!(!alert.triggered);
        assert!(alert.to_string().starts_with("Accuracy on new data: 1.0000"));
    }
}
