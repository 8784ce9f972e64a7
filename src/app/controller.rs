use crate::core::Sentiment;
use crate::feedback::{CorrectionLog, SaveStatus};
use crate::pipelines::sentiment_analysis_pipeline::{Prediction, SentimentClassifier};

pub const TITLE: &str = "Sentiment Analysis for MachineInnovators Inc.";

pub const DESCRIPTION: &str = "This tool analyzes the sentiment of social media text (in English), \
classifying it as Negative, Neutral or Positive. The model is \
`cardiffnlp/twitter-roberta-base-sentiment-latest`. Enter some text and press Submit to see \
the result.";

pub const EXAMPLES: [&str; 3] = [
    "MachineInnovators Inc. is revolutionizing the AI industry!",
    "The new update is okay, but it could be better.",
    "I am very disappointed with their customer service.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

impl From<&SaveStatus> for StatusLine {
    fn from(status: &SaveStatus) -> Self {
        let kind = match status {
            SaveStatus::Saved => StatusKind::Info,
            SaveStatus::MissingCorrection | SaveStatus::MissingText => StatusKind::Warning,
            SaveStatus::Failed(_) => StatusKind::Error,
        };
        Self {
            kind,
            text: status.message(),
        }
    }
}

/// Form state behind the feedback UI: text in, label distribution out, and an
/// optional correction written to the log.
pub struct FeedbackController<C> {
    classifier: C,
    log: CorrectionLog,
    input: String,
    prediction: Option<Prediction>,
    correction_open: bool,
    selected_correction: Option<Sentiment>,
    status: Option<StatusLine>,
}

impl<C: SentimentClassifier> FeedbackController<C> {
    pub fn new(classifier: C, log: CorrectionLog) -> Self {
        Self {
            classifier,
            log,
            input: String::new(),
            prediction: None,
            correction_open: false,
            selected_correction: None,
            status: None,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Copies one of [`EXAMPLES`] into the input box.
    pub fn load_example(&mut self, index: usize) {
        if let Some(example) = EXAMPLES.get(index) {
            self.input = (*example).to_string();
            self.status = None;
        }
    }

    /// Classifies the current input.
    ///
    /// Empty input clears the result. An inference failure clears it too and
    /// leaves an error on the status line.
    pub fn submit(&mut self) {
        self.status = None;
        if self.input.is_empty() {
            self.prediction = None;
            return;
        }

        match self.classifier.classify(&self.input) {
            Ok(prediction) => {
                tracing::debug!(
                    "Predicted {} ({:.3})",
                    prediction.label,
                    prediction.confidence
                );
                self.prediction = Some(prediction);
            }
            Err(e) => {
                tracing::error!("Inference failed: {e:#}");
                self.prediction = None;
                self.status = Some(StatusLine {
                    kind: StatusKind::Error,
                    text: format!("Inference failed: {e:#}"),
                });
            }
        }
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    /// Labels with their probabilities, most likely first. Empty before a
    /// successful submit.
    pub fn distribution(&self) -> Vec<(Sentiment, f32)> {
        self.prediction
            .as_ref()
            .map(Prediction::distribution)
            .unwrap_or_default()
    }

    pub fn open_correction(&mut self) {
        self.correction_open = true;
    }

    pub fn is_correction_open(&self) -> bool {
        self.correction_open
    }

    pub fn selected_correction(&self) -> Option<Sentiment> {
        self.selected_correction
    }

    pub fn selected_correction_mut(&mut self) -> &mut Option<Sentiment> {
        &mut self.selected_correction
    }

    pub fn select_correction(&mut self, label: Option<Sentiment>) {
        self.selected_correction = label;
    }

    /// Logs the selected label as the correction for the last prediction.
    pub fn save_correction(&mut self) -> SaveStatus {
        let status = match &self.prediction {
            Some(prediction) => {
                self.log
                    .save(&prediction.text, prediction.label, self.selected_correction)
            }
            None => SaveStatus::MissingText,
        };
        self.status = Some(StatusLine::from(&status));
        status
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::tests::KeywordClassifier;

    struct FailingClassifier;

    impl SentimentClassifier for FailingClassifier {
        fn classify_batch(&self, _texts: &[&str]) -> anyhow::Result<Vec<Prediction>> {
            anyhow::bail!("device lost")
        }
    }

    fn controller<C: SentimentClassifier>(
        classifier: C,
        dir: &std::path::Path,
    ) -> FeedbackController<C> {
        FeedbackController::new(classifier, CorrectionLog::new(dir.join("corrections.csv")))
    }

    #[test]
    fn submit_shows_a_sorted_distribution() {
        let tmp = tempfile::tempdir().unwrap();
        let mut c = controller(KeywordClassifier, tmp.path());
        c.set_input("I love it");
        c.submit();

        let dist = c.distribution();
        assert_eq!(dist.len(), 3);
        assert_eq!(dist[0].0, Sentiment::Positive);
        assert!(dist.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn empty_input_clears_the_result() {
        let tmp = tempfile::tempdir().unwrap();
        let mut c = controller(KeywordClassifier, tmp.path());
        c.set_input("I love it");
        c.submit();
        c.set_input("");
        c.submit();
        assert!(c.prediction().is_none());
        assert!(c.distribution().is_empty());
    }

    #[test]
    fn inference_errors_become_a_status_line() {
        let tmp = tempfile::tempdir().unwrap();
        let mut c = controller(FailingClassifier, tmp.path());
        c.set_input("anything");
        c.submit();

        assert!(c.prediction().is_none());
        let status = c.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert!(status.text.contains("device lost"));
    }

    #[test]
    fn saving_requires_a_selected_label() {
        let tmp = tempfile::tempdir().unwrap();
        let mut c = controller(KeywordClassifier, tmp.path());
        c.load_example(2);
        assert_eq!(c.input(), EXAMPLES[2]);
        c.submit();
        c.open_correction();
        assert!(c.is_correction_open());

        assert_eq!(c.save_correction(), SaveStatus::MissingCorrection);
        assert_eq!(c.status().unwrap().kind, StatusKind::Warning);
        assert!(!tmp.path().join("corrections.csv").exists());

        c.select_correction(Some(Sentiment::Negative));
        assert!(c.save_correction().is_saved());
        assert_eq!(c.status().unwrap().kind, StatusKind::Info);

        let records = CorrectionLog::new(tmp.path().join("corrections.csv"))
            .read_records()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, EXAMPLES[2]);
        assert_eq!(records[0].model_prediction, "neutral");
        assert_eq!(records[0].user_correction, "negative");
    }

    #[test]
    fn nothing_to_correct_before_a_prediction() {
        let tmp = tempfile::tempdir().unwrap();
        let mut c = controller(KeywordClassifier, tmp.path());
        c.select_correction(Some(Sentiment::Positive));
        assert_eq!(c.save_correction(), SaveStatus::MissingText);
    }
}
