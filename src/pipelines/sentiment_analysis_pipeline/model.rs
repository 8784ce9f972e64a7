use crate::core::Sentiment;

/// One classified input.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub text: String,
    pub label: Sentiment,
    /// Probability of `label`, in `[0, 1]`.
    pub confidence: f32,
    /// Softmax distribution indexed by [`Sentiment::index`].
    pub scores: [f32; 3],
}

impl Prediction {
    /// Builds a prediction from a probability row, picking the argmax.
    pub fn from_scores(text: impl Into<String>, scores: [f32; 3]) -> Self {
        let (best, confidence) = scores
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |(bi, bs), (i, s)| if s > bs { (i, s) } else { (bi, bs) });
        Self {
            text: text.into(),
            label: Sentiment::ALL[best],
            confidence: confidence.clamp(0.0, 1.0),
            scores,
        }
    }

    /// `(label, probability)` pairs, most likely first.
    pub fn distribution(&self) -> Vec<(Sentiment, f32)> {
        let mut pairs: Vec<_> = Sentiment::ALL
            .iter()
            .map(|label| (*label, self.scores[label.index()]))
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs
    }
}

/// Anything that can label text with a sentiment.
///
/// The evaluator, drift monitor and UI controller are written against this
/// trait so they can run over the real pipeline or a stub.
pub trait SentimentClassifier {
    /// Exactly one prediction per input, in input order.
    fn classify_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Prediction>>;

    fn classify(&self, text: &str) -> anyhow::Result<Prediction> {
        self.classify_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("classifier returned no prediction"))
    }
}

impl<C: SentimentClassifier + ?Sized> SentimentClassifier for &C {
    fn classify_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Prediction>> {
        (**self).classify_batch(texts)
    }
}
