//! Classification metrics over the sentiment label set.

use std::fmt;

use crate::core::Sentiment;

const K: usize = Sentiment::ALL.len();

/// Confusion matrix indexed by `[truth][predicted]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: [[u32; K]; K],
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, truth: Sentiment, predicted: Sentiment) {
        let cell = &mut self.counts[truth.index()][predicted.index()];
        *cell = cell.saturating_add(1);
    }

    pub fn get(&self, truth: Sentiment, predicted: Sentiment) -> u32 {
        self.counts[truth.index()][predicted.index()]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> u32 {
        (0..K).map(|i| self.counts[i][i]).sum()
    }

    pub fn accuracy(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.correct() as f32 / total as f32
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>14}", "truth \\ pred")?;
        for label in Sentiment::ALL {
            write!(f, "{:>10}", label.as_str())?;
        }
        writeln!(f)?;
        for truth in Sentiment::ALL {
            write!(f, "{:>14}", truth.as_str())?;
            for predicted in Sentiment::ALL {
                write!(f, "{:>10}", self.get(truth, predicted))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    pub f1: f32,
    /// Number of samples whose true label is this class.
    pub support: u32,
}

impl ClassStats {
    fn from_counts(tp: f32, fp: f32, fn_: f32, support: u32) -> Self {
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self {
            precision,
            recall,
            f1,
            support,
        }
    }
}

/// Per-class precision, recall, f1 and support with accuracy and averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    /// Indexed by [`Sentiment::index`].
    pub per_class: [ClassStats; K],
    pub accuracy: f32,
    pub macro_avg: ClassStats,
    pub weighted_avg: ClassStats,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let per_class = Sentiment::ALL.map(|class| {
            let tp = cm.get(class, class) as f32;
            let mut fp = 0f32;
            let mut fn_ = 0f32;
            let mut support = 0u32;
            for other in Sentiment::ALL {
                let row = cm.get(class, other);
                support = support.saturating_add(row);
                if other != class {
                    fn_ += row as f32;
                    fp += cm.get(other, class) as f32;
                }
            }
            ClassStats::from_counts(tp, fp, fn_, support)
        });

        let total = cm.total();
        let mean = |f: fn(&ClassStats) -> f32| per_class.iter().map(f).sum::<f32>() / K as f32;
        let weighted = |f: fn(&ClassStats) -> f32| {
            if total == 0 {
                0.0
            } else {
                per_class
                    .iter()
                    .map(|s| f(s) * s.support as f32)
                    .sum::<f32>()
                    / total as f32
            }
        };

        Self {
            per_class,
            accuracy: cm.accuracy(),
            macro_avg: ClassStats {
                precision: mean(|s| s.precision),
                recall: mean(|s| s.recall),
                f1: mean(|s| s.f1),
                support: total,
            },
            weighted_avg: ClassStats {
                precision: weighted(|s| s.precision),
                recall: weighted(|s| s.recall),
                f1: weighted(|s| s.f1),
                support: total,
            },
        }
    }

    pub fn class(&self, label: Sentiment) -> &ClassStats {
        &self.per_class[label.index()]
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, name: &str, s: &ClassStats| {
            writeln!(
                f,
                "{name:>12}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                s.precision, s.recall, s.f1, s.support
            )
        };

        writeln!(
            f,
            "{:>12}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for label in Sentiment::ALL {
            row(f, label.as_str(), self.class(label))?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}
