//! Local labeled CSV (`text,label`) used by the benchmark command.
//!
//! Labels may be names (`positive`) or column indices (`2`), which covers a
//! TweetEval export as well as hand-written files.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use std::path::Path;

/// A sample whose label has not been validated yet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawSample {
    pub text: String,
    pub label: String,
}

impl RawSample {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

pub fn load_labeled_csv(path: &Path) -> Result<Vec<RawSample>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open dataset {}", path.display()))?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: RawSample =
            row.with_context(|| format!("malformed row in {}", path.display()))?;
        rows.push(row);
    }
    tracing::info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Shuffles with a fixed seed and keeps the first `size` items.
pub fn seeded_sample<T>(mut items: Vec<T>, size: usize, seed: u64) -> Vec<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    items.truncate(size);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_text_and_label_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.csv");
        std::fs::write(
            &path,
            "text,label\n\"Loved it, really\",2\nIt is Tuesday,neutral\n",
        )
        .unwrap();

        let rows = load_labeled_csv(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                RawSample::new("Loved it, really", "2"),
                RawSample::new("It is Tuesday", "neutral"),
            ]
        );
    }

    #[test]
    fn missing_dataset_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_labeled_csv(&tmp.path().join("absent.csv")).is_err());
    }

    #[test]
    fn sample_is_deterministic_for_a_seed() {
        let items: Vec<u32> = (0..100).collect();
        let a = seeded_sample(items.clone(), 10, 42);
        let b = seeded_sample(items.clone(), 10, 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert_eq!(seeded_sample(items, 1000, 42).len(), 100);
    }
}
