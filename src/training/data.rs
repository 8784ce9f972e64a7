//! Correction log rows turned into labeled training examples.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

use super::error::RetrainError;
use crate::core::Sentiment;

/// Logs with this many rows or fewer are used whole for both train and eval.
pub const MIN_ROWS_FOR_SPLIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingRow {
    pub text: String,
    pub label: Sentiment,
}

/// Reads `text` and `user_correction` from the correction log.
///
/// Rows with an empty text or correction are skipped. Any correction outside
/// the label set fails the whole read.
pub fn load_training_rows(path: &Path) -> Result<Vec<TrainingRow>, RetrainError> {
    if !path.is_file() {
        return Err(RetrainError::MissingLog(path.to_path_buf()));
    }
    let read_err = |source: csv::Error| RetrainError::ReadLog {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(read_err)?;
    let headers = reader.headers().map_err(read_err)?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| RetrainError::MissingColumn {
                path: path.to_path_buf(),
                column: name,
            })
    };
    let text_col = column("text")?;
    let label_col = column("user_correction")?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(read_err)?;
        let text = record.get(text_col).unwrap_or("");
        let label = record.get(label_col).unwrap_or("");
        if text.trim().is_empty() || label.trim().is_empty() {
            skipped += 1;
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let label = label
            .parse::<Sentiment>()
            .map_err(|_| RetrainError::InvalidLabel {
                line,
                label: label.to_string(),
            })?;
        rows.push(TrainingRow {
            text: text.to_string(),
            label,
        });
    }

    if skipped > 0 {
        tracing::info!("Skipped {skipped} incomplete rows");
    }
    tracing::info!("Found {} rows for retraining", rows.len());
    Ok(rows)
}

/// Splits into `(train, eval)`.
///
/// Above [`MIN_ROWS_FOR_SPLIT`] rows a seeded shuffle puts
/// `ceil(len * eval_fraction)` rows in eval and the rest in train. Otherwise
/// both sets are the full input.
pub fn split_rows(
    rows: Vec<TrainingRow>,
    eval_fraction: f64,
    seed: u64,
) -> (Vec<TrainingRow>, Vec<TrainingRow>) {
    if rows.len() <= MIN_ROWS_FOR_SPLIT {
        return (rows.clone(), rows);
    }

    let mut rows = rows;
    let mut rng = StdRng::seed_from_u64(seed);
    rows.shuffle(&mut rng);

    let eval_len = ((rows.len() as f64 * eval_fraction).ceil() as usize).clamp(1, rows.len() - 1);
    let train = rows.split_off(eval_len);
    (train, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_log(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("corrections.csv");
        std::fs::write(
            &path,
            format!("timestamp,text,model_prediction,user_correction\n{body}"),
        )
        .unwrap();
        path
    }

    fn rows(n: usize) -> Vec<TrainingRow> {
        (0..n)
            .map(|i| TrainingRow {
                text: format!("row {i}"),
                label: Sentiment::ALL[i % 3],
            })
            .collect()
    }

    #[test]
    fn missing_log_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_training_rows(&tmp.path().join("absent.csv")),
            Err(RetrainError::MissingLog(_))
        ));
    }

    #[test]
    fn incomplete_rows_are_dropped_and_labels_normalized() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_log(
            tmp.path(),
            "2024-01-01T00:00:00Z,good,positive,Negative\n\
             2024-01-01T00:00:01Z,,positive,negative\n\
             2024-01-01T00:00:02Z,bad,negative,\n\
             2024-01-01T00:00:03Z,\"quoted, text\",neutral, POSITIVE \n",
        );

        let rows = load_training_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, Sentiment::Negative);
        assert_eq!(rows[1].text, "quoted, text");
        assert_eq!(rows[1].label, Sentiment::Positive);
    }

    #[test]
    fn unknown_label_reports_its_line() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_log(
            tmp.path(),
            "2024-01-01T00:00:00Z,good,positive,negative\n\
             2024-01-01T00:00:01Z,meh,neutral,mixed\n",
        );

        match load_training_rows(&path) {
            Err(RetrainError::InvalidLabel { line, label }) => {
                assert_eq!(line, 3);
                assert_eq!(label, "mixed");
            }
            other => panic!("expected InvalidLabel, got {other:?}"),
        }
    }

    #[test]
    fn small_logs_are_reused_for_train_and_eval() {
        let (train, eval) = split_rows(rows(5), 0.2, 42);
        assert_eq!(train.len(), 5);
        assert_eq!(eval, train);
    }

    #[test]
    fn larger_logs_hold_out_a_ceiled_fifth() {
        let (train, eval) = split_rows(rows(6), 0.2, 42);
        assert_eq!((train.len(), eval.len()), (4, 2));

        let (train, eval) = split_rows(rows(20), 0.2, 42);
        assert_eq!((train.len(), eval.len()), (16, 4));
        assert!(eval.iter().all(|r| !train.contains(r)));

        let again = split_rows(rows(20), 0.2, 42);
        assert_eq!(again.1, eval);
    }
}
