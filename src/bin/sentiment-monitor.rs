//! Drift check over the curated sample sets and, when present, the
//! correction log.

use sentiment_loop::core::logging;
use sentiment_loop::evaluation::golden::{flagged_samples, golden_samples};
use sentiment_loop::evaluation::{check_drift, normalize_samples, LabeledSample, RawSample};
use sentiment_loop::feedback::CorrectionLog;
use sentiment_loop::{load_sentiment_pipeline, SentimentAnalysisPipeline, Settings};

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let pipeline = load_sentiment_pipeline(settings.device_request(), Some(&settings.fine_tuned_dir))?;
    println!("Monitoring {}", pipeline.source());

    report(&pipeline, "Golden set", &golden_samples(), settings.drift_threshold)?;
    report(&pipeline, "Flagged samples", &flagged_samples(), settings.drift_threshold)?;

    let log = CorrectionLog::new(&settings.correction_log);
    if log.exists() {
        let corrections = normalize_samples(
            log.read_records()?
                .into_iter()
                .map(|r| RawSample::new(r.text, r.user_correction)),
        );
        report(&pipeline, "Correction log", &corrections, settings.drift_threshold)?;
    }
    Ok(())
}

fn report(
    pipeline: &SentimentAnalysisPipeline,
    name: &str,
    samples: &[LabeledSample],
    threshold: f32,
) -> anyhow::Result<()> {
    println!();
    println!("--- Drift check: {name} ({} samples) ---", samples.len());
    match check_drift(pipeline, samples, threshold)? {
        Some(alert) => println!("{alert}"),
        None => println!("No valid data to evaluate."),
    }
    println!("--- End of check ---");
    Ok(())
}
