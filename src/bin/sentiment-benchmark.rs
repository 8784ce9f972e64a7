//! Scores the current model (fine-tuned if present, else base) on a seeded
//! sample of the benchmark dataset, to catch forgetting after a retrain.

use sentiment_loop::core::{logging, MODEL_NAME};
use sentiment_loop::evaluation::{evaluate, load_labeled_csv, normalize_samples, seeded_sample};
use sentiment_loop::{load_sentiment_pipeline, resolve_artifact, Settings};

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

    let source = resolve_artifact(Some(&settings.fine_tuned_dir));
    if source.is_fine_tuned() {
        println!("Found a local fine-tuned model; evaluating {source}");
    } else {
        println!("No local fine-tuned model; evaluating the base model {MODEL_NAME}");
    }

    let raw = load_labeled_csv(&settings.benchmark_dataset)?;
    let samples = seeded_sample(
        normalize_samples(raw),
        settings.benchmark_sample_size,
        settings.sample_seed,
    );
    let pipeline = load_sentiment_pipeline(settings.device_request(), Some(&settings.fine_tuned_dir))?;

    println!();
    println!("--- Benchmark on {} samples ---", samples.len());
    if pipeline.source().is_fine_tuned() {
        println!("Goal: accuracy should not drop below the base model's.");
    }
    let report = evaluate(&pipeline, &samples)?;
    println!("{report}");
    Ok(())
}
