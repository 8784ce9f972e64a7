//! Fine-tunes the base model on the correction log and replaces the local
//! fine-tuned artifact.

use sentiment_loop::core::logging;
use sentiment_loop::training::retrain;
use sentiment_loop::Settings;

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
    println!("--- Retraining pipeline ---");
    let outcome = retrain(&settings)?;
    println!("{outcome}");
    println!("--- Retraining complete ---");
    println!(
        "The next app, benchmark or monitor run will load {}",
        outcome.artifact_path.display()
    );
    Ok(())
}
