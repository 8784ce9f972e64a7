//! Desktop feedback form: classify text and log corrections.

use eframe::egui;
use sentiment_loop::app::{FeedbackApp, FeedbackController, LaunchError, MIN_VIEWPORT_SIZE, TITLE};
use sentiment_loop::core::logging;
use sentiment_loop::feedback::CorrectionLog;
use sentiment_loop::{load_sentiment_pipeline, Settings};

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
    let app: Box<dyn eframe::App> = match load_sentiment_pipeline(
        settings.device_request(),
        Some(&settings.fine_tuned_dir),
    ) {
        Ok(pipeline) => {
            tracing::info!("Model loaded. The application is ready.");
            let log = CorrectionLog::new(&settings.correction_log);
            Box::new(FeedbackApp::new(FeedbackController::new(pipeline, log)))
        }
        Err(err) => {
            tracing::error!("Failed to load the model: {err:#}");
            Box::new(LaunchError {
                message: format!("{err:#}"),
            })
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(TITLE)
            .with_min_inner_size(MIN_VIEWPORT_SIZE),
        ..Default::default()
    };
    eframe::run_native(TITLE, native_options, Box::new(move |_cc| Ok(app)))
        .map_err(|e| anyhow::anyhow!("UI terminated with an error: {e}"))
}
