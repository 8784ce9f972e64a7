pub mod config;
pub mod error;
pub mod labels;
pub mod logging;

pub use config::{DevicePreference, Settings, TrainingSettings, DRIFT_THRESHOLD, MODEL_NAME};
pub use error::{ConfigError, LabelError};
pub use labels::Sentiment;
