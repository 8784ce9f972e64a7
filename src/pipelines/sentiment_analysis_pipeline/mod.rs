//! Sentiment analysis pipeline: negative / neutral / positive with confidence.
//!
//! ## Main Types
//!
//! - [`SentimentAnalysisPipeline`] - Loaded model plus tokenizer; the context object entry points pass around
//! - [`SentimentAnalysisPipelineBuilder`] - Builder for choosing the artifact and device
//! - [`SentimentClassifier`] - Inference seam used by evaluation, drift checks and the UI
//! - [`Prediction`] - Label, confidence and full distribution for one input
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use sentiment_loop::pipelines::sentiment_analysis_pipeline::*;
//!
//! # fn run() -> anyhow::Result<()> {
//! let pipeline = SentimentAnalysisPipelineBuilder::base().build()?;
//!
//! let result = pipeline.predict("I love this product!")?;
//! println!("Sentiment: {} (confidence: {:.2})", result.label, result.confidence);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod model;
pub mod pipeline;

pub use builder::{load_sentiment_pipeline, SentimentAnalysisPipelineBuilder};
pub use model::{Prediction, SentimentClassifier};
pub use pipeline::SentimentAnalysisPipeline;
