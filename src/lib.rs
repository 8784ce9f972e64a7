pub mod app;
pub mod artifact;
pub mod core;
pub mod evaluation;
pub mod feedback;
mod loaders;
pub mod models;
pub mod pipelines;
pub mod training;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export core types
pub use core::{Sentiment, Settings};

pub use artifact::{resolve_artifact, ArtifactSource};
pub use pipelines::sentiment_analysis_pipeline::{
    load_sentiment_pipeline, Prediction, SentimentAnalysisPipeline,
    SentimentAnalysisPipelineBuilder, SentimentClassifier,
};
