// Pipeline modules organized by functionality
pub mod sentiment_analysis_pipeline;
pub mod utils;

// Re-export pipeline types for convenience
pub use sentiment_analysis_pipeline::*;
