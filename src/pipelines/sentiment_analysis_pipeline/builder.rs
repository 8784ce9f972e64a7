use std::path::Path;

use super::pipeline::SentimentAnalysisPipeline;
use crate::artifact::{resolve_artifact, ArtifactSource};
use crate::core::Sentiment;
use crate::loaders::ModelFiles;
use crate::models::roberta::RobertaForSequenceClassification;
use crate::pipelines::utils::{describe_device, DeviceRequest};

/// Builder for a sentiment pipeline over one artifact.
///
/// Start with `new(ArtifactSource)`, optionally pick a device with `.cpu()`,
/// `.cuda_device(i)`, `.device(d)` or `.device_request(r)`, then call `.build()`.
pub struct SentimentAnalysisPipelineBuilder {
    source: ArtifactSource,
    device_request: DeviceRequest,
}

impl SentimentAnalysisPipelineBuilder {
    pub fn new(source: ArtifactSource) -> Self {
        Self {
            source,
            device_request: DeviceRequest::Default,
        }
    }

    /// Builder for the pretrained base model.
    pub fn base() -> Self {
        Self::new(ArtifactSource::Base)
    }

    pub fn cpu(mut self) -> Self {
        self.device_request = DeviceRequest::Cpu;
        self
    }

    pub fn cuda_device(mut self, index: usize) -> Self {
        self.device_request = DeviceRequest::Cuda(index);
        self
    }

    pub fn device(mut self, device: candle_core::Device) -> Self {
        self.device_request = DeviceRequest::Explicit(device);
        self
    }

    pub fn device_request(mut self, request: DeviceRequest) -> Self {
        self.device_request = request;
        self
    }

    /// Locates (downloading if needed) the artifact files and loads model and tokenizer.
    pub fn build(self) -> anyhow::Result<SentimentAnalysisPipeline> {
        let device = self.device_request.resolve()?;
        tracing::info!("Loading {} on {}", self.source, describe_device(&device));

        let files = ModelFiles::locate(&self.source)?;
        let config = files.load_config()?;
        let tokenizer = files.load_tokenizer(&config)?;
        let vb = files.var_builder(&device)?;
        let model = RobertaForSequenceClassification::load(vb, &config, Sentiment::ALL.len())?;

        let pipeline =
            SentimentAnalysisPipeline::from_parts(model, &config, tokenizer, device, self.source)?;
        tracing::info!("Model loaded");
        Ok(pipeline)
    }
}

/// Loads the fine-tuned artifact at `fine_tuned_dir` if it is valid, otherwise
/// the base model. A fine-tuned directory that fails to load also falls back
/// to the base model.
pub fn load_sentiment_pipeline(
    device_request: DeviceRequest,
    fine_tuned_dir: Option<&Path>,
) -> anyhow::Result<SentimentAnalysisPipeline> {
    let source = resolve_artifact(fine_tuned_dir);
    if !source.is_fine_tuned() {
        return SentimentAnalysisPipelineBuilder::base()
            .device_request(device_request)
            .build();
    }

    match SentimentAnalysisPipelineBuilder::new(source.clone())
        .device_request(device_request.clone())
        .build()
    {
        Ok(pipeline) => Ok(pipeline),
        Err(e) => {
            tracing::warn!("Could not load {source}: {e:#}. Falling back to the base model.");
            SentimentAnalysisPipelineBuilder::base()
                .device_request(device_request)
                .build()
        }
    }
}
