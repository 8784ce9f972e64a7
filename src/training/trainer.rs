//! One-pass supervised fine-tuning of the classification model.

use anyhow::{Context, Error as E, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::path::Path;
use tokenizers::Tokenizer;

use super::data::TrainingRow;
use crate::artifact::CONFIG_MARKER;
use crate::core::{Sentiment, TrainingSettings};
use crate::loaders::{ModelFiles, SAFETENSORS_FILE, TOKENIZER_FILE};
use crate::models::roberta::{Config, RobertaForSequenceClassification};
use crate::pipelines::sentiment_analysis_pipeline::pipeline::{
    encode_batch, label_columns, SequenceShape,
};

#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    pub steps: usize,
    pub mean_loss: f32,
}

/// A trainable copy of the model with everything needed to write it back out.
pub struct FineTuner {
    model: RobertaForSequenceClassification,
    varmap: VarMap,
    tokenizer: Tokenizer,
    /// Logit column for each label, indexed by column.
    columns: Vec<Sentiment>,
    shape: SequenceShape,
    base_config: serde_json::Value,
    device: Device,
}

impl FineTuner {
    /// Loads the pretrained weights from `files` into a [`VarMap`] so they can be updated.
    pub fn from_files(files: &ModelFiles, device: &Device) -> Result<Self> {
        let config_text = files.read_config_json()?;
        let config: Config = serde_json::from_str(&config_text)
            .map_err(|e| E::msg(format!("failed to parse model config: {e}")))?;
        let base_config: serde_json::Value = serde_json::from_str(&config_text)?;
        let tokenizer = files.load_tokenizer(&config)?;

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let model = RobertaForSequenceClassification::load(vb, &config, Sentiment::ALL.len())?;
        let pretrained = files.load_tensors(device)?;
        copy_pretrained(&varmap, &pretrained)?;

        Ok(Self {
            columns: label_columns(&config, model.num_labels())?,
            shape: SequenceShape::from_config(&config),
            model,
            varmap,
            tokenizer,
            base_config,
            device: device.clone(),
        })
    }

    fn column_of(&self, label: Sentiment) -> Result<u32> {
        self.columns
            .iter()
            .position(|c| *c == label)
            .map(|i| i as u32)
            .with_context(|| format!("no logit column for `{label}`"))
    }

    fn encode(&self, rows: &[TrainingRow]) -> Result<(Tensor, Tensor, Tensor)> {
        let texts: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
        let batch = encode_batch(&self.tokenizer, &texts, self.shape, &self.device)?;
        let targets = rows
            .iter()
            .map(|r| self.column_of(r.label))
            .collect::<Result<Vec<_>>>()?;
        let targets = Tensor::new(targets, &self.device)?;
        Ok((batch.input_ids, batch.attention_mask, targets))
    }

    /// Runs `settings.epochs` passes of AdamW with a linear decay of the
    /// learning rate to zero. The training order is reshuffled each epoch.
    pub fn train(
        &mut self,
        rows: &[TrainingRow],
        settings: &TrainingSettings,
    ) -> Result<Vec<EpochSummary>> {
        let batch_size = settings.batch_size.max(1);
        let steps_per_epoch = rows.len().div_ceil(batch_size);
        let total_steps = steps_per_epoch * settings.epochs;
        if total_steps == 0 {
            anyhow::bail!("nothing to train on");
        }

        let params = ParamsAdamW {
            lr: settings.learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        };
        let mut optimizer = AdamW::new(self.varmap.all_vars(), params)?;
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let mut order: Vec<&TrainingRow> = rows.iter().collect();
        let mut step = 0usize;
        let mut summaries = Vec::with_capacity(settings.epochs);

        tracing::info!(
            "Training on {} rows: {} epochs, batch size {batch_size}, {total_steps} steps",
            rows.len(),
            settings.epochs
        );

        for epoch in 0..settings.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0f32;
            let mut window_loss = 0f32;

            for chunk in order.chunks(batch_size) {
                let chunk: Vec<TrainingRow> = chunk.iter().map(|r| (*r).clone()).collect();
                let (ids, mask, targets) = self.encode(&chunk)?;

                let lr = settings.learning_rate * (total_steps - step) as f64 / total_steps as f64;
                optimizer.set_learning_rate(lr);

                let logits = self.model.forward_t(&ids, &mask, true)?;
                let loss = candle_nn::loss::cross_entropy(&logits, &targets)?;
                optimizer.backward_step(&loss)?;

                let loss = loss.to_scalar::<f32>()?;
                epoch_loss += loss;
                window_loss += loss;
                step += 1;

                if settings.logging_steps > 0 && step % settings.logging_steps == 0 {
                    tracing::info!(
                        "step {step}/{total_steps} loss {:.4} lr {lr:.2e}",
                        window_loss / settings.logging_steps as f32
                    );
                    window_loss = 0.0;
                }
            }

            let summary = EpochSummary {
                steps: steps_per_epoch,
                mean_loss: epoch_loss / steps_per_epoch as f32,
            };
            tracing::info!(
                "epoch {}/{} mean loss {:.4}",
                epoch + 1,
                settings.epochs,
                summary.mean_loss
            );
            summaries.push(summary);
        }

        Ok(summaries)
    }

    /// Fraction of `rows` whose argmax column matches the label, dropout off.
    pub fn accuracy(&self, rows: &[TrainingRow], batch_size: usize) -> Result<f32> {
        if rows.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for chunk in rows.chunks(batch_size.max(1)) {
            let (ids, mask, targets) = self.encode(chunk)?;
            let logits = self.model.forward(&ids, &mask)?;
            let predicted = logits.argmax(D::Minus1)?.to_vec1::<u32>()?;
            let targets = targets.to_vec1::<u32>()?;
            correct += predicted
                .iter()
                .zip(&targets)
                .filter(|(p, t)| p == t)
                .count();
        }
        Ok(correct as f32 / rows.len() as f32)
    }

    /// Writes weights, tokenizer and a `config.json` whose label tables match
    /// the trained columns.
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.varmap
            .save(dir.join(SAFETENSORS_FILE))
            .context("failed to save model weights")?;
        self.tokenizer
            .save(dir.join(TOKENIZER_FILE), false)
            .map_err(|e| E::msg(format!("failed to save tokenizer: {e}")))?;

        let config = self.artifact_config();
        std::fs::write(
            dir.join(CONFIG_MARKER),
            serde_json::to_string_pretty(&config)?,
        )
        .context("failed to write config.json")?;
        Ok(())
    }

    fn artifact_config(&self) -> serde_json::Value {
        let mut config = self.base_config.clone();
        let id2label: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, label)| (i.to_string(), label.as_str().into()))
            .collect();
        let label2id: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str().to_string(), i.into()))
            .collect();
        if let Some(obj) = config.as_object_mut() {
            obj.insert("id2label".into(), id2label.into());
            obj.insert("label2id".into(), label2id.into());
            obj.insert(
                "architectures".into(),
                serde_json::json!(["RobertaForSequenceClassification"]),
            );
        }
        config
    }
}

const HEAD_PREFIX: &str = "classifier.";

/// Overwrites every variable in `varmap` with the checkpoint tensor of the same name.
///
/// Older checkpoints name layer-norm parameters `gamma`/`beta`; those are
/// accepted too. A checkpoint without a classification head (a bare encoder)
/// keeps the freshly initialized `classifier.*` weights. Any other missing
/// tensor is an error.
fn copy_pretrained(varmap: &VarMap, pretrained: &HashMap<String, Tensor>) -> Result<()> {
    let vars = varmap
        .data()
        .lock()
        .map_err(|_| E::msg("variable map lock poisoned"))?;
    let mut copied = 0usize;
    let mut fresh = Vec::new();
    for (name, var) in vars.iter() {
        let tensor = pretrained
            .get(name)
            .or_else(|| legacy_name(name).and_then(|legacy| pretrained.get(&legacy)));
        match tensor {
            Some(tensor) => {
                var.set(tensor)
                    .with_context(|| format!("checkpoint tensor `{name}` has the wrong shape"))?;
                copied += 1;
            }
            None if name.starts_with(HEAD_PREFIX) => fresh.push(name.as_str()),
            None => anyhow::bail!("checkpoint has no tensor `{name}`"),
        }
    }
    if !fresh.is_empty() {
        fresh.sort_unstable();
        tracing::warn!(
            "Checkpoint has no classification head; initializing {} fresh",
            fresh.join(", ")
        );
    }
    tracing::debug!("Copied {copied} pretrained tensors");
    Ok(())
}

fn legacy_name(name: &str) -> Option<String> {
    if let Some(prefix) = name.strip_suffix("LayerNorm.weight") {
        Some(format!("{prefix}LayerNorm.gamma"))
    } else {
        name.strip_suffix("LayerNorm.bias")
            .map(|prefix| format!("{prefix}LayerNorm.beta"))
    }
}
