use anyhow::{Error as E, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use super::model::{Prediction, SentimentClassifier};
use crate::artifact::ArtifactSource;
use crate::core::Sentiment;
use crate::models::roberta::{Config, RobertaForSequenceClassification};

/// Inputs per forward pass when classifying a batch.
const CHUNK_SIZE: usize = 32;

/// Token ids and attention mask for a padded batch, both `(batch, seq_len)` u32.
pub(crate) struct EncodedBatch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
}

/// How raw tokenizer output is shaped into model input.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SequenceShape {
    pub max_len: usize,
    pub pad_id: u32,
    pub bos_id: u32,
    pub eos_id: u32,
}

impl SequenceShape {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_len: config.max_sequence_len(),
            pad_id: config.pad_token_id,
            bos_id: config.bos_token_id,
            eos_id: config.eos_token_id,
        }
    }

    fn shape_ids(&self, raw: &[u32]) -> Vec<u32> {
        if raw.is_empty() {
            return vec![self.bos_id, self.eos_id];
        }
        let mut ids = raw.to_vec();
        if ids.len() > self.max_len {
            let ends_with_eos = ids.last() == Some(&self.eos_id);
            ids.truncate(self.max_len);
            if ends_with_eos {
                if let Some(last) = ids.last_mut() {
                    *last = self.eos_id;
                }
            }
        }
        ids
    }
}

pub(crate) fn encode_batch(
    tokenizer: &Tokenizer,
    texts: &[&str],
    shape: SequenceShape,
    device: &Device,
) -> Result<EncodedBatch> {
    let mut rows = Vec::with_capacity(texts.len());
    for text in texts {
        let encoding = tokenizer
            .encode(*text, true)
            .map_err(|e| E::msg(format!("Tokenization error: {e}")))?;
        rows.push(shape.shape_ids(encoding.get_ids()));
    }

    let seq_len = rows.iter().map(Vec::len).max().unwrap_or(2);
    let mut ids = Vec::with_capacity(rows.len() * seq_len);
    let mut mask = Vec::with_capacity(rows.len() * seq_len);
    for row in &rows {
        ids.extend_from_slice(row);
        mask.extend(std::iter::repeat(1u32).take(row.len()));
        ids.extend(std::iter::repeat(shape.pad_id).take(seq_len - row.len()));
        mask.extend(std::iter::repeat(0u32).take(seq_len - row.len()));
    }

    Ok(EncodedBatch {
        input_ids: Tensor::from_vec(ids, (rows.len(), seq_len), device)?,
        attention_mask: Tensor::from_vec(mask, (rows.len(), seq_len), device)?,
    })
}

/// Maps each logit column to a label using `id2label`, falling back to the
/// column index for generic names such as `LABEL_0`.
pub(crate) fn label_columns(config: &Config, num_labels: usize) -> Result<Vec<Sentiment>> {
    if num_labels != Sentiment::ALL.len() {
        anyhow::bail!(
            "classification head has {num_labels} outputs, expected {}",
            Sentiment::ALL.len()
        );
    }
    let mut columns = Vec::with_capacity(num_labels);
    for idx in 0..num_labels {
        let label = config
            .id2label
            .get(&idx.to_string())
            .and_then(|name| name.parse::<Sentiment>().ok())
            .or_else(|| Sentiment::from_index(idx))
            .ok_or_else(|| E::msg(format!("no sentiment label for column {idx}")))?;
        if columns.contains(&label) {
            anyhow::bail!("id2label maps `{label}` to more than one column");
        }
        columns.push(label);
    }
    Ok(columns)
}

/// A ready-to-use sentiment pipeline over one loaded artifact.
///
/// Built once by an entry point and passed to whatever needs inference.
pub struct SentimentAnalysisPipeline {
    pub(crate) model: RobertaForSequenceClassification,
    pub(crate) tokenizer: Tokenizer,
    pub(crate) columns: Vec<Sentiment>,
    pub(crate) shape: SequenceShape,
    pub(crate) device: Device,
    pub(crate) source: ArtifactSource,
}

impl SentimentAnalysisPipeline {
    pub(crate) fn from_parts(
        model: RobertaForSequenceClassification,
        config: &Config,
        tokenizer: Tokenizer,
        device: Device,
        source: ArtifactSource,
    ) -> Result<Self> {
        let columns = label_columns(config, model.num_labels())?;
        Ok(Self {
            model,
            tokenizer,
            columns,
            shape: SequenceShape::from_config(config),
            device,
            source,
        })
    }

    /// Predict sentiment with the label, its confidence and the full distribution.
    pub fn predict(&self, text: &str) -> Result<Prediction> {
        self.classify(text)
    }

    pub fn predict_batch(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
        self.classify_batch(texts)
    }

    /// The artifact these weights were loaded from.
    pub fn source(&self) -> &ArtifactSource {
        &self.source
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    fn forward_chunk(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
        let batch = encode_batch(&self.tokenizer, texts, self.shape, &self.device)?;
        let logits = self.model.forward(&batch.input_ids, &batch.attention_mask)?;
        let probs = candle_nn::ops::softmax_last_dim(&logits)?.to_vec2::<f32>()?;

        Ok(texts
            .iter()
            .zip(probs)
            .map(|(text, row)| {
                let mut scores = [0f32; 3];
                for (column, p) in self.columns.iter().zip(row) {
                    scores[column.index()] = p;
                }
                Prediction::from_scores(*text, scores)
            })
            .collect())
    }
}

impl SentimentClassifier for SentimentAnalysisPipeline {
    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
        let mut predictions = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(CHUNK_SIZE) {
            predictions.extend(self.forward_chunk(chunk)?);
        }
        Ok(predictions)
    }
}
