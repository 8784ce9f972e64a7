//! RoBERTa encoder with a sequence-classification head.
//!
//! Weight names follow the Hugging Face `RobertaForSequenceClassification`
//! layout (`roberta.embeddings.*`, `roberta.encoder.layer.N.*`, `classifier.*`),
//! so the same struct loads a hub checkpoint for inference and a [`candle_nn::VarMap`]
//! for fine-tuning.
//!
//! Layer norm is written out with primitive tensor ops rather than the fused
//! `candle_nn` kernel so that the whole forward pass is differentiable.

use candle_core::{DType, IndexOp, Module, Result, Tensor, D};
use candle_nn::{embedding, init::Init, linear, ops::softmax, Embedding, Linear, VarBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MIN_VALUE_F64: f64 = f32::MIN as f64;

fn default_type_vocab_size() -> usize {
    1
}
fn default_layer_norm_eps() -> f64 {
    1e-5
}
fn default_pad_token_id() -> u32 {
    1
}
fn default_bos_token_id() -> u32 {
    0
}
fn default_eos_token_id() -> u32 {
    2
}
fn default_dropout() -> f32 {
    0.1
}

/// The subset of a RoBERTa `config.json` this implementation reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    #[serde(default = "default_pad_token_id")]
    pub pad_token_id: u32,
    #[serde(default = "default_bos_token_id")]
    pub bos_token_id: u32,
    #[serde(default = "default_eos_token_id")]
    pub eos_token_id: u32,
    #[serde(default = "default_dropout")]
    pub hidden_dropout_prob: f32,
    #[serde(default = "default_dropout")]
    pub attention_probs_dropout_prob: f32,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
}

impl Config {
    /// Longest token sequence the position table can address.
    ///
    /// RoBERTa offsets positions by `pad_token_id + 1`, so a 514-row table
    /// holds 512 tokens.
    pub fn max_sequence_len(&self) -> usize {
        self.max_position_embeddings
            .saturating_sub(self.pad_token_id as usize + 1)
            .max(2)
    }
}

fn dropout(xs: &Tensor, p: f32, train: bool) -> Result<Tensor> {
    if train && p > 0.0 {
        candle_nn::ops::dropout(xs, p)
    } else {
        Ok(xs.clone())
    }
}

#[derive(Debug, Clone)]
struct LayerNorm {
    weight: Tensor,
    bias: Tensor,
    eps: f64,
}

impl LayerNorm {
    fn load(size: usize, eps: f64, vb: VarBuilder) -> Result<Self> {
        let weight = vb.get_with_hints(size, "weight", Init::Const(1.0))?;
        let bias = vb.get_with_hints(size, "bias", Init::Const(0.0))?;
        Ok(Self { weight, bias, eps })
    }
}

impl Module for LayerNorm {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mean = xs.mean_keepdim(D::Minus1)?;
        let centered = xs.broadcast_sub(&mean)?;
        let variance = centered.sqr()?.mean_keepdim(D::Minus1)?;
        let normed = centered.broadcast_div(&(variance + self.eps)?.sqrt()?)?;
        normed.broadcast_mul(&self.weight)?.broadcast_add(&self.bias)
    }
}

#[derive(Debug, Clone)]
struct Embeddings {
    word_embeddings: Embedding,
    position_embeddings: Embedding,
    token_type_embeddings: Embedding,
    norm: LayerNorm,
    padding_idx: u32,
    dropout: f32,
}

impl Embeddings {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            word_embeddings: embedding(
                config.vocab_size,
                config.hidden_size,
                vb.pp("word_embeddings"),
            )?,
            position_embeddings: embedding(
                config.max_position_embeddings,
                config.hidden_size,
                vb.pp("position_embeddings"),
            )?,
            token_type_embeddings: embedding(
                config.type_vocab_size,
                config.hidden_size,
                vb.pp("token_type_embeddings"),
            )?,
            norm: LayerNorm::load(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?,
            padding_idx: config.pad_token_id,
            dropout: config.hidden_dropout_prob,
        })
    }

    /// Padding tokens keep position `padding_idx`; real tokens count up from it.
    fn position_ids(&self, input_ids: &Tensor) -> Result<Tensor> {
        let mask = input_ids.ne(self.padding_idx)?.to_dtype(DType::F32)?;
        let positions = (mask.cumsum(1)? * &mask)?;
        (positions + self.padding_idx as f64)?.to_dtype(DType::U32)
    }

    fn forward(&self, input_ids: &Tensor, train: bool) -> Result<Tensor> {
        let position_ids = self.position_ids(input_ids)?;
        let token_type_ids = input_ids.zeros_like()?;

        let xs = input_ids.apply(&self.word_embeddings)?;
        let xs = (xs + position_ids.apply(&self.position_embeddings)?)?;
        let xs = (xs + token_type_ids.apply(&self.token_type_embeddings)?)?;
        let xs = xs.apply(&self.norm)?;
        dropout(&xs, self.dropout, train)
    }
}

#[derive(Debug, Clone)]
struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    output_norm: LayerNorm,
    num_attention_heads: usize,
    attention_head_size: usize,
    attention_dropout: f32,
    hidden_dropout: f32,
}

impl SelfAttention {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let hidden = config.hidden_size;
        let self_vb = vb.pp("self");
        let output_vb = vb.pp("output");
        Ok(Self {
            query: linear(hidden, hidden, self_vb.pp("query"))?,
            key: linear(hidden, hidden, self_vb.pp("key"))?,
            value: linear(hidden, hidden, self_vb.pp("value"))?,
            output: linear(hidden, hidden, output_vb.pp("dense"))?,
            output_norm: LayerNorm::load(hidden, config.layer_norm_eps, output_vb.pp("LayerNorm"))?,
            num_attention_heads: config.num_attention_heads,
            attention_head_size: hidden / config.num_attention_heads,
            attention_dropout: config.attention_probs_dropout_prob,
            hidden_dropout: config.hidden_dropout_prob,
        })
    }

    fn split_heads(&self, xs: &Tensor, batch: usize, seq_len: usize) -> Result<Tensor> {
        xs.reshape((batch, seq_len, self.num_attention_heads, self.attention_head_size))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, hidden_states: &Tensor, attention_bias: &Tensor, train: bool) -> Result<Tensor> {
        let (batch, seq_len, hidden_size) = hidden_states.dims3()?;

        let q = self.split_heads(&hidden_states.apply(&self.query)?, batch, seq_len)?;
        let k = self.split_heads(&hidden_states.apply(&self.key)?, batch, seq_len)?;
        let v = self.split_heads(&hidden_states.apply(&self.value)?, batch, seq_len)?;

        let scale = (self.attention_head_size as f64).powf(-0.5);
        let scores = (q.matmul(&k.transpose(D::Minus2, D::Minus1)?)? * scale)?;
        let scores = scores.broadcast_add(attention_bias)?;
        let probs = dropout(&softmax(&scores, D::Minus1)?, self.attention_dropout, train)?;

        let context = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, seq_len, hidden_size))?;

        let projected = dropout(&context.apply(&self.output)?, self.hidden_dropout, train)?;
        (projected + hidden_states)?.apply(&self.output_norm)
    }
}

#[derive(Debug, Clone)]
struct EncoderLayer {
    attention: SelfAttention,
    intermediate: Linear,
    output: Linear,
    output_norm: LayerNorm,
    dropout: f32,
}

impl EncoderLayer {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            attention: SelfAttention::load(vb.pp("attention"), config)?,
            intermediate: linear(
                config.hidden_size,
                config.intermediate_size,
                vb.pp("intermediate.dense"),
            )?,
            output: linear(
                config.intermediate_size,
                config.hidden_size,
                vb.pp("output.dense"),
            )?,
            output_norm: LayerNorm::load(
                config.hidden_size,
                config.layer_norm_eps,
                vb.pp("output.LayerNorm"),
            )?,
            dropout: config.hidden_dropout_prob,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_bias: &Tensor, train: bool) -> Result<Tensor> {
        let attended = self.attention.forward(hidden_states, attention_bias, train)?;
        let ffn = attended
            .apply(&self.intermediate)?
            .gelu_erf()?
            .apply(&self.output)?;
        let ffn = dropout(&ffn, self.dropout, train)?;
        (ffn + attended)?.apply(&self.output_norm)
    }
}

/// `<s>` pooling followed by dense, tanh, projection.
#[derive(Debug, Clone)]
struct ClassificationHead {
    dense: Linear,
    out_proj: Linear,
    dropout: f32,
}

impl ClassificationHead {
    fn load(vb: VarBuilder, config: &Config, num_labels: usize) -> Result<Self> {
        Ok(Self {
            dense: linear(config.hidden_size, config.hidden_size, vb.pp("dense"))?,
            out_proj: linear(config.hidden_size, num_labels, vb.pp("out_proj"))?,
            dropout: config.hidden_dropout_prob,
        })
    }

    fn forward(&self, hidden_states: &Tensor, train: bool) -> Result<Tensor> {
        let pooled = hidden_states.i((.., 0))?;
        let xs = dropout(&pooled, self.dropout, train)?
            .apply(&self.dense)?
            .tanh()?;
        dropout(&xs, self.dropout, train)?.apply(&self.out_proj)
    }
}

#[derive(Debug, Clone)]
pub struct RobertaForSequenceClassification {
    embeddings: Embeddings,
    layers: Vec<EncoderLayer>,
    classifier: ClassificationHead,
    num_labels: usize,
}

impl RobertaForSequenceClassification {
    pub fn load(vb: VarBuilder, config: &Config, num_labels: usize) -> Result<Self> {
        let encoder_vb = vb.pp("roberta");
        let embeddings = Embeddings::load(encoder_vb.pp("embeddings"), config)?;

        let mut layers = Vec::with_capacity(config.num_hidden_layers);
        for layer_idx in 0..config.num_hidden_layers {
            layers.push(EncoderLayer::load(
                encoder_vb.pp(format!("encoder.layer.{layer_idx}")),
                config,
            )?);
        }

        let classifier = ClassificationHead::load(vb.pp("classifier"), config, num_labels)?;

        Ok(Self {
            embeddings,
            layers,
            classifier,
            num_labels,
        })
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Turns a `(batch, seq_len)` 1/0 mask into an additive `(batch, 1, 1, seq_len)` bias.
    fn attention_bias(attention_mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len) = attention_mask.dims2()?;
        let mask = attention_mask
            .to_dtype(DType::F32)?
            .reshape((batch, 1, 1, seq_len))?;
        (1.0 - mask)? * MIN_VALUE_F64
    }

    /// Logits with shape `(batch, num_labels)`, dropout disabled.
    pub fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        self.forward_t(input_ids, attention_mask, false)
    }

    /// Logits with dropout enabled when `train` is set.
    pub fn forward_t(&self, input_ids: &Tensor, attention_mask: &Tensor, train: bool) -> Result<Tensor> {
        let attention_bias = Self::attention_bias(attention_mask)?;
        let mut hidden_states = self.embeddings.forward(input_ids, train)?;
        for layer in &self.layers {
            hidden_states = layer.forward(&hidden_states, &attention_bias, train)?;
        }
        self.classifier.forward(&hidden_states, train)
    }
}
