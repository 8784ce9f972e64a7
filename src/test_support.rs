//! Tiny random-weight model and word-level tokenizer for tests that must not
//! touch the network.

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::artifact::{ArtifactSource, CONFIG_MARKER};
use crate::loaders::{SAFETENSORS_FILE, TOKENIZER_FILE};
use crate::models::roberta::{Config, RobertaForSequenceClassification};
use crate::pipelines::sentiment_analysis_pipeline::SentimentAnalysisPipeline;

pub const TINY_CONFIG: &str = r#"{
  "architectures": ["RobertaForSequenceClassification"],
  "vocab_size": 16,
  "hidden_size": 8,
  "num_hidden_layers": 1,
  "num_attention_heads": 2,
  "intermediate_size": 16,
  "max_position_embeddings": 40,
  "type_vocab_size": 1,
  "layer_norm_eps": 1e-5,
  "pad_token_id": 1,
  "bos_token_id": 0,
  "eos_token_id": 2,
  "hidden_dropout_prob": 0.1,
  "attention_probs_dropout_prob": 0.1,
  "id2label": {"0": "negative", "1": "neutral", "2": "positive"},
  "label2id": {"negative": 0, "neutral": 1, "positive": 2}
}"#;

const TINY_TOKENIZER: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": null,
  "pre_tokenizer": {"type": "Whitespace"},
  "post_processor": {
    "type": "RobertaProcessing",
    "sep": ["</s>", 2],
    "cls": ["<s>", 0],
    "trim_offsets": true,
    "add_prefix_space": false
  },
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": {
      "<s>": 0, "<pad>": 1, "</s>": 2, "<unk>": 3,
      "good": 4, "bad": 5, "great": 6, "awful": 7,
      "the": 8, "package": 9, "arrived": 10, "love": 11,
      "hate": 12, "it": 13, "is": 14, "ok": 15
    },
    "unk_token": "<unk>"
  }
}"#;

pub fn tiny_config() -> Config {
    serde_json::from_str(TINY_CONFIG).expect("tiny config parses")
}

pub fn tiny_tokenizer() -> Tokenizer {
    Tokenizer::from_bytes(TINY_TOKENIZER.as_bytes()).expect("tiny tokenizer parses")
}

pub fn tiny_model(device: &Device) -> (RobertaForSequenceClassification, VarMap) {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let model = RobertaForSequenceClassification::load(vb, &tiny_config(), 3)
        .expect("tiny model builds");
    (model, varmap)
}

pub fn tiny_pipeline() -> SentimentAnalysisPipeline {
    let (model, _varmap) = tiny_model(&Device::Cpu);
    SentimentAnalysisPipeline::from_parts(
        model,
        &tiny_config(),
        tiny_tokenizer(),
        Device::Cpu,
        ArtifactSource::Base,
    )
    .expect("tiny pipeline builds")
}

/// Writes a complete artifact directory and returns a pipeline over the same weights.
pub fn write_tiny_artifact(dir: &Path) -> SentimentAnalysisPipeline {
    std::fs::create_dir_all(dir).unwrap();
    let (model, varmap) = tiny_model(&Device::Cpu);
    std::fs::write(dir.join(CONFIG_MARKER), TINY_CONFIG).unwrap();
    varmap.save(dir.join(SAFETENSORS_FILE)).unwrap();
    let tokenizer = tiny_tokenizer();
    tokenizer.save(dir.join(TOKENIZER_FILE), false).unwrap();
    SentimentAnalysisPipeline::from_parts(
        model,
        &tiny_config(),
        tokenizer,
        Device::Cpu,
        ArtifactSource::FineTuned(dir.to_path_buf()),
    )
    .unwrap()
}
