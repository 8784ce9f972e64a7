//! Locating and loading the files that make up a model artifact.
//!
//! An artifact is either the base model on the Hugging Face Hub or a local
//! fine-tuned directory. Both resolve to a [`ModelFiles`] set:
//! - `config.json`
//! - weights (`model.safetensors`, falling back to `pytorch_model.bin`)
//! - a tokenizer (`tokenizer.json`, falling back to `vocab.json` + `merges.txt`)

use anyhow::{Context, Error as E, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use hf_hub::api::sync::Api;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::models::bpe::BPE;
use tokenizers::normalizers::NormalizerWrapper;
use tokenizers::pre_tokenizers::byte_level::ByteLevel;
use tokenizers::processors::roberta::RobertaProcessing;
use tokenizers::{AddedToken, Tokenizer, TokenizerBuilder};

use crate::artifact::{ArtifactSource, CONFIG_MARKER};
use crate::core::MODEL_NAME;
use crate::models::roberta::Config;

pub const SAFETENSORS_FILE: &str = "model.safetensors";
pub const PYTORCH_FILE: &str = "pytorch_model.bin";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
const VOCAB_FILE: &str = "vocab.json";
const MERGES_FILE: &str = "merges.txt";
const SPECIAL_TOKENS: [&str; 5] = ["<s>", "<pad>", "</s>", "<unk>", "<mask>"];

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            filename: filename.into(),
        }
    }

    /// Fetch the file into the local hub cache, retrying lock contention.
    pub fn load(&self) -> Result<PathBuf> {
        let api = Api::new()?;
        let repo = api.model(self.repo.clone());

        let max_retries = 3;
        let mut attempt = 0;
        loop {
            match repo.get(self.filename.as_str()) {
                Ok(path) => return Ok(path),
                Err(e) => {
                    let error_msg = e.to_string();
                    if error_msg.contains("Lock acquisition failed") && attempt < max_retries - 1 {
                        let wait_time = std::time::Duration::from_millis(100 * (1 << attempt));
                        tracing::debug!(
                            "Hub lock busy for {}/{}; retrying in {:?}",
                            self.repo,
                            self.filename,
                            wait_time
                        );
                        std::thread::sleep(wait_time);
                        attempt += 1;
                        continue;
                    }
                    return Err(E::new(e)
                        .context(format!("failed to fetch {}/{}", self.repo, self.filename)));
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerFiles {
    Json(PathBuf),
    VocabMerges { vocab: PathBuf, merges: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub weights: PathBuf,
    pub tokenizer: TokenizerFiles,
}

impl ModelFiles {
    pub fn locate(source: &ArtifactSource) -> Result<Self> {
        match source {
            ArtifactSource::Base => Self::from_hub(MODEL_NAME),
            ArtifactSource::FineTuned(dir) => Self::from_dir(dir),
        }
    }

    pub fn from_hub(repo: &str) -> Result<Self> {
        let config = HfLoader::new(repo, CONFIG_MARKER).load()?;

        let weights = match HfLoader::new(repo, SAFETENSORS_FILE).load() {
            Ok(safetensors) => safetensors,
            Err(_) => HfLoader::new(repo, PYTORCH_FILE).load().with_context(|| {
                format!("model weights not found in {repo}; expected `{SAFETENSORS_FILE}` or `{PYTORCH_FILE}`")
            })?,
        };

        let tokenizer = match HfLoader::new(repo, TOKENIZER_FILE).load() {
            Ok(json) => TokenizerFiles::Json(json),
            Err(_) => TokenizerFiles::VocabMerges {
                vocab: HfLoader::new(repo, VOCAB_FILE).load()?,
                merges: HfLoader::new(repo, MERGES_FILE).load()?,
            },
        };

        Ok(Self {
            config,
            weights,
            tokenizer,
        })
    }

    pub fn from_dir(dir: &Path) -> Result<Self> {
        let config = dir.join(CONFIG_MARKER);
        if !config.is_file() {
            anyhow::bail!("{} has no {CONFIG_MARKER}", dir.display());
        }

        let weights = [SAFETENSORS_FILE, PYTORCH_FILE]
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
            .with_context(|| {
                format!(
                    "no model weights in {}; expected `{SAFETENSORS_FILE}` or `{PYTORCH_FILE}`",
                    dir.display()
                )
            })?;

        let json = dir.join(TOKENIZER_FILE);
        let tokenizer = if json.is_file() {
            TokenizerFiles::Json(json)
        } else {
            let vocab = dir.join(VOCAB_FILE);
            let merges = dir.join(MERGES_FILE);
            if !(vocab.is_file() && merges.is_file()) {
                anyhow::bail!("no tokenizer files in {}", dir.display());
            }
            TokenizerFiles::VocabMerges { vocab, merges }
        };

        Ok(Self {
            config,
            weights,
            tokenizer,
        })
    }

    pub fn read_config_json(&self) -> Result<String> {
        std::fs::read_to_string(&self.config)
            .with_context(|| format!("failed to read config file {:?}", self.config))
    }

    pub fn load_config(&self) -> Result<Config> {
        let content = self.read_config_json()?;
        serde_json::from_str(&content)
            .map_err(|e| E::msg(format!("failed to parse model config {:?}: {e}", self.config)))
    }

    pub fn load_tokenizer(&self, config: &Config) -> Result<Tokenizer> {
        match &self.tokenizer {
            TokenizerFiles::Json(path) => Tokenizer::from_file(path)
                .map_err(|e| E::msg(format!("failed to load tokenizer {path:?}: {e}"))),
            TokenizerFiles::VocabMerges { vocab, merges } => {
                byte_level_bpe_tokenizer(vocab, merges, config)
            }
        }
    }

    /// Read-only weights for inference.
    pub fn var_builder(&self, device: &Device) -> Result<VarBuilder<'static>> {
        let dtype = DType::F32;
        if self.is_safetensors() {
            Ok(unsafe { VarBuilder::from_mmaped_safetensors(&[&self.weights], dtype, device)? })
        } else if self.is_pytorch() {
            Ok(VarBuilder::from_pth(&self.weights, dtype, device)?)
        } else {
            anyhow::bail!("unsupported weight file format: {:?}", self.weights);
        }
    }

    /// All weight tensors by name, as F32 on `device`, for seeding a trainable `VarMap`.
    pub fn load_tensors(&self, device: &Device) -> Result<HashMap<String, Tensor>> {
        let raw: Vec<(String, Tensor)> = if self.is_safetensors() {
            candle_core::safetensors::load(&self.weights, device)?
                .into_iter()
                .collect()
        } else if self.is_pytorch() {
            candle_core::pickle::read_all(&self.weights)?
        } else {
            anyhow::bail!("unsupported weight file format: {:?}", self.weights);
        };

        raw.into_iter()
            .map(|(name, tensor)| {
                let tensor = tensor.to_dtype(DType::F32)?.to_device(device)?;
                Ok((name, tensor))
            })
            .collect()
    }

    fn is_safetensors(&self) -> bool {
        self.weights
            .extension()
            .is_some_and(|ext| ext == "safetensors")
    }

    fn is_pytorch(&self) -> bool {
        self.weights.extension().is_some_and(|ext| ext == "bin")
    }
}

/// RoBERTa's byte-level BPE, for repos that ship only `vocab.json` and `merges.txt`.
fn byte_level_bpe_tokenizer(vocab: &Path, merges: &Path, config: &Config) -> Result<Tokenizer> {
    let vocab = vocab.to_string_lossy();
    let merges = merges.to_string_lossy();
    let bpe = BPE::from_file(&vocab, &merges)
        .build()
        .map_err(|e| E::msg(format!("failed to build BPE model: {e}")))?;

    let byte_level = ByteLevel::new(false, true, true);
    let post_processor = RobertaProcessing::new(
        ("</s>".to_string(), config.eos_token_id),
        ("<s>".to_string(), config.bos_token_id),
    );

    let tokenizer = TokenizerBuilder::<BPE, NormalizerWrapper, ByteLevel, RobertaProcessing, ByteLevel>::new()
        .with_model(bpe)
        .with_normalizer(None)
        .with_pre_tokenizer(Some(byte_level.clone()))
        .with_post_processor(Some(post_processor))
        .with_decoder(Some(byte_level))
        .build()
        .map_err(|e| E::msg(format!("failed to assemble tokenizer: {e}")))?;

    let mut tokenizer = Tokenizer::from(tokenizer);
    let specials: Vec<AddedToken> = SPECIAL_TOKENS
        .iter()
        .map(|token| AddedToken::from(*token, true))
        .collect();
    tokenizer.add_special_tokens(&specials);
    Ok(tokenizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_dir_prefers_safetensors_and_tokenizer_json() {
        let dir = tempfile::tempdir().unwrap();
        for name in [CONFIG_MARKER, SAFETENSORS_FILE, PYTORCH_FILE, TOKENIZER_FILE] {
            std::fs::write(dir.path().join(name), b"{}").unwrap();
        }
        let files = ModelFiles::from_dir(dir.path()).unwrap();
        assert_eq!(files.weights, dir.path().join(SAFETENSORS_FILE));
        assert_eq!(
            files.tokenizer,
            TokenizerFiles::Json(dir.path().join(TOKENIZER_FILE))
        );
    }

    #[test]
    fn local_dir_without_weights_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_MARKER), b"{}").unwrap();
        std::fs::write(dir.path().join(TOKENIZER_FILE), b"{}").unwrap();
        let err = ModelFiles::from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no model weights"));
    }

    #[test]
    fn vocab_merges_tokenizer_maps_special_tokens_to_their_ids() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join(VOCAB_FILE);
        let merges = dir.path().join(MERGES_FILE);
        std::fs::write(
            &vocab,
            r#"{"<s>": 0, "<pad>": 1, "</s>": 2, "<unk>": 3, "<mask>": 4, "h": 5, "i": 6, "hi": 7}"#,
        )
        .unwrap();
        std::fs::write(&merges, "#version: 0.2\nh i\n").unwrap();

        let tokenizer =
            byte_level_bpe_tokenizer(&vocab, &merges, &crate::test_support::tiny_config()).unwrap();
        let plain = tokenizer.encode("hi", false).unwrap();
        assert_eq!(plain.get_ids(), &[7]);

        let literal = tokenizer.encode("hi</s>hi", false).unwrap();
        assert_eq!(literal.get_ids(), &[7, 2, 7]);

        let framed = tokenizer.encode("hi", true).unwrap();
        assert_eq!(framed.get_ids(), &[0, 7, 2]);
    }

    #[test]
    fn local_dir_falls_back_to_vocab_and_merges() {
        let dir = tempfile::tempdir().unwrap();
        for name in [CONFIG_MARKER, PYTORCH_FILE, VOCAB_FILE, MERGES_FILE] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let files = ModelFiles::from_dir(dir.path()).unwrap();
        assert_eq!(files.weights, dir.path().join(PYTORCH_FILE));
        assert!(matches!(files.tokenizer, TokenizerFiles::VocabMerges { .. }));
    }
}
