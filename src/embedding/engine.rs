// Embedding engine: local sentence embeddings via Candle
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{Config as XlmRobertaConfig, XLMRobertaModel};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::embedding::{EmbeddingMatrix, TextEmbedder};
use crate::errors::{RagError, Result};

/// Default embedding model (instruction-tuned, queries need framing)
pub const DEFAULT_MODEL_ID: &str = "intfloat/multilingual-e5-large-instruct";

/// Tokens beyond this length are truncated
pub const MAX_SEQUENCE_LENGTH: usize = 512;

/// Encoder architectures we know how to load
enum Encoder {
    Bert(BertModel),
    XlmRoberta(XLMRobertaModel),
}

impl Encoder {
    /// Last hidden state, shape `[batch, seq, hidden]`
    fn forward(&self, token_ids: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        let token_type_ids = token_ids.zeros_like()?;
        match self {
            Encoder::Bert(model) => model.forward(token_ids, &token_type_ids, Some(attention_mask)),
            Encoder::XlmRoberta(model) => {
                model.forward(token_ids, attention_mask, &token_type_ids, None, None, None)
            }
        }
    }
}

/// Resolved model files
struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl ModelFiles {
    /// Use a local directory if `model_id` names one, otherwise the HuggingFace Hub
    fn resolve(model_id: &str) -> Result<Self> {
        let local = Path::new(model_id);
        if local.is_dir() {
            debug!(dir = %local.display(), "Using local embedding model");
            return Ok(Self {
                config: local.join("config.json"),
                tokenizer: local.join("tokenizer.json"),
                weights: local.join("model.safetensors"),
            });
        }

        let api = Api::new().map_err(|e| embedding_error("create HuggingFace API client", e))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        Ok(Self {
            config: repo
                .get("config.json")
                .map_err(|e| embedding_error("download model config", e))?,
            tokenizer: repo
                .get("tokenizer.json")
                .map_err(|e| embedding_error("download tokenizer", e))?,
            weights: repo
                .get("model.safetensors")
                .map_err(|e| embedding_error("download model weights", e))?,
        })
    }
}

fn embedding_error(action: &str, err: impl std::fmt::Display) -> RagError {
    RagError::Embedding(format!("Failed to {}: {}", action, err))
}

/// XLM-RoBERTa weights at the top level, or nested under `roberta.`
///
/// Checkpoints exported from a task head use the nested layout. When both
/// fail, the top-level error is the one reported.
fn load_xlm_roberta(config: &XlmRobertaConfig, vb: VarBuilder) -> Result<XLMRobertaModel> {
    match XLMRobertaModel::new(config, vb.clone()) {
        Ok(model) => Ok(model),
        Err(top_level) => match XLMRobertaModel::new(config, vb.pp("roberta")) {
            Ok(model) => Ok(model),
            Err(nested) => {
                debug!(error = %nested, "No encoder under 'roberta.' either");
                Err(top_level.into())
            }
        },
    }
}

/// Embedding engine: tokenizer + encoder + masked mean pooling
///
/// Load once per process and pass by reference; `embed` never reloads.
pub struct EmbeddingEngine {
    model: Encoder,
    tokenizer: Tokenizer,
    device: Device,
    pad_token_id: u32,
    dimension: usize,
    model_id: String,
}

impl EmbeddingEngine {
    /// Load the default model
    pub fn new() -> Result<Self> {
        Self::load(DEFAULT_MODEL_ID)
    }

    /// Load a model by HuggingFace id or local directory (downloads on first use)
    pub fn load(model_id: &str) -> Result<Self> {
        // CPU only
        let device = Device::Cpu;
        let files = ModelFiles::resolve(model_id)?;

        let config_contents = std::fs::read_to_string(&files.config)
            .map_err(|e| embedding_error("read config file", e))?;
        let raw_config: serde_json::Value = serde_json::from_str(&config_contents)
            .map_err(|e| embedding_error("parse model config", e))?;

        let model_type = raw_config["model_type"].as_str().unwrap_or("bert").to_string();
        let pad_token_id = raw_config["pad_token_id"].as_u64().unwrap_or(0) as u32;
        let dimension = raw_config["hidden_size"]
            .as_u64()
            .ok_or_else(|| RagError::Embedding("Model config has no hidden_size".to_string()))?
            as usize;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| embedding_error("load tokenizer", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| embedding_error("configure truncation", e))?;
        // Padding is done per batch below, with the model's own pad id
        tokenizer.with_padding(None);

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights], DType::F32, &device)?
        };

        let model = match model_type.as_str() {
            "xlm-roberta" => {
                let config: XlmRobertaConfig = serde_json::from_value(raw_config)
                    .map_err(|e| embedding_error("parse XLM-RoBERTa config", e))?;
                Encoder::XlmRoberta(load_xlm_roberta(&config, vb)?)
            }
            "bert" => {
                let config: BertConfig = serde_json::from_value(raw_config)
                    .map_err(|e| embedding_error("parse BERT config", e))?;
                Encoder::Bert(BertModel::load(vb, &config)?)
            }
            other => {
                return Err(RagError::Embedding(format!(
                    "Unsupported embedding architecture '{}'",
                    other
                )))
            }
        };

        info!(model = model_id, architecture = %model_type, dimension, "Embedding model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            pad_token_id,
            dimension,
            model_id: model_id.to_string(),
        })
    }

    /// Mean pooling with attention mask
    ///
    /// Padding positions are zeroed before summing; the sum is divided by
    /// the number of real tokens in each row.
    pub fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        // Expand attention mask to match embeddings shape
        let (batch, seq_len, hidden) = embeddings.dims3()?;
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .expand((batch, seq_len, hidden))?
            .to_dtype(embeddings.dtype())?;

        let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;
        let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(sum_embeddings.broadcast_div(&sum_mask)?)
    }

    /// Scale every row to unit L2 length
    pub fn l2_normalize(embeddings: &Tensor) -> Result<Tensor> {
        let norms = embeddings
            .sqr()?
            .sum_keepdim(1)?
            .sqrt()?
            .clamp(1e-12, f64::MAX)?;
        Ok(embeddings.broadcast_div(&norms)?)
    }

    /// Embedding dimension (the encoder's hidden size)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Model identifier this engine was loaded from
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl TextEmbedder for EmbeddingEngine {
    fn expected_dim(&self) -> Option<usize> {
        Some(self.dimension)
    }

    fn embed(&self, texts: &[&str]) -> Result<EmbeddingMatrix> {
        if texts.is_empty() {
            return Ok(EmbeddingMatrix::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| RagError::Embedding(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings.iter().map(|enc| enc.get_ids().len()).max().unwrap_or(0);
        let batch_size = texts.len();

        // Pad to the longest sequence in this batch
        let mut padded_ids = vec![vec![self.pad_token_id; max_len]; batch_size];
        let mut padded_mask = vec![vec![0u32; max_len]; batch_size];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            padded_ids[i][..ids.len()].copy_from_slice(ids);
            padded_mask[i][..mask.len()].copy_from_slice(mask);
        }

        let flat_ids: Vec<u32> = padded_ids.into_iter().flatten().collect();
        let flat_mask: Vec<u32> = padded_mask.into_iter().flatten().collect();

        let token_ids = Tensor::from_vec(flat_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(flat_mask, (batch_size, max_len), &self.device)?;

        let hidden = self.model.forward(&token_ids, &attention_mask)?;
        let pooled = Self::mean_pool(&hidden, &attention_mask)?;
        let normalized = Self::l2_normalize(&pooled)?;

        debug!(batch_size, max_len, "Embedded batch");

        EmbeddingMatrix::from_tensor(&normalized)
    }
}
