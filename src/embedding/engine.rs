// Local sentence embeddings via a BERT model loaded with candle
use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::sync::Arc;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::errors::{RagError, Result};

pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

struct Model {
    bert: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// In-process embedder; inference runs on the blocking pool
pub struct LocalEmbedder {
    model: Arc<Model>,
    model_id: String,
    dimension: usize,
}

impl LocalEmbedder {
    /// Load a model from the HuggingFace Hub (downloads on first use)
    pub fn new(model_id: &str) -> Result<Self> {
        Self::load(model_id).map_err(|e| RagError::Embedding(format!("{:#}", e)))
    }

    fn load(model_id: &str) -> AnyResult<Self> {
        let device = Device::Cpu;

        let api = Api::new().context("Failed to create HuggingFace API client")?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo.get("config.json").context("Failed to download model config")?;
        let tokenizer_path = repo.get("tokenizer.json").context("Failed to download tokenizer")?;
        let weights_path = repo
            .get("model.safetensors")
            .context("Failed to download model weights")?;

        let config_contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&config_contents).context("Failed to parse model config")?;
        let dimension = serde_json::from_str::<serde_json::Value>(&config_contents)?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .context("Model config has no hidden_size")? as usize;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .context("Failed to load model weights")?
        };
        let bert = BertModel::load(vb, &config).context("Failed to create BERT model")?;

        info!(model = model_id, dimension, "Local embedding model loaded");
        Ok(Self {
            model: Arc::new(Model {
                bert,
                tokenizer,
                device,
            }),
            model_id: model_id.to_string(),
            dimension,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl Model {
    fn embed_batch(&self, texts: &[&str]) -> AnyResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let batch_size = texts.len();

        let mut flat_ids = vec![0u32; batch_size * max_len];
        let mut flat_mask = vec![0u32; batch_size * max_len];
        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let row = i * max_len;
            flat_ids[row..row + ids.len()].copy_from_slice(ids);
            flat_mask[row..row + mask.len()].copy_from_slice(mask);
        }

        let token_ids = Tensor::from_vec(flat_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(flat_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = token_ids.zeros_like()?;

        let hidden = self
            .bert
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = mean_pool(&hidden, &attention_mask)?;

        Ok(pooled.to_vec2::<f32>()?)
    }
}

/// Mean over the sequence, padding masked out
fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> AnyResult<Tensor> {
    let mask = attention_mask
        .unsqueeze(2)?
        .expand(hidden.shape())?
        .to_dtype(hidden.dtype())?;

    let summed = (hidden * &mask)?.sum(1)?;
    let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
    Ok(summed.broadcast_div(&counts)?)
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.model.clone();
        let text = text.to_string();

        let mut vectors = tokio::task::spawn_blocking(move || model.embed_batch(&[text.as_str()]))
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding task panicked: {}", e)))?
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        debug!(model = %self.model_id, "Embedded text locally");
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("Model returned no vector".to_string()))
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_embed_single_text() {
        let embedder = LocalEmbedder::new(DEFAULT_MODEL_ID).expect("Failed to load model");
        let vector = embedder.embed("台積電 先進封裝").await.expect("Failed to embed");
        assert_eq!(vector.len(), embedder.dimension());
    }

    #[test]
    #[ignore] // Requires model download
    fn test_embed_empty_batch() {
        let embedder = LocalEmbedder::new(DEFAULT_MODEL_ID).expect("Failed to load model");
        let vectors = embedder.model.embed_batch(&[]).expect("Failed to embed empty batch");
        assert!(vectors.is_empty());
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        let device = Device::Cpu;
        // One sequence of two tokens, the second is padding
        let hidden = Tensor::from_vec(vec![1f32, 3.0, 100.0, 100.0], (1, 2, 2), &device).unwrap();
        let mask = Tensor::from_vec(vec![1u32, 0], (1, 2), &device).unwrap();
        let pooled = mean_pool(&hidden, &mask).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(pooled, vec![vec![1.0, 3.0]]);
    }
}
