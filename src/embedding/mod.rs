//! Embedding providers
//!
//! - Gemini: hosted `embedContent` REST API
//! - Local: BERT-style sentence model run in-process through candle

pub mod engine;
pub mod gemini;

use async_trait::async_trait;

use crate::errors::Result;

pub use engine::LocalEmbedder;
pub use gemini::GeminiEmbedder;

/// Text to fixed-dimension vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this provider returns
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Short provider label for logs and stats
    fn name(&self) -> &str;
}
