use anyhow::{Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Mutex, OnceLock};

use super::{DEFAULT_DIMENSIONS, EmbeddingProvider};

/// Global embedding model instance (loaded once)
static EMBEDDING_MODEL: OnceLock<Mutex<TextEmbedding>> = OnceLock::new();

/// Get or initialize the embedding model
fn get_model() -> Result<&'static Mutex<TextEmbedding>> {
    if let Some(model) = EMBEDDING_MODEL.get() {
        return Ok(model);
    }

    // Initialize the model
    let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
        .context("Failed to initialize embedding model")?;

    // Try to set it (another thread might have beat us)
    let _ = EMBEDDING_MODEL.set(Mutex::new(model));

    EMBEDDING_MODEL.get().context("Failed to get embedding model")
}

/// In-process embedding backend running an ONNX sentence-transformers model.
pub struct LocalEmbeddings;

impl LocalEmbeddings {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalEmbeddings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        self.embed_batch(&texts)
            .await?
            .into_iter()
            .next()
            .context("No embedding generated")
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = get_model()?;
        let model = model
            .lock()
            .map_err(|_| anyhow::anyhow!("Failed to lock embedding model"))?;

        let embeddings = model
            .embed(texts.to_vec(), None)
            .context("Failed to generate embeddings")?;

        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }

    fn dimensions(&self) -> usize {
        DEFAULT_DIMENSIONS
    }
}
