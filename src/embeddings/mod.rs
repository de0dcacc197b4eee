pub mod local;
pub mod ollama;

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;

use crate::config::{Config, EmbeddingBackend};

/// Dimensionality used when nothing else is configured (all-MiniLM family).
pub const DEFAULT_DIMENSIONS: usize = 384;

/// A batch embedding capability: one fixed-length vector per input text,
/// in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;
}

/// Decorator that turns provider failures into all-zero vectors so embedding
/// calls never propagate errors. Failed embeddings are still indexed and
/// findable (they cluster near the zero point) instead of blocking ingestion.
pub struct ZeroFallback {
    inner: Box<dyn EmbeddingProvider>,
}

impl ZeroFallback {
    pub fn new(inner: Box<dyn EmbeddingProvider>) -> Self {
        Self { inner }
    }

    pub fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    /// Embed a batch of texts. Never fails: on provider error (or a response
    /// with the wrong cardinality) every text gets a zero vector instead.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        match self.inner.embed_batch(texts).await {
            Ok(vectors) if vectors.len() == texts.len() => vectors,
            Ok(vectors) => {
                eprintln!(
                    "{} embedding provider returned {} vectors for {} texts, using zero vectors",
                    "Warning:".yellow(),
                    vectors.len(),
                    texts.len()
                );
                self.zeros(texts.len())
            }
            Err(e) => {
                eprintln!(
                    "{} embedding provider failed ({}), using zero vectors",
                    "Warning:".yellow(),
                    e
                );
                self.zeros(texts.len())
            }
        }
    }

    /// Embed a single text, degrading to a zero vector on failure.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let texts = [text.to_string()];
        self.embed_batch(&texts)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| vec![0.0; self.dimensions()])
    }

    fn zeros(&self, count: usize) -> Vec<Vec<f32>> {
        vec![vec![0.0; self.inner.dimensions()]; count]
    }
}

/// Build the configured embedding provider. The backend is selected once
/// here; callers wrap it in [`ZeroFallback`] via the question store.
pub fn provider_from_config(config: &Config) -> Box<dyn EmbeddingProvider> {
    match config.embedding_backend.unwrap_or(EmbeddingBackend::Local) {
        EmbeddingBackend::Ollama => Box::new(ollama::OllamaEmbeddings::new(
            config.ollama_url(),
            config.embedding_model.clone(),
            config.embedding_dimensions.unwrap_or(DEFAULT_DIMENSIONS),
        )),
        EmbeddingBackend::Local => Box::new(local::LocalEmbeddings::new()),
    }
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance: lower means more similar. Raw value, not normalized to
/// [0, 1] — callers must not assume a bounded range.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Find the nearest stored vectors to a query embedding, ranked by
/// ascending distance.
pub fn find_nearest(
    query_embedding: &[f32],
    embeddings: &[(String, Vec<f32>)], // (id, embedding)
    top_n: usize,
) -> Vec<(String, f32)> {
    let mut scores: Vec<(String, f32)> = embeddings
        .iter()
        .map(|(id, emb)| (id.clone(), cosine_distance(query_embedding, emb)))
        .collect();

    scores.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    scores.truncate(top_n);
    scores
}

/// Serialize embedding to bytes for storage
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from bytes
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            anyhow::bail!("backend unreachable")
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("backend unreachable")
        }

        fn model_name(&self) -> &str {
            "failing"
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_zero_vector() {
        let zero = vec![0.0, 0.0, 0.0];
        let v = vec![1.0, 2.0, 3.0];
        // Zero vectors compare as distance 1 to everything
        assert!((cosine_distance(&zero, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let embedding = vec![0.5, -1.25, 3.75, 0.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes_to_embedding(&bytes), embedding);
    }

    #[test]
    fn test_find_nearest_orders_by_ascending_distance() {
        let query = vec![1.0, 0.0];
        let stored = vec![
            ("far".to_string(), vec![0.0, 1.0]),
            ("near".to_string(), vec![1.0, 0.1]),
            ("exact".to_string(), vec![1.0, 0.0]),
        ];

        let ranked = find_nearest(&query, &stored, 10);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, "exact");
        assert_eq!(ranked[1].0, "near");
        assert_eq!(ranked[2].0, "far");
        assert!(ranked[0].1 <= ranked[1].1 && ranked[1].1 <= ranked[2].1);
    }

    #[test]
    fn test_find_nearest_respects_top_n() {
        let query = vec![1.0, 0.0];
        let stored = vec![
            ("a".to_string(), vec![1.0, 0.0]),
            ("b".to_string(), vec![0.5, 0.5]),
            ("c".to_string(), vec![0.0, 1.0]),
        ];

        assert_eq!(find_nearest(&query, &stored, 2).len(), 2);
        assert_eq!(find_nearest(&query, &stored, 0).len(), 0);
    }

    #[tokio::test]
    async fn test_zero_fallback_degrades_instead_of_failing() {
        let fallback = ZeroFallback::new(Box::new(FailingProvider));
        let texts = vec!["one".to_string(), "two".to_string()];

        let vectors = fallback.embed_batch(&texts).await;
        assert_eq!(vectors.len(), 2);
        for v in &vectors {
            assert_eq!(v.len(), 4);
            assert!(v.iter().all(|x| *x == 0.0));
        }
    }
}
