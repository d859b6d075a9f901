use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use crate::errors::AppError;
use crate::models::{Chunk, ScoredChunk, StoredChunk};

/// Turns text into dense vectors. Implementations are synchronous and may be
/// CPU-heavy; async callers run them on the blocking pool.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError>;
}

/// Local ONNX embedding model via fastembed. The model is downloaded to the
/// fastembed cache on first use.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    pub fn load(model_name: &str) -> Result<Self, AppError> {
        let model = resolve_model(model_name)?;
        info!("Loading embedding model: {model_name}");
        let options = InitOptions::new(model).with_show_download_progress(false);
        let model = TextEmbedding::try_new(options).map_err(AppError::embedding)?;
        Ok(Self { model: Mutex::new(model) })
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| AppError::Unexpected("embedding model lock poisoned".to_string()))?;
        model.embed(texts, None).map_err(AppError::embedding)
    }
}

/// Runs `embedder` on the blocking pool so model inference does not stall
/// the async workers.
pub async fn embed_blocking(
    embedder: Arc<dyn Embedder>,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>, AppError> {
    tokio::task::spawn_blocking(move || embedder.embed(texts))
        .await
        .map_err(|e| AppError::Unexpected(format!("Embedding task failed: {e}")))?
}

/// Maps a configured model name onto a fastembed model. Accepts the
/// sentence-transformers style names used elsewhere for the same weights.
pub fn resolve_model(name: &str) -> Result<EmbeddingModel, AppError> {
    match name {
        "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        other => Err(AppError::InvalidSetting {
            key: "EMBEDDING_MODEL".to_string(),
            value: other.to_string(),
        }),
    }
}

/// Compute cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// The `limit` chunks most similar to `query`, best first. Ties keep store
/// order.
pub fn top_matches(query: &[f32], stored: Vec<StoredChunk>, limit: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = stored
        .into_iter()
        .map(|s| ScoredChunk {
            score: cosine_similarity(query, &s.embedding),
            chunk: Chunk { id: s.id, content: s.content, source: s.source },
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}
