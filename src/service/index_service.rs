use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::db::chunk_repository::ChunkRepository;
use crate::embeddings::{embed_blocking, Embedder};
use crate::errors::AppError;
use crate::ingest::loader::load_documents;
use crate::ingest::splitter::TextSplitter;
use crate::ingest::chunk_documents;
use crate::models::{Chunk, Document};

/// Chunks embedded per model call.
const EMBED_BATCH_SIZE: usize = 64;

/// What a startup indexing run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    NothingToIndex,
    AlreadyIndexed { existing: i64 },
    Indexed { chunks: usize },
}

/// Where embedded chunks end up. Postgres in production.
pub trait ChunkSink: Send + Sync {
    fn count(&self, collection: &str) -> impl std::future::Future<Output = Result<i64, AppError>> + Send;
    fn save_batch(
        &self,
        collection: &str,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> impl std::future::Future<Output = Result<(), AppError>> + Send;
}

impl ChunkSink for ChunkRepository {
    async fn count(&self, collection: &str) -> Result<i64, AppError> {
        ChunkRepository::count(self, collection).await
    }

    async fn save_batch(
        &self,
        collection: &str,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), AppError> {
        ChunkRepository::save_batch(self, collection, chunks, embeddings).await
    }
}

/// Loads the document directory into the chunk store once. A collection
/// that already holds chunks is left untouched.
pub struct IndexService<S = ChunkRepository> {
    sink: S,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    collection: String,
}

impl<S: ChunkSink> IndexService<S> {
    pub fn new(sink: S, embedder: Arc<dyn Embedder>, collection: impl Into<String>) -> Self {
        Self {
            sink,
            embedder,
            splitter: TextSplitter::default(),
            collection: collection.into(),
        }
    }

    pub async fn index_directory(&self, data_dir: &Path) -> Result<IndexOutcome, AppError> {
        let dir = data_dir.to_path_buf();
        let documents = tokio::task::spawn_blocking(move || load_documents(&dir))
            .await
            .map_err(|e| AppError::Unexpected(format!("Document loading task failed: {e}")))??;
        self.index(documents).await
    }

    pub async fn index(&self, documents: Vec<Document>) -> Result<IndexOutcome, AppError> {
        info!("Processing {} documents", documents.len());
        let chunks = chunk_documents(&documents, &self.splitter);
        if chunks.is_empty() {
            info!("No content to add");
            return Ok(IndexOutcome::NothingToIndex);
        }

        let existing = self.sink.count(&self.collection).await?;
        if existing > 0 {
            info!(
                "Collection {} already contains {existing} chunks. Skipping re-embedding.",
                self.collection
            );
            return Ok(IndexOutcome::AlreadyIndexed { existing });
        }

        let total = chunks.len();
        info!("Creating embeddings for {total} chunks");
        let mut done = 0;
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = embed_blocking(self.embedder.clone(), texts).await?;
            self.sink.save_batch(&self.collection, batch, &embeddings).await?;
            done += batch.len();
            info!("Indexed {done}/{total} chunks");
        }

        Ok(IndexOutcome::Indexed { chunks: total })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Embeds each text as `[len, 1.0]`.
    struct LengthEmbedder;

    impl Embedder for LengthEmbedder {
        fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        existing: i64,
        batches: Mutex<Vec<(String, Vec<Chunk>, Vec<Vec<f32>>)>>,
    }

    impl ChunkSink for MemorySink {
        async fn count(&self, _collection: &str) -> Result<i64, AppError> {
            Ok(self.existing)
        }

        async fn save_batch(
            &self,
            collection: &str,
            chunks: &[Chunk],
            embeddings: &[Vec<f32>],
        ) -> Result<(), AppError> {
            self.batches.lock().unwrap().push((
                collection.to_string(),
                chunks.to_vec(),
                embeddings.to_vec(),
            ));
            Ok(())
        }
    }

    fn service(sink: MemorySink) -> IndexService<MemorySink> {
        IndexService::new(sink, Arc::new(LengthEmbedder), "syllabus")
    }

    fn doc(content: &str) -> Document {
        Document { content: content.to_string(), source: "data/syllabus.pdf".to_string() }
    }

    #[tokio::test]
    async fn embeds_and_saves_in_batches() {
        // 130 paragraphs of ~900 chars each become 130 chunks.
        let paragraphs: Vec<String> = (0..130).map(|i| format!("P{i} {}", "y".repeat(900))).collect();
        let svc = service(MemorySink::default());

        let outcome = svc.index(vec![doc(&paragraphs.join("\n\n"))]).await.unwrap();

        assert_eq!(outcome, IndexOutcome::Indexed { chunks: 130 });
        let batches = svc.sink.batches.lock().unwrap();
        let sizes: Vec<_> = batches.iter().map(|(_, c, _)| c.len()).collect();
        assert_eq!(sizes, vec![64, 64, 2]);
        assert!(batches.iter().all(|(collection, c, e)| collection == "syllabus" && c.len() == e.len()));
        assert_eq!(batches[0].1[0].id, "doc_0_chunk_0");
    }

    #[tokio::test]
    async fn populated_collection_is_not_reindexed() {
        let svc = service(MemorySink { existing: 42, ..Default::default() });

        let outcome = svc.index(vec![doc("Minor degree regulations")]).await.unwrap();

        assert_eq!(outcome, IndexOutcome::AlreadyIndexed { existing: 42 });
        assert!(svc.sink.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_documents_means_nothing_to_index() {
        let svc = service(MemorySink::default());
        assert_eq!(svc.index(Vec::new()).await.unwrap(), IndexOutcome::NothingToIndex);
    }

    #[tokio::test]
    async fn indexes_a_directory_of_text_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("sem6.txt"), "Sem 6: Compilers, AI, Cloud").unwrap();
        let svc = service(MemorySink::default());

        let outcome = svc.index_directory(tmp.path()).await.unwrap();

        assert_eq!(outcome, IndexOutcome::Indexed { chunks: 1 });
    }
}
