use std::sync::Arc;

use tracing::debug;

use crate::agent::{Answerer, GroqAgentService};
use crate::db::chunk_repository::ChunkRepository;
use crate::embeddings::{embed_blocking, top_matches, Embedder};
use crate::errors::AppError;
use crate::models::{ChatRequest, ChatResponse, ScoredChunk, StoredChunk};

const MAX_QUERY_LENGTH: usize = 8000;
const NO_CONTEXT: &str = "No relevant context found.";

/// Where retrieval reads embedded chunks from. Postgres in production.
pub trait ChunkSource: Send + Sync {
    fn find_all(
        &self,
        collection: &str,
    ) -> impl std::future::Future<Output = Result<Vec<StoredChunk>, AppError>> + Send;
}

impl ChunkSource for ChunkRepository {
    async fn find_all(&self, collection: &str) -> Result<Vec<StoredChunk>, AppError> {
        ChunkRepository::find_all(self, collection).await
    }
}

/// Retrieval-augmented question answering over the indexed collection.
#[derive(Clone)]
pub struct ChatService<R = ChunkRepository, A = GroqAgentService> {
    chunk_repo: R,
    embedder: Arc<dyn Embedder>,
    agent: A,
    collection: String,
    n_results: usize,
}

impl<R: ChunkSource, A: Answerer> ChatService<R, A> {
    pub fn new(
        chunk_repo: R,
        embedder: Arc<dyn Embedder>,
        agent: A,
        collection: String,
        n_results: usize,
    ) -> Self {
        Self { chunk_repo, embedder, agent, collection, n_results }
    }

    /// Answers one query from the `n_results` closest chunks.
    ///
    /// Every stored embedding is fetched and scored in process on each call,
    /// which suits a single syllabus collection but grows linearly with it.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, AppError> {
        let query = validate_query(&request.query)?;

        // ── Retrieve ──────────────────────────────────────────────────────────
        let query_embedding = embed_blocking(self.embedder.clone(), vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::embedding("no embedding returned for query"))?;
        let stored = self.chunk_repo.find_all(&self.collection).await?;
        let matches = top_matches(&query_embedding, stored, self.n_results);
        debug!(
            "Retrieved {} chunk(s), best score {:?}",
            matches.len(),
            matches.first().map(|m| m.score)
        );

        // ── Generate ──────────────────────────────────────────────────────────
        let answer = self.agent.answer(&build_context(&matches), query).await?;
        if answer.trim().is_empty() {
            return Err(AppError::InferenceError {
                message: format!("model {} returned an empty answer", self.agent.model()),
            });
        }

        Ok(ChatResponse { answer, sources: collect_sources(&matches) })
    }
}

/// Trims the query and enforces the length limits.
fn validate_query(raw: &str) -> Result<&str, AppError> {
    let query = raw.trim();
    if query.is_empty() {
        return Err(AppError::EmptyField { field_name: "query".to_string() });
    }
    let length = query.chars().count();
    if length > MAX_QUERY_LENGTH {
        return Err(AppError::FieldTooLong {
            field_name: "query".to_string(),
            max_length: MAX_QUERY_LENGTH,
            actual_length: length,
        });
    }
    Ok(query)
}

fn build_context(matches: &[ScoredChunk]) -> String {
    if matches.is_empty() {
        return NO_CONTEXT.to_string();
    }
    matches
        .iter()
        .map(|m| m.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Distinct sources of the retrieved chunks, best match first.
fn collect_sources(matches: &[ScoredChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for m in matches {
        if !sources.contains(&m.chunk.source) {
            sources.push(m.chunk.source.clone());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::models::Chunk;

    /// Embeds every text as the same fixed vector.
    struct FixedEmbedder(Vec<f32>);

    impl Embedder for FixedEmbedder {
        fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        chunks: Vec<StoredChunk>,
        asked_for: Mutex<Vec<String>>,
    }

    impl ChunkSource for MemoryStore {
        async fn find_all(&self, collection: &str) -> Result<Vec<StoredChunk>, AppError> {
            self.asked_for.lock().unwrap().push(collection.to_string());
            Ok(self.chunks.clone())
        }
    }

    /// Replies with a canned answer and records what it was given.
    struct CannedAnswerer {
        reply: String,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl CannedAnswerer {
        fn replying(reply: &str) -> Self {
            Self { reply: reply.to_string(), prompts: Mutex::new(Vec::new()) }
        }
    }

    impl Answerer for CannedAnswerer {
        fn model(&self) -> &str {
            "canned"
        }

        async fn answer(&self, context: &str, question: &str) -> Result<String, AppError> {
            self.prompts
                .lock()
                .unwrap()
                .push((context.to_string(), question.to_string()));
            Ok(self.reply.clone())
        }
    }

    fn stored(id: &str, source: &str, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk {
            id: id.to_string(),
            content: format!("{id} text"),
            source: source.to_string(),
            embedding,
        }
    }

    fn service(
        chunks: Vec<StoredChunk>,
        reply: &str,
        n_results: usize,
    ) -> ChatService<MemoryStore, CannedAnswerer> {
        ChatService::new(
            MemoryStore { chunks, ..Default::default() },
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            CannedAnswerer::replying(reply),
            "syllabus".to_string(),
            n_results,
        )
    }

    fn request(query: &str) -> ChatRequest {
        ChatRequest { query: query.to_string() }
    }

    #[tokio::test]
    async fn answers_from_the_closest_chunks() {
        let svc = service(
            vec![
                stored("unrelated", "data/hostel.pdf", vec![0.0, 1.0]),
                stored("second", "data/syllabus.pdf", vec![0.8, 0.2]),
                stored("best", "data/regulations.pdf", vec![1.0, 0.0]),
                stored("third", "data/regulations.pdf", vec![0.6, 0.4]),
            ],
            "Minor degrees need 20 extra credits",
            3,
        );

        let response = svc.chat(request("  minor degree rules \n")).await.unwrap();

        assert_eq!(response.answer, "Minor degrees need 20 extra credits");
        assert_eq!(response.sources, vec!["data/regulations.pdf", "data/syllabus.pdf"]);
        assert_eq!(*svc.chunk_repo.asked_for.lock().unwrap(), vec!["syllabus"]);
        let prompts = svc.agent.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, "best text\n\nsecond text\n\nthird text");
        assert_eq!(prompts[0].1, "minor degree rules");
    }

    #[tokio::test]
    async fn empty_store_answers_without_context_or_sources() {
        let svc = service(Vec::new(), "I cannot find that specific detail.", 3);

        let response = svc.chat(request("exam schedule")).await.unwrap();

        assert!(response.sources.is_empty());
        assert_eq!(svc.agent.prompts.lock().unwrap()[0].0, NO_CONTEXT);
    }

    #[tokio::test]
    async fn blank_model_answer_is_an_inference_error() {
        let svc = service(vec![stored("best", "data/syllabus.pdf", vec![1.0, 0.0])], " \n ", 3);

        let err = svc.chat(request("credits for ML")).await.unwrap_err();

        assert!(matches!(err, AppError::InferenceError { .. }));
        assert!(err.to_string().contains("canned"));
    }

    #[tokio::test]
    async fn blank_query_never_reaches_the_model() {
        let svc = service(Vec::new(), "unused", 3);

        let err = svc.chat(request("   ")).await.unwrap_err();

        assert!(err.is_validation());
        assert!(svc.chunk_repo.asked_for.lock().unwrap().is_empty());
        assert!(svc.agent.prompts.lock().unwrap().is_empty());
    }

    fn scored(content: &str, source: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: format!("{source}#{content}"),
                content: content.to_string(),
                source: source.to_string(),
            },
            score,
        }
    }

    #[test]
    fn blank_query_is_rejected() {
        let err = validate_query("  \n ").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn overlong_query_is_rejected() {
        let err = validate_query(&"q".repeat(MAX_QUERY_LENGTH + 1)).unwrap_err();
        assert!(matches!(err, AppError::FieldTooLong { actual_length, .. } if actual_length == MAX_QUERY_LENGTH + 1));
    }

    #[test]
    fn query_is_trimmed() {
        assert_eq!(validate_query("  exam schedule \n").unwrap(), "exam schedule");
    }

    #[test]
    fn context_joins_chunks_with_blank_lines() {
        let matches = vec![scored("Unit 1: Sets", "dm.pdf", 0.9), scored("Unit 2: Graphs", "dm.pdf", 0.8)];
        assert_eq!(build_context(&matches), "Unit 1: Sets\n\nUnit 2: Graphs");
    }

    #[test]
    fn empty_retrieval_uses_placeholder_context() {
        assert_eq!(build_context(&[]), "No relevant context found.");
    }

    #[test]
    fn sources_are_deduplicated_in_rank_order() {
        let matches = vec![
            scored("a", "data/regulations.pdf", 0.9),
            scored("b", "data/syllabus.pdf", 0.8),
            scored("c", "data/regulations.pdf", 0.7),
        ];
        assert_eq!(
            collect_sources(&matches),
            vec!["data/regulations.pdf", "data/syllabus.pdf"]
        );
    }
}
