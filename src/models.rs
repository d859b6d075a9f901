use serde::{Deserialize, Serialize};

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

/// Reply to `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Plain text of one source file, before chunking.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    pub source: String,
}

/// A slice of a [`Document`], the unit that gets embedded and retrieved.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub source: String,
}

/// A chunk as stored, with its embedding.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredChunk {
    pub id: String,
    pub content: String,
    pub source: String,
    pub embedding: Vec<f32>,
}

/// A retrieved chunk and its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}
