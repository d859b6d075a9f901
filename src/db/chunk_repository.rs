use chrono::Utc;
use sqlx::PgPool;
use tracing::error;

use crate::errors::AppError;
use crate::models::{Chunk, StoredChunk};

/// Embedded document chunks, partitioned by collection name.
#[derive(Clone)]
pub struct ChunkRepository {
    pool: PgPool,
}

impl ChunkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self, collection: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM document_chunks WHERE collection = $1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to count chunks in {collection}: {e}");
                AppError::db_query(format!("Failed to count chunks in {collection}"), e)
            })
    }

    pub async fn find_all(&self, collection: &str) -> Result<Vec<StoredChunk>, AppError> {
        sqlx::query_as::<_, StoredChunk>(
            "SELECT id, content, source, embedding
             FROM document_chunks
             WHERE collection = $1
             ORDER BY id",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch chunks for {collection}: {e}");
            AppError::db_query(format!("Failed to fetch chunks for {collection}"), e)
        })
    }

    /// Inserts one batch atomically. `chunks` and `embeddings` are parallel.
    pub async fn save_batch(
        &self,
        collection: &str,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), AppError> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::Unexpected(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::db_query("Failed to start transaction", e))?;

        let now = Utc::now();
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            sqlx::query(
                "INSERT INTO document_chunks (collection, id, content, source, embedding, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (collection, id) DO NOTHING",
            )
            .bind(collection)
            .bind(&chunk.id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(embedding)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to save chunk {}: {e}", chunk.id);
                AppError::db_query("Failed to save chunk", e)
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::db_query("Failed to commit chunk batch", e))
    }
}
