use thiserror::Error;

/// Top-level application error.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Configuration errors ─────────────────────────────────────────────────
    #[error("Missing required setting {key}")]
    MissingSetting { key: String },

    #[error("Invalid value '{value}' for setting {key}")]
    InvalidSetting { key: String, value: String },

    // ── Database errors ──────────────────────────────────────────────────────
    #[error("Database connection failed: {0}")]
    DatabaseConnectionFailed(#[source] sqlx::Error),

    #[error("Database query failed: {message}")]
    DatabaseQueryFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    // ── Document ingestion errors ────────────────────────────────────────────
    #[error("Could not read document {path}: {message}")]
    DocumentUnreadable { path: String, message: String },

    #[error("Embedding failed: {message}")]
    EmbeddingFailed { message: String },

    // ── LLM errors ───────────────────────────────────────────────────────────
    #[error("Language model service unavailable ({provider})")]
    LlmUnavailable { provider: String },

    #[error("Inference error: {message}")]
    InferenceError { message: String },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Field '{field_name}' exceeds max length of {max_length} (actual: {actual_length})")]
    FieldTooLong { field_name: String, max_length: usize, actual_length: usize },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn db_query(message: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::DatabaseQueryFailed { message: message.into(), source }
    }

    pub fn embedding(message: impl std::fmt::Display) -> Self {
        AppError::EmbeddingFailed { message: message.to_string() }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::EmptyField { .. } | AppError::FieldTooLong { .. })
    }

    pub fn is_llm_unavailable(&self) -> bool {
        matches!(self, AppError::LlmUnavailable { .. })
    }
}
