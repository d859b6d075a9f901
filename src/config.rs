use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::AppError;

pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_COLLECTION: &str = "rag_documents";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_N_RESULTS: usize = 3;
pub const DEFAULT_PORT: u16 = 8000;

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub collection_name: String,
    pub embedding_model: String,
    pub data_dir: PathBuf,
    pub n_results: usize,
    pub port: u16,
}

impl Settings {
    /// Reads settings from the process environment. Call after
    /// `dotenvy::dotenv()` so `.env` values are visible.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| AppError::MissingSetting { key: key.to_string() })
        };

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            groq_api_key: require("GROQ_API_KEY")?,
            groq_model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            collection_name: get("COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            n_results: parse_or("N_RESULTS", get("N_RESULTS"), DEFAULT_N_RESULTS)?,
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, AppError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| AppError::InvalidSetting {
            key: key.to_string(),
            value,
        }),
    }
}
