mod agent;
mod config;
mod db;
mod embeddings;
mod errors;
mod ingest;
mod models;
mod routes;
mod service;

use std::sync::Arc;

use axum::http::{header, Method};
use axum::{routing::get, routing::post, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::GroqAgentService;
use crate::config::Settings;
use crate::db::chunk_repository::ChunkRepository;
use crate::embeddings::{Embedder, FastEmbedder};
use crate::errors::AppError;
use crate::routes::api_routes::{chat_handler, health_handler};
use crate::service::chat_service::ChatService;
use crate::service::index_service::{IndexOutcome, IndexService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "syllabus_assistant=debug,tower_http=debug".into()),
        )
        .init();

    let settings = Settings::from_env()?;

    // ── Database ──────────────────────────────────────────────────────────────
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.database_url)
        .await
        .map_err(AppError::DatabaseConnectionFailed)?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("Database connection established and migrations applied");

    // ── Models ────────────────────────────────────────────────────────────────
    let model_name = settings.embedding_model.clone();
    let embedder: Arc<dyn Embedder> =
        Arc::new(tokio::task::spawn_blocking(move || FastEmbedder::load(&model_name)).await??);
    let agent = GroqAgentService::new(&settings.groq_api_key, &settings.groq_model)?;
    info!("Using Groq model: {}", agent.model());

    // ── Knowledge base ────────────────────────────────────────────────────────
    let chunk_repo = ChunkRepository::new(pool.clone());
    let indexer = IndexService::new(chunk_repo.clone(), embedder.clone(), settings.collection_name.clone());
    match indexer.index_directory(&settings.data_dir).await? {
        IndexOutcome::NothingToIndex => {
            info!("No documents found to process (or documents already in the store)")
        }
        IndexOutcome::AlreadyIndexed { existing } => {
            info!("Knowledge base ready ({existing} chunks)")
        }
        IndexOutcome::Indexed { chunks } => info!("Knowledge base built ({chunks} chunks)"),
    }

    let chat_service = ChatService::new(
        chunk_repo,
        embedder,
        agent,
        settings.collection_name.clone(),
        settings.n_results,
    );

    // ── Router ────────────────────────────────────────────────────────────────
    // The widget is served from its own origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let app = Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(chat_service);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
