mod auth;
mod config;
mod errors;
mod inference;
mod kv;
mod llm_client;
mod rasterize;
mod routes;
mod state;
mod storage;
mod submission;
#[cfg(test)]
mod testing;
mod wipe;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::StaticTokenAuth;
use crate::config::Config;
use crate::inference::ClaudeInference;
use crate::kv::RedisKv;
use crate::llm_client::LlmClient;
use crate::rasterize::PdfiumRasterizer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{ObjectStorage, S3Storage};
use crate::submission::progress::UploadTracker;
use crate::submission::workflow::{Collaborators, UuidGenerator};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumind API v{}", env!("CARGO_PKG_VERSION"));

    // Object storage (S3 / MinIO)
    let storage: Arc<dyn ObjectStorage> = Arc::new(S3Storage::connect(&config).await);
    info!("S3 storage initialized (bucket: {})", config.s3_bucket);

    // Redis-backed KV
    let redis = redis::Client::open(config.redis_url.clone())?;
    let kv = Arc::new(RedisKv::new(redis, config.kv_namespace.clone()));
    info!("KV store initialized (namespace: {})", config.kv_namespace);

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let collaborators = Collaborators {
        storage: Arc::clone(&storage),
        kv,
        inference: Arc::new(ClaudeInference::new(llm, storage)),
        rasterizer: Arc::new(PdfiumRasterizer::new(
            config.raster_max_pixels,
            config.pdfium_lib_path.clone(),
        )),
        ids: Arc::new(UuidGenerator),
    };

    let state = AppState {
        auth: Arc::new(StaticTokenAuth::new(&config.auth_tokens)),
        collaborators,
        uploads: UploadTracker::new(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
