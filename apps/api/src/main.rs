mod backend;
mod config;
mod documents;
mod errors;
mod extraction;
mod intake;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend::BackendClient;
use crate::config::Config;
use crate::documents::ocr::TesseractOcr;
use crate::documents::DocumentExtractor;
use crate::extraction::{CertificateExtractor, ResumeExtractor};
use crate::intake::IntakeOrchestrator;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

/// Upper bound on a single tesseract run.
const OCR_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Intake API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(config.gemini_api_key.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let ocr = Arc::new(TesseractOcr::new(config.tesseract_path.clone(), OCR_TIMEOUT));
    info!("OCR engine: {}", config.tesseract_path);

    let backend = Arc::new(BackendClient::new(&config.backend_api_url));
    info!("Staffing backend: {}", config.backend_api_url);

    let retry = RetryPolicy::default();
    let intake = IntakeOrchestrator::new(
        DocumentExtractor::new(ocr),
        ResumeExtractor::new(llm.clone(), retry),
        CertificateExtractor::new(llm, retry),
        backend.clone(),
    );
    let _sweep = intake.spawn_idle_sweep();

    // Build app state
    let state = AppState {
        intake: Arc::new(intake),
        backend,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the careers site before launch

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
