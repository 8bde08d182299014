mod error;
pub mod handlers;
pub mod types;

pub use error::ApiError;

use crate::{
    Result,
    agent::{Agent, IntentClassifier},
    config::Config,
    history::{HistoryStorage, MessageStore},
    image::DeepAiClient,
    ingest::{Ingestor, TesseractOcr, TextExtractor, UploadStore},
    llm::OpenAiClient,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use handlers::AppState;
use std::{net::SocketAddr, path::Path, sync::Arc};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Builds the HTTP router; uploaded files are served from `uploads_dir`.
pub fn router(state: AppState, uploads_dir: &Path) -> Router {
    let body_limit = state.ingestor.max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(handlers::root))
        .route("/chat", post(handlers::chat))
        .route(
            "/chat/history",
            get(handlers::get_history).delete(handlers::clear_history),
        )
        .route("/image/generate", post(handlers::generate_image))
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    // Initialize history storage
    let history = match config.server.database_url.as_deref() {
        Some(db_url) => {
            HistoryStorage::connect(db_url, config.server.database_auth_token.as_deref()).await?
        }
        None => {
            error!("No database URL configured (DATABASE_URL); chat history will be unavailable");
            HistoryStorage::unavailable()
        }
    };
    let history: Arc<dyn MessageStore> = Arc::new(history);

    // Upstream clients
    let llm_client = Arc::new(OpenAiClient::new(config.llm.clone()));
    let image_client = Arc::new(DeepAiClient::new(config.image.clone()));

    let agent = Agent::new(history.clone(), llm_client.clone(), image_client)
        .with_classifier(IntentClassifier::new(config.chat.image_keywords.clone()))
        .with_system_prompt(config.llm.system_prompt.clone())
        .with_temperature(config.llm.temperature)
        .with_max_tokens(config.llm.max_tokens);

    // File ingestion
    let uploads = UploadStore::new(&config.server.uploads_dir).await?;
    let ocr = Arc::new(TesseractOcr::new(
        config.ingest.ocr_command.clone(),
        config.ingest.ocr_language.clone(),
    ));
    let ingestor = Ingestor::new(
        uploads,
        TextExtractor::new(ocr),
        llm_client,
        config.server.max_upload_bytes,
    );

    let app_state = AppState {
        history,
        agent: Arc::new(agent),
        ingestor: Arc::new(ingestor),
        public_url: config.server.public_url.clone(),
    };

    let app = router(app_state, Path::new(&config.server.uploads_dir));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
