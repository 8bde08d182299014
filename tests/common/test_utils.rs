use super::mocks::{MockImageClient, MockLlmClient, MockOcr};
use assistant_backend::{
    agent::Agent,
    history::HistoryStorage,
    image::ImageRef,
    ingest::{Ingestor, TextExtractor, UploadStore},
    server::{self, handlers::AppState},
};
use axum::{Router, body::Body, http::Response};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_MAX_UPLOAD_BYTES: usize = 1024;

/// Create an in-memory database for testing
pub async fn create_in_memory_db() -> Arc<HistoryStorage> {
    Arc::new(HistoryStorage::new(":memory:").await.unwrap())
}

pub fn sample_image() -> ImageRef {
    ImageRef::Url("https://images.example.com/cat.png".to_string())
}

pub struct TestApp {
    pub router: Router,
    pub history: Arc<HistoryStorage>,
    pub llm: MockLlmClient,
    pub image: MockImageClient,
    pub uploads: TempDir,
}

pub async fn create_test_app(llm: MockLlmClient, image: MockImageClient) -> TestApp {
    create_test_app_with_history(create_in_memory_db().await, llm, image).await
}

pub async fn create_test_app_with_history(
    history: Arc<HistoryStorage>,
    llm: MockLlmClient,
    image: MockImageClient,
) -> TestApp {
    let uploads = TempDir::new().unwrap();

    let agent = Agent::new(
        history.clone(),
        Arc::new(llm.clone()),
        Arc::new(image.clone()),
    )
    .with_system_prompt(Some("You are a helpful assistant".to_string()));

    let store = UploadStore::new(uploads.path()).await.unwrap();
    let ingestor = Ingestor::new(
        store,
        TextExtractor::new(Arc::new(MockOcr(Some("scanned text".to_string())))),
        Arc::new(llm.clone()),
        TEST_MAX_UPLOAD_BYTES,
    );

    let state = AppState {
        history: history.clone(),
        agent: Arc::new(agent),
        ingestor: Arc::new(ingestor),
        public_url: None,
    };

    TestApp {
        router: server::router(state, uploads.path()),
        history,
        llm,
        image,
        uploads,
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Builds a `multipart/form-data` body with one file part.
pub fn multipart_body(
    boundary: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
