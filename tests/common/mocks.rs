use assistant_backend::{
    Error, Result,
    history::{ChatMessage, HistoryStorage, MessageStore, Role},
    image::{ImageClient, ImageRef},
    ingest::OcrEngine,
    llm::{Completion, CompletionRequest, LlmClient},
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Mock LLM client for testing
#[derive(Debug, Clone)]
pub struct MockLlmClient {
    pub responses: Arc<Mutex<Vec<String>>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    pub error: Option<String>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            error: None,
        }
    }

    pub fn with_responses(self, responses: Vec<&str>) -> Self {
        *self.responses.lock().unwrap() = responses.into_iter().map(String::from).collect();
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn get_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        self.requests.lock().unwrap().push(request);

        if let Some(ref error) = self.error {
            return Err(Error::upstream(error.clone()));
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(Error::upstream("No more mock responses available"));
        }

        Ok(Completion {
            text: responses.remove(0),
            model: "mock-model".to_string(),
            usage: None,
        })
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock image client for testing
#[derive(Debug, Clone)]
pub struct MockImageClient {
    pub image: Option<ImageRef>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl MockImageClient {
    pub fn succeeding(image: ImageRef) -> Self {
        Self {
            image: Some(image),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            image: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageClient for MockImageClient {
    async fn generate(&self, prompt: &str) -> Result<ImageRef> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.image
            .clone()
            .ok_or_else(|| Error::upstream("Image API returned no output_url"))
    }
}

/// Mock OCR engine returning fixed text
pub struct MockOcr(pub Option<String>);

#[async_trait]
impl OcrEngine for MockOcr {
    async fn recognize(&self, _path: &Path) -> Result<String> {
        self.0
            .clone()
            .ok_or_else(|| Error::ingestion("OCR unavailable"))
    }
}

/// Store that persists user messages but rejects every assistant write
pub struct FailingAssistantStore {
    pub inner: Arc<HistoryStorage>,
}

impl FailingAssistantStore {
    pub fn new(inner: Arc<HistoryStorage>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl MessageStore for FailingAssistantStore {
    async fn save(&self, message: ChatMessage) -> Result<ChatMessage> {
        if message.role == Role::Assistant {
            return Err(Error::internal("disk full"));
        }
        self.inner.save(message).await
    }

    async fn list(&self) -> Result<Vec<ChatMessage>> {
        self.inner.list().await
    }

    async fn clear(&self) -> Result<u64> {
        self.inner.clear().await
    }
}
