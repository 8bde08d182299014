use super::error::ApiError;
use super::types::{ChatRequest, ImageRequest, ImageResponse, StatusResponse, UploadFailure};
use crate::{
    Error,
    agent::{Agent, ChatReply},
    history::{ChatMessage, MessageStore},
    ingest::{Ingestor, Upload},
};
use axum::{
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::{HeaderMap, StatusCode, header::HOST},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info, warn};

const UPLOAD_FAILURE_ANALYSIS: &str = "I couldn't analyze the file due to a server error. \
     Please verify the server configuration (e.g., LLM_API_KEY) and try again.";

#[derive(Clone)]
pub struct AppState {
    pub history: Arc<dyn MessageStore>,
    pub agent: Arc<Agent>,
    pub ingestor: Arc<Ingestor>,
    /// Overrides the `Host`-derived base of upload URLs.
    pub public_url: Option<String>,
}

pub async fn root() -> &'static str {
    "Server is running!"
}

pub async fn get_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    match state.history.list().await {
        Ok(messages) => Ok(Json(messages)),
        Err(e) => {
            error!("Fetch history error: {}", e);
            Err(ApiError::internal("Could not fetch chat history"))
        }
    }
}

pub async fn clear_history(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    match state.history.clear().await {
        Ok(_) => Ok(Json(StatusResponse {
            message: "Chat history cleared".to_string(),
        })),
        Err(e) => {
            error!("Clear history error: {}", e);
            Err(ApiError::internal("Could not clear chat history"))
        }
    }
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let message = match payload {
        Ok(Json(request)) => request.message.unwrap_or_default(),
        Err(rejection) => {
            warn!("Rejected chat request body: {}", rejection);
            String::new()
        }
    };

    match state.agent.process(&message).await {
        Ok(reply) => Ok(Json(reply)),
        Err(Error::Validation(msg)) => Err(ApiError::bad_request(msg)),
        Err(e) => {
            error!("Chat API error: {}", e);
            Err(ApiError::internal("Something went wrong"))
        }
    }
}

pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>, ApiError> {
    let prompt = match payload {
        Ok(Json(request)) => request.prompt.unwrap_or_default(),
        Err(rejection) => {
            warn!("Rejected image request body: {}", rejection);
            String::new()
        }
    };

    match state.agent.generate_image(&prompt).await {
        Ok(image) => Ok(Json(ImageResponse { image })),
        Err(Error::Validation(msg)) => Err(ApiError::bad_request(msg)),
        Err(e) => {
            error!("Image generation error: {}", e);
            Err(ApiError::internal("Failed to generate image"))
        }
    }
}

pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!("Rejected upload body: {}", rejection);
            return ApiError::bad_request("No file uploaded").into_response();
        }
    };

    let upload = match read_file_field(multipart, state.ingestor.max_upload_bytes()).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return ApiError::bad_request("No file uploaded").into_response(),
        Err(e) => return e.into_response(),
    };

    let base_url = state
        .public_url
        .clone()
        .unwrap_or_else(|| base_url_from_headers(&headers));

    match state.ingestor.ingest(upload, &base_url).await {
        Ok(report) => {
            info!(filename = %report.filename, "upload processed");
            Json(report).into_response()
        }
        Err(Error::Validation(msg)) => ApiError::bad_request(msg).into_response(),
        Err(e) => {
            error!("Upload error: {}", e);
            Json(UploadFailure {
                error: "Upload processing failed".to_string(),
                details: e.to_string(),
                analysis: UPLOAD_FAILURE_ANALYSIS.to_string(),
            })
            .into_response()
        }
    }
}

/// Reads the `file` field, enforcing `max_bytes` while streaming.
async fn read_file_field(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<Option<Upload>, ApiError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let declared_type = field.content_type().map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > max_bytes {
                return Err(ApiError::bad_request("File too large"));
            }
        }

        return Ok(Some(Upload {
            original_name,
            declared_type,
            bytes,
        }));
    }

    Ok(None)
}

fn multipart_error(e: MultipartError) -> ApiError {
    warn!("Failed to read multipart body: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::bad_request("File too large")
    } else {
        ApiError::bad_request("Invalid multipart body")
    }
}

fn base_url_from_headers(headers: &HeaderMap) -> String {
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}
