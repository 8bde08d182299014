use super::types::{ImageRef, Text2ImgResponse};
use crate::{Error, Result, config::ImageConfig};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

#[async_trait]
pub trait ImageClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<ImageRef>;
}

/// Client for DeepAI's `text2img` endpoint.
pub struct DeepAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    inline_images: bool,
}

impl DeepAiClient {
    pub fn new(config: ImageConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    pub fn with_http_client(config: ImageConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            inline_images: config.inline_images,
        }
    }

    async fn fetch_inline(&self, url: &str) -> Result<ImageRef> {
        let response = self.http.get(url).send().await?.error_for_status()?;

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|value| value.starts_with("image/"))
            .unwrap_or_else(|| "image/png".to_string());

        let data = response.bytes().await?.to_vec();
        if data.is_empty() {
            return Err(Error::upstream(format!("Image at {url} was empty")));
        }

        debug!("Fetched {} bytes of {} from {}", data.len(), mime, url);
        Ok(ImageRef::Inline { mime, data })
    }
}

#[async_trait]
impl ImageClient for DeepAiClient {
    async fn generate(&self, prompt: &str) -> Result<ImageRef> {
        let endpoint = format!("{}/api/text2img", self.base_url);
        debug!("Requesting image generation from {}", endpoint);

        let response = self
            .http
            .post(&endpoint)
            .header("api-key", &self.api_key)
            .form(&[("text", prompt)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Image API responded with {}: {}", status, body);

        let parsed: Text2ImgResponse = serde_json::from_str(&body).map_err(|e| {
            Error::upstream(format!("Unexpected image API response ({status}): {e}"))
        })?;

        let Some(output_url) = parsed.output_url.filter(|url| !url.is_empty()) else {
            let reason = parsed
                .err
                .or(parsed.status)
                .unwrap_or_else(|| format!("HTTP {status}"));
            warn!("Image API returned no output_url: {}", reason);
            return Err(Error::upstream(format!(
                "Image API returned no output_url: {reason}"
            )));
        };

        debug!("Image {:?} available at {}", parsed.id, output_url);

        if self.inline_images {
            self.fetch_inline(&output_url).await
        } else {
            Ok(ImageRef::Url(output_url))
        }
    }
}
