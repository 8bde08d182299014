use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

/// Where a generated image can be found.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
    Url(String),
    Inline { mime: String, data: Vec<u8> },
}

impl ImageRef {
    /// A URL, or a `data:<mime>;base64,...` URI for inline images.
    pub fn to_reference(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Inline { mime, data } => {
                format!("data:{mime};base64,{}", BASE64.encode(data))
            }
        }
    }
}

/// Body returned by the `text2img` endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Text2ImgResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub output_url: Option<String>,
    #[serde(default)]
    pub err: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
