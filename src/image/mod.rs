mod client;
mod types;

pub use client::{DeepAiClient, ImageClient};
pub use types::ImageRef;
