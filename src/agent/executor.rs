use super::intent::{Intent, IntentClassifier};
use crate::{
    Error, Result,
    history::{ChatMessage, MessageStore},
    image::ImageClient,
    llm::{CompletionRequest, LlmClient},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const TEXT_FALLBACK_REPLY: &str = "⚠️ Sorry, I could not generate a reply.";
pub const IMAGE_FALLBACK_REPLY: &str =
    "I encountered an error generating the image. Let me help you with a text response instead.";
pub const IMAGE_CAPTION_PREFIX: &str = "Generated image: ";

/// What the client renders for one assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatReply {
    Text { text: String },
    Image { image: String },
}

/// Routes chat messages to the text or image upstream and records both turns.
pub struct Agent {
    history: Arc<dyn MessageStore>,
    llm_client: Arc<dyn LlmClient>,
    image_client: Arc<dyn ImageClient>,
    classifier: IntentClassifier,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl Agent {
    pub fn new(
        history: Arc<dyn MessageStore>,
        llm_client: Arc<dyn LlmClient>,
        image_client: Arc<dyn ImageClient>,
    ) -> Self {
        Self {
            history,
            llm_client,
            image_client,
            classifier: IntentClassifier::default(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Handles one chat message.
    ///
    /// Only validation and the initial user write can fail; upstream failures
    /// become fallback replies and the assistant write is best-effort.
    pub async fn process(&self, message: &str) -> Result<ChatReply> {
        if message.is_empty() {
            return Err(Error::validation("Message is required"));
        }

        self.history
            .save(ChatMessage::user(message.to_string()))
            .await?;

        let intent = self.classifier.classify(message);
        info!("Processing {:?} request", intent);

        let (reply, record) = match intent {
            Intent::Image => self.reply_with_image(message).await,
            Intent::Text => self.reply_with_text(message).await,
        };

        if let Err(e) = self.history.save(record).await {
            error!("Failed to persist assistant reply: {}", e);
        }

        Ok(reply)
    }

    async fn reply_with_image(&self, message: &str) -> (ChatReply, ChatMessage) {
        match self.image_client.generate(message).await {
            Ok(image) => {
                let reference = image.to_reference();
                debug!("Image generated ({} chars of reference)", reference.len());
                let record = ChatMessage::assistant_image(
                    format!("{IMAGE_CAPTION_PREFIX}{message}"),
                    reference.clone(),
                );
                (ChatReply::Image { image: reference }, record)
            }
            Err(e) => {
                warn!("Image generation failed, replying with text: {}", e);
                let text = IMAGE_FALLBACK_REPLY.to_string();
                (
                    ChatReply::Text { text: text.clone() },
                    ChatMessage::assistant(text),
                )
            }
        }
    }

    async fn reply_with_text(&self, message: &str) -> (ChatReply, ChatMessage) {
        let request = CompletionRequest::new(message)
            .with_system(self.system_prompt.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let text = match self.llm_client.complete(request).await {
            Ok(completion) => {
                debug!(
                    "Completion from {} ({} chars)",
                    completion.model,
                    completion.text.len()
                );
                completion.text
            }
            Err(e) => {
                warn!("Text generation failed, using fallback reply: {}", e);
                TEXT_FALLBACK_REPLY.to_string()
            }
        };

        (
            ChatReply::Text { text: text.clone() },
            ChatMessage::assistant(text),
        )
    }

    /// Direct image generation; upstream failures propagate to the caller.
    pub async fn generate_image(&self, prompt: &str) -> Result<String> {
        if prompt.is_empty() {
            return Err(Error::validation("Prompt is required"));
        }
        let image = self.image_client.generate(prompt).await?;
        info!("Generated image for direct request");
        Ok(image.to_reference())
    }
}
