mod executor;
pub mod intent;

pub use executor::{
    Agent, ChatReply, IMAGE_CAPTION_PREFIX, IMAGE_FALLBACK_REPLY, TEXT_FALLBACK_REPLY,
};
pub use intent::{Intent, IntentClassifier};
