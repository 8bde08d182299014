mod storage;
mod types;

pub use storage::{HistoryStorage, MessageStore};
pub use types::{ChatMessage, MessageType, Role};
