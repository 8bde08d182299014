use crate::config::default_image_keywords;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Text,
    Image,
}

/// Case-insensitive substring match against a fixed keyword set.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    keywords: Vec<String>,
}

impl IntentClassifier {
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn classify(&self, message: &str) -> Intent {
        let message = message.to_lowercase();
        if self.keywords.iter().any(|k| message.contains(k.as_str())) {
            Intent::Image
        } else {
            Intent::Text
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(default_image_keywords())
    }
}
