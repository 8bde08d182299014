mod types;

pub use types::*;

use crate::{Error, Result};
use std::env;

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(String),
    /// The file was missing; defaults plus environment were used.
    Defaults { missing: String },
}

pub async fn load() -> Result<(Config, ConfigSource)> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    load_from(&config_path, |key| env::var(key).ok()).await
}

/// Reads `config_path` if it exists, then applies overrides from `lookup` and validates.
pub async fn load_from<F>(config_path: &str, lookup: F) -> Result<(Config, ConfigSource)>
where
    F: Fn(&str) -> Option<String>,
{
    let (mut config, source) = match tokio::fs::read_to_string(config_path).await {
        Ok(config_str) => (
            serde_yaml::from_str(&config_str)?,
            ConfigSource::File(config_path.to_string()),
        ),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => (
            Config::default(),
            ConfigSource::Defaults {
                missing: config_path.to_string(),
            },
        ),
        Err(e) => return Err(e.into()),
    };

    apply_env_overrides(&mut config, lookup)?;
    config.validate()?;

    Ok((config, source))
}

/// Applies environment overrides; `lookup` returns the value for a variable name.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = first_set(&lookup, &["HOST"]) {
        config.server.host = host;
    }
    if let Some(port) = first_set(&lookup, &["PORT"]) {
        config.server.port = port
            .parse()
            .map_err(|_| Error::config(format!("Invalid PORT value: '{port}'")))?;
    }
    if let Some(url) = first_set(&lookup, &["DATABASE_URL", "HISTORY_DB_PATH"]) {
        config.server.database_url = Some(url);
    }
    if let Some(token) = first_set(&lookup, &["DATABASE_AUTH_TOKEN"]) {
        config.server.database_auth_token = Some(token);
    }
    if let Some(dir) = first_set(&lookup, &["UPLOADS_DIR"]) {
        config.server.uploads_dir = dir;
    }
    if let Some(url) = first_set(&lookup, &["PUBLIC_URL"]) {
        config.server.public_url = Some(url);
    }
    if let Some(key) = first_set(&lookup, &["LLM_API_KEY", "GEMINI_API_KEY"]) {
        config.llm.api_key = key;
    }
    if let Some(url) = first_set(&lookup, &["LLM_BASE_URL"]) {
        config.llm.base_url = url;
    }
    if let Some(model) = first_set(&lookup, &["LLM_MODEL"]) {
        config.llm.model = model;
    }
    if let Some(max_tokens) = first_set(&lookup, &["LLM_MAX_TOKENS"]) {
        let max_tokens = max_tokens.parse::<u32>().map_err(|_| {
            Error::config(format!("Invalid LLM_MAX_TOKENS value: '{max_tokens}'"))
        })?;
        config.llm.max_tokens = Some(max_tokens);
    }
    if let Some(key) = first_set(&lookup, &["IMAGE_API_KEY", "DEEPAI_API_KEY"]) {
        config.image.api_key = key;
    }

    Ok(())
}

fn first_set<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .find_map(|key| lookup(key).filter(|value| !value.is_empty()))
}

impl Config {
    /// Upstream credentials are required at startup; the database is not.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(Error::config(
                "LLM API key is missing (set llm.api_key or LLM_API_KEY)",
            ));
        }
        if self.image.api_key.trim().is_empty() {
            return Err(Error::config(
                "Image API key is missing (set image.api_key or IMAGE_API_KEY)",
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(Error::config("server.max_upload_bytes must be positive"));
        }
        if self.chat.image_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(Error::config("chat.image_keywords must not contain empty entries"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.max_upload_bytes, 20 * 1024 * 1024);
        assert!(config.server.database_url.is_none());
        assert_eq!(config.chat.image_keywords.len(), 4);
        assert!(config.image.inline_images);
        assert_eq!(
            config.llm.system_prompt.as_deref(),
            Some("You are a helpful assistant")
        );
    }

    #[test]
    fn test_yaml_partial_config_uses_defaults() {
        let yaml = r#"
server:
  port: 9000
  database_url: ":memory:"
llm:
  api_key: "k"
  model: "gpt-4o-mini"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.database_url.as_deref(), Some(":memory:"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.image.base_url, "https://api.deepai.org");
        assert_eq!(config.ingest.ocr_command, "tesseract");
    }

    #[test]
    fn test_env_overrides_and_aliases() {
        let mut config = Config::default();
        let lookup = lookup_from(&[
            ("PORT", "8081"),
            ("HISTORY_DB_PATH", "chat.db"),
            ("GEMINI_API_KEY", "gemini-key"),
            ("DEEPAI_API_KEY", "deepai-key"),
            ("PUBLIC_URL", "https://assistant.example.com"),
        ]);

        apply_env_overrides(&mut config, lookup).unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.database_url.as_deref(), Some("chat.db"));
        assert_eq!(config.llm.api_key, "gemini-key");
        assert_eq!(config.image.api_key, "deepai-key");
        assert_eq!(
            config.server.public_url.as_deref(),
            Some("https://assistant.example.com")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_primary_env_name_wins_over_alias() {
        let mut config = Config::default();
        let lookup = lookup_from(&[("DATABASE_URL", "primary.db"), ("HISTORY_DB_PATH", "alias.db")]);
        apply_env_overrides(&mut config, lookup).unwrap();
        assert_eq!(config.server.database_url.as_deref(), Some("primary.db"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = Config::default();
        let result = apply_env_overrides(&mut config, lookup_from(&[("PORT", "http")]));
        assert!(matches!(result, Err(Error::Config(_))));

        let result =
            apply_env_overrides(&mut config, lookup_from(&[("LLM_MAX_TOKENS", "lots")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_api_keys_fail_validation() {
        let mut config = Config::default();
        assert!(config.validate().unwrap_err().to_string().contains("LLM API key"));

        config.llm.api_key = "k".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("Image API key"));

        config.image.api_key = "k".to_string();
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_without_file_reports_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.yaml");
        let path = path.to_string_lossy().to_string();

        let (config, source) = load_from(
            &path,
            lookup_from(&[("LLM_API_KEY", "k"), ("IMAGE_API_KEY", "k")]),
        )
        .await
        .unwrap();

        assert_eq!(source, ConfigSource::Defaults { missing: path });
        assert_eq!(config.server.port, 5000);
    }

    #[tokio::test]
    async fn test_load_from_file_applies_env_on_top() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        tokio::fs::write(
            &path,
            "server:\n  port: 9000\nllm:\n  api_key: file-key\n  max_tokens: 512\n",
        )
        .await
        .unwrap();
        let path = path.to_string_lossy().to_string();

        let (config, source) = load_from(
            &path,
            lookup_from(&[("PORT", "7000"), ("DEEPAI_API_KEY", "image-key")]),
        )
        .await
        .unwrap();

        assert_eq!(source, ConfigSource::File(path));
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.llm.api_key, "file-key");
        assert_eq!(config.llm.max_tokens, Some(512));
        assert_eq!(config.image.api_key, "image-key");
    }

    #[tokio::test]
    async fn test_load_without_keys_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.yaml");

        let result = load_from(&path.to_string_lossy(), lookup_from(&[])).await;

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
