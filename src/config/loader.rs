//! Configuration Loader
//!
//! Loads and merges client configuration from JSON files and the environment.

use crate::config::client::{ClientConfig, DEFAULT_BASE_URL};
use crate::error::{ChatwireError, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    /// Merged JSON object; later sources override earlier keys
    merged: Map<String, Value>,
}

impl ConfigLoader {
    /// Load `.env`, then the default config paths, then env overrides
    pub fn new() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut loader = Self { merged: Map::new() };
        loader.load_from_default_paths()?;
        loader.apply_env();
        Ok(loader)
    }

    /// Create a loader with a specific config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self { merged: Map::new() };
        loader.load_from_file(path)?;
        Ok(loader)
    }

    fn load_from_default_paths(&mut self) -> Result<()> {
        for path in Self::get_config_paths() {
            if path.exists() {
                self.load_from_file(&path)?;
            }
        }
        Ok(())
    }

    /// Get list of config paths to check, lowest priority first
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("chatwire").join("config.json"));
        }

        paths.push(PathBuf::from("chatwire.json"));

        if let Ok(custom_path) = std::env::var("CHATWIRE_CONFIG") {
            paths.push(PathBuf::from(custom_path));
        }

        paths
    }

    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChatwireError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let value: Value = serde_json::from_str(&content).map_err(|e| {
            ChatwireError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        match value {
            Value::Object(map) => {
                self.merge(map);
                tracing::debug!(path = %path.display(), "loaded client config");
                Ok(())
            }
            _ => Err(ChatwireError::Config(format!(
                "{} must contain a JSON object",
                path.display()
            ))),
        }
    }

    fn apply_env(&mut self) {
        let mut env = Map::new();
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            env.insert("api_key".to_string(), Value::String(key));
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            env.insert("base_url".to_string(), Value::String(url));
        }
        self.merge(env);
    }

    fn merge(&mut self, other: Map<String, Value>) {
        for (key, value) in other {
            self.merged.insert(key, value);
        }
    }

    /// Build the configuration
    pub fn into_config(self) -> Result<ClientConfig> {
        let mut config: ClientConfig = serde_json::from_value(Value::Object(self.merged))
            .map_err(|e| ChatwireError::Config(format!("Invalid client config: {}", e)))?;
        if config.base_url.trim().is_empty() {
            config.base_url = DEFAULT_BASE_URL.to_string();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", body).unwrap();
        file
    }

    #[test]
    fn test_load_from_custom_file() {
        let file = write_config(
            r#"{
                "api_key": "sk-file",
                "base_url": "https://custom.api.com/v1",
                "default_temperature": 0.5,
                "empty_line_limit": 10
            }"#,
        );

        let config = ConfigLoader::from_path(file.path())
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.api_key, "sk-file");
        assert_eq!(config.base_url, "https://custom.api.com/v1");
        assert_eq!(config.default_temperature, 0.5);
        assert_eq!(config.empty_line_limit, 10);
        assert_eq!(config.timeout_secs, 300);
    }

    #[test]
    fn test_later_files_override_keys() {
        let first = write_config(r#"{"api_key": "sk-a", "default_max_tokens": 100}"#);
        let second = write_config(r#"{"api_key": "sk-b"}"#);

        let mut loader = ConfigLoader::from_path(first.path()).unwrap();
        loader.load_from_file(second.path()).unwrap();
        let config = loader.into_config().unwrap();

        assert_eq!(config.api_key, "sk-b");
        assert_eq!(config.default_max_tokens, 100);
    }

    #[test]
    fn test_empty_base_url_falls_back() {
        let file = write_config(r#"{"api_key": "sk-file", "base_url": ""}"#);
        let config = ConfigLoader::from_path(file.path())
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(
            config.endpoint("chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_rejects_non_object() {
        let file = write_config("[1, 2, 3]");
        assert!(matches!(
            ConfigLoader::from_path(file.path()),
            Err(ChatwireError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_field_type() {
        let file = write_config(r#"{"empty_line_limit": "lots"}"#);
        let result = ConfigLoader::from_path(file.path()).unwrap().into_config();
        assert!(matches!(result, Err(ChatwireError::Config(_))));
    }
}
