use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the default config location.
pub const CONFIG_ENV: &str = "IMAGE_RETRIEVAL_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Where downloaded ONNX models and the tokenizer are kept.
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,

    /// Never download; fail if model files are missing.
    #[serde(default)]
    pub offline: bool,
}

fn default_models_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("image-retrieval")
        .join("models")
}

fn default_intra_threads() -> usize {
    4
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            intra_threads: default_intra_threads(),
            offline: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "jpg".to_string(),
        "jpeg".to_string(),
        "png".to_string(),
        "bmp".to_string(),
        "gif".to_string(),
    ]
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when neither IMAGE_RETRIEVAL_LOG nor RUST_LOG is set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional directory for a daily log file, written in addition to stderr.
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: None,
        }
    }
}

impl Config {
    /// Load from the `--config` override, `IMAGE_RETRIEVAL_CONFIG`, or the
    /// default location. A missing file yields the defaults.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let path = match override_path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path(),
        };

        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("image-retrieval")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_recognized_extensions() {
        let config = Config::default();
        assert_eq!(
            config.scanner.image_extensions,
            vec!["jpg", "jpeg", "png", "bmp", "gif"]
        );
        assert_eq!(config.model.intra_threads, 4);
        assert!(!config.model.offline);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [model]
            offline = true

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert!(config.model.offline);
        assert_eq!(config.model.intra_threads, 4);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.scanner.image_extensions.len(), 5);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::from_toml("[model\noffline = ").is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.model.intra_threads, 4);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scanner]\nimage_extensions = [\"png\"]\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.scanner.image_extensions, vec!["png"]);
    }
}
