use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default service URL
pub const DEFAULT_URL: &str = "redis://127.0.0.1:6379";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub flag: FlagConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub script: ScriptConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagConfig {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub key: String,
    pub backend: String,
    pub device: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub path: PathBuf,
    pub requirements: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
        }
    }
}

impl Default for FlagConfig {
    fn default() -> Self {
        Self {
            key: "cats:initialized".to_string(),
            value: "miauw".to_string(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/mobilenet_v2_1.4_224_frozen.pb"),
            key: "mobilenet:model".to_string(),
            backend: "TF".to_string(),
            device: "CPU".to_string(),
            inputs: vec!["input".to_string()],
            outputs: vec!["MobilenetV2/Predictions/Reshape_1".to_string()],
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("gear.py"),
            requirements: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the per-user file is read if
    /// present, otherwise built-in defaults are used. Nothing is written.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::config_path() {
            Ok(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Config::default()),
        }
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Get the per-user configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".catsinit").join("config.toml"))
    }

    /// Override the service URL
    pub fn with_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.service.url = url;
        }
        self
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.service.url, DEFAULT_URL);
        assert_eq!(config.flag.key, "cats:initialized");
        assert_eq!(config.model.backend, "TF");
        assert!(config.script.requirements.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[script]\nrequirements = [\"opencv-python\", \"imageio\"]").unwrap();
        writeln!(file, "[model]\ndevice = \"GPU\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.script.requirements, vec!["opencv-python", "imageio"]);
        assert_eq!(config.script.path, PathBuf::from("gear.py"));
        assert_eq!(config.model.device, "GPU");
        assert_eq!(config.model.key, "mobilenet:model");
        assert_eq!(config.flag, FlagConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_malformed_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service\nurl = 3").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_url_override() {
        let config = Config::default().with_url(Some("redis://cache:6380".to_string()));
        assert_eq!(config.service.url, "redis://cache:6380");

        let config = Config::default().with_url(None);
        assert_eq!(config.service.url, DEFAULT_URL);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = config.to_toml().unwrap();
        assert!(toml_string.contains("cats:initialized"));

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(deserialized, config);
    }
}
