//! Installable artifacts
//!
//! The model blob and the gear script are only read when the controller
//! actually reaches the install step, so an already-initialized server never
//! needs the files to be present.

use crate::config::{ModelConfig, ScriptConfig};
use crate::errors::{BootstrapError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Which of the two artifacts an operation concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Model,
    Script,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Model => "model",
            ArtifactKind::Script => "script",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pre-trained model blob plus everything needed to register it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    /// Key the model is stored under
    pub key: String,

    /// Backend name, e.g. `TF`
    pub backend: String,

    /// Device name, e.g. `CPU`
    pub device: String,

    pub inputs: Vec<String>,
    pub outputs: Vec<String>,

    /// Serialized model, passed through untouched
    pub blob: Vec<u8>,
}

/// An executable gear script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptArtifact {
    pub source: Vec<u8>,

    /// Python requirements, used verbatim and in order; empty means none
    pub requirements: Vec<String>,
}

/// Supplies artifacts on demand
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Load the model artifact
    async fn model(&self) -> Result<ModelArtifact>;

    /// Load the script artifact
    async fn script(&self) -> Result<ScriptArtifact>;
}

/// Reads artifact payloads from disk using the configured paths
pub struct FsArtifacts {
    model: ModelConfig,
    script: ScriptConfig,
}

impl FsArtifacts {
    pub fn new(model: ModelConfig, script: ScriptConfig) -> Self {
        Self { model, script }
    }

    async fn read(path: &Path, artifact: ArtifactKind) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| BootstrapError::Install {
            artifact,
            reason: format!("cannot read {}: {}", path.display(), e),
        })
    }
}

#[async_trait]
impl ArtifactSource for FsArtifacts {
    async fn model(&self) -> Result<ModelArtifact> {
        let blob = Self::read(&self.model.path, ArtifactKind::Model).await?;
        tracing::debug!(path = %self.model.path.display(), bytes = blob.len(), "read model blob");

        Ok(ModelArtifact {
            key: self.model.key.clone(),
            backend: self.model.backend.clone(),
            device: self.model.device.clone(),
            inputs: self.model.inputs.clone(),
            outputs: self.model.outputs.clone(),
            blob,
        })
    }

    async fn script(&self) -> Result<ScriptArtifact> {
        let source = Self::read(&self.script.path, ArtifactKind::Script).await?;
        tracing::debug!(path = %self.script.path.display(), bytes = source.len(), "read gear script");

        Ok(ScriptArtifact {
            source,
            requirements: self.script.requirements.clone(),
        })
    }
}

/// Artifacts held in memory
#[derive(Debug, Clone)]
pub struct StaticArtifacts {
    pub model: ModelArtifact,
    pub script: ScriptArtifact,
}

#[async_trait]
impl ArtifactSource for StaticArtifacts {
    async fn model(&self) -> Result<ModelArtifact> {
        Ok(self.model.clone())
    }

    async fn script(&self) -> Result<ScriptArtifact> {
        Ok(self.script.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_artifact_kind_names() {
        assert_eq!(ArtifactKind::Model.to_string(), "model");
        assert_eq!(ArtifactKind::Script.as_str(), "script");
    }

    #[tokio::test]
    async fn test_fs_artifacts_read_payloads() {
        let mut model_file = tempfile::NamedTempFile::new().unwrap();
        model_file.write_all(&[0u8, 1, 2, 255]).unwrap();
        let mut script_file = tempfile::NamedTempFile::new().unwrap();
        script_file.write_all(b"GB().run()").unwrap();

        let model = ModelConfig {
            path: model_file.path().to_path_buf(),
            ..ModelConfig::default()
        };
        let script = ScriptConfig {
            path: script_file.path().to_path_buf(),
            requirements: vec!["imageio".to_string()],
        };
        let source = FsArtifacts::new(model, script);

        let model = source.model().await.unwrap();
        assert_eq!(model.blob, vec![0u8, 1, 2, 255]);
        assert_eq!(model.key, "mobilenet:model");
        assert_eq!(model.outputs, vec!["MobilenetV2/Predictions/Reshape_1"]);

        let script = source.script().await.unwrap();
        assert_eq!(script.source, b"GB().run()".to_vec());
        assert_eq!(script.requirements, vec!["imageio"]);
    }

    #[tokio::test]
    async fn test_fs_artifacts_missing_file_names_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let model = ModelConfig {
            path: dir.path().join("missing.pb"),
            ..ModelConfig::default()
        };
        let source = FsArtifacts::new(model, ScriptConfig::default());

        match source.model().await {
            Err(BootstrapError::Install { artifact, reason }) => {
                assert_eq!(artifact, ArtifactKind::Model);
                assert!(reason.contains("missing.pb"));
            }
            other => panic!("expected model install error, got {:?}", other),
        }
    }
}
