//! In-memory module host for exercising the bootstrap without a server

use super::{InstallReceipt, ModuleDescriptor, ModuleHost};
use crate::artifacts::{ArtifactKind, ModelArtifact, ScriptArtifact};
use crate::errors::{BootstrapError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Call made against a [`MemoryHost`], in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Probe,
    ListModules,
    FlagExists(String),
    SetFlag(String),
    InstallModel(String),
    InstallScript,
}

/// Non-install operation whose failure can be scripted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    ListModules,
    FlagExists,
    SetFlag,
}

/// In-memory module host.
///
/// Keeps keys, installed models and executed scripts in maps so that several
/// bootstrap runs can share state. Failures can be scripted per operation.
#[derive(Debug, Default)]
pub struct MemoryHost {
    modules: Vec<ModuleDescriptor>,
    keys: HashMap<String, String>,
    models: HashMap<String, ModelArtifact>,
    scripts: Vec<ScriptArtifact>,
    unreachable: bool,
    failing: HashSet<ArtifactKind>,
    failing_ops: HashSet<HostOp>,
    concurrent_flag: Option<String>,
    calls: Vec<HostCall>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a module with the given encoded version
    pub fn with_module(mut self, name: &str, raw_version: u32) -> Self {
        self.modules.push(ModuleDescriptor::new(name, raw_version));
        self
    }

    /// Pre-populate a key
    pub fn with_key(mut self, key: &str, value: &str) -> Self {
        self.keys.insert(key.to_string(), value.to_string());
        self
    }

    /// Make every probe fail
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Toggle failure of one install operation
    pub fn set_failing(&mut self, artifact: ArtifactKind, failing: bool) {
        if failing {
            self.failing.insert(artifact);
        } else {
            self.failing.remove(&artifact);
        }
    }

    /// Toggle failure of a listing or flag operation
    pub fn set_op_failing(&mut self, op: HostOp, failing: bool) {
        if failing {
            self.failing_ops.insert(op);
        } else {
            self.failing_ops.remove(&op);
        }
    }

    /// Have another writer store `value` under the flag key right before
    /// the next `set_flag` call
    pub fn flag_appears_on_set(mut self, value: &str) -> Self {
        self.concurrent_flag = Some(value.to_string());
        self
    }

    pub fn key(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }

    pub fn model(&self, key: &str) -> Option<&ModelArtifact> {
        self.models.get(key)
    }

    pub fn scripts(&self) -> &[ScriptArtifact] {
        &self.scripts
    }

    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    /// Number of install operations attempted so far
    pub fn install_attempts(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, HostCall::InstallModel(_) | HostCall::InstallScript))
            .count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn check_failing(&self, artifact: ArtifactKind) -> Result<()> {
        if self.failing.contains(&artifact) {
            return Err(BootstrapError::Install {
                artifact,
                reason: format!("simulated {} failure", artifact),
            });
        }
        Ok(())
    }

    fn check_op(&self, op: HostOp) -> Result<()> {
        if !self.failing_ops.contains(&op) {
            return Ok(());
        }
        let reason = format!("simulated {:?} failure", op);
        Err(match op {
            HostOp::ListModules => BootstrapError::Protocol(reason),
            HostOp::FlagExists | HostOp::SetFlag => BootstrapError::Store(reason),
        })
    }
}

#[async_trait]
impl ModuleHost for MemoryHost {
    async fn probe(&mut self) -> Result<()> {
        self.calls.push(HostCall::Probe);
        if self.unreachable {
            return Err(BootstrapError::Connectivity {
                url: "memory://".to_string(),
                reason: "host marked unreachable".to_string(),
            });
        }
        Ok(())
    }

    async fn list_modules(&mut self) -> Result<Vec<ModuleDescriptor>> {
        self.calls.push(HostCall::ListModules);
        self.check_op(HostOp::ListModules)?;
        Ok(self.modules.clone())
    }

    async fn flag_exists(&mut self, key: &str) -> Result<bool> {
        self.calls.push(HostCall::FlagExists(key.to_string()));
        self.check_op(HostOp::FlagExists)?;
        Ok(self.keys.contains_key(key))
    }

    async fn set_flag(&mut self, key: &str, value: &str) -> Result<bool> {
        self.calls.push(HostCall::SetFlag(key.to_string()));
        self.check_op(HostOp::SetFlag)?;
        if let Some(other) = self.concurrent_flag.take() {
            self.keys.entry(key.to_string()).or_insert(other);
        }
        if self.keys.contains_key(key) {
            return Ok(false);
        }
        self.keys.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn install_model(&mut self, model: &ModelArtifact) -> Result<InstallReceipt> {
        self.calls.push(HostCall::InstallModel(model.key.clone()));
        self.check_failing(ArtifactKind::Model)?;
        self.models.insert(model.key.clone(), model.clone());
        Ok(InstallReceipt::ok())
    }

    async fn install_script(&mut self, script: &ScriptArtifact) -> Result<InstallReceipt> {
        self.calls.push(HostCall::InstallScript);
        self.check_failing(ArtifactKind::Script)?;
        self.scripts.push(script.clone());
        Ok(InstallReceipt::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_flag_never_overwrites() {
        let mut host = MemoryHost::new().with_key("flag", "first");
        assert!(!host.set_flag("flag", "second").await.unwrap());
        assert_eq!(host.key("flag"), Some("first"));
    }

    #[tokio::test]
    async fn test_flag_appears_on_set() {
        let mut host = MemoryHost::new().flag_appears_on_set("other");
        assert!(!host.flag_exists("flag").await.unwrap());
        assert!(!host.set_flag("flag", "mine").await.unwrap());
        assert_eq!(host.key("flag"), Some("other"));
    }

    #[tokio::test]
    async fn test_failing_ops() {
        let mut host = MemoryHost::new();
        host.set_op_failing(HostOp::ListModules, true);
        host.set_op_failing(HostOp::SetFlag, true);

        assert!(matches!(
            host.list_modules().await,
            Err(BootstrapError::Protocol(_))
        ));
        assert!(matches!(
            host.set_flag("flag", "mine").await,
            Err(BootstrapError::Store(_))
        ));
        assert!(host.key("flag").is_none());

        host.set_op_failing(HostOp::SetFlag, false);
        assert!(host.set_flag("flag", "mine").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_probe() {
        let mut host = MemoryHost::new().unreachable();
        assert!(matches!(
            host.probe().await,
            Err(BootstrapError::Connectivity { .. })
        ));
    }

    #[tokio::test]
    async fn test_failing_install_records_attempt() {
        let mut host = MemoryHost::new();
        host.set_failing(ArtifactKind::Script, true);
        let script = ScriptArtifact {
            source: b"GB().run()".to_vec(),
            requirements: Vec::new(),
        };

        assert!(host.install_script(&script).await.is_err());
        assert_eq!(host.install_attempts(), 1);
        assert!(host.scripts().is_empty());
    }
}
