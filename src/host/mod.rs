//! Module host abstraction
//!
//! Everything the bootstrap needs from the running service goes through the
//! [`ModuleHost`] trait: a liveness probe, the module listing, the
//! initialization flag and the two install operations. [`RedisHost`] talks to
//! a real server. With the `testing` feature, `MemoryHost` keeps the same
//! state in memory.

#[cfg(any(test, feature = "testing"))]
mod memory;
mod server;

#[cfg(any(test, feature = "testing"))]
pub use self::memory::{HostCall, HostOp, MemoryHost};
pub use self::server::RedisHost;

use crate::artifacts::{ModelArtifact, ScriptArtifact};
use crate::errors::Result;
use async_trait::async_trait;

/// A module loaded in the service, as reported by the module listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,

    /// Version in encoded integer form (`major * 10000 + minor * 100 + patch`)
    pub raw_version: u32,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, raw_version: u32) -> Self {
        Self {
            name: name.into(),
            raw_version,
        }
    }
}

/// Opaque acknowledgement returned by an install operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReceipt(pub String);

impl InstallReceipt {
    pub fn ok() -> Self {
        Self("OK".to_string())
    }
}

/// Operations the bootstrap consumes from the service
#[async_trait]
pub trait ModuleHost: Send {
    /// Establish connectivity and check liveness
    async fn probe(&mut self) -> Result<()>;

    /// List loaded modules
    async fn list_modules(&mut self) -> Result<Vec<ModuleDescriptor>>;

    /// Whether the initialization flag exists
    async fn flag_exists(&mut self, key: &str) -> Result<bool>;

    /// Write the flag if absent; returns false when it was already there
    async fn set_flag(&mut self, key: &str, value: &str) -> Result<bool>;

    /// Register a model blob
    async fn install_model(&mut self, model: &ModelArtifact) -> Result<InstallReceipt>;

    /// Execute a gear script
    async fn install_script(&mut self, script: &ScriptArtifact) -> Result<InstallReceipt>;
}
