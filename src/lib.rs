//! catsinit - one-time provisioning of a RedisAI/RedisGears server
//!
//! Checks that the RedisGears and RedisAI modules meet their minimum versions,
//! then installs the classifier model and the gear script exactly once,
//! recording completion under a flag key.
//!
//! # Architecture
//!
//! - **semver**: version string ⇄ comparable integer codec
//! - **gate**: minimum module version check
//! - **host**: service capability trait with Redis and in-memory backends
//! - **bootstrap**: the provisioning state machine and its outcome

pub mod errors;
pub mod semver;
pub mod gate;
pub mod artifacts;
pub mod host;
pub mod bootstrap;

// Re-export commonly used types
pub use errors::{BootstrapError, FormatError, Result};
pub use bootstrap::{BootstrapController, Outcome, RunMode};

// Interface layer
pub mod cli;
pub mod config;
pub mod telemetry;
