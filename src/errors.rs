//! Error types for catsinit
//!
//! One error enum for the library, plus the codec's own format error so that
//! version parsing can be used on its own.

use crate::artifacts::ArtifactKind;
use thiserror::Error;

/// Malformed version string handed to the codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Not exactly three dot-separated components
    #[error("Version '{input}' must have exactly three components, found {found}")]
    ComponentCount { input: String, found: usize },

    /// A component contains something other than ASCII digits
    #[error("Version '{input}' has non-numeric component '{component}'")]
    NonNumeric { input: String, component: String },

    /// A component does not fit a two-digit field
    #[error("Version '{input}' component {value} exceeds {max}")]
    OutOfRange { input: String, value: u32, max: u32 },
}

/// Main error type for the bootstrap system
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// State machine transition errors
    #[error("Invalid bootstrap transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    /// Service unreachable
    #[error("Service unreachable at {url}: {reason}")]
    Connectivity { url: String, reason: String },

    /// Version string errors
    #[error("Invalid version: {0}")]
    Format(#[from] FormatError),

    /// Unexpected reply shape from the service
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Artifact installation errors
    #[error("Failed to install {artifact}: {reason}")]
    Install { artifact: ArtifactKind, reason: String },

    /// Initialization flag could not be read or written
    #[error("Flag store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Redis client errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result type alias for bootstrap operations
pub type Result<T> = std::result::Result<T, BootstrapError>;
