//! Log output for catsinit
//!
//! Structured `tracing` events go to stderr; stdout is reserved for the
//! operator report.

use crate::cli::Verbosity;
use tracing_subscriber::EnvFilter;

/// Default filter directive for a verbosity level
pub fn default_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "info",
        Verbosity::VeryVerbose => "debug",
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `verbosity`.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_per_verbosity() {
        assert_eq!(default_directive(Verbosity::Quiet), "error");
        assert_eq!(default_directive(Verbosity::Normal), "warn");
        assert_eq!(default_directive(Verbosity::Verbose), "info");
        assert_eq!(default_directive(Verbosity::VeryVerbose), "debug");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(Verbosity::Normal);
        init(Verbosity::Verbose);
    }
}
