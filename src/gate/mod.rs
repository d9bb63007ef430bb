//! Module version gate
//!
//! Compares the versions of the loaded modules against fixed minimums.
//! Requirements are checked in module-name order and the first shortfall is
//! reported. A required module that is not loaded at all does not fail the
//! gate.

use crate::errors::Result;
use crate::host::ModuleDescriptor;
use crate::semver::{self, MAX_ENCODED};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// RedisGears module name as reported by `MODULE LIST`
pub const COMPUTE_ENGINE: &str = "rg";

/// RedisAI module name as reported by `MODULE LIST`
pub const INFERENCE_ENGINE: &str = "ai";

/// Minimum version per module name
pub type RequirementMap = BTreeMap<&'static str, &'static str>;

/// The fixed minimum versions this bootstrap needs
pub fn requirements() -> RequirementMap {
    BTreeMap::from([(COMPUTE_ENGINE, "v1.0.0"), (INFERENCE_ENGINE, "v1.0.2")])
}

/// Human-readable product name for a module
pub fn display_name(module: &str) -> &str {
    match module {
        COMPUTE_ENGINE => "RedisGears",
        INFERENCE_ENGINE => "RedisAI",
        other => other,
    }
}

/// A module running below its required minimum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateFailure {
    pub module: String,
    pub required: String,
    pub actual: String,
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Running {} version is {}. Version >= {} required.",
            display_name(&self.module),
            self.actual,
            self.required
        )
    }
}

/// Check reported modules against `requirements`.
///
/// Returns `Ok(None)` when every present module is recent enough, and
/// `Ok(Some(failure))` for the first one that is not. Errors only when a
/// requirement string itself is malformed.
pub fn check(
    modules: &[ModuleDescriptor],
    requirements: &RequirementMap,
) -> Result<Option<GateFailure>> {
    for (&module, &required) in requirements {
        let minimum = semver::encode(required)?;

        let Some(descriptor) = modules.iter().find(|m| m.name == module) else {
            tracing::debug!(module, "required module not loaded, skipping");
            continue;
        };

        if descriptor.raw_version > MAX_ENCODED {
            tracing::warn!(
                module,
                raw_version = descriptor.raw_version,
                "reported version exceeds the two-digit field range and cannot be decoded exactly"
            );
        }

        if descriptor.raw_version < minimum {
            return Ok(Some(GateFailure {
                module: module.to_string(),
                required: required.to_string(),
                actual: semver::decode(descriptor.raw_version),
            }));
        }

        tracing::debug!(
            module,
            actual = %semver::decode(descriptor.raw_version),
            required,
            "module version accepted"
        );
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BootstrapError;

    fn only(module: &'static str, required: &'static str) -> RequirementMap {
        BTreeMap::from([(module, required)])
    }

    #[test]
    fn test_below_minimum_fails() {
        let modules = vec![ModuleDescriptor::new("ai", 10000)];
        let failure = check(&modules, &only("ai", "v1.0.2")).unwrap().unwrap();
        assert_eq!(
            failure,
            GateFailure {
                module: "ai".to_string(),
                required: "v1.0.2".to_string(),
                actual: "v1.0.0".to_string(),
            }
        );
    }

    #[test]
    fn test_equal_version_passes() {
        let modules = vec![ModuleDescriptor::new("ai", 10002)];
        assert_eq!(check(&modules, &only("ai", "v1.0.2")).unwrap(), None);
    }

    #[test]
    fn test_newer_version_passes() {
        let modules = vec![ModuleDescriptor::new("ai", 20000)];
        assert_eq!(check(&modules, &only("ai", "v1.0.2")).unwrap(), None);
    }

    #[test]
    fn test_absent_module_passes() {
        let modules = vec![ModuleDescriptor::new("search", 10000)];
        assert_eq!(check(&modules, &requirements()).unwrap(), None);
        assert_eq!(check(&[], &requirements()).unwrap(), None);
    }

    #[test]
    fn test_first_failure_in_name_order() {
        let modules = vec![
            ModuleDescriptor::new("rg", 900),
            ModuleDescriptor::new("ai", 100),
        ];
        let failure = check(&modules, &requirements()).unwrap().unwrap();
        assert_eq!(failure.module, "ai");
    }

    #[test]
    fn test_compute_engine_failure() {
        let modules = vec![
            ModuleDescriptor::new("ai", 10002),
            ModuleDescriptor::new("rg", 9901),
        ];
        let failure = check(&modules, &requirements()).unwrap().unwrap();
        assert_eq!(failure.module, "rg");
        assert_eq!(failure.actual, "v0.99.1");
        assert_eq!(
            failure.to_string(),
            "Running RedisGears version is v0.99.1. Version >= v1.0.0 required."
        );
    }

    #[test]
    fn test_malformed_requirement_is_error() {
        let modules = vec![ModuleDescriptor::new("ai", 10002)];
        assert!(matches!(
            check(&modules, &only("ai", "1.0")),
            Err(BootstrapError::Format(_))
        ));
    }

    #[test]
    fn test_fixed_requirements() {
        let reqs = requirements();
        assert_eq!(reqs.get("rg"), Some(&"v1.0.0"));
        assert_eq!(reqs.get("ai"), Some(&"v1.0.2"));
        assert_eq!(reqs.keys().copied().collect::<Vec<_>>(), vec!["ai", "rg"]);
    }
}
