//! Bootstrap controller
//!
//! Drives one provisioning attempt: probe → version gate → flag check →
//! install model → install script → write flag. Every external call is made
//! at most once. The result is an [`Outcome`]; mapping it to a process exit
//! status is left to the caller.

pub mod state;

pub use state::{BootstrapState, StateEvent};

use crate::artifacts::{ArtifactKind, ArtifactSource};
use crate::config::FlagConfig;
use crate::errors::{BootstrapError, Result};
use crate::gate::{self, GateFailure, RequirementMap};
use crate::host::{InstallReceipt, ModuleHost};
use serde::Serialize;

/// Exit status for an unreachable service
pub const EXIT_CODE_UNREACHABLE: i32 = 2;

/// Exit status for a failed install step
pub const EXIT_CODE_INSTALL_FAILED: i32 = 3;

/// An install step that did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallFailure {
    pub artifact: ArtifactKind,
    pub reason: String,
}

impl InstallFailure {
    fn from_error(artifact: ArtifactKind, err: BootstrapError) -> Self {
        let reason = match err {
            BootstrapError::Install { reason, .. } => reason,
            other => other.to_string(),
        };
        Self { artifact, reason }
    }
}

/// How a bootstrap attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Both artifacts installed and the flag written
    Done {
        model: String,
        script: String,
        /// False when the flag appeared while installing
        flag_written: bool,
    },

    /// The flag was already present; nothing was installed
    AlreadyInitialized,

    /// A module is below its minimum version; nothing was installed
    GateFailed(GateFailure),

    /// An install step failed; the flag was not written
    InstallFailed(InstallFailure),

    /// The service could not be reached
    ConnectivityFailed { reason: String },

    /// Dry run only: installation would be performed
    Pending,
}

impl Outcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Done { .. }
            | Outcome::AlreadyInitialized
            | Outcome::GateFailed(_)
            | Outcome::Pending => 0,
            Outcome::ConnectivityFailed { .. } => EXIT_CODE_UNREACHABLE,
            Outcome::InstallFailed(_) => EXIT_CODE_INSTALL_FAILED,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }
}

/// Whether the controller may change anything on the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Apply,
    DryRun,
}

/// Runs the bootstrap state machine against a [`ModuleHost`]
pub struct BootstrapController {
    flag: FlagConfig,
    requirements: RequirementMap,
    mode: RunMode,
    state: BootstrapState,
}

impl BootstrapController {
    /// Create a controller using the fixed module requirements
    pub fn new(flag: FlagConfig) -> Self {
        Self {
            flag,
            requirements: gate::requirements(),
            mode: RunMode::Apply,
            state: BootstrapState::Unchecked,
        }
    }

    pub fn with_requirements(mut self, requirements: RequirementMap) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Current state
    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// Run one bootstrap attempt.
    ///
    /// Soft stops and install failures come back as an [`Outcome`]. An `Err`
    /// means the service answered something unexpected outside the install
    /// steps (malformed module list, flag store failure).
    pub async fn run<H, A>(&mut self, host: &mut H, artifacts: &A) -> Result<Outcome>
    where
        H: ModuleHost + ?Sized,
        A: ArtifactSource + ?Sized,
    {
        self.state = BootstrapState::Unchecked;

        if let Err(e) = host.probe().await {
            tracing::error!(error = %e, "service unreachable");
            self.advance(StateEvent::ProbeFailed)?;
            return Ok(Outcome::ConnectivityFailed {
                reason: e.to_string(),
            });
        }
        self.advance(StateEvent::ProbeSucceeded)?;

        let result = self.run_gated(host, artifacts).await;
        if result.is_err() {
            self.state = self
                .state
                .transition(StateEvent::Aborted)
                .unwrap_or(BootstrapState::Failed);
        }
        result
    }

    async fn run_gated<H, A>(&mut self, host: &mut H, artifacts: &A) -> Result<Outcome>
    where
        H: ModuleHost + ?Sized,
        A: ArtifactSource + ?Sized,
    {
        let modules = host.list_modules().await?;
        tracing::debug!(count = modules.len(), "listed modules");

        if let Some(failure) = gate::check(&modules, &self.requirements)? {
            tracing::warn!(
                module = %failure.module,
                actual = %failure.actual,
                required = %failure.required,
                "module version below minimum"
            );
            self.advance(StateEvent::GateRejected)?;
            return Ok(Outcome::GateFailed(failure));
        }

        if host.flag_exists(&self.flag.key).await? {
            tracing::info!(key = %self.flag.key, "previous initialization found, skipping");
            self.advance(StateEvent::FlagPresent)?;
            return Ok(Outcome::AlreadyInitialized);
        }

        if self.mode == RunMode::DryRun {
            tracing::info!("dry run, installation pending");
            return Ok(Outcome::Pending);
        }

        self.advance(StateEvent::FlagAbsent)?;

        let model = match install_model(host, artifacts).await {
            Ok(receipt) => receipt,
            Err(e) => return self.install_failed(ArtifactKind::Model, e),
        };
        tracing::info!(reply = %model.0, "model loaded");

        // The model stays installed if this fails; there is no rollback
        let script = match install_script(host, artifacts).await {
            Ok(receipt) => receipt,
            Err(e) => return self.install_failed(ArtifactKind::Script, e),
        };
        tracing::info!(reply = %script.0, "gear loaded");

        let flag_written = host.set_flag(&self.flag.key, &self.flag.value).await?;
        if !flag_written {
            tracing::warn!(
                key = %self.flag.key,
                "flag appeared during installation; another bootstrap may have run concurrently"
            );
        }
        self.advance(StateEvent::InstallsComplete)?;

        Ok(Outcome::Done {
            model: model.0,
            script: script.0,
            flag_written,
        })
    }

    fn install_failed(&mut self, artifact: ArtifactKind, err: BootstrapError) -> Result<Outcome> {
        let failure = InstallFailure::from_error(artifact, err);
        tracing::error!(artifact = %failure.artifact, reason = %failure.reason, "install failed");
        self.advance(StateEvent::InstallFailed)?;
        Ok(Outcome::InstallFailed(failure))
    }

    fn advance(&mut self, event: StateEvent) -> Result<()> {
        let next = self.state.transition(event)?;
        tracing::debug!(from = ?self.state, to = ?next, event = ?event, "bootstrap transition");
        self.state = next;
        Ok(())
    }
}

async fn install_model<H, A>(host: &mut H, artifacts: &A) -> Result<InstallReceipt>
where
    H: ModuleHost + ?Sized,
    A: ArtifactSource + ?Sized,
{
    let model = artifacts.model().await?;
    tracing::debug!(key = %model.key, bytes = model.blob.len(), "installing model");
    host.install_model(&model).await
}

async fn install_script<H, A>(host: &mut H, artifacts: &A) -> Result<InstallReceipt>
where
    H: ModuleHost + ?Sized,
    A: ArtifactSource + ?Sized,
{
    let script = artifacts.script().await?;
    tracing::debug!(
        bytes = script.source.len(),
        requirements = script.requirements.len(),
        "installing gear"
    );
    host.install_script(&script).await
}
