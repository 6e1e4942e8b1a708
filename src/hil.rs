//! Human-in-the-loop approval gate.
//!
//! Every command passes the gate before its workflow runs. The gate derives
//! the feature's lifecycle phase from the tracking ledger, resolves the
//! approval level the command needs, and blocks automatic execution unless
//! that level is `NONE` or the caller states the command was approved.
//!
//! # Approval Level Priority
//!
//! 1. `operation_overrides.<command>.minimum_approval_level`
//! 2. `environment_overrides.<environment>.approval_level`
//! 3. `user_preferences.default_approval_level`
//! 4. `CONFIRM`

use crate::config::{ApprovalLevel, Config};
use crate::ledger::Ledger;
use clap::ValueEnum;
use serde::Serialize;
use tracing::debug;

/// How the caller wants the gate to treat approval requirements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMode {
    /// Run only if no approval is required.
    #[default]
    Auto,
    /// The operator has already approved this run.
    Approved,
}

/// HIL state for one command and feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HilStatus {
    /// Phase of the feature, from the ledger or the configured default.
    pub current_phase: String,

    /// Phase configured for the command, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_phase: Option<String>,

    /// Approval level the command needs.
    pub approval_level: ApprovalLevel,

    /// Whether automatic execution is blocked without approval.
    pub requires_approval: bool,
}

/// Gate verdict for one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The workflow may run.
    Proceed(HilStatus),

    /// Approval is required; nothing may run.
    Blocked { status: HilStatus, message: String },
}

impl GateDecision {
    /// The HIL status behind the decision.
    pub fn status(&self) -> &HilStatus {
        match self {
            GateDecision::Proceed(status) => status,
            GateDecision::Blocked { status, .. } => status,
        }
    }
}

/// Approval gate over a loaded configuration and ledger.
pub struct HilGate<'a> {
    config: &'a Config,
    ledger: &'a Ledger,
    environment: &'a str,
}

impl<'a> HilGate<'a> {
    /// Create a gate for the given environment.
    pub fn new(config: &'a Config, ledger: &'a Ledger, environment: &'a str) -> Self {
        Self {
            config,
            ledger,
            environment,
        }
    }

    /// Phase of `feature` according to the ledger.
    ///
    /// Without a feature, or when the ledger has no annotation for it, the
    /// configured default phase is returned.
    pub fn current_phase(&self, feature: Option<&str>) -> String {
        feature
            .filter(|f| !f.trim().is_empty())
            .and_then(|f| self.ledger.feature_phase(f.trim()))
            .unwrap_or_else(|| self.config.hil_workflow.default_phase.clone())
    }

    /// Phase configured for `command` under `hil_workflow.commands`.
    pub fn command_phase(&self, command: &str) -> Option<String> {
        self.config
            .hil_workflow
            .commands
            .get(command)
            .and_then(|c| c.phase.clone())
    }

    /// Approval level required to run `command`.
    pub fn required_approval(&self, command: &str) -> ApprovalLevel {
        if let Some(level) = self
            .config
            .operation_overrides
            .get(command)
            .and_then(|o| o.minimum_approval_level.clone())
        {
            return level;
        }

        if let Some(level) = self
            .config
            .environment_overrides
            .get(self.environment)
            .and_then(|o| o.approval_level.clone())
        {
            return level;
        }

        self.config
            .user_preferences
            .default_approval_level
            .clone()
            .unwrap_or_default()
    }

    /// HIL status of `command` for `feature`.
    pub fn check(&self, command: &str, feature: Option<&str>) -> HilStatus {
        let approval_level = self.required_approval(command);
        HilStatus {
            current_phase: self.current_phase(feature),
            command_phase: self.command_phase(command),
            requires_approval: approval_level.requires_approval(),
            approval_level,
        }
    }

    /// Decide whether `command` may run in `mode`.
    pub fn evaluate(&self, command: &str, feature: Option<&str>, mode: ApprovalMode) -> GateDecision {
        let status = self.check(command, feature);
        debug!(
            command = %command,
            phase = %status.current_phase,
            level = %status.approval_level,
            environment = %self.environment,
            "evaluated HIL gate"
        );

        if status.requires_approval && mode == ApprovalMode::Auto {
            let message = format!(
                "Command '{}' requires {} approval in phase '{}'. \
                 Re-run with --approval approved once approved.",
                command, status.approval_level, status.current_phase
            );
            return GateDecision::Blocked { status, message };
        }

        GateDecision::Proceed(status)
    }

    /// Phase after `phase` in the configured order.
    ///
    /// The last phase, and any phase not in the list, map to themselves.
    pub fn next_phase(&self, phase: &str) -> String {
        let phases = self.config.hil_workflow.phases.as_slice();
        phases
            .iter()
            .position(|p| p == phase)
            .and_then(|i| phases.get(i + 1))
            .cloned()
            .unwrap_or_else(|| phase.to_string())
    }
}
