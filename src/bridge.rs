//! Command execution pipeline.
//!
//! The bridge runs a named command on behalf of an IDE (or the CLI):
//!
//! 1. Validate the command (instruction present, project root found,
//!    configured prerequisites present)
//! 2. Load the instruction, resolving includes
//! 3. Pass the HIL gate; a blocked command stops here and leaves no trace
//! 4. Run the workflow steps declared in the instruction body
//! 5. Append an execution entry to the tracking ledger
//! 6. Record the execution in the in-memory history
//!
//! Every attempt ends in a [`CommandOutcome`]; only a broken environment
//! (unreadable config or ledger) is reported as an error, and that happens
//! before the bridge exists.

use crate::config::ApprovalLevel;
use crate::context::ProjectContext;
use crate::error::ConduitError;
use crate::exit_codes;
use crate::hil::{ApprovalMode, GateDecision, HilGate};
use crate::history::{ExecutionHistory, ExecutionRecord};
use crate::instruction::{IncludeResolver, Instruction};
use crate::ledger::LedgerEntry;
use crate::workflow::{
    DeclaredStepExecutor, StepExecutor, WorkflowExecutor, WorkflowOutcome, WorkflowState,
    parse_steps,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Number of history entries included in a status report.
pub const STATUS_HISTORY_LEN: usize = 10;

/// Options for one command execution.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// IDE (or `cli`) issuing the command.
    pub source_ide: String,

    /// Parameters passed to every workflow step.
    pub parameters: Value,

    /// Feature whose ledger phase drives the HIL gate.
    pub feature: Option<String>,

    /// Whether the operator has approved this run.
    pub approval: ApprovalMode,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            source_ide: "cli".to_string(),
            parameters: Value::Object(Map::new()),
            feature: None,
            approval: ApprovalMode::Auto,
        }
    }
}

/// Why a command failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No instruction exists for the command.
    NotFound,
    /// No project root marker was found.
    InvalidProject,
    /// Configured prerequisites are missing.
    Dependencies,
    /// The instruction could not be loaded.
    Instruction,
    /// A critical workflow step failed.
    Workflow,
}

impl FailureKind {
    /// Remediation hints for this kind of failure.
    pub fn suggestions(self, command: &str) -> Vec<String> {
        match self {
            FailureKind::NotFound => vec![
                "Check that conduit is set up: .conduit/config.yml and the instructions directory must exist".to_string(),
                "Run `conduit commands` to list available commands".to_string(),
                "Run `conduit generate` to regenerate IDE commands".to_string(),
            ],
            FailureKind::InvalidProject => vec![
                "Run conduit inside a project containing .git, package.json or Cargo.toml".to_string(),
            ],
            FailureKind::Dependencies => vec![
                "Install or create the missing prerequisites".to_string(),
                format!(
                    "Review operation_overrides.{}.requires in .conduit/config.yml",
                    command
                ),
            ],
            FailureKind::Instruction => vec![
                "Check the instruction's @includes for a cycle or an unreadable file".to_string(),
            ],
            FailureKind::Workflow => vec![
                "Inspect the failed step in the instruction and re-run once fixed".to_string(),
            ],
        }
    }
}

/// Result of one command execution attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The workflow ran without a critical failure.
    Succeeded {
        result: WorkflowOutcome,
        hil_phase: String,
        next_phase: String,
        message: String,
        tracking_updated: bool,
    },

    /// The HIL gate requires approval; nothing ran.
    Blocked {
        hil_phase: String,
        approval_level: ApprovalLevel,
        message: String,
        suggestions: Vec<String>,
    },

    /// Validation, loading or a critical workflow step failed.
    Failed {
        error: String,
        kind: FailureKind,
        suggestions: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        workflow: Option<WorkflowOutcome>,
    },
}

impl CommandOutcome {
    fn failed(command: &str, kind: FailureKind, error: impl Into<String>) -> Self {
        CommandOutcome::Failed {
            error: error.into(),
            kind,
            suggestions: kind.suggestions(command),
            workflow: None,
        }
    }

    /// Whether the command ran successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Succeeded { .. })
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandOutcome::Succeeded { .. } => exit_codes::SUCCESS,
            CommandOutcome::Blocked { .. } => exit_codes::APPROVAL_REQUIRED,
            CommandOutcome::Failed { .. } => exit_codes::WORKFLOW_FAILURE,
        }
    }

    fn error_message(&self) -> Option<String> {
        match self {
            CommandOutcome::Failed { error, .. } => Some(error.clone()),
            _ => None,
        }
    }
}

/// Serializable execution report printed by `conduit execute`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport<'a> {
    pub success: bool,
    pub command: &'a str,
    pub source_ide: &'a str,
    #[serde(flatten)]
    pub outcome: &'a CommandOutcome,
}

impl<'a> ExecutionReport<'a> {
    /// Wrap an outcome for output.
    pub fn new(command: &'a str, source_ide: &'a str, outcome: &'a CommandOutcome) -> Self {
        Self {
            success: outcome.is_success(),
            command,
            source_ide,
            outcome,
        }
    }
}

/// Snapshot of the project and recent executions.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub project_root: PathBuf,
    pub config_version: String,
    pub environment: String,
    pub hil_workflow_enabled: bool,
    pub available_commands: Vec<String>,
    pub command_history: Vec<ExecutionRecord>,
    pub last_execution: Option<ExecutionRecord>,
}

/// Validation failure before anything is loaded.
struct Rejection {
    kind: FailureKind,
    reason: String,
}

/// Runs commands for a project.
pub struct CommandBridge<'a, E = DeclaredStepExecutor> {
    ctx: &'a ProjectContext,
    resolver: IncludeResolver,
    workflow: WorkflowExecutor<E>,
    history: ExecutionHistory,
}

impl<'a> CommandBridge<'a> {
    /// Create a bridge using the declaring step executor.
    pub fn new(ctx: &'a ProjectContext) -> Self {
        Self::with_executor(ctx, DeclaredStepExecutor)
    }
}

impl<'a, E: StepExecutor> CommandBridge<'a, E> {
    /// Create a bridge with a custom step executor.
    pub fn with_executor(ctx: &'a ProjectContext, executor: E) -> Self {
        Self {
            ctx,
            resolver: IncludeResolver::default(),
            workflow: WorkflowExecutor::new(executor),
            history: ExecutionHistory::default(),
        }
    }

    /// Execution history of this bridge.
    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }

    /// Execute `command`.
    pub fn execute(&mut self, command: &str, options: &ExecuteOptions) -> CommandOutcome {
        let timer = Instant::now();
        info!(command = %command, ide = %options.source_ide, "executing command");

        let outcome = self.run_pipeline(command, options);

        match &outcome {
            CommandOutcome::Blocked { message, .. } => {
                info!(command = %command, "{}", message);
            }
            other => {
                if let Some(error) = other.error_message() {
                    warn!(command = %command, error = %error, "command failed");
                }
                self.history.record(ExecutionRecord {
                    timestamp: Utc::now(),
                    command: command.to_string(),
                    source_ide: options.source_ide.clone(),
                    success: other.is_success(),
                    error: other.error_message(),
                    duration_ms: timer.elapsed().as_millis() as u64,
                });
            }
        }

        outcome
    }

    fn run_pipeline(&mut self, command: &str, options: &ExecuteOptions) -> CommandOutcome {
        if let Err(rejection) = self.validate(command) {
            return CommandOutcome::failed(
                command,
                rejection.kind,
                format!("Command validation failed: {}", rejection.reason),
            );
        }

        let path = self.ctx.command_instruction_path(command);
        let instruction = match Instruction::load(&path, &self.resolver) {
            Ok(instruction) => instruction,
            Err(e) => {
                let kind = match e {
                    ConduitError::IncludeError(_) => FailureKind::Instruction,
                    _ => FailureKind::NotFound,
                };
                return CommandOutcome::failed(command, kind, e.to_string());
            }
        };

        let gate = HilGate::new(&self.ctx.config, &self.ctx.ledger, &self.ctx.environment);
        let status = match gate.evaluate(command, options.feature.as_deref(), options.approval) {
            GateDecision::Proceed(status) => status,
            GateDecision::Blocked { status, message } => {
                return CommandOutcome::Blocked {
                    hil_phase: status.current_phase,
                    approval_level: status.approval_level,
                    message,
                    suggestions: vec![
                        "Request the required approval, then re-run with --approval approved"
                            .to_string(),
                        "Check the HIL workflow phase requirements with `conduit status`"
                            .to_string(),
                    ],
                };
            }
        };

        let steps = parse_steps(instruction.body());
        let result = self.workflow.run(command, &steps, &options.parameters);
        let tracking_updated = self.append_ledger(command, &options.source_ide, &result);

        if let WorkflowState::Failed { step } = result.state {
            let name = steps
                .iter()
                .find(|s| s.number == step)
                .map(|s| s.name.as_str())
                .unwrap_or_default();
            let reason = result
                .results
                .iter()
                .rev()
                .find_map(|r| r.error.clone())
                .unwrap_or_default();
            return CommandOutcome::Failed {
                error: format!("Critical step failed: Step {}: {} - {}", step, name, reason),
                kind: FailureKind::Workflow,
                suggestions: FailureKind::Workflow.suggestions(command),
                workflow: Some(result),
            };
        }

        CommandOutcome::Succeeded {
            hil_phase: status.current_phase.clone(),
            next_phase: gate.next_phase(&status.current_phase),
            message: format!("Command {} executed successfully", command),
            tracking_updated,
            result,
        }
    }

    fn validate(&self, command: &str) -> Result<(), Rejection> {
        if command.is_empty()
            || command.contains(['/', '\\'])
            || command.starts_with('.')
        {
            return Err(Rejection {
                kind: FailureKind::NotFound,
                reason: format!("invalid command name '{}'", command),
            });
        }

        let path = self.ctx.command_instruction_path(command);
        if !path.is_file() {
            return Err(Rejection {
                kind: FailureKind::NotFound,
                reason: format!("Instruction file not found: {}", path.display()),
            });
        }

        if !self.ctx.is_valid_project() {
            return Err(Rejection {
                kind: FailureKind::InvalidProject,
                reason: format!(
                    "Not a valid project directory: {}",
                    self.ctx.project_root.display()
                ),
            });
        }

        if let Some(overrides) = self.ctx.config.operation_overrides.get(command) {
            let missing: Vec<&str> = overrides
                .requires
                .iter()
                .filter(|req| !self.ctx.project_root.join(req.as_str()).exists())
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(Rejection {
                    kind: FailureKind::Dependencies,
                    reason: format!("Dependencies not satisfied: {}", missing.join(", ")),
                });
            }
        }

        Ok(())
    }

    /// Append the execution to the ledger; failures only warn.
    fn append_ledger(&self, command: &str, source_ide: &str, result: &WorkflowOutcome) -> bool {
        let entry = LedgerEntry::new(
            command,
            source_ide,
            result.success,
            result.completed_steps,
            result.total_steps,
        );
        match self.ctx.ledger.append_execution(&entry) {
            Ok(()) => {
                info!(path = %self.ctx.ledger_path().display(), "tracking updated");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to update tracking ledger");
                false
            }
        }
    }

    /// Sorted names of the commands with an instruction in `<instructions>/core`.
    pub fn available_commands(&self) -> Vec<String> {
        available_commands(self.ctx)
    }

    /// Project status including recent executions.
    pub fn status(&self) -> StatusReport {
        StatusReport {
            project_root: self.ctx.project_root.clone(),
            config_version: self
                .ctx
                .config
                .framework
                .version
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            environment: self.ctx.environment.clone(),
            hil_workflow_enabled: self.ctx.config.hil_workflow.enabled,
            available_commands: self.available_commands(),
            command_history: self.history.recent(STATUS_HISTORY_LEN),
            last_execution: self.history.last().cloned(),
        }
    }
}

/// Sorted names of the commands with an instruction in `<instructions>/core`.
///
/// A missing or unreadable directory yields no commands.
pub fn available_commands(ctx: &ProjectContext) -> Vec<String> {
    let dir = ctx.core_instructions_dir();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            if dir.exists() {
                warn!(path = %dir.display(), error = %e, "failed to list commands");
            }
            return Vec::new();
        }
    };

    let mut commands: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("md"))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    commands.sort();
    commands
}
