//! Workflow step parsing and execution for conduit.
//!
//! An instruction body declares its workflow as numbered step headings:
//!
//! ```text
//! ## Step 1: Build
//! Compile the project.
//!
//! ## Step 2: Notify team (optional)
//! Post in the release channel.
//! ```
//!
//! Steps run strictly in order through a [`StepExecutor`]. A failed critical
//! step stops the run and no later step is attempted; a failed optional step
//! is recorded and the run continues. There are no retries.
//!
//! # State Machine
//!
//! ```text
//! Pending -> Running(1) -> ... -> Running(n) -> Completed
//!                  \-> Failed(step) on the first critical failure
//! ```

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, warn};

/// Step heading: `#`..`######`, then `Step <N>: <name>`.
static STEP_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^#{1,6}[ \t]+Step[ \t]+(\d+):[ \t]*(.*?)[ \t]*\r?$")
        .expect("Invalid step heading regex")
});

/// Suffix marking a step whose failure does not stop the workflow.
const OPTIONAL_SUFFIX: &str = "(optional)";

/// One declared workflow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowStep {
    /// Step number as written in the heading.
    pub number: u32,

    /// Step name, without the optional marker.
    pub name: String,

    /// Text between this heading and the next step heading, trimmed.
    pub body: String,

    /// Whether a failure stops the workflow.
    pub critical: bool,
}

/// Parse step headings from an instruction body, in document order.
pub fn parse_steps(body: &str) -> Vec<WorkflowStep> {
    let headings: Vec<_> = STEP_HEADING.captures_iter(body).collect();
    let mut steps = Vec::with_capacity(headings.len());

    for (i, caps) in headings.iter().enumerate() {
        let (Some(heading), Some(number), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let Ok(number) = number.as_str().parse::<u32>() else {
            warn!(heading = %heading.as_str(), "ignoring step with out-of-range number");
            continue;
        };

        let body_end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(body.len());
        let step_body = body[heading.end()..body_end].trim();

        let (name, critical) = split_optional_marker(name.as_str());
        steps.push(WorkflowStep {
            number,
            name,
            body: step_body.to_string(),
            critical,
        });
    }

    steps
}

/// Strip a trailing `(optional)` marker (case-insensitive).
fn split_optional_marker(name: &str) -> (String, bool) {
    let trimmed = name.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.ends_with(OPTIONAL_SUFFIX) {
        let cut = trimmed.len() - OPTIONAL_SUFFIX.len();
        (trimmed[..cut].trim_end().to_string(), false)
    } else {
        (trimmed.to_string(), true)
    }
}

/// Performs the work of a single step.
///
/// Closures `FnMut(&WorkflowStep, &Value) -> Result<Value, String>` are
/// executors too.
pub trait StepExecutor {
    /// Execute `step` with the command parameters; `Err` carries the reason.
    fn execute(&mut self, step: &WorkflowStep, parameters: &Value) -> Result<Value, String>;
}

impl<F> StepExecutor for F
where
    F: FnMut(&WorkflowStep, &Value) -> Result<Value, String>,
{
    fn execute(&mut self, step: &WorkflowStep, parameters: &Value) -> Result<Value, String> {
        self(step, parameters)
    }
}

/// Default executor: records the declared work without side effects.
///
/// The IDE agent that invoked the command performs the steps; conduit only
/// sequences them and reports what each step asked for.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredStepExecutor;

impl StepExecutor for DeclaredStepExecutor {
    fn execute(&mut self, step: &WorkflowStep, parameters: &Value) -> Result<Value, String> {
        Ok(json!({
            "step": step.number,
            "name": step.name,
            "status": "declared",
            "instructions": step.body,
            "parameters": parameters,
        }))
    }
}

/// Workflow execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowState {
    Pending,
    Running { step: u32 },
    Completed,
    Failed { step: u32 },
}

/// Result of one attempted step.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// Step number.
    pub step: u32,

    /// Step name.
    pub name: String,

    /// Whether the step succeeded.
    pub success: bool,

    /// Whether the step was critical.
    pub critical: bool,

    /// Executor output for successful steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    /// Command the workflow belongs to.
    pub command: String,

    /// Final state (`Completed` or `Failed`).
    pub state: WorkflowState,

    /// Declared steps.
    pub total_steps: usize,

    /// Steps that succeeded.
    pub completed_steps: usize,

    /// Numbers of steps that failed, critical or not.
    pub failed_steps: Vec<u32>,

    /// One result per attempted step, in order.
    pub results: Vec<StepResult>,

    /// Whether every attempted step succeeded.
    pub success: bool,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Runs workflow steps through a [`StepExecutor`].
pub struct WorkflowExecutor<E> {
    executor: E,
    state: WorkflowState,
}

impl<E: StepExecutor> WorkflowExecutor<E> {
    /// Create an executor in the `Pending` state.
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            state: WorkflowState::Pending,
        }
    }

    /// Current state.
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Run `steps` in order for `command`.
    pub fn run(&mut self, command: &str, steps: &[WorkflowStep], parameters: &Value) -> WorkflowOutcome {
        let started_at = Utc::now();
        let timer = Instant::now();
        let mut results = Vec::with_capacity(steps.len());
        let mut failed_steps = Vec::new();

        self.state = WorkflowState::Pending;

        for step in steps {
            self.state = WorkflowState::Running { step: step.number };
            debug!(command = %command, step = step.number, name = %step.name, "running step");

            match self.executor.execute(step, parameters) {
                Ok(output) => results.push(StepResult {
                    step: step.number,
                    name: step.name.clone(),
                    success: true,
                    critical: step.critical,
                    output: Some(output),
                    error: None,
                }),
                Err(reason) => {
                    warn!(command = %command, step = step.number, error = %reason, "step failed");
                    failed_steps.push(step.number);
                    results.push(StepResult {
                        step: step.number,
                        name: step.name.clone(),
                        success: false,
                        critical: step.critical,
                        output: None,
                        error: Some(reason),
                    });
                    if step.critical {
                        self.state = WorkflowState::Failed { step: step.number };
                        break;
                    }
                }
            }
        }

        if !matches!(self.state, WorkflowState::Failed { .. }) {
            self.state = WorkflowState::Completed;
        }

        let completed_steps = results.iter().filter(|r| r.success).count();
        WorkflowOutcome {
            command: command.to_string(),
            state: self.state,
            total_steps: steps.len(),
            completed_steps,
            success: failed_steps.is_empty(),
            failed_steps,
            results,
            started_at,
            duration_ms: timer.elapsed().as_millis() as u64,
        }
    }
}
