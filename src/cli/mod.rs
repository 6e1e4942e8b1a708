//! CLI argument parsing for conduit.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::hil::ApprovalMode;
use crate::mcp::{DEFAULT_CLI, InstallScope};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Conduit: instruction-driven command generation and HIL-gated workflow
/// execution for IDE agents.
///
/// Instruction markdown under `.conduit/instructions/` is compiled into
/// per-IDE command files, and the same instructions are executed as
/// step-by-step workflows behind a human-in-the-loop approval gate.
#[derive(Parser, Debug)]
#[command(name = "conduit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (defaults to the nearest `.conduit/config.yml`).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v for info, -vv for debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for conduit.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a workflow command.
    ///
    /// Checks prerequisites, evaluates the HIL approval gate, runs the
    /// instruction's steps and appends an entry to the tracking ledger.
    /// Prints the execution report as JSON.
    Execute(ExecuteArgs),

    /// Show project and execution status as JSON.
    Status,

    /// List the commands available for execution.
    Commands,

    /// Generate IDE command files from instruction documents.
    Generate,

    /// Regenerate command files whenever instructions or templates change.
    Watch(WatchArgs),

    /// MCP server management.
    Mcp(McpCommand),
}

/// Arguments for the `execute` command.
#[derive(Parser, Debug)]
pub struct ExecuteArgs {
    /// Command name (instruction file stem under `instructions/core`).
    pub command: String,

    /// IDE issuing the command.
    #[arg(default_value = "cli")]
    pub ide: String,

    /// Workflow parameters as a JSON object.
    #[arg(value_name = "JSON")]
    pub parameters: Option<String>,

    /// Feature whose tracked phase applies to the approval gate.
    #[arg(long)]
    pub feature: Option<String>,

    /// Whether this run has been approved by an operator.
    #[arg(long, value_enum, default_value_t = ApprovalMode::Auto)]
    pub approval: ApprovalMode,

    /// Environment name (defaults to $CONDUIT_ENV, then `development`).
    #[arg(long = "env", value_name = "ENV")]
    pub environment: Option<String>,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Quiet period after a change before regenerating, in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub debounce_ms: u64,
}

/// MCP subcommands.
#[derive(Parser, Debug)]
pub struct McpCommand {
    #[command(subcommand)]
    pub action: McpAction,
}

/// Available MCP actions.
#[derive(Subcommand, Debug)]
pub enum McpAction {
    /// Register the servers of an `mcpServers` JSON manifest.
    Install(McpInstallArgs),
}

/// Arguments for the `mcp install` command.
#[derive(Parser, Debug)]
pub struct McpInstallArgs {
    /// Manifest path (defaults to `.claude/mcp.json`).
    #[arg(long, value_name = "PATH")]
    pub from: Option<PathBuf>,

    /// Scope passed to the agent CLI.
    #[arg(long, value_enum, default_value_t = InstallScope::Project)]
    pub scope: InstallScope,

    /// Remove and re-add servers that already exist.
    #[arg(long)]
    pub replace: bool,

    /// Agent CLI used to register servers.
    #[arg(long, default_value = DEFAULT_CLI)]
    pub cli: String,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
