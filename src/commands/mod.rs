//! Command implementations for conduit.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Handlers return the process exit code so outcomes that
//! are not errors (a blocked or failed workflow) can still exit non-zero.

mod execute;
mod generate;
mod list;
mod mcp;
mod status;
mod watch;

use crate::cli::{Cli, Command, McpAction};
use crate::error::{ConduitError, Result};
use serde::Serialize;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<i32> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Execute(args) => execute::cmd_execute(config, args),
        Command::Status => status::cmd_status(config),
        Command::Commands => list::cmd_commands(config),
        Command::Generate => generate::cmd_generate(config),
        Command::Watch(args) => watch::cmd_watch(config, args),
        Command::Mcp(mcp_cmd) => match mcp_cmd.action {
            McpAction::Install(args) => mcp::cmd_mcp_install(args),
        },
    }
}

/// Render a value as pretty JSON for stdout.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ConduitError::UserError(format!("failed to serialize output: {}", e)))
}
