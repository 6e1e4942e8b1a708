//! Implementation of the `conduit status` command.

use super::to_pretty_json;
use crate::bridge::CommandBridge;
use crate::context::ProjectContext;
use crate::error::Result;
use crate::exit_codes;
use std::path::Path;

pub fn cmd_status(config: Option<&Path>) -> Result<i32> {
    let ctx = ProjectContext::resolve(config, None)?;
    println!("{}", render_status(&ctx)?);
    Ok(exit_codes::SUCCESS)
}

/// Status report of a fresh bridge as pretty JSON.
///
/// History lives in memory, so a new process reports none.
fn render_status(ctx: &ProjectContext) -> Result<String> {
    let bridge = CommandBridge::new(ctx);
    to_pretty_json(&bridge.status())
}
