//! Implementation of the `conduit commands` command.

use crate::bridge::available_commands;
use crate::context::ProjectContext;
use crate::error::Result;
use crate::exit_codes;
use std::path::Path;

pub fn cmd_commands(config: Option<&Path>) -> Result<i32> {
    let ctx = ProjectContext::resolve(config, None)?;
    let commands = available_commands(&ctx);

    if commands.is_empty() {
        println!(
            "No commands available in {}.",
            ctx.relative_to_root(&ctx.core_instructions_dir())
        );
        return Ok(exit_codes::SUCCESS);
    }

    println!("Available commands ({}):", commands.len());
    for command in &commands {
        println!("  {}", command);
    }

    Ok(exit_codes::SUCCESS)
}
