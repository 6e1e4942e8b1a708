//! Implementation of the `conduit execute` command.

use super::to_pretty_json;
use crate::bridge::{CommandBridge, ExecuteOptions, ExecutionReport};
use crate::cli::ExecuteArgs;
use crate::context::ProjectContext;
use crate::error::{ConduitError, Result};
use serde_json::{Map, Value};
use std::path::Path;

pub fn cmd_execute(config: Option<&Path>, args: ExecuteArgs) -> Result<i32> {
    let ctx = ProjectContext::resolve(config, args.environment.as_deref())?;
    let (json, code) = run_execute(&ctx, &args)?;
    println!("{}", json);
    Ok(code)
}

/// Execute the command and render its report.
fn run_execute(ctx: &ProjectContext, args: &ExecuteArgs) -> Result<(String, i32)> {
    let options = ExecuteOptions {
        source_ide: args.ide.clone(),
        parameters: parse_parameters(args.parameters.as_deref())?,
        feature: args.feature.clone(),
        approval: args.approval,
    };

    let mut bridge = CommandBridge::new(ctx);
    let outcome = bridge.execute(&args.command, &options);
    let report = ExecutionReport::new(&args.command, &options.source_ide, &outcome);

    Ok((to_pretty_json(&report)?, outcome.exit_code()))
}

/// Parse the optional JSON parameter argument. Absent means `{}`.
fn parse_parameters(raw: Option<&str>) -> Result<Value> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Value::Object(Map::new())),
        Some(text) => serde_json::from_str(text).map_err(|e| {
            ConduitError::UserError(format!(
                "invalid JSON parameters '{}': {}\n\
                 Fix: pass a JSON object, e.g. '{{\"target\": \"staging\"}}'.",
                text, e
            ))
        }),
    }
}
