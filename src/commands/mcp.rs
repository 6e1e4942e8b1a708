//! Implementation of the `conduit mcp install` command.

use crate::cli::McpInstallArgs;
use crate::error::{ConduitError, Result};
use crate::exit_codes;
use crate::mcp::{DEFAULT_MANIFEST, InstallOptions, Installer, McpManifest, SystemRunner};
use std::path::PathBuf;

pub fn cmd_mcp_install(args: McpInstallArgs) -> Result<i32> {
    let path = args
        .from
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST));
    let manifest = McpManifest::load(&path)?;

    if manifest.is_empty() {
        println!("No servers found in mcpServers. Nothing to install.");
        return Ok(exit_codes::SUCCESS);
    }

    let mut installer = Installer::new(&args.cli, SystemRunner)?;
    let options = InstallOptions {
        scope: args.scope,
        replace: args.replace,
    };
    let report = installer.install(&manifest, options);

    for name in &report.replaced {
        println!("Replaced {}", name);
    }
    for name in &report.skipped {
        println!("Skipped {} (already exists; use --replace to overwrite)", name);
    }
    println!(
        "Added {} server(s) with scope '{}' from {}",
        report.added.len(),
        args.scope.as_str(),
        path.display()
    );

    if report.is_success() {
        return Ok(exit_codes::SUCCESS);
    }

    let details: Vec<String> = report
        .failures
        .iter()
        .map(|f| format!("  - {}: {}", f.name, f.error))
        .collect();
    Err(ConduitError::ProcessError(format!(
        "{} server(s) failed to install:\n{}",
        report.failures.len(),
        details.join("\n")
    )))
}
