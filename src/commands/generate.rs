//! Implementation of the `conduit generate` command.

use crate::catalog::{CatalogBuilder, GenerationReport};
use crate::context::ProjectContext;
use crate::error::Result;
use crate::exit_codes;
use std::path::Path;

pub fn cmd_generate(config: Option<&Path>) -> Result<i32> {
    let ctx = ProjectContext::resolve(config, None)?;
    let report = CatalogBuilder::new(&ctx).generate_all()?;

    print_report(&ctx, &report);

    if report.is_success() {
        Ok(exit_codes::SUCCESS)
    } else {
        Ok(exit_codes::WORKFLOW_FAILURE)
    }
}

/// Print a human-readable generation summary.
pub(super) fn print_report(ctx: &ProjectContext, report: &GenerationReport) {
    if report.integrations.is_empty() {
        println!("No integrations enabled; nothing generated.");
    }

    for integration in &report.integrations {
        println!(
            "{}: {} command(s) -> {} (template: {})",
            integration.ide,
            integration.written.len(),
            ctx.relative_to_root(&integration.output_dir),
            integration.template
        );
        for failure in &integration.failures {
            println!(
                "  failed: {}: {}",
                ctx.relative_to_root(&failure.path),
                failure.error
            );
        }
    }

    for failure in &report.failures {
        println!(
            "failed to load {}: {}",
            ctx.relative_to_root(&failure.path),
            failure.error
        );
    }

    println!(
        "Generated {} file(s) from {} instruction(s){}.",
        report.files_written(),
        report.instructions,
        match report.failure_count() {
            0 => String::new(),
            n => format!(", {} failure(s)", n),
        }
    );
}
