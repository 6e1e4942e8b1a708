//! Command catalog generation.
//!
//! The catalog builder turns the instruction tree into IDE command files:
//! one output file per (instruction, enabled integration) pair, written to
//! the integration's command directory as `<command_name>.md`.
//!
//! Generation is idempotent. The same inputs always produce byte-identical
//! outputs, and every run overwrites the previous files. A failure for a
//! single instruction or integration is recorded in the report and the
//! batch continues.

use crate::config::IntegrationConfig;
use crate::context::ProjectContext;
use crate::error::{ConduitError, Result};
use crate::fs::atomic_write_file;
use crate::instruction::{IncludeResolver, Instruction, InstructionMetadata};
use crate::template::{TemplateVariables, apply_template, unresolved_placeholders};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Template used when neither the integration nor the IDE convention names one.
pub const FALLBACK_TEMPLATE: &str = "claude_command.md";

/// Output directory used for IDEs without a known convention, joined with the IDE name.
pub const GENERIC_OUTPUT_DIR: &str = ".conduit/generated";

/// A rendered command for one instruction and IDE.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedCommand {
    /// Command name (instruction file stem).
    pub command_name: String,

    /// Instruction the command was generated from.
    pub source: PathBuf,

    /// Where the command file belongs.
    pub output_path: PathBuf,

    /// Rendered command file content.
    pub content: String,

    /// Instruction metadata.
    pub metadata: InstructionMetadata,

    /// Variables used for substitution.
    pub variables: TemplateVariables,
}

/// A single instruction or integration that could not be generated.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationFailure {
    /// Instruction (or template) path involved.
    pub path: PathBuf,

    /// What went wrong.
    pub error: String,
}

/// Generation results for one integration.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationReport {
    /// IDE key from `integrations`.
    pub ide: String,

    /// Directory the commands were written to.
    pub output_dir: PathBuf,

    /// Template file name used.
    pub template: String,

    /// Files written, in instruction order.
    pub written: Vec<PathBuf>,

    /// Per-instruction failures.
    pub failures: Vec<GenerationFailure>,
}

/// Results of a full catalog generation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    /// Number of instruction files selected.
    pub instructions: usize,

    /// Instructions that could not be loaded (affects every integration).
    pub failures: Vec<GenerationFailure>,

    /// One entry per enabled integration, sorted by IDE key.
    pub integrations: Vec<IntegrationReport>,
}

impl GenerationReport {
    /// Total number of command files written.
    pub fn files_written(&self) -> usize {
        self.integrations.iter().map(|i| i.written.len()).sum()
    }

    /// Total number of recorded failures.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
            + self
                .integrations
                .iter()
                .map(|i| i.failures.len())
                .sum::<usize>()
    }

    /// Whether every instruction was generated for every integration.
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Output directory (relative to the project root) for an integration.
///
/// An explicit `commands_directory` wins; otherwise known IDEs use their
/// conventional directory and any other IDE gets `.conduit/generated/<ide>`.
pub fn output_dir_for(ide: &str, integration: &IntegrationConfig) -> PathBuf {
    if let Some(dir) = integration.commands_directory.as_deref()
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }

    match ide {
        "claude_code" => PathBuf::from(".claude/commands"),
        "cursor" => PathBuf::from(".cursor/commands"),
        other => Path::new(GENERIC_OUTPUT_DIR).join(other),
    }
}

/// Conventional template file name for an IDE.
pub fn default_template_for(ide: &str) -> &'static str {
    match ide {
        "cursor" => "cursor_command.md",
        _ => FALLBACK_TEMPLATE,
    }
}

/// Builds IDE command files from the instruction tree.
pub struct CatalogBuilder<'a> {
    ctx: &'a ProjectContext,
    resolver: IncludeResolver,
}

impl<'a> CatalogBuilder<'a> {
    /// Create a builder for a project.
    pub fn new(ctx: &'a ProjectContext) -> Self {
        Self {
            ctx,
            resolver: IncludeResolver::default(),
        }
    }

    /// Template file name for an IDE.
    ///
    /// Lookup order: `integrations.<ide>.template`, then
    /// `command_generation.mappings.<ide>.template`, then the IDE default.
    pub fn template_name(&self, ide: &str) -> String {
        let config = &self.ctx.config;
        config
            .integrations
            .get(ide)
            .and_then(|i| i.template.clone())
            .or_else(|| {
                config
                    .command_generation
                    .mappings
                    .get(ide)
                    .and_then(|m| m.template.clone())
            })
            .unwrap_or_else(|| default_template_for(ide).to_string())
    }

    /// Absolute output directory for an IDE.
    pub fn output_dir(&self, ide: &str) -> PathBuf {
        let integration = self
            .ctx
            .config
            .integrations
            .get(ide)
            .cloned()
            .unwrap_or_default();
        self.ctx.project_root.join(output_dir_for(ide, &integration))
    }

    /// Read the template for an IDE.
    ///
    /// # Errors
    ///
    /// * `ConduitError::UserError` - the template file cannot be read
    pub fn load_template(&self, ide: &str) -> Result<String> {
        let path = self.ctx.templates_dir().join(self.template_name(ide));
        let template = fs::read_to_string(&path).map_err(|e| {
            ConduitError::UserError(format!(
                "failed to read template for '{}' at '{}': {}",
                ide,
                path.display(),
                e
            ))
        })?;

        let unresolved = unresolved_placeholders(&template);
        if !unresolved.is_empty() {
            debug!(
                template = %path.display(),
                placeholders = ?unresolved,
                "template references variables outside the schema"
            );
        }

        Ok(template)
    }

    /// Instruction files selected by `command_generation.instruction_globs`,
    /// sorted by path.
    ///
    /// # Errors
    ///
    /// * `ConduitError::UserError` - the instructions directory does not exist
    pub fn instruction_files(&self) -> Result<Vec<PathBuf>> {
        let root = self.ctx.instructions_dir();
        if !root.is_dir() {
            return Err(ConduitError::UserError(format!(
                "instructions directory not found: '{}'",
                root.display()
            )));
        }

        let globs = build_globset(&self.ctx.config.command_generation.instruction_globs)?;

        let mut files = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry in instructions directory");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = relative_slash_path(&root, entry.path());
            if globs.is_match(&relative) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Render one instruction for one IDE without writing it.
    ///
    /// # Errors
    ///
    /// * `ConduitError::UserError` - the instruction or template cannot be read
    /// * `ConduitError::IncludeError` - include nesting exceeded the limit
    pub fn generate_command(&self, path: &Path, ide: &str) -> Result<GeneratedCommand> {
        let template = self.load_template(ide)?;
        let instruction = Instruction::load(path, &self.resolver)?;
        Ok(self.render(&instruction, &template, &self.output_dir(ide)))
    }

    /// Generate every instruction for every enabled integration.
    ///
    /// # Errors
    ///
    /// * `ConduitError::UserError` - the instructions directory does not exist
    pub fn generate_all(&self) -> Result<GenerationReport> {
        let files = self.instruction_files()?;
        let mut report = GenerationReport {
            instructions: files.len(),
            ..Default::default()
        };

        let mut instructions = Vec::with_capacity(files.len());
        for path in &files {
            match Instruction::load(path, &self.resolver) {
                Ok(instruction) => instructions.push(instruction),
                Err(e) => {
                    error!(instruction = %path.display(), error = %e, "failed to load instruction");
                    report.failures.push(GenerationFailure {
                        path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let enabled: Vec<String> = self
            .ctx
            .config
            .enabled_integrations()
            .map(str::to_string)
            .collect();
        if enabled.is_empty() {
            info!("no integrations enabled; nothing to generate");
        }

        for ide in enabled {
            report
                .integrations
                .push(self.generate_integration(&ide, &instructions));
        }

        Ok(report)
    }

    fn generate_integration(&self, ide: &str, instructions: &[Instruction]) -> IntegrationReport {
        let output_dir = self.output_dir(ide);
        let mut report = IntegrationReport {
            ide: ide.to_string(),
            output_dir: output_dir.clone(),
            template: self.template_name(ide),
            written: Vec::new(),
            failures: Vec::new(),
        };

        if let Err(e) = fs::create_dir_all(&output_dir) {
            error!(ide = %ide, path = %output_dir.display(), error = %e, "failed to create output directory");
            report.failures.push(GenerationFailure {
                path: output_dir.clone(),
                error: format!("failed to create output directory: {}", e),
            });
            return report;
        }

        let template = match self.load_template(ide) {
            Ok(template) => template,
            Err(e) => {
                error!(ide = %ide, error = %e, "skipping integration");
                report.failures.push(GenerationFailure {
                    path: self.ctx.templates_dir().join(&report.template),
                    error: e.to_string(),
                });
                return report;
            }
        };

        for instruction in instructions {
            let command = self.render(instruction, &template, &output_dir);
            match atomic_write_file(&command.output_path, &command.content) {
                Ok(()) => {
                    debug!(ide = %ide, path = %command.output_path.display(), "wrote command");
                    report.written.push(command.output_path);
                }
                Err(e) => {
                    error!(ide = %ide, instruction = %instruction.path.display(), error = %e, "failed to write command");
                    report.failures.push(GenerationFailure {
                        path: instruction.path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            ide = %ide,
            written = report.written.len(),
            output = %output_dir.display(),
            "generated commands"
        );
        report
    }

    fn render(&self, instruction: &Instruction, template: &str, output_dir: &Path) -> GeneratedCommand {
        let variables = TemplateVariables::generate(instruction, self.ctx);
        GeneratedCommand {
            command_name: instruction.command_name.clone(),
            source: instruction.path.clone(),
            output_path: output_dir.join(format!("{}.md", instruction.command_name)),
            content: apply_template(template, &variables),
            metadata: instruction.metadata.clone(),
            variables,
        }
    }
}

/// Build a GlobSet from instruction glob patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ConduitError::UserError(format!("invalid instruction glob '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }

    builder
        .build()
        .map_err(|e| ConduitError::UserError(format!("failed to compile instruction globs: {}", e)))
}

/// `path` relative to `root`, joined with `/`.
fn relative_slash_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
