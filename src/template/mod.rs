//! IDE command template variables and substitution.
//!
//! Every generated command file is an IDE template with `${name}`
//! placeholders filled from a fixed variable schema ([`TemplateVar`]). The
//! values come from the instruction's metadata, falling back to defaults
//! derived from its path and the project configuration.

mod render;

pub use render::{apply_template, unresolved_placeholders};

use crate::context::ProjectContext;
use crate::instruction::{Instruction, InstructionMetadata, command_name};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::path::Path;

/// Model used when the instruction does not name one.
pub const DEFAULT_MODEL: &str = "opus";

/// Color used when the instruction does not name one.
pub const DEFAULT_COLOR: &str = "blue";

/// Agent type used when the instruction does not name one.
pub const DEFAULT_AGENT: &str = "general-purpose";

const DEFAULT_INTEGRATION_POINTS: &[&str] = &["HIL workflow gate", "Tracking ledger updates"];

const DEFAULT_CONTEXT_REQUIREMENTS: &[&str] =
    &["Project context from .conduit/", "Current HIL phase status"];

const DEFAULT_EXPECTED_OUTCOMES: &[&str] = &[
    "Successful workflow execution",
    "Updated project tracking",
    "HIL phase progression",
];

/// The template variable schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemplateVar {
    CommandName,
    CommandDescription,
    InstructionPath,
    SourceInstruction,
    Model,
    Color,
    AgentIntegration,
    IntegrationPoints,
    ContextRequirements,
    ExpectedOutcomes,
    Trigger,
    ProjectType,
    Dependencies,
}

impl TemplateVar {
    /// Every variable, in schema order.
    pub const ALL: [TemplateVar; 13] = [
        TemplateVar::CommandName,
        TemplateVar::CommandDescription,
        TemplateVar::InstructionPath,
        TemplateVar::SourceInstruction,
        TemplateVar::Model,
        TemplateVar::Color,
        TemplateVar::AgentIntegration,
        TemplateVar::IntegrationPoints,
        TemplateVar::ContextRequirements,
        TemplateVar::ExpectedOutcomes,
        TemplateVar::Trigger,
        TemplateVar::ProjectType,
        TemplateVar::Dependencies,
    ];

    /// Placeholder name as written in templates.
    pub fn name(self) -> &'static str {
        match self {
            TemplateVar::CommandName => "command_name",
            TemplateVar::CommandDescription => "command_description",
            TemplateVar::InstructionPath => "instruction_path",
            TemplateVar::SourceInstruction => "source_instruction",
            TemplateVar::Model => "model",
            TemplateVar::Color => "color",
            TemplateVar::AgentIntegration => "agent_integration",
            TemplateVar::IntegrationPoints => "integration_points",
            TemplateVar::ContextRequirements => "context_requirements",
            TemplateVar::ExpectedOutcomes => "expected_outcomes",
            TemplateVar::Trigger => "trigger",
            TemplateVar::ProjectType => "project_type",
            TemplateVar::Dependencies => "dependencies",
        }
    }

    /// Look up a variable by placeholder name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|var| var.name() == name)
    }
}

/// Values for the template variable schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVariables {
    values: BTreeMap<TemplateVar, String>,
}

impl TemplateVariables {
    /// Build the full variable set for an instruction.
    pub fn generate(instruction: &Instruction, ctx: &ProjectContext) -> Self {
        Self::from_parts(
            &instruction.metadata,
            &instruction.path,
            &ctx.relative_to_root(&instruction.path),
            ctx.config.project_type_name(),
        )
    }

    /// Build the variable set from its inputs.
    ///
    /// # Arguments
    ///
    /// * `metadata` - Front matter of the instruction
    /// * `path` - Instruction path (its stem is the command name)
    /// * `relative_path` - Instruction path relative to the project root
    /// * `project_type` - Display name of the project type
    pub fn from_parts(
        metadata: &InstructionMetadata,
        path: &Path,
        relative_path: &str,
        project_type: &str,
    ) -> Self {
        let stem = command_name(path);
        let mut vars = Self::default();

        vars.set(
            TemplateVar::CommandName,
            metadata.name.clone().unwrap_or_else(|| stem.clone()),
        );
        vars.set(
            TemplateVar::CommandDescription,
            metadata
                .description
                .clone()
                .unwrap_or_else(|| format!("Execute {} workflow", stem)),
        );
        vars.set(TemplateVar::InstructionPath, relative_path);
        vars.set(TemplateVar::SourceInstruction, relative_path);
        vars.set(
            TemplateVar::Model,
            metadata.model.as_deref().unwrap_or(DEFAULT_MODEL),
        );
        vars.set(
            TemplateVar::Color,
            metadata.color.as_deref().unwrap_or(DEFAULT_COLOR),
        );
        vars.set(
            TemplateVar::AgentIntegration,
            metadata.agent.as_deref().unwrap_or(DEFAULT_AGENT),
        );
        vars.set(
            TemplateVar::IntegrationPoints,
            bullet_list(metadata.integrations.as_deref(), DEFAULT_INTEGRATION_POINTS),
        );
        vars.set(
            TemplateVar::ContextRequirements,
            bullet_list(metadata.context.as_deref(), DEFAULT_CONTEXT_REQUIREMENTS),
        );
        vars.set(
            TemplateVar::ExpectedOutcomes,
            bullet_list(metadata.outcomes.as_deref(), DEFAULT_EXPECTED_OUTCOMES),
        );
        vars.set(
            TemplateVar::Trigger,
            metadata
                .trigger
                .clone()
                .unwrap_or_else(|| format!("@{}", stem)),
        );
        vars.set(TemplateVar::ProjectType, project_type);
        vars.set(
            TemplateVar::Dependencies,
            match metadata.dependencies.as_deref() {
                Some(deps) if !deps.is_empty() => deps.join(", "),
                _ => "None".to_string(),
            },
        );

        vars
    }

    /// Set a variable's value.
    pub fn set(&mut self, var: TemplateVar, value: impl Into<String>) {
        self.values.insert(var, value.into());
    }

    /// Value of a variable.
    pub fn get(&self, var: TemplateVar) -> Option<&str> {
        self.values.get(&var).map(String::as_str)
    }

    /// Value of a variable by placeholder name.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        TemplateVar::from_name(name).and_then(|var| self.get(var))
    }
}

impl Serialize for TemplateVariables {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (var, value) in &self.values {
            map.serialize_entry(var.name(), value)?;
        }
        map.end()
    }
}

/// Render items as `- item` lines, or the defaults when absent or empty.
fn bullet_list(items: Option<&[String]>, defaults: &[&str]) -> String {
    match items {
        Some(items) if !items.is_empty() => items
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => defaults
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
