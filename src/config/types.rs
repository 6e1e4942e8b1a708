//! Configuration section types and defaults for conduit.
//!
//! This module defines the per-section structs, the approval level type,
//! and the default value functions used by the Config struct.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Default instructions directory relative to the project root.
pub const DEFAULT_INSTRUCTIONS_DIR: &str = ".conduit/instructions";

/// Default tracking ledger path relative to the project root.
pub const DEFAULT_MASTER_TRACKING: &str = ".conduit/MASTER_TRACKING.md";

/// Default HIL phase when the ledger has no annotation for a feature.
pub const DEFAULT_PHASE: &str = "development";

/// Key of the project type whose settings drive generation and execution.
pub const DEFAULT_PROJECT_TYPE: &str = "default";

/// Sensitivity tier governing whether automatic execution is permitted.
///
/// Known tiers are typed; any other configured value is kept verbatim
/// (upper-cased) so custom tiers still round-trip through reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ApprovalLevel {
    /// No approval needed; the command may run automatically.
    None,
    /// The operator must confirm before running.
    #[default]
    Confirm,
    /// A reviewer must look at the change first.
    Review,
    /// Explicit sign-off is required.
    Required,
    /// Any other configured tier.
    Custom(String),
}

impl ApprovalLevel {
    /// Parse an approval level, case-insensitively.
    pub fn parse(s: &str) -> Self {
        let upper = s.trim().to_uppercase();
        match upper.as_str() {
            "NONE" => Self::None,
            "CONFIRM" => Self::Confirm,
            "REVIEW" => Self::Review,
            "REQUIRED" => Self::Required,
            _ => Self::Custom(upper),
        }
    }

    /// The canonical upper-case name of this level.
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "NONE",
            Self::Confirm => "CONFIRM",
            Self::Review => "REVIEW",
            Self::Required => "REQUIRED",
            Self::Custom(s) => s,
        }
    }

    /// Whether this level blocks automatic execution.
    pub fn requires_approval(&self) -> bool {
        *self != Self::None
    }
}

impl fmt::Display for ApprovalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ApprovalLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApprovalLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// `framework` section: metadata about the installed framework.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Framework version string reported by `status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One entry of the `project_types` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectTypeConfig {
    /// Instructions directory relative to the project root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Display name substituted for `${project_type}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One entry of the `integrations` section (keyed by IDE).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// Integrations without `enabled: true` are skipped entirely.
    pub enabled: bool,

    /// Output directory for generated commands, relative to the project root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands_directory: Option<String>,

    /// Template file name under `<config dir>/commands/templates/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Legacy per-IDE template mapping under `command_generation.mappings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateMapping {
    /// Template file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// `command_generation` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandGenerationConfig {
    /// Legacy template mappings keyed by IDE.
    pub mappings: BTreeMap<String, TemplateMapping>,

    /// Globs (relative to the instructions directory) selecting instruction files.
    #[serde(default = "default_instruction_globs")]
    pub instruction_globs: Vec<String>,
}

impl Default for CommandGenerationConfig {
    fn default() -> Self {
        Self {
            mappings: BTreeMap::new(),
            instruction_globs: default_instruction_globs(),
        }
    }
}

/// Ordered list of HIL phases.
///
/// Accepts either a YAML sequence or a mapping; for a mapping the values
/// are taken in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseList(pub Vec<String>);

impl PhaseList {
    /// The phases in order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Whether no phases are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for PhaseList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PhaseList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<String>),
            Map(serde_yaml::Mapping),
        }

        match Raw::deserialize(deserializer)? {
            Raw::List(phases) => Ok(Self(phases)),
            Raw::Map(mapping) => {
                let mut phases = Vec::with_capacity(mapping.len());
                for (_, value) in mapping {
                    match value {
                        serde_yaml::Value::String(s) => phases.push(s),
                        other => {
                            return Err(serde::de::Error::custom(format!(
                                "hil_workflow.phases values must be strings, found {:?}",
                                other
                            )));
                        }
                    }
                }
                Ok(Self(phases))
            }
        }
    }
}

/// Per-command settings under `hil_workflow.commands`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HilCommandConfig {
    /// Phase this command belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// `hil_workflow` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HilWorkflowConfig {
    /// Reported by `status`; the gate itself always applies.
    pub enabled: bool,

    /// Ordered lifecycle phases.
    pub phases: PhaseList,

    /// Phase assumed when the ledger has no annotation for a feature.
    #[serde(default = "default_phase")]
    pub default_phase: String,

    /// Per-command HIL settings.
    pub commands: BTreeMap<String, HilCommandConfig>,
}

impl Default for HilWorkflowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            phases: PhaseList::default(),
            default_phase: default_phase(),
            commands: BTreeMap::new(),
        }
    }
}

/// Per-command overrides under `operation_overrides`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationOverride {
    /// Minimum approval level for the command (highest priority).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_approval_level: Option<ApprovalLevel>,

    /// Project-relative paths that must exist before the command may run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

/// Per-environment overrides under `environment_overrides`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentOverride {
    /// Approval level applied to every command in this environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_level: Option<ApprovalLevel>,
}

/// `user_preferences` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Global default approval level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_approval_level: Option<ApprovalLevel>,
}

/// `feature_tracking` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureTrackingConfig {
    /// Tracking ledger path relative to the project root.
    #[serde(default = "default_master_tracking")]
    pub master_tracking: String,
}

impl Default for FeatureTrackingConfig {
    fn default() -> Self {
        Self {
            master_tracking: default_master_tracking(),
        }
    }
}

// Default value functions for serde
pub(crate) fn default_instruction_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}
pub(crate) fn default_phase() -> String {
    DEFAULT_PHASE.to_string()
}
pub(crate) fn default_master_tracking() -> String {
    DEFAULT_MASTER_TRACKING.to_string()
}
