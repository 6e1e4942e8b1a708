//! Config struct definition.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for conduit.
///
/// This struct represents the contents of `.conduit/config.yml`.
/// Unknown fields in the YAML are ignored for forward compatibility, and
/// every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Framework metadata.
    pub framework: FrameworkConfig,

    // =========================================================================
    // Generation settings
    // =========================================================================
    /// Project types keyed by name; `default` drives generation and execution.
    pub project_types: BTreeMap<String, ProjectTypeConfig>,

    /// IDE integrations keyed by IDE name (e.g. `claude_code`, `cursor`).
    pub integrations: BTreeMap<String, IntegrationConfig>,

    /// Template mappings and instruction selection.
    pub command_generation: CommandGenerationConfig,

    // =========================================================================
    // HIL settings
    // =========================================================================
    /// Phase list and per-command phases.
    pub hil_workflow: HilWorkflowConfig,

    /// Per-command approval overrides and prerequisites.
    pub operation_overrides: BTreeMap<String, OperationOverride>,

    /// Per-environment approval overrides.
    pub environment_overrides: BTreeMap<String, EnvironmentOverride>,

    /// Global preferences.
    pub user_preferences: UserPreferences,

    // =========================================================================
    // Tracking settings
    // =========================================================================
    /// Tracking ledger location.
    pub feature_tracking: FeatureTrackingConfig,
}
