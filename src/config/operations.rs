//! Config loading, validation, and lookup helpers.

use super::model::Config;
use super::types::{DEFAULT_INSTRUCTIONS_DIR, DEFAULT_PROJECT_TYPE};
use crate::error::{ConduitError, Result};
use globset::Glob;
use std::collections::HashSet;
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Both an unreadable file and invalid YAML are load errors, which are
    /// fatal for every command. Well-formed YAML with invalid values is a
    /// validation error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConduitError::LoadError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content).map_err(|e| match e {
            ConduitError::LoadError(msg) => {
                ConduitError::LoadError(format!("{} ({})", msg, path.display()))
            }
            ConduitError::ValidationError(msg) => {
                ConduitError::ValidationError(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Parse config from a YAML string.
    ///
    /// An empty document yields the default configuration.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| ConduitError::LoadError(format!("failed to parse config YAML: {}", e)))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - phase names must be non-empty and unique
    /// - when phases are configured, `default_phase` must be one of them
    /// - `instruction_globs` must be non-empty and every glob must compile
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for phase in self.hil_workflow.phases.as_slice() {
            if phase.trim().is_empty() {
                return Err(ConduitError::ValidationError(
                    "hil_workflow.phases entries must be non-empty".to_string(),
                ));
            }
            if !seen.insert(phase.as_str()) {
                return Err(ConduitError::ValidationError(format!(
                    "duplicate phase '{}' in hil_workflow.phases",
                    phase
                )));
            }
        }

        if !self.hil_workflow.phases.is_empty() && !seen.contains(self.hil_workflow.default_phase.as_str())
        {
            return Err(ConduitError::ValidationError(format!(
                "hil_workflow.default_phase '{}' is not listed in hil_workflow.phases",
                self.hil_workflow.default_phase
            )));
        }

        let globs = &self.command_generation.instruction_globs;
        if globs.is_empty() {
            return Err(ConduitError::ValidationError(
                "command_generation.instruction_globs must not be empty".to_string(),
            ));
        }
        for pattern in globs {
            Glob::new(pattern).map_err(|e| {
                ConduitError::ValidationError(format!("invalid instruction glob '{}': {}", pattern, e))
            })?;
        }

        Ok(())
    }

    /// Instructions directory of the default project type, relative to the project root.
    pub fn instructions_dir(&self) -> &str {
        self.project_types
            .get(DEFAULT_PROJECT_TYPE)
            .and_then(|p| p.instructions.as_deref())
            .unwrap_or(DEFAULT_INSTRUCTIONS_DIR)
    }

    /// Display name of the default project type.
    pub fn project_type_name(&self) -> &str {
        self.project_types
            .get(DEFAULT_PROJECT_TYPE)
            .and_then(|p| p.name.as_deref())
            .unwrap_or(DEFAULT_PROJECT_TYPE)
    }

    /// Names of integrations marked `enabled: true`, in key order.
    pub fn enabled_integrations(&self) -> impl Iterator<Item = &str> {
        self.integrations
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .map(|(name, _)| name.as_str())
    }
}
