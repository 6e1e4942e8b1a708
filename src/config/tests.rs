//! Tests for config functionality.

use crate::config::types::{DEFAULT_INSTRUCTIONS_DIR, DEFAULT_MASTER_TRACKING};
use crate::config::{ApprovalLevel, Config};
use crate::error::ConduitError;
use crate::exit_codes;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert!(config.integrations.is_empty());
    assert!(!config.hil_workflow.enabled);
    assert!(config.hil_workflow.phases.is_empty());
    assert_eq!(config.hil_workflow.default_phase, "development");
    assert_eq!(config.feature_tracking.master_tracking, DEFAULT_MASTER_TRACKING);
    assert_eq!(config.command_generation.instruction_globs, vec!["**/*.md"]);
    assert_eq!(config.instructions_dir(), DEFAULT_INSTRUCTIONS_DIR);
    assert_eq!(config.project_type_name(), "default");
}

#[test]
fn test_parse_empty_yaml() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config.hil_workflow.default_phase, "development");
    assert!(config.user_preferences.default_approval_level.is_none());
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
framework:
  version: "2.1.0"
project_types:
  default:
    instructions: docs/instructions
    name: web-app
integrations:
  claude_code:
    enabled: true
    commands_directory: .claude/commands
  cursor:
    enabled: false
    template: cursor_custom.md
hil_workflow:
  enabled: true
  phases: [planning, development, review, release]
  commands:
    deploy:
      phase: release
operation_overrides:
  deploy:
    minimum_approval_level: required
    requires: [vercel.json]
environment_overrides:
  production:
    approval_level: CONFIRM
user_preferences:
  default_approval_level: NONE
feature_tracking:
  master_tracking: docs/TRACKING.md
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.framework.version.as_deref(), Some("2.1.0"));
    assert_eq!(config.instructions_dir(), "docs/instructions");
    assert_eq!(config.project_type_name(), "web-app");
    assert!(config.integrations["claude_code"].enabled);
    assert!(!config.integrations["cursor"].enabled);
    assert_eq!(
        config.integrations["cursor"].template.as_deref(),
        Some("cursor_custom.md")
    );
    assert!(config.hil_workflow.enabled);
    assert_eq!(
        config.hil_workflow.phases.as_slice(),
        ["planning", "development", "review", "release"]
    );
    assert_eq!(
        config.hil_workflow.commands["deploy"].phase.as_deref(),
        Some("release")
    );
    assert_eq!(
        config.operation_overrides["deploy"].minimum_approval_level,
        Some(ApprovalLevel::Required)
    );
    assert_eq!(config.operation_overrides["deploy"].requires, vec!["vercel.json"]);
    assert_eq!(
        config.environment_overrides["production"].approval_level,
        Some(ApprovalLevel::Confirm)
    );
    assert_eq!(
        config.user_preferences.default_approval_level,
        Some(ApprovalLevel::None)
    );
    assert_eq!(config.feature_tracking.master_tracking, "docs/TRACKING.md");
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
some_future_section:
  flag: true
integrations:
  claude_code:
    enabled: true
    extra_setting: 42
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert!(config.integrations["claude_code"].enabled);
}

#[test]
fn test_phases_as_mapping_keep_document_order() {
    let yaml = r#"
hil_workflow:
  phases:
    first: ideation
    second: development
    third: qa
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(
        config.hil_workflow.phases.as_slice(),
        ["ideation", "development", "qa"]
    );
}

#[test]
fn test_phases_mapping_with_non_string_value_is_rejected() {
    let yaml = r#"
hil_workflow:
  phases:
    first: [a, b]
"#;
    assert!(matches!(
        Config::from_yaml(yaml),
        Err(ConduitError::LoadError(_))
    ));
}

#[test]
fn test_enabled_integrations_skips_missing_flag() {
    let yaml = r#"
integrations:
  claude_code:
    enabled: true
  cursor:
    commands_directory: .cursor/commands
  windsurf:
    enabled: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    let enabled: Vec<&str> = config.enabled_integrations().collect();
    assert_eq!(enabled, vec!["claude_code", "windsurf"]);
}

#[test]
fn test_approval_level_parsing_is_case_insensitive() {
    assert_eq!(ApprovalLevel::parse("none"), ApprovalLevel::None);
    assert_eq!(ApprovalLevel::parse("Confirm"), ApprovalLevel::Confirm);
    assert_eq!(ApprovalLevel::parse(" review "), ApprovalLevel::Review);
    assert_eq!(ApprovalLevel::parse("REQUIRED"), ApprovalLevel::Required);
    assert_eq!(
        ApprovalLevel::parse("team-lead"),
        ApprovalLevel::Custom("TEAM-LEAD".to_string())
    );
}

#[test]
fn test_approval_level_requires_approval() {
    assert!(!ApprovalLevel::None.requires_approval());
    assert!(ApprovalLevel::Confirm.requires_approval());
    assert!(ApprovalLevel::Custom("LEAD".to_string()).requires_approval());
    assert_eq!(ApprovalLevel::default(), ApprovalLevel::Confirm);
}

#[test]
fn test_approval_level_display() {
    assert_eq!(ApprovalLevel::Confirm.to_string(), "CONFIRM");
    assert_eq!(ApprovalLevel::Custom("LEAD".to_string()).to_string(), "LEAD");
}

#[test]
fn test_validate_rejects_duplicate_phases() {
    let yaml = r#"
hil_workflow:
  phases: [development, review, development]
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, ConduitError::ValidationError(_)));
    assert_eq!(err.exit_code(), exit_codes::WORKFLOW_FAILURE);
    assert!(err.to_string().contains("duplicate phase 'development'"));
}

#[test]
fn test_validate_rejects_empty_phase() {
    let yaml = r#"
hil_workflow:
  phases: [development, ""]
"#;
    assert!(matches!(
        Config::from_yaml(yaml),
        Err(ConduitError::ValidationError(_))
    ));
}

#[test]
fn test_validate_default_phase_must_be_listed() {
    let yaml = r#"
hil_workflow:
  phases: [planning, review]
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("default_phase 'development'"));

    let yaml = r#"
hil_workflow:
  phases: [planning, review]
  default_phase: planning
"#;
    assert!(Config::from_yaml(yaml).is_ok());
}

#[test]
fn test_validate_instruction_globs() {
    let yaml = r#"
command_generation:
  instruction_globs: []
"#;
    assert!(Config::from_yaml(yaml).is_err());

    let yaml = r#"
command_generation:
  instruction_globs: ["core/[unclosed"]
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("invalid instruction glob"));
}

#[test]
fn test_invalid_yaml_is_load_error() {
    let result = Config::from_yaml("integrations: [not: a: map");
    assert!(matches!(result, Err(ConduitError::LoadError(_))));
}

#[test]
fn test_load_missing_file_is_load_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = Config::load(temp_dir.path().join("config.yml"));
    match result {
        Err(ConduitError::LoadError(msg)) => assert!(msg.contains("failed to read config file")),
        other => panic!("expected LoadError, got {:?}", other),
    }
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yml");
    std::fs::write(&path, "framework:\n  version: \"1.0\"\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.framework.version.as_deref(), Some("1.0"));
}

#[test]
fn test_load_invalid_values_is_validation_error_with_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yml");
    std::fs::write(&path, "command_generation:\n  instruction_globs: []\n").unwrap();

    match Config::load(&path) {
        Err(ConduitError::ValidationError(msg)) => {
            assert!(msg.contains("instruction_globs"));
            assert!(msg.contains("config.yml"));
        }
        other => panic!("expected ValidationError, got {:?}", other),
    }
}
