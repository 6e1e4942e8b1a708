//! Tracking ledger for conduit.
//!
//! The ledger is a shared, free-form markdown document describing project and
//! feature state (default `.conduit/MASTER_TRACKING.md`). conduit treats it as
//! opaque except for two operations:
//!
//! - searching for a feature's phase annotation (`phase: <value>` below a
//!   `<feature>:` line)
//! - appending an execution log entry after each command execution
//!
//! The ledger is read once at startup and only ever appended to; prior
//! content is never rewritten. Concurrent writers are not coordinated.
//!
//! # Entry Format
//!
//! ```text
//!
//! <!-- Command Execution Log -->
//! <!-- 2026-01-13T10:00:00+00:00: deploy executed via cursor by dev@host -->
//! <!-- Success: true, Steps: 3/3 -->
//! ```

use crate::error::{ConduitError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::RegexBuilder;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// The tracking ledger as loaded at process start.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    content: String,
}

/// One execution log entry appended to the ledger.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    /// When the command finished.
    pub timestamp: DateTime<Utc>,

    /// Command name.
    pub command: String,

    /// IDE (or `cli`) the command was issued from.
    pub source_ide: String,

    /// Who ran the command (`user@host`).
    pub actor: String,

    /// Whether the workflow succeeded.
    pub success: bool,

    /// Steps that completed successfully.
    pub completed_steps: usize,

    /// Total steps declared by the instruction.
    pub total_steps: usize,
}

impl LedgerEntry {
    /// Create an entry stamped with the current time and actor.
    pub fn new(
        command: impl Into<String>,
        source_ide: impl Into<String>,
        success: bool,
        completed_steps: usize,
        total_steps: usize,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            command: command.into(),
            source_ide: source_ide.into(),
            actor: get_actor_string(),
            success,
            completed_steps,
            total_steps,
        }
    }

    /// Render the entry as appended to the ledger.
    pub fn render(&self) -> String {
        format!(
            "\n<!-- Command Execution Log -->\n\
             <!-- {}: {} executed via {} by {} -->\n\
             <!-- Success: {}, Steps: {}/{} -->\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.command,
            self.source_ide,
            self.actor,
            self.success,
            self.completed_steps,
            self.total_steps
        )
    }
}

/// Get the actor string for ledger entries.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

impl Ledger {
    /// Load the ledger from disk.
    ///
    /// A missing file yields an empty ledger (it will be created on first
    /// append). A file that exists but cannot be read is a load error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(ConduitError::LoadError(format!(
                    "failed to read tracking ledger '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        Ok(Self { path, content })
    }

    /// Build a ledger from in-memory content.
    pub fn from_content(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Path of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content as read at startup.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Find the phase annotation for `feature`.
    ///
    /// Matches a `<feature>:` line (case-insensitive) followed, possibly
    /// several lines later, by the first `phase: <value>`.
    pub fn feature_phase(&self, feature: &str) -> Option<String> {
        if feature.is_empty() || self.content.is_empty() {
            return None;
        }

        let pattern = format!(
            r"{}:[ \t]*\r?\n(?:[^\n]*\n)*?\s*phase:[ \t]*([^\r\n]+)",
            regex::escape(feature)
        );
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .ok()?;

        re.captures(&self.content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|phase| !phase.is_empty())
    }

    /// Append an execution entry to the ledger file.
    ///
    /// The file (and its parent directory) is created if missing. Existing
    /// content is never touched.
    pub fn append_execution(&self, entry: &LedgerEntry) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                ConduitError::UserError(format!(
                    "failed to create ledger directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                ConduitError::UserError(format!(
                    "failed to open tracking ledger '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        file.write_all(entry.render().as_bytes()).map_err(|e| {
            ConduitError::UserError(format!(
                "failed to append to tracking ledger '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        file.sync_all().map_err(|e| {
            ConduitError::UserError(format!(
                "failed to sync tracking ledger '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TRACKING: &str = "\
# Master Tracking

## Features

user-auth:
  owner: alice
  status: active
  phase: review

payments:
  phase: development
";

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = Ledger::load(temp_dir.path().join("TRACKING.md")).unwrap();
        assert!(ledger.content().is_empty());
    }

    #[test]
    fn test_load_directory_is_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Ledger::load(temp_dir.path());
        assert!(matches!(result, Err(ConduitError::LoadError(_))));
    }

    #[test]
    fn test_feature_phase_found_across_lines() {
        let ledger = Ledger::from_content("TRACKING.md", TRACKING);
        assert_eq!(ledger.feature_phase("user-auth").as_deref(), Some("review"));
        assert_eq!(
            ledger.feature_phase("payments").as_deref(),
            Some("development")
        );
    }

    #[test]
    fn test_feature_phase_case_insensitive() {
        let ledger = Ledger::from_content("TRACKING.md", TRACKING);
        assert_eq!(ledger.feature_phase("USER-AUTH").as_deref(), Some("review"));
    }

    #[test]
    fn test_feature_phase_missing_feature() {
        let ledger = Ledger::from_content("TRACKING.md", TRACKING);
        assert_eq!(ledger.feature_phase("search"), None);
        assert_eq!(ledger.feature_phase(""), None);
    }

    #[test]
    fn test_feature_phase_escapes_regex_metacharacters() {
        let ledger = Ledger::from_content("TRACKING.md", "api(v2):\n  phase: qa\n");
        assert_eq!(ledger.feature_phase("api(v2)").as_deref(), Some("qa"));
        assert_eq!(ledger.feature_phase("api.v2."), None);
    }

    #[test]
    fn test_feature_phase_handles_crlf() {
        let ledger = Ledger::from_content("TRACKING.md", "search:\r\n  phase: planning\r\n");
        assert_eq!(ledger.feature_phase("search").as_deref(), Some("planning"));
    }

    #[test]
    fn test_entry_render_format() {
        let mut entry = LedgerEntry::new("deploy", "cursor", true, 2, 3);
        entry.actor = "dev@box".to_string();
        let rendered = entry.render();

        assert!(rendered.starts_with("\n<!-- Command Execution Log -->\n"));
        assert!(rendered.contains(": deploy executed via cursor by dev@box -->\n"));
        assert!(rendered.ends_with("<!-- Success: true, Steps: 2/3 -->\n"));
    }

    #[test]
    fn test_append_preserves_existing_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("TRACKING.md");
        fs::write(&path, TRACKING).unwrap();

        let ledger = Ledger::load(&path).unwrap();
        ledger
            .append_execution(&LedgerEntry::new("deploy", "cli", true, 1, 1))
            .unwrap();
        ledger
            .append_execution(&LedgerEntry::new("review", "cli", false, 0, 2))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(TRACKING));
        assert_eq!(content.matches("<!-- Command Execution Log -->").count(), 2);
        assert!(content.contains("<!-- Success: false, Steps: 0/2 -->"));
    }

    #[test]
    fn test_append_creates_file_and_parent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("TRACKING.md");

        let ledger = Ledger::load(&path).unwrap();
        ledger
            .append_execution(&LedgerEntry::new("deploy", "cli", true, 1, 1))
            .unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_actor_string_has_host() {
        let actor = get_actor_string();
        assert!(actor.contains('@'));
    }
}
