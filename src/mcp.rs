//! MCP server installation from a JSON manifest.
//!
//! The manifest uses the common `mcpServers` layout:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "filesystem": { "command": "npx", "args": ["-y", "@mcp/fs"] },
//!     "docs": { "type": "http", "url": "https://example.com/mcp" }
//!   }
//! }
//! ```
//!
//! Each server is registered through the IDE agent's CLI
//! (`<cli> mcp add-json --scope <scope> <name> <json>`). Existing servers
//! are skipped unless `replace` is set, in which case they are removed
//! first. A failure for one server is recorded and the batch continues.

use crate::error::{ConduitError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// Manifest path used when `--from` is not given, relative to the working directory.
pub const DEFAULT_MANIFEST: &str = ".claude/mcp.json";

/// CLI used to register servers when `--cli` is not given.
pub const DEFAULT_CLI: &str = "claude";

/// Parsed MCP manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct McpManifest {
    servers: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(rename = "mcpServers")]
    mcp_servers: Option<Value>,
}

impl McpManifest {
    /// Load a manifest file.
    ///
    /// # Errors
    ///
    /// * `ConduitError::LoadError` - unreadable file, invalid JSON, or no
    ///   `mcpServers` object
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConduitError::LoadError(format!(
                "failed to read MCP manifest '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&content).map_err(|e| match e {
            ConduitError::LoadError(msg) => {
                ConduitError::LoadError(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawManifest = serde_json::from_str(json)
            .map_err(|e| ConduitError::LoadError(format!("invalid MCP manifest JSON: {}", e)))?;

        match raw.mcp_servers {
            Some(Value::Object(map)) => Ok(Self {
                servers: map.into_iter().collect(),
            }),
            _ => Err(ConduitError::LoadError(
                "MCP manifest must be an object with a mcpServers map".to_string(),
            )),
        }
    }

    /// Servers by name, sorted.
    pub fn servers(&self) -> &BTreeMap<String, Value> {
        &self.servers
    }

    /// Whether the manifest declares no servers.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

/// Where the agent CLI stores a registered server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallScope {
    #[default]
    Project,
    User,
    Local,
}

impl InstallScope {
    /// Name passed to `--scope`.
    pub fn as_str(self) -> &'static str {
        match self {
            InstallScope::Project => "project",
            InstallScope::User => "user",
            InstallScope::Local => "local",
        }
    }
}

/// Options for an install run.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    pub scope: InstallScope,

    /// Remove and re-add servers that already exist.
    pub replace: bool,
}

/// Spawns external processes.
pub trait ProcessRunner {
    /// Run `program` with `args` and wait for it.
    ///
    /// Returns the exit code (`None` if terminated by a signal). With
    /// `quiet`, the child's output is discarded instead of inherited.
    ///
    /// # Errors
    ///
    /// * `ConduitError::ProcessError` - the process could not be started
    fn run(&mut self, program: &str, args: &[String], quiet: bool) -> Result<Option<i32>>;
}

/// Runs processes with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&mut self, program: &str, args: &[String], quiet: bool) -> Result<Option<i32>> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());
        if quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = command.status().map_err(|e| {
            ConduitError::ProcessError(format!("failed to start '{}': {}", program, e))
        })?;
        Ok(status.code())
    }
}

/// A server that could not be installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallFailure {
    pub name: String,
    pub error: String,
}

/// Results of an install run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Servers added (including re-added ones).
    pub added: Vec<String>,

    /// Servers removed before being re-added.
    pub replaced: Vec<String>,

    /// Servers left alone because they already existed.
    pub skipped: Vec<String>,

    pub failures: Vec<InstallFailure>,
}

impl InstallReport {
    /// Whether every server was handled without error.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registers manifest servers through an agent CLI.
pub struct Installer<R> {
    runner: R,
    program: String,
    base_args: Vec<String>,
}

impl<R: ProcessRunner> Installer<R> {
    /// Create an installer for a CLI command line such as `claude` or
    /// `npx @anthropic-ai/claude-code`.
    ///
    /// # Errors
    ///
    /// * `ConduitError::UserError` - the command line is empty or unparseable
    pub fn new(cli: &str, runner: R) -> Result<Self> {
        let mut words = shell_words::split(cli).map_err(|e| {
            ConduitError::UserError(format!(
                "failed to parse CLI command '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                cli, e
            ))
        })?;
        if words.is_empty() {
            return Err(ConduitError::UserError(
                "CLI command is empty".to_string(),
            ));
        }
        let program = words.remove(0);

        Ok(Self {
            runner,
            program,
            base_args: words,
        })
    }

    /// Install every server in `manifest`, in name order.
    pub fn install(&mut self, manifest: &McpManifest, options: InstallOptions) -> InstallReport {
        let mut report = InstallReport::default();
        if manifest.is_empty() {
            info!("no servers found in mcpServers; nothing to install");
            return report;
        }

        for (name, config) in manifest.servers() {
            info!(server = %name, "installing MCP server");
            match self.install_one(name, config, options, &mut report) {
                Ok(()) => {}
                Err(error) => {
                    warn!(server = %name, error = %error, "failed to add MCP server");
                    report.failures.push(InstallFailure {
                        name: name.clone(),
                        error,
                    });
                }
            }
        }

        report
    }

    fn install_one(
        &mut self,
        name: &str,
        config: &Value,
        options: InstallOptions,
        report: &mut InstallReport,
    ) -> std::result::Result<(), String> {
        if self.exists(name) {
            if !options.replace {
                info!(server = %name, "already exists; use --replace to overwrite");
                report.skipped.push(name.to_string());
                return Ok(());
            }
            self.invoke(&["mcp", "remove", name])?;
            report.replaced.push(name.to_string());
        }

        let json = serde_json::to_string(config).map_err(|e| e.to_string())?;
        self.invoke(&[
            "mcp",
            "add-json",
            "--scope",
            options.scope.as_str(),
            name,
            &json,
        ])?;
        report.added.push(name.to_string());
        Ok(())
    }

    fn args(&self, extra: &[&str]) -> Vec<String> {
        self.base_args
            .iter()
            .cloned()
            .chain(extra.iter().map(|s| s.to_string()))
            .collect()
    }

    /// `<cli> mcp get <name>` exiting 0 means the server exists.
    fn exists(&mut self, name: &str) -> bool {
        let args = self.args(&["mcp", "get", name]);
        matches!(self.runner.run(&self.program, &args, true), Ok(Some(0)))
    }

    fn invoke(&mut self, extra: &[&str]) -> std::result::Result<(), String> {
        let args = self.args(extra);
        let described = format!("{} {}", self.program, shell_words::join(&args));
        match self.runner.run(&self.program, &args, false) {
            Ok(Some(0)) => Ok(()),
            Ok(Some(code)) => Err(format!("{} exited with code {}", described, code)),
            Ok(None) => Err(format!("{} was terminated by a signal", described)),
            Err(e) => Err(e.to_string()),
        }
    }
}
