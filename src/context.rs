//! Project context resolution for conduit.
//!
//! This module finds the conduit configuration (`.conduit/config.yml`) from
//! any working directory, resolves the project root by walking up from the
//! config directory until a marker file is found, and loads the configuration
//! and tracking ledger once.
//!
//! The resulting [`ProjectContext`] is immutable and is passed explicitly to
//! every operation.

use crate::config::Config;
use crate::error::{ConduitError, Result};
use crate::ledger::Ledger;
use std::env;
use std::path::{Path, PathBuf};

/// Directory holding conduit configuration, relative to the project root.
pub const CONFIG_DIR_NAME: &str = ".conduit";

/// Configuration file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Files or directories whose presence marks a project root, in priority order.
pub const ROOT_MARKERS: &[&str] = &[".git", "package.json", "Cargo.toml"];

/// Environment variable naming the active environment for approval overrides.
pub const ENVIRONMENT_VAR: &str = "CONDUIT_ENV";

/// Environment assumed when neither `--env` nor [`ENVIRONMENT_VAR`] is set.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Resolved paths, configuration and ledger for one process invocation.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Absolute path to the config file.
    pub config_path: PathBuf,

    /// Directory containing the config file (templates live below it).
    pub config_dir: PathBuf,

    /// Project root used to resolve every relative configured path.
    pub project_root: PathBuf,

    /// Marker that identified the project root, if any was found.
    pub root_marker: Option<String>,

    /// Environment name used for `environment_overrides`.
    pub environment: String,

    /// Parsed configuration.
    pub config: Config,

    /// Tracking ledger as read at startup.
    pub ledger: Ledger,
}

impl ProjectContext {
    /// Resolve the context from the current working directory.
    ///
    /// # Arguments
    ///
    /// * `config_override` - Explicit config path (`--config`)
    /// * `environment` - Explicit environment name (`--env`)
    pub fn resolve(config_override: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            ConduitError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        let config_path = match config_override {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => cwd.join(path),
            None => find_config(&cwd).ok_or_else(|| {
                ConduitError::LoadError(format!(
                    "no {}/{} found in '{}' or any parent directory.\n\
                     Create one, or pass --config <path>.",
                    CONFIG_DIR_NAME,
                    CONFIG_FILE_NAME,
                    cwd.display()
                ))
            })?,
        };

        Self::load(config_path, environment)
    }

    /// Load the context for a known config file path.
    ///
    /// Config and ledger load failures are fatal [`ConduitError::LoadError`]s;
    /// invalid config values are [`ConduitError::ValidationError`]s.
    pub fn load<P: AsRef<Path>>(config_path: P, environment: Option<&str>) -> Result<Self> {
        let config_path = config_path.as_ref().to_path_buf();
        let config = Config::load(&config_path)?;

        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let (project_root, root_marker) = find_project_root(&config_dir);

        let environment = environment
            .map(str::to_string)
            .or_else(|| env::var(ENVIRONMENT_VAR).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let ledger = Ledger::load(project_root.join(&config.feature_tracking.master_tracking))?;

        Ok(Self {
            config_path,
            config_dir,
            project_root,
            root_marker,
            environment,
            config,
            ledger,
        })
    }

    /// Whether the project root was identified by a marker file.
    pub fn is_valid_project(&self) -> bool {
        self.root_marker.is_some()
    }

    /// Absolute path to the instructions directory.
    pub fn instructions_dir(&self) -> PathBuf {
        self.project_root.join(self.config.instructions_dir())
    }

    /// Directory holding the executable command instructions.
    pub fn core_instructions_dir(&self) -> PathBuf {
        self.instructions_dir().join("core")
    }

    /// Path to the instruction for a named command.
    pub fn command_instruction_path(&self, command: &str) -> PathBuf {
        self.core_instructions_dir().join(format!("{}.md", command))
    }

    /// Directory holding IDE command templates.
    pub fn templates_dir(&self) -> PathBuf {
        self.config_dir.join("commands").join("templates")
    }

    /// Path to the tracking ledger.
    pub fn ledger_path(&self) -> &Path {
        self.ledger.path()
    }

    /// Express `path` relative to the project root, using `/` separators.
    ///
    /// Paths outside the project root are returned unchanged.
    pub fn relative_to_root(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.project_root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Walk up from `start` looking for `.conduit/config.yml`.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Walk up from `config_dir` until a directory containing a root marker is found.
///
/// Falls back to the directory containing the config directory when no
/// marker exists anywhere above it.
pub fn find_project_root(config_dir: &Path) -> (PathBuf, Option<String>) {
    for dir in config_dir.ancestors() {
        for marker in ROOT_MARKERS {
            if dir.join(marker).exists() {
                return (dir.to_path_buf(), Some((*marker).to_string()));
            }
        }
    }

    let fallback = config_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config_dir.to_path_buf());
    (fallback, None)
}
