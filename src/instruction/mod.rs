//! Instruction documents.
//!
//! An instruction is a markdown file describing one workflow command. It is
//! the single source for both halves of conduit: generation renders it into
//! IDE command files, execution parses its steps. Instructions are re-read
//! on every invocation.

pub mod include;
pub mod metadata;

pub use include::IncludeResolver;
pub use metadata::{InstructionMetadata, extract_metadata, split_front_matter};

use crate::error::{ConduitError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A loaded instruction with includes resolved and metadata extracted.
#[derive(Debug, Clone)]
pub struct Instruction {
    /// Path the instruction was read from.
    pub path: PathBuf,

    /// Command name (the file stem).
    pub command_name: String,

    /// Text as stored on disk.
    pub raw: String,

    /// Text with every include token resolved.
    pub resolved: String,

    /// Metadata extracted from the resolved text.
    pub metadata: InstructionMetadata,
}

impl Instruction {
    /// Read an instruction, resolve its includes and extract its metadata.
    ///
    /// # Errors
    ///
    /// * `ConduitError::UserError` - the file cannot be read
    /// * `ConduitError::IncludeError` - include nesting exceeded the limit
    pub fn load(path: &Path, resolver: &IncludeResolver) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ConduitError::UserError(format!(
                "failed to read instruction '{}': {}",
                path.display(),
                e
            ))
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let resolved = resolver.resolve(&raw, base_dir)?;
        let metadata = extract_metadata(&resolved);

        Ok(Self {
            path: path.to_path_buf(),
            command_name: command_name(path),
            raw,
            resolved,
            metadata,
        })
    }

    /// Resolved text after the front-matter block.
    pub fn body(&self) -> &str {
        split_front_matter(&self.resolved).1
    }
}

/// Command name for an instruction path: its file stem.
pub fn command_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_name_is_file_stem() {
        assert_eq!(command_name(Path::new("a/b/deploy.md")), "deploy");
        assert_eq!(command_name(Path::new("review")), "review");
        assert_eq!(command_name(Path::new("x/feature.plan.md")), "feature.plan");
    }

    #[test]
    fn test_load_resolves_includes_before_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("core");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("meta.yml"), "description: From include").unwrap();
        fs::write(
            dir.join("deploy.md"),
            "---\n@meta.yml\n---\n## Step 1: Ship\nGo.\n",
        )
        .unwrap();

        let instruction =
            Instruction::load(&dir.join("deploy.md"), &IncludeResolver::default()).unwrap();
        assert_eq!(instruction.command_name, "deploy");
        assert_eq!(
            instruction.metadata.description.as_deref(),
            Some("From include")
        );
        assert!(instruction.raw.contains("@meta.yml"));
        assert_eq!(instruction.body(), "## Step 1: Ship\nGo.\n");
    }

    #[test]
    fn test_load_missing_file_is_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Instruction::load(
            &temp_dir.path().join("missing.md"),
            &IncludeResolver::default(),
        );
        assert!(matches!(result, Err(ConduitError::UserError(_))));
    }

    #[test]
    fn test_body_without_front_matter_is_whole_text() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plain.md");
        fs::write(&path, "# Plain\n").unwrap();

        let instruction = Instruction::load(&path, &IncludeResolver::default()).unwrap();
        assert!(instruction.metadata.is_empty());
        assert_eq!(instruction.body(), "# Plain\n");
    }
}
