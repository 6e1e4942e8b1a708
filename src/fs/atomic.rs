//! Atomic file writes for generated command files.
//!
//! Generated files are read by IDEs that may be watching their command
//! directories, so a file must never be observed half-written. Every write
//! goes through a temporary sibling file:
//!
//! 1. Write content to `.{filename}.{pid}.tmp` in the target directory
//! 2. Sync the temporary file to disk
//! 3. Rename it over the target
//!
//! `std::fs::rename` replaces an existing target on both POSIX and Windows,
//! and is atomic when source and target share a filesystem, which holds
//! because the temporary file lives next to the target.

use crate::error::{ConduitError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write `content` to `path`, creating parent directories.
///
/// # Errors
///
/// * `ConduitError::UserError` - a directory, the temporary file or the
///   rename could not be created; the error names the offending path
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            ConduitError::UserError(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content.as_bytes())?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ConduitError::UserError(format!("failed to replace '{}': {}", path.display(), e))
    })?;

    #[cfg(unix)]
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Temporary sibling path for `target`.
fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ConduitError::UserError(format!("invalid output path '{}'", target.display()))
        })?;

    Ok(parent.join(format!(".{}.{}.tmp", filename, std::process::id())))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        ConduitError::UserError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let result = file.write_all(content).and_then(|_| file.sync_all());
    if let Err(e) = result {
        let _ = fs::remove_file(path);
        return Err(ConduitError::UserError(format!(
            "failed to write temporary file '{}': {}",
            path.display(),
            e
        )));
    }

    Ok(())
}
