//! Recursive `@path` include resolution.
//!
//! An include token is `@` followed by a run of non-whitespace characters.
//! The fragment is resolved against the directory of the document containing
//! it, and the token is replaced by the target's contents, which are
//! themselves resolved relative to the target's own directory.
//!
//! Missing or unreadable targets are soft failures: the token is replaced by
//! an inline HTML comment naming the fragment, and resolution continues.
//! Nesting deeper than [`MAX_INCLUDE_DEPTH`] is a hard error, which turns a
//! cyclic include chain into a reported failure instead of a hang.

use crate::error::{ConduitError, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Maximum number of nested include levels.
pub const MAX_INCLUDE_DEPTH: usize = 32;

static INCLUDE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\S+)").expect("Invalid include token regex"));

/// Marker substituted for an include whose target does not exist.
pub fn missing_include_marker(fragment: &str) -> String {
    format!("<!-- MISSING INCLUDE: {} -->", fragment)
}

/// Marker substituted for an include whose target exists but cannot be read.
pub fn include_error_marker(fragment: &str) -> String {
    format!("<!-- ERROR PROCESSING INCLUDE: {} -->", fragment)
}

/// Resolves include tokens with a bounded recursion depth.
#[derive(Debug, Clone, Copy)]
pub struct IncludeResolver {
    max_depth: usize,
}

impl Default for IncludeResolver {
    fn default() -> Self {
        Self {
            max_depth: MAX_INCLUDE_DEPTH,
        }
    }
}

impl IncludeResolver {
    /// Create a resolver with a custom depth limit.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Resolve every include token in `text`, relative to `base_dir`.
    ///
    /// Text without tokens is returned unchanged.
    ///
    /// # Errors
    ///
    /// * `ConduitError::IncludeError` - nesting exceeded the depth limit
    pub fn resolve(&self, text: &str, base_dir: &Path) -> Result<String> {
        self.resolve_at(text, base_dir, 0)
    }

    fn resolve_at(&self, text: &str, base_dir: &Path, depth: usize) -> Result<String> {
        let mut output = String::with_capacity(text.len());
        let mut last = 0;

        for caps in INCLUDE_TOKEN.captures_iter(text) {
            let (Some(token), Some(fragment)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            output.push_str(&text[last..token.start()]);
            output.push_str(&self.expand(fragment.as_str(), base_dir, depth)?);
            last = token.end();
        }

        output.push_str(&text[last..]);
        Ok(output)
    }

    fn expand(&self, fragment: &str, base_dir: &Path, depth: usize) -> Result<String> {
        let target = base_dir.join(fragment);

        if !target.exists() {
            warn!(include = %fragment, path = %target.display(), "include file not found");
            return Ok(missing_include_marker(fragment));
        }

        let content = match fs::read_to_string(&target) {
            Ok(content) => content,
            Err(e) => {
                warn!(include = %fragment, path = %target.display(), error = %e, "failed to read include");
                return Ok(include_error_marker(fragment));
            }
        };

        let next_depth = depth + 1;
        if next_depth > self.max_depth {
            return Err(ConduitError::IncludeError(format!(
                "include nesting exceeded {} levels at '{}' (possible include cycle)",
                self.max_depth,
                target.display()
            )));
        }

        debug!(path = %target.display(), depth = next_depth, "resolving include");
        let nested_base = target.parent().unwrap_or(base_dir);
        self.resolve_at(&content, nested_base, next_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolver() -> IncludeResolver {
        IncludeResolver::default()
    }

    #[test]
    fn test_text_without_tokens_is_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = [
            "",
            "plain text",
            "# Heading\n\nSome body\n  with indentation\n",
            "no include here: user at host",
        ];
        for input in inputs {
            assert_eq!(resolver().resolve(input, temp_dir.path()).unwrap(), input);
        }
    }

    #[test]
    fn test_single_include_is_spliced_in_place() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("shared.md"), "SHARED").unwrap();

        let result = resolver()
            .resolve("before @shared.md after", temp_dir.path())
            .unwrap();
        assert_eq!(result, "before SHARED after");
    }

    #[test]
    fn test_two_level_chain_is_fully_flattened() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("parts/deeper")).unwrap();
        fs::write(root.join("parts/b.md"), "B[ @deeper/c.md ]B").unwrap();
        fs::write(root.join("parts/deeper/c.md"), "C").unwrap();

        let result = resolver().resolve("A( @parts/b.md )A", root).unwrap();
        assert_eq!(result, "A( B[ C ]B )A");
        assert!(!result.contains('@'));
    }

    #[test]
    fn test_nested_include_uses_target_directory_as_base() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        // c.md exists both at the root and in sub/; the nested include must
        // pick the one next to b.md.
        fs::write(root.join("c.md"), "ROOT-C").unwrap();
        fs::write(root.join("sub/c.md"), "SUB-C").unwrap();
        fs::write(root.join("sub/b.md"), "@c.md").unwrap();

        let result = resolver().resolve("@sub/b.md", root).unwrap();
        assert_eq!(result, "SUB-C");
    }

    #[test]
    fn test_missing_include_becomes_marker() {
        let temp_dir = TempDir::new().unwrap();
        let result = resolver()
            .resolve("x @missing/file.md y", temp_dir.path())
            .unwrap();
        assert_eq!(result, "x <!-- MISSING INCLUDE: missing/file.md --> y");
    }

    #[test]
    fn test_missing_nested_include_keeps_outer_content() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.md"), "start @gone.md end").unwrap();

        let result = resolver().resolve("@b.md", temp_dir.path()).unwrap();
        assert_eq!(result, "start <!-- MISSING INCLUDE: gone.md --> end");
    }

    #[test]
    fn test_unreadable_include_becomes_error_marker() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("adir")).unwrap();

        let result = resolver().resolve("@adir", temp_dir.path()).unwrap();
        assert_eq!(result, "<!-- ERROR PROCESSING INCLUDE: adir -->");
    }

    #[test]
    fn test_multiple_tokens() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.md"), "A").unwrap();
        fs::write(temp_dir.path().join("b.md"), "B").unwrap();

        let result = resolver()
            .resolve("@a.md\n@b.md\n@a.md", temp_dir.path())
            .unwrap();
        assert_eq!(result, "A\nB\nA");
    }

    #[test]
    fn test_absolute_fragment() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("abs.md");
        fs::write(&target, "ABS").unwrap();

        let other = TempDir::new().unwrap();
        let text = format!("@{}", target.display());
        let result = resolver().resolve(&text, other.path()).unwrap();
        assert_eq!(result, "ABS");
    }

    #[test]
    fn test_cycle_is_reported_instead_of_hanging() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.md"), "a @b.md").unwrap();
        fs::write(temp_dir.path().join("b.md"), "b @a.md").unwrap();

        let result = resolver().resolve("@a.md", temp_dir.path());
        match result {
            Err(ConduitError::IncludeError(msg)) => assert!(msg.contains("exceeded 32 levels")),
            other => panic!("expected IncludeError, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_limit_is_inclusive() {
        let temp_dir = TempDir::new().unwrap();
        // chain: l1 -> l2 -> l3 (three nested levels)
        fs::write(temp_dir.path().join("l1.md"), "@l2.md").unwrap();
        fs::write(temp_dir.path().join("l2.md"), "@l3.md").unwrap();
        fs::write(temp_dir.path().join("l3.md"), "leaf").unwrap();

        let ok = IncludeResolver::with_max_depth(3).resolve("@l1.md", temp_dir.path());
        assert_eq!(ok.unwrap(), "leaf");

        let too_deep = IncludeResolver::with_max_depth(2).resolve("@l1.md", temp_dir.path());
        assert!(matches!(too_deep, Err(ConduitError::IncludeError(_))));
    }

    #[test]
    fn test_markers() {
        assert_eq!(missing_include_marker("x.md"), "<!-- MISSING INCLUDE: x.md -->");
        assert_eq!(
            include_error_marker("x.md"),
            "<!-- ERROR PROCESSING INCLUDE: x.md -->"
        );
    }
}
