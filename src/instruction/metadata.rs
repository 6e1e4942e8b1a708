//! Front-matter metadata for instruction documents.
//!
//! An instruction may start with a YAML block delimited by `---` lines:
//!
//! ```text
//! ---
//! name: deploy
//! description: Ship the current feature
//! model: sonnet
//! dependencies: [build, test]
//! ---
//!
//! ## Step 1: Build
//! ```
//!
//! Metadata is advisory. A missing block, malformed YAML or a body that is
//! not a mapping all yield empty metadata rather than an error, and single
//! fields of the wrong shape are dropped without affecting their siblings.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::warn;

static FRONT_MATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)")
        .expect("Invalid front matter regex")
});

/// Parsed front-matter fields.
///
/// Known fields are typed leniently; unknown fields are preserved in
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructionMetadata {
    /// Command name override.
    #[serde(
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,

    /// One-line description.
    #[serde(
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,

    /// Preferred model for the IDE agent.
    #[serde(
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub model: Option<String>,

    /// Display color.
    #[serde(
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<String>,

    /// Agent type the command is routed to.
    #[serde(
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub agent: Option<String>,

    /// Integration points, rendered as a bullet list.
    #[serde(
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub integrations: Option<Vec<String>>,

    /// Context requirements, rendered as a bullet list.
    #[serde(
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub context: Option<Vec<String>>,

    /// Expected outcomes, rendered as a bullet list.
    #[serde(
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub outcomes: Option<Vec<String>>,

    /// Trigger phrase.
    #[serde(
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub trigger: Option<String>,

    /// Commands this one depends on.
    #[serde(
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub dependencies: Option<Vec<String>>,

    /// Any fields not explicitly defined above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl InstructionMetadata {
    /// Whether no field was recognized or preserved.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Coerce a YAML scalar to a string; empty strings count as absent.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Sequence(items) => Some(items.iter().filter_map(scalar_to_string).collect()),
        _ => None,
    })
}

/// Split a leading front-matter block from the rest of the document.
///
/// Returns the raw YAML (if a block is present) and the text after the
/// closing delimiter. Without a block the whole text is the body.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    match FRONT_MATTER.captures(text) {
        Some(caps) => {
            let (Some(block), Some(yaml)) = (caps.get(0), caps.get(1)) else {
                return (None, text);
            };
            (Some(yaml.as_str()), &text[block.end()..])
        }
        None => (None, text),
    }
}

/// Extract metadata from the front matter of `text`.
///
/// Never fails: anything unparseable yields empty metadata.
pub fn extract_metadata(text: &str) -> InstructionMetadata {
    let Some(yaml) = split_front_matter(text).0 else {
        return InstructionMetadata::default();
    };

    if yaml.trim().is_empty() {
        return InstructionMetadata::default();
    }

    match serde_yaml::from_str::<InstructionMetadata>(yaml) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(error = %e, "ignoring malformed instruction front matter");
            InstructionMetadata::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_front_matter() {
        let text = r#"---
name: deploy
description: Ship the current feature
model: sonnet
color: green
agent: release-manager
integrations:
  - Vercel
  - GitHub
context: [Release notes]
outcomes: [Deployed build]
trigger: "ship it"
dependencies: [build, test]
---

## Step 1: Build
"#;
        let meta = extract_metadata(text);
        assert_eq!(meta.name.as_deref(), Some("deploy"));
        assert_eq!(meta.description.as_deref(), Some("Ship the current feature"));
        assert_eq!(meta.model.as_deref(), Some("sonnet"));
        assert_eq!(meta.color.as_deref(), Some("green"));
        assert_eq!(meta.agent.as_deref(), Some("release-manager"));
        assert_eq!(
            meta.integrations,
            Some(vec!["Vercel".to_string(), "GitHub".to_string()])
        );
        assert_eq!(meta.context, Some(vec!["Release notes".to_string()]));
        assert_eq!(meta.outcomes, Some(vec!["Deployed build".to_string()]));
        assert_eq!(meta.trigger.as_deref(), Some("ship it"));
        assert_eq!(
            meta.dependencies,
            Some(vec!["build".to_string(), "test".to_string()])
        );
        assert!(meta.extra.is_empty());
    }

    #[test]
    fn test_no_front_matter_is_empty() {
        assert!(extract_metadata("# Just a heading\n\nBody").is_empty());
        assert!(extract_metadata("").is_empty());
    }

    #[test]
    fn test_block_must_start_the_document() {
        let text = "\n---\nname: late\n---\n";
        assert!(extract_metadata(text).is_empty());
    }

    #[test]
    fn test_unterminated_block_is_empty() {
        assert!(extract_metadata("---\nname: open\nbody without closing").is_empty());
    }

    #[test]
    fn test_malformed_yaml_is_empty() {
        let text = "---\nname: [unclosed\n---\nbody\n";
        assert!(extract_metadata(text).is_empty());
    }

    #[test]
    fn test_non_mapping_body_is_empty() {
        let text = "---\n- just\n- a list\n---\nbody\n";
        assert!(extract_metadata(text).is_empty());
    }

    #[test]
    fn test_wrong_shaped_fields_are_dropped_individually() {
        let text = r#"---
name: review
model: 4
description: ""
integrations: not-a-list
dependencies:
  nested: map
color: true
---
"#;
        let meta = extract_metadata(text);
        assert_eq!(meta.name.as_deref(), Some("review"));
        assert_eq!(meta.model.as_deref(), Some("4"));
        assert_eq!(meta.color.as_deref(), Some("true"));
        assert_eq!(meta.description, None);
        assert_eq!(meta.integrations, None);
        assert_eq!(meta.dependencies, None);
    }

    #[test]
    fn test_list_skips_non_scalar_items() {
        let text = "---\ncontext: [a, [b], 3]\n---\n";
        let meta = extract_metadata(text);
        assert_eq!(meta.context, Some(vec!["a".to_string(), "3".to_string()]));
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let text = "---\nname: x\nowner: platform-team\npriority: 2\n---\n";
        let meta = extract_metadata(text);
        assert_eq!(
            meta.extra.get("owner"),
            Some(&Value::String("platform-team".to_string()))
        );
        assert!(meta.extra.contains_key("priority"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "---\r\nname: windows\r\n---\r\nbody\r\n";
        let meta = extract_metadata(text);
        assert_eq!(meta.name.as_deref(), Some("windows"));
    }

    #[test]
    fn test_split_front_matter() {
        let text = "---\nname: x\n---\n## Step 1: Go\n";
        let (yaml, body) = split_front_matter(text);
        assert_eq!(yaml, Some("name: x"));
        assert_eq!(body, "## Step 1: Go\n");

        let (yaml, body) = split_front_matter("no block");
        assert_eq!(yaml, None);
        assert_eq!(body, "no block");
    }

    #[test]
    fn test_closing_delimiter_at_end_of_text() {
        let (yaml, body) = split_front_matter("---\nname: x\n---");
        assert_eq!(yaml, Some("name: x"));
        assert_eq!(body, "");
    }
}
