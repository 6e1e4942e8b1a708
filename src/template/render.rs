//! `${name}` placeholder substitution.
//!
//! # Syntax
//!
//! - `${name}` - Substitutes the value of variable `name`, where `name` is an
//!   identifier (`[A-Za-z_][A-Za-z0-9_]*`)
//!
//! Unlike prompt rendering, substitution here never fails: a placeholder
//! naming an unknown variable, a malformed `${`, or an unterminated `${` is
//! copied to the output verbatim.

use super::{TemplateVar, TemplateVariables};

/// A well-formed `${identifier}` occurrence.
struct Placeholder<'a> {
    /// Byte offset of the `$`.
    start: usize,
    /// Byte offset just past the closing `}`.
    end: usize,
    /// The identifier between the braces.
    name: &'a str,
}

/// Iterate over the well-formed placeholders of `template`, in order.
fn placeholders(template: &str) -> impl Iterator<Item = Placeholder<'_>> {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        while let Some(found) = template[cursor..].find("${") {
            let start = cursor + found;
            let name_start = start + 2;
            let name_len = identifier_len(&template[name_start..]);
            let close = name_start + name_len;

            if name_len > 0 && template[close..].starts_with('}') {
                cursor = close + 1;
                return Some(Placeholder {
                    start,
                    end: close + 1,
                    name: &template[name_start..close],
                });
            }

            // Not a placeholder; resume scanning after the `${`.
            cursor = name_start;
        }
        None
    })
}

/// Length in bytes of the identifier at the start of `s` (0 if none).
fn identifier_len(s: &str) -> usize {
    let mut len = 0;
    for (i, c) in s.char_indices() {
        let valid = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };
        if !valid {
            break;
        }
        len = i + c.len_utf8();
    }
    len
}

/// Substitute every known `${name}` placeholder in `template`.
///
/// # Examples
///
/// ```text
/// "Run ${command_name} (${unknown})"  ->  "Run deploy (${unknown})"
/// ```
pub fn apply_template(template: &str, variables: &TemplateVariables) -> String {
    let mut result = String::with_capacity(template.len());
    let mut last = 0;

    for placeholder in placeholders(template) {
        result.push_str(&template[last..placeholder.start]);
        match variables.lookup(placeholder.name) {
            Some(value) => result.push_str(value),
            None => result.push_str(&template[placeholder.start..placeholder.end]),
        }
        last = placeholder.end;
    }

    result.push_str(&template[last..]);
    result
}

/// Placeholder names in `template` that no [`TemplateVar`] can satisfy.
///
/// Each name is reported once, in order of first appearance.
pub fn unresolved_placeholders(template: &str) -> Vec<String> {
    let mut unresolved: Vec<String> = Vec::new();
    for placeholder in placeholders(template) {
        if TemplateVar::from_name(placeholder.name).is_none()
            && !unresolved.iter().any(|n| n == placeholder.name)
        {
            unresolved.push(placeholder.name.to_string());
        }
    }
    unresolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVariables {
        let mut vars = TemplateVariables::default();
        vars.set(TemplateVar::CommandName, "deploy");
        vars.set(TemplateVar::Model, "opus");
        vars.set(TemplateVar::Dependencies, "");
        vars
    }

    #[test]
    fn test_simple_substitution() {
        let result = apply_template("Run ${command_name} on ${model}.", &vars());
        assert_eq!(result, "Run deploy on opus.");
    }

    #[test]
    fn test_no_placeholders() {
        assert_eq!(apply_template("Just plain text", &vars()), "Just plain text");
        assert_eq!(apply_template("", &vars()), "");
    }

    #[test]
    fn test_unknown_placeholder_is_verbatim() {
        let result = apply_template("a ${unknown_thing} b", &vars());
        assert_eq!(result, "a ${unknown_thing} b");
    }

    #[test]
    fn test_known_name_without_value_is_verbatim() {
        // `color` is part of the schema but was never set.
        let result = apply_template("${color}", &vars());
        assert_eq!(result, "${color}");
    }

    #[test]
    fn test_unterminated_placeholder_is_verbatim() {
        let result = apply_template("start ${command_name", &vars());
        assert_eq!(result, "start ${command_name");
    }

    #[test]
    fn test_malformed_placeholder_does_not_swallow_following_one() {
        let result = apply_template("${ bad ${command_name}}", &vars());
        assert_eq!(result, "${ bad deploy}");
    }

    #[test]
    fn test_plain_braces_and_dollars_untouched() {
        let template = "cost: $5, json: {\"a\": 1}, shell: $HOME";
        assert_eq!(apply_template(template, &vars()), template);
    }

    #[test]
    fn test_multiple_and_adjacent_placeholders() {
        let result = apply_template("${command_name}${model}-${command_name}", &vars());
        assert_eq!(result, "deployopus-deploy");
    }

    #[test]
    fn test_empty_value_substitution() {
        let result = apply_template("before${dependencies}after", &vars());
        assert_eq!(result, "beforeafter");
    }

    #[test]
    fn test_unicode_is_preserved() {
        let result = apply_template("🎉 ${command_name} 日本語", &vars());
        assert_eq!(result, "🎉 deploy 日本語");
    }

    #[test]
    fn test_unresolved_placeholders() {
        let template = "${command_name} ${author} ${model} ${author} ${team_name} ${ broken }";
        assert_eq!(
            unresolved_placeholders(template),
            vec!["author".to_string(), "team_name".to_string()]
        );
        assert!(unresolved_placeholders("${trigger} ${project_type}").is_empty());
    }

    #[test]
    fn test_identifier_len() {
        assert_eq!(identifier_len("name}"), 4);
        assert_eq!(identifier_len("_x1 rest"), 3);
        assert_eq!(identifier_len("1abc"), 0);
        assert_eq!(identifier_len(""), 0);
    }
}
