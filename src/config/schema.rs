use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use super::variable::{VariableSpec, VariableType};
use crate::error::{Result, StampError};
use crate::glob::PatternSet;
use crate::render::ConflictPolicy;

/// A parsed `stamp.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PartialConfig {
    pub template: PartialMetadata,

    #[serde(default)]
    pub variables: Vec<VariableSpec>,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub hooks: HooksConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PartialMetadata {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,

    #[serde(default = "default_template_markers")]
    pub template_markers: Vec<String>,

    #[serde(default)]
    pub conflict: ConflictPolicy,
}

fn default_template_markers() -> Vec<String> {
    vec![".tmpl".to_string()]
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FilesConfig {
    #[serde(flatten)]
    pub patterns: PatternSet,

    /// Output paths that are never touched once they exist.
    #[serde(default)]
    pub preserve: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HooksConfig {
    /// Scripts (relative to the partial root) run before any file is written.
    #[serde(default)]
    pub pre_apply: Vec<String>,

    /// Scripts run in the destination after all files are written.
    #[serde(default)]
    pub post_apply: Vec<String>,

    #[serde(default, skip_serializing)]
    pub skip: SkipPolicy,
}

impl HooksConfig {
    pub fn has_hooks(&self) -> bool {
        !self.pre_apply.is_empty() || !self.post_apply.is_empty()
    }
}

/// Which hooks to suppress.
///
/// The manifest accepts `skip = true`, `skip = false`, or a list of hook names.
/// Non-string list entries are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SkipPolicy {
    All,
    #[default]
    None,
    Named(BTreeSet<String>),
}

impl SkipPolicy {
    pub fn skips(&self, hook: &str) -> bool {
        match self {
            SkipPolicy::All => true,
            SkipPolicy::None => false,
            SkipPolicy::Named(names) => names.contains(hook),
        }
    }
}

impl<'de> Deserialize<'de> for SkipPolicy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawSkip {
            Flag(bool),
            List(Vec<toml::Value>),
        }

        Ok(match RawSkip::deserialize(deserializer)? {
            RawSkip::Flag(true) => SkipPolicy::All,
            RawSkip::Flag(false) => SkipPolicy::None,
            RawSkip::List(items) => {
                let names: BTreeSet<String> = items
                    .into_iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect();
                if names.is_empty() {
                    SkipPolicy::None
                } else {
                    SkipPolicy::Named(names)
                }
            }
        })
    }
}

impl PartialConfig {
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for var in &self.variables {
            if !is_identifier(&var.name) {
                return Err(StampError::ConfigInvalidVariable {
                    name: var.name.clone(),
                    reason: "names may only contain letters, digits and '_', and must not start with a digit".into(),
                });
            }

            if !seen.insert(var.name.as_str()) {
                return Err(StampError::ConfigInvalidVariable {
                    name: var.name.clone(),
                    reason: "declared more than once".into(),
                });
            }

            if var.var_type == VariableType::Choice {
                if var.choices.is_empty() {
                    return Err(StampError::ConfigInvalidVariable {
                        name: var.name.clone(),
                        reason: "choice variables must have 'choices' defined".into(),
                    });
                }
                if let Some(default) = &var.default {
                    if !default.contains("{{") && !var.choices.contains(default) {
                        return Err(StampError::ConfigInvalidVariable {
                            name: var.name.clone(),
                            reason: format!("default '{default}' is not one of the choices"),
                        });
                    }
                }
            }
        }

        if let Some(empty) = self.template.template_markers.iter().find(|m| m.is_empty()) {
            return Err(StampError::ConfigInvalid {
                reason: format!("template marker suffixes must not be empty (got {empty:?})"),
            });
        }

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(toml_str: &str) -> PartialConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_minimal_manifest_defaults() {
        let config = parse("[template]\nname = \"ci\"\n");
        assert_eq!(config.template.template_markers, vec![".tmpl".to_string()]);
        assert_eq!(config.template.conflict, ConflictPolicy::Prompt);
        assert!(config.files.patterns.include.is_empty());
        assert_eq!(config.hooks.skip, SkipPolicy::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_files_section() {
        let config = parse(
            r#"
[template]
name = "ci"
conflict = "merge"

[files]
include = [".github/**"]
exclude = ["**/*.orig"]
preserve = [".github/CODEOWNERS"]
"#,
        );
        assert_eq!(config.template.conflict, ConflictPolicy::Merge);
        assert_eq!(config.files.patterns.include, vec![".github/**"]);
        assert_eq!(config.files.patterns.exclude, vec!["**/*.orig"]);
        assert_eq!(config.files.preserve, vec![".github/CODEOWNERS"]);
    }

    #[rstest]
    #[case("skip = true", SkipPolicy::All)]
    #[case("skip = false", SkipPolicy::None)]
    #[case("skip = []", SkipPolicy::None)]
    #[case(r#"skip = ["post_apply"]"#, SkipPolicy::Named(["post_apply".to_string()].into()))]
    #[case(r#"skip = ["pre_apply", 3, true]"#, SkipPolicy::Named(["pre_apply".to_string()].into()))]
    fn test_skip_policy_shapes(#[case] line: &str, #[case] expected: SkipPolicy) {
        let config = parse(&format!("[template]\nname = \"x\"\n[hooks]\n{line}\n"));
        assert_eq!(config.hooks.skip, expected);
    }

    #[test]
    fn test_skip_policy_skips() {
        let named = SkipPolicy::Named(["post_apply".to_string()].into());
        assert!(named.skips("post_apply"));
        assert!(!named.skips("pre_apply"));
        assert!(SkipPolicy::All.skips("anything"));
        assert!(!SkipPolicy::None.skips("anything"));
    }

    #[rstest]
    #[case(
        "[[variables]]\nname = \"A\"\n[[variables]]\nname = \"A\"\n",
        "declared more than once"
    )]
    #[case("[[variables]]\nname = \"1abc\"\n", "names may only contain")]
    #[case(
        "[[variables]]\nname = \"LANG\"\ntype = \"choice\"\n",
        "must have 'choices'"
    )]
    #[case(
        "[[variables]]\nname = \"LANG\"\ntype = \"choice\"\nchoices = [\"rust\"]\ndefault = \"go\"\n",
        "not one of the choices"
    )]
    fn test_invalid_variables(#[case] vars: &str, #[case] reason_fragment: &str) {
        let config = parse(&format!("[template]\nname = \"x\"\n{vars}"));
        match config.validate() {
            Err(StampError::ConfigInvalidVariable { reason, .. }) => {
                assert!(reason.contains(reason_fragment), "{reason}")
            }
            other => panic!("expected ConfigInvalidVariable, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_marker_rejected() {
        let config = parse("[template]\nname = \"x\"\ntemplate_markers = [\"\"]\n");
        assert!(matches!(
            config.validate(),
            Err(StampError::ConfigInvalid { .. })
        ));
    }
}
