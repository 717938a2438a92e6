use regex_lite::Regex;

use crate::config::{VariableSpec, VariableType};
use crate::error::{Result, StampError};

/// Compile a variable's validation pattern, if it has one.
pub fn compile_validator(spec: &VariableSpec) -> Result<Option<Regex>> {
    spec.validation
        .as_deref()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| StampError::PatternCompile {
                name: spec.name.clone(),
                pattern: pattern.to_string(),
                source: e,
            })
        })
        .transpose()
}

/// Check a value against the variable's type, choices and validation pattern.
///
/// The pattern is searched, not anchored, unless it anchors itself.
pub fn validate_value(spec: &VariableSpec, value: &str) -> Result<()> {
    let invalid = |reason: String| StampError::InvalidVariableValue {
        name: spec.name.clone(),
        value: value.to_string(),
        reason,
    };

    match spec.var_type {
        VariableType::String => {}
        VariableType::Boolean => {
            if !is_boolean(value) {
                return Err(invalid(
                    "expected one of true, false, yes, no, 1, 0".to_string(),
                ));
            }
        }
        VariableType::Integer => {
            if value.parse::<i64>().is_err() {
                return Err(invalid("expected a base-10 integer".to_string()));
            }
        }
        VariableType::Choice => {
            if !spec.choices.iter().any(|c| c == value) {
                return Err(invalid(format!(
                    "expected one of: {}",
                    spec.choices.join(", ")
                )));
            }
        }
    }

    if let Some(re) = compile_validator(spec)? {
        if !re.is_match(value) {
            let reason = spec
                .validation_message
                .clone()
                .unwrap_or_else(|| format!("must match pattern {}", re.as_str()));
            return Err(invalid(reason));
        }
    }

    Ok(())
}

fn is_boolean(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "1" | "0"
    )
}
