pub mod graph;
pub mod validate;

use std::collections::BTreeMap;
use std::ops::Deref;

use crate::config::VariableSpec;
use crate::error::{Result, StampError};
use crate::render::content::substitute;

pub use graph::resolution_order;
pub use validate::{compile_validator, validate_value};

/// Final name to value map for one render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedVariables(BTreeMap<String, String>);

impl ResolvedVariables {
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl Deref for ResolvedVariables {
    type Target = BTreeMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<BTreeMap<String, String>> for ResolvedVariables {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Resolve declared variables against caller values and builtins.
///
/// Builtins seed the map. Caller values for undeclared names pass through as-is.
/// Declared variables are visited in dependency order so a default like
/// `{{NAME}}-cli` always sees `NAME` already resolved.
pub fn resolve(
    specs: &[VariableSpec],
    provided: &BTreeMap<String, String>,
    builtins: &BTreeMap<String, String>,
) -> Result<ResolvedVariables> {
    let order = resolution_order(specs)?;
    tracing::debug!(?order, "variable resolution order");

    // A broken pattern fails the run even if its variable ends up empty.
    for spec in specs {
        compile_validator(spec)?;
    }

    let by_name: BTreeMap<&str, &VariableSpec> =
        specs.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut values = builtins.clone();
    for (name, value) in provided {
        if !by_name.contains_key(name.as_str()) {
            values.insert(name.clone(), value.clone());
        }
    }

    for name in &order {
        let spec = by_name[name.as_str()];
        let value = if let Some(value) = provided.get(name) {
            validate_value(spec, value)?;
            value.clone()
        } else if let Some(default) = &spec.default {
            let value = substitute(default, &values);
            validate_value(spec, &value)?;
            value
        } else if spec.required {
            return Err(StampError::MissingRequiredVariable {
                name: name.clone(),
                description: spec.description.clone(),
            });
        } else {
            String::new()
        };
        values.insert(name.clone(), value);
    }

    Ok(ResolvedVariables(values))
}
