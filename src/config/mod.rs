pub mod schema;
pub mod user;
pub mod variable;

use std::path::Path;

use crate::error::{Result, StampError};

pub use schema::{PartialConfig, SkipPolicy};
pub use user::{load_user_config, UserConfig};
pub use variable::{VariableSpec, VariableType};

pub const MANIFEST_FILE: &str = "stamp.toml";

/// Load and validate a PartialConfig from a stamp.toml file.
pub fn load_config(path: &Path) -> Result<PartialConfig> {
    let config = read_config(path)?;
    config.validate()?;

    tracing::debug!(
        partial = %config.template.name,
        variables = config.variables.len(),
        "loaded manifest"
    );

    Ok(config)
}

/// Parse a manifest without validating it. `path` may name the file or the
/// partial directory holding it.
pub fn read_config(path: &Path) -> Result<PartialConfig> {
    let config_path = if path.ends_with(MANIFEST_FILE) {
        path.to_path_buf()
    } else {
        path.join(MANIFEST_FILE)
    };

    if !config_path.exists() {
        return Err(StampError::ConfigNotFound { path: config_path });
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| StampError::Io {
        context: format!("reading {}", config_path.display()),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| StampError::ConfigParse {
        path: config_path,
        source: e,
    })
}
