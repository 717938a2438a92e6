use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StampError};
use crate::render::ConflictPolicy;

/// User-level configuration loaded from `~/.config/stamp/config.toml`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// Preferred conflict policy, used when `--conflict` is not given.
    #[serde(default)]
    pub conflict: Option<ConflictPolicy>,

    /// Answers applied to every partial that declares a variable of the same name.
    /// Command-line values still win.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stamp").join("config.toml"))
}

/// Load user configuration from the XDG config directory.
///
/// Returns `Ok(None)` if the config file does not exist.
/// Returns `Err` if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<Option<UserConfig>> {
    let path = match config_path() {
        Some(p) => p,
        None => return Ok(None),
    };

    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| StampError::Io {
        context: format!("reading user config {}", path.display()),
        source: e,
    })?;

    let config: UserConfig = toml::from_str(&content).map_err(|e| StampError::ConfigParse {
        path: path.clone(),
        source: e,
    })?;

    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_user_config() {
        let toml_str = r#"
conflict = "backup"

[variables]
AUTHOR = "Jane Doe"
LICENSE = "MIT"
"#;
        let config: UserConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.conflict, Some(ConflictPolicy::Backup));
        assert_eq!(config.variables.len(), 2);
        assert_eq!(config.variables["AUTHOR"], "Jane Doe");
    }

    #[test]
    fn parse_empty_config() {
        let config: UserConfig = toml::from_str("").unwrap();
        assert!(config.conflict.is_none());
        assert!(config.variables.is_empty());
    }

    #[test]
    fn parse_unknown_policy_errors() {
        let result: std::result::Result<UserConfig, _> = toml::from_str("conflict = \"yolo\"");
        assert!(result.is_err());
    }

    #[test]
    fn load_user_config_returns_ok_when_no_file() {
        let result = load_user_config();
        assert!(result.is_ok());
    }
}
