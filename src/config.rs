use crate::group::PatchAction;
use error_set::error_set;
use serde::{Deserialize, Serialize};
use std::path::Path;

error_set! {
    /// Errors from loading the configuration file
    ConfigError := {
        /// The file could not be read
        #[display("Failed to read config {path}: {message}")]
        Read { path: String, message: String },
        /// The file is not valid TOML for [`Config`]
        #[display("Invalid config {path}: {message}")]
        Invalid { path: String, message: String },
    }
}

/// Engine and CLI settings, every field optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Separator between directory segments for folder prefixes
    #[serde(default = "default_path_separator")]
    pub path_separator: char,
    /// Action the `headers` command uses when none is given
    #[serde(default)]
    pub default_action: PatchAction,
}

fn default_path_separator() -> char {
    '/'
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path_separator: default_path_separator(),
            default_action: PatchAction::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_toml(&text).map_err(|err| match err {
            ConfigError::Invalid { message, .. } => ConfigError::Invalid {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Invalid {
            path: "<inline>".to_string(),
            message: err.message().to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "path_separator = '\\'\ndefault_action = \"discard\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config,
            Config {
                path_separator: '\\',
                default_action: PatchAction::Discard,
            }
        );
    }

    #[test]
    fn unknown_action_is_invalid() {
        let err = Config::from_toml("default_action = \"stash\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
