//! Configuration for fishlint.
//!
//! Settings come from three layers, later ones winning:
//! 1. Built-in defaults
//! 2. A `.fishlint.toml` file (found in the working directory or given explicitly)
//! 3. Editor settings sent as LSP initialization options, or CLI flags
//!
//! ```toml
//! checker = "fish"
//! formatter = "fish_indent"
//! formatter-args = []
//! timeout = 30000          # ms per tool run, 0 disables
//! enable-linting = true
//! enable-formatting = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = ".fishlint.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Effective settings used by the lint and format pipelines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct FishlintConfig {
    /// Executable used for syntax checking (`<checker> -n <file>`)
    pub checker: String,
    /// Executable used for formatting (reads stdin, writes stdout)
    pub formatter: String,
    /// Extra arguments passed to the formatter
    pub formatter_args: Vec<String>,
    /// Timeout per tool run in milliseconds; 0 waits indefinitely
    pub timeout: u64,
    pub enable_linting: bool,
    pub enable_formatting: bool,
}

impl Default for FishlintConfig {
    fn default() -> Self {
        Self {
            checker: "fish".to_string(),
            formatter: "fish_indent".to_string(),
            formatter_args: Vec::new(),
            timeout: 30_000,
            enable_linting: true,
            enable_formatting: true,
        }
    }
}

impl FishlintConfig {
    pub fn timeout_duration(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_millis(self.timeout))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a configuration file that must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content, path)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `.fishlint.toml` from `dir` if present.
    pub fn discover(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Load an explicit file, or discover one in `dir`, or fall back to defaults.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::discover(dir)?.unwrap_or_default()),
        }
    }
}

/// Settings an editor passes in `initializationOptions`.
///
/// Every field is optional; present fields override the file configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FishlintLspOptions {
    /// Path to a fishlint configuration file
    pub config_path: Option<String>,
    pub checker: Option<String>,
    pub formatter: Option<String>,
    pub formatter_args: Option<Vec<String>>,
    pub timeout: Option<u64>,
    pub enable_linting: Option<bool>,
    pub enable_formatting: Option<bool>,
}

impl FishlintLspOptions {
    pub fn apply_to(&self, config: &mut FishlintConfig) {
        if let Some(checker) = &self.checker {
            config.checker = checker.clone();
        }
        if let Some(formatter) = &self.formatter {
            config.formatter = formatter.clone();
        }
        if let Some(args) = &self.formatter_args {
            config.formatter_args = args.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(enabled) = self.enable_linting {
            config.enable_linting = enabled;
        }
        if let Some(enabled) = self.enable_formatting {
            config.enable_formatting = enabled;
        }
    }
}
