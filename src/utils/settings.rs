//! Settings file loading.
//!
//! Everything the core needs from the environment is collected here once and
//! handed down as plain values. The core never reads environment variables.

use super::config::{DEFAULT_IGNORED_PATH_PREFIXES, DEFAULT_MAX_FOREST_DEPTH};
use super::error::ConfigError;
use crate::aggregator::BatchOptions;
use crate::parser::ParseOptions;
use crate::paths::{NormalizerEnv, PathNormalizer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Absolute path of the traced project's root directory
    pub project_root: Option<String>,

    /// Installed-package roots (site-packages and friends)
    pub library_roots: Vec<String>,

    /// Module search path entries, in lookup order
    pub module_search_paths: Vec<String>,

    /// Normalized path prefixes whose frames are dropped
    pub ignored_path_prefixes: Vec<String>,

    /// Working directory of the traced process (defaults to ours)
    pub working_directory: Option<PathBuf>,

    /// Maximum parent/child chain length accepted in a batch
    pub max_forest_depth: usize,

    /// Deployment environment reported in the output header
    pub environment: Option<String>,

    /// Commit identifier reported in the output header
    pub commit_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_root: None,
            library_roots: Vec::new(),
            module_search_paths: Vec::new(),
            ignored_path_prefixes: DEFAULT_IGNORED_PATH_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            working_directory: None,
            max_forest_depth: DEFAULT_MAX_FOREST_DEPTH,
            environment: None,
            commit_id: None,
        }
    }
}

impl Settings {
    /// Check values that would make the pipeline misbehave
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_forest_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_forest_depth must be greater than 0".to_string(),
            ));
        }

        if let Some(root) = &self.project_root {
            if root.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "project_root cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Snapshot the path environment for the normalizer
    ///
    /// Falls back to the current process directory when no working
    /// directory is configured.
    pub fn normalizer_env(&self) -> NormalizerEnv {
        let working_directory = self
            .working_directory
            .clone()
            .or_else(|| std::env::current_dir().ok());

        let working_dir_name = working_directory
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        NormalizerEnv {
            working_dir_name,
            library_roots: self.library_roots.clone(),
            project_root: self.project_root.clone(),
            module_search_paths: self.module_search_paths.clone(),
        }
    }

    /// Build the options the batch pipeline runs with
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            parse: ParseOptions {
                normalizer: PathNormalizer::new(self.normalizer_env()),
                ignored_path_prefixes: self.ignored_path_prefixes.clone(),
            },
            max_forest_depth: self.max_forest_depth,
        }
    }
}

/// Load settings from a TOML file
///
/// # Errors
/// * `ConfigError::ReadFailed` - If file cannot be read
/// * `ConfigError::ParseFailed` - If TOML is invalid
/// * `ConfigError::Invalid` - If values fail validation
///
/// # Example
/// ```ignore
/// let settings = load_settings("exception-flow.toml")?;
/// ```
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&contents)?;
    settings.validate()?;
    Ok(settings)
}
