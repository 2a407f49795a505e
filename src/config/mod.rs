//! User configuration for stacksplit.
//!
//! Settings live in a small TOML file with two tables:
//!
//! ```toml
//! [analysis]
//! strategy = "hybrid"
//! max_cluster_size = 200
//! min_quality = 0.4
//!
//! [generate]
//! stack_name_prefix = "app"
//! generate_parent = true
//! format = "json"
//! ```
//!
//! Every key is optional. The file is located in this order:
//!
//! 1. The `--config <path>` flag
//! 2. The `STACKSPLIT_CONFIG` environment variable
//! 3. `./stacksplit.toml` in the working directory
//! 4. `~/.stacksplit/config.toml` (`%LOCALAPPDATA%\stacksplit\config.toml` on Windows)
//!
//! When none exists the built-in defaults apply. Command-line flags always
//! win over values read from the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::cluster::ClusteringStrategy;
use crate::core::SplitError;
use crate::split::{AnalyzeOptions, GenerateOptions};
use crate::template::io::TemplateFormat;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "STACKSPLIT_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "stacksplit.toml";

/// Root of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    pub analysis: AnalysisConfig,
    pub generate: GenerateConfig,
}

/// `[analysis]` table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub strategy: Option<ClusteringStrategy>,
    pub max_cluster_size: Option<usize>,
    pub min_quality: Option<f64>,
}

/// `[generate]` table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateConfig {
    pub stack_name_prefix: Option<String>,
    pub generate_parent: Option<bool>,
    pub format: Option<TemplateFormat>,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOverrides {
    pub strategy: Option<ClusteringStrategy>,
    pub max_cluster_size: Option<usize>,
    pub min_quality: Option<f64>,
}

impl SplitConfig {
    /// Load the configuration following the lookup order.
    ///
    /// An explicit path (flag or environment variable) must exist; the
    /// implicit locations are skipped when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected file cannot be read, is not valid
    /// TOML, or holds out-of-range values.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
        let user_path = Self::default_path().ok();

        match resolve_path(explicit, env_path.as_deref(), &cwd, user_path.as_deref()) {
            Some(path) => Self::load_from(&path).await,
            None => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// holds out-of-range values.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Per-user config file location.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory cannot be
    /// determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("stacksplit")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".stacksplit")
        };

        Ok(config_dir.join("config.toml"))
    }

    fn validate(&self) -> std::result::Result<(), SplitError> {
        if self.analysis.max_cluster_size == Some(0) {
            return Err(SplitError::ConfigError {
                message: "analysis.max_cluster_size must be at least 1".to_string(),
            });
        }
        if let Some(min_quality) = self.analysis.min_quality
            && !(0.0..=1.0).contains(&min_quality)
        {
            return Err(SplitError::ConfigError {
                message: format!("analysis.min_quality must be between 0 and 1, got {min_quality}"),
            });
        }
        Ok(())
    }

    /// Analysis options: flag, then file, then default.
    pub fn analyze_options(&self, overrides: &AnalysisOverrides) -> AnalyzeOptions {
        let defaults = AnalyzeOptions::default();
        AnalyzeOptions {
            strategy: overrides
                .strategy
                .or(self.analysis.strategy)
                .unwrap_or(defaults.strategy),
            max_cluster_size: overrides
                .max_cluster_size
                .or(self.analysis.max_cluster_size)
                .unwrap_or(defaults.max_cluster_size),
            min_quality: overrides
                .min_quality
                .or(self.analysis.min_quality)
                .unwrap_or(defaults.min_quality),
        }
    }

    /// Generation options: flag, then file, then default.
    ///
    /// `no_parent` can only switch the parent off.
    pub fn generate_options(
        &self,
        prefix: Option<String>,
        no_parent: bool,
        format: Option<TemplateFormat>,
    ) -> GenerateOptions {
        let defaults = GenerateOptions::default();
        GenerateOptions {
            generate_parent: !no_parent
                && self.generate.generate_parent.unwrap_or(defaults.generate_parent),
            stack_name_prefix: prefix
                .or_else(|| self.generate.stack_name_prefix.clone())
                .unwrap_or(defaults.stack_name_prefix),
            format: format.or(self.generate.format).unwrap_or(defaults.format),
        }
    }
}

/// Pick the config file to load, if any.
///
/// Explicit and environment paths are returned as given so a missing file
/// is reported; the working-directory and per-user files only count when
/// they exist.
pub fn resolve_path(
    explicit: Option<&Path>,
    env_path: Option<&Path>,
    cwd: &Path,
    user_path: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = explicit.or(env_path) {
        return Some(path.to_path_buf());
    }

    let local = cwd.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    user_path.filter(|path| path.is_file()).map(Path::to_path_buf)
}
