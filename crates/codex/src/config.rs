//! Layered TOML configuration.
//!
//! Sources, later ones winning:
//! - Bundled defaults (include_str! from codex.toml)
//! - `~/.config/codex/codex.toml`
//! - `./codex.toml`

use codex_core::Thresholds;
use codex_error::{CodexError, CodexResult, ConfigError};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../../../codex.toml");

/// Convergence settings.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct ConvergenceConfig {
    /// Milestone counts, strictly ascending
    thresholds: Vec<u64>,
}

/// Logging settings.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_", into)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    level: String,
    /// JSON log lines
    json: bool,
}

/// Top-level configuration.
///
/// # Example
///
/// ```
/// use codex::CodexConfig;
///
/// let config = CodexConfig::from_toml("[convergence]\nthresholds = [3, 6]").unwrap();
/// assert_eq!(config.convergence().thresholds(), &vec![3, 6]);
/// assert_eq!(config.logging().level(), "info");
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct CodexConfig {
    /// Root of the persisted layout
    data_dir: PathBuf,
    /// Convergence settings
    convergence: ConvergenceConfig,
    /// Logging settings
    logging: LoggingConfig,
}

impl CodexConfig {
    /// Load with precedence: `./codex.toml` > home config > bundled defaults.
    ///
    /// # Errors
    ///
    /// `ConfigError` if a file cannot be parsed or the result is invalid.
    #[instrument]
    pub fn load() -> CodexResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");
        let mut builder = defaults();
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/codex/codex.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }
        builder = builder.add_source(File::with_name("codex").required(false));
        finish(builder)
    }

    /// Bundled defaults overridden by one file.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the file is missing, unparsable or invalid.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> CodexResult<Self> {
        debug!("Loading configuration from file");
        finish(defaults().add_source(File::from(path.as_ref())))
    }

    /// Bundled defaults overridden by TOML text.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the text is unparsable or the result is invalid.
    pub fn from_toml(overrides: &str) -> CodexResult<Self> {
        finish(defaults().add_source(File::from_str(overrides, FileFormat::Toml)))
    }

    /// Check the values that deserialization alone cannot.
    ///
    /// # Errors
    ///
    /// `ConfigError` for an empty data directory, an empty log level, or a
    /// threshold list that is empty, contains zero or is not strictly
    /// ascending.
    pub fn validate(&self) -> CodexResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::new("data_dir must not be empty").into());
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::new("logging.level must not be empty").into());
        }
        self.thresholds()?;
        Ok(())
    }

    /// Validated convergence thresholds.
    ///
    /// # Errors
    ///
    /// `ConfigError` for an invalid threshold list.
    pub fn thresholds(&self) -> CodexResult<Thresholds> {
        Ok(Thresholds::new(self.convergence.thresholds.clone())?)
    }
}

fn defaults() -> ConfigBuilder<DefaultState> {
    Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
}

fn finish(builder: ConfigBuilder<DefaultState>) -> CodexResult<CodexConfig> {
    let config: CodexConfig = builder
        .build()
        .map_err(|e| {
            CodexError::from(ConfigError::new(format!(
                "Failed to build configuration: {}",
                e
            )))
        })?
        .try_deserialize()
        .map_err(|e| {
            CodexError::from(ConfigError::new(format!(
                "Failed to parse configuration: {}",
                e
            )))
        })?;
    config.validate()?;
    Ok(config)
}
