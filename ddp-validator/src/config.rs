//! Configuration file support.
//!
//! This module provides TOML-based configuration file loading with the following features:
//! - Forward-compatible: unknown fields are ignored
//! - Graceful degradation: errors in the default file are logged but don't prevent a run
//! - Layered configuration: defaults < config file < command-line arguments

use ddp_validator_harness::{DriverTimings, LaunchConfig};
use etcetera::BaseStrategy;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::args::CommandLineArgs;
use crate::productinfo;

/// Root configuration structure.
///
/// All fields are optional to support forward compatibility and partial configuration.
/// Unknown fields in the TOML file are silently ignored.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timing parameters of the interactive driver.
    pub timings: TimingsConfig,

    /// Executables used to launch programs.
    pub launch: LaunchSettings,
}

/// Timing parameters, in milliseconds.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct TimingsConfig {
    /// Grace period after starting the program.
    #[serde(rename = "warmup-ms")]
    pub warmup_ms: Option<u64>,

    /// Quiet period taken to mean the program waits for input.
    #[serde(rename = "read-timeout-ms")]
    pub read_timeout_ms: Option<u64>,

    /// Longest tolerated silence from the program.
    #[serde(rename = "inactivity-ceiling-ms")]
    pub inactivity_ceiling_ms: Option<u64>,
}

/// Launch executables.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default)]
pub struct LaunchSettings {
    /// Interpreter for script programs.
    pub python: Option<PathBuf>,

    /// Runtime for compiled programs.
    pub java: Option<PathBuf>,
}

impl Config {
    /// Computes driver timings, with command-line values taking precedence over the
    /// file, and the file over defaults.
    #[must_use]
    pub fn to_timings(&self, args: &CommandLineArgs) -> DriverTimings {
        let defaults = DriverTimings::default();
        let pick = |cli: Option<u64>, file: Option<u64>, default: Duration| {
            cli.or(file).map_or(default, Duration::from_millis)
        };

        DriverTimings::default()
            .with_warmup(pick(args.warmup_ms, self.timings.warmup_ms, defaults.warmup))
            .with_read_timeout(pick(
                args.read_timeout_ms,
                self.timings.read_timeout_ms,
                defaults.read_timeout,
            ))
            .with_inactivity_ceiling(pick(
                args.inactivity_ceiling_ms,
                self.timings.inactivity_ceiling_ms,
                defaults.inactivity_ceiling,
            ))
    }

    /// Computes the launch executables, with the same precedence as [`Self::to_timings`].
    #[must_use]
    pub fn to_launch(&self, args: &CommandLineArgs) -> LaunchConfig {
        let defaults = LaunchConfig::default();

        LaunchConfig {
            python: args
                .python
                .clone()
                .or_else(|| self.launch.python.clone())
                .unwrap_or(defaults.python),
            java: args
                .java
                .clone()
                .or_else(|| self.launch.java.clone())
                .unwrap_or(defaults.java),
        }
    }
}

/// Result of attempting to load a configuration file.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration, or default if loading failed.
    pub config: Config,

    /// The path that was used (or attempted) for loading.
    pub path: Option<PathBuf>,

    /// Any error that occurred during loading.
    pub error: Option<ConfigLoadError>,

    /// Whether the path was explicitly provided by the user (via `--config`).
    /// If true and there's an error, the run should fail rather than continue.
    pub explicit_path: bool,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the TOML content.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Returns the default configuration file path for the current platform.
///
/// Returns `None` if the platform's config directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(
        strategy
            .config_dir()
            .join(productinfo::PRODUCT_NAME)
            .join("config.toml"),
    )
}

/// Loads configuration from the specified path.
pub fn load_from_path(path: &Path) -> ConfigLoadResult {
    let loaded = std::fs::read_to_string(path)
        .map_err(ConfigLoadError::from)
        .and_then(|content| toml::from_str::<Config>(&content).map_err(ConfigLoadError::from));

    let (config, error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    ConfigLoadResult {
        config,
        path: Some(path.to_path_buf()),
        error,
        explicit_path: false,
    }
}

/// Loads configuration based on the provided options.
///
/// # Arguments
///
/// * `disabled` - If true, skip loading and return defaults
/// * `explicit_path` - If provided, use this path instead of the default
pub fn load_config(disabled: bool, explicit_path: Option<&Path>) -> ConfigLoadResult {
    let defaults = |path: Option<PathBuf>| ConfigLoadResult {
        config: Config::default(),
        path,
        error: None,
        explicit_path: false,
    };

    if disabled {
        return defaults(None);
    }

    let is_explicit = explicit_path.is_some();

    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            // Can't determine config path; use defaults silently
            None => return defaults(None),
        },
    };

    // If using default path and file doesn't exist, silently use defaults
    if !is_explicit && !path.exists() {
        return defaults(Some(path));
    }

    let mut result = load_from_path(&path);
    result.explicit_path = is_explicit;
    result
}
