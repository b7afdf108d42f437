//! TOML Configuration File Support
//!
//! Centralized configuration loading for the search client, supporting a TOML
//! configuration file at `~/.config/photo-search/search.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [service]
//! url = "http://localhost:5001"
//! timeout_ms = 30000
//!
//! [timeline]
//! step_stagger_ms = 1800
//! activate_hold_ms = 1200
//! reveal_delay_ms = 500
//! settle_delay_ms = 10000
//! terminal_step = 5        # or "last"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reveal::TerminalStep;
use crate::timeline::TimelineTiming;

/// Service origin used when nothing else is configured
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5001";

/// Upper bound for stagger, hold and reveal delay
pub const MAX_STEP_DELAY: Duration = Duration::from_secs(60);

/// Upper bound for the settle delay
pub const MAX_SETTLE_DELAY: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Service section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceToml {
    /// Analysis service origin
    pub url: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// `terminal_step` accepts either a step id or the string `"last"`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TerminalStepToml {
    /// A fixed step id
    Id(u32),
    /// A keyword (only `"last"` is recognized)
    Keyword(String),
}

/// Timeline section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineToml {
    /// Offset between step activations in milliseconds
    pub step_stagger_ms: Option<u64>,

    /// Time a step stays active in milliseconds
    pub activate_hold_ms: Option<u64>,

    /// Delay between terminal completion and reveal in milliseconds
    pub reveal_delay_ms: Option<u64>,

    /// Minimum loading time in milliseconds
    pub settle_delay_ms: Option<u64>,

    /// Which step triggers the reveal
    pub terminal_step: Option<TerminalStepToml>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchToml {
    /// Service configuration section
    pub service: ServiceToml,

    /// Timeline configuration section
    pub timeline: TimelineToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Where and how to reach the analysis service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Service origin, e.g. `http://localhost:5001`
    pub url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVICE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Centralized configuration for the search client
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Service connection settings
    pub service: ServiceConfig,

    /// Timeline delays
    pub timing: TimelineTiming,

    /// Reveal trigger policy
    pub terminal_step: TerminalStep,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            timing: TimelineTiming::default(),
            terminal_step: TerminalStep::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl SearchConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that would make the client misbehave
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.service.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "service url must start with http:// or https://, got {url:?}"
            )));
        }
        if self.service.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "service timeout must be non-zero".to_string(),
            ));
        }
        if self.timing.step_stagger.is_zero() {
            return Err(ConfigError::ValidationError(
                "step_stagger_ms must be non-zero".to_string(),
            ));
        }
        if self.timing.activate_hold.is_zero() {
            return Err(ConfigError::ValidationError(
                "activate_hold_ms must be non-zero".to_string(),
            ));
        }
        for (name, value) in [
            ("step_stagger_ms", self.timing.step_stagger),
            ("activate_hold_ms", self.timing.activate_hold),
            ("reveal_delay_ms", self.timing.reveal_delay),
        ] {
            if value > MAX_STEP_DELAY {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be at most {} ms, got {} ms",
                    MAX_STEP_DELAY.as_millis(),
                    value.as_millis()
                )));
            }
        }
        if self.timing.settle_delay > MAX_SETTLE_DELAY {
            return Err(ConfigError::ValidationError(format!(
                "settle_delay_ms must be at most {} ms, got {} ms",
                MAX_SETTLE_DELAY.as_millis(),
                self.timing.settle_delay.as_millis()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/photo-search/search.toml` or
/// `~/.config/photo-search/search.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("photo-search").join("search.toml"))
}

/// Load configuration from all sources with proper priority
///
/// CLI overrides are not handled here; the caller applies
/// [`ConfigOverrides`] afterwards and should call
/// [`SearchConfig::validate`] once everything is merged.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<SearchConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<SearchConfig, ConfigError> {
    let mut config = SearchConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: SearchToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut SearchConfig, toml: &SearchToml) -> Result<(), ConfigError> {
    if let Some(ref url) = toml.service.url {
        config.service.url = url.clone();
    }
    if let Some(timeout) = toml.service.timeout_ms {
        config.service.timeout = Duration::from_millis(timeout);
    }

    if let Some(stagger) = toml.timeline.step_stagger_ms {
        config.timing.step_stagger = Duration::from_millis(stagger);
    }
    if let Some(hold) = toml.timeline.activate_hold_ms {
        config.timing.activate_hold = Duration::from_millis(hold);
    }
    if let Some(delay) = toml.timeline.reveal_delay_ms {
        config.timing.reveal_delay = Duration::from_millis(delay);
    }
    if let Some(delay) = toml.timeline.settle_delay_ms {
        config.timing.settle_delay = Duration::from_millis(delay);
    }
    match toml.timeline.terminal_step {
        Some(TerminalStepToml::Id(id)) => config.terminal_step = TerminalStep::FixedId(id),
        Some(TerminalStepToml::Keyword(ref word)) => {
            config.terminal_step = TerminalStep::parse(word).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "terminal_step must be a step id or \"last\", got {word:?}"
                ))
            })?;
        }
        None => {}
    }
    Ok(())
}

/// Apply environment variable overrides to the config
///
/// Unparseable values are ignored with a warning so a typo in the
/// environment never prevents startup.
fn apply_env_config<F>(config: &mut SearchConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("PHOTO_SEARCH_URL") {
        config.service.url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = lookup("PHOTO_SEARCH_TIMEOUT_MS") {
        match timeout.parse::<u64>() {
            Ok(ms) => {
                config.service.timeout = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %timeout, "Ignoring invalid PHOTO_SEARCH_TIMEOUT_MS"),
        }
    }
    if let Some(settle) = lookup("PHOTO_SEARCH_SETTLE_MS") {
        match settle.parse::<u64>() {
            Ok(ms) => {
                config.timing.settle_delay = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %settle, "Ignoring invalid PHOTO_SEARCH_SETTLE_MS"),
        }
    }
    if let Some(terminal) = lookup("PHOTO_SEARCH_TERMINAL_STEP") {
        match TerminalStep::parse(&terminal) {
            Some(step) => {
                config.terminal_step = step;
                config.source = ConfigSource::Env;
            }
            None => {
                tracing::warn!(value = %terminal, "Ignoring invalid PHOTO_SEARCH_TERMINAL_STEP");
            }
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Service url override
    pub url: Option<String>,

    /// Request timeout override (milliseconds)
    pub timeout_ms: Option<u64>,

    /// Settle delay override (milliseconds)
    pub settle_delay_ms: Option<u64>,

    /// Terminal step override
    pub terminal_step: Option<TerminalStep>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set service url override
    #[must_use]
    pub fn with_url(mut self, url: String) -> Self {
        self.url = Some(url);
        self
    }

    /// Set request timeout override
    #[must_use]
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Set settle delay override
    #[must_use]
    pub fn with_settle_delay_ms(mut self, ms: u64) -> Self {
        self.settle_delay_ms = Some(ms);
        self
    }

    /// Set terminal step override
    #[must_use]
    pub fn with_terminal_step(mut self, step: TerminalStep) -> Self {
        self.terminal_step = Some(step);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.timeout_ms.is_none()
            && self.settle_delay_ms.is_none()
            && self.terminal_step.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut SearchConfig) {
        if let Some(ref url) = self.url {
            config.service.url = url.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.service.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.settle_delay_ms {
            config.timing.settle_delay = Duration::from_millis(ms);
        }
        if let Some(step) = self.terminal_step {
            config.terminal_step = step;
        }
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }
    }
}
