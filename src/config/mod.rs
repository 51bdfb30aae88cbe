//! Configuration management.
//!
//! This module handles:
//! - Environment variable loading
//! - Configuration validation
//! - Default value handling for every hand-tuned threshold
//!
//! # Example
//!
//! ```
//! use deep_thinking::config::{BudgetConfig, Config, LogFormat};
//!
//! // Create a config directly (use Config::from_env() in production)
//! let config = Config {
//!     budget: BudgetConfig {
//!         provider_max_tokens: 4096,
//!         ..BudgetConfig::default()
//!     },
//!     ..Config::default()
//! };
//!
//! assert_eq!(config.logging.format, LogFormat::Pretty);
//! assert!(deep_thinking::config::validate_config(&config).is_ok());
//! ```

mod tuning;
mod validation;

pub use tuning::{
    BudgetConfig, DepthPolicy, FactorWeights, ModeEstimate, ModeEstimates, ModeThresholds,
    SearchConfig,
};
pub use validation::{
    validate_config, AGGRESSIVE_RANGE, BALANCED_RANGE, CONSERVATIVE_RANGE, MIN_CEILING,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                var: "LOG_FORMAT".into(),
                reason: "must be 'pretty' or 'json'".into(),
            }),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (error, warn, info, debug, trace, or a full `EnvFilter`).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.into(),
            format: LogFormat::Pretty,
        }
    }
}

/// Application configuration.
///
/// Use [`Config::from_env`] to load configuration from environment variables.
/// Thresholds that have no environment variable can still be overridden by
/// constructing the struct directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Logging setup.
    pub logging: LoggingConfig,
    /// `SQLite` chain store path, opened by
    /// [`OrchestratorBuilder::build_with_store`](crate::orchestrator::OrchestratorBuilder::build_with_store).
    /// Persistence is disabled when unset.
    pub database_path: Option<String>,
    /// Token budget settings.
    pub budget: BudgetConfig,
    /// Path search settings.
    pub search: SearchConfig,
    /// Search depth per mode.
    pub depth: DepthPolicy,
    /// Mode selection rules.
    pub thresholds: ModeThresholds,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables (with defaults):
    /// - `LOG_LEVEL`: Logging level (default: `info`)
    /// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
    /// - `DATABASE_PATH`: Path to `SQLite` database (default: unset)
    /// - `PROVIDER_MAX_TOKENS`: Provider token ceiling (default: `8192`)
    /// - `TOKEN_SAFETY_MARGIN`: Usable fraction of the ceiling (default: `0.9`)
    /// - `BUDGET_CONSERVATIVE_BASE`: (default: `2500`)
    /// - `BUDGET_BALANCED_BASE`: (default: `4000`)
    /// - `BUDGET_AGGRESSIVE_BASE`: (default: `6500`)
    /// - `SEARCH_MAX_ITERATIONS`: (default: `10`)
    /// - `SEARCH_EXPANSION_WIDTH`: (default: `1`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - A numeric variable does not parse
    /// - `LOG_FORMAT` is not recognised
    /// - Any value fails validation (see [`validate_config`])
    #[must_use = "configuration should be used"]
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let defaults = BudgetConfig::default();
        let search_defaults = SearchConfig::default();

        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into());
        let format = std::env::var("LOG_FORMAT")
            .map_or(Ok(LogFormat::default()), |val| val.parse::<LogFormat>())?;

        let database_path = std::env::var("DATABASE_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty());

        let budget = BudgetConfig {
            provider_max_tokens: parse_env_u32("PROVIDER_MAX_TOKENS", defaults.provider_max_tokens)?,
            safety_margin: parse_env_f64("TOKEN_SAFETY_MARGIN", defaults.safety_margin)?,
            conservative_base: parse_env_u32(
                "BUDGET_CONSERVATIVE_BASE",
                defaults.conservative_base,
            )?,
            balanced_base: parse_env_u32("BUDGET_BALANCED_BASE", defaults.balanced_base)?,
            aggressive_base: parse_env_u32("BUDGET_AGGRESSIVE_BASE", defaults.aggressive_base)?,
            ..defaults
        };

        let search = SearchConfig {
            max_iterations: parse_env_usize(
                "SEARCH_MAX_ITERATIONS",
                search_defaults.max_iterations,
            )?,
            expansion_width: parse_env_usize(
                "SEARCH_EXPANSION_WIDTH",
                search_defaults.expansion_width,
            )?,
            ..search_defaults
        };

        let config = Self {
            logging: LoggingConfig { level, format },
            database_path,
            budget,
            search,
            depth: DepthPolicy::default(),
            thresholds: ModeThresholds::default(),
        };

        validate_config(&config)?;
        Ok(config)
    }
}

/// Parse an environment variable as u32, using a default if not set.
fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    std::env::var(name).map_or(Ok(default), |val| {
        val.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a positive integer".into(),
        })
    })
}

/// Parse an environment variable as usize, using a default if not set.
fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    std::env::var(name).map_or(Ok(default), |val| {
        val.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a positive integer".into(),
        })
    })
}

/// Parse an environment variable as f64, using a default if not set.
fn parse_env_f64(name: &str, default: f64) -> Result<f64, ConfigError> {
    std::env::var(name).map_or(Ok(default), |val| {
        val.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a number".into(),
        })
    })
}
