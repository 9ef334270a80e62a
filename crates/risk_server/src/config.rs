//! Server configuration management
//!
//! Handles loading configuration from TOML files, environment variables, and CLI arguments.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use risk_engine::{PortfolioAggregator, RunBudget, SimulationConfig, MAX_SIMULATION_RUNS};

/// Environment variable names
pub mod env_vars {
    /// Bind address
    pub const HOST: &str = "RISK_SERVER_HOST";
    /// Listen port
    pub const PORT: &str = "RISK_SERVER_PORT";
    /// Log level
    pub const LOG_LEVEL: &str = "RISK_LOG_LEVEL";
    /// Per-request time budget in milliseconds
    pub const SIMULATION_TIMEOUT_MS: &str = "RISK_SIMULATION_TIMEOUT_MS";
    /// Per-request trial budget
    pub const MAX_SIMULATION_RUNS: &str = "RISK_MAX_SIMULATION_RUNS";
    /// Dedicated simulation pool size
    pub const WORKER_THREADS: &str = "RISK_WORKER_THREADS";
    /// Deployment environment
    pub const ENV: &str = "RISK_ENV";
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port number: {0}. Must be between 1 and 65535")]
    InvalidPort(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid environment: {0}. Must be one of: development, staging, production")]
    InvalidEnvironment(String),

    #[error("Invalid simulation setting {name}: {reason}")]
    InvalidSimulation { name: &'static str, reason: String },

    #[error("Configuration file error: {0}")]
    FileError(String),
}

/// Log levels supported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Server configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Log level
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    /// Environment (development, staging, production)
    #[serde(deserialize_with = "deserialize_environment")]
    pub environment: Environment,
    /// Wall-clock budget for one aggregation, in milliseconds
    pub simulation_timeout_ms: u64,
    /// Largest trial count a request may ask for
    pub max_simulation_runs: usize,
    /// Correlation for same-group risks without an explicit edge
    pub default_group_correlation: f64,
    /// Dedicated simulation pool size; rayon's global pool when unset
    pub worker_threads: Option<usize>,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

fn deserialize_environment<'de, D>(deserializer: D) -> Result<Environment, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Environment::from_str(&s).map_err(serde::de::Error::custom)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: LogLevel::Info,
            environment: Environment::Development,
            simulation_timeout_ms: 30_000,
            max_simulation_runs: MAX_SIMULATION_RUNS,
            default_group_correlation: risk_engine::config::DEFAULT_GROUP_CORRELATION,
            worker_threads: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;

        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Override fields from process environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Override fields from `lookup`, which maps a variable name to its value
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(env_vars::HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(env_vars::PORT) {
            self.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }
        if let Some(level) = lookup(env_vars::LOG_LEVEL) {
            self.log_level = LogLevel::from_str(&level)?;
        }
        if let Some(ms) = lookup(env_vars::SIMULATION_TIMEOUT_MS) {
            self.simulation_timeout_ms =
                ms.parse().map_err(|_| ConfigError::InvalidSimulation {
                    name: "simulation_timeout_ms",
                    reason: format!("'{}' is not a whole number of milliseconds", ms),
                })?;
        }
        if let Some(runs) = lookup(env_vars::MAX_SIMULATION_RUNS) {
            self.max_simulation_runs =
                runs.parse().map_err(|_| ConfigError::InvalidSimulation {
                    name: "max_simulation_runs",
                    reason: format!("'{}' is not a trial count", runs),
                })?;
        }
        if let Some(threads) = lookup(env_vars::WORKER_THREADS) {
            self.worker_threads =
                Some(threads.parse().map_err(|_| ConfigError::InvalidSimulation {
                    name: "worker_threads",
                    reason: format!("'{}' is not a thread count", threads),
                })?);
        }
        if let Some(env) = lookup(env_vars::ENV) {
            self.environment = Environment::from_str(&env)?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port.to_string()));
        }
        if self.simulation_timeout_ms == 0 {
            return Err(ConfigError::InvalidSimulation {
                name: "simulation_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.max_simulation_runs == 0 || self.max_simulation_runs > MAX_SIMULATION_RUNS {
            return Err(ConfigError::InvalidSimulation {
                name: "max_simulation_runs",
                reason: format!("must be in [1, {}]", MAX_SIMULATION_RUNS),
            });
        }
        self.simulation_config().map(|_| ())
    }

    /// Engine configuration derived from the server settings
    ///
    /// Requests inherit the engine defaults for trial count and confidence
    /// levels; the budget caps what they may ask for.
    pub fn simulation_config(&self) -> Result<SimulationConfig, ConfigError> {
        let budget = RunBudget::unlimited()
            .with_max_trials(self.max_simulation_runs)
            .with_max_duration(Duration::from_millis(self.simulation_timeout_ms));

        let mut builder = SimulationConfig::builder()
            .default_group_correlation(self.default_group_correlation)
            .budget(budget);
        if let Some(threads) = self.worker_threads {
            builder = builder.worker_threads(threads);
        }

        builder
            .build()
            .map_err(|e| ConfigError::InvalidSimulation {
                name: "simulation",
                reason: e.to_string(),
            })
    }

    /// Aggregator configured from the server settings, with its worker pool
    /// already running
    pub fn aggregator(&self) -> Result<PortfolioAggregator, ConfigError> {
        PortfolioAggregator::try_new(self.simulation_config()?).map_err(|e| {
            ConfigError::InvalidSimulation {
                name: "worker_threads",
                reason: e.to_string(),
            }
        })
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = LogLevel::from_str(log_level)?;
        }
        if let Some(threads) = cli.worker_threads {
            self.worker_threads = Some(threads);
        }
        Ok(())
    }
}

/// CLI arguments structure
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Host address override
    pub host: Option<String>,
    /// Port override
    pub port: Option<u16>,
    /// Log level override
    pub log_level: Option<String>,
    /// Worker pool override
    pub worker_threads: Option<usize>,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
pub fn build_config(cli: &CliArgs) -> Result<ServerConfig, ConfigError> {
    let mut config = match &cli.config_file {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    config.apply_env()?;
    config.merge_with_cli(cli)?;
    config.validate()?;

    Ok(config)
}
