//! Engine defaults loaded from an optional TOML file.
//!
//! ```toml
//! simulation_runs = 20000
//! confidence_levels = [0.9, 0.95, 0.99]
//! default_group_correlation = 0.15
//! worker_threads = 4
//! ```

use std::path::Path;

use risk_engine::{RunBudget, SimulationConfig};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{CliError, Result};

/// Engine defaults. Unset fields keep the engine's own defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Trials per run
    pub simulation_runs: Option<usize>,
    /// VaR / ES confidence levels
    pub confidence_levels: Option<Vec<f64>>,
    /// Fixed seed
    pub seed: Option<u64>,
    /// Correlation for same-group risks without an explicit edge
    pub default_group_correlation: Option<f64>,
    /// Dedicated worker pool size
    pub worker_threads: Option<usize>,
    /// Trials per batch
    pub batch_size: Option<usize>,
    /// Wall-clock budget per run
    pub timeout_ms: Option<u64>,
}

impl CliConfig {
    /// Loads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            CliError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Engine configuration with these defaults applied.
    pub fn simulation_config(&self) -> Result<SimulationConfig> {
        let mut builder = SimulationConfig::builder().maybe_seed(self.seed);
        if let Some(runs) = self.simulation_runs {
            builder = builder.simulation_runs(runs);
        }
        if let Some(levels) = &self.confidence_levels {
            builder = builder.confidence_levels(levels.clone());
        }
        if let Some(rho) = self.default_group_correlation {
            builder = builder.default_group_correlation(rho);
        }
        if let Some(threads) = self.worker_threads {
            builder = builder.worker_threads(threads);
        }
        if let Some(batch_size) = self.batch_size {
            builder = builder.batch_size(batch_size);
        }
        if let Some(ms) = self.timeout_ms {
            builder =
                builder.budget(RunBudget::unlimited().with_max_duration(Duration::from_millis(ms)));
        }

        builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = CliConfig::load(Path::new("/nonexistent/riskagg.toml")).unwrap();
        assert_eq!(config, CliConfig::default());

        let sim = config.simulation_config().unwrap();
        assert_eq!(sim.simulation_runs(), risk_engine::DEFAULT_SIMULATION_RUNS);
        assert_eq!(sim.confidence_levels(), &[0.95, 0.99]);
    }

    #[test]
    fn test_load_applies_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "simulation_runs = 2500\nconfidence_levels = [0.99, 0.9]\nworker_threads = 2\ntimeout_ms = 500"
        )
        .unwrap();

        let config = CliConfig::load(file.path()).unwrap();
        let sim = config.simulation_config().unwrap();
        assert_eq!(sim.simulation_runs(), 2_500);
        assert_eq!(sim.confidence_levels(), &[0.9, 0.99]);
        assert_eq!(sim.worker_threads(), Some(2));
        assert_eq!(sim.budget().max_duration(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "simulation_rusn = 10").unwrap();

        let err = CliConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = CliConfig {
            confidence_levels: Some(vec![1.5]),
            ..Default::default()
        };
        assert!(matches!(
            config.simulation_config(),
            Err(CliError::Config(_))
        ));
    }
}
