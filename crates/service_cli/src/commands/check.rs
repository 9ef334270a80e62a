//! Check command implementation
//!
//! Prints the build version, the worker pool the engine would use and the
//! limits a run is subject to.

use risk_engine::MAX_SIMULATION_RUNS;
use tracing::info;

use crate::config::CliConfig;
use crate::Result;

/// Run the check command
pub fn run(config: &CliConfig) -> Result<()> {
    info!("Checking configuration...");
    print!("{}", summary(config)?);
    info!("Check complete");
    Ok(())
}

fn summary(config: &CliConfig) -> Result<String> {
    let sim = config.simulation_config()?;
    let worker_threads = sim.worker_threads().unwrap_or_else(num_cpus::get);
    let timeout = sim
        .budget()
        .max_duration()
        .map_or_else(|| "none".to_string(), |d| format!("{} ms", d.as_millis()));
    let levels: Vec<String> = sim
        .confidence_levels()
        .iter()
        .map(|p| p.to_string())
        .collect();

    Ok(format!(
        "riskagg {}\n\
         Logical CPUs:          {}\n\
         Worker threads:        {}\n\
         Simulation runs:       {}\n\
         Max simulation runs:   {}\n\
         Confidence levels:     {}\n\
         Group correlation:     {}\n\
         Batch size:            {}\n\
         Time budget:           {}\n",
        env!("CARGO_PKG_VERSION"),
        num_cpus::get(),
        worker_threads,
        sim.simulation_runs(),
        MAX_SIMULATION_RUNS,
        levels.join(", "),
        sim.default_group_correlation(),
        sim.batch_size(),
        timeout,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_reports_limits() {
        let text = summary(&CliConfig::default()).unwrap();
        assert!(text.starts_with("riskagg "));
        assert!(text.contains("Max simulation runs:   1000000"));
        assert!(text.contains("Confidence levels:     0.95, 0.99"));
        assert!(text.contains("Time budget:           none"));
    }

    #[test]
    fn test_summary_uses_configured_pool() {
        let config = CliConfig {
            worker_threads: Some(3),
            timeout_ms: Some(1_500),
            ..Default::default()
        };
        let text = summary(&config).unwrap();
        assert!(text.contains("Worker threads:        3\n"));
        assert!(text.contains("Time budget:           1500 ms"));
    }
}
