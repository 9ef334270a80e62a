//! Aggregate command implementation
//!
//! Reads an aggregation request from JSON, runs it through the engine and
//! renders the report as a table, JSON or CSV.

use std::path::PathBuf;
use std::str::FromStr;

use risk_engine::{AggregationReport, AggregationRequest, PortfolioAggregator};
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::info;

use crate::config::CliConfig;
use crate::{CliError, Result};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(CliError::InvalidArgument(format!(
                "Unknown format: {}. Supported: json, csv, table",
                other
            ))),
        }
    }
}

/// Arguments of `riskagg aggregate`
#[derive(Debug, Clone)]
pub struct AggregateArgs {
    pub input: PathBuf,
    pub runs: Option<usize>,
    pub seed: Option<u64>,
    pub confidence_levels: Option<Vec<f64>>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

/// Run the aggregate command
pub fn run(config: &CliConfig, args: &AggregateArgs) -> Result<()> {
    info!("Starting aggregation...");
    info!("  Input: {}", args.input.display());

    let request = load_request(args)?;
    info!(
        "  Risks: {}, correlation edges: {}",
        request.portfolio.risk_count(),
        request.portfolio.correlations.len()
    );

    let aggregator = PortfolioAggregator::try_new(config.simulation_config()?)?;
    let report = aggregator.aggregate(&request)?;

    let rendered = render(&report, args.format)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            info!("Report written to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    info!("Aggregation complete");
    Ok(())
}

/// Reads the request file and applies command-line overrides.
fn load_request(args: &AggregateArgs) -> Result<AggregationRequest> {
    if !args.input.exists() {
        return Err(CliError::FileNotFound(args.input.display().to_string()));
    }

    let content = std::fs::read_to_string(&args.input)?;
    let mut request: AggregationRequest =
        serde_json::from_str(&content).map_err(|source| CliError::Input {
            path: args.input.display().to_string(),
            source,
        })?;

    if args.runs.is_some() {
        request.simulation_runs = args.runs;
    }
    if args.seed.is_some() {
        request.seed = args.seed;
    }
    if args.confidence_levels.is_some() {
        request.confidence_levels = args.confidence_levels.clone();
    }
    Ok(request)
}

/// Renders a report in the requested format.
pub fn render(report: &AggregationReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Csv => render_csv(report),
        OutputFormat::Table => Ok(render_table(report)),
    }
}

/// One CSV row per risk.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContributionRow<'a> {
    risk_id: &'a str,
    risk_title: &'a str,
    weight: f64,
    standalone_ale: f64,
    weighted_standalone_ale: f64,
    marginal_contribution: f64,
    component_contribution: f64,
    percentage_contribution: f64,
    severity_band: &'static str,
}

fn render_csv(report: &AggregationReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for c in &report.contributions {
        wtr.serialize(ContributionRow {
            risk_id: c.risk_id.as_str(),
            risk_title: c.risk_title.as_deref().unwrap_or(""),
            weight: c.weight,
            standalone_ale: c.standalone_ale,
            weighted_standalone_ale: c.weighted_standalone_ale,
            marginal_contribution: c.marginal_contribution,
            component_contribution: c.component_contribution,
            percentage_contribution: c.percentage_contribution,
            severity_band: c.severity_band.name(),
        })?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| CliError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CliError::Serialization(e.to_string()))
}

/// One line of the summary table.
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl MetricRow {
    fn new(metric: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            value: value.into(),
        }
    }
}

/// One line of the contribution table.
#[derive(Tabled)]
struct ContributionTableRow {
    #[tabled(rename = "Risk ID")]
    risk_id: String,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "ALE")]
    ale: String,
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Marginal")]
    marginal: String,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Severity")]
    severity: &'static str,
}

fn render_table(report: &AggregationReport) -> String {
    let result = &report.result;
    let diagnostics = &report.diagnostics;

    let mut summary = vec![
        MetricRow::new(
            "Portfolio",
            report.portfolio_name.as_deref().unwrap_or("(unnamed)"),
        ),
        MetricRow::new("Risks", diagnostics.risk_count.to_string()),
        MetricRow::new("Trials", result.simulation_runs.to_string()),
        MetricRow::new("Seed", diagnostics.seed.to_string()),
        MetricRow::new("Individual ALE sum", money(result.individual_ale_sum)),
        MetricRow::new("Diversified ALE", money(result.diversified_ale)),
        MetricRow::new(
            "Diversification ratio",
            result
                .diversification_ratio
                .map_or_else(|| "n/a".to_string(), |r| format!("{:.4}", r)),
        ),
        MetricRow::new("Concentration index", format!("{:.4}", result.concentration_index)),
    ];
    for tail in &result.tail_metrics {
        let pct = (tail.confidence_level * 1_000.0).round() / 10.0;
        summary.push(MetricRow::new(format!("VaR {}%", pct), money(tail.value_at_risk)));
        summary.push(MetricRow::new(format!("ES {}%", pct), money(tail.expected_shortfall)));
    }
    summary.push(MetricRow::new("Appetite", report.appetite.status.name()));
    summary.push(MetricRow::new(
        "Matrix regularised",
        if diagnostics.correlation_matrix_was_regularized {
            "yes"
        } else {
            "no"
        },
    ));

    let contributions = report.contributions.iter().map(|c| ContributionTableRow {
        risk_id: c.risk_id.to_string(),
        weight: format!("{:.4}", c.weight),
        ale: money(c.standalone_ale),
        component: money(c.component_contribution),
        marginal: money(c.marginal_contribution),
        share: format!("{:.1}%", c.percentage_contribution * 100.0),
        severity: c.severity_band.name(),
    });

    let summary = Table::new(summary)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::left()))
        .to_string();
    let contributions = Table::new(contributions)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..6)).with(Alignment::right()))
        .to_string();

    format!("{}\n\n{}\n", summary, contributions)
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const REQUEST: &str = r#"{
        "name": "Retail",
        "riskTolerance": 500000,
        "riskItems": [
            { "riskId": "FRAUD", "riskTitle": "Card fraud", "weight": 3, "lossMin": 1000, "lossMostLikely": 8000, "lossMax": 40000 },
            { "riskId": "OUTAGE", "weight": 1, "lossMin": 0, "lossMostLikely": 3000, "lossMax": 25000 }
        ],
        "correlations": [
            { "riskIdA": "FRAUD", "riskIdB": "OUTAGE", "coefficient": 0.3 }
        ],
        "simulationRuns": 50000
    }"#;

    fn request_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(REQUEST.as_bytes()).unwrap();
        file
    }

    fn args(input: PathBuf, format: OutputFormat) -> AggregateArgs {
        AggregateArgs {
            input,
            runs: Some(1_000),
            seed: Some(17),
            confidence_levels: None,
            format,
            output: None,
        }
    }

    fn report() -> AggregationReport {
        let file = request_file();
        let request = load_request(&args(file.path().to_path_buf(), OutputFormat::Json)).unwrap();
        PortfolioAggregator::default().aggregate(&request).unwrap()
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!(matches!(
            "xml".parse::<OutputFormat>(),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_flags_override_request_file() {
        let file = request_file();
        let mut a = args(file.path().to_path_buf(), OutputFormat::Json);
        a.confidence_levels = Some(vec![0.9]);

        let request = load_request(&a).unwrap();
        assert_eq!(request.simulation_runs, Some(1_000));
        assert_eq!(request.seed, Some(17));
        assert_eq!(request.confidence_levels, Some(vec![0.9]));
        assert_eq!(request.portfolio.name.as_deref(), Some("Retail"));
    }

    #[test]
    fn test_missing_input_is_reported() {
        let a = args(PathBuf::from("/nonexistent/request.json"), OutputFormat::Table);
        assert!(matches!(load_request(&a), Err(CliError::FileNotFound(_))));
    }

    #[test]
    fn test_malformed_input_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ \"riskItems\": 7 }").unwrap();

        let a = args(file.path().to_path_buf(), OutputFormat::Table);
        assert!(matches!(load_request(&a), Err(CliError::Input { .. })));
    }

    #[test]
    fn test_json_output_parses_back() {
        let report = report();
        let json = render(&report, OutputFormat::Json).unwrap();
        let parsed: AggregationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.diagnostics.seed, 17);
        assert_eq!(parsed.contributions, report.contributions);
    }

    #[test]
    fn test_csv_has_one_row_per_risk() {
        let csv = render(&report(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("riskId,riskTitle,weight,"));
        assert!(lines[1].starts_with("FRAUD,Card fraud,0.75,"));
        assert!(lines[2].starts_with("OUTAGE,,0.25,"));
    }

    #[test]
    fn test_table_lists_metrics_and_risks() {
        let table = render(&report(), OutputFormat::Table).unwrap();

        assert!(table.contains("Retail"));
        assert!(table.contains("VaR 95%"));
        assert!(table.contains("ES 99%"));
        assert!(table.contains("FRAUD"));
        assert!(table.contains("OUTAGE"));
        assert!(table.contains("Within appetite"));
        assert!(table.contains("Risk ID"));
        assert!(table.contains("Severity"));
        assert!(table.starts_with('╭'));

        // Every line of the summary table has the same display width.
        let widths: Vec<usize> = table
            .lines()
            .take_while(|l| !l.is_empty())
            .map(|l| l.chars().count())
            .collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_run_writes_output_file() {
        let file = request_file();
        let out = tempfile::NamedTempFile::new().unwrap();
        let mut a = args(file.path().to_path_buf(), OutputFormat::Csv);
        a.output = Some(out.path().to_path_buf());

        run(&CliConfig::default(), &a).unwrap();

        let written = std::fs::read_to_string(out.path()).unwrap();
        assert!(written.starts_with("riskId,"));
    }
}
