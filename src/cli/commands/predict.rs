//! `qcast predict` command - full prediction for a product request

use chrono::{DateTime, Utc};
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::helpers::{format_limit, read_input, status_style, Context};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::viz;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, PredictionOrchestrator, PredictionRequest, TestSample};
use crate::entities::{FormulaIngredient, PredictionReport, ProcessParameters, TestStatus};
use crate::yaml::parse_yaml;

#[derive(clap::Args, Debug)]
pub struct PredictArgs {
    /// Request file (YAML or JSON), `-` to read stdin
    pub request: PathBuf,

    /// Monte Carlo iterations per test (overrides the request file and config)
    #[arg(long, short = 'n')]
    pub iterations: Option<u32>,

    /// Random seed (overrides the request file and config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Show an ASCII histogram of each test's simulated distribution
    #[arg(long, short = 'H')]
    pub histogram: bool,

    /// Number of histogram bins
    #[arg(long, default_value = "40", value_parser = clap::value_parser!(u32).range(1..=500))]
    pub bins: u32,

    /// Output raw Monte Carlo samples as CSV (for external analysis)
    #[arg(long)]
    pub csv: bool,
}

/// Request document as written by users
#[derive(Debug, Clone, Deserialize)]
pub struct RequestFile {
    #[serde(default)]
    pub project_id: Option<String>,
    pub product_name: String,
    pub factory: String,
    #[serde(default)]
    pub formula: Vec<FormulaIngredient>,
    pub process_parameters: ProcessParameters,
    #[serde(default)]
    pub iterations: Option<u32>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RequestFile {
    /// Resolve iterations and seed: command line, then file, then config
    pub fn into_request(
        self,
        iterations: Option<u32>,
        seed: Option<u64>,
        config: &Config,
    ) -> (PredictionRequest, Option<String>) {
        let request = PredictionRequest {
            product_name: self.product_name,
            factory: self.factory,
            formula: self.formula,
            process_parameters: self.process_parameters,
            iterations: iterations.or(self.iterations).unwrap_or(config.iterations),
            seed: seed.or(self.seed).unwrap_or(config.seed),
        };
        (request, self.project_id)
    }
}

/// Report plus run metadata
#[derive(Debug, Serialize)]
pub struct PredictionEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub model_version: String,
    pub prediction_timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub report: PredictionReport,
}

#[derive(Tabled)]
struct VerdictRow {
    #[tabled(rename = "TEST")]
    test: String,
    #[tabled(rename = "PREDICTED")]
    predicted: String,
    #[tabled(rename = "LIMIT")]
    limit: String,
    #[tabled(rename = "P(FAIL)")]
    probability: String,
    #[tabled(rename = "CI")]
    interval: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

pub fn run(args: PredictArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let (content, name) = read_input(&args.request)?;
    let file: RequestFile = parse_yaml(&content, &name)?;
    let (request, project_id) = file.into_request(args.iterations, args.seed, &ctx.config);

    let orchestrator = PredictionOrchestrator::from_config(ctx.reference, &ctx.config);
    let (report, samples) = if args.histogram || args.csv {
        orchestrator.predict_with_samples(&request)?
    } else {
        (orchestrator.predict(&request)?, Vec::new())
    };

    if args.csv {
        return write_csv(&samples);
    }

    let envelope = PredictionEnvelope {
        project_id,
        model_version: orchestrator.model_version(&request.product_name)?,
        prediction_timestamp: Utc::now(),
        report,
    };

    let format = effective_format(global.format);
    let structured = print_structured(&envelope, format)?;
    if !structured {
        print_report(&envelope);
    }

    if args.histogram {
        for sample in &samples {
            let chart = format!(
                "\n   {}\n{}",
                style(&sample.test_key).bold(),
                viz::render_histogram(
                    sample.sample.values(),
                    args.bins as usize,
                    sample.spec_limit.map(|l| (l, sample.limit_type)),
                )
            );
            // keep structured stdout parseable
            if format == OutputFormat::Table {
                println!("{}", chart);
            } else {
                eprintln!("{}", chart);
            }
        }
    }

    Ok(())
}

fn write_csv(samples: &[TestSample]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    wtr.write_record(["test", "sample", "value", "in_spec"])
        .into_diagnostic()?;

    for sample in samples {
        for (i, value) in sample.sample.values().iter().enumerate() {
            let in_spec = sample
                .spec_limit
                .map(|l| !sample.limit_type.is_violated(*value, l))
                .unwrap_or(true);
            wtr.write_record([
                sample.test_key.clone(),
                (i + 1).to_string(),
                format!("{:.6}", value),
                if in_spec { "1" } else { "0" }.to_string(),
            ])
            .into_diagnostic()?;
        }
    }
    wtr.flush().into_diagnostic()?;
    Ok(())
}

fn print_report(envelope: &PredictionEnvelope) {
    let report = &envelope.report;

    println!(
        "{} {} @ {}  ({} iterations, seed {})",
        style("⚙").cyan(),
        style(&report.product_name).cyan().bold(),
        report.factory,
        report.iterations,
        report.seed
    );

    let rows: Vec<VerdictRow> = report
        .test_predictions
        .iter()
        .map(|v| VerdictRow {
            test: v.test_name.clone(),
            predicted: format!("{:.2} {}", v.predicted_value, v.unit),
            limit: format_limit(v.spec_limit),
            probability: format!("{:.1}%", v.probability_of_fail * 100.0),
            interval: format!(
                "[{:.2}, {:.2}]",
                v.confidence_interval[0], v.confidence_interval[1]
            ),
            status: v.status.to_string(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));

    let risk = report.overall_risk_score;
    let risk_label = if risk > 30.0 {
        style(format!("{:.1}", risk)).red().bold()
    } else if risk > 10.0 {
        style(format!("{:.1}", risk)).yellow()
    } else {
        style(format!("{:.1}", risk)).green()
    };
    println!(
        "   Overall risk: {} ({})   {} {}  {} {}  {} {}",
        risk_label,
        report.risk_policy,
        status_style(TestStatus::Pass),
        report.count_status(TestStatus::Pass),
        status_style(TestStatus::Warning),
        report.count_status(TestStatus::Warning),
        status_style(TestStatus::Fail),
        report.count_status(TestStatus::Fail),
    );

    println!();
    println!("   {}", style("Recommendations:").bold());
    for rec in &report.recommendations {
        println!("     • {}", rec);
    }

    let explanation = &report.explanation;
    if !explanation.top_positive_factors.is_empty() {
        println!();
        println!("   {}", style("Key factors:").bold());
        for factor in &explanation.top_positive_factors {
            println!("     {} {}", style("▲").red(), factor);
        }
        for factor in &explanation.top_negative_factors {
            println!("     {} {}", style("▼").green(), factor);
        }
    }

    println!();
    println!(
        "   {} model {} at {}",
        style("Generated by").dim(),
        envelope.model_version,
        envelope.prediction_timestamp.to_rfc3339()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str = r#"
project_id: PRJ-7
product_name: Nescau
factory: Araraquara - SP
formula:
  - name: Cocoa
    percentage: 20
process_parameters:
  temperature: 75
  mixing_time: 15
  line_speed: 90
seed: 9
"#;

    #[test]
    fn test_request_resolution_order() {
        let config = Config::default();
        let file: RequestFile = parse_yaml(REQUEST, "req.yaml").unwrap();

        let (request, project) = file.clone().into_request(None, None, &config);
        assert_eq!(project.as_deref(), Some("PRJ-7"));
        assert_eq!(request.seed, 9);
        assert_eq!(request.iterations, config.iterations);

        let (request, _) = file.into_request(Some(2_000), Some(1), &config);
        assert_eq!(request.iterations, 2_000);
        assert_eq!(request.seed, 1);
    }

    #[test]
    fn test_json_request() {
        let json = r#"{"product_name": "Ninho", "factory": "X",
            "process_parameters": {"temperature": 70, "mixing_time": 12, "line_speed": 80}}"#;
        let file: RequestFile = parse_yaml(json, "req.json").unwrap();
        assert!(file.formula.is_empty());
        assert!(file.project_id.is_none());
    }
}
