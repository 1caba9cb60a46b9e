//! `qcast correlate` command - jointly simulate correlated process parameters

use console::style;
use miette::Result;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cli::helpers::{read_input, Context};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::GlobalOpts;
use crate::core::stats::round_to;
use crate::core::{MonteCarloEngine, SampleStats};
use crate::yaml::parse_yaml;

#[derive(clap::Args, Debug)]
pub struct CorrelateArgs {
    /// YAML file with `parameters` (name: baseline) and a `correlation` matrix
    pub file: PathBuf,

    /// Number of Monte Carlo iterations
    #[arg(long, short = 'n')]
    pub iterations: Option<u32>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CorrelationFile {
    /// Parameter name -> baseline, in matrix order
    pub parameters: serde_yml::Mapping,
    pub correlation: Vec<Vec<f64>>,
}

impl CorrelationFile {
    /// Ordered parameter baselines
    pub fn baselines(&self) -> Result<Vec<(String, f64)>> {
        self.parameters
            .iter()
            .map(|(k, v)| {
                let name = k
                    .as_str()
                    .ok_or_else(|| miette::miette!("Parameter names must be strings"))?;
                let baseline = v
                    .as_f64()
                    .ok_or_else(|| miette::miette!("Baseline of '{}' must be a number", name))?;
                Ok((name.to_string(), baseline))
            })
            .collect()
    }

    /// Correlation rows as a square matrix
    pub fn matrix(&self) -> Result<DMatrix<f64>> {
        let n = self.correlation.len();
        if let Some(row) = self.correlation.iter().find(|r| r.len() != n) {
            return Err(miette::miette!(
                "Correlation matrix must be square: found a row of {} entries in a {}-row matrix",
                row.len(),
                n
            ));
        }
        Ok(DMatrix::from_fn(n, n, |i, j| self.correlation[i][j]))
    }
}

#[derive(Debug, Serialize)]
pub struct ParameterSummary {
    pub name: String,
    pub baseline: f64,
    pub stats: SampleStats,
}

#[derive(Debug, Serialize)]
pub struct CorrelationReport {
    pub iterations: u32,
    pub seed: u64,
    pub parameters: Vec<ParameterSummary>,
    pub empirical_correlation: Vec<Vec<f64>>,
}

pub fn run(args: CorrelateArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let (content, name) = read_input(&args.file)?;
    let file: CorrelationFile = parse_yaml(&content, &name)?;

    let baselines = file.baselines()?;
    let matrix = file.matrix()?;
    let iterations = args.iterations.unwrap_or(ctx.config.iterations);
    let seed = args.seed.unwrap_or(ctx.config.seed);

    let engine = MonteCarloEngine::new(ctx.config.iteration_bounds());
    let sample = engine.simulate_correlated_parameters(&baselines, &matrix, iterations, seed)?;

    let empirical = sample.empirical_correlation();
    let report = CorrelationReport {
        iterations,
        seed,
        parameters: baselines
            .iter()
            .zip(sample.stats())
            .map(|((name, baseline), (_, stats))| ParameterSummary {
                name: name.clone(),
                baseline: *baseline,
                stats,
            })
            .collect(),
        empirical_correlation: empirical
            .row_iter()
            .map(|row| row.iter().map(|v| round_to(*v, 3)).collect())
            .collect(),
    };

    if print_structured(&report, effective_format(global.format))? {
        return Ok(());
    }

    println!(
        "{} {} correlated parameters, {} iterations (seed {})",
        style("⚙").cyan(),
        report.parameters.len(),
        report.iterations,
        report.seed
    );
    println!();
    println!(
        "   {:<16} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "PARAMETER", "BASELINE", "MEAN", "STD", "P5", "P95"
    );
    for p in &report.parameters {
        println!(
            "   {:<16} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
            style(&p.name).cyan(),
            p.baseline,
            p.stats.mean,
            p.stats.std_dev,
            p.stats.p5,
            p.stats.p95
        );
    }

    println!();
    println!("   {}", style("Empirical correlation:").bold());
    for (p, row) in report.parameters.iter().zip(&report.empirical_correlation) {
        let cells: Vec<String> = row.iter().map(|v| format!("{:>7.3}", v)).collect();
        println!("   {:<16} {}", p.name, cells.join(" "));
    }
    Ok(())
}
