//! `qcast simulate` command - Monte Carlo for a single test

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::helpers::{parse_finite, parse_ingredient, status_style, Context};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::viz;
use crate::cli::GlobalOpts;
use crate::core::risk::assess;
use crate::core::{MonteCarloEngine, SampleStats, VariabilityEstimator};
use crate::entities::{FormulaIngredient, LimitType, TestStatus};

#[derive(clap::Args, Debug)]
pub struct SimulateArgs {
    /// Baseline (point-estimate) value of the test
    #[arg(long, value_parser = parse_finite)]
    pub baseline: f64,

    /// Production facility (unknown names use the conservative default)
    #[arg(long, default_value = "")]
    pub facility: String,

    /// Formula ingredient as NAME=PERCENT (repeatable)
    #[arg(long = "ingredient", short = 'i', value_parser = parse_ingredient)]
    pub ingredients: Vec<FormulaIngredient>,

    /// Specification limit
    #[arg(long, value_parser = parse_finite)]
    pub limit: Option<f64>,

    /// Limit direction: upper or lower
    #[arg(long, default_value = "upper")]
    pub limit_type: LimitType,

    /// Number of Monte Carlo iterations
    #[arg(long, short = 'n')]
    pub iterations: Option<u32>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Confidence level of the reported interval
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Show ASCII histogram of the simulated distribution
    #[arg(long, short = 'H')]
    pub histogram: bool,

    /// Number of histogram bins
    #[arg(long, default_value = "40", value_parser = clap::value_parser!(u32).range(1..=500))]
    pub bins: u32,

    /// Output raw samples as CSV
    #[arg(long)]
    pub csv: bool,
}

#[derive(Debug, Serialize)]
pub struct SimulationSummary {
    pub baseline: f64,
    pub facility: String,
    pub process_variability: f64,
    pub formula_variability: f64,
    pub critical_ingredients: usize,
    pub iterations: u32,
    pub seed: u64,
    pub stats: SampleStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_limit: Option<f64>,
    pub limit_type: LimitType,
    pub probability_of_fail: f64,
    pub status: TestStatus,
    pub confidence_level: f64,
    pub confidence_interval: [f64; 2],
}

pub fn run(args: SimulateArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let config = &ctx.config;
    let iterations = args.iterations.unwrap_or(config.iterations);
    let seed = args.seed.unwrap_or(config.seed);
    let confidence_level = args.confidence.unwrap_or(config.confidence_level);

    let variability = VariabilityEstimator::new(ctx.reference.facilities, ctx.reference.formula);
    let process = variability.estimate_process_variability(&args.facility);
    let formula = variability.estimate_formula_variability(&args.ingredients);

    let engine = MonteCarloEngine::new(config.iteration_bounds());
    let (sample, stats) =
        engine.simulate(args.baseline, &process, &formula.profile, iterations, seed)?;
    let assessment = assess(sample.values(), args.limit, args.limit_type, confidence_level)?;

    if args.csv {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        wtr.write_record(["sample", "value"]).into_diagnostic()?;
        for (i, value) in sample.values().iter().enumerate() {
            wtr.write_record([(i + 1).to_string(), format!("{:.6}", value)])
                .into_diagnostic()?;
        }
        wtr.flush().into_diagnostic()?;
        return Ok(());
    }

    let summary = SimulationSummary {
        baseline: args.baseline,
        facility: args.facility,
        process_variability: process.overall(),
        formula_variability: formula.profile.overall(),
        critical_ingredients: formula.critical_ingredients,
        iterations,
        seed,
        stats,
        spec_limit: args.limit,
        limit_type: args.limit_type,
        probability_of_fail: assessment.probability_of_fail,
        status: assessment.status,
        confidence_level,
        confidence_interval: assessment.confidence_interval,
    };

    if !print_structured(&summary, effective_format(global.format))? {
        print_summary(&summary);
        if args.histogram {
            println!();
            println!(
                "{}",
                viz::render_histogram(
                    sample.values(),
                    args.bins as usize,
                    args.limit.map(|l| (l, args.limit_type)),
                )
            );
        }
    }
    Ok(())
}

fn print_summary(s: &SimulationSummary) {
    println!(
        "{} Simulated {} iterations around {} (seed {})",
        style("⚙").cyan(),
        s.iterations,
        style(s.baseline).yellow(),
        s.seed
    );
    println!(
        "   Variability: process {:.3}, formula {:.3} ({} critical ingredients)",
        s.process_variability, s.formula_variability, s.critical_ingredients
    );
    println!();
    println!("   {}", style("Statistics:").bold());
    println!("     Mean:   {:.4}", s.stats.mean);
    println!("     Std:    {:.4}", s.stats.std_dev);
    println!("     Range:  {:.4} to {:.4}", s.stats.min, s.stats.max);
    println!(
        "     P5/P50/P95: {:.4} / {:.4} / {:.4}",
        s.stats.p5, s.stats.median, s.stats.p95
    );
    println!(
        "     {:.0}% CI: [{:.4}, {:.4}]",
        s.confidence_level * 100.0,
        s.confidence_interval[0],
        s.confidence_interval[1]
    );

    println!();
    match s.spec_limit {
        Some(limit) => {
            println!(
                "   P(fail) = {:.2}%  {}",
                s.probability_of_fail * 100.0,
                status_style(s.status)
            );
            println!(
                "{}",
                viz::render_range_bar(
                    s.confidence_interval[0],
                    s.confidence_interval[1],
                    limit,
                    s.limit_type
                )
            );
        }
        None => println!("   No specification limit: {}", status_style(s.status)),
    }
}
