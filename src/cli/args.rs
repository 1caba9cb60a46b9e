//! Command-line argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    correlate::CorrelateArgs, predict::PredictArgs, simulate::SimulateArgs, specs::SpecsArgs,
    variability::VariabilityArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "qcast",
    version,
    about = "Quality-test risk forecasting with Monte Carlo simulation",
    long_about = "Predicts quality-test outcomes for a product formulation, process setup and \
                  production facility, and reports per-test probabilities of failure."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Directory with reference table overrides (facilities.yaml, products.yaml, ...)
    #[arg(long, global = true, value_name = "DIR")]
    pub reference: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict every quality test of a product from a request file
    Predict(PredictArgs),

    /// Simulate a single test around a baseline value
    Simulate(SimulateArgs),

    /// Show process and formula variability for a facility and formula
    Variability(VariabilityArgs),

    /// List products or show one product's specification table
    Specs(SpecsArgs),

    /// Jointly simulate correlated process parameters
    Correlate(CorrelateArgs),
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table on a terminal, YAML otherwise
    Auto,
    Yaml,
    Json,
    Table,
}
