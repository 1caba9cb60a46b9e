//! `qcast variability` command - inspect noise magnitudes

use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::{parse_ingredient, Context};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::GlobalOpts;
use crate::core::{VariabilityEstimator, VariabilityProfile};
use crate::entities::FormulaIngredient;

#[derive(clap::Args, Debug)]
pub struct VariabilityArgs {
    /// Production facility
    #[arg(long, default_value = "")]
    pub facility: String,

    /// Formula ingredient as NAME=PERCENT (repeatable)
    #[arg(long = "ingredient", short = 'i', value_parser = parse_ingredient)]
    pub ingredients: Vec<FormulaIngredient>,
}

#[derive(Debug, Serialize)]
pub struct VariabilityReport {
    pub facility: String,
    pub known_facility: bool,
    pub process: VariabilityProfile,
    pub formula: VariabilityProfile,
    pub critical_ingredients: usize,
}

pub fn run(args: VariabilityArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let estimator = VariabilityEstimator::new(ctx.reference.facilities, ctx.reference.formula);

    let formula = estimator.estimate_formula_variability(&args.ingredients);
    let report = VariabilityReport {
        known_facility: estimator.facilities().lookup(&args.facility).is_some(),
        process: estimator.estimate_process_variability(&args.facility),
        formula: formula.profile,
        critical_ingredients: formula.critical_ingredients,
        facility: args.facility,
    };

    if print_structured(&report, effective_format(global.format))? {
        return Ok(());
    }

    let facility_label = if report.known_facility {
        style(report.facility.clone()).cyan()
    } else {
        style(format!("{} (unknown, conservative default)", report.facility)).yellow()
    };
    println!("{} {}", style("Facility:").bold(), facility_label);
    for (key, value) in report.process.iter() {
        println!("   {:<14} {:>6.1}%", key, value * 100.0);
    }

    println!();
    println!(
        "{} {} critical ingredient(s)",
        style("Formula:").bold(),
        report.critical_ingredients
    );
    for (key, value) in report.formula.iter() {
        println!("   {:<14} {:>6.1}%", key, value * 100.0);
    }
    Ok(())
}
