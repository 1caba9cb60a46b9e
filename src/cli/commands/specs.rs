//! `qcast specs` command - browse specification tables

use console::style;
use miette::Result;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::helpers::{format_limit, Context};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::GlobalOpts;
use crate::reference::ProductSpecs;

#[derive(clap::Args, Debug)]
pub struct SpecsArgs {
    /// Product name (substring matching as in predictions); omit to list products
    pub product: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProductSummary<'a> {
    name: &'a str,
    tests: Vec<&'a str>,
}

#[derive(Tabled)]
struct SpecRow {
    #[tabled(rename = "TEST")]
    test: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "UNIT")]
    unit: String,
    #[tabled(rename = "LIMIT")]
    limit: String,
    #[tabled(rename = "TYPE")]
    limit_type: String,
    #[tabled(rename = "TARGET")]
    target: String,
}

pub fn run(args: SpecsArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let catalog = &ctx.reference.products;
    let format = effective_format(global.format);

    match args.product {
        None => {
            let products: Vec<ProductSummary> = catalog
                .products
                .iter()
                .chain(std::iter::once(&catalog.generic))
                .map(|p| ProductSummary {
                    name: &p.name,
                    tests: p.tests.iter().map(|t| t.test.as_str()).collect(),
                })
                .collect();

            if !print_structured(&products, format)? {
                for p in &products {
                    println!("{:<20} {}", style(p.name).cyan(), p.tests.join(", "));
                }
            }
        }
        Some(product) => {
            let specs = catalog.specs_for(&product);
            if !print_structured(specs, format)? {
                print_specs(&product, specs);
            }
        }
    }
    Ok(())
}

fn print_specs(query: &str, specs: &ProductSpecs) {
    if !specs.name.eq_ignore_ascii_case(query.trim()) {
        println!(
            "{} '{}' resolved to {}",
            style("→").dim(),
            query,
            style(&specs.name).cyan()
        );
    }
    let rows: Vec<SpecRow> = specs
        .tests
        .iter()
        .map(|t| SpecRow {
            test: t.test.clone(),
            name: t.display_name(),
            unit: t.unit.clone(),
            limit: format_limit(t.spec_limit),
            limit_type: t.limit_type.to_string(),
            target: format!("{}", t.target),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}
