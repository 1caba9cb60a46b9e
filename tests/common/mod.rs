//! Shared test helpers for integration tests

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

use qcast::core::PredictionRequest;
use qcast::entities::{FormulaIngredient, ProcessParameters};

/// qcast command isolated from the user's config and environment
pub fn qcast(tmp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("qcast"));
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".config"))
        .env_remove("QCAST_ITERATIONS")
        .env_remove("QCAST_SEED")
        .env_remove("QCAST_REFERENCE_DIR")
        .env_remove("QCAST_LOG");
    cmd
}

pub const NESCAU_REQUEST: &str = r#"
project_id: PRJ-001
product_name: Nescau
factory: Araraquara - SP
formula:
  - name: Cocoa Powder
    percentage: 20
  - name: Sugar
    percentage: 60
  - name: Soy Lecithin
    percentage: 0.5
process_parameters:
  temperature: 75
  mixing_time: 15
  line_speed: 90
iterations: 2000
seed: 42
"#;

/// Write a request file into the temp dir and return its path
pub fn write_request(tmp: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = tmp.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// A nominal in-process request for library tests
pub fn request(product: &str, factory: &str) -> PredictionRequest {
    PredictionRequest {
        product_name: product.to_string(),
        factory: factory.to_string(),
        formula: vec![
            FormulaIngredient::new("Cocoa Powder", 20.0),
            FormulaIngredient::new("Sugar", 60.0),
        ],
        process_parameters: ProcessParameters::new(75.0, 15.0, 90.0),
        iterations: 5_000,
        seed: 42,
    }
}
