//! Shared helper functions for CLI commands

use console::{style, StyledObject};
use miette::{IntoDiagnostic, Result};
use std::io::Read;
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::Config;
use crate::entities::{FormulaIngredient, TestStatus};
use crate::reference::ReferenceData;

/// Configuration plus the reference tables selected by `--reference` or config
pub struct Context {
    pub config: Config,
    pub reference: ReferenceData,
}

impl Context {
    pub fn load(global: &GlobalOpts) -> Result<Self> {
        let config = Config::load()?;
        let dir = global
            .reference
            .as_deref()
            .or_else(|| config.reference_dir());

        let reference = match dir {
            Some(dir) => {
                if !dir.is_dir() {
                    return Err(miette::miette!(
                        "Reference directory '{}' does not exist",
                        dir.display()
                    ));
                }
                ReferenceData::load_dir(dir)?
            }
            None => ReferenceData::embedded()?,
        };

        Ok(Self { config, reference })
    }
}

/// Read a file, or stdin when the path is `-`
///
/// Returns the content and a display name for diagnostics.
pub fn read_input(path: &Path) -> Result<(String, String)> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .into_diagnostic()?;
        return Ok((content, "<stdin>".to_string()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))?;
    Ok((content, path.display().to_string()))
}

/// Parse `NAME=PERCENT` into an ingredient
pub fn parse_ingredient(s: &str) -> std::result::Result<FormulaIngredient, String> {
    let (name, pct) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=PERCENT, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing ingredient name in '{}'", s));
    }
    let percentage: f64 = pct
        .trim()
        .parse()
        .map_err(|_| format!("invalid percentage '{}' for '{}'", pct.trim(), name))?;
    if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
        return Err(format!(
            "percentage must be within 0-100, got {} for '{}'",
            percentage, name
        ));
    }
    Ok(FormulaIngredient::new(name, percentage))
}

/// Parse a finite number (rejects NaN and infinities)
pub fn parse_finite(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid number '{}'", s))?;
    if !value.is_finite() {
        return Err(format!("value must be a finite number, got {}", value));
    }
    Ok(value)
}

/// Colored status label
pub fn status_style(status: TestStatus) -> StyledObject<String> {
    let label = status.to_string();
    match status {
        TestStatus::Pass => style(label).green(),
        TestStatus::Warning => style(label).yellow(),
        TestStatus::Fail => style(label).red().bold(),
    }
}

/// Format an optional limit for tables
pub fn format_limit(limit: Option<f64>) -> String {
    match limit {
        Some(l) => format!("{}", l),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingredient() {
        let ing = parse_ingredient("Cocoa Powder=20.5").unwrap();
        assert_eq!(ing.name, "Cocoa Powder");
        assert_eq!(ing.percentage, 20.5);

        // the last '=' separates the percentage
        let ing = parse_ingredient("A=B=3").unwrap();
        assert_eq!(ing.name, "A=B");
    }

    #[test]
    fn test_parse_ingredient_errors() {
        assert!(parse_ingredient("Cocoa").is_err());
        assert!(parse_ingredient("=5").is_err());
        assert!(parse_ingredient("Cocoa=lots").is_err());
        assert!(parse_ingredient("Cocoa=-5").is_err());
        assert!(parse_ingredient("Cocoa=150").is_err());
        assert!(parse_ingredient("Cocoa=NaN").is_err());
        assert!(parse_ingredient("Cocoa=0").is_ok());
        assert!(parse_ingredient("Cocoa=100").is_ok());
    }

    #[test]
    fn test_parse_finite() {
        assert_eq!(parse_finite("30"), Ok(30.0));
        assert_eq!(parse_finite(" -2.5 "), Ok(-2.5));
        assert!(parse_finite("NaN").is_err());
        assert!(parse_finite("inf").is_err());
        assert!(parse_finite("thirty").is_err());
    }

    #[test]
    fn test_format_limit() {
        assert_eq!(format_limit(Some(30.0)), "30");
        assert_eq!(format_limit(Some(3.5)), "3.5");
        assert_eq!(format_limit(None), "-");
    }
}
