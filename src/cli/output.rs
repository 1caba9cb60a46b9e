//! Output formatting utilities

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::io::IsTerminal;

use crate::cli::OutputFormat;

/// Resolve `auto`: a table on an interactive terminal, YAML when piped
pub fn effective_format(format: OutputFormat) -> OutputFormat {
    match format {
        OutputFormat::Auto => {
            if std::io::stdout().is_terminal() {
                OutputFormat::Table
            } else {
                OutputFormat::Yaml
            }
        }
        other => other,
    }
}

/// Print a value as YAML or pretty JSON
///
/// Returns false for table formats so the caller renders its own view.
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(value).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Table | OutputFormat::Auto => Ok(false),
    }
}
