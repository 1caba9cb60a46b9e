//! Rich diagnostics for YAML input files

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Errors raised while reading YAML documents
#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("failed to read file: {0}")]
    #[diagnostic(code(qcast::yaml::io))]
    Io(#[from] std::io::Error),
}

/// A parse or shape error pointing at the offending location
#[derive(Debug, Error, Diagnostic)]
#[error("invalid document {}: {message}", .src.name())]
#[diagnostic(code(qcast::yaml::syntax), help("check the document against the expected layout"))]
pub struct YamlSyntaxError {
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl YamlSyntaxError {
    /// Build from a serde_yml error, locating it in the source when possible
    pub fn from_serde_error(err: &serde_yml::Error, content: &str, filename: &str) -> Self {
        let span = err.location().map(|loc| {
            let offset = loc.index().min(content.len());
            let len = if offset < content.len() { 1 } else { 0 };
            SourceSpan::new(offset.into(), len)
        });

        Self {
            message: err.to_string(),
            src: NamedSource::new(filename, content.to_string()),
            span,
        }
    }
}
