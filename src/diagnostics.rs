use crate::language::errors::SyntaxError;
use crate::runtime::error::RuntimeError;
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

/// A syntax error dressed up for terminal reporting, with the offending
/// span labeled inside the source listing.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{message}")]
    span: SourceSpan,
    message: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            message: err.message.clone(),
        }
    }
}

/// Pretty-prints every collected syntax error for a named source.
pub fn emit_syntax_errors(name: &str, source: &str, errors: &[SyntaxError]) {
    for err in errors {
        let src = NamedSource::new(name, source.to_string());
        let diagnostic = SyntaxDiagnostic::from_error(src, err);
        eprintln!("{:?}", Report::new(diagnostic));
    }
}

pub fn report_runtime_error(error: &RuntimeError) {
    eprintln!("Runtime error: {error}");
}
