//! Error definitions for all `proto_schemagen` generation stages.

use thiserror::Error;

use crate::validator::Finding;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
pub enum SchemaGenError {
    /// One or more error-severity findings were reported by the validator.
    #[error("validation failed with {count} error(s)")]
    ValidationError { count: usize, findings: Vec<Finding> },
    /// Formatting failure while rendering a single generation unit.
    #[error("generation error: {0}")]
    GenerationError(String),
    /// Template load, parse, or render failure in the stub synthesizer.
    #[error("template error: {0}")]
    TemplateError(String),
    /// The delegated schema compiler exited unsuccessfully.
    #[error("{program} failed: {output}")]
    ExternalToolError { program: String, output: String },
    /// Invalid or unsupported configuration value.
    #[error("config error: {0}")]
    ConfigError(String),
    /// Output serialization failure.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// Filesystem I/O error from sinks or template directories.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tera::Error> for SchemaGenError {
    fn from(err: tera::Error) -> Self {
        // tera nests the useful message in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        SchemaGenError::TemplateError(message)
    }
}
