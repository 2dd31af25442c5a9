//! Protobuf schema generation from annotated type descriptions.
//!
//! The input is a [`GenerationContext`] produced by an upstream parser. A run
//! validates it, partitions it into files, renders schema text plus any
//! configured companion formats, and optionally synthesizes Rust adapters
//! over prost/tonic generated code.
//!
//! ```
//! use proto_schemagen::{generate, GenerationContext, GeneratorConfig};
//!
//! let ctx: GenerationContext = serde_json::from_str(
//!     r#"{ "structs": [{ "name": "User", "fields": [{ "name": "ID", "type": "int64" }] }] }"#,
//! )
//! .unwrap();
//! let output = generate(&ctx, &GeneratorConfig::default()).unwrap();
//! assert!(output.files[0].content.contains("int64 id = 1;"));
//! ```

pub mod annotation;
pub mod config;
pub mod error;
pub mod formats;
pub mod generics;
pub mod ir;
pub mod json_schema_export;
pub mod markdown_docs;
pub mod naming;
pub mod output;
pub mod planner;
pub mod proto_codegen;
pub mod resolver;
pub mod stubs;
pub mod tags;
pub mod type_expr;
pub mod type_map;
pub mod typescript_codegen;
pub mod validator;

use tracing::info;

pub use annotation::{Annotation, ParamValue};
pub use config::{GeneratorConfig, StubConfig, Strategy, TemplateConfig};
pub use error::SchemaGenError;
pub use formats::OutputFormat;
pub use ir::GenerationContext;
pub use output::{write_all, DirectorySink, GeneratedFile, GeneratedOutput, OutputSink};
pub use proto_codegen::SchemaGenerator;
pub use type_expr::TypeExpr;
pub use validator::{Finding, Severity};

/// Runs a full generation pass: configuration check, validation, then every
/// planned output file.
pub fn generate(ctx: &GenerationContext, config: &GeneratorConfig) -> Result<GeneratedOutput, SchemaGenError> {
    config.check()?;
    let findings = validator::ensure_valid(ctx, config)?;
    info!(findings = findings.len(), "validation passed");
    planner::plan_output(ctx, config)
}

/// Validates `ctx` and renders it as one schema unit, ignoring the
/// partitioning strategy and extra formats.
pub fn generate_schema(ctx: &GenerationContext, config: &GeneratorConfig) -> Result<String, SchemaGenError> {
    generate_format(ctx, config, OutputFormat::Proto)
}

/// Validates `ctx` and renders it as one unit in `format`.
pub fn generate_format(
    ctx: &GenerationContext,
    config: &GeneratorConfig,
    format: OutputFormat,
) -> Result<String, SchemaGenError> {
    config.check()?;
    validator::ensure_valid(ctx, config)?;
    format.render(ctx, config)
}
