//! Secondary output formats rendered alongside each schema file.

use std::fmt;
use std::str::FromStr;

use crate::config::GeneratorConfig;
use crate::error::SchemaGenError;
use crate::ir::GenerationContext;
use crate::json_schema_export::to_json_schema;
use crate::markdown_docs::generate_markdown;
use crate::proto_codegen::SchemaGenerator;
use crate::typescript_codegen::generate_typescript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Proto,
    JsonSchema,
    Markdown,
    TypeScript,
    /// Binary descriptor sets; recognized but not produced.
    Descriptor,
}

impl OutputFormat {
    /// Canonical name, used for the `{format}` placeholder and metadata.
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Proto => "proto",
            OutputFormat::JsonSchema => "json-schema",
            OutputFormat::Markdown => "markdown",
            OutputFormat::TypeScript => "typescript",
            OutputFormat::Descriptor => "descriptor",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Proto => ".proto",
            OutputFormat::JsonSchema => ".schema.json",
            OutputFormat::Markdown => ".md",
            OutputFormat::TypeScript => ".ts",
            OutputFormat::Descriptor => ".desc",
        }
    }

    /// Renders `ctx` in this format.
    pub fn render(
        self,
        ctx: &GenerationContext,
        config: &GeneratorConfig,
    ) -> Result<String, SchemaGenError> {
        match self {
            OutputFormat::Proto => SchemaGenerator::new(ctx, config).generate(),
            OutputFormat::JsonSchema => to_json_schema(ctx, config, true).map(|mut s| {
                s.push('\n');
                s
            }),
            OutputFormat::Markdown => Ok(generate_markdown(ctx, config)),
            OutputFormat::TypeScript => Ok(generate_typescript(ctx, config)),
            OutputFormat::Descriptor => Err(SchemaGenError::GenerationError(
                "descriptor output is not supported".to_string(),
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = SchemaGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proto" | "protobuf" => Ok(OutputFormat::Proto),
            "json-schema" | "json_schema" | "jsonschema" => Ok(OutputFormat::JsonSchema),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "typescript" | "ts" => Ok(OutputFormat::TypeScript),
            "descriptor" | "desc" => Ok(OutputFormat::Descriptor),
            other => Err(SchemaGenError::ConfigError(format!(
                "unsupported output format: {other}"
            ))),
        }
    }
}

/// Path of the `format` companion of a schema file.
///
/// A pattern containing `{format}` is re-resolved with the format name and
/// then gets the format extension in place of `.proto`; otherwise the schema
/// file's extension is replaced.
pub fn companion_path(
    pattern: &str,
    schema_name: &str,
    schema_path: &str,
    format: OutputFormat,
) -> String {
    if pattern.contains("{format}") {
        let resolved = resolve_file_name(pattern, schema_name, format.name());
        let stem = resolved.strip_suffix(".proto").unwrap_or(&resolved);
        if stem.ends_with(format.extension()) {
            return stem.to_string();
        }
        return format!("{stem}{}", format.extension());
    }
    format!("{}{}", strip_extension(schema_path), format.extension())
}

/// Substitutes the `{schema_name}`, `{name}` and `{format}` placeholders.
pub fn resolve_file_name(pattern: &str, name: &str, format: &str) -> String {
    pattern
        .replace("{schema_name}", name)
        .replace("{name}", name)
        .replace("{format}", format)
}

fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..file_start + dot],
        _ => path,
    }
}
