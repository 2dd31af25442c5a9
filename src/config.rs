//! Generator configuration.
//!
//! Every field has a serde default so a partial JSON document (or `{}`)
//! yields a usable configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaGenError;
use crate::resolver::MAX_FIELD_NUMBER;
use crate::tags::TagReader;

/// How the IR is partitioned into schema files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One file for the whole IR.
    #[default]
    Single,
    /// One file per originating source file.
    #[serde(alias = "follow_source", alias = "follow-source")]
    Follow,
    /// One file per package (last path segment).
    Package,
    /// One file per namespace.
    Namespace,
}

/// Maps a host type to a well-known schema type and the import it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownType {
    #[serde(rename = "type")]
    pub proto_type: String,
    #[serde(default)]
    pub import: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Output file pattern; supports `{schema_name}`, `{name}` and `{format}`.
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub output_file_name: Option<String>,
    /// Extra formats besides the schema itself (`json-schema`, `markdown`, `typescript`).
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
    #[serde(default, alias = "generation_strategy")]
    pub strategy: Strategy,

    #[serde(default = "default_syntax")]
    pub syntax: String,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub go_package: Option<String>,
    #[serde(default)]
    pub java_package: Option<String>,
    #[serde(default, alias = "java_outer_class")]
    pub java_outer_classname: Option<String>,
    /// `SPEED`, `CODE_SIZE` or `LITE_RUNTIME`; emitted unquoted.
    #[serde(default)]
    pub optimize_for: Option<String>,
    /// Additional file options written as `option key = "value";`.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default = "default_true", alias = "generate_service")]
    pub generate_services: bool,

    #[serde(default = "default_true")]
    pub auto_number_fields: bool,
    #[serde(default = "default_start_field_number")]
    pub start_field_number: u32,
    /// Reserved in every emitted message.
    #[serde(default)]
    pub reserved_numbers: Vec<u32>,
    #[serde(default)]
    pub reserved_names: Vec<String>,

    #[serde(default)]
    pub custom_imports: Vec<String>,
    /// Host type to schema type overrides, checked before the built-in table.
    #[serde(default)]
    pub type_mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub known_types: BTreeMap<String, KnownType>,
    /// Struct tag key holding schema metadata.
    #[serde(default = "default_tag_name")]
    pub tag_name: String,

    #[serde(default, alias = "generate_stubs")]
    pub stubs: Option<StubConfig>,
}

fn default_output_formats() -> Vec<String> {
    vec!["proto".to_string()]
}

fn default_syntax() -> String {
    "proto3".to_string()
}

fn default_true() -> bool {
    true
}

fn default_start_field_number() -> u32 {
    1
}

fn default_tag_name() -> String {
    "proto".to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output: None,
            output_file_name: None,
            output_formats: default_output_formats(),
            strategy: Strategy::default(),
            syntax: default_syntax(),
            package: None,
            go_package: None,
            java_package: None,
            java_outer_classname: None,
            optimize_for: None,
            options: BTreeMap::new(),
            generate_services: true,
            auto_number_fields: true,
            start_field_number: default_start_field_number(),
            reserved_numbers: Vec::new(),
            reserved_names: Vec::new(),
            custom_imports: Vec::new(),
            type_mappings: BTreeMap::new(),
            known_types: BTreeMap::new(),
            tag_name: default_tag_name(),
            stubs: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and checks a JSON configuration document.
    pub fn from_json(input: &str) -> Result<Self, SchemaGenError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(input)
            .map_err(|e| SchemaGenError::ConfigError(format!("invalid configuration: {e}")))?;
        config.check()?;
        Ok(config)
    }

    /// Rejects values the generator cannot honor.
    pub fn check(&self) -> Result<(), SchemaGenError> {
        if self.syntax != "proto3" && self.syntax != "proto2" {
            return Err(SchemaGenError::ConfigError(format!(
                "unsupported syntax '{}' (expected proto2 or proto3)",
                self.syntax
            )));
        }
        if self.start_field_number == 0 {
            return Err(SchemaGenError::ConfigError(
                "start_field_number must be at least 1".to_string(),
            ));
        }
        if self.start_field_number > MAX_FIELD_NUMBER {
            return Err(SchemaGenError::ConfigError(format!(
                "start_field_number {} exceeds the maximum field number {MAX_FIELD_NUMBER}",
                self.start_field_number
            )));
        }
        if self.tag_name.trim().is_empty() {
            return Err(SchemaGenError::ConfigError(
                "tag_name must not be empty".to_string(),
            ));
        }
        if let Some(stubs) = &self.stubs {
            stubs.templates.check()?;
        }
        Ok(())
    }

    pub fn is_proto3(&self) -> bool {
        self.syntax == "proto3"
    }

    pub fn tag_reader(&self) -> TagReader {
        TagReader::new(self.tag_name.clone())
    }

    /// The configured file pattern, falling back to `{schema_name}.proto`.
    pub fn output_pattern(&self) -> &str {
        self.output
            .as_deref()
            .or(self.output_file_name.as_deref())
            .filter(|p| !p.trim().is_empty())
            .unwrap_or("{schema_name}.proto")
    }

    pub fn stubs_enabled(&self) -> bool {
        self.stubs.as_ref().is_some_and(|s| s.enabled)
    }
}

/// Adapter and conversion code synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Directory for generated adapter sources.
    #[serde(default = "default_stub_output_dir")]
    pub output_dir: String,
    /// Directory the schema compiler writes generated message code to.
    #[serde(default = "default_compiler_output_dir")]
    pub compiler_output_dir: String,
    #[serde(default)]
    pub original_service_interface: bool,
    #[serde(default)]
    pub streaming_support: bool,
    #[serde(default)]
    pub registration_helpers: bool,
    #[serde(default)]
    pub templates: TemplateConfig,
}

fn default_stub_output_dir() -> String {
    "adapters".to_string()
}

fn default_compiler_output_dir() -> String {
    "pb".to_string()
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: default_stub_output_dir(),
            compiler_output_dir: default_compiler_output_dir(),
            original_service_interface: false,
            streaming_support: false,
            registration_helpers: false,
            templates: TemplateConfig::default(),
        }
    }
}

/// Where stub templates are loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSourceKind {
    #[default]
    #[serde(alias = "embedded")]
    Builtin,
    #[serde(alias = "filesystem")]
    Directory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub source: TemplateSourceKind,
    /// Template directory; required for the `directory` source.
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub names: TemplateNames,
    /// Rust module path of the domain types.
    #[serde(default = "default_module_path")]
    pub module_path: String,
    /// Rust module path of the compiled message types.
    #[serde(default = "default_proto_module")]
    pub proto_module: String,
    #[serde(default = "default_proto_alias")]
    pub proto_alias: String,
}

fn default_module_path() -> String {
    "crate::models".to_string()
}

fn default_proto_module() -> String {
    "crate::pb".to_string()
}

fn default_proto_alias() -> String {
    "pb".to_string()
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            source: TemplateSourceKind::Builtin,
            base_path: None,
            names: TemplateNames::default(),
            module_path: default_module_path(),
            proto_module: default_proto_module(),
            proto_alias: default_proto_alias(),
        }
    }
}

impl TemplateConfig {
    pub fn check(&self) -> Result<(), SchemaGenError> {
        if self.source == TemplateSourceKind::Directory
            && self.base_path.as_deref().map_or(true, |p| p.trim().is_empty())
        {
            return Err(SchemaGenError::ConfigError(
                "template source 'directory' requires base_path".to_string(),
            ));
        }
        Ok(())
    }
}

/// Template name per synthesized artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateNames {
    pub types: String,
    pub service: String,
    pub adapter: String,
    pub client: String,
    pub bridge: String,
    pub registration: String,
}

impl Default for TemplateNames {
    fn default() -> Self {
        Self {
            types: "types".to_string(),
            service: "service".to_string(),
            adapter: "adapter".to_string(),
            client: "client".to_string(),
            bridge: "bridge".to_string(),
            registration: "registration".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = GeneratorConfig::from_json("{}").expect("config should parse");
        assert_eq!(config.syntax, "proto3");
        assert_eq!(config.start_field_number, 1);
        assert!(config.auto_number_fields);
        assert_eq!(config.strategy, Strategy::Single);
        assert_eq!(config.output_pattern(), "{schema_name}.proto");
        assert_eq!(config.output_formats, vec!["proto"]);
    }

    #[test]
    fn accepts_legacy_aliases() {
        let config = GeneratorConfig::from_json(
            r#"{"generation_strategy": "follow", "java_outer_class": "Outer",
                "generate_stubs": {"enabled": true, "templates": {"source": "embedded"}}}"#,
        )
        .expect("config should parse");
        assert_eq!(config.strategy, Strategy::Follow);
        assert_eq!(config.java_outer_classname.as_deref(), Some("Outer"));
        assert!(config.stubs_enabled());
    }

    #[test]
    fn rejects_unknown_strategy_and_syntax() {
        let err = GeneratorConfig::from_json(r#"{"strategy": "by_moon_phase"}"#)
            .expect_err("unknown strategy must fail");
        assert!(matches!(err, SchemaGenError::ConfigError(_)));

        let err = GeneratorConfig::from_json(r#"{"syntax": "proto4"}"#)
            .expect_err("unknown syntax must fail");
        assert!(err.to_string().contains("proto4"), "{err}");
    }

    #[test]
    fn start_field_number_must_be_a_valid_field_number() {
        let err = GeneratorConfig::from_json(r#"{"start_field_number": 4294967295}"#)
            .expect_err("start past the field number range must fail");
        assert!(matches!(err, SchemaGenError::ConfigError(_)));
        assert!(err.to_string().contains("536870911"), "{err}");

        let config = GeneratorConfig::from_json(r#"{"start_field_number": 536870911}"#)
            .expect("largest field number is a valid start");
        assert_eq!(config.start_field_number, MAX_FIELD_NUMBER);
    }

    #[test]
    fn directory_templates_need_base_path() {
        let err = GeneratorConfig::from_json(
            r#"{"stubs": {"enabled": true, "templates": {"source": "directory"}}}"#,
        )
        .expect_err("missing base_path must fail");
        assert!(err.to_string().contains("base_path"), "{err}");
    }
}
