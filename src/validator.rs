//! Structural checks run over the whole IR before anything is rendered.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::GeneratorConfig;
use crate::error::SchemaGenError;
use crate::ir::GenerationContext;
use crate::resolver::{
    FieldShape, ResolvedMessage, Resolver, IMPLEMENTATION_RESERVED, MAX_FIELD_NUMBER,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// A single validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    /// `Message`, `Message.field`, `Enum.VALUE` or `Service`.
    pub location: String,
    pub message: String,
}

impl Finding {
    fn new(severity: Severity, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.severity, self.location, self.message)
    }
}

/// Runs every check and returns all findings, most severe first.
pub fn validate(ctx: &GenerationContext, config: &GeneratorConfig) -> Vec<Finding> {
    let resolver = Resolver::new(ctx, config);
    let mut findings = Vec::new();

    let messages = resolver.resolve_messages();
    let mut message_owners: HashMap<&str, &str> = HashMap::new();
    for message in &messages {
        if let Some(owner) = message_owners.insert(&message.name, &message.source_name) {
            findings.push(Finding::new(
                Severity::Error,
                &message.name,
                format!(
                    "duplicate message name '{}' (also produced by type '{owner}')",
                    message.name
                ),
            ));
        }
        check_message(message, &mut findings);
    }

    let mut enum_names: HashSet<String> = HashSet::new();
    for resolved in resolver.resolve_enums() {
        if !enum_names.insert(resolved.name.clone()) {
            findings.push(Finding::new(
                Severity::Error,
                &resolved.name,
                format!("duplicate enum name '{}'", resolved.name),
            ));
        } else if message_owners.contains_key(resolved.name.as_str()) {
            findings.push(Finding::new(
                Severity::Error,
                &resolved.name,
                format!("enum name '{}' conflicts with a message", resolved.name),
            ));
        }

        if config.is_proto3() {
            if let Some(first) = resolved.values.first().filter(|v| v.number != 0) {
                findings.push(Finding::new(
                    Severity::Warning,
                    format!("{}.{}", resolved.name, first.name),
                    format!(
                        "first enum value is {}; proto3 requires the first value to be 0",
                        first.number
                    ),
                ));
            }
        }

        let mut numbers: HashMap<i64, &str> = HashMap::new();
        let mut names: HashSet<&str> = HashSet::new();
        for value in &resolved.values {
            let location = format!("{}.{}", resolved.name, value.name);
            if !names.insert(&value.name) {
                findings.push(Finding::new(
                    Severity::Error,
                    &location,
                    format!("duplicate enum value name '{}'", value.name),
                ));
            }
            if let Some(previous) = numbers.insert(value.number, &value.name) {
                let severity = if resolved.allow_alias {
                    Severity::Warning
                } else {
                    Severity::Error
                };
                findings.push(Finding::new(
                    severity,
                    &location,
                    format!(
                        "duplicate enum value number {} (also used by '{previous}')",
                        value.number
                    ),
                ));
            }
        }
    }

    let mut service_names: HashSet<String> = HashSet::new();
    for service in resolver.resolve_services() {
        if !service_names.insert(service.name.clone()) {
            findings.push(Finding::new(
                Severity::Error,
                &service.name,
                format!("duplicate service name '{}'", service.name),
            ));
        }
        if service.methods.is_empty() {
            findings.push(Finding::new(
                Severity::Info,
                &service.name,
                "service has no rpc methods",
            ));
        }
    }

    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    findings
}

fn check_message(message: &ResolvedMessage, findings: &mut Vec<Finding>) {
    let mut used: HashMap<u32, &str> = HashMap::new();
    for field in &message.fields {
        let location = format!("{}.{}", message.name, field.name);
        let number = field.number;
        if let Some(previous) = used.insert(number, &field.name) {
            findings.push(Finding::new(
                Severity::Error,
                &location,
                format!("duplicate field number {number} (also used by field '{previous}')"),
            ));
        }
        if message.reserved_numbers.contains(&number) {
            findings.push(Finding::new(
                Severity::Error,
                &location,
                format!("field number {number} is reserved"),
            ));
        }
        if number == 0 || number > MAX_FIELD_NUMBER {
            findings.push(Finding::new(
                Severity::Error,
                &location,
                format!("field number {number} is out of valid range (1-{MAX_FIELD_NUMBER})"),
            ));
        } else if IMPLEMENTATION_RESERVED.contains(&number) {
            findings.push(Finding::new(
                Severity::Error,
                &location,
                format!("field number {number} is in reserved range 19000-19999"),
            ));
        }
        if message.reserved_names.contains(&field.name) {
            findings.push(Finding::new(
                Severity::Error,
                &location,
                format!("field name '{}' is reserved", field.name),
            ));
        }
        if let Some(group) = &field.oneof {
            if matches!(field.shape, FieldShape::Repeated | FieldShape::Map { .. }) {
                findings.push(Finding::new(
                    Severity::Error,
                    &location,
                    format!("field in oneof '{group}' cannot be repeated or a map"),
                ));
            }
        }
        if let Some(key) = &field.suppressed_map_key {
            findings.push(Finding::new(
                Severity::Warning,
                &location,
                format!(
                    "'{key}' is not a valid map key type; field emitted as '{}'",
                    field.proto_type
                ),
            ));
        }
    }
    for name in &message.unnumbered {
        findings.push(Finding::new(
            Severity::Error,
            format!("{}.{name}", message.name),
            "field has no number and none could be assigned automatically",
        ));
    }
}

/// Validates, logs every finding, and fails on any error-severity finding.
pub fn ensure_valid(
    ctx: &GenerationContext,
    config: &GeneratorConfig,
) -> Result<Vec<Finding>, SchemaGenError> {
    let findings = validate(ctx, config);
    for finding in &findings {
        match finding.severity {
            Severity::Error => error!(location = %finding.location, "{}", finding.message),
            Severity::Warning => warn!(location = %finding.location, "{}", finding.message),
            Severity::Info => info!(location = %finding.location, "{}", finding.message),
        }
    }
    let count = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    if count > 0 {
        return Err(SchemaGenError::ValidationError { count, findings });
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: serde_json::Value) -> GenerationContext {
        serde_json::from_value(value).expect("context should deserialize")
    }

    #[test]
    fn out_of_range_and_band_numbers() {
        let ctx = ctx(json!({
            "structs": [{
                "name": "Item",
                "fields": [
                    { "name": "A", "type": "string", "tag": "proto:\"a,number=19500\"" },
                    { "name": "B", "type": "string", "tag": "proto:\"b,number=536870912\"" }
                ]
            }]
        }));
        let findings = validate(&ctx, &GeneratorConfig::default());
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert!(messages.contains(&"field number 19500 is in reserved range 19000-19999"));
        assert!(messages.contains(&"field number 536870912 is out of valid range (1-536870911)"));
    }

    #[test]
    fn enum_aliases_downgrade_to_warning() {
        let ctx = ctx(json!({
            "enums": [{
                "name": "Status",
                "annotations": [{ "name": "enum", "params": { "allow_alias": true } }],
                "values": [
                    { "name": "Unknown" },
                    { "name": "Started", "annotations": [{ "name": "enumvalue", "params": { "number": 1 } }] },
                    { "name": "Running", "annotations": [{ "name": "enumvalue", "params": { "number": 1 } }] }
                ]
            }]
        }));
        let findings = ensure_valid(&ctx, &GeneratorConfig::default()).expect("aliases are allowed");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].location, "Status.RUNNING");
    }

    #[test]
    fn missing_numbers_without_auto_numbering() {
        let ctx = ctx(json!({
            "structs": [{ "name": "Item", "fields": [{ "name": "A", "type": "string" }] }]
        }));
        let mut config = GeneratorConfig::default();
        config.auto_number_fields = false;
        let err = ensure_valid(&ctx, &config).expect_err("unnumbered field must fail");
        assert_eq!(err.to_string(), "validation failed with 1 error(s)");
    }
}
