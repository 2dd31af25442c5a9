//! Proto schema generation from the resolved IR.
//!
//! Output order is fixed: syntax, package, file options, imports, messages,
//! enums, then services.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::annotation::kind;
use crate::config::GeneratorConfig;
use crate::error::SchemaGenError;
use crate::ir::GenerationContext;
use crate::resolver::{
    compact_reserved_ranges, FieldShape, ResolvedEnum, ResolvedField, ResolvedMessage,
    ResolvedService, Resolver,
};
use crate::type_map::well_known_import;

/// Renders one schema file for a (possibly partitioned) context.
#[derive(Debug, Clone)]
pub struct SchemaGenerator<'a> {
    ctx: &'a GenerationContext,
    config: &'a GeneratorConfig,
    resolver: Resolver<'a>,
    extra_imports: BTreeSet<String>,
}

impl<'a> SchemaGenerator<'a> {
    pub fn new(ctx: &'a GenerationContext, config: &'a GeneratorConfig) -> Self {
        Self {
            ctx,
            config,
            resolver: Resolver::new(ctx, config),
            extra_imports: BTreeSet::new(),
        }
    }

    /// Adds imports for types that live in other generated files.
    pub fn with_imports(mut self, imports: impl IntoIterator<Item = String>) -> Self {
        self.extra_imports.extend(imports);
        self
    }

    pub fn resolver(&self) -> &Resolver<'a> {
        &self.resolver
    }

    pub fn generate(&self) -> Result<String, SchemaGenError> {
        let messages = self.resolver.resolve_distinct_messages();
        for message in &messages {
            if let Some(field) = message.unnumbered.first() {
                return Err(SchemaGenError::GenerationError(format!(
                    "message '{}' field '{field}' has no field number",
                    message.name
                )));
            }
        }
        let enums = self.resolver.resolve_enums();
        let services = if self.config.generate_services {
            self.resolver.resolve_services()
        } else {
            Vec::new()
        };

        let mut out = String::new();
        out.push_str(&format!("syntax = \"{}\";\n\n", self.config.syntax));

        if let Some(package) = self.package_name() {
            out.push_str(&format!("package {package};\n\n"));
        }

        let options = self.file_options();
        if !options.is_empty() {
            for line in &options {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }

        let imports = self.imports(&messages, &services);
        if !imports.is_empty() {
            for import in &imports {
                out.push_str(&format!("import \"{import}\";\n"));
            }
            out.push('\n');
        }

        for message in &messages {
            out.push_str(&render_message(message, self.config.is_proto3()));
        }
        for resolved in &enums {
            out.push_str(&render_enum(resolved));
        }
        for service in &services {
            out.push_str(&render_service(service));
        }

        debug!(
            messages = messages.len(),
            enums = enums.len(),
            services = services.len(),
            "rendered schema"
        );

        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        Ok(out)
    }

    /// Explicit config, then a `package` annotation, then the package of the
    /// first declared type.
    pub fn package_name(&self) -> Option<String> {
        if let Some(package) = self.config.package.as_ref().filter(|p| !p.is_empty()) {
            return Some(package.clone());
        }
        if let Some(name) = self
            .ctx
            .scope_annotations()
            .find(|a| a.is(kind::PACKAGE))
            .and_then(|a| a.string("name"))
        {
            return Some(name);
        }
        let declared = self
            .ctx
            .structs
            .iter()
            .map(|s| s.package.as_str())
            .chain(self.ctx.enums.iter().map(|e| e.package.as_str()))
            .chain(self.ctx.services.iter().map(|s| s.package.as_str()))
            .find(|p| !p.is_empty())?;
        Some(package_segment(declared).to_string())
    }

    /// `option` lines: `optimize_for` unquoted first, the rest quoted and
    /// sorted by key. Scope annotations override configuration.
    fn file_options(&self) -> Vec<String> {
        let mut optimize_for = self.config.optimize_for.clone();
        let mut quoted: BTreeMap<String, String> = BTreeMap::new();
        let configured = [
            ("go_package", &self.config.go_package),
            ("java_package", &self.config.java_package),
            ("java_outer_classname", &self.config.java_outer_classname),
        ];
        for (key, value) in configured {
            if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                quoted.insert(key.to_string(), value.clone());
            }
        }
        for (key, value) in &self.config.options {
            quoted.insert(key.clone(), value.clone());
        }
        for ann in self.ctx.scope_annotations().filter(|a| a.is(kind::OPTION)) {
            let (Some(key), Some(value)) = (ann.string("name"), ann.string("value")) else {
                continue;
            };
            if key == "optimize_for" {
                optimize_for = Some(value);
            } else {
                quoted.insert(key, value);
            }
        }

        let mut lines = Vec::new();
        if let Some(mode) = optimize_for.filter(|m| !m.is_empty()) {
            lines.push(format!("option optimize_for = {mode};"));
        }
        for (key, value) in quoted {
            lines.push(format!("option {key} = \"{value}\";"));
        }
        lines
    }

    fn imports(&self, messages: &[ResolvedMessage], services: &[ResolvedService]) -> BTreeSet<String> {
        let types = self.resolver.types();
        let mut imports = self.extra_imports.clone();
        for message in messages {
            for field in &message.fields {
                imports.extend(types.imports_for(&field.ty));
                let mut referenced = vec![field.proto_type.as_str()];
                if let FieldShape::Map { key, .. } = &field.shape {
                    referenced.push(key);
                }
                for proto_type in referenced {
                    if let Some(import) = well_known_import(proto_type) {
                        imports.insert(import.to_string());
                    }
                }
            }
        }
        for service in services {
            for method in &service.methods {
                for proto_type in [&method.input, &method.output] {
                    if let Some(import) = well_known_import(proto_type) {
                        imports.insert(import.to_string());
                    }
                }
            }
        }
        imports.extend(self.config.custom_imports.iter().cloned());
        for ann in self.ctx.scope_annotations().filter(|a| a.is(kind::IMPORT)) {
            if let Some(path) = ann.string("path").or_else(|| ann.string("name")) {
                imports.insert(path);
            }
        }
        imports
    }
}

/// Last path segment of a package path: `example.com/app/models` is `models`.
pub fn package_segment(package: &str) -> &str {
    package
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(package)
}

// ── Message rendering ───────────────────────────────────────────────────────

fn render_message(message: &ResolvedMessage, proto3: bool) -> String {
    let mut out = String::new();
    if let Some(description) = &message.description {
        out.push_str(&format!("// {description}\n"));
    }
    out.push_str(&format!("message {} {{\n", message.name));

    let mut emitted_groups: BTreeSet<&str> = BTreeSet::new();
    for field in &message.fields {
        match &field.oneof {
            None => {
                out.push_str("  ");
                out.push_str(&render_field(field, proto3, "  "));
                out.push('\n');
            }
            Some(group) => {
                if !emitted_groups.insert(group) {
                    continue;
                }
                out.push_str(&format!("  oneof {group} {{\n"));
                for member in message
                    .fields
                    .iter()
                    .filter(|f| f.oneof.as_deref() == Some(group.as_str()))
                {
                    out.push_str("    ");
                    out.push_str(&render_oneof_member(member, "    "));
                    out.push('\n');
                }
                out.push_str("  }\n");
            }
        }
    }

    if !message.reserved_numbers.is_empty() {
        let ranges = compact_reserved_ranges(&message.reserved_numbers);
        out.push_str(&format!("  reserved {};\n", ranges.join(", ")));
    }
    if !message.reserved_names.is_empty() {
        let names: Vec<String> = message
            .reserved_names
            .iter()
            .map(|n| format!("\"{n}\""))
            .collect();
        out.push_str(&format!("  reserved {};\n", names.join(", ")));
    }
    out.push_str("}\n\n");
    out
}

/// One field declaration; `indent` prefixes the declaration when a
/// description comment precedes it.
pub fn render_field(field: &ResolvedField, proto3: bool, indent: &str) -> String {
    let declaration = match &field.shape {
        FieldShape::Map { key, value } => format!("map<{key}, {value}> {}", field.name),
        FieldShape::Repeated => format!("repeated {} {}", field.proto_type, field.name),
        FieldShape::Optional if proto3 => format!("optional {} {}", field.proto_type, field.name),
        _ => format!("{} {}", field.proto_type, field.name),
    };
    finish_field(field, declaration, indent)
}

fn render_oneof_member(field: &ResolvedField, indent: &str) -> String {
    finish_field(field, format!("{} {}", field.proto_type, field.name), indent)
}

fn finish_field(field: &ResolvedField, declaration: String, indent: &str) -> String {
    let mut line = format!("{declaration} = {}", field.number);
    if !field.options.is_empty() {
        line.push_str(&format!(" [{}]", field.options.join(", ")));
    }
    line.push(';');
    match &field.description {
        Some(description) => format!("// {description}\n{indent}{line}"),
        None => line,
    }
}

// ── Enum rendering ──────────────────────────────────────────────────────────

fn render_enum(resolved: &ResolvedEnum) -> String {
    let mut out = String::new();
    if let Some(description) = &resolved.description {
        out.push_str(&format!("// {description}\n"));
    }
    out.push_str(&format!("enum {} {{\n", resolved.name));
    if resolved.allow_alias {
        out.push_str("  option allow_alias = true;\n");
    }
    for value in &resolved.values {
        if let Some(description) = &value.description {
            out.push_str(&format!("  // {description}\n"));
        }
        out.push_str(&format!("  {} = {};\n", value.name, value.number));
    }
    out.push_str("}\n\n");
    out
}

// ── Service rendering ───────────────────────────────────────────────────────

fn render_service(service: &ResolvedService) -> String {
    let mut out = String::new();
    if let Some(description) = &service.description {
        out.push_str(&format!("// {description}\n"));
    }
    out.push_str(&format!("service {} {{\n", service.name));
    for method in &service.methods {
        if let Some(description) = &method.description {
            out.push_str(&format!("  // {description}\n"));
        }
        let input_stream = if method.client_streaming { "stream " } else { "" };
        let output_stream = if method.server_streaming { "stream " } else { "" };
        out.push_str(&format!(
            "  rpc {}({input_stream}{}) returns ({output_stream}{});\n",
            method.name, method.input, method.output
        ));
    }
    out.push_str("}\n\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_expr::TypeExpr;

    fn field(name: &str, shape: FieldShape) -> ResolvedField {
        ResolvedField {
            source_name: name.to_string(),
            name: name.to_string(),
            json_name: name.to_string(),
            number: 4,
            explicit_number: false,
            proto_type: "string".to_string(),
            shape,
            ty: TypeExpr::named("string"),
            options: Vec::new(),
            description: None,
            suppressed_map_key: None,
            oneof: None,
        }
    }

    #[test]
    fn optional_label_only_in_proto3() {
        let f = field("nick", FieldShape::Optional);
        assert_eq!(render_field(&f, true, "  "), "optional string nick = 4;");
        assert_eq!(render_field(&f, false, "  "), "string nick = 4;");
    }

    #[test]
    fn description_precedes_declaration() {
        let mut f = field("tags", FieldShape::Repeated);
        f.description = Some("Free-form labels".to_string());
        f.options = vec!["packed = true".to_string()];
        assert_eq!(
            render_field(&f, true, "  "),
            "// Free-form labels\n  repeated string tags = 4 [packed = true];"
        );
    }

    #[test]
    fn package_segment_takes_last_path_element() {
        assert_eq!(package_segment("example.com/app/models"), "models");
        assert_eq!(package_segment("models"), "models");
    }
}
