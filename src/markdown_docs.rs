//! Markdown reference documentation for a generated schema.

use crate::config::GeneratorConfig;
use crate::ir::GenerationContext;
use crate::proto_codegen::SchemaGenerator;
use crate::resolver::{
    compact_reserved_ranges, FieldShape, ResolvedEnum, ResolvedField, ResolvedMessage,
    ResolvedService,
};

/// Renders one Markdown document covering every message, enum and service
/// in `ctx`.
pub fn generate_markdown(ctx: &GenerationContext, config: &GeneratorConfig) -> String {
    let generator = SchemaGenerator::new(ctx, config);
    let resolver = generator.resolver();
    let messages = resolver.resolve_distinct_messages();
    let enums = resolver.resolve_enums();
    let services = if config.generate_services {
        resolver.resolve_services()
    } else {
        Vec::new()
    };
    let package = generator
        .package_name()
        .unwrap_or_else(|| "schema".to_string());

    let mut out = String::new();
    out.push_str(&format!("# {package} Protocol Buffer Documentation\n\n"));
    out.push_str("Generated from annotated source types.\n\n");

    out.push_str("## Table of Contents\n\n");
    let sections = [
        ("Messages", "messages", !messages.is_empty()),
        ("Enums", "enums", !enums.is_empty()),
        ("Services", "services", !services.is_empty()),
    ];
    for (title, anchor, present) in sections {
        if present {
            out.push_str(&format!("- [{title}](#{anchor})\n"));
        }
    }
    out.push('\n');

    if !messages.is_empty() {
        out.push_str("## Messages\n\n");
        for message in &messages {
            render_message(&mut out, ctx, message);
        }
    }
    if !enums.is_empty() {
        out.push_str("## Enums\n\n");
        for resolved in &enums {
            render_enum(&mut out, resolved);
        }
    }
    if !services.is_empty() {
        out.push_str("## Services\n\n");
        for service in &services {
            render_service(&mut out, service);
        }
    }

    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

fn render_message(out: &mut String, ctx: &GenerationContext, message: &ResolvedMessage) {
    out.push_str(&format!("### {}\n\n", message.name));
    if let Some(description) = &message.description {
        out.push_str(&format!("{}\n\n", cell(description)));
    }
    let alias = ctx
        .find_struct(&message.source_name)
        .and_then(|s| s.alias.as_ref());
    if let Some(alias) = alias {
        let args: Vec<String> = alias.type_args.iter().map(ToString::to_string).collect();
        let instantiated = if args.is_empty() {
            alias.target.clone()
        } else {
            format!("{}[{}]", alias.target, args.join(", "))
        };
        out.push_str(&format!("Type alias for `{instantiated}`.\n\n"));
    }

    if message.fields.is_empty() {
        out.push_str("_No fields._\n\n");
    } else {
        out.push_str("| Field | Number | Type | Description |\n");
        out.push_str("|-------|--------|------|-------------|\n");
        for field in &message.fields {
            out.push_str(&format!(
                "| {} | {} | `{}` | {} |\n",
                field.name,
                field.number,
                field_type(field),
                field.description.as_deref().map(cell).unwrap_or_default()
            ));
        }
        out.push('\n');
    }

    if !message.reserved_numbers.is_empty() || !message.reserved_names.is_empty() {
        let mut reserved = compact_reserved_ranges(&message.reserved_numbers);
        reserved.extend(message.reserved_names.iter().map(|n| format!("\"{n}\"")));
        out.push_str(&format!("Reserved: {}\n\n", reserved.join(", ")));
    }
}

fn field_type(field: &ResolvedField) -> String {
    let base = match &field.shape {
        FieldShape::Map { key, value } => format!("map<{key}, {value}>"),
        FieldShape::Repeated => format!("repeated {}", field.proto_type),
        FieldShape::Optional => format!("optional {}", field.proto_type),
        FieldShape::Singular => field.proto_type.clone(),
    };
    match &field.oneof {
        Some(group) => format!("{base} (oneof {group})"),
        None => base,
    }
}

fn render_enum(out: &mut String, resolved: &ResolvedEnum) {
    out.push_str(&format!("### {}\n\n", resolved.name));
    if let Some(description) = &resolved.description {
        out.push_str(&format!("{}\n\n", cell(description)));
    }
    out.push_str("| Name | Value | Description |\n");
    out.push_str("|------|-------|-------------|\n");
    for value in &resolved.values {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            value.name,
            value.number,
            value.description.as_deref().map(cell).unwrap_or_default()
        ));
    }
    out.push('\n');
}

fn render_service(out: &mut String, service: &ResolvedService) {
    out.push_str(&format!("### {}\n\n", service.name));
    if let Some(description) = &service.description {
        out.push_str(&format!("{}\n\n", cell(description)));
    }
    out.push_str("| Method | Input | Output | Description |\n");
    out.push_str("|--------|-------|--------|-------------|\n");
    for method in &service.methods {
        let input_stream = if method.client_streaming { "stream " } else { "" };
        let output_stream = if method.server_streaming { "stream " } else { "" };
        out.push_str(&format!(
            "| {} | `{input_stream}{}` | `{output_stream}{}` | {} |\n",
            method.name,
            method.input,
            method.output,
            method.description.as_deref().map(cell).unwrap_or_default()
        ));
    }
    out.push('\n');
}

/// Escapes text for a table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(ir: serde_json::Value) -> String {
        let ctx: GenerationContext = serde_json::from_value(ir).expect("context should deserialize");
        generate_markdown(&ctx, &GeneratorConfig::default())
    }

    #[test]
    fn tables_for_messages_and_enums() {
        let out = render(json!({
            "structs": [{
                "name": "User",
                "package": "example.com/accounts",
                "doc": "An account holder.",
                "fields": [
                    { "name": "ID", "type": "int64" },
                    { "name": "Tags", "type": "[]string", "doc": "Labels | free form" }
                ]
            }],
            "enums": [{ "name": "Role", "values": [{ "name": "Guest" }, { "name": "Admin" }] }]
        }));
        assert!(out.starts_with("# accounts Protocol Buffer Documentation\n"), "header:\n{out}");
        assert!(out.contains("- [Messages](#messages)\n- [Enums](#enums)\n\n"), "toc:\n{out}");
        assert!(!out.contains("[Services]"), "no services section expected:\n{out}");
        assert!(out.contains("| id | 1 | `int64` |  |"), "id row:\n{out}");
        assert!(
            out.contains("| tags | 2 | `repeated string` | Labels \\| free form |"),
            "tags row:\n{out}"
        );
        assert!(out.contains("| ADMIN | 1 |  |"), "enum row:\n{out}");
    }

    #[test]
    fn alias_note_and_streaming_service() {
        let out = render(json!({
            "structs": [
                { "name": "Page", "type_params": ["T"], "fields": [{ "name": "Items", "type": "[]T" }] },
                { "name": "UserPage", "alias": { "target": "Page", "type_args": ["User"] } }
            ],
            "services": [{
                "name": "Feed",
                "annotations": [{ "name": "service" }],
                "methods": [{
                    "name": "Watch",
                    "params": [{ "name": "ctx", "type": "context.Context" }, { "name": "req", "type": "*UserPage" }],
                    "annotations": [{ "name": "rpc", "params": { "server_streaming": true } }]
                }]
            }]
        }));
        assert!(out.contains("Type alias for `Page[User]`."), "alias note:\n{out}");
        assert!(out.contains("| items | 1 | `repeated User` |"), "alias fields:\n{out}");
        assert!(
            out.contains("| Watch | `UserPage` | `stream google.protobuf.Empty` |"),
            "service row:\n{out}"
        );
    }
}
