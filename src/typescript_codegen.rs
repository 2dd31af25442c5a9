//! TypeScript declaration generation from the resolved IR.

use std::collections::HashSet;

use crate::annotation::kind;
use crate::config::GeneratorConfig;
use crate::ir::{CompositeType, GenerationContext};
use crate::resolver::{ResolvedEnum, ResolvedField, ResolvedMessage, Resolver};
use crate::type_expr::TypeExpr;
use crate::type_map::TypeMapper;

const HEADER: &str = concat!(
    "// TypeScript definitions generated from protobuf annotations\n",
    "// DO NOT EDIT\n\n",
);

const TYPESCRIPT_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "new",
    "null",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "as",
    "implements",
    "interface",
    "let",
    "package",
    "private",
    "protected",
    "public",
    "static",
    "yield",
];

/// Generates TypeScript declarations: enums first, then the composite types
/// in declaration order.
pub fn generate_typescript(ctx: &GenerationContext, config: &GeneratorConfig) -> String {
    let resolver = Resolver::new(ctx, config);

    let mut blocks: Vec<String> = Vec::new();
    for resolved in resolver.resolve_enums() {
        blocks.push(render_enum(&resolved));
    }
    for composite in &ctx.structs {
        blocks.extend(render_composite(&resolver, composite));
    }

    let mut out = HEADER.to_string();
    out.push_str(&blocks.join("\n\n"));
    if !blocks.is_empty() {
        out.push('\n');
    }
    out
}

fn render_composite(resolver: &Resolver<'_>, composite: &CompositeType) -> Vec<String> {
    let types = resolver.types();
    if composite.is_generic_template() {
        if composite.has_annotation(kind::IGNORE) || composite.has_annotation(kind::SKIP) {
            return Vec::new();
        }
        let resolved = resolver.resolve_message(composite, &composite.name);
        return vec![render_interface(&resolved, &composite.type_params, types)];
    }
    let Some(alias) = &composite.alias else {
        let mut seen = HashSet::new();
        let mut names = composite.message_names();
        names.retain(|name| seen.insert(name.clone()));
        return names
            .iter()
            .map(|message| render_interface(&resolver.resolve_message(composite, message), &[], types))
            .collect();
    };

    let target = ts_named(&alias.target, types);
    let rendered = if alias.type_args.is_empty() {
        target
    } else {
        let args: Vec<String> = alias.type_args.iter().map(|a| ts_type(a, types)).collect();
        format!("{target}<{}>", args.join(", "))
    };
    let mut out = String::new();
    if let Some(description) = composite.doc.as_deref().and_then(first_line) {
        out.push_str(&format!("/** {description} */\n"));
    }
    out.push_str(&format!("export type {} = {rendered};", composite.name));
    vec![out]
}

fn render_enum(resolved: &ResolvedEnum) -> String {
    let mut out = String::new();
    if let Some(description) = &resolved.description {
        out.push_str(&format!("/** {description} */\n"));
    }
    out.push_str(&format!("export enum {} {{\n", resolved.name));
    for value in &resolved.values {
        out.push_str(&format!("  {} = {},\n", value.name, value.number));
    }
    out.push('}');
    out
}

fn render_interface(message: &ResolvedMessage, type_params: &[String], types: TypeMapper<'_>) -> String {
    let mut out = String::new();
    if let Some(description) = &message.description {
        out.push_str(&format!("/** {description} */\n"));
    }
    let generics = if type_params.is_empty() {
        String::new()
    } else {
        format!("<{}>", type_params.join(", "))
    };
    out.push_str(&format!("export interface {}{generics} {{\n", message.name));
    for field in &message.fields {
        if let Some(description) = &field.description {
            out.push_str(&format!("  /** {description} */\n"));
        }
        let optional = if is_optional(field) { "?" } else { "" };
        out.push_str(&format!(
            "  {}{optional}: {};\n",
            render_property_name(&field.json_name),
            ts_type(&field.ty, types)
        ));
    }
    out.push('}');
    out
}

fn is_optional(field: &ResolvedField) -> bool {
    field.is_nullable() || field.oneof.is_some()
}

// ── Type translation ────────────────────────────────────────────────────────

/// TypeScript rendering of a declared type expression.
pub fn ts_type(ty: &TypeExpr, types: TypeMapper<'_>) -> String {
    match ty {
        TypeExpr::Pointer(inner) => ts_type(inner, types),
        _ if ty.is_byte_sequence() => "Uint8Array".to_string(),
        TypeExpr::Sequence(inner) => {
            let item = ts_type(inner, types);
            if item.contains(' ') {
                format!("({item})[]")
            } else {
                format!("{item}[]")
            }
        }
        TypeExpr::Map(_, value) => format!("Record<string, {}>", ts_type(value, types)),
        TypeExpr::Generic { base, args } => {
            let args: Vec<String> = args.iter().map(|a| ts_type(a, types)).collect();
            format!("{}<{}>", ts_named(base, types), args.join(", "))
        }
        TypeExpr::Named(name) => ts_named(name, types),
    }
}

fn ts_named(name: &str, types: TypeMapper<'_>) -> String {
    match name {
        "time.Time" => return "string | Date".to_string(),
        "any" | "interface{}" => return "any".to_string(),
        _ => {}
    }
    let mapped = types.map_named(name);
    let rendered = match mapped.as_str() {
        "string" => "string",
        "bool" => "boolean",
        "bytes" => "Uint8Array",
        "double" | "float" | "int32" | "int64" | "uint32" | "uint64" | "sint32" | "sint64"
        | "fixed32" | "fixed64" | "sfixed32" | "sfixed64" => "number",
        "google.protobuf.Timestamp" => "string | Date",
        "google.protobuf.Duration" => "string",
        "google.protobuf.Any" | "google.protobuf.Value" => "any",
        "google.protobuf.Struct" => "Record<string, any>",
        "google.protobuf.Empty" => "Record<string, never>",
        "google.protobuf.StringValue" => "string",
        "google.protobuf.BoolValue" => "boolean",
        "google.protobuf.BytesValue" => "Uint8Array",
        wrapper if wrapper.starts_with("google.protobuf.") && wrapper.ends_with("Value") => {
            "number"
        }
        other => return other.rsplit('.').next().unwrap_or(other).to_string(),
    };
    rendered.to_string()
}

fn first_line(doc: &str) -> Option<&str> {
    doc.lines().map(str::trim).find(|l| !l.is_empty())
}

fn render_property_name(raw: &str) -> String {
    if is_valid_ts_identifier(raw) && !is_typescript_keyword(raw) {
        raw.to_string()
    } else {
        format!("\"{}\"", escape_string(raw))
    }
}

fn is_valid_ts_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    if !(first == '_' || first == '$' || first.is_ascii_alphabetic()) {
        return false;
    }

    chars.all(|ch| ch == '_' || ch == '$' || ch.is_ascii_alphanumeric())
}

fn is_typescript_keyword(text: &str) -> bool {
    TYPESCRIPT_KEYWORDS.iter().any(|kw| kw == &text)
}

fn escape_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> TypeExpr {
        s.parse().expect("type should parse")
    }

    #[test]
    fn translates_nested_type_expressions() {
        let config = GeneratorConfig::default();
        let types = TypeMapper::new(&config);
        assert_eq!(ts_type(&ty("[]*models.User"), types), "User[]");
        assert_eq!(ts_type(&ty("map[string][]int64"), types), "Record<string, number[]>");
        assert_eq!(ts_type(&ty("Page[models.User]"), types), "Page<User>");
        assert_eq!(ts_type(&ty("Pair[string, *bool]"), types), "Pair<string, boolean>");
        assert_eq!(ts_type(&ty("[]time.Time"), types), "(string | Date)[]");
        assert_eq!(ts_type(&ty("[]byte"), types), "Uint8Array");
        assert_eq!(ts_type(&ty("T"), types), "T");
    }

    #[test]
    fn quotes_keywords_and_invalid_identifiers() {
        assert_eq!(render_property_name("userId"), "userId");
        assert_eq!(render_property_name("default"), "\"default\"");
        assert_eq!(render_property_name("x-trace"), "\"x-trace\"");
    }
}
