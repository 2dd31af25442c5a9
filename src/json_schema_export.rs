//! Resolved IR → JSON Schema (draft 2020-12) export.
//!
//! Every emitted message and enum appears under `$defs`; the root
//! `properties` map points at each message by its lowercased name.

use std::collections::HashSet;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::config::GeneratorConfig;
use crate::error::SchemaGenError;
use crate::ir::GenerationContext;
use crate::proto_codegen::SchemaGenerator;
use crate::resolver::{FieldShape, ResolvedEnum, ResolvedField, ResolvedMessage};

const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

// ── Public API ─────────────────────────────────────────────────────────────

/// Renders the JSON Schema document for `ctx`. Set `pretty` to `true` for
/// indented output.
pub fn to_json_schema(
    ctx: &GenerationContext,
    config: &GeneratorConfig,
    pretty: bool,
) -> Result<String, SchemaGenError> {
    let root_value = json_schema_document(ctx, config);
    if pretty {
        serde_json::to_string_pretty(&root_value)
            .map_err(|e| SchemaGenError::SerializationError(e.to_string()))
    } else {
        serde_json::to_string(&root_value)
            .map_err(|e| SchemaGenError::SerializationError(e.to_string()))
    }
}

/// Builds the JSON Schema document as a value.
pub fn json_schema_document(ctx: &GenerationContext, config: &GeneratorConfig) -> JsonValue {
    let generator = SchemaGenerator::new(ctx, config);
    let resolver = generator.resolver();
    let messages = resolver.resolve_distinct_messages();
    let enums = resolver.resolve_enums();

    let defined: HashSet<&str> = messages
        .iter()
        .map(|m| m.name.as_str())
        .chain(enums.iter().map(|e| e.name.as_str()))
        .collect();

    let mut defs = JsonMap::new();
    let mut properties = JsonMap::new();
    for message in &messages {
        defs.insert(message.name.clone(), convert_message(message, &defined));
        properties.insert(
            message.name.to_lowercase(),
            JsonValue::Object(reference(&message.name)),
        );
    }
    for resolved in &enums {
        defs.insert(resolved.name.clone(), convert_enum(resolved));
    }

    let title = generator
        .package_name()
        .unwrap_or_else(|| "generated".to_string());

    let mut root = JsonMap::new();
    root.insert("$schema".to_string(), JsonValue::String(DRAFT_2020_12.to_string()));
    root.insert("title".to_string(), JsonValue::String(title));
    root.insert(
        "description".to_string(),
        JsonValue::String("JSON Schema generated from protobuf annotations".to_string()),
    );
    root.insert("type".to_string(), JsonValue::String("object".to_string()));
    root.insert("properties".to_string(), JsonValue::Object(properties));
    root.insert("$defs".to_string(), JsonValue::Object(defs));
    JsonValue::Object(root)
}

// ── Conversion helpers ──────────────────────────────────────────────────────

fn convert_message(message: &ResolvedMessage, defined: &HashSet<&str>) -> JsonValue {
    let mut properties = JsonMap::new();
    let mut required = Vec::new();
    for field in &message.fields {
        properties.insert(field.json_name.clone(), convert_field(field, defined));
        if !field.is_nullable() && field.oneof.is_none() {
            required.push(JsonValue::String(field.json_name.clone()));
        }
    }

    let mut out = JsonMap::new();
    out.insert("type".to_string(), JsonValue::String("object".to_string()));
    if let Some(description) = &message.description {
        out.insert("description".to_string(), JsonValue::String(description.clone()));
    }
    out.insert("properties".to_string(), JsonValue::Object(properties));
    if !required.is_empty() {
        out.insert("required".to_string(), JsonValue::Array(required));
    }
    JsonValue::Object(out)
}

fn convert_field(field: &ResolvedField, defined: &HashSet<&str>) -> JsonValue {
    let mut schema = match &field.shape {
        FieldShape::Map { value, .. } => {
            let mut out = JsonMap::new();
            out.insert("type".to_string(), JsonValue::String("object".to_string()));
            out.insert(
                "additionalProperties".to_string(),
                JsonValue::Object(convert_proto_type(value, defined)),
            );
            out
        }
        FieldShape::Repeated => {
            let mut out = JsonMap::new();
            out.insert("type".to_string(), JsonValue::String("array".to_string()));
            out.insert(
                "items".to_string(),
                JsonValue::Object(convert_proto_type(&field.proto_type, defined)),
            );
            out
        }
        FieldShape::Singular | FieldShape::Optional => convert_proto_type(&field.proto_type, defined),
    };
    if let Some(description) = &field.description {
        // `$ref` siblings are allowed in 2020-12
        schema.insert("description".to_string(), JsonValue::String(description.clone()));
    }
    JsonValue::Object(schema)
}

/// Schema for a single (element) schema type.
fn convert_proto_type(proto_type: &str, defined: &HashSet<&str>) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    let simple = match proto_type {
        "int32" | "int64" | "uint32" | "uint64" | "sint32" | "sint64" | "fixed32" | "fixed64"
        | "sfixed32" | "sfixed64" => Some("integer"),
        "double" | "float" => Some("number"),
        "bool" => Some("boolean"),
        "string" => Some("string"),
        _ => None,
    };
    if let Some(json_type) = simple {
        out.insert("type".to_string(), JsonValue::String(json_type.to_string()));
        return out;
    }

    match proto_type {
        "bytes" | "google.protobuf.BytesValue" => {
            out.insert("type".to_string(), JsonValue::String("string".to_string()));
            out.insert(
                "contentEncoding".to_string(),
                JsonValue::String("base64".to_string()),
            );
        }
        "google.protobuf.Timestamp" => {
            out.insert("type".to_string(), JsonValue::String("string".to_string()));
            out.insert("format".to_string(), JsonValue::String("date-time".to_string()));
        }
        "google.protobuf.Duration" => {
            out.insert("type".to_string(), JsonValue::String("string".to_string()));
            out.insert("pattern".to_string(), JsonValue::String(r"^-?\d+(\.\d+)?s$".to_string()));
        }
        "google.protobuf.Struct" | "google.protobuf.Empty" | "google.protobuf.Any" => {
            out.insert("type".to_string(), JsonValue::String("object".to_string()));
        }
        "google.protobuf.Value" => {}
        "google.protobuf.ListValue" => {
            out.insert("type".to_string(), JsonValue::String("array".to_string()));
        }
        wrapper if wrapper.starts_with("google.protobuf.") && wrapper.ends_with("Value") => {
            let scalar = wrapper_scalar(wrapper);
            return convert_proto_type(scalar, defined);
        }
        named if defined.contains(named) => return reference(named),
        _ => {
            out.insert("type".to_string(), JsonValue::String("string".to_string()));
        }
    }
    out
}

fn wrapper_scalar(wrapper: &str) -> &'static str {
    match wrapper.trim_start_matches("google.protobuf.") {
        "BoolValue" => "bool",
        "Int32Value" | "UInt32Value" | "Int64Value" | "UInt64Value" => "int64",
        "FloatValue" | "DoubleValue" => "double",
        _ => "string",
    }
}

fn convert_enum(resolved: &ResolvedEnum) -> JsonValue {
    let names: Vec<JsonValue> = resolved
        .values
        .iter()
        .map(|v| JsonValue::String(v.name.clone()))
        .collect();
    let mut out = JsonMap::new();
    out.insert("type".to_string(), JsonValue::String("string".to_string()));
    if let Some(description) = &resolved.description {
        out.insert("description".to_string(), JsonValue::String(description.clone()));
    }
    out.insert("enum".to_string(), JsonValue::Array(names));
    JsonValue::Object(out)
}

fn reference(name: &str) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    out.insert("$ref".to_string(), JsonValue::String(format!("#/$defs/{name}")));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(ir: JsonValue) -> JsonValue {
        let ctx: GenerationContext = serde_json::from_value(ir).expect("context should deserialize");
        let out = to_json_schema(&ctx, &GeneratorConfig::default(), true).expect("export should succeed");
        serde_json::from_str(&out).expect("output should be valid JSON")
    }

    #[test]
    fn messages_reference_each_other_through_defs() {
        let doc = document(json!({
            "structs": [
                {
                    "name": "Order",
                    "package": "example.com/shop",
                    "fields": [
                        { "name": "ID", "type": "int64" },
                        { "name": "Buyer", "type": "*User" },
                        { "name": "Lines", "type": "[]LineItem" },
                        { "name": "PlacedAt", "type": "time.Time" }
                    ]
                },
                { "name": "User", "fields": [{ "name": "Name", "type": "string" }] },
                { "name": "LineItem", "fields": [{ "name": "Qty", "type": "int" }] }
            ]
        }));
        assert_eq!(doc["$schema"], DRAFT_2020_12);
        assert_eq!(doc["title"], "shop");
        assert_eq!(doc["properties"]["order"]["$ref"], "#/$defs/Order");

        let order = &doc["$defs"]["Order"];
        assert_eq!(order["properties"]["id"]["type"], "integer");
        assert_eq!(order["properties"]["buyer"]["$ref"], "#/$defs/User");
        assert_eq!(order["properties"]["lines"]["items"]["$ref"], "#/$defs/LineItem");
        assert_eq!(order["properties"]["placedAt"]["format"], "date-time");
        assert_eq!(order["required"], json!(["id", "lines", "placedAt"]));
    }

    #[test]
    fn maps_and_enums() {
        let doc = document(json!({
            "structs": [{
                "name": "Inventory",
                "fields": [{ "name": "Counts", "type": "map[string]int32" }]
            }],
            "enums": [{
                "name": "Color",
                "values": [{ "name": "Unknown" }, { "name": "Red" }]
            }]
        }));
        let counts = &doc["$defs"]["Inventory"]["properties"]["counts"];
        assert_eq!(counts["type"], "object");
        assert_eq!(counts["additionalProperties"]["type"], "integer");
        assert_eq!(doc["$defs"]["Color"]["enum"], json!(["UNKNOWN", "RED"]));
        assert_eq!(doc["title"], "generated");
    }
}
