//! JSON Schema and Markdown renderings of the same IR the schema comes from.

use proto_schemagen::{generate_format, GenerationContext, GeneratorConfig, OutputFormat, SchemaGenError};
use serde_json::{json, Value};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn catalog() -> GenerationContext {
    serde_json::from_value(json!({
        "structs": [
            {
                "name": "Product",
                "package": "example.com/catalog",
                "doc": "A sellable item.",
                "fields": [
                    { "name": "SKU", "type": "string", "tag": "proto:\"sku\" json:\"sku\"" },
                    { "name": "Price", "type": "float64", "doc": "Unit price | gross" },
                    { "name": "Tags", "type": "[]string" },
                    { "name": "Discount", "type": "*float64" },
                    { "name": "Attributes", "type": "map[string]string" },
                    { "name": "AddedAt", "type": "time.Time" },
                    { "name": "Tier", "type": "Tier" }
                ]
            }
        ],
        "enums": [{ "name": "Tier", "values": [{ "name": "Basic" }, { "name": "Premium" }] }],
        "services": [{
            "name": "Catalog",
            "annotations": [{ "name": "service" }],
            "methods": [{
                "name": "Get",
                "params": [{ "name": "ctx", "type": "context.Context" }, { "name": "sku", "type": "string" }],
                "results": [{ "type": "*Product" }, { "type": "error" }]
            }]
        }]
    }))
    .expect("context should deserialize")
}

fn render(format: OutputFormat) -> String {
    generate_format(&catalog(), &GeneratorConfig::default(), format).expect("render should succeed")
}

// ── JSON Schema ─────────────────────────────────────────────────────────────

#[test]
fn json_schema_defines_messages_and_enums() {
    let doc: Value = serde_json::from_str(&render(OutputFormat::JsonSchema)).expect("valid JSON");
    assert_eq!(doc["$schema"], "https://json-schema.org/draft/2020-12/schema");
    assert_eq!(doc["title"], "catalog");
    assert_eq!(doc["properties"]["product"]["$ref"], "#/$defs/Product");

    let product = &doc["$defs"]["Product"];
    assert_eq!(product["description"], "A sellable item.");
    let props = &product["properties"];
    assert_eq!(props["sku"]["type"], "string");
    assert_eq!(props["price"]["type"], "number");
    assert_eq!(props["tags"]["type"], "array");
    assert_eq!(props["tags"]["items"]["type"], "string");
    assert_eq!(props["attributes"]["additionalProperties"]["type"], "string");
    assert_eq!(props["addedAt"]["format"], "date-time");
    assert_eq!(props["tier"]["$ref"], "#/$defs/Tier");

    let required: Vec<&str> = product["required"]
        .as_array()
        .expect("required list")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(required.contains(&"sku"));
    assert!(!required.contains(&"discount"), "nullable fields are optional: {required:?}");

    assert_eq!(doc["$defs"]["Tier"]["enum"], json!(["BASIC", "PREMIUM"]));
}

// ── Markdown ────────────────────────────────────────────────────────────────

#[test]
fn markdown_documents_every_section() {
    let out = render(OutputFormat::Markdown);
    assert!(out.starts_with("# catalog Protocol Buffer Documentation\n"), "title:\n{out}");
    assert!(out.contains("- [Messages](#messages)\n- [Enums](#enums)\n- [Services](#services)"), "toc:\n{out}");
    assert!(out.contains("| price | 2 | `double` | Unit price \\| gross |"), "escaped cell:\n{out}");
    assert!(out.contains("| tags | 3 | `repeated string` |"), "repeated row:\n{out}");
    assert!(out.contains("| discount | 4 | `optional double` |"), "optional row:\n{out}");
    assert!(out.contains("| attributes | 5 | `map<string, string>` |"), "map row:\n{out}");
    assert!(out.contains("| BASIC | 0 |"), "enum row:\n{out}");
    assert!(
        out.contains("| Get | `google.protobuf.StringValue` | `Product` |"),
        "method row:\n{out}"
    );
}

// ── Unsupported ─────────────────────────────────────────────────────────────

#[test]
fn descriptor_output_is_rejected() {
    let err = generate_format(&catalog(), &GeneratorConfig::default(), OutputFormat::Descriptor)
        .expect_err("descriptor sets are not produced");
    assert!(matches!(err, SchemaGenError::GenerationError(_)), "got {err:?}");
    assert!(err.to_string().contains("descriptor"), "{err}");
}
