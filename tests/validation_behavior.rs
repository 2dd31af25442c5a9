//! Validation findings as seen through the public API.

use proto_schemagen::validator::{ensure_valid, validate};
use proto_schemagen::{generate, GenerationContext, GeneratorConfig, SchemaGenError, Severity};
use serde_json::json;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn context(ir: serde_json::Value) -> GenerationContext {
    serde_json::from_value(ir).expect("context should deserialize")
}

fn errors(ctx: &GenerationContext) -> Vec<String> {
    validate(ctx, &GeneratorConfig::default())
        .into_iter()
        .filter(|f| f.severity == Severity::Error)
        .map(|f| format!("{}: {}", f.location, f.message))
        .collect()
}

// ── Messages ────────────────────────────────────────────────────────────────

#[test]
fn duplicate_field_number_is_one_error_naming_both_fields() {
    let ctx = context(json!({
        "structs": [{
            "name": "Item",
            "fields": [
                { "name": "X", "type": "string", "tag": "proto:\"x,number=1\"" },
                { "name": "Y", "type": "string", "tag": "proto:\"y,number=1\"" }
            ]
        }]
    }));
    assert_eq!(
        errors(&ctx),
        vec!["Item.y: duplicate field number 1 (also used by field 'x')".to_string()]
    );

    let err = generate(&ctx, &GeneratorConfig::default()).expect_err("duplicates block output");
    match err {
        SchemaGenError::ValidationError { count, findings } => {
            assert_eq!(count, 1);
            assert_eq!(findings[0].severity, Severity::Error);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn configured_reservations_collide_with_explicit_numbers() {
    let ctx = context(json!({
        "structs": [{
            "name": "Item",
            "fields": [{ "name": "Legacy", "type": "string", "tag": "proto:\"legacy,number=5\"" }]
        }]
    }));
    let mut config = GeneratorConfig::default();
    config.reserved_numbers = vec![5];
    let findings = validate(&ctx, &config);
    assert!(
        findings.iter().any(|f| f.message == "field number 5 is reserved"),
        "{findings:?}"
    );
}

#[test]
fn auto_numbering_skips_reserved_numbers() {
    let ctx = context(json!({
        "structs": [{
            "name": "Item",
            "fields": [
                { "name": "A", "type": "string" },
                { "name": "B", "type": "string" }
            ]
        }]
    }));
    let mut config = GeneratorConfig::default();
    config.reserved_numbers = vec![1];
    assert!(ensure_valid(&ctx, &config).is_ok());
}

#[test]
fn duplicate_message_names_across_types() {
    let ctx = context(json!({
        "structs": [
            { "name": "A", "annotations": [{ "name": "message", "params": { "name": "Shared" } }], "fields": [{ "name": "X", "type": "string" }] },
            { "name": "B", "annotations": [{ "name": "message", "params": { "name": "Shared" } }], "fields": [{ "name": "Y", "type": "string" }] }
        ]
    }));
    assert_eq!(
        errors(&ctx),
        vec!["Shared: duplicate message name 'Shared' (also produced by type 'A')".to_string()]
    );
}

#[test]
fn repeated_message_annotation_on_one_type_is_a_duplicate() {
    let ctx = context(json!({
        "structs": [{
            "name": "User",
            "annotations": [
                { "name": "message", "params": { "name": "UserView" } },
                { "name": "message", "params": { "name": "UserView" } }
            ],
            "fields": [{ "name": "ID", "type": "int64" }]
        }]
    }));
    assert_eq!(
        errors(&ctx),
        vec!["UserView: duplicate message name 'UserView' (also produced by type 'User')".to_string()]
    );
    let err = generate(&ctx, &GeneratorConfig::default()).expect_err("duplicate names block output");
    assert!(matches!(err, SchemaGenError::ValidationError { count: 1, .. }), "got {err:?}");
}

#[test]
fn field_numbers_past_the_range_never_panic() {
    let ctx = context(json!({
        "structs": [{ "name": "Item", "fields": [{ "name": "A", "type": "string" }] }]
    }));
    let mut config = GeneratorConfig::default();
    config.start_field_number = u32::MAX;

    let err = generate(&ctx, &config).expect_err("out of range start is rejected");
    assert!(matches!(err, SchemaGenError::ConfigError(_)), "got {err:?}");

    let findings = validate(&ctx, &config);
    assert_eq!(findings.len(), 1, "{findings:?}");
    assert_eq!(findings[0].severity, Severity::Error);
    assert_eq!(findings[0].location, "Item.A");
}

#[test]
fn repeated_members_cannot_join_a_oneof() {
    let ctx = context(json!({
        "structs": [{
            "name": "Choice",
            "fields": [
                { "name": "Text", "type": "string", "annotations": [{ "name": "oneof", "params": { "name": "value" } }] },
                { "name": "Tags", "type": "[]string", "annotations": [{ "name": "oneof", "params": { "name": "value" } }] }
            ]
        }]
    }));
    assert_eq!(
        errors(&ctx),
        vec!["Choice.tags: field in oneof 'value' cannot be repeated or a map".to_string()]
    );
}

// ── Enums ───────────────────────────────────────────────────────────────────

#[test]
fn duplicate_enum_numbers_without_alias_are_errors() {
    let ctx = context(json!({
        "enums": [{
            "name": "Status",
            "values": [
                { "name": "Unknown" },
                { "name": "Started", "annotations": [{ "name": "enumvalue", "params": { "number": 1 } }] },
                { "name": "Running", "annotations": [{ "name": "enumvalue", "params": { "number": 1 } }] }
            ]
        }]
    }));
    assert_eq!(
        errors(&ctx),
        vec!["Status.RUNNING: duplicate enum value number 1 (also used by 'STARTED')".to_string()]
    );
}

#[test]
fn enum_conflicting_with_message_is_an_error() {
    let ctx = context(json!({
        "structs": [{ "name": "Kind", "fields": [{ "name": "X", "type": "string" }] }],
        "enums": [{ "name": "Kind", "values": [{ "name": "Unknown" }] }]
    }));
    assert_eq!(
        errors(&ctx),
        vec!["Kind: enum name 'Kind' conflicts with a message".to_string()]
    );
}

#[test]
fn nonzero_first_enum_value_only_warns() {
    let ctx = context(json!({
        "enums": [{
            "name": "Level",
            "values": [{ "name": "Low", "annotations": [{ "name": "enumvalue", "params": { "number": 3 } }] }]
        }]
    }));
    let findings = ensure_valid(&ctx, &GeneratorConfig::default()).expect("warnings do not block");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Warning);
    assert!(findings[0].message.contains("proto3 requires the first value to be 0"));
}
