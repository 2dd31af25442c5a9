use proto_schemagen::{generate_format, GenerationContext, GeneratorConfig, OutputFormat};
use serde_json::json;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn typescript(ir: serde_json::Value) -> String {
    let ctx: GenerationContext = serde_json::from_value(ir).expect("context should deserialize");
    generate_format(&ctx, &GeneratorConfig::default(), OutputFormat::TypeScript)
        .expect("render should succeed")
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[test]
fn enums_precede_interfaces_with_mapped_field_types() {
    let out = typescript(json!({
        "structs": [{
            "name": "Account",
            "doc": "A customer account.",
            "fields": [
                { "name": "ID", "type": "int64" },
                { "name": "Avatar", "type": "[]byte" },
                { "name": "Nickname", "type": "*string" },
                { "name": "Labels", "type": "map[string]string" },
                { "name": "Friends", "type": "[]*Account" },
                { "name": "CreatedAt", "type": "time.Time" },
                { "name": "State", "type": "State" }
            ]
        }],
        "enums": [{ "name": "State", "values": [{ "name": "Active" }, { "name": "Closed" }] }]
    }));

    assert!(out.starts_with("// TypeScript definitions generated from protobuf annotations\n"), "header:\n{out}");
    let expected = "export enum State {\n  ACTIVE = 0,\n  CLOSED = 1,\n}\n\n\
/** A customer account. */\n\
export interface Account {\n\
  id: number;\n\
  avatar: Uint8Array;\n\
  nickname?: string;\n\
  labels: Record<string, string>;\n\
  friends: Account[];\n\
  createdAt: string | Date;\n\
  state: State;\n\
}\n";
    assert!(out.ends_with(expected), "declarations:\n{out}");
}

#[test]
fn generic_templates_become_generic_interfaces() {
    let out = typescript(json!({
        "structs": [
            {
                "name": "Page",
                "type_params": ["T"],
                "fields": [{ "name": "Items", "type": "[]T" }, { "name": "Total", "type": "int64" }]
            },
            { "name": "UserPage", "alias": { "target": "Page", "type_args": ["*models.User"] } },
            { "name": "User", "fields": [{ "name": "Name", "type": "string" }] }
        ]
    }));
    assert!(
        out.contains("export interface Page<T> {\n  items: T[];\n  total: number;\n}"),
        "generic interface:\n{out}"
    );
    assert!(out.contains("export type UserPage = Page<User>;"), "alias:\n{out}");
}

#[test]
fn keyword_and_oneof_properties() {
    let out = typescript(json!({
        "structs": [{
            "name": "Setting",
            "fields": [
                { "name": "Default", "type": "string" },
                { "name": "Text", "type": "string", "annotations": [{ "name": "oneof", "params": { "name": "value" } }] },
                { "name": "Flag", "type": "bool", "annotations": [{ "name": "oneof", "params": { "name": "value" } }] },
                { "name": "Label", "type": "string", "tag": "json:\"display-label\"" }
            ]
        }]
    }));
    assert!(out.contains("  \"default\": string;\n"), "quoted keyword:\n{out}");
    assert!(out.contains("  text?: string;\n  flag?: boolean;\n"), "oneof members optional:\n{out}");
    assert!(out.contains("  \"display-label\": string;\n"), "quoted json name:\n{out}");
}

#[test]
fn ignored_templates_are_not_rendered() {
    let out = typescript(json!({
        "structs": [
            {
                "name": "Draft",
                "type_params": ["T"],
                "annotations": [{ "name": "ignore" }],
                "fields": [{ "name": "Body", "type": "T" }]
            },
            {
                "name": "User",
                "annotations": [
                    { "name": "message", "params": { "name": "UserView" } },
                    { "name": "message", "params": { "name": "UserCard" } }
                ],
                "fields": [{ "name": "Name", "type": "string" }]
            }
        ]
    }));
    assert!(!out.contains("Draft"), "ignored template:\n{out}");
    assert_eq!(out.matches("export interface UserView").count(), 1, "{out}");
    assert_eq!(out.matches("export interface UserCard").count(), 1, "{out}");
}
