//! Integration tests for multi-file planning.
//!
//! Tests cover:
//! - Follow-source partitioning with cross-file imports
//! - Package partitioning with `{format}` placeholders and companion formats
//! - Namespace partitioning and the `default` bucket
//! - Generic templates carried only into the groups that use them
//! - Empty groups skipped, failing groups named in the error
//! - Persisting a run through `DirectorySink`

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use proto_schemagen::planner::plan_output;
use proto_schemagen::{
    generate, write_all, DirectorySink, GenerationContext, GeneratorConfig, SchemaGenError,
};
use serde_json::json;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn context(ir: serde_json::Value) -> GenerationContext {
    serde_json::from_value(ir).expect("context should deserialize")
}

fn config(raw: &str) -> GeneratorConfig {
    GeneratorConfig::from_json(raw).expect("config should parse")
}

fn shop() -> GenerationContext {
    context(json!({
        "structs": [
            {
                "name": "User",
                "package": "example.com/shop/accounts",
                "namespace": "identity",
                "source_file": "accounts/users.go",
                "fields": [{ "name": "Name", "type": "string" }]
            },
            {
                "name": "Order",
                "package": "example.com/shop/billing",
                "source_file": "billing/orders.go",
                "fields": [
                    { "name": "ID", "type": "int64" },
                    { "name": "Buyer", "type": "*accounts.User" }
                ]
            },
            {
                "name": "Scratch",
                "package": "example.com/shop/tmp",
                "source_file": "tmp/scratch.go",
                "annotations": [{ "name": "ignore" }],
                "fields": [{ "name": "Note", "type": "string" }]
            }
        ]
    }))
}

struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "proto_schemagen_{prefix}_{}_{}",
            std::process::id(),
            stamp
        ));
        fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    fn read(&self, file: &str) -> String {
        fs::read_to_string(self.path.join(file)).expect("read generated file")
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

// ── Strategies ──────────────────────────────────────────────────────────────

#[test]
fn follow_source_splits_by_file_and_imports_across_files() {
    let output = generate(&shop(), &config(r#"{ "strategy": "follow" }"#)).expect("generate");
    assert!(!output.single_file);
    assert_eq!(output.paths(), vec!["orders.proto", "users.proto"]);

    let orders = &output.file("orders.proto").expect("orders file").content;
    assert!(orders.contains("import \"users.proto\";"), "cross-file import:\n{orders}");
    assert!(orders.contains("optional User buyer = 2;"), "buyer field:\n{orders}");
    assert!(!orders.contains("message User"), "user lives elsewhere:\n{orders}");

    let users = &output.file("users.proto").expect("users file").content;
    assert!(!users.contains("import"), "users needs no imports:\n{users}");
    assert_eq!(output.files[1].meta("group"), Some("users"));
    assert_eq!(output.files[1].meta("strategy"), Some("follow"));
}

#[test]
fn package_strategy_with_format_placeholder_and_companions() {
    let cfg = config(
        r#"{
            "strategy": "package",
            "output": "{format}/{name}.proto",
            "output_formats": ["proto", "markdown", "typescript", "json-schema"]
        }"#,
    );
    let output = generate(&shop(), &cfg).expect("generate");
    assert_eq!(
        output.paths(),
        vec![
            "proto/accounts.proto",
            "proto/billing.proto",
            "markdown/accounts.md",
            "markdown/billing.md",
            "typescript/accounts.ts",
            "typescript/billing.ts",
            "json-schema/accounts.schema.json",
            "json-schema/billing.schema.json",
        ]
    );
    let md = &output.file("markdown/billing.md").expect("markdown").content;
    assert!(md.contains("| buyer | 2 | `optional User` |"), "markdown row:\n{md}");
    let ts = &output.file("typescript/accounts.ts").expect("typescript").content;
    assert!(ts.contains("export interface User {\n  name: string;\n}"), "interface:\n{ts}");
    assert_eq!(output.by_format("json-schema").count(), 2);
}

#[test]
fn generic_templates_follow_the_groups_that_use_them() {
    let ir = context(json!({
        "structs": [
            {
                "name": "Page",
                "package": "example.com/shop/common",
                "type_params": ["T"],
                "fields": [{ "name": "Items", "type": "[]T" }, { "name": "Total", "type": "int64" }]
            },
            {
                "name": "Draft",
                "package": "example.com/shop/common",
                "type_params": ["T"],
                "annotations": [{ "name": "skip" }],
                "fields": [{ "name": "Body", "type": "T" }]
            },
            {
                "name": "User",
                "package": "example.com/shop/accounts",
                "fields": [{ "name": "Name", "type": "string" }]
            },
            {
                "name": "UserPage",
                "package": "example.com/shop/accounts",
                "alias": { "target": "Page", "type_args": ["User"] }
            },
            {
                "name": "Order",
                "package": "example.com/shop/billing",
                "fields": [{ "name": "ID", "type": "int64" }]
            }
        ]
    }));
    let cfg = config(r#"{ "strategy": "package", "output_formats": ["proto", "typescript"] }"#);
    let output = generate(&ir, &cfg).expect("generate");

    let accounts = &output.file("accounts.ts").expect("accounts typescript").content;
    assert!(accounts.contains("export interface Page<T> {"), "used template:\n{accounts}");
    assert!(accounts.contains("export type UserPage = Page<User>;"), "alias:\n{accounts}");
    assert!(!accounts.contains("Draft"), "skipped template:\n{accounts}");

    let billing = &output.file("billing.ts").expect("billing typescript").content;
    assert!(!billing.contains("Page"), "unused template:\n{billing}");
}

#[test]
fn namespace_strategy_uses_default_bucket() {
    let output = generate(&shop(), &config(r#"{ "strategy": "namespace" }"#)).expect("generate");
    assert_eq!(output.paths(), vec!["default.proto", "identity.proto"]);
    let default = &output.file("default.proto").expect("default bucket").content;
    assert!(default.contains("message Order"), "order in default bucket:\n{default}");
    assert!(default.contains("import \"identity.proto\";"), "import:\n{default}");
}

#[test]
fn unsupported_formats_are_skipped() {
    let cfg = config(r#"{ "output_formats": ["proto", "descriptor", "yaml", "md"] }"#);
    let output = generate(&shop(), &cfg).expect("generate");
    assert_eq!(output.paths(), vec!["schema.proto", "schema.md"]);
}

// ── Failures ────────────────────────────────────────────────────────────────

#[test]
fn failing_group_aborts_with_its_name() {
    let cfg = config(r#"{ "strategy": "follow", "auto_number_fields": false }"#);
    let err = plan_output(&shop(), &cfg).expect_err("unnumbered fields cannot render");
    match err {
        SchemaGenError::GenerationError(message) => {
            assert!(message.starts_with("error generating proto for orders:"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn validation_runs_before_planning() {
    let cfg = config(r#"{ "auto_number_fields": false }"#);
    let err = generate(&shop(), &cfg).expect_err("unnumbered fields are invalid");
    assert!(matches!(err, SchemaGenError::ValidationError { .. }), "got {err:?}");
}

// ── Persistence ─────────────────────────────────────────────────────────────

#[test]
fn directory_sink_writes_every_file() {
    let dir = TempDir::new("sink");
    let cfg = config(r#"{ "strategy": "follow", "output": "schemas/{name}.proto" }"#);
    let output = generate(&shop(), &cfg).expect("generate");

    let mut sink = DirectorySink::new(&dir.path);
    let written = write_all(&output, &mut sink).expect("write");
    assert_eq!(written, 2);
    let users = dir.read("schemas/users.proto");
    assert!(users.contains("message User {"), "written content:\n{users}");
    assert!(
        dir.read("schemas/orders.proto").contains("import \"schemas/users.proto\";"),
        "imports use output paths"
    );
}
