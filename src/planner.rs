//! Multi-file planning: partitions the IR into generation units and drives
//! every emitter over them.
//!
//! All strategies share [`partition_key`] and one driver. Groups are emitted
//! in sorted key order; a group with nothing to emit produces no file.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::annotation::{self, kind, Annotation};
use crate::config::{GeneratorConfig, Strategy};
use crate::error::SchemaGenError;
use crate::formats::{companion_path, resolve_file_name, OutputFormat};
use crate::generics;
use crate::ir::{CompositeType, EnumType, GenerationContext, ServiceContract};
use crate::output::{GeneratedFile, GeneratedOutput};
use crate::proto_codegen::{package_segment, SchemaGenerator};
use crate::stubs::{self, compiler::compiler_invocation};
use crate::type_expr::short_name;

/// Group name used by the single-file strategy.
pub const SINGLE_GROUP: &str = "schema";

/// Location facts shared by every partitionable item.
struct Origin<'a> {
    package: &'a str,
    namespace: Option<&'a str>,
    source_file: Option<&'a str>,
}

impl<'a> From<&'a CompositeType> for Origin<'a> {
    fn from(c: &'a CompositeType) -> Self {
        Origin {
            package: &c.package,
            namespace: c.namespace.as_deref(),
            source_file: c.source_file.as_deref(),
        }
    }
}

impl<'a> From<&'a EnumType> for Origin<'a> {
    fn from(e: &'a EnumType) -> Self {
        Origin {
            package: &e.package,
            namespace: e.namespace.as_deref(),
            source_file: e.source_file.as_deref(),
        }
    }
}

impl<'a> From<&'a ServiceContract> for Origin<'a> {
    fn from(s: &'a ServiceContract) -> Self {
        Origin {
            package: &s.package,
            namespace: s.namespace.as_deref(),
            source_file: s.source_file.as_deref(),
        }
    }
}

/// Group an item belongs to under `strategy`, or `None` when the strategy
/// cannot place it.
fn partition_key(strategy: Strategy, origin: &Origin<'_>, ctx: &GenerationContext) -> Option<String> {
    match strategy {
        Strategy::Single => Some(SINGLE_GROUP.to_string()),
        Strategy::Follow => {
            let file = origin.source_file.filter(|f| !f.is_empty())?;
            Some(Path::new(file).file_stem()?.to_string_lossy().into_owned())
        }
        Strategy::Package => {
            let segment = package_segment(origin.package);
            (!segment.is_empty()).then(|| segment.to_string())
        }
        Strategy::Namespace => {
            if let Some(ns) = origin.namespace.filter(|n| !n.is_empty()) {
                return Some(ns.to_string());
            }
            let declared = ctx
                .package_annotations
                .get(origin.package)
                .and_then(|anns| annotation::find(anns, kind::NAMESPACE))
                .and_then(|a| a.string("name").or_else(|| a.string("value")));
            Some(declared.unwrap_or_else(|| "default".to_string()))
        }
    }
}

/// One generation unit.
#[derive(Debug, Clone)]
struct Group {
    key: String,
    path: String,
    ctx: GenerationContext,
    imports: BTreeSet<String>,
}

/// Plans and renders every output file for `ctx`.
pub fn plan_output(ctx: &GenerationContext, config: &GeneratorConfig) -> Result<GeneratedOutput, SchemaGenError> {
    let pattern = config.output_pattern();
    let groups = partition(ctx, config);
    info!(strategy = ?config.strategy, groups = groups.len(), "planned generation units");

    let mut output = GeneratedOutput {
        single_file: config.strategy == Strategy::Single,
        ..GeneratedOutput::default()
    };

    for group in &groups {
        let content = SchemaGenerator::new(&group.ctx, config)
            .with_imports(group.imports.iter().cloned())
            .generate()
            .map_err(|e| {
                SchemaGenError::GenerationError(format!("error generating proto for {}: {e}", group.key))
            })?;
        debug!(group = %group.key, path = %group.path, "generated schema file");
        output.push_unique(
            GeneratedFile::new(group.path.clone(), content)
                .with_meta("format", OutputFormat::Proto.name())
                .with_meta("group", group.key.clone())
                .with_meta("strategy", strategy_name(config.strategy)),
        );
    }

    for format in extra_formats(config) {
        for group in &groups {
            let rendered = match format.render(&group.ctx, config) {
                Ok(rendered) => rendered,
                Err(e) => {
                    warn!(format = %format, group = %group.key, error = %e, "skipping output format");
                    continue;
                }
            };
            let path = companion_path(pattern, &group.key, &group.path, format);
            output.push_unique(
                GeneratedFile::new(path, rendered)
                    .with_meta("format", format.name())
                    .with_meta("group", group.key.clone())
                    .with_meta("strategy", strategy_name(config.strategy)),
            );
        }
    }

    if let Some(stub_config) = config.stubs.as_ref().filter(|s| s.enabled) {
        match stubs::synthesize(ctx, config) {
            Ok(files) => {
                for file in files {
                    output.push_unique(file);
                }
            }
            Err(e) => warn!(error = %e, "skipping stub synthesis"),
        }
        let schema_files = groups.iter().map(|g| g.path.clone()).collect();
        output.compiler_invocation = Some(compiler_invocation(stub_config, schema_files));
    }

    info!(files = output.files.len(), "generation finished");
    Ok(output)
}

/// Configured extra formats in order, without the schema itself. Unknown
/// names are logged and dropped.
fn extra_formats(config: &GeneratorConfig) -> Vec<OutputFormat> {
    let mut out = Vec::new();
    for name in &config.output_formats {
        match name.parse::<OutputFormat>() {
            Ok(OutputFormat::Proto) => {}
            Ok(format) if !out.contains(&format) => out.push(format),
            Ok(_) => {}
            Err(e) => warn!(format = %name, error = %e, "skipping output format"),
        }
    }
    out
}

fn strategy_name(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Single => "single",
        Strategy::Follow => "follow",
        Strategy::Package => "package",
        Strategy::Namespace => "namespace",
    }
}

// ── Partitioning ────────────────────────────────────────────────────────────

fn partition(ctx: &GenerationContext, config: &GeneratorConfig) -> Vec<Group> {
    let pattern = config.output_pattern();
    if config.strategy == Strategy::Single {
        return vec![Group {
            key: SINGLE_GROUP.to_string(),
            path: resolve_file_name(pattern, SINGLE_GROUP, OutputFormat::Proto.name()),
            ctx: ctx.clone(),
            imports: BTreeSet::new(),
        }];
    }

    let strategy = config.strategy;
    let mut buckets: BTreeMap<String, GenerationContext> = BTreeMap::new();
    for composite in ctx.structs.iter().filter(|c| !c.is_generic_template()) {
        match partition_key(strategy, &Origin::from(composite), ctx) {
            Some(key) => buckets.entry(key).or_default().structs.push(composite.clone()),
            None => debug!(name = %composite.name, "type has no group under this strategy"),
        }
    }
    for enum_type in &ctx.enums {
        match partition_key(strategy, &Origin::from(enum_type), ctx) {
            Some(key) => buckets.entry(key).or_default().enums.push(enum_type.clone()),
            None => debug!(name = %enum_type.name, "enum has no group under this strategy"),
        }
    }
    for service in &ctx.services {
        match partition_key(strategy, &Origin::from(service), ctx) {
            Some(key) => buckets.entry(key).or_default().services.push(service.clone()),
            None => debug!(name = %service.name, "service has no group under this strategy"),
        }
    }

    let files = type_files(&buckets, pattern);
    let mut groups = Vec::new();
    for (key, mut sub) in buckets {
        if !has_definitions(&sub) {
            debug!(group = %key, "skipping empty group");
            continue;
        }
        let path = resolve_file_name(pattern, &key, OutputFormat::Proto.name());
        let imports = cross_file_imports(&sub, ctx, &files, &path);
        complete_sub_context(&mut sub, ctx);
        groups.push(Group {
            key,
            path,
            ctx: sub,
            imports,
        });
    }
    groups
}

/// Destination file of every type name: composites, their messages, enums
/// and services.
fn type_files(buckets: &BTreeMap<String, GenerationContext>, pattern: &str) -> HashMap<String, String> {
    let mut files = HashMap::new();
    for (key, sub) in buckets {
        let path = resolve_file_name(pattern, key, OutputFormat::Proto.name());
        for composite in &sub.structs {
            files.insert(composite.name.clone(), path.clone());
            for message in composite.message_names() {
                files.insert(message, path.clone());
            }
        }
        for enum_type in &sub.enums {
            files.insert(enum_type.name.clone(), path.clone());
            files.insert(enum_type.proto_name(), path.clone());
        }
        for service in &sub.services {
            files.insert(service.name.clone(), path.clone());
        }
    }
    files
}

fn has_definitions(sub: &GenerationContext) -> bool {
    !sub.enums.is_empty()
        || !sub.services.is_empty()
        || sub
            .structs
            .iter()
            .any(|c| !c.message_names().is_empty() || c.has_annotation(kind::SERVICE))
}

/// Imports for types referenced by `sub` but defined in another file.
fn cross_file_imports(
    sub: &GenerationContext,
    full: &GenerationContext,
    files: &HashMap<String, String>,
    own_path: &str,
) -> BTreeSet<String> {
    let mut referenced: Vec<&str> = Vec::new();
    for composite in &sub.structs {
        for field in &composite.fields {
            referenced.extend(field.ty.named_types());
        }
        if let Some(alias) = &composite.alias {
            referenced.push(&alias.target);
            for arg in &alias.type_args {
                referenced.extend(arg.named_types());
            }
            // fields inherited from the template
            if let Some(template) = full.find_struct(&alias.target) {
                for field in &template.fields {
                    referenced.extend(field.ty.named_types());
                }
            }
        }
    }
    for service in &sub.services {
        for method in &service.methods {
            for param in method.params.iter().chain(&method.results) {
                referenced.extend(param.ty.named_types());
            }
        }
    }
    let receivers: BTreeSet<&str> = sub.structs.iter().map(|c| c.name.as_str()).collect();
    for function in &full.functions {
        if function.receiver.as_deref().is_some_and(|r| receivers.contains(r)) {
            for param in function.params.iter().chain(&function.results) {
                referenced.extend(param.ty.named_types());
            }
        }
    }

    referenced
        .into_iter()
        .filter_map(|name| files.get(short_name(name)))
        .filter(|path| path.as_str() != own_path)
        .cloned()
        .collect()
}

/// Adds what every unit may need: the generic templates it references, all
/// functions and the scope annotations of the unit's files and packages.
fn complete_sub_context(sub: &mut GenerationContext, full: &GenerationContext) {
    let templates = referenced_templates(sub, full);
    sub.structs.extend(templates);
    sub.functions = full.functions.clone();

    let mut source_files: BTreeSet<&str> = BTreeSet::new();
    let mut packages: BTreeSet<&str> = BTreeSet::new();
    let origins = sub
        .structs
        .iter()
        .filter(|c| !c.is_generic_template())
        .map(Origin::from)
        .chain(sub.enums.iter().map(Origin::from))
        .chain(sub.services.iter().map(Origin::from));
    for origin in origins {
        if let Some(file) = origin.source_file {
            source_files.insert(file);
        }
        packages.insert(origin.package);
    }

    let file_annotations: BTreeMap<String, Vec<Annotation>> = full
        .file_annotations
        .iter()
        .filter(|(file, _)| source_files.contains(file.as_str()))
        .map(|(file, anns)| (file.clone(), anns.clone()))
        .collect();
    let package_annotations: BTreeMap<String, Vec<Annotation>> = full
        .package_annotations
        .iter()
        .filter(|(package, _)| packages.contains(package.as_str()))
        .map(|(package, anns)| (package.clone(), anns.clone()))
        .collect();
    sub.file_annotations = file_annotations;
    sub.package_annotations = package_annotations;
}

/// Generic templates reachable from `sub` through alias targets, type
/// arguments, field and rpc types, and the fields of other reached templates.
/// Returned in declaration order.
fn referenced_templates(sub: &GenerationContext, full: &GenerationContext) -> Vec<CompositeType> {
    let mut pending: Vec<&str> = Vec::new();
    for composite in &sub.structs {
        for field in &composite.fields {
            pending.extend(field.ty.named_types());
        }
        if let Some(alias) = &composite.alias {
            pending.push(&alias.target);
            for arg in &alias.type_args {
                pending.extend(arg.named_types());
            }
        }
    }
    for service in &sub.services {
        for method in &service.methods {
            for param in method.params.iter().chain(&method.results) {
                pending.extend(param.ty.named_types());
            }
        }
    }

    let mut reached: BTreeSet<&str> = BTreeSet::new();
    while let Some(name) = pending.pop() {
        let Some(template) = generics::find_template(full, name) else {
            continue;
        };
        if reached.insert(&template.name) {
            for field in &template.fields {
                pending.extend(field.ty.named_types());
            }
        }
    }
    full.structs
        .iter()
        .filter(|c| c.is_generic_template() && reached.contains(c.name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(ir: serde_json::Value) -> GenerationContext {
        serde_json::from_value(ir).expect("context should deserialize")
    }

    #[test]
    fn partition_keys_per_strategy() {
        let ctx = context(json!({
            "package_annotations": {
                "example.com/billing": [{ "name": "namespace", "params": { "name": "finance" } }]
            }
        }));
        let composite = CompositeType {
            name: "Invoice".to_string(),
            package: "example.com/billing".to_string(),
            source_file: Some("billing/invoice.go".to_string()),
            ..CompositeType::default()
        };
        let origin = Origin::from(&composite);
        assert_eq!(partition_key(Strategy::Single, &origin, &ctx).as_deref(), Some("schema"));
        assert_eq!(partition_key(Strategy::Follow, &origin, &ctx).as_deref(), Some("invoice"));
        assert_eq!(partition_key(Strategy::Package, &origin, &ctx).as_deref(), Some("billing"));
        assert_eq!(partition_key(Strategy::Namespace, &origin, &ctx).as_deref(), Some("finance"));

        let bare = CompositeType::default();
        let origin = Origin::from(&bare);
        assert_eq!(partition_key(Strategy::Follow, &origin, &ctx), None);
        assert_eq!(partition_key(Strategy::Package, &origin, &ctx), None);
        assert_eq!(partition_key(Strategy::Namespace, &origin, &ctx).as_deref(), Some("default"));
    }

    #[test]
    fn unknown_extra_formats_are_dropped() {
        let config = GeneratorConfig {
            output_formats: vec![
                "proto".to_string(),
                "markdown".to_string(),
                "yaml".to_string(),
                "md".to_string(),
            ],
            ..GeneratorConfig::default()
        };
        assert_eq!(extra_formats(&config), vec![OutputFormat::Markdown]);
    }
}
