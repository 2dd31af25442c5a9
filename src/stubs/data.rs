//! Template data for the synthesized adapter sources.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use super::conversions::{rust_scalar, well_known_rust, Conversions, HelperData};
use crate::config::{GeneratorConfig, StubConfig};
use crate::naming::{pascal_case, snake_case};
use crate::resolver::{
    ResolvedEnum, ResolvedField, ResolvedMessage, ResolvedMethod, ResolvedService, Resolver,
};
use crate::type_expr::TypeExpr;

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "gen",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Everything a stub template can see.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateData {
    pub package: String,
    /// Rust module path of the domain types, e.g. `crate::models`.
    pub module_path: String,
    /// Last segment of `module_path`, used to qualify domain types.
    pub domain_alias: String,
    pub proto_module: String,
    pub proto_alias: String,
    pub types: Vec<TypeData>,
    pub enums: Vec<EnumData>,
    pub helpers: Vec<HelperData>,
    pub services: Vec<ServiceData>,
    pub uses_maps: bool,
    /// At least one streaming method will be bridged.
    pub has_streaming: bool,
    pub original_service_interface: bool,
    pub streaming_support: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeData {
    pub name: String,
    pub fn_prefix: String,
    pub domain_type: String,
    pub proto_type: String,
    pub zero_check: String,
    pub fields: Vec<FieldData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldData {
    /// Domain struct field identifier.
    pub name: String,
    /// Compiled message field identifier.
    pub proto_field: String,
    pub number: u32,
    pub to_proto: String,
    pub from_proto: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumData {
    pub name: String,
    pub fn_prefix: String,
    pub domain_type: String,
    pub values: Vec<EnumValueData>,
    /// Values with distinct numbers, first declaration wins.
    pub unique_values: Vec<EnumValueData>,
    pub default_variant: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumValueData {
    pub variant: String,
    pub number: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceData {
    pub name: String,
    /// Domain trait the adapter delegates to.
    pub trait_name: String,
    pub trait_path: String,
    pub fn_prefix: String,
    pub server_module: String,
    /// Service trait generated by the schema compiler.
    pub server_trait: String,
    pub server_type: String,
    pub client_module: String,
    pub client_type: String,
    pub adapter_name: String,
    pub methods: Vec<MethodData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodData {
    pub name: String,
    pub fn_name: String,
    pub stream_type: String,
    pub request_type: String,
    pub response_type: String,
    pub has_input: bool,
    pub has_output: bool,
    /// Domain parameter type; a `Vec` for client streaming.
    pub domain_input_type: String,
    /// Domain return type; a `Vec` for server streaming, `()` when absent.
    pub domain_output_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    /// False for streaming methods when streaming support is off.
    pub supported: bool,
    /// Expressions over a value named `item`.
    pub request_from_proto: String,
    pub request_to_proto: String,
    pub response_to_proto: String,
    pub response_from_proto: String,
}

/// Builds the data for one generation unit.
pub fn build(
    resolver: &Resolver<'_>,
    config: &GeneratorConfig,
    stubs: &StubConfig,
    package: Option<String>,
) -> TemplateData {
    let templates = &stubs.templates;
    let domain_alias = templates
        .module_path
        .rsplit("::")
        .next()
        .unwrap_or("models")
        .to_string();

    let messages = resolver.resolve_distinct_messages();
    let enums = resolver.resolve_enums();
    let services = if config.generate_services {
        resolver.resolve_services()
    } else {
        Vec::new()
    };

    let mut enum_lookup = HashMap::new();
    for resolved in &enums {
        enum_lookup.insert(resolved.name.clone(), resolved.name.clone());
        enum_lookup.insert(resolved.source_name.clone(), resolved.name.clone());
    }
    let mut conv = Conversions::new(
        resolver.types(),
        enum_lookup,
        domain_alias.clone(),
        templates.proto_alias.clone(),
    );

    let enum_data: Vec<EnumData> = enums
        .iter()
        .filter(|e| !e.values.is_empty())
        .map(|e| enum_data(e, &domain_alias))
        .collect();
    let type_data: Vec<TypeData> = messages
        .iter()
        .map(|m| type_data(m, &mut conv, &domain_alias, &templates.proto_alias))
        .collect();
    let service_data: Vec<ServiceData> = services
        .iter()
        .map(|s| service_data(s, &mut conv, stubs, &domain_alias))
        .collect();

    let has_streaming = stubs.streaming_support
        && services
            .iter()
            .flat_map(|s| &s.methods)
            .any(|m| m.client_streaming || m.server_streaming);
    let uses_maps = conv.uses_maps();

    TemplateData {
        package: package.unwrap_or_default(),
        module_path: templates.module_path.clone(),
        domain_alias,
        proto_module: templates.proto_module.clone(),
        proto_alias: templates.proto_alias.clone(),
        types: type_data,
        enums: enum_data,
        helpers: conv.into_helpers(),
        services: service_data,
        uses_maps,
        has_streaming,
        original_service_interface: stubs.original_service_interface,
        streaming_support: stubs.streaming_support,
    }
}

fn type_data(
    message: &ResolvedMessage,
    conv: &mut Conversions<'_>,
    domain_alias: &str,
    proto_alias: &str,
) -> TypeData {
    let fields: Vec<&ResolvedField> = message
        .fields
        .iter()
        .filter(|f| {
            if f.oneof.is_some() {
                debug!(message = %message.name, field = %f.name, "oneof member left at default");
            }
            f.oneof.is_none()
        })
        .collect();

    let zero_checks: Vec<String> = fields
        .iter()
        .map(|f| conv.zero_check(&f.ty, &format!("value.{}", rust_ident(&f.source_name))))
        .collect();
    let zero_check = if zero_checks.is_empty() {
        "true".to_string()
    } else {
        zero_checks.join("\n        && ")
    };

    let fields = fields
        .into_iter()
        .map(|f| {
            let name = rust_ident(&f.source_name);
            let proto_field = rust_ident(&snake_case(&f.name));
            FieldData {
                to_proto: conv.field_to_proto(f, &format!("value.{name}")),
                from_proto: conv.field_from_proto(f, &format!("proto.{proto_field}")),
                name,
                proto_field,
                number: f.number,
            }
        })
        .collect();

    TypeData {
        name: message.name.clone(),
        fn_prefix: snake_case(&message.name),
        domain_type: format!("{domain_alias}::{}", message.source_name),
        proto_type: format!("{proto_alias}::{}", pascal_case(&message.name)),
        zero_check,
        fields,
    }
}

fn enum_data(resolved: &ResolvedEnum, domain_alias: &str) -> EnumData {
    let values: Vec<EnumValueData> = resolved
        .values
        .iter()
        .map(|v| EnumValueData {
            variant: pascal_case(&v.source_name),
            number: v.number,
        })
        .collect();
    let mut seen = BTreeSet::new();
    let unique_values = values
        .iter()
        .filter(|v| seen.insert(v.number))
        .cloned()
        .collect();
    EnumData {
        name: resolved.name.clone(),
        fn_prefix: snake_case(&resolved.name),
        domain_type: format!("{domain_alias}::{}", resolved.source_name),
        default_variant: values.first().map(|v| v.variant.clone()).unwrap_or_default(),
        values,
        unique_values,
    }
}

fn service_data(
    service: &ResolvedService,
    conv: &mut Conversions<'_>,
    stubs: &StubConfig,
    domain_alias: &str,
) -> ServiceData {
    let fn_prefix = snake_case(&service.name);
    let trait_name = pascal_case(&service.source_name);
    let trait_path = if stubs.original_service_interface {
        format!("super::service::{trait_name}")
    } else {
        format!("{domain_alias}::{trait_name}")
    };
    let pascal = pascal_case(&service.name);
    ServiceData {
        name: service.name.clone(),
        trait_name,
        trait_path,
        server_module: format!("{fn_prefix}_server"),
        server_trait: pascal.clone(),
        server_type: format!("{pascal}Server"),
        client_module: format!("{fn_prefix}_client"),
        client_type: format!("{pascal}Client"),
        adapter_name: format!("{pascal}Adapter"),
        methods: service
            .methods
            .iter()
            .map(|m| method_data(m, conv, stubs.streaming_support))
            .collect(),
        fn_prefix,
    }
}

fn method_data(method: &ResolvedMethod, conv: &mut Conversions<'_>, streaming: bool) -> MethodData {
    let request_elem = method
        .domain_input
        .as_ref()
        .map(|ty| stream_element(ty, method.client_streaming));
    let response_elem = method
        .domain_output
        .as_ref()
        .map(|ty| stream_element(ty, method.server_streaming));

    let domain_input_type = request_elem
        .as_ref()
        .map(|ty| wrap_vec(conv.domain_type(ty), method.client_streaming))
        .unwrap_or_default();
    let domain_output_type = response_elem
        .as_ref()
        .map(|ty| wrap_vec(conv.domain_type(ty), method.server_streaming))
        .unwrap_or_else(|| "()".to_string());

    let (request_from_proto, request_to_proto) = match &request_elem {
        Some(ty) => (conv.from_value(ty, "item"), conv.to_value(ty, "item")),
        None => (String::new(), String::new()),
    };
    let (response_to_proto, response_from_proto) = match &response_elem {
        Some(ty) => (conv.to_value(ty, "item"), conv.from_value(ty, "item")),
        None => (String::new(), String::new()),
    };

    let is_streaming = method.client_streaming || method.server_streaming;
    let fn_name = rust_ident(&snake_case(&method.name));
    MethodData {
        name: method.name.clone(),
        stream_type: format!("{}Stream", pascal_case(&method.name)),
        request_type: rpc_rust_type(&method.input, conv),
        response_type: rpc_rust_type(&method.output, conv),
        has_input: request_elem.is_some(),
        has_output: response_elem.is_some(),
        domain_input_type,
        domain_output_type,
        client_streaming: method.client_streaming,
        server_streaming: method.server_streaming,
        supported: streaming || !is_streaming,
        request_from_proto,
        request_to_proto,
        response_to_proto,
        response_from_proto,
        fn_name,
    }
}

/// A streamed slice carries its elements one at a time.
fn stream_element(ty: &TypeExpr, streaming: bool) -> TypeExpr {
    match ty {
        TypeExpr::Sequence(inner) if streaming && !ty.is_byte_sequence() => inner.as_ref().clone(),
        other => other.clone(),
    }
}

fn wrap_vec(ty: String, streaming: bool) -> String {
    if streaming {
        format!("Vec<{ty}>")
    } else {
        ty
    }
}

/// Rust type of an RPC message as compiled: `Empty` is `()` and scalar
/// wrappers are their scalar.
fn rpc_rust_type(proto_type: &str, conv: &Conversions<'_>) -> String {
    if let Some(rust) = well_known_rust(proto_type) {
        return rust.to_string();
    }
    if let Some((rust, _)) = rust_scalar(proto_type) {
        return rust.to_string();
    }
    conv.proto_message(proto_type)
}

/// Escapes Rust keywords as raw identifiers.
pub fn rust_ident(name: &str) -> String {
    let snake = snake_case(name);
    if snake == "self" || snake == "crate" || snake == "super" {
        return format!("{snake}_");
    }
    if RUST_KEYWORDS.contains(&snake.as_str()) {
        format!("r#{snake}")
    } else {
        snake
    }
}
