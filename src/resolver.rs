//! Per-field and per-message decisions shared by every emitter.
//!
//! Nothing here renders text. The schema generator, the validator, the
//! secondary format emitters and the stub synthesizer all read the same
//! [`ResolvedMessage`], [`ResolvedEnum`] and [`ResolvedService`] values, so a
//! field kept in one output is kept in all of them.

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::annotation::{self, kind, Annotation};
use crate::config::GeneratorConfig;
use crate::generics;
use crate::ir::{CompositeType, EnumType, Field, Function, GenerationContext, Method, Param};
use crate::naming::{lower_camel_case, screaming_snake_case, snake_case};
use crate::tags::{TagReader, TagSpec};
use crate::type_expr::TypeExpr;
use crate::type_map::{is_scalar, is_valid_map_key, scalar_wrapper, TypeMapper};

/// Highest legal field number.
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;
/// Band reserved by the protobuf implementation.
pub const IMPLEMENTATION_RESERVED: std::ops::RangeInclusive<u32> = 19_000..=19_999;

pub const EMPTY_TYPE: &str = "google.protobuf.Empty";

/// Outcome of the inclusion rules for one field in one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    Keep,
    Drop,
    /// Dropped, and its number is recorded as reserved in this message.
    DropAndReserve,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    Singular,
    Optional,
    Repeated,
    Map { key: String, value: String },
}

#[derive(Debug, Clone)]
pub struct ResolvedField {
    /// Declared field name.
    pub source_name: String,
    pub name: String,
    pub json_name: String,
    pub number: u32,
    /// Number came from an annotation or tag, not the counter.
    pub explicit_number: bool,
    /// Element type; for maps, the value type.
    pub proto_type: String,
    pub shape: FieldShape,
    /// Declared type with generic parameters substituted.
    pub ty: TypeExpr,
    /// Rendered `key = value` option entries.
    pub options: Vec<String>,
    pub description: Option<String>,
    /// Key type that prevented map emission.
    pub suppressed_map_key: Option<String>,
    /// Name of the `oneof` group the field belongs to.
    pub oneof: Option<String>,
}

impl ResolvedField {
    pub fn is_nullable(&self) -> bool {
        self.ty.is_pointer() || self.shape == FieldShape::Optional
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedMessage {
    pub name: String,
    /// Composite type the message came from.
    pub source_name: String,
    pub description: Option<String>,
    pub fields: Vec<ResolvedField>,
    pub reserved_numbers: Vec<u32>,
    pub reserved_names: Vec<String>,
    /// Kept fields that received no number because auto numbering is off.
    pub unnumbered: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedEnumValue {
    pub source_name: String,
    pub name: String,
    pub number: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedEnum {
    pub name: String,
    pub source_name: String,
    pub description: Option<String>,
    pub allow_alias: bool,
    pub values: Vec<ResolvedEnumValue>,
}

#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    /// Declared method name.
    pub source_name: String,
    pub name: String,
    pub input: String,
    pub output: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub domain_input: Option<TypeExpr>,
    pub domain_output: Option<TypeExpr>,
    pub has_context: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedService {
    pub name: String,
    pub source_name: String,
    pub description: Option<String>,
    pub methods: Vec<ResolvedMethod>,
}

/// Compacts sorted reserved numbers into the shortest textual ranges.
///
/// Runs of one render as `N`, runs of two as `N, M` and longer runs as
/// `N to M`.
pub fn compact_reserved_ranges(numbers: &[u32]) -> Vec<String> {
    let sorted: BTreeSet<u32> = numbers.iter().copied().collect();
    let mut ranges = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return ranges;
    };
    let (mut start, mut end) = (first, first);
    for n in iter {
        if n == end + 1 {
            end = n;
        } else {
            flush(start, end, &mut ranges);
            start = n;
            end = n;
        }
    }
    flush(start, end, &mut ranges);
    ranges
}

/// First number at or after `candidate` that is not taken, or `None` once the
/// field number range runs out.
fn next_free_number(mut candidate: Option<u32>, taken: impl Fn(u32) -> bool) -> Option<u32> {
    while let Some(n) = candidate {
        if n > MAX_FIELD_NUMBER {
            return None;
        }
        if !taken(n) {
            return Some(n);
        }
        candidate = n.checked_add(1);
    }
    None
}

fn flush(start: u32, end: u32, ranges: &mut Vec<String>) {
    ranges.push(match end - start {
        0 => format!("{start}"),
        1 => format!("{start}, {end}"),
        _ => format!("{start} to {end}"),
    });
}

fn push_option(options: &mut Vec<String>, key: &str, rendered: String) {
    let prefix = format!("{key} =");
    if !options.iter().any(|o| o.starts_with(&prefix)) {
        options.push(rendered);
    }
}

fn reserved_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+)\s*(?:(?:to|-)\s*(\d+))?\s*$").expect("valid reserved range regex")
    })
}

/// Largest span a single `N to M` entry may expand to.
const MAX_RESERVED_SPAN: u32 = 65_536;

/// Parses `"3"`, `"5 to 9"` or `"5-9"` entries into individual numbers.
pub fn parse_reserved_numbers(entries: &[String]) -> Vec<u32> {
    let mut out = Vec::new();
    for entry in entries.iter().flat_map(|e| e.split(',')) {
        let Some(caps) = reserved_range_re().captures(entry) else {
            if !entry.trim().is_empty() {
                warn!(entry = %entry.trim(), "ignoring unparseable reserved number");
            }
            continue;
        };
        let Ok(lo) = caps[1].parse::<u32>() else {
            continue;
        };
        let hi = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(lo);
        if hi < lo || hi - lo > MAX_RESERVED_SPAN {
            warn!(entry = %entry.trim(), "ignoring reserved range");
            continue;
        }
        out.extend(lo..=hi);
    }
    out
}

/// First description found on any annotation.
pub fn annotation_description(annotations: &[Annotation]) -> Option<String> {
    annotations.iter().find_map(|a| a.string("description"))
}

fn first_doc_line(doc: Option<&String>) -> Option<String> {
    doc.and_then(|d| d.lines().map(str::trim).find(|l| !l.is_empty()))
        .map(str::to_string)
}

fn is_context_type(ty: &TypeExpr) -> bool {
    matches!(ty.strip_pointers(), TypeExpr::Named(n) if n == "context.Context" || n == "Context")
}

fn is_error_type(ty: &TypeExpr) -> bool {
    matches!(ty, TypeExpr::Named(n) if n == "error")
}

/// Resolves IR nodes against a configuration.
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    ctx: &'a GenerationContext,
    config: &'a GeneratorConfig,
    tags: TagReader,
    types: TypeMapper<'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(ctx: &'a GenerationContext, config: &'a GeneratorConfig) -> Self {
        Self {
            ctx,
            config,
            tags: config.tag_reader(),
            types: TypeMapper::new(config),
        }
    }

    pub fn context(&self) -> &'a GenerationContext {
        self.ctx
    }

    pub fn config(&self) -> &'a GeneratorConfig {
        self.config
    }

    pub fn types(&self) -> TypeMapper<'a> {
        self.types
    }

    pub fn tags(&self) -> &TagReader {
        &self.tags
    }

    // ── Inclusion ───────────────────────────────────────────────────────────

    /// Decides whether `field` appears in `message`.
    pub fn field_inclusion(
        &self,
        composite: &CompositeType,
        field: &Field,
        message: &str,
    ) -> Inclusion {
        if !field.exported {
            return Inclusion::Drop;
        }
        if self
            .tags
            .read(field.tag.as_deref())
            .is_some_and(|spec| spec.skip)
        {
            return Inclusion::Drop;
        }

        let reserve_all = self.message_reserves_skipped(composite, message);
        let applicable: Vec<&Annotation> = field.field_annotations_for(message).collect();
        let field_reserved = applicable
            .iter()
            .any(|a| a.scope("reserved", message) == Some(true));
        let dropped = |explicit: bool| {
            if explicit || field_reserved || reserve_all {
                Inclusion::DropAndReserve
            } else {
                Inclusion::Drop
            }
        };

        if field.has_field_annotations() && applicable.is_empty() {
            return dropped(false);
        }

        for ann in &field.annotations {
            if (ann.is(kind::IGNORE) || ann.is(kind::SKIP) || ann.is(kind::OMIT))
                && ann.applies_to(message)
            {
                return dropped(ann.scope("reserved", message) == Some(true));
            }
        }

        let mut includes = annotation::find_all(&field.annotations, kind::INCLUDE).peekable();
        if includes.peek().is_some() && !includes.any(|a| a.scope("for", message) == Some(true)) {
            return dropped(false);
        }

        for ann in &applicable {
            if ann.scope("ignore", message) == Some(true) || ann.scope("omit", message) == Some(true)
            {
                return dropped(false);
            }
            if ann.scope("include", message) == Some(false) {
                return dropped(false);
            }
        }

        Inclusion::Keep
    }

    /// Whether every skipped field of `message` should be reserved.
    pub fn message_reserves_skipped(&self, composite: &CompositeType, message: &str) -> bool {
        let from_message = annotation::find_all(&composite.annotations, kind::MESSAGE)
            .filter(|a| a.string("name").map_or(true, |n| n == message))
            .filter_map(|a| a.scope("reserved", message))
            .any(|admitted| admitted);
        from_message
            || annotation::find_all(&composite.annotations, kind::RESERVED).any(|a| {
                !a.has("names") && !a.has("numbers") && a.applies_to(message)
            })
    }

    fn scoped_reserved<'b>(
        &self,
        composite: &'b CompositeType,
        message: &'b str,
    ) -> impl Iterator<Item = &'b Annotation> + 'b {
        annotation::find_all(&composite.annotations, kind::RESERVED)
            .filter(move |a| a.applies_to(message))
    }

    /// Names reserved in `message`, including the configured ones.
    pub fn reserved_names(&self, composite: &CompositeType, message: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let declared = self
            .scoped_reserved(composite, message)
            .flat_map(|a| a.list("names"));
        for name in declared.chain(self.config.reserved_names.iter().cloned()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Numbers reserved by declaration or configuration, before any
    /// field-derived reservations.
    pub fn declared_reserved_numbers(&self, composite: &CompositeType, message: &str) -> BTreeSet<u32> {
        let entries: Vec<String> = self
            .scoped_reserved(composite, message)
            .flat_map(|a| a.list("numbers"))
            .collect();
        parse_reserved_numbers(&entries)
            .into_iter()
            .chain(self.config.reserved_numbers.iter().copied())
            .collect()
    }

    // ── Numbering ───────────────────────────────────────────────────────────

    /// Number fixed by a `field`/`map` annotation or the tag.
    pub fn explicit_number(&self, field: &Field, message: &str) -> Option<u32> {
        field
            .field_annotations_for(message)
            .find_map(|a| a.number("number"))
            .or_else(|| self.map_annotation(field).and_then(|a| a.number("number")))
            .or_else(|| self.tag(field).and_then(|t| t.number))
    }

    fn map_annotation<'f>(&self, field: &'f Field) -> Option<&'f Annotation> {
        annotation::find(&field.annotations, kind::MAP)
    }

    fn tag(&self, field: &Field) -> Option<TagSpec> {
        self.tags.read(field.tag.as_deref())
    }

    // ── Messages ────────────────────────────────────────────────────────────

    /// Resolves every message of every composite type, in IR order.
    pub fn resolve_messages(&self) -> Vec<ResolvedMessage> {
        let mut out = Vec::new();
        for composite in &self.ctx.structs {
            for message in composite.message_names() {
                out.push(self.resolve_message(composite, &message));
            }
        }
        out
    }

    /// Like [`Resolver::resolve_messages`], keeping only the first message of
    /// each name. Renderers use this; validation sees every duplicate.
    pub fn resolve_distinct_messages(&self) -> Vec<ResolvedMessage> {
        let mut seen = HashSet::new();
        self.resolve_messages()
            .into_iter()
            .filter(|m| seen.insert(m.name.clone()))
            .collect()
    }

    pub fn resolve_message(&self, composite: &CompositeType, message: &str) -> ResolvedMessage {
        let fields = generics::resolved_fields(self.ctx, composite);
        let mut reserved = self.declared_reserved_numbers(composite, message);

        let decisions: Vec<(&Field, Inclusion, Option<u32>)> = fields
            .iter()
            .map(|f| {
                let inclusion = self.field_inclusion(composite, f, message);
                (f, inclusion, self.explicit_number(f, message))
            })
            .collect();
        let claimed: HashSet<u32> = decisions
            .iter()
            .filter(|(_, inc, _)| *inc != Inclusion::Drop)
            .filter_map(|(_, _, n)| *n)
            .collect();

        let mut counter = Some(self.config.start_field_number);
        let mut resolved = Vec::new();
        let mut unnumbered = Vec::new();
        for (field, inclusion, explicit) in decisions {
            if inclusion == Inclusion::Drop {
                debug!(message_name = %message, field = %field.name, "field dropped");
                continue;
            }
            let number = match explicit {
                Some(n) => Some(n),
                None if self.config.auto_number_fields => {
                    let next = next_free_number(counter, |n| {
                        reserved.contains(&n)
                            || claimed.contains(&n)
                            || IMPLEMENTATION_RESERVED.contains(&n)
                    });
                    if next.is_none() {
                        warn!(message_name = %message, field = %field.name, "field number range exhausted");
                    }
                    counter = next.and_then(|n| n.checked_add(1));
                    next
                }
                None => None,
            };
            match (inclusion, number) {
                (Inclusion::DropAndReserve, Some(n)) => {
                    debug!(
                        message_name = %message,
                        field = %field.name,
                        number = n,
                        "field dropped and reserved"
                    );
                    reserved.insert(n);
                }
                (Inclusion::DropAndReserve, None) => {}
                (_, Some(n)) => {
                    resolved.push(self.resolve_field(field, message, n, explicit.is_some()))
                }
                (_, None) => unnumbered.push(field.name.clone()),
            }
        }

        let description = composite
            .message_annotation(message)
            .and_then(|a| a.string("description"))
            .or_else(|| first_doc_line(composite.doc.as_ref()));

        ResolvedMessage {
            name: message.to_string(),
            source_name: composite.name.clone(),
            description,
            fields: resolved,
            reserved_numbers: reserved.into_iter().collect(),
            reserved_names: self.reserved_names(composite, message),
            unnumbered,
        }
    }

    fn resolve_field(&self, field: &Field, message: &str, number: u32, explicit: bool) -> ResolvedField {
        let applicable: Vec<&Annotation> = field.field_annotations_for(message).collect();
        let tag = self.tag(field);

        let name = applicable
            .iter()
            .find_map(|a| a.string("name"))
            .or_else(|| tag.as_ref().and_then(|t| t.name.clone()))
            .unwrap_or_else(|| snake_case(&field.name));

        let explicit_json = applicable
            .iter()
            .find_map(|a| a.string("json_name"))
            .or_else(|| tag.as_ref().and_then(|t| t.json_name.clone()));
        let json_name = explicit_json
            .clone()
            .or_else(|| self.tags.json_name(field.tag.as_deref()))
            .unwrap_or_else(|| lower_camel_case(&name));

        let type_override = applicable
            .iter()
            .find_map(|a| a.string("type"))
            .or_else(|| tag.as_ref().and_then(|t| t.type_override.clone()));

        let flag = |key: &str| {
            applicable.iter().any(|a| a.flag(key))
                || tag.as_ref().is_some_and(|t| t.has_flag(key))
        };

        let mut suppressed_map_key = None;
        let map_shape = match self.map_annotation(field) {
            Some(ann) => match (ann.string("key"), ann.string("value")) {
                (Some(key), Some(value)) => {
                    let key = self.types.map_named(&key);
                    if is_valid_map_key(&key) {
                        Some(FieldShape::Map {
                            key,
                            value: self.types.map_named(&value),
                        })
                    } else {
                        suppressed_map_key = Some(key);
                        None
                    }
                }
                _ => None,
            },
            None => None,
        };
        let map_shape = map_shape.or_else(|| match field.ty.strip_pointers() {
            TypeExpr::Map(key, value) => {
                let key = self.types.element_type(key);
                if is_valid_map_key(&key) {
                    Some(FieldShape::Map {
                        key,
                        value: type_override
                            .clone()
                            .unwrap_or_else(|| self.types.element_type(value)),
                    })
                } else {
                    suppressed_map_key = Some(key);
                    None
                }
            }
            _ => None,
        });

        let proto_type = match &map_shape {
            Some(FieldShape::Map { value, .. }) => value.clone(),
            _ => type_override.unwrap_or_else(|| self.types.element_type(&field.ty)),
        };

        let auto_repeated = matches!(field.ty.strip_pointers(), TypeExpr::Sequence(_))
            && !field.ty.strip_pointers().is_byte_sequence();
        let shape = match map_shape {
            Some(shape) => shape,
            None if flag("repeated") || auto_repeated => FieldShape::Repeated,
            None if flag("optional") || field.ty.is_pointer() => FieldShape::Optional,
            None => FieldShape::Singular,
        };

        let mut options = Vec::new();
        for ann in &applicable {
            if ann.flag("packed") {
                push_option(&mut options, "packed", "packed = true".to_string());
            }
            if ann.flag("deprecated") {
                push_option(&mut options, "deprecated", "deprecated = true".to_string());
            }
        }
        if let Some(json) = &explicit_json {
            push_option(&mut options, "json_name", format!("json_name = \"{json}\""));
        }
        for ann in annotation::find_all(&field.annotations, kind::OPTION) {
            if let (Some(key), Some(value)) = (ann.string("name"), ann.string("value")) {
                let rendered = if value == "true" || value == "false" || value.parse::<i64>().is_ok() {
                    format!("{key} = {value}")
                } else {
                    format!("{key} = \"{value}\"")
                };
                push_option(&mut options, &key, rendered);
            }
        }
        if let Some(tag) = &tag {
            for key in ["packed", "deprecated"] {
                if tag.option(key) == Some("true") {
                    push_option(&mut options, key, format!("{key} = true"));
                }
            }
        }

        ResolvedField {
            source_name: field.name.clone(),
            name,
            json_name,
            number,
            explicit_number: explicit,
            proto_type,
            shape,
            ty: field.ty.clone(),
            options,
            description: annotation_description(&field.annotations)
                .or_else(|| first_doc_line(field.doc.as_ref())),
            suppressed_map_key,
            oneof: annotation::find_all(&field.annotations, kind::ONEOF)
                .find(|a| a.applies_to(message))
                .and_then(|a| a.string("name")),
        }
    }

    // ── Enums ───────────────────────────────────────────────────────────────

    pub fn resolve_enums(&self) -> Vec<ResolvedEnum> {
        self.ctx
            .enums
            .iter()
            .filter(|e| {
                !annotation::has_kind(&e.annotations, kind::IGNORE)
                    && !annotation::has_kind(&e.annotations, kind::SKIP)
            })
            .map(|e| self.resolve_enum(e))
            .collect()
    }

    pub fn resolve_enum(&self, enum_type: &EnumType) -> ResolvedEnum {
        let values = enum_type
            .values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let ann = annotation::find(&value.annotations, kind::ENUM_VALUE);
                let number = ann
                    .and_then(|a| a.string("number").or_else(|| a.string("value")))
                    .and_then(|n| n.parse::<i64>().ok())
                    .unwrap_or(index as i64);
                ResolvedEnumValue {
                    source_name: value.name.clone(),
                    name: ann
                        .and_then(|a| a.string("name"))
                        .unwrap_or_else(|| screaming_snake_case(&value.name)),
                    number,
                    description: annotation_description(&value.annotations)
                        .or_else(|| first_doc_line(value.doc.as_ref())),
                }
            })
            .collect();
        ResolvedEnum {
            name: enum_type.proto_name(),
            source_name: enum_type.name.clone(),
            description: annotation_description(&enum_type.annotations)
                .or_else(|| first_doc_line(enum_type.doc.as_ref())),
            allow_alias: enum_type.allows_alias(),
            values,
        }
    }

    // ── Services ────────────────────────────────────────────────────────────

    /// Services from annotated contracts, then from annotated composite types
    /// whose `rpc` methods live in the function list.
    pub fn resolve_services(&self) -> Vec<ResolvedService> {
        let mut out = Vec::new();
        for contract in &self.ctx.services {
            let Some(ann) = annotation::find(&contract.annotations, kind::SERVICE) else {
                continue;
            };
            out.push(ResolvedService {
                name: ann.string("name").unwrap_or_else(|| contract.name.clone()),
                source_name: contract.name.clone(),
                description: annotation_description(&contract.annotations)
                    .or_else(|| first_doc_line(contract.doc.as_ref())),
                methods: contract
                    .methods
                    .iter()
                    .map(|m| self.resolve_method(m))
                    .collect(),
            });
        }
        for composite in &self.ctx.structs {
            let Some(ann) = annotation::find(&composite.annotations, kind::SERVICE) else {
                continue;
            };
            let methods = self
                .ctx
                .functions
                .iter()
                .filter(|f| f.receiver.as_deref() == Some(composite.name.as_str()))
                .filter(|f| annotation::has_kind(&f.annotations, kind::RPC))
                .map(|f| self.resolve_function(f))
                .collect();
            out.push(ResolvedService {
                name: ann.string("name").unwrap_or_else(|| composite.name.clone()),
                source_name: composite.name.clone(),
                description: annotation_description(&composite.annotations)
                    .or_else(|| first_doc_line(composite.doc.as_ref())),
                methods,
            });
        }
        out
    }

    fn resolve_method(&self, method: &Method) -> ResolvedMethod {
        self.build_method(
            &method.name,
            &method.params,
            &method.results,
            &method.annotations,
            method.doc.as_ref(),
        )
    }

    fn resolve_function(&self, function: &Function) -> ResolvedMethod {
        self.build_method(
            &function.name,
            &function.params,
            &function.results,
            &function.annotations,
            function.doc.as_ref(),
        )
    }

    fn build_method(
        &self,
        name: &str,
        params: &[Param],
        results: &[Param],
        annotations: &[Annotation],
        doc: Option<&String>,
    ) -> ResolvedMethod {
        let has_context = params.iter().any(|p| is_context_type(&p.ty));
        let domain_input = params
            .iter()
            .find(|p| !is_context_type(&p.ty))
            .map(|p| p.ty.clone());
        let domain_output = results
            .iter()
            .find(|r| !is_error_type(&r.ty))
            .map(|r| r.ty.clone());

        let rpc = annotation::find(annotations, kind::RPC);
        let override_of = |key: &str| rpc.and_then(|a| a.string(key));
        let streaming = |key: &str| rpc.is_some_and(|a| a.flag(key));

        ResolvedMethod {
            source_name: name.to_string(),
            name: override_of("name").unwrap_or_else(|| name.to_string()),
            input: override_of("input")
                .unwrap_or_else(|| self.rpc_message_type(domain_input.as_ref())),
            output: override_of("output")
                .unwrap_or_else(|| self.rpc_message_type(domain_output.as_ref())),
            client_streaming: streaming("client_streaming"),
            server_streaming: streaming("server_streaming"),
            domain_input,
            domain_output,
            has_context,
            description: annotation_description(annotations).or_else(|| first_doc_line(doc)),
        }
    }

    /// RPC request/response type for a domain type. Scalars travel in
    /// wrapper messages and a missing type becomes `Empty`.
    pub fn rpc_message_type(&self, ty: Option<&TypeExpr>) -> String {
        let Some(ty) = ty else {
            return EMPTY_TYPE.to_string();
        };
        let mapped = self.types.element_type(ty);
        if is_scalar(&mapped) {
            scalar_wrapper(&mapped)
                .map(str::to_string)
                .unwrap_or(mapped)
        } else {
            mapped
        }
    }
}
