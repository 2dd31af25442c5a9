//! Rust expressions converting between domain values and compiled message
//! values.
//!
//! Every expression is built from a *place*: a Rust place expression of the
//! source type (`value.name`, `(*item)`, `proto.tags`). Composite shapes
//! (slices, maps, nullable messages) are converted through named helper
//! functions collected as [`HelperData`], one per distinct type expression.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::naming::{pascal_case, snake_case};
use crate::resolver::{FieldShape, ResolvedField};
use crate::type_expr::{short_name, TypeExpr};
use crate::type_map::{is_scalar, TypeMapper};

/// How a named host type travels across the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// Schema scalar; both sides share one Rust type.
    Scalar { rust: &'static str, copy: bool },
    /// Well-known message with a fixed Rust type on both sides.
    WellKnown { rust: &'static str },
    Enum { name: String },
    Message { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HelperKind {
    Slice,
    Map,
    Pointer,
}

/// A generated conversion helper pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelperData {
    pub kind: HelperKind,
    pub to_proto_name: String,
    pub to_proto_param: String,
    pub to_proto_return: String,
    pub to_proto_body: String,
    pub from_proto_name: String,
    pub from_proto_param: String,
    pub from_proto_return: String,
    pub from_proto_body: String,
}

/// Rust type of a schema scalar, and whether it is `Copy`.
pub fn rust_scalar(proto_type: &str) -> Option<(&'static str, bool)> {
    Some(match proto_type {
        "double" => ("f64", true),
        "float" => ("f32", true),
        "int32" | "sint32" | "sfixed32" => ("i32", true),
        "int64" | "sint64" | "sfixed64" => ("i64", true),
        "uint32" | "fixed32" => ("u32", true),
        "uint64" | "fixed64" => ("u64", true),
        "bool" => ("bool", true),
        "string" => ("String", false),
        "bytes" => ("Vec<u8>", false),
        _ => return None,
    })
}

/// Rust type of a `google.protobuf.*` message as compiled by prost.
pub fn well_known_rust(proto_type: &str) -> Option<&'static str> {
    Some(match proto_type.strip_prefix("google.protobuf.")? {
        "Timestamp" => "::prost_types::Timestamp",
        "Duration" => "::prost_types::Duration",
        "Any" => "::prost_types::Any",
        "Struct" => "::prost_types::Struct",
        "Value" => "::prost_types::Value",
        "ListValue" => "::prost_types::ListValue",
        "FieldMask" => "::prost_types::FieldMask",
        "Empty" => "()",
        "StringValue" => "String",
        "BytesValue" => "Vec<u8>",
        "BoolValue" => "bool",
        "Int32Value" => "i32",
        "Int64Value" => "i64",
        "UInt32Value" => "u32",
        "UInt64Value" => "u64",
        "FloatValue" => "f32",
        "DoubleValue" => "f64",
        _ => return None,
    })
}

/// Deterministic helper suffix for a type expression: pointers become
/// `star`, sequences `slice`, package separators `_`, all snake-cased.
pub fn helper_suffix(ty: &TypeExpr) -> String {
    let raw = match ty {
        TypeExpr::Pointer(inner) => format!("star_{}", helper_suffix(inner)),
        TypeExpr::Sequence(inner) => format!("slice_{}", helper_suffix(inner)),
        TypeExpr::Map(key, value) => {
            format!("map_{}_{}", helper_suffix(key), helper_suffix(value))
        }
        TypeExpr::Generic { base, args } => {
            let args: Vec<String> = args.iter().map(helper_suffix).collect();
            format!("{}_{}", base.replace('.', "_"), args.join("_"))
        }
        TypeExpr::Named(name) => name.replace('.', "_"),
    };
    snake_case(&raw)
}

/// Builds conversion expressions and collects the helpers they call.
#[derive(Debug, Clone)]
pub struct Conversions<'a> {
    types: TypeMapper<'a>,
    /// Enum lookup by source name and schema name.
    enums: HashMap<String, String>,
    domain: String,
    proto: String,
    helpers: BTreeMap<String, HelperData>,
}

impl<'a> Conversions<'a> {
    pub fn new(
        types: TypeMapper<'a>,
        enums: HashMap<String, String>,
        domain: impl Into<String>,
        proto: impl Into<String>,
    ) -> Self {
        Self {
            types,
            enums,
            domain: domain.into(),
            proto: proto.into(),
            helpers: BTreeMap::new(),
        }
    }

    /// Collected helpers, ordered by name.
    pub fn into_helpers(self) -> Vec<HelperData> {
        self.helpers.into_values().collect()
    }

    pub fn uses_maps(&self) -> bool {
        self.helpers.values().any(|h| h.kind == HelperKind::Map)
    }

    fn classify(&self, ty: &TypeExpr) -> Kind {
        let host = match ty {
            TypeExpr::Generic { base, .. } => base.as_str(),
            TypeExpr::Named(name) => name.as_str(),
            _ => "",
        };
        let mapped = self.types.map_named(host);
        if is_scalar(&mapped) {
            if let Some((rust, copy)) = rust_scalar(&mapped) {
                return Kind::Scalar { rust, copy };
            }
        }
        if let Some(rust) = well_known_rust(&mapped) {
            return Kind::WellKnown { rust };
        }
        let enum_name = self
            .enums
            .get(&mapped)
            .or_else(|| self.enums.get(short_name(host)));
        if let Some(name) = enum_name {
            return Kind::Enum { name: name.clone() };
        }
        Kind::Message { name: mapped }
    }

    // ── Types ───────────────────────────────────────────────────────────────

    /// Rust type of a domain value.
    pub fn domain_type(&self, ty: &TypeExpr) -> String {
        match ty {
            TypeExpr::Pointer(inner) => format!("Option<{}>", self.domain_type(inner)),
            _ if ty.is_byte_sequence() => "Vec<u8>".to_string(),
            TypeExpr::Sequence(inner) => format!("Vec<{}>", self.domain_type(inner)),
            TypeExpr::Map(key, value) => format!(
                "HashMap<{}, {}>",
                self.domain_type(key),
                self.domain_type(value)
            ),
            TypeExpr::Generic { base, args } => {
                let args: Vec<String> = args.iter().map(|a| self.domain_type(a)).collect();
                format!("{}::{}<{}>", self.domain, short_name(base), args.join(", "))
            }
            TypeExpr::Named(name) => match self.classify(ty) {
                Kind::Scalar { rust, .. } | Kind::WellKnown { rust } => rust.to_string(),
                Kind::Enum { .. } | Kind::Message { .. } => {
                    format!("{}::{}", self.domain, short_name(name))
                }
            },
        }
    }

    /// Rust type of the compiled value for one element of `ty`. Nullable
    /// layers collapse: compiled sequences and maps hold plain values.
    pub fn proto_type(&self, ty: &TypeExpr) -> String {
        match ty {
            TypeExpr::Pointer(inner) => self.proto_type(inner),
            _ if ty.is_byte_sequence() => "Vec<u8>".to_string(),
            TypeExpr::Sequence(inner) => format!("Vec<{}>", self.proto_type(inner)),
            TypeExpr::Map(key, value) => {
                format!("HashMap<{}, {}>", self.proto_type(key), self.proto_type(value))
            }
            TypeExpr::Named(_) | TypeExpr::Generic { .. } => match self.classify(ty) {
                Kind::Scalar { rust, .. } | Kind::WellKnown { rust } => rust.to_string(),
                Kind::Enum { .. } => "i32".to_string(),
                Kind::Message { name } => self.proto_message(&name),
            },
        }
    }

    /// Path of a compiled message type.
    pub fn proto_message(&self, name: &str) -> String {
        format!("{}::{}", self.proto, pascal_case(name))
    }

    // ── Values ──────────────────────────────────────────────────────────────

    /// Converts the domain value at `place` to its compiled element value.
    pub fn to_value(&mut self, ty: &TypeExpr, place: &str) -> String {
        match ty {
            TypeExpr::Pointer(inner) => format!(
                "{place}.as_ref().map(|v| {}).unwrap_or_default()",
                self.to_value(inner, "(*v)")
            ),
            _ if ty.is_byte_sequence() => format!("{place}.clone()"),
            TypeExpr::Sequence(inner) => {
                let (to, _) = self.slice_helper(inner);
                format!("{to}(&{place})")
            }
            TypeExpr::Map(key, value) => {
                let (to, _) = self.map_helper(key, value);
                format!("{to}(&{place})")
            }
            TypeExpr::Named(_) | TypeExpr::Generic { .. } => match self.classify(ty) {
                Kind::Scalar { copy: true, .. } => place.to_string(),
                Kind::Scalar { .. } | Kind::WellKnown { .. } => format!("{place}.clone()"),
                Kind::Enum { name } => format!("{}_to_proto(&{place})", snake_case(&name)),
                Kind::Message { name } => {
                    format!("{}_to_proto(&{place}).unwrap_or_default()", snake_case(&name))
                }
            },
        }
    }

    /// Converts the compiled element value at `place` back to a domain value.
    pub fn from_value(&mut self, ty: &TypeExpr, place: &str) -> String {
        match ty {
            TypeExpr::Pointer(inner) => format!("Some({})", self.from_value(inner, place)),
            _ if ty.is_byte_sequence() => format!("{place}.clone()"),
            TypeExpr::Sequence(inner) => {
                let (_, from) = self.slice_helper(inner);
                format!("{from}(&{place})")
            }
            TypeExpr::Map(key, value) => {
                let (_, from) = self.map_helper(key, value);
                format!("{from}(&{place})")
            }
            TypeExpr::Named(_) | TypeExpr::Generic { .. } => match self.classify(ty) {
                Kind::Scalar { copy: true, .. } => place.to_string(),
                Kind::Scalar { .. } | Kind::WellKnown { .. } => format!("{place}.clone()"),
                Kind::Enum { name } => format!("{}_from_proto({place})", snake_case(&name)),
                Kind::Message { name } => {
                    format!("{}_from_proto(Some(&{place}))", snake_case(&name))
                }
            },
        }
    }

    /// Boolean expression that is true when the domain value at `place` is
    /// its zero value.
    pub fn zero_check(&mut self, ty: &TypeExpr, place: &str) -> String {
        match ty {
            TypeExpr::Pointer(_) => format!("{place}.is_none()"),
            TypeExpr::Sequence(_) | TypeExpr::Map(..) => format!("{place}.is_empty()"),
            TypeExpr::Named(_) | TypeExpr::Generic { .. } => match self.classify(ty) {
                Kind::Scalar { rust: "bool", .. } => format!("!{place}"),
                Kind::Scalar { rust: "String" | "Vec<u8>", .. } => format!("{place}.is_empty()"),
                Kind::Scalar { rust: "f32" | "f64", .. } => format!("{place} == 0.0"),
                Kind::Scalar { .. } => format!("{place} == 0"),
                Kind::WellKnown { .. } => format!("{place} == Default::default()"),
                Kind::Enum { name } => format!("{}_to_proto(&{place}) == 0", snake_case(&name)),
                Kind::Message { name } => format!("is_zero_{}(&{place})", snake_case(&name)),
            },
        }
    }

    // ── Fields ──────────────────────────────────────────────────────────────

    /// Value assigned to the compiled field, read from the domain `place`.
    pub fn field_to_proto(&mut self, field: &ResolvedField, place: &str) -> String {
        if field.suppressed_map_key.is_some() {
            return "Default::default()".to_string();
        }
        let base = field.ty.strip_pointers().clone();
        let pointer = field.ty.is_pointer();
        match &field.shape {
            FieldShape::Map { .. } if !matches!(base, TypeExpr::Map(..)) => {
                "Default::default()".to_string()
            }
            FieldShape::Repeated if !matches!(base, TypeExpr::Sequence(_)) => {
                format!("vec![{}]", self.to_value(&field.ty, place))
            }
            FieldShape::Map { .. } | FieldShape::Repeated => self.to_value(&field.ty, place),
            FieldShape::Singular | FieldShape::Optional => {
                if let Some(cast) = self.override_to(field, &base, place) {
                    return cast;
                }
                match self.classify(&base) {
                    Kind::Message { name } if !base.is_byte_sequence() => {
                        if pointer {
                            let (to, _) = self.pointer_helper(&base, &name);
                            format!("{to}(&{place})")
                        } else {
                            format!("{}_to_proto(&{place})", snake_case(&name))
                        }
                    }
                    Kind::WellKnown { .. } if !base.is_byte_sequence() => {
                        if pointer {
                            format!("{place}.clone()")
                        } else {
                            format!("Some({place}.clone())")
                        }
                    }
                    _ if field.shape == FieldShape::Optional => {
                        if pointer {
                            format!(
                                "{place}.as_ref().map(|v| {})",
                                self.to_value(&base, "(*v)")
                            )
                        } else {
                            format!("Some({})", self.to_value(&base, place))
                        }
                    }
                    _ => self.to_value(&field.ty, place),
                }
            }
        }
    }

    /// Value assigned to the domain field, read from the compiled `place`.
    pub fn field_from_proto(&mut self, field: &ResolvedField, place: &str) -> String {
        if field.suppressed_map_key.is_some() {
            return "Default::default()".to_string();
        }
        let base = field.ty.strip_pointers().clone();
        let pointer = field.ty.is_pointer();
        match &field.shape {
            FieldShape::Map { .. } if !matches!(base, TypeExpr::Map(..)) => {
                "Default::default()".to_string()
            }
            FieldShape::Repeated if !matches!(base, TypeExpr::Sequence(_)) => format!(
                "{place}.first().map(|v| {}).unwrap_or_default()",
                self.from_value(&field.ty, "(*v)")
            ),
            FieldShape::Map { .. } | FieldShape::Repeated => self.from_value(&field.ty, place),
            FieldShape::Singular | FieldShape::Optional => {
                if let Some(cast) = self.override_from(field, &base, place) {
                    return cast;
                }
                match self.classify(&base) {
                    Kind::Message { name } if !base.is_byte_sequence() => {
                        if pointer {
                            let (_, from) = self.pointer_helper(&base, &name);
                            format!("{from}({place}.as_ref())")
                        } else {
                            format!("{}_from_proto({place}.as_ref())", snake_case(&name))
                        }
                    }
                    Kind::WellKnown { .. } if !base.is_byte_sequence() => {
                        if pointer {
                            format!("{place}.clone()")
                        } else {
                            format!("{place}.clone().unwrap_or_default()")
                        }
                    }
                    _ if field.shape == FieldShape::Optional => {
                        let inner = self.from_value(&base, "(*v)");
                        if pointer {
                            format!("{place}.as_ref().map(|v| {inner})")
                        } else {
                            format!("{place}.as_ref().map(|v| {inner}).unwrap_or_default()")
                        }
                    }
                    _ => self.from_value(&field.ty, place),
                }
            }
        }
    }

    /// Scalar fields whose schema type was overridden convert by cast or
    /// through their textual form.
    fn override_to(&self, field: &ResolvedField, base: &TypeExpr, place: &str) -> Option<String> {
        let (natural, target) = self.overridden_scalars(field, base)?;
        Some(match (natural, target) {
            (_, "String") => format!("{place}.to_string()"),
            ("String", _) => format!("{place}.parse().unwrap_or_default()"),
            (_, target) => format!("{place} as {target}"),
        })
    }

    fn override_from(&self, field: &ResolvedField, base: &TypeExpr, place: &str) -> Option<String> {
        let (natural, target) = self.overridden_scalars(field, base)?;
        Some(match (natural, target) {
            ("String", _) => format!("{place}.to_string()"),
            (_, "String") => format!("{place}.parse().unwrap_or_default()"),
            (natural, _) => format!("{place} as {natural}"),
        })
    }

    fn overridden_scalars(
        &self,
        field: &ResolvedField,
        base: &TypeExpr,
    ) -> Option<(&'static str, &'static str)> {
        if field.ty.is_pointer() || field.shape != FieldShape::Singular {
            return None;
        }
        let natural = self.types.element_type(base);
        if natural == field.proto_type {
            return None;
        }
        let (natural_rust, _) = rust_scalar(&natural)?;
        let (target_rust, _) = rust_scalar(&field.proto_type)?;
        if natural_rust == "Vec<u8>" || target_rust == "Vec<u8>" || natural_rust == target_rust {
            return None;
        }
        debug!(field = %field.name, from = %natural, to = %field.proto_type, "converting overridden scalar");
        Some((natural_rust, target_rust))
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    fn slice_helper(&mut self, inner: &TypeExpr) -> (String, String) {
        let suffix = helper_suffix(inner);
        let to_name = format!("convert_slice_to_proto_{suffix}");
        let from_name = format!("convert_slice_from_proto_{suffix}");
        if !self.helpers.contains_key(&to_name) {
            let to_item = self.to_value(inner, "(*item)");
            let from_item = self.from_value(inner, "(*item)");
            let helper = HelperData {
                kind: HelperKind::Slice,
                to_proto_name: to_name.clone(),
                to_proto_param: format!("&[{}]", self.domain_type(inner)),
                to_proto_return: format!("Vec<{}>", self.proto_type(inner)),
                to_proto_body: format!("value.iter().map(|item| {to_item}).collect()"),
                from_proto_name: from_name.clone(),
                from_proto_param: format!("&[{}]", self.proto_type(inner)),
                from_proto_return: format!("Vec<{}>", self.domain_type(inner)),
                from_proto_body: format!("value.iter().map(|item| {from_item}).collect()"),
            };
            self.helpers.insert(to_name.clone(), helper);
        }
        (to_name, from_name)
    }

    fn map_helper(&mut self, key: &TypeExpr, value: &TypeExpr) -> (String, String) {
        let suffix = format!("{}_{}", helper_suffix(key), helper_suffix(value));
        let to_name = format!("convert_map_to_proto_{suffix}");
        let from_name = format!("convert_map_from_proto_{suffix}");
        if !self.helpers.contains_key(&to_name) {
            let to_key = self.to_value(key, "(*key)");
            let to_item = self.to_value(value, "(*item)");
            let from_key = self.from_value(key, "(*key)");
            let from_item = self.from_value(value, "(*item)");
            let domain = format!(
                "HashMap<{}, {}>",
                self.domain_type(key),
                self.domain_type(value)
            );
            let proto = format!("HashMap<{}, {}>", self.proto_type(key), self.proto_type(value));
            let helper = HelperData {
                kind: HelperKind::Map,
                to_proto_name: to_name.clone(),
                to_proto_param: format!("&{domain}"),
                to_proto_return: proto.clone(),
                to_proto_body: format!(
                    "value.iter().map(|(key, item)| ({to_key}, {to_item})).collect()"
                ),
                from_proto_name: from_name.clone(),
                from_proto_param: format!("&{proto}"),
                from_proto_return: domain,
                from_proto_body: format!(
                    "value.iter().map(|(key, item)| ({from_key}, {from_item})).collect()"
                ),
            };
            self.helpers.insert(to_name.clone(), helper);
        }
        (to_name, from_name)
    }

    fn pointer_helper(&mut self, inner: &TypeExpr, message: &str) -> (String, String) {
        let suffix = helper_suffix(&TypeExpr::Pointer(Box::new(inner.clone())));
        let to_name = format!("convert_pointer_to_proto_{suffix}");
        let from_name = format!("convert_pointer_from_proto_{suffix}");
        if !self.helpers.contains_key(&to_name) {
            let prefix = snake_case(message);
            let domain = self.domain_type(inner);
            let proto = self.proto_type(inner);
            let helper = HelperData {
                kind: HelperKind::Pointer,
                to_proto_name: to_name.clone(),
                to_proto_param: format!("&Option<{domain}>"),
                to_proto_return: format!("Option<{proto}>"),
                to_proto_body: format!("value.as_ref().and_then({prefix}_to_proto)"),
                from_proto_name: from_name.clone(),
                from_proto_param: format!("Option<&{proto}>"),
                from_proto_return: format!("Option<{domain}>"),
                from_proto_body: format!("value.map(|item| {prefix}_from_proto(Some(item)))"),
            };
            self.helpers.insert(to_name.clone(), helper);
        }
        (to_name, from_name)
    }
}
