//! Host type to schema type mapping.

use crate::config::GeneratorConfig;
use crate::type_expr::{short_name, TypeExpr};

/// Scalar types accepted as map keys.
pub const VALID_MAP_KEYS: &[&str] = &[
    "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32", "fixed64", "sfixed32",
    "sfixed64", "bool", "string",
];

const SCALARS: &[&str] = &[
    "double", "float", "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32",
    "fixed64", "sfixed32", "sfixed64", "bool", "string", "bytes",
];

// ── Built-in tables ─────────────────────────────────────────────────────────

fn builtin_scalar(host: &str) -> Option<&'static str> {
    Some(match host {
        "string" => "string",
        "int" | "int32" | "int16" | "int8" | "rune" => "int32",
        "int64" => "int64",
        "uint" | "uint32" | "uint16" | "uint8" | "byte" => "uint32",
        "uint64" | "uintptr" => "uint64",
        "bool" => "bool",
        "float32" => "float",
        "float64" => "double",
        _ => return None,
    })
}

fn builtin_well_known(host: &str) -> Option<&'static str> {
    Some(match host {
        "time.Time" => "google.protobuf.Timestamp",
        "time.Duration" => "google.protobuf.Duration",
        "any" | "interface{}" | "anypb.Any" => "google.protobuf.Any",
        "wrapperspb.StringValue" => "google.protobuf.StringValue",
        "wrapperspb.BoolValue" => "google.protobuf.BoolValue",
        "wrapperspb.Int32Value" => "google.protobuf.Int32Value",
        "wrapperspb.Int64Value" => "google.protobuf.Int64Value",
        "wrapperspb.UInt32Value" => "google.protobuf.UInt32Value",
        "wrapperspb.UInt64Value" => "google.protobuf.UInt64Value",
        "wrapperspb.FloatValue" => "google.protobuf.FloatValue",
        "wrapperspb.DoubleValue" => "google.protobuf.DoubleValue",
        "wrapperspb.BytesValue" => "google.protobuf.BytesValue",
        "structpb.Struct" => "google.protobuf.Struct",
        "structpb.Value" => "google.protobuf.Value",
        "structpb.ListValue" => "google.protobuf.ListValue",
        "emptypb.Empty" => "google.protobuf.Empty",
        _ => return None,
    })
}

/// Import file for a `google.protobuf.*` type.
pub fn well_known_import(proto_type: &str) -> Option<&'static str> {
    let local = proto_type.strip_prefix("google.protobuf.")?;
    Some(match local {
        "Timestamp" => "google/protobuf/timestamp.proto",
        "Duration" => "google/protobuf/duration.proto",
        "Any" => "google/protobuf/any.proto",
        "Struct" | "Value" | "ListValue" | "NullValue" => "google/protobuf/struct.proto",
        "Empty" => "google/protobuf/empty.proto",
        "FieldMask" => "google/protobuf/field_mask.proto",
        l if l.ends_with("Value") => "google/protobuf/wrappers.proto",
        _ => return None,
    })
}

/// `google.protobuf` wrapper for a scalar, used when an RPC carries a bare scalar.
pub fn scalar_wrapper(proto_type: &str) -> Option<&'static str> {
    Some(match proto_type {
        "string" => "google.protobuf.StringValue",
        "bool" => "google.protobuf.BoolValue",
        "int32" => "google.protobuf.Int32Value",
        "int64" => "google.protobuf.Int64Value",
        "uint32" => "google.protobuf.UInt32Value",
        "uint64" => "google.protobuf.UInt64Value",
        "float" => "google.protobuf.FloatValue",
        "double" => "google.protobuf.DoubleValue",
        "bytes" => "google.protobuf.BytesValue",
        _ => return None,
    })
}

pub fn is_scalar(proto_type: &str) -> bool {
    SCALARS.contains(&proto_type)
}

pub fn is_valid_map_key(proto_type: &str) -> bool {
    VALID_MAP_KEYS.contains(&proto_type)
}

// ── Mapper ──────────────────────────────────────────────────────────────────

/// Resolves declared types against the configuration and built-in tables.
#[derive(Debug, Clone, Copy)]
pub struct TypeMapper<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> TypeMapper<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self { config }
    }

    /// Maps a named host type. Unknown names lose their package qualifier.
    pub fn map_named(&self, host: &str) -> String {
        if let Some(mapped) = self.config.type_mappings.get(host) {
            return mapped.clone();
        }
        if let Some(known) = self.config.known_types.get(host) {
            return known.proto_type.clone();
        }
        if let Some(scalar) = builtin_scalar(host) {
            return scalar.to_string();
        }
        if let Some(wkt) = builtin_well_known(host) {
            return wkt.to_string();
        }
        if host.starts_with("google.protobuf.") {
            return host.to_string();
        }
        short_name(host).to_string()
    }

    /// Element type of a field, ignoring its repeated/optional/map shape.
    pub fn element_type(&self, ty: &TypeExpr) -> String {
        match ty {
            TypeExpr::Named(n) => self.map_named(n),
            TypeExpr::Pointer(inner) => self.element_type(inner),
            _ if ty.is_byte_sequence() => "bytes".to_string(),
            TypeExpr::Sequence(inner) => self.element_type(inner),
            TypeExpr::Map(_, value) => self.element_type(value),
            TypeExpr::Generic { base, .. } => self.map_named(base),
        }
    }

    /// Imports required by every type referenced in `ty`.
    pub fn imports_for(&self, ty: &TypeExpr) -> Vec<String> {
        let mut out = Vec::new();
        for name in ty.named_types() {
            if let Some(import) = self.import_for_host(name) {
                if !out.contains(&import) {
                    out.push(import);
                }
            }
        }
        out
    }

    /// Import for a host type: configured known types first, then the
    /// well-known fallbacks.
    pub fn import_for_host(&self, host: &str) -> Option<String> {
        if let Some(known) = self.config.known_types.get(host) {
            if let Some(import) = &known.import {
                return Some(import.clone());
            }
            return well_known_import(&known.proto_type).map(str::to_string);
        }
        well_known_import(&self.map_named(host)).map(str::to_string)
    }
}
