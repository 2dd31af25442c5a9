//! Free-form annotations attached to IR nodes.
//!
//! Parameter values arrive in whatever encoding the upstream parser chose, so
//! every accessor here fails closed: a missing or mis-typed parameter reads as
//! "not set" rather than an error.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Annotation vocabulary understood by the generator.
pub mod kind {
    pub const MESSAGE: &str = "message";
    pub const ENUM: &str = "enum";
    pub const ENUM_VALUE: &str = "enumvalue";
    pub const FIELD: &str = "field";
    pub const MAP: &str = "map";
    pub const ONEOF: &str = "oneof";
    pub const SERVICE: &str = "service";
    pub const RPC: &str = "rpc";
    pub const RESERVED: &str = "reserved";
    pub const OPTION: &str = "option";
    pub const IGNORE: &str = "ignore";
    pub const SKIP: &str = "skip";
    pub const OMIT: &str = "omit";
    pub const INCLUDE: &str = "include";
    pub const IMPORT: &str = "import";
    pub const EXTEND: &str = "extend";
    pub const NAMESPACE: &str = "namespace";
    pub const PACKAGE: &str = "package";
}

/// A single annotation parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum ParamValue {
    /// Key present without a value (`@field repeated`).
    #[default]
    Absent,
    Bool(bool),
    String(String),
    List(Vec<String>),
}

impl From<JsonValue> for ParamValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => ParamValue::Absent,
            JsonValue::Bool(b) => ParamValue::Bool(b),
            JsonValue::String(s) => ParamValue::String(s),
            JsonValue::Number(n) => ParamValue::String(n.to_string()),
            JsonValue::Array(items) => ParamValue::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        JsonValue::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            JsonValue::Object(_) => ParamValue::String(value.to_string()),
        }
    }
}

impl From<ParamValue> for JsonValue {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Absent => JsonValue::Null,
            ParamValue::Bool(b) => JsonValue::Bool(b),
            ParamValue::String(s) => JsonValue::String(s),
            ParamValue::List(items) => {
                JsonValue::Array(items.into_iter().map(JsonValue::String).collect())
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl ParamValue {
    /// Returns the value as text. Booleans render as `true`/`false`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            ParamValue::String(s) => Some(s.clone()),
            ParamValue::Bool(b) => Some(b.to_string()),
            ParamValue::Absent | ParamValue::List(_) => None,
        }
    }

    /// Interprets the value as a flag. A bare key counts as set.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Absent => Some(true),
            ParamValue::Bool(b) => Some(*b),
            ParamValue::String(s) => match s.trim() {
                "true" | "" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            ParamValue::List(_) => None,
        }
    }

    /// Interprets the value as a list of names.
    ///
    /// Accepts a native list, a bracketed string (`["A", "B"]`) or a
    /// comma-separated string.
    pub fn as_list(&self) -> Vec<String> {
        match self {
            ParamValue::List(items) => items.iter().map(|s| s.trim().to_string()).collect(),
            ParamValue::String(s) => parse_string_list(s),
            ParamValue::Absent | ParamValue::Bool(_) => Vec::new(),
        }
    }

    /// Returns whether this scope value admits `message`.
    ///
    /// `""`, `"true"`, `"*"`, `true` and a bare key admit every message;
    /// `"false"` and `false` admit none; otherwise the value names messages.
    pub fn admits(&self, message: &str) -> bool {
        match self {
            ParamValue::Absent => true,
            ParamValue::Bool(b) => *b,
            ParamValue::String(s) => match s.trim() {
                "" | "true" | "*" => true,
                "false" => false,
                trimmed if trimmed == message => true,
                _ => self.as_list().iter().any(|n| n == message || n == "*"),
            },
            ParamValue::List(items) => items.iter().any(|n| n.trim() == message || n.trim() == "*"),
        }
    }
}

fn parse_string_list(raw: &str) -> Vec<String> {
    let inner = raw
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(raw.trim());
    inner
        .split(',')
        .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A named annotation with ordered parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(default)]
    pub params: IndexMap<String, ParamValue>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: IndexMap::new(),
        }
    }

    /// Builder used by callers that assemble annotations in code.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Case-insensitive match on the annotation kind, either exact or as a
    /// dotted suffix (`proto.field` is a `field` annotation).
    pub fn is(&self, kind: &str) -> bool {
        let name = self.name.trim_start_matches('@').to_ascii_lowercase();
        name == kind || name.ends_with(&format!(".{kind}"))
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Non-empty string parameter.
    pub fn string(&self, key: &str) -> Option<String> {
        self.param(key)
            .and_then(ParamValue::as_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.param(key)
            .and_then(ParamValue::as_bool)
            .unwrap_or(false)
    }

    pub fn number(&self, key: &str) -> Option<u32> {
        self.string(key).and_then(|s| s.parse().ok())
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        self.param(key).map(ParamValue::as_list).unwrap_or_default()
    }

    /// `Some(admitted)` when the scoped parameter is present, `None` otherwise.
    pub fn scope(&self, key: &str, message: &str) -> Option<bool> {
        self.param(key).map(|v| v.admits(message))
    }

    /// Whether the annotation's `for` scope admits `message`. Unscoped
    /// annotations apply everywhere.
    pub fn applies_to(&self, message: &str) -> bool {
        self.scope("for", message).unwrap_or(true)
    }
}

/// First annotation of the given kind.
pub fn find<'a>(annotations: &'a [Annotation], kind: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.is(kind))
}

/// All annotations of the given kind, in declaration order.
pub fn find_all<'a>(
    annotations: &'a [Annotation],
    kind: &'a str,
) -> impl Iterator<Item = &'a Annotation> + 'a {
    annotations.iter().filter(move |a| a.is(kind))
}

pub fn has_kind(annotations: &[Annotation], kind: &str) -> bool {
    annotations.iter().any(|a| a.is(kind))
}
