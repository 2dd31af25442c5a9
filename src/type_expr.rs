//! Declared type expressions for IR fields, parameters and results.
//!
//! The textual form follows the host notation the upstream parser emits:
//! `*T` (nullable), `[]T` (sequence), `map[K]V` and `Base[A, B]` for a
//! generic instantiation. Anything else is a (possibly package-qualified)
//! named type.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeExpr {
    Named(String),
    Pointer(Box<TypeExpr>),
    Sequence(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Generic { base: String, args: Vec<TypeExpr> },
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeExpr::Pointer(_))
    }

    /// `[]byte` and `[]uint8`, which map to a single bytes field.
    pub fn is_byte_sequence(&self) -> bool {
        match self {
            TypeExpr::Sequence(inner) => {
                matches!(inner.as_ref(), TypeExpr::Named(n) if n == "byte" || n == "uint8")
            }
            _ => false,
        }
    }

    /// Strips any number of pointer layers.
    pub fn strip_pointers(&self) -> &TypeExpr {
        match self {
            TypeExpr::Pointer(inner) => inner.strip_pointers(),
            other => other,
        }
    }

    /// Name of the outermost named or generic base after stripping
    /// pointers and sequences. Maps have no base name.
    pub fn base_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Named(n) => Some(n),
            TypeExpr::Generic { base, .. } => Some(base),
            TypeExpr::Pointer(inner) | TypeExpr::Sequence(inner) => inner.base_name(),
            TypeExpr::Map(..) => None,
        }
    }

    /// Every named type referenced anywhere inside the expression.
    pub fn named_types(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_named(&mut out);
        out
    }

    fn collect_named<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeExpr::Named(n) => out.push(n),
            TypeExpr::Pointer(inner) | TypeExpr::Sequence(inner) => inner.collect_named(out),
            TypeExpr::Map(key, value) => {
                key.collect_named(out);
                value.collect_named(out);
            }
            TypeExpr::Generic { base, args } => {
                out.push(base);
                for arg in args {
                    arg.collect_named(out);
                }
            }
        }
    }

    /// Replaces bound type parameters throughout the expression.
    pub fn substitute(&self, bindings: &HashMap<String, TypeExpr>) -> TypeExpr {
        match self {
            TypeExpr::Named(n) => bindings.get(n).cloned().unwrap_or_else(|| self.clone()),
            TypeExpr::Pointer(inner) => TypeExpr::Pointer(Box::new(inner.substitute(bindings))),
            TypeExpr::Sequence(inner) => TypeExpr::Sequence(Box::new(inner.substitute(bindings))),
            TypeExpr::Map(key, value) => TypeExpr::Map(
                Box::new(key.substitute(bindings)),
                Box::new(value.substitute(bindings)),
            ),
            TypeExpr::Generic { base, args } => TypeExpr::Generic {
                base: base.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
        }
    }
}

/// Drops a package qualifier: `models.User` becomes `User`.
pub fn short_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(n) => write!(f, "{n}"),
            TypeExpr::Pointer(inner) => write!(f, "*{inner}"),
            TypeExpr::Sequence(inner) => write!(f, "[]{inner}"),
            TypeExpr::Map(key, value) => write!(f, "map[{key}]{value}"),
            TypeExpr::Generic { base, args } => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{base}[{}]", args.join(", "))
            }
        }
    }
}

impl FromStr for TypeExpr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type(s.trim())
    }
}

impl TryFrom<String> for TypeExpr {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeExpr> for String {
    fn from(value: TypeExpr) -> Self {
        value.to_string()
    }
}

fn parse_type(s: &str) -> Result<TypeExpr, String> {
    if s.is_empty() {
        return Err("empty type expression".to_string());
    }
    if let Some(rest) = s.strip_prefix('*') {
        return Ok(TypeExpr::Pointer(Box::new(parse_type(rest.trim())?)));
    }
    if let Some(rest) = s.strip_prefix("map[") {
        let close = matching_bracket(rest)
            .ok_or_else(|| format!("unbalanced map key in type '{s}'"))?;
        let key = parse_type(rest[..close].trim())?;
        let value = parse_type(rest[close + 1..].trim())?;
        return Ok(TypeExpr::Map(Box::new(key), Box::new(value)));
    }
    if let Some(rest) = s.strip_prefix('[') {
        // `[]T` and fixed-size `[N]T` are both sequences
        let close = matching_bracket(rest)
            .ok_or_else(|| format!("unbalanced brackets in type '{s}'"))?;
        return Ok(TypeExpr::Sequence(Box::new(parse_type(
            rest[close + 1..].trim(),
        )?)));
    }
    if s.ends_with(']') {
        if let Some(open) = s.find('[') {
            let base = s[..open].trim();
            let inner = &s[open + 1..s.len() - 1];
            if base.is_empty() {
                return Err(format!("generic type without base in '{s}'"));
            }
            let args = split_top_level(inner)
                .into_iter()
                .map(parse_type)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(TypeExpr::Generic {
                base: base.to_string(),
                args,
            });
        }
    }
    Ok(TypeExpr::Named(s.to_string()))
}

/// Index of the `]` that closes an already-consumed `[`.
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' if depth == 0 => return Some(i),
            ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> TypeExpr {
        s.parse().expect("type should parse")
    }

    #[test]
    fn parses_nested_shapes() {
        assert_eq!(
            ty("map[string]*models.User"),
            TypeExpr::Map(
                Box::new(TypeExpr::named("string")),
                Box::new(TypeExpr::Pointer(Box::new(TypeExpr::named("models.User"))))
            )
        );
        assert_eq!(
            ty("Page[[]Item, map[string]int]"),
            TypeExpr::Generic {
                base: "Page".into(),
                args: vec![
                    TypeExpr::Sequence(Box::new(TypeExpr::named("Item"))),
                    TypeExpr::Map(
                        Box::new(TypeExpr::named("string")),
                        Box::new(TypeExpr::named("int"))
                    ),
                ],
            }
        );
        assert_eq!(ty("[4]byte"), ty("[]byte"));
        assert_eq!(ty("interface{}"), TypeExpr::named("interface{}"));
    }

    #[test]
    fn display_is_canonical() {
        for s in ["*T", "[]*pkg.T", "map[int64][]string", "Result[User, *Error]"] {
            assert_eq!(ty(s).to_string(), s);
        }
    }

    #[test]
    fn substitutes_through_every_shape() {
        let mut bindings = HashMap::new();
        bindings.insert("T".to_string(), ty("User"));
        assert_eq!(
            ty("map[string][]*Wrapper[T]").substitute(&bindings).to_string(),
            "map[string][]*Wrapper[User]"
        );
    }

    #[test]
    fn rejects_unbalanced_map() {
        assert!("map[string".parse::<TypeExpr>().is_err());
        assert!("".parse::<TypeExpr>().is_err());
    }
}
