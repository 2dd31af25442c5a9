//! Raw field tag access (`proto:"name,number=3" json:"name,omitempty"`).

use std::sync::OnceLock;

use regex::Regex;

fn tag_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][A-Za-z0-9_.-]*):"((?:[^"\\]|\\.)*)""#)
            .expect("tag pattern is valid")
    })
}

/// Returns the raw value stored under `key` in a field tag.
pub fn lookup(raw_tag: &str, key: &str) -> Option<String> {
    let raw_tag = raw_tag.trim().trim_matches('`');
    tag_pair_re()
        .captures_iter(raw_tag)
        .find(|caps| &caps[1] == key)
        .map(|caps| caps[2].replace("\\\"", "\""))
}

/// Parsed segments of a schema tag value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSpec {
    /// `-` as the whole value: drop the field everywhere.
    pub skip: bool,
    pub name: Option<String>,
    pub number: Option<u32>,
    pub type_override: Option<String>,
    pub json_name: Option<String>,
    /// `key=value` pairs other than the ones above, in order.
    pub options: Vec<(String, String)>,
    /// Bare segments after the name (`repeated`, `optional`).
    pub flags: Vec<String>,
}

impl TagSpec {
    pub fn parse(value: &str) -> Self {
        let mut spec = TagSpec::default();
        if value.trim() == "-" {
            spec.skip = true;
            return spec;
        }
        for (index, segment) in value.split(',').map(str::trim).enumerate() {
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((key, val)) => {
                    let (key, val) = (key.trim(), val.trim().to_string());
                    match key {
                        "number" => spec.number = val.parse().ok(),
                        "type" => spec.type_override = Some(val),
                        "json_name" => spec.json_name = Some(val),
                        "name" => spec.name = Some(val),
                        _ => spec.options.push((key.to_string(), val)),
                    }
                }
                None if index == 0 => {
                    if segment != "-" {
                        spec.name = Some(segment.to_string());
                    }
                }
                None => spec.flags.push(segment.to_string()),
            }
        }
        spec
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Reads the configured schema tag key from raw field tags.
#[derive(Debug, Clone)]
pub struct TagReader {
    key: String,
}

impl Default for TagReader {
    fn default() -> Self {
        Self::new("proto")
    }
}

impl TagReader {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn read(&self, raw_tag: Option<&str>) -> Option<TagSpec> {
        lookup(raw_tag?, &self.key).map(|value| TagSpec::parse(&value))
    }

    /// Name from the `json` tag, ignoring `-` and empty names.
    pub fn json_name(&self, raw_tag: Option<&str>) -> Option<String> {
        let value = lookup(raw_tag?, "json")?;
        let name = value.split(',').next()?.trim();
        (!name.is_empty() && name != "-").then(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_keys_in_backtick_tags() {
        let tag = r#"`json:"user_id,omitempty" proto:"id,number=4"`"#;
        assert_eq!(lookup(tag, "proto").as_deref(), Some("id,number=4"));
        assert_eq!(lookup(tag, "json").as_deref(), Some("user_id,omitempty"));
        assert_eq!(lookup(tag, "yaml"), None);
    }

    #[test]
    fn parses_segments() {
        let spec = TagSpec::parse("id,number=3,type=int64,json_name=ident,packed=true,repeated");
        assert_eq!(spec.name.as_deref(), Some("id"));
        assert_eq!(spec.number, Some(3));
        assert_eq!(spec.type_override.as_deref(), Some("int64"));
        assert_eq!(spec.json_name.as_deref(), Some("ident"));
        assert_eq!(spec.option("packed"), Some("true"));
        assert!(spec.has_flag("repeated"));
    }

    #[test]
    fn dash_means_skip() {
        assert!(TagSpec::parse("-").skip);
        let spec = TagSpec::parse(",number=2");
        assert!(!spec.skip);
        assert_eq!(spec.name, None);
        assert_eq!(spec.number, Some(2));
    }

    #[test]
    fn reader_uses_configured_key() {
        let reader = TagReader::new("pb");
        let tag = Some(r#"pb:"name" json:"-""#);
        assert_eq!(reader.read(tag).and_then(|s| s.name).as_deref(), Some("name"));
        assert_eq!(reader.json_name(tag), None);
        assert_eq!(TagReader::default().read(tag), None);
    }
}
