//! Structural model consumed by the generator.
//!
//! The IR is produced by an upstream source parser and is read-only for the
//! duration of a generation pass. Every node derives serde so fixtures and
//! external loaders can supply it as JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::annotation::{self, kind, Annotation};
use crate::type_expr::TypeExpr;

/// Everything one generation run sees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationContext {
    pub structs: Vec<CompositeType>,
    pub enums: Vec<EnumType>,
    pub services: Vec<ServiceContract>,
    pub functions: Vec<Function>,
    /// Annotations declared at file scope, keyed by source file.
    pub file_annotations: BTreeMap<String, Vec<Annotation>>,
    /// Annotations declared at package scope, keyed by package path.
    pub package_annotations: BTreeMap<String, Vec<Annotation>>,
}

impl GenerationContext {
    pub fn find_struct(&self, name: &str) -> Option<&CompositeType> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn find_enum(&self, name: &str) -> Option<&EnumType> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// Every file- and package-level annotation, files first.
    pub fn scope_annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.file_annotations
            .values()
            .chain(self.package_annotations.values())
            .flatten()
    }
}

/// Alias instantiation of a generic template: `type UserPage = Page[User]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasInstantiation {
    pub target: String,
    #[serde(default)]
    pub type_args: Vec<TypeExpr>,
}

/// A struct-like type that may yield one or more messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeType {
    pub name: String,
    pub package: String,
    pub namespace: Option<String>,
    pub source_file: Option<String>,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
    pub annotations: Vec<Annotation>,
    /// Declared type parameters; non-empty for generic templates.
    pub type_params: Vec<String>,
    pub alias: Option<AliasInstantiation>,
}

impl CompositeType {
    pub fn is_generic_template(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn has_annotation(&self, kind: &str) -> bool {
        annotation::has_kind(&self.annotations, kind)
    }

    /// Message names this type produces, in declaration order. A name
    /// annotated twice appears twice, so validation can report it.
    ///
    /// A type without `message` annotations yields its own name unless it is
    /// empty, a template, skipped, or flagged as a service or enum.
    pub fn message_names(&self) -> Vec<String> {
        if self.is_generic_template()
            || self.has_annotation(kind::IGNORE)
            || self.has_annotation(kind::SKIP)
        {
            return Vec::new();
        }
        let mut names: Vec<String> = Vec::new();
        for ann in annotation::find_all(&self.annotations, kind::MESSAGE) {
            names.push(ann.string("name").unwrap_or_else(|| self.name.clone()));
        }
        if names.is_empty()
            && (!self.fields.is_empty() || self.alias.is_some())
            && !self.has_annotation(kind::SERVICE)
            && !self.has_annotation(kind::ENUM)
        {
            names.push(self.name.clone());
        }
        names
    }

    /// The `message` annotation that defines `message`, if any.
    pub fn message_annotation(&self, message: &str) -> Option<&Annotation> {
        annotation::find_all(&self.annotations, kind::MESSAGE)
            .find(|a| a.string("name").as_deref().unwrap_or(&self.name) == message)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub embedded: bool,
    #[serde(default = "default_true")]
    pub exported: bool,
    #[serde(default)]
    pub doc: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            tag: None,
            annotations: Vec::new(),
            embedded: false,
            exported: true,
            doc: None,
        }
    }

    /// `field` annotations whose `for` scope admits `message`.
    pub fn field_annotations_for<'a>(
        &'a self,
        message: &'a str,
    ) -> impl Iterator<Item = &'a Annotation> + 'a {
        annotation::find_all(&self.annotations, kind::FIELD).filter(move |a| a.applies_to(message))
    }

    pub fn has_field_annotations(&self) -> bool {
        annotation::has_kind(&self.annotations, kind::FIELD)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumType {
    pub name: String,
    pub package: String,
    pub namespace: Option<String>,
    pub source_file: Option<String>,
    pub doc: Option<String>,
    pub values: Vec<EnumValue>,
    pub annotations: Vec<Annotation>,
}

impl EnumType {
    /// Emitted name; an `enum` annotation may rename.
    pub fn proto_name(&self) -> String {
        annotation::find(&self.annotations, kind::ENUM)
            .and_then(|a| a.string("name"))
            .unwrap_or_else(|| self.name.clone())
    }

    pub fn allows_alias(&self) -> bool {
        annotation::find(&self.annotations, kind::ENUM).is_some_and(|a| a.flag("allow_alias"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumValue {
    pub name: String,
    pub doc: Option<String>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceContract {
    pub name: String,
    pub package: String,
    pub namespace: Option<String>,
    pub source_file: Option<String>,
    pub doc: Option<String>,
    pub methods: Vec<Method>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Method {
    pub name: String,
    pub doc: Option<String>,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    pub annotations: Vec<Annotation>,
}

/// A free function or a method with a receiver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Function {
    pub name: String,
    /// Receiver type name without pointer marker.
    pub receiver: Option<String>,
    pub package: String,
    pub doc: Option<String>,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_minimal_context() {
        let ctx: GenerationContext = serde_json::from_value(json!({
            "structs": [{
                "name": "User",
                "package": "example.com/app/models",
                "fields": [
                    { "name": "ID", "type": "int64" },
                    { "name": "secret", "type": "string", "exported": false }
                ]
            }]
        }))
        .expect("context should deserialize");
        let user = ctx.find_struct("User").expect("User present");
        assert!(user.fields[0].exported);
        assert!(!user.fields[1].exported);
        assert_eq!(user.message_names(), vec!["User".to_string()]);
    }

    #[test]
    fn message_names_follow_annotations() {
        let ty: CompositeType = serde_json::from_value(json!({
            "name": "User",
            "fields": [{ "name": "ID", "type": "int64" }],
            "annotations": [
                { "name": "message", "params": { "name": "UserSummary" } },
                { "name": "message", "params": { "name": "UserDetail" } },
                { "name": "message", "params": { "name": "UserSummary" } }
            ]
        }))
        .expect("type should deserialize");
        assert_eq!(ty.message_names(), vec!["UserSummary", "UserDetail", "UserSummary"]);
        assert!(ty.message_annotation("UserDetail").is_some());
    }

    #[test]
    fn templates_and_services_emit_no_message() {
        let template: CompositeType = serde_json::from_value(json!({
            "name": "Page",
            "type_params": ["T"],
            "fields": [{ "name": "Items", "type": "[]T" }]
        }))
        .expect("template should deserialize");
        assert!(template.message_names().is_empty());

        let service: CompositeType = serde_json::from_value(json!({
            "name": "UserService",
            "fields": [{ "name": "db", "type": "*DB" }],
            "annotations": [{ "name": "service" }]
        }))
        .expect("service should deserialize");
        assert!(service.message_names().is_empty());
    }
}
