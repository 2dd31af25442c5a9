//! Generic alias resolution.
//!
//! `type UserPage = Page[User]` is recorded in the IR as an alias
//! instantiation. The bindings (`T -> User`) are resolved once here and every
//! emitter reads fields through [`resolved_fields`], so no consumer ever sees
//! an unbound type parameter.

use std::collections::HashMap;

use tracing::warn;

use crate::ir::{CompositeType, Field, GenerationContext};
use crate::type_expr::{short_name, TypeExpr};

/// Type parameter bindings of one alias instantiation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericBindings {
    /// Name of the generic template.
    pub target: String,
    pub bindings: HashMap<String, TypeExpr>,
}

impl GenericBindings {
    pub fn apply(&self, ty: &TypeExpr) -> TypeExpr {
        ty.substitute(&self.bindings)
    }
}

/// Looks up the generic template an alias points at.
pub fn find_template<'a>(ctx: &'a GenerationContext, target: &str) -> Option<&'a CompositeType> {
    ctx.structs
        .iter()
        .filter(|s| s.is_generic_template())
        .find(|s| s.name == target)
        .or_else(|| {
            let local = short_name(target);
            ctx.structs
                .iter()
                .filter(|s| s.is_generic_template())
                .find(|s| s.name == local)
        })
}

/// Resolves the parameter bindings of `composite`, if it is an alias of a
/// known generic template.
pub fn resolve_bindings(ctx: &GenerationContext, composite: &CompositeType) -> Option<GenericBindings> {
    let alias = composite.alias.as_ref()?;
    let Some(template) = find_template(ctx, &alias.target) else {
        warn!(
            alias = %composite.name,
            target = %alias.target,
            "generic template not found; alias fields are used unresolved"
        );
        return None;
    };
    if template.type_params.len() != alias.type_args.len() {
        warn!(
            alias = %composite.name,
            expected = template.type_params.len(),
            got = alias.type_args.len(),
            "type argument count mismatch"
        );
    }
    let bindings = template
        .type_params
        .iter()
        .cloned()
        .zip(alias.type_args.iter().cloned())
        .collect();
    Some(GenericBindings {
        target: template.name.clone(),
        bindings,
    })
}

/// Fields of `composite` with all type parameters substituted.
///
/// An alias without fields of its own inherits the template's field list.
pub fn resolved_fields(ctx: &GenerationContext, composite: &CompositeType) -> Vec<Field> {
    let Some(bindings) = resolve_bindings(ctx, composite) else {
        return composite.fields.clone();
    };
    let source = if composite.fields.is_empty() {
        find_template(ctx, &bindings.target)
            .map(|t| t.fields.as_slice())
            .unwrap_or_default()
    } else {
        composite.fields.as_slice()
    };
    source
        .iter()
        .map(|field| {
            let mut field = field.clone();
            field.ty = bindings.apply(&field.ty);
            field
        })
        .collect()
}
