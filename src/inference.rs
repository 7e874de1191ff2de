//! Type inference for schema nodes that omit `type`.
//!
//! Only container and string kinds leave keyword evidence behind. When
//! several signal sets are present the preference is object, then array,
//! then string. `number`, `integer`, `boolean` and `null` have no exclusive
//! keywords and must be declared.
use crate::error::SchemaError;
use crate::schema::{SchemaNode, TypeName, TypeSet};

/// Explicit `type` if present, otherwise the inferred one. The root is the
/// only node inferred, so a failure reports the root address `""`.
pub fn infer_type(node: &SchemaNode) -> Result<TypeSet, SchemaError> {
    if let Some(explicit) = &node.type_ {
        return Ok(explicit.clone());
    }
    signalled_kind(node)
        .map(TypeSet::single)
        .ok_or_else(|| SchemaError::AmbiguousType { address: String::new() })
}

/// Kind implied by keywords alone, ignoring `type`.
fn signalled_kind(node: &SchemaNode) -> Option<TypeName> {
    if signals_object(node) {
        Some(TypeName::Object)
    } else if signals_array(node) {
        Some(TypeName::Array)
    } else if signals_string(node) {
        Some(TypeName::String)
    } else {
        None
    }
}

/// Container kind for an initializer root.
///
/// An explicit union is accepted as long as exactly one container kind is
/// named in it.
pub fn container_kind(node: &SchemaNode) -> Result<TypeName, SchemaError> {
    let types = infer_type(node)?;
    match (types.contains(TypeName::Object), types.contains(TypeName::Array)) {
        (true, false) => Ok(TypeName::Object),
        (false, true) => Ok(TypeName::Array),
        _ => Err(SchemaError::NonContainerRoot { found: types.to_string() }),
    }
}

fn signals_object(node: &SchemaNode) -> bool {
    node.properties.is_some()
        || node.pattern_properties.is_some()
        || node.additional_properties.is_some()
        || node.min_properties.is_some()
        || node.max_properties.is_some()
        || node.dependencies.is_some()
        || node.required.is_some()
}

fn signals_array(node: &SchemaNode) -> bool {
    node.min_items.is_some()
        || node.max_items.is_some()
        || node.items.is_some()
        || node.unique_items.is_some()
}

fn signals_string(node: &SchemaNode) -> bool {
    node.min_length.is_some() || node.max_length.is_some() || node.pattern.is_some()
}
