//! Schema IR.
//!
//! An immutable tree built once from a JSON-Schema-like document (or by hand)
//! and shared by any number of compilations. Keyword names follow the
//! document's camelCase spelling; unknown keywords are ignored.
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::error::SchemaError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Primitive type names understood by `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeName {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

/// Ordered, duplicate-free union of type names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "TypeSpec")]
pub struct TypeSet(Vec<TypeName>);

#[derive(Deserialize)]
#[serde(untagged)]
enum TypeSpec {
    One(TypeName),
    Many(Vec<TypeName>),
}

/// `items`: one schema for every element, or one schema per position.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Items {
    Tuple(Vec<SchemaNode>),
    Single(Box<SchemaNode>),
}

/// `additionalProperties` / `additionalItems`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Additional {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

/// One entry of `dependencies`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    Keys(Vec<String>),
    Schema(Box<SchemaNode>),
}

/// A `default`, evaluated each time an initializer runs.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "type")]
    pub type_: Option<TypeSet>,

    // structure
    pub properties: Option<IndexMap<String, SchemaNode>>,
    pub pattern_properties: Option<IndexMap<String, SchemaNode>>,
    pub additional_properties: Option<Additional>,
    pub items: Option<Items>,
    pub additional_items: Option<Additional>,
    pub required: Option<Vec<String>>,
    #[serde(default, deserialize_with = "literal_default")]
    pub default: Option<DefaultValue>,

    // number
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    #[serde(default)]
    pub exclusive_minimum: bool,
    #[serde(default)]
    pub exclusive_maximum: bool,
    pub multiple_of: Option<Number>,

    // string
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub format: Option<String>,

    // array
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: Option<bool>,

    // object
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    pub dependencies: Option<IndexMap<String, Dependency>>,

    // combinators
    pub any_of: Option<Vec<SchemaNode>>,
    pub all_of: Option<Vec<SchemaNode>>,
    pub one_of: Option<Vec<SchemaNode>>,
    pub not: Option<Box<SchemaNode>>,

    #[serde(rename = "enum")]
    pub enum_: Option<Vec<Value>>,

    /// Parsed but never resolved.
    #[serde(rename = "$ref")]
    pub reference: Option<String>,

    /// Skipped by the initializer unless `ApplyOptions::private` is set.
    #[serde(default)]
    pub private: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeName {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeName::Array => "array",
            TypeName::Boolean => "boolean",
            TypeName::Integer => "integer",
            TypeName::Null => "null",
            TypeName::Number => "number",
            TypeName::Object => "object",
            TypeName::String => "string",
        }
    }

    /// Primitive predicate for a present value.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            TypeName::Array => value.is_array(),
            TypeName::Boolean => value.is_boolean(),
            TypeName::Integer => is_integer(value),
            TypeName::Null => value.is_null(),
            TypeName::Number => value.is_number(),
            TypeName::Object => value.is_object(),
            TypeName::String => value.is_string(),
        }
    }

    /// Name of the JSON kind of `value`, used in messages.
    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

impl TypeSet {
    pub fn new(names: impl IntoIterator<Item = TypeName>) -> Self {
        let mut out = Vec::new();
        for name in names {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        TypeSet(out)
    }

    pub fn single(name: TypeName) -> Self {
        TypeSet(vec![name])
    }

    pub fn names(&self) -> &[TypeName] {
        &self.0
    }

    pub fn contains(&self, name: TypeName) -> bool {
        self.0.contains(&name)
    }

    pub fn matches(&self, value: &Value) -> bool {
        self.0.iter().any(|t| t.matches(value))
    }
}

impl From<TypeSpec> for TypeSet {
    fn from(spec: TypeSpec) -> Self {
        match spec {
            TypeSpec::One(name) => TypeSet::single(name),
            TypeSpec::Many(names) => TypeSet::new(names),
        }
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.0.iter().map(|t| t.as_str()).collect::<Vec<_>>();
        f.write_str(&names.join(" | "))
    }
}

impl DefaultValue {
    pub fn producer<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        DefaultValue::Producer(Arc::new(f))
    }

    /// Evaluate the default. Producers are invoked afresh on every call.
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

// `default: null` is a real default, so presence must not collapse into `None`.
fn literal_default<'de, D>(de: D) -> Result<Option<DefaultValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(de).map(|v| Some(DefaultValue::Literal(v)))
}

impl SchemaNode {
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        Ok(crate::path_de::from_value_with_path(value)?)
    }

    pub fn from_str(src: &str) -> Result<Self, SchemaError> {
        Ok(crate::path_de::from_str_with_path(src)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SchemaError> {
        Ok(crate::path_de::from_slice_with_path(bytes)?)
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Literal(value));
        self
    }

    pub fn with_default_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::producer(f));
        self
    }

    /// Mutable access to a declared property, for attaching producer defaults
    /// after parsing.
    pub fn property_mut(&mut self, name: &str) -> Option<&mut SchemaNode> {
        self.properties.as_mut()?.get_mut(name)
    }

    /// A node with no nested structure; the initializer copies it verbatim.
    pub fn is_leaf(&self) -> bool {
        self.properties.is_none()
            && self.items.is_none()
            && self.additional_properties.is_none()
            && self.additional_items.is_none()
    }

    pub fn is_required(&self, key: &str) -> bool {
        self.required.as_ref().is_some_and(|req| req.iter().any(|k| k == key))
    }

    /// `additionalProperties` is `true` or a schema.
    pub fn allows_extra_properties(&self) -> bool {
        allows_extra(self.additional_properties.as_ref())
    }

    /// `additionalItems` is `true` or a schema.
    pub fn allows_extra_items(&self) -> bool {
        allows_extra(self.additional_items.as_ref())
    }
}

fn allows_extra(additional: Option<&Additional>) -> bool {
    matches!(additional, Some(Additional::Allowed(true)) | Some(Additional::Schema(_)))
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
