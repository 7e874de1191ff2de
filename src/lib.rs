//! Compile JSON-Schema-like documents into reusable operations:
//!
//! - an [`Initializer`] that merges a source value into a target while
//!   applying schema defaults, and
//! - a [`Validator`] that checks an instance and reports every violation.
//!
//! Both are compiled once into flat instruction programs and run by small
//! explicit-stack machines; execution never looks at the schema again.
pub mod canonical;
pub mod error;
pub mod format;
pub mod inference;
pub mod initializer;
pub mod path_de;
pub mod schema;
pub mod validator;

#[cfg(test)]
mod strategies;

pub use error::{ApplyError, SchemaError};
pub use format::{FormatRegistry, Matcher};
pub use initializer::{ApplyOptions, Initializer};
pub use schema::{DefaultValue, SchemaNode, TypeName, TypeSet};
pub use validator::{ValidationError, ValidationReport, Validator};
