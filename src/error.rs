//! Error types for schema compilation and initializer execution.
//!
//! Validation failures are not errors; they are reported as data through
//! [`crate::validator::ValidationReport`].
use thiserror::Error;

use crate::path_de::PathError;
use crate::schema::TypeName;

/// Failure while parsing or compiling a schema document.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// No `type` keyword and no keyword that signals one.
    #[error("cannot infer a type for the schema at `{address}`; declare `type` explicitly")]
    AmbiguousType { address: String },

    /// `format` names something the registry does not know.
    #[error("unknown format `{name}`")]
    UnknownFormat { name: String },

    /// `pattern` or a `patternProperties` key is not a valid regular expression.
    #[error("invalid regular expression `{pattern}` at `{address}`: {source}")]
    InvalidPattern {
        pattern: String,
        address: String,
        #[source]
        source: regex::Error,
    },

    /// A pattern handed to [`crate::format::FormatRegistry::register`] failed to compile.
    #[error("invalid pattern for format `{name}`: {source}")]
    InvalidFormatPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// The initializer root must be an object or an array.
    #[error("initializer root must be an object or array schema, found {found}")]
    NonContainerRoot { found: String },

    /// The schema document itself could not be parsed.
    #[error(transparent)]
    Parse(#[from] PathError),
}

/// Fatal failure while applying a compiled initializer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("root {side} is {found} but the schema describes {expected}")]
    RootTypeMismatch {
        side: &'static str,
        expected: TypeName,
        found: &'static str,
    },
}
