use std::fmt;

use serde::Serialize;

/// One failed keyword check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub keyword: &'static str,
    /// Location in the instance: dotted keys, bracketed indices, `""` for the root.
    pub address: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// `valid` is always derived from the errors, never tracked on its own.
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        ValidationReport { valid: errors.is_empty(), errors }
    }

    /// Errors recorded for `keyword`, in report order.
    pub fn errors_for<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors.iter().filter(move |e| e.keyword == keyword)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address.is_empty() {
            write!(f, "[{}] {}", self.keyword, self.message)
        } else {
            write!(f, "{}: [{}] {}", self.address, self.keyword, self.message)
        }
    }
}
