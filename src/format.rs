//! Named string formats for the `format` keyword.
//!
//! The validator resolves names here once, at compile time; execution only
//! ever sees the resolved [`Matcher`].
use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SchemaError;

/// Accepts or rejects a string.
#[derive(Clone)]
pub enum Matcher {
    Pattern(Regex),
    Check(fn(&str) -> bool),
}

impl Matcher {
    pub fn is_match(&self, s: &str) -> bool {
        match self {
            Matcher::Pattern(rx) => rx.is_match(s),
            Matcher::Check(f) => f(s),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Pattern(rx) => f.debug_tuple("Pattern").field(&rx.as_str()).finish(),
            Matcher::Check(_) => f.write_str("Check(..)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: HashMap<String, Matcher>,
}

// ————————————————————————————————————————————————————————————————————————————
// BUILT-INS
// ————————————————————————————————————————————————————————————————————————————

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"));
static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("static regex")
});
static URI: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:[^\s]*$").expect("static regex"));
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").expect("static regex")
});
static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01]\d|2[0-3]):[0-5]\d:([0-5]\d|60)(\.\d+)?([Zz]|[+-]([01]\d|2[0-3]):[0-5]\d)?$").expect("static regex")
});

static BUILTIN: Lazy<FormatRegistry> = Lazy::new(FormatRegistry::with_defaults);

fn is_date_time(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_date(s: &str) -> bool {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

fn is_ipv6(s: &str) -> bool {
    s.parse::<Ipv6Addr>().is_ok()
}

fn is_hostname(s: &str) -> bool {
    s.len() <= 253 && HOSTNAME.is_match(s)
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl FormatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the common formats.
    pub fn with_defaults() -> Self {
        let mut out = Self::new();
        out.register_matcher("date-time", Matcher::Check(is_date_time));
        out.register_matcher("date", Matcher::Check(is_date));
        out.register_matcher("time", Matcher::Pattern(TIME.clone()));
        out.register_matcher("email", Matcher::Pattern(EMAIL.clone()));
        out.register_matcher("hostname", Matcher::Check(is_hostname));
        out.register_matcher("ipv4", Matcher::Check(is_ipv4));
        out.register_matcher("ipv6", Matcher::Check(is_ipv6));
        out.register_matcher("uri", Matcher::Pattern(URI.clone()));
        out.register_matcher("uuid", Matcher::Pattern(UUID.clone()));
        out
    }

    /// Shared instance of [`FormatRegistry::with_defaults`].
    pub fn builtin() -> &'static FormatRegistry {
        &BUILTIN
    }

    /// Register (or replace) a format backed by a regular expression.
    pub fn register(&mut self, name: &str, pattern: &str) -> Result<(), SchemaError> {
        let rx = Regex::new(pattern).map_err(|source| SchemaError::InvalidFormatPattern {
            name: name.to_string(),
            source,
        })?;
        self.register_matcher(name, Matcher::Pattern(rx));
        Ok(())
    }

    pub fn register_matcher(&mut self, name: &str, matcher: Matcher) {
        self.formats.insert(name.to_string(), matcher);
    }

    pub fn resolve(&self, name: &str) -> Result<Matcher, SchemaError> {
        self.formats
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownFormat { name: name.to_string() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_formats() {
        let reg = FormatRegistry::builtin();
        let check = |name: &str, s: &str| reg.resolve(name).unwrap().is_match(s);
        assert!(check("date-time", "2024-02-29T12:30:00Z"));
        assert!(!check("date-time", "2024-02-30T12:30:00Z"));
        assert!(check("date", "2023-01-31"));
        assert!(!check("date", "2023-1-31"));
        assert!(check("time", "23:59:59.123+02:00"));
        assert!(check("email", "a.b@example.org"));
        assert!(!check("email", "nope"));
        assert!(check("hostname", "api.example.com"));
        assert!(!check("hostname", "-bad.example.com"));
        assert!(check("ipv4", "192.168.0.1"));
        assert!(!check("ipv4", "256.1.1.1"));
        assert!(check("ipv6", "::1"));
        assert!(check("uri", "https://example.com/a?b=c"));
        assert!(check("uuid", "123e4567-e89b-12d3-a456-426614174000"));
    }

    #[test]
    fn register_and_resolve() {
        let mut reg = FormatRegistry::new();
        assert!(matches!(reg.resolve("zip"), Err(SchemaError::UnknownFormat { .. })));
        reg.register("zip", r"^\d{5}$").unwrap();
        let m = reg.resolve("zip").unwrap();
        assert!(m.is_match("12345"));
        assert!(!m.is_match("1234"));
    }

    #[test]
    fn register_rejects_bad_pattern() {
        let mut reg = FormatRegistry::new();
        assert!(matches!(reg.register("bad", "("), Err(SchemaError::InvalidFormatPattern { .. })));
        assert!(!reg.contains("bad"));
    }
}
