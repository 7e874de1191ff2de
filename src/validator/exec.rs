//! Stack machine for [`CheckOp`] programs.
//!
//! Two registers (`value`, `container`) plus explicit stacks for saved
//! registers, member loops and speculative groups. Nesting depth of the data
//! never turns into native call depth.
use std::collections::HashSet;

use serde_json::Value;

use super::{CheckOp, Combinator, Guard, ValidationError};
use crate::canonical::{canonical_eq, canonical_form, is_multiple_of};
use crate::schema::TypeName;

#[derive(Debug, Clone, Copy)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

struct Frame<'a> {
    value: Option<&'a Value>,
    container: Option<&'a Value>,
}

enum Members<'a> {
    Keys(Vec<&'a str>),
    Items { len: usize },
}

struct Loop<'a> {
    members: Members<'a>,
    idx: usize,
    matched: bool,
}

struct Speculation {
    mark: usize,
    branch_start: usize,
    passed: usize,
}

struct Machine<'a> {
    value: Option<&'a Value>,
    container: Option<&'a Value>,
    frames: Vec<Frame<'a>>,
    path: Vec<Segment<'a>>,
    loops: Vec<Loop<'a>>,
    speculations: Vec<Speculation>,
    errors: Vec<ValidationError>,
}

/// Run `ops` against `instance`, returning every violation in program order.
pub fn run<'a>(ops: &'a [CheckOp], instance: &'a Value) -> Vec<ValidationError> {
    let mut m = Machine {
        value: Some(instance),
        container: None,
        frames: Vec::new(),
        path: Vec::new(),
        loops: Vec::new(),
        speculations: Vec::new(),
        errors: Vec::new(),
    };
    let mut pc = 0;
    while pc < ops.len() {
        pc = m.step(&ops[pc], pc);
    }
    debug_assert!(m.frames.is_empty() && m.loops.is_empty() && m.speculations.is_empty());
    m.errors
}

impl<'a> Machine<'a> {
    /// Execute one instruction and return the next program counter.
    fn step(&mut self, op: &'a CheckOp, pc: usize) -> usize {
        match op {
            CheckOp::EnterKey(key) => {
                let parent = self.value;
                self.enter(Segment::Key(key), parent.and_then(|v| v.get(key.as_str())));
            }
            CheckOp::EnterIndex(i) => {
                let parent = self.value;
                self.enter(Segment::Index(*i), parent.and_then(|v| v.get(*i)));
            }
            CheckOp::EnterCurrent => {
                let segment = self.current_member();
                let child = match (self.value, segment) {
                    (Some(v), Segment::Key(k)) => v.get(k),
                    (Some(v), Segment::Index(i)) => v.get(i),
                    (None, _) => None,
                };
                self.enter(segment, child);
            }
            CheckOp::Leave => {
                if let Some(frame) = self.frames.pop() {
                    self.value = frame.value;
                    self.container = frame.container;
                    self.path.pop();
                }
            }

            CheckOp::KeysBegin { exit } => {
                let keys = match self.value {
                    Some(Value::Object(map)) => map.keys().map(String::as_str).collect::<Vec<_>>(),
                    _ => Vec::new(),
                };
                if keys.is_empty() {
                    return *exit;
                }
                self.loops.push(Loop { members: Members::Keys(keys), idx: 0, matched: false });
            }
            CheckOp::ItemsBegin { from, exit } => {
                let len = self.value.and_then(Value::as_array).map_or(0, Vec::len);
                if *from >= len {
                    return *exit;
                }
                self.loops.push(Loop { members: Members::Items { len }, idx: *from, matched: false });
            }
            CheckOp::Next { body } => {
                if let Some(lp) = self.loops.last_mut() {
                    lp.idx += 1;
                    lp.matched = false;
                    let len = match &lp.members {
                        Members::Keys(keys) => keys.len(),
                        Members::Items { len } => *len,
                    };
                    if lp.idx < len {
                        return *body;
                    }
                }
                self.loops.pop();
            }
            CheckOp::ClassifyKey { declared } => {
                if let Segment::Key(key) = self.current_member() {
                    if declared.iter().any(|d| d == key) {
                        self.mark_matched();
                    }
                }
            }
            CheckOp::IfKeyMatches { pattern, skip } => match self.current_member() {
                Segment::Key(key) if pattern.is_match(key) => self.mark_matched(),
                _ => return *skip,
            },
            CheckOp::IfUnmatched { skip } => {
                if self.loops.last().is_some_and(|lp| lp.matched) {
                    return *skip;
                }
            }
            CheckOp::RejectKey => {
                self.fail("additionalProperties", "property is not allowed".to_string());
            }

            CheckOp::JumpUnless { guard, target } => {
                if !self.holds(guard) {
                    return *target;
                }
            }

            CheckOp::Speculate => {
                let mark = self.errors.len();
                self.speculations.push(Speculation { mark, branch_start: mark, passed: 0 });
            }
            CheckOp::BranchStart => {
                let len = self.errors.len();
                if let Some(s) = self.speculations.last_mut() {
                    s.branch_start = len;
                }
            }
            CheckOp::BranchEnd => {
                let len = self.errors.len();
                if let Some(s) = self.speculations.last_mut() {
                    if len == s.branch_start {
                        s.passed += 1;
                    }
                }
            }
            CheckOp::Resolve(kind) => {
                if let Some(s) = self.speculations.pop() {
                    self.resolve(*kind, s);
                }
            }

            check => self.keyword(check),
        }
        pc + 1
    }

    fn enter(&mut self, segment: Segment<'a>, child: Option<&'a Value>) {
        self.frames.push(Frame { value: self.value, container: self.container });
        self.path.push(segment);
        self.container = self.value;
        self.value = child;
    }

    fn current_member(&self) -> Segment<'a> {
        match self.loops.last() {
            Some(Loop { members: Members::Keys(keys), idx, .. }) => Segment::Key(keys[*idx]),
            Some(Loop { idx, .. }) => Segment::Index(*idx),
            None => unreachable!("member access outside of a loop"),
        }
    }

    fn mark_matched(&mut self) {
        if let Some(lp) = self.loops.last_mut() {
            lp.matched = true;
        }
    }

    fn holds(&self, guard: &Guard) -> bool {
        match (guard, self.value) {
            (Guard::Present, v) => v.is_some(),
            (Guard::Array, Some(v)) => v.is_array(),
            (Guard::Number, Some(v)) => v.is_number(),
            (Guard::Object, Some(v)) => v.is_object(),
            (Guard::String, Some(v)) => v.is_string(),
            (Guard::HasKey(key), Some(Value::Object(map))) => map.contains_key(key),
            _ => false,
        }
    }

    fn resolve(&mut self, kind: Combinator, s: Speculation) {
        let ok = match kind {
            Combinator::AnyOf => s.passed >= 1,
            Combinator::OneOf => s.passed == 1,
            Combinator::Not => s.passed == 0,
        };
        if ok {
            self.errors.truncate(s.mark);
            return;
        }
        match kind {
            Combinator::AnyOf => self.fail("anyOf", "value does not match any schema in anyOf".to_string()),
            Combinator::OneOf => self.fail(
                "oneOf",
                format!("value must match exactly one schema in oneOf, matched {}", s.passed),
            ),
            Combinator::Not => self.fail("not", "value must not match the schema in not".to_string()),
        }
    }

    fn fail(&mut self, keyword: &'static str, message: String) {
        self.errors.push(ValidationError { keyword, address: self.address(), message });
    }

    fn address(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                Segment::Key(k) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(k);
                }
                Segment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }

    /// Keyword checks. All of them pass on an absent value except `Required`.
    fn keyword(&mut self, op: &CheckOp) {
        let Some(value) = self.value else {
            if matches!(op, CheckOp::Required) {
                self.fail("required", "missing required property".to_string());
            }
            return;
        };
        match op {
            CheckOp::Required => {}
            CheckOp::Type(types) => {
                if !types.matches(value) {
                    self.fail("type", format!("expected {types}, found {}", TypeName::describe(value)));
                }
            }

            CheckOp::MinItems(n) => {
                let len = value.as_array().map_or(0, Vec::len) as u64;
                if len < *n {
                    self.fail("minItems", format!("array has {len} items, fewer than {n}"));
                }
            }
            CheckOp::MaxItems(n) => {
                let len = value.as_array().map_or(0, Vec::len) as u64;
                if len > *n {
                    self.fail("maxItems", format!("array has {len} items, more than {n}"));
                }
            }
            CheckOp::UniqueItems => {
                let items = value.as_array().map_or(&[][..], Vec::as_slice);
                let distinct = items.iter().map(canonical_form).collect::<HashSet<_>>();
                if distinct.len() < items.len() {
                    self.fail("uniqueItems", "array items are not unique".to_string());
                }
            }
            CheckOp::TupleLength(n) => {
                let len = value.as_array().map_or(0, Vec::len);
                if len > *n {
                    self.fail("additionalItems", format!("array has {len} items, tuple allows {n}"));
                }
            }

            CheckOp::Minimum { limit, exclusive } => {
                let x = value.as_f64().unwrap_or(f64::NAN);
                if (*exclusive && !(x > *limit)) || (!*exclusive && !(x >= *limit)) {
                    let op = if *exclusive { ">" } else { ">=" };
                    self.fail("minimum", format!("{x} is not {op} {limit}"));
                }
            }
            CheckOp::Maximum { limit, exclusive } => {
                let x = value.as_f64().unwrap_or(f64::NAN);
                if (*exclusive && !(x < *limit)) || (!*exclusive && !(x <= *limit)) {
                    let op = if *exclusive { "<" } else { "<=" };
                    self.fail("maximum", format!("{x} is not {op} {limit}"));
                }
            }
            CheckOp::MultipleOf(divisor) => {
                if let Value::Number(n) = value {
                    if !is_multiple_of(n, divisor) {
                        self.fail("multipleOf", format!("{n} is not a multiple of {divisor}"));
                    }
                }
            }

            CheckOp::MinProperties(n) => {
                let len = value.as_object().map_or(0, |m| m.len()) as u64;
                if len < *n {
                    self.fail("minProperties", format!("object has {len} properties, fewer than {n}"));
                }
            }
            CheckOp::MaxProperties(n) => {
                let len = value.as_object().map_or(0, |m| m.len()) as u64;
                if len > *n {
                    self.fail("maxProperties", format!("object has {len} properties, more than {n}"));
                }
            }
            CheckOp::DependentKeys { trigger, keys } => {
                let Some(map) = value.as_object() else { return };
                if !map.contains_key(trigger) {
                    return;
                }
                for key in keys.iter().filter(|k| !map.contains_key(k.as_str())) {
                    self.fail("dependencies", format!("`{key}` is required when `{trigger}` is present"));
                }
            }

            CheckOp::MinLength(n) => {
                let len = value.as_str().map_or(0, |s| s.chars().count()) as u64;
                if len < *n {
                    self.fail("minLength", format!("string has {len} characters, fewer than {n}"));
                }
            }
            CheckOp::MaxLength(n) => {
                let len = value.as_str().map_or(0, |s| s.chars().count()) as u64;
                if len > *n {
                    self.fail("maxLength", format!("string has {len} characters, more than {n}"));
                }
            }
            CheckOp::Pattern(rx) => {
                if !value.as_str().is_some_and(|s| rx.is_match(s)) {
                    self.fail("pattern", format!("string does not match /{}/", rx.as_str()));
                }
            }
            CheckOp::Format { name, matcher } => {
                if !value.as_str().is_some_and(|s| matcher.is_match(s)) {
                    self.fail("format", format!("string is not a valid {name}"));
                }
            }

            CheckOp::Enum(values) => {
                if !values.iter().any(|candidate| canonical_eq(candidate, value)) {
                    self.fail("enum", "value is not one of the enumerated values".to_string());
                }
            }

            other => unreachable!("control instruction dispatched as keyword: {other:?}"),
        }
    }
}
