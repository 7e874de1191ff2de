//! Validator compiler.
//!
//! Walks a [`SchemaNode`] once and flattens it into a [`CheckOp`] program: a
//! linear instruction list with forward/backward jumps, run by the stack
//! machine in [`exec`]. Nothing in the program refers back to the schema.
//!
//! Layout of one node, in order: type, array block, number block, object
//! block, string block, `enum`, `anyOf`, `allOf`, `not`, `oneOf`. Each
//! kind-specific block sits behind a [`Guard`] on the value's kind. A
//! `required` check, when the node is reached through a required key, is
//! emitted by the parent right after descending.
pub mod exec;
pub mod report;

use regex::Regex;
use serde_json::{Number, Value};

use crate::error::SchemaError;
use crate::format::{FormatRegistry, Matcher};
use crate::schema::{Additional, Dependency, Items, SchemaNode, TypeSet};

pub use report::{ValidationError, ValidationReport};

// ————————————————————————————————————————————————————————————————————————————
// INSTRUCTIONS
// ————————————————————————————————————————————————————————————————————————————

/// Condition tested by [`CheckOp::JumpUnless`] against the current value.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    Present,
    Array,
    Number,
    /// An object (never an array or null).
    Object,
    String,
    /// The current value is an object owning `key`.
    HasKey(String),
}

/// How a speculative group decides success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    AnyOf,
    OneOf,
    Not,
}

#[derive(Debug, Clone)]
pub enum CheckOp {
    // ---- frames ----
    /// Save the registers, make the value the container, read `container[key]`.
    EnterKey(String),
    EnterIndex(usize),
    /// Like `EnterKey`/`EnterIndex` for the innermost loop's current member.
    EnterCurrent,
    Leave,

    // ---- member loops over the current value ----
    /// Iterate own keys of the current object; jump to `exit` when it has none.
    KeysBegin { exit: usize },
    /// Iterate indices `from..len` of the current array; jump to `exit` when empty.
    ItemsBegin { from: usize, exit: usize },
    /// Advance the innermost loop; jump back to `body` while members remain.
    Next { body: usize },
    /// Mark the current key matched if it is one of `declared`.
    ClassifyKey { declared: Vec<String> },
    /// Mark the current key matched and fall through if `pattern` matches it,
    /// otherwise jump to `skip`.
    IfKeyMatches { pattern: Regex, skip: usize },
    IfUnmatched { skip: usize },
    /// The current member is not allowed (`additionalProperties: false`).
    RejectKey,

    JumpUnless { guard: Guard, target: usize },

    // ---- keyword checks on the current value ----
    Required,
    Type(TypeSet),
    MinItems(u64),
    MaxItems(u64),
    UniqueItems,
    /// `additionalItems: false` after a tuple of this length.
    TupleLength(usize),
    Minimum { limit: f64, exclusive: bool },
    Maximum { limit: f64, exclusive: bool },
    MultipleOf(Number),
    MinProperties(u64),
    MaxProperties(u64),
    DependentKeys { trigger: String, keys: Vec<String> },
    MinLength(u64),
    MaxLength(u64),
    Pattern(Regex),
    Format { name: String, matcher: Matcher },
    Enum(Vec<Value>),

    // ---- speculation ----
    /// Open a group: remember the error count.
    Speculate,
    BranchStart,
    /// Count the branch as passed if it added no errors.
    BranchEnd,
    /// Close the innermost group: roll back on success, report on failure.
    Resolve(Combinator),
}

/// A compiled check operation. Immutable and shareable across threads.
#[derive(Debug, Clone)]
pub struct Validator {
    ops: Vec<CheckOp>,
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILER
// ————————————————————————————————————————————————————————————————————————————

struct Compiler<'r> {
    registry: &'r FormatRegistry,
    ops: Vec<CheckOp>,
}

impl<'r> Compiler<'r> {
    fn here(&self) -> usize {
        self.ops.len()
    }

    fn emit(&mut self, op: CheckOp) -> usize {
        self.ops.push(op);
        self.ops.len() - 1
    }

    /// Point the jump at `at` to the next instruction to be emitted.
    fn patch(&mut self, at: usize) {
        let here = self.here();
        match &mut self.ops[at] {
            CheckOp::KeysBegin { exit }
            | CheckOp::ItemsBegin { exit, .. } => *exit = here,
            CheckOp::IfKeyMatches { skip, .. } | CheckOp::IfUnmatched { skip } => *skip = here,
            CheckOp::JumpUnless { target, .. } => *target = here,
            other => unreachable!("not a jump: {other:?}"),
        }
    }

    /// Emit `body` behind a guard; drop the guard again if `body` emitted nothing.
    fn guarded(
        &mut self,
        guard: Guard,
        body: impl FnOnce(&mut Self) -> Result<(), SchemaError>,
    ) -> Result<(), SchemaError> {
        let at = self.emit(CheckOp::JumpUnless { guard, target: 0 });
        body(self)?;
        if self.here() == at + 1 {
            self.ops.pop();
        } else {
            self.patch(at);
        }
        Ok(())
    }

    /// Descend with `enter`, optionally check presence, compile `node`, return.
    fn descend(&mut self, enter: CheckOp, required: bool, node: &SchemaNode, at: &str) -> Result<(), SchemaError> {
        self.emit(enter);
        if required {
            self.emit(CheckOp::Required);
        }
        self.node(node, at)?;
        self.emit(CheckOp::Leave);
        Ok(())
    }

    /// Loop over the members of the current value, entering each one.
    fn each_item(&mut self, from: usize, node: &SchemaNode, at: &str) -> Result<(), SchemaError> {
        let begin = self.emit(CheckOp::ItemsBegin { from, exit: 0 });
        let body = self.here();
        self.descend(CheckOp::EnterCurrent, false, node, at)?;
        self.emit(CheckOp::Next { body });
        self.patch(begin);
        Ok(())
    }

    fn node(&mut self, node: &SchemaNode, at: &str) -> Result<(), SchemaError> {
        if let Some(reference) = &node.reference {
            log::warn!("`$ref` {reference:?} at `{at}` is not resolved; ignoring it");
        }
        if let Some(types) = &node.type_ {
            self.emit(CheckOp::Type(types.clone()));
        }
        self.guarded(Guard::Array, |c| c.array_block(node, at))?;
        self.guarded(Guard::Number, |c| c.number_block(node))?;
        self.guarded(Guard::Object, |c| c.object_block(node, at))?;
        self.guarded(Guard::String, |c| c.string_block(node, at))?;
        if let Some(values) = &node.enum_ {
            self.emit(CheckOp::Enum(values.clone()));
        }
        if let Some(branches) = &node.any_of {
            self.guarded(Guard::Present, |c| c.speculate(Combinator::AnyOf, branches, at))?;
        }
        if let Some(branches) = &node.all_of {
            for branch in branches {
                self.node(branch, at)?;
            }
        }
        if let Some(negated) = &node.not {
            self.guarded(Guard::Present, |c| c.speculate(Combinator::Not, std::slice::from_ref(negated.as_ref()), at))?;
        }
        if let Some(branches) = &node.one_of {
            self.guarded(Guard::Present, |c| c.speculate(Combinator::OneOf, branches, at))?;
        }
        Ok(())
    }

    fn speculate(&mut self, kind: Combinator, branches: &[SchemaNode], at: &str) -> Result<(), SchemaError> {
        self.emit(CheckOp::Speculate);
        for branch in branches {
            self.emit(CheckOp::BranchStart);
            self.node(branch, at)?;
            self.emit(CheckOp::BranchEnd);
        }
        self.emit(CheckOp::Resolve(kind));
        Ok(())
    }

    fn array_block(&mut self, node: &SchemaNode, at: &str) -> Result<(), SchemaError> {
        if let Some(n) = node.min_items {
            self.emit(CheckOp::MinItems(n));
        }
        if let Some(n) = node.max_items {
            self.emit(CheckOp::MaxItems(n));
        }
        if node.unique_items == Some(true) {
            self.emit(CheckOp::UniqueItems);
        }
        match &node.items {
            None => {}
            Some(Items::Single(item)) => self.each_item(0, item, &format!("{at}[]"))?,
            Some(Items::Tuple(positions)) => {
                for (i, item) in positions.iter().enumerate() {
                    self.descend(CheckOp::EnterIndex(i), false, item, &format!("{at}[{i}]"))?;
                }
                match &node.additional_items {
                    None | Some(Additional::Allowed(true)) => {}
                    Some(Additional::Allowed(false)) => {
                        self.emit(CheckOp::TupleLength(positions.len()));
                    }
                    Some(Additional::Schema(extra)) => {
                        self.each_item(positions.len(), extra, &format!("{at}[]"))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn number_block(&mut self, node: &SchemaNode) -> Result<(), SchemaError> {
        if let Some(limit) = node.minimum {
            self.emit(CheckOp::Minimum { limit, exclusive: node.exclusive_minimum });
        }
        if let Some(limit) = node.maximum {
            self.emit(CheckOp::Maximum { limit, exclusive: node.exclusive_maximum });
        }
        if let Some(divisor) = &node.multiple_of {
            self.emit(CheckOp::MultipleOf(divisor.clone()));
        }
        Ok(())
    }

    fn object_block(&mut self, node: &SchemaNode, at: &str) -> Result<(), SchemaError> {
        if let Some(n) = node.min_properties {
            self.emit(CheckOp::MinProperties(n));
        }
        if let Some(n) = node.max_properties {
            self.emit(CheckOp::MaxProperties(n));
        }

        let declared = node.properties.as_ref();
        if let Some(props) = declared {
            for (key, child) in props {
                let required = node.is_required(key);
                self.descend(CheckOp::EnterKey(key.clone()), required, child, &join(at, key))?;
            }
        }
        for key in node.required.iter().flatten() {
            if !declared.is_some_and(|p| p.contains_key(key)) {
                self.emit(CheckOp::EnterKey(key.clone()));
                self.emit(CheckOp::Required);
                self.emit(CheckOp::Leave);
            }
        }

        self.other_properties(node, at)?;

        for (trigger, dependency) in node.dependencies.iter().flatten() {
            match dependency {
                Dependency::Keys(keys) => {
                    self.emit(CheckOp::DependentKeys { trigger: trigger.clone(), keys: keys.clone() });
                }
                Dependency::Schema(schema) => {
                    self.guarded(Guard::HasKey(trigger.clone()), |c| c.node(schema, at))?;
                }
            }
        }
        Ok(())
    }

    /// One pass over every own key for `patternProperties` and
    /// `additionalProperties` together.
    fn other_properties(&mut self, node: &SchemaNode, at: &str) -> Result<(), SchemaError> {
        let patterns = node.pattern_properties.as_ref().filter(|p| !p.is_empty());
        let additional = match &node.additional_properties {
            None | Some(Additional::Allowed(true)) => None,
            Some(other) => Some(other),
        };
        if patterns.is_none() && additional.is_none() {
            return Ok(());
        }

        let begin = self.emit(CheckOp::KeysBegin { exit: 0 });
        let body = self.here();
        if additional.is_some() {
            let declared = node.properties.iter().flat_map(|p| p.keys().cloned()).collect();
            self.emit(CheckOp::ClassifyKey { declared });
        }
        for (source, schema) in patterns.into_iter().flatten() {
            let pattern = Regex::new(source).map_err(|source_err| SchemaError::InvalidPattern {
                pattern: source.clone(),
                address: at.to_string(),
                source: source_err,
            })?;
            let test = self.emit(CheckOp::IfKeyMatches { pattern, skip: 0 });
            self.descend(CheckOp::EnterCurrent, false, schema, &join(at, "*"))?;
            self.patch(test);
        }
        if let Some(additional) = additional {
            let test = self.emit(CheckOp::IfUnmatched { skip: 0 });
            match additional {
                Additional::Schema(schema) => self.descend(CheckOp::EnterCurrent, false, schema, &join(at, "*"))?,
                Additional::Allowed(_) => {
                    self.emit(CheckOp::EnterCurrent);
                    self.emit(CheckOp::RejectKey);
                    self.emit(CheckOp::Leave);
                }
            }
            self.patch(test);
        }
        self.emit(CheckOp::Next { body });
        self.patch(begin);
        Ok(())
    }

    fn string_block(&mut self, node: &SchemaNode, at: &str) -> Result<(), SchemaError> {
        if let Some(n) = node.min_length {
            self.emit(CheckOp::MinLength(n));
        }
        if let Some(n) = node.max_length {
            self.emit(CheckOp::MaxLength(n));
        }
        if let Some(source) = &node.pattern {
            let pattern = Regex::new(source).map_err(|err| SchemaError::InvalidPattern {
                pattern: source.clone(),
                address: at.to_string(),
                source: err,
            })?;
            self.emit(CheckOp::Pattern(pattern));
        }
        if let Some(name) = &node.format {
            let matcher = self.registry.resolve(name)?;
            self.emit(CheckOp::Format { name: name.clone(), matcher });
        }
        Ok(())
    }
}

fn join(at: &str, key: &str) -> String {
    if at.is_empty() { key.to_string() } else { format!("{at}.{key}") }
}

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

impl Validator {
    /// Compile against the built-in format registry.
    pub fn compile(schema: &SchemaNode) -> Result<Self, SchemaError> {
        Self::compile_with(schema, FormatRegistry::builtin())
    }

    pub fn compile_with(schema: &SchemaNode, registry: &FormatRegistry) -> Result<Self, SchemaError> {
        let mut compiler = Compiler { registry, ops: Vec::new() };
        compiler.node(schema, "")?;
        log::debug!("compiled validator: {} instructions", compiler.ops.len());
        Ok(Validator { ops: compiler.ops })
    }

    /// The compiled program, for inspection.
    pub fn ops(&self) -> &[CheckOp] {
        &self.ops
    }

    pub fn check(&self, instance: &Value) -> ValidationReport {
        ValidationReport::from_errors(exec::run(&self.ops, instance))
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.check(instance).valid
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(schema: Value) -> Validator {
        Validator::compile(&SchemaNode::from_value(&schema).unwrap()).unwrap()
    }

    fn keywords(report: &ValidationReport) -> Vec<(&'static str, &str)> {
        report.errors.iter().map(|e| (e.keyword, e.address.as_str())).collect()
    }

    #[test]
    fn required_scenario() {
        let v = compile(json!({
            "type": "object",
            "required": ["id"],
            "properties": { "id": { "type": "string" } }
        }));
        let report = v.check(&json!({}));
        assert!(!report.valid);
        assert_eq!(keywords(&report), [("required", "id")]);
        assert_eq!(v.check(&json!({ "id": "x" })), ValidationReport { valid: true, errors: vec![] });
    }

    #[test]
    fn required_without_declared_property() {
        let v = compile(json!({ "required": ["a", "b"] }));
        let report = v.check(&json!({ "b": null }));
        assert_eq!(keywords(&report), [("required", "a")]);
    }

    #[test]
    fn absent_values_only_fail_required() {
        let v = compile(json!({
            "properties": { "n": { "type": "integer", "minimum": 3, "enum": [4, 5] } }
        }));
        assert!(v.is_valid(&json!({})));
        assert_eq!(keywords(&v.check(&json!({ "n": 1 }))), [("minimum", "n"), ("enum", "n")]);
    }

    #[test]
    fn type_unions() {
        let v = compile(json!({ "type": ["string", "null"] }));
        assert!(v.is_valid(&json!("a")));
        assert!(v.is_valid(&json!(null)));
        let report = v.check(&json!(1));
        assert_eq!(report.errors[0].message, "expected string | null, found number");
    }

    #[test]
    fn checks_do_not_short_circuit() {
        let v = compile(json!({ "type": "string", "minLength": 3, "pattern": "^[a-z]+$", "enum": ["abcd"] }));
        let report = v.check(&json!("A1"));
        assert_eq!(keywords(&report), [("minLength", ""), ("pattern", ""), ("enum", "")]);
    }

    #[test]
    fn anyof_rolls_back_failing_branches() {
        let v = compile(json!({ "anyOf": [{ "type": "string" }, { "type": "number" }] }));
        assert_eq!(v.check(&json!("x")), ValidationReport { valid: true, errors: vec![] });
        let report = v.check(&json!(true));
        assert_eq!(keywords(&report), [("type", ""), ("type", ""), ("anyOf", "")]);
        assert_eq!(report.errors_for("anyOf").count(), 1);
    }

    #[test]
    fn oneof_requires_exactly_one() {
        let v = compile(json!({ "oneOf": [{ "type": "integer" }, { "minimum": 2 }] }));
        assert!(v.is_valid(&json!(1)));
        assert!(v.is_valid(&json!(2.5)));
        let report = v.check(&json!(3));
        assert_eq!(keywords(&report), [("oneOf", "")]);
        let report = v.check(&json!(1.5));
        assert_eq!(report.errors.last().map(|e| e.keyword), Some("oneOf"));
    }

    #[test]
    fn combinators_skip_absent_values() {
        let v = compile(json!({
            "properties": {
                "a": { "oneOf": [{ "type": "string" }, { "type": "number" }] },
                "b": { "anyOf": [{ "type": "string" }, { "required": ["x"] }] }
            }
        }));
        assert_eq!(v.check(&json!({})), ValidationReport { valid: true, errors: vec![] });
        assert!(v.is_valid(&json!({ "a": 1, "b": "s" })));
        assert_eq!(keywords(&v.check(&json!({ "a": true }))), [("type", "a"), ("type", "a"), ("oneOf", "a")]);
    }

    #[test]
    fn not_inverts_and_skips_absent() {
        let v = compile(json!({ "properties": { "a": { "not": { "type": "string" } } } }));
        assert!(v.is_valid(&json!({ "a": 1 })));
        assert!(v.is_valid(&json!({})));
        assert_eq!(keywords(&v.check(&json!({ "a": "s" }))), [("not", "a")]);
    }

    #[test]
    fn allof_keeps_every_error() {
        let v = compile(json!({ "allOf": [{ "minimum": 5 }, { "multipleOf": 2 }] }));
        assert!(v.is_valid(&json!(6)));
        assert_eq!(keywords(&v.check(&json!(3))), [("minimum", ""), ("multipleOf", "")]);
    }

    #[test]
    fn nested_combinators_roll_back_independently() {
        let v = compile(json!({
            "anyOf": [
                { "oneOf": [{ "type": "string" }, { "type": "boolean" }] },
                { "type": "number" }
            ]
        }));
        assert!(v.is_valid(&json!(true)));
        assert!(v.is_valid(&json!(1)));
        assert!(!v.is_valid(&json!(null)));
    }

    #[test]
    fn multiple_of_precision() {
        let v = compile(json!({ "multipleOf": 0.01 }));
        assert!(v.is_valid(&json!(0.07)));
        assert!(!v.is_valid(&json!(0.075)));
    }

    #[test]
    fn exclusive_bounds() {
        let v = compile(json!({ "minimum": 1, "exclusiveMinimum": true, "maximum": 3 }));
        assert!(!v.is_valid(&json!(1)));
        assert!(v.is_valid(&json!(3)));
        assert!(!v.is_valid(&json!(3.01)));
    }

    #[test]
    fn string_length_counts_code_points() {
        let v = compile(json!({ "minLength": 2, "maxLength": 2 }));
        assert!(v.is_valid(&json!("日本")));
        assert!(v.is_valid(&json!("💩💩")));
        assert!(!v.is_valid(&json!("💩")));
    }

    #[test]
    fn format_resolution() {
        let v = compile(json!({ "format": "email" }));
        assert!(v.is_valid(&json!("a@b.co")));
        assert_eq!(keywords(&v.check(&json!("nope"))), [("format", "")]);

        let schema = SchemaNode::from_value(&json!({ "format": "sku" })).unwrap();
        assert!(matches!(Validator::compile(&schema), Err(SchemaError::UnknownFormat { .. })));
        let mut registry = FormatRegistry::new();
        registry.register("sku", r"^[A-Z]{3}-\d+$").unwrap();
        let v = Validator::compile_with(&schema, &registry).unwrap();
        assert!(v.is_valid(&json!("ABC-12")));
        assert!(!v.is_valid(&json!("abc")));
    }

    #[test]
    fn invalid_pattern_fails_compile() {
        let schema = SchemaNode::from_value(&json!({ "properties": { "a": { "pattern": "(" } } })).unwrap();
        match Validator::compile(&schema) {
            Err(SchemaError::InvalidPattern { address, .. }) => assert_eq!(address, "a"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn arrays() {
        let v = compile(json!({
            "minItems": 1,
            "maxItems": 3,
            "uniqueItems": true,
            "items": { "type": "integer" }
        }));
        assert!(v.is_valid(&json!([1, 2, 3])));
        assert_eq!(keywords(&v.check(&json!([]))), [("minItems", "")]);
        assert_eq!(keywords(&v.check(&json!([1, 1.0]))), [("uniqueItems", "")]);
        assert_eq!(
            keywords(&v.check(&json!([1, "a", 2, "b"]))),
            [("maxItems", ""), ("type", "[1]"), ("type", "[3]")]
        );
    }

    #[test]
    fn unique_items_compares_structurally() {
        let v = compile(json!({ "uniqueItems": true }));
        assert!(!v.is_valid(&json!([{ "a": 1, "b": 2 }, { "b": 2, "a": 1 }])));
        assert!(v.is_valid(&json!([[1, 2], [2, 1]])));
    }

    #[test]
    fn tuples_and_additional_items() {
        let v = compile(json!({
            "items": [{ "type": "string" }, { "type": "number" }],
            "additionalItems": false
        }));
        assert!(v.is_valid(&json!(["a", 1])));
        assert!(v.is_valid(&json!(["a"])));
        assert_eq!(keywords(&v.check(&json!([1, 1, 1]))), [("type", "[0]"), ("additionalItems", "")]);

        let v = compile(json!({
            "items": [{ "type": "string" }],
            "additionalItems": { "type": "boolean" }
        }));
        assert!(v.is_valid(&json!(["a", true, false])));
        assert_eq!(keywords(&v.check(&json!(["a", true, 3]))), [("type", "[2]")]);
    }

    #[test]
    fn pattern_and_additional_properties_share_one_pass() {
        let v = compile(json!({
            "properties": { "id": { "type": "integer" } },
            "patternProperties": { "^x-": { "type": "string" } },
            "additionalProperties": false
        }));
        assert!(v.is_valid(&json!({ "id": 1, "x-a": "s" })));
        let report = v.check(&json!({ "id": 1, "x-a": 2, "other": true }));
        assert_eq!(keywords(&report), [("type", "x-a"), ("additionalProperties", "other")]);

        let key_loops = v.ops().iter().filter(|op| matches!(op, CheckOp::KeysBegin { .. })).count();
        assert_eq!(key_loops, 1);
    }

    #[test]
    fn additional_properties_schema() {
        let v = compile(json!({
            "properties": { "a": {} },
            "additionalProperties": { "type": "number" }
        }));
        assert!(v.is_valid(&json!({ "a": "anything", "b": 1 })));
        assert_eq!(keywords(&v.check(&json!({ "b": "s" }))), [("type", "b")]);
    }

    #[test]
    fn object_counts_and_dependencies() {
        let v = compile(json!({
            "minProperties": 1,
            "maxProperties": 3,
            "dependencies": {
                "card": ["billing"],
                "ship": { "required": ["address"] }
            }
        }));
        assert_eq!(keywords(&v.check(&json!({}))), [("minProperties", "")]);
        assert!(v.is_valid(&json!({ "card": 1, "billing": 2 })));
        assert_eq!(keywords(&v.check(&json!({ "card": 1 }))), [("dependencies", "")]);
        assert_eq!(keywords(&v.check(&json!({ "ship": true }))), [("required", "address")]);
        assert!(!v.is_valid(&json!({ "a": 1, "b": 2, "c": 3, "d": 4 })));
    }

    #[test]
    fn nested_addresses() {
        let v = compile(json!({
            "properties": {
                "users": {
                    "items": {
                        "required": ["name"],
                        "properties": { "tags": { "items": { "type": "string" } } }
                    }
                }
            }
        }));
        let report = v.check(&json!({ "users": [{ "name": "a" }, { "tags": ["x", 1] }] }));
        assert_eq!(keywords(&report), [("required", "users[1].name"), ("type", "users[1].tags[1]")]);
    }

    #[test]
    fn enum_uses_structural_equality() {
        let v = compile(json!({ "enum": [1, "a", { "k": [1, 2] }, null] }));
        assert!(v.is_valid(&json!(1.0)));
        assert!(v.is_valid(&json!({ "k": [1, 2] })));
        assert!(v.is_valid(&json!(null)));
        assert!(!v.is_valid(&json!({ "k": [2, 1] })));
        assert!(!v.is_valid(&json!("1")));
    }

    #[test]
    fn check_is_deterministic() {
        let v = compile(json!({
            "properties": { "a": { "type": "string" }, "b": { "anyOf": [{ "type": "null" }, { "minimum": 1 }] } },
            "additionalProperties": { "type": "boolean" }
        }));
        let x = json!({ "a": 1, "b": 0, "c": "s", "d": 4 });
        assert_eq!(v.check(&x), v.check(&x));
        assert!(!v.check(&x).valid);
    }

    #[test]
    fn deep_nesting() {
        let mut node = SchemaNode::from_value(&json!({ "type": "integer" })).unwrap();
        let mut instance = json!(1);
        for _ in 0..200 {
            let mut parent = SchemaNode::default();
            parent.properties = Some([("n".to_string(), node)].into_iter().collect());
            node = parent;
            instance = json!({ "n": instance });
        }
        let v = Validator::compile(&node).unwrap();
        assert!(v.is_valid(&instance));
        let report = v.check(&json!({ "n": { "n": "x" } }));
        assert!(report.valid, "absent deeper levels are not errors");
    }

    #[test]
    fn validator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Validator>();
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::strategies::json_value;
    use proptest::prelude::*;
    use serde_json::json;

    fn validator() -> Validator {
        let schema = json!({
            "properties": {
                "a": { "type": "string", "minLength": 2 },
                "b": { "oneOf": [{ "type": "integer" }, { "minimum": 10 }] },
                "c": { "items": { "anyOf": [{ "type": "null" }, { "multipleOf": 0.5 }] }, "uniqueItems": true }
            },
            "patternProperties": { "^x": { "not": { "type": "boolean" } } },
            "additionalProperties": { "enum": [1, "one", null] }
        });
        Validator::compile(&SchemaNode::from_value(&schema).unwrap()).unwrap()
    }

    proptest! {
        #[test]
        fn check_is_deterministic_for_any_instance(instance in json_value()) {
            let v = validator();
            let first = v.check(&instance);
            prop_assert_eq!(&first, &v.check(&instance));
            prop_assert_eq!(first.valid, first.errors.is_empty());
        }
    }
}
