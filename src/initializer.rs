//! Initializer compiler.
//!
//! Turns a [`SchemaNode`] into an [`ApplyOp`] program that merges a source
//! value into a target in place, filling in schema defaults on the way.
//! Nested target containers are created lazily and only attached to their
//! parent when something was written into them.
pub mod exec;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApplyError, SchemaError};
use crate::inference::container_kind;
use crate::schema::{DefaultValue, Items, SchemaNode, TypeName};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Run-time switches for [`Initializer::apply`]. Missing fields in a
/// deserialized document take their default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOptions {
    /// Write schema defaults for keys the source lacks.
    pub defaults: bool,
    /// `false` ignores the schema and deep-copies the whole source.
    pub filter: bool,
    /// Include nodes marked `"private": true`.
    pub private: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        ApplyOptions { defaults: true, filter: true, private: false }
    }
}

/// Which member of the current containers an instruction addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Key(String),
    Index(usize),
    /// The innermost loop's current index.
    Current,
}

#[derive(Debug, Clone)]
pub enum ApplyOp {
    /// Jump to `exit` unless private nodes are included.
    SkipPrivate { exit: usize },
    /// Write the default when the source lacks the member.
    Default { at: Selector, value: DefaultValue },
    /// Copy the source member verbatim if present.
    Assign { at: Selector },
    /// Descend into an object member. When the source member is present but
    /// not an object, copy it verbatim instead and jump to `exit`.
    EnterObject { at: Selector, exit: usize },
    /// As `EnterObject`, for arrays.
    EnterArray { at: Selector, exit: usize },
    /// Pop the frame, attaching its container if it received any writes.
    Leave,
    /// Loop over source indices `from..len`; the target's own length never
    /// widens the range.
    ItemsBegin { from: usize, exit: usize },
    Next { body: usize },
    /// Copy every source key not in `declared`.
    CopyExtraKeys { declared: Vec<String> },
    /// Copy every source index from `from` on.
    CopyExtraItems { from: usize },
}

/// A compiled apply operation. Immutable and shareable across threads.
#[derive(Debug, Clone)]
pub struct Initializer {
    root: TypeName,
    ops: Vec<ApplyOp>,
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Default)]
struct Compiler {
    ops: Vec<ApplyOp>,
}

impl Compiler {
    fn here(&self) -> usize {
        self.ops.len()
    }

    fn emit(&mut self, op: ApplyOp) -> usize {
        self.ops.push(op);
        self.ops.len() - 1
    }

    fn patch(&mut self, at: usize) {
        let here = self.here();
        match &mut self.ops[at] {
            ApplyOp::SkipPrivate { exit }
            | ApplyOp::EnterObject { exit, .. }
            | ApplyOp::EnterArray { exit, .. }
            | ApplyOp::ItemsBegin { exit, .. } => *exit = here,
            other => unreachable!("not a jump: {other:?}"),
        }
    }

    /// Members of an object container (the root or a nested frame).
    fn object_members(&mut self, node: &SchemaNode) {
        for (key, child) in node.properties.iter().flatten() {
            self.member(child, Selector::Key(key.clone()));
        }
        if node.allows_extra_properties() {
            let declared = node.properties.iter().flat_map(|p| p.keys().cloned()).collect();
            self.emit(ApplyOp::CopyExtraKeys { declared });
        }
    }

    /// Members of an array container (the root or a nested frame).
    fn array_members(&mut self, node: &SchemaNode) {
        match &node.items {
            None => {}
            Some(Items::Single(item)) => {
                let begin = self.emit(ApplyOp::ItemsBegin { from: 0, exit: 0 });
                let body = self.here();
                self.member(item, Selector::Current);
                self.emit(ApplyOp::Next { body });
                self.patch(begin);
            }
            Some(Items::Tuple(positions)) => {
                for (i, item) in positions.iter().enumerate() {
                    self.member(item, Selector::Index(i));
                }
                if node.allows_extra_items() {
                    self.emit(ApplyOp::CopyExtraItems { from: positions.len() });
                }
            }
        }
    }

    fn member(&mut self, node: &SchemaNode, at: Selector) {
        let private = node.private.then(|| self.emit(ApplyOp::SkipPrivate { exit: 0 }));

        if let Some(value) = &node.default {
            self.emit(ApplyOp::Default { at: at.clone(), value: value.clone() });
        }
        if node.is_leaf() {
            self.emit(ApplyOp::Assign { at });
        } else if node.properties.is_some() || node.allows_extra_properties() {
            let enter = self.emit(ApplyOp::EnterObject { at, exit: 0 });
            self.object_members(node);
            self.emit(ApplyOp::Leave);
            self.patch(enter);
        } else if node.items.is_some() {
            let enter = self.emit(ApplyOp::EnterArray { at, exit: 0 });
            self.array_members(node);
            self.emit(ApplyOp::Leave);
            self.patch(enter);
        }

        if let Some(at) = private {
            self.patch(at);
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

impl Initializer {
    /// Compile `schema`. The root must describe an object or an array.
    pub fn compile(schema: &SchemaNode) -> Result<Self, SchemaError> {
        let root = container_kind(schema)?;
        let mut compiler = Compiler::default();
        match root {
            TypeName::Array => compiler.array_members(schema),
            _ => compiler.object_members(schema),
        }
        log::debug!("compiled initializer: {root} root, {} instructions", compiler.ops.len());
        Ok(Initializer { root, ops: compiler.ops })
    }

    pub fn root_kind(&self) -> TypeName {
        self.root
    }

    /// The compiled program, for inspection.
    pub fn ops(&self) -> &[ApplyOp] {
        &self.ops
    }

    /// Merge `source` into `target` in place.
    ///
    /// Fails only when the root of `target` or `source` is not the container
    /// kind the schema describes; `target` is untouched in that case.
    pub fn apply(&self, target: &mut Value, source: &Value, options: &ApplyOptions) -> Result<(), ApplyError> {
        if !options.filter {
            exec::deep_merge(target, source);
            return Ok(());
        }
        self.check_root("target", target)?;
        self.check_root("source", source)?;
        exec::run(&self.ops, target, source, options);
        Ok(())
    }

    fn check_root(&self, side: &'static str, value: &Value) -> Result<(), ApplyError> {
        if self.root.matches(value) {
            Ok(())
        } else {
            Err(ApplyError::RootTypeMismatch { side, expected: self.root, found: TypeName::describe(value) })
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
