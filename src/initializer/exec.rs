//! Stack machine for [`ApplyOp`] programs.
//!
//! Each frame owns the target container it is filling. A reused container is
//! taken out of its parent on entry and put back on exit, so there is never
//! more than one live mutable path into the caller's target.
use std::mem;

use serde_json::{Map, Value};

use super::{ApplyOp, ApplyOptions, Selector};

#[derive(Debug, Clone, Copy)]
enum Slot<'a> {
    Key(&'a str),
    Index(usize),
}

struct Frame<'a> {
    target: Value,
    source: Option<&'a Value>,
    mutations: usize,
    /// Where this frame's container lives in the parent; `None` at the root.
    slot: Option<Slot<'a>>,
    /// The container was taken from the parent and must go back.
    taken: bool,
}

struct Loop {
    idx: usize,
    len: usize,
}

struct Machine<'a> {
    root: Frame<'a>,
    frames: Vec<Frame<'a>>,
    loops: Vec<Loop>,
    options: &'a ApplyOptions,
}

pub fn run<'a>(ops: &'a [ApplyOp], target: &mut Value, source: &'a Value, options: &'a ApplyOptions) {
    let root = Frame { target: mem::take(target), source: Some(source), mutations: 0, slot: None, taken: false };
    let mut m = Machine { root, frames: Vec::new(), loops: Vec::new(), options };
    let mut pc = 0;
    while pc < ops.len() {
        pc = m.step(&ops[pc], pc);
    }
    debug_assert!(m.frames.is_empty() && m.loops.is_empty());
    *target = m.root.target;
}

impl<'a> Machine<'a> {
    fn step(&mut self, op: &'a ApplyOp, pc: usize) -> usize {
        match op {
            ApplyOp::SkipPrivate { exit } => {
                if !self.options.private {
                    return *exit;
                }
            }
            ApplyOp::Default { at, value } => {
                if self.options.defaults {
                    let slot = self.slot(at);
                    let frame = self.top();
                    if frame.source_get(slot).is_none() {
                        frame.set(slot, value.produce());
                        frame.mutations += 1;
                    }
                }
            }
            ApplyOp::Assign { at } => {
                let slot = self.slot(at);
                self.assign(slot);
            }
            ApplyOp::EnterObject { at, exit } => {
                let slot = self.slot(at);
                if !self.enter(slot, Value::is_object, || Value::Object(Map::new())) {
                    return *exit;
                }
            }
            ApplyOp::EnterArray { at, exit } => {
                let slot = self.slot(at);
                if !self.enter(slot, Value::is_array, || Value::Array(Vec::new())) {
                    return *exit;
                }
            }
            ApplyOp::Leave => self.leave(),
            ApplyOp::ItemsBegin { from, exit } => {
                let len = self.top().source.and_then(Value::as_array).map_or(0, Vec::len);
                if *from >= len {
                    return *exit;
                }
                self.loops.push(Loop { idx: *from, len });
            }
            ApplyOp::Next { body } => {
                if let Some(lp) = self.loops.last_mut() {
                    lp.idx += 1;
                    if lp.idx < lp.len {
                        return *body;
                    }
                }
                self.loops.pop();
            }
            ApplyOp::CopyExtraKeys { declared } => {
                let frame = self.top();
                if let Some(Value::Object(src)) = frame.source {
                    for (key, value) in src.iter().filter(|(k, _)| !declared.contains(k)) {
                        frame.set(Slot::Key(key), value.clone());
                        frame.mutations += 1;
                    }
                }
            }
            ApplyOp::CopyExtraItems { from } => {
                let frame = self.top();
                if let Some(Value::Array(src)) = frame.source {
                    for (i, value) in src.iter().enumerate().skip(*from) {
                        frame.set(Slot::Index(i), value.clone());
                        frame.mutations += 1;
                    }
                }
            }
        }
        pc + 1
    }

    fn top(&mut self) -> &mut Frame<'a> {
        self.frames.last_mut().unwrap_or(&mut self.root)
    }

    fn slot(&self, at: &'a Selector) -> Slot<'a> {
        match at {
            Selector::Key(key) => Slot::Key(key),
            Selector::Index(i) => Slot::Index(*i),
            Selector::Current => Slot::Index(self.loops.last().map_or(0, |lp| lp.idx)),
        }
    }

    /// Copy the raw source member, if the source owns it.
    fn assign(&mut self, slot: Slot<'a>) {
        let frame = self.top();
        if let Some(value) = frame.source_get(slot) {
            frame.set(slot, value.clone());
            frame.mutations += 1;
        }
    }

    /// Push a frame for `slot` when the source member is absent or of the
    /// container kind `is_kind` accepts. Otherwise fall back to a raw copy
    /// and report `false`.
    fn enter(&mut self, slot: Slot<'a>, is_kind: fn(&Value) -> bool, fresh: fn() -> Value) -> bool {
        let frame = self.top();
        let source = frame.source_get(slot);
        if source.is_some_and(|s| !is_kind(s)) {
            self.assign(slot);
            return false;
        }
        let (target, taken) = match frame.get_mut(slot) {
            Some(existing) if is_kind(existing) => (mem::take(existing), true),
            _ => (fresh(), false),
        };
        log::trace!("enter {slot:?} (reused: {taken})");
        self.frames.push(Frame { target, source, mutations: 0, slot: Some(slot), taken });
        true
    }

    /// Pop a frame; attach its container iff it received writes, or put a
    /// reused container back where it came from.
    fn leave(&mut self) {
        let Some(child) = self.frames.pop() else { return };
        let Some(slot) = child.slot else { return };
        let parent = self.top();
        if child.mutations > 0 {
            parent.set(slot, child.target);
            parent.mutations += 1;
        } else if child.taken {
            parent.set(slot, child.target);
        }
    }
}

impl<'a> Frame<'a> {
    fn source_get(&self, slot: Slot<'_>) -> Option<&'a Value> {
        let source = self.source?;
        match slot {
            Slot::Key(key) => source.as_object()?.get(key),
            Slot::Index(i) => source.as_array()?.get(i),
        }
    }

    fn get_mut(&mut self, slot: Slot<'_>) -> Option<&mut Value> {
        match (&mut self.target, slot) {
            (Value::Object(map), Slot::Key(key)) => map.get_mut(key),
            (Value::Array(xs), Slot::Index(i)) => xs.get_mut(i),
            _ => None,
        }
    }

    /// Write a member; arrays are padded with `null` up to `slot`.
    fn set(&mut self, slot: Slot<'_>, value: Value) {
        match (&mut self.target, slot) {
            (Value::Object(map), Slot::Key(key)) => {
                map.insert(key.to_string(), value);
            }
            (Value::Object(map), Slot::Index(i)) => {
                map.insert(i.to_string(), value);
            }
            (Value::Array(xs), Slot::Index(i)) => {
                if i >= xs.len() {
                    xs.resize(i + 1, Value::Null);
                }
                xs[i] = value;
            }
            (target, slot) => log::trace!("dropping write to {slot:?} on {target:?}"),
        }
    }
}

/// Recursive merge used when the schema filter is off: objects merge
/// key-wise, anything else replaces.
pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        dst.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_replaces_the_rest() {
        let mut target = json!({ "a": { "x": 1, "y": [1, 2, 3] }, "b": "keep" });
        deep_merge(&mut target, &json!({ "a": { "y": [9], "z": null }, "c": 3 }));
        assert_eq!(target, json!({ "a": { "x": 1, "y": [9], "z": null }, "b": "keep", "c": 3 }));
    }

    #[test]
    fn set_pads_arrays() {
        let mut frame = Frame { target: json!([1]), source: None, mutations: 0, slot: None, taken: false };
        frame.set(Slot::Index(3), json!(4));
        assert_eq!(frame.target, json!([1, null, null, 4]));
    }
}
