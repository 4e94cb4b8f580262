//! Per-request variable store with dotted-path addressing and lifecycle
//! notifications.
//!
//! The store is a `serde_json::Value` tree (the tagged scalar/array/map
//! union) addressed by paths such as `request.path`, `message.headers`, or
//! `items[2].name`.  Rules:
//!
//! - **get** is undefined-on-get: a missing intermediate path yields `None`,
//!   never an error.
//! - **set** is create-on-set: missing intermediate objects (or array slots)
//!   are created on the way down.
//! - Values are owned by the tree; storing an object stores a deep copy.
//!
//! A context is created at request start, owned exclusively by that request,
//! and discarded at request end — it is never shared across requests, so no
//! locking is involved.
//!
//! Named lifecycle events ([`POST_FLOW`], [`FINISH`]) let response-shaping
//! policies attach observers that run after the assembly reaches its end,
//! on success and failure alike.  Each event fires at most once per request:
//! [`notify`](Context::notify) drains the observer list it runs.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Fired by the assembly engine when the top-level flow reaches its end.
pub const POST_FLOW: &str = "post-flow";

/// Fired by the request pipeline after response shaping, before
/// serialization.
pub const FINISH: &str = "FINISH";

type Observer = Box<dyn FnMut(&mut Context) + Send>;

// ─────────────────────────────────────────────────────────────────────────────
// Path parsing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seg {
    Key(String),
    Index(usize),
}

/// Parse `a.b[0].c` into segments.  Returns `None` on malformed paths
/// (empty segment, unterminated bracket, non-numeric index).
fn parse_path(path: &str) -> Option<Vec<Seg>> {
    let mut segs = Vec::new();
    for piece in path.split('.') {
        let (name, mut rest) = match piece.find('[') {
            Some(pos) => (&piece[..pos], &piece[pos..]),
            None => (piece, ""),
        };
        if name.is_empty() {
            return None;
        }
        segs.push(Seg::Key(name.to_string()));
        while !rest.is_empty() {
            let close = rest.find(']')?;
            let idx: usize = rest.get(1..close)?.parse().ok()?;
            segs.push(Seg::Index(idx));
            rest = &rest[close + 1..];
        }
    }
    if segs.is_empty() { None } else { Some(segs) }
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable, path-addressable key/value store scoped to one request.
pub struct Context {
    root: Value,
    observers: HashMap<String, Vec<Observer>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create an empty context (root is an empty object).
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
            observers: HashMap::new(),
        }
    }

    /// Borrow the whole value tree (used at serialization time).
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Read the value at `path`.  Missing or malformed paths yield `None`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segs = parse_path(path)?;
        let mut cur = &self.root;
        for seg in &segs {
            cur = match seg {
                Seg::Key(k) => cur.as_object()?.get(k)?,
                Seg::Index(i) => cur.as_array()?.get(*i)?,
            };
        }
        Some(cur)
    }

    /// Write `value` at `path`, creating missing intermediate objects and
    /// padding arrays with `null` as needed.  An existing non-container in
    /// the middle of the path is replaced by the container the next segment
    /// requires.  Malformed paths are ignored.
    pub fn set(&mut self, path: &str, value: Value) {
        let Some(segs) = parse_path(path) else {
            return;
        };
        let mut cur = &mut self.root;
        for window in 0..segs.len() {
            let last = window == segs.len() - 1;
            match &segs[window] {
                Seg::Key(k) => {
                    if !cur.is_object() {
                        *cur = Value::Object(Map::new());
                    }
                    let map = cur.as_object_mut().expect("object ensured above");
                    if last {
                        map.insert(k.clone(), value);
                        return;
                    }
                    cur = map.entry(k.clone()).or_insert(Value::Null);
                }
                Seg::Index(i) => {
                    if !cur.is_array() {
                        *cur = Value::Array(Vec::new());
                    }
                    let arr = cur.as_array_mut().expect("array ensured above");
                    if arr.len() <= *i {
                        arr.resize(*i + 1, Value::Null);
                    }
                    if last {
                        arr[*i] = value;
                        return;
                    }
                    cur = &mut arr[*i];
                }
            }
        }
    }

    /// Remove the value at `path`.  Returns whether something was removed.
    /// Removing an array index shifts later elements down.
    pub fn delete(&mut self, path: &str) -> bool {
        let Some(segs) = parse_path(path) else {
            return false;
        };
        let (last, parents) = segs.split_last().expect("parse_path never yields empty");
        let mut cur = &mut self.root;
        for seg in parents {
            let next = match seg {
                Seg::Key(k) => cur.as_object_mut().and_then(|m| m.get_mut(k)),
                Seg::Index(i) => cur.as_array_mut().and_then(|a| a.get_mut(*i)),
            };
            match next {
                Some(v) => cur = v,
                None => return false,
            }
        }
        match last {
            Seg::Key(k) => cur
                .as_object_mut()
                .is_some_and(|m| m.remove(k).is_some()),
            Seg::Index(i) => match cur.as_array_mut() {
                Some(a) if *i < a.len() => {
                    a.remove(*i);
                    true
                }
                _ => false,
            },
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle notifications
    // ─────────────────────────────────────────────────────────────────────────

    /// Register an observer for a named lifecycle event.
    pub fn subscribe(&mut self, event: &str, observer: impl FnMut(&mut Context) + Send + 'static) {
        self.observers
            .entry(event.to_string())
            .or_default()
            .push(Box::new(observer));
    }

    /// Raise a named lifecycle event.  Observers run in subscription order
    /// and are consumed: a second `notify` for the same event is a no-op,
    /// which gives the exactly-once guarantee callers rely on.
    pub fn notify(&mut self, event: &str) {
        let observers = self.observers.remove(event).unwrap_or_default();
        for mut observer in observers {
            observer(self);
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.root)
            .field(
                "observed_events",
                &self.observers.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
