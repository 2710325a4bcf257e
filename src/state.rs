//! Reactive collaborators injected by the embedder.
//!
//! The machine itself only ever reads state (`LoadState`). Writes happen
//! when the embedder fires a binding or action handle it received from a
//! run, so every mutation stays under the embedder's control.

use std::cell::RefCell;

use indexmap::IndexMap;

use crate::value::Value;

/// External key-value store for reactive state, keyed by declared name.
pub trait StateStore {
    fn get(&self, name: &str) -> Option<Value>;
    fn set(&self, name: &str, value: Value);
}

/// Destination for the script-visible `log` function.
pub trait LogSink {
    fn log(&self, message: &str);
}

/// In-memory `StateStore`, insertion-ordered for stable inspection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<IndexMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated from compiled state defaults.
    pub fn seeded(defaults: &IndexMap<String, Value>) -> Self {
        Self {
            values: RefCell::new(defaults.clone()),
        }
    }

    /// Copy of the current contents, in insertion order.
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.values.borrow().clone()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.borrow().get(name).cloned()
    }

    fn set(&self, name: &str, value: Value) {
        self.values.borrow_mut().insert(name.to_string(), value);
    }
}

/// Log sink that prints each line to stdout.
#[derive(Debug, Default)]
pub struct StdoutLogger;

impl LogSink for StdoutLogger {
    fn log(&self, message: &str) {
        println!("{}", message);
    }
}

/// Log sink that keeps every line, for embedder consoles and tests.
#[derive(Debug, Default)]
pub struct CollectingLogger {
    messages: RefCell<Vec<String>>,
}

impl CollectingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl LogSink for CollectingLogger {
    fn log(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

/// Getter/setter pair bound to one state name, produced by `PushBinding`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateBinding {
    pub name: String,
}

impl StateBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn get(&self, store: &dyn StateStore) -> Value {
        store.get(&self.name).unwrap_or(Value::Unit)
    }

    pub fn set(&self, store: &dyn StateStore, value: Value) {
        store.set(&self.name, value);
    }
}

/// A precompiled single assignment: writing `value` to state `target`.
/// Doubles as the action-pool descriptor and the runtime handle payload;
/// the renderer invokes it through [`StateAction::fire`].
#[derive(Debug, Clone, PartialEq)]
pub struct StateAction {
    pub target: String,
    pub value: Value,
}

impl StateAction {
    pub fn new(target: impl Into<String>, value: Value) -> Self {
        Self {
            target: target.into(),
            value,
        }
    }

    pub fn fire(&self, store: &dyn StateStore) {
        store.set(&self.target, self.value.clone());
    }
}
