//! Capability bridge: the allow-list gate between bytecode and native code.
//!
//! The machine consults a [`BridgeDescriptor`] before every type
//! construction, method call, free-function call, and synthetic property
//! access. The descriptor is plain immutable data built by the embedder;
//! no in-language operation can reach or mutate it, which is what makes it
//! a security boundary rather than a convention.

pub mod builtins;

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

/// Immutable allow-list consulted by the machine.
///
/// Policy is deny-by-default: anything not named here raises
/// `BridgeNotAllowed` at the call site.
#[derive(Debug, Clone, Default)]
pub struct BridgeDescriptor {
    allowed_types: HashSet<String>,
    allowed_methods: HashMap<String, HashSet<String>>,
    allowed_functions: HashSet<String>,
}

impl BridgeDescriptor {
    /// An empty descriptor: every native operation is forbidden.
    pub fn new() -> Self {
        Self::default()
    }

    /// A descriptor covering every built-in constructor, method, synthetic
    /// property, and function. Script-declared record types are not
    /// included; embedders allow those by name.
    pub fn permissive() -> Self {
        PERMISSIVE.clone()
    }

    /// Allow constructing the named type.
    pub fn with_type(mut self, name: impl Into<String>) -> Self {
        self.allowed_types.insert(name.into());
        self
    }

    /// Allow calling `method` (or reading the synthetic property of that
    /// name) on receivers of `kind`.
    pub fn with_method(mut self, kind: impl Into<String>, method: impl Into<String>) -> Self {
        self.allowed_methods
            .entry(kind.into())
            .or_default()
            .insert(method.into());
        self
    }

    /// Allow calling the named free function.
    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.allowed_functions.insert(name.into());
        self
    }

    pub fn allows_type(&self, name: &str) -> bool {
        self.allowed_types.contains(name)
    }

    pub fn allows_method(&self, kind: &str, method: &str) -> bool {
        self.allowed_methods
            .get(kind)
            .is_some_and(|methods| methods.contains(method))
    }

    pub fn allows_function(&self, name: &str) -> bool {
        self.allowed_functions.contains(name)
    }
}

lazy_static! {
    static ref PERMISSIVE: BridgeDescriptor = {
        let mut descriptor = BridgeDescriptor::new();
        for name in builtins::BUILTIN_TYPES {
            descriptor = descriptor.with_type(*name);
        }
        for (kind, method) in builtins::BUILTIN_METHODS {
            descriptor = descriptor.with_method(*kind, *method);
        }
        for name in builtins::BUILTIN_FUNCTIONS {
            descriptor = descriptor.with_function(*name);
        }
        descriptor
    };
}
