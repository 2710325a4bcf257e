//! Runtime value model: a closed tagged union.
//!
//! Every value the machine touches is one of these variants. There is no
//! dynamic downcasting anywhere downstream; consumers pattern-match
//! exhaustively, and a mismatch is visible in review rather than a silent
//! runtime coercion.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::state::{StateAction, StateBinding};

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// The absent value.
    Unit,
    /// Signed 64-bit integer.
    Int(i64),
    /// IEEE-754 double.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// Immutable shared string.
    Str(Rc<String>),
    /// Opaque handle produced only by the capability bridge.
    Native(NativeHandle),
    /// Instance of a script-declared record type.
    Record {
        type_name: String,
        fields: IndexMap<String, Value>,
    },
}

impl Value {
    /// Convenience constructor for string values.
    pub fn string(s: impl Into<String>) -> Value {
        Value::Str(Rc::new(s.into()))
    }

    /// The receiver-kind tag used for capability lookups: the primitive
    /// variant name, a native handle's concrete type name, or a record's
    /// declared type name.
    pub fn kind_name(&self) -> &str {
        match self {
            Value::Unit => "Unit",
            Value::Int(_) => "Int",
            Value::Double(_) => "Double",
            Value::Bool(_) => "Bool",
            Value::Str(_) => "String",
            Value::Native(handle) => handle.type_name(),
            Value::Record { type_name, .. } => type_name,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    /// Numeric view, promoting `Int` to `Double`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Int(a), Value::Double(b)) => (*a as f64) == *b,
            (Value::Double(a), Value::Int(b)) => *a == (*b as f64),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(&a.0, &b.0),
            (
                Value::Record {
                    type_name: n1,
                    fields: f1,
                },
                Value::Record {
                    type_name: n2,
                    fields: f2,
                },
            ) => n1 == n2 && f1 == f2,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "nil"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Native(handle) => write!(f, "{}", handle),
            Value::Record { type_name, fields } => {
                write!(f, "{}(", type_name)?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// An opaque reference-counted native object. The compiler can neither
/// construct nor introspect one; only the bridge's constructors and the
/// reactive opcodes produce them.
#[derive(Debug, Clone)]
pub struct NativeHandle(pub(crate) Rc<NativeObject>);

impl NativeHandle {
    pub(crate) fn new(object: NativeObject) -> Self {
        Self(Rc::new(object))
    }

    /// The concrete type name, used as the receiver kind for capability
    /// checks.
    pub fn type_name(&self) -> &str {
        match &*self.0 {
            NativeObject::ClosedRange { .. } => "ClosedRange",
            NativeObject::Widget(node) => &node.kind,
            NativeObject::Binding(_) => "Binding",
            NativeObject::Action(_) => "Action",
        }
    }

    pub fn object(&self) -> &NativeObject {
        &self.0
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            NativeObject::ClosedRange { lower, upper } => write!(f, "{}...{}", lower, upper),
            NativeObject::Widget(node) => write!(f, "<{}>", node.kind),
            NativeObject::Binding(binding) => write!(f, "<binding {}>", binding.name),
            NativeObject::Action(action) => write!(f, "<action {}>", action.target),
        }
    }
}

/// Payloads behind a [`NativeHandle`]. The embedder's renderer consumes
/// these; the machine only carries them.
#[derive(Debug, Clone)]
pub enum NativeObject {
    /// Inclusive integer range.
    ClosedRange { lower: i64, upper: i64 },
    /// A node of the widget tree handed to the external renderer.
    Widget(WidgetNode),
    /// Getter/setter pair bound to a reactive state name.
    Binding(StateBinding),
    /// Zero-argument callback writing a precompiled literal to a state name.
    Action(StateAction),
}

/// A widget-tree node: kind plus the constructor arguments and (for
/// containers) the ordered children.
#[derive(Debug, Clone)]
pub struct WidgetNode {
    pub kind: String,
    pub args: Vec<Value>,
    pub children: Vec<Value>,
}

impl WidgetNode {
    pub fn new(kind: impl Into<String>, args: Vec<Value>, children: Vec<Value>) -> Self {
        Self {
            kind: kind.into(),
            args,
            children,
        }
    }
}
