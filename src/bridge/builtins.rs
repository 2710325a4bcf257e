//! Built-in dispatch tables behind the capability bridge.
//!
//! These run only after the allow-list check has passed. Operand shapes
//! are validated permissively: a built-in handed the wrong variants
//! degrades to nil rather than failing the run.

use std::rc::Rc;

use crate::error::RuntimeError;
use crate::state::LogSink;
use crate::value::{NativeHandle, NativeObject, Value, WidgetNode};

/// Every name the built-in constructor table understands.
pub const BUILTIN_TYPES: &[&str] = &[
    "ClosedRange",
    "Text",
    "Button",
    "Column",
    "Row",
    "Spacer",
    "Slider",
    "Toggle",
];

/// Container constructs whose trailing block compiles to ordered children.
pub const CONTAINER_TYPES: &[&str] = &["Column", "Row"];

/// Every (receiver kind, method-or-property name) pair the per-kind tables
/// understand.
pub const BUILTIN_METHODS: &[(&str, &str)] = &[
    ("String", "uppercased"),
    ("String", "lowercased"),
    ("String", "contains"),
    ("String", "hasPrefix"),
    ("String", "count"),
    ("ClosedRange", "contains"),
    ("ClosedRange", "lowerBound"),
    ("ClosedRange", "upperBound"),
    ("Double", "rounded"),
    ("Int", "toDouble"),
];

/// Every name the free-function table understands.
pub const BUILTIN_FUNCTIONS: &[&str] = &["log", "abs", "min", "max"];

/// Whether a construct name is a child-collecting container.
pub fn is_container(name: &str) -> bool {
    CONTAINER_TYPES.contains(&name)
}

/// Construct a built-in value. `None` means the name is not in the table
/// (the caller then consults the program's record type table).
pub fn construct(name: &str, args: Vec<Value>) -> Option<Result<Value, RuntimeError>> {
    let value = match name {
        "ClosedRange" => match (args.first(), args.get(1)) {
            (Some(Value::Int(lower)), Some(Value::Int(upper))) => {
                native(NativeObject::ClosedRange {
                    lower: *lower,
                    upper: *upper,
                })
            }
            _ => Value::Unit,
        },
        "Column" | "Row" => native(NativeObject::Widget(WidgetNode::new(name, vec![], args))),
        "Text" | "Button" | "Spacer" | "Slider" | "Toggle" => {
            native(NativeObject::Widget(WidgetNode::new(name, args, vec![])))
        }
        _ => return None,
    };
    Some(Ok(value))
}

/// Invoke a built-in method for the given receiver kind. `None` means the
/// (kind, name) pair has no entry.
pub fn call_method(
    kind: &str,
    name: &str,
    receiver: &Value,
    args: &[Value],
) -> Option<Result<Value, RuntimeError>> {
    let value = match (kind, name) {
        ("String", "uppercased") => match receiver {
            Value::Str(s) => Value::Str(Rc::new(s.to_uppercase())),
            _ => Value::Unit,
        },
        ("String", "lowercased") => match receiver {
            Value::Str(s) => Value::Str(Rc::new(s.to_lowercase())),
            _ => Value::Unit,
        },
        ("String", "contains") => match (receiver, args.first()) {
            (Value::Str(s), Some(Value::Str(needle))) => Value::Bool(s.contains(needle.as_str())),
            _ => Value::Bool(false),
        },
        ("String", "hasPrefix") => match (receiver, args.first()) {
            (Value::Str(s), Some(Value::Str(prefix))) => {
                Value::Bool(s.starts_with(prefix.as_str()))
            }
            _ => Value::Bool(false),
        },
        ("ClosedRange", "contains") => match (range_of(receiver), args.first()) {
            (Some((lower, upper)), Some(arg)) => match arg.as_f64() {
                Some(x) => Value::Bool(lower as f64 <= x && x <= upper as f64),
                None => Value::Bool(false),
            },
            _ => Value::Bool(false),
        },
        ("Double", "rounded") => match receiver {
            Value::Double(n) => Value::Double(n.round()),
            _ => Value::Unit,
        },
        ("Int", "toDouble") => match receiver {
            Value::Int(n) => Value::Double(*n as f64),
            _ => Value::Unit,
        },
        _ => return None,
    };
    Some(Ok(value))
}

/// Read a synthetic property of a non-record receiver. `None` means the
/// (kind, name) pair has no entry.
pub fn property(kind: &str, name: &str, receiver: &Value) -> Option<Value> {
    let value = match (kind, name) {
        ("String", "count") => match receiver {
            Value::Str(s) => Value::Int(s.chars().count() as i64),
            _ => return None,
        },
        ("ClosedRange", "lowerBound") => Value::Int(range_of(receiver)?.0),
        ("ClosedRange", "upperBound") => Value::Int(range_of(receiver)?.1),
        _ => return None,
    };
    Some(value)
}

/// Invoke a built-in free function. `None` means the name has no entry.
pub fn call_function(
    name: &str,
    args: &[Value],
    logger: Option<&dyn LogSink>,
) -> Option<Result<Value, RuntimeError>> {
    let value = match name {
        "log" => {
            let line = args
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            if let Some(sink) = logger {
                sink.log(&line);
            }
            Value::Unit
        }
        "abs" => match args.first() {
            Some(Value::Int(n)) => Value::Int(n.wrapping_abs()),
            Some(Value::Double(n)) => Value::Double(n.abs()),
            _ => Value::Unit,
        },
        "min" => numeric_pair(args, f64::min, i64::min),
        "max" => numeric_pair(args, f64::max, i64::max),
        _ => return None,
    };
    Some(Ok(value))
}

fn numeric_pair(args: &[Value], df: fn(f64, f64) -> f64, di: fn(i64, i64) -> i64) -> Value {
    match (args.first(), args.get(1)) {
        (Some(Value::Int(a)), Some(Value::Int(b))) => Value::Int(di(*a, *b)),
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Value::Double(df(x, y)),
            _ => Value::Unit,
        },
        _ => Value::Unit,
    }
}

fn range_of(value: &Value) -> Option<(i64, i64)> {
    match value {
        Value::Native(handle) => match handle.object() {
            NativeObject::ClosedRange { lower, upper } => Some((*lower, *upper)),
            _ => None,
        },
        _ => None,
    }
}

fn native(object: NativeObject) -> Value {
    Value::Native(NativeHandle::new(object))
}
