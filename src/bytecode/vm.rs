//! Stack-based virtual machine executing compiled programs.
//!
//! The machine owns nothing beyond a single run: program, bridge, state
//! store, and log sink are all borrowed from the embedder. Every native
//! operation passes through the capability bridge before any dispatch
//! table is consulted.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::bridge::{builtins, BridgeDescriptor};
use crate::bytecode::chunk::CompiledProgram;
use crate::bytecode::instruction::Op;
use crate::error::RuntimeError;
use crate::state::{LogSink, StateBinding, StateStore};
use crate::value::{NativeHandle, NativeObject, Value};

/// Result type for machine operations.
pub type VmResult<T> = Result<T, RuntimeError>;

/// A call frame: enough to restore the caller on return.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Where execution resumes after the return.
    pub return_pc: usize,
    /// Operand-stack depth to restore.
    pub stack_base: usize,
    /// Locals-stack depth to restore.
    pub locals_base: usize,
}

/// The virtual machine. One instance per run; create a fresh one to run
/// the same program again concurrently.
pub struct Vm<'r> {
    program: &'r CompiledProgram,
    bridge: &'r BridgeDescriptor,
    state: Option<&'r dyn StateStore>,
    logger: Option<&'r dyn LogSink>,
    /// String pool pre-wrapped for cheap pushes.
    strings: Vec<Rc<String>>,
    pc: usize,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    /// Per-frame local slot arrays; the first entry belongs to top level.
    locals: Vec<Vec<Value>>,
}

impl<'r> Vm<'r> {
    pub fn new(program: &'r CompiledProgram, bridge: &'r BridgeDescriptor) -> Self {
        Self {
            program,
            bridge,
            state: None,
            logger: None,
            strings: program.strings.iter().cloned().map(Rc::new).collect(),
            pc: 0,
            stack: Vec::new(),
            frames: Vec::new(),
            locals: Vec::new(),
        }
    }

    /// Attach an external state store for `LoadState` and the reactive
    /// handles.
    pub fn with_state(mut self, store: &'r dyn StateStore) -> Self {
        self.state = Some(store);
        self
    }

    /// Attach a sink for the script-visible `log` function.
    pub fn with_logger(mut self, logger: &'r dyn LogSink) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Execute the program to completion. The result is the value left on
    /// top of the operand stack, or nil when the stack is empty.
    pub fn run(&mut self) -> VmResult<Value> {
        self.pc = 0;
        self.stack.clear();
        self.frames.clear();
        self.locals.clear();
        self.locals.push(Vec::new());

        let end = self.program.chunk.len();
        while self.pc < end {
            let byte = self
                .program
                .chunk
                .read_u8(self.pc)
                .ok_or(RuntimeError::InvalidSymbol(self.pc as i64))?;
            self.pc += 1;
            let op =
                Op::from_u8(byte).ok_or(RuntimeError::InvalidSymbol(byte as i64))?;
            self.execute(op)?;
        }

        Ok(self.stack.pop().unwrap_or(Value::Unit))
    }

    fn execute(&mut self, op: Op) -> VmResult<()> {
        match op {
            Op::PushInt => {
                let value = self.read_i64()?;
                self.push(Value::Int(value));
            }

            Op::PushBool => {
                let byte = self.read_operand_u8()?;
                self.push(Value::Bool(byte != 0));
            }

            Op::PushDouble => {
                let value = self.read_f64()?;
                self.push(Value::Double(value));
            }

            Op::PushString => {
                let index = self.read_i64()?;
                let string = usize::try_from(index)
                    .ok()
                    .and_then(|i| self.strings.get(i))
                    .ok_or(RuntimeError::InvalidStringIndex(index))?;
                self.push(Value::Str(string.clone()));
            }

            Op::PushNil => self.push(Value::Unit),

            Op::Add => self.binary_op(add_values)?,
            Op::Subtract => self.binary_op(subtract_values)?,
            Op::Multiply => self.binary_op(multiply_values)?,
            Op::Divide => self.binary_op(divide_values)?,
            Op::LessThan => self.binary_op(less_than_values)?,

            Op::Equal => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(a == b));
            }

            Op::Coalesce => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(if a.is_unit() { b } else { a });
            }

            Op::Jump => {
                let offset = self.read_i64()?;
                self.pc = (self.pc as i64 + offset) as usize;
            }

            Op::JumpIfFalse => {
                let offset = self.read_i64()?;
                // A non-bool condition is treated exactly like an empty
                // stack; there is no separate mismatch error kind.
                match self.pop()? {
                    Value::Bool(condition) => {
                        if !condition {
                            self.pc = (self.pc as i64 + offset) as usize;
                        }
                    }
                    _ => return Err(RuntimeError::StackUnderflow),
                }
            }

            Op::LoadLocal => {
                let slot = self.read_i64()?;
                let frame = self.locals.last().ok_or(RuntimeError::StackUnderflow)?;
                let value = usize::try_from(slot)
                    .ok()
                    .and_then(|s| frame.get(s))
                    .ok_or(RuntimeError::InvalidLocalSlot(slot))?
                    .clone();
                self.push(value);
            }

            Op::StoreLocal => {
                let slot = self.read_i64()?;
                let value = self.pop()?;
                let index =
                    usize::try_from(slot).map_err(|_| RuntimeError::InvalidLocalSlot(slot))?;
                let frame = self.locals.last_mut().ok_or(RuntimeError::StackUnderflow)?;
                if index >= frame.len() {
                    frame.resize(index + 1, Value::Unit);
                }
                frame[index] = value;
            }

            Op::LoadState => {
                let symbol = self.read_i64()?;
                let name = self.program.symbol(symbol)?;
                let value = self
                    .state
                    .and_then(|store| store.get(name))
                    .or_else(|| self.program.state_defaults.get(name).cloned())
                    .unwrap_or(Value::Unit);
                self.push(value);
            }

            Op::PushBinding => {
                let symbol = self.read_i64()?;
                let name = self.program.symbol(symbol)?;
                let handle = NativeHandle::new(NativeObject::Binding(StateBinding::new(name)));
                self.push(Value::Native(handle));
            }

            Op::PushAction => {
                let index = self.read_i64()?;
                let action = usize::try_from(index)
                    .ok()
                    .and_then(|i| self.program.actions.get(i))
                    .ok_or(RuntimeError::InvalidSymbol(index))?;
                let handle = NativeHandle::new(NativeObject::Action(action.clone()));
                self.push(Value::Native(handle));
            }

            Op::CallMethod => {
                let symbol = self.read_i64()?;
                let argc = self.read_i64()?;
                let program = self.program;
                let name = program.symbol(symbol)?;
                let args = self.pop_args(argc)?;
                let receiver = self.pop()?;

                let kind = receiver.kind_name().to_string();
                if !self.bridge.allows_method(&kind, name) {
                    return Err(RuntimeError::BridgeNotAllowed(name.to_string()));
                }

                // A record method naming a field is a field read.
                if let Value::Record { fields, .. } = &receiver {
                    if let Some(value) = fields.get(name) {
                        let value = value.clone();
                        self.push(value);
                        return Ok(());
                    }
                }

                match builtins::call_method(&kind, name, &receiver, &args) {
                    Some(result) => {
                        let value = result?;
                        self.push(value);
                    }
                    None => return Err(RuntimeError::InvalidReturnValue),
                }
            }

            Op::CallFunction => {
                let symbol = self.read_i64()?;
                let argc = self.read_i64()?;
                let program = self.program;
                let name = program.symbol(symbol)?;
                let args = self.pop_args(argc)?;

                if !self.bridge.allows_function(name) {
                    return Err(RuntimeError::BridgeNotAllowed(name.to_string()));
                }

                match builtins::call_function(name, &args, self.logger) {
                    Some(result) => {
                        let value = result?;
                        self.push(value);
                    }
                    None => return Err(RuntimeError::InvalidReturnValue),
                }
            }

            Op::ConstructType => {
                let symbol = self.read_i64()?;
                let argc = self.read_i64()?;
                let program = self.program;
                let name = program.symbol(symbol)?;
                let args = self.pop_args(argc)?;

                if !self.bridge.allows_type(name) {
                    return Err(RuntimeError::BridgeNotAllowed(name.to_string()));
                }

                if builtins::BUILTIN_TYPES.contains(&name) {
                    match builtins::construct(name, args) {
                        Some(result) => {
                            let value = result?;
                            self.push(value);
                        }
                        None => return Err(RuntimeError::InvalidSymbol(symbol)),
                    }
                } else if let Some(shape) = program.record_shape(name) {
                    // Fields are positional: declaration order defines the
                    // constructor argument order.
                    let mut fields = IndexMap::new();
                    for (i, field) in shape.fields.iter().enumerate() {
                        fields.insert(
                            field.clone(),
                            args.get(i).cloned().unwrap_or(Value::Unit),
                        );
                    }
                    self.push(Value::Record {
                        type_name: shape.name.clone(),
                        fields,
                    });
                } else {
                    return Err(RuntimeError::InvalidSymbol(symbol));
                }
            }

            Op::GetProperty => {
                let symbol = self.read_i64()?;
                let program = self.program;
                let name = program.symbol(symbol)?;
                let receiver = self.pop()?;

                if let Value::Record { fields, .. } = &receiver {
                    let value = fields
                        .get(name)
                        .cloned()
                        .ok_or(RuntimeError::InvalidReturnValue)?;
                    self.push(value);
                    return Ok(());
                }

                let kind = receiver.kind_name().to_string();
                if !self.bridge.allows_method(&kind, name) {
                    return Err(RuntimeError::BridgeNotAllowed(name.to_string()));
                }
                let value = builtins::property(&kind, name, &receiver)
                    .ok_or(RuntimeError::InvalidReturnValue)?;
                self.push(value);
            }

            Op::ReturnValue => {
                let result = self.pop()?;
                match self.frames.pop() {
                    Some(frame) => {
                        self.pc = frame.return_pc;
                        self.stack.truncate(frame.stack_base);
                        self.locals.truncate(frame.locals_base);
                        self.push(result);
                    }
                    None => {
                        // No enclosing frame: the stream terminates and
                        // the value becomes the program result.
                        self.pc = self.program.chunk.len();
                        self.push(result);
                    }
                }
            }
        }

        Ok(())
    }

    // ===== Operand decoding =====

    fn read_operand_u8(&mut self) -> VmResult<u8> {
        let byte = self
            .program
            .chunk
            .read_u8(self.pc)
            .ok_or(RuntimeError::InvalidSymbol(self.pc as i64))?;
        self.pc += 1;
        Ok(byte)
    }

    fn read_i64(&mut self) -> VmResult<i64> {
        let value = self
            .program
            .chunk
            .read_i64(self.pc)
            .ok_or(RuntimeError::InvalidSymbol(self.pc as i64))?;
        self.pc += 8;
        Ok(value)
    }

    fn read_f64(&mut self) -> VmResult<f64> {
        let value = self
            .program
            .chunk
            .read_f64(self.pc)
            .ok_or(RuntimeError::InvalidSymbol(self.pc as i64))?;
        self.pc += 8;
        Ok(value)
    }

    // ===== Stack discipline =====

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> VmResult<Value> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop `argc` values and restore their original left-to-right order.
    fn pop_args(&mut self, argc: i64) -> VmResult<Vec<Value>> {
        let count = usize::try_from(argc).map_err(|_| RuntimeError::StackUnderflow)?;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(self.pop()?);
        }
        args.reverse();
        Ok(args)
    }

    fn binary_op<F>(&mut self, op: F) -> VmResult<()>
    where
        F: FnOnce(Value, Value) -> VmResult<Value>,
    {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = op(a, b)?;
        self.push(result);
        Ok(())
    }
}

// ===== Polymorphic arithmetic =====
//
// Int when both operands are Int, Double when both are numeric; add also
// concatenates when either side is a string. Anything else degrades to
// nil (false for comparisons); there is no type-mismatch error kind.

fn add_values(a: Value, b: Value) -> VmResult<Value> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_add(*y))),
        (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::string(format!("{}{}", a, b))),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Double(x + y)),
            _ => Ok(Value::Unit),
        },
    }
}

fn subtract_values(a: Value, b: Value) -> VmResult<Value> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_sub(*y))),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Double(x - y)),
            _ => Ok(Value::Unit),
        },
    }
}

fn multiply_values(a: Value, b: Value) -> VmResult<Value> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_mul(*y))),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Double(x * y)),
            _ => Ok(Value::Unit),
        },
    }
}

fn divide_values(a: Value, b: Value) -> VmResult<Value> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                Err(RuntimeError::DivideByZero)
            } else {
                Ok(Value::Int(x.wrapping_div(*y)))
            }
        }
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(_), Some(y)) if y == 0.0 => Err(RuntimeError::DivideByZero),
            (Some(x), Some(y)) => Ok(Value::Double(x / y)),
            _ => Ok(Value::Unit),
        },
    }
}

fn less_than_values(a: Value, b: Value) -> VmResult<Value> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Bool(x < y)),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Bool(x < y)),
            _ => Ok(Value::Bool(false)),
        },
    }
}
