//! Bytecode chunk and the compiled-program container.

use indexmap::IndexMap;

use crate::bytecode::instruction::Op;
use crate::error::RuntimeError;
use crate::state::StateAction;
use crate::value::Value;

/// A flat, append-only byte buffer of instructions.
///
/// All multi-byte operands are fixed width and little-endian, so a forward
/// jump can reserve its operand bytes and patch them later without moving
/// anything that was emitted after the reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    /// The raw instruction stream.
    pub code: Vec<u8>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an opcode byte.
    pub fn push_op(&mut self, op: Op) {
        self.code.push(op as u8);
    }

    /// Append an 8-byte little-endian integer operand.
    pub fn push_i64(&mut self, value: i64) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a 1-byte boolean operand.
    pub fn push_bool(&mut self, value: bool) {
        self.code.push(value as u8);
    }

    /// Append an 8-byte IEEE-754 operand.
    pub fn push_f64(&mut self, value: f64) {
        self.code.extend_from_slice(&value.to_bits().to_le_bytes());
    }

    /// Overwrite the 8 bytes at `offset` with `value`, for backpatching
    /// reserved jump operands.
    pub fn patch_i64(&mut self, offset: usize, value: i64) {
        self.code[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// Current length, used as a label for jump targets.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Read one byte at `offset`.
    pub fn read_u8(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Read an 8-byte little-endian integer at `offset`.
    pub fn read_i64(&self, offset: usize) -> Option<i64> {
        let bytes = self.code.get(offset..offset + 8)?;
        Some(i64::from_le_bytes(bytes.try_into().ok()?))
    }

    /// Read an 8-byte IEEE-754 double at `offset`.
    pub fn read_f64(&self, offset: usize) -> Option<f64> {
        let bytes = self.code.get(offset..offset + 8)?;
        Some(f64::from_bits(u64::from_le_bytes(bytes.try_into().ok()?)))
    }
}

/// The declared shape of a script record type. Field order defines the
/// positional constructor argument order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordShape {
    pub name: String,
    pub fields: Vec<String>,
}

/// Immutable output of compilation: the instruction stream plus every pool
/// it references. Produced once, then executed any number of times by
/// fresh machine instances.
#[derive(Debug, Clone, Default)]
pub struct CompiledProgram {
    /// The instruction stream.
    pub chunk: Chunk,
    /// Deduplicated string literals, addressed by index.
    pub strings: Vec<String>,
    /// Deduplicated names for types, methods, functions, and state
    /// identifiers, addressed by id.
    pub symbols: Vec<String>,
    /// Declared record shapes, in declaration order.
    pub types: Vec<RecordShape>,
    /// Default literal values for declared state names.
    pub state_defaults: IndexMap<String, Value>,
    /// Precompiled single-assignment action descriptors.
    pub actions: Vec<StateAction>,
}

impl CompiledProgram {
    /// Resolve a string-pool index.
    pub fn string(&self, index: i64) -> Result<&str, RuntimeError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
            .ok_or(RuntimeError::InvalidStringIndex(index))
    }

    /// Resolve a symbol-pool id.
    pub fn symbol(&self, id: i64) -> Result<&str, RuntimeError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.symbols.get(i))
            .map(String::as_str)
            .ok_or(RuntimeError::InvalidSymbol(id))
    }

    /// Look up a declared record shape by name.
    pub fn record_shape(&self, name: &str) -> Option<&RecordShape> {
        self.types.iter().find(|shape| shape.name == name)
    }
}
