//! Bytecode module: the compiler and the virtual machine.
//!
//! # Architecture
//!
//! - `instruction`: opcode definitions for the instruction set
//! - `chunk`: the flat byte buffer and the compiled-program container
//! - `compiler`: transforms an AST into a compiled program
//! - `vm`: stack-based virtual machine with the capability-bridge gate
//! - `disassembler`: debug output for bytecode inspection

pub mod chunk;
pub mod compiler;
pub mod disassembler;
pub mod instruction;
pub mod vm;

#[cfg(test)]
pub(crate) mod testutil;

pub use chunk::{Chunk, CompiledProgram, RecordShape};
pub use compiler::{CompileContext, Compiler};
pub use disassembler::disassemble;
pub use instruction::Op;
pub use vm::{CallFrame, Vm};
