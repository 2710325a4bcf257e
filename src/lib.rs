//! Sketch scripting core: a sandboxed bytecode compiler and virtual
//! machine for a live-coding tool.
//!
//! User source text is parsed elsewhere; this crate takes the resulting
//! AST, compiles it to a compact bytecode, and executes it inside a
//! capability sandbox. Nothing native runs unless the embedder's
//! [`bridge::BridgeDescriptor`] explicitly allows it.
//!
//! # Pipeline
//!
//! AST → [`bytecode::Compiler`] → [`bytecode::CompiledProgram`] →
//! [`bytecode::Vm`] → final [`value::Value`] for the renderer.

#![allow(clippy::result_large_err)]
#![allow(clippy::new_without_default)]

pub mod ast;
pub mod bridge;
pub mod bytecode;
pub mod error;
pub mod span;
pub mod state;
pub mod value;

pub use bridge::BridgeDescriptor;
pub use bytecode::{CompileContext, CompiledProgram, Compiler, Vm};
pub use error::{CompileError, Diagnostic, RuntimeError, SketchError};
pub use value::Value;

use ast::Script;
use state::{LogSink, StateStore};

/// Compile a script with the given context.
pub fn compile(script: &Script, ctx: &CompileContext) -> Result<CompiledProgram, CompileError> {
    let mut compiler = Compiler::new(ctx);
    compiler.compile(script)
}

/// Compile a script and also return the warning diagnostics the compiler
/// recorded for silent-nil degradations.
pub fn compile_with_diagnostics(
    script: &Script,
    ctx: &CompileContext,
) -> Result<(CompiledProgram, Vec<Diagnostic>), CompileError> {
    let mut compiler = Compiler::new(ctx);
    let program = compiler.compile(script)?;
    Ok((program, compiler.diagnostics().to_vec()))
}

/// Execute a compiled program with no state store or log sink attached.
pub fn execute(program: &CompiledProgram, bridge: &BridgeDescriptor) -> Result<Value, RuntimeError> {
    Vm::new(program, bridge).run()
}

/// Compile and run in one step, threading the optional collaborators
/// through to the machine.
pub fn run(
    script: &Script,
    ctx: &CompileContext,
    bridge: &BridgeDescriptor,
    state: Option<&dyn StateStore>,
    logger: Option<&dyn LogSink>,
) -> Result<Value, SketchError> {
    let program = compile(script, ctx)?;
    let mut vm = Vm::new(&program, bridge);
    if let Some(store) = state {
        vm = vm.with_state(store);
    }
    if let Some(sink) = logger {
        vm = vm.with_logger(sink);
    }
    Ok(vm.run()?)
}
