//! Error types for compilation and execution.

use crate::span::Span;
use thiserror::Error;

/// Compilation errors (structural problems in the input tree).
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{message} at {span}")]
    General { message: String, span: Span },
}

impl CompileError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self::General {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::General { span, .. } => *span,
        }
    }
}

/// A warning-severity note recorded by the compiler when a construct
/// silently degrades to nil instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "warning: {} at {}", self.message, self.span)
    }
}

/// Runtime errors. Any of these aborts the current run at the point of
/// detection; there is no partial result and no in-machine recovery.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("stack underflow")]
    StackUnderflow,

    #[error("invalid symbol id {0}")]
    InvalidSymbol(i64),

    #[error("invalid string index {0}")]
    InvalidStringIndex(i64),

    #[error("invalid local slot {0}")]
    InvalidLocalSlot(i64),

    #[error("division by zero")]
    DivideByZero,

    /// The one policy failure: the operation was well-formed but the
    /// capability bridge forbids it. Embedders should always surface it.
    #[error("'{0}' is not allowed by the capability bridge")]
    BridgeNotAllowed(String),

    #[error("invalid return value")]
    InvalidReturnValue,
}

/// A unified error type covering both phases.
#[derive(Debug, Error)]
pub enum SketchError {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}
