//! Abstract Syntax Tree for Sketch scripts.
//!
//! The tree is produced by an external parser; these types are the contract
//! between that parser and the bytecode compiler.

pub mod expr;
pub mod stmt;

pub use expr::{BinaryOp, Expr, ExprKind, InterpolatedPart};
pub use stmt::{Script, Stmt, StmtKind};
