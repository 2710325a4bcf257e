//! Statement AST nodes.

use crate::ast::expr::Expr;
use crate::span::Span;

/// A complete script: the ordered top-level statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub statements: Vec<Stmt>,
}

impl Script {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}

/// A statement in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression statement: expr
    Expression(Expr),

    /// Local variable declaration: var x = expr
    Var {
        name: String,
        initializer: Option<Expr>,
    },

    /// If statement: if cond { ... } else { ... }
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },

    /// While loop: while cond { ... }
    While { condition: Expr, body: Vec<Stmt> },

    /// Return statement: return expr
    Return(Option<Expr>),

    /// Record declaration: record Point(x, y)
    /// Field order defines the positional constructor argument order.
    Record { name: String, fields: Vec<String> },

    /// Bounded iteration over a literal array: for x in [1, 2, 3] { ... }
    /// Unrolled at compile time; every element must be a literal.
    ForEach {
        variable: String,
        items: Vec<Expr>,
        body: Vec<Stmt>,
    },
}
