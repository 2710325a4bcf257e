//! Expression AST nodes.

use crate::ast::stmt::Stmt;
use crate::span::Span;

/// An expression in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// All expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal: 42
    IntLiteral(i64),
    /// Floating-point literal: 3.14
    DoubleLiteral(f64),
    /// String literal: "hello"
    StringLiteral(String),
    /// Interpolated string: "count: \(count)"
    InterpolatedString(Vec<InterpolatedPart>),
    /// Boolean literal: true, false
    BoolLiteral(bool),
    /// Nil literal
    NilLiteral,

    /// Identifier reference: foo
    Identifier(String),

    /// Reactive binding reference: $foo
    BindingRef(String),

    /// Member access: obj.field
    Member { object: Box<Expr>, name: String },

    /// Call: foo(a, b), Shape(a), base.method(a), or a call with a
    /// trailing block: Column { ... } / Button("go") { count = 1 }
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        trailing_block: Option<Vec<Stmt>>,
    },

    /// Binary operation: a + b
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
    },

    /// Logical and: a && b (short-circuit)
    LogicalAnd { left: Box<Expr>, right: Box<Expr> },

    /// Logical or: a || b (short-circuit)
    LogicalOr { left: Box<Expr>, right: Box<Expr> },

    /// Ternary: cond ? then_expr : else_expr
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Assignment: x = 5
    Assign { target: Box<Expr>, value: Box<Expr> },
}

/// Part of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolatedPart {
    /// Literal text
    Literal(String),
    /// Expression to interpolate: \(expr)
    Expression(Expr),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    Equal,
    /// Nil coalescing: a ?? b
    Coalesce,
    /// Closed range: a ... b
    Range,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Subtract => write!(f, "-"),
            BinaryOp::Multiply => write!(f, "*"),
            BinaryOp::Divide => write!(f, "/"),
            BinaryOp::Less => write!(f, "<"),
            BinaryOp::Equal => write!(f, "=="),
            BinaryOp::Coalesce => write!(f, "??"),
            BinaryOp::Range => write!(f, "..."),
        }
    }
}
