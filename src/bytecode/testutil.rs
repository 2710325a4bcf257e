//! AST builders shared by the bytecode tests. The parser is an external
//! collaborator, so tests assemble trees directly.

use crate::ast::{BinaryOp, Expr, ExprKind, InterpolatedPart, Stmt, StmtKind};
use crate::span::Span;

pub fn int(n: i64) -> Expr {
    Expr::new(ExprKind::IntLiteral(n), Span::default())
}

pub fn double(n: f64) -> Expr {
    Expr::new(ExprKind::DoubleLiteral(n), Span::default())
}

pub fn string(s: &str) -> Expr {
    Expr::new(ExprKind::StringLiteral(s.to_string()), Span::default())
}

pub fn boolean(b: bool) -> Expr {
    Expr::new(ExprKind::BoolLiteral(b), Span::default())
}

pub fn nil() -> Expr {
    Expr::new(ExprKind::NilLiteral, Span::default())
}

pub fn ident(name: &str) -> Expr {
    Expr::new(ExprKind::Identifier(name.to_string()), Span::default())
}

pub fn binding_ref(name: &str) -> Expr {
    Expr::new(ExprKind::BindingRef(name.to_string()), Span::default())
}

pub fn member(object: Expr, name: &str) -> Expr {
    Expr::new(
        ExprKind::Member {
            object: Box::new(object),
            name: name.to_string(),
        },
        Span::default(),
    )
}

pub fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        },
        Span::default(),
    )
}

pub fn and(left: Expr, right: Expr) -> Expr {
    Expr::new(
        ExprKind::LogicalAnd {
            left: Box::new(left),
            right: Box::new(right),
        },
        Span::default(),
    )
}

pub fn or(left: Expr, right: Expr) -> Expr {
    Expr::new(
        ExprKind::LogicalOr {
            left: Box::new(left),
            right: Box::new(right),
        },
        Span::default(),
    )
}

pub fn ternary(condition: Expr, then_branch: Expr, else_branch: Expr) -> Expr {
    Expr::new(
        ExprKind::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        },
        Span::default(),
    )
}

pub fn assign(name: &str, value: Expr) -> Expr {
    Expr::new(
        ExprKind::Assign {
            target: Box::new(ident(name)),
            value: Box::new(value),
        },
        Span::default(),
    )
}

pub fn interpolated(parts: Vec<InterpolatedPart>) -> Expr {
    Expr::new(ExprKind::InterpolatedString(parts), Span::default())
}

pub fn call(name: &str, arguments: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Call {
            callee: Box::new(ident(name)),
            arguments,
            trailing_block: None,
        },
        Span::default(),
    )
}

pub fn call_with_block(name: &str, arguments: Vec<Expr>, block: Vec<Stmt>) -> Expr {
    Expr::new(
        ExprKind::Call {
            callee: Box::new(ident(name)),
            arguments,
            trailing_block: Some(block),
        },
        Span::default(),
    )
}

pub fn container_call(name: &str, children: Vec<Stmt>) -> Expr {
    call_with_block(name, vec![], children)
}

pub fn method_call(receiver: Expr, name: &str, arguments: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Call {
            callee: Box::new(member(receiver, name)),
            arguments,
            trailing_block: None,
        },
        Span::default(),
    )
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::new(StmtKind::Expression(expr), Span::default())
}

pub fn var_stmt(name: &str, initializer: Option<Expr>) -> Stmt {
    Stmt::new(
        StmtKind::Var {
            name: name.to_string(),
            initializer,
        },
        Span::default(),
    )
}

pub fn if_stmt(condition: Expr, then_branch: Vec<Stmt>, else_branch: Option<Vec<Stmt>>) -> Stmt {
    Stmt::new(
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        },
        Span::default(),
    )
}

pub fn while_stmt(condition: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::While { condition, body }, Span::default())
}

pub fn return_stmt(expr: Option<Expr>) -> Stmt {
    Stmt::new(StmtKind::Return(expr), Span::default())
}

pub fn record_stmt(name: &str, fields: &[&str]) -> Stmt {
    Stmt::new(
        StmtKind::Record {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        },
        Span::default(),
    )
}

pub fn for_each_stmt(variable: &str, items: Vec<Expr>, body: Vec<Stmt>) -> Stmt {
    Stmt::new(
        StmtKind::ForEach {
            variable: variable.to_string(),
            items,
            body,
        },
        Span::default(),
    )
}
