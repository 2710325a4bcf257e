//! Benchmarks for the compile and execute phases.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sketchlang::ast::{BinaryOp, Expr, ExprKind, Script, Stmt, StmtKind};
use sketchlang::span::Span;
use sketchlang::{BridgeDescriptor, CompileContext, Compiler, Vm};

fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, Span::default())
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, Span::default())
}

fn int(n: i64) -> Expr {
    expr(ExprKind::IntLiteral(n))
}

fn ident(name: &str) -> Expr {
    expr(ExprKind::Identifier(name.to_string()))
}

fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    expr(ExprKind::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    })
}

fn assign(name: &str, value: Expr) -> Expr {
    expr(ExprKind::Assign {
        target: Box::new(ident(name)),
        value: Box::new(value),
    })
}

fn call(name: &str, arguments: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        callee: Box::new(ident(name)),
        arguments,
        trailing_block: None,
    })
}

/// Sum the integers below 1000 with a while loop.
fn arithmetic_script() -> Script {
    Script::new(vec![
        stmt(StmtKind::Var {
            name: "total".to_string(),
            initializer: Some(int(0)),
        }),
        stmt(StmtKind::Var {
            name: "i".to_string(),
            initializer: Some(int(0)),
        }),
        stmt(StmtKind::While {
            condition: binary(ident("i"), BinaryOp::Less, int(1000)),
            body: vec![
                stmt(StmtKind::Expression(assign(
                    "total",
                    binary(ident("total"), BinaryOp::Add, ident("i")),
                ))),
                stmt(StmtKind::Expression(assign(
                    "i",
                    binary(ident("i"), BinaryOp::Add, int(1)),
                ))),
            ],
        }),
        stmt(StmtKind::Expression(ident("total"))),
    ])
}

/// A column of forty text rows built by unrolled iteration.
fn widget_script() -> Script {
    let items = (0..40).map(int).collect();
    Script::new(vec![stmt(StmtKind::Expression(expr(ExprKind::Call {
        callee: Box::new(ident("Column")),
        arguments: vec![],
        trailing_block: Some(vec![stmt(StmtKind::ForEach {
            variable: "n".to_string(),
            items,
            body: vec![stmt(StmtKind::Expression(call(
                "Text",
                vec![binary(
                    expr(ExprKind::StringLiteral("row ".to_string())),
                    BinaryOp::Add,
                    ident("n"),
                )],
            )))],
        })]),
    })))])
}

fn compile_benchmarks(c: &mut Criterion) {
    let ctx = CompileContext::new();
    let arithmetic = arithmetic_script();
    let widgets = widget_script();

    c.bench_function("compile_arithmetic", |b| {
        b.iter(|| {
            let mut compiler = Compiler::new(&ctx);
            compiler.compile(black_box(&arithmetic)).expect("compile")
        })
    });

    c.bench_function("compile_widgets", |b| {
        b.iter(|| {
            let mut compiler = Compiler::new(&ctx);
            compiler.compile(black_box(&widgets)).expect("compile")
        })
    });
}

fn run_benchmarks(c: &mut Criterion) {
    let ctx = CompileContext::new();
    let bridge = BridgeDescriptor::permissive();

    let mut compiler = Compiler::new(&ctx);
    let arithmetic = compiler.compile(&arithmetic_script()).expect("compile");
    let mut compiler = Compiler::new(&ctx);
    let widgets = compiler.compile(&widget_script()).expect("compile");

    c.bench_function("run_arithmetic", |b| {
        b.iter(|| Vm::new(black_box(&arithmetic), &bridge).run().expect("run"))
    });

    c.bench_function("run_widgets", |b| {
        b.iter(|| Vm::new(black_box(&widgets), &bridge).run().expect("run"))
    });
}

criterion_group!(benches, compile_benchmarks, run_benchmarks);
criterion_main!(benches);
