//! Bytecode compiler: transforms an AST into a compiled program.
//!
//! A single left-to-right pass over the tree. No intermediate form is
//! built; control flow is wired with the usual two-pass jump patch (emit a
//! placeholder operand, compile the guarded code, overwrite the
//! placeholder once the target offset is known).

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ast::{BinaryOp, Expr, ExprKind, InterpolatedPart, Script, Stmt, StmtKind};
use crate::bridge::builtins;
use crate::bytecode::chunk::{Chunk, CompiledProgram, RecordShape};
use crate::bytecode::instruction::Op;
use crate::error::{CompileError, Diagnostic};
use crate::span::Span;
use crate::state::StateAction;
use crate::value::Value;

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Externally supplied compilation environment: declared reactive state
/// names with their default literals, literal bindings, and computed
/// properties.
#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    pub state_names: HashSet<String>,
    pub state_defaults: IndexMap<String, Value>,
    pub literal_bindings: IndexMap<String, Value>,
    pub computed: IndexMap<String, Expr>,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a reactive state name with its default literal.
    pub fn with_state(mut self, name: impl Into<String>, default: Value) -> Self {
        let name = name.into();
        self.state_names.insert(name.clone());
        self.state_defaults.insert(name, default);
        self
    }

    /// Supply an external literal binding.
    pub fn with_binding(mut self, name: impl Into<String>, value: Value) -> Self {
        self.literal_bindings.insert(name.into(), value);
        self
    }

    /// Supply a computed-property expression.
    pub fn with_computed(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.computed.insert(name.into(), expr);
        self
    }
}

/// The bytecode compiler.
pub struct Compiler<'c> {
    ctx: &'c CompileContext,
    chunk: Chunk,
    strings: Vec<String>,
    symbols: Vec<String>,
    types: Vec<RecordShape>,
    actions: Vec<StateAction>,
    /// Local slot names; index is the slot. Slots are handed out
    /// monotonically, never reused, and resolution takes the latest
    /// declaration.
    locals: Vec<String>,
    /// Innermost-last literal rebindings of unrolled loop variables.
    loop_bindings: Vec<(String, Value)>,
    /// Computed-property names currently being expanded, to break cycles.
    computed_stack: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'c> Compiler<'c> {
    pub fn new(ctx: &'c CompileContext) -> Self {
        Self {
            ctx,
            chunk: Chunk::new(),
            strings: Vec::new(),
            symbols: Vec::new(),
            types: Vec::new(),
            actions: Vec::new(),
            locals: Vec::new(),
            loop_bindings: Vec::new(),
            computed_stack: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Compile a script into an immutable program.
    pub fn compile(&mut self, script: &Script) -> CompileResult<CompiledProgram> {
        for stmt in &script.statements {
            self.compile_statement(stmt)?;
        }

        Ok(CompiledProgram {
            chunk: self.chunk.clone(),
            strings: self.strings.clone(),
            symbols: self.symbols.clone(),
            types: self.types.clone(),
            state_defaults: self.ctx.state_defaults.clone(),
            actions: self.actions.clone(),
        })
    }

    /// Warnings recorded while compiling (silent-nil degradations).
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Compile a statement, returning how many values it left on the
    /// operand stack. Container blocks use the count as their child count.
    fn compile_statement(&mut self, stmt: &Stmt) -> CompileResult<i64> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                let pushed = self.compile_expression(expr)?;
                Ok(pushed as i64)
            }

            StmtKind::Var { name, initializer } => match initializer {
                Some(init) => {
                    self.compile_operand(init)?;
                    let slot = self.declare_local(name);
                    self.emit_op(Op::StoreLocal);
                    self.chunk.push_i64(slot);
                    self.emit_op(Op::LoadLocal);
                    self.chunk.push_i64(slot);
                    Ok(1)
                }
                None => {
                    self.declare_local(name);
                    Ok(0)
                }
            },

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.compile_operand(condition)?;
                let else_jump = self.emit_jump(Op::JumpIfFalse);

                self.compile_block(then_branch)?;

                if let Some(else_stmts) = else_branch {
                    let end_jump = self.emit_jump(Op::Jump);
                    self.patch_jump(else_jump);
                    self.compile_block(else_stmts)?;
                    self.patch_jump(end_jump);
                } else {
                    self.patch_jump(else_jump);
                }
                Ok(0)
            }

            StmtKind::While { condition, body } => {
                let loop_start = self.chunk.len();

                self.compile_operand(condition)?;
                let exit_jump = self.emit_jump(Op::JumpIfFalse);

                self.compile_block(body)?;

                self.emit_loop(loop_start);
                self.patch_jump(exit_jump);
                Ok(0)
            }

            StmtKind::Return(expr) => {
                match expr {
                    Some(e) => self.compile_operand(e)?,
                    None => self.emit_op(Op::PushNil),
                }
                self.emit_op(Op::ReturnValue);
                Ok(0)
            }

            StmtKind::Record { name, fields } => {
                if self.types.iter().any(|shape| &shape.name == name) {
                    self.diagnose(format!("record '{}' is already declared", name), stmt.span);
                } else {
                    self.types.push(RecordShape {
                        name: name.clone(),
                        fields: fields.clone(),
                    });
                }
                Ok(0)
            }

            StmtKind::ForEach {
                variable,
                items,
                body,
            } => {
                // Unrolled at compile time: the loop variable is rebound to
                // each element's literal value and the body re-emitted, so
                // the resulting stream has no loop at all.
                let mut pushed = 0;
                for item in items {
                    let value = self.literal_value(item).ok_or_else(|| {
                        CompileError::new(
                            format!("for-each over '{}' requires literal elements", variable),
                            item.span,
                        )
                    })?;
                    self.loop_bindings.push((variable.clone(), value));
                    let result = self.compile_block(body);
                    self.loop_bindings.pop();
                    pushed += result?;
                }
                Ok(pushed)
            }
        }
    }

    /// Compile a block of statements, returning the total number of values
    /// they leave on the stack.
    fn compile_block(&mut self, statements: &[Stmt]) -> CompileResult<i64> {
        let mut pushed = 0;
        for stmt in statements {
            pushed += self.compile_statement(stmt)?;
        }
        Ok(pushed)
    }

    /// Compile an expression. Returns whether a value was pushed.
    fn compile_expression(&mut self, expr: &Expr) -> CompileResult<bool> {
        match &expr.kind {
            ExprKind::IntLiteral(n) => {
                self.emit_op(Op::PushInt);
                self.chunk.push_i64(*n);
                Ok(true)
            }

            ExprKind::DoubleLiteral(n) => {
                self.emit_op(Op::PushDouble);
                self.chunk.push_f64(*n);
                Ok(true)
            }

            ExprKind::StringLiteral(s) => {
                let index = self.string_index(s);
                self.emit_op(Op::PushString);
                self.chunk.push_i64(index);
                Ok(true)
            }

            ExprKind::BoolLiteral(b) => {
                self.emit_op(Op::PushBool);
                self.chunk.push_bool(*b);
                Ok(true)
            }

            ExprKind::NilLiteral => {
                self.emit_op(Op::PushNil);
                Ok(true)
            }

            ExprKind::InterpolatedString(parts) => {
                self.compile_interpolation(parts)?;
                Ok(true)
            }

            ExprKind::Identifier(name) => {
                self.compile_identifier(name, expr.span)?;
                Ok(true)
            }

            ExprKind::BindingRef(name) => {
                if self.ctx.state_names.contains(name) {
                    let symbol = self.symbol_id(name);
                    self.emit_op(Op::PushBinding);
                    self.chunk.push_i64(symbol);
                } else {
                    self.diagnose(
                        format!("'{}' is not a declared state name", name),
                        expr.span,
                    );
                    self.emit_op(Op::PushNil);
                }
                Ok(true)
            }

            ExprKind::Member { object, name } => {
                self.compile_operand(object)?;
                let symbol = self.symbol_id(name);
                self.emit_op(Op::GetProperty);
                self.chunk.push_i64(symbol);
                Ok(true)
            }

            ExprKind::Call {
                callee,
                arguments,
                trailing_block,
            } => {
                self.compile_call(callee, arguments, trailing_block.as_deref(), expr.span)?;
                Ok(true)
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                self.compile_operand(left)?;
                self.compile_operand(right)?;

                match operator {
                    BinaryOp::Add => self.emit_op(Op::Add),
                    BinaryOp::Subtract => self.emit_op(Op::Subtract),
                    BinaryOp::Multiply => self.emit_op(Op::Multiply),
                    BinaryOp::Divide => self.emit_op(Op::Divide),
                    BinaryOp::Less => self.emit_op(Op::LessThan),
                    BinaryOp::Equal => self.emit_op(Op::Equal),
                    BinaryOp::Coalesce => self.emit_op(Op::Coalesce),
                    BinaryOp::Range => {
                        // Ranges are ordinary bridge-constructed values,
                        // not a primitive.
                        let symbol = self.symbol_id("ClosedRange");
                        self.emit_op(Op::ConstructType);
                        self.chunk.push_i64(symbol);
                        self.chunk.push_i64(2);
                    }
                }
                Ok(true)
            }

            ExprKind::LogicalAnd { left, right } => {
                self.compile_operand(left)?;
                let false_jump = self.emit_jump(Op::JumpIfFalse);
                self.compile_operand(right)?;
                let end_jump = self.emit_jump(Op::Jump);
                self.patch_jump(false_jump);
                self.emit_op(Op::PushBool);
                self.chunk.push_bool(false);
                self.patch_jump(end_jump);
                Ok(true)
            }

            ExprKind::LogicalOr { left, right } => {
                self.compile_operand(left)?;
                let right_jump = self.emit_jump(Op::JumpIfFalse);
                self.emit_op(Op::PushBool);
                self.chunk.push_bool(true);
                let end_jump = self.emit_jump(Op::Jump);
                self.patch_jump(right_jump);
                self.compile_operand(right)?;
                self.patch_jump(end_jump);
                Ok(true)
            }

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.compile_operand(condition)?;
                let else_jump = self.emit_jump(Op::JumpIfFalse);
                self.compile_operand(then_branch)?;
                let end_jump = self.emit_jump(Op::Jump);
                self.patch_jump(else_jump);
                self.compile_operand(else_branch)?;
                self.patch_jump(end_jump);
                Ok(true)
            }

            ExprKind::Assign { target, value } => {
                self.compile_assignment(target, value, expr.span)
            }
        }
    }

    /// Compile an expression that must leave a value: pushes nil when the
    /// expression itself did not.
    fn compile_operand(&mut self, expr: &Expr) -> CompileResult<()> {
        if !self.compile_expression(expr)? {
            self.emit_op(Op::PushNil);
        }
        Ok(())
    }

    /// Identifier resolution, in priority order: local slot, declared
    /// state name, loop/literal binding, computed property. Anything else
    /// degrades to nil with a warning; an unresolved name is never a
    /// compile error.
    fn compile_identifier(&mut self, name: &str, span: Span) -> CompileResult<()> {
        if let Some(slot) = self.resolve_local(name) {
            self.emit_op(Op::LoadLocal);
            self.chunk.push_i64(slot);
            return Ok(());
        }

        if self.ctx.state_names.contains(name) {
            let symbol = self.symbol_id(name);
            self.emit_op(Op::LoadState);
            self.chunk.push_i64(symbol);
            return Ok(());
        }

        if let Some(value) = self.resolve_binding(name) {
            self.emit_literal(&value, span);
            return Ok(());
        }

        let ctx = self.ctx;
        if let Some(computed) = ctx.computed.get(name) {
            if self.computed_stack.iter().any(|n| n == name) {
                self.diagnose(
                    format!("computed property '{}' refers to itself", name),
                    span,
                );
                self.emit_op(Op::PushNil);
                return Ok(());
            }
            self.computed_stack.push(name.to_string());
            let result = self.compile_operand(computed);
            self.computed_stack.pop();
            return result;
        }

        self.diagnose(format!("unresolved identifier '{}'", name), span);
        self.emit_op(Op::PushNil);
        Ok(())
    }

    /// Compile the three call shapes: container construction with trailing
    /// children, type construction, and function/method calls.
    fn compile_call(
        &mut self,
        callee: &Expr,
        arguments: &[Expr],
        trailing_block: Option<&[Stmt]>,
        span: Span,
    ) -> CompileResult<()> {
        match &callee.kind {
            ExprKind::Identifier(name) => {
                let mut argc = 0i64;
                for arg in arguments {
                    self.compile_operand(arg)?;
                    argc += 1;
                }

                if let Some(block) = trailing_block {
                    if builtins::is_container(name) {
                        argc += self.compile_block(block)?;
                    } else {
                        self.compile_action_argument(block, span);
                        argc += 1;
                    }
                }

                let symbol = self.symbol_id(name);
                if is_type_name(name) {
                    self.emit_op(Op::ConstructType);
                } else {
                    self.emit_op(Op::CallFunction);
                }
                self.chunk.push_i64(symbol);
                self.chunk.push_i64(argc);
                Ok(())
            }

            ExprKind::Member { object, name } => {
                self.compile_operand(object)?;
                let mut argc = 0i64;
                for arg in arguments {
                    self.compile_operand(arg)?;
                    argc += 1;
                }
                if let Some(block) = trailing_block {
                    self.compile_action_argument(block, span);
                    argc += 1;
                }
                let symbol = self.symbol_id(name);
                self.emit_op(Op::CallMethod);
                self.chunk.push_i64(symbol);
                self.chunk.push_i64(argc);
                Ok(())
            }

            _ => Err(CompileError::new("invalid call target", span)),
        }
    }

    /// A trailing block on a non-container call is an event handler. Only
    /// a single `state = literal` assignment is expressible; it becomes an
    /// entry in the action pool, pushed by index. Anything else degrades
    /// to nil.
    fn compile_action_argument(&mut self, block: &[Stmt], span: Span) {
        match self.action_from_block(block) {
            Some(action) => {
                let index = self.actions.len() as i64;
                self.actions.push(action);
                self.emit_op(Op::PushAction);
                self.chunk.push_i64(index);
            }
            None => {
                self.diagnose(
                    "handler block must be a single assignment of a literal to a state name",
                    span,
                );
                self.emit_op(Op::PushNil);
            }
        }
    }

    fn action_from_block(&self, block: &[Stmt]) -> Option<StateAction> {
        let [stmt] = block else {
            return None;
        };
        let StmtKind::Expression(expr) = &stmt.kind else {
            return None;
        };
        let ExprKind::Assign { target, value } = &expr.kind else {
            return None;
        };
        let ExprKind::Identifier(name) = &target.kind else {
            return None;
        };
        if !self.ctx.state_names.contains(name) {
            return None;
        }
        let literal = self.literal_value(value)?;
        Some(StateAction::new(name.clone(), literal))
    }

    /// Assignment outside a handler block: locals are stored directly;
    /// state names cannot be written from bytecode and degrade to nothing.
    fn compile_assignment(
        &mut self,
        target: &Expr,
        value: &Expr,
        span: Span,
    ) -> CompileResult<bool> {
        let ExprKind::Identifier(name) = &target.kind else {
            return Err(CompileError::new("invalid assignment target", span));
        };

        if let Some(slot) = self.resolve_local(name) {
            self.compile_operand(value)?;
            self.emit_op(Op::StoreLocal);
            self.chunk.push_i64(slot);
            return Ok(false);
        }

        if self.ctx.state_names.contains(name) {
            self.diagnose(
                format!("state '{}' can only be written from a handler block", name),
                span,
            );
        } else {
            self.diagnose(format!("unresolved assignment target '{}'", name), span);
        }
        Ok(false)
    }

    /// Compile each segment and concatenate left-to-right with the
    /// polymorphic add.
    fn compile_interpolation(&mut self, parts: &[InterpolatedPart]) -> CompileResult<()> {
        let mut first = true;
        for part in parts {
            match part {
                InterpolatedPart::Literal(s) => {
                    if s.is_empty() {
                        continue;
                    }
                    let index = self.string_index(s);
                    self.emit_op(Op::PushString);
                    self.chunk.push_i64(index);
                }
                InterpolatedPart::Expression(expr) => {
                    self.compile_operand(expr)?;
                }
            }
            if !first {
                self.emit_op(Op::Add);
            }
            first = false;
        }

        if first {
            let index = self.string_index("");
            self.emit_op(Op::PushString);
            self.chunk.push_i64(index);
        }
        Ok(())
    }

    /// Extract the literal value of an expression, when it is one.
    fn literal_value(&self, expr: &Expr) -> Option<Value> {
        match &expr.kind {
            ExprKind::IntLiteral(n) => Some(Value::Int(*n)),
            ExprKind::DoubleLiteral(n) => Some(Value::Double(*n)),
            ExprKind::StringLiteral(s) => Some(Value::string(s.clone())),
            ExprKind::BoolLiteral(b) => Some(Value::Bool(*b)),
            ExprKind::NilLiteral => Some(Value::Unit),
            _ => None,
        }
    }

    fn emit_literal(&mut self, value: &Value, span: Span) {
        match value {
            Value::Int(n) => {
                self.emit_op(Op::PushInt);
                self.chunk.push_i64(*n);
            }
            Value::Double(n) => {
                self.emit_op(Op::PushDouble);
                self.chunk.push_f64(*n);
            }
            Value::Bool(b) => {
                self.emit_op(Op::PushBool);
                self.chunk.push_bool(*b);
            }
            Value::Str(s) => {
                let index = self.string_index(s);
                self.emit_op(Op::PushString);
                self.chunk.push_i64(index);
            }
            Value::Unit => self.emit_op(Op::PushNil),
            Value::Native(_) | Value::Record { .. } => {
                self.diagnose("binding value is not a literal", span);
                self.emit_op(Op::PushNil);
            }
        }
    }

    // ===== Name resolution =====

    fn declare_local(&mut self, name: &str) -> i64 {
        self.locals.push(name.to_string());
        (self.locals.len() - 1) as i64
    }

    fn resolve_local(&self, name: &str) -> Option<i64> {
        self.locals
            .iter()
            .rposition(|local| local == name)
            .map(|slot| slot as i64)
    }

    fn resolve_binding(&self, name: &str) -> Option<Value> {
        if let Some((_, value)) = self
            .loop_bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
        {
            return Some(value.clone());
        }
        self.ctx.literal_bindings.get(name).cloned()
    }

    // ===== Pool interning =====

    fn string_index(&mut self, s: &str) -> i64 {
        if let Some(index) = self.strings.iter().position(|existing| existing == s) {
            return index as i64;
        }
        self.strings.push(s.to_string());
        (self.strings.len() - 1) as i64
    }

    fn symbol_id(&mut self, name: &str) -> i64 {
        if let Some(id) = self.symbols.iter().position(|existing| existing == name) {
            return id as i64;
        }
        self.symbols.push(name.to_string());
        (self.symbols.len() - 1) as i64
    }

    // ===== Bytecode emission =====

    fn emit_op(&mut self, op: Op) {
        self.chunk.push_op(op);
    }

    /// Emit a jump with a reserved 8-byte operand; returns the operand
    /// offset for patching.
    fn emit_jump(&mut self, op: Op) -> usize {
        self.emit_op(op);
        let at = self.chunk.len();
        self.chunk.push_i64(0);
        at
    }

    /// Patch a reserved jump operand to land at the current offset. The
    /// offset is relative to the pc after the operand has been read.
    fn patch_jump(&mut self, at: usize) {
        let target = self.chunk.len();
        self.chunk.patch_i64(at, target as i64 - (at as i64 + 8));
    }

    /// Emit an unconditional backward jump to `loop_start`.
    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(Op::Jump);
        let at = self.chunk.len();
        self.chunk.push_i64(loop_start as i64 - (at as i64 + 8));
    }

    fn diagnose(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::new(message, span));
    }
}

/// The type-construction convention: a capitalized bare identifier is a
/// constructor. This predicate is the single place the convention lives,
/// so a declared-symbol table could replace it without touching emission.
fn is_type_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::testutil::*;
    use pretty_assertions::assert_eq;

    fn compile_script(statements: Vec<Stmt>) -> CompiledProgram {
        let ctx = CompileContext::new();
        let mut compiler = Compiler::new(&ctx);
        compiler.compile(&Script::new(statements)).expect("compile")
    }

    #[test]
    fn literals_emit_fixed_width_operands() {
        let program = compile_script(vec![expr_stmt(int(7))]);
        assert_eq!(program.chunk.read_u8(0), Some(Op::PushInt as u8));
        assert_eq!(program.chunk.read_i64(1), Some(7));
        assert_eq!(program.chunk.len(), 9);
    }

    #[test]
    fn string_pool_deduplicates() {
        let program = compile_script(vec![
            expr_stmt(string("hi")),
            expr_stmt(string("there")),
            expr_stmt(string("hi")),
        ]);
        assert_eq!(program.strings, vec!["hi".to_string(), "there".to_string()]);
        // Both "hi" pushes reference index 0.
        assert_eq!(program.chunk.read_i64(1), Some(0));
        assert_eq!(program.chunk.read_i64(19), Some(0));
    }

    #[test]
    fn symbol_pool_deduplicates() {
        let program = compile_script(vec![
            expr_stmt(method_call(string("a"), "uppercased", vec![])),
            expr_stmt(method_call(string("b"), "uppercased", vec![])),
        ]);
        assert_eq!(program.symbols, vec!["uppercased".to_string()]);
    }

    #[test]
    fn compilation_is_deterministic() {
        let make = || {
            compile_script(vec![
                expr_stmt(binary(int(1), BinaryOp::Add, string("x"))),
                expr_stmt(call("Text", vec![string("x")])),
                expr_stmt(ternary(boolean(true), int(1), int(2))),
            ])
        };
        let first = make();
        let second = make();
        assert_eq!(first.chunk, second.chunk);
        assert_eq!(first.strings, second.strings);
        assert_eq!(first.symbols, second.symbols);
    }

    #[test]
    fn if_without_else_patches_forward() {
        let program = compile_script(vec![if_stmt(
            boolean(true),
            vec![expr_stmt(int(1))],
            None,
        )]);
        // PushBool(2) JumpIfFalse(9) PushInt(9)
        assert_eq!(program.chunk.read_u8(2), Some(Op::JumpIfFalse as u8));
        // Operand at 3 skips the 9-byte PushInt that follows it.
        assert_eq!(program.chunk.read_i64(3), Some(9));
    }

    #[test]
    fn while_emits_backward_jump() {
        let program = compile_script(vec![
            var_stmt("i", Some(int(0))),
            while_stmt(
                binary(ident("i"), BinaryOp::Less, int(3)),
                vec![expr_stmt(assign("i", binary(ident("i"), BinaryOp::Add, int(1))))],
            ),
        ]);
        // The last 9 bytes are the unconditional backward jump.
        let jump_op = program.chunk.len() - 9;
        assert_eq!(program.chunk.read_u8(jump_op), Some(Op::Jump as u8));
        let offset = program.chunk.read_i64(jump_op + 1).unwrap();
        assert!(offset < 0, "loop jump must be backward, got {}", offset);
    }

    #[test]
    fn unresolved_identifier_degrades_with_warning() {
        let ctx = CompileContext::new();
        let mut compiler = Compiler::new(&ctx);
        let program = compiler
            .compile(&Script::new(vec![expr_stmt(ident("mystery"))]))
            .expect("compile");
        assert_eq!(program.chunk.read_u8(0), Some(Op::PushNil as u8));
        assert_eq!(compiler.diagnostics().len(), 1);
        assert!(compiler.diagnostics()[0]
            .message
            .contains("unresolved identifier 'mystery'"));
    }

    #[test]
    fn state_names_load_through_the_store() {
        let ctx = CompileContext::new().with_state("count", Value::Int(0));
        let mut compiler = Compiler::new(&ctx);
        let program = compiler
            .compile(&Script::new(vec![expr_stmt(ident("count"))]))
            .expect("compile");
        assert_eq!(program.chunk.read_u8(0), Some(Op::LoadState as u8));
        assert_eq!(program.symbols, vec!["count".to_string()]);
        assert_eq!(program.state_defaults.get("count"), Some(&Value::Int(0)));
    }

    #[test]
    fn literal_bindings_inline_their_value() {
        let ctx = CompileContext::new().with_binding("columns", Value::Int(4));
        let mut compiler = Compiler::new(&ctx);
        let program = compiler
            .compile(&Script::new(vec![expr_stmt(ident("columns"))]))
            .expect("compile");
        assert_eq!(program.chunk.read_u8(0), Some(Op::PushInt as u8));
        assert_eq!(program.chunk.read_i64(1), Some(4));
    }

    #[test]
    fn computed_properties_compile_inline() {
        let ctx = CompileContext::new()
            .with_computed("doubled", binary(int(21), BinaryOp::Multiply, int(2)));
        let mut compiler = Compiler::new(&ctx);
        let program = compiler
            .compile(&Script::new(vec![expr_stmt(ident("doubled"))]))
            .expect("compile");
        assert_eq!(program.chunk.read_u8(0), Some(Op::PushInt as u8));
        assert_eq!(program.chunk.read_u8(18), Some(Op::Multiply as u8));
    }

    #[test]
    fn self_referential_computed_property_degrades() {
        let ctx = CompileContext::new().with_computed("loop", ident("loop"));
        let mut compiler = Compiler::new(&ctx);
        let program = compiler
            .compile(&Script::new(vec![expr_stmt(ident("loop"))]))
            .expect("compile");
        assert_eq!(program.chunk.read_u8(0), Some(Op::PushNil as u8));
        assert_eq!(compiler.diagnostics().len(), 1);
    }

    #[test]
    fn range_lowers_to_closed_range_construction() {
        let program = compile_script(vec![expr_stmt(binary(int(1), BinaryOp::Range, int(5)))]);
        assert_eq!(program.symbols, vec!["ClosedRange".to_string()]);
        // PushInt PushInt ConstructType(symbol=0, argc=2)
        assert_eq!(program.chunk.read_u8(18), Some(Op::ConstructType as u8));
        assert_eq!(program.chunk.read_i64(19), Some(0));
        assert_eq!(program.chunk.read_i64(27), Some(2));
    }

    #[test]
    fn record_declarations_fill_the_type_table() {
        let program = compile_script(vec![record_stmt("Point", &["x", "y"])]);
        assert_eq!(program.types.len(), 1);
        assert_eq!(program.types[0].name, "Point");
        assert_eq!(program.types[0].fields, vec!["x", "y"]);
    }

    #[test]
    fn container_children_are_counted() {
        let program = compile_script(vec![expr_stmt(container_call(
            "Column",
            vec![
                expr_stmt(call("Text", vec![string("a")])),
                expr_stmt(call("Text", vec![string("b")])),
            ],
        ))]);
        // Trailing ConstructType carries argc 2.
        let argc_at = program.chunk.len() - 8;
        assert_eq!(program.chunk.read_i64(argc_at), Some(2));
    }

    #[test]
    fn for_each_unrolls_without_a_loop() {
        let program = compile_script(vec![for_each_stmt(
            "n",
            vec![int(1), int(2), int(3)],
            vec![expr_stmt(call("Text", vec![ident("n")]))],
        )]);
        // Three unrolled constructions, no jumps anywhere.
        for offset in 0..program.chunk.len() {
            assert_ne!(program.chunk.read_u8(offset), Some(Op::Jump as u8));
        }
        let constructs = program
            .chunk
            .code
            .iter()
            .enumerate()
            .filter(|(i, _)| program.chunk.read_u8(*i) == Some(Op::ConstructType as u8))
            .count();
        assert!(constructs >= 3);
    }

    #[test]
    fn for_each_over_non_literal_is_an_error() {
        let ctx = CompileContext::new();
        let mut compiler = Compiler::new(&ctx);
        let result = compiler.compile(&Script::new(vec![for_each_stmt(
            "n",
            vec![ident("xs")],
            vec![],
        )]));
        assert!(result.is_err());
    }

    #[test]
    fn handler_block_becomes_an_action() {
        let ctx = CompileContext::new().with_state("count", Value::Int(0));
        let mut compiler = Compiler::new(&ctx);
        let program = compiler
            .compile(&Script::new(vec![expr_stmt(call_with_block(
                "Button",
                vec![string("reset")],
                vec![expr_stmt(assign("count", int(0)))],
            ))]))
            .expect("compile");
        assert_eq!(program.actions.len(), 1);
        assert_eq!(program.actions[0].target, "count");
        assert_eq!(program.actions[0].value, Value::Int(0));
        assert!(compiler.diagnostics().is_empty());
    }

    #[test]
    fn malformed_handler_block_degrades_to_nil() {
        let ctx = CompileContext::new();
        let mut compiler = Compiler::new(&ctx);
        let program = compiler
            .compile(&Script::new(vec![expr_stmt(call_with_block(
                "Button",
                vec![string("go")],
                vec![expr_stmt(int(1)), expr_stmt(int(2))],
            ))]))
            .expect("compile");
        assert!(program.actions.is_empty());
        assert_eq!(compiler.diagnostics().len(), 1);
    }

    #[test]
    fn state_assignment_outside_handler_is_a_warning() {
        let ctx = CompileContext::new().with_state("count", Value::Int(0));
        let mut compiler = Compiler::new(&ctx);
        compiler
            .compile(&Script::new(vec![expr_stmt(assign("count", int(5)))]))
            .expect("compile");
        assert_eq!(compiler.diagnostics().len(), 1);
        assert!(compiler.diagnostics()[0].message.contains("handler block"));
    }

    #[test]
    fn capitalization_selects_construction() {
        let program = compile_script(vec![
            expr_stmt(call("Gauge", vec![int(1)])),
            expr_stmt(call("gauge", vec![int(1)])),
        ]);
        let mut ops = Vec::new();
        let mut offset = 0;
        while offset < program.chunk.len() {
            let op = Op::from_u8(program.chunk.read_u8(offset).unwrap()).unwrap();
            ops.push(op);
            offset += 1 + op.operand_size();
        }
        assert!(ops.contains(&Op::ConstructType));
        assert!(ops.contains(&Op::CallFunction));
    }
}
