//! Bytecode disassembler for debugging.

use std::fmt::Write;

use crate::bytecode::chunk::CompiledProgram;
use crate::bytecode::instruction::Op;

/// Disassemble a compiled program into human-readable output.
pub fn disassemble(program: &CompiledProgram) -> String {
    let mut output = String::new();
    let mut offset = 0;

    while offset < program.chunk.len() {
        offset = disassemble_instruction(program, offset, &mut output);
    }

    output
}

/// Disassemble a single instruction, returning the next offset.
pub fn disassemble_instruction(
    program: &CompiledProgram,
    offset: usize,
    output: &mut String,
) -> usize {
    write!(output, "{:04} ", offset).unwrap();

    let byte = program.chunk.read_u8(offset).unwrap_or(0);
    let op = match Op::from_u8(byte) {
        Some(op) => op,
        None => {
            writeln!(output, "Unknown opcode {}", byte).unwrap();
            return offset + 1;
        }
    };

    let operand_at = offset + 1;
    match op {
        Op::PushNil
        | Op::Add
        | Op::Subtract
        | Op::Multiply
        | Op::Divide
        | Op::LessThan
        | Op::Equal
        | Op::Coalesce
        | Op::ReturnValue => {
            writeln!(output, "{:?}", op).unwrap();
        }

        Op::PushBool => {
            let value = program.chunk.read_u8(operand_at).unwrap_or(0);
            writeln!(output, "{:?} {}", op, value != 0).unwrap();
        }

        Op::PushInt => {
            let value = program.chunk.read_i64(operand_at).unwrap_or(0);
            writeln!(output, "{:?} {}", op, value).unwrap();
        }

        Op::PushDouble => {
            let value = program.chunk.read_f64(operand_at).unwrap_or(0.0);
            writeln!(output, "{:?} {}", op, value).unwrap();
        }

        Op::PushString => {
            let index = program.chunk.read_i64(operand_at).unwrap_or(-1);
            let text = program.string(index).unwrap_or("?");
            writeln!(output, "{:?} {} ({:?})", op, index, text).unwrap();
        }

        Op::Jump | Op::JumpIfFalse => {
            let jump = program.chunk.read_i64(operand_at).unwrap_or(0);
            let target = operand_at as i64 + 8 + jump;
            writeln!(output, "{:?} {} -> {}", op, jump, target).unwrap();
        }

        Op::LoadLocal | Op::StoreLocal | Op::PushAction => {
            let value = program.chunk.read_i64(operand_at).unwrap_or(-1);
            writeln!(output, "{:?} {}", op, value).unwrap();
        }

        Op::LoadState | Op::PushBinding | Op::GetProperty => {
            let symbol = program.chunk.read_i64(operand_at).unwrap_or(-1);
            let name = program.symbol(symbol).unwrap_or("?");
            writeln!(output, "{:?} {} ({})", op, symbol, name).unwrap();
        }

        Op::CallMethod | Op::CallFunction | Op::ConstructType => {
            let symbol = program.chunk.read_i64(operand_at).unwrap_or(-1);
            let argc = program.chunk.read_i64(operand_at + 8).unwrap_or(-1);
            let name = program.symbol(symbol).unwrap_or("?");
            writeln!(output, "{:?} {} ({}) args={}", op, symbol, name, argc).unwrap();
        }
    }

    offset + 1 + op.operand_size()
}
