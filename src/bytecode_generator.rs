use std::fmt;

use tracing::debug;

use crate::config::CompileOptions;
use crate::error::{CompileError, CompileResult, DiagnosticSink};
use crate::ir::IrLine;
use crate::symbol_table::SymbolTable;

/// Opcode of `goto target`.
pub const JUMP: u8 = 0;
/// Opcode of `if-goto cond target`.
pub const COND_JUMP: u8 = 16;

/// Fixed-shape instruction with every operand resolved to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualInstruction {
    pub opcode: u8,
    pub arg1: usize,
    pub arg2: Option<usize>,
    pub result: Option<usize>,
}

impl fmt::Display for VirtualInstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let show = |slot: Option<usize>| slot.map_or("-".to_string(), |address| address.to_string());
        write!(
            f,
            "({}, {}, {}, {})",
            self.opcode,
            self.arg1,
            show(self.arg2),
            show(self.result)
        )
    }
}

/// Encode IR text into virtual instructions.
///
/// Only reads `symbols`. A line that fails to encode is reported to `sink`
/// and yields no instruction; whether the rest of the text is still
/// encoded depends on the error policy.
pub fn generate_bytecode(
    ir: &str,
    symbols: &SymbolTable,
    options: &CompileOptions,
    sink: &mut dyn DiagnosticSink,
) -> CompileResult<Vec<VirtualInstruction>> {
    let mut code = Vec::new();
    for (index, text) in ir.lines().enumerate() {
        if text.trim().is_empty() {
            continue;
        }
        match encode(text, index + 1, symbols) {
            Ok(Some(instruction)) => code.push(instruction),
            Ok(None) => {}
            Err(error) => options.policy.handle(sink, error)?,
        }
    }
    debug!(instructions = code.len(), "generated bytecode");
    Ok(code)
}

fn encode(text: &str, line: usize, symbols: &SymbolTable) -> CompileResult<Option<VirtualInstruction>> {
    let resolve = |name: &str| -> CompileResult<usize> {
        symbols
            .find(name)
            .map(|symbol| symbol.address)
            .map_err(|_| CompileError::SymbolResolution {
                name: name.to_string(),
                line,
            })
    };

    let ir_line = IrLine::parse(text, line)?;
    let addresses = ir_line
        .get_vars()
        .into_iter()
        .map(resolve)
        .collect::<CompileResult<Vec<usize>>>()?;

    let instruction = match (&ir_line, addresses.as_slice()) {
        (IrLine::Label { .. }, _) => return Ok(None),
        (IrLine::Goto { .. }, &[target]) => VirtualInstruction {
            opcode: JUMP,
            arg1: target,
            arg2: None,
            result: None,
        },
        (IrLine::IfGoto { .. }, &[cond, target]) => VirtualInstruction {
            opcode: COND_JUMP,
            arg1: cond,
            arg2: Some(target),
            result: None,
        },
        (IrLine::Unary { op, .. }, &[operand, dest]) => VirtualInstruction {
            opcode: op.opcode(),
            arg1: operand,
            arg2: None,
            result: Some(dest),
        },
        (IrLine::Binary { op, .. }, &[left, right, dest]) => VirtualInstruction {
            opcode: op.opcode(),
            arg1: left,
            arg2: Some(right),
            result: Some(dest),
        },
        _ => {
            return Err(CompileError::MalformedLine {
                line,
                text: text.to_string(),
            })
        }
    };
    Ok(Some(instruction))
}
