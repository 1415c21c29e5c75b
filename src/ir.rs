use std::fmt;
use std::str::FromStr;

use crate::ast::Operator;
use crate::error::{CompileError, CompileResult};

/// Stand-in for an operand the parser could not produce. It is not a valid
/// name, so it never resolves.
pub const ABSENT: &str = "_";

/// One line of the three-address text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrLine {
    Label {
        name: String,
    },
    Goto {
        target: String,
    },
    IfGoto {
        cond: String,
        target: String,
    },
    Unary {
        dest: String,
        op: Operator,
        operand: String,
    },
    Binary {
        dest: String,
        left: String,
        op: Operator,
        right: String,
    },
}

impl IrLine {
    /// Names the line refers to, in the order they are encoded.
    pub fn get_vars(&self) -> Vec<&str> {
        match self {
            Self::Label { .. } => Vec::new(),
            Self::Goto { target } => vec![target.as_str()],
            Self::IfGoto { cond, target } => vec![cond.as_str(), target.as_str()],
            Self::Unary { dest, operand, .. } => vec![operand.as_str(), dest.as_str()],
            Self::Binary {
                dest, left, right, ..
            } => vec![left.as_str(), right.as_str(), dest.as_str()],
        }
    }

    /// Read one line back. Lines are told apart only by how many
    /// space-separated words they have; `line` is used in errors.
    pub fn parse(text: &str, line: usize) -> CompileResult<Self> {
        let parts: Vec<&str> = text.split_whitespace().collect();
        match parts.as_slice() {
            [name] => Ok(Self::Label {
                name: name.trim_end_matches(':').to_string(),
            }),
            [_, target] => Ok(Self::Goto {
                target: target.to_string(),
            }),
            [_, cond, target] => Ok(Self::IfGoto {
                cond: cond.to_string(),
                target: target.to_string(),
            }),
            [dest, _, op, operand] => Ok(Self::Unary {
                dest: dest.to_string(),
                op: operator(op, line)?,
                operand: operand.to_string(),
            }),
            [dest, _, left, op, right] => Ok(Self::Binary {
                dest: dest.to_string(),
                left: left.to_string(),
                op: operator(op, line)?,
                right: right.to_string(),
            }),
            _ => Err(CompileError::MalformedLine {
                line,
                text: text.to_string(),
            }),
        }
    }
}

fn operator(text: &str, line: usize) -> CompileResult<Operator> {
    Operator::from_str(text).map_err(|_| CompileError::UnknownOperator {
        op: text.to_string(),
        line,
    })
}

impl fmt::Display for IrLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Label { name } => write!(f, "{name}:"),
            Self::Goto { target } => write!(f, "goto {target}"),
            Self::IfGoto { cond, target } => write!(f, "if-goto {cond} {target}"),
            Self::Unary { dest, op, operand } => write!(f, "{dest} = {op} {operand}"),
            Self::Binary {
                dest,
                left,
                op,
                right,
            } => write!(f, "{dest} = {left} {op} {right}"),
        }
    }
}

/// Join lines into the text form, one `\n`-terminated line each.
pub fn to_text(lines: &[IrLine]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}
