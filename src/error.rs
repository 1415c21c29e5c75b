//! Error types shared by every compilation stage and the sink they are
//! reported through.

use thiserror::Error;
use tracing::warn;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Character the tokenizer has no rule for. Always recovered from.
    #[error("unrecognized character '{ch}' at offset {offset}")]
    Lexical { ch: char, offset: usize },

    /// Token mismatch while parsing.
    #[error("expected {expected}, found {found}")]
    Syntax { expected: String, found: String },

    /// A name in the IR is missing from the symbol table.
    #[error("unresolved symbol '{name}' on IR line {line}")]
    SymbolResolution { name: String, line: usize },

    #[error("unknown operator '{op}' on IR line {line}")]
    UnknownOperator { op: String, line: usize },

    #[error("malformed IR line {line}: '{text}'")]
    MalformedLine { line: usize, text: String },

    #[error("symbol '{0}' not found")]
    NotFound(String),
}

/// Receives human-readable diagnostics from the pipeline.
pub trait DiagnosticSink {
    fn report(&mut self, message: String);
}

/// Collects messages, mostly useful in tests.
impl DiagnosticSink for Vec<String> {
    fn report(&mut self, message: String) {
        self.push(message);
    }
}

/// Forwards every diagnostic to the `tracing` subscriber at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, message: String) {
        warn!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            CompileError::Lexical { ch: '#', offset: 4 }.to_string(),
            "unrecognized character '#' at offset 4"
        );
        assert_eq!(
            CompileError::Syntax {
                expected: "')'".into(),
                found: "';'".into()
            }
            .to_string(),
            "expected ')', found ';'"
        );
    }

    #[test]
    fn test_vec_sink() {
        let mut sink: Vec<String> = Vec::new();
        sink.report(CompileError::NotFound("x".into()).to_string());
        assert_eq!(sink, vec!["symbol 'x' not found".to_string()]);
    }
}
