//! Options that change how the pipeline reacts to errors.

use crate::error::{CompileError, CompileResult, DiagnosticSink};

/// What a stage does after reporting a syntax or resolution error.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop the stage and return the error.
    #[default]
    Abort,
    /// Keep going: the parser leaves the offending token in place and the
    /// bytecode generator drops the offending line.
    Recover,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub policy: ErrorPolicy,
}

impl CompileOptions {
    pub fn recovering() -> Self {
        Self {
            policy: ErrorPolicy::Recover,
        }
    }
}

impl ErrorPolicy {
    /// Report `error` and decide whether the caller continues.
    pub fn handle(self, sink: &mut dyn DiagnosticSink, error: CompileError) -> CompileResult<()> {
        sink.report(error.to_string());
        match self {
            Self::Abort => Err(error),
            Self::Recover => Ok(()),
        }
    }
}
