//! Compiler for a small imperative language.
//!
//! Source text goes through four stages, each one sharing the same
//! [`SymbolTable`]:
//! - `tokenizer` turns text into tokens and registers literals.
//! - `parser` builds the tree and allocates declared variables.
//! - `ir_generator` lowers the tree to three-address text.
//! - `bytecode_generator` encodes that text into virtual instructions.
pub mod ast;
pub mod bytecode_generator;
pub mod config;
pub mod error;
pub mod ir;
pub mod ir_generator;
pub mod parser;
pub mod symbol_table;
pub mod token;
pub mod tokenizer;

use tracing::instrument;

pub use bytecode_generator::VirtualInstruction;
pub use config::{CompileOptions, ErrorPolicy};
pub use error::{CompileError, CompileResult, DiagnosticSink, TracingSink};
pub use symbol_table::{Symbol, SymbolTable};

use ast::Node;
use token::Token;
use tokenizer::Tokenizer;

/// Everything the pipeline produced for one source unit.
#[derive(Debug)]
pub struct Compilation {
    pub tokens: Vec<Token>,
    pub ast: Option<Node>,
    pub ir: String,
    pub instructions: Vec<VirtualInstruction>,
    pub symbols: SymbolTable,
}

/// Run every stage over `source` with a fresh symbol table and word cache.
#[instrument(skip_all, fields(len = source.len()))]
pub fn compile(
    source: &str,
    options: &CompileOptions,
    sink: &mut dyn DiagnosticSink,
) -> CompileResult<Compilation> {
    let mut symbols = SymbolTable::new();
    let tokens = Tokenizer::new().tokenize(source, &mut symbols, sink);
    let ast = parser::parse(&tokens, &mut symbols, options, sink)?;
    let ir = ir_generator::generate_ir(ast.as_ref(), &mut symbols);
    let instructions = bytecode_generator::generate_bytecode(&ir, &symbols, options, sink)?;
    Ok(Compilation {
        tokens,
        ast,
        ir,
        instructions,
        symbols,
    })
}
