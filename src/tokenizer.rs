use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use tracing::debug;

use crate::error::{CompileError, DiagnosticSink};
use crate::symbol_table::SymbolTable;
use crate::token::{Token, KEYWORDS};

/// The order of these variants matters! It is the priority in which the
/// patterns are tried at every position.
#[derive(Debug, PartialEq, Clone, Copy, EnumIter)]
enum Lexeme {
    Number,
    Word,
    Operator,
    WhiteSpace,
}

impl Lexeme {
    fn pattern(&self) -> &'static str {
        match self {
            Self::Number => r"^[0-9][0-9.]*",
            Self::Word => r"^[a-zA-Z][a-zA-Z0-9]*",
            Self::Operator => r"^(<=|<-|>=|!=|[<>!+\-*/(){}\[\];&|=])",
            Self::WhiteSpace => r"^[ \t\n\x{A0}]+",
        }
    }
}

static PATTERNS: LazyLock<Vec<(Lexeme, Regex)>> = LazyLock::new(|| {
    Lexeme::iter()
        .map(|lexeme| {
            let regex = Regex::new(lexeme.pattern()).expect("lexeme patterns are valid");
            (lexeme, regex)
        })
        .collect()
});

/// Scanner state for one compilation.
///
/// `words` starts out holding the reserved words and caches every
/// identifier seen so far, so a name always maps to the same token.
pub struct Tokenizer {
    words: HashMap<String, Token>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        let words = KEYWORDS
            .iter()
            .map(|keyword| (keyword.to_string(), Token::keyword(*keyword)))
            .collect();
        Self { words }
    }

    /// Scan `source` into tokens ending with a single `End` token.
    ///
    /// Numeric literals (and `true`/`false`) are registered in `symbols` the
    /// first time they are seen. Unknown characters are reported to `sink`
    /// and skipped.
    pub fn tokenize(
        &mut self,
        source: &str,
        symbols: &mut SymbolTable,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0;

        'scan: while position < source.len() {
            let rest = &source[position..];
            for (lexeme, pattern) in PATTERNS.iter() {
                let Some(found) = pattern.find(rest) else {
                    continue;
                };
                let range = position..position + found.end();
                if let Some(token) = self.token(*lexeme, found.as_str(), symbols) {
                    tokens.push(token.at(range));
                }
                position += found.end();
                continue 'scan;
            }

            let ch = rest.chars().next().unwrap_or('\0');
            sink.report(CompileError::Lexical { ch, offset: position }.to_string());
            position += ch.len_utf8().max(1);
        }

        tokens.push(Token::end().at(source.len()..source.len()));
        debug!(
            tokens = tokens.len(),
            literals = symbols.literals().len(),
            "tokenized source"
        );
        tokens
    }

    /// The token for one match, or `None` for skipped lexemes.
    fn token(&mut self, lexeme: Lexeme, text: &str, symbols: &mut SymbolTable) -> Option<Token> {
        let token = match lexeme {
            Lexeme::Number => {
                register_literal(symbols, text);
                Token::number(text, number_value(text))
            }
            Lexeme::Word => {
                if text == "true" || text == "false" {
                    register_literal(symbols, text);
                }
                self.words
                    .entry(text.to_string())
                    .or_insert_with(|| Token::identifier(text))
                    .clone()
            }
            Lexeme::Operator => Token::special(text),
            Lexeme::WhiteSpace => return None,
        };
        Some(token)
    }
}

/// Scan `source` with a fresh word cache.
pub fn tokenize(
    source: &str,
    symbols: &mut SymbolTable,
    sink: &mut dyn DiagnosticSink,
) -> Vec<Token> {
    Tokenizer::new().tokenize(source, symbols, sink)
}

fn register_literal(symbols: &mut SymbolTable, text: &str) {
    if !symbols.has(text) {
        symbols.add_literal(text);
    }
}

/// Value of a digit run; a second `.` ends the number.
fn number_value(text: &str) -> f64 {
    let end = text
        .match_indices('.')
        .nth(1)
        .map_or(text.len(), |(index, _)| index);
    text[..end].parse().unwrap_or_default()
}
