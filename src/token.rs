use std::fmt;
use std::ops::Range;

/// Reserved words. Everything else matching the identifier grammar is an
/// identifier.
pub const KEYWORDS: [&str; 6] = ["decl", "if", "while", "else", "true", "false"];

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Parsed value of a `Number` token.
    pub value: Option<f64>,
    pub range: Option<Range<usize>>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    Number,
    Identifier,
    Special,
    Keyword,
    End,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            value: None,
            range: None,
        }
    }

    pub fn number(text: impl Into<String>, value: f64) -> Self {
        Self {
            value: Some(value),
            ..Self::new(TokenKind::Number, text)
        }
    }

    pub fn identifier(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Identifier, text)
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Keyword, text)
    }

    pub fn special(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Special, text)
    }

    pub fn end() -> Self {
        Self::new(TokenKind::End, "")
    }

    pub fn at(mut self, range: Range<usize>) -> Self {
        self.range = Some(range);
        self
    }

    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    /// Whether this is the `Special` token `text`.
    pub fn is_special(&self, text: &str) -> bool {
        self.is(TokenKind::Special, text)
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.is(TokenKind::Keyword, text)
    }

    /// Short description used in syntax diagnostics.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::End => "end of input".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

/// Renders as `(KIND, attribute)`.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.kind, self.value) {
            (TokenKind::Number, Some(value)) => write!(f, "({}, {value})", self.kind),
            _ => write!(f, "({}, {})", self.kind, self.text),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Number => "NUM",
            Self::Identifier => "ID",
            Self::Special => "SPEC",
            Self::Keyword => "KWD",
            Self::End => "END",
        };
        write!(f, "{name}")
    }
}

/// Kind and text decide equality. Ranges are only compared when both
/// tokens have one.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        if self.range.is_none() || other.range.is_none() {
            self.text == other.text && self.kind == other.kind
        } else {
            self.text == other.text && self.kind == other.kind && self.range == other.range
        }
    }
}
