use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::token::{Token, TokenKind};

/// The operator table. Discriminants are the opcodes used by the bytecode
/// generator, so the order of these variants matters.
#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumIter, EnumString, Display, AsRefStr)]
#[repr(u8)]
pub enum Operator {
    #[strum(serialize = "+")]
    Add = 1,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "&")]
    And,
    #[strum(serialize = "|")]
    Or,
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "<-")]
    Assign,
    #[strum(serialize = "[]")]
    Index,
}

impl Operator {
    pub fn opcode(self) -> u8 {
        self as u8
    }
}

pub type Child = Option<Box<Node>>;

/// Parsed program. Any child the grammar can fail to produce is optional.
#[derive(Debug, PartialEq, Clone)]
pub enum Node {
    /// Number, identifier or keyword.
    Leaf(Token),
    /// `array[index]` read.
    Index { array: Token, index: Child },
    Unary { op: Operator, operand: Child },
    Binary { op: Operator, left: Child, right: Child },
    Assign { target: Token, value: Child },
    IndexAssign { array: Token, index: Child, value: Child },
    If { condition: Child, body: Child },
    IfElse { condition: Child, then_body: Child, else_body: Child },
    While { condition: Child, body: Child },
    Block { body: Child },
    Decl { name: String, size: usize },
    /// Statement chain: `first` then everything in `rest`.
    Sequence { first: Child, rest: Child },
}

impl std::convert::From<Node> for Child {
    fn from(value: Node) -> Self {
        Some(Box::new(value))
    }
}

impl Node {
    pub fn binary(op: Operator, left: Option<Node>, right: Option<Node>) -> Self {
        Self::Binary {
            op,
            left: left.map(Box::new),
            right: right.map(Box::new),
        }
    }

    /// Print the tree one node per line, indented with `--` per level.
    pub fn render(&self) -> String {
        let mut output = String::new();
        self.render_into(&mut output, 0);
        output
    }

    fn render_into(&self, output: &mut String, depth: usize) {
        output.push_str(&"--".repeat(depth));
        output.push_str(&self.label());
        output.push('\n');
        for child in self.children().into_iter().flatten() {
            child.render_into(output, depth + 1);
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Leaf(token) => token.to_string(),
            Self::Index { array, .. } => format!("[] {}", array.text),
            Self::Unary { op, .. } | Self::Binary { op, .. } => op.to_string(),
            Self::Assign { target, .. } => format!("<- {}", target.text),
            Self::IndexAssign { array, .. } => format!("[]<- {}", array.text),
            Self::If { .. } => "if".to_string(),
            Self::IfElse { .. } => "if-else".to_string(),
            Self::While { .. } => "while".to_string(),
            Self::Block { .. } => "block".to_string(),
            Self::Decl { name, size } => format!("decl {name} {size}"),
            Self::Sequence { .. } => "conj".to_string(),
        }
    }

    /// Every identifier the tree mentions, in pre-order, repeats included.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_identifiers(&mut names);
        names
    }

    fn collect_identifiers<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Leaf(token) if token.kind == TokenKind::Identifier => names.push(&token.text),
            Self::Index { array, .. } | Self::IndexAssign { array, .. } => names.push(&array.text),
            Self::Assign { target, .. } => names.push(&target.text),
            Self::Decl { name, .. } => names.push(name),
            _ => {}
        }
        for child in self.children().into_iter().flatten() {
            child.collect_identifiers(names);
        }
    }

    fn children(&self) -> Vec<Option<&Node>> {
        match self {
            Self::Leaf(_) | Self::Decl { .. } => Vec::new(),
            Self::Index { index, .. } => vec![index.as_deref()],
            Self::Unary { operand, .. } => vec![operand.as_deref()],
            Self::Binary { left, right, .. } => vec![left.as_deref(), right.as_deref()],
            Self::Assign { value, .. } => vec![value.as_deref()],
            Self::IndexAssign { index, value, .. } => vec![index.as_deref(), value.as_deref()],
            Self::If { condition, body } | Self::While { condition, body } => {
                vec![condition.as_deref(), body.as_deref()]
            }
            Self::IfElse {
                condition,
                then_body,
                else_body,
            } => vec![
                condition.as_deref(),
                then_body.as_deref(),
                else_body.as_deref(),
            ],
            Self::Block { body } => vec![body.as_deref()],
            Self::Sequence { first, rest } => vec![first.as_deref(), rest.as_deref()],
        }
    }
}
