use tracing::{debug, warn};

use crate::ast::{Node, Operator};
use crate::config::{CompileOptions, ErrorPolicy};
use crate::error::{CompileError, CompileResult, DiagnosticSink};
use crate::symbol_table::SymbolTable;
use crate::token::{Token, TokenKind};

/// Binary operator levels, loosest first.
const LEVELS: [&[Operator]; 6] = [
    &[Operator::Or],
    &[Operator::And],
    &[Operator::Eq, Operator::Ne],
    &[Operator::Lt, Operator::Gt, Operator::Le, Operator::Ge],
    &[Operator::Add, Operator::Sub],
    &[Operator::Mul, Operator::Div],
];

/// Largest length accepted in `decl name[length]`.
pub const MAX_ARRAY_LENGTH: usize = u32::MAX as usize;

type ParseResult = CompileResult<Option<Node>>;

/// Parse a token stream ending in `End` into a statement tree.
///
/// Declarations allocate their storage in `symbols` as they are parsed.
/// `Ok(None)` is an empty program.
pub fn parse(
    tokens: &[Token],
    symbols: &mut SymbolTable,
    options: &CompileOptions,
    sink: &mut dyn DiagnosticSink,
) -> ParseResult {
    let mut parser = Parser::new(tokens, symbols, options.policy, sink);
    let program = parser.stmts()?;
    if !parser.at_end() {
        warn!(
            next = %parser.lookahead(),
            remaining = tokens.len().saturating_sub(parser.position + 1),
            "tokens left after the last statement"
        );
        parser.mismatch("end of input".to_string())?;
    }
    debug!(declared = symbols.symbols().len(), "parsed program");
    Ok(program)
}

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    end: Token,
    symbols: &'a mut SymbolTable,
    policy: ErrorPolicy,
    sink: &'a mut dyn DiagnosticSink,
}

impl<'a> Parser<'a> {
    fn new(
        tokens: &'a [Token],
        symbols: &'a mut SymbolTable,
        policy: ErrorPolicy,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            tokens,
            position: 0,
            end: Token::end(),
            symbols,
            policy,
            sink,
        }
    }

    fn lookahead(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&self.end)
    }

    fn at_end(&self) -> bool {
        self.lookahead().kind == TokenKind::End
    }

    fn advance(&mut self) -> Token {
        let token = self.lookahead().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    /// Consume `text` if it is next. Otherwise report the mismatch and leave
    /// the lookahead where it is.
    fn expect(&mut self, kind: TokenKind, text: &str) -> CompileResult<()> {
        if self.lookahead().is(kind, text) {
            self.advance();
            return Ok(());
        }
        self.mismatch(format!("'{text}'"))
    }

    fn mismatch(&mut self, expected: String) -> CompileResult<()> {
        let error = CompileError::Syntax {
            expected,
            found: self.lookahead().describe(),
        };
        self.policy.handle(&mut *self.sink, error)
    }

    // stmts -> stmt ';' stmts | stmt
    fn stmts(&mut self) -> ParseResult {
        let first = self.stmt()?;
        if self.lookahead().is_special(";") {
            self.advance();
            let rest = self.stmts()?;
            return Ok(Some(Node::Sequence {
                first: first.map(Box::new),
                rest: rest.map(Box::new),
            }));
        }
        Ok(first)
    }

    fn stmt(&mut self) -> ParseResult {
        let lookahead = self.lookahead();
        if lookahead.kind == TokenKind::Identifier {
            self.assign_stmt()
        } else if lookahead.is_keyword("if") {
            self.if_stmt()
        } else if lookahead.is_keyword("while") {
            self.while_stmt()
        } else if lookahead.is_keyword("decl") {
            self.decl_stmt()
        } else if lookahead.is_special("{") {
            self.block_stmt()
        } else {
            Ok(None)
        }
    }

    fn assign_stmt(&mut self) -> ParseResult {
        let target = self.advance();
        if self.lookahead().is_special("[") {
            self.advance();
            let index = self.bool_expr()?;
            self.expect(TokenKind::Special, "]")?;
            self.expect(TokenKind::Special, "<-")?;
            let value = self.bool_expr()?;
            return Ok(Some(Node::IndexAssign {
                array: target,
                index: index.map(Box::new),
                value: value.map(Box::new),
            }));
        }
        if self.lookahead().is_special("<-") {
            self.advance();
            let value = self.bool_expr()?;
            return Ok(Some(Node::Assign {
                target,
                value: value.map(Box::new),
            }));
        }
        self.expect(TokenKind::Special, "<-")?;
        Ok(None)
    }

    fn if_stmt(&mut self) -> ParseResult {
        self.advance();
        let condition = self.paren_condition()?.map(Box::new);
        let body = self.stmt()?.map(Box::new);
        if self.lookahead().is_keyword("else") {
            self.advance();
            let else_body = self.stmt()?.map(Box::new);
            return Ok(Some(Node::IfElse {
                condition,
                then_body: body,
                else_body,
            }));
        }
        Ok(Some(Node::If { condition, body }))
    }

    fn while_stmt(&mut self) -> ParseResult {
        self.advance();
        let condition = self.paren_condition()?.map(Box::new);
        let body = self.stmt()?.map(Box::new);
        Ok(Some(Node::While { condition, body }))
    }

    fn paren_condition(&mut self) -> ParseResult {
        self.expect(TokenKind::Special, "(")?;
        let condition = self.bool_expr()?;
        self.expect(TokenKind::Special, ")")?;
        Ok(condition)
    }

    fn block_stmt(&mut self) -> ParseResult {
        self.advance();
        let body = self.stmts()?.map(Box::new);
        self.expect(TokenKind::Special, "}")?;
        Ok(Some(Node::Block { body }))
    }

    // decl -> 'decl' id | 'decl' id '[' num ']'
    fn decl_stmt(&mut self) -> ParseResult {
        self.advance();
        if self.lookahead().kind != TokenKind::Identifier {
            self.mismatch("an identifier".to_string())?;
            return Ok(None);
        }
        let name = self.advance().text;

        let mut size = 1;
        if self.lookahead().is_special("[") {
            self.advance();
            if self.lookahead().kind == TokenKind::Number {
                match self.array_length() {
                    Some(length) => size = length,
                    None => self.mismatch("an array length that fits the address space".to_string())?,
                }
                self.advance();
            } else {
                self.mismatch("an array length".to_string())?;
            }
            self.expect(TokenKind::Special, "]")?;
        }

        if self.symbols.has(&name) {
            warn!(name = %name, "variable declared twice, keeping the first declaration");
        } else {
            let address = self.symbols.add_variable(name.clone(), size, None);
            debug!(name = %name, size, address, "declared variable");
        }
        Ok(Some(Node::Decl { name, size }))
    }

    /// Length of the `Number` under the lookahead, if the whole array still
    /// fits behind the storage allocated so far.
    fn array_length(&self) -> Option<usize> {
        self.lookahead()
            .value
            .filter(|value| *value <= MAX_ARRAY_LENGTH as f64)
            .map(|value| value as usize)
            .filter(|length| self.symbols.next_address().checked_add(*length).is_some())
    }

    fn bool_expr(&mut self) -> ParseResult {
        self.left_assoc(0)
    }

    /// Both operands of a level recurse, the right one at the same depth,
    /// so `a - b - c` groups as `a - (b - c)`.
    fn left_assoc(&mut self, depth: usize) -> ParseResult {
        if depth == LEVELS.len() {
            return self.unary();
        }
        let left = self.left_assoc(depth + 1)?;
        let op = LEVELS[depth]
            .iter()
            .copied()
            .find(|op| self.lookahead().is_special(op.as_ref()));
        if let Some(op) = op {
            self.advance();
            let right = self.left_assoc(depth)?;
            return Ok(Some(Node::binary(op, left, right)));
        }
        Ok(left)
    }

    // unary -> '!' primary | '-' primary | primary
    fn unary(&mut self) -> ParseResult {
        let op = if self.lookahead().is_special("!") {
            Operator::Not
        } else if self.lookahead().is_special("-") {
            Operator::Sub
        } else {
            return self.primary();
        };
        self.advance();
        let operand = self.primary()?.map(Box::new);
        Ok(Some(Node::Unary { op, operand }))
    }

    // primary -> num | keyword | id | id '[' bool ']' | '(' bool ')'
    fn primary(&mut self) -> ParseResult {
        let kind = self.lookahead().kind;
        match kind {
            TokenKind::Number | TokenKind::Keyword => Ok(Some(Node::Leaf(self.advance()))),
            TokenKind::Identifier => {
                let array = self.advance();
                if !self.lookahead().is_special("[") {
                    return Ok(Some(Node::Leaf(array)));
                }
                self.advance();
                let index = self.bool_expr()?.map(Box::new);
                self.expect(TokenKind::Special, "]")?;
                Ok(Some(Node::Index { array, index }))
            }
            TokenKind::Special if self.lookahead().text == "(" => {
                self.advance();
                let inner = self.bool_expr()?;
                self.expect(TokenKind::Special, ")")?;
                Ok(inner)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse_with(source: &str, options: CompileOptions) -> (ParseResult, SymbolTable, Vec<String>) {
        let mut symbols = SymbolTable::new();
        let mut sink: Vec<String> = Vec::new();
        let tokens = tokenize(source, &mut symbols, &mut sink);
        let program = parse(&tokens, &mut symbols, &options, &mut sink);
        (program, symbols, sink)
    }

    fn parse_ok(source: &str) -> Node {
        let (program, _, sink) = parse_with(source, CompileOptions::default());
        assert!(sink.is_empty(), "unexpected diagnostics: {sink:?}");
        program
            .expect("Parsing failed")
            .expect("Parsing returned nothing!")
    }

    /// Value of a single `x <- ...` statement.
    fn assigned(source: &str) -> Node {
        match parse_ok(source) {
            Node::Assign { value, .. } => *value.expect("Assignment has no value"),
            other => panic!("Expected assignment, got {other:?}"),
        }
    }

    fn num(text: &str) -> Option<Node> {
        Some(Node::Leaf(Token::number(text, text.parse().unwrap())))
    }

    fn id(text: &str) -> Option<Node> {
        Some(Node::Leaf(Token::identifier(text)))
    }

    fn binary(op: Operator, left: Option<Node>, right: Option<Node>) -> Option<Node> {
        Some(Node::binary(op, left, right))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            Some(assigned("x <- 1 + 2 * 3")),
            binary(Operator::Add, num("1"), binary(Operator::Mul, num("2"), num("3")))
        );
        assert_eq!(
            Some(assigned("x <- 1 * 2 + 3")),
            binary(Operator::Add, binary(Operator::Mul, num("1"), num("2")), num("3"))
        );
    }

    #[test]
    fn test_same_level_groups_right() {
        assert_eq!(
            Some(assigned("x <- 1 - 2 - 3")),
            binary(Operator::Sub, num("1"), binary(Operator::Sub, num("2"), num("3")))
        );
    }

    #[test]
    fn test_all_levels() {
        assert_eq!(
            Some(assigned("x <- a | b & c = d < e + f * g")),
            binary(
                Operator::Or,
                id("a"),
                binary(
                    Operator::And,
                    id("b"),
                    binary(
                        Operator::Eq,
                        id("c"),
                        binary(
                            Operator::Lt,
                            id("d"),
                            binary(Operator::Add, id("e"), binary(Operator::Mul, id("f"), id("g")))
                        )
                    )
                )
            )
        );
    }

    #[test]
    fn test_parentheses() {
        assert_eq!(
            Some(assigned("x <- (1 + 2) * 3")),
            binary(Operator::Mul, binary(Operator::Add, num("1"), num("2")), num("3"))
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            assigned("x <- !a & -b"),
            Node::Binary {
                op: Operator::And,
                left: Node::Unary {
                    op: Operator::Not,
                    operand: id("a").map(Box::new)
                }
                .into(),
                right: Node::Unary {
                    op: Operator::Sub,
                    operand: id("b").map(Box::new)
                }
                .into(),
            }
        );
    }

    #[test]
    fn test_index_read_and_write() {
        assert_eq!(
            parse_ok("a[i + 1] <- b[2]"),
            Node::IndexAssign {
                array: Token::identifier("a"),
                index: binary(Operator::Add, id("i"), num("1")).map(Box::new),
                value: Node::Index {
                    array: Token::identifier("b"),
                    index: num("2").map(Box::new),
                }
                .into(),
            }
        );
    }

    #[test]
    fn test_sequence_leans_right() {
        let program = parse_ok("a <- 1; b <- 2; c <- 3");
        let Node::Sequence { first, rest } = program else {
            panic!("Expected a sequence");
        };
        assert!(matches!(first.as_deref(), Some(Node::Assign { .. })));
        let Some(Node::Sequence { first, rest }) = rest.as_deref() else {
            panic!("Expected a nested sequence");
        };
        assert!(matches!(first.as_deref(), Some(Node::Assign { .. })));
        assert!(matches!(rest.as_deref(), Some(Node::Assign { .. })));
    }

    #[test]
    fn test_trailing_semicolon_leaves_empty_rest() {
        let program = parse_ok("a <- 1;");
        assert!(matches!(program, Node::Sequence { rest: None, .. }));
    }

    #[test]
    fn test_if_else() {
        assert_eq!(
            parse_ok("if (a) b <- 1 else b <- 2"),
            Node::IfElse {
                condition: id("a").map(Box::new),
                then_body: Node::Assign {
                    target: Token::identifier("b"),
                    value: num("1").map(Box::new)
                }
                .into(),
                else_body: Node::Assign {
                    target: Token::identifier("b"),
                    value: num("2").map(Box::new)
                }
                .into(),
            }
        );
    }

    #[test]
    fn test_semicolon_before_else_detaches_it() {
        let (program, _, sink) = parse_with("if (true) x <- 1; else x <- 2;", CompileOptions::recovering());
        assert_eq!(sink, vec!["expected end of input, found 'else'".to_string()]);
        let Some(Node::Sequence { first, rest }) = program.unwrap() else {
            panic!("Expected a sequence");
        };
        assert!(matches!(first.as_deref(), Some(Node::If { .. })));
        assert_eq!(rest, None);
    }

    #[test]
    fn test_while_block() {
        assert_eq!(
            parse_ok("while (i < 3) { i <- i + 1 }"),
            Node::While {
                condition: binary(Operator::Lt, id("i"), num("3")).map(Box::new),
                body: Node::Block {
                    body: Node::Assign {
                        target: Token::identifier("i"),
                        value: binary(Operator::Add, id("i"), num("1")).map(Box::new),
                    }
                    .into()
                }
                .into(),
            }
        );
    }

    #[test]
    fn test_declarations_allocate() {
        let (program, symbols, sink) = parse_with("decl a; decl arr[5]; decl b", CompileOptions::default());
        assert!(sink.is_empty());
        assert!(program.unwrap().is_some());
        assert_eq!(symbols.find("a").unwrap().address, 1);
        assert_eq!(symbols.find("arr").unwrap().address, 2);
        assert_eq!(symbols.find("arr").unwrap().size, 5);
        assert_eq!(symbols.find("b").unwrap().address, 7);
    }

    #[test]
    fn test_redeclaration_keeps_first() {
        let (_, symbols, _) = parse_with("decl a; decl a[3]", CompileOptions::default());
        assert_eq!(symbols.symbols().len(), 1);
        assert_eq!(symbols.find("a").unwrap().size, 1);
    }

    #[test]
    fn test_parsing_nothing() {
        let (program, _, sink) = parse_with("", CompileOptions::default());
        assert_eq!(program, Ok(None));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_missing_primary_is_absent() {
        assert_eq!(
            Some(assigned("x <- 1 +")),
            binary(Operator::Add, num("1"), None)
        );
    }

    #[test]
    fn test_mismatch_aborts() {
        let (program, _, sink) = parse_with("if (a b <- 1", CompileOptions::default());
        assert_eq!(
            program,
            Err(CompileError::Syntax {
                expected: "')'".into(),
                found: "'b'".into()
            })
        );
        assert_eq!(sink, vec!["expected ')', found 'b'".to_string()]);
    }

    #[test]
    fn test_mismatch_recovers_without_consuming() {
        let (program, _, sink) = parse_with("if (a b <- 1", CompileOptions::recovering());
        assert_eq!(sink, vec!["expected ')', found 'b'".to_string()]);
        assert_eq!(
            program.unwrap(),
            Some(Node::If {
                condition: id("a").map(Box::new),
                body: Node::Assign {
                    target: Token::identifier("b"),
                    value: num("1").map(Box::new)
                }
                .into(),
            })
        );
    }

    #[test]
    fn test_assignment_without_arrow() {
        let (program, _, sink) = parse_with("a 1", CompileOptions::recovering());
        assert_eq!(program, Ok(None));
        assert_eq!(
            sink,
            vec![
                "expected '<-', found '1'".to_string(),
                "expected end of input, found '1'".to_string()
            ]
        );
    }

    #[test]
    fn test_leftover_tokens_abort() {
        let (program, _, sink) = parse_with("x <- 1 ) x <- 2", CompileOptions::default());
        assert_eq!(
            program,
            Err(CompileError::Syntax {
                expected: "end of input".into(),
                found: "')'".into()
            })
        );
        assert_eq!(sink, vec!["expected end of input, found ')'".to_string()]);
    }

    #[test]
    fn test_leftover_tokens_are_reported_when_recovering() {
        let (program, _, sink) = parse_with("x <- 1 ) x <- 2", CompileOptions::recovering());
        assert!(matches!(program, Ok(Some(Node::Assign { .. }))));
        assert_eq!(sink, vec!["expected end of input, found ')'".to_string()]);
    }

    #[test]
    fn test_oversized_array_length() {
        let source = "decl a[99999999999999999999]; decl b";
        let (program, symbols, sink) = parse_with(source, CompileOptions::default());
        assert!(program.is_err());
        assert_eq!(
            sink,
            vec!["expected an array length that fits the address space, found '99999999999999999999'".to_string()]
        );
        assert!(!symbols.has("a"));

        let (program, symbols, _) = parse_with(source, CompileOptions::recovering());
        assert!(program.unwrap().is_some());
        assert_eq!(symbols.find("a").unwrap().size, 1);
        assert_eq!(symbols.find("b").unwrap().address, 2);
    }

    #[test]
    fn test_decl_needs_identifier() {
        let (program, symbols, sink) = parse_with("decl 4", CompileOptions::default());
        assert!(program.is_err());
        assert_eq!(sink, vec!["expected an identifier, found '4'".to_string()]);
        assert!(symbols.symbols().is_empty());
    }
}
