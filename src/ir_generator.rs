use std::collections::HashSet;

use tracing::debug;

use crate::{
    ast::{Child, Node, Operator},
    ir::{self, IrLine, ABSENT},
    symbol_table::SymbolTable,
    token::Token,
};

/// Lowers the tree to three-address lines.
///
/// Temporaries (`t<n>`) and labels (`L<n>`) are numbered from one shared
/// counter. Temporaries take one slot in the symbol table; labels take none
/// and record the number of instructions emitted before them. A generated
/// name is skipped when it is already a symbol or a reserved source name.
pub struct IRGenerator<'a> {
    symbols: &'a mut SymbolTable,
    reserved: HashSet<String>,
    name_number: usize,
    code_position: usize,
    lines: Vec<IrLine>,
}

impl<'a> IRGenerator<'a> {
    pub fn new(symbols: &'a mut SymbolTable) -> Self {
        Self {
            symbols,
            reserved: HashSet::new(),
            name_number: 0,
            code_position: 0,
            lines: Vec::new(),
        }
    }

    /// Keep generated names clear of `names`.
    pub fn reserve<'n>(&mut self, names: impl IntoIterator<Item = &'n str>) {
        self.reserved
            .extend(names.into_iter().map(str::to_string));
    }

    fn fresh_name(&mut self, prefix: char) -> String {
        loop {
            let name = format!("{prefix}{}", self.name_number);
            self.name_number += 1;
            if !self.symbols.has(&name) && !self.reserved.contains(&name) {
                return name;
            }
        }
    }

    fn new_temp(&mut self) -> String {
        let name = self.fresh_name('t');
        self.symbols.add_variable(name.clone(), 1, None);
        name
    }

    fn new_label(&mut self) -> String {
        self.fresh_name('L')
    }

    fn emit(&mut self, line: IrLine) {
        self.code_position += 1;
        self.lines.push(line);
    }

    fn place_label(&mut self, name: String) {
        self.symbols
            .add_variable(name.clone(), 0, Some(self.code_position));
        debug!(label = %name, position = self.code_position, "placed label");
        self.lines.push(IrLine::Label { name });
    }

    /// Emit code for `node` and return the name holding its value, if it
    /// has one.
    pub fn visit(&mut self, node: Option<&Node>) -> Option<String> {
        let node = node?;
        match node {
            Node::Leaf(token) => Some(token.text.clone()),
            Node::Index { array, index } => Some(self.index(array, index)),
            Node::Unary { op, operand } => {
                let operand = self.operand(operand);
                let dest = self.new_temp();
                self.emit(IrLine::Unary {
                    dest: dest.clone(),
                    op: *op,
                    operand,
                });
                Some(dest)
            }
            Node::Binary { op, left, right } => {
                let left = self.operand(left);
                let right = self.operand(right);
                Some(self.binary(left, *op, right))
            }
            Node::Assign { target, value } => {
                let value = self.operand(value);
                Some(self.binary(target.text.clone(), Operator::Assign, value))
            }
            Node::IndexAssign {
                array,
                index,
                value,
            } => {
                let element = self.index(array, index);
                let value = self.operand(value);
                Some(self.binary(element, Operator::Assign, value))
            }
            Node::If { condition, body } => {
                let out = self.branch(condition);
                self.visit(body.as_deref());
                self.place_label(out);
                None
            }
            Node::IfElse {
                condition,
                then_body,
                else_body,
            } => {
                let out = self.branch(condition);
                self.visit(then_body.as_deref());
                self.emit(IrLine::Goto {
                    target: out.clone(),
                });
                self.place_label(out);
                self.visit(else_body.as_deref());
                None
            }
            Node::While { condition, body } => {
                let start = self.new_label();
                self.place_label(start.clone());
                let out = self.branch(condition);
                self.visit(body.as_deref());
                self.emit(IrLine::Goto { target: start });
                self.place_label(out);
                None
            }
            Node::Block { body } => self.visit(body.as_deref()),
            Node::Decl { .. } => None,
            Node::Sequence { first, rest } => {
                self.visit(first.as_deref());
                self.visit(rest.as_deref())
            }
        }
    }

    fn operand(&mut self, node: &Child) -> String {
        self.visit(node.as_deref())
            .unwrap_or_else(|| ABSENT.to_string())
    }

    fn binary(&mut self, left: String, op: Operator, right: String) -> String {
        let dest = self.new_temp();
        self.emit(IrLine::Binary {
            dest: dest.clone(),
            left,
            op,
            right,
        });
        dest
    }

    fn index(&mut self, array: &Token, index: &Child) -> String {
        let index = self.operand(index);
        self.binary(array.text.clone(), Operator::Index, index)
    }

    /// `if-goto cond true; goto out; true:` and return `out` for the caller
    /// to place.
    fn branch(&mut self, condition: &Child) -> String {
        let cond = self.operand(condition);
        let on_true = self.new_label();
        self.emit(IrLine::IfGoto {
            cond,
            target: on_true.clone(),
        });
        let out = self.new_label();
        self.emit(IrLine::Goto {
            target: out.clone(),
        });
        self.place_label(on_true);
        out
    }

    pub fn lines(&self) -> &[IrLine] {
        &self.lines
    }
}

/// Lower `program` to IR text, registering temporaries and labels in
/// `symbols`. Identifiers used in `program` are never reused as generated
/// names, declared or not.
pub fn generate_ir(program: Option<&Node>, symbols: &mut SymbolTable) -> String {
    let mut generator = IRGenerator::new(symbols);
    if let Some(program) = program {
        generator.reserve(program.identifiers());
    }
    generator.visit(program);
    debug!(
        instructions = generator.code_position,
        lines = generator.lines.len(),
        "generated IR"
    );
    ir::to_text(generator.lines())
}
