use std::collections::HashMap;
use std::fmt::{self, Display};

use crate::error::{CompileError, CompileResult};

/// A named storage location. Labels use `size == 0` and store a code
/// position as their address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub size: usize,
    pub address: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Variable(usize),
    Literal(usize),
}

/// Flat address space for a single compilation unit.
///
/// Variables, temporaries and labels live in one insertion-ordered list,
/// literals in another. Both draw addresses from the same running counter.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    literals: Vec<Symbol>,
    entries: HashMap<String, Entry>,
    next_address: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` and returns its address.
    ///
    /// Without an explicit `address` the running counter is used and then
    /// advanced by `size`. An explicit address leaves the counter alone.
    /// Inserting a name twice keeps both symbols but lookups see the newest
    /// one; callers check `has` first.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        size: usize,
        address: Option<usize>,
    ) -> usize {
        let name = name.into();
        let address = match address {
            Some(address) => address,
            None => {
                let address = self.next_address;
                self.next_address += size;
                address
            }
        };
        self.entries
            .insert(name.clone(), Entry::Variable(self.symbols.len()));
        self.symbols.push(Symbol {
            name,
            size,
            address,
        });
        address
    }

    /// Registers a literal constant in one slot and returns its address.
    pub fn add_literal(&mut self, value: impl Into<String>) -> usize {
        let name = value.into();
        let address = self.next_address;
        self.next_address += 1;
        self.entries
            .insert(name.clone(), Entry::Literal(self.literals.len()));
        self.literals.push(Symbol {
            name,
            size: 1,
            address,
        });
        address
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn find(&self, name: &str) -> CompileResult<&Symbol> {
        match self.entries.get(name) {
            Some(Entry::Variable(index)) => Ok(&self.symbols[*index]),
            Some(Entry::Literal(index)) => Ok(&self.literals[*index]),
            None => Err(CompileError::NotFound(name.to_string())),
        }
    }

    /// Variables, temporaries and labels in insertion order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn literals(&self) -> &[Symbol] {
        &self.literals
    }

    /// The address the next counter-allocated symbol would receive.
    pub fn next_address(&self) -> usize {
        self.next_address
    }

    pub fn len(&self) -> usize {
        self.symbols.len() + self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} | {} | {}", self.name, self.size, self.address)
    }
}

impl Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for symbol in self.symbols.iter().chain(self.literals.iter()) {
            writeln!(f, "{symbol}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_follow_sizes() {
        let mut table = SymbolTable::new();
        assert_eq!(table.add_variable("a", 1, None), 0);
        assert_eq!(table.add_variable("arr", 5, None), 1);
        assert_eq!(table.add_variable("b", 1, None), 6);
        assert_eq!(table.next_address(), 7);
    }

    #[test]
    fn test_label_keeps_counter() {
        let mut table = SymbolTable::new();
        table.add_variable("a", 1, None);
        assert_eq!(table.add_variable("L0", 0, Some(12)), 12);
        assert_eq!(table.next_address(), 1);
        assert_eq!(
            table.find("L0"),
            Ok(&Symbol {
                name: "L0".into(),
                size: 0,
                address: 12
            })
        );
    }

    #[test]
    fn test_literals_share_counter() {
        let mut table = SymbolTable::new();
        table.add_literal("3");
        table.add_variable("x", 1, None);
        assert_eq!(table.find("3").unwrap().address, 0);
        assert_eq!(table.find("x").unwrap().address, 1);
        assert_eq!(table.literals().len(), 1);
        assert_eq!(table.symbols().len(), 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicate_name_newest_wins() {
        let mut table = SymbolTable::new();
        table.add_variable("x", 1, None);
        table.add_variable("x", 1, None);
        assert_eq!(table.find("x").unwrap().address, 1);
        assert_eq!(table.symbols().len(), 2);
    }

    #[test]
    fn test_find_missing() {
        let table = SymbolTable::new();
        assert!(table.is_empty());
        assert!(!table.has("nope"));
        assert_eq!(
            table.find("nope"),
            Err(CompileError::NotFound("nope".into()))
        );
    }

    #[test]
    fn test_display() {
        let mut table = SymbolTable::new();
        table.add_variable("x", 1, None);
        table.add_literal("4");
        assert_eq!(table.to_string(), "x | 1 | 0\n4 | 1 | 1\n");
    }
}
