//! Symbol-use index: maps AST identifier nodes to the symbols they
//! resolved to, for go-to-definition and find-references.

use std::collections::HashMap;

use crate::ast::{find_node_at, AstRef, Node};
use crate::sir::{Symbol, Unit};
use crate::source::{SourceId, SourceLocation};

/// AST nodes live in an arena for the unit's lifetime, so their addresses
/// are stable identity keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeKey(usize);

impl NodeKey {
    fn of(node: &Node<'_>) -> Self {
        Self(node as *const Node<'_> as usize)
    }
}

#[derive(Debug, Default)]
pub struct SymbolUseIndex {
    by_node: HashMap<NodeKey, Symbol>,
    uses: HashMap<Symbol, Vec<SourceLocation>>,
}

impl SymbolUseIndex {
    pub fn add(&mut self, ast: AstRef<'_>, symbol: Symbol) {
        let Some(node) = ast else { return };

        self.by_node.insert(NodeKey::of(node), symbol);
        self.uses
            .entry(symbol)
            .or_default()
            .push(SourceLocation {
                file: node.file,
                range: node.range,
            });
    }

    pub fn symbol_for_node(&self, node: &Node<'_>) -> Option<Symbol> {
        self.by_node.get(&NodeKey::of(node)).copied()
    }

    /// Resolved symbol under a byte offset, for go-to-definition.
    pub fn find_symbol_at(&self, unit: &Unit, file: SourceId, offset: u32) -> Option<Symbol> {
        let root = unit
            .modules
            .iter()
            .find(|(_, module)| module.file == Some(file))
            .and_then(|(_, module)| module.ast_root)?;

        let node = find_node_at(root, offset)?;
        self.symbol_for_node(node)
    }

    /// Every recorded use location of a symbol, for find-references.
    pub fn find_symbol_uses(&self, symbol: Symbol) -> &[SourceLocation] {
        self.uses
            .get(&symbol)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}
