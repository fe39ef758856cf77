//! Parsed syntax tree as consumed by the semantic core.
//!
//! The parser lives outside this crate. What it hands over is an opaque tree
//! of [`Node`]s carrying a kind tag, a byte range, and an optional string
//! value. The semantic core reads ranges to attach diagnostic locations and
//! walks the tree for position queries; it never re-interprets syntax.

use bumpalo::Bump;

use crate::source::{SourceId, TextRange};

/// Coarse classification of a parsed node. The analyzer only distinguishes
/// the kinds it has to navigate; everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Ident,
    Literal,
    Type,
    Block,
    Decl,
    CompletionToken,
    Other,
}

#[derive(Debug)]
pub struct Node<'a> {
    pub kind: NodeKind,
    pub file: SourceId,
    pub range: TextRange,
    pub value: &'a str,
    pub children: &'a [Node<'a>],
}

/// Reference from a SIR node back to the syntax it was lowered from.
/// `None` for synthesized nodes; diagnostics then fall back to a
/// surrounding node.
pub type AstRef<'a> = Option<&'a Node<'a>>;

/// Arena owning the parsed tree for one unit. Node references stay valid
/// for the lifetime of the arena, which outlives the unit.
pub struct AstArena {
    bump: Bump,
}

impl AstArena {
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    pub fn alloc<'a>(&'a self, node: Node<'a>) -> &'a Node<'a> {
        self.bump.alloc(node)
    }

    pub fn alloc_children<'a, I>(&'a self, nodes: I) -> &'a [Node<'a>]
    where
        I: IntoIterator<Item = Node<'a>>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_fill_iter(nodes)
    }

    pub fn alloc_str<'a>(&'a self, value: &str) -> &'a str {
        self.bump.alloc_str(value)
    }
}

impl Default for AstArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Deepest node whose range contains `offset`. Used by go-to-definition
/// and completion queries.
pub fn find_node_at<'a>(root: &'a Node<'a>, offset: u32) -> Option<&'a Node<'a>> {
    if !root.range.contains(offset) {
        return None;
    }

    for child in root.children {
        if let Some(found) = find_node_at(child, offset) {
            return Some(found);
        }
    }

    Some(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf<'a>(arena: &'a AstArena, kind: NodeKind, start: u32, end: u32, value: &str) -> Node<'a> {
        Node {
            kind,
            file: SourceId(0),
            range: TextRange::new(start, end),
            value: arena.alloc_str(value),
            children: &[],
        }
    }

    #[test]
    fn find_node_at_returns_deepest_match() {
        let arena = AstArena::new();
        let children = arena.alloc_children([
            leaf(&arena, NodeKind::Ident, 0, 4, "main"),
            leaf(&arena, NodeKind::Ident, 5, 8, "arg"),
        ]);
        let root = Node {
            kind: NodeKind::Root,
            file: SourceId(0),
            range: TextRange::new(0, 10),
            value: "",
            children,
        };

        let found = find_node_at(&root, 6).unwrap();
        assert_eq!(found.kind, NodeKind::Ident);
        assert_eq!(found.value, "arg");
    }

    #[test]
    fn find_node_at_outside_root_is_none() {
        let arena = AstArena::new();
        let root = leaf(&arena, NodeKind::Root, 0, 4, "");
        assert!(find_node_at(&root, 9).is_none());
    }

    #[test]
    fn find_node_at_falls_back_to_parent_between_children() {
        let arena = AstArena::new();
        let children = arena.alloc_children([leaf(&arena, NodeKind::Ident, 2, 4, "x")]);
        let root = Node {
            kind: NodeKind::Block,
            file: SourceId(0),
            range: TextRange::new(0, 8),
            value: "",
            children,
        };

        let found = find_node_at(&root, 6).unwrap();
        assert_eq!(found.kind, NodeKind::Block);
    }
}
