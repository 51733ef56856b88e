use std::ops::{Index, IndexMut};

use crate::base::{Name, NodeId, Span, TableId, TagId};
use crate::modes::ModeId;

use super::construct::Construct;

/// Source information attached by the scanner: position and the symbol the
/// node grew from.
#[derive(Debug, Clone)]
pub struct Info {
    pub span: Span,
    pub symbol: Option<Name>,
}

impl Info {
    pub fn new(span: Span) -> Self {
        Self { span, symbol: None }
    }

    pub fn with_symbol(span: Span, symbol: Name) -> Self {
        Self {
            span,
            symbol: Some(symbol),
        }
    }
}

/// One node of the syntax tree, with the annotation fields the analysis
/// phases fill in.
#[derive(Debug, Clone)]
pub struct Node {
    pub construct: Construct,
    pub info: Info,
    /// The symbol table in force at this node
    pub table: TableId,
    /// Resolved mode, written by the mode checker
    pub mode: Option<ModeId>,
    /// Resolved identifier/operator tag
    pub tag: Option<TagId>,
    /// Lexical scope level, written by the scope analyser
    pub scope: Option<u32>,
    /// Set where static analysis cannot exclude a dynamic scope violation;
    /// the interpreter will verify at run time
    pub need_dns: bool,
    /// Set on units so the runtime debugger may interrupt between them
    pub interruptible: bool,
}

/// Arena of tree nodes.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Index<NodeId> for Tree {
    type Output = Node;
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, construct: Construct, info: Info, table: TableId) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node {
            construct,
            info,
            table,
            mode: None,
            tag: None,
            scope: None,
            need_dns: false,
            interruptible: false,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// The resolved mode of a node; panics only on a walker bug, since every
    /// expression node has a final non-null mode after checking.
    pub fn mode_of(&self, id: NodeId) -> Option<ModeId> {
        self[id].mode
    }
}
