use crate::base::{Name, NodeId, TableId};
use crate::modes::ModeId;
use crate::syntax::Heap;

/// What a symbol-table entry names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Identifier,
    Operator,
    Indicant,
    Label,
    Anonymous,
}

/// One symbol-table entry.
#[derive(Debug, Clone)]
pub struct Tag {
    pub name: Name,
    pub kind: TagKind,
    /// Declared mode; operators carry their PROC mode here
    pub mode: ModeId,
    /// The table this tag belongs to
    pub table: TableId,
    /// Defining node, when known
    pub node: Option<NodeId>,
    pub heap: Heap,
    /// Operator priority, resolved by the parser
    pub priority: Option<u8>,
    /// Scope analysis results
    pub scope_assigned: bool,
    pub scope: u32,
    /// For routine values bound by identity declarations: the youngest
    /// environ the routine captured
    pub youngest_environ: Option<u32>,
}

impl Tag {
    pub fn new(name: Name, kind: TagKind, mode: ModeId, table: TableId) -> Self {
        Self {
            name,
            kind,
            mode,
            table,
            node: None,
            heap: Heap::Loc,
            priority: None,
            scope_assigned: false,
            scope: 0,
            youngest_environ: None,
        }
    }

    pub fn is_operator(&self) -> bool {
        self.kind == TagKind::Operator
    }
}
