use std::ops::{Index, IndexMut};

use indexmap::IndexMap;

use crate::base::{Name, NodeId, TableId, TagId};
use crate::modes::ModeId;
use crate::syntax::Heap;

use super::tag::{Tag, TagKind};

/// One scope level: the tag chains declared at this level and a link to the
/// enclosing table.
///
/// The identifier chain keeps declaration order and O(1) name lookup at
/// once; operators may share a name, so they stay a plain chain.
#[derive(Debug)]
pub struct Table {
    pub level: u32,
    pub parent: Option<TableId>,
    pub identifiers: IndexMap<Name, TagId>,
    pub operators: Vec<TagId>,
    pub indicants: Vec<TagId>,
    pub labels: Vec<TagId>,
    pub anonymous: Vec<TagId>,
}

impl Table {
    fn new(level: u32, parent: Option<TableId>) -> Self {
        Self {
            level,
            parent,
            identifiers: IndexMap::new(),
            operators: Vec::new(),
            indicants: Vec::new(),
            labels: Vec::new(),
            anonymous: Vec::new(),
        }
    }
}

/// Arena storage for all tables and tags - single source of truth.
#[derive(Debug)]
pub struct Tables {
    tables: Vec<Table>,
    tags: Vec<Tag>,
    /// The standard environ, the implicit outermost table
    pub primal: TableId,
}

impl Index<TableId> for Tables {
    type Output = Table;
    fn index(&self, id: TableId) -> &Table {
        &self.tables[id.index()]
    }
}

impl IndexMut<TableId> for Tables {
    fn index_mut(&mut self, id: TableId) -> &mut Table {
        &mut self.tables[id.index()]
    }
}

impl Index<TagId> for Tables {
    type Output = Tag;
    fn index(&self, id: TagId) -> &Tag {
        &self.tags[id.index()]
    }
}

impl IndexMut<TagId> for Tables {
    fn index_mut(&mut self, id: TagId) -> &mut Tag {
        &mut self.tags[id.index()]
    }
}

impl Tables {
    pub fn new() -> Self {
        let mut tables = Self {
            tables: Vec::new(),
            tags: Vec::new(),
            primal: TableId(0),
        };
        tables.primal = tables.push_table(Table::new(super::PRIMAL_SCOPE, None));
        tables
    }

    fn push_table(&mut self, table: Table) -> TableId {
        let id = TableId::new(self.tables.len());
        self.tables.push(table);
        id
    }

    /// Open a new scope level under `parent`.
    pub fn new_table(&mut self, parent: TableId) -> TableId {
        let level = self[parent].level + 1;
        self.push_table(Table::new(level, Some(parent)))
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    fn push_tag(&mut self, tag: Tag) -> TagId {
        let id = TagId::new(self.tags.len());
        self.tags.push(tag);
        id
    }

    // ============================================================
    // Declaration
    // ============================================================

    pub fn add_identifier(&mut self, table: TableId, name: Name, mode: ModeId) -> TagId {
        let tag = Tag::new(name.clone(), TagKind::Identifier, mode, table);
        let id = self.push_tag(tag);
        self[table].identifiers.insert(name, id);
        id
    }

    pub fn add_operator(
        &mut self,
        table: TableId,
        name: Name,
        mode: ModeId,
        priority: Option<u8>,
    ) -> TagId {
        let mut tag = Tag::new(name, TagKind::Operator, mode, table);
        tag.priority = priority;
        let id = self.push_tag(tag);
        self[table].operators.push(id);
        id
    }

    pub fn add_indicant(&mut self, table: TableId, name: Name, mode: ModeId) -> TagId {
        let tag = Tag::new(name, TagKind::Indicant, mode, table);
        let id = self.push_tag(tag);
        self[table].indicants.push(id);
        id
    }

    pub fn add_label(&mut self, table: TableId, name: Name, mode: ModeId) -> TagId {
        let tag = Tag::new(name, TagKind::Label, mode, table);
        let id = self.push_tag(tag);
        self[table].labels.push(id);
        id
    }

    pub fn add_anonymous(&mut self, table: TableId, name: Name, mode: ModeId, heap: Heap) -> TagId {
        let mut tag = Tag::new(name, TagKind::Anonymous, mode, table);
        tag.heap = heap;
        let id = self.push_tag(tag);
        self[table].anonymous.push(id);
        id
    }

    pub fn set_defining_node(&mut self, tag: TagId, node: NodeId) {
        self[tag].node = Some(node);
    }

    // ============================================================
    // Lookup (walks the table chain outward)
    // ============================================================

    /// Find an identifier by walking the chain from `from` outward.
    pub fn lookup_identifier(&self, from: TableId, name: &str) -> Option<TagId> {
        let mut current = Some(from);
        while let Some(t) = current {
            if let Some(&id) = self[t].identifiers.get(name) {
                return Some(id);
            }
            current = self[t].parent;
        }
        None
    }

    /// Find a label; labels share the identifier chain walk but live in
    /// their own chain.
    pub fn lookup_label(&self, from: TableId, name: &str) -> Option<TagId> {
        let mut current = Some(from);
        while let Some(t) = current {
            for &id in &self[t].labels {
                if &*self[id].name == name {
                    return Some(id);
                }
            }
            current = self[t].parent;
        }
        None
    }

    /// All operator tags named `name` declared directly in `table`.
    pub fn operators_named<'a>(
        &'a self,
        table: TableId,
        name: &'a str,
    ) -> impl Iterator<Item = TagId> + 'a {
        self[table]
            .operators
            .iter()
            .copied()
            .filter(move |&id| &*self[id].name == name)
    }

    /// Walk from `from` to the standard environ, yielding each table.
    pub fn chain(&self, from: TableId) -> impl Iterator<Item = TableId> + '_ {
        let mut current = Some(from);
        std::iter::from_fn(move || {
            let t = current?;
            current = self[t].parent;
            Some(t)
        })
    }
}

impl Default for Tables {
    fn default() -> Self {
        Self::new()
    }
}
