//! The syntax tree the parser delivers to the analysis core.
//!
//! Nodes live in a [`Tree`] arena and carry a tagged-variant [`Construct`]
//! payload plus the annotation fields the analysis phases write (`mode`,
//! `tag`, `scope`, `need_dns`, `interruptible`). [`TreeBuilder`] is the
//! construction API a front end (or a test) uses to assemble a program
//! together with its symbol tables.

mod builder;
mod construct;
mod tree;

pub use builder::{Program, TreeBuilder};
pub use construct::{
    CallArg, CoercionKind, ConformityAlt, Construct, DenotKind, FormatItem, FormatItemKind, Heap,
    Indexer,
};
pub use tree::{Info, Node, Tree};
