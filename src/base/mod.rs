//! Foundation types for the analysis core.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`NodeId`], [`TagId`], [`TableId`] - Compact arena identifiers
//! - [`Name`], [`Interner`] - String interning
//! - [`Position`], [`Span`] - Line/column positions for tree nodes
//!
//! This module has NO dependencies on other a68core modules.

mod ids;
mod intern;
mod position;

pub use ids::{NodeId, TableId, TagId};
pub use intern::{Interner, Name};
pub use position::{Position, Span};
