//! # a68-core
//!
//! The semantic core of a Revised Report Algol 68 front end: the mode
//! (type) system, the coercion-insertion phases and static scope analysis.
//!
//! Given an already-shaped syntax tree plus populated symbol tables, the
//! core (a) determines a unique mode for every expression, (b) resolves
//! overloaded operators and standard-environ identifiers, (c) inserts
//! explicit coercion nodes so that an interpreter never needs runtime type
//! inference, and (d) detects values that would escape their defining
//! lexical scope.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! analysis  → driver: check → insert → widen → scope
//!   ↓
//! semantic  → checker, coercions, balancing, operators, scopes, tables
//!   ↓
//! modes     → mode registry, structural equivalence, derived views, sizes
//!   ↓
//! syntax    → tree arena, tagged-variant constructs, tree builder
//!   ↓
//! base      → primitives (ids, Name interning, Position/Span)
//! ```

// ============================================================================
// MODULES (dependency order: base → syntax → modes → semantic → analysis)
// ============================================================================

/// Foundation types: arena ids, Name interning, source positions
pub mod base;

/// The mode system: registry, constructors, equivalence, views, sizes
pub mod modes;

/// Syntax tree: node arena, constructs, builder
pub mod syntax;

/// Semantic analysis: checking, coercion, balancing, operators, scopes
pub mod semantic;

/// The driver running the phases in pipeline order
pub mod analysis;

// Re-export commonly needed items
pub use analysis::{AnalysisConfig, AnalysisError, analyse, analyse_with};
pub use base::{Interner, Name, NodeId, Position, Span, TableId, TagId};
pub use modes::{Mode, ModeId, ModeKind, ModeRegistry, Standard, StdModes};
pub use semantic::coercion::{DeflexPolicy, Sort};
pub use semantic::diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use syntax::{Construct, Program, TreeBuilder};
