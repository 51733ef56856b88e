//! Semantic analysis: the mode checker and its collaborators.
//!
//! The phases run in the order the driver ([`crate::analysis`]) calls them:
//! the checker (which draws on the coercion relation, the balancer and the
//! operator resolver), the coercion inserter, the denotation-widening fold,
//! and the scope analyser.

pub mod balance;
pub mod checker;
pub mod coercion;
pub mod diagnostics;
pub mod inserter;
pub mod operators;
pub mod scope;
pub mod stdenv;
pub mod symbol_table;
pub mod widen;
