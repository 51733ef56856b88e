//! The analysis driver: runs the phases over a delivered program in the
//! pipeline order — mode sizes, mode checking, coercion insertion,
//! denotation widening, scope analysis — and returns the diagnostic stream.

use thiserror::Error;

use crate::modes::compute_sizes;
use crate::semantic::checker::{Checker, Expect};
use crate::semantic::diagnostics::{Diagnostic, DiagnosticCollector};
use crate::semantic::inserter::insert_coercions;
use crate::semantic::scope::analyse_scopes;
use crate::semantic::widen::widen_denotations;
use crate::syntax::Program;

/// Internal-consistency failures. These represent bugs in the core or a
/// malformed delivery from the front end, never user errors; user errors
/// travel in the diagnostic stream.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("root node {0} does not exist in the delivered tree")]
    RootOutOfRange(usize),
    #[error("node {node} ({construct}) has no resolved mode after checking, line {line}")]
    UnresolvedMode {
        node: usize,
        construct: &'static str,
        line: usize,
    },
}

/// Tunables of the analysis core.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Fatal diagnostics emitted before further errors are silenced
    pub max_errors: usize,
    /// Proactive bound on checker recursion depth
    pub depth_limit: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_errors: 10,
            depth_limit: 3000,
        }
    }
}

/// Analyse a program with the default configuration.
pub fn analyse(program: &mut Program) -> Result<Vec<Diagnostic>, AnalysisError> {
    analyse_with(program, &AnalysisConfig::default())
}

/// Analyse a program: on return every expression node carries a final mode,
/// operator nodes carry tags, coercions are explicit nodes, and identifiers
/// have scopes assigned.
pub fn analyse_with(
    program: &mut Program,
    config: &AnalysisConfig,
) -> Result<Vec<Diagnostic>, AnalysisError> {
    if program.root.index() >= program.tree.len() {
        return Err(AnalysisError::RootOutOfRange(program.root.index()));
    }
    compute_sizes(&mut program.modes);
    let mut diags = DiagnosticCollector::new(config.max_errors);
    let void = program.modes.std.void;
    {
        let mut checker = Checker::new(
            &mut program.tree,
            &mut program.modes,
            &mut program.tables,
            &mut diags,
            config.depth_limit,
        );
        checker.check(program.root, Expect::strong(void));
    }
    program.root = insert_coercions(
        &mut program.tree,
        &mut program.modes,
        &program.tables,
        program.root,
        void,
    );
    program.root = widen_denotations(&mut program.tree, &program.modes, &mut diags, program.root);
    analyse_scopes(
        &mut program.tree,
        &mut program.modes,
        &mut program.tables,
        &mut diags,
        program.root,
    );
    verify_annotations(program)?;
    Ok(diags.take())
}

/// The contract with the interpreter: every node of the annotated tree has
/// a final non-null mode.
fn verify_annotations(program: &Program) -> Result<(), AnalysisError> {
    for id in program.tree.iter_ids() {
        let node = &program.tree[id];
        if node.mode.is_none() {
            return Err(AnalysisError::UnresolvedMode {
                node: id.index(),
                construct: node.construct.class(),
                line: node.info.span.start.line,
            });
        }
    }
    Ok(())
}
