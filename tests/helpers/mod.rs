//! Shared assertion helpers for the integration suites.

#![allow(dead_code)]

use a68core::base::NodeId;
use a68core::semantic::diagnostics::Diagnostic;
use a68core::syntax::{CoercionKind, Construct, Tree};

/// The catalogue codes of a diagnostic list, in emission order.
pub fn codes(diags: &[Diagnostic]) -> Vec<&'static str> {
    diags.iter().map(|d| d.kind.code()).collect()
}

/// Assert the analysis produced no errors (warnings are fine).
pub fn assert_no_errors(diags: &[Diagnostic]) {
    let errors: Vec<_> = diags
        .iter()
        .filter(|d| d.kind.severity().is_error())
        .collect();
    assert!(
        errors.is_empty(),
        "expected no errors, got {:?}",
        codes(diags)
    );
}

/// Assert some diagnostic carries the given catalogue code.
pub fn assert_has_code(diags: &[Diagnostic], code: &str) {
    assert!(
        diags.iter().any(|d| d.kind.code() == code),
        "expected {code}, got {:?}",
        codes(diags)
    );
}

pub fn assert_lacks_code(diags: &[Diagnostic], code: &str) {
    assert!(
        diags.iter().all(|d| d.kind.code() != code),
        "did not expect {code}, got {:?}",
        codes(diags)
    );
}

/// Unwrap a chain of coercion nodes outermost-first, returning the kinds
/// and the base node they bracket.
pub fn coercion_chain(tree: &Tree, mut n: NodeId) -> (Vec<CoercionKind>, NodeId) {
    let mut kinds = Vec::new();
    loop {
        match tree[n].construct {
            Construct::Coercion { kind, operand } => {
                kinds.push(kind);
                n = operand;
            }
            _ => return (kinds, n),
        }
    }
}

/// The (single) initialiser slot of a variable declaration node.
pub fn init_of(tree: &Tree, decl: NodeId) -> NodeId {
    match &tree[decl].construct {
        Construct::VariableDeclaration { init: Some(i), .. } => *i,
        other => panic!("expected an initialised variable declaration, got {other:?}"),
    }
}

/// The source slot of an identity declaration node.
pub fn source_of(tree: &Tree, decl: NodeId) -> NodeId {
    match &tree[decl].construct {
        Construct::IdentityDeclaration { source, .. } => *source,
        other => panic!("expected an identity declaration, got {other:?}"),
    }
}
