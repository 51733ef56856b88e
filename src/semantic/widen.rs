//! Denotation widening: the final sweep that collapses a
//! `WIDENING(DENOTATION)` chain into a single denotation of the wider mode,
//! so the interpreter loads the right value directly.
//!
//! A folded denotation is marked optimal; optimal denotations silence
//! WARNING_WIDENING_NOT_PORTABLE. Widening a denotation into a LONG
//! precision is flagged as non-portable at the fold.

use crate::base::NodeId;
use crate::modes::{ModeId, ModeRegistry};
use crate::syntax::{CoercionKind, Construct, DenotKind, Tree};

use super::diagnostics::{DiagnosticCollector, DiagnosticKind};

/// Fold widened denotations below (and including) `root`; returns the
/// possibly-replaced root.
pub fn widen_denotations(
    tree: &mut Tree,
    reg: &ModeRegistry,
    diags: &mut DiagnosticCollector,
    root: NodeId,
) -> NodeId {
    let mut construct = tree[root].construct.clone();
    construct.for_each_child_slot(|slot| {
        *slot = widen_denotations(tree, reg, diags, *slot);
    });
    tree[root].construct = construct;
    fold(tree, reg, diags, root)
}

/// If `n` is the outermost of a widening chain over a denotation whose
/// value is representable in the target mode, rebuild the denotation there.
fn fold(
    tree: &mut Tree,
    reg: &ModeRegistry,
    diags: &mut DiagnosticCollector,
    n: NodeId,
) -> NodeId {
    let Construct::Coercion {
        kind: CoercionKind::Widening,
        operand,
    } = tree[n].construct
    else {
        return n;
    };
    let target = match tree[n].mode {
        Some(m) => m,
        None => return n,
    };
    // Walk to the base of the chain
    let mut base = operand;
    while let Construct::Coercion {
        kind: CoercionKind::Widening,
        operand,
    } = tree[base].construct
    {
        base = operand;
    }
    let Construct::Denotation { ref kind, optimal } = tree[base].construct else {
        return n;
    };
    if optimal {
        return n;
    }
    let from = tree[base].mode.unwrap_or(target);
    let Some(folded) = fold_value(reg, kind, target) else {
        return n;
    };
    if is_long_precision(reg, target) {
        diags.add(
            DiagnosticKind::WideningNotPortable { from, to: target },
            tree[base].info.span,
        );
    }
    tree[base].construct = Construct::Denotation {
        kind: folded,
        optimal: true,
    };
    tree[base].mode = Some(target);
    base
}

fn fold_value(reg: &ModeRegistry, kind: &DenotKind, target: ModeId) -> Option<DenotKind> {
    let std = reg.std;
    match kind {
        DenotKind::Int(i) => {
            if target == std.long_int {
                Some(DenotKind::LongInt(*i))
            } else if target == std.real {
                Some(DenotKind::Real(*i as f64))
            } else if target == std.long_real {
                Some(DenotKind::LongReal(*i as f64))
            } else {
                None
            }
        }
        DenotKind::LongInt(i) => {
            if target == std.long_real {
                Some(DenotKind::LongReal(*i as f64))
            } else {
                None
            }
        }
        DenotKind::Real(x) => {
            if target == std.long_real {
                Some(DenotKind::LongReal(*x))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn is_long_precision(reg: &ModeRegistry, m: ModeId) -> bool {
    let std = reg.std;
    m == std.long_int || m == std.long_long_int || m == std.long_real || m == std.long_long_real
}
