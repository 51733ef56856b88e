//! Operator resolution: find, for a monadic or dyadic formula, the operator
//! tag whose parameter modes the operand modes are FIRMly coercible to.
//!
//! Resolution is an ordered list of strategies over the table chain from the
//! formula's table outward; the standard environ is simply the outermost
//! table. Operand coercion here uses ALIAS deflexing, unlike the SAFE policy
//! of the general checker; the two are kept deliberately distinct.

use tracing::trace;

use crate::base::{TableId, TagId};
use crate::modes::{ModeId, ModeKind, ModeRegistry};

use super::coercion::{DeflexPolicy, Sort};
use super::symbol_table::Tables;

/// A successful resolution: the winning tag and its signature.
#[derive(Debug, Clone)]
pub struct OperatorResolution {
    pub tag: TagId,
    pub params: Vec<ModeId>,
    pub yields: ModeId,
}

/// Why resolution failed, for diagnostic selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorFailure {
    NotFound,
    /// A `[] REAL`-shaped operand could not be matched even after scalar
    /// promotion
    NoVector(ModeId),
    /// Likewise for `[,] REAL`
    NoMatrix(ModeId),
}

fn signature(reg: &ModeRegistry, tabs: &Tables, tag: TagId) -> OperatorResolution {
    let mode = tabs[tag].mode;
    let params = reg[mode].pack.iter().map(|e| e.mode).collect();
    let yields = reg[mode].sub.unwrap_or(mode);
    OperatorResolution {
        tag,
        params,
        yields,
    }
}

/// Walk the chain outward; within a table, declaration order decides.
/// `strong_side`, when set, relaxes that operand position to STRONG (the
/// assigning-operator fall-back).
fn search(
    reg: &mut ModeRegistry,
    tabs: &Tables,
    from: TableId,
    op: &str,
    operands: &[ModeId],
    strong_side: Option<usize>,
) -> Option<TagId> {
    let tables: Vec<TableId> = tabs.chain(from).collect();
    for table in tables {
        let candidates: Vec<TagId> = tabs.operators_named(table, op).collect();
        for tag in candidates {
            let mode = tabs[tag].mode;
            if reg[mode].kind != ModeKind::Proc || reg[mode].pack.len() != operands.len() {
                continue;
            }
            let params: Vec<ModeId> = reg[mode].pack.iter().map(|e| e.mode).collect();
            let all_fit = operands.iter().zip(params.iter()).enumerate().all(
                |(i, (&operand, &param))| {
                    let sort = if strong_side == Some(i) {
                        Sort::Strong
                    } else {
                        Sort::Firm
                    };
                    reg.coercible(operand, param, sort, DeflexPolicy::Alias)
                },
            );
            if all_fit {
                return Some(tag);
            }
        }
    }
    None
}

/// Resolve `⊕ x`.
pub fn find_monadic(
    reg: &mut ModeRegistry,
    tabs: &Tables,
    from: TableId,
    op: &str,
    operand: ModeId,
) -> Result<OperatorResolution, OperatorFailure> {
    if let Some(tag) = search(reg, tabs, from, op, &[operand], None) {
        return Ok(signature(reg, tabs, tag));
    }
    // Stepwise depreffing; this is why operators on REF INT resolve
    let chain = reg.depref_chain(operand);
    for d in chain.into_iter().skip(1) {
        if let Some(tag) = search(reg, tabs, from, op, &[d], None) {
            return Ok(signature(reg, tabs, tag));
        }
    }
    trace!(op, "find_monadic: no operator");
    Err(OperatorFailure::NotFound)
}

/// Resolve `x ⊕ y` with its fall-backs: stepwise depreffing, the united
/// cross-term, vector/matrix scalar promotion in the standard environ, and
/// the STRONG-side relaxation for assigning operators.
pub fn find_dyadic(
    reg: &mut ModeRegistry,
    tabs: &Tables,
    from: TableId,
    op: &str,
    lhs: ModeId,
    rhs: ModeId,
) -> Result<OperatorResolution, OperatorFailure> {
    if let Some(tag) = search(reg, tabs, from, op, &[lhs, rhs], None) {
        return Ok(signature(reg, tabs, tag));
    }

    // Stepwise depreffing of either operand
    let lchain = reg.depref_chain(lhs);
    let rchain = reg.depref_chain(rhs);
    for (i, &dl) in lchain.iter().enumerate() {
        for (j, &dr) in rchain.iter().enumerate() {
            if i == 0 && j == 0 {
                continue;
            }
            if let Some(tag) = search(reg, tabs, from, op, &[dl, dr], None) {
                return Ok(signature(reg, tabs, tag));
            }
        }
    }

    // United cross-term: look for the operator on the balanced united mode
    let lv = reg.meek_to_value(lhs);
    let rv = reg.meek_to_value(rhs);
    if lv != rv {
        let united = reg.union_of(vec![lv, rv]);
        if reg[reg.underlying(united)].kind == ModeKind::Union {
            if let Some(tag) = search(reg, tabs, from, op, &[united, united], None) {
                return Ok(signature(reg, tabs, tag));
            }
        }
    }

    // Vector/matrix promotion: substitute the row's element mode on the
    // scalar side
    if let Some(result) = promote_scalar(reg, tabs, from, op, lv, rv, false) {
        return result;
    }
    if let Some(result) = promote_scalar(reg, tabs, from, op, rv, lv, true) {
        return result;
    }

    // Assigning operators take their value side STRONGly
    if op.ends_with(":=") {
        if let Some(tag) = search(reg, tabs, from, op, &[lhs, rhs], Some(1)) {
            return Ok(signature(reg, tabs, tag));
        }
    }
    if op.ends_with("=:") {
        if let Some(tag) = search(reg, tabs, from, op, &[lhs, rhs], Some(0)) {
            return Ok(signature(reg, tabs, tag));
        }
    }

    trace!(op, "find_dyadic: no operator");
    Err(OperatorFailure::NotFound)
}

/// If `row_side` is a row of REAL or COMPLEX and `scalar_side` widens to its
/// element, retry with the element substituted for the scalar operand.
fn promote_scalar(
    reg: &mut ModeRegistry,
    tabs: &Tables,
    from: TableId,
    op: &str,
    row_side: ModeId,
    scalar_side: ModeId,
    swapped: bool,
) -> Option<Result<OperatorResolution, OperatorFailure>> {
    let rd = reg.deflexed(row_side);
    let ru = reg.underlying(rd);
    if reg[ru].kind != ModeKind::Row {
        return None;
    }
    let dim = reg[ru].dim;
    let elem = reg[ru].sub?;
    if !(elem == reg.std.real || elem == reg.std.complex) {
        return None;
    }
    let su = reg.underlying(scalar_side);
    let scalar_fits = su == elem
        || ((su == reg.std.int || su == reg.std.real) && reg.widens_to(su, elem));
    if !scalar_fits {
        return None;
    }
    let operands = if swapped {
        [elem, row_side]
    } else {
        [row_side, elem]
    };
    if let Some(tag) = search(reg, tabs, from, op, &operands, None) {
        return Some(Ok(signature(reg, tabs, tag)));
    }
    Some(Err(match dim {
        1 => OperatorFailure::NoVector(rd),
        2 => OperatorFailure::NoMatrix(rd),
        _ => OperatorFailure::NotFound,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Interner;
    use crate::semantic::stdenv;

    fn env() -> (ModeRegistry, Tables, Interner) {
        let mut reg = ModeRegistry::new();
        let mut tabs = Tables::new();
        let mut names = Interner::new();
        stdenv::build(&mut reg, &mut tabs, &mut names);
        (reg, tabs, names)
    }

    #[test]
    fn test_monadic_abs_on_int() {
        let (mut reg, tabs, _) = env();
        let int = reg.std.int;
        let res = find_monadic(&mut reg, &tabs, tabs.primal, "ABS", int).expect("ABS INT resolves");
        assert_eq!(res.yields, reg.std.int);
    }

    #[test]
    fn test_monadic_on_name_deprefs() {
        let (mut reg, tabs, _) = env();
        let ref_int = reg.ref_to(reg.std.int);
        let res = find_monadic(&mut reg, &tabs, tabs.primal, "-", ref_int)
            .expect("- REF INT resolves");
        assert_eq!(res.params, vec![reg.std.int]);
    }

    #[test]
    fn test_dyadic_exact_and_mixed() {
        let (mut reg, tabs, _) = env();
        let (int, real) = (reg.std.int, reg.std.real);
        let res =
            find_dyadic(&mut reg, &tabs, tabs.primal, "+", int, int).expect("INT + INT");
        assert_eq!(res.yields, reg.std.int);
        let res =
            find_dyadic(&mut reg, &tabs, tabs.primal, "+", int, real).expect("INT + REAL");
        assert_eq!(res.yields, reg.std.real);
    }

    #[test]
    fn test_inner_declaration_shadows_standard() {
        let (mut reg, mut tabs, mut names) = env();
        let inner = tabs.new_table(tabs.primal);
        let silly = reg.proc(vec![reg.std.int, reg.std.int], reg.std.int);
        let user = tabs.add_operator(inner, names.intern("+"), silly, Some(6));
        let int = reg.std.int;
        let res = find_dyadic(&mut reg, &tabs, inner, "+", int, int).expect("user + resolves");
        assert_eq!(res.tag, user);
    }

    #[test]
    fn test_assigning_operator_takes_value_strongly() {
        let (mut reg, tabs, _) = env();
        let ref_real = reg.ref_to(reg.std.real);
        let int = reg.std.int;
        // REF REAL +:= INT needs the INT widened, which FIRM cannot do
        let res = find_dyadic(&mut reg, &tabs, tabs.primal, "+:=", ref_real, int)
            .expect("REF REAL +:= INT resolves");
        assert_eq!(res.params[0], ref_real);
        assert_eq!(res.params[1], reg.std.real);
    }

    #[test]
    fn test_vector_promotion() {
        let (mut reg, tabs, _) = env();
        let row_real = reg.row(1, reg.std.real);
        let int = reg.std.int;
        let res = find_dyadic(&mut reg, &tabs, tabs.primal, "*", row_real, int)
            .expect("[] REAL * INT promotes the scalar");
        assert_eq!(res.params, vec![row_real, reg.std.real]);
    }

    #[test]
    fn test_unknown_operator_not_found() {
        let (mut reg, tabs, _) = env();
        let bool_ = reg.std.bool_;
        let err =
            find_dyadic(&mut reg, &tabs, tabs.primal, "+", bool_, bool_).unwrap_err();
        assert_eq!(err, OperatorFailure::NotFound);
    }

    #[test]
    fn test_upb_takes_any_row() {
        let (mut reg, tabs, _) = env();
        let row_bool = reg.row(1, reg.std.bool_);
        let res =
            find_monadic(&mut reg, &tabs, tabs.primal, "UPB", row_bool).expect("UPB [] BOOL");
        assert_eq!(res.yields, reg.std.int);
    }
}
