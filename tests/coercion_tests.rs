//! The coercion lattice: monotonicity across sorts, reflexivity, and the
//! individual coercions at their weakest admitting sort.

#![allow(clippy::unwrap_used)]

use a68core::modes::{ModeId, ModeRegistry};
use a68core::semantic::coercion::{DeflexPolicy, Sort};
use rstest::rstest;

const SORTS: [Sort; 5] = [Sort::Soft, Sort::Weak, Sort::Meek, Sort::Firm, Sort::Strong];

/// A pool of representative modes exercising every constructor.
fn mode_pool(reg: &mut ModeRegistry) -> Vec<ModeId> {
    let std = reg.std;
    let ref_int = reg.ref_to(std.int);
    let ref_ref_int = reg.ref_to(ref_int);
    let proc_int = reg.proc(vec![], std.int);
    let proc_ref_int = reg.proc(vec![], ref_int);
    let row_int = reg.row(1, std.int);
    let ref_row_int = reg.ref_to(row_int);
    let flex_row_int = reg.flex(row_int);
    let ref_flex_row_int = reg.ref_to(flex_row_int);
    let int_or_real = reg.union_of(vec![std.int, std.real]);
    let mut names = a68core::base::Interner::new();
    let pair = reg.structure(vec![
        (names.intern("x"), std.real),
        (names.intern("n"), std.int),
    ]);
    vec![
        std.void,
        std.int,
        std.long_int,
        std.real,
        std.long_real,
        std.complex,
        std.bool_,
        std.char_,
        std.bits,
        std.bytes,
        std.string,
        std.row_char,
        std.hip,
        ref_int,
        ref_ref_int,
        proc_int,
        proc_ref_int,
        row_int,
        ref_row_int,
        flex_row_int,
        ref_flex_row_int,
        int_or_real,
        pair,
    ]
}

/// coercible(p,q,SOFT) ⇒ coercible(p,q,WEAK) ⇒ ... ⇒ coercible(p,q,STRONG)
#[rstest]
#[case(DeflexPolicy::Safe)]
#[case(DeflexPolicy::Alias)]
#[case(DeflexPolicy::Force)]
fn test_lattice_monotone(#[case] policy: DeflexPolicy) {
    let mut reg = ModeRegistry::new();
    let pool = mode_pool(&mut reg);
    for &p in &pool {
        for &q in &pool {
            let mut previous = false;
            for &sort in &SORTS {
                let now = reg.coercible(p, q, sort, policy);
                assert!(
                    !previous || now,
                    "{} -> {} admitted at a weaker sort but refused at {:?}",
                    reg.display(p),
                    reg.display(q),
                    sort
                );
                previous = now;
            }
        }
    }
}

/// coercible(p, p, s, _) for every p and s.
#[test]
fn test_reflexive_at_every_sort() {
    let mut reg = ModeRegistry::new();
    let pool = mode_pool(&mut reg);
    for &p in &pool {
        for &sort in &SORTS {
            for policy in [
                DeflexPolicy::NoDeflex,
                DeflexPolicy::Safe,
                DeflexPolicy::Alias,
                DeflexPolicy::Force,
                DeflexPolicy::Skip,
            ] {
                assert!(
                    reg.coercible(p, p, sort, policy),
                    "{} not coercible to itself at {:?}/{:?}",
                    reg.display(p),
                    sort,
                    policy
                );
            }
        }
    }
}

#[rstest]
// Deproceduring admits at SOFT
#[case("PROC INT to INT", Sort::Soft, true)]
// Dereferencing needs WEAK
#[case("REF INT to INT", Sort::Weak, true)]
#[case("REF INT to INT soft", Sort::Soft, false)]
fn test_depreffing_strengths(#[case] _label: &str, #[case] sort: Sort, #[case] admitted: bool) {
    let mut reg = ModeRegistry::new();
    let (p, q) = if _label.starts_with("PROC") {
        (reg.proc(vec![], reg.std.int), reg.std.int)
    } else {
        (reg.ref_to(reg.std.int), reg.std.int)
    };
    assert_eq!(reg.coercible(p, q, sort, DeflexPolicy::Safe), admitted);
}

#[test]
fn test_uniting_needs_firm() {
    let mut reg = ModeRegistry::new();
    let u = reg.union_of(vec![reg.std.int, reg.std.real]);
    assert!(!reg.coercible(reg.std.int, u, Sort::Meek, DeflexPolicy::Safe));
    assert!(reg.coercible(reg.std.int, u, Sort::Firm, DeflexPolicy::Safe));
    // A union never flows back out implicitly
    assert!(!reg.coercible(u, reg.std.int, Sort::Strong, DeflexPolicy::Safe));
}

#[test]
fn test_widening_chain_is_directed() {
    let mut reg = ModeRegistry::new();
    let std = reg.std;
    let widenings = [
        (std.int, std.real),
        (std.int, std.long_int),
        (std.int, std.long_long_int),
        (std.int, std.complex),
        (std.long_int, std.long_real),
        (std.real, std.complex),
        (std.real, std.long_long_complex),
        (std.bits, std.row_bool),
        (std.bytes, std.row_char),
    ];
    for (p, q) in widenings {
        assert!(
            reg.coercible(p, q, Sort::Strong, DeflexPolicy::Safe),
            "{} should widen to {}",
            reg.display(p),
            reg.display(q)
        );
        assert!(
            !reg.coercible(q, p, Sort::Strong, DeflexPolicy::Safe),
            "{} must not narrow to {}",
            reg.display(q),
            reg.display(p)
        );
        assert!(
            !reg.coercible(p, q, Sort::Firm, DeflexPolicy::Safe),
            "widening {} to {} must not be firm",
            reg.display(p),
            reg.display(q)
        );
    }
    // No crossing from the bits chain into the numeric chains
    assert!(!reg.coercible(std.bits, std.real, Sort::Strong, DeflexPolicy::Safe));
    assert!(!reg.coercible(std.int, std.bits, Sort::Strong, DeflexPolicy::Safe));
}

#[test]
fn test_rowing_and_voiding_are_strong_only() {
    let mut reg = ModeRegistry::new();
    let row_int = reg.row(1, reg.std.int);
    assert!(reg.coercible(reg.std.int, row_int, Sort::Strong, DeflexPolicy::Safe));
    assert!(!reg.coercible(reg.std.int, row_int, Sort::Firm, DeflexPolicy::Safe));
    assert!(reg.coercible(row_int, reg.std.void, Sort::Strong, DeflexPolicy::Safe));
    assert!(!reg.coercible(row_int, reg.std.void, Sort::Firm, DeflexPolicy::Safe));
}

/// The ALIAS/SAFE split the operator resolver depends on.
#[test]
fn test_alias_versus_safe_deflexing() {
    let mut reg = ModeRegistry::new();
    let ref_string = reg.ref_to(reg.std.string);
    let ref_row_char = reg.ref_to(reg.std.row_char);
    assert!(reg.coercible(ref_string, ref_row_char, Sort::Firm, DeflexPolicy::Alias));
    assert!(!reg.coercible(ref_string, ref_row_char, Sort::Firm, DeflexPolicy::Safe));
    assert!(!reg.coercible(ref_row_char, ref_string, Sort::Firm, DeflexPolicy::Alias));
}
