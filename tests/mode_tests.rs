//! Mode registry invariants: interning, structural equivalence under
//! postulation, union canonicalisation, well-formedness, derived views.

#![allow(clippy::unwrap_used)]

use a68core::modes::{ModeKind, ModeRegistry};
use a68core::base::Interner;

/// Structurally equivalent construction always interns to the same record.
#[test]
fn test_interning_is_canonical() {
    let mut reg = ModeRegistry::new();
    let mut names = Interner::new();

    let a = reg.ref_to(reg.std.int);
    let b = reg.ref_to(reg.std.int);
    assert_eq!(a, b);

    let p1 = reg.proc(vec![reg.std.int, reg.std.real], reg.std.bool_);
    let p2 = reg.proc(vec![reg.std.int, reg.std.real], reg.std.bool_);
    assert_eq!(p1, p2);

    let s1 = reg.structure(vec![
        (names.intern("re"), reg.std.real),
        (names.intern("im"), reg.std.real),
    ]);
    let s2 = reg.structure(vec![
        (names.intern("re"), reg.std.real),
        (names.intern("im"), reg.std.real),
    ]);
    assert_eq!(s1, s2);

    // Field selectors participate in equivalence
    let s3 = reg.structure(vec![
        (names.intern("x"), reg.std.real),
        (names.intern("im"), reg.std.real),
    ]);
    assert_ne!(s1, s3);
}

/// The registry never holds two distinct structurally equivalent modes
/// without linking them through the equivalent view.
#[test]
fn test_no_unlinked_duplicates() {
    let mut reg = ModeRegistry::new();
    let mut names = Interner::new();

    // Two isomorphic recursive declarations
    for tag in ["l", "m"] {
        let ind = reg.indicant(names.intern(tag));
        let r = reg.ref_to(ind);
        let s = reg.structure(vec![
            (names.intern("next"), r),
            (names.intern("val"), reg.std.int),
        ]);
        assert!(reg.bind_indicant(ind, s));
    }

    let ids: Vec<_> = reg.iter_ids().collect();
    for &a in &ids {
        for &b in &ids {
            if a < b && reg.structurally_equivalent(a, b) {
                let linked = reg[b].equivalent == Some(a)
                    || reg[a].equivalent == Some(b)
                    || reg[a].equivalent.is_some()
                    || reg[b].equivalent.is_some();
                assert!(
                    linked,
                    "{} and {} are equivalent but unlinked",
                    reg.display(a),
                    reg.display(b)
                );
            }
        }
    }
}

/// Scenario: `MODE L = STRUCT (REF L next, INT val)` is well-formed, and an
/// isomorphic distinct-name `MODE M` proves equivalent via postulation.
#[test]
fn test_cyclic_mode_equivalence_via_postulation() {
    let mut reg = ModeRegistry::new();
    let mut names = Interner::new();

    let l = reg.indicant(names.intern("l"));
    let ref_l = reg.ref_to(l);
    let s_l = reg.structure(vec![
        (names.intern("next"), ref_l),
        (names.intern("val"), reg.std.int),
    ]);
    assert!(reg.bind_indicant(l, s_l), "L is well-formed");
    assert!(reg[l].well_formed);

    let m = reg.indicant(names.intern("m"));
    let ref_m = reg.ref_to(m);
    let s_m = reg.structure(vec![
        (names.intern("next"), ref_m),
        (names.intern("val"), reg.std.int),
    ]);
    assert!(reg.bind_indicant(m, s_m));

    assert!(reg.structurally_equivalent(l, m));
    assert!(reg.structurally_equivalent(s_l, s_m));
    // A mode with a different field mode does not conflate
    let n = reg.indicant(names.intern("n"));
    let ref_n = reg.ref_to(n);
    let s_n = reg.structure(vec![
        (names.intern("next"), ref_n),
        (names.intern("val"), reg.std.real),
    ]);
    reg.bind_indicant(n, s_n);
    assert!(!reg.structurally_equivalent(s_l, s_n));
}

#[test]
fn test_self_mode_is_flagged_ill_formed() {
    let mut reg = ModeRegistry::new();
    let mut names = Interner::new();
    let t = reg.indicant(names.intern("t"));
    assert!(!reg.bind_indicant(t, t));
    assert!(!reg[t].well_formed);
    assert_eq!(reg[reg.underlying(t)].kind, ModeKind::Error);
}

#[test]
fn test_union_canonicalisation() {
    let mut reg = ModeRegistry::new();
    // Nested unions flatten and duplicates drop
    let inner = reg.union_of(vec![reg.std.int, reg.std.char_]);
    let u1 = reg.union_of(vec![reg.std.real, inner, reg.std.int]);
    let u2 = reg.union_of(vec![reg.std.char_, reg.std.int, reg.std.real]);
    assert_eq!(u1, u2);
    assert_eq!(reg[u1].pack.len(), 3);
    // Singletons collapse
    assert_eq!(reg.union_of(vec![reg.std.real]), reg.std.real);
}

#[test]
fn test_derived_views() {
    let mut reg = ModeRegistry::new();
    // STRING deflexes to [] CHAR
    assert_eq!(reg.deflexed(reg.std.string), reg.std.row_char);
    // Slicing a [,] consumes one dimension
    let mat = reg.row(2, reg.std.real);
    let row = reg.row(1, reg.std.real);
    assert_eq!(reg.slice_of(mat), Some(row));
    // A subscripted name yields a name of the element
    let ref_row = reg.ref_to(row);
    let ref_real = reg.ref_to(reg.std.real);
    assert_eq!(reg.name_of(ref_row), Some(ref_real));
    // Views are cached back-references
    assert_eq!(reg[ref_row].name, Some(ref_real));
}

#[test]
fn test_flags_propagate_through_recursion() {
    let mut reg = ModeRegistry::new();
    let mut names = Interner::new();
    let ind = reg.indicant(names.intern("chain"));
    let r = reg.ref_to(ind);
    let s = reg.structure(vec![
        (names.intern("tail"), r),
        (names.intern("text"), reg.std.string),
    ]);
    reg.bind_indicant(ind, s);
    assert!(reg[s].has_ref);
    assert!(reg[s].has_flex);
    assert!(reg[s].has_rows);
}
