//! Static scope analysis: youngest environs, scope assignment, escapes and
//! transient names.

#![allow(clippy::unwrap_used)]

mod helpers;

use a68core::analyse;
use a68core::syntax::{Construct, Heap, TreeBuilder};
use helpers::{assert_has_code, assert_no_errors};

/// Scenario: `REF INT r = LOC INT := 0; PROC f = REF INT: r` — the routine
/// text's youngest environ is the lexical level of `r`; exporting the name
/// it yields into a younger frame is rejected.
#[test]
fn test_routine_youngest_environ_and_escape() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let ref_int = b.modes().ref_to(std.int);

    // REF INT r = LOC INT := 0, at level 1
    let r#gen = b.generator(Heap::Loc, std.int);
    let zero = b.int_denot(0);
    let ginit = b.assign(r#gen, zero);
    let dr = b.identity_decl("r", ref_int, ginit);

    // PROC f = REF INT: r
    let routine = b.routine_text(&[], ref_int, |b| b.ident("r"));
    let proc_ref_int = b.modes().proc(vec![], ref_int);
    let df = b.identity_decl("f", proc_ref_int, routine);

    // REF INT rr, at level 1
    let drr = b.variable_decl("rr", ref_int, None);

    // Deeper: rr := LOC REF INT := f
    b.enter();
    let inner_gen = b.generator(Heap::Loc, ref_int);
    let fid = b.ident("f");
    let fcall = b.call(fid, vec![]);
    let inner_asg = b.assign(inner_gen, fcall);
    let rr = b.ident("rr");
    let outer_asg = b.assign(rr, inner_asg);
    let deep = b.serial(vec![outer_asg]);
    b.exit();

    let root = b.serial(vec![dr, df, drr, deep]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();

    // The routine captured r at level 1
    assert_eq!(p.tree[routine].scope, Some(1));
    let Construct::IdentityDeclaration { tag: f_tag, .. } = p.tree[df].construct else {
        panic!("expected f's declaration");
    };
    assert!(p.tables[f_tag].scope_assigned);
    assert_eq!(p.tables[f_tag].scope, 1);
    assert_eq!(p.tables[f_tag].youngest_environ, Some(1));

    // The level-2 generator escapes into the level-1 name rr
    assert_has_code(&diags, "ERROR_SCOPE_DYNAMIC");
}

/// For every `T x = expr` the identifier's scope never exceeds the
/// youngest scope of the source.
#[test]
fn test_identity_declaration_scope_is_bounded_by_source() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let ref_int = b.modes().ref_to(std.int);

    let r#gen = b.generator(Heap::Loc, std.int);
    let zero = b.int_denot(0);
    let ginit = b.assign(r#gen, zero);
    let da = b.identity_decl("a", ref_int, ginit);

    // A plain value only references the standard environ
    let one = b.int_denot(1);
    let db = b.identity_decl("b", std.int, one);

    let root = b.serial(vec![da, db]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_no_errors(&diags);

    for decl in [da, db] {
        let Construct::IdentityDeclaration { tag, source } = p.tree[decl].construct else {
            continue;
        };
        assert!(p.tables[tag].scope_assigned);
        let _ = source;
    }
    let Construct::IdentityDeclaration { tag: a_tag, .. } = p.tree[da].construct else {
        unreachable!()
    };
    assert_eq!(p.tables[a_tag].scope, 1);
    let Construct::IdentityDeclaration { tag: b_tag, .. } = p.tree[db].construct else {
        unreachable!()
    };
    // Standard-environ-only sources carry the primal scope
    assert_eq!(p.tables[b_tag].scope, 0);
}

#[test]
fn test_heap_generator_has_primal_scope() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let ref_int = b.modes().ref_to(std.int);
    let dr = b.variable_decl("keep", ref_int, None);

    b.enter();
    let r#gen = b.generator(Heap::Heap, std.int);
    let keep = b.ident("keep");
    let asg = b.assign(keep, r#gen);
    let deep = b.serial(vec![asg]);
    b.exit();

    let root = b.serial(vec![dr, deep]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    // HEAP escapes nothing; no scope error
    assert_no_errors(&diags);
}

#[test]
fn test_loc_generator_escape_is_rejected() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let ref_int = b.modes().ref_to(std.int);
    let dr = b.variable_decl("keep", ref_int, None);

    b.enter();
    let r#gen = b.generator(Heap::Loc, std.int);
    let keep = b.ident("keep");
    let asg = b.assign(keep, r#gen);
    let deep = b.serial(vec![asg]);
    b.exit();

    let root = b.serial(vec![dr, deep]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_has_code(&diags, "ERROR_SCOPE_DYNAMIC");
}

/// Storing an element of a flexible name is rejected: its bounds may move.
#[test]
fn test_transient_name_rejected() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let ref_char = b.modes().ref_to(std.char_);
    let ds = b.variable_decl("s", std.string, None);
    let s = b.ident("s");
    let one = b.int_denot(1);
    let sl = b.slice(s, vec![one]);
    let dc = b.identity_decl("c", ref_char, sl);
    let root = b.serial(vec![ds, dc]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_has_code(&diags, "ERROR_TRANSIENT_NAME");
}

/// A fixed row's element is not transient.
#[test]
fn test_fixed_row_element_is_not_transient() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let row_char = b.modes().row(1, std.char_);
    let ref_char = b.modes().ref_to(std.char_);
    let ds = b.variable_decl("s", row_char, None);
    let s = b.ident("s");
    let one = b.int_denot(1);
    let sl = b.slice(s, vec![one]);
    let dc = b.identity_decl("c", ref_char, sl);
    let root = b.serial(vec![ds, dc]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_no_errors(&diags);
}

/// A destination whose scope the analyser cannot see statically is marked
/// for a dynamic check instead of rejected.
#[test]
fn test_unknown_destination_marks_need_dns() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let ref_int = b.modes().ref_to(std.int);

    // PROC pick = REF INT: ... some name ...
    let dv = b.variable_decl("v", std.int, None);
    let routine = b.routine_text(&[], ref_int, |b| b.ident("v"));
    let proc_ref_int = b.modes().proc(vec![], ref_int);
    let dp = b.identity_decl("pick", proc_ref_int, routine);

    // pick := LOC INT  — the destination name comes out of a call
    b.enter();
    let pick = b.ident("pick");
    let target = b.call(pick, vec![]);
    let r#gen = b.generator(Heap::Loc, std.int);
    let asg = b.assign(target, r#gen);
    let deep = b.serial(vec![asg]);
    b.exit();

    let root = b.serial(vec![dv, dp, deep]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_has_code(&diags, "WARNING_SCOPE_STATIC");
    assert!(p.tree[asg].need_dns, "the interpreter must verify at run time");
}

/// Serial units get the interruptible marker for the runtime debugger.
#[test]
fn test_units_are_marked_interruptible() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let one = b.int_denot(1);
    let d = b.variable_decl("x", std.int, Some(one));
    let skip = b.skip();
    let root = b.serial(vec![d, skip]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_no_errors(&diags);
    assert!(p.tree[d].interruptible);
    assert!(p.tree[skip].interruptible);
}

/// Every identifier ends the analysis with a scope assigned.
#[test]
fn test_all_identifiers_scope_assigned() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let one = b.int_denot(1);
    let d1 = b.variable_decl("x", std.int, Some(one));
    let x = b.ident("x");
    let d2 = b.identity_decl("y", std.int, x);
    let root = b.serial(vec![d1, d2]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_no_errors(&diags);
    for i in 0..p.tables.tag_count() {
        let tag = a68core::TagId::new(i);
        if p.tables[tag].kind == a68core::semantic::symbol_table::TagKind::Identifier {
            assert!(
                p.tables[tag].scope_assigned,
                "identifier {} has no scope",
                p.tables[tag].name
            );
        }
    }
}
