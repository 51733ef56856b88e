//! Coercion insertion: the synthesised wrapper chains, idempotence, and
//! post-insertion well-typedness.

#![allow(clippy::unwrap_used)]

mod helpers;

use a68core::analyse;
use a68core::semantic::checker::{Checker, Expect};
use a68core::semantic::coercion::Sort;
use a68core::semantic::diagnostics::DiagnosticCollector;
use a68core::semantic::inserter::insert_coercions;
use a68core::syntax::{CallArg, CoercionKind, Construct, TreeBuilder};
use helpers::{assert_no_errors, coercion_chain, init_of};

/// Scenario: `INT i := 1; REAL r := i` wraps the source
/// `WIDENING(DEREFERENCING(i))`.
#[test]
fn test_widening_after_dereferencing() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let one = b.int_denot(1);
    let di = b.variable_decl("i", std.int, Some(one));
    let i = b.ident("i");
    let dr = b.variable_decl("r", std.real, Some(i));
    let root = b.serial(vec![di, dr]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_no_errors(&diags);

    let (kinds, base) = coercion_chain(&p.tree, init_of(&p.tree, dr));
    assert_eq!(
        kinds,
        vec![CoercionKind::Widening, CoercionKind::Dereferencing]
    );
    assert_eq!(base, i);
    // Each wrapper carries its step's mode
    let widening = init_of(&p.tree, dr);
    assert_eq!(p.tree[widening].mode, Some(std.real));
    let Construct::Coercion { operand, .. } = p.tree[widening].construct else {
        panic!("expected a coercion node");
    };
    assert_eq!(p.tree[operand].mode, Some(std.int));
}

/// Scenario: `PROC p = INT: 42; INT k := p` wraps the source
/// `DEPROCEDURING(p)`; the destination stays a REF INT name.
#[test]
fn test_deproceduring() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let routine = b.routine_text(&[], std.int, |b| b.int_denot(42));
    let proc_int = b.modes().proc(vec![], std.int);
    let dp = b.identity_decl("p", proc_int, routine);
    let pid = b.ident("p");
    let dk = b.variable_decl("k", std.int, Some(pid));
    let root = b.serial(vec![dp, dk]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_no_errors(&diags);

    let (kinds, base) = coercion_chain(&p.tree, init_of(&p.tree, dk));
    assert_eq!(kinds, vec![CoercionKind::Deproceduring]);
    assert_eq!(base, pid);
    let Construct::VariableDeclaration { tag, .. } = p.tree[dk].construct else {
        panic!("expected the declaration");
    };
    let ref_int = p.modes.ref_to(std.int);
    assert_eq!(p.tables[tag].mode, ref_int);
}

/// Scenario: a user-defined `OP + = (INT a, INT b) INT: a - b` wins over
/// the standard one, and the print argument is wrapped
/// `ROWING(UNITING(...))`.
#[test]
fn test_user_operator_and_print_argument() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let routine = b.routine_text(&[("a", std.int), ("b", std.int)], std.int, |b| {
        let a = b.ident("a");
        let bb = b.ident("b");
        b.dyadic("-", a, bb)
    });
    let opdecl = b.operator_decl("+", Some(6), routine);
    let one = b.int_denot(1);
    let two = b.int_denot(2);
    let f = b.dyadic("+", one, two);
    let print = b.ident("print");
    let call = b.call(print, vec![f]);
    let root = b.serial(vec![opdecl, call]);
    let env = b.env();
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_no_errors(&diags);

    // The formula resolves to the user-defined operator
    let Construct::OperatorDeclaration { tag: user_tag, .. } = p.tree[opdecl].construct else {
        panic!("expected the operator declaration");
    };
    assert_eq!(p.tree[f].tag, Some(user_tag));
    assert_eq!(p.tree[f].mode, Some(std.int));

    // print's argument: UNITING into SIMPLOUT, then ROWING to [] SIMPLOUT
    let Construct::Call { ref args, .. } = p.tree[call].construct else {
        panic!("expected the call");
    };
    let CallArg::Unit(arg) = args[0] else {
        panic!("expected a unit argument");
    };
    let (kinds, base) = coercion_chain(&p.tree, arg);
    assert_eq!(kinds, vec![CoercionKind::Rowing, CoercionKind::Uniting]);
    assert_eq!(base, f);
    assert_eq!(p.tree[arg].mode, Some(env.row_simplout));
    let Construct::Coercion { operand, .. } = p.tree[arg].construct else {
        panic!("expected the rowing node");
    };
    assert_eq!(p.tree[operand].mode, Some(env.simplout));
}

/// Scenario: `IF TRUE THEN 1 ELSE 3.14 FI` balances to REAL and the THEN
/// branch receives a WIDENING node.
#[test]
fn test_balanced_conditional_widens_then_branch() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let cond = b.bool_denot(true);
    let one = b.int_denot(1);
    let pi_ish = b.real_denot(3.14);
    let c = b.conditional(cond, one, Some(pi_ish));
    let mut p = b.finish(c);

    let mut diags = DiagnosticCollector::new(10);
    let mut checker = Checker::new(&mut p.tree, &mut p.modes, &mut p.tables, &mut diags, 3000);
    let yielded = checker.check(c, Expect::infer(Sort::Strong));
    assert_eq!(yielded, std.real);
    assert!(!diags.has_errors());

    let root = insert_coercions(&mut p.tree, &mut p.modes, &p.tables, c, std.real);
    assert_eq!(root, c, "an enclosed clause is never wrapped itself");
    let Construct::Conditional {
        then_part,
        else_part,
        ..
    } = p.tree[c].construct
    else {
        panic!("expected the conditional");
    };
    let (kinds, base) = coercion_chain(&p.tree, then_part);
    assert_eq!(kinds, vec![CoercionKind::Widening]);
    assert_eq!(base, one);
    let (kinds, _) = coercion_chain(&p.tree, else_part.unwrap());
    assert!(kinds.is_empty(), "the REAL branch needs no coercion");
    assert_eq!(p.tree[c].mode, Some(std.real));
}

/// A jump where PROC VOID is expected is procedured.
#[test]
fn test_jump_is_procedured_at_proc_void() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    b.declare_label("retry");
    let jump = b.jump("retry");
    let proc_void = b.modes().proc(vec![], std.void);
    let d = b.identity_decl("handler", proc_void, jump);
    let root = b.serial(vec![d]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_no_errors(&diags);
    let (kinds, base) = coercion_chain(&p.tree, helpers::source_of(&p.tree, d));
    assert_eq!(kinds, vec![CoercionKind::Proceduring]);
    assert_eq!(base, jump);
}

/// Voiding strips names first: a discarded formula value is voided, a
/// discarded assignation is dereferenced and voided.
#[test]
fn test_voiding_in_serial() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let one = b.int_denot(1);
    let two = b.int_denot(2);
    let f = b.dyadic("+", one, two);
    let dx = b.variable_decl("x", std.int, None);
    let x = b.ident("x");
    let three = b.int_denot(3);
    let asg = b.assign(x, three);
    let done = b.skip();
    let root = b.serial(vec![f, asg, done]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();

    let _ = diags;
    let Construct::Serial { ref units } = p.tree[root].construct else {
        panic!("expected the serial");
    };
    let (kinds, base) = coercion_chain(&p.tree, units[0]);
    assert_eq!(kinds, vec![CoercionKind::Voiding]);
    assert_eq!(base, f);
    let (kinds, base) = coercion_chain(&p.tree, units[1]);
    assert_eq!(
        kinds,
        vec![CoercionKind::Voiding, CoercionKind::Dereferencing]
    );
    assert_eq!(base, asg);
    // x's declaration slot holds dx between them; check nothing else moved
    let _ = dx;
}

/// Running the inserter a second time produces no further coercion nodes.
#[test]
fn test_inserter_is_idempotent() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let one = b.int_denot(1);
    let di = b.variable_decl("i", std.int, Some(one));
    let i = b.ident("i");
    let dr = b.variable_decl("r", std.real, Some(i));
    let pr = b.ident("print");
    let i2 = b.ident("i");
    let call = b.call(pr, vec![i2]);
    let root = b.serial(vec![di, dr, call]);
    let mut p = b.finish(root);

    let mut diags = DiagnosticCollector::new(10);
    let mut checker = Checker::new(&mut p.tree, &mut p.modes, &mut p.tables, &mut diags, 3000);
    checker.check(root, Expect::strong(std.void));
    assert!(!diags.has_errors());

    let root1 = insert_coercions(&mut p.tree, &mut p.modes, &p.tables, root, std.void);
    let after_first = p.tree.len();
    let root2 = insert_coercions(&mut p.tree, &mut p.modes, &p.tables, root1, std.void);
    assert_eq!(p.tree.len(), after_first, "no new nodes on the second run");
    assert_eq!(root1, root2);
}

/// After insertion, every operator/call/assignation child yields exactly
/// (id-equal) the expected operand mode; no implicit conversion remains.
#[test]
fn test_post_insertion_well_typedness() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let one = b.int_denot(1);
    let di = b.variable_decl("i", std.int, Some(one));
    let i = b.ident("i");
    let half = b.real_denot(0.5);
    let f = b.dyadic("+", i, half);
    let dr = b.variable_decl("r", std.real, Some(f));
    let r = b.ident("r");
    let i2 = b.ident("i");
    let asg = b.assign(r, i2);
    let pr = b.ident("print");
    let s = b.string_denot("done");
    let call = b.call(pr, vec![s]);
    let root = b.serial(vec![di, dr, asg, call]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_no_errors(&diags);

    for id in p.tree.iter_ids() {
        match &p.tree[id].construct {
            Construct::Formula { lhs, rhs, .. } => {
                let Some(tag) = p.tree[id].tag else { continue };
                let op_mode = p.tables[tag].mode;
                let params: Vec<_> = p.modes[op_mode].pack.iter().map(|e| e.mode).collect();
                let operands: Vec<_> = lhs.iter().copied().chain([*rhs]).collect();
                for (o, want) in operands.iter().zip(params.iter()) {
                    assert_eq!(p.tree[*o].mode, Some(*want), "formula operand mismatch");
                }
            }
            Construct::Assignation { dst, src } => {
                let name_mode = p.tree[id].mode.unwrap();
                assert_eq!(p.tree[*dst].mode, Some(name_mode));
                let referend = p.modes[name_mode].sub.unwrap();
                let got = p.tree[*src].mode.unwrap();
                assert!(
                    got == referend || p.modes.modes_equal(got, referend, a68core::DeflexPolicy::Skip),
                    "assignation source mismatch"
                );
            }
            Construct::Call { primary, args } => {
                let pv = p.modes.meek_to_value(p.tree[*primary].mode.unwrap());
                if p.modes[p.modes.underlying(pv)].pack.len() != args.len() {
                    continue;
                }
                let params: Vec<_> = p.modes[p.modes.underlying(pv)]
                    .pack
                    .iter()
                    .map(|e| e.mode)
                    .collect();
                for (a, want) in args.iter().zip(params.iter()) {
                    if let CallArg::Unit(u) = a {
                        let got = p.tree[*u].mode.unwrap();
                        assert!(
                            got == *want
                                || p.modes.modes_equal(got, *want, a68core::DeflexPolicy::Skip),
                            "call argument mismatch"
                        );
                    }
                }
            }
            _ => {}
        }
    }
}

/// Rowing a name: `REF [] INT v; v := i` style promotion through NAME.
#[test]
fn test_rowing_through_name() {
    let mut b = TreeBuilder::new();
    let std = b.std();
    let row_int = b.modes().row(1, std.int);
    let di = b.variable_decl("i", std.int, None);
    // [] INT v := i: the name is dereferenced, then the value rowed
    let i = b.ident("i");
    let dv = b.variable_decl("v", row_int, Some(i));
    let root = b.serial(vec![di, dv]);
    let mut p = b.finish(root);
    let diags = analyse(&mut p).unwrap();
    assert_no_errors(&diags);
    let (kinds, _) = coercion_chain(&p.tree, init_of(&p.tree, dv));
    assert_eq!(
        kinds,
        vec![CoercionKind::Rowing, CoercionKind::Dereferencing]
    );
}
