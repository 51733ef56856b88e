//! The coercion inserter: a second walk that materialises every coercion
//! the checker relied on as explicit tree nodes, so the interpreter
//! dispatches purely on DEREFERENCING / DEPROCEDURING / UNITING / WIDENING /
//! ROWING / VOIDING / PROCEDURING markers and never infers types at run
//! time.
//!
//! Wrappers nest value-first: deproceduring and dereferencing innermost,
//! then uniting or stepwise widening (mutually exclusive under the strong
//! sequence), then rowing, then voiding outermost. The inserter never
//! produces a redundant step, so running it twice inserts nothing new.

use crate::base::NodeId;
use crate::modes::{ModeId, ModeKind, ModeRegistry};
use crate::syntax::{CallArg, CoercionKind, Construct, Indexer, Info, Tree};

use super::coercion::{DeflexPolicy, Sort};
use super::symbol_table::Tables;

pub struct Inserter<'a> {
    tree: &'a mut Tree,
    reg: &'a mut ModeRegistry,
    tabs: &'a Tables,
}

/// Insert coercion nodes below `root`, which stands in a STRONG `target`
/// position. Returns the possibly-wrapped root.
pub fn insert_coercions(
    tree: &mut Tree,
    reg: &mut ModeRegistry,
    tabs: &Tables,
    root: NodeId,
    target: ModeId,
) -> NodeId {
    Inserter { tree, reg, tabs }.coerce(root, target)
}

impl Inserter<'_> {
    fn mode_of(&self, n: NodeId) -> ModeId {
        self.tree[n].mode.unwrap_or(self.reg.std.error)
    }

    /// Descend without a new requirement: the node's own mode is the
    /// target, so no wrapper is added and only the interior is rewritten.
    fn neutral(&mut self, n: NodeId) -> NodeId {
        let t = self.mode_of(n);
        self.coerce(n, t)
    }

    /// Coerce a unit toward `target`, rewriting its interior first.
    ///
    /// Enclosed clauses never get wrapped themselves; the requirement is
    /// propagated to the units inside them, which is where the coercions of
    /// a clause land.
    fn coerce(&mut self, n: NodeId, target: ModeId) -> NodeId {
        let construct = self.tree[n].construct.clone();
        match construct {
            Construct::Serial { units } => {
                let void = self.reg.std.void;
                let mut new_units = Vec::with_capacity(units.len());
                if let Some((&last, rest)) = units.split_last() {
                    for &u in rest {
                        new_units.push(self.coerce(u, void));
                    }
                    new_units.push(self.coerce(last, target));
                }
                self.tree[n].construct = Construct::Serial { units: new_units };
                self.tree[n].mode = Some(target);
                n
            }
            Construct::Conditional {
                condition,
                then_part,
                else_part,
            } => {
                let bool_ = self.reg.std.bool_;
                let condition = self.coerce_meek(condition, bool_);
                let then_part = self.coerce(then_part, target);
                let else_part = else_part.map(|e| self.coerce(e, target));
                self.tree[n].construct = Construct::Conditional {
                    condition,
                    then_part,
                    else_part,
                };
                self.tree[n].mode = Some(target);
                n
            }
            Construct::CaseClause {
                enquiry,
                branches,
                out_part,
            } => {
                let int = self.reg.std.int;
                let enquiry = self.coerce_meek(enquiry, int);
                let branches = branches.iter().map(|&b| self.coerce(b, target)).collect();
                let out_part = out_part.map(|o| self.coerce(o, target));
                self.tree[n].construct = Construct::CaseClause {
                    enquiry,
                    branches,
                    out_part,
                };
                self.tree[n].mode = Some(target);
                n
            }
            Construct::Conformity {
                enquiry,
                mut alternatives,
                out_part,
            } => {
                let ey = self.mode_of(enquiry);
                let ev = self.reg.meek_to_value(ey);
                let enquiry = if self.reg[self.reg.underlying(ev)].kind == ModeKind::Union {
                    self.coerce_meek(enquiry, ev)
                } else {
                    self.neutral(enquiry)
                };
                for alt in &mut alternatives {
                    alt.body = self.coerce(alt.body, target);
                }
                let out_part = out_part.map(|o| self.coerce(o, target));
                self.tree[n].construct = Construct::Conformity {
                    enquiry,
                    alternatives,
                    out_part,
                };
                self.tree[n].mode = Some(target);
                n
            }
            Construct::Collateral { units } => {
                self.coerce_collateral(n, &units, target);
                n
            }
            _ => {
                self.rewrite_interior(n, construct);
                self.wrap_chain(n, target)
            }
        }
    }

    /// A MEEK position: dereference to the value, no widening or rowing.
    fn coerce_meek(&mut self, n: NodeId, target: ModeId) -> NodeId {
        self.coerce(n, target)
    }

    fn coerce_collateral(&mut self, n: NodeId, units: &[NodeId], target: ModeId) {
        let void = self.reg.std.void;
        let new_units: Vec<NodeId> = if self.reg.underlying(target) == void {
            units.iter().map(|&u| self.coerce(u, void)).collect()
        } else {
            let td = self.reg.deflexed(target);
            let tu = self.reg.underlying(td);
            match self.reg[tu].kind {
                ModeKind::Row | ModeKind::Flex => {
                    let elem = self.reg.slice_of(tu).unwrap_or(self.reg.std.error);
                    units.iter().map(|&u| self.coerce(u, elem)).collect()
                }
                ModeKind::Struct if self.reg[tu].pack.len() == units.len() => {
                    let fields: Vec<ModeId> = self.reg[tu].pack.iter().map(|e| e.mode).collect();
                    units
                        .iter()
                        .zip(fields)
                        .map(|(&u, f)| self.coerce(u, f))
                        .collect()
                }
                _ => units.iter().map(|&u| self.neutral(u)).collect(),
            }
        };
        self.tree[n].construct = Construct::Collateral { units: new_units };
        self.tree[n].mode = Some(target);
    }

    /// Rewrite the children of a non-enclosed construct against the
    /// expectations the checker annotated.
    fn rewrite_interior(&mut self, n: NodeId, construct: Construct) {
        match construct {
            Construct::Denotation { .. }
            | Construct::Identifier { .. }
            | Construct::Generator { .. }
            | Construct::Nihil
            | Construct::Skip
            | Construct::Jump { .. } => {}
            Construct::Assignation { dst, src } => {
                let name_mode = self.mode_of(n);
                let (dst, src) =
                    if self.reg[self.reg.underlying(name_mode)].kind == ModeKind::Ref {
                        let t = self.reg[name_mode].sub.unwrap_or(self.reg.std.error);
                        (self.coerce(dst, name_mode), self.coerce(src, t))
                    } else {
                        (self.neutral(dst), self.neutral(src))
                    };
                self.tree[n].construct = Construct::Assignation { dst, src };
            }
            Construct::IdentityRelation { negated, lhs, rhs } => {
                let lt = self.soft_target(lhs);
                let rt = self.soft_target(rhs);
                let lhs = self.coerce(lhs, lt);
                let rhs = self.coerce(rhs, rt);
                self.tree[n].construct = Construct::IdentityRelation { negated, lhs, rhs };
            }
            Construct::Formula { op, lhs, rhs } => {
                let params: Option<Vec<ModeId>> = self.tree[n].tag.map(|tag| {
                    let mode = self.tabs[tag].mode;
                    self.reg[mode].pack.iter().map(|e| e.mode).collect()
                });
                let (lhs, rhs) = match (params, lhs) {
                    (Some(params), Some(l)) if params.len() == 2 => (
                        Some(self.coerce(l, params[0])),
                        self.coerce(rhs, params[1]),
                    ),
                    (Some(params), None) if params.len() == 1 => {
                        (None, self.coerce(rhs, params[0]))
                    }
                    (_, l) => (l.map(|l| self.neutral(l)), self.neutral(rhs)),
                };
                self.tree[n].construct = Construct::Formula { op, lhs, rhs };
            }
            Construct::Call { primary, args } => {
                let pv = self.reg.meek_to_value(self.mode_of(primary));
                let pu = self.reg.underlying(pv);
                if self.reg[pu].kind == ModeKind::Proc
                    && self.reg[pu].pack.len() == args.len()
                {
                    let params: Vec<ModeId> = self.reg[pu].pack.iter().map(|e| e.mode).collect();
                    let primary = self.coerce(primary, pv);
                    let args = args
                        .iter()
                        .zip(params)
                        .map(|(a, p)| match a {
                            CallArg::Unit(u) => CallArg::Unit(self.coerce(*u, p)),
                            CallArg::Skip => CallArg::Skip,
                        })
                        .collect();
                    self.tree[n].construct = Construct::Call { primary, args };
                } else {
                    let primary = self.neutral(primary);
                    let args = args
                        .iter()
                        .map(|a| match a {
                            CallArg::Unit(u) => CallArg::Unit(self.neutral(*u)),
                            CallArg::Skip => CallArg::Skip,
                        })
                        .collect();
                    self.tree[n].construct = Construct::Call { primary, args };
                }
            }
            Construct::Slice { primary, indexers } => {
                let int = self.reg.std.int;
                let primary = match self.reg.weak_to_row(self.mode_of(primary)) {
                    Some((stratum, _)) => self.coerce(primary, stratum),
                    None => self.neutral(primary),
                };
                let indexers = indexers
                    .into_iter()
                    .map(|ix| match ix {
                        Indexer::Subscript(u) => Indexer::Subscript(self.coerce(u, int)),
                        Indexer::Trimmer { lower, upper } => Indexer::Trimmer {
                            lower: lower.map(|l| self.coerce(l, int)),
                            upper: upper.map(|u| self.coerce(u, int)),
                        },
                    })
                    .collect();
                self.tree[n].construct = Construct::Slice { primary, indexers };
            }
            Construct::Selection { field, secondary } => {
                let secondary = match self.reg.weak_to_struct(self.mode_of(secondary)) {
                    Some((stratum, _, _)) => self.coerce(secondary, stratum),
                    None => self.neutral(secondary),
                };
                self.tree[n].construct = Construct::Selection { field, secondary };
            }
            Construct::Loop {
                from,
                by,
                to,
                while_part,
                body,
            } => {
                let int = self.reg.std.int;
                let bool_ = self.reg.std.bool_;
                let void = self.reg.std.void;
                let from = from.map(|u| self.coerce(u, int));
                let by = by.map(|u| self.coerce(u, int));
                let to = to.map(|u| self.coerce(u, int));
                let while_part = while_part.map(|u| self.coerce(u, bool_));
                let body = self.coerce(body, void);
                self.tree[n].construct = Construct::Loop {
                    from,
                    by,
                    to,
                    while_part,
                    body,
                };
            }
            Construct::Parallel { units } => {
                let void = self.reg.std.void;
                let units = units.iter().map(|&u| self.coerce(u, void)).collect();
                self.tree[n].construct = Construct::Parallel { units };
            }
            Construct::RoutineText { proc_mode, body } => {
                let yields = self.reg[proc_mode].sub.unwrap_or(self.reg.std.void);
                let body = self.coerce(body, yields);
                self.tree[n].construct = Construct::RoutineText { proc_mode, body };
            }
            Construct::FormatText { mut items } => {
                for item in &mut items {
                    let target = match item.kind {
                        crate::syntax::FormatItemKind::Replicator => self.reg.std.int,
                        crate::syntax::FormatItemKind::Pattern => self.reg.std.format,
                        crate::syntax::FormatItemKind::General => {
                            let int = self.reg.std.int;
                            self.reg.row(1, int)
                        }
                    };
                    item.unit = self.coerce(item.unit, target);
                }
                self.tree[n].construct = Construct::FormatText { items };
            }
            Construct::Cast { declarer, enclosed } => {
                let enclosed = self.coerce(enclosed, declarer);
                self.tree[n].construct = Construct::Cast { declarer, enclosed };
            }
            Construct::Assertion { enquiry } => {
                let bool_ = self.reg.std.bool_;
                let enquiry = self.coerce(enquiry, bool_);
                self.tree[n].construct = Construct::Assertion { enquiry };
            }
            Construct::IdentityDeclaration { tag, source } => {
                let t = self.tabs[tag].mode;
                let source = self.coerce(source, t);
                self.tree[n].construct = Construct::IdentityDeclaration { tag, source };
            }
            Construct::VariableDeclaration { tag, heap, init } => {
                let name_mode = self.tabs[tag].mode;
                let t = self.reg[self.reg.underlying(name_mode)]
                    .sub
                    .unwrap_or(self.reg.std.error);
                let init = init.map(|i| self.coerce(i, t));
                self.tree[n].construct = Construct::VariableDeclaration { tag, heap, init };
            }
            Construct::OperatorDeclaration { tag, routine } => {
                let t = self.tabs[tag].mode;
                let routine = self.coerce(routine, t);
                self.tree[n].construct = Construct::OperatorDeclaration { tag, routine };
            }
            Construct::Coercion { kind, operand } => {
                let operand = self.neutral(operand);
                self.tree[n].construct = Construct::Coercion { kind, operand };
            }
            Construct::Serial { .. }
            | Construct::Conditional { .. }
            | Construct::CaseClause { .. }
            | Construct::Conformity { .. }
            | Construct::Collateral { .. } => {
                // Enclosed clauses are rewritten in coerce()
            }
        }
    }

    fn wrap(&mut self, n: NodeId, kind: CoercionKind, mode: ModeId) -> NodeId {
        let info = Info {
            span: self.tree[n].info.span,
            symbol: None,
        };
        let table = self.tree[n].table;
        let id = self
            .tree
            .alloc(Construct::Coercion { kind, operand: n }, info, table);
        self.tree[id].mode = Some(mode);
        id
    }

    /// The canonical chain from the node's yield to `target`: depref steps,
    /// then unite or stepwise widen, then row, then void.
    fn wrap_chain(&mut self, n: NodeId, target: ModeId) -> NodeId {
        let p = self.mode_of(n);
        if p == target {
            return n;
        }
        let pu = self.reg.underlying(p);
        let tu = self.reg.underlying(target);
        if self.reg[pu].kind == ModeKind::Error || self.reg[tu].kind == ModeKind::Error {
            return n;
        }
        // Mere deflexing needs no marker; the runtime representation is
        // shared
        if self.reg.modes_equal(p, target, DeflexPolicy::Skip) {
            return n;
        }
        // Jumps, SKIP and NIL adopt the context's mode; a jump at PROC VOID
        // is procedured
        if self.reg[pu].kind == ModeKind::Hip {
            let is_jump = matches!(self.tree[n].construct, Construct::Jump { .. });
            let proc_void = self.reg[tu].is_parameterless_proc()
                && self.reg[tu].sub == Some(self.reg.std.void);
            if is_jump && proc_void {
                return self.wrap(n, CoercionKind::Proceduring, target);
            }
            self.tree[n].mode = Some(target);
            return n;
        }
        // Voiding, with names and procs stripped first
        if tu == self.reg.std.void {
            return self.wrap_voiding(n, p);
        }
        // Uniting, after depreffing to the member mode
        if self.reg[tu].kind == ModeKind::Union {
            let chain = self.reg.depref_chain(p);
            for d in chain {
                if self.reg.unitable(d, target, DeflexPolicy::Force) {
                    let inner = self.wrap_depref_to(n, d);
                    return self.wrap(inner, CoercionKind::Uniting, target);
                }
            }
        }
        // Widening, one step at a time, from the first depreffed stage that
        // reaches the target
        let chain = self.reg.depref_chain(p);
        for d in chain {
            if self.reg.widens_to(d, target) {
                let mut cur = self.wrap_depref_to(n, d);
                let mut cm = d;
                let goal = self.reg.deflexed(target);
                while self.reg.deflexed(cm) != goal {
                    let Some(next) = self.reg.widen_step(cm, target) else {
                        break;
                    };
                    cur = self.wrap(cur, CoercionKind::Widening, next);
                    cm = next;
                }
                return cur;
            }
        }
        // Plain depreffing down to the target stratum
        let chain = self.reg.depref_chain(p);
        for &d in chain.iter().skip(1) {
            if d == target || self.reg.modes_equal(d, target, DeflexPolicy::Skip) {
                return self.wrap_depref_to(n, d);
            }
        }
        // Rowing, rebuilding through NAME or SUB one level at a time
        if let Some(src) = self.reg.row_source(target) {
            if self.reg.coercible(p, src, Sort::Strong, DeflexPolicy::Skip) {
                let inner = self.wrap_chain(n, src);
                return self.wrap(inner, CoercionKind::Rowing, target);
            }
        }
        // The checker already reported this position; leave the tree intact
        n
    }

    fn wrap_voiding(&mut self, n: NodeId, p: ModeId) -> NodeId {
        let mut cur = n;
        let mut cm = p;
        loop {
            let u = self.reg.underlying(cm);
            if self.reg[u].is_ref() || self.reg[u].is_parameterless_proc() {
                let Some(sub) = self.reg[u].sub else { break };
                let kind = if self.reg[u].is_ref() {
                    CoercionKind::Dereferencing
                } else {
                    CoercionKind::Deproceduring
                };
                cur = self.wrap(cur, kind, sub);
                cm = sub;
            } else {
                break;
            }
        }
        if self.reg.underlying(cm) != self.reg.std.void {
            cur = self.wrap(cur, CoercionKind::Voiding, self.reg.std.void);
        }
        cur
    }

    fn wrap_depref_to(&mut self, n: NodeId, d: ModeId) -> NodeId {
        let mut cur = n;
        let mut cm = self.mode_of(n);
        while cm != d && !self.reg.modes_equal(cm, d, DeflexPolicy::Skip) {
            let u = self.reg.underlying(cm);
            let Some(sub) = self.reg[u].sub else { break };
            let kind = if self.reg[u].is_ref() {
                CoercionKind::Dereferencing
            } else if self.reg[u].is_parameterless_proc() {
                CoercionKind::Deproceduring
            } else {
                break;
            };
            cur = self.wrap(cur, kind, sub);
            cm = sub;
        }
        cur
    }

    /// The identity-relation sides coerce softly to their name stratum.
    fn soft_target(&mut self, side: NodeId) -> ModeId {
        let y = self.mode_of(side);
        self.reg.soft_to_name(y).unwrap_or(y)
    }
}
