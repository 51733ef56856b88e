//! The mode checker: one walk over the tree that computes the yielded mode
//! of every construct against the context it stands in, resolves identifier
//! and operator tags, and reports ill-typed constructs.
//!
//! The context is an immutable [`Expect`] threaded top-down; the yielded
//! mode travels bottom-up as the return value of [`Checker::check`]. A
//! position whose required mode is not yet known (an operand, a branch of a
//! clause to be balanced) passes `mode: None` and receives the raw yield.

use tracing::trace;

use crate::base::{NodeId, Span};
use crate::modes::{ModeId, ModeKind, ModeRegistry};
use crate::syntax::{CallArg, Construct, DenotKind, Indexer, Tree};

use super::balance::balance;
use super::coercion::{DeflexPolicy, Sort, StructView};
use super::diagnostics::{DiagnosticCollector, DiagnosticKind};
use super::operators::{self, OperatorFailure};
use super::symbol_table::Tables;

/// The expected SOID of a position: required strength, required mode when
/// known, and whether the context is an explicit cast (which silences the
/// voiding warning).
#[derive(Debug, Clone, Copy)]
pub struct Expect {
    pub sort: Sort,
    pub mode: Option<ModeId>,
    pub cast: bool,
    /// Construct-class attribute of the context, for diagnostic selection
    pub attribute: &'static str,
}

impl Expect {
    pub fn new(sort: Sort, mode: Option<ModeId>) -> Self {
        Self {
            sort,
            mode,
            cast: false,
            attribute: "",
        }
    }

    pub fn strong(mode: ModeId) -> Self {
        Self::new(Sort::Strong, Some(mode))
    }

    /// A value is welcome but no particular mode is required yet.
    pub fn infer(sort: Sort) -> Self {
        Self::new(sort, None)
    }

    pub fn with_attribute(mut self, attribute: &'static str) -> Self {
        self.attribute = attribute;
        self
    }

    fn with_cast(mut self) -> Self {
        self.cast = true;
        self
    }
}

pub struct Checker<'a> {
    pub tree: &'a mut Tree,
    pub reg: &'a mut ModeRegistry,
    pub tabs: &'a mut Tables,
    pub diags: &'a mut DiagnosticCollector,
    depth: u32,
    depth_limit: u32,
    overflow_reported: bool,
}

impl<'a> Checker<'a> {
    pub fn new(
        tree: &'a mut Tree,
        reg: &'a mut ModeRegistry,
        tabs: &'a mut Tables,
        diags: &'a mut DiagnosticCollector,
        depth_limit: u32,
    ) -> Self {
        Self {
            tree,
            reg,
            tabs,
            diags,
            depth: 0,
            depth_limit,
            overflow_reported: false,
        }
    }

    fn at(&self, n: NodeId) -> Span {
        self.tree[n].info.span
    }

    fn emit(&mut self, kind: DiagnosticKind, n: NodeId) {
        self.diags.add(kind, self.at(n));
    }

    /// Check one unit against its context and return its resolved mode.
    pub fn check(&mut self, n: NodeId, ex: Expect) -> ModeId {
        self.depth += 1;
        if self.depth >= self.depth_limit {
            if !self.overflow_reported {
                self.emit(DiagnosticKind::StackOverflow { depth: self.depth }, n);
                self.overflow_reported = true;
            }
            self.depth -= 1;
            self.tree[n].mode = Some(self.reg.std.error);
            return self.reg.std.error;
        }
        let yielded = self.check_construct(n, ex);
        self.tree[n].mode = Some(yielded);
        let conformed = self.conform(n, yielded, ex);
        self.depth -= 1;
        conformed
    }

    /// The final SOID comparison: the yielded mode must be coercible to the
    /// expected one, or ERROR_CANNOT_COERCE is reported and the construct's
    /// mode becomes the error mode (suppressing cascades upward).
    fn conform(&mut self, n: NodeId, yielded: ModeId, ex: Expect) -> ModeId {
        if self.reg[self.reg.underlying(yielded)].kind == ModeKind::Hip
            && matches!(ex.sort, Sort::Weak | Sort::Meek | Sort::Firm)
        {
            let class = self.tree[n].construct.class();
            self.emit(DiagnosticKind::Hip { construct: class }, n);
        }
        let Some(q) = ex.mode else {
            return yielded;
        };
        if self.reg.coercible(yielded, q, ex.sort, DeflexPolicy::Safe) {
            self.warn_voided(n, yielded, q, ex);
            return yielded;
        }
        // When only flexibility stands in the way of a call argument, name
        // the aliasing problem rather than a generic refusal
        if ex.attribute == "call"
            && ex.sort == Sort::Strong
            && self.reg.coercible(yielded, q, Sort::Strong, DeflexPolicy::Skip)
        {
            self.emit(
                DiagnosticKind::NoFlexArgument {
                    yielded,
                    expected: q,
                },
                n,
            );
        } else {
            let component = self.reg.cannot_coerce_component(yielded, q, DeflexPolicy::Safe);
            let class = self.tree[n].construct.class();
            self.emit(
                DiagnosticKind::CannotCoerce {
                    yielded,
                    expected: q,
                    sort: ex.sort,
                    construct: class,
                    component,
                },
                n,
            );
        }
        self.tree[n].mode = Some(self.reg.std.error);
        self.reg.std.error
    }

    /// A non-VOID, non-PROC, non-name value silently discarded outside a
    /// cast draws WARNING_VOIDED.
    fn warn_voided(&mut self, n: NodeId, yielded: ModeId, q: ModeId, ex: Expect) {
        if ex.cast || self.reg.underlying(q) != self.reg.std.void {
            return;
        }
        if self.reg.is_bottom(yielded) {
            return;
        }
        let u = self.reg.underlying(yielded);
        if matches!(
            self.reg[u].kind,
            ModeKind::Ref | ModeKind::Proc | ModeKind::Standard(crate::modes::Standard::Void)
        ) {
            return;
        }
        self.emit(DiagnosticKind::Voided { mode: yielded }, n);
    }

    fn check_construct(&mut self, n: NodeId, ex: Expect) -> ModeId {
        let construct = self.tree[n].construct.clone();
        match construct {
            Construct::Denotation { ref kind, .. } => self.denoted_mode(kind),
            Construct::Identifier { name } => {
                let table = self.tree[n].table;
                match self.tabs.lookup_identifier(table, &name) {
                    Some(tag) => {
                        self.tree[n].tag = Some(tag);
                        self.tabs[tag].mode
                    }
                    None => {
                        self.emit(DiagnosticKind::UndeclaredTag { name: name.clone() }, n);
                        // A placeholder stops later references retriggering
                        let placeholder =
                            self.tabs.add_identifier(table, name, self.reg.std.error);
                        self.tree[n].tag = Some(placeholder);
                        self.reg.std.error
                    }
                }
            }
            Construct::Generator { declarer, .. } => self.reg.ref_to(declarer),
            Construct::Assignation { dst, src } => self.check_assignation(n, dst, src),
            Construct::IdentityRelation { lhs, rhs, .. } => {
                self.check_identity_relation(n, lhs, rhs)
            }
            Construct::Formula { op, lhs, rhs } => self.check_formula(n, &op, lhs, rhs),
            Construct::Call { primary, args } => self.check_call(n, primary, &args),
            Construct::Slice { primary, indexers } => self.check_slice(n, primary, &indexers),
            Construct::Selection { field, secondary } => {
                self.check_selection(n, &field, secondary)
            }
            Construct::Serial { units } => self.check_serial(&units, ex),
            Construct::Conditional {
                condition,
                then_part,
                else_part,
            } => {
                let bool_ = self.reg.std.bool_;
                self.check(condition, Expect::new(Sort::Meek, Some(bool_)));
                let mut branches = vec![then_part];
                branches.extend(else_part);
                self.check_branches(n, &branches, else_part.is_some(), ex)
            }
            Construct::CaseClause {
                enquiry,
                branches,
                out_part,
            } => {
                let int = self.reg.std.int;
                self.check(enquiry, Expect::new(Sort::Meek, Some(int)));
                let mut all = branches.clone();
                all.extend(out_part);
                self.check_branches(n, &all, out_part.is_some(), ex)
            }
            Construct::Conformity {
                enquiry,
                alternatives,
                out_part,
            } => self.check_conformity(n, enquiry, &alternatives, out_part, ex),
            Construct::Loop {
                from,
                by,
                to,
                while_part,
                body,
            } => {
                let int = self.reg.std.int;
                let bool_ = self.reg.std.bool_;
                for bound in [from, by, to].into_iter().flatten() {
                    self.check(bound, Expect::new(Sort::Meek, Some(int)));
                }
                if let Some(w) = while_part {
                    self.check(w, Expect::new(Sort::Meek, Some(bool_)));
                }
                let void = self.reg.std.void;
                self.check(body, Expect::strong(void));
                void
            }
            Construct::Collateral { units } => self.check_collateral(n, &units, ex),
            Construct::Parallel { units } => {
                let void = self.reg.std.void;
                for u in units {
                    self.check(u, Expect::strong(void));
                }
                void
            }
            Construct::RoutineText { proc_mode, body } => {
                let yields = self.reg[proc_mode].sub.unwrap_or(self.reg.std.void);
                self.check(body, Expect::strong(yields));
                proc_mode
            }
            Construct::FormatText { items } => {
                for item in items {
                    let target = match item.kind {
                        crate::syntax::FormatItemKind::Replicator => self.reg.std.int,
                        crate::syntax::FormatItemKind::Pattern => self.reg.std.format,
                        crate::syntax::FormatItemKind::General => {
                            let int = self.reg.std.int;
                            self.reg.row(1, int)
                        }
                    };
                    self.check(item.unit, Expect::strong(target));
                }
                self.reg.std.format
            }
            Construct::Cast { declarer, enclosed } => {
                self.check(enclosed, Expect::strong(declarer).with_cast());
                declarer
            }
            Construct::Assertion { enquiry } => {
                let bool_ = self.reg.std.bool_;
                self.check(enquiry, Expect::new(Sort::Meek, Some(bool_)));
                self.reg.std.void
            }
            Construct::Nihil | Construct::Skip => self.reg.std.hip,
            Construct::Jump { label } => {
                let table = self.tree[n].table;
                match self.tabs.lookup_label(table, &label) {
                    Some(tag) => self.tree[n].tag = Some(tag),
                    None => self.emit(DiagnosticKind::UndeclaredTag { name: label }, n),
                }
                self.reg.std.hip
            }
            Construct::IdentityDeclaration { tag, source } => {
                let t = self.tabs[tag].mode;
                self.tabs.set_defining_node(tag, n);
                self.check(source, Expect::strong(t));
                self.reg.std.void
            }
            Construct::VariableDeclaration { tag, init, .. } => {
                let name_mode = self.tabs[tag].mode;
                self.tabs.set_defining_node(tag, n);
                if let Some(init) = init {
                    let t = self.reg[self.reg.underlying(name_mode)]
                        .sub
                        .unwrap_or(self.reg.std.error);
                    let srcy = self.check(init, Expect::strong(t));
                    self.warn_unintended(init, srcy, name_mode);
                }
                self.reg.std.void
            }
            Construct::OperatorDeclaration { tag, routine } => {
                let mode = self.tabs[tag].mode;
                self.tabs.set_defining_node(tag, n);
                self.check(routine, Expect::strong(mode));
                self.reg.std.void
            }
            Construct::Coercion { operand, .. } => {
                // Already-inserted trees re-check transparently
                self.check(operand, Expect::infer(Sort::NoSort));
                self.tree[n].mode.unwrap_or(self.reg.std.error)
            }
        }
    }

    fn denoted_mode(&self, kind: &DenotKind) -> ModeId {
        match kind {
            DenotKind::Int(_) => self.reg.std.int,
            DenotKind::LongInt(_) => self.reg.std.long_int,
            DenotKind::Real(_) => self.reg.std.real,
            DenotKind::LongReal(_) => self.reg.std.long_real,
            DenotKind::Bool(_) => self.reg.std.bool_,
            DenotKind::Char(_) => self.reg.std.char_,
            DenotKind::Bits(_) => self.reg.std.bits,
            DenotKind::Text(_) => self.reg.std.row_char,
        }
    }

    /// `dst := src`: the destination is SOFT and must yield a name; the
    /// source is then STRONG against what the name refers to. The whole
    /// assignation yields the name.
    fn check_assignation(&mut self, n: NodeId, dst: NodeId, src: NodeId) -> ModeId {
        let dsty = self.check(dst, Expect::infer(Sort::Soft).with_attribute("assignation"));
        match self.reg.soft_to_name(dsty) {
            Some(name_mode) => {
                let t = self.reg[name_mode].sub.unwrap_or(self.reg.std.error);
                let srcy = self.check(
                    src,
                    Expect::strong(t).with_attribute("assignation"),
                );
                self.warn_unintended(src, srcy, name_mode);
                name_mode
            }
            None => {
                if !self.reg.is_bottom(dsty) {
                    self.emit(
                        DiagnosticKind::NoName {
                            yielded: dsty,
                            construct: "assignation",
                        },
                        n,
                    );
                }
                // The source still gets its annotations
                self.check(src, Expect::infer(Sort::Strong));
                self.reg.std.error
            }
        }
    }

    /// `REF INT i := LOC REF INT` and friends: a generator whose yield is
    /// the destination name itself rather than its referend.
    fn warn_unintended(&mut self, src: NodeId, srcy: ModeId, name_mode: ModeId) {
        if srcy == name_mode
            && matches!(self.tree[src].construct, Construct::Generator { .. })
        {
            let span = self.at(src);
            self.diags
                .add(DiagnosticKind::Unintended { mode: srcy }, span);
        }
    }

    /// `a IS b` / `a ISNT b`: SOFT on both sides, both must be names (NIL
    /// allowed on one side), jointly coercible in one direction. Yields
    /// BOOL.
    fn check_identity_relation(&mut self, n: NodeId, lhs: NodeId, rhs: NodeId) -> ModeId {
        let ly = self.check(lhs, Expect::infer(Sort::Soft).with_attribute("identity relation"));
        let ry = self.check(rhs, Expect::infer(Sort::Soft).with_attribute("identity relation"));
        let bool_ = self.reg.std.bool_;
        if self.reg.is_bottom(ly) || self.reg.is_bottom(ry) {
            return bool_;
        }
        let ln = self.reg.soft_to_name(ly);
        let rn = self.reg.soft_to_name(ry);
        match (ln, rn) {
            (Some(a), Some(b)) => {
                let joint = self.reg.coercible(ly, b, Sort::Soft, DeflexPolicy::Safe)
                    || self.reg.coercible(ry, a, Sort::Soft, DeflexPolicy::Safe);
                if !joint {
                    self.emit(
                        DiagnosticKind::CannotCoerce {
                            yielded: ly,
                            expected: b,
                            sort: Sort::Soft,
                            construct: "identity relation",
                            component: None,
                        },
                        n,
                    );
                    return self.reg.std.error;
                }
                bool_
            }
            _ => {
                let offender = if ln.is_none() { ly } else { ry };
                self.emit(
                    DiagnosticKind::NoName {
                        yielded: offender,
                        construct: "identity relation",
                    },
                    n,
                );
                self.reg.std.error
            }
        }
    }

    fn operand_is_invalid(&self, m: ModeId) -> bool {
        let u = self.reg.underlying(m);
        matches!(
            self.reg[u].kind,
            ModeKind::Series
                | ModeKind::Stowed
                | ModeKind::Vacuum
                | ModeKind::Undefined
                | ModeKind::Standard(crate::modes::Standard::Void)
        )
    }

    fn check_formula(
        &mut self,
        n: NodeId,
        op: &str,
        lhs: Option<NodeId>,
        rhs: NodeId,
    ) -> ModeId {
        let lhs_y = lhs.map(|l| self.check(l, Expect::infer(Sort::Firm).with_attribute("formula")));
        let rhs_y = self.check(rhs, Expect::infer(Sort::Firm).with_attribute("formula"));
        for y in lhs_y.iter().chain([rhs_y].iter()) {
            if self.reg[self.reg.underlying(*y)].kind == ModeKind::Error {
                return self.reg.std.error;
            }
            if self.operand_is_invalid(*y) {
                self.emit(DiagnosticKind::InvalidOperand { mode: *y }, n);
                return self.reg.std.error;
            }
        }
        let table = self.tree[n].table;
        let resolution = match lhs_y {
            None => operators::find_monadic(self.reg, self.tabs, table, op, rhs_y),
            Some(ly) => operators::find_dyadic(self.reg, self.tabs, table, op, ly, rhs_y),
        };
        match resolution {
            Ok(res) => {
                trace!(op, yields = self.reg.display(res.yields), "formula resolved");
                self.tree[n].tag = Some(res.tag);
                res.yields
            }
            Err(failure) => {
                let op = self
                    .tree[n]
                    .info
                    .symbol
                    .clone()
                    .unwrap_or_else(|| std::rc::Rc::from(op));
                let kind = match (failure, lhs_y) {
                    (OperatorFailure::NoVector(m), _) => DiagnosticKind::NoVector { yielded: m },
                    (OperatorFailure::NoMatrix(m), _) => DiagnosticKind::NoMatrix { yielded: m },
                    (OperatorFailure::NotFound, None) => DiagnosticKind::NoMonadic {
                        op,
                        operand: rhs_y,
                    },
                    (OperatorFailure::NotFound, Some(ly)) => DiagnosticKind::NoDyadic {
                        op,
                        lhs: ly,
                        rhs: rhs_y,
                    },
                };
                self.emit(kind, n);
                self.reg.std.error
            }
        }
    }

    /// A call: the primary is MEEK to a PROC; arguments are STRONG
    /// pack-wise. Trimmer (`~`) argument positions turn the call into a
    /// partial parameterisation yielding a PROC over the unfilled
    /// positions.
    fn check_call(&mut self, n: NodeId, primary: NodeId, args: &[CallArg]) -> ModeId {
        let py = self.check(primary, Expect::infer(Sort::Meek).with_attribute("call"));
        let pv = self.reg.meek_to_value(py);
        let pu = self.reg.underlying(pv);
        if self.reg[pu].kind != ModeKind::Proc {
            if !self.reg.is_bottom(py) {
                self.emit(DiagnosticKind::NoRowOrProc { yielded: py }, n);
            }
            for a in args {
                if let CallArg::Unit(u) = a {
                    self.check(*u, Expect::infer(Sort::Strong));
                }
            }
            return self.reg.std.error;
        }
        let params: Vec<ModeId> = self.reg[pu].pack.iter().map(|e| e.mode).collect();
        let yields = self.reg[pu].sub.unwrap_or(self.reg.std.void);
        if args.len() != params.len() {
            self.emit(
                DiagnosticKind::ArgumentNumber {
                    given: args.len(),
                    arity: params.len(),
                },
                n,
            );
            for a in args {
                if let CallArg::Unit(u) = a {
                    self.check(*u, Expect::infer(Sort::Strong));
                }
            }
            return self.reg.std.error;
        }
        let mut unfilled: Vec<ModeId> = Vec::new();
        for (arg, &param) in args.iter().zip(params.iter()) {
            match arg {
                CallArg::Unit(u) => {
                    self.check(*u, Expect::strong(param).with_attribute("call"));
                }
                CallArg::Skip => unfilled.push(param),
            }
        }
        if unfilled.is_empty() {
            yields
        } else {
            self.reg.proc(unfilled, yields)
        }
    }

    /// A slice: the primary is WEAK toward a row, keeping the last name;
    /// subscripts are MEEK INT; the number of indexers must equal the row
    /// dimension. Trimmers keep their dimensions (and lose flexibility).
    fn check_slice(&mut self, n: NodeId, primary: NodeId, indexers: &[Indexer]) -> ModeId {
        let py = self.check(primary, Expect::infer(Sort::Weak).with_attribute("slice"));
        let int = self.reg.std.int;
        for ix in indexers {
            match ix {
                Indexer::Subscript(u) => {
                    self.check(*u, Expect::new(Sort::Meek, Some(int)));
                }
                Indexer::Trimmer { lower, upper } => {
                    for b in [lower, upper].into_iter().flatten() {
                        self.check(*b, Expect::new(Sort::Meek, Some(int)));
                    }
                }
            }
        }
        let Some((stratum, is_name)) = self.reg.weak_to_row(py) else {
            if !self.reg.is_bottom(py) {
                self.emit(DiagnosticKind::NoRowOrProc { yielded: py }, n);
            }
            return self.reg.std.error;
        };
        let row = if is_name {
            let sub = self.reg[stratum].sub.unwrap_or(stratum);
            self.reg.underlying(sub)
        } else {
            stratum
        };
        let dim = self.reg[row].dim;
        if indexers.len() != dim as usize {
            self.emit(
                DiagnosticKind::IndexerNumber {
                    given: indexers.len(),
                    dim,
                },
                n,
            );
            return self.reg.std.error;
        }
        let trimmers = indexers
            .iter()
            .filter(|ix| matches!(ix, Indexer::Trimmer { .. }))
            .count() as u32;
        if trimmers == 0 {
            let result = if is_name {
                self.reg.name_of(stratum)
            } else {
                self.reg.slice_of(row)
            };
            result.unwrap_or(self.reg.std.error)
        } else {
            // Trimmed dimensions survive; flexibility does not
            let row_d = self.reg.deflexed(row);
            let elem = self.reg[self.reg.underlying(row_d)].sub.unwrap_or(self.reg.std.error);
            let trimmed = self.reg.row(trimmers, elem);
            if is_name {
                self.reg.ref_to(trimmed)
            } else {
                trimmed
            }
        }
    }

    /// `field OF secondary`.
    fn check_selection(&mut self, n: NodeId, field: &str, secondary: NodeId) -> ModeId {
        let sy = self.check(
            secondary,
            Expect::infer(Sort::Weak).with_attribute("selection"),
        );
        let Some((_, struct_mode, view)) = self.reg.weak_to_struct(sy) else {
            if !self.reg.is_bottom(sy) {
                self.emit(DiagnosticKind::NoStruct { yielded: sy }, n);
            }
            return self.reg.std.error;
        };
        let field_mode = self.reg[struct_mode]
            .pack
            .iter()
            .find(|e| e.text.as_deref() == Some(field))
            .map(|e| e.mode);
        let Some(field_mode) = field_mode else {
            let field = self
                .tree[n]
                .info
                .symbol
                .clone()
                .unwrap_or_else(|| std::rc::Rc::from(field));
            self.emit(
                DiagnosticKind::NoField {
                    field,
                    mode: struct_mode,
                },
                n,
            );
            return self.reg.std.error;
        };
        match view {
            StructView::Plain => field_mode,
            StructView::Name => self.reg.ref_to(field_mode),
            StructView::RowValue(dim) => self.reg.row(dim, field_mode),
            StructView::RowName(dim) => {
                let row = self.reg.row(dim, field_mode);
                self.reg.ref_to(row)
            }
        }
    }

    /// A serial clause: every unit but the last stands in a VOID context;
    /// the last carries the clause's context.
    fn check_serial(&mut self, units: &[NodeId], ex: Expect) -> ModeId {
        let void = self.reg.std.void;
        match units.split_last() {
            Some((last, rest)) => {
                for &u in rest {
                    self.check(u, Expect::strong(void));
                }
                self.check(*last, ex)
            }
            None => void,
        }
    }

    /// The branches of a conditional or case clause. With a concrete
    /// expected mode each branch checks against it directly; otherwise the
    /// raw yields are balanced. A missing ELSE/OUT contributes an implicit
    /// VOID member.
    fn check_branches(
        &mut self,
        n: NodeId,
        branches: &[NodeId],
        complete: bool,
        ex: Expect,
    ) -> ModeId {
        let void = self.reg.std.void;
        if let Some(q) = ex.mode {
            for &b in branches {
                self.check(b, ex);
            }
            if !complete && !self.reg.coercible(void, q, ex.sort, DeflexPolicy::Safe) {
                self.emit(
                    DiagnosticKind::CannotCoerce {
                        yielded: void,
                        expected: q,
                        sort: ex.sort,
                        construct: self.tree[n].construct.class(),
                        component: None,
                    },
                    n,
                );
                return self.reg.std.error;
            }
            return q;
        }
        let sort = if ex.sort == Sort::NoSort {
            Sort::Strong
        } else {
            ex.sort
        };
        let inner = Expect::infer(sort);
        let mut yields: Vec<ModeId> = branches.iter().map(|&b| self.check(b, inner)).collect();
        if !complete {
            yields.push(void);
        }
        let b = balance(self.reg, &yields, sort, DeflexPolicy::Safe);
        if !b.balanced {
            self.emit(DiagnosticKind::NoUniqueMode { modes: yields }, n);
        }
        b.mode
    }

    /// A conformity clause: the enquiry deprefs to a union; every
    /// alternative's specification must name a component of it.
    fn check_conformity(
        &mut self,
        n: NodeId,
        enquiry: NodeId,
        alternatives: &[crate::syntax::ConformityAlt],
        out_part: Option<NodeId>,
        ex: Expect,
    ) -> ModeId {
        let ey = self.check(
            enquiry,
            Expect::infer(Sort::Meek).with_attribute("conformity clause"),
        );
        let ev = self.reg.meek_to_value(ey);
        let union = self.reg.underlying(ev);
        if self.reg[union].kind != ModeKind::Union {
            if !self.reg.is_bottom(ey) {
                self.emit(DiagnosticKind::NoUnion { yielded: ey }, n);
            }
        } else {
            let mut seen: Vec<ModeId> = Vec::new();
            for alt in alternatives {
                let spec_u = self.reg.underlying(alt.spec);
                if self.reg[spec_u].kind == ModeKind::Error {
                    self.emit(DiagnosticKind::ModeSpecification { spec: alt.spec }, n);
                    continue;
                }
                if !self.reg.unitable(alt.spec, union, DeflexPolicy::Safe) {
                    self.emit(
                        DiagnosticKind::NoComponent {
                            spec: alt.spec,
                            union,
                        },
                        n,
                    );
                }
                if seen
                    .iter()
                    .any(|&s| self.reg.modes_equal(s, alt.spec, DeflexPolicy::Safe))
                {
                    self.emit(
                        DiagnosticKind::NoUniqueMode {
                            modes: vec![alt.spec],
                        },
                        n,
                    );
                }
                seen.push(alt.spec);
            }
        }
        let bodies: Vec<NodeId> = alternatives
            .iter()
            .map(|a| a.body)
            .chain(out_part)
            .collect();
        self.check_branches(n, &bodies, out_part.is_some(), ex)
    }

    /// A collateral clause: a display coercing pack-wise to a row or a
    /// structure, or a VOID collateral.
    fn check_collateral(&mut self, n: NodeId, units: &[NodeId], ex: Expect) -> ModeId {
        let void = self.reg.std.void;
        if let Some(q) = ex.mode {
            if self.reg.underlying(q) == void {
                for &u in units {
                    self.check(u, Expect::strong(void));
                }
                return void;
            }
            let qd = self.reg.deflexed(q);
            let qu = self.reg.underlying(qd);
            match self.reg[qu].kind {
                ModeKind::Row | ModeKind::Flex => {
                    if units.is_empty() {
                        // An empty display is a vacuum; a row context gives
                        // it its mode
                        return q;
                    }
                    let elem = self.reg.slice_of(qu).unwrap_or(self.reg.std.error);
                    for &u in units {
                        self.check(u, Expect::strong(elem).with_attribute("collateral clause"));
                    }
                    q
                }
                ModeKind::Struct if self.reg[qu].pack.len() == units.len() => {
                    let fields: Vec<ModeId> =
                        self.reg[qu].pack.iter().map(|e| e.mode).collect();
                    for (&u, f) in units.iter().zip(fields) {
                        self.check(u, Expect::strong(f).with_attribute("collateral clause"));
                    }
                    q
                }
                _ => {
                    // Yield the raw display; conform will explain the refusal
                    let yields: Vec<ModeId> = units
                        .iter()
                        .map(|&u| self.check(u, Expect::infer(Sort::Strong)))
                        .collect();
                    self.reg.stowed_of(yields)
                }
            }
        } else {
            if units.is_empty() {
                self.emit(DiagnosticKind::Vacuum, n);
                return self.reg.std.error;
            }
            let yields: Vec<ModeId> = units
                .iter()
                .map(|&u| self.check(u, Expect::infer(Sort::Strong)))
                .collect();
            self.reg.stowed_of(yields)
        }
    }
}
