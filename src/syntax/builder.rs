//! Programmatic tree construction: the interface through which a front end
//! (or a test) delivers a program to the analysis core, exactly as the
//! parser preamble would — tables populated, declarers resolved to modes,
//! identifier occurrences left for the checker to bind.

use crate::base::{Interner, Name, NodeId, Span, TableId, TagId};
use crate::modes::{ModeId, ModeRegistry};
use crate::semantic::stdenv::{self, StandardEnviron};
use crate::semantic::symbol_table::Tables;

use super::construct::{
    CallArg, ConformityAlt, Construct, DenotKind, FormatItem, Heap, Indexer,
};
use super::tree::{Info, Tree};

/// A complete program ready for analysis: the tree, the interned modes, the
/// populated tables and the standard environ.
pub struct Program {
    pub tree: Tree,
    pub modes: ModeRegistry,
    pub tables: Tables,
    pub names: Interner,
    pub env: StandardEnviron,
    pub root: NodeId,
}

/// Builds trees the way the parser delivers them.
///
/// Keeps a current table; `enter`/`exit` manage scope nesting, declaration
/// helpers insert tags, node helpers allocate constructs carrying the
/// current table and a deterministic source position.
pub struct TreeBuilder {
    tree: Tree,
    modes: ModeRegistry,
    tables: Tables,
    names: Interner,
    env: StandardEnviron,
    current: TableId,
    line: usize,
}

impl TreeBuilder {
    pub fn new() -> Self {
        let mut modes = ModeRegistry::new();
        let mut tables = Tables::new();
        let mut names = Interner::new();
        let env = stdenv::build(&mut modes, &mut tables, &mut names);
        let current = tables.new_table(tables.primal);
        Self {
            tree: Tree::new(),
            modes,
            tables,
            names,
            env,
            current,
            line: 0,
        }
    }

    pub fn modes(&mut self) -> &mut ModeRegistry {
        &mut self.modes
    }

    pub fn std(&self) -> crate::modes::StdModes {
        self.modes.std
    }

    pub fn env(&self) -> StandardEnviron {
        self.env
    }

    pub fn current_table(&self) -> TableId {
        self.current
    }

    pub fn name(&mut self, s: &str) -> Name {
        self.names.intern(s)
    }

    /// Open a new scope level; nodes allocated until `exit` carry it.
    pub fn enter(&mut self) -> TableId {
        self.current = self.tables.new_table(self.current);
        self.current
    }

    pub fn exit(&mut self) {
        if let Some(parent) = self.tables[self.current].parent {
            self.current = parent;
        }
    }

    fn info(&mut self, symbol: Option<&str>) -> Info {
        self.line += 1;
        let span = Span::at(self.line, 1);
        match symbol {
            Some(s) => Info::with_symbol(span, self.names.intern(s)),
            None => Info::new(span),
        }
    }

    fn node(&mut self, construct: Construct, symbol: Option<&str>) -> NodeId {
        let info = self.info(symbol);
        self.tree.alloc(construct, info, self.current)
    }

    // ============================================================
    // Declarations
    // ============================================================

    pub fn declare_identifier(&mut self, name: &str, mode: ModeId) -> TagId {
        let name = self.names.intern(name);
        self.tables.add_identifier(self.current, name, mode)
    }

    /// Declare `MODE name = actual`, binding a fresh indicant.
    pub fn declare_mode(&mut self, name: &str, actual: ModeId) -> ModeId {
        let interned = self.names.intern(name);
        let ind = self.modes.indicant(interned.clone());
        self.modes.bind_indicant(ind, actual);
        self.tables.add_indicant(self.current, interned, ind);
        ind
    }

    /// Declare a recursive mode: obtain the indicant first, build the
    /// actual mode in terms of it, then bind.
    pub fn declare_mode_indicant(&mut self, name: &str) -> ModeId {
        let interned = self.names.intern(name);
        let ind = self.modes.indicant(interned.clone());
        self.tables.add_indicant(self.current, interned, ind);
        ind
    }

    pub fn bind_mode(&mut self, indicant: ModeId, actual: ModeId) -> bool {
        self.modes.bind_indicant(indicant, actual)
    }

    pub fn declare_label(&mut self, name: &str) -> TagId {
        let name = self.names.intern(name);
        let undefined = self.modes.std.undefined;
        self.tables.add_label(self.current, name, undefined)
    }

    /// `T x = source`
    pub fn identity_decl(&mut self, name: &str, mode: ModeId, source: NodeId) -> NodeId {
        let tag = self.declare_identifier(name, mode);
        self.node(Construct::IdentityDeclaration { tag, source }, Some(name))
    }

    /// `T x := init` (a LOC variable of mode REF T)
    pub fn variable_decl(&mut self, name: &str, mode: ModeId, init: Option<NodeId>) -> NodeId {
        self.variable_decl_heap(name, mode, Heap::Loc, init)
    }

    pub fn variable_decl_heap(
        &mut self,
        name: &str,
        mode: ModeId,
        heap: Heap,
        init: Option<NodeId>,
    ) -> NodeId {
        let name_mode = self.modes.ref_to(mode);
        let tag = self.declare_identifier(name, name_mode);
        self.node(
            Construct::VariableDeclaration { tag, heap, init },
            Some(name),
        )
    }

    /// `OP name = routine` with the routine's PROC mode on the tag.
    pub fn operator_decl(
        &mut self,
        name: &str,
        priority: Option<u8>,
        routine: NodeId,
    ) -> NodeId {
        let mode = match &self.tree[routine].construct {
            Construct::RoutineText { proc_mode, .. } => *proc_mode,
            _ => self.modes.std.error,
        };
        let interned = self.names.intern(name);
        let tag = self
            .tables
            .add_operator(self.current, interned, mode, priority);
        self.node(Construct::OperatorDeclaration { tag, routine }, Some(name))
    }

    // ============================================================
    // Denotations and primaries
    // ============================================================

    pub fn int_denot(&mut self, v: i64) -> NodeId {
        self.denot(DenotKind::Int(v))
    }

    pub fn long_int_denot(&mut self, v: i64) -> NodeId {
        self.denot(DenotKind::LongInt(v))
    }

    pub fn real_denot(&mut self, v: f64) -> NodeId {
        self.denot(DenotKind::Real(v))
    }

    pub fn long_real_denot(&mut self, v: f64) -> NodeId {
        self.denot(DenotKind::LongReal(v))
    }

    pub fn bool_denot(&mut self, v: bool) -> NodeId {
        self.denot(DenotKind::Bool(v))
    }

    pub fn char_denot(&mut self, v: char) -> NodeId {
        self.denot(DenotKind::Char(v))
    }

    pub fn bits_denot(&mut self, v: u64) -> NodeId {
        self.denot(DenotKind::Bits(v))
    }

    pub fn string_denot(&mut self, s: &str) -> NodeId {
        let text = self.names.intern(s);
        self.denot(DenotKind::Text(text))
    }

    fn denot(&mut self, kind: DenotKind) -> NodeId {
        self.node(
            Construct::Denotation {
                kind,
                optimal: false,
            },
            None,
        )
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        let interned = self.names.intern(name);
        self.node(Construct::Identifier { name: interned }, Some(name))
    }

    pub fn generator(&mut self, heap: Heap, declarer: ModeId) -> NodeId {
        self.node(Construct::Generator { heap, declarer }, None)
    }

    pub fn nihil(&mut self) -> NodeId {
        self.node(Construct::Nihil, None)
    }

    pub fn skip(&mut self) -> NodeId {
        self.node(Construct::Skip, None)
    }

    pub fn jump(&mut self, label: &str) -> NodeId {
        let interned = self.names.intern(label);
        self.node(Construct::Jump { label: interned }, Some(label))
    }

    // ============================================================
    // Units
    // ============================================================

    pub fn assign(&mut self, dst: NodeId, src: NodeId) -> NodeId {
        self.node(Construct::Assignation { dst, src }, None)
    }

    pub fn identity_relation(&mut self, negated: bool, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.node(Construct::IdentityRelation { negated, lhs, rhs }, None)
    }

    pub fn monadic(&mut self, op: &str, operand: NodeId) -> NodeId {
        let interned = self.names.intern(op);
        self.node(
            Construct::Formula {
                op: interned,
                lhs: None,
                rhs: operand,
            },
            Some(op),
        )
    }

    pub fn dyadic(&mut self, op: &str, lhs: NodeId, rhs: NodeId) -> NodeId {
        let interned = self.names.intern(op);
        self.node(
            Construct::Formula {
                op: interned,
                lhs: Some(lhs),
                rhs,
            },
            Some(op),
        )
    }

    pub fn call(&mut self, primary: NodeId, args: Vec<NodeId>) -> NodeId {
        let args = args.into_iter().map(CallArg::Unit).collect();
        self.node(Construct::Call { primary, args }, None)
    }

    /// A call with `~` place-holders: a partial parameterisation.
    pub fn call_partial(&mut self, primary: NodeId, args: Vec<CallArg>) -> NodeId {
        self.node(Construct::Call { primary, args }, None)
    }

    pub fn slice(&mut self, primary: NodeId, subscripts: Vec<NodeId>) -> NodeId {
        let indexers = subscripts.into_iter().map(Indexer::Subscript).collect();
        self.node(Construct::Slice { primary, indexers }, None)
    }

    pub fn slice_indexers(&mut self, primary: NodeId, indexers: Vec<Indexer>) -> NodeId {
        self.node(Construct::Slice { primary, indexers }, None)
    }

    pub fn select(&mut self, field: &str, secondary: NodeId) -> NodeId {
        let interned = self.names.intern(field);
        self.node(
            Construct::Selection {
                field: interned,
                secondary,
            },
            Some(field),
        )
    }

    pub fn serial(&mut self, units: Vec<NodeId>) -> NodeId {
        self.node(Construct::Serial { units }, None)
    }

    pub fn conditional(
        &mut self,
        condition: NodeId,
        then_part: NodeId,
        else_part: Option<NodeId>,
    ) -> NodeId {
        self.node(
            Construct::Conditional {
                condition,
                then_part,
                else_part,
            },
            None,
        )
    }

    pub fn case_clause(
        &mut self,
        enquiry: NodeId,
        branches: Vec<NodeId>,
        out_part: Option<NodeId>,
    ) -> NodeId {
        self.node(
            Construct::CaseClause {
                enquiry,
                branches,
                out_part,
            },
            None,
        )
    }

    /// One conformity alternative `(SPEC binder): body`; the binder is
    /// declared at the spec mode in the alternative's own range.
    pub fn conformity_alt(
        &mut self,
        spec: ModeId,
        binder: Option<&str>,
        body: impl FnOnce(&mut Self) -> NodeId,
    ) -> ConformityAlt {
        self.enter();
        let binder = binder.map(|b| self.declare_identifier(b, spec));
        let body = body(self);
        self.exit();
        ConformityAlt { spec, binder, body }
    }

    pub fn conformity(
        &mut self,
        enquiry: NodeId,
        alternatives: Vec<ConformityAlt>,
        out_part: Option<NodeId>,
    ) -> NodeId {
        self.node(
            Construct::Conformity {
                enquiry,
                alternatives,
                out_part,
            },
            None,
        )
    }

    pub fn loop_clause(
        &mut self,
        from: Option<NodeId>,
        by: Option<NodeId>,
        to: Option<NodeId>,
        while_part: Option<NodeId>,
        body: NodeId,
    ) -> NodeId {
        self.node(
            Construct::Loop {
                from,
                by,
                to,
                while_part,
                body,
            },
            None,
        )
    }

    pub fn collateral(&mut self, units: Vec<NodeId>) -> NodeId {
        self.node(Construct::Collateral { units }, None)
    }

    pub fn parallel(&mut self, units: Vec<NodeId>) -> NodeId {
        self.node(Construct::Parallel { units }, None)
    }

    /// `(params) yields: body` — parameters become identifiers in the
    /// routine's own range; the PROC mode is built here, as the parser
    /// preamble does.
    pub fn routine_text(
        &mut self,
        params: &[(&str, ModeId)],
        yields: ModeId,
        body: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        self.enter();
        for (name, mode) in params {
            self.declare_identifier(name, *mode);
        }
        let body = body(self);
        self.exit();
        let param_modes = params.iter().map(|(_, m)| *m).collect();
        let proc_mode = self.modes.proc(param_modes, yields);
        self.node(Construct::RoutineText { proc_mode, body }, None)
    }

    pub fn format_text(&mut self, items: Vec<FormatItem>) -> NodeId {
        self.node(Construct::FormatText { items }, None)
    }

    pub fn cast(&mut self, declarer: ModeId, enclosed: NodeId) -> NodeId {
        self.node(Construct::Cast { declarer, enclosed }, None)
    }

    pub fn assertion(&mut self, enquiry: NodeId) -> NodeId {
        self.node(Construct::Assertion { enquiry }, None)
    }

    /// Close the program over its root.
    pub fn finish(self, root: NodeId) -> Program {
        Program {
            tree: self.tree,
            modes: self.modes,
            tables: self.tables,
            names: self.names,
            env: self.env,
            root,
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
