//! The tagged-variant node payload: one variant per syntactic category.
//!
//! The parser delivers a tree of these; the walkers are exhaustive matches,
//! so adding a category is a compile-time-total change.

use crate::base::{Name, NodeId, TagId};
use crate::modes::ModeId;

/// LOC versus HEAP allocation of generators and variable declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heap {
    Loc,
    Heap,
}

/// The value of a denotation, as scanned.
#[derive(Debug, Clone, PartialEq)]
pub enum DenotKind {
    Int(i64),
    LongInt(i64),
    Real(f64),
    LongReal(f64),
    Bool(bool),
    Char(char),
    Bits(u64),
    /// String denotation; its mode is `[] CHAR`
    Text(Name),
}

/// The seven coercions the inserter materialises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionKind {
    Dereferencing,
    Deproceduring,
    Uniting,
    Widening,
    Rowing,
    Voiding,
    Proceduring,
}

impl CoercionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoercionKind::Dereferencing => "dereferencing",
            CoercionKind::Deproceduring => "deproceduring",
            CoercionKind::Uniting => "uniting",
            CoercionKind::Widening => "widening",
            CoercionKind::Rowing => "rowing",
            CoercionKind::Voiding => "voiding",
            CoercionKind::Proceduring => "proceduring",
        }
    }
}

/// One indexer of a slice: a subscript consumes a dimension, a trimmer
/// keeps it.
#[derive(Debug, Clone, PartialEq)]
pub enum Indexer {
    Subscript(NodeId),
    Trimmer {
        lower: Option<NodeId>,
        upper: Option<NodeId>,
    },
}

/// One argument of a call; `Skip` is the `~` place-holder of a partial
/// parameterisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallArg {
    Unit(NodeId),
    Skip,
}

/// What a format-text item requires of its embedded unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatItemKind {
    /// Dynamic replicator, a STRONG INT unit
    Replicator,
    /// A recursive format pattern, a STRONG FORMAT unit
    Pattern,
    /// A general pattern, a STRONG [] INT unit
    General,
}

/// An embedded unit of a format text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatItem {
    pub kind: FormatItemKind,
    pub unit: NodeId,
}

/// One alternative of a conformity clause: `(SPEC binder): body`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformityAlt {
    pub spec: ModeId,
    pub binder: Option<TagId>,
    pub body: NodeId,
}

/// The payload of a tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Construct {
    Denotation {
        kind: DenotKind,
        /// Set when the denotation already carries its context's precision,
        /// silencing the portability warning
        optimal: bool,
    },
    Identifier {
        name: Name,
    },
    Generator {
        heap: Heap,
        declarer: ModeId,
    },
    Assignation {
        dst: NodeId,
        src: NodeId,
    },
    IdentityRelation {
        negated: bool,
        lhs: NodeId,
        rhs: NodeId,
    },
    /// Dyadic when `lhs` is present, monadic otherwise
    Formula {
        op: Name,
        lhs: Option<NodeId>,
        rhs: NodeId,
    },
    Call {
        primary: NodeId,
        args: Vec<CallArg>,
    },
    Slice {
        primary: NodeId,
        indexers: Vec<Indexer>,
    },
    Selection {
        field: Name,
        secondary: NodeId,
    },
    /// Serial clause; all units but the last stand in a VOID context
    Serial {
        units: Vec<NodeId>,
    },
    Conditional {
        condition: NodeId,
        then_part: NodeId,
        else_part: Option<NodeId>,
    },
    CaseClause {
        enquiry: NodeId,
        branches: Vec<NodeId>,
        out_part: Option<NodeId>,
    },
    Conformity {
        enquiry: NodeId,
        alternatives: Vec<ConformityAlt>,
        out_part: Option<NodeId>,
    },
    Loop {
        from: Option<NodeId>,
        by: Option<NodeId>,
        to: Option<NodeId>,
        while_part: Option<NodeId>,
        body: NodeId,
    },
    Collateral {
        units: Vec<NodeId>,
    },
    Parallel {
        units: Vec<NodeId>,
    },
    RoutineText {
        proc_mode: ModeId,
        body: NodeId,
    },
    FormatText {
        items: Vec<FormatItem>,
    },
    Cast {
        declarer: ModeId,
        enclosed: NodeId,
    },
    Assertion {
        enquiry: NodeId,
    },
    Nihil,
    Skip,
    Jump {
        label: Name,
    },
    IdentityDeclaration {
        tag: TagId,
        source: NodeId,
    },
    VariableDeclaration {
        tag: TagId,
        heap: Heap,
        init: Option<NodeId>,
    },
    OperatorDeclaration {
        tag: TagId,
        routine: NodeId,
    },
    /// Synthesised by the coercion inserter
    Coercion {
        kind: CoercionKind,
        operand: NodeId,
    },
}

impl Construct {
    /// The construct-class attribute used in diagnostic text.
    pub fn class(&self) -> &'static str {
        match self {
            Construct::Denotation { .. } => "denotation",
            Construct::Identifier { .. } => "identifier",
            Construct::Generator { .. } => "generator",
            Construct::Assignation { .. } => "assignation",
            Construct::IdentityRelation { .. } => "identity relation",
            Construct::Formula { .. } => "formula",
            Construct::Call { .. } => "call",
            Construct::Slice { .. } => "slice",
            Construct::Selection { .. } => "selection",
            Construct::Serial { .. } => "serial clause",
            Construct::Conditional { .. } => "conditional clause",
            Construct::CaseClause { .. } => "case clause",
            Construct::Conformity { .. } => "conformity clause",
            Construct::Loop { .. } => "loop clause",
            Construct::Collateral { .. } => "collateral clause",
            Construct::Parallel { .. } => "parallel clause",
            Construct::RoutineText { .. } => "routine text",
            Construct::FormatText { .. } => "format text",
            Construct::Cast { .. } => "cast",
            Construct::Assertion { .. } => "assertion",
            Construct::Nihil => "NIL",
            Construct::Skip => "SKIP",
            Construct::Jump { .. } => "jump",
            Construct::IdentityDeclaration { .. } => "identity declaration",
            Construct::VariableDeclaration { .. } => "variable declaration",
            Construct::OperatorDeclaration { .. } => "operator declaration",
            Construct::Coercion { kind, .. } => kind.as_str(),
        }
    }

    /// Visit every child slot mutably, for rewriting passes.
    pub fn for_each_child_slot(&mut self, mut f: impl FnMut(&mut NodeId)) {
        match self {
            Construct::Denotation { .. }
            | Construct::Identifier { .. }
            | Construct::Generator { .. }
            | Construct::Nihil
            | Construct::Skip
            | Construct::Jump { .. } => {}
            Construct::Assignation { dst, src } => {
                f(dst);
                f(src);
            }
            Construct::IdentityRelation { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            Construct::Formula { lhs, rhs, .. } => {
                if let Some(l) = lhs {
                    f(l);
                }
                f(rhs);
            }
            Construct::Call { primary, args } => {
                f(primary);
                for a in args {
                    if let CallArg::Unit(u) = a {
                        f(u);
                    }
                }
            }
            Construct::Slice { primary, indexers } => {
                f(primary);
                for ix in indexers {
                    match ix {
                        Indexer::Subscript(u) => f(u),
                        Indexer::Trimmer { lower, upper } => {
                            if let Some(l) = lower {
                                f(l);
                            }
                            if let Some(u) = upper {
                                f(u);
                            }
                        }
                    }
                }
            }
            Construct::Selection { secondary, .. } => f(secondary),
            Construct::Serial { units }
            | Construct::Collateral { units }
            | Construct::Parallel { units } => {
                for u in units {
                    f(u);
                }
            }
            Construct::Conditional {
                condition,
                then_part,
                else_part,
            } => {
                f(condition);
                f(then_part);
                if let Some(e) = else_part {
                    f(e);
                }
            }
            Construct::CaseClause {
                enquiry,
                branches,
                out_part,
            } => {
                f(enquiry);
                for b in branches {
                    f(b);
                }
                if let Some(o) = out_part {
                    f(o);
                }
            }
            Construct::Conformity {
                enquiry,
                alternatives,
                out_part,
            } => {
                f(enquiry);
                for a in alternatives {
                    f(&mut a.body);
                }
                if let Some(o) = out_part {
                    f(o);
                }
            }
            Construct::Loop {
                from,
                by,
                to,
                while_part,
                body,
            } => {
                for part in [from, by, to, while_part].into_iter().flatten() {
                    f(part);
                }
                f(body);
            }
            Construct::RoutineText { body, .. } => f(body),
            Construct::FormatText { items } => {
                for i in items {
                    f(&mut i.unit);
                }
            }
            Construct::Cast { enclosed, .. } => f(enclosed),
            Construct::Assertion { enquiry } => f(enquiry),
            Construct::IdentityDeclaration { source, .. } => f(source),
            Construct::VariableDeclaration { init, .. } => {
                if let Some(i) = init {
                    f(i);
                }
            }
            Construct::OperatorDeclaration { routine, .. } => f(routine),
            Construct::Coercion { operand, .. } => f(operand),
        }
    }

    /// Child units in source order, for the generic passes.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self {
            Construct::Denotation { .. }
            | Construct::Identifier { .. }
            | Construct::Generator { .. }
            | Construct::Nihil
            | Construct::Skip
            | Construct::Jump { .. } => {}
            Construct::Assignation { dst, src } => {
                out.push(*dst);
                out.push(*src);
            }
            Construct::IdentityRelation { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            Construct::Formula { lhs, rhs, .. } => {
                if let Some(l) = lhs {
                    out.push(*l);
                }
                out.push(*rhs);
            }
            Construct::Call { primary, args } => {
                out.push(*primary);
                for a in args {
                    if let CallArg::Unit(u) = a {
                        out.push(*u);
                    }
                }
            }
            Construct::Slice { primary, indexers } => {
                out.push(*primary);
                for ix in indexers {
                    match ix {
                        Indexer::Subscript(u) => out.push(*u),
                        Indexer::Trimmer { lower, upper } => {
                            if let Some(l) = lower {
                                out.push(*l);
                            }
                            if let Some(u) = upper {
                                out.push(*u);
                            }
                        }
                    }
                }
            }
            Construct::Selection { secondary, .. } => out.push(*secondary),
            Construct::Serial { units }
            | Construct::Collateral { units }
            | Construct::Parallel { units } => out.extend(units.iter().copied()),
            Construct::Conditional {
                condition,
                then_part,
                else_part,
            } => {
                out.push(*condition);
                out.push(*then_part);
                if let Some(e) = else_part {
                    out.push(*e);
                }
            }
            Construct::CaseClause {
                enquiry,
                branches,
                out_part,
            } => {
                out.push(*enquiry);
                out.extend(branches.iter().copied());
                if let Some(o) = out_part {
                    out.push(*o);
                }
            }
            Construct::Conformity {
                enquiry,
                alternatives,
                out_part,
            } => {
                out.push(*enquiry);
                out.extend(alternatives.iter().map(|a| a.body));
                if let Some(o) = out_part {
                    out.push(*o);
                }
            }
            Construct::Loop {
                from,
                by,
                to,
                while_part,
                body,
            } => {
                for part in [from, by, to, while_part].into_iter().flatten() {
                    out.push(*part);
                }
                out.push(*body);
            }
            Construct::RoutineText { body, .. } => out.push(*body),
            Construct::FormatText { items } => out.extend(items.iter().map(|i| i.unit)),
            Construct::Cast { enclosed, .. } => out.push(*enclosed),
            Construct::Assertion { enquiry } => out.push(*enquiry),
            Construct::IdentityDeclaration { source, .. } => out.push(*source),
            Construct::VariableDeclaration { init, .. } => {
                if let Some(i) = init {
                    out.push(*i);
                }
            }
            Construct::OperatorDeclaration { routine, .. } => out.push(*routine),
            Construct::Coercion { operand, .. } => out.push(*operand),
        }
        out
    }
}
