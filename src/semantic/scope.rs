//! Static scope analysis.
//!
//! Pass 1 assigns every routine and format text its youngest environ: the
//! deepest lexical level it free-references, inner texts contributing their
//! own youngest. Pass 2 assigns a scope to every defining identifier and
//! checks the constructs that may export a value outward: assignations,
//! identity declarations, routine values, and transient flex-row elements.
//! Where static analysis cannot decide, the node is marked `need_dns` and
//! the interpreter verifies at run time.

use tracing::trace;

use crate::base::NodeId;
use crate::modes::{ModeKind, ModeRegistry};
use crate::syntax::{Construct, Heap, Tree};

use super::diagnostics::{DiagnosticCollector, DiagnosticKind};
use super::symbol_table::{PRIMAL_SCOPE, Tables, TagKind};

/// One exported value found in a subtree: where it sits, how young it is,
/// and whether it is a transient flex-row element.
#[derive(Debug, Clone, Copy)]
struct ScopeItem {
    node: NodeId,
    level: u32,
    transient: bool,
}

pub struct ScopeAnalyser<'a> {
    tree: &'a mut Tree,
    reg: &'a mut ModeRegistry,
    tabs: &'a mut Tables,
    diags: &'a mut DiagnosticCollector,
}

/// Run both passes over the tree.
pub fn analyse_scopes(
    tree: &mut Tree,
    reg: &mut ModeRegistry,
    tabs: &mut Tables,
    diags: &mut DiagnosticCollector,
    root: NodeId,
) {
    let mut a = ScopeAnalyser {
        tree,
        reg,
        tabs,
        diags,
    };
    a.assign_youngest(root);
    a.check(root);
    a.finish_tags();
}

impl ScopeAnalyser<'_> {
    // ============================================================
    // Pass 1: youngest environs
    // ============================================================

    /// Post-order: every routine/format text gets its youngest environ in
    /// the node's scope annotation.
    fn assign_youngest(&mut self, n: NodeId) {
        for child in self.tree[n].construct.children() {
            self.assign_youngest(child);
        }
        match self.tree[n].construct {
            Construct::RoutineText { body, .. } => {
                let local = self.tabs[self.tree[body].table].level;
                let youngest = self.gather_youngest(body, local);
                self.tree[n].scope = Some(youngest);
                trace!(node = n.0, youngest, "routine text youngest environ");
            }
            Construct::FormatText { .. } => {
                let local = self.tabs[self.tree[n].table].level + 1;
                let youngest = self.gather_youngest(n, local);
                self.tree[n].scope = Some(youngest);
            }
            _ => {}
        }
    }

    /// The deepest lexical level freely referenced below `n`, seen from a
    /// text whose own locals live at `local` and deeper.
    fn gather_youngest(&mut self, n: NodeId, local: u32) -> u32 {
        let mut youngest = PRIMAL_SCOPE;
        match self.tree[n].construct {
            Construct::Identifier { .. } | Construct::Jump { .. } => {
                if let Some(tag) = self.tree[n].tag {
                    let level = self.tabs[self.tabs[tag].table].level;
                    if level < local {
                        youngest = youngest.max(level);
                    }
                }
            }
            Construct::RoutineText { .. } => {
                // Computed already in post-order; free from our viewpoint
                // only below our locals
                let inner = self.tree[n].scope.unwrap_or(PRIMAL_SCOPE);
                if inner < local {
                    youngest = youngest.max(inner);
                }
            }
            _ => {
                for child in self.tree[n].construct.children() {
                    youngest = youngest.max(self.gather_youngest(child, local));
                }
            }
        }
        youngest
    }

    // ============================================================
    // Pass 2: scope assignment and export checking
    // ============================================================

    fn check(&mut self, n: NodeId) {
        match self.tree[n].construct.clone() {
            Construct::Serial { units } => {
                for &u in &units {
                    self.tree[u].interruptible = true;
                    self.check(u);
                }
            }
            Construct::IdentityDeclaration { tag, source } => {
                self.check(source);
                let lexical = self.tabs[self.tabs[tag].table].level;
                let items = self.gather_scopes(source);
                let value = items
                    .iter()
                    .filter(|i| !i.transient)
                    .map(|i| i.level)
                    .max()
                    .unwrap_or(PRIMAL_SCOPE);
                let t = &mut self.tabs[tag];
                t.scope = lexical.min(value);
                t.scope_assigned = true;
                if matches!(
                    self.tree[source].construct,
                    Construct::RoutineText { .. }
                ) {
                    let youngest = self.tree[source].scope;
                    self.tabs[tag].youngest_environ = youngest;
                }
                self.reject_transients(&items);
            }
            Construct::VariableDeclaration { tag, heap, init } => {
                let scope = match heap {
                    Heap::Heap => PRIMAL_SCOPE,
                    Heap::Loc => self.tabs[self.tabs[tag].table].level,
                };
                {
                    let t = &mut self.tabs[tag];
                    t.scope = scope;
                    t.scope_assigned = true;
                }
                if let Some(init) = init {
                    self.check(init);
                    let items = self.gather_scopes(init);
                    self.enforce(n, &items, scope);
                }
            }
            Construct::Assignation { dst, src } => {
                self.check(dst);
                self.check(src);
                let items = self.gather_scopes(src);
                match self.dest_scope(dst) {
                    Some(dest) => self.enforce(n, &items, dest),
                    None => {
                        // The destination's scope is not statically known
                        if items.iter().any(|i| i.level > PRIMAL_SCOPE) {
                            self.diags
                                .add(DiagnosticKind::ScopeStatic, self.tree[n].info.span);
                            self.tree[n].need_dns = true;
                        }
                        self.reject_transients(&items);
                    }
                }
            }
            _ => {
                for child in self.tree[n].construct.children() {
                    self.check(child);
                }
            }
        }
    }

    /// Flag source values younger than the destination, and transient
    /// elements stored anywhere.
    fn enforce(&mut self, n: NodeId, items: &[ScopeItem], dest: u32) {
        for item in items {
            if item.transient {
                self.diags
                    .add(DiagnosticKind::TransientName, self.tree[item.node].info.span);
            } else if item.level > dest {
                self.diags.add(
                    DiagnosticKind::ScopeDynamic {
                        value_scope: item.level,
                        dest_scope: dest,
                    },
                    self.tree[n].info.span,
                );
            }
        }
    }

    fn reject_transients(&mut self, items: &[ScopeItem]) {
        for item in items {
            if item.transient {
                self.diags
                    .add(DiagnosticKind::TransientName, self.tree[item.node].info.span);
            }
        }
    }

    /// The statically-known scope of an assignation destination, if any.
    fn dest_scope(&mut self, dst: NodeId) -> Option<u32> {
        match self.tree[dst].construct.clone() {
            Construct::Identifier { .. } => {
                let tag = self.tree[dst].tag?;
                let t = &self.tabs[tag];
                Some(if t.scope_assigned {
                    t.scope
                } else {
                    self.tabs[t.table].level
                })
            }
            Construct::Generator { heap, .. } => Some(match heap {
                Heap::Heap => PRIMAL_SCOPE,
                Heap::Loc => self.tabs[self.tree[dst].table].level,
            }),
            Construct::Slice { primary, .. } => self.dest_scope(primary),
            Construct::Selection { secondary, .. } => self.dest_scope(secondary),
            Construct::Coercion { operand, .. } => self.dest_scope(operand),
            // Calls, formulas and clauses deliver names whose scope the
            // static analyser does not track
            _ => None,
        }
    }

    /// Whether a value of this mode carries a scope at all; subtrees that
    /// only deal in plain values are always safe.
    fn mode_has_scope(&self, m: crate::modes::ModeId) -> bool {
        let u = self.reg.underlying(m);
        self.reg[u].has_ref || matches!(self.reg[u].kind, ModeKind::Ref | ModeKind::Proc)
    }

    /// Collect the scope-bearing values a subtree may deliver outward.
    fn gather_scopes(&mut self, n: NodeId) -> Vec<ScopeItem> {
        let mut items = Vec::new();
        self.gather_into(n, &mut items);
        items
    }

    fn gather_into(&mut self, n: NodeId, items: &mut Vec<ScopeItem>) {
        // A subtree that delivers a plain value delivers no scope; in
        // particular a dereferenced name contributes nothing
        if let Some(m) = self.tree[n].mode {
            if !self.mode_has_scope(m) {
                return;
            }
        }
        match self.tree[n].construct.clone() {
            Construct::Identifier { .. } => {
                let Some(tag) = self.tree[n].tag else { return };
                let mode = self.tabs[tag].mode;
                if !self.mode_has_scope(mode) {
                    return;
                }
                let t = &self.tabs[tag];
                let level = if t.scope_assigned {
                    t.scope
                } else {
                    self.tabs[t.table].level
                };
                items.push(ScopeItem {
                    node: n,
                    level,
                    transient: false,
                });
            }
            Construct::Generator { heap, .. } => {
                let level = match heap {
                    Heap::Heap => PRIMAL_SCOPE,
                    Heap::Loc => self.tabs[self.tree[n].table].level,
                };
                items.push(ScopeItem {
                    node: n,
                    level,
                    transient: false,
                });
            }
            Construct::RoutineText { .. } => {
                items.push(ScopeItem {
                    node: n,
                    level: self.tree[n].scope.unwrap_or(PRIMAL_SCOPE),
                    transient: false,
                });
            }
            Construct::Slice { primary, .. } => {
                // An element of a flexible name must not outlive its
                // producer: its bounds may move under it
                if let Some(py) = self.tree[primary].mode {
                    if let Some((stratum, true)) = self.reg.weak_to_row(py) {
                        let sub = self.reg[stratum].sub;
                        let flexible = sub
                            .map(|s| self.reg[self.reg.underlying(s)].kind == ModeKind::Flex)
                            .unwrap_or(false);
                        if flexible {
                            items.push(ScopeItem {
                                node: n,
                                level: PRIMAL_SCOPE,
                                transient: true,
                            });
                        }
                    }
                }
                self.gather_into(primary, items);
            }
            Construct::Denotation { .. } | Construct::Nihil | Construct::Skip => {}
            _ => {
                for child in self.tree[n].construct.children() {
                    self.gather_into(child, items);
                }
            }
        }
    }

    /// Every identifier ends with a scope assigned; defaults fall back to
    /// the lexical level of the declaring table.
    fn finish_tags(&mut self) {
        for i in 0..self.tabs.tag_count() {
            let id = crate::base::TagId::new(i);
            if self.tabs[id].kind == TagKind::Identifier && !self.tabs[id].scope_assigned {
                let level = self.tabs[self.tabs[id].table].level;
                let t = &mut self.tabs[id];
                t.scope = level;
                t.scope_assigned = true;
            }
        }
    }
}
