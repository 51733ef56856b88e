use std::fmt::Write as _;
use std::mem::Discriminant;
use std::ops::{Index, IndexMut};

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::base::Name;

use super::mode::{Mode, ModeId, ModeKind, PackEntry, Standard};

/// Handles to the modes installed by the registry itself: the standard plain
/// modes plus the handful of constructed modes the coercion rules and the
/// standard environ refer to by name.
#[derive(Debug, Clone, Copy)]
pub struct StdModes {
    pub void: ModeId,
    pub int: ModeId,
    pub long_int: ModeId,
    pub long_long_int: ModeId,
    pub real: ModeId,
    pub long_real: ModeId,
    pub long_long_real: ModeId,
    pub complex: ModeId,
    pub long_complex: ModeId,
    pub long_long_complex: ModeId,
    pub bool_: ModeId,
    pub char_: ModeId,
    pub bits: ModeId,
    pub long_bits: ModeId,
    pub long_long_bits: ModeId,
    pub bytes: ModeId,
    pub long_bytes: ModeId,
    pub format: ModeId,
    pub hip: ModeId,
    pub error: ModeId,
    pub undefined: ModeId,
    pub vacuum: ModeId,
    pub rows: ModeId,
    /// `[] BOOL`, widening target of BITS
    pub row_bool: ModeId,
    /// `[] CHAR`, widening target of BYTES and the mode of string denotations
    pub row_char: ModeId,
    /// `STRING = FLEX [] CHAR`
    pub string: ModeId,
    /// `PROC VOID`
    pub proc_void: ModeId,
}

/// The interning arena for modes.
///
/// `register` either returns an existing structurally-equivalent mode or
/// inserts the candidate; all constructors go through it, so id equality is
/// mode equality everywhere downstream.
#[derive(Debug)]
pub struct ModeRegistry {
    arena: Vec<Mode>,
    /// Index bucketing modes by kind, so interning scans only candidates
    by_kind: FxHashMap<Discriminant<ModeKind>, Vec<ModeId>>,
    pub std: StdModes,
}

impl Index<ModeId> for ModeRegistry {
    type Output = Mode;
    fn index(&self, id: ModeId) -> &Mode {
        &self.arena[id.index()]
    }
}

impl IndexMut<ModeId> for ModeRegistry {
    fn index_mut(&mut self, id: ModeId) -> &mut Mode {
        &mut self.arena[id.index()]
    }
}

impl ModeRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            arena: Vec::new(),
            by_kind: FxHashMap::default(),
            std: StdModes {
                void: ModeId(0),
                int: ModeId(0),
                long_int: ModeId(0),
                long_long_int: ModeId(0),
                real: ModeId(0),
                long_real: ModeId(0),
                long_long_real: ModeId(0),
                complex: ModeId(0),
                long_complex: ModeId(0),
                long_long_complex: ModeId(0),
                bool_: ModeId(0),
                char_: ModeId(0),
                bits: ModeId(0),
                long_bits: ModeId(0),
                long_long_bits: ModeId(0),
                bytes: ModeId(0),
                long_bytes: ModeId(0),
                format: ModeId(0),
                hip: ModeId(0),
                error: ModeId(0),
                undefined: ModeId(0),
                vacuum: ModeId(0),
                rows: ModeId(0),
                row_bool: ModeId(0),
                row_char: ModeId(0),
                string: ModeId(0),
                proc_void: ModeId(0),
            },
        };
        reg.install_standard();
        reg
    }

    fn install_standard(&mut self) {
        let void = self.alloc(Mode::new(ModeKind::Standard(Standard::Void)));
        let int = self.alloc(Mode::new(ModeKind::Standard(Standard::Int)));
        let long_int = self.alloc(Mode::new(ModeKind::Standard(Standard::LongInt)));
        let long_long_int = self.alloc(Mode::new(ModeKind::Standard(Standard::LongLongInt)));
        let real = self.alloc(Mode::new(ModeKind::Standard(Standard::Real)));
        let long_real = self.alloc(Mode::new(ModeKind::Standard(Standard::LongReal)));
        let long_long_real = self.alloc(Mode::new(ModeKind::Standard(Standard::LongLongReal)));
        let complex = self.alloc(Mode::new(ModeKind::Standard(Standard::Complex)));
        let long_complex = self.alloc(Mode::new(ModeKind::Standard(Standard::LongComplex)));
        let long_long_complex =
            self.alloc(Mode::new(ModeKind::Standard(Standard::LongLongComplex)));
        let bool_ = self.alloc(Mode::new(ModeKind::Standard(Standard::Bool)));
        let char_ = self.alloc(Mode::new(ModeKind::Standard(Standard::Char)));
        let bits = self.alloc(Mode::new(ModeKind::Standard(Standard::Bits)));
        let long_bits = self.alloc(Mode::new(ModeKind::Standard(Standard::LongBits)));
        let long_long_bits = self.alloc(Mode::new(ModeKind::Standard(Standard::LongLongBits)));
        let bytes = self.alloc(Mode::new(ModeKind::Standard(Standard::Bytes)));
        let long_bytes = self.alloc(Mode::new(ModeKind::Standard(Standard::LongBytes)));
        let format = self.alloc(Mode::new(ModeKind::Standard(Standard::Format)));
        let hip = self.alloc(Mode::new(ModeKind::Hip));
        let error = self.alloc(Mode::new(ModeKind::Error));
        let undefined = self.alloc(Mode::new(ModeKind::Undefined));
        let vacuum = self.alloc(Mode::new(ModeKind::Vacuum));
        let rows = self.alloc(Mode::new(ModeKind::Rows));

        self.std.void = void;
        self.std.int = int;
        self.std.long_int = long_int;
        self.std.long_long_int = long_long_int;
        self.std.real = real;
        self.std.long_real = long_real;
        self.std.long_long_real = long_long_real;
        self.std.complex = complex;
        self.std.long_complex = long_complex;
        self.std.long_long_complex = long_long_complex;
        self.std.bool_ = bool_;
        self.std.char_ = char_;
        self.std.bits = bits;
        self.std.long_bits = long_bits;
        self.std.long_long_bits = long_long_bits;
        self.std.bytes = bytes;
        self.std.long_bytes = long_bytes;
        self.std.format = format;
        self.std.hip = hip;
        self.std.error = error;
        self.std.undefined = undefined;
        self.std.vacuum = vacuum;
        self.std.rows = rows;

        self.std.row_bool = self.row(1, bool_);
        self.std.row_char = self.row(1, char_);
        self.std.string = self.flex(self.std.row_char);
        self.std.proc_void = self.proc(Vec::new(), void);
    }

    fn alloc(&mut self, mut mode: Mode) -> ModeId {
        mode.number = self.arena.len() as u32 + 1;
        let id = ModeId::new(self.arena.len());
        let key = std::mem::discriminant(&mode.kind);
        self.arena.push(mode);
        self.by_kind.entry(key).or_default().push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = ModeId> {
        (0..self.arena.len()).map(ModeId::new)
    }

    // ============================================================
    // Interning
    // ============================================================

    /// Intern a mode: return an existing structurally-equivalent record or
    /// insert the candidate.
    pub fn register(&mut self, m: Mode) -> ModeId {
        let key = std::mem::discriminant(&m.kind);
        let candidate = self.alloc(m);
        let bucket: Vec<ModeId> = self
            .by_kind
            .get(&key)
            .map(|b| b.iter().copied().filter(|&id| id != candidate).collect())
            .unwrap_or_default();
        for existing in bucket {
            if self.structurally_equivalent(existing, candidate) {
                trace!(hit = existing.0, "register: interned to existing mode");
                self.arena.pop();
                if let Some(b) = self.by_kind.get_mut(&key) {
                    b.pop();
                }
                return existing;
            }
        }
        trace!(new = candidate.0, "register: new mode");
        candidate
    }

    /// Follow indicant equivalences to the underlying mode record.
    pub fn underlying(&self, m: ModeId) -> ModeId {
        let mut cur = m;
        // Bound indicant chains are short; guard against malformed loops.
        for _ in 0..self.arena.len() + 1 {
            let rec = &self[cur];
            if rec.kind == ModeKind::Indicant {
                match rec.equivalent {
                    Some(next) if next != cur => cur = next,
                    _ => return cur,
                }
            } else {
                return cur;
            }
        }
        cur
    }

    // ============================================================
    // Structural equivalence under postulation
    // ============================================================

    /// The coinductive equivalence test: assume `a ≡ b`, compare kinds, dims
    /// and corresponding pack elements; the postulate stack breaks cycles.
    pub fn structurally_equivalent(&self, a: ModeId, b: ModeId) -> bool {
        let mut postulates = Vec::new();
        self.equivalent_under(a, b, &mut postulates)
    }

    fn equivalent_under(&self, a: ModeId, b: ModeId, post: &mut Vec<(ModeId, ModeId)>) -> bool {
        if a == b {
            return true;
        }
        let a = self.underlying(a);
        let b = self.underlying(b);
        if a == b {
            return true;
        }
        if post
            .iter()
            .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
        {
            return true;
        }
        let ma = &self[a];
        let mb = &self[b];
        if std::mem::discriminant(&ma.kind) != std::mem::discriminant(&mb.kind) {
            return false;
        }
        if let (ModeKind::Standard(sa), ModeKind::Standard(sb)) = (ma.kind, mb.kind) {
            return sa == sb;
        }
        if ma.dim != mb.dim || ma.pack.len() != mb.pack.len() {
            return false;
        }
        post.push((a, b));
        let ok = match ma.kind {
            ModeKind::Ref | ModeKind::Flex | ModeKind::Row => {
                self.subs_equivalent(ma.sub, mb.sub, post)
            }
            ModeKind::Proc => {
                self.subs_equivalent(ma.sub, mb.sub, post)
                    && self.packs_equivalent(a, b, false, post)
            }
            ModeKind::Struct => self.packs_equivalent(a, b, true, post),
            ModeKind::Series | ModeKind::Stowed => self.packs_equivalent(a, b, false, post),
            ModeKind::Union => self.unions_equivalent(a, b, post),
            // Unbound indicants are equal only to themselves
            ModeKind::Indicant => false,
            // Singleton kinds compare by kind alone
            ModeKind::Rows
            | ModeKind::Hip
            | ModeKind::Error
            | ModeKind::Undefined
            | ModeKind::Vacuum => true,
            ModeKind::Standard(_) => unreachable!("handled above"),
        };
        post.pop();
        ok
    }

    fn subs_equivalent(
        &self,
        a: Option<ModeId>,
        b: Option<ModeId>,
        post: &mut Vec<(ModeId, ModeId)>,
    ) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => self.equivalent_under(a, b, post),
            (None, None) => true,
            _ => false,
        }
    }

    fn packs_equivalent(
        &self,
        a: ModeId,
        b: ModeId,
        match_names: bool,
        post: &mut Vec<(ModeId, ModeId)>,
    ) -> bool {
        let len = self[a].pack.len();
        for i in 0..len {
            let (am, an) = {
                let e = &self[a].pack[i];
                (e.mode, e.text.clone())
            };
            let (bm, bn) = {
                let e = &self[b].pack[i];
                (e.mode, e.text.clone())
            };
            if match_names && am_name(&an) != am_name(&bn) {
                return false;
            }
            if !self.equivalent_under(am, bm, post) {
                return false;
            }
        }
        true
    }

    /// UNION packs: element order is insignificant for equivalence.
    fn unions_equivalent(&self, a: ModeId, b: ModeId, post: &mut Vec<(ModeId, ModeId)>) -> bool {
        let len = self[a].pack.len();
        let mut taken = vec![false; len];
        for i in 0..len {
            let am = self[a].pack[i].mode;
            let mut found = false;
            for (j, slot) in taken.iter_mut().enumerate() {
                if *slot {
                    continue;
                }
                let bm = self[b].pack[j].mode;
                if self.equivalent_under(am, bm, post) {
                    *slot = true;
                    found = true;
                    break;
                }
            }
            if !found {
                return false;
            }
        }
        true
    }

    // ============================================================
    // Constructors
    // ============================================================

    pub fn ref_to(&mut self, sub: ModeId) -> ModeId {
        let mut m = Mode::with_sub(ModeKind::Ref, sub);
        m.has_ref = true;
        m.has_flex = self[sub].has_flex;
        m.has_rows = self[sub].has_rows;
        self.register(m)
    }

    pub fn flex(&mut self, sub: ModeId) -> ModeId {
        let mut m = Mode::with_sub(ModeKind::Flex, sub);
        m.has_ref = self[sub].has_ref;
        m.has_flex = true;
        m.has_rows = true;
        m.dim = self[sub].dim;
        self.register(m)
    }

    pub fn row(&mut self, dim: u32, sub: ModeId) -> ModeId {
        let mut m = Mode::with_sub(ModeKind::Row, sub);
        m.dim = dim;
        m.has_ref = self[sub].has_ref;
        m.has_flex = self[sub].has_flex;
        m.has_rows = true;
        self.register(m)
    }

    pub fn proc(&mut self, params: Vec<ModeId>, yield_: ModeId) -> ModeId {
        let mut m = Mode::with_pack(
            ModeKind::Proc,
            params.into_iter().map(PackEntry::new).collect(),
        );
        m.dim = m.pack.len() as u32;
        m.sub = Some(yield_);
        self.register(m)
    }

    pub fn structure(&mut self, fields: Vec<(Name, ModeId)>) -> ModeId {
        let pack = fields
            .into_iter()
            .map(|(name, mode)| PackEntry::named(mode, name))
            .collect();
        self.structure_pack(pack)
    }

    pub fn structure_pack(&mut self, pack: Vec<PackEntry>) -> ModeId {
        let mut m = Mode::with_pack(ModeKind::Struct, pack);
        for e in &m.pack {
            m.has_ref |= self[e.mode].has_ref;
            m.has_flex |= self[e.mode].has_flex;
            m.has_rows |= self[e.mode].has_rows;
        }
        self.register(m)
    }

    /// Build a UNION and absorb it: nested unions are flattened, duplicate
    /// members removed, a singleton collapses to its sole member.
    pub fn union_of(&mut self, members: Vec<ModeId>) -> ModeId {
        let mut flat: Vec<ModeId> = Vec::new();
        let mut work = members;
        while let Some(m) = work.pop() {
            let u = self.underlying(m);
            if self[u].kind == ModeKind::Union {
                work.extend(self[u].pack.iter().map(|e| e.mode));
            } else {
                flat.push(m);
            }
        }
        let mut canon: Vec<ModeId> = Vec::new();
        for m in flat {
            if !canon.iter().any(|&c| self.structurally_equivalent(c, m)) {
                canon.push(m);
            }
        }
        canon.sort_by_key(|&m| self[m].number);
        if canon.len() == 1 {
            return canon[0];
        }
        let mut m = Mode::with_pack(
            ModeKind::Union,
            canon.into_iter().map(PackEntry::new).collect(),
        );
        for e in &m.pack {
            m.has_ref |= self[e.mode].has_ref;
            m.has_flex |= self[e.mode].has_flex;
            m.has_rows |= self[e.mode].has_rows;
        }
        m.dim = m.pack.len() as u32;
        self.register(m)
    }

    /// Transient series/stowed mode over member yields; internal to
    /// balancing and display coercion.
    pub fn stowed_of(&mut self, members: Vec<ModeId>) -> ModeId {
        let mut m = Mode::with_pack(
            ModeKind::Stowed,
            members.into_iter().map(PackEntry::new).collect(),
        );
        m.dim = m.pack.len() as u32;
        self.register(m)
    }

    pub fn series_of(&mut self, members: Vec<ModeId>) -> ModeId {
        let mut m = Mode::with_pack(
            ModeKind::Series,
            members.into_iter().map(PackEntry::new).collect(),
        );
        m.dim = m.pack.len() as u32;
        self.register(m)
    }

    /// A fresh mode indicant. Each declaration is a distinct record; it is
    /// not interned until bound.
    pub fn indicant(&mut self, name: Name) -> ModeId {
        let mut m = Mode::new(ModeKind::Indicant);
        m.text = Some(name);
        self.alloc(m)
    }

    /// Bind an indicant to its actual mode, checking well-formedness: every
    /// recursion through the indicant must pass REF or PROC. An unguarded
    /// cycle (a "self-mode" such as `MODE T = T`) is ill-formed and the
    /// indicant is equated to the error mode.
    pub fn bind_indicant(&mut self, ind: ModeId, actual: ModeId) -> bool {
        let mut visited = Vec::new();
        if self.reaches_unguarded(actual, ind, &mut visited) {
            self[ind].well_formed = false;
            self[ind].equivalent = Some(self.std.error);
            trace!(indicant = ind.0, "bind_indicant: ill-formed mode");
            return false;
        }
        self[ind].equivalent = Some(actual);
        let (has_ref, has_flex, has_rows) = {
            let a = &self[actual];
            (a.has_ref, a.has_flex, a.has_rows)
        };
        let rec = &mut self[ind];
        rec.has_ref = has_ref;
        rec.has_flex = has_flex;
        rec.has_rows = has_rows;
        self.refresh_flags();
        self.link_equivalents();
        true
    }

    /// Whether `m` reaches `target` without passing a REF or PROC guard.
    fn reaches_unguarded(&self, m: ModeId, target: ModeId, visited: &mut Vec<ModeId>) -> bool {
        if m == target {
            return true;
        }
        if visited.contains(&m) {
            return false;
        }
        visited.push(m);
        let rec = &self[m];
        match rec.kind {
            ModeKind::Ref | ModeKind::Proc => false,
            ModeKind::Indicant => rec
                .equivalent
                .is_some_and(|e| self.reaches_unguarded(e, target, visited)),
            ModeKind::Flex | ModeKind::Row => rec
                .sub
                .is_some_and(|s| self.reaches_unguarded(s, target, visited)),
            ModeKind::Struct | ModeKind::Union | ModeKind::Series | ModeKind::Stowed => rec
                .pack
                .iter()
                .map(|e| e.mode)
                .collect::<Vec<_>>()
                .into_iter()
                .any(|e| self.reaches_unguarded(e, target, visited)),
            _ => false,
        }
    }

    /// After binding an indicant, older modes may have become structurally
    /// equivalent to modes built in terms of it; record each proof in the
    /// `equivalent` view so the registry holds no unlinked duplicates.
    fn link_equivalents(&mut self) {
        for j in 1..self.arena.len() {
            let b = ModeId::new(j);
            if self[b].equivalent.is_some() || self[b].kind == ModeKind::Indicant {
                continue;
            }
            for i in 0..j {
                let a = ModeId::new(i);
                if self[a].kind == ModeKind::Indicant {
                    continue;
                }
                if std::mem::discriminant(&self[a].kind)
                    == std::mem::discriminant(&self[b].kind)
                    && self.structurally_equivalent(a, b)
                {
                    self[b].equivalent = Some(a);
                    self[b].derivate = true;
                    break;
                }
            }
        }
    }

    /// Fixpoint sweep re-deriving has_ref/has_flex/has_rows; needed once
    /// recursive modes close their cycles at bind time.
    fn refresh_flags(&mut self) {
        loop {
            let mut changed = false;
            for i in 0..self.arena.len() {
                let id = ModeId::new(i);
                let (mut r, mut f, mut w) = {
                    let m = &self[id];
                    (m.has_ref, m.has_flex, m.has_rows)
                };
                match self[id].kind {
                    ModeKind::Ref => r = true,
                    ModeKind::Flex => {
                        f = true;
                        w = true;
                    }
                    ModeKind::Row => w = true,
                    _ => {}
                }
                if let Some(s) = self[id].sub {
                    let m = &self[s];
                    // REF shields flexibility of what it refers to only for
                    // rows; name flags still propagate
                    r |= m.has_ref;
                    f |= m.has_flex;
                    w |= m.has_rows;
                }
                let members: Vec<ModeId> = self[id].pack.iter().map(|e| e.mode).collect();
                for e in members {
                    let m = &self[e];
                    r |= m.has_ref;
                    f |= m.has_flex;
                    w |= m.has_rows;
                }
                let m = &mut self[id];
                if (m.has_ref, m.has_flex, m.has_rows) != (r, f, w) {
                    m.has_ref = r;
                    m.has_flex = f;
                    m.has_rows = w;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    // ============================================================
    // Display
    // ============================================================

    /// Render a mode the way diagnostics spell it, e.g. `REF FLEX [] CHAR`.
    pub fn display(&self, m: ModeId) -> String {
        let mut out = String::new();
        self.display_into(m, &mut out, &mut Vec::new());
        out
    }

    fn display_into(&self, m: ModeId, out: &mut String, stack: &mut Vec<ModeId>) {
        if stack.contains(&m) {
            out.push_str("...");
            return;
        }
        stack.push(m);
        let rec = &self[m];
        match rec.kind {
            ModeKind::Standard(s) => out.push_str(s.as_str()),
            ModeKind::Indicant => match &rec.text {
                Some(t) => out.push_str(t),
                None => out.push_str("MODE"),
            },
            ModeKind::Ref => {
                out.push_str("REF ");
                self.display_sub(rec.sub, out, stack);
            }
            ModeKind::Flex => {
                out.push_str("FLEX ");
                self.display_sub(rec.sub, out, stack);
            }
            ModeKind::Row => {
                let _ = write!(out, "[{}] ", ",".repeat(rec.dim.saturating_sub(1) as usize));
                self.display_sub(rec.sub, out, stack);
            }
            ModeKind::Proc => {
                out.push_str("PROC ");
                if !rec.pack.is_empty() {
                    out.push('(');
                    for (i, e) in rec.pack.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.display_into(e.mode, out, stack);
                    }
                    out.push_str(") ");
                }
                self.display_sub(rec.sub, out, stack);
            }
            ModeKind::Struct => {
                out.push_str("STRUCT (");
                for (i, e) in rec.pack.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.display_into(e.mode, out, stack);
                    if let Some(t) = &e.text {
                        let _ = write!(out, " {t}");
                    }
                }
                out.push(')');
            }
            ModeKind::Union => {
                out.push_str("UNION (");
                for (i, e) in rec.pack.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.display_into(e.mode, out, stack);
                }
                out.push(')');
            }
            ModeKind::Series | ModeKind::Stowed => {
                out.push('(');
                for (i, e) in rec.pack.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.display_into(e.mode, out, stack);
                }
                out.push(')');
            }
            ModeKind::Rows => out.push_str("ROWS"),
            ModeKind::Hip => out.push_str("HIP"),
            ModeKind::Error => out.push_str("erroneous mode"),
            ModeKind::Undefined => out.push_str("undefined mode"),
            ModeKind::Vacuum => out.push_str("vacuum"),
        }
        stack.pop();
    }

    fn display_sub(&self, sub: Option<ModeId>, out: &mut String, stack: &mut Vec<ModeId>) {
        match sub {
            Some(s) => self.display_into(s, out, stack),
            None => out.push('?'),
        }
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn am_name(n: &Option<Name>) -> Option<&str> {
    n.as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_intern() {
        let mut reg = ModeRegistry::new();
        let a = reg.ref_to(reg.std.int);
        let b = reg.ref_to(reg.std.int);
        assert_eq!(a, b);
        let r1 = reg.row(1, reg.std.real);
        let r2 = reg.row(1, reg.std.real);
        assert_eq!(r1, r2);
        let r3 = reg.row(2, reg.std.real);
        assert_ne!(r1, r3);
    }

    #[test]
    fn test_union_absorption() {
        let mut reg = ModeRegistry::new();
        let inner = reg.union_of(vec![reg.std.int, reg.std.real]);
        let outer = reg.union_of(vec![reg.std.bool_, inner, reg.std.int]);
        let rec = &reg[outer];
        assert_eq!(rec.kind, ModeKind::Union);
        assert_eq!(rec.pack.len(), 3);
        // Element order insignificant
        let swapped = reg.union_of(vec![reg.std.int, reg.std.bool_, reg.std.real]);
        assert_eq!(outer, swapped);
    }

    #[test]
    fn test_union_singleton_collapses() {
        let mut reg = ModeRegistry::new();
        let u = reg.union_of(vec![reg.std.int, reg.std.int]);
        assert_eq!(u, reg.std.int);
    }

    #[test]
    fn test_recursive_mode_equivalence() {
        let mut reg = ModeRegistry::new();
        let mut names = crate::base::Interner::new();

        // MODE L = STRUCT (REF L next, INT val)
        let l = reg.indicant(names.intern("l"));
        let ref_l = reg.ref_to(l);
        let s_l = reg.structure(vec![
            (names.intern("next"), ref_l),
            (names.intern("val"), reg.std.int),
        ]);
        assert!(reg.bind_indicant(l, s_l));

        // MODE M = STRUCT (REF M next, INT val)
        let m = reg.indicant(names.intern("m"));
        let ref_m = reg.ref_to(m);
        let s_m = reg.structure(vec![
            (names.intern("next"), ref_m),
            (names.intern("val"), reg.std.int),
        ]);
        assert!(reg.bind_indicant(m, s_m));

        assert_ne!(s_l, s_m);
        assert!(reg.structurally_equivalent(s_l, s_m));
        assert!(reg.structurally_equivalent(l, m));
        // The proof is recorded in the equivalent view
        assert_eq!(reg[s_m].equivalent, Some(s_l));
    }

    #[test]
    fn test_self_mode_is_ill_formed() {
        let mut reg = ModeRegistry::new();
        let mut names = crate::base::Interner::new();
        // MODE T = T
        let t = reg.indicant(names.intern("t"));
        assert!(!reg.bind_indicant(t, t));
        assert_eq!(reg.underlying(t), reg.std.error);
    }

    #[test]
    fn test_unguarded_struct_recursion_is_ill_formed() {
        let mut reg = ModeRegistry::new();
        let mut names = crate::base::Interner::new();
        // MODE T = STRUCT (T t)
        let t = reg.indicant(names.intern("t"));
        let s = reg.structure(vec![(names.intern("t"), t)]);
        assert!(!reg.bind_indicant(t, s));
    }

    #[test]
    fn test_display() {
        let mut reg = ModeRegistry::new();
        let r = reg.ref_to(reg.std.string);
        assert_eq!(reg.display(r), "REF FLEX [] CHAR");
        let p = reg.proc(vec![reg.std.int, reg.std.real], reg.std.bool_);
        assert_eq!(reg.display(p), "PROC (INT, REAL) BOOL");
        let row2 = reg.row(2, reg.std.real);
        assert_eq!(reg.display(row2), "[,] REAL");
    }
}
