//! The coercion relation of the Revised Report: `coercible(p, q, sort,
//! deflex)` with the strength lattice SOFT ⊂ WEAK ⊂ MEEK ⊂ FIRM ⊂ STRONG.
//!
//! The predicate is total and never reports through panics; the caller (the
//! mode checker) turns a refusal into ERROR_CANNOT_COERCE. HIP and the error
//! mode coerce with anything, which suppresses cascaded diagnostics.

use crate::modes::{ModeId, ModeKind, ModeRegistry, Standard};

/// The required coercion strength of a syntactic position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sort {
    NoSort,
    Soft,
    Weak,
    Meek,
    Firm,
    Strong,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::NoSort => "no",
            Sort::Soft => "soft",
            Sort::Weak => "weak",
            Sort::Meek => "meek",
            Sort::Firm => "firm",
            Sort::Strong => "strong",
        }
    }
}

/// Whether `FLEX [] M` may stand where `[] M` is expected.
///
/// FORCE allows it unconditionally (value contexts), SAFE forbids it where a
/// name could be aliased, ALIAS permits only one-way `REF FLEX → REF`, SKIP
/// disables the check entirely (diagnostic quality only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeflexPolicy {
    NoDeflex,
    Safe,
    Alias,
    Force,
    Skip,
}

/// What a weak secondary turned out to select from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructView {
    /// A plain structure value
    Plain,
    /// A name of a structure: selection yields `REF field`
    Name,
    /// A row of structures: selection goes through the structure-of-rows
    /// view and yields a row of the field
    RowValue(u32),
    /// A name of a row of structures: selection yields a name of a row of
    /// the field
    RowName(u32),
}

impl ModeRegistry {
    /// Whether two modes count as equal under the chosen deflex policy.
    /// Structural equivalence under postulation counts as equality, since
    /// the registry may hold linked duplicates from separate indicants.
    pub fn modes_equal(&mut self, p: ModeId, q: ModeId, policy: DeflexPolicy) -> bool {
        if p == q || self.structurally_equivalent(p, q) {
            return true;
        }
        match policy {
            DeflexPolicy::NoDeflex => false,
            DeflexPolicy::Safe => {
                let pu = self.underlying(p);
                let qu = self.underlying(q);
                if self[pu].is_ref() || self[qu].is_ref() {
                    return false;
                }
                let dp = self.deflexed(p);
                let dq = self.deflexed(q);
                dp == dq || self.structurally_equivalent(dp, dq)
            }
            DeflexPolicy::Alias => {
                let dp = self.deflexed_through_ref(p);
                dp == q || self.structurally_equivalent(dp, q)
            }
            DeflexPolicy::Force | DeflexPolicy::Skip => {
                let dp = self.deflexed_through_ref(p);
                let dq = self.deflexed_through_ref(q);
                dp == dq || self.structurally_equivalent(dp, dq)
            }
        }
    }

    /// Deflex, also stripping FLEX one level beneath a top REF (the view the
    /// ALIAS policy compares).
    fn deflexed_through_ref(&mut self, m: ModeId) -> ModeId {
        let u = self.underlying(m);
        if self[u].is_ref() {
            match self[u].sub {
                Some(sub) => {
                    let d = self.deflexed(sub);
                    if d == sub { u } else { self.ref_to(d) }
                }
                None => u,
            }
        } else {
            self.deflexed(m)
        }
    }

    /// HIP and the error mode coerce with anything.
    pub fn is_bottom(&self, m: ModeId) -> bool {
        matches!(
            self[self.underlying(m)].kind,
            ModeKind::Hip | ModeKind::Error
        )
    }

    /// Strip one REF or one parameterless PROC.
    pub fn depref_once(&self, m: ModeId) -> Option<ModeId> {
        let u = self.underlying(m);
        let rec = &self[u];
        if rec.is_ref() || rec.is_parameterless_proc() {
            rec.sub
        } else {
            None
        }
    }

    /// The mode and all its depreffed stages, outermost first.
    pub fn depref_chain(&self, m: ModeId) -> Vec<ModeId> {
        let mut chain = vec![m];
        let mut cur = m;
        while let Some(next) = self.depref_once(cur) {
            // Malformed self-referencing chains stop here
            if chain.contains(&next) {
                break;
            }
            chain.push(next);
            cur = next;
        }
        chain
    }

    // ============================================================
    // Widening
    // ============================================================

    fn standard_of(&self, m: ModeId) -> Option<Standard> {
        match self[self.underlying(m)].kind {
            ModeKind::Standard(s) => Some(s),
            _ => None,
        }
    }

    fn is_int_like(s: Standard) -> bool {
        matches!(s, Standard::Int | Standard::LongInt | Standard::LongLongInt)
    }

    fn is_real_like(s: Standard) -> bool {
        matches!(
            s,
            Standard::Real | Standard::LongReal | Standard::LongLongReal
        )
    }

    /// One step of the widening chain from `p` toward `q`: lengthenings
    /// within a chain, INT→REAL and REAL→COMPLEX at equal length,
    /// BITS→[]BOOL and BYTES→[]CHAR.
    pub fn widen_step(&mut self, p: ModeId, q: ModeId) -> Option<ModeId> {
        let qd = self.deflexed(q);
        let ps = self.standard_of(p)?;
        // Bit and byte packings widen to rows
        if qd == self.std.row_bool
            && matches!(
                ps,
                Standard::Bits | Standard::LongBits | Standard::LongLongBits
            )
        {
            return Some(self.std.row_bool);
        }
        if qd == self.std.row_char && matches!(ps, Standard::Bytes | Standard::LongBytes) {
            return Some(self.std.row_char);
        }
        let qs = self.standard_of(q)?;
        let toward_int = Self::is_int_like(qs);
        let toward_real = Self::is_real_like(qs);
        let step = match ps {
            Standard::Int if toward_int => Standard::LongInt,
            Standard::LongInt if toward_int => Standard::LongLongInt,
            Standard::Int => Standard::Real,
            Standard::LongInt => Standard::LongReal,
            Standard::LongLongInt => Standard::LongLongReal,
            Standard::Real if toward_real => Standard::LongReal,
            Standard::LongReal if toward_real => Standard::LongLongReal,
            Standard::Real => Standard::Complex,
            Standard::LongReal => Standard::LongComplex,
            Standard::LongLongReal => Standard::LongLongComplex,
            Standard::Complex => Standard::LongComplex,
            Standard::LongComplex => Standard::LongLongComplex,
            Standard::Bits => Standard::LongBits,
            Standard::LongBits => Standard::LongLongBits,
            Standard::Bytes => Standard::LongBytes,
            _ => return None,
        };
        Some(self.standard_mode(step))
    }

    fn standard_mode(&self, s: Standard) -> ModeId {
        match s {
            Standard::Void => self.std.void,
            Standard::Int => self.std.int,
            Standard::LongInt => self.std.long_int,
            Standard::LongLongInt => self.std.long_long_int,
            Standard::Real => self.std.real,
            Standard::LongReal => self.std.long_real,
            Standard::LongLongReal => self.std.long_long_real,
            Standard::Complex => self.std.complex,
            Standard::LongComplex => self.std.long_complex,
            Standard::LongLongComplex => self.std.long_long_complex,
            Standard::Bool => self.std.bool_,
            Standard::Char => self.std.char_,
            Standard::Bits => self.std.bits,
            Standard::LongBits => self.std.long_bits,
            Standard::LongLongBits => self.std.long_long_bits,
            Standard::Bytes => self.std.bytes,
            Standard::LongBytes => self.std.long_bytes,
            Standard::Format => self.std.format,
        }
    }

    /// Whether repeated widening steps take `p` to `q`.
    pub fn widens_to(&mut self, p: ModeId, q: ModeId) -> bool {
        let target = self.deflexed(q);
        let mut cur = p;
        // The widening chain is short; twelve steps cover the longest path
        for _ in 0..12 {
            if self.deflexed(cur) == target {
                return cur != p;
            }
            match self.widen_step(cur, q) {
                Some(next) => cur = next,
                None => return false,
            }
        }
        false
    }

    // ============================================================
    // Uniting
    // ============================================================

    /// Whether `p` may be united into `q`: `q` is a UNION whose pack
    /// contains `p` (nesting was flattened at construction).
    pub fn unitable(&mut self, p: ModeId, q: ModeId, policy: DeflexPolicy) -> bool {
        let qu = self.underlying(q);
        if self[qu].kind != ModeKind::Union {
            return false;
        }
        let members: Vec<ModeId> = self[qu].pack.iter().map(|e| e.mode).collect();
        members.into_iter().any(|m| self.modes_equal(p, m, policy))
    }

    // ============================================================
    // The relation, sort by sort
    // ============================================================

    fn softly(&mut self, p: ModeId, q: ModeId, policy: DeflexPolicy) -> bool {
        if self.is_bottom(p) || self.is_bottom(q) || self.modes_equal(p, q, policy) {
            return true;
        }
        let u = self.underlying(p);
        if self[u].is_parameterless_proc() {
            match self[u].sub {
                Some(sub) => self.softly(sub, q, policy),
                None => false,
            }
        } else {
            false
        }
    }

    /// The depref closure shared by the WEAK and MEEK predicates. The weak
    /// restriction (never lose the last name) is enforced where the Report
    /// puts it: in the checker's weak positions and the inserter's chains.
    fn depref_coercible(&mut self, p: ModeId, q: ModeId, policy: DeflexPolicy) -> bool {
        if self.is_bottom(p) || self.is_bottom(q) || self.modes_equal(p, q, policy) {
            return true;
        }
        match self.depref_once(p) {
            Some(d) => self.depref_coercible(d, q, policy),
            None => false,
        }
    }

    fn firmly(&mut self, p: ModeId, q: ModeId, policy: DeflexPolicy) -> bool {
        if self.is_bottom(p) || self.is_bottom(q) || self.modes_equal(p, q, policy) {
            return true;
        }
        // The generic ROWS operand of standard operators such as UPB
        if self[self.underlying(q)].kind == ModeKind::Rows {
            let chain = self.depref_chain(p);
            return chain.into_iter().any(|m| {
                let d = self.deflexed(m);
                self[self.underlying(d)].is_row_like()
            });
        }
        if self.unitable(p, q, policy) {
            return true;
        }
        match self.depref_once(p) {
            Some(d) => self.firmly(d, q, policy),
            None => false,
        }
    }

    /// One row level of the target stripped: the source mode a rowing
    /// coercion rows up from. Recurses through NAME for `REF [...]` targets
    /// and through SUB for FLEX.
    pub fn row_source(&mut self, q: ModeId) -> Option<ModeId> {
        let u = self.underlying(q);
        match self[u].kind {
            ModeKind::Row | ModeKind::Flex => self.slice_of(u),
            ModeKind::Ref => {
                let sub = self[u].sub?;
                let su = self.underlying(sub);
                if self[su].is_row_like() {
                    self.name_of(u)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn strongly(&mut self, p: ModeId, q: ModeId, policy: DeflexPolicy) -> bool {
        if self.is_bottom(p) || self.is_bottom(q) {
            return true;
        }
        let pu = self.underlying(p);
        // Collateral displays coerce pack-wise to their target
        match self[pu].kind {
            ModeKind::Series | ModeKind::Stowed => return self.stowed_coercible(pu, q, policy),
            ModeKind::Vacuum => {
                let qd = self.deflexed(q);
                return self[self.underlying(qd)].is_row_like();
            }
            _ => {}
        }
        if self.firmly(p, q, policy) {
            return true;
        }
        // Voiding accepts any yield
        let qd = self.deflexed(q);
        if self.underlying(qd) == self.std.void {
            return true;
        }
        // Widening applies to any depreffed stage
        let chain = self.depref_chain(p);
        for d in chain {
            if self.widens_to(d, q) {
                return true;
            }
        }
        // Rowing: strip one row level of the target and recurse
        if let Some(src) = self.row_source(q) {
            return self.strongly(p, src, policy);
        }
        false
    }

    /// A display of yields coerces element-wise to the target structure or
    /// row.
    fn stowed_coercible(&mut self, p: ModeId, q: ModeId, policy: DeflexPolicy) -> bool {
        let qd = self.deflexed(q);
        let qu = self.underlying(qd);
        let members: Vec<ModeId> = self[p].pack.iter().map(|e| e.mode).collect();
        match self[qu].kind {
            ModeKind::Row | ModeKind::Flex => match self.slice_of(qu) {
                Some(elem) => members
                    .into_iter()
                    .all(|m| self.strongly(m, elem, policy)),
                None => false,
            },
            ModeKind::Struct => {
                if self[qu].pack.len() != members.len() {
                    return false;
                }
                let fields: Vec<ModeId> = self[qu].pack.iter().map(|e| e.mode).collect();
                members
                    .into_iter()
                    .zip(fields)
                    .all(|(m, f)| self.strongly(m, f, policy))
            }
            _ => false,
        }
    }

    /// The central predicate: may a value of mode `p` stand in a position
    /// that requires mode `q` at strength `sort`?
    pub fn coercible(&mut self, p: ModeId, q: ModeId, sort: Sort, policy: DeflexPolicy) -> bool {
        match sort {
            Sort::NoSort => {
                self.is_bottom(p) || self.is_bottom(q) || self.modes_equal(p, q, policy)
            }
            Sort::Soft => self.softly(p, q, policy),
            Sort::Weak | Sort::Meek => self.depref_coercible(p, q, policy),
            Sort::Firm => self.firmly(p, q, policy),
            Sort::Strong => self.strongly(p, q, policy),
        }
    }

    /// Explain a refusal inside a display: descend SERIES/STOWED packs and
    /// report the first component that does not coerce to its element or
    /// field mode.
    pub fn cannot_coerce_component(
        &mut self,
        p: ModeId,
        q: ModeId,
        policy: DeflexPolicy,
    ) -> Option<(ModeId, ModeId)> {
        let pu = self.underlying(p);
        if !matches!(self[pu].kind, ModeKind::Series | ModeKind::Stowed) {
            return None;
        }
        let qd = self.deflexed(q);
        let qu = self.underlying(qd);
        let members: Vec<ModeId> = self[pu].pack.iter().map(|e| e.mode).collect();
        let targets: Vec<ModeId> = match self[qu].kind {
            ModeKind::Row | ModeKind::Flex => {
                let elem = self.slice_of(qu)?;
                vec![elem; members.len()]
            }
            ModeKind::Struct if self[qu].pack.len() == members.len() => {
                self[qu].pack.iter().map(|e| e.mode).collect()
            }
            _ => return None,
        };
        for (m, t) in members.into_iter().zip(targets) {
            if !self.strongly(m, t, policy) {
                if let Some(inner) = self.cannot_coerce_component(m, t, policy) {
                    return Some(inner);
                }
                return Some((m, t));
            }
        }
        None
    }

    // ============================================================
    // Helpers the checker's positions use
    // ============================================================

    /// SOFT depref to a name: strip parameterless PROCs until a REF shows.
    pub fn soft_to_name(&mut self, m: ModeId) -> Option<ModeId> {
        let u = self.underlying(m);
        if self[u].is_ref() {
            return Some(u);
        }
        if self[u].is_parameterless_proc() {
            let sub = self[u].sub?;
            return self.soft_to_name(sub);
        }
        None
    }

    /// MEEK depref to the first non-name, non-proc mode.
    pub fn meek_to_value(&mut self, m: ModeId) -> ModeId {
        let mut cur = m;
        while let Some(d) = self.depref_once(cur) {
            if d == cur {
                break;
            }
            cur = d;
        }
        cur
    }

    /// WEAK depref toward a structure: stop at the structure value, at the
    /// name directly over it, or at the (name of a) row of structures that
    /// selection reaches through the structure-of-rows view. Returns the
    /// stratum the secondary coerces to, the structure, and the view taken.
    pub fn weak_to_struct(&mut self, m: ModeId) -> Option<(ModeId, ModeId, StructView)> {
        let u = self.underlying(m);
        match self[u].kind {
            ModeKind::Struct => Some((u, u, StructView::Plain)),
            ModeKind::Row | ModeKind::Flex => {
                let d = self.deflexed(u);
                let du = self.underlying(d);
                let dim = self[du].dim;
                let elem = self.underlying(self[du].sub?);
                if self[elem].kind == ModeKind::Struct {
                    Some((u, elem, StructView::RowValue(dim)))
                } else {
                    None
                }
            }
            ModeKind::Ref => {
                let sub = self[u].sub?;
                let sd = self.deflexed(sub);
                let su = self.underlying(sd);
                match self[su].kind {
                    ModeKind::Struct => Some((u, su, StructView::Name)),
                    ModeKind::Row => {
                        let dim = self[su].dim;
                        let elem = self.underlying(self[su].sub?);
                        if self[elem].kind == ModeKind::Struct {
                            Some((u, elem, StructView::RowName(dim)))
                        } else {
                            None
                        }
                    }
                    _ => self.weak_to_struct(sub),
                }
            }
            ModeKind::Proc if self[u].pack.is_empty() => {
                let sub = self[u].sub?;
                self.weak_to_struct(sub)
            }
            _ => None,
        }
    }

    /// WEAK depref toward a row: stop at the last REF directly over the row
    /// (keeping the name) or at the row itself. Returns the stratum and
    /// whether it is a name.
    pub fn weak_to_row(&mut self, m: ModeId) -> Option<(ModeId, bool)> {
        let u = self.underlying(m);
        let rec = &self[u];
        match rec.kind {
            ModeKind::Row | ModeKind::Flex => Some((u, false)),
            ModeKind::Ref => {
                let sub = rec.sub?;
                let sd = self.deflexed(sub);
                if self[self.underlying(sd)].is_row_like() {
                    Some((u, true))
                } else {
                    self.weak_to_row(sub)
                }
            }
            ModeKind::Proc if rec.pack.is_empty() => {
                let sub = rec.sub?;
                self.weak_to_row(sub)
            }
            _ => None,
        }
    }
}
