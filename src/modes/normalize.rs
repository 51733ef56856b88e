//! Derived mode views: deflexed, slice, trim, name, multiple, rowed.
//!
//! Views are cached as back-references on the mode record; they are created
//! through the registry constructors so they stay interned, and they never
//! own the modes they point at.

use super::mode::{ModeId, ModeKind};
use super::registry::ModeRegistry;

impl ModeRegistry {
    /// The non-FLEX view of a mode: FLEX stripped through rows and struct
    /// fields. Traversal stops at REF, PROC and UNION; recursion through a
    /// mode is guarded by REF or PROC, so this terminates.
    pub fn deflexed(&mut self, m: ModeId) -> ModeId {
        if let Some(d) = self[m].deflexed {
            return d;
        }
        let rec_kind = self[m].kind;
        let d = match rec_kind {
            ModeKind::Flex => match self[m].sub {
                Some(sub) => self.deflexed(sub),
                None => m,
            },
            ModeKind::Row => match self[m].sub {
                Some(sub) => {
                    let dim = self[m].dim;
                    let s = self.deflexed(sub);
                    if s == sub { m } else { self.row(dim, s) }
                }
                None => m,
            },
            ModeKind::Struct => {
                let pack: Vec<_> = self[m].pack.clone();
                let mut changed = false;
                let mut new_pack = Vec::with_capacity(pack.len());
                for mut e in pack {
                    let d = self.deflexed(e.mode);
                    changed |= d != e.mode;
                    e.mode = d;
                    new_pack.push(e);
                }
                if changed {
                    self.structure_pack(new_pack)
                } else {
                    m
                }
            }
            ModeKind::Indicant => {
                let u = self.underlying(m);
                if u == m { m } else { self.deflexed(u) }
            }
            _ => m,
        };
        self[m].deflexed = Some(d);
        d
    }

    /// The element mode yielded by subscripting `[...] M` or `FLEX [...] M`
    /// with a full set of subscripts; one dimension is consumed.
    pub fn slice_of(&mut self, m: ModeId) -> Option<ModeId> {
        if let Some(s) = self[m].slice {
            return Some(s);
        }
        let kind = self[m].kind;
        let s = match kind {
            ModeKind::Row => {
                let (dim, sub) = (self[m].dim, self[m].sub?);
                if dim > 1 {
                    Some(self.row(dim - 1, sub))
                } else {
                    Some(sub)
                }
            }
            ModeKind::Flex => {
                let sub = self[m].sub?;
                self.slice_of(sub)
            }
            ModeKind::Indicant => {
                let u = self.underlying(m);
                if u == m { None } else { self.slice_of(u) }
            }
            _ => None,
        }?;
        self[m].slice = Some(s);
        Some(s)
    }

    /// The mode yielded by a trimmer: like slice but the row structure is
    /// preserved; flexibility is lost (a trim is transient).
    pub fn trim_of(&mut self, m: ModeId) -> Option<ModeId> {
        if let Some(t) = self[m].trim {
            return Some(t);
        }
        let kind = self[m].kind;
        let t = match kind {
            ModeKind::Row => Some(m),
            ModeKind::Flex => {
                let sub = self[m].sub?;
                self.trim_of(sub)
            }
            ModeKind::Indicant => {
                let u = self.underlying(m);
                if u == m { None } else { self.trim_of(u) }
            }
            _ => None,
        }?;
        self[m].trim = Some(t);
        Some(t)
    }

    /// For `REF [...] M` (possibly FLEX), the `REF M` a full subscript
    /// yields.
    pub fn name_of(&mut self, m: ModeId) -> Option<ModeId> {
        if let Some(n) = self[m].name {
            return Some(n);
        }
        let u = self.underlying(m);
        if self[u].kind != ModeKind::Ref {
            return None;
        }
        let row = self[u].sub?;
        let elem = self.slice_of(row)?;
        let n = self.ref_to(elem);
        self[m].name = Some(n);
        Some(n)
    }

    /// For `REF [...] M` (possibly FLEX), the `REF [...] M'` a trimmer
    /// yields: the row is preserved, flexibility is lost.
    pub fn trimmed_name_of(&mut self, m: ModeId) -> Option<ModeId> {
        let u = self.underlying(m);
        if self[u].kind != ModeKind::Ref {
            return None;
        }
        let row = self[u].sub?;
        let t = self.trim_of(row)?;
        Some(self.ref_to(t))
    }

    /// The structure-of-rows view of a row of structures, used when a field
    /// is selected from a (name of a) row of structures.
    pub fn multiple_of(&mut self, row_of_struct: ModeId) -> Option<ModeId> {
        if let Some(v) = self[row_of_struct].multiple {
            return Some(v);
        }
        let u = self.underlying(row_of_struct);
        let (dim, elem) = match self[u].kind {
            ModeKind::Row => (self[u].dim, self[u].sub?),
            ModeKind::Flex => {
                let sub = self[u].sub?;
                (self[sub].dim, self[sub].sub?)
            }
            _ => return None,
        };
        let elem = self.underlying(elem);
        if self[elem].kind != ModeKind::Struct {
            return None;
        }
        let pack = self[elem].pack.clone();
        let mut fields = Vec::with_capacity(pack.len());
        for mut e in pack {
            e.mode = self.row(dim, e.mode);
            fields.push(e);
        }
        let v = self.structure_pack(fields);
        self[row_of_struct].multiple = Some(v);
        Some(v)
    }

    /// The single-dimension row over a mode, the target view used by the
    /// rowing coercion.
    pub fn rowed_of(&mut self, m: ModeId) -> ModeId {
        if let Some(r) = self[m].rowed {
            return r;
        }
        let r = self.row(1, m);
        self[m].rowed = Some(r);
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflexed_strips_flex() {
        let mut reg = ModeRegistry::new();
        let d = reg.deflexed(reg.std.string);
        assert_eq!(d, reg.std.row_char);
        // Idempotent and cached
        assert_eq!(reg.deflexed(reg.std.string), reg.std.row_char);
        assert_eq!(reg.deflexed(reg.std.row_char), reg.std.row_char);
    }

    #[test]
    fn test_slice_consumes_one_dimension() {
        let mut reg = ModeRegistry::new();
        let row2 = reg.row(2, reg.std.int);
        let row1 = reg.row(1, reg.std.int);
        assert_eq!(reg.slice_of(row2), Some(row1));
        assert_eq!(reg.slice_of(row1), Some(reg.std.int));
        assert_eq!(reg.slice_of(reg.std.int), None);
    }

    #[test]
    fn test_name_of_ref_row() {
        let mut reg = ModeRegistry::new();
        let row = reg.row(1, reg.std.real);
        let ref_row = reg.ref_to(row);
        let ref_real = reg.ref_to(reg.std.real);
        assert_eq!(reg.name_of(ref_row), Some(ref_real));
    }

    #[test]
    fn test_trim_drops_flex_keeps_row() {
        let mut reg = ModeRegistry::new();
        let ref_string = reg.ref_to(reg.std.string);
        let ref_row_char = reg.ref_to(reg.std.row_char);
        assert_eq!(reg.trimmed_name_of(ref_string), Some(ref_row_char));
    }

    #[test]
    fn test_multiple_view() {
        let mut reg = ModeRegistry::new();
        let mut names = crate::base::Interner::new();
        let s = reg.structure(vec![
            (names.intern("x"), reg.std.real),
            (names.intern("n"), reg.std.int),
        ]);
        let row_s = reg.row(1, s);
        let multiple = reg.multiple_of(row_s).expect("row of struct");
        let row_real = reg.row(1, reg.std.real);
        let row_int = reg.row(1, reg.std.int);
        let expect = reg.structure(vec![
            (names.intern("x"), row_real),
            (names.intern("n"), row_int),
        ]);
        assert_eq!(multiple, expect);
        assert_eq!(reg[multiple].pack[0].mode, row_real);
        assert_eq!(reg[multiple].pack[1].mode, row_int);
    }
}
