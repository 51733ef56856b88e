//! The standard environ: the implicit outermost table holding the built-in
//! modes, operators and identifiers of the Revised Report standard prelude.
//!
//! Only the declarations matter here; the bodies live in the interpreter's
//! runtime library. The operator set is what the resolver's fall-backs and
//! the transput identifiers (`print`) dispatch against.

use crate::base::Interner;
use crate::modes::{ModeId, ModeRegistry};

use super::symbol_table::Tables;

/// Handles to constructed standard-environ modes the checker refers to.
#[derive(Debug, Clone, Copy)]
pub struct StandardEnviron {
    /// UNION of the printable modes
    pub simplout: ModeId,
    /// `[] SIMPLOUT`, the parameter mode of `print`
    pub row_simplout: ModeId,
    /// `[] REAL` and `[,] REAL`, the vector and matrix views the operator
    /// resolver promotes against
    pub row_real: ModeId,
    pub mat_real: ModeId,
}

struct EnvironBuilder<'a> {
    reg: &'a mut ModeRegistry,
    tabs: &'a mut Tables,
    names: &'a mut Interner,
}

impl EnvironBuilder<'_> {
    fn op1(&mut self, name: &str, operand: ModeId, yield_: ModeId) {
        let mode = self.reg.proc(vec![operand], yield_);
        let name = self.names.intern(name);
        self.tabs.add_operator(self.tabs.primal, name, mode, None);
    }

    fn op2(&mut self, name: &str, priority: u8, lhs: ModeId, rhs: ModeId, yield_: ModeId) {
        let mode = self.reg.proc(vec![lhs, rhs], yield_);
        let name = self.names.intern(name);
        self.tabs
            .add_operator(self.tabs.primal, name, mode, Some(priority));
    }

    fn ident(&mut self, name: &str, mode: ModeId) {
        let name = self.names.intern(name);
        self.tabs.add_identifier(self.tabs.primal, name, mode);
    }
}

/// Populate the primal table. Call once, before any user declarations.
pub fn build(
    reg: &mut ModeRegistry,
    tabs: &mut Tables,
    names: &mut Interner,
) -> StandardEnviron {
    let std = reg.std;
    let simplout = reg.union_of(vec![
        std.int,
        std.long_int,
        std.long_long_int,
        std.real,
        std.long_real,
        std.long_long_real,
        std.bool_,
        std.char_,
        std.bits,
        std.bytes,
        std.complex,
        std.string,
    ]);
    let row_simplout = reg.row(1, simplout);
    let row_real = reg.row(1, std.real);
    let mat_real = reg.row(2, std.real);
    let ref_int = reg.ref_to(std.int);
    let ref_real = reg.ref_to(std.real);
    let ref_complex = reg.ref_to(std.complex);
    let ref_string = reg.ref_to(std.string);

    let mut b = EnvironBuilder { reg, tabs, names };

    // Monadic operators
    for (x, y) in [
        (std.int, std.int),
        (std.long_int, std.long_int),
        (std.real, std.real),
        (std.long_real, std.long_real),
        (std.complex, std.complex),
    ] {
        b.op1("-", x, y);
        b.op1("+", x, y);
    }
    b.op1("ABS", std.int, std.int);
    b.op1("ABS", std.long_int, std.long_int);
    b.op1("ABS", std.real, std.real);
    b.op1("ABS", std.long_real, std.long_real);
    b.op1("ABS", std.complex, std.real);
    b.op1("ABS", std.bool_, std.int);
    b.op1("ABS", std.char_, std.int);
    b.op1("ABS", std.bits, std.int);
    b.op1("SIGN", std.int, std.int);
    b.op1("SIGN", std.real, std.int);
    b.op1("ODD", std.int, std.bool_);
    b.op1("NOT", std.bool_, std.bool_);
    b.op1("NOT", std.bits, std.bits);
    b.op1("ENTIER", std.real, std.int);
    b.op1("ENTIER", std.long_real, std.long_int);
    b.op1("ROUND", std.real, std.int);
    b.op1("ROUND", std.long_real, std.long_int);
    b.op1("REPR", std.int, std.char_);
    b.op1("BIN", std.int, std.bits);
    b.op1("LENG", std.int, std.long_int);
    b.op1("LENG", std.long_int, std.long_long_int);
    b.op1("LENG", std.real, std.long_real);
    b.op1("LENG", std.long_real, std.long_long_real);
    b.op1("LENG", std.bits, std.long_bits);
    b.op1("SHORTEN", std.long_int, std.int);
    b.op1("SHORTEN", std.long_long_int, std.long_int);
    b.op1("SHORTEN", std.long_real, std.real);
    b.op1("SHORTEN", std.long_long_real, std.long_real);
    b.op1("RE", std.complex, std.real);
    b.op1("RE", std.long_complex, std.long_real);
    b.op1("IM", std.complex, std.real);
    b.op1("IM", std.long_complex, std.long_real);
    b.op1("ARG", std.complex, std.real);
    b.op1("CONJ", std.complex, std.complex);
    b.op1("UPB", std.rows, std.int);
    b.op1("LWB", std.rows, std.int);

    // Dyadic arithmetic, including the mixed-operand versions of the prelude
    for (l, r, y) in [
        (std.int, std.int, std.int),
        (std.long_int, std.long_int, std.long_int),
        (std.real, std.real, std.real),
        (std.long_real, std.long_real, std.long_real),
        (std.int, std.real, std.real),
        (std.real, std.int, std.real),
        (std.complex, std.complex, std.complex),
        (std.real, std.complex, std.complex),
        (std.complex, std.real, std.complex),
        (std.int, std.complex, std.complex),
        (std.complex, std.int, std.complex),
    ] {
        b.op2("+", 6, l, r, y);
        b.op2("-", 6, l, r, y);
        b.op2("*", 7, l, r, y);
    }
    for (l, r, y) in [
        (std.real, std.real, std.real),
        (std.int, std.int, std.real),
        (std.int, std.real, std.real),
        (std.real, std.int, std.real),
        (std.long_real, std.long_real, std.long_real),
        (std.complex, std.complex, std.complex),
    ] {
        b.op2("/", 7, l, r, y);
    }
    for name in ["OVER", "MOD"] {
        b.op2(name, 7, std.int, std.int, std.int);
        b.op2(name, 7, std.long_int, std.long_int, std.long_int);
    }
    b.op2("**", 8, std.int, std.int, std.int);
    b.op2("**", 8, std.real, std.int, std.real);
    b.op2("**", 8, std.complex, std.int, std.complex);

    // Comparison
    for (l, r) in [
        (std.int, std.int),
        (std.real, std.real),
        (std.int, std.real),
        (std.real, std.int),
        (std.long_int, std.long_int),
        (std.long_real, std.long_real),
        (std.char_, std.char_),
        (std.string, std.string),
    ] {
        b.op2("<", 5, l, r, std.bool_);
        b.op2("<=", 5, l, r, std.bool_);
        b.op2(">", 5, l, r, std.bool_);
        b.op2(">=", 5, l, r, std.bool_);
        b.op2("=", 4, l, r, std.bool_);
        b.op2("/=", 4, l, r, std.bool_);
    }
    for (l, r) in [
        (std.bool_, std.bool_),
        (std.bits, std.bits),
        (std.complex, std.complex),
    ] {
        b.op2("=", 4, l, r, std.bool_);
        b.op2("/=", 4, l, r, std.bool_);
    }

    // Boolean and bits
    b.op2("AND", 3, std.bool_, std.bool_, std.bool_);
    b.op2("OR", 2, std.bool_, std.bool_, std.bool_);
    b.op2("XOR", 3, std.bool_, std.bool_, std.bool_);
    b.op2("AND", 3, std.bits, std.bits, std.bits);
    b.op2("OR", 2, std.bits, std.bits, std.bits);
    b.op2("ELEM", 7, std.int, std.bits, std.bool_);
    b.op2("SHL", 8, std.bits, std.int, std.bits);
    b.op2("SHR", 8, std.bits, std.int, std.bits);

    // Complex construction
    b.op2("I", 9, std.real, std.real, std.complex);
    b.op2("I", 9, std.int, std.int, std.complex);

    // Text
    b.op2("+", 6, std.string, std.string, std.string);
    b.op2("+", 6, std.char_, std.string, std.string);
    b.op2("+", 6, std.string, std.char_, std.string);
    b.op2("+", 6, std.char_, std.char_, std.string);
    b.op2("*", 7, std.string, std.int, std.string);
    b.op2("*", 7, std.int, std.string, std.string);
    b.op2("*", 7, std.char_, std.int, std.string);

    // Vector and matrix forms the resolver's promotion targets
    for name in ["+", "-"] {
        b.op2(name, 6, row_real, row_real, row_real);
        b.op2(name, 6, mat_real, mat_real, mat_real);
    }
    b.op2("*", 7, row_real, row_real, std.real);
    b.op2("*", 7, row_real, std.real, row_real);
    b.op2("*", 7, std.real, row_real, row_real);
    b.op2("*", 7, mat_real, row_real, row_real);
    b.op2("*", 7, mat_real, std.real, mat_real);
    b.op2("*", 7, std.real, mat_real, mat_real);

    // Assigning operators
    for (name, l, r) in [
        ("+:=", ref_int, std.int),
        ("-:=", ref_int, std.int),
        ("*:=", ref_int, std.int),
        ("%:=", ref_int, std.int),
        ("%*:=", ref_int, std.int),
        ("+:=", ref_real, std.real),
        ("-:=", ref_real, std.real),
        ("*:=", ref_real, std.real),
        ("/:=", ref_real, std.real),
        ("+:=", ref_complex, std.complex),
        ("-:=", ref_complex, std.complex),
        ("+:=", ref_string, std.string),
    ] {
        b.op2(name, 1, l, r, l);
    }
    b.op2("+=:", 1, std.string, ref_string, ref_string);

    // Standard identifiers; bodies are the interpreter's business
    let print_mode = b.reg.proc(vec![row_simplout], std.void);
    b.ident("print", print_mode);
    b.ident("pi", std.real);
    b.ident("long pi", std.long_real);
    b.ident("max int", std.int);
    b.ident("max real", std.real);
    b.ident("small real", std.real);
    let random_mode = b.reg.proc(vec![], std.real);
    b.ident("random", random_mode);

    StandardEnviron {
        simplout,
        row_simplout,
        row_real,
        mat_real,
    }
}
