use crate::base::{Name, NodeId};

/// Unique identifier for a mode in the registry arena.
/// Uses u32 for compact storage; mode equality is id equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeId(pub u32);

impl ModeId {
    /// Create a new ModeId from an index
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Get the index into the arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The built-in plain modes of the standard environ.
///
/// COMPLEX lengths are carried here rather than as STRUCTs; the checker only
/// needs their widening relationships, layout belongs to the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Standard {
    Void,
    Int,
    LongInt,
    LongLongInt,
    Real,
    LongReal,
    LongLongReal,
    Complex,
    LongComplex,
    LongLongComplex,
    Bool,
    Char,
    Bits,
    LongBits,
    LongLongBits,
    Bytes,
    LongBytes,
    Format,
}

impl Standard {
    /// Display spelling in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Standard::Void => "VOID",
            Standard::Int => "INT",
            Standard::LongInt => "LONG INT",
            Standard::LongLongInt => "LONG LONG INT",
            Standard::Real => "REAL",
            Standard::LongReal => "LONG REAL",
            Standard::LongLongReal => "LONG LONG REAL",
            Standard::Complex => "COMPL",
            Standard::LongComplex => "LONG COMPL",
            Standard::LongLongComplex => "LONG LONG COMPL",
            Standard::Bool => "BOOL",
            Standard::Char => "CHAR",
            Standard::Bits => "BITS",
            Standard::LongBits => "LONG BITS",
            Standard::LongLongBits => "LONG LONG BITS",
            Standard::Bytes => "BYTES",
            Standard::LongBytes => "LONG BYTES",
            Standard::Format => "FORMAT",
        }
    }
}

/// Discriminates what a mode record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    /// A built-in plain mode (INT, REAL, BOOL, ...)
    Standard(Standard),
    /// A mode indicant introduced by a mode declaration; `equivalent` links
    /// to its actual mode once bound
    Indicant,
    /// `REF sub`
    Ref,
    /// `FLEX sub` where sub is a row; only valid directly beneath REF or as
    /// a row view
    Flex,
    /// `[...] sub` with `dim` dimensions
    Row,
    /// `PROC (pack) sub`
    Proc,
    /// `STRUCT (pack)`
    Struct,
    /// `UNION (pack)`, canonicalised on construction
    Union,
    /// Transient yield of a serial/collateral clause before balancing
    Series,
    /// Transient yield of a display before coercion to its target
    Stowed,
    /// The generic "any row" mode taken by standard operators such as UPB
    Rows,
    /// Bottom mode of NIL, SKIP and jumps; coercible to anything
    Hip,
    /// Mode of ill-typed constructs; coercible with anything so cascades
    /// are suppressed
    Error,
    /// Not-yet-determined mode
    Undefined,
    /// Mode of an empty display
    Vacuum,
}

/// One element of a pack: a STRUCT field, UNION alternative, PROC parameter
/// or SERIES/STOWED member.
#[derive(Debug, Clone)]
pub struct PackEntry {
    pub mode: ModeId,
    /// Field selector for STRUCT packs; None elsewhere
    pub text: Option<Name>,
    /// Origin node, for diagnostics
    pub node: Option<NodeId>,
    /// Byte width, filled by the size pass
    pub size: u32,
    /// Byte offset within the owner, filled by the size pass
    pub offset: u32,
}

impl PackEntry {
    pub fn new(mode: ModeId) -> Self {
        Self {
            mode,
            text: None,
            node: None,
            size: 0,
            offset: 0,
        }
    }

    pub fn named(mode: ModeId, text: Name) -> Self {
        Self {
            mode,
            text: Some(text),
            node: None,
            size: 0,
            offset: 0,
        }
    }
}

/// One interned mode record.
///
/// The derived views are lazily-filled back references into the registry;
/// they never own and never create cycles in ownership.
#[derive(Debug, Clone)]
pub struct Mode {
    pub kind: ModeKind,
    /// Row dimension, or PROC arity
    pub dim: u32,
    /// The single-argument mode for REF/FLEX/ROW, or the PROC yield
    pub sub: Option<ModeId>,
    /// Fields, alternatives, parameters or members
    pub pack: Vec<PackEntry>,
    /// Indicant spelling, for display
    pub text: Option<Name>,
    // Derived views, filled on demand
    pub equivalent: Option<ModeId>,
    pub slice: Option<ModeId>,
    pub trim: Option<ModeId>,
    pub deflexed: Option<ModeId>,
    pub name: Option<ModeId>,
    pub multiple: Option<ModeId>,
    pub rowed: Option<ModeId>,
    // Flags
    pub has_ref: bool,
    pub has_flex: bool,
    pub has_rows: bool,
    pub used: bool,
    pub portable: bool,
    pub derivate: bool,
    pub well_formed: bool,
    /// Byte width once computed
    pub size: u32,
    /// Globally unique number for diagnostics
    pub number: u32,
}

impl Mode {
    pub fn new(kind: ModeKind) -> Self {
        Self {
            kind,
            dim: 0,
            sub: None,
            pack: Vec::new(),
            text: None,
            equivalent: None,
            slice: None,
            trim: None,
            deflexed: None,
            name: None,
            multiple: None,
            rowed: None,
            has_ref: false,
            has_flex: false,
            has_rows: false,
            used: false,
            portable: true,
            derivate: false,
            well_formed: true,
            size: 0,
            number: 0,
        }
    }

    pub fn with_sub(kind: ModeKind, sub: ModeId) -> Self {
        let mut m = Self::new(kind);
        m.sub = Some(sub);
        m
    }

    pub fn with_pack(kind: ModeKind, pack: Vec<PackEntry>) -> Self {
        let mut m = Self::new(kind);
        m.pack = pack;
        m
    }

    /// Whether this record is a REF
    pub fn is_ref(&self) -> bool {
        self.kind == ModeKind::Ref
    }

    /// Whether this record is a PROC without parameters
    pub fn is_parameterless_proc(&self) -> bool {
        self.kind == ModeKind::Proc && self.pack.is_empty()
    }

    /// Whether this record is a ROW or a FLEX over a row
    pub fn is_row_like(&self) -> bool {
        matches!(self.kind, ModeKind::Row | ModeKind::Flex)
    }
}
