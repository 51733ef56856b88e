//! Diagnostics — structured semantic error reporting.
//!
//! Diagnostics are values, not format strings: each carries an enum kind
//! with typed operands (mode handles, names, counts) and is rendered only at
//! emission time, so tests can match on kinds and codes.

use crate::base::{Name, Span};
use crate::modes::{ModeId, ModeRegistry};
use crate::semantic::coercion::Sort;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    SyntaxError,
    Warning,
}

impl Severity {
    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error | Self::SyntaxError)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::SyntaxError => "syntax error",
            Self::Warning => "warning",
        }
    }
}

/// The message catalogue emitted by the analysis core.
#[derive(Clone, Debug, PartialEq)]
pub enum DiagnosticKind {
    CannotCoerce {
        yielded: ModeId,
        expected: ModeId,
        sort: Sort,
        construct: &'static str,
        /// First offending component of a SERIES/STOWED pack, when the
        /// failure sits inside a display
        component: Option<(ModeId, ModeId)>,
    },
    NoMonadic {
        op: Name,
        operand: ModeId,
    },
    NoDyadic {
        op: Name,
        lhs: ModeId,
        rhs: ModeId,
    },
    NoName {
        yielded: ModeId,
        construct: &'static str,
    },
    NoStruct {
        yielded: ModeId,
    },
    NoField {
        field: Name,
        mode: ModeId,
    },
    NoRowOrProc {
        yielded: ModeId,
    },
    NoMatrix {
        yielded: ModeId,
    },
    NoVector {
        yielded: ModeId,
    },
    NoFlexArgument {
        yielded: ModeId,
        expected: ModeId,
    },
    IndexerNumber {
        given: usize,
        dim: u32,
    },
    ArgumentNumber {
        given: usize,
        arity: usize,
    },
    InvalidOperand {
        mode: ModeId,
    },
    UndeclaredTag {
        name: Name,
    },
    NoUniqueMode {
        modes: Vec<ModeId>,
    },
    NoComponent {
        spec: ModeId,
        union: ModeId,
    },
    NoUnion {
        yielded: ModeId,
    },
    Vacuum,
    ModeSpecification {
        spec: ModeId,
    },
    TransientName,
    ScopeDynamic {
        value_scope: u32,
        dest_scope: u32,
    },
    /// Proactive recursion-depth guard of the checker
    StackOverflow {
        depth: u32,
    },
    Voided {
        mode: ModeId,
    },
    Unintended {
        mode: ModeId,
    },
    Hip {
        construct: &'static str,
    },
    WideningNotPortable {
        from: ModeId,
        to: ModeId,
    },
    ScopeStatic,
}

impl DiagnosticKind {
    /// The catalogue code, stable for tests and tooling.
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::CannotCoerce { .. } => "ERROR_CANNOT_COERCE",
            DiagnosticKind::NoMonadic { .. } => "ERROR_NO_MONADIC",
            DiagnosticKind::NoDyadic { .. } => "ERROR_NO_DYADIC",
            DiagnosticKind::NoName { .. } => "ERROR_NO_NAME",
            DiagnosticKind::NoStruct { .. } => "ERROR_NO_STRUCT",
            DiagnosticKind::NoField { .. } => "ERROR_NO_FIELD",
            DiagnosticKind::NoRowOrProc { .. } => "ERROR_NO_ROW_OR_PROC",
            DiagnosticKind::NoMatrix { .. } => "ERROR_NO_MATRIX",
            DiagnosticKind::NoVector { .. } => "ERROR_NO_VECTOR",
            DiagnosticKind::NoFlexArgument { .. } => "ERROR_NO_FLEX_ARGUMENT",
            DiagnosticKind::IndexerNumber { .. } => "ERROR_INDEXER_NUMBER",
            DiagnosticKind::ArgumentNumber { .. } => "ERROR_ARGUMENT_NUMBER",
            DiagnosticKind::InvalidOperand { .. } => "ERROR_INVALID_OPERAND",
            DiagnosticKind::UndeclaredTag { .. } => "ERROR_UNDECLARED_TAG",
            DiagnosticKind::NoUniqueMode { .. } => "ERROR_NO_UNIQUE_MODE",
            DiagnosticKind::NoComponent { .. } => "ERROR_NO_COMPONENT",
            DiagnosticKind::NoUnion { .. } => "ERROR_NO_UNION",
            DiagnosticKind::Vacuum => "ERROR_VACUUM",
            DiagnosticKind::ModeSpecification { .. } => "ERROR_MODE_SPECIFICATION",
            DiagnosticKind::TransientName => "ERROR_TRANSIENT_NAME",
            DiagnosticKind::ScopeDynamic { .. } => "ERROR_SCOPE_DYNAMIC",
            DiagnosticKind::StackOverflow { .. } => "ERROR_STACK_OVERFLOW",
            DiagnosticKind::Voided { .. } => "WARNING_VOIDED",
            DiagnosticKind::Unintended { .. } => "WARNING_UNINTENDED",
            DiagnosticKind::Hip { .. } => "WARNING_HIP",
            DiagnosticKind::WideningNotPortable { .. } => "WARNING_WIDENING_NOT_PORTABLE",
            DiagnosticKind::ScopeStatic => "WARNING_SCOPE_STATIC",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::Voided { .. }
            | DiagnosticKind::Unintended { .. }
            | DiagnosticKind::Hip { .. }
            | DiagnosticKind::WideningNotPortable { .. }
            | DiagnosticKind::ScopeStatic => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Render the message; mode operands are spelled through the registry.
    pub fn render(&self, reg: &ModeRegistry) -> String {
        match self {
            DiagnosticKind::CannotCoerce {
                yielded,
                expected,
                sort,
                construct,
                component,
            } => {
                let mut msg = format!(
                    "{} cannot be coerced {}ly to {} in {}",
                    reg.display(*yielded),
                    sort.as_str(),
                    reg.display(*expected),
                    construct,
                );
                if let Some((from, to)) = component {
                    msg.push_str(&format!(
                        " ({} does not yield {})",
                        reg.display(*from),
                        reg.display(*to)
                    ));
                }
                msg
            }
            DiagnosticKind::NoMonadic { op, operand } => {
                format!(
                    "no monadic operator \"{}\" defined for {}",
                    op,
                    reg.display(*operand)
                )
            }
            DiagnosticKind::NoDyadic { op, lhs, rhs } => {
                format!(
                    "no dyadic operator \"{}\" defined for {} and {}",
                    op,
                    reg.display(*lhs),
                    reg.display(*rhs)
                )
            }
            DiagnosticKind::NoName { yielded, construct } => {
                format!("{} is not a name in {}", reg.display(*yielded), construct)
            }
            DiagnosticKind::NoStruct { yielded } => {
                format!("{} is not a structure", reg.display(*yielded))
            }
            DiagnosticKind::NoField { field, mode } => {
                format!("\"{}\" is not a field of {}", field, reg.display(*mode))
            }
            DiagnosticKind::NoRowOrProc { yielded } => {
                format!("{} is not a row or a procedure", reg.display(*yielded))
            }
            DiagnosticKind::NoMatrix { yielded } => {
                format!("{} is not a matrix", reg.display(*yielded))
            }
            DiagnosticKind::NoVector { yielded } => {
                format!("{} is not a vector", reg.display(*yielded))
            }
            DiagnosticKind::NoFlexArgument { yielded, expected } => {
                format!(
                    "flexible {} cannot stand for {} in an argument",
                    reg.display(*yielded),
                    reg.display(*expected)
                )
            }
            DiagnosticKind::IndexerNumber { given, dim } => {
                format!("{given} indexers given for a {dim}-dimensional row")
            }
            DiagnosticKind::ArgumentNumber { given, arity } => {
                format!("{given} arguments given to a procedure expecting {arity}")
            }
            DiagnosticKind::InvalidOperand { mode } => {
                format!("{} is an invalid operand mode", reg.display(*mode))
            }
            DiagnosticKind::UndeclaredTag { name } => {
                format!("tag \"{name}\" has not been declared")
            }
            DiagnosticKind::NoUniqueMode { modes } => {
                let spelled: Vec<String> = modes.iter().map(|&m| reg.display(m)).collect();
                format!("no unique mode balances ({})", spelled.join(", "))
            }
            DiagnosticKind::NoComponent { spec, union } => {
                format!(
                    "{} is not a component of {}",
                    reg.display(*spec),
                    reg.display(*union)
                )
            }
            DiagnosticKind::NoUnion { yielded } => {
                format!("{} is not a united mode", reg.display(*yielded))
            }
            DiagnosticKind::Vacuum => "vacuum cannot have a row mode here".to_string(),
            DiagnosticKind::ModeSpecification { spec } => {
                format!("{} is not a valid mode specification", reg.display(*spec))
            }
            DiagnosticKind::TransientName => {
                "transient name cannot outlive its flexible producer".to_string()
            }
            DiagnosticKind::ScopeDynamic {
                value_scope,
                dest_scope,
            } => {
                format!(
                    "value of scope level {value_scope} escapes a destination of scope level {dest_scope}"
                )
            }
            DiagnosticKind::StackOverflow { depth } => {
                format!("construct nesting of depth {depth} would exhaust the stack")
            }
            DiagnosticKind::Voided { mode } => {
                format!("value of mode {} is voided", reg.display(*mode))
            }
            DiagnosticKind::Unintended { mode } => {
                format!(
                    "construct of mode {} is possibly unintended",
                    reg.display(*mode)
                )
            }
            DiagnosticKind::Hip { construct } => {
                format!("jump, SKIP or NIL stands in a {construct} position")
            }
            DiagnosticKind::WideningNotPortable { from, to } => {
                format!(
                    "implicit widening of a {} denotation to {} is not portable",
                    reg.display(*from),
                    reg.display(*to)
                )
            }
            DiagnosticKind::ScopeStatic => {
                "scope of this value cannot be checked statically".to_string()
            }
        }
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub at: Span,
    /// Silenced severity: emitted past the error ceiling so the output
    /// stays legible while the walk continues
    pub suppressed: bool,
}

impl Diagnostic {
    /// Format for display, e.g. `error: ERROR_NO_FIELD: ...`.
    pub fn format(&self, reg: &ModeRegistry) -> String {
        format!(
            "{}: {}: {} (line {}, column {})",
            self.kind.severity().as_str(),
            self.kind.code(),
            self.kind.render(reg),
            self.at.start.line,
            self.at.start.column
        )
    }
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during the analysis passes.
///
/// After `max_errors` fatal diagnostics further errors are recorded with
/// suppressed severity so downstream phases still see a well-annotated tree
/// without cascades of noise.
#[derive(Clone, Debug)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    max_errors: usize,
}

impl DiagnosticCollector {
    pub fn new(max_errors: usize) -> Self {
        Self {
            diagnostics: Vec::new(),
            max_errors,
        }
    }

    /// Add a diagnostic at a source position.
    pub fn add(&mut self, kind: DiagnosticKind, at: Span) {
        let suppressed = kind.severity().is_error() && self.error_count() >= self.max_errors;
        self.diagnostics.push(Diagnostic {
            kind,
            at,
            suppressed,
        });
    }

    /// Get all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get the number of non-suppressed errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind.severity().is_error() && !d.suppressed)
            .count()
    }

    /// Get the number of warnings.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind.severity() == Severity::Warning)
            .count()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind.severity().is_error())
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

impl Default for DiagnosticCollector {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Interner;

    #[test]
    fn test_codes_and_severities() {
        let reg = ModeRegistry::new();
        let mut names = Interner::new();
        let err = DiagnosticKind::NoField {
            field: names.intern("re"),
            mode: reg.std.int,
        };
        assert_eq!(err.code(), "ERROR_NO_FIELD");
        assert_eq!(err.severity(), Severity::Error);
        assert!(err.render(&reg).contains("INT"));

        let warn = DiagnosticKind::Voided { mode: reg.std.real };
        assert_eq!(warn.code(), "WARNING_VOIDED");
        assert_eq!(warn.severity(), Severity::Warning);
    }

    #[test]
    fn test_collector_suppresses_past_ceiling() {
        let mut collector = DiagnosticCollector::new(2);
        for _ in 0..4 {
            collector.add(DiagnosticKind::Vacuum, Span::at(1, 1));
        }
        assert_eq!(collector.error_count(), 2);
        assert_eq!(collector.diagnostics().len(), 4);
        assert!(collector.diagnostics()[2].suppressed);
        assert!(collector.diagnostics()[3].suppressed);
    }

    #[test]
    fn test_warnings_not_counted_as_errors() {
        let reg = ModeRegistry::new();
        let mut collector = DiagnosticCollector::default();
        collector.add(DiagnosticKind::Voided { mode: reg.std.int }, Span::at(1, 1));
        assert_eq!(collector.error_count(), 0);
        assert_eq!(collector.warning_count(), 1);
        assert!(!collector.has_errors());
    }
}
