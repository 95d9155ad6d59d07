//! Compiler diagnostics
//!
//! Every pipeline stage reports problems as [`Diagnostic`] values collected in
//! source order. A diagnostic never stops the stage that produced it; only
//! the pipeline driver decides whether diagnostics block the next stage.

use crate::parser::ast::SourceLocation;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Unexpected or missing token, unterminated literal, unknown construct
    SyntaxError,
    /// Incompatible types in a declaration, assignment, argument, return or condition
    TypeMismatch,
    /// Name not found in any enclosing scope, or unknown member
    UndefinedSymbol,
    /// Type name that does not refer to a declared class
    UndefinedClass,
    /// `new` applied to a built-in type
    InvalidConstructorCall,
    /// Operator applied to operand types it does not accept
    InvalidOperator,
    DuplicateDeclaration,
    ArgumentCountMismatch,
    ConstantAssignment,
    /// `break`/`continue` outside a loop, `this` outside an instance method
    MisplacedStatement,
    MissingReturn,
}

impl DiagnosticKind {
    pub fn label(self) -> &'static str {
        match self {
            DiagnosticKind::SyntaxError => "syntax error",
            DiagnosticKind::TypeMismatch => "type mismatch",
            DiagnosticKind::UndefinedSymbol => "undefined symbol",
            DiagnosticKind::UndefinedClass => "undefined class",
            DiagnosticKind::InvalidConstructorCall => "invalid constructor call",
            DiagnosticKind::InvalidOperator => "invalid operator",
            DiagnosticKind::DuplicateDeclaration => "duplicate declaration",
            DiagnosticKind::ArgumentCountMismatch => "argument count mismatch",
            DiagnosticKind::ConstantAssignment => "constant assignment",
            DiagnosticKind::MisplacedStatement => "misplaced statement",
            DiagnosticKind::MissingReturn => "missing return",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single reported problem
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: SourceLocation,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Diagnostic {
            severity: Severity::Error,
            kind,
            message: message.into(),
            location,
        }
    }

    pub fn warning(
        kind: DiagnosticKind,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            kind,
            message: message.into(),
            location,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn line(&self) -> usize {
        self.location.line
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "Line {}: {}", self.location.line, self.message),
            Severity::Warning => write!(
                f,
                "Line {}: warning: {}",
                self.location.line, self.message
            ),
        }
    }
}

/// Ordered diagnostic sink.
///
/// Each error site is reported by exactly one check, so the sink keeps
/// everything it is given.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, kind: DiagnosticKind, message: impl Into<String>, location: SourceLocation) {
        self.push(Diagnostic::error(kind, message, location));
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Diagnostics sorted by source position; ties keep reporting order
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.items.sort_by_key(|d| d.location);
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_line() {
        let diag = Diagnostic::error(
            DiagnosticKind::SyntaxError,
            "Expected ';'",
            SourceLocation::new(4, 2),
        );
        assert_eq!(diag.to_string(), "Line 4: Expected ';'");

        let warn = Diagnostic::warning(
            DiagnosticKind::MissingReturn,
            "no return",
            SourceLocation::new(1, 1),
        );
        assert_eq!(warn.to_string(), "Line 1: warning: no return");
        assert!(!warn.is_error());
    }

    #[test]
    fn test_distinct_sites_on_one_line_kept() {
        let mut diags = Diagnostics::new();
        diags.error(DiagnosticKind::UndefinedSymbol, "Undefined symbol 'b'", SourceLocation::new(1, 9));
        diags.error(DiagnosticKind::UndefinedSymbol, "Undefined symbol 'b'", SourceLocation::new(1, 24));

        assert_eq!(diags.len(), 2);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_sorted_by_location() {
        let mut diags = Diagnostics::new();
        diags.error(DiagnosticKind::TypeMismatch, "b", SourceLocation::new(3, 1));
        diags.error(DiagnosticKind::TypeMismatch, "a", SourceLocation::new(1, 5));

        let sorted = diags.into_sorted();
        assert_eq!(sorted[0].message, "a");
        assert_eq!(sorted[1].message, "b");
    }
}
