//! Pipeline driver
//!
//! Runs source text through parsing, semantic analysis and IR generation.
//!
//! # Modes
//!
//! - [`Mode::Strict`] (default): a stage that reports an error stops the
//!   pipeline, and its diagnostics come back as a [`CompileError`].
//! - [`Mode::Exploratory`]: every stage runs on whatever the previous one
//!   produced, and the [`Compilation`] carries all diagnostics.
//!
//! Warnings never stop the pipeline.

use crate::diagnostics::Diagnostic;
use crate::ir::{generate, IrProgram};
use crate::parser::ast::CompilationUnit;
use crate::parser::parse_source;
use crate::semantic::{analyze, CheckedProgram};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Strict,
    Exploratory,
}

/// Compiler configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub mode: Mode,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn exploratory(self) -> Self {
        self.mode(Mode::Exploratory)
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing failed with {} error(s)", count_errors(.0))]
    Syntax(Vec<Diagnostic>),

    #[error("semantic analysis failed with {} error(s)", count_errors(.0))]
    Semantic(Vec<Diagnostic>),
}

impl CompileError {
    /// Diagnostics that stopped the pipeline; empty for I/O failures
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Io { .. } => &[],
            CompileError::Syntax(diagnostics) | CompileError::Semantic(diagnostics) => diagnostics,
        }
    }
}

fn count_errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

/// Artifacts of every stage that ran
#[derive(Debug, Clone)]
pub struct Compilation {
    pub checked: CheckedProgram,
    pub ir: IrProgram,
    /// Parse diagnostics followed by semantic diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    pub fn unit(&self) -> &CompilationUnit {
        &self.checked.unit
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Compiler { options }
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<Compilation, CompileError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), bytes = source.len(), "compiling");
        self.compile_source(&source)
    }

    pub fn compile_source(&self, source: &str) -> Result<Compilation, CompileError> {
        let strict = self.options.mode == Mode::Strict;

        let parsed = parse_source(source);
        debug!(
            items = parsed.unit.items.len(),
            diagnostics = parsed.diagnostics.len(),
            "parsed"
        );
        if strict && parsed.diagnostics.iter().any(Diagnostic::is_error) {
            return Err(CompileError::Syntax(parsed.diagnostics));
        }

        let checked = analyze(&parsed.unit);
        debug!(diagnostics = checked.diagnostics.len(), "analyzed");
        if strict && !checked.is_success() {
            return Err(CompileError::Semantic(checked.diagnostics));
        }

        let ir = generate(&checked);

        let mut diagnostics = parsed.diagnostics;
        diagnostics.extend(checked.diagnostics.iter().cloned());
        Ok(Compilation {
            checked,
            ir,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    #[test]
    fn test_strict_stops_at_syntax_errors() {
        let compiler = Compiler::default();
        let err = compiler.compile_source("int x = 1\nint y = 2;").unwrap_err();

        match &err {
            CompileError::Syntax(diagnostics) => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].kind, DiagnosticKind::SyntaxError);
            }
            other => panic!("Expected syntax error, got {:?}", other),
        }
        assert_eq!(err.to_string(), "parsing failed with 1 error(s)");
    }

    #[test]
    fn test_strict_stops_at_semantic_errors() {
        let compiler = Compiler::new(CompileOptions::new());
        let err = compiler.compile_source("int x = \"no\";").unwrap_err();

        assert!(matches!(err, CompileError::Semantic(_)));
        assert_eq!(err.diagnostics()[0].kind, DiagnosticKind::TypeMismatch);
    }

    #[test]
    fn test_exploratory_runs_every_stage() {
        let compiler = Compiler::new(CompileOptions::new().exploratory());
        let compilation = compiler
            .compile_source("int x = 1\nint y = missing;\nint z = 3;")
            .unwrap();

        let kinds: Vec<_> = compilation.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::SyntaxError, DiagnosticKind::UndefinedSymbol]);
        assert!(compilation.has_errors());
        assert!(compilation.ir.routine("<main>").is_some());
    }

    #[test]
    fn test_warnings_do_not_block() {
        let compiler = Compiler::default();
        let compilation = compiler.compile_source("int f() { }").unwrap();

        assert_eq!(compilation.diagnostics.len(), 1);
        assert!(!compilation.has_errors());
        assert!(compilation.ir.routine("f").is_some());
    }

    #[test]
    fn test_missing_file() {
        let err = Compiler::default()
            .compile_file("/definitely/not/here.lm")
            .unwrap_err();

        assert!(matches!(err, CompileError::Io { .. }));
        assert!(err.diagnostics().is_empty());
        assert!(err.to_string().starts_with("cannot read '/definitely/not/here.lm'"));
    }
}
