//! Semantic analysis
//!
//! Turns a parsed [`CompilationUnit`] into a [`CheckedProgram`]:
//! - [`types`]: the semantic type set and its compatibility rules
//! - [`scope`]: scopes, symbols and the retained [`SymbolTable`]
//! - `analyzer`: the two passes (declaration collection, then checking)
//!
//! Analysis never stops at the first problem. A failed expression gets the
//! `Error` type, which is accepted everywhere, and checking moves on.

mod analyzer;
mod expressions;
pub mod scope;
mod statements;
pub mod types;

pub use analyzer::{analyze, qualified_name, BUILTINS, INIT_ROUTINE, MAIN_ROUTINE};
pub use scope::{Scope, ScopeId, ScopeKind, Signature, Symbol, SymbolKind, SymbolTable};
pub use types::Type;

use crate::diagnostics::Diagnostic;
use crate::parser::ast::{AstNode, CompilationUnit, NodeId};
use rustc_hash::FxHashMap;

/// Output of semantic analysis
#[derive(Debug, Clone)]
pub struct CheckedProgram {
    pub unit: CompilationUnit,
    pub symbols: SymbolTable,
    pub expr_types: FxHashMap<NodeId, Type>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckedProgram {
    /// Inferred type of an expression node; `Error` if it was never typed
    pub fn type_of(&self, expr: &AstNode) -> Type {
        expr.id()
            .and_then(|id| self.expr_types.get(&id))
            .cloned()
            .unwrap_or(Type::Error)
    }

    /// True when no error-severity diagnostics were reported
    pub fn is_success(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}
