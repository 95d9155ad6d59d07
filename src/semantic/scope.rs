//! Scopes and the retained symbol table
//!
//! - [`Scope`]: one namespace frame, symbols kept in declaration order
//! - [`SymbolTable`]: arena of the scopes that outlive analysis (global,
//!   class and method scopes), indexed by [`ScopeId`]
//!
//! Block scopes live only on the analyzer's frame stack. When one is exited
//! its symbols are promoted into the enclosing routine's scope record, so
//! the table still lists every local a routine declared.

use crate::parser::ast::SourceLocation;
use crate::semantic::types::Type;
use rustc_hash::FxHashMap;
use std::fmt;

pub type ScopeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Class,
    Method,
    Block,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Global => write!(f, "global"),
            ScopeKind::Class => write!(f, "class"),
            ScopeKind::Method => write!(f, "method"),
            ScopeKind::Block => write!(f, "block"),
        }
    }
}

/// Routine signature
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<Type>,
    pub return_type: Type,
    pub is_static: bool,
    /// Built-ins take exactly one argument of any type
    pub builtin: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Field,
    Class,
    Routine(Signature),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub scope_kind: ScopeKind,
    pub is_constant: bool,
    pub kind: SymbolKind,
    pub location: SourceLocation,
}

impl Symbol {
    pub fn new(name: impl Into<String>, ty: Type, kind: SymbolKind, location: SourceLocation) -> Self {
        Symbol {
            name: name.into(),
            ty,
            scope_kind: ScopeKind::Global,
            is_constant: false,
            kind,
            location,
        }
    }

    pub fn constant(mut self) -> Self {
        self.is_constant = true;
        self
    }

    pub fn signature(&self) -> Option<&Signature> {
        match &self.kind {
            SymbolKind::Routine(sig) => Some(sig),
            _ => None,
        }
    }
}

/// A namespace frame
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub name: String,
    pub parent: Option<ScopeId>,
    symbols: Vec<Symbol>,
    index: FxHashMap<String, usize>,
    promoted: Vec<Symbol>,
}

impl Scope {
    pub fn new(kind: ScopeKind, name: impl Into<String>, parent: Option<ScopeId>) -> Self {
        Scope {
            kind,
            name: name.into(),
            parent,
            symbols: Vec::new(),
            index: FxHashMap::default(),
            promoted: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    /// Add a symbol; on a duplicate name, returns where the first one was declared
    pub fn insert(&mut self, mut symbol: Symbol) -> Result<(), SourceLocation> {
        if let Some(existing) = self.get(&symbol.name) {
            return Err(existing.location);
        }
        symbol.scope_kind = self.kind;
        self.index.insert(symbol.name.clone(), self.symbols.len());
        self.symbols.push(symbol);
        Ok(())
    }

    /// Symbols declared directly in this scope, in declaration order
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Symbols of exited block scopes nested in this one
    pub fn promoted(&self) -> &[Symbol] {
        &self.promoted
    }

    pub(crate) fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }
}

/// Retained scopes of one compilation unit
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    classes: FxHashMap<String, ScopeId>,
    routines: FxHashMap<String, ScopeId>,
}

impl SymbolTable {
    pub const GLOBAL: ScopeId = 0;

    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![Scope::new(ScopeKind::Global, "<global>", None)],
            classes: FxHashMap::default(),
            routines: FxHashMap::default(),
        }
    }

    /// Add a retained scope. Class scopes are indexed by class name and
    /// method scopes by qualified routine name; the first one registered
    /// under a name wins.
    pub fn add_scope(&mut self, kind: ScopeKind, name: &str, parent: ScopeId) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(kind, name, Some(parent)));
        match kind {
            ScopeKind::Class => {
                self.classes.entry(name.to_string()).or_insert(id);
            }
            ScopeKind::Method => {
                self.routines.entry(name.to_string()).or_insert(id);
            }
            ScopeKind::Global | ScopeKind::Block => {}
        }
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> Result<(), SourceLocation> {
        self.scopes[scope].insert(symbol)
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.scopes[scope].get(name)
    }

    /// Resolve `name` from `scope` outwards to the global scope
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(symbol) = self.scopes[id].get(name) {
                return Some(symbol);
            }
            current = self.scopes[id].parent;
        }
        None
    }

    pub fn class_scope(&self, class: &str) -> Option<ScopeId> {
        self.classes.get(class).copied()
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Field or method of a class
    pub fn member(&self, class: &str, name: &str) -> Option<&Symbol> {
        self.class_scope(class)
            .and_then(|id| self.lookup_local(id, name))
    }

    /// Scope of a routine by qualified name (`main`, `Person.greet`)
    pub fn routine_scope(&self, qualified: &str) -> Option<ScopeId> {
        self.routines.get(qualified).copied()
    }

    /// Look up a global (`Person`) or a class member (`Person.name`)
    pub fn resolve(&self, qualified: &str) -> Option<&Symbol> {
        match qualified.split_once('.') {
            Some((class, member)) => self.member(class, member),
            None => self.lookup_local(Self::GLOBAL, qualified),
        }
    }

    /// Fix the type of a symbol whose type was only known after inference
    pub fn set_type(&mut self, scope: ScopeId, name: &str, ty: Type) {
        let scope = &mut self.scopes[scope];
        if let Some(&i) = scope.index.get(name) {
            scope.symbols[i].ty = ty;
        }
    }

    pub(crate) fn promote(&mut self, scope: ScopeId, symbols: Vec<Symbol>) {
        self.scopes[scope].promoted.extend(symbols);
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            SymbolKind::Variable => "variable",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Field => "field",
            SymbolKind::Class => "class",
            SymbolKind::Routine(sig) if sig.is_static => "static routine",
            SymbolKind::Routine(_) => "routine",
        };
        write!(f, "{} {}: ", kind, self.name)?;
        match &self.kind {
            SymbolKind::Routine(sig) => {
                let params: Vec<String> = sig.params.iter().map(ToString::to_string).collect();
                write!(f, "({}) -> {}", params.join(", "), sig.return_type)?;
            }
            _ => write!(f, "{}", self.ty)?,
        }
        if self.is_constant {
            write!(f, " const")?;
        }
        Ok(())
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for scope in &self.scopes {
            writeln!(f, "{} scope {}", scope.kind, scope.name)?;
            for symbol in scope.symbols.iter().chain(&scope.promoted) {
                writeln!(f, "  {}", symbol)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, ty: Type) -> Symbol {
        Symbol::new(name, ty, SymbolKind::Variable, SourceLocation::new(1, 1))
    }

    #[test]
    fn test_lookup_walks_parents() {
        let mut table = SymbolTable::new();
        let class = table.add_scope(ScopeKind::Class, "Person", SymbolTable::GLOBAL);
        let method = table.add_scope(ScopeKind::Method, "Person.greet", class);

        table.declare(SymbolTable::GLOBAL, var("count", Type::Int)).unwrap();
        table.declare(class, var("name", Type::String)).unwrap();
        table.declare(method, var("count", Type::Float)).unwrap();

        assert_eq!(table.lookup(method, "count").map(|s| &s.ty), Some(&Type::Float));
        assert_eq!(table.lookup(method, "name").map(|s| &s.ty), Some(&Type::String));
        assert_eq!(table.lookup(class, "count").map(|s| &s.ty), Some(&Type::Int));
        assert!(table.lookup(method, "missing").is_none());
        assert_eq!(
            table.lookup(method, "name").map(|s| s.scope_kind),
            Some(ScopeKind::Class)
        );
    }

    #[test]
    fn test_duplicate_reports_first_location() {
        let mut table = SymbolTable::new();
        table.declare(SymbolTable::GLOBAL, var("x", Type::Int)).unwrap();

        let again = Symbol::new("x", Type::Int, SymbolKind::Variable, SourceLocation::new(3, 1));
        assert_eq!(
            table.declare(SymbolTable::GLOBAL, again),
            Err(SourceLocation::new(1, 1))
        );
    }

    #[test]
    fn test_qualified_resolution() {
        let mut table = SymbolTable::new();
        table
            .declare(
                SymbolTable::GLOBAL,
                Symbol::new(
                    "Person",
                    Type::Class("Person".to_string()),
                    SymbolKind::Class,
                    SourceLocation::new(1, 1),
                ),
            )
            .unwrap();
        let class = table.add_scope(ScopeKind::Class, "Person", SymbolTable::GLOBAL);
        table
            .declare(
                class,
                Symbol::new("name", Type::String, SymbolKind::Field, SourceLocation::new(2, 3)),
            )
            .unwrap();

        assert_eq!(table.resolve("Person").map(|s| &s.kind), Some(&SymbolKind::Class));
        assert_eq!(table.resolve("Person.name").map(|s| &s.ty), Some(&Type::String));
        assert!(table.resolve("Person.age").is_none());
        assert!(table.is_class("Person"));
    }

    #[test]
    fn test_set_type_and_promote() {
        let mut table = SymbolTable::new();
        let method = table.add_scope(ScopeKind::Method, "main", SymbolTable::GLOBAL);
        table.declare(method, var("v", Type::Error)).unwrap();
        table.set_type(method, "v", Type::Float);
        table.promote(method, vec![var("inner", Type::Bool)]);

        assert_eq!(table.lookup_local(method, "v").map(|s| &s.ty), Some(&Type::Float));
        assert_eq!(table.scope(method).promoted().len(), 1);
        assert_eq!(table.routine_scope("main"), Some(method));
        // promoted symbols are recorded, not resolvable
        assert!(table.lookup(method, "inner").is_none());
    }
}
