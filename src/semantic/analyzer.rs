//! Analyzer state and pass orchestration
//!
//! # Passes
//!
//! 1. Declaration collection: classes, then their fields and method
//!    signatures, then top-level routines and globals. Everything declared
//!    here is visible to every body checked in pass 2, regardless of order.
//! 2. Type checking: top-level statements (as the body of `<main>`), then
//!    field initializers and methods class by class, then top-level routines.
//!
//! The active scope chain is a stack of [`Frame`]s owned by the analyzer.
//! Global, class and method frames point into the retained [`SymbolTable`];
//! block frames are private and are promoted into their routine's scope
//! record when they are popped.

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::parser::ast::*;
use crate::semantic::scope::{Scope, ScopeId, ScopeKind, Signature, Symbol, SymbolKind, SymbolTable};
use crate::semantic::types::Type;
use crate::semantic::CheckedProgram;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

/// Name of the routine holding top-level statements
pub const MAIN_ROUTINE: &str = "<main>";

/// Name of the per-class routine that runs field initializers
pub const INIT_ROUTINE: &str = "<init>";

/// Routines every program can call
pub const BUILTINS: &[&str] = &["print", "println"];

pub(crate) enum Frame {
    Retained(ScopeId),
    Block(Scope),
}

/// The routine whose body is being checked
pub(crate) struct RoutineContext {
    pub(crate) name: String,
    pub(crate) class: Option<String>,
    pub(crate) return_type: Type,
    pub(crate) is_instance: bool,
    pub(crate) saw_return: bool,
    pub(crate) loop_depth: usize,
}

pub(crate) struct Analyzer {
    pub(crate) table: SymbolTable,
    pub(crate) frames: Vec<Frame>,
    pub(crate) expr_types: FxHashMap<NodeId, Type>,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) routine: Option<RoutineContext>,
}

/// Check a compilation unit
pub fn analyze(unit: &CompilationUnit) -> CheckedProgram {
    let mut analyzer = Analyzer::new();
    analyzer.collect_declarations(unit);
    analyzer.check_unit(unit);

    let diagnostics = analyzer.diagnostics.into_sorted();
    debug!(
        diagnostics = diagnostics.len(),
        typed_expressions = analyzer.expr_types.len(),
        "semantic analysis finished"
    );

    CheckedProgram {
        unit: unit.clone(),
        symbols: analyzer.table,
        expr_types: analyzer.expr_types,
        diagnostics,
    }
}

impl Analyzer {
    pub(crate) fn new() -> Self {
        Analyzer {
            table: SymbolTable::new(),
            frames: Vec::new(),
            expr_types: FxHashMap::default(),
            diagnostics: Diagnostics::new(),
            routine: None,
        }
    }

    // ===== Diagnostics =====

    pub(crate) fn error(&mut self, kind: DiagnosticKind, message: String, location: SourceLocation) {
        trace!(%kind, %message, line = location.line, "semantic error");
        self.diagnostics.error(kind, message, location);
    }

    fn duplicate(&mut self, name: &str, first: SourceLocation, location: SourceLocation) {
        self.error(
            DiagnosticKind::DuplicateDeclaration,
            format!("'{}' is already declared in this scope (line {})", name, first.line),
            location,
        );
    }

    // ===== Scope frames =====

    pub(crate) fn push_block(&mut self) {
        self.frames
            .push(Frame::Block(Scope::new(ScopeKind::Block, "<block>", None)));
    }

    /// Pop a frame; block symbols are recorded on the nearest retained scope
    pub(crate) fn pop_frame(&mut self) {
        if let Some(Frame::Block(scope)) = self.frames.pop() {
            if let Some(owner) = self.innermost_retained() {
                self.table.promote(owner, scope.into_symbols());
            }
        }
    }

    fn innermost_retained(&self) -> Option<ScopeId> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Retained(id) => Some(*id),
            Frame::Block(_) => None,
        })
    }

    /// Declare in the innermost frame, reporting duplicates
    pub(crate) fn declare_local(&mut self, symbol: Symbol) {
        let name = symbol.name.clone();
        let location = symbol.location;
        let result = match self.frames.last_mut() {
            Some(Frame::Block(scope)) => scope.insert(symbol),
            Some(Frame::Retained(id)) => {
                let id = *id;
                self.table.declare(id, symbol)
            }
            None => self.table.declare(SymbolTable::GLOBAL, symbol),
        };
        if let Err(first) = result {
            self.duplicate(&name, first, location);
        }
    }

    /// Resolve a name through the active frames, innermost first
    pub(crate) fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Retained(id) => self.table.lookup_local(*id, name),
            Frame::Block(scope) => scope.get(name),
        })
    }

    /// Semantic type of a type name; unknown classes are reported once per site
    pub(crate) fn resolve_type(&mut self, base: &BaseType, location: SourceLocation) -> Type {
        if let BaseType::Class(name) = base {
            if !self.table.is_class(name) {
                self.error(
                    DiagnosticKind::UndefinedClass,
                    format!("Undefined class '{}'", name),
                    location,
                );
                return Type::Error;
            }
        }
        Type::from_base(base)
    }

    // ===== Pass 1: declaration collection =====

    pub(crate) fn collect_declarations(&mut self, unit: &CompilationUnit) {
        for name in BUILTINS {
            let signature = Signature {
                params: vec![Type::Error],
                return_type: Type::Void,
                is_static: true,
                builtin: true,
            };
            let symbol = Symbol::new(*name, Type::Void, SymbolKind::Routine(signature), SourceLocation::default());
            // builtins are declared into an empty scope and cannot collide
            let _ = self.table.declare(SymbolTable::GLOBAL, symbol);
        }

        // Class names first, so any signature may mention any class
        let mut class_scopes = Vec::new();
        for item in &unit.items {
            if let AstNode::ClassDef { name, location, .. } = item {
                let symbol = Symbol::new(
                    name.as_str(),
                    Type::Class(name.clone()),
                    SymbolKind::Class,
                    *location,
                );
                match self.table.declare(SymbolTable::GLOBAL, symbol) {
                    Ok(()) => {
                        let scope = self.table.add_scope(ScopeKind::Class, name, SymbolTable::GLOBAL);
                        class_scopes.push(Some(scope));
                    }
                    Err(first) => {
                        self.duplicate(name, first, *location);
                        class_scopes.push(None);
                    }
                }
            }
        }

        let mut classes = class_scopes.into_iter();
        for item in &unit.items {
            match item {
                AstNode::ClassDef {
                    name,
                    fields,
                    methods,
                    ..
                } => {
                    if let Some(Some(scope)) = classes.next() {
                        self.collect_class_members(name, scope, fields, methods);
                    }
                }
                AstNode::FunctionDef { .. } => {
                    self.collect_routine(item, None, SymbolTable::GLOBAL);
                }
                AstNode::VarDecl {
                    name,
                    var_type,
                    location,
                    ..
                } => {
                    // `var` globals get their type from the initializer in pass 2
                    let ty = match var_type {
                        Some(base) => self.resolve_type(base, *location),
                        None => Type::Error,
                    };
                    let symbol = Symbol::new(name.as_str(), ty, SymbolKind::Variable, *location);
                    if let Err(first) = self.table.declare(SymbolTable::GLOBAL, symbol) {
                        self.duplicate(name, first, *location);
                    }
                }
                AstNode::ConstDecl {
                    name,
                    const_type,
                    location,
                    ..
                } => {
                    let ty = self.resolve_type(const_type, *location);
                    let symbol =
                        Symbol::new(name.as_str(), ty, SymbolKind::Variable, *location).constant();
                    if let Err(first) = self.table.declare(SymbolTable::GLOBAL, symbol) {
                        self.duplicate(name, first, *location);
                    }
                }
                _ => {}
            }
        }

        debug!(
            scopes = self.table.scopes().len(),
            "declarations collected"
        );
    }

    fn collect_class_members(
        &mut self,
        class: &str,
        scope: ScopeId,
        fields: &[Field],
        methods: &[AstNode],
    ) {
        for field in fields {
            let ty = self.resolve_type(&field.field_type, field.location);
            let mut symbol = Symbol::new(field.name.as_str(), ty, SymbolKind::Field, field.location);
            symbol.is_constant = field.is_const;
            if let Err(first) = self.table.declare(scope, symbol) {
                self.duplicate(&field.name, first, field.location);
            }
        }

        for method in methods {
            self.collect_routine(method, Some(class), scope);
        }
    }

    /// Declare a routine's signature in `owner` and create its scope
    /// holding the parameters
    fn collect_routine(&mut self, routine: &AstNode, class: Option<&str>, owner: ScopeId) {
        let AstNode::FunctionDef {
            name,
            params,
            return_type,
            is_static,
            location,
            ..
        } = routine
        else {
            return;
        };

        let return_ty = self.resolve_type(return_type, *location);
        let param_types: Vec<Type> = params
            .iter()
            .map(|p| self.resolve_type(&p.param_type, p.location))
            .collect();

        let signature = Signature {
            params: param_types.clone(),
            return_type: return_ty.clone(),
            is_static: *is_static,
            builtin: false,
        };
        let symbol = Symbol::new(name.as_str(), return_ty, SymbolKind::Routine(signature), *location);
        if let Err(first) = self.table.declare(owner, symbol) {
            self.duplicate(name, first, *location);
            return;
        }

        let qualified = qualified_name(class, name);
        let scope = self.table.add_scope(ScopeKind::Method, &qualified, owner);
        for (param, ty) in params.iter().zip(param_types) {
            if ty == Type::Void {
                self.error(
                    DiagnosticKind::TypeMismatch,
                    format!("Parameter '{}' cannot have type void", param.name),
                    param.location,
                );
            }
            let symbol = Symbol::new(param.name.as_str(), ty, SymbolKind::Parameter, param.location);
            if let Err(first) = self.table.declare(scope, symbol) {
                self.duplicate(&param.name, first, param.location);
            }
        }
    }

    // ===== Pass 2: checking =====

    pub(crate) fn check_unit(&mut self, unit: &CompilationUnit) {
        self.frames.push(Frame::Retained(SymbolTable::GLOBAL));

        // Top-level statements form the body of <main>
        let main_scope = self
            .table
            .add_scope(ScopeKind::Method, MAIN_ROUTINE, SymbolTable::GLOBAL);
        self.frames.push(Frame::Retained(main_scope));
        self.enter_routine(MAIN_ROUTINE.to_string(), None, Type::Void, false);
        for item in &unit.items {
            match item {
                AstNode::ClassDef { .. } | AstNode::FunctionDef { .. } => {}
                AstNode::VarDecl { .. } | AstNode::ConstDecl { .. } => self.check_global_declaration(item),
                _ => self.check_statement(item),
            }
        }
        self.routine = None;
        self.pop_frame();

        for item in &unit.items {
            if let AstNode::ClassDef {
                name,
                fields,
                methods,
                ..
            } = item
            {
                self.check_class(name, fields, methods);
            }
        }

        for item in &unit.items {
            if let AstNode::FunctionDef { .. } = item {
                self.check_routine(item, None);
            }
        }

        self.frames.clear();
    }

    fn check_class(&mut self, name: &str, fields: &[Field], methods: &[AstNode]) {
        let Some(scope) = self.table.class_scope(name) else {
            return;
        };
        self.frames.push(Frame::Retained(scope));

        // Field initializers run in the constructor, with `this` available
        self.enter_routine(qualified_name(Some(name), INIT_ROUTINE), Some(name), Type::Void, true);
        for field in fields {
            let Some(init) = &field.init else {
                continue;
            };
            let declared = self
                .table
                .lookup_local(scope, &field.name)
                .map(|s| s.ty.clone())
                .unwrap_or(Type::Error);
            let value = self.infer_initializer(init, Some(&field.field_type));
            self.check_assignable(&declared, &value, *init.location(), || {
                format!("field '{}'", field.name)
            });
        }
        self.routine = None;

        for method in methods {
            self.check_routine(method, Some(name));
        }

        self.pop_frame();
    }

    fn check_routine(&mut self, routine: &AstNode, class: Option<&str>) {
        let AstNode::FunctionDef {
            name,
            return_type,
            body,
            is_static,
            location,
            ..
        } = routine
        else {
            return;
        };

        let qualified = qualified_name(class, name);
        let Some(scope) = self.table.routine_scope(&qualified) else {
            // duplicate routine, already reported
            return;
        };
        let return_ty = Type::from_base(return_type);
        let return_ty = match &return_ty {
            Type::Class(c) if !self.table.is_class(c) => Type::Error,
            _ => return_ty,
        };

        self.frames.push(Frame::Retained(scope));
        self.enter_routine(qualified.clone(), class, return_ty.clone(), class.is_some() && !is_static);

        for stmt in body {
            self.check_statement(stmt);
        }

        let saw_return = self.routine.as_ref().is_some_and(|r| r.saw_return);
        if !saw_return && return_ty != Type::Void && !return_ty.is_error() {
            self.diagnostics.push(Diagnostic::warning(
                DiagnosticKind::MissingReturn,
                format!("Routine '{}' returns {} but has no return statement", name, return_ty),
                *location,
            ));
        }

        self.routine = None;
        self.pop_frame();
        trace!(routine = %qualified, "routine checked");
    }

    fn enter_routine(&mut self, name: String, class: Option<&str>, return_type: Type, is_instance: bool) {
        self.routine = Some(RoutineContext {
            name,
            class: class.map(str::to_string),
            return_type,
            is_instance,
            saw_return: false,
            loop_depth: 0,
        });
    }

    /// Report a `TypeMismatch` when `value` cannot be stored into `target`
    pub(crate) fn check_assignable(
        &mut self,
        target: &Type,
        value: &Type,
        location: SourceLocation,
        what: impl FnOnce() -> String,
    ) {
        if !crate::semantic::types::is_assignable(target, value) {
            self.error(
                DiagnosticKind::TypeMismatch,
                format!("Cannot assign {} to {} of type {}", value, what(), target),
                location,
            );
        }
    }
}

/// `Class.member` for members, the bare name for top-level routines
pub fn qualified_name(class: Option<&str>, name: &str) -> String {
    match class {
        Some(class) => format!("{}.{}", class, name),
        None => name.to_string(),
    }
}
