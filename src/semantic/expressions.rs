//! Expression type inference
//!
//! Every expression node gets a type recorded under its `NodeId`, including
//! the ones that failed (as `Error`). An operand that is already `Error`
//! never triggers a second diagnostic.

use crate::diagnostics::DiagnosticKind;
use crate::parser::ast::*;
use crate::semantic::analyzer::Analyzer;
use crate::semantic::scope::{ScopeKind, Signature, SymbolKind};
use crate::semantic::types::{binary_result, is_assignable, unary_result, Type};

impl Analyzer {
    /// Infer and record the type of an expression
    pub(crate) fn infer(&mut self, expr: &AstNode) -> Type {
        let ty = self.infer_expr(expr);
        if let Some(id) = expr.id() {
            self.expr_types.insert(id, ty.clone());
        }
        ty
    }

    /// Infer a declaration's initializer. In `T x = new T(..)` with an
    /// undeclared `T`, the class was already reported at the declared type.
    pub(crate) fn infer_initializer(&mut self, init: &AstNode, declared: Option<&BaseType>) -> Type {
        if let (
            Some(BaseType::Class(declared)),
            AstNode::New {
                class_type: BaseType::Class(class),
                args,
                id,
                ..
            },
        ) = (declared, init)
        {
            if class == declared && !self.table.is_class(class) {
                for arg in args {
                    self.infer(arg);
                }
                self.expr_types.insert(*id, Type::Error);
                return Type::Error;
            }
        }
        self.infer(init)
    }

    fn infer_expr(&mut self, expr: &AstNode) -> Type {
        match expr {
            AstNode::Literal { value, .. } => match value {
                Literal::Int(_) => Type::Int,
                Literal::Float(_) => Type::Float,
                Literal::Str(_) => Type::String,
                Literal::Bool(_) => Type::Bool,
                Literal::Null => Type::Null,
            },

            AstNode::Variable { name, location, .. } => self.infer_variable(name, *location),

            AstNode::This { location, .. } => match self.instance_class() {
                Some(class) => Type::Class(class),
                None => {
                    self.error(
                        DiagnosticKind::MisplacedStatement,
                        "'this' can only be used inside an instance method".to_string(),
                        *location,
                    );
                    Type::Error
                }
            },

            AstNode::BinaryOp {
                op,
                left,
                right,
                location,
                ..
            } => {
                let l = self.infer(left);
                let r = self.infer(right);
                if l.is_error() || r.is_error() {
                    return Type::Error;
                }
                binary_result(*op, &l, &r).unwrap_or_else(|| {
                    self.error(
                        DiagnosticKind::InvalidOperator,
                        format!("Operator '{}' cannot be applied to {} and {}", op.symbol(), l, r),
                        *location,
                    );
                    Type::Error
                })
            }

            AstNode::UnaryOp {
                op,
                operand,
                location,
                ..
            } => {
                let ty = self.infer(operand);
                if ty.is_error() {
                    return Type::Error;
                }
                unary_result(*op, &ty).unwrap_or_else(|| {
                    self.error(
                        DiagnosticKind::InvalidOperator,
                        format!("Operator '{}' cannot be applied to {}", op.symbol(), ty),
                        *location,
                    );
                    Type::Error
                })
            }

            AstNode::FunctionCall {
                name,
                args,
                location,
                ..
            } => self.infer_call(name, args, *location),

            AstNode::MethodCall {
                object,
                method,
                args,
                location,
                ..
            } => self.infer_method_call(object, method, args, *location),

            AstNode::MemberAccess {
                object,
                member,
                location,
                ..
            } => {
                let object_ty = self.infer(object);
                self.infer_member(&object_ty, member, *location)
            }

            AstNode::New {
                class_type,
                args,
                location,
                ..
            } => {
                // Arguments are checked as expressions; constructors take no parameters
                for arg in args {
                    self.infer(arg);
                }
                match class_type {
                    BaseType::Class(_) => self.resolve_type(class_type, *location),
                    builtin => {
                        self.error(
                            DiagnosticKind::InvalidConstructorCall,
                            format!("Cannot construct built-in type '{}' with 'new'", builtin),
                            *location,
                        );
                        Type::Error
                    }
                }
            }

            // Statements have no type
            AstNode::ClassDef { .. }
            | AstNode::FunctionDef { .. }
            | AstNode::VarDecl { .. }
            | AstNode::ConstDecl { .. }
            | AstNode::Block { .. }
            | AstNode::Assignment { .. }
            | AstNode::Return { .. }
            | AstNode::If { .. }
            | AstNode::While { .. }
            | AstNode::For { .. }
            | AstNode::Break { .. }
            | AstNode::Continue { .. }
            | AstNode::ExpressionStatement { .. } => Type::Void,
        }
    }

    /// Class of `this` when checking an instance routine
    fn instance_class(&self) -> Option<String> {
        self.routine
            .as_ref()
            .filter(|r| r.is_instance)
            .and_then(|r| r.class.clone())
    }

    fn infer_variable(&mut self, name: &str, location: SourceLocation) -> Type {
        let in_instance = self.instance_class().is_some();
        let outcome = match self.lookup(name) {
            None => Err((DiagnosticKind::UndefinedSymbol, format!("Undefined symbol '{}'", name))),
            Some(symbol) => match &symbol.kind {
                SymbolKind::Routine(_) => Err((
                    DiagnosticKind::TypeMismatch,
                    format!("'{}' is a routine, not a value", name),
                )),
                SymbolKind::Class => Err((
                    DiagnosticKind::TypeMismatch,
                    format!("'{}' is a class, not a value", name),
                )),
                SymbolKind::Field if !in_instance => Err((
                    DiagnosticKind::MisplacedStatement,
                    format!("Field '{}' can only be used inside an instance method", name),
                )),
                SymbolKind::Variable | SymbolKind::Parameter | SymbolKind::Field => {
                    Ok(symbol.ty.clone())
                }
            },
        };

        outcome.unwrap_or_else(|(kind, message)| {
            self.error(kind, message, location);
            Type::Error
        })
    }

    fn infer_call(&mut self, name: &str, args: &[AstNode], location: SourceLocation) -> Type {
        let arg_types: Vec<Type> = args.iter().map(|arg| self.infer(arg)).collect();
        let resolved = self.lookup(name).map(|s| (s.kind.clone(), s.scope_kind));

        match resolved {
            Some((SymbolKind::Routine(sig), scope_kind)) => {
                if scope_kind == ScopeKind::Class && !sig.is_static && self.instance_class().is_none() {
                    self.error(
                        DiagnosticKind::MisplacedStatement,
                        format!("Cannot call instance method '{}' from a static context", name),
                        location,
                    );
                    return Type::Error;
                }
                self.check_arguments(name, &sig, &arg_types, args, location);
                sig.return_type
            }
            Some(_) => {
                self.error(
                    DiagnosticKind::TypeMismatch,
                    format!("'{}' is not a routine", name),
                    location,
                );
                Type::Error
            }
            None => {
                self.error(
                    DiagnosticKind::UndefinedSymbol,
                    format!("Undefined routine '{}'", name),
                    location,
                );
                Type::Error
            }
        }
    }

    fn infer_method_call(
        &mut self,
        object: &AstNode,
        method: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Type {
        // `Class.method()` calls a static method; a local of the same name wins
        if let AstNode::Variable { name, id, .. } = object {
            let names_class = self
                .lookup(name)
                .is_some_and(|s| matches!(s.kind, SymbolKind::Class));
            if names_class {
                self.expr_types.insert(*id, Type::Class(name.clone()));
                let arg_types: Vec<Type> = args.iter().map(|arg| self.infer(arg)).collect();
                return self.infer_static_call(name, method, args, &arg_types, location);
            }
        }

        let object_ty = self.infer(object);
        let arg_types: Vec<Type> = args.iter().map(|arg| self.infer(arg)).collect();

        let class = match &object_ty {
            Type::Error => return Type::Error,
            Type::Class(class) => class.clone(),
            other => {
                self.error(
                    DiagnosticKind::TypeMismatch,
                    format!("Cannot call method '{}' on {}", method, other),
                    location,
                );
                return Type::Error;
            }
        };

        match self.method_signature(&class, method, location) {
            Some(sig) => {
                let qualified = format!("{}.{}", class, method);
                self.check_arguments(&qualified, &sig, &arg_types, args, location);
                sig.return_type
            }
            None => Type::Error,
        }
    }

    fn infer_static_call(
        &mut self,
        class: &str,
        method: &str,
        args: &[AstNode],
        arg_types: &[Type],
        location: SourceLocation,
    ) -> Type {
        let Some(sig) = self.method_signature(class, method, location) else {
            return Type::Error;
        };
        let qualified = format!("{}.{}", class, method);
        if !sig.is_static {
            self.error(
                DiagnosticKind::MisplacedStatement,
                format!("Instance method '{}' needs an object to be called on", qualified),
                location,
            );
            return Type::Error;
        }
        self.check_arguments(&qualified, &sig, arg_types, args, location);
        sig.return_type
    }

    /// Signature of `class.method`, reporting a missing or non-method member
    fn method_signature(&mut self, class: &str, method: &str, location: SourceLocation) -> Option<Signature> {
        let member = self.table.member(class, method).map(|s| s.kind.clone());
        match member {
            Some(SymbolKind::Routine(sig)) => Some(sig),
            Some(_) => {
                self.error(
                    DiagnosticKind::TypeMismatch,
                    format!("'{}' is a field of '{}', not a method", method, class),
                    location,
                );
                None
            }
            None => {
                self.error(
                    DiagnosticKind::UndefinedSymbol,
                    format!("Class '{}' has no method '{}'", class, method),
                    location,
                );
                None
            }
        }
    }

    fn infer_member(&mut self, object_ty: &Type, member: &str, location: SourceLocation) -> Type {
        let class = match object_ty {
            Type::Error => return Type::Error,
            Type::Class(class) => class,
            other => {
                self.error(
                    DiagnosticKind::TypeMismatch,
                    format!("Cannot access member '{}' on {}", member, other),
                    location,
                );
                return Type::Error;
            }
        };

        let found = self
            .table
            .member(class, member)
            .map(|s| (matches!(s.kind, SymbolKind::Field), s.ty.clone()));
        match found {
            Some((true, ty)) => ty,
            Some((false, _)) => {
                self.error(
                    DiagnosticKind::TypeMismatch,
                    format!("'{}' is a method of '{}', not a field", member, class),
                    location,
                );
                Type::Error
            }
            None => {
                self.error(
                    DiagnosticKind::UndefinedSymbol,
                    format!("Class '{}' has no field '{}'", class, member),
                    location,
                );
                Type::Error
            }
        }
    }

    fn check_arguments(
        &mut self,
        name: &str,
        sig: &Signature,
        arg_types: &[Type],
        args: &[AstNode],
        location: SourceLocation,
    ) {
        let expected = sig.params.len();
        if arg_types.len() != expected {
            self.error(
                DiagnosticKind::ArgumentCountMismatch,
                format!(
                    "'{}' expects {} argument{}, found {}",
                    name,
                    expected,
                    if expected == 1 { "" } else { "s" },
                    arg_types.len()
                ),
                location,
            );
            return;
        }
        if sig.builtin {
            return;
        }

        for (i, ((param, arg_ty), arg)) in sig.params.iter().zip(arg_types).zip(args).enumerate() {
            if !is_assignable(param, arg_ty) {
                self.error(
                    DiagnosticKind::TypeMismatch,
                    format!("Argument {} of '{}' expects {}, found {}", i + 1, name, param, arg_ty),
                    *arg.location(),
                );
            }
        }
    }
}
