//! Statement checking
//!
//! Declarations are entered into the innermost frame as they are reached,
//! so a local is visible from its declaration to the end of its block.
//! Top-level declarations were already entered by pass 1 and are only
//! checked here.

use crate::diagnostics::DiagnosticKind;
use crate::parser::ast::*;
use crate::semantic::analyzer::Analyzer;
use crate::semantic::scope::{Symbol, SymbolKind, SymbolTable};
use crate::semantic::types::{binary_result, Type};

impl Analyzer {
    pub(crate) fn check_statement(&mut self, stmt: &AstNode) {
        match stmt {
            AstNode::VarDecl {
                name,
                var_type,
                init,
                location,
            } => {
                let ty = self.check_var_declaration(name, var_type.as_ref(), init.as_deref(), *location);
                self.declare_local(Symbol::new(name.as_str(), ty, SymbolKind::Variable, *location));
            }

            AstNode::ConstDecl {
                name,
                const_type,
                value,
                location,
            } => {
                let ty = self.check_var_declaration(name, Some(const_type), Some(value), *location);
                self.declare_local(
                    Symbol::new(name.as_str(), ty, SymbolKind::Variable, *location).constant(),
                );
            }

            AstNode::Block { statements, .. } => self.check_block(statements),

            AstNode::Assignment {
                target,
                op,
                value,
                location,
            } => self.check_assignment(target, *op, value, *location),

            AstNode::Return { expr, location } => self.check_return(expr.as_deref(), *location),

            AstNode::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_condition(condition);
                self.check_block(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_block(else_branch);
                }
            }

            AstNode::While {
                condition, body, ..
            } => {
                self.check_condition(condition);
                self.check_loop_body(body);
            }

            AstNode::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                // the loop variable is scoped to the loop
                self.push_block();
                if let Some(init) = init {
                    self.check_statement(init);
                }
                if let Some(condition) = condition {
                    self.check_condition(condition);
                }
                if let Some(update) = update {
                    self.check_statement(update);
                }
                self.check_loop_body(body);
                self.pop_frame();
            }

            AstNode::Break { location } => self.check_in_loop("break", *location),
            AstNode::Continue { location } => self.check_in_loop("continue", *location),

            AstNode::ExpressionStatement { expr, .. } => {
                self.infer(expr);
            }

            AstNode::ClassDef { location, .. } | AstNode::FunctionDef { location, .. } => {
                self.error(
                    DiagnosticKind::MisplacedStatement,
                    "Definitions are only allowed at top level".to_string(),
                    *location,
                );
            }

            // A bare expression in statement position
            AstNode::Literal { .. }
            | AstNode::Variable { .. }
            | AstNode::This { .. }
            | AstNode::BinaryOp { .. }
            | AstNode::UnaryOp { .. }
            | AstNode::FunctionCall { .. }
            | AstNode::MethodCall { .. }
            | AstNode::MemberAccess { .. }
            | AstNode::New { .. } => {
                self.infer(stmt);
            }
        }
    }

    /// Top-level variable or constant; its symbol already lives in the
    /// global scope
    pub(crate) fn check_global_declaration(&mut self, decl: &AstNode) {
        let (name, declared_type, init, location) = match decl {
            AstNode::VarDecl {
                name,
                var_type,
                init,
                location,
            } => (name, var_type.as_ref(), init.as_deref(), *location),
            AstNode::ConstDecl {
                name,
                const_type,
                value,
                location,
            } => (name, Some(const_type), Some(value.as_ref()), *location),
            _ => return,
        };

        let Some((first, declared)) = self
            .table
            .lookup_local(SymbolTable::GLOBAL, name)
            .map(|s| (s.location, s.ty.clone()))
        else {
            return;
        };
        // A duplicate of an earlier global: pass 1 reported it
        if first != location {
            if let Some(init) = init {
                self.infer(init);
            }
            return;
        }
        let inferred_later = matches!(decl, AstNode::VarDecl { var_type: None, .. });

        let Some(init) = init else {
            self.check_storable(name, &declared, location);
            return;
        };
        let value = self.infer_initializer(init, declared_type);

        if inferred_later {
            let ty = self.inferred_variable_type(name, value, location);
            self.table.set_type(SymbolTable::GLOBAL, name, ty);
        } else {
            self.check_storable(name, &declared, location);
            self.check_assignable(&declared, &value, location, || format!("variable '{}'", name));
        }
    }

    /// Check a local declaration and return the variable's type
    fn check_var_declaration(
        &mut self,
        name: &str,
        var_type: Option<&BaseType>,
        init: Option<&AstNode>,
        location: SourceLocation,
    ) -> Type {
        let declared = var_type.map(|base| self.resolve_type(base, location));
        let value = init.map(|init| self.infer_initializer(init, var_type));

        match (declared, value) {
            (Some(declared), value) => {
                self.check_storable(name, &declared, location);
                if let Some(value) = value {
                    self.check_assignable(&declared, &value, location, || {
                        format!("variable '{}'", name)
                    });
                }
                declared
            }
            (None, Some(value)) => self.inferred_variable_type(name, value, location),
            // `var` without initializer does not parse
            (None, None) => Type::Error,
        }
    }

    fn inferred_variable_type(&mut self, name: &str, value: Type, location: SourceLocation) -> Type {
        match value {
            Type::Void | Type::Null => {
                self.error(
                    DiagnosticKind::TypeMismatch,
                    format!("Cannot infer the type of '{}' from a {} value", name, value),
                    location,
                );
                Type::Error
            }
            ty => ty,
        }
    }

    fn check_storable(&mut self, name: &str, ty: &Type, location: SourceLocation) {
        if *ty == Type::Void {
            self.error(
                DiagnosticKind::TypeMismatch,
                format!("Variable '{}' cannot have type void", name),
                location,
            );
        }
    }

    pub(crate) fn check_block(&mut self, statements: &[AstNode]) {
        self.push_block();
        for stmt in statements {
            self.check_statement(stmt);
        }
        self.pop_frame();
    }

    fn check_loop_body(&mut self, body: &[AstNode]) {
        if let Some(routine) = self.routine.as_mut() {
            routine.loop_depth += 1;
        }
        self.check_block(body);
        if let Some(routine) = self.routine.as_mut() {
            routine.loop_depth -= 1;
        }
    }

    fn check_in_loop(&mut self, keyword: &str, location: SourceLocation) {
        let in_loop = self.routine.as_ref().is_some_and(|r| r.loop_depth > 0);
        if !in_loop {
            self.error(
                DiagnosticKind::MisplacedStatement,
                format!("'{}' outside of a loop", keyword),
                location,
            );
        }
    }

    fn check_condition(&mut self, condition: &AstNode) {
        let ty = self.infer(condition);
        if !ty.is_error() && ty != Type::Bool {
            self.error(
                DiagnosticKind::TypeMismatch,
                format!("Condition must be bool, found {}", ty),
                *condition.location(),
            );
        }
    }

    fn check_assignment(
        &mut self,
        target: &AstNode,
        op: Option<BinOp>,
        value: &AstNode,
        location: SourceLocation,
    ) {
        let target_ty = self.infer(target);
        let value_ty = self.infer(value);

        if let Some(name) = self.constant_target(target) {
            self.error(
                DiagnosticKind::ConstantAssignment,
                format!("Cannot assign to constant '{}'", name),
                location,
            );
            return;
        }
        if target_ty.is_error() || value_ty.is_error() {
            return;
        }

        let stored = match op {
            None => value_ty,
            Some(op) => match binary_result(op, &target_ty, &value_ty) {
                Some(ty) => ty,
                None => {
                    self.error(
                        DiagnosticKind::InvalidOperator,
                        format!(
                            "Operator '{}=' cannot be applied to {} and {}",
                            op.symbol(),
                            target_ty,
                            value_ty
                        ),
                        location,
                    );
                    return;
                }
            },
        };

        self.check_assignable(&target_ty, &stored, location, || match target {
            AstNode::Variable { name, .. } => format!("'{}'", name),
            AstNode::MemberAccess { member, .. } => format!("field '{}'", member),
            _ => "target".to_string(),
        });
    }

    /// Name of the constant an assignment target refers to, if any
    fn constant_target(&self, target: &AstNode) -> Option<String> {
        match target {
            AstNode::Variable { name, .. } => self
                .lookup(name)
                .filter(|s| s.is_constant)
                .map(|s| s.name.clone()),
            AstNode::MemberAccess { object, member, .. } => {
                let class = self.expr_types.get(&object.id()?)?.class_name()?;
                self.table
                    .member(class, member)
                    .filter(|s| s.is_constant)
                    .map(|s| s.name.clone())
            }
            _ => None,
        }
    }

    fn check_return(&mut self, expr: Option<&AstNode>, location: SourceLocation) {
        let value = expr.map(|e| self.infer(e));
        let Some(routine) = self.routine.as_mut() else {
            return;
        };
        routine.saw_return = true;
        let expected = routine.return_type.clone();
        let name = routine.name.clone();

        match value {
            None if expected != Type::Void && !expected.is_error() => self.error(
                DiagnosticKind::TypeMismatch,
                format!("Routine '{}' must return a value of type {}", name, expected),
                location,
            ),
            Some(value) if expected == Type::Void && !value.is_error() => self.error(
                DiagnosticKind::TypeMismatch,
                format!("Cannot return a value from void routine '{}'", name),
                location,
            ),
            Some(value) => {
                if !crate::semantic::types::is_assignable(&expected, &value) {
                    self.error(
                        DiagnosticKind::TypeMismatch,
                        format!("Cannot return {} from routine '{}' returning {}", value, name, expected),
                        location,
                    );
                }
            }
            None => {}
        }
    }
}
