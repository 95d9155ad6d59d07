//! Expression lowering
//!
//! Every expression leaves exactly one value on the operand stack, except
//! calls to `void` routines, which leave none. The instruction producing the
//! value carries the expression's inferred type.

use crate::ir::generator::{RoutineBuilder, Storage};
use crate::ir::instruction::{Instruction, Opcode, Operand};
use crate::ir::statements::variable_access;
use crate::parser::ast::{AstNode, BaseType, Literal, SourceLocation};
use crate::semantic::{qualified_name, Symbol, Type, INIT_ROUTINE};

impl RoutineBuilder<'_> {
    pub(crate) fn lower_expr(&mut self, expr: &AstNode) {
        let ty = self.program.type_of(expr);
        let location = *expr.location();

        match expr {
            AstNode::Literal { value, .. } => {
                let operand = match value {
                    Literal::Int(n) => Operand::Int(*n),
                    Literal::Float(x) => Operand::Float(*x),
                    Literal::Str(s) => Operand::Str(s.clone()),
                    Literal::Bool(b) => Operand::Bool(*b),
                    Literal::Null => Operand::Null,
                };
                self.emit(Instruction::new(Opcode::Push, ty, location).with_operand(operand));
            }

            AstNode::Variable { name, .. } => match self.storage_of(name) {
                Storage::Local(slot) => {
                    self.emit(variable_access(Opcode::Load, name, ty, Some(slot), location));
                }
                Storage::Field(class) => {
                    self.load_this(location);
                    self.emit(
                        Instruction::new(Opcode::GetField, ty, location)
                            .with_operand(Operand::Symbol(qualified_name(Some(class.as_str()), name))),
                    );
                }
                Storage::Global => {
                    self.emit(variable_access(Opcode::Load, name, ty, None, location));
                }
            },

            AstNode::This { .. } => self.load_this(location),

            AstNode::BinaryOp { op, left, right, .. } => {
                self.lower_expr(left);
                self.lower_expr(right);
                self.emit(Instruction::new(Opcode::from_binop(*op), ty, location));
            }

            AstNode::UnaryOp { op, operand, .. } => {
                self.lower_expr(operand);
                self.emit(Instruction::new(Opcode::from_unop(*op), ty, location));
            }

            AstNode::FunctionCall { name, args, .. } => self.lower_call(name, args, ty, location),

            AstNode::MethodCall {
                object,
                method,
                args,
                ..
            } => self.lower_method_call(object, method, args, ty, location),

            AstNode::MemberAccess { object, member, .. } => {
                let object_ty = self.program.type_of(object);
                let Some(class) = object_ty.class_name() else {
                    return;
                };
                self.lower_expr(object);
                self.emit(
                    Instruction::new(Opcode::GetField, ty, location)
                        .with_operand(Operand::Symbol(qualified_name(Some(class), member))),
                );
            }

            AstNode::New { class_type, args, .. } => {
                let BaseType::Class(class) = class_type else {
                    return;
                };
                self.emit(
                    Instruction::new(Opcode::New, ty.clone(), location).with_operand(Operand::Symbol(class.clone())),
                );
                // The duplicate is consumed as the constructor's receiver
                self.emit(Instruction::new(Opcode::Dup, ty, location));
                for arg in args {
                    self.lower_expr(arg);
                }
                self.emit(
                    Instruction::new(Opcode::InvokeConstructor, Type::Void, location).with_operand(Operand::Call {
                        target: qualified_name(Some(class.as_str()), INIT_ROUTINE),
                        argc: args.len() + 1,
                    }),
                );
            }

            // Declarations and statements are lowered by lower_statement
            _ => {}
        }
    }

    /// `f(args)`: a method of the current class when one has that name,
    /// otherwise a top-level function or builtin
    fn lower_call(&mut self, name: &str, args: &[AstNode], ty: Type, location: SourceLocation) {
        let method = self
            .own_member(name)
            .and_then(Symbol::signature)
            .map(|sig| sig.is_static);

        let (target, with_receiver) = match (&self.class, method) {
            (Some(class), Some(is_static)) => (qualified_name(Some(class.as_str()), name), !is_static),
            _ => (name.to_string(), false),
        };

        if with_receiver {
            self.load_this(location);
        }
        for arg in args {
            self.lower_expr(arg);
        }
        self.emit_call(target, args.len() + usize::from(with_receiver), ty, location);
    }

    /// `o.m(args)`, or `C.m(args)` for a static method named through its class
    fn lower_method_call(
        &mut self,
        object: &AstNode,
        method: &str,
        args: &[AstNode],
        ty: Type,
        location: SourceLocation,
    ) {
        let object_ty = self.program.type_of(object);
        let Some(class) = object_ty.class_name() else {
            return;
        };
        let is_static = self
            .program
            .symbols
            .member(class, method)
            .and_then(Symbol::signature)
            .is_some_and(|sig| sig.is_static);
        let through_class = matches!(object, AstNode::Variable { name, .. } if self.names_class(name));

        let with_receiver = if through_class {
            false
        } else if is_static {
            // Evaluated for its effects; static methods take no receiver
            self.lower_expr(object);
            self.emit(Instruction::new(Opcode::Pop, object_ty.clone(), location));
            false
        } else {
            self.lower_expr(object);
            true
        };

        for arg in args {
            self.lower_expr(arg);
        }
        self.emit_call(
            qualified_name(Some(class), method),
            args.len() + usize::from(with_receiver),
            ty,
            location,
        );
    }

    fn emit_call(&mut self, target: String, argc: usize, ty: Type, location: SourceLocation) {
        self.emit(Instruction::new(Opcode::Call, ty, location).with_operand(Operand::Call { target, argc }));
    }
}
