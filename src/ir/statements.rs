//! Statement lowering
//!
//! # Templates
//!
//! ```text
//! T x = e;            e  STORE x@slot
//! x op= e;            LOAD x  e  OP  STORE x
//! o.f = e;            o  e  PUTFIELD C.f
//! e;                  e  [POP]
//! if c {a} else {b}   c  JUMP_IF_FALSE Le  a  JUMP Lend  Le:  b  Lend:
//! while c {a}         Ls:  c  JUMP_IF_FALSE Lend  a  JUMP Ls  Lend:
//! for i; c; u {a}     i  Ls:  c  JUMP_IF_FALSE Lend  a  Lnext:  u  JUMP Ls  Lend:
//! ```
//!
//! `break` jumps to the loop's end label and `continue` to its condition
//! (for `for`, its update). A statement with an `Error`-typed expression
//! is dropped as a whole.

use crate::ir::generator::{LoopLabels, RoutineBuilder, Storage};
use crate::ir::instruction::{Instruction, LabelId, Opcode, Operand};
use crate::ir::program::RoutineKind;
use crate::parser::ast::{AstNode, BaseType, BinOp, SourceLocation};
use crate::semantic::{qualified_name, Type};
use tracing::trace;

impl RoutineBuilder<'_> {
    pub(crate) fn lower_statement(&mut self, stmt: &AstNode) {
        if self.statement_is_malformed(stmt) {
            trace!(line = stmt.location().line, "skipping statement with type errors");
            return;
        }

        match stmt {
            AstNode::VarDecl {
                name,
                var_type,
                init,
                location,
            } => {
                let ty = match (var_type, init) {
                    (Some(base), _) => Type::from_base(base),
                    (None, Some(init)) => self.program.type_of(init),
                    (None, None) => Type::Error,
                };
                self.lower_local(name, ty, init.as_deref(), *location);
            }

            AstNode::ConstDecl {
                name,
                const_type,
                value,
                location,
            } => {
                self.lower_local(name, Type::from_base(const_type), Some(value.as_ref()), *location);
            }

            AstNode::Block { statements, .. } => self.lower_block(statements),

            AstNode::Assignment {
                target,
                op,
                value,
                location,
            } => self.lower_assignment(target, *op, value, *location),

            AstNode::Return { expr, location } => {
                let ty = match expr {
                    Some(expr) => {
                        self.lower_expr(expr);
                        if self.return_type == Type::Void {
                            self.program.type_of(expr)
                        } else {
                            self.return_type.clone()
                        }
                    }
                    None => Type::Void,
                };
                self.emit(Instruction::new(Opcode::Return, ty, *location));
            }

            AstNode::If {
                condition,
                then_branch,
                else_branch,
                location,
            } => {
                let else_label = self.new_label();
                self.lower_expr(condition);
                self.jump(Opcode::JumpIfFalse, else_label, *location);
                self.lower_block(then_branch);

                match else_branch {
                    Some(else_branch) => {
                        let end = self.new_label();
                        self.jump(Opcode::Jump, end, *location);
                        self.place_label(else_label, *location);
                        self.lower_block(else_branch);
                        self.place_label(end, *location);
                    }
                    None => self.place_label(else_label, *location),
                }
            }

            AstNode::While {
                condition,
                body,
                location,
            } => {
                let start = self.new_label();
                let end = self.new_label();
                self.place_label(start, *location);
                self.lower_expr(condition);
                self.jump(Opcode::JumpIfFalse, end, *location);
                self.lower_loop_body(body, start, end);
                self.jump(Opcode::Jump, start, *location);
                self.place_label(end, *location);
            }

            AstNode::For {
                init,
                condition,
                update,
                body,
                location,
            } => {
                // The loop variable is scoped to the loop
                self.slots.enter_block();
                if let Some(init) = init {
                    self.lower_statement(init);
                }

                let start = self.new_label();
                let next = self.new_label();
                let end = self.new_label();
                self.place_label(start, *location);
                if let Some(condition) = condition {
                    self.lower_expr(condition);
                    self.jump(Opcode::JumpIfFalse, end, *location);
                }
                self.lower_loop_body(body, next, end);
                self.place_label(next, *location);
                if let Some(update) = update {
                    self.lower_statement(update);
                }
                self.jump(Opcode::Jump, start, *location);
                self.place_label(end, *location);

                self.slots.exit_block();
            }

            AstNode::Break { location } => match self.loops.last().copied() {
                Some(labels) => {
                    let target = labels.break_to;
                    self.jump(Opcode::Jump, target, *location);
                }
                None => trace!(line = location.line, "'break' outside of a loop dropped"),
            },

            AstNode::Continue { location } => match self.loops.last().copied() {
                Some(labels) => {
                    let target = labels.continue_to;
                    self.jump(Opcode::Jump, target, *location);
                }
                None => trace!(line = location.line, "'continue' outside of a loop dropped"),
            },

            AstNode::ExpressionStatement { expr, location } => {
                self.lower_expr(expr);
                let ty = self.program.type_of(expr);
                if ty != Type::Void {
                    self.emit(Instruction::new(Opcode::Pop, ty, *location));
                }
            }

            // Definitions are lowered as routines; bare expressions arrive
            // wrapped in ExpressionStatement
            _ => {}
        }
    }

    fn lower_block(&mut self, statements: &[AstNode]) {
        self.slots.enter_block();
        for stmt in statements {
            self.lower_statement(stmt);
        }
        self.slots.exit_block();
    }

    fn lower_loop_body(&mut self, body: &[AstNode], continue_to: LabelId, break_to: LabelId) {
        self.loops.push(LoopLabels {
            continue_to,
            break_to,
        });
        self.lower_block(body);
        self.loops.pop();
    }

    /// Allocate a slot for a declared local and store its initializer.
    /// The initializer is lowered first, so it still sees any outer
    /// variable of the same name. Top-level variables of `<main>` already
    /// hold a slot.
    fn lower_local(&mut self, name: &str, ty: Type, init: Option<&AstNode>, location: SourceLocation) {
        if let Some(init) = init {
            self.lower_expr(init);
        }
        let top_level = self.kind == RoutineKind::TopLevel && self.slots.depth() == 0;
        let slot = match self.slots.resolve(name) {
            Some(slot) if top_level => Some(slot),
            _ => self.declare_local(name, ty.clone()),
        };
        if init.is_some() {
            self.emit(variable_access(Opcode::Store, name, ty, slot, location));
        }
    }

    fn lower_assignment(&mut self, target: &AstNode, op: Option<BinOp>, value: &AstNode, location: SourceLocation) {
        let target_ty = self.program.type_of(target);

        match target {
            AstNode::Variable { name, .. } => match self.storage_of(name) {
                Storage::Field(class) => {
                    self.load_this(location);
                    self.put_field(&class, name, target_ty, op, value, location);
                }
                storage => {
                    let slot = match storage {
                        Storage::Local(slot) => Some(slot),
                        _ => None,
                    };
                    if op.is_some() {
                        self.emit(variable_access(Opcode::Load, name, target_ty.clone(), slot, location));
                    }
                    self.lower_expr(value);
                    if let Some(op) = op {
                        self.emit(Instruction::new(Opcode::from_binop(op), target_ty.clone(), location));
                    }
                    self.emit(variable_access(Opcode::Store, name, target_ty, slot, location));
                }
            },

            AstNode::MemberAccess { object, member, .. } => {
                let object_ty = self.program.type_of(object);
                let Some(class) = object_ty.class_name() else {
                    return;
                };
                self.lower_expr(object);
                self.put_field(class, member, target_ty, op, value, location);
            }

            // The parser only builds assignments to names and members
            _ => {}
        }
    }

    /// With the receiver on the stack, store `value` (or `receiver.field op
    /// value` for compound assignments) into the field
    fn put_field(
        &mut self,
        class: &str,
        field: &str,
        ty: Type,
        op: Option<BinOp>,
        value: &AstNode,
        location: SourceLocation,
    ) {
        let field_symbol = Operand::Symbol(qualified_name(Some(class), field));
        if op.is_some() {
            self.emit(Instruction::new(Opcode::Dup, Type::Class(class.to_string()), location));
            self.emit(Instruction::new(Opcode::GetField, ty.clone(), location).with_operand(field_symbol.clone()));
        }
        self.lower_expr(value);
        if let Some(op) = op {
            self.emit(Instruction::new(Opcode::from_binop(op), ty.clone(), location));
        }
        self.emit(Instruction::new(Opcode::PutField, ty, location).with_operand(field_symbol));
    }

    // ===== Error filtering =====

    fn statement_is_malformed(&self, stmt: &AstNode) -> bool {
        match stmt {
            AstNode::VarDecl { var_type, init, .. } => {
                var_type.as_ref().is_some_and(|base| self.is_unknown_class(base))
                    || init.as_deref().is_some_and(|e| self.is_malformed(e))
            }
            AstNode::ConstDecl {
                const_type, value, ..
            } => self.is_unknown_class(const_type) || self.is_malformed(value),
            AstNode::Assignment { target, value, .. } => self.is_malformed(target) || self.is_malformed(value),
            AstNode::Return { expr, .. } => expr.as_deref().is_some_and(|e| self.is_malformed(e)),
            AstNode::If { condition, .. } | AstNode::While { condition, .. } => self.is_malformed(condition),
            AstNode::For {
                init,
                condition,
                update,
                ..
            } => {
                init.as_deref().is_some_and(|s| self.statement_is_malformed(s))
                    || condition.as_deref().is_some_and(|e| self.is_malformed(e))
                    || update.as_deref().is_some_and(|s| self.statement_is_malformed(s))
            }
            AstNode::ExpressionStatement { expr, .. } => self.is_malformed(expr),
            _ => false,
        }
    }

    fn is_unknown_class(&self, base: &BaseType) -> bool {
        matches!(base, BaseType::Class(name) if !self.program.symbols.is_class(name))
    }

    /// True when the expression or any part of it failed to type check
    pub(crate) fn is_malformed(&self, expr: &AstNode) -> bool {
        if self.program.type_of(expr).is_error() {
            return true;
        }
        match expr {
            AstNode::BinaryOp { left, right, .. } => self.is_malformed(left) || self.is_malformed(right),
            AstNode::UnaryOp { operand, .. } => self.is_malformed(operand),
            AstNode::FunctionCall { args, .. } | AstNode::New { args, .. } => {
                args.iter().any(|arg| self.is_malformed(arg))
            }
            AstNode::MethodCall { object, args, .. } => {
                self.is_malformed(object) || args.iter().any(|arg| self.is_malformed(arg))
            }
            AstNode::MemberAccess { object, .. } => self.is_malformed(object),
            _ => false,
        }
    }
}

/// `LOAD`/`STORE` of a local (with its slot) or a global (without)
pub(crate) fn variable_access(
    opcode: Opcode,
    name: &str,
    ty: Type,
    slot: Option<u16>,
    location: SourceLocation,
) -> Instruction {
    let instruction = Instruction::new(opcode, ty, location).with_operand(Operand::Symbol(name.to_string()));
    match slot {
        Some(slot) => instruction.with_slot(slot),
        None => instruction,
    }
}
