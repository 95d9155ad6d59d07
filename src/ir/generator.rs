//! Routine construction
//!
//! # Routines
//!
//! One [`Routine`] is generated for each of:
//! - `<main>`: the top-level statements; static, and top-level variables
//!   are its locals
//! - `C.<init>`: one per class, storing field initializers into `this`
//! - `C.m`: class methods, instance routines unless declared `static`
//! - `f`: top-level functions, always static
//!
//! Routines are emitted in that order: `<main>`, then each class (its
//! constructor followed by its methods), then top-level functions.
//!
//! Each routine is lowered by its own [`RoutineBuilder`], which owns the
//! code buffer, label counter, loop stack and slot allocator. Statement and
//! expression lowering add `impl RoutineBuilder` blocks in `statements.rs`
//! and `expressions.rs`.

use crate::ir::instruction::{Instruction, LabelId, Opcode, Operand};
use crate::ir::program::{IrProgram, Routine, RoutineKind};
use crate::ir::slots::SlotAllocator;
use crate::parser::ast::{AstNode, Field, SourceLocation};
use crate::semantic::{qualified_name, CheckedProgram, Symbol, SymbolKind, Type, INIT_ROUTINE, MAIN_ROUTINE};
use tracing::{debug, warn};

/// Generate IR for every routine of a checked program
pub fn generate(program: &CheckedProgram) -> IrProgram {
    let mut routines = vec![generate_main(program)];

    for item in &program.unit.items {
        if let AstNode::ClassDef {
            name,
            fields,
            methods,
            location,
        } = item
        {
            let declared_here = program
                .symbols
                .resolve(name)
                .is_some_and(|s| matches!(s.kind, SymbolKind::Class) && s.location == *location);
            if !declared_here {
                continue;
            }
            routines.push(generate_constructor(program, name, fields, *location));
            routines.extend(
                methods
                    .iter()
                    .filter_map(|method| generate_routine(program, method, Some(name.as_str()))),
            );
        }
    }

    routines.extend(
        program
            .unit
            .items
            .iter()
            .filter_map(|item| generate_routine(program, item, None)),
    );

    debug!(routines = routines.len(), "IR generated");
    IrProgram { routines }
}

fn generate_main(program: &CheckedProgram) -> Routine {
    let mut builder = RoutineBuilder::new(
        program,
        MAIN_ROUTINE.to_string(),
        RoutineKind::TopLevel,
        None,
        false,
        Type::Void,
    );

    // Top-level variables are in scope for all of <main>, including
    // statements ahead of their declaration
    for item in &program.unit.items {
        let (AstNode::VarDecl { name, location, .. } | AstNode::ConstDecl { name, location, .. }) = item else {
            continue;
        };
        let declared = program
            .symbols
            .resolve(name)
            .filter(|s| s.location == *location && !s.ty.is_error());
        if let Some(symbol) = declared {
            builder.declare_local(name, symbol.ty.clone());
        }
    }

    for item in &program.unit.items {
        match item {
            AstNode::ClassDef { .. } | AstNode::FunctionDef { .. } => {}
            _ => builder.lower_statement(item),
        }
    }
    builder.finish(SourceLocation::default())
}

fn generate_constructor(
    program: &CheckedProgram,
    class: &str,
    fields: &[Field],
    location: SourceLocation,
) -> Routine {
    let mut builder = RoutineBuilder::new(
        program,
        qualified_name(Some(class), INIT_ROUTINE),
        RoutineKind::Constructor,
        Some(class),
        true,
        Type::Void,
    );

    for field in fields {
        let Some(init) = &field.init else {
            continue;
        };
        if builder.is_malformed(init) {
            continue;
        }
        let field_ty = program
            .symbols
            .member(class, &field.name)
            .map(|s| s.ty.clone())
            .unwrap_or(Type::Error);
        builder.load_this(field.location);
        builder.lower_expr(init);
        builder.emit(
            Instruction::new(Opcode::PutField, field_ty, field.location)
                .with_operand(Operand::Symbol(qualified_name(Some(class), &field.name))),
        );
    }

    builder.finish(location)
}

/// Lower a function or method; `None` for anything else and for duplicate
/// definitions, which never made it into the symbol table
fn generate_routine(program: &CheckedProgram, routine: &AstNode, class: Option<&str>) -> Option<Routine> {
    let AstNode::FunctionDef {
        name,
        params,
        body,
        is_static,
        location,
        ..
    } = routine
    else {
        return None;
    };

    let qualified = qualified_name(class, name);
    let symbol = program.symbols.resolve(&qualified)?;
    if symbol.location != *location {
        return None;
    }
    let signature = symbol.signature()?;

    let kind = if class.is_some() {
        RoutineKind::Method
    } else {
        RoutineKind::Function
    };
    let mut builder = RoutineBuilder::new(
        program,
        qualified,
        kind,
        class,
        class.is_some() && !is_static,
        signature.return_type.clone(),
    );

    for (param, ty) in params.iter().zip(&signature.params) {
        builder.declare_local(&param.name, ty.clone());
    }
    for stmt in body {
        builder.lower_statement(stmt);
    }

    Some(builder.finish(*location))
}

/// Jump targets of the innermost enclosing loop
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopLabels {
    pub(crate) continue_to: LabelId,
    pub(crate) break_to: LabelId,
}

/// Where a bare name is stored, from inside the current routine
pub(crate) enum Storage {
    Local(u16),
    /// Field of the current class, reached through `this`
    Field(String),
    Global,
}

pub(crate) struct RoutineBuilder<'a> {
    pub(crate) program: &'a CheckedProgram,
    name: String,
    pub(crate) kind: RoutineKind,
    pub(crate) class: Option<String>,
    pub(crate) is_instance: bool,
    pub(crate) return_type: Type,
    pub(crate) slots: SlotAllocator,
    code: Vec<Instruction>,
    next_label: LabelId,
    pub(crate) loops: Vec<LoopLabels>,
}

impl<'a> RoutineBuilder<'a> {
    pub(crate) fn new(
        program: &'a CheckedProgram,
        name: String,
        kind: RoutineKind,
        class: Option<&str>,
        is_instance: bool,
        return_type: Type,
    ) -> Self {
        let receiver = if is_instance { class } else { None };
        RoutineBuilder {
            program,
            name,
            kind,
            class: class.map(str::to_string),
            is_instance,
            return_type,
            slots: SlotAllocator::new(receiver),
            code: Vec::new(),
            next_label: 0,
            loops: Vec::new(),
        }
    }

    // ===== Emission =====

    pub(crate) fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    pub(crate) fn new_label(&mut self) -> LabelId {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    pub(crate) fn place_label(&mut self, label: LabelId, location: SourceLocation) {
        self.emit(Instruction::new(Opcode::Label, Type::Void, location).with_operand(Operand::Label(label)));
    }

    pub(crate) fn jump(&mut self, opcode: Opcode, label: LabelId, location: SourceLocation) {
        self.emit(Instruction::new(opcode, Type::Void, location).with_operand(Operand::Label(label)));
    }

    pub(crate) fn load_this(&mut self, location: SourceLocation) {
        let ty = self
            .class
            .as_ref()
            .map(|c| Type::Class(c.clone()))
            .unwrap_or(Type::Error);
        let mut load = Instruction::new(Opcode::Load, ty, location).with_operand(Operand::Symbol("this".to_string()));
        if let Some(slot) = self.slots.resolve("this") {
            load = load.with_slot(slot);
        }
        self.emit(load);
    }

    /// Give a parameter or local its slot. A routine out of slots keeps
    /// the variable unslotted.
    pub(crate) fn declare_local(&mut self, name: &str, ty: Type) -> Option<u16> {
        match self.slots.allocate(name, ty) {
            Ok(slot) => Some(slot),
            Err(err) => {
                warn!(routine = %self.name, %err, "local left without a slot");
                None
            }
        }
    }

    // ===== Names =====

    /// Resolve a bare name the way the analyzer did: locals, then fields
    /// of the current class, then globals
    pub(crate) fn storage_of(&self, name: &str) -> Storage {
        if let Some(slot) = self.slots.resolve(name) {
            return Storage::Local(slot);
        }
        if let Some(class) = &self.class {
            let is_field = self
                .program
                .symbols
                .member(class, name)
                .is_some_and(|s| matches!(s.kind, SymbolKind::Field));
            if is_field {
                return Storage::Field(class.clone());
            }
        }
        Storage::Global
    }

    /// True when `name`, as written here, refers to a class rather than a value
    pub(crate) fn names_class(&self, name: &str) -> bool {
        matches!(self.storage_of(name), Storage::Global)
            && self
                .program
                .symbols
                .resolve(name)
                .is_some_and(|s| matches!(s.kind, SymbolKind::Class))
    }

    /// Member of the current class, if `name` is one
    pub(crate) fn own_member(&self, name: &str) -> Option<&'a Symbol> {
        let class = self.class.as_deref()?;
        self.program.symbols.member(class, name)
    }

    // ===== Finishing =====

    pub(crate) fn finish(mut self, location: SourceLocation) -> Routine {
        if self.code.last().map(|i| i.opcode) != Some(Opcode::Return) {
            self.emit(Instruction::new(Opcode::Return, Type::Void, location));
        }

        let mut routine = Routine {
            name: self.name,
            kind: self.kind,
            is_instance: self.is_instance,
            code: self.code,
            locals: self.slots.into_table(),
            max_stack: 0,
        };

        let checked = routine.check_stack();
        debug_assert!(checked.is_ok(), "{:?}", checked);
        match checked {
            Ok(depth) => routine.max_stack = depth,
            Err(err) => warn!(%err, "generated code breaks stack discipline"),
        }

        debug!(
            routine = %routine.name,
            instructions = routine.code.len(),
            locals = routine.locals.len(),
            max_stack = routine.max_stack,
            "routine generated"
        );
        routine
    }
}
