//! Generated routines and programs

use crate::ir::instruction::{Instruction, Opcode};
use crate::ir::slots::LocalSlot;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    /// Top-level statements
    TopLevel,
    Function,
    Method,
    /// Per-class field initialization
    Constructor,
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutineKind::TopLevel => write!(f, "toplevel"),
            RoutineKind::Function => write!(f, "function"),
            RoutineKind::Method => write!(f, "method"),
            RoutineKind::Constructor => write!(f, "constructor"),
        }
    }
}

/// Operand stack discipline violation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operand stack underflow at instruction {index} ({opcode:?}) in '{routine}'")]
pub struct StackUnderflow {
    pub routine: String,
    pub index: usize,
    pub opcode: Opcode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    pub name: String,
    pub kind: RoutineKind,
    pub is_instance: bool,
    pub code: Vec<Instruction>,
    pub locals: Vec<LocalSlot>,
    pub max_stack: usize,
}

impl Routine {
    /// Walk the code in order and check that no instruction pops more
    /// values than are on the stack. Returns the deepest the stack gets.
    pub fn check_stack(&self) -> Result<usize, StackUnderflow> {
        let mut depth = 0usize;
        let mut max = 0usize;

        for (index, instruction) in self.code.iter().enumerate() {
            let (pops, pushes) = instruction.stack_effect();
            depth = depth.checked_sub(pops).ok_or_else(|| StackUnderflow {
                routine: self.name.clone(),
                index,
                opcode: instruction.opcode,
            })?;
            depth += pushes;
            max = max.max(depth);
        }

        Ok(max)
    }

    pub fn slot_of(&self, name: &str) -> Option<u16> {
        self.locals.iter().find(|l| l.name == name).map(|l| l.slot)
    }

    pub fn opcodes(&self) -> Vec<Opcode> {
        self.code.iter().map(|i| i.opcode).collect()
    }
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {}{} (max stack {})",
            self.kind,
            self.name,
            if self.is_instance { " [instance]" } else { "" },
            self.max_stack
        )?;
        for local in &self.locals {
            writeln!(f, "  local @{} {}: {}", local.slot, local.name, local.ty)?;
        }
        for instruction in &self.code {
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}

/// All routines of one compilation unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrProgram {
    pub routines: Vec<Routine>,
}

impl IrProgram {
    pub fn routine(&self, name: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.name == name)
    }
}

impl fmt::Display for IrProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, routine) in self.routines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", routine)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instruction::Operand;
    use crate::parser::ast::SourceLocation;
    use crate::semantic::Type;

    fn routine(code: Vec<Instruction>) -> Routine {
        Routine {
            name: "test".to_string(),
            kind: RoutineKind::Function,
            is_instance: false,
            code,
            locals: Vec::new(),
            max_stack: 0,
        }
    }

    fn ins(opcode: Opcode, ty: Type) -> Instruction {
        Instruction::new(opcode, ty, SourceLocation::new(1, 1))
    }

    #[test]
    fn test_check_stack_depth() {
        let r = routine(vec![
            ins(Opcode::Push, Type::Int).with_operand(Operand::Int(2)),
            ins(Opcode::Push, Type::Int).with_operand(Operand::Int(3)),
            ins(Opcode::Add, Type::Int),
            ins(Opcode::Pop, Type::Int),
            ins(Opcode::Return, Type::Void),
        ]);
        assert_eq!(r.check_stack(), Ok(2));
    }

    #[test]
    fn test_check_stack_underflow() {
        let r = routine(vec![
            ins(Opcode::Push, Type::Int).with_operand(Operand::Int(2)),
            ins(Opcode::Add, Type::Int),
        ]);
        let err = r.check_stack().unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.opcode, Opcode::Add);
    }
}
