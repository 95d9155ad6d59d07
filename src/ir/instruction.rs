//! Stack machine instructions

use crate::parser::ast::{BinOp, SourceLocation, UnOp};
use crate::semantic::Type;
use std::fmt;

pub type LabelId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Stack
    Push,
    Pop,
    Dup,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Neg,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    Not,
    And,
    Or,

    // Control flow
    Label,
    Jump,
    JumpIfFalse,
    Call,
    Return,

    // Objects
    GetField,
    PutField,
    New,
    InvokeConstructor,

    // Locals and globals
    Load,
    Store,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Dup => "DUP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Pow => "POW",
            Opcode::Neg => "NEG",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
            Opcode::Lt => "LT",
            Opcode::Le => "LE",
            Opcode::Gt => "GT",
            Opcode::Ge => "GE",
            Opcode::Not => "NOT",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Label => "LABEL",
            Opcode::Jump => "JUMP",
            Opcode::JumpIfFalse => "JUMP_IF_FALSE",
            Opcode::Call => "CALL",
            Opcode::Return => "RETURN",
            Opcode::GetField => "GETFIELD",
            Opcode::PutField => "PUTFIELD",
            Opcode::New => "NEW",
            Opcode::InvokeConstructor => "INVOKE_CONSTRUCTOR",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
        }
    }

    pub fn from_binop(op: BinOp) -> Opcode {
        match op {
            BinOp::Add => Opcode::Add,
            BinOp::Sub => Opcode::Sub,
            BinOp::Mul => Opcode::Mul,
            BinOp::Div => Opcode::Div,
            BinOp::Mod => Opcode::Mod,
            BinOp::Pow => Opcode::Pow,
            BinOp::Eq => Opcode::Eq,
            BinOp::Ne => Opcode::Ne,
            BinOp::Lt => Opcode::Lt,
            BinOp::Le => Opcode::Le,
            BinOp::Gt => Opcode::Gt,
            BinOp::Ge => Opcode::Ge,
            BinOp::And => Opcode::And,
            BinOp::Or => Opcode::Or,
        }
    }

    pub fn from_unop(op: UnOp) -> Opcode {
        match op {
            UnOp::Neg => Opcode::Neg,
            UnOp::Not => Opcode::Not,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    /// Variable, field (`Class.field`) or class name
    Symbol(String),
    Label(LabelId),
    /// `argc` counts every value the call pops, receiver included
    Call { target: String, argc: usize },
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(n) => write!(f, "{}", n),
            Operand::Float(x) => write!(f, "{:?}", x),
            Operand::Str(s) => write!(f, "{:?}", s),
            Operand::Bool(b) => write!(f, "{}", b),
            Operand::Null => write!(f, "null"),
            Operand::Symbol(name) => write!(f, "{}", name),
            Operand::Label(id) => write!(f, "L{}", id),
            Operand::Call { target, argc } => write!(f, "{}/{}", target, argc),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Option<Operand>,
    pub ty: Type,
    pub location: SourceLocation,
    /// Resolved local slot, for loads and stores of known locals
    pub slot: Option<u16>,
}

impl Instruction {
    pub fn new(opcode: Opcode, ty: Type, location: SourceLocation) -> Self {
        Instruction {
            opcode,
            operand: None,
            ty,
            location,
            slot: None,
        }
    }

    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operand = Some(operand);
        self
    }

    pub fn with_slot(mut self, slot: u16) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Values popped and pushed by this instruction
    pub fn stack_effect(&self) -> (usize, usize) {
        let produces = usize::from(self.ty != Type::Void);
        match self.opcode {
            Opcode::Push | Opcode::Load | Opcode::New => (0, 1),
            Opcode::Pop | Opcode::Store | Opcode::JumpIfFalse => (1, 0),
            Opcode::Dup => (1, 2),
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Pow
            | Opcode::Eq
            | Opcode::Ne
            | Opcode::Lt
            | Opcode::Le
            | Opcode::Gt
            | Opcode::Ge
            | Opcode::And
            | Opcode::Or => (2, 1),
            Opcode::Neg | Opcode::Not | Opcode::GetField => (1, 1),
            Opcode::PutField => (2, 0),
            Opcode::Label | Opcode::Jump => (0, 0),
            Opcode::Return => (produces, 0),
            Opcode::Call => (self.argc(), produces),
            Opcode::InvokeConstructor => (self.argc(), 0),
        }
    }

    fn argc(&self) -> usize {
        match &self.operand {
            Some(Operand::Call { argc, .. }) => *argc,
            _ => 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opcode == Opcode::Label {
            if let Some(operand) = &self.operand {
                return write!(f, "{}:", operand);
            }
        }
        write!(f, "    {}", self.opcode.mnemonic())?;
        if let Some(operand) = &self.operand {
            write!(f, " {}", operand)?;
        }
        if let Some(slot) = self.slot {
            write!(f, " @{}", slot)?;
        }
        if self.ty != Type::Void {
            write!(f, " : {}", self.ty)?;
        }
        Ok(())
    }
}
