//! Semantic types and the pure rules over them
//!
//! # Rules
//!
//! - [`is_assignable`]: assignment compatibility (symmetric)
//! - [`binary_result`]: result type of a binary operator, per operator class
//! - [`unary_result`]: result type of `-` and `!`
//!
//! `Error` is the type of anything that already produced a diagnostic. It is
//! compatible with everything, so one mistake never cascades into more.

use crate::parser::ast::{BaseType, BinOp, OperatorClass, UnOp};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    Void,
    Class(String),
    Null,
    Error,
}

impl Type {
    /// Type named in source. Class names are taken as written; callers
    /// check that the class exists.
    pub fn from_base(base: &BaseType) -> Type {
        match base {
            BaseType::Int => Type::Int,
            BaseType::Float => Type::Float,
            BaseType::String => Type::String,
            BaseType::Bool => Type::Bool,
            BaseType::Void => Type::Void,
            BaseType::Class(name) => Type::Class(name.clone()),
        }
    }

    /// Value types that can never hold `null`
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Bool)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// Wide types take two consecutive local slots
    pub fn is_wide(&self) -> bool {
        matches!(self, Type::Float)
    }

    pub fn slot_width(&self) -> u16 {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String => write!(f, "string"),
            Type::Bool => write!(f, "bool"),
            Type::Void => write!(f, "void"),
            Type::Class(name) => write!(f, "{}", name),
            Type::Null => write!(f, "null"),
            Type::Error => write!(f, "<error>"),
        }
    }
}

/// Whether a value of one type may be stored where the other is expected
pub fn is_assignable(a: &Type, b: &Type) -> bool {
    if a.is_error() || b.is_error() || a == b {
        return true;
    }
    match (a, b) {
        (Type::Null, other) | (other, Type::Null) => !other.is_primitive(),
        (Type::Int, Type::Float) | (Type::Float, Type::Int) => true,
        _ => false,
    }
}

/// Result type of `left op right`, or `None` when the operator does not
/// accept those operand types
pub fn binary_result(op: BinOp, left: &Type, right: &Type) -> Option<Type> {
    match op.class() {
        OperatorClass::Arithmetic => {
            if *left == Type::String || *right == Type::String {
                return (op == BinOp::Add).then_some(Type::String);
            }
            match (left, right) {
                (Type::Int, Type::Int) => Some(Type::Int),
                (Type::Float, Type::Float) | (Type::Int, Type::Float) | (Type::Float, Type::Int) => {
                    Some(Type::Float)
                }
                _ => None,
            }
        }
        OperatorClass::Comparison => is_assignable(left, right).then_some(Type::Bool),
        OperatorClass::Logical => {
            (*left == Type::Bool && *right == Type::Bool).then_some(Type::Bool)
        }
    }
}

pub fn unary_result(op: UnOp, operand: &Type) -> Option<Type> {
    match op {
        UnOp::Neg => operand.is_numeric().then(|| operand.clone()),
        UnOp::Not => (*operand == Type::Bool).then_some(Type::Bool),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Type {
        Type::Class("Person".to_string())
    }

    #[test]
    fn test_assignability() {
        assert!(is_assignable(&Type::Int, &Type::Int));
        assert!(is_assignable(&Type::Int, &Type::Float));
        assert!(is_assignable(&Type::Float, &Type::Int));
        assert!(is_assignable(&person(), &Type::Null));
        assert!(is_assignable(&Type::Null, &Type::String));
        assert!(!is_assignable(&Type::Int, &Type::Null));
        assert!(!is_assignable(&Type::Null, &Type::Bool));
        assert!(!is_assignable(&Type::String, &Type::Int));
        assert!(!is_assignable(&person(), &Type::Class("Dog".to_string())));
    }

    #[test]
    fn test_arithmetic_results() {
        assert_eq!(binary_result(BinOp::Add, &Type::Int, &Type::Int), Some(Type::Int));
        assert_eq!(binary_result(BinOp::Mul, &Type::Int, &Type::Float), Some(Type::Float));
        assert_eq!(binary_result(BinOp::Pow, &Type::Float, &Type::Float), Some(Type::Float));
        assert_eq!(binary_result(BinOp::Add, &Type::String, &Type::Int), Some(Type::String));
        assert_eq!(binary_result(BinOp::Add, &Type::Bool, &Type::String), Some(Type::String));
        assert_eq!(binary_result(BinOp::Sub, &Type::String, &Type::Int), None);
        assert_eq!(binary_result(BinOp::Add, &Type::Bool, &Type::Int), None);
    }

    #[test]
    fn test_comparison_and_logical_results() {
        assert_eq!(binary_result(BinOp::Lt, &Type::Int, &Type::Float), Some(Type::Bool));
        assert_eq!(binary_result(BinOp::Eq, &person(), &Type::Null), Some(Type::Bool));
        assert_eq!(binary_result(BinOp::Eq, &Type::Int, &Type::String), None);
        assert_eq!(binary_result(BinOp::And, &Type::Bool, &Type::Bool), Some(Type::Bool));
        assert_eq!(binary_result(BinOp::Or, &Type::Bool, &Type::Int), None);
    }

    #[test]
    fn test_unary_results() {
        assert_eq!(unary_result(UnOp::Neg, &Type::Float), Some(Type::Float));
        assert_eq!(unary_result(UnOp::Neg, &Type::Bool), None);
        assert_eq!(unary_result(UnOp::Not, &Type::Bool), Some(Type::Bool));
        assert_eq!(unary_result(UnOp::Not, &Type::Int), None);
    }

    #[test]
    fn test_slot_width() {
        assert_eq!(Type::Float.slot_width(), 2);
        assert_eq!(Type::Int.slot_width(), 1);
        assert_eq!(person().slot_width(), 1);
    }
}
