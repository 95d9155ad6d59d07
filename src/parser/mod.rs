//! Lumen source code parser
//!
//! This module transforms Lumen source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parser state, cursor and entry points (tokens → AST)
//! - [`ast`]: AST node definitions
//!
//! # Supported Language
//!
//! - Types: `int`, `float` (`double`), `string`, `bool` (`boolean`), `void`, classes
//! - Declarations: classes with fields and (static) methods, routines, `var`, `const`
//! - Statements: assignments (plain and compound), `if`/`else`, `while`, `for`,
//!   `break`, `continue`, `return`, blocks
//! - Expressions: arithmetic including `**`, comparison, logical, calls,
//!   member access, `new`, `this`
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser built from small composable rules
//! with backtracking, plus panic-mode recovery so one run reports every
//! syntax error. No external parser generator dependencies.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod recovery;
mod rules;
mod statements;

pub use parse::{parse, parse_source, ParseError, ParseOutput, Parser};
pub use recovery::suggest;
