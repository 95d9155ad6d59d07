//! # Introduction
//!
//! lumenc is the front end of a compiler for Lumen, a small statically typed
//! object-oriented scripting language. It parses source text, type checks
//! it, and lowers it to a typed stack-machine IR. It never stops at the
//! first problem: every stage collects diagnostics and hands its best
//! effort to the next.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Analyzer → CheckedProgram → IR generator → IrProgram
//! ```
//!
//! 1. [`parser`]: tokenises the source and builds an AST with a
//!    backtracking recursive-descent parser that resynchronizes after
//!    syntax errors.
//! 2. [`semantic`]: collects declarations, then checks every body against
//!    the symbol table. Failed expressions get the `Error` type, which
//!    silences follow-on reports.
//! 3. [`ir`]: lowers each routine to stack instructions with typed
//!    operands and allocated local slots.
//! 4. [`pipeline`]: runs the stages in strict or exploratory mode.
//! 5. [`diagnostics`]: the diagnostic values all stages share.
//!
//! ## Language
//!
//! Types: `int`, `float`, `string`, `bool`, `void`, classes.
//! Declarations: classes with fields and (optionally `static`) methods,
//! top-level functions, `const` and `var` declarations.
//! Control flow: `if/else`, `while`, `for`, `break`, `continue`, `return`.
//! Built-ins: `print`, `println`.

pub mod diagnostics;
pub mod ir;
pub mod parser;
pub mod pipeline;
pub mod semantic;
