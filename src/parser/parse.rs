//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, the cursor with its checkpoints, helper methods, and
//! the main parse entry points.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `rules`: composable grammar rule values (choice, optional, repetition, ...)
//! - `declarations`: classes, routines, fields, variable and constant declarations
//! - `statements`: control flow, assignments, expression statements
//! - `expressions`: expression precedence levels down to primaries
//! - `recovery`: panic-mode synchronization and "did you mean" suggestions
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.
//!
//! Malformed input never aborts the parse: failures are ordinary
//! [`ParseError`] values, and the item/statement loops turn them into
//! diagnostics and resynchronize.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use crate::parser::recovery::suggest;
use thiserror::Error;
use tracing::debug;

/// Parser error type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Parse error at {location}: {}", with_hint(.message, .suggestion))]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
    pub suggestion: Option<&'static str>,
    /// Where parsing can pick up again when the failure itself shows it,
    /// such as a forgotten `;` at the end of a line
    pub(crate) resume: Option<Checkpoint>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError {
            message: message.into(),
            location,
            suggestion: None,
            resume: None,
        }
    }

    /// Message text with the corrective suggestion appended, if any
    pub fn full_message(&self) -> String {
        with_hint(&self.message, &self.suggestion)
    }
}

fn with_hint(message: &str, suggestion: &Option<&'static str>) -> String {
    match suggestion {
        Some(s) => format!("{} (did you mean '{}'?)", message, s),
        None => message.to_string(),
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.to_string(),
            location: err.location(),
            suggestion: err.lexeme().and_then(|text| suggest(&text)),
            resume: None,
        }
    }
}

pub(crate) type PResult<T> = Result<T, ParseError>;

/// Opaque cursor position saved before a speculative parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub(crate) position: usize,
}

/// Result of parsing one compilation unit
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    pub unit: CompilationUnit,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Diagnostics rendered as `Line <n>: <message>`
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

/// Parse a token stream into a compilation unit
pub fn parse(tokens: Vec<Token>) -> ParseOutput {
    Parser::new(tokens).parse()
}

/// Lex and parse source text; lexer problems come first in the diagnostics
pub fn parse_source(source: &str) -> ParseOutput {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    let mut output = parse(tokens);

    if !lex_errors.is_empty() {
        let mut diagnostics: Vec<Diagnostic> = lex_errors
            .into_iter()
            .map(|err| {
                let err = ParseError::from(err);
                Diagnostic::error(DiagnosticKind::SyntaxError, err.full_message(), err.location)
            })
            .collect();
        diagnostics.append(&mut output.diagnostics);
        output.diagnostics = diagnostics;
    }

    output
}

/// Recursive descent parser for Lumen
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    next_id: NodeId,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let location = tokens.last().map(|t| t.location).unwrap_or(SourceLocation::new(1, 1));
            tokens.push(Token::new(TokenKind::Eof, "", location));
        }

        Self {
            tokens,
            position: 0,
            next_id: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Parse the entire compilation unit
    pub fn parse(mut self) -> ParseOutput {
        let mut unit = CompilationUnit::new();

        while !self.is_at_end() {
            let start = self.checkpoint();
            match self.parse_item() {
                Ok(item) => unit.items.push(item),
                Err(err) => self.recover(start, err),
            }
        }

        debug!(
            items = unit.items.len(),
            diagnostics = self.diagnostics.len(),
            "parsed compilation unit"
        );

        ParseOutput {
            unit,
            diagnostics: self.diagnostics,
        }
    }

    // ===== Cursor =====

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            position: self.position,
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.position = checkpoint.position;
    }

    // ===== Helper methods =====

    pub(crate) fn next_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Record a diagnostic without unwinding
    pub(crate) fn report(&mut self, err: ParseError) {
        self.diagnostics.push(Diagnostic::error(
            DiagnosticKind::SyntaxError,
            err.full_message(),
            err.location,
        ));
    }

    pub(crate) fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current_location())
    }

    pub(crate) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn previous_location(&self) -> SourceLocation {
        self.previous().location
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    pub(crate) fn expect_token(&mut self, kind: TokenKind, ctx: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            Err(self.error_here(format!("Expected {} {}, found {}", kind, ctx, self.peek())))
        }
    }

    /// A missing `;` belongs to the line of the construct it terminates, so
    /// the error points at the last consumed token.
    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> PResult<()> {
        if self.match_token(TokenKind::Semicolon) {
            return Ok(());
        }
        let location = if self.position > 0 {
            self.previous_location()
        } else {
            self.current_location()
        };
        let mut err = ParseError::new(format!("Expected ';' {}, found {}", ctx, self.peek()), location);
        // The next line most likely starts the following statement
        if self.position > 0 && self.current_location().line > self.previous_location().line {
            err.resume = Some(self.checkpoint());
        }
        Err(err)
    }

    pub(crate) fn expect_identifier(&mut self, ctx: &str) -> PResult<String> {
        if self.check(TokenKind::Ident) {
            Ok(self.advance().text.clone())
        } else {
            Err(self.error_here(format!("Expected identifier {}, found {}", ctx, self.peek())))
        }
    }
}
