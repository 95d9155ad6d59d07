//! Declaration parsing implementation
//!
//! This module handles parsing of declarations in Lumen programs:
//!
//! - Class definitions: `class Name { members }`
//! - Routine definitions: `type name(params) { ... }`, optionally `static` in a class
//! - Fields: `type name;`, `type name = expr;`, `const type name = expr;`
//! - Variables and constants: `type name = expr;`, `var name = expr;`, `const type name = expr;`
//! - Types: `int`, `float`/`double`, `string`, `bool`/`boolean`, `void`, class names
//!
//! # Grammar
//!
//! ```text
//! item        ::= class_def | routine_def | statement
//! class_def   ::= "class" identifier "{" member* "}"
//! member      ::= "static"? routine_def | "const"? type identifier ("=" expr)? ";"
//! routine_def ::= type identifier "(" params? ")" block
//! params      ::= type identifier ("," type identifier)*
//! var_decl    ::= (type | "var") identifier ("=" expr)? ";"
//! const_decl  ::= "const" type identifier "=" expr ";"
//! ```
//!
//! A declaration is told apart from an expression statement by two tokens of
//! lookahead: a type keyword, or two identifiers in a row (`Person p`).
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{PResult, ParseError, Parser};

impl Parser {
    /// Parse one top-level item
    pub(crate) fn parse_item(&mut self) -> PResult<AstNode> {
        if self.match_token(TokenKind::Class) {
            return self.parse_class_definition();
        }

        if self.check(TokenKind::Static) {
            let loc = self.current_location();
            self.advance();
            return self.parse_routine_definition(true, loc);
        }

        if self.at_routine_definition() {
            let loc = self.current_location();
            return self.parse_routine_definition(true, loc);
        }

        self.parse_statement()
    }

    /// `type name` lookahead: a type keyword, or `Ident Ident`
    pub(crate) fn at_declaration(&self) -> bool {
        let kind = self.peek_kind();
        kind.is_type_keyword()
            || (kind == TokenKind::Ident
                && self.peek_ahead(1).map(|t| t.kind) == Some(TokenKind::Ident))
    }

    fn at_routine_definition(&self) -> bool {
        self.at_declaration() && self.peek_ahead(2).map(|t| t.kind) == Some(TokenKind::LParen)
    }

    /// Parse class definition after the `class` keyword
    pub(crate) fn parse_class_definition(&mut self) -> PResult<AstNode> {
        let loc = self.previous_location();
        let name = self.expect_identifier("after 'class'")?;
        self.expect_token(TokenKind::LBrace, "after class name")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let start = self.checkpoint();
            match self.parse_member() {
                Ok(Member::Field(field)) => fields.push(field),
                Ok(Member::Method(method)) => methods.push(method),
                Err(err) => self.recover(start, err),
            }
        }

        if !self.match_token(TokenKind::RBrace) {
            let err = self.error_here(format!(
                "Expected '}}' to close class '{}', found {}",
                name,
                self.peek()
            ));
            self.report(err);
        }

        Ok(AstNode::ClassDef {
            name,
            fields,
            methods,
            location: loc,
        })
    }

    fn parse_member(&mut self) -> PResult<Member> {
        let loc = self.current_location();

        if self.match_token(TokenKind::Static) {
            return self.parse_routine_definition(true, loc).map(Member::Method);
        }

        let is_const = self.match_token(TokenKind::Const);
        let field_type = self.parse_type()?;
        let name = self.expect_identifier("in class member")?;

        if !is_const && self.check(TokenKind::LParen) {
            let (params, body) = self.parse_routine_rest()?;
            return Ok(Member::Method(AstNode::FunctionDef {
                name,
                params,
                return_type: field_type,
                body,
                is_static: false,
                location: loc,
            }));
        }

        let init = if is_const {
            self.expect_token(TokenKind::Eq, "in constant field")?;
            Some(self.parse_expression()?)
        } else if self.match_token(TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_semicolon("after field declaration")?;

        Ok(Member::Field(Field {
            name,
            field_type,
            init,
            is_const,
            location: loc,
        }))
    }

    /// Parse routine definition starting at its return type
    pub(crate) fn parse_routine_definition(
        &mut self,
        is_static: bool,
        loc: SourceLocation,
    ) -> PResult<AstNode> {
        let return_type = self.parse_type()?;
        let name = self.expect_identifier("for routine name")?;
        let (params, body) = self.parse_routine_rest()?;

        Ok(AstNode::FunctionDef {
            name,
            params,
            return_type,
            body,
            is_static,
            location: loc,
        })
    }

    /// Parameter list and body
    fn parse_routine_rest(&mut self) -> PResult<(Vec<Param>, Vec<AstNode>)> {
        self.expect_token(TokenKind::LParen, "after routine name")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let loc = self.current_location();
                let param_type = self.parse_type()?;
                let name = self.expect_identifier("for parameter name")?;
                params.push(Param {
                    name,
                    param_type,
                    location: loc,
                });

                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect_token(TokenKind::RParen, "after parameters")?;
        let body = self.parse_block("for routine body")?;

        Ok((params, body))
    }

    /// Parse `{ statements }`. A block left open at end of input is
    /// reported, and the statements read so far are kept.
    pub(crate) fn parse_block(&mut self, ctx: &str) -> PResult<Vec<AstNode>> {
        self.expect_token(TokenKind::LBrace, ctx)?;
        let statements = self.parse_block_statements();

        if !self.match_token(TokenKind::RBrace) {
            let err = self.error_here(format!("Expected '}}' to close block, found {}", self.peek()));
            self.report(err);
        }

        Ok(statements)
    }

    /// Parse a type name
    pub(crate) fn parse_type(&mut self) -> PResult<BaseType> {
        let base = match self.peek_kind() {
            TokenKind::Int => BaseType::Int,
            TokenKind::Float | TokenKind::Double => BaseType::Float,
            TokenKind::String => BaseType::String,
            TokenKind::Bool | TokenKind::Boolean => BaseType::Bool,
            TokenKind::Void => BaseType::Void,
            TokenKind::Ident => BaseType::Class(self.peek().text.clone()),
            _ => {
                return Err(self.error_here(format!("Expected type, found {}", self.peek())));
            }
        };
        self.advance();
        Ok(base)
    }

    /// Variable declaration without the trailing `;`
    pub(crate) fn parse_var_declaration_head(&mut self) -> PResult<AstNode> {
        let loc = self.current_location();

        if self.match_token(TokenKind::Var) {
            let name = self.expect_identifier("after 'var'")?;
            // `var` takes its type from the initializer, so one is required
            self.expect_token(TokenKind::Eq, "after inferred variable name")?;
            let init = self.parse_expression()?;
            return Ok(AstNode::VarDecl {
                name,
                var_type: None,
                init: Some(Box::new(init)),
                location: loc,
            });
        }

        let var_type = self.parse_type()?;
        let name = self.expect_identifier("in variable declaration")?;
        let init = if self.match_token(TokenKind::Eq) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Ok(AstNode::VarDecl {
            name,
            var_type: Some(var_type),
            init,
            location: loc,
        })
    }

    pub(crate) fn parse_var_declaration(&mut self) -> PResult<AstNode> {
        let decl = self.parse_var_declaration_head()?;
        self.expect_semicolon("after variable declaration")?;
        Ok(decl)
    }

    /// Parse constant declaration starting at `const`
    pub(crate) fn parse_const_declaration(&mut self) -> PResult<AstNode> {
        let loc = self.current_location();
        self.expect_token(TokenKind::Const, "")?;

        let const_type = self.parse_type()?;
        let name = self.expect_identifier("in constant declaration")?;
        if !self.check(TokenKind::Eq) {
            return Err(ParseError::new(
                format!("Constant '{}' must be initialized", name),
                self.previous_location(),
            ));
        }
        self.advance();
        let value = self.parse_expression()?;
        self.expect_semicolon("after constant declaration")?;

        Ok(AstNode::ConstDecl {
            name,
            const_type,
            value: Box::new(value),
            location: loc,
        })
    }
}

enum Member {
    Field(Field),
    Method(AstNode),
}
