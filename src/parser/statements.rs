//! Statement parsing implementation
//!
//! This module handles parsing of all Lumen statement types:
//!
//! - Variable and constant declarations: `int x = 42;`, `var y = x;`, `const int N = 3;`
//! - Control flow: `if`/`else`, `while`, `for` (conditions with or without parentheses)
//! - Jump statements: `return`, `break`, `continue`
//! - Blocks: `{ ... }`
//! - Assignments, including compound forms: `x = 1;`, `p.age += 1;`
//! - Expression statements: routine and method calls
//!
//! # Grammar
//!
//! ```text
//! statement  ::= var_decl | const_decl | if_stmt | while_stmt | for_stmt
//!              | return_stmt | "break" ";" | "continue" ";" | block
//!              | assignment ";" | expr ";"
//! if_stmt    ::= "if" expr body ("else" (if_stmt | body))?
//! while_stmt ::= "while" expr body
//! for_stmt   ::= "for" ( "(" for_header ")" | for_header ) body
//! for_header ::= (var_decl_head | simple)? ";" expr? ";" simple?
//! body       ::= block | statement
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{PResult, Parser};
use crate::parser::rules::{token, Rule};

type ForHeader = (Option<Box<AstNode>>, Option<Box<AstNode>>, Option<Box<AstNode>>);

impl Parser {
    /// Parse statements up to the closing `}` (not consumed). Each failed
    /// statement is reported and skipped.
    pub(crate) fn parse_block_statements(&mut self) -> Vec<AstNode> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let start = self.checkpoint();
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => self.recover(start, err),
            }
        }

        statements
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> PResult<AstNode> {
        let loc = self.current_location();

        match self.peek_kind() {
            TokenKind::LBrace => {
                let statements = self.parse_block("to open block")?;
                Ok(AstNode::Block {
                    statements,
                    location: loc,
                })
            }
            TokenKind::If => {
                self.advance();
                self.parse_if_statement(loc)
            }
            TokenKind::While => {
                self.advance();
                self.parse_while_statement(loc)
            }
            TokenKind::For => {
                self.advance();
                self.parse_for_statement(loc)
            }
            TokenKind::Return => {
                self.advance();
                self.parse_return_statement(loc)
            }
            TokenKind::Break => {
                self.advance();
                self.expect_semicolon("after 'break'")?;
                Ok(AstNode::Break { location: loc })
            }
            TokenKind::Continue => {
                self.advance();
                self.expect_semicolon("after 'continue'")?;
                Ok(AstNode::Continue { location: loc })
            }
            TokenKind::Const => self.parse_const_declaration(),
            TokenKind::Var => self.parse_var_declaration(),
            TokenKind::Class => Err(self.error_here("Class definitions are only allowed at top level")),
            _ if self.at_declaration() => self.parse_var_declaration(),
            _ => {
                let stmt = self.parse_simple_statement()?;
                self.expect_semicolon("after expression")?;
                Ok(stmt)
            }
        }
    }

    /// Assignment or expression statement, without the trailing `;`
    pub(crate) fn parse_simple_statement(&mut self) -> PResult<AstNode> {
        let loc = self.current_location();
        let target = self.parse_expression()?;

        let op = match self.peek_kind() {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::PercentEq => Some(BinOp::Mod),
            _ => {
                return Ok(AstNode::ExpressionStatement {
                    expr: Box::new(target),
                    location: loc,
                });
            }
        };

        if !matches!(target, AstNode::Variable { .. } | AstNode::MemberAccess { .. }) {
            return Err(self.error_here(format!(
                "Invalid assignment target before {}",
                self.peek()
            )));
        }
        self.advance();

        let value = self.parse_expression()?;
        Ok(AstNode::Assignment {
            target: Box::new(target),
            op,
            value: Box::new(value),
            location: loc,
        })
    }

    /// Loop and branch bodies: a block, or a single statement
    fn parse_body(&mut self) -> PResult<Vec<AstNode>> {
        if self.check(TokenKind::LBrace) {
            self.parse_block("to open block")
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    fn parse_if_statement(&mut self, loc: SourceLocation) -> PResult<AstNode> {
        let condition = self.parse_expression()?;
        let then_branch = self.parse_body()?;

        let else_branch = match token(TokenKind::Else, "").optional().parse(self)? {
            Some(_) => Some(self.parse_body()?),
            None => None,
        };

        Ok(AstNode::If {
            condition: Box::new(condition),
            then_branch,
            else_branch,
            location: loc,
        })
    }

    fn parse_while_statement(&mut self, loc: SourceLocation) -> PResult<AstNode> {
        let condition = self.parse_expression()?;
        let body = self.parse_body()?;

        Ok(AstNode::While {
            condition: Box::new(condition),
            body,
            location: loc,
        })
    }

    fn parse_for_statement(&mut self, loc: SourceLocation) -> PResult<AstNode> {
        let parenthesized = token(TokenKind::LParen, "to open loop header")
            .then(Rule::new("loop header", Parser::parse_for_header))
            .then(token(TokenKind::RParen, "to close loop header"))
            .map(|((_, header), _)| header);
        let bare = Rule::new("loop header", Parser::parse_for_header);

        let (init, condition, update) = parenthesized.or(bare).parse(self)?;
        let body = self.parse_body()?;

        Ok(AstNode::For {
            init,
            condition,
            update,
            body,
            location: loc,
        })
    }

    fn parse_for_header(&mut self) -> PResult<ForHeader> {
        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if self.check(TokenKind::Var) || self.at_declaration() {
            Some(Box::new(self.parse_var_declaration_head()?))
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect_semicolon("after loop initializer")?;

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_semicolon("after loop condition")?;

        let update = if self.check(TokenKind::RParen) || self.check(TokenKind::LBrace) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };

        Ok((init, condition, update))
    }

    fn parse_return_statement(&mut self, loc: SourceLocation) -> PResult<AstNode> {
        let expr = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_semicolon("after return value")?;

        Ok(AstNode::Return {
            expr,
            location: loc,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse_source;

    fn single_item(source: &str) -> AstNode {
        let output = parse_source(source);
        assert!(output.is_success(), "{:?}", output.messages());
        assert_eq!(output.unit.items.len(), 1);
        output.unit.items.into_iter().next().unwrap()
    }

    #[test]
    fn test_if_with_and_without_parens() {
        for source in ["if (x > 1) { y = 2; } else { y = 3; }", "if x > 1 { y = 2; } else y = 3;"] {
            match single_item(source) {
                AstNode::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    assert_eq!(then_branch.len(), 1);
                    assert_eq!(else_branch.map(|b| b.len()), Some(1));
                }
                other => panic!("Expected if, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_else_if_chain() {
        match single_item("if a { } else if b { } else { }") {
            AstNode::If {
                else_branch: Some(branch),
                ..
            } => assert!(matches!(branch[0], AstNode::If { else_branch: Some(_), .. })),
            other => panic!("Expected if/else if, got {:?}", other),
        }
    }

    #[test]
    fn test_for_header_forms() {
        for source in [
            "for (int i = 0; i < 10; i += 1) { }",
            "for int i = 0; i < 10; i += 1 { }",
            "for (;;) { break; }",
        ] {
            assert!(matches!(single_item(source), AstNode::For { .. }), "{}", source);
        }

        match single_item("for (var i = 0; i < 3; i = i + 1) { continue; }") {
            AstNode::For {
                init: Some(init),
                condition: Some(_),
                update: Some(update),
                body,
                ..
            } => {
                assert!(matches!(*init, AstNode::VarDecl { var_type: None, .. }));
                assert!(matches!(*update, AstNode::Assignment { op: None, .. }));
                assert!(matches!(body[0], AstNode::Continue { .. }));
            }
            other => panic!("Expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_compound_assignment() {
        match single_item("p.age -= 1;") {
            AstNode::Assignment { target, op, .. } => {
                assert_eq!(op, Some(BinOp::Sub));
                assert!(matches!(*target, AstNode::MemberAccess { .. }));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        let output = parse_source("f() = 3;");

        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.messages()[0].contains("Invalid assignment target"));
    }

    #[test]
    fn test_missing_semicolon_reported_on_its_line() {
        let output = parse_source("int x = 1\nint y = 2;");

        assert_eq!(output.messages(), vec!["Line 1: Expected ';' after variable declaration, found 'int'"]);
        assert_eq!(output.unit.items.len(), 1);
    }

    #[test]
    fn test_missing_semicolon_keeps_next_line() {
        let output = parse_source("int x = 1\ny = 2;\nprint(x);");

        assert_eq!(output.messages(), vec!["Line 1: Expected ';' after variable declaration, found identifier 'y'"]);
        assert_eq!(output.unit.items.len(), 2);
        assert!(matches!(&output.unit.items[0], AstNode::Assignment { .. }));
        assert!(matches!(&output.unit.items[1], AstNode::ExpressionStatement { .. }));

        let output = parse_source("void f() {\n  int a = 1\n  a = 2;\n}");
        assert_eq!(output.diagnostics.len(), 1);
        match &output.unit.items[0] {
            AstNode::FunctionDef { body, .. } => {
                assert!(matches!(body.as_slice(), [AstNode::Assignment { .. }]));
            }
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_semicolon_mid_line_skips_to_next() {
        let output = parse_source("int x = 1 y = 2; print(x);");

        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.unit.items.len(), 1);
        assert!(matches!(&output.unit.items[0], AstNode::ExpressionStatement { .. }));
    }

    #[test]
    fn test_class_inside_block_rejected() {
        let output = parse_source("void f() { class A { } int x = 1; }");

        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.messages()[0].contains("only allowed at top level"));
    }
}
