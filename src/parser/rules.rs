//! Composable grammar rules
//!
//! A [`Rule`] is a value wrapping one parsing function. Running a rule with
//! [`Rule::parse`] either yields the built AST fragment or a [`ParseError`];
//! on failure the cursor is restored, so a failed rule never consumes input.
//!
//! Rules combine through:
//! - [`Rule::then`]: sequence, both must succeed in order
//! - [`choice`] / [`Rule::or`]: first alternative that succeeds wins
//! - [`Rule::optional`]: zero or one, never fails
//! - [`Rule::many`]: zero or more, stops at the first failure
//! - [`left_assoc`] / [`right_assoc`]: binary operator levels
//!
//! Operator precedence comes only from which rule each level uses as its
//! operand; there is no precedence table.

use crate::parser::ast::{AstNode, BinOp};
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::{PResult, ParseError, Parser};
use std::rc::Rc;

type RuleFn<T> = dyn Fn(&mut Parser) -> PResult<T>;

/// A named, reusable grammar rule
pub(crate) struct Rule<T> {
    name: &'static str,
    run: Rc<RuleFn<T>>,
}

impl<T> Clone for Rule<T> {
    fn clone(&self) -> Self {
        Rule {
            name: self.name,
            run: Rc::clone(&self.run),
        }
    }
}

impl<T: 'static> Rule<T> {
    pub(crate) fn new(name: &'static str, run: impl Fn(&mut Parser) -> PResult<T> + 'static) -> Self {
        Rule {
            name,
            run: Rc::new(run),
        }
    }

    /// Run the rule, restoring the cursor if it fails
    pub(crate) fn parse(&self, parser: &mut Parser) -> PResult<T> {
        let checkpoint = parser.checkpoint();
        let result = (self.run)(parser);
        if result.is_err() {
            parser.restore(checkpoint);
        }
        result
    }

    /// Sequence: run `self`, then `next`
    pub(crate) fn then<U: 'static>(self, next: Rule<U>) -> Rule<(T, U)> {
        Rule::new(self.name, move |parser| {
            let first = self.parse(parser)?;
            let second = next.parse(parser)?;
            Ok((first, second))
        })
    }

    /// Two-way choice
    pub(crate) fn or(self, other: Rule<T>) -> Rule<T> {
        let name = self.name;
        choice(name, vec![self, other])
    }

    pub(crate) fn optional(self) -> Rule<Option<T>> {
        Rule::new(self.name, move |parser| Ok(self.parse(parser).ok()))
    }

    /// Zero or more repetitions. An iteration that succeeds without
    /// consuming input ends the repetition.
    pub(crate) fn many(self) -> Rule<Vec<T>> {
        Rule::new(self.name, move |parser| {
            let mut items = Vec::new();
            loop {
                let before = parser.checkpoint();
                match self.parse(parser) {
                    Ok(item) => {
                        items.push(item);
                        if parser.checkpoint() == before {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            Ok(items)
        })
    }

    pub(crate) fn map<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Rule<U> {
        Rule::new(self.name, move |parser| self.parse(parser).map(&f))
    }
}

/// Ordered choice. When every alternative fails, the error of the one that
/// got furthest into the input is reported.
pub(crate) fn choice<T: 'static>(name: &'static str, alternatives: Vec<Rule<T>>) -> Rule<T> {
    Rule::new(name, move |parser| {
        let mut furthest: Option<ParseError> = None;

        for alternative in &alternatives {
            match alternative.parse(parser) {
                Ok(value) => return Ok(value),
                Err(err) => match &furthest {
                    Some(f) if f.location >= err.location => {}
                    _ => furthest = Some(err),
                },
            }
        }

        Err(furthest.unwrap_or_else(|| {
            parser.error_here(format!("Expected {}, found {}", name, parser.peek()))
        }))
    })
}

/// Match a single token of the given kind
pub(crate) fn token(kind: TokenKind, ctx: &'static str) -> Rule<Token> {
    Rule::new("token", move |parser| parser.expect_token(kind, ctx))
}

/// Operand parser for binary operator levels
pub(crate) type Operand = fn(&mut Parser) -> PResult<AstNode>;

/// Left-associative operator level: `operand (op operand)*`, folded left to right
pub(crate) fn left_assoc(
    name: &'static str,
    operand: Operand,
    operators: &'static [(TokenKind, BinOp)],
) -> Rule<AstNode> {
    Rule::new(name, move |parser| {
        let mut left = operand(parser)?;

        while let Some((op, location)) = parser.match_operator(operators) {
            let right = operand(parser)?;
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
                id: parser.next_id(),
                location,
            };
        }

        Ok(left)
    })
}

/// Right-associative operator level: `operand (op <this level>)?`
pub(crate) fn right_assoc(
    name: &'static str,
    operand: Operand,
    operators: &'static [(TokenKind, BinOp)],
) -> Rule<AstNode> {
    Rule::new(name, move |parser| {
        let left = operand(parser)?;

        if let Some((op, location)) = parser.match_operator(operators) {
            let right = right_assoc(name, operand, operators).parse(parser)?;
            return Ok(AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
                id: parser.next_id(),
                location,
            });
        }

        Ok(left)
    })
}

impl Parser {
    /// Consume the next token if it is one of `operators`
    pub(crate) fn match_operator(
        &mut self,
        operators: &[(TokenKind, BinOp)],
    ) -> Option<(BinOp, crate::parser::ast::SourceLocation)> {
        let kind = self.peek_kind();
        let (_, op) = operators.iter().find(|(k, _)| *k == kind)?;
        let location = self.current_location();
        self.advance();
        Some((*op, location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Lexer;

    fn parser_for(source: &str) -> Parser {
        let (tokens, _) = Lexer::new(source).tokenize();
        Parser::new(tokens)
    }

    fn ident() -> Rule<String> {
        Rule::new("identifier", |p: &mut Parser| p.expect_identifier("here"))
    }

    #[test]
    fn test_failed_rule_consumes_nothing() {
        let mut parser = parser_for("a b ;");
        let rule = ident().then(ident()).then(ident());

        assert!(rule.parse(&mut parser).is_err());
        assert_eq!(parser.position, 0);
    }

    #[test]
    fn test_choice_backtracks_and_reports_furthest() {
        let mut parser = parser_for("a b ;");
        let two_then_comma = ident().then(ident()).then(token(TokenKind::Comma, "here")).map(|_| 2);
        let one_then_paren = ident().then(token(TokenKind::LParen, "here")).map(|_| 1);
        let rule = choice("test", vec![two_then_comma, one_then_paren]);

        let err = rule.parse(&mut parser).unwrap_err();
        // the first alternative reached the ';' at column 5
        assert_eq!(err.location.column, 5);
        assert_eq!(parser.position, 0);

        let mut parser = parser_for("a (");
        let two = ident().then(ident()).map(|_| 2);
        let one = ident().then(token(TokenKind::LParen, "here")).map(|_| 1);
        assert_eq!(two.or(one).parse(&mut parser).unwrap(), 1);
    }

    #[test]
    fn test_optional_and_many() {
        let mut parser = parser_for("a b c ;");
        let names = ident().many().parse(&mut parser).unwrap();
        assert_eq!(names, vec!["a", "b", "c"]);

        let missing = ident().optional().parse(&mut parser).unwrap();
        assert_eq!(missing, None);
        assert!(parser.check(TokenKind::Semicolon));
    }
}
