//! Expression parsing implementation
//!
//! Each precedence level is a [`Rule`] whose operand is the next tighter
//! level, so precedence and associativity fall out of the rule structure.
//!
//! # Operator Precedence (lowest to highest)
//!
//! 1. Logical OR: `||`
//! 2. Logical AND: `&&`
//! 3. Equality: `==`, `!=`
//! 4. Relational: `<`, `<=`, `>`, `>=`
//! 5. Additive: `+`, `-`
//! 6. Multiplicative: `*`, `/`, `%`
//! 7. Unary: `-`, `!`
//! 8. Power: `**` (right-associative)
//! 9. Postfix: calls `f()`, member access `.name`, method calls `.name()`
//! 10. Primary: literals, identifiers, `this`, `new T(...)`, parenthesized expressions
//!
//! Levels 1 through 6 are left-associative.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{PResult, ParseError, Parser};
use crate::parser::rules::{choice, left_assoc, right_assoc, token, Rule};

const OR_OPS: &[(TokenKind, BinOp)] = &[(TokenKind::OrOr, BinOp::Or)];
const AND_OPS: &[(TokenKind, BinOp)] = &[(TokenKind::AndAnd, BinOp::And)];
const EQUALITY_OPS: &[(TokenKind, BinOp)] =
    &[(TokenKind::EqEq, BinOp::Eq), (TokenKind::NotEq, BinOp::Ne)];
const RELATIONAL_OPS: &[(TokenKind, BinOp)] = &[
    (TokenKind::Lt, BinOp::Lt),
    (TokenKind::Le, BinOp::Le),
    (TokenKind::Gt, BinOp::Gt),
    (TokenKind::Ge, BinOp::Ge),
];
const ADDITIVE_OPS: &[(TokenKind, BinOp)] =
    &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)];
const MULTIPLICATIVE_OPS: &[(TokenKind, BinOp)] = &[
    (TokenKind::Star, BinOp::Mul),
    (TokenKind::Slash, BinOp::Div),
    (TokenKind::Percent, BinOp::Mod),
];
const POWER_OPS: &[(TokenKind, BinOp)] = &[(TokenKind::StarStar, BinOp::Pow)];

impl Parser {
    /// Parse an expression (entry point)
    pub(crate) fn parse_expression(&mut self) -> PResult<AstNode> {
        left_assoc("expression", Parser::parse_logical_and, OR_OPS).parse(self)
    }

    fn parse_logical_and(&mut self) -> PResult<AstNode> {
        left_assoc("logical and", Parser::parse_equality, AND_OPS).parse(self)
    }

    fn parse_equality(&mut self) -> PResult<AstNode> {
        left_assoc("equality", Parser::parse_relational, EQUALITY_OPS).parse(self)
    }

    fn parse_relational(&mut self) -> PResult<AstNode> {
        left_assoc("comparison", Parser::parse_additive, RELATIONAL_OPS).parse(self)
    }

    fn parse_additive(&mut self) -> PResult<AstNode> {
        left_assoc("additive", Parser::parse_multiplicative, ADDITIVE_OPS).parse(self)
    }

    fn parse_multiplicative(&mut self) -> PResult<AstNode> {
        left_assoc("multiplicative", Parser::parse_unary, MULTIPLICATIVE_OPS).parse(self)
    }

    fn parse_unary(&mut self) -> PResult<AstNode> {
        let loc = self.current_location();
        let op = match self.peek_kind() {
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Bang => UnOp::Not,
            _ => return self.parse_power(),
        };
        self.advance();

        let operand = self.parse_unary()?;
        Ok(AstNode::UnaryOp {
            op,
            operand: Box::new(operand),
            id: self.next_id(),
            location: loc,
        })
    }

    fn parse_power(&mut self) -> PResult<AstNode> {
        right_assoc("power", Parser::parse_postfix, POWER_OPS).parse(self)
    }

    /// Parse postfix chains: `f(args)`, `obj.member`, `obj.method(args)`
    fn parse_postfix(&mut self) -> PResult<AstNode> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(TokenKind::LParen) {
                let AstNode::Variable { name, location, .. } = expr else {
                    return Err(self.error_here("Only named routines and methods can be called"));
                };
                let args = self.parse_arguments()?;
                expr = AstNode::FunctionCall {
                    name,
                    args,
                    id: self.next_id(),
                    location,
                };
            } else if self.match_token(TokenKind::Dot) {
                let loc = self.previous_location();
                let member = self.expect_identifier("after '.'")?;

                expr = if self.check(TokenKind::LParen) {
                    let args = self.parse_arguments()?;
                    AstNode::MethodCall {
                        object: Box::new(expr),
                        method: member,
                        args,
                        id: self.next_id(),
                        location: loc,
                    }
                } else {
                    AstNode::MemberAccess {
                        object: Box::new(expr),
                        member,
                        id: self.next_id(),
                        location: loc,
                    }
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse `(arg, arg, ...)`
    fn parse_arguments(&mut self) -> PResult<Vec<AstNode>> {
        self.expect_token(TokenKind::LParen, "to open argument list")?;
        if self.match_token(TokenKind::RParen) {
            return Ok(Vec::new());
        }

        let mut args = vec![self.parse_expression()?];
        let rest = token(TokenKind::Comma, "between arguments")
            .then(expression())
            .map(|(_, arg)| arg)
            .many()
            .parse(self)?;
        args.extend(rest);

        self.expect_token(TokenKind::RParen, "after arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<AstNode> {
        let parenthesized = token(TokenKind::LParen, "to open expression")
            .then(expression())
            .then(token(TokenKind::RParen, "to close parenthesized expression"))
            .map(|((_, expr), _)| expr);

        let primary = choice(
            "expression",
            vec![
                Rule::new("literal", Parser::parse_literal),
                Rule::new("this", Parser::parse_this),
                Rule::new("object creation", Parser::parse_new),
                Rule::new("identifier", Parser::parse_identifier),
                parenthesized,
            ],
        );

        primary.parse(self)
    }

    fn parse_literal(&mut self) -> PResult<AstNode> {
        let tok = self.peek().clone();
        let value = match tok.kind {
            TokenKind::IntLiteral => Literal::Int(tok.text.parse().map_err(|_| {
                ParseError::new(
                    format!("Integer literal {} is out of range", tok.text),
                    tok.location,
                )
            })?),
            TokenKind::FloatLiteral => {
                let digits = tok.text.trim_end_matches(|c: char| c == 'f' || c == 'F');
                Literal::Float(digits.parse().map_err(|_| {
                    ParseError::new(format!("Malformed float literal {}", tok.text), tok.location)
                })?)
            }
            TokenKind::StringLiteral => Literal::Str(tok.text.clone()),
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Null => Literal::Null,
            _ => return Err(self.expected_expression()),
        };
        self.advance();

        Ok(AstNode::Literal {
            value,
            id: self.next_id(),
            location: tok.location,
        })
    }

    fn parse_this(&mut self) -> PResult<AstNode> {
        if !self.check(TokenKind::This) {
            return Err(self.expected_expression());
        }
        let loc = self.advance().location;
        Ok(AstNode::This {
            id: self.next_id(),
            location: loc,
        })
    }

    /// `new Type(args)`
    fn parse_new(&mut self) -> PResult<AstNode> {
        if !self.check(TokenKind::New) {
            return Err(self.expected_expression());
        }
        let loc = self.advance().location;
        let class_type = self.parse_type()?;
        let args = self.parse_arguments()?;

        Ok(AstNode::New {
            class_type,
            args,
            id: self.next_id(),
            location: loc,
        })
    }

    fn parse_identifier(&mut self) -> PResult<AstNode> {
        if !self.check(TokenKind::Ident) {
            return Err(self.expected_expression());
        }
        let tok = self.advance().clone();
        Ok(AstNode::Variable {
            name: tok.text,
            id: self.next_id(),
            location: tok.location,
        })
    }

    fn expected_expression(&self) -> ParseError {
        self.error_here(format!("Expected expression, found {}", self.peek()))
    }
}

fn expression() -> Rule<AstNode> {
    Rule::new("expression", Parser::parse_expression)
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse_source;

    fn expr(source: &str) -> AstNode {
        let output = parse_source(&format!("{};", source));
        assert!(output.is_success(), "{:?}", output.messages());
        match output.unit.items.into_iter().next() {
            Some(AstNode::ExpressionStatement { expr, .. }) => *expr,
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    /// Render an expression fully parenthesized
    fn shape(node: &AstNode) -> String {
        match node {
            AstNode::BinaryOp { op, left, right, .. } => {
                format!("({} {} {})", shape(left), op.symbol(), shape(right))
            }
            AstNode::UnaryOp { op, operand, .. } => format!("({}{})", op.symbol(), shape(operand)),
            AstNode::Variable { name, .. } => name.clone(),
            AstNode::Literal {
                value: Literal::Int(n),
                ..
            } => n.to_string(),
            AstNode::MemberAccess { object, member, .. } => format!("{}.{}", shape(object), member),
            AstNode::MethodCall { object, method, args, .. } => {
                format!("{}.{}/{}", shape(object), method, args.len())
            }
            AstNode::FunctionCall { name, args, .. } => format!("{}/{}", name, args.len()),
            AstNode::This { .. } => "this".to_string(),
            other => format!("{:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(shape(&expr("1 + 2 * 3")), "(1 + (2 * 3))");
        assert_eq!(shape(&expr("a || b && c == d")), "(a || (b && (c == d)))");
        assert_eq!(shape(&expr("a < b + 1")), "(a < (b + 1))");
        assert_eq!(shape(&expr("-a * b")), "((-a) * b)");
    }

    #[test]
    fn test_associativity() {
        assert_eq!(shape(&expr("a - b - c")), "((a - b) - c)");
        assert_eq!(shape(&expr("a ** b ** c")), "(a ** (b ** c))");
        assert_eq!(shape(&expr("-a ** b")), "(-(a ** b))");
    }

    #[test]
    fn test_postfix_chains() {
        assert_eq!(shape(&expr("this.owner.name")), "this.owner.name");
        assert_eq!(shape(&expr("p.greet(1, 2)")), "p.greet/2");
        assert_eq!(shape(&expr("f(a, b, c)")), "f/3");
        assert_eq!(shape(&expr("(a + b) * c")), "((a + b) * c)");
    }

    #[test]
    fn test_new_expression() {
        match expr("new Person(\"Ana\", 30)") {
            AstNode::New { class_type, args, .. } => {
                assert_eq!(class_type, BaseType::Class("Person".to_string()));
                assert_eq!(args.len(), 2);
            }
            other => panic!("Expected new, got {:?}", other),
        }
        assert!(matches!(expr("new int()"), AstNode::New { class_type: BaseType::Int, .. }));
    }

    #[test]
    fn test_literals() {
        assert!(matches!(
            expr("2.5f"),
            AstNode::Literal { value: Literal::Float(v), .. } if v == 2.5
        ));
        assert!(matches!(expr("null"), AstNode::Literal { value: Literal::Null, .. }));
        assert!(matches!(
            expr("\"hi\""),
            AstNode::Literal { value: Literal::Str(ref s), .. } if s == "hi"
        ));
    }

    #[test]
    fn test_missing_operand() {
        let output = parse_source("x = 1 + ;");
        assert_eq!(output.messages(), vec!["Line 1: Expected expression, found ';'"]);
    }

    #[test]
    fn test_unclosed_paren_reports_furthest_point() {
        let output = parse_source("x = (1 + 2;");
        assert_eq!(
            output.messages(),
            vec!["Line 1: Expected ')' to close parenthesized expression, found ';'"]
        );
    }

    #[test]
    fn test_integer_out_of_range() {
        let output = parse_source("x = 99999999999999999999;");
        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.messages()[0].contains("out of range"));
    }
}
