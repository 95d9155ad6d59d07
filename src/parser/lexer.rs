//! Lexer (tokenizer) for Lumen source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! The stream always ends with a single [`TokenKind::Eof`] marker.
//!
//! Malformed input never stops the lexer: bad characters are skipped and an
//! unterminated string still yields a token, with each problem recorded as a
//! [`LexError`] that the parser front door turns into a syntax diagnostic.

use super::ast::SourceLocation;
use std::fmt;
use thiserror::Error;

/// Fine-grained token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    IntLiteral,
    FloatLiteral,
    StringLiteral,

    // Identifiers
    Ident,

    // Keywords
    Class,
    New,
    Static,
    Const,
    Var,
    If,
    Else,
    While,
    For,
    Return,
    Break,
    Continue,
    True,
    False,
    Null,
    This,

    // Type keywords
    Int,
    Float,
    Double,
    String,
    Bool,
    Boolean,
    Void,

    // Arithmetic
    Plus,     // +
    Minus,    // -
    Star,     // *
    StarStar, // **
    Slash,    // /
    Percent,  // %

    // Comparison
    EqEq,  // ==
    NotEq, // !=
    Lt,    // <
    Le,    // <=
    Gt,    // >
    Ge,    // >=

    // Logical
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Assignment
    Eq,        // =
    PlusEq,    // +=
    MinusEq,   // -=
    StarEq,    // *=
    SlashEq,   // /=
    PercentEq, // %=

    // Member access
    Dot, // .

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    Semicolon, // ;
    Comma,     // ,

    // End of file
    Eof,
}

/// Coarse token categories of the token contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCategory {
    Identifier,
    Literal,
    Keyword,
    Operator,
    Delimiter,
    EndMarker,
}

/// Reserved words and the token kind each one lexes to.
pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("class", TokenKind::Class),
    ("new", TokenKind::New),
    ("static", TokenKind::Static),
    ("const", TokenKind::Const),
    ("var", TokenKind::Var),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("while", TokenKind::While),
    ("for", TokenKind::For),
    ("return", TokenKind::Return),
    ("break", TokenKind::Break),
    ("continue", TokenKind::Continue),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("null", TokenKind::Null),
    ("this", TokenKind::This),
    ("int", TokenKind::Int),
    ("float", TokenKind::Float),
    ("double", TokenKind::Double),
    ("string", TokenKind::String),
    ("bool", TokenKind::Bool),
    ("boolean", TokenKind::Boolean),
    ("void", TokenKind::Void),
];

impl TokenKind {
    /// Look up the keyword kind for a word, if it is reserved.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        KEYWORDS
            .iter()
            .find(|(text, _)| *text == word)
            .map(|(_, kind)| *kind)
    }

    pub fn category(self) -> TokenCategory {
        use TokenKind::*;
        match self {
            IntLiteral | FloatLiteral | StringLiteral => TokenCategory::Literal,
            Ident => TokenCategory::Identifier,
            Class | New | Static | Const | Var | If | Else | While | For | Return | Break
            | Continue | True | False | Null | This | Int | Float | Double | String | Bool
            | Boolean | Void => TokenCategory::Keyword,
            Plus | Minus | Star | StarStar | Slash | Percent | EqEq | NotEq | Lt | Le | Gt
            | Ge | AndAnd | OrOr | Bang | Eq | PlusEq | MinusEq | StarEq | SlashEq
            | PercentEq | Dot => TokenCategory::Operator,
            LParen | RParen | LBrace | RBrace | Semicolon | Comma => TokenCategory::Delimiter,
            Eof => TokenCategory::EndMarker,
        }
    }

    /// Type keywords that can start a declaration
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Int
                | TokenKind::Float
                | TokenKind::Double
                | TokenKind::String
                | TokenKind::Bool
                | TokenKind::Boolean
                | TokenKind::Void
        )
    }

    /// Keywords that begin a declaration or statement; the parser
    /// resynchronizes on these after a syntax error.
    pub fn starts_statement(self) -> bool {
        self.is_type_keyword()
            || matches!(
                self,
                TokenKind::Class
                    | TokenKind::Static
                    | TokenKind::Const
                    | TokenKind::Var
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::For
                    | TokenKind::Return
                    | TokenKind::Break
                    | TokenKind::Continue
            )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((word, _)) = KEYWORDS.iter().find(|(_, kind)| kind == self) {
            return write!(f, "'{}'", word);
        }
        match self {
            TokenKind::IntLiteral => write!(f, "integer literal"),
            TokenKind::FloatLiteral => write!(f, "float literal"),
            TokenKind::StringLiteral => write!(f, "string literal"),
            TokenKind::Ident => write!(f, "identifier"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::StarStar => write!(f, "'**'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::AndAnd => write!(f, "'&&'"),
            TokenKind::OrOr => write!(f, "'||'"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::PlusEq => write!(f, "'+='"),
            TokenKind::MinusEq => write!(f, "'-='"),
            TokenKind::StarEq => write!(f, "'*='"),
            TokenKind::SlashEq => write!(f, "'/='"),
            TokenKind::PercentEq => write!(f, "'%='"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Eof => write!(f, "end of input"),
            // Keywords are handled by the table lookup above
            _ => write!(f, "{:?}", self),
        }
    }
}

/// A lexed token. `text` holds the lexeme; for string literals it holds the
/// unescaped contents without quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            text: text.into(),
            location,
        }
    }

    pub fn category(&self) -> TokenCategory {
        self.kind.category()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Ident => write!(f, "identifier '{}'", self.text),
            TokenKind::IntLiteral => write!(f, "integer literal {}", self.text),
            TokenKind::FloatLiteral => write!(f, "float literal {}", self.text),
            TokenKind::StringLiteral => write!(f, "string literal \"{}\"", self.text),
            kind => write!(f, "{}", kind),
        }
    }
}

/// Lexer error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("Unexpected character '{character}'")]
    UnexpectedCharacter {
        character: char,
        location: SourceLocation,
    },
    #[error("Unterminated string literal")]
    UnterminatedString { location: SourceLocation },
    #[error("Unterminated block comment")]
    UnterminatedComment { location: SourceLocation },
    #[error("Unknown escape sequence '\\{escape}'")]
    UnknownEscape {
        escape: char,
        location: SourceLocation,
    },
}

impl LexError {
    pub fn location(&self) -> SourceLocation {
        match self {
            LexError::UnexpectedCharacter { location, .. }
            | LexError::UnterminatedString { location }
            | LexError::UnterminatedComment { location }
            | LexError::UnknownEscape { location, .. } => *location,
        }
    }

    /// The offending source text, used for corrective suggestions
    pub fn lexeme(&self) -> Option<String> {
        match self {
            LexError::UnexpectedCharacter { character, .. } => Some(character.to_string()),
            _ => None,
        }
    }
}

/// Lexer for Lumen source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    errors: Vec<LexError>,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire input, returning the tokens and every problem found
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, "", self.current_location()));
                break;
            }

            if let Some(token) = self.next_token() {
                tokens.push(token);
            }
        }

        (tokens, self.errors)
    }

    /// Get next token; `None` when the character was rejected
    fn next_token(&mut self) -> Option<Token> {
        let loc = self.current_location();
        let ch = self.advance()?;

        let kind = match ch {
            '"' => return Some(self.string_literal(loc)),
            '0'..='9' => return Some(self.number_literal(ch, loc)),
            'a'..='z' | 'A'..='Z' | '_' => return Some(self.identifier_or_keyword(ch, loc)),

            '+' => self.pick('=', TokenKind::PlusEq, TokenKind::Plus),
            '-' => self.pick('=', TokenKind::MinusEq, TokenKind::Minus),
            '*' => {
                if self.peek() == Some('*') {
                    self.advance();
                    TokenKind::StarStar
                } else {
                    self.pick('=', TokenKind::StarEq, TokenKind::Star)
                }
            }
            '/' => self.pick('=', TokenKind::SlashEq, TokenKind::Slash),
            '%' => self.pick('=', TokenKind::PercentEq, TokenKind::Percent),
            '=' => self.pick('=', TokenKind::EqEq, TokenKind::Eq),
            '!' => self.pick('=', TokenKind::NotEq, TokenKind::Bang),
            '<' => self.pick('=', TokenKind::Le, TokenKind::Lt),
            '>' => self.pick('=', TokenKind::Ge, TokenKind::Gt),
            '&' if self.peek() == Some('&') => {
                self.advance();
                TokenKind::AndAnd
            }
            '|' if self.peek() == Some('|') => {
                self.advance();
                TokenKind::OrOr
            }
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            _ => {
                self.errors.push(LexError::UnexpectedCharacter {
                    character: ch,
                    location: loc,
                });
                return None;
            }
        };

        let text: String = self.input[self.offset_of(loc)..self.position].iter().collect();
        Some(Token::new(kind, text, loc))
    }

    /// Consume `next` and return `matched`, or return `single`
    fn pick(&mut self, next: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek() == Some(next) {
            self.advance();
            matched
        } else {
            single
        }
    }

    /// Parse string literal; an unterminated string ends at the end of its line
    fn string_literal(&mut self, loc: SourceLocation) -> Token {
        let mut string = String::new();

        while let Some(ch) = self.peek() {
            if ch == '"' {
                self.advance(); // consume closing quote
                return Token::new(TokenKind::StringLiteral, string, loc);
            }
            if ch == '\n' {
                break;
            }

            if ch == '\\' {
                let escape_loc = self.current_location();
                self.advance();
                let Some(escaped) = self.advance() else {
                    break;
                };
                match escaped {
                    'n' => string.push('\n'),
                    't' => string.push('\t'),
                    'r' => string.push('\r'),
                    '\\' => string.push('\\'),
                    '"' => string.push('"'),
                    '0' => string.push('\0'),
                    _ => self.errors.push(LexError::UnknownEscape {
                        escape: escaped,
                        location: escape_loc,
                    }),
                }
            } else {
                string.push(ch);
                self.advance();
            }
        }

        self.errors.push(LexError::UnterminatedString { location: loc });
        Token::new(TokenKind::StringLiteral, string, loc)
    }

    /// Parse numeric literal: digits, an optional fraction, and an optional
    /// `f`/`F` suffix marking a float
    fn number_literal(&mut self, first_digit: char, loc: SourceLocation) -> Token {
        let mut text = String::new();
        text.push(first_digit);
        let mut is_float = false;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if matches!(self.peek(), Some('f') | Some('F'))
            && !self
                .peek_ahead(1)
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            is_float = true;
            if let Some(suffix) = self.advance() {
                text.push(suffix);
            }
        }

        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        };
        Token::new(kind, text, loc)
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = TokenKind::keyword(&ident).unwrap_or(TokenKind::Ident);
        Token::new(kind, ident, loc)
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line_comment();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment();
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    /// Skip single-line comment (// ...)
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            self.advance();
            if ch == '\n' {
                break;
            }
        }
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return;
            }
            self.advance();
        }

        self.errors
            .push(LexError::UnterminatedComment { location: start_loc });
    }

    /// Character offset of a location previously produced by this lexer on
    /// the current line
    fn offset_of(&self, loc: SourceLocation) -> usize {
        self.position - (self.column - loc.column)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::new(source).tokenize();
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("int main() { return 0; }"),
            vec![
                TokenKind::Int,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::Return,
                TokenKind::IntLiteral,
                TokenKind::Semicolon,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("** *= += == != && || <= >="),
            vec![
                TokenKind::StarStar,
                TokenKind::StarEq,
                TokenKind::PlusEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        let source = "int x; // comment\nint y; /* block\ncomment */ int z;";
        let (tokens, _) = Lexer::new(source).tokenize();

        assert_eq!(tokens[1].text, "x");
        assert_eq!(tokens[4].text, "y");
        assert_eq!(tokens[7].text, "z");
        assert_eq!(tokens[7].location, SourceLocation::new(3, 16));
    }

    #[test]
    fn test_string_literal() {
        let (tokens, errors) = Lexer::new(r#""hello\nworld""#).tokenize();

        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "hello\nworld");
    }

    #[test]
    fn test_numeric_literals() {
        let (tokens, _) = Lexer::new("10 3.25 2f 1.5F 7.x").tokenize();

        assert_eq!(tokens[0].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[1].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[1].text, "3.25");
        assert_eq!(tokens[2].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[2].text, "2f");
        assert_eq!(tokens[3].text, "1.5F");
        // `7.x` is an integer followed by member access
        assert_eq!(tokens[4].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[5].kind, TokenKind::Dot);
    }

    #[test]
    fn test_unterminated_string_keeps_going() {
        let (tokens, errors) = Lexer::new("string s = \"abc\nint y;").tokenize();

        assert_eq!(
            errors,
            vec![LexError::UnterminatedString {
                location: SourceLocation::new(1, 12)
            }]
        );
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Ident && t.text == "y"));
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn test_unexpected_character_is_skipped() {
        let (tokens, errors) = Lexer::new("a & b").tokenize();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].lexeme().as_deref(), Some("&"));
        assert_eq!(tokens.len(), 3); // a, b, eof
    }

    #[test]
    fn test_token_categories() {
        let (tokens, _) = Lexer::new("class x 1 + ;").tokenize();
        let categories: Vec<_> = tokens.iter().map(Token::category).collect();

        assert_eq!(
            categories,
            vec![
                TokenCategory::Keyword,
                TokenCategory::Identifier,
                TokenCategory::Literal,
                TokenCategory::Operator,
                TokenCategory::Delimiter,
                TokenCategory::EndMarker,
            ]
        );
    }
}
