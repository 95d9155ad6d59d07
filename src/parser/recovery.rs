//! Panic-mode error recovery
//!
//! When an item or statement fails to parse, the error is recorded and the
//! cursor skips ahead to a synchronization point so parsing can continue:
//!
//! - just past a `;` at the current nesting depth
//! - before a `}` that closes the enclosing block
//! - before a keyword that starts a declaration or statement
//! - at end of input
//!
//! A `;` missing at the end of a line is the exception: parsing resumes at
//! the first token of the next line, whatever it is.
//!
//! Braces opened inside the skipped region are tracked, so a malformed
//! statement containing a whole `{ ... }` block is skipped as a unit.
//!
//! Recovery also attaches "did you mean" hints for misspelled keywords and
//! operators borrowed from other languages.

use crate::parser::lexer::{TokenKind, KEYWORDS};
use crate::parser::parse::{Checkpoint, ParseError, Parser};
use tracing::debug;

/// Operators that do not exist in Lumen, mapped to the closest one that does
const OPERATOR_ALIASES: &[(&str, &str)] = &[("&", "&&"), ("|", "||"), ("^", "**")];

impl Parser {
    /// Record `err` and skip to the next synchronization point. Always
    /// leaves the cursor past `start`, so the caller's loop makes progress.
    pub(crate) fn recover(&mut self, start: Checkpoint, mut err: ParseError) {
        if err.suggestion.is_none() {
            let leading = &self.tokens[start.position];
            if leading.kind == TokenKind::Ident {
                err.suggestion = suggest(&leading.text);
            }
        }

        debug!(
            line = err.location.line,
            column = err.location.column,
            message = %err.message,
            "syntax error, resynchronizing"
        );
        let resume = err.resume.filter(|at| at.position > start.position);
        self.report(err);
        match resume {
            Some(at) => self.restore(at),
            None => self.synchronize(start),
        }
    }

    pub(crate) fn synchronize(&mut self, start: Checkpoint) {
        let mut depth = 0usize;

        if self.position == start.position && !self.is_at_end() {
            let kind = self.advance().kind;
            match kind {
                TokenKind::Semicolon => return,
                TokenKind::LBrace => depth = 1,
                _ => {}
            }
        }

        while !self.is_at_end() {
            let kind = self.peek_kind();
            match kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth > 0 => depth -= 1,
                TokenKind::RBrace => return,
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                _ if depth == 0 && kind.starts_statement() => return,
                _ => {}
            }
            self.advance();
        }
    }
}

/// Corrective hint for a misspelled keyword or unknown operator
pub fn suggest(text: &str) -> Option<&'static str> {
    if let Some((_, replacement)) = OPERATOR_ALIASES.iter().find(|(op, _)| *op == text) {
        return Some(replacement);
    }

    if text.is_empty() || !text.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let limit = (text.chars().count() / 2).min(2);
    let mut best: Option<(usize, &'static str)> = None;

    for (keyword, _) in KEYWORDS {
        if *keyword == text {
            return None;
        }
        let distance = edit_distance(text, keyword);
        if distance > limit {
            continue;
        }
        match best {
            Some((best_distance, _)) if best_distance <= distance => {}
            _ => best = Some((distance, keyword)),
        }
    }

    best.map(|(_, keyword)| keyword)
}

/// Optimal string alignment distance: Levenshtein plus adjacent transpositions
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut d = vec![vec![0usize; b.len() + 1]; a.len() + 1];

    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        d[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut value = (d[i - 1][j] + 1)
                .min(d[i][j - 1] + 1)
                .min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                value = value.min(d[i - 2][j - 2] + 1);
            }
            d[i][j] = value;
        }
    }

    d[a.len()][b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Lexer;
    use crate::parser::parse_source;

    fn parser_for(source: &str) -> Parser {
        let (tokens, _) = Lexer::new(source).tokenize();
        Parser::new(tokens)
    }

    #[test]
    fn test_suggest_keywords() {
        assert_eq!(suggest("retrun"), Some("return"));
        assert_eq!(suggest("whiel"), Some("while"));
        assert_eq!(suggest("clas"), Some("class"));
        assert_eq!(suggest("return"), None);
        assert_eq!(suggest("counter"), None);
        // too short for two edits
        assert_eq!(suggest("ab"), None);
    }

    #[test]
    fn test_suggest_operators() {
        assert_eq!(suggest("&"), Some("&&"));
        assert_eq!(suggest("|"), Some("||"));
        assert_eq!(suggest("@"), None);
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("ab", "ba"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn test_synchronize_skips_past_semicolon() {
        let mut parser = parser_for("x y z; int w;");
        let start = parser.checkpoint();
        parser.synchronize(start);

        assert_eq!(parser.peek_kind(), TokenKind::Int);
    }

    #[test]
    fn test_synchronize_skips_nested_block() {
        let mut parser = parser_for("foo { if x; } bar; }");
        let start = parser.checkpoint();
        parser.synchronize(start);

        // the inner block and `bar;` are skipped
        assert_eq!(parser.peek_kind(), TokenKind::RBrace);
        assert_eq!(parser.position, 8);
    }

    #[test]
    fn test_synchronize_stops_at_keyword() {
        let mut parser = parser_for("= = while");
        let start = parser.checkpoint();
        parser.synchronize(start);

        assert_eq!(parser.peek_kind(), TokenKind::While);
    }

    #[test]
    fn test_recovery_continues_after_error() {
        let output = parse_source("int x = ;\nint y = 2;\n");

        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].line(), 1);
        assert_eq!(output.unit.items.len(), 1);
    }

    #[test]
    fn test_recovery_adds_keyword_hint() {
        let output = parse_source("retrun 5;");

        assert_eq!(output.messages().len(), 1);
        assert!(
            output.messages()[0].ends_with("(did you mean 'return'?)"),
            "{:?}",
            output.messages()
        );
    }
}
