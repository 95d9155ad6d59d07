// Property tests for the Lumen front end

use lumenc::diagnostics::DiagnosticKind;
use lumenc::ir::generate;
use lumenc::parser::parse_source;
use lumenc::semantic::types::is_assignable;
use lumenc::semantic::{analyze, Type};
use quickcheck::{Arbitrary, Gen, QuickCheck};

const FRAGMENTS: &[&str] = &[
    "int", "float", "bool", "string", "void", "var", "const", "class", "static", "new", "this",
    "if", "else", "while", "for", "return", "break", "continue", "x", "y", "A", "f", "=", "+=",
    "+", "-", "*", "**", "<", "==", "&&", "!", "&", ".", ",", ";", "(", ")", "{", "}", "1",
    "2.5", "true", "null", "\"s\"", "\n",
];

/// Whitespace-separated mix of Lumen tokens, mostly not a valid program
#[derive(Debug, Clone)]
struct TokenSoup(String);

impl Arbitrary for TokenSoup {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = usize::arbitrary(g) % 48;
        let words: Vec<&str> = (0..len)
            .map(|_| *g.choose(FRAGMENTS).unwrap())
            .collect();
        TokenSoup(words.join(" "))
    }
}

#[derive(Debug, Clone)]
struct AnyType(Type);

impl Arbitrary for AnyType {
    fn arbitrary(g: &mut Gen) -> Self {
        let choices = [
            Type::Int,
            Type::Float,
            Type::String,
            Type::Bool,
            Type::Void,
            Type::Null,
            Type::Error,
            Type::Class("A".to_string()),
            Type::Class("B".to_string()),
        ];
        AnyType(g.choose(&choices).unwrap().clone())
    }
}

/// A declaration with exactly one semantic error in it
#[derive(Debug, Clone, Copy)]
enum ErrorSite {
    /// Use of an undeclared name
    Symbol { line_break: bool },
    /// `Ghost g = new Ghost();`, optionally split over two lines
    Class { line_break: bool },
}

impl ErrorSite {
    fn kind(&self) -> DiagnosticKind {
        match self {
            ErrorSite::Symbol { .. } => DiagnosticKind::UndefinedSymbol,
            ErrorSite::Class { .. } => DiagnosticKind::UndefinedClass,
        }
    }
}

impl Arbitrary for ErrorSite {
    fn arbitrary(g: &mut Gen) -> Self {
        let line_break = bool::arbitrary(g);
        if bool::arbitrary(g) {
            ErrorSite::Symbol { line_break }
        } else {
            ErrorSite::Class { line_break }
        }
    }
}

/// Declarations `v0`, `v1`, ... one per site, several sharing a line
fn error_sites_source(sites: &[ErrorSite]) -> String {
    let mut source = String::new();
    for (i, site) in sites.iter().enumerate() {
        let (decl, line_break) = match site {
            ErrorSite::Symbol { line_break } => (format!("int v{} = missing + 1;", i), *line_break),
            ErrorSite::Class { line_break } => (format!("Ghost v{} =\n new Ghost();", i), *line_break),
        };
        source.push_str(&decl);
        source.push_str(if line_break { "\n" } else { " " });
    }
    source
}

/// One step of a generated routine body
#[derive(Debug, Clone, Copy)]
enum Step {
    Open,
    Close,
    Declare(u8, u8),
}

impl Arbitrary for Step {
    fn arbitrary(g: &mut Gen) -> Self {
        match u8::arbitrary(g) % 6 {
            0 => Step::Open,
            1 => Step::Close,
            _ => Step::Declare(u8::arbitrary(g) % 4, u8::arbitrary(g) % 5),
        }
    }
}

/// Render steps as the body of `C.m`, which has `this` and a float parameter
fn method_source(steps: &[Step]) -> String {
    let mut body = String::new();
    let mut depth = 0;
    for step in steps {
        match step {
            Step::Open => {
                body.push_str("if true {\n");
                depth += 1;
            }
            Step::Close if depth > 0 => {
                body.push_str("}\n");
                depth -= 1;
            }
            Step::Close => {}
            Step::Declare(ty, name) => {
                let (ty, value) = match ty {
                    0 => ("int", "1"),
                    1 => ("float", "1.5"),
                    2 => ("bool", "true"),
                    _ => ("string", "\"s\""),
                };
                body.push_str(&format!("{} v{} = {};\n", ty, name, value));
            }
        }
    }
    for _ in 0..depth {
        body.push_str("}\n");
    }
    format!("class C {{ void m(float p) {{\n{}}} }}", body)
}

#[test]
fn prop_parsing_is_deterministic() {
    fn prop(soup: TokenSoup) -> bool {
        parse_source(&soup.0) == parse_source(&soup.0)
    }
    QuickCheck::new().tests(300).quickcheck(prop as fn(TokenSoup) -> bool);
}

#[test]
fn prop_every_stage_finishes_on_garbage() {
    fn prop(soup: TokenSoup) -> bool {
        let parsed = parse_source(&soup.0);
        let last_line = soup.0.matches('\n').count() + 1;
        let located = parsed.diagnostics.iter().all(|d| d.line() <= last_line);

        let checked = analyze(&parsed.unit);
        let ir = generate(&checked);
        let stacks_valid = ir.routines.iter().all(|r| r.check_stack().is_ok());

        located && stacks_valid && ir.routine("<main>").is_some()
    }
    QuickCheck::new().tests(300).quickcheck(prop as fn(TokenSoup) -> bool);
}

#[test]
fn prop_one_diagnostic_per_error_site() {
    fn prop(sites: Vec<ErrorSite>) -> bool {
        let source = error_sites_source(&sites);
        let parsed = parse_source(&source);
        if !parsed.is_success() {
            return false;
        }
        let checked = analyze(&parsed.unit);

        let expected: Vec<DiagnosticKind> = sites.iter().map(ErrorSite::kind).collect();
        let reported: Vec<DiagnosticKind> = checked.diagnostics.iter().map(|d| d.kind).collect();
        reported == expected
    }
    QuickCheck::new().tests(200).quickcheck(prop as fn(Vec<ErrorSite>) -> bool);
}

#[test]
fn prop_compatibility_is_symmetric() {
    fn prop(a: AnyType, b: AnyType) -> bool {
        is_assignable(&a.0, &b.0) == is_assignable(&b.0, &a.0)
    }
    QuickCheck::new().quickcheck(prop as fn(AnyType, AnyType) -> bool);
}

#[test]
fn prop_slots_never_overlap() {
    fn prop(steps: Vec<Step>) -> bool {
        let source = method_source(&steps);
        let parsed = parse_source(&source);
        if !parsed.is_success() {
            return false;
        }
        let ir = generate(&analyze(&parsed.unit));
        let Some(method) = ir.routine("C.m") else {
            return false;
        };

        let receiver_first = method.slot_of("this") == Some(0) && method.slot_of("p") == Some(1);
        let in_order = method.locals.windows(2).all(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            a.slot + a.ty.slot_width() == b.slot
        });
        receiver_first && in_order
    }
    QuickCheck::new().tests(200).quickcheck(prop as fn(Vec<Step>) -> bool);
}
