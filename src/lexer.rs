// SPDX-License-Identifier: GPL-3.0-or-later

//! Lexical utilities shared by all back ends.
//!
//! Statements in diagram elements are written in a small canonical pseudocode.
//! We tokenize them losslessly (whitespace and literals are tokens too, so
//! re-concatenating always reproduces the input), then normalize dialect
//! operator spellings to one canonical set. Back ends only ever translate
//! *from* the canonical form.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while, take_while1},
    character::complete::anychar,
    combinator::{opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};

/// One lexical token. The contained text is always the exact input slice,
/// except after [`unify_operators`] rewrote an operator spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Number(String),
    /// Includes the surrounding double quotes.
    StrLit(String),
    /// Includes the surrounding single quotes.
    CharLit(String),
    Op(String),
    Space(String),
    /// Any other single character.
    Punct(String),
}

impl Token {
    pub fn text(&self) -> &str {
        match self {
            Token::Ident(s)
            | Token::Number(s)
            | Token::StrLit(s)
            | Token::CharLit(s)
            | Token::Op(s)
            | Token::Space(s)
            | Token::Punct(s) => s,
        }
    }

    pub fn is_space(&self) -> bool {
        matches!(self, Token::Space(_))
    }
}

fn ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_digit()),
        opt(pair(
            tag("."),
            take_while1(|c: char| c.is_ascii_digit()),
        )),
    ))
    .parse(input)
}

fn string_lit(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        tag("\""),
        many0(alt((
            recognize(preceded(tag("\\"), anychar)),
            is_not("\\\""),
        ))),
        tag("\""),
    ))
    .parse(input)
}

fn char_lit(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        tag("'"),
        many0(alt((
            recognize(preceded(tag("\\"), anychar)),
            is_not("\\'"),
        ))),
        tag("'"),
    ))
    .parse(input)
}

fn space(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c == ' ' || c == '\t').parse(input)
}

/// Multi-character operators first, longest spelling wins.
fn operator(input: &str) -> IResult<&str, &str> {
    alt((
        alt((
            tag("<-"),
            tag(":="),
            tag("=="),
            tag("!="),
            tag("<>"),
            tag("><"),
            tag("~="),
            tag("<="),
            tag(">="),
            tag("<<"),
            tag(">>"),
            tag("&&"),
            tag("||"),
        )),
        alt((
            tag("←"),
            tag("≠"),
            tag("≤"),
            tag("≥"),
            tag("="),
            tag("<"),
            tag(">"),
            tag("+"),
            tag("-"),
            tag("*"),
            tag("/"),
            tag("%"),
            tag("!"),
            tag("^"),
            tag("&"),
            tag("|"),
            tag("~"),
        )),
    ))
    .parse(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        string_lit.map(|s: &str| Token::StrLit(s.to_string())),
        char_lit.map(|s: &str| Token::CharLit(s.to_string())),
        ident.map(|s: &str| Token::Ident(s.to_string())),
        number.map(|s: &str| Token::Number(s.to_string())),
        space.map(|s: &str| Token::Space(s.to_string())),
        operator.map(|s: &str| Token::Op(s.to_string())),
        recognize(anychar).map(|s: &str| Token::Punct(s.to_string())),
    ))
    .parse(input)
}

/// Split a statement into tokens. Total: the concatenation of all token
/// texts is the input, character for character.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut rest = input;
    let mut out = Vec::new();
    while !rest.is_empty() {
        match token(rest) {
            Ok((r, t)) => {
                out.push(t);
                rest = r;
            }
            Err(_) => {
                // anychar only fails on empty input, but stay total anyway
                let c = rest.chars().next().unwrap();
                out.push(Token::Punct(c.to_string()));
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

/// Re-concatenate a token sequence.
pub fn concat(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text()).collect()
}

/// Normalize dialect operator spellings to the canonical set.
///
/// Literal tokens are never touched (they are single tokens, so a rewrite
/// cannot reach inside quotes). With `assignment_only`, only the assignment
/// spellings are unified; comparison and word operators are left alone, which
/// matters when classifying a line before knowing whether `=` compares.
pub fn unify_operators(tokens: &mut [Token], assignment_only: bool) {
    for t in tokens.iter_mut() {
        match t {
            Token::Op(op) => {
                let unified = match op.as_str() {
                    ":=" | "←" => Some("<-"),
                    "=" if !assignment_only => Some("=="),
                    "<>" | "><" | "~=" | "≠" if !assignment_only => Some("!="),
                    "≤" if !assignment_only => Some("<="),
                    "≥" if !assignment_only => Some(">="),
                    _ => None,
                };
                if let Some(u) = unified {
                    *op = u.to_string();
                }
            }
            Token::Ident(word) if !assignment_only => {
                let unified = match word.to_ascii_lowercase().as_str() {
                    "mod" => Some("%"),
                    "and" => Some("&&"),
                    "or" => Some("||"),
                    "not" => Some("!"),
                    "xor" => Some("^"),
                    "shl" => Some("<<"),
                    "shr" => Some(">>"),
                    // div stays a word operator, targets translate it
                    _ => None,
                };
                if let Some(u) = unified {
                    *t = Token::Op(u.to_string());
                }
            }
            _ => (),
        }
    }
}

/// Tokenize, unify and re-concatenate in one go.
pub fn unify(line: &str) -> String {
    let mut tokens = tokenize(line);
    unify_operators(&mut tokens, false);
    concat(&tokens)
}

/// Split an expression list on a separator, honoring nested parentheses,
/// brackets, braces and literals. A naive split on `,` would cut function
/// call arguments apart.
pub fn split_expression_list(text: &str, sep: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    for t in &tokens {
        match t.text() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            s if s == sep && depth == 0 && !matches!(t, Token::StrLit(_) | Token::CharLit(_)) => {
                parts.push(current.trim().to_string());
                current = String::new();
                continue;
            }
            _ => (),
        }
        current.push_str(t.text());
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Split `text` once at a word keyword (case-insensitive, outside any
/// nesting or literal), returning the trimmed parts around it.
pub fn split_once_keyword(text: &str, keyword: &str) -> Option<(String, String)> {
    let tokens = tokenize(text);
    let mut depth = 0i32;
    for (i, t) in tokens.iter().enumerate() {
        match t {
            Token::Punct(p) | Token::Op(p) => match p.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                _ => (),
            },
            Token::Ident(word) if depth == 0 && word.eq_ignore_ascii_case(keyword) => {
                let before = concat(&tokens[..i]).trim().to_string();
                let after = concat(&tokens[i + 1..]).trim().to_string();
                return Some((before, after));
            }
            _ => (),
        }
    }
    None
}

/// True if the whole expression is already wrapped in one balanced pair of
/// parentheses, so a back end must not wrap it again.
pub fn is_fully_parenthesized(text: &str) -> bool {
    let trimmed = text.trim();
    if !(trimmed.starts_with('(') && trimmed.ends_with(')')) {
        return false;
    }
    let tokens = tokenize(trimmed);
    let mut depth = 0i32;
    for (i, t) in tokens.iter().enumerate() {
        match t.text() {
            "(" => depth += 1,
            ")" => {
                depth -= 1;
                // the opening paren may only close at the very end
                if depth == 0 && i + 1 != tokens.len() {
                    return false;
                }
            }
            _ => (),
        }
    }
    depth == 0
}

/// Split an assignment into (lhs, rhs) on the canonical `<-`, if any.
/// Expects unified tokens as input text.
pub fn split_assignment(line: &str) -> Option<(String, String)> {
    let mut tokens = tokenize(line);
    unify_operators(&mut tokens, true);
    let pos = tokens.iter().position(|t| t.text() == "<-")?;
    let lhs = concat(&tokens[..pos]).trim().to_string();
    let rhs = concat(&tokens[pos + 1..]).trim().to_string();
    Some((lhs, rhs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_tokenizes_losslessly() {
        for line in [
            "x <- 3 + 4",
            "a := b * (c - 1)",
            "print(\"a <> b\", x)",
            "s <- \"quoted \\\" quote\" + '\\''",
            "weird €§ bytes",
        ] {
            assert_eq!(concat(&tokenize(line)), line);
        }
    }

    #[test]
    fn it_unifies_operators() {
        assert_eq!(unify("a := 1"), "a <- 1");
        assert_eq!(unify("a = 1"), "a == 1");
        assert_eq!(unify("a <> b and c ~= d"), "a != b && c != d");
        assert_eq!(unify("x mod 2 = 0 or not y"), "x % 2 == 0 || ! y");
        assert_eq!(unify("a shl 2 xor b shr 1"), "a << 2 ^ b >> 1");
    }

    #[test]
    fn it_keeps_literals_verbatim() {
        assert_eq!(
            unify("s <- \"a <> b and c\" + t"),
            "s <- \"a <> b and c\" + t"
        );
        assert_eq!(unify("c <- '<'"), "c <- '<'");
    }

    #[test]
    fn it_splits_expression_lists() {
        assert_eq!(
            split_expression_list("1, max(2, 3), \"a,b\"", ","),
            vec!["1", "max(2, 3)", "\"a,b\""]
        );
        assert_eq!(
            split_expression_list("{1, 2}, 3", ","),
            vec!["{1, 2}", "3"]
        );
        assert_eq!(split_expression_list("", ","), Vec::<String>::new());
    }

    #[test]
    fn it_detects_full_parenthesization() {
        assert!(is_fully_parenthesized("(a > b)"));
        assert!(is_fully_parenthesized("((a) && (b))"));
        assert!(!is_fully_parenthesized("(a) && (b)"));
        assert!(!is_fully_parenthesized("a > b"));
    }

    #[test]
    fn it_splits_assignments() {
        assert_eq!(
            split_assignment("x <- 3 + 4"),
            Some(("x".to_string(), "3 + 4".to_string()))
        );
        assert_eq!(
            split_assignment("y := f(a)"),
            Some(("y".to_string(), "f(a)".to_string()))
        );
        assert_eq!(split_assignment("f(a)"), None);
        // a comparison must not be mistaken for an assignment
        assert_eq!(split_assignment("x = 4"), None);
    }
}
