//! Tokenizer: classifies raw argv strings into typed tokens.
//!
//! Classification happens once, before routing or parsing. Every downstream
//! stage (router, option parser, argument parser) consumes the fixed token
//! sequence by index and never re-classifies a token.

use serde::Serialize;

/// How a raw argv string was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// Positional value (including everything after `--`).
    Argument,
    /// Long option name, `--name` (name stored without the dashes).
    Option,
    /// Short flag or flag cluster, `-x` / `-xyz` (stored without the dash).
    Flag,
    /// Value bound to the preceding option via `=` syntax.
    Value,
    /// The literal `--` separator.
    Separator,
}

/// One classified unit of input.
///
/// `value` is the classified payload (option name without dashes, bound
/// value, positional text); `raw` is the original argv string it came from;
/// `index` is the token's position in the tokenized sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub raw: String,
    pub index: usize,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>, raw: &str, index: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            raw: raw.to_string(),
            index,
        }
    }
}

/// True for `-1`, `-2.5`, etc. A leading digit after the dash is required so
/// `-x2` stays a flag cluster.
fn is_negative_number(arg: &str) -> bool {
    let rest = &arg[1..];
    rest.chars().next().is_some_and(|c| c.is_ascii_digit()) && arg.parse::<f64>().is_ok()
}

/// Tokenize an argv-style list of raw strings.
///
/// Each input string yields one token, except `--opt=val` which yields an
/// `Option` token followed by a `Value` token. Rules in priority order:
///
/// 1. Exact `--` becomes a `Separator`; everything after it is an
///    `Argument` verbatim, even strings that look like flags.
/// 2. `--name` / `--name=val` become `Option` (+ `Value` when `=` is
///    present).
/// 3. `-x` (length 2) becomes a single-character `Flag`.
/// 4. `-xyz` (length > 2, not a negative number) becomes a `Flag` carrying
///    the full cluster.
/// 5. `-1` / `-2.5` (dash followed by digits) become `Argument` tokens;
///    this takes precedence over rule 4.
/// 6. Anything else is an `Argument`.
pub fn tokenize(argv: &[String]) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(argv.len());
    let mut literal = false;

    for raw in argv {
        let index = tokens.len();

        if literal {
            tokens.push(Token::new(TokenKind::Argument, raw.as_str(), raw, index));
            continue;
        }

        if raw == "--" {
            tokens.push(Token::new(TokenKind::Separator, "--", raw, index));
            literal = true;
        } else if let Some(body) = raw.strip_prefix("--") {
            match body.split_once('=') {
                Some((name, value)) => {
                    tokens.push(Token::new(TokenKind::Option, name, raw, index));
                    tokens.push(Token::new(TokenKind::Value, value, raw, index + 1));
                }
                None => tokens.push(Token::new(TokenKind::Option, body, raw, index)),
            }
        } else if raw.len() > 1 && raw.starts_with('-') && !is_negative_number(raw) {
            // Single short flag or a cluster; the option parser decides
            // whether a cluster is grouped booleans or an attached value.
            tokens.push(Token::new(TokenKind::Flag, &raw[1..], raw, index));
        } else {
            tokens.push(Token::new(TokenKind::Argument, raw.as_str(), raw, index));
        }
    }

    tokens
}

// ============================================================================
// Tests
// ============================================================================
