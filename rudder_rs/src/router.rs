//! Command router: walks the token sequence against the command tree.
//!
//! The router only decides *which* command runs; it leaves every
//! non-subcommand token in place for the option and argument parsers.
//! Subcommand names are recorded as consumed by token index, never by
//! prefix truncation, so options interleaved before or between subcommand
//! names (`app --verbose build --watch`) resolve correctly.

use std::collections::HashSet;

use crate::command::Command;
use crate::token::{Token, TokenKind};

/// Routing result: the deepest matched command, its path from the root,
/// and the token list minus the consumed subcommand names.
pub struct RouteMatch<'a> {
    pub command: &'a Command,
    pub path: Vec<String>,
    pub tokens: Vec<Token>,
}

/// Walk `tokens` from the root, descending through children named by
/// `Argument` tokens. Option and Flag tokens are skipped (together with a
/// `Value` token bound to them); the walk halts at a `--` separator or at
/// the first argument that names no child of the current command.
pub fn route<'a>(root: &'a Command, tokens: &[Token]) -> RouteMatch<'a> {
    let mut current = root;
    let mut path = vec![root.name().to_string()];
    let mut consumed: HashSet<usize> = HashSet::new();

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        match token.kind {
            TokenKind::Separator => break,
            TokenKind::Option | TokenKind::Flag => {
                // Skip the option and, if present, its `=`-bound value.
                let paired = tokens
                    .get(i + 1)
                    .is_some_and(|t| t.kind == TokenKind::Value);
                i += if paired { 2 } else { 1 };
            }
            TokenKind::Value => i += 1,
            TokenKind::Argument => match current.child_by_name_or_alias(&token.value) {
                Some(child) => {
                    consumed.insert(i);
                    path.push(child.name().to_string());
                    current = child;
                    i += 1;
                }
                None => break,
            },
        }
    }

    let tokens = tokens
        .iter()
        .enumerate()
        .filter(|(idx, _)| !consumed.contains(idx))
        .map(|(_, t)| t.clone())
        .collect();

    RouteMatch {
        command: current,
        path,
        tokens,
    }
}

// ============================================================================
// Tests
// ============================================================================
