//! "Did you mean" suggestions for unresolved command names.
//!
//! Candidates are every command name and alias in the tree, collected
//! depth-first. Scoring prefers a prefix match, then a substring match,
//! then normalized Levenshtein similarity; only candidates above a fixed
//! threshold are offered.

use strsim::levenshtein;

use crate::command::Command;

/// Minimum score for a candidate to be offered at all.
const SIMILARITY_THRESHOLD: f64 = 0.6;

const PREFIX_SCORE: f64 = 2.0;
const SUBSTRING_SCORE: f64 = 1.5;

/// Collect every command name and alias below `root`, depth-first. The
/// root's own name is not a candidate; it is the program, not a command.
pub fn collect_candidates(root: &Command) -> Vec<String> {
    let mut candidates = Vec::new();
    collect_into(root, &mut candidates);
    candidates
}

fn collect_into(command: &Command, out: &mut Vec<String>) {
    for child in command.children() {
        out.push(child.name().to_string());
        for alias in child.aliases() {
            out.push(alias.clone());
        }
        collect_into(child, out);
    }
}

/// Normalized Levenshtein similarity: `1 - distance / max(len)`.
fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / max_len as f64)
}

fn score(input: &str, candidate: &str) -> f64 {
    if candidate.starts_with(input) {
        PREFIX_SCORE
    } else if candidate.contains(input) {
        SUBSTRING_SCORE
    } else {
        similarity(input, candidate)
    }
}

/// Pick the best candidate for an unresolved name, if any scores above the
/// threshold. Ties break toward the earlier candidate.
pub fn suggest(input: &str, candidates: &[String]) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for candidate in candidates {
        let s = score(input, candidate);
        if s < SIMILARITY_THRESHOLD {
            continue;
        }
        match best {
            Some((_, best_score)) if s <= best_score => {}
            _ => best = Some((candidate, s)),
        }
    }
    best.map(|(candidate, _)| candidate.clone())
}

/// Convenience wrapper: collect candidates from the tree and score against
/// them.
pub fn suggest_for(input: &str, root: &Command) -> Option<String> {
    suggest(input, &collect_candidates(root))
}

// ============================================================================
// Tests
// ============================================================================
