//! Dependency-order resolution: depth-first topological sort with cycle
//! detection. Kept generic over a name → dependencies lookup so it stays a
//! reusable utility rather than being welded to the plugin registry.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopoError {
    #[error("'{node}' depends on '{dependency}', which is not registered")]
    Missing { node: String, dependency: String },

    #[error("circular dependency: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Active,
    Done,
}

struct Walk<'a, F>
where
    F: Fn(&str) -> Vec<String>,
{
    deps: &'a F,
    known: &'a HashSet<&'a str>,
    marks: HashMap<String, Mark>,
    stack: Vec<String>,
    order: Vec<String>,
}

/// Produce a dependency-first ordering of `nodes`: every node appears after
/// all of its dependencies. Nodes are visited in the given order, so
/// independent nodes keep their relative (registration) order.
pub fn dependency_order<F>(nodes: &[String], deps: F) -> Result<Vec<String>, TopoError>
where
    F: Fn(&str) -> Vec<String>,
{
    let known: HashSet<&str> = nodes.iter().map(String::as_str).collect();
    let mut walk = Walk {
        deps: &deps,
        known: &known,
        marks: HashMap::new(),
        stack: Vec::new(),
        order: Vec::new(),
    };

    for node in nodes {
        visit(node, &mut walk)?;
    }
    Ok(walk.order)
}

fn visit<F>(node: &str, walk: &mut Walk<'_, F>) -> Result<(), TopoError>
where
    F: Fn(&str) -> Vec<String>,
{
    match walk.marks.get(node) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Active) => {
            // Revisited while still on the active path: name the cycle from
            // its first occurrence back to the repeated node.
            let start = walk.stack.iter().position(|n| n == node).unwrap_or(0);
            let mut path: Vec<String> = walk.stack[start..].to_vec();
            path.push(node.to_string());
            return Err(TopoError::Cycle { path });
        }
        None => {}
    }

    walk.marks.insert(node.to_string(), Mark::Active);
    walk.stack.push(node.to_string());

    for dep in (walk.deps)(node) {
        if !walk.known.contains(dep.as_str()) {
            return Err(TopoError::Missing {
                node: node.to_string(),
                dependency: dep,
            });
        }
        visit(&dep, walk)?;
    }

    walk.stack.pop();
    walk.marks.insert(node.to_string(), Mark::Done);
    walk.order.push(node.to_string());
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
