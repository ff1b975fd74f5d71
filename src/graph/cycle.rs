//! Cycle detection over a string-keyed adjacency map

use std::collections::{HashMap, HashSet};

/// Find one cycle in a directed graph using DFS.
///
/// `nodes` fixes the visiting order so the reported cycle is deterministic.
/// `edges` maps a node to the nodes it points at. The returned path starts and
/// ends with the same node, e.g. `[a, b, a]`.
pub fn find_cycle(nodes: &[String], edges: &HashMap<String, Vec<String>>) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for node in nodes {
        if !visited.contains(node) {
            if let Some(cycle) = dfs_detect_cycle(edges, node, &mut visited, &mut rec_stack, &mut path)
            {
                return Some(cycle);
            }
        }
    }

    None
}

fn dfs_detect_cycle(
    edges: &HashMap<String, Vec<String>>,
    node: &str,
    visited: &mut HashSet<String>,
    rec_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    visited.insert(node.to_string());
    rec_stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(targets) = edges.get(node) {
        for next in targets {
            if !visited.contains(next) {
                if let Some(cycle) = dfs_detect_cycle(edges, next, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(next) {
                let start = path
                    .iter()
                    .position(|p| p == next)
                    .unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(next.clone());
                return Some(cycle);
            }
        }
    }

    path.pop();
    rec_stack.remove(node);
    None
}
