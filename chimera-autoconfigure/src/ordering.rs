//! Ordering hint resolution for candidate registries
//!
//! Candidates may declare `after`/`before` hints. This module reorders a
//! candidate list so every hint is honored while keeping discovery order for
//! everything the hints leave unconstrained.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::candidate::Candidate;
use crate::error::{ConditionError, ConditionResult};

/// Builds the "must come before" graph over candidate indices.
///
/// `edges[i]` holds the indices that must be processed after candidate `i`.
/// Hints naming unknown candidates are ignored.
fn hint_edges(candidates: &[&Candidate]) -> Vec<BTreeSet<usize>> {
    let index: HashMap<&str, usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id(), i))
        .collect();

    let mut edges = vec![BTreeSet::new(); candidates.len()];
    for (i, candidate) in candidates.iter().enumerate() {
        for predecessor in candidate.after() {
            match index.get(predecessor.as_str()) {
                Some(&j) if j != i => {
                    edges[j].insert(i);
                }
                Some(_) => {}
                None => tracing::debug!(
                    "Candidate '{}' declares after '{}', which is not registered; hint ignored",
                    candidate.id(),
                    predecessor
                ),
            }
        }
        for successor in candidate.before() {
            match index.get(successor.as_str()) {
                Some(&j) if j != i => {
                    edges[i].insert(j);
                }
                Some(_) => {}
                None => tracing::debug!(
                    "Candidate '{}' declares before '{}', which is not registered; hint ignored",
                    candidate.id(),
                    successor
                ),
            }
        }
    }
    edges
}

/// Computes a processing order honoring all ordering hints.
///
/// This is a Kahn topological sort that always picks the earliest-discovered
/// ready candidate, so unconstrained candidates keep their relative order.
///
/// # Returns
///
/// Indices into `candidates` in processing order, or `OrderingCycle` naming
/// the candidates that form a cycle.
pub fn hinted_order(candidates: &[&Candidate]) -> ConditionResult<Vec<usize>> {
    let edges = hint_edges(candidates);

    let mut in_degree = vec![0usize; candidates.len()];
    for successors in &edges {
        for &j in successors {
            in_degree[j] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(candidates.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &j in &edges[next] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.insert(j);
            }
        }
    }

    if order.len() != candidates.len() {
        let cycle = find_cycle(&edges)
            .into_iter()
            .map(|i| candidates[i].id().to_string())
            .collect();
        return Err(ConditionError::OrderingCycle(cycle));
    }

    Ok(order)
}

/// DFS-based cycle detection over the hint graph
///
/// Returns the cycle as a closed path (first element repeated at the end).
fn find_cycle(edges: &[BTreeSet<usize>]) -> Vec<usize> {
    fn visit(
        node: usize,
        edges: &[BTreeSet<usize>],
        visited: &mut HashSet<usize>,
        stack: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        visited.insert(node);
        stack.push(node);

        for &next in &edges[node] {
            if let Some(start) = stack.iter().position(|&n| n == next) {
                let mut cycle = stack[start..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            if !visited.contains(&next) {
                if let Some(cycle) = visit(next, edges, visited, stack) {
                    return Some(cycle);
                }
            }
        }

        stack.pop();
        None
    }

    let mut visited = HashSet::new();
    for node in 0..edges.len() {
        if !visited.contains(&node) {
            if let Some(cycle) = visit(node, edges, &mut visited, &mut Vec::new()) {
                return cycle;
            }
        }
    }
    Vec::new()
}
