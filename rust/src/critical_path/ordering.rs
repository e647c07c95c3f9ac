//! Cycle detection and topological ordering over the dependency graph.

use std::collections::VecDeque;

use crate::graph::{Adjacency, InterdependencyGraph};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnStack,
    Done,
}

/// Node indices found on a cycle by depth-first search, in index order.
///
/// Iterative DFS with an explicit recursion stack: every back edge `u -> v`
/// marks the stack segment from `v` to `u` as cyclic.
pub(crate) fn find_cycle_nodes(adjacency: &Adjacency) -> Vec<usize> {
    let n = adjacency.outgoing.len();
    let mut state = vec![Visit::New; n];
    let mut in_cycle = vec![false; n];
    // (node, position of next outgoing edge to explore)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if state[root] != Visit::New {
            continue;
        }
        state[root] = Visit::OnStack;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let Some(&edge_idx) = adjacency.outgoing[node].get(frame.1) else {
                state[node] = Visit::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            let next = adjacency.target(edge_idx);
            match state[next] {
                Visit::New => {
                    state[next] = Visit::OnStack;
                    stack.push((next, 0));
                }
                Visit::OnStack => {
                    if let Some(pos) = stack.iter().rposition(|&(id, _)| id == next) {
                        for &(member, _) in &stack[pos..] {
                            in_cycle[member] = true;
                        }
                    }
                }
                Visit::Done => {}
            }
        }
    }

    (0..n).filter(|&idx| in_cycle[idx]).collect()
}

/// Result of ordering the graph's nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TopologicalOrder {
    /// Every node index exactly once.
    pub order: Vec<usize>,
    /// False when a cycle stalled Kahn's algorithm and nodes had to be forced in.
    pub is_complete: bool,
}

impl TopologicalOrder {
    /// Position of each node index within `order`.
    pub fn positions(&self) -> Vec<usize> {
        let mut positions = vec![0; self.order.len()];
        for (pos, &idx) in self.order.iter().enumerate() {
            positions[idx] = pos;
        }
        positions
    }
}

/// Kahn's algorithm that keeps going when a cycle stalls it.
///
/// On a stall the pending cycle member with the earliest seeded start (then
/// lowest index) is forced in and the sort resumes, so every node outside a
/// cycle still comes after all of its predecessors that are outside one.
/// Ties are broken by input order so the result is deterministic.
pub(crate) fn topological_indices(
    graph: &InterdependencyGraph,
    adjacency: &Adjacency,
) -> TopologicalOrder {
    let n = graph.len();
    let nodes = graph.nodes();
    let mut in_degree: Vec<usize> = adjacency.incoming.iter().map(Vec::len).collect();
    let mut queued = vec![false; n];
    let mut queue: VecDeque<usize> = VecDeque::new();
    for idx in (0..n).filter(|&idx| in_degree[idx] == 0) {
        queued[idx] = true;
        queue.push_back(idx);
    }

    let mut on_cycle: Option<Vec<bool>> = None;
    let mut order: Vec<usize> = Vec::with_capacity(n);
    let mut is_complete = true;

    while order.len() < n {
        let Some(idx) = queue.pop_front() else {
            is_complete = false;
            let on_cycle = on_cycle.get_or_insert_with(|| {
                let mut flags = vec![false; n];
                for idx in find_cycle_nodes(adjacency) {
                    flags[idx] = true;
                }
                flags
            });
            // Prefer a node that actually sits on a cycle over its downstream nodes
            let earliest = |only_cycle: bool| {
                (0..n)
                    .filter(|&idx| !queued[idx] && (!only_cycle || on_cycle[idx]))
                    .min_by(|&a, &b| {
                        nodes[a]
                            .seed_start
                            .total_cmp(&nodes[b].seed_start)
                            .then(a.cmp(&b))
                    })
            };
            let Some(forced) = earliest(true).or_else(|| earliest(false)) else {
                break;
            };
            queued[forced] = true;
            queue.push_back(forced);
            continue;
        };

        order.push(idx);
        for &edge_idx in &adjacency.outgoing[idx] {
            let target = adjacency.target(edge_idx);
            in_degree[target] = in_degree[target].saturating_sub(1);
            if in_degree[target] == 0 && !queued[target] {
                queued[target] = true;
                queue.push_back(target);
            }
        }
    }

    TopologicalOrder { order, is_complete }
}

/// Ids of all nodes that sit on a dependency cycle.
pub fn detect_cycles(graph: &InterdependencyGraph) -> Vec<String> {
    let adjacency = Adjacency::new(graph);
    find_cycle_nodes(&adjacency)
        .into_iter()
        .map(|idx| graph.nodes()[idx].id.clone())
        .collect()
}

/// Node ids in dependency order; cycles are broken at their earliest seeded member.
pub fn topological_order(graph: &InterdependencyGraph) -> Vec<String> {
    let adjacency = Adjacency::new(graph);
    topological_indices(graph, &adjacency)
        .order
        .into_iter()
        .map(|idx| graph.nodes()[idx].id.clone())
        .collect()
}
