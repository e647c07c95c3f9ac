//! Blockage detection: which open actions are held up by a predecessor's status.
//!
//! Readiness rules by link type:
//! - `FS`: the predecessor must be finished or cancelled
//! - `SS`: the predecessor must be in progress or finished
//! - `FF`/`SF`: only constrain the successor's finish, never block its start

use pyo3::prelude::*;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::graph::{Adjacency, InterdependencyGraph};
use crate::models::{ActionStatus, LinkType};
use crate::{log_changes, log_checks};

/// One predecessor holding up one action.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct BlockageRecord {
    #[pyo3(get)]
    pub blocked_id: String,
    #[pyo3(get)]
    pub blocked_title: String,
    #[pyo3(get)]
    pub blocking_id: String,
    #[pyo3(get)]
    pub blocking_title: String,
    #[pyo3(get)]
    pub link_type: LinkType,
    #[pyo3(get)]
    pub reason: String,
}

#[pymethods]
impl BlockageRecord {
    fn __repr__(&self) -> String {
        format!(
            "BlockageRecord(blocked={:?}, blocking={:?}, link_type={})",
            self.blocked_id, self.blocking_id, self.link_type
        )
    }
}

/// Whether a link from a predecessor in `status` prevents its successor from starting.
pub fn link_blocks(link_type: LinkType, predecessor_status: ActionStatus) -> bool {
    match link_type {
        LinkType::FinishToStart => !predecessor_status.is_completed(),
        LinkType::StartToStart => !predecessor_status.is_started(),
        LinkType::FinishToFinish | LinkType::StartToFinish => false,
    }
}

fn describe(link_type: LinkType, blocking_title: &str, blocking_id: &str) -> String {
    let event = match link_type {
        LinkType::StartToStart => "start",
        _ => "finish",
    };
    format!(
        "Waiting for \"{}\" ({}) to {} [{}]",
        blocking_title, blocking_id, event, link_type
    )
}

/// Edges currently blocking `node_idx`, in edge order.
///
/// `status_override` substitutes the status of one node, to answer
/// "what if this node were in that state".
fn blocking_edges(
    graph: &InterdependencyGraph,
    adjacency: &Adjacency,
    node_idx: usize,
    status_override: Option<(usize, ActionStatus)>,
) -> Vec<usize> {
    let status_of = |idx: usize| match status_override {
        Some((overridden, status)) if overridden == idx => status,
        _ => graph.nodes()[idx].status(),
    };

    if status_of(node_idx).is_terminal() {
        return Vec::new();
    }

    adjacency.incoming[node_idx]
        .iter()
        .copied()
        .filter(|&edge_idx| {
            let edge = &graph.edges()[edge_idx];
            link_blocks(edge.link_type, status_of(adjacency.source(edge_idx)))
        })
        .collect()
}

fn record_for(graph: &InterdependencyGraph, adjacency: &Adjacency, edge_idx: usize) -> BlockageRecord {
    let blocked = &graph.nodes()[adjacency.target(edge_idx)];
    let blocking = &graph.nodes()[adjacency.source(edge_idx)];
    let link_type = graph.edges()[edge_idx].link_type;
    BlockageRecord {
        blocked_id: blocked.id.clone(),
        blocked_title: blocked.title().to_string(),
        blocking_id: blocking.id.clone(),
        blocking_title: blocking.title().to_string(),
        link_type,
        reason: describe(link_type, blocking.title(), &blocking.id),
    }
}

/// Flag every open action held up by a direct predecessor.
///
/// Only the first blocking predecessor (in edge order) is recorded per action;
/// use [`get_blockage_chain`] for the full picture. Updates `is_blocked`,
/// `blocking_reason` and `stats.blocked_actions` in place.
pub fn detect_blockages(
    graph: &mut InterdependencyGraph,
    config: &EngineConfig,
) -> Vec<BlockageRecord> {
    let verbosity = config.verbosity;
    let adjacency = Adjacency::new(graph);
    let mut records: Vec<BlockageRecord> = Vec::new();
    let mut flags: Vec<Option<String>> = Vec::with_capacity(graph.len());

    for idx in 0..graph.len() {
        let first = blocking_edges(graph, &adjacency, idx, None).first().copied();
        match first {
            Some(edge_idx) => {
                let record = record_for(graph, &adjacency, edge_idx);
                log_checks!(verbosity, "  {} blocked: {}", record.blocked_id, record.reason);
                flags.push(Some(record.reason.clone()));
                records.push(record);
            }
            None => flags.push(None),
        }
    }

    for (node, reason) in graph.nodes.iter_mut().zip(flags) {
        node.is_blocked = reason.is_some();
        node.blocking_reason = reason;
    }
    graph.stats.blocked_actions = records.len();

    log_changes!(verbosity, "Blockage scan: {} blocked actions", records.len());
    records
}

/// Every blockage upstream of `node_id`, walking blocking predecessors transitively.
///
/// Records come in breadth-first order starting with the node's own blockers.
/// An unknown id yields an empty chain.
pub fn get_blockage_chain(graph: &InterdependencyGraph, node_id: &str) -> Vec<BlockageRecord> {
    let Some(start) = graph.index_of(node_id) else {
        return Vec::new();
    };
    let adjacency = Adjacency::new(graph);
    let mut records = Vec::new();
    let mut visited: FxHashSet<usize> = FxHashSet::default();
    let mut queue: VecDeque<usize> = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(idx) = queue.pop_front() {
        for edge_idx in blocking_edges(graph, &adjacency, idx, None) {
            records.push(record_for(graph, &adjacency, edge_idx));
            let source = adjacency.source(edge_idx);
            if visited.insert(source) {
                queue.push_back(source);
            }
        }
    }

    records
}

/// Actions that would have no blocker left if `finished_id` were finished now.
///
/// Only actions currently blocked by `finished_id` qualify; ids come back in
/// input order.
pub fn get_unblockable_actions(graph: &InterdependencyGraph, finished_id: &str) -> Vec<String> {
    let Some(finished) = graph.index_of(finished_id) else {
        return Vec::new();
    };
    let adjacency = Adjacency::new(graph);

    let mut candidates: Vec<usize> = adjacency.outgoing[finished]
        .iter()
        .map(|&edge_idx| adjacency.target(edge_idx))
        .filter(|&target| {
            blocking_edges(graph, &adjacency, target, None)
                .iter()
                .any(|&edge_idx| adjacency.source(edge_idx) == finished)
        })
        .filter(|&target| {
            blocking_edges(
                graph,
                &adjacency,
                target,
                Some((finished, ActionStatus::Finished)),
            )
            .is_empty()
        })
        .collect();
    candidates.sort_unstable();
    candidates.dedup();

    candidates
        .into_iter()
        .map(|idx| graph.nodes()[idx].id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_dependency_graph;
    use crate::models::{DependencyRef, WorkItem};
    use chrono::NaiveDate;

    fn make_item(
        id: &str,
        status: ActionStatus,
        preds: Vec<(&str, LinkType)>,
    ) -> WorkItem {
        let mut item = WorkItem::new(id, format!("Action {}", id.to_uppercase()), 1.0);
        item.status = status;
        item.predecessors = preds
            .into_iter()
            .map(|(target, link_type)| DependencyRef {
                target_id: target.to_string(),
                link_type,
                lag_days: 0.0,
            })
            .collect();
        item
    }

    fn build(items: &[WorkItem]) -> InterdependencyGraph {
        build_dependency_graph(items, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap())
    }

    fn scan(items: &[WorkItem]) -> (InterdependencyGraph, Vec<BlockageRecord>) {
        let mut graph = build(items);
        let records = detect_blockages(&mut graph, &EngineConfig::default());
        (graph, records)
    }

    #[test]
    fn test_finished_predecessor_does_not_block() {
        let (graph, records) = scan(&[
            make_item("a", ActionStatus::Finished, vec![]),
            make_item("b", ActionStatus::NotStarted, vec![("a", LinkType::FinishToStart)]),
        ]);
        assert!(records.is_empty());
        assert!(!graph.node("b").unwrap().is_blocked);
        assert_eq!(graph.stats.blocked_actions, 0);
    }

    #[test]
    fn test_unfinished_predecessor_blocks() {
        let (graph, records) = scan(&[
            make_item("a", ActionStatus::NotStarted, vec![]),
            make_item("b", ActionStatus::NotStarted, vec![("a", LinkType::FinishToStart)]),
        ]);

        let b = graph.node("b").unwrap();
        assert!(b.is_blocked);
        let reason = b.blocking_reason.as_deref().unwrap();
        assert!(reason.contains("Action A"));
        assert!(reason.contains("(a)"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].blocking_id, "a");
        assert_eq!(records[0].blocked_title, "Action B");
        assert_eq!(graph.stats.blocked_actions, 1);
    }

    #[test]
    fn test_cancelled_predecessor_releases_finish_to_start() {
        let (graph, _) = scan(&[
            make_item("a", ActionStatus::Cancelled, vec![]),
            make_item("b", ActionStatus::NotStarted, vec![("a", LinkType::FinishToStart)]),
        ]);
        assert!(!graph.node("b").unwrap().is_blocked);
    }

    #[test]
    fn test_start_to_start_needs_started_predecessor() {
        let (graph, records) = scan(&[
            make_item("a", ActionStatus::InProgress, vec![]),
            make_item("b", ActionStatus::NotStarted, vec![("a", LinkType::StartToStart)]),
            make_item("c", ActionStatus::Waiting, vec![]),
            make_item("d", ActionStatus::NotStarted, vec![("c", LinkType::StartToStart)]),
        ]);

        assert!(!graph.node("b").unwrap().is_blocked);
        assert!(graph.node("d").unwrap().is_blocked);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link_type, LinkType::StartToStart);
        assert!(records[0].reason.contains("to start"));
    }

    #[test]
    fn test_finish_links_never_block() {
        let (graph, records) = scan(&[
            make_item("a", ActionStatus::NotStarted, vec![]),
            make_item("b", ActionStatus::NotStarted, vec![("a", LinkType::FinishToFinish)]),
            make_item("c", ActionStatus::NotStarted, vec![("a", LinkType::StartToFinish)]),
        ]);
        assert!(records.is_empty());
        assert!(graph.nodes().iter().all(|n| !n.is_blocked));
    }

    #[test]
    fn test_terminal_actions_are_never_blocked() {
        let (graph, records) = scan(&[
            make_item("a", ActionStatus::NotStarted, vec![]),
            make_item("b", ActionStatus::Finished, vec![("a", LinkType::FinishToStart)]),
            make_item("c", ActionStatus::Cancelled, vec![("a", LinkType::FinishToStart)]),
        ]);
        assert!(records.is_empty());
        assert!(!graph.node("b").unwrap().is_blocked);
        assert!(!graph.node("c").unwrap().is_blocked);
    }

    #[test]
    fn test_only_first_blocker_recorded() {
        let (graph, records) = scan(&[
            make_item("a", ActionStatus::NotStarted, vec![]),
            make_item("b", ActionStatus::InProgress, vec![]),
            make_item(
                "c",
                ActionStatus::NotStarted,
                vec![("a", LinkType::FinishToStart), ("b", LinkType::FinishToStart)],
            ),
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].blocking_id, "a");
        assert_eq!(graph.stats.blocked_actions, 1);
    }

    #[test]
    fn test_rescan_clears_stale_flags() {
        let items = vec![
            make_item("a", ActionStatus::NotStarted, vec![]),
            make_item("b", ActionStatus::NotStarted, vec![("a", LinkType::FinishToStart)]),
        ];
        let (mut graph, _) = scan(&items);
        assert!(graph.node("b").unwrap().is_blocked);

        graph.node_mut("a").unwrap().item.status = ActionStatus::Finished;
        let records = detect_blockages(&mut graph, &EngineConfig::default());
        assert!(records.is_empty());
        let b = graph.node("b").unwrap();
        assert!(!b.is_blocked);
        assert!(b.blocking_reason.is_none());
    }

    #[test]
    fn test_blockage_chain_walks_ancestors() {
        let graph = build(&[
            make_item("a", ActionStatus::NotStarted, vec![]),
            make_item("b", ActionStatus::NotStarted, vec![("a", LinkType::FinishToStart)]),
            make_item("x", ActionStatus::Waiting, vec![]),
            make_item(
                "c",
                ActionStatus::NotStarted,
                vec![("b", LinkType::FinishToStart), ("x", LinkType::StartToStart)],
            ),
        ]);

        let chain = get_blockage_chain(&graph, "c");
        let pairs: Vec<(&str, &str)> = chain
            .iter()
            .map(|r| (r.blocking_id.as_str(), r.blocked_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("b", "c"), ("x", "c"), ("a", "b")]);
        assert!(get_blockage_chain(&graph, "a").is_empty());
        assert!(get_blockage_chain(&graph, "missing").is_empty());
    }

    #[test]
    fn test_blockage_chain_terminates_on_cycle() {
        let graph = build(&[
            make_item("a", ActionStatus::NotStarted, vec![("b", LinkType::FinishToStart)]),
            make_item("b", ActionStatus::NotStarted, vec![("a", LinkType::FinishToStart)]),
        ]);
        assert_eq!(get_blockage_chain(&graph, "a").len(), 2);
    }

    #[test]
    fn test_unblockable_actions() {
        let graph = build(&[
            make_item("x", ActionStatus::InProgress, vec![]),
            make_item("w", ActionStatus::NotStarted, vec![]),
            make_item("only_x", ActionStatus::NotStarted, vec![("x", LinkType::FinishToStart)]),
            make_item(
                "x_and_w",
                ActionStatus::NotStarted,
                vec![("x", LinkType::FinishToStart), ("w", LinkType::FinishToStart)],
            ),
            // Already satisfied: x is in progress
            make_item("starts_with_x", ActionStatus::NotStarted, vec![("x", LinkType::StartToStart)]),
        ]);

        assert_eq!(get_unblockable_actions(&graph, "x"), vec!["only_x".to_string()]);
        assert!(get_unblockable_actions(&graph, "only_x").is_empty());
        assert!(get_unblockable_actions(&graph, "ghost").is_empty());
    }
}
