//! Build an interdependency graph from declared work items.

use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use crate::config::EngineConfig;
use crate::models::{DependencyRef, WorkItem};
use crate::{log_changes, log_checks};

use super::{DependencyEdge, DependencyNode, InterdependencyGraph};

/// Build the graph with the default (silent) configuration.
pub fn build_dependency_graph(items: &[WorkItem], project_start: NaiveDate) -> InterdependencyGraph {
    build_dependency_graph_with_config(items, project_start, &EngineConfig::default())
}

/// Build the graph from a flat list of work items.
///
/// Edges are the union of every item's predecessor references and every
/// item's successor references, keyed by `(source, target)`: a predecessor
/// declaration and its mirrored successor declaration collapse into one edge,
/// and the first declaration wins. References to unknown ids and self
/// references are dropped.
///
/// Node ES/EF are seeded from the declared dates; they are provisional until
/// the critical path pass runs.
pub fn build_dependency_graph_with_config(
    items: &[WorkItem],
    project_start: NaiveDate,
    config: &EngineConfig,
) -> InterdependencyGraph {
    let verbosity = config.verbosity;
    let mut graph = InterdependencyGraph::new(project_start);

    for item in items {
        if !graph.push_node(DependencyNode::from_item(item, project_start)) {
            log_checks!(verbosity, "Duplicate work item id {:?} ignored", item.id);
        }
    }

    let mut seen: FxHashSet<(String, String)> = FxHashSet::default();
    let mut dropped = 0usize;

    for item in items {
        for pred in &item.predecessors {
            if !add_edge(&mut graph, &mut seen, &pred.target_id, &item.id, pred) {
                dropped += 1;
            }
        }
        for succ in &item.successors {
            if !add_edge(&mut graph, &mut seen, &item.id, &succ.target_id, succ) {
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        log_checks!(
            verbosity,
            "Dropped {} dangling or self references while building graph",
            dropped
        );
    }

    graph.total_duration = graph.max_earliest_finish();
    graph.project_end = super::shift_date(project_start, graph.total_duration);
    graph.stats.total_actions = graph.nodes.len();

    log_changes!(
        verbosity,
        "Built graph: {} nodes, {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );

    graph
}

/// Add `source -> target` unless it dangles or duplicates an existing pair.
///
/// Returns false only when the reference is malformed; a duplicate is not an error.
fn add_edge(
    graph: &mut InterdependencyGraph,
    seen: &mut FxHashSet<(String, String)>,
    source_id: &str,
    target_id: &str,
    reference: &DependencyRef,
) -> bool {
    if source_id == target_id || !graph.contains(source_id) || !graph.contains(target_id) {
        return false;
    }
    if !seen.insert((source_id.to_string(), target_id.to_string())) {
        return true;
    }
    graph.edges.push(DependencyEdge {
        source_id: source_id.to_string(),
        target_id: target_id.to_string(),
        link_type: reference.link_type,
        lag_days: if reference.lag_days.is_finite() {
            reference.lag_days
        } else {
            0.0
        },
        is_critical: false,
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkType;

    fn project_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    fn make_item(id: &str, duration: f64, preds: Vec<(&str, LinkType, f64)>) -> WorkItem {
        let mut item = WorkItem::new(id, id.to_uppercase(), duration);
        item.predecessors = preds
            .into_iter()
            .map(|(target, link_type, lag)| DependencyRef {
                target_id: target.to_string(),
                link_type,
                lag_days: lag,
            })
            .collect();
        item
    }

    #[test]
    fn test_reciprocal_declarations_collapse() {
        let mut a = make_item("a", 2.0, vec![]);
        a.successors.push(DependencyRef::finish_to_start("b"));
        let b = make_item("b", 3.0, vec![("a", LinkType::FinishToStart, 0.0)]);

        let graph = build_dependency_graph(&[a, b], project_start());

        assert_eq!(graph.edges().len(), 1);
        let edge = graph.edge("a", "b").unwrap();
        assert_eq!(edge.link_type, LinkType::FinishToStart);
    }

    #[test]
    fn test_first_declaration_wins() {
        let a = make_item("a", 2.0, vec![]);
        let mut b = make_item("b", 3.0, vec![("a", LinkType::StartToStart, 1.0)]);
        b.predecessors.push(DependencyRef::finish_to_start("a"));

        let graph = build_dependency_graph(&[a, b], project_start());

        assert_eq!(graph.edges().len(), 1);
        let edge = graph.edge("a", "b").unwrap();
        assert_eq!(edge.link_type, LinkType::StartToStart);
        assert_eq!(edge.lag_days, 1.0);
    }

    #[test]
    fn test_unknown_and_self_references_dropped() {
        let a = make_item(
            "a",
            2.0,
            vec![
                ("ghost", LinkType::FinishToStart, 0.0),
                ("a", LinkType::FinishToStart, 0.0),
            ],
        );
        let mut b = make_item("b", 1.0, vec![("a", LinkType::FinishToStart, 0.0)]);
        b.successors.push(DependencyRef::finish_to_start("missing"));

        let graph = build_dependency_graph(&[a, b], project_start());

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().len(), 1);
        assert!(graph.edge("a", "b").is_some());
    }

    #[test]
    fn test_opposite_directions_are_distinct_pairs() {
        let a = make_item("a", 1.0, vec![("b", LinkType::FinishToStart, 0.0)]);
        let b = make_item("b", 1.0, vec![("a", LinkType::FinishToStart, 0.0)]);

        let graph = build_dependency_graph(&[a, b], project_start());

        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let graph = build_dependency_graph(&[], project_start());
        assert!(graph.is_empty());
        assert_eq!(graph.total_duration, 0.0);
        assert_eq!(graph.project_end, project_start());
        assert_eq!(graph.stats.total_actions, 0);
    }

    #[test]
    fn test_seed_durations() {
        let graph = build_dependency_graph(&[make_item("a", 0.0, vec![])], project_start());
        let node = graph.node("a").unwrap();
        assert_eq!(node.duration, 1.0);
        assert_eq!(node.earliest_start, 0.0);
        assert_eq!(node.earliest_finish, 1.0);
    }
}
