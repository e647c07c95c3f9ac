//! Critical path calculation using forward and backward passes.

use crate::config::EngineConfig;
use crate::graph::{shift_date, Adjacency, DependencyEdge, DependencyNode, InterdependencyGraph};
use crate::models::LinkType;
use crate::{log_changes, log_checks, log_debug};

use super::ordering::{find_cycle_nodes, topological_indices};

/// What an incoming link requires of its successor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Constraint {
    /// Successor may not start before this offset.
    Start(f64),
    /// Successor may not finish before this offset.
    Finish(f64),
}

/// Constraint a predecessor with the given start/finish imposes through a link.
pub(crate) fn successor_constraint(
    link_type: LinkType,
    source_start: f64,
    source_finish: f64,
    lag_days: f64,
) -> Constraint {
    match link_type {
        LinkType::FinishToStart => Constraint::Start(source_finish + lag_days),
        LinkType::StartToStart => Constraint::Start(source_start + lag_days),
        LinkType::FinishToFinish => Constraint::Finish(source_finish + lag_days),
        LinkType::StartToFinish => Constraint::Finish(source_start + lag_days),
    }
}

/// Latest finish a predecessor may have so that its successor keeps its late dates.
///
/// Mirror image of [`successor_constraint`]: start-anchored links constrain the
/// predecessor's start, so its duration is added back.
pub(crate) fn predecessor_latest_finish(
    link_type: LinkType,
    target_latest_start: f64,
    target_latest_finish: f64,
    lag_days: f64,
    source_duration: f64,
) -> f64 {
    match link_type {
        LinkType::FinishToStart => target_latest_start - lag_days,
        LinkType::StartToStart => target_latest_start - lag_days + source_duration,
        LinkType::FinishToFinish => target_latest_finish - lag_days,
        LinkType::StartToFinish => target_latest_finish - lag_days + source_duration,
    }
}

/// Annotate the graph in place with ES/EF/LS/LF, slack, criticality and the critical path.
///
/// Cycles do not abort the calculation: they are recorded in `stats` and each
/// cycle is broken at its earliest seeded member. Every value stays finite;
/// only cycle members and nodes downstream of them get unreliable slack.
///
/// Running this twice on the same graph yields identical timings: the forward
/// pass always restarts from the seeded values.
pub fn calculate_critical_path(graph: &mut InterdependencyGraph, config: &EngineConfig) {
    let verbosity = config.verbosity;
    let adjacency = Adjacency::new(graph);

    let cycle_indices = find_cycle_nodes(&adjacency);
    graph.stats.has_cycles = !cycle_indices.is_empty();
    graph.stats.cycle_nodes = cycle_indices
        .iter()
        .map(|&idx| graph.nodes[idx].id.clone())
        .collect();
    if graph.stats.has_cycles {
        log_changes!(
            verbosity,
            "Dependency cycle detected through {:?}; critical path is unreliable for these nodes",
            graph.stats.cycle_nodes
        );
    }

    let topo = topological_indices(graph, &adjacency);
    if !topo.is_complete {
        log_checks!(verbosity, "Topological sort stalled on a cycle, forcing in earliest seeded members");
    }

    forward_pass(&mut graph.nodes, &graph.edges, &adjacency, &topo.order, verbosity);
    let project_end = graph.max_earliest_finish();
    backward_pass(
        &mut graph.nodes,
        &graph.edges,
        &adjacency,
        &topo.order,
        project_end,
        verbosity,
    );

    let tolerance = config.critical_tolerance;
    for node in graph.nodes.iter_mut() {
        node.slack = node.latest_start - node.earliest_start;
        node.is_critical = node.slack.abs() < tolerance;
    }
    for (edge_idx, edge) in graph.edges.iter_mut().enumerate() {
        let (source, target) = adjacency.ends[edge_idx];
        edge.is_critical = source != usize::MAX
            && graph.nodes[source].is_critical
            && graph.nodes[target].is_critical;
    }

    graph.critical_path = topo
        .order
        .iter()
        .filter(|&&idx| graph.nodes[idx].is_critical)
        .map(|&idx| graph.nodes[idx].id.clone())
        .collect();
    graph.total_duration = project_end;
    graph.project_end = shift_date(graph.project_start, project_end);
    graph.stats.total_actions = graph.nodes.len();
    graph.stats.critical_actions = graph.critical_path.len();

    log_changes!(
        verbosity,
        "Critical path: {} of {} nodes, project length {} days",
        graph.critical_path.len(),
        graph.nodes.len(),
        project_end
    );
}

/// Forward pass: earliest start/finish in topological order.
fn forward_pass(
    nodes: &mut [DependencyNode],
    edges: &[DependencyEdge],
    adjacency: &Adjacency,
    order: &[usize],
    verbosity: u8,
) {
    // Restart from the seed so predecessors not yet visited (cycles) are well defined
    for node in nodes.iter_mut() {
        node.earliest_start = node.seed_start;
        node.earliest_finish = node.seed_start + node.duration;
    }

    for &idx in order {
        let duration = nodes[idx].duration;

        let earliest_start = if adjacency.is_root(idx) {
            nodes[idx].seed_start
        } else {
            let mut start_constraint = 0.0_f64;
            let mut finish_constraint: Option<f64> = None;

            for &edge_idx in &adjacency.incoming[idx] {
                let edge = &edges[edge_idx];
                let source = &nodes[adjacency.source(edge_idx)];
                match successor_constraint(
                    edge.link_type,
                    source.earliest_start,
                    source.earliest_finish,
                    edge.lag_days,
                ) {
                    Constraint::Start(value) => start_constraint = start_constraint.max(value),
                    Constraint::Finish(value) => {
                        finish_constraint = Some(finish_constraint.map_or(value, |c| c.max(value)));
                    }
                }
            }

            match finish_constraint {
                Some(finish) => finish.max(start_constraint + duration) - duration,
                None => start_constraint.max(0.0),
            }
        };

        let node = &mut nodes[idx];
        node.earliest_start = earliest_start + node.start_delay;
        node.earliest_finish = node.earliest_start + duration;

        log_debug!(
            verbosity,
            "  forward {}: ES={} EF={}",
            node.id,
            node.earliest_start,
            node.earliest_finish
        );
    }
}

/// Backward pass: latest start/finish in reverse topological order.
fn backward_pass(
    nodes: &mut [DependencyNode],
    edges: &[DependencyEdge],
    adjacency: &Adjacency,
    order: &[usize],
    project_end: f64,
    verbosity: u8,
) {
    for node in nodes.iter_mut() {
        node.latest_finish = project_end;
        node.latest_start = project_end - node.duration;
    }

    for &idx in order.iter().rev() {
        let duration = nodes[idx].duration;

        // Leaves finish with the project; nobody may finish after it either
        let latest_finish = adjacency.outgoing[idx]
            .iter()
            .map(|&edge_idx| {
                let edge = &edges[edge_idx];
                let target = &nodes[adjacency.target(edge_idx)];
                // The target's own slip does not eat into its predecessors' float
                predecessor_latest_finish(
                    edge.link_type,
                    target.latest_start - target.start_delay,
                    target.latest_finish - target.start_delay,
                    edge.lag_days,
                    duration,
                )
            })
            .fold(project_end, f64::min);

        let node = &mut nodes[idx];
        node.latest_finish = latest_finish;
        node.latest_start = latest_finish - duration;

        log_debug!(
            verbosity,
            "  backward {}: LS={} LF={}",
            node.id,
            node.latest_start,
            node.latest_finish
        );
    }
}

/// Recalculate a deep copy of the graph with one node starting `delay_days` late.
///
/// The node's start is pushed back past whatever its links allow and its
/// successors follow through the forward pass. Predecessors keep their float:
/// the slip is the node's own, not something they could absorb. The baseline
/// graph is left untouched. An unknown id or a non-positive delay yields a
/// plain recalculated copy.
pub fn recalculate_with_delay(
    graph: &InterdependencyGraph,
    node_id: &str,
    delay_days: f64,
    config: &EngineConfig,
) -> InterdependencyGraph {
    let mut copy = graph.clone();
    match copy.node_mut(node_id) {
        Some(node) if delay_days.is_finite() && delay_days > 0.0 => {
            node.start_delay += delay_days;
        }
        Some(_) => {}
        None => {
            log_checks!(config.verbosity, "Delay requested for unknown node {:?}", node_id);
        }
    }
    calculate_critical_path(&mut copy, config);
    copy
}
