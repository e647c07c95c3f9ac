//! What-if simulation: how far a delay at one node ripples through the plan.
//!
//! The caller's graph is never modified. Propagation runs breadth first from
//! the delayed node over side tables; the new critical path comes from a
//! recalculated deep copy.

use chrono::NaiveDate;
use pyo3::prelude::*;
use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::critical_path::{recalculate_with_delay, successor_constraint, Constraint};
use crate::graph::{shift_date, Adjacency, InterdependencyGraph};
use crate::{log_changes, log_checks, log_debug};

/// A downstream node whose dates shift under the simulated delay.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct ImpactedAction {
    #[pyo3(get)]
    pub id: String,
    #[pyo3(get)]
    pub title: String,
    #[pyo3(get)]
    pub delay_days: f64,
    #[pyo3(get)]
    pub new_start: f64,
    #[pyo3(get)]
    pub new_finish: f64,
}

#[pymethods]
impl ImpactedAction {
    fn __repr__(&self) -> String {
        format!("ImpactedAction(id={:?}, delay_days={})", self.id, self.delay_days)
    }
}

#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct WhatIfResult {
    #[pyo3(get)]
    pub target_id: String,
    #[pyo3(get)]
    pub delay_days: f64,
    #[pyo3(get)]
    pub original_end: NaiveDate,
    #[pyo3(get)]
    pub new_end: NaiveDate,
    /// Project end shift in days, never negative.
    #[pyo3(get)]
    pub total_delay_days: f64,
    /// Sorted by delay (largest first), then id. Excludes the target itself.
    #[pyo3(get)]
    pub impacted_actions: Vec<ImpactedAction>,
    /// (source, target) of every edge that carried a positive delay.
    #[pyo3(get)]
    pub impacted_edges: Vec<(String, String)>,
    #[pyo3(get)]
    pub original_critical_path: Vec<String>,
    #[pyo3(get)]
    pub new_critical_path: Vec<String>,
    #[pyo3(get)]
    pub critical_path_affected: bool,
}

impl WhatIfResult {
    /// Zero impact, unchanged end, unchanged critical path.
    fn unchanged(graph: &InterdependencyGraph, target_id: &str, delay_days: f64) -> Self {
        let end = shift_date(graph.project_start, graph.max_earliest_finish());
        Self {
            target_id: target_id.to_string(),
            delay_days,
            original_end: end,
            new_end: end,
            total_delay_days: 0.0,
            impacted_actions: Vec::new(),
            impacted_edges: Vec::new(),
            original_critical_path: graph.critical_path.clone(),
            new_critical_path: graph.critical_path.clone(),
            critical_path_affected: false,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.total_delay_days == 0.0 && self.impacted_actions.is_empty()
    }
}

#[pymethods]
impl WhatIfResult {
    fn __repr__(&self) -> String {
        format!(
            "WhatIfResult(target={:?}, delay_days={}, total_delay_days={}, impacted={}, critical_path_affected={})",
            self.target_id,
            self.delay_days,
            self.total_delay_days,
            self.impacted_actions.len(),
            self.critical_path_affected
        )
    }
}

/// Simulate delaying `node_id` by `delay_days` on a CPM-annotated graph.
///
/// Each successor's delay is measured against its baseline ES/EF, so a slip
/// that fits within the successor's existing float stops there. Where several
/// impacted paths converge, the largest delay wins. The new critical path
/// comes from a copy recalculated with the same start slip, so on an acyclic
/// graph its project length matches `new_end`.
pub fn simulate_delay(
    graph: &InterdependencyGraph,
    node_id: &str,
    delay_days: f64,
    config: &EngineConfig,
) -> WhatIfResult {
    let verbosity = config.verbosity;
    let tolerance = config.critical_tolerance;

    let Some(target) = graph.index_of(node_id) else {
        log_checks!(verbosity, "What-if target {:?} not in graph, nothing to simulate", node_id);
        return WhatIfResult::unchanged(graph, node_id, delay_days);
    };
    if !delay_days.is_finite() || delay_days <= 0.0 {
        log_checks!(verbosity, "What-if delay {} for {:?} is not positive", delay_days, node_id);
        return WhatIfResult::unchanged(graph, node_id, delay_days);
    }

    let nodes = graph.nodes();
    let edges = graph.edges();
    let adjacency = Adjacency::new(graph);
    let n = nodes.len();

    let mut applied = vec![0.0_f64; n];
    let mut improvements = vec![0_usize; n];
    let mut edge_impacted = vec![false; edges.len()];
    let mut queue: VecDeque<(usize, f64)> = VecDeque::from([(target, delay_days)]);

    while let Some((idx, delay)) = queue.pop_front() {
        // A larger delay already went through here
        if delay <= applied[idx] + tolerance {
            continue;
        }
        // Bounds revisits so positive cycles terminate
        if improvements[idx] >= n {
            continue;
        }
        improvements[idx] += 1;
        applied[idx] = delay;

        let node = &nodes[idx];
        let new_start = node.earliest_start + delay;
        let new_finish = node.earliest_finish + delay;
        log_debug!(verbosity, "  what-if {}: +{} -> ES={} EF={}", node.id, delay, new_start, new_finish);

        for &edge_idx in &adjacency.outgoing[idx] {
            let edge = &edges[edge_idx];
            let succ_idx = adjacency.target(edge_idx);
            let successor = &nodes[succ_idx];

            let succ_delay =
                match successor_constraint(edge.link_type, new_start, new_finish, edge.lag_days) {
                    Constraint::Start(required) => required - successor.earliest_start,
                    Constraint::Finish(required) => required - successor.earliest_finish,
                };
            if succ_delay <= tolerance {
                continue;
            }

            edge_impacted[edge_idx] = true;
            if succ_delay > applied[succ_idx] + tolerance {
                queue.push_back((succ_idx, succ_delay));
            }
        }
    }

    let original_total = graph.max_earliest_finish();
    let new_total = nodes
        .iter()
        .zip(&applied)
        .map(|(node, delay)| node.earliest_finish + delay)
        .fold(0.0, f64::max);
    let total_delay_days = (new_total - original_total).max(0.0);

    let mut impacted_actions: Vec<ImpactedAction> = nodes
        .iter()
        .zip(&applied)
        .enumerate()
        .filter(|&(idx, (_, &delay))| idx != target && delay > 0.0)
        .map(|(_, (node, &delay))| ImpactedAction {
            id: node.id.clone(),
            title: node.title().to_string(),
            delay_days: delay,
            new_start: node.earliest_start + delay,
            new_finish: node.earliest_finish + delay,
        })
        .collect();
    impacted_actions.sort_by(|a, b| {
        b.delay_days
            .total_cmp(&a.delay_days)
            .then_with(|| a.id.cmp(&b.id))
    });

    let impacted_edges = edges
        .iter()
        .zip(&edge_impacted)
        .filter(|(_, &hit)| hit)
        .map(|(edge, _)| (edge.source_id.clone(), edge.target_id.clone()))
        .collect();

    let recalculated = recalculate_with_delay(graph, node_id, delay_days, config);
    let critical_path_affected = recalculated.critical_path != graph.critical_path;

    log_changes!(
        verbosity,
        "What-if {:?} +{} days: {} actions impacted, project end +{} days{}",
        node_id,
        delay_days,
        impacted_actions.len(),
        total_delay_days,
        if critical_path_affected { ", critical path changed" } else { "" }
    );

    WhatIfResult {
        target_id: node_id.to_string(),
        delay_days,
        original_end: shift_date(graph.project_start, original_total),
        new_end: shift_date(graph.project_start, new_total),
        total_delay_days,
        impacted_actions,
        impacted_edges,
        original_critical_path: graph.critical_path.clone(),
        new_critical_path: recalculated.critical_path,
        critical_path_affected,
    }
}

/// Calendar date after slipping `date` by `delay_days` (partial days round up).
pub fn calculate_date_impact(date: NaiveDate, delay_days: f64) -> NaiveDate {
    shift_date(date, delay_days)
}
