//! Rust implementation of the task interdependency engine.
//!
//! Builds a dependency graph from work items, runs the Critical Path Method
//! over it, flags blocked actions, simulates delays and lays the graph out
//! for rendering. Everything is exposed to Python through the `rust` module.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::prelude::*;

pub mod blockage;
mod config;
pub mod critical_path;
pub mod graph;
pub mod layout;
pub mod logging;
mod models;
pub mod what_if;

pub use blockage::{
    detect_blockages, get_blockage_chain, get_unblockable_actions, link_blocks, BlockageRecord,
};
pub use config::{EngineConfig, LayoutConfig};
pub use critical_path::{
    calculate_critical_path, detect_cycles, recalculate_with_delay, topological_order,
};
pub use graph::{
    build_dependency_graph, build_dependency_graph_with_config, DependencyEdge, DependencyNode,
    GraphStats, InterdependencyGraph,
};
pub use layout::{apply_layout, compute_edge_paths, EdgePath, LayoutBounds, Point};
pub use models::{ActionStatus, DependencyRef, LinkType, ModelError, WorkItem};
pub use what_if::{calculate_date_impact, simulate_delay, ImpactedAction, WhatIfResult};

/// Everything the dependency view needs, computed in one go.
#[pyclass]
#[derive(Clone, Debug)]
pub struct InterdependencyAnalysis {
    #[pyo3(get)]
    pub graph: InterdependencyGraph,
    #[pyo3(get)]
    pub blockages: Vec<BlockageRecord>,
    #[pyo3(get)]
    pub edge_paths: Vec<EdgePath>,
    #[pyo3(get)]
    pub bounds: LayoutBounds,
}

#[pymethods]
impl InterdependencyAnalysis {
    fn __repr__(&self) -> String {
        format!(
            "InterdependencyAnalysis(nodes={}, critical={}, blocked={}, cycles={})",
            self.graph.len(),
            self.graph.stats.critical_actions,
            self.graph.stats.blocked_actions,
            self.graph.stats.has_cycles
        )
    }
}

/// Build, schedule, scan for blockages and lay out the graph.
///
/// Layout only depends on topology, so it could run before the CPM pass; it
/// runs last so the edge paths carry the critical flags.
pub fn analyze_interdependencies(
    items: &[WorkItem],
    project_start: NaiveDate,
    engine: &EngineConfig,
    layout_config: &LayoutConfig,
) -> InterdependencyAnalysis {
    let mut graph = build_dependency_graph_with_config(items, project_start, engine);
    calculate_critical_path(&mut graph, engine);
    let blockages = detect_blockages(&mut graph, engine);
    let bounds = apply_layout(&mut graph, layout_config);
    let edge_paths = compute_edge_paths(&graph, layout_config);

    InterdependencyAnalysis {
        graph,
        blockages,
        edge_paths,
        bounds,
    }
}

/// Build a dependency graph without running any analysis.
///
/// Unknown and self references are dropped; reciprocal declarations collapse
/// into one edge.
#[pyfunction]
#[pyo3(signature = (items, project_start, config=None))]
fn build_graph(
    items: Vec<WorkItem>,
    project_start: NaiveDate,
    config: Option<EngineConfig>,
) -> InterdependencyGraph {
    build_dependency_graph_with_config(&items, project_start, &config.unwrap_or_default())
}

/// Run the full pipeline: graph, critical path, blockages, layout and edge routes.
#[pyfunction]
#[pyo3(signature = (items, project_start, engine=None, layout=None))]
fn analyze(
    items: Vec<WorkItem>,
    project_start: NaiveDate,
    engine: Option<EngineConfig>,
    layout: Option<LayoutConfig>,
) -> InterdependencyAnalysis {
    analyze_interdependencies(
        &items,
        project_start,
        &engine.unwrap_or_default(),
        &layout.unwrap_or_default(),
    )
}

/// Annotate the graph in place with earliest/latest dates, slack and the critical path.
#[pyfunction]
#[pyo3(name = "calculate_critical_path", signature = (graph, config=None))]
fn py_calculate_critical_path(
    mut graph: PyRefMut<'_, InterdependencyGraph>,
    config: Option<EngineConfig>,
) {
    calculate_critical_path(&mut graph, &config.unwrap_or_default());
}

/// Flag blocked actions in place and return one record per blocked action.
#[pyfunction]
#[pyo3(name = "detect_blockages", signature = (graph, config=None))]
fn py_detect_blockages(
    mut graph: PyRefMut<'_, InterdependencyGraph>,
    config: Option<EngineConfig>,
) -> Vec<BlockageRecord> {
    detect_blockages(&mut graph, &config.unwrap_or_default())
}

/// Position every node in place and return the layout's bounding box.
#[pyfunction]
#[pyo3(name = "apply_layout", signature = (graph, config=None))]
fn py_apply_layout(
    mut graph: PyRefMut<'_, InterdependencyGraph>,
    config: Option<LayoutConfig>,
) -> LayoutBounds {
    apply_layout(&mut graph, &config.unwrap_or_default())
}

#[pyfunction]
#[pyo3(name = "compute_edge_paths", signature = (graph, config=None))]
fn py_compute_edge_paths(
    graph: PyRef<'_, InterdependencyGraph>,
    config: Option<LayoutConfig>,
) -> Vec<EdgePath> {
    compute_edge_paths(&graph, &config.unwrap_or_default())
}

#[pyfunction]
#[pyo3(name = "detect_cycles")]
fn py_detect_cycles(graph: PyRef<'_, InterdependencyGraph>) -> Vec<String> {
    detect_cycles(&graph)
}

#[pyfunction]
#[pyo3(name = "topological_order")]
fn py_topological_order(graph: PyRef<'_, InterdependencyGraph>) -> Vec<String> {
    topological_order(&graph)
}

/// Simulate delaying one action; the graph passed in is not modified.
///
/// An unknown node id or a non-positive delay returns a zero-impact result.
#[pyfunction]
#[pyo3(name = "simulate_delay", signature = (graph, node_id, delay_days, config=None))]
fn py_simulate_delay(
    graph: PyRef<'_, InterdependencyGraph>,
    node_id: &str,
    delay_days: f64,
    config: Option<EngineConfig>,
) -> WhatIfResult {
    simulate_delay(&graph, node_id, delay_days, &config.unwrap_or_default())
}

/// Recalculated copy of the graph with one action slipping by `delay_days`.
#[pyfunction]
#[pyo3(name = "recalculate_with_delay", signature = (graph, node_id, delay_days, config=None))]
fn py_recalculate_with_delay(
    graph: PyRef<'_, InterdependencyGraph>,
    node_id: &str,
    delay_days: f64,
    config: Option<EngineConfig>,
) -> InterdependencyGraph {
    recalculate_with_delay(&graph, node_id, delay_days, &config.unwrap_or_default())
}

#[pyfunction]
fn blockage_chain(graph: PyRef<'_, InterdependencyGraph>, node_id: &str) -> Vec<BlockageRecord> {
    get_blockage_chain(&graph, node_id)
}

#[pyfunction]
fn unblockable_actions(graph: PyRef<'_, InterdependencyGraph>, node_id: &str) -> Vec<String> {
    get_unblockable_actions(&graph, node_id)
}

#[pyfunction]
fn date_impact(date: NaiveDate, delay_days: f64) -> NaiveDate {
    calculate_date_impact(date, delay_days)
}

/// The interdep.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Input data types
    m.add_class::<LinkType>()?;
    m.add_class::<ActionStatus>()?;
    m.add_class::<DependencyRef>()?;
    m.add_class::<WorkItem>()?;

    // Config types
    m.add_class::<EngineConfig>()?;
    m.add_class::<LayoutConfig>()?;

    // Graph and results
    m.add_class::<DependencyNode>()?;
    m.add_class::<DependencyEdge>()?;
    m.add_class::<GraphStats>()?;
    m.add_class::<InterdependencyGraph>()?;
    m.add_class::<BlockageRecord>()?;
    m.add_class::<ImpactedAction>()?;
    m.add_class::<WhatIfResult>()?;
    m.add_class::<Point>()?;
    m.add_class::<EdgePath>()?;
    m.add_class::<LayoutBounds>()?;
    m.add_class::<InterdependencyAnalysis>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(build_graph, m)?)?;
    m.add_function(wrap_pyfunction!(analyze, m)?)?;
    m.add_function(wrap_pyfunction!(py_calculate_critical_path, m)?)?;
    m.add_function(wrap_pyfunction!(py_detect_blockages, m)?)?;
    m.add_function(wrap_pyfunction!(py_apply_layout, m)?)?;
    m.add_function(wrap_pyfunction!(py_compute_edge_paths, m)?)?;
    m.add_function(wrap_pyfunction!(py_detect_cycles, m)?)?;
    m.add_function(wrap_pyfunction!(py_topological_order, m)?)?;
    m.add_function(wrap_pyfunction!(py_simulate_delay, m)?)?;
    m.add_function(wrap_pyfunction!(py_recalculate_with_delay, m)?)?;
    m.add_function(wrap_pyfunction!(blockage_chain, m)?)?;
    m.add_function(wrap_pyfunction!(unblockable_actions, m)?)?;
    m.add_function(wrap_pyfunction!(date_impact, m)?)?;

    Ok(())
}
