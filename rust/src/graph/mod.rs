//! Dependency graph types shared by every pass of the engine.
//!
//! Nodes live in an arena in input order and are addressed by a dense index;
//! the string id index is only used at the boundaries. Edges are plain records
//! over ids, so a deep copy of the graph is a structural clone.

use chrono::{Days, NaiveDate};
use pyo3::prelude::*;
use rustc_hash::FxHashMap;

use crate::models::{ActionStatus, LinkType, WorkItem};

mod builder;

pub use builder::{build_dependency_graph, build_dependency_graph_with_config};

/// A work item plus everything the engine computes for it.
#[pyclass]
#[derive(Clone, Debug)]
pub struct DependencyNode {
    #[pyo3(get)]
    pub id: String,
    /// Read-only view of the originating work item.
    #[pyo3(get)]
    pub item: WorkItem,
    /// Planned duration in days (always >= 1).
    #[pyo3(get)]
    pub duration: f64,
    /// Start offset derived from the declared dates; roots keep it in the forward pass.
    #[pyo3(get)]
    pub seed_start: f64,
    /// Imposed slip of the start on top of what the links allow (delay scenarios).
    #[pyo3(get)]
    pub start_delay: f64,
    #[pyo3(get)]
    pub earliest_start: f64,
    #[pyo3(get)]
    pub earliest_finish: f64,
    #[pyo3(get)]
    pub latest_start: f64,
    #[pyo3(get)]
    pub latest_finish: f64,
    #[pyo3(get)]
    pub slack: f64,
    #[pyo3(get)]
    pub is_critical: bool,
    #[pyo3(get)]
    pub is_blocked: bool,
    #[pyo3(get)]
    pub blocking_reason: Option<String>,
    #[pyo3(get)]
    pub x: f64,
    #[pyo3(get)]
    pub y: f64,
    #[pyo3(get)]
    pub level: usize,
}

impl DependencyNode {
    /// Build a node from a work item, seeding ES/EF from its declared dates.
    pub fn from_item(item: &WorkItem, project_start: NaiveDate) -> Self {
        let duration = item.planned_duration();
        let seed_start = item
            .start_date
            .map(|start| ((start - project_start).num_days() as f64).max(0.0))
            .unwrap_or(0.0);

        Self {
            id: item.id.clone(),
            item: item.clone(),
            duration,
            seed_start,
            start_delay: 0.0,
            earliest_start: seed_start,
            earliest_finish: seed_start + duration,
            latest_start: seed_start,
            latest_finish: seed_start + duration,
            slack: 0.0,
            is_critical: false,
            is_blocked: false,
            blocking_reason: None,
            x: 0.0,
            y: 0.0,
            level: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.item.title
    }

    pub fn status(&self) -> ActionStatus {
        self.item.status
    }
}

#[pymethods]
impl DependencyNode {
    fn __repr__(&self) -> String {
        format!(
            "DependencyNode(id={:?}, es={}, ef={}, slack={}, critical={}, blocked={})",
            self.id,
            self.earliest_start,
            self.earliest_finish,
            self.slack,
            self.is_critical,
            self.is_blocked
        )
    }
}

/// A typed precedence link between two nodes.
///
/// `is_critical` only says that both endpoints are critical. That is necessary
/// but not sufficient for the edge to drive the critical path: two critical
/// nodes can be linked by an edge with positive free float.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct DependencyEdge {
    #[pyo3(get)]
    pub source_id: String,
    #[pyo3(get)]
    pub target_id: String,
    #[pyo3(get)]
    pub link_type: LinkType,
    #[pyo3(get)]
    pub lag_days: f64,
    #[pyo3(get)]
    pub is_critical: bool,
}

#[pymethods]
impl DependencyEdge {
    fn __repr__(&self) -> String {
        format!(
            "DependencyEdge({} -{}({})-> {}, critical={})",
            self.source_id, self.link_type, self.lag_days, self.target_id, self.is_critical
        )
    }
}

/// Aggregate counters over the graph.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphStats {
    #[pyo3(get)]
    pub total_actions: usize,
    #[pyo3(get)]
    pub blocked_actions: usize,
    #[pyo3(get)]
    pub critical_actions: usize,
    /// When set, slack and criticality of `cycle_nodes` are unreliable.
    #[pyo3(get)]
    pub has_cycles: bool,
    #[pyo3(get)]
    pub cycle_nodes: Vec<String>,
}

/// The engine's graph: node arena, edge list and derived aggregates.
#[pyclass]
#[derive(Clone, Debug)]
pub struct InterdependencyGraph {
    pub(crate) nodes: Vec<DependencyNode>,
    pub(crate) edges: Vec<DependencyEdge>,
    index: FxHashMap<String, usize>,
    /// Critical node ids in topological order.
    #[pyo3(get)]
    pub critical_path: Vec<String>,
    /// Project length in days (max earliest finish).
    #[pyo3(get)]
    pub total_duration: f64,
    #[pyo3(get)]
    pub project_start: NaiveDate,
    #[pyo3(get)]
    pub project_end: NaiveDate,
    #[pyo3(get)]
    pub stats: GraphStats,
}

impl InterdependencyGraph {
    pub(crate) fn new(project_start: NaiveDate) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            index: FxHashMap::default(),
            critical_path: Vec::new(),
            total_duration: 0.0,
            project_start,
            project_end: project_start,
            stats: GraphStats::default(),
        }
    }

    /// Add a node; returns false (and keeps the existing node) for a duplicate id.
    pub(crate) fn push_node(&mut self, node: DependencyNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&DependencyNode> {
        self.index_of(id).map(|idx| &self.nodes[idx])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut DependencyNode> {
        let idx = self.index_of(id)?;
        self.nodes.get_mut(idx)
    }

    pub fn edge(&self, source_id: &str, target_id: &str) -> Option<&DependencyEdge> {
        self.edges
            .iter()
            .find(|e| e.source_id == source_id && e.target_id == target_id)
    }

    /// Max earliest finish over all nodes, 0 for an empty graph.
    pub fn max_earliest_finish(&self) -> f64 {
        self.nodes
            .iter()
            .map(|n| n.earliest_finish)
            .fold(0.0, f64::max)
    }
}

#[pymethods]
impl InterdependencyGraph {
    #[getter(nodes)]
    fn py_nodes(&self) -> Vec<DependencyNode> {
        self.nodes.clone()
    }

    #[getter(edges)]
    fn py_edges(&self) -> Vec<DependencyEdge> {
        self.edges.clone()
    }

    #[pyo3(name = "node")]
    fn py_node(&self, id: &str) -> Option<DependencyNode> {
        self.node(id).cloned()
    }

    fn __len__(&self) -> usize {
        self.nodes.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "InterdependencyGraph(nodes={}, edges={}, critical_path={}, has_cycles={})",
            self.nodes.len(),
            self.edges.len(),
            self.critical_path.len(),
            self.stats.has_cycles
        )
    }
}

/// Index-based adjacency over a graph's edge list.
///
/// `outgoing[i]` / `incoming[i]` hold edge indices, in edge order.
#[derive(Debug, Clone)]
pub struct Adjacency {
    pub outgoing: Vec<Vec<usize>>,
    pub incoming: Vec<Vec<usize>>,
    /// (source index, target index) per edge.
    pub ends: Vec<(usize, usize)>,
}

impl Adjacency {
    pub fn new(graph: &InterdependencyGraph) -> Self {
        let n = graph.nodes.len();
        let mut outgoing = vec![Vec::new(); n];
        let mut incoming = vec![Vec::new(); n];
        let mut ends = Vec::with_capacity(graph.edges.len());

        for (edge_idx, edge) in graph.edges.iter().enumerate() {
            let (Some(source), Some(target)) =
                (graph.index_of(&edge.source_id), graph.index_of(&edge.target_id))
            else {
                // Keep edge indices aligned even if an edge dangles
                ends.push((usize::MAX, usize::MAX));
                continue;
            };
            outgoing[source].push(edge_idx);
            incoming[target].push(edge_idx);
            ends.push((source, target));
        }

        Self {
            outgoing,
            incoming,
            ends,
        }
    }

    #[inline]
    pub fn source(&self, edge_idx: usize) -> usize {
        self.ends[edge_idx].0
    }

    #[inline]
    pub fn target(&self, edge_idx: usize) -> usize {
        self.ends[edge_idx].1
    }

    pub fn is_root(&self, node_idx: usize) -> bool {
        self.incoming[node_idx].is_empty()
    }

    pub fn is_leaf(&self, node_idx: usize) -> bool {
        self.outgoing[node_idx].is_empty()
    }
}

/// Shift a calendar date by a day offset, rounding partial days up.
pub(crate) fn shift_date(date: NaiveDate, days: f64) -> NaiveDate {
    if !days.is_finite() {
        return date;
    }
    let whole = days.ceil() as i64;
    let shifted = if whole >= 0 {
        date.checked_add_days(Days::new(whole as u64))
    } else {
        date.checked_sub_days(Days::new(whole.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    #[test]
    fn test_seed_from_declared_start() {
        let mut item = WorkItem::new("a", "A", 3.0);
        item.start_date = NaiveDate::from_ymd_opt(2025, 1, 10);
        let node = DependencyNode::from_item(&item, start());
        assert_eq!(node.seed_start, 4.0);
        assert_eq!(node.earliest_finish, 7.0);

        // Dates before the project start clamp to offset 0
        item.start_date = NaiveDate::from_ymd_opt(2024, 12, 1);
        let node = DependencyNode::from_item(&item, start());
        assert_eq!(node.seed_start, 0.0);
    }

    #[test]
    fn test_push_node_rejects_duplicates() {
        let mut graph = InterdependencyGraph::new(start());
        assert!(graph.push_node(DependencyNode::from_item(&WorkItem::new("a", "A", 1.0), start())));
        assert!(!graph.push_node(DependencyNode::from_item(&WorkItem::new("a", "Again", 5.0), start())));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node("a").unwrap().title(), "A");
    }

    #[test]
    fn test_shift_date_rounds_up() {
        assert_eq!(shift_date(start(), 2.2), NaiveDate::from_ymd_opt(2025, 1, 9).unwrap());
        assert_eq!(shift_date(start(), -1.0), NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
        assert_eq!(shift_date(start(), f64::NAN), start());
    }
}
