//! Layered left-to-right layout of the dependency graph.
//!
//! Pure topology: levels come from the longest path from any root, nodes are
//! ordered within a level by alternating barycenter sweeps, and edges are
//! routed as cubic Bezier curves from the right side of the source box to the
//! left side of the target box. CPM results are never read except for the
//! critical flag carried onto edge paths.

use pyo3::prelude::*;

use crate::config::LayoutConfig;
use crate::critical_path::topological_indices;
use crate::graph::{Adjacency, InterdependencyGraph};
use crate::{log_changes, log_debug};

#[pyclass]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    #[pyo3(get)]
    pub x: f64,
    #[pyo3(get)]
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[pymethods]
impl Point {
    fn __repr__(&self) -> String {
        format!("Point({}, {})", self.x, self.y)
    }
}

/// Cubic Bezier route for one edge.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct EdgePath {
    #[pyo3(get)]
    pub source_id: String,
    #[pyo3(get)]
    pub target_id: String,
    #[pyo3(get)]
    pub start: Point,
    #[pyo3(get)]
    pub control1: Point,
    #[pyo3(get)]
    pub control2: Point,
    #[pyo3(get)]
    pub end: Point,
    #[pyo3(get)]
    pub is_critical: bool,
}

#[pymethods]
impl EdgePath {
    /// SVG path data (`d` attribute) for the curve.
    pub fn to_svg_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }

    fn __repr__(&self) -> String {
        format!("EdgePath({} -> {})", self.source_id, self.target_id)
    }
}

/// Bounding box of all node boxes; all zero for an empty graph.
#[pyclass]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutBounds {
    #[pyo3(get)]
    pub min_x: f64,
    #[pyo3(get)]
    pub min_y: f64,
    #[pyo3(get)]
    pub max_x: f64,
    #[pyo3(get)]
    pub max_y: f64,
}

#[pymethods]
impl LayoutBounds {
    #[getter]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[getter]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    fn __repr__(&self) -> String {
        format!(
            "LayoutBounds(min=({}, {}), max=({}, {}))",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Longest-path level per node, relaxed along the dependency order.
///
/// Edges pointing back in the order close a cycle and are skipped, so cycle
/// members sit at the level their acyclic predecessors give them. Nodes not
/// reachable from any root keep level 0.
fn assign_levels(graph: &InterdependencyGraph, adjacency: &Adjacency) -> Vec<usize> {
    let n = adjacency.outgoing.len();
    let topo = topological_indices(graph, adjacency);
    let positions = topo.positions();
    let mut levels = vec![0_usize; n];
    let mut reached: Vec<bool> = (0..n).map(|idx| adjacency.is_root(idx)).collect();

    for &idx in &topo.order {
        if !reached[idx] {
            continue;
        }
        for &edge_idx in &adjacency.outgoing[idx] {
            let target = adjacency.target(edge_idx);
            if positions[target] <= positions[idx] {
                continue;
            }
            levels[target] = levels[target].max(levels[idx] + 1);
            reached[target] = true;
        }
    }

    levels
}

/// Mean within-level position of a node's neighbours, if it has any.
fn barycenter(neighbours: impl Iterator<Item = usize>, positions: &[f64]) -> Option<f64> {
    let (sum, count) = neighbours.fold((0.0, 0_usize), |(sum, count), idx| {
        (sum + positions[idx], count + 1)
    });
    (count > 0).then(|| sum / count as f64)
}

/// Reorder each level in place by alternating downward/upward barycenter sweeps.
///
/// Downward sweeps look at predecessors one level up, upward sweeps at
/// successors one level down; neighbours further away are ignored since their
/// positions index a different group. Nodes without such neighbours keep their
/// current index; ties keep their order.
fn order_by_barycenter(
    groups: &mut [Vec<usize>],
    levels: &[usize],
    adjacency: &Adjacency,
    passes: usize,
) {
    let mut positions = vec![0.0_f64; adjacency.outgoing.len()];
    for group in groups.iter() {
        for (order, &idx) in group.iter().enumerate() {
            positions[idx] = order as f64;
        }
    }

    for pass in 0..passes {
        let downward = pass % 2 == 0;
        let level_range: Vec<usize> = if downward {
            (1..groups.len()).collect()
        } else {
            (0..groups.len().saturating_sub(1)).rev().collect()
        };

        for level in level_range {
            let mut keyed: Vec<(usize, f64)> = groups[level]
                .iter()
                .map(|&idx| {
                    let key = if downward {
                        barycenter(
                            adjacency.incoming[idx]
                                .iter()
                                .map(|&e| adjacency.source(e))
                                .filter(|&source| levels[source] + 1 == level),
                            &positions,
                        )
                    } else {
                        barycenter(
                            adjacency.outgoing[idx]
                                .iter()
                                .map(|&e| adjacency.target(e))
                                .filter(|&target| levels[target] == level + 1),
                            &positions,
                        )
                    };
                    (idx, key.unwrap_or(positions[idx]))
                })
                .collect();

            keyed.sort_by(|a, b| a.1.total_cmp(&b.1));

            groups[level] = keyed.iter().map(|&(idx, _)| idx).collect();
            for (order, &(idx, _)) in keyed.iter().enumerate() {
                positions[idx] = order as f64;
            }
        }
    }
}

/// Assign `level`, `x` and `y` to every node and return the bounding box.
pub fn apply_layout(graph: &mut InterdependencyGraph, config: &LayoutConfig) -> LayoutBounds {
    if graph.is_empty() {
        return LayoutBounds::default();
    }

    let adjacency = Adjacency::new(graph);
    let levels = assign_levels(graph, &adjacency);
    let level_count = levels.iter().copied().max().unwrap_or(0) + 1;

    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); level_count];
    for (idx, &level) in levels.iter().enumerate() {
        groups[level].push(idx);
    }

    order_by_barycenter(&mut groups, &levels, &adjacency, config.barycenter_passes);

    let row_height = config.node_height + config.node_spacing;
    for (level, group) in groups.iter().enumerate() {
        for (row, &idx) in group.iter().enumerate() {
            let node = &mut graph.nodes[idx];
            node.level = level;
            node.x = config.start_x + level as f64 * config.level_spacing;
            node.y = config.start_y + row as f64 * row_height;
            log_debug!(config.verbosity, "  layout {}: level={} x={} y={}", node.id, level, node.x, node.y);
        }
    }

    let bounds = graph.nodes.iter().fold(
        LayoutBounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        },
        |b, node| LayoutBounds {
            min_x: b.min_x.min(node.x),
            min_y: b.min_y.min(node.y),
            max_x: b.max_x.max(node.x + config.node_width),
            max_y: b.max_y.max(node.y + config.node_height),
        },
    );

    log_changes!(
        config.verbosity,
        "Layout: {} nodes on {} levels, {}x{}",
        graph.len(),
        level_count,
        bounds.width(),
        bounds.height()
    );
    bounds
}

/// Bezier routes for every edge of an already laid-out graph.
pub fn compute_edge_paths(graph: &InterdependencyGraph, config: &LayoutConfig) -> Vec<EdgePath> {
    let half_height = config.node_height / 2.0;

    graph
        .edges()
        .iter()
        .filter_map(|edge| {
            let source = graph.node(&edge.source_id)?;
            let target = graph.node(&edge.target_id)?;

            let start = Point::new(source.x + config.node_width, source.y + half_height);
            let end = Point::new(target.x, target.y + half_height);
            let offset = ((end.x - start.x).abs() / 2.0).min(config.max_control_offset);

            Some(EdgePath {
                source_id: edge.source_id.clone(),
                target_id: edge.target_id.clone(),
                start,
                control1: Point::new(start.x + offset, start.y),
                control2: Point::new(end.x - offset, end.y),
                end,
                is_critical: edge.is_critical,
            })
        })
        .collect()
}
