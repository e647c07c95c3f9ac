//! Configuration types for the interdependency engine.

use pyo3::prelude::*;

use crate::logging::VERBOSITY_SILENT;

/// Configuration for the critical path, blockage and what-if passes.
#[pyclass]
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Absolute slack below which a node counts as critical (days)
    #[pyo3(get, set)]
    pub critical_tolerance: f64,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            critical_tolerance: 1e-3,
            verbosity: VERBOSITY_SILENT,
        }
    }
}

#[pymethods]
impl EngineConfig {
    #[new]
    #[pyo3(signature = (critical_tolerance=None, verbosity=None))]
    fn new(critical_tolerance: Option<f64>, verbosity: Option<u8>) -> Self {
        let defaults = Self::default();
        Self {
            critical_tolerance: critical_tolerance.unwrap_or(defaults.critical_tolerance),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "EngineConfig(critical_tolerance={}, verbosity={})",
            self.critical_tolerance, self.verbosity
        )
    }
}

/// Geometry constants for the layered layout.
#[pyclass]
#[derive(Clone, Debug)]
pub struct LayoutConfig {
    /// Node box width in pixels
    #[pyo3(get, set)]
    pub node_width: f64,
    /// Node box height in pixels
    #[pyo3(get, set)]
    pub node_height: f64,
    /// Horizontal distance between consecutive levels
    #[pyo3(get, set)]
    pub level_spacing: f64,
    /// Vertical gap between stacked nodes of one level
    #[pyo3(get, set)]
    pub node_spacing: f64,
    /// Left margin of level 0
    #[pyo3(get, set)]
    pub start_x: f64,
    /// Top margin of the first node in every level
    #[pyo3(get, set)]
    pub start_y: f64,
    /// Number of alternating barycenter sweeps
    #[pyo3(get, set)]
    pub barycenter_passes: usize,
    /// Upper bound for the horizontal offset of Bezier control points
    #[pyo3(get, set)]
    pub max_control_offset: f64,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 180.0,
            node_height: 80.0,
            level_spacing: 250.0,
            node_spacing: 100.0,
            start_x: 50.0,
            start_y: 50.0,
            barycenter_passes: 4,
            max_control_offset: 100.0,
            verbosity: VERBOSITY_SILENT,
        }
    }
}

#[pymethods]
impl LayoutConfig {
    #[new]
    #[pyo3(signature = (
        node_width=None,
        node_height=None,
        level_spacing=None,
        node_spacing=None,
        start_x=None,
        start_y=None,
        barycenter_passes=None,
        max_control_offset=None,
        verbosity=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        node_width: Option<f64>,
        node_height: Option<f64>,
        level_spacing: Option<f64>,
        node_spacing: Option<f64>,
        start_x: Option<f64>,
        start_y: Option<f64>,
        barycenter_passes: Option<usize>,
        max_control_offset: Option<f64>,
        verbosity: Option<u8>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            node_width: node_width.unwrap_or(defaults.node_width),
            node_height: node_height.unwrap_or(defaults.node_height),
            level_spacing: level_spacing.unwrap_or(defaults.level_spacing),
            node_spacing: node_spacing.unwrap_or(defaults.node_spacing),
            start_x: start_x.unwrap_or(defaults.start_x),
            start_y: start_y.unwrap_or(defaults.start_y),
            barycenter_passes: barycenter_passes.unwrap_or(defaults.barycenter_passes),
            max_control_offset: max_control_offset.unwrap_or(defaults.max_control_offset),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "LayoutConfig(node_width={}, node_height={}, level_spacing={}, node_spacing={})",
            self.node_width, self.node_height, self.level_spacing, self.node_spacing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_defaults() {
        let config = LayoutConfig::default();
        assert_eq!(config.node_width, 180.0);
        assert_eq!(config.node_height, 80.0);
        assert_eq!(config.level_spacing, 250.0);
        assert_eq!(config.node_spacing, 100.0);
        assert_eq!(config.barycenter_passes, 4);
    }

    #[test]
    fn test_engine_overrides_keep_other_defaults() {
        let config = EngineConfig::new(None, Some(2));
        assert!((config.critical_tolerance - 1e-3).abs() < 1e-12);
        assert_eq!(config.verbosity, 2);
    }
}
