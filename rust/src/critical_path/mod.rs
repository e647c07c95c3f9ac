//! Critical Path Method over the interdependency graph.
//!
//! Cycle detection, topological ordering and the forward/backward passes that
//! annotate every node with its earliest/latest dates and slack.

mod calculation;
mod ordering;

pub use calculation::{calculate_critical_path, recalculate_with_delay};
pub use ordering::{detect_cycles, topological_order};

pub(crate) use calculation::{successor_constraint, Constraint};
pub(crate) use ordering::topological_indices;
