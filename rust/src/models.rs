//! Core input types for the interdependency engine.
//!
//! These mirror the work items owned by the surrounding application. The engine
//! only ever reads them; everything it computes lives on the graph types.

use chrono::NaiveDate;
use pyo3::prelude::*;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when decoding external codes into model enums.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown link type: {0}")]
    UnknownLinkType(String),
    #[error("Unknown action status: {0}")]
    UnknownStatus(String),
}

/// Precedence relation between a predecessor and a successor.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// Successor starts after predecessor finishes (`FS`).
    FinishToStart,
    /// Successor starts after predecessor starts (`SS`).
    StartToStart,
    /// Successor finishes after predecessor finishes (`FF`).
    FinishToFinish,
    /// Successor finishes after predecessor starts (`SF`).
    StartToFinish,
}

impl LinkType {
    /// Two-letter code used by the surrounding application.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FinishToStart => "FS",
            Self::StartToStart => "SS",
            Self::FinishToFinish => "FF",
            Self::StartToFinish => "SF",
        }
    }

    /// Whether the relation constrains the successor's start (as opposed to its finish).
    pub fn constrains_start(&self) -> bool {
        matches!(self, Self::FinishToStart | Self::StartToStart)
    }
}

impl Default for LinkType {
    fn default() -> Self {
        Self::FinishToStart
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LinkType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FS" => Ok(Self::FinishToStart),
            "SS" => Ok(Self::StartToStart),
            "FF" => Ok(Self::FinishToFinish),
            "SF" => Ok(Self::StartToFinish),
            _ => Err(ModelError::UnknownLinkType(s.to_string())),
        }
    }
}

/// Lifecycle status of a work item.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionStatus {
    NotStarted,
    InProgress,
    Waiting,
    Blocked,
    Finished,
    Cancelled,
}

impl ActionStatus {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Waiting => "waiting",
            Self::Blocked => "blocked",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }

    /// Finished or cancelled: nothing left to schedule or unblock.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Satisfies a finish-to-start predecessor requirement.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Satisfies a start-to-start predecessor requirement.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::InProgress | Self::Finished)
    }
}

impl Default for ActionStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ActionStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "not_started" | "todo" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "waiting" => Ok(Self::Waiting),
            "blocked" => Ok(Self::Blocked),
            "finished" | "done" => Ok(Self::Finished),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(ModelError::UnknownStatus(s.to_string())),
        }
    }
}

/// A reference from one work item to another, with link type and lag.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct DependencyRef {
    #[pyo3(get, set)]
    pub target_id: String,
    #[pyo3(get, set)]
    pub link_type: LinkType,
    /// Offset in days; negative values express overlap.
    #[pyo3(get, set)]
    pub lag_days: f64,
}

impl DependencyRef {
    pub fn finish_to_start(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            link_type: LinkType::FinishToStart,
            lag_days: 0.0,
        }
    }
}

#[pymethods]
impl DependencyRef {
    #[new]
    #[pyo3(signature = (target_id, link_type="FS", lag_days=0.0))]
    fn py_new(target_id: String, link_type: &str, lag_days: f64) -> PyResult<Self> {
        let link_type = link_type
            .parse::<LinkType>()
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
        Ok(Self {
            target_id,
            link_type,
            lag_days,
        })
    }

    fn __repr__(&self) -> String {
        format!(
            "DependencyRef(target_id={:?}, link_type={}, lag_days={})",
            self.target_id, self.link_type, self.lag_days
        )
    }
}

/// A work item (action) as declared by the surrounding application.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct WorkItem {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub title: String,
    #[pyo3(get, set)]
    pub status: ActionStatus,
    #[pyo3(get, set)]
    pub duration_days: Option<f64>,
    #[pyo3(get, set)]
    pub start_date: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub end_date: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub predecessors: Vec<DependencyRef>,
    #[pyo3(get, set)]
    pub successors: Vec<DependencyRef>,
}

impl WorkItem {
    /// Convenience constructor for an item with a fixed duration and no links.
    pub fn new(id: impl Into<String>, title: impl Into<String>, duration_days: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: ActionStatus::NotStarted,
            duration_days: Some(duration_days),
            start_date: None,
            end_date: None,
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    /// Planned duration in days, floored at one day.
    ///
    /// Falls back to the span between the declared dates, then to a single day.
    pub fn planned_duration(&self) -> f64 {
        let declared = match (self.duration_days, self.start_date, self.end_date) {
            (Some(days), _, _) => days,
            (None, Some(start), Some(end)) => (end - start).num_days() as f64,
            _ => 1.0,
        };
        if declared.is_finite() {
            declared.max(1.0)
        } else {
            1.0
        }
    }
}

#[pymethods]
impl WorkItem {
    #[new]
    #[pyo3(signature = (
        id,
        title,
        status="not_started",
        duration_days=None,
        start_date=None,
        end_date=None,
        predecessors=None,
        successors=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn py_new(
        id: String,
        title: String,
        status: &str,
        duration_days: Option<f64>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        predecessors: Option<Vec<DependencyRef>>,
        successors: Option<Vec<DependencyRef>>,
    ) -> PyResult<Self> {
        let status = status
            .parse::<ActionStatus>()
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
        Ok(Self {
            id,
            title,
            status,
            duration_days,
            start_date,
            end_date,
            predecessors: predecessors.unwrap_or_default(),
            successors: successors.unwrap_or_default(),
        })
    }

    fn __repr__(&self) -> String {
        format!(
            "WorkItem(id={:?}, status={}, duration={}, preds={}, succs={})",
            self.id,
            self.status,
            self.planned_duration(),
            self.predecessors.len(),
            self.successors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_type_codes_round_trip() {
        for code in ["FS", "SS", "FF", "SF"] {
            let link: LinkType = code.parse().unwrap();
            assert_eq!(link.code(), code);
        }
        assert_eq!("ss".parse::<LinkType>(), Ok(LinkType::StartToStart));
        assert_eq!(
            "XX".parse::<LinkType>(),
            Err(ModelError::UnknownLinkType("XX".to_string()))
        );
    }

    #[test]
    fn test_status_parsing_accepts_common_spellings() {
        assert_eq!("in-progress".parse::<ActionStatus>(), Ok(ActionStatus::InProgress));
        assert_eq!("Not Started".parse::<ActionStatus>(), Ok(ActionStatus::NotStarted));
        assert_eq!("canceled".parse::<ActionStatus>(), Ok(ActionStatus::Cancelled));
        assert!("archived".parse::<ActionStatus>().is_err());
    }

    #[test]
    fn test_status_sets() {
        assert!(ActionStatus::Cancelled.is_completed());
        assert!(!ActionStatus::Cancelled.is_started());
        assert!(ActionStatus::InProgress.is_started());
        assert!(!ActionStatus::InProgress.is_completed());
        assert!(!ActionStatus::Waiting.is_terminal());
    }

    #[test]
    fn test_planned_duration_fallbacks() {
        let mut item = WorkItem::new("a", "A", 0.0);
        assert_eq!(item.planned_duration(), 1.0);

        item.duration_days = None;
        item.start_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        item.end_date = NaiveDate::from_ymd_opt(2025, 3, 11);
        assert_eq!(item.planned_duration(), 10.0);

        item.end_date = None;
        assert_eq!(item.planned_duration(), 1.0);
    }
}
