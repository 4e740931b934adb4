use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type TaskId = i32;

/// Longest duration, in working days, a single task may carry (about a century).
pub const MAX_DURATION_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Exposure {
    Indoor,
    #[default]
    Outdoor,
}

impl Exposure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exposure::Indoor => "Indoor",
            Exposure::Outdoor => "Outdoor",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "indoor" => Some(Exposure::Indoor),
            "outdoor" => Some(Exposure::Outdoor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MaterialStatus {
    #[default]
    #[serde(rename = "Not Ordered")]
    NotOrdered,
    Ordered,
    Delivered,
    Installed,
}

impl MaterialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialStatus::NotOrdered => "Not Ordered",
            MaterialStatus::Ordered => "Ordered",
            MaterialStatus::Delivered => "Delivered",
            MaterialStatus::Installed => "Installed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "notordered" => Some(MaterialStatus::NotOrdered),
            "ordered" => Some(MaterialStatus::Ordered),
            "delivered" => Some(MaterialStatus::Delivered),
            "installed" => Some(MaterialStatus::Installed),
            _ => None,
        }
    }
}

/// A schedulable unit of work within one project.
///
/// Optional fields carry their documented default when absent:
/// `start_date_override` = no constraint, `subcontractor_id` = unassigned,
/// `baseline_*` = no baseline captured (variance reported as zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default)]
    pub phase: String,
    pub duration_days: i64,
    /// "Start no earlier than" constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_override: Option<NaiveDate>,
    /// Predecessor task ids within the same project. Order is irrelevant.
    #[serde(default)]
    pub predecessors: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcontractor_id: Option<i32>,
    #[serde(default)]
    pub exposure: Exposure,
    #[serde(default)]
    pub material_lead_time_days: i64,
    #[serde(default)]
    pub material_status: MaterialStatus,
    #[serde(default)]
    pub inspection_required: bool,
    /// 0-100.
    #[serde(default)]
    pub percent_complete: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_finish: Option<NaiveDate>,
}

impl Task {
    pub fn new(id: TaskId, name: impl Into<String>, duration_days: i64) -> Self {
        Self {
            id,
            name: name.into(),
            phase: String::new(),
            duration_days,
            start_date_override: None,
            predecessors: Vec::new(),
            subcontractor_id: None,
            exposure: Exposure::default(),
            material_lead_time_days: 0,
            material_status: MaterialStatus::default(),
            inspection_required: false,
            percent_complete: 0.0,
            baseline_start: None,
            baseline_finish: None,
        }
    }

    pub fn with_predecessors(mut self, predecessors: impl IntoIterator<Item = TaskId>) -> Self {
        self.predecessors = predecessors.into_iter().collect();
        self
    }

    pub fn with_start_override(mut self, date: NaiveDate) -> Self {
        self.start_date_override = Some(date);
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = phase.into();
        self
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline_finish.is_some()
    }

    /// Predecessor ids with duplicates and self references removed, sorted.
    pub fn dependency_set(&self) -> Vec<TaskId> {
        let mut deps: Vec<TaskId> = self
            .predecessors
            .iter()
            .copied()
            .filter(|&pred| pred != self.id)
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}
