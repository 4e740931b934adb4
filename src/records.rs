//! Loosely-typed rows as they arrive from storage or forms, and their
//! fail-soft conversion into typed records.
//!
//! Nothing here returns an error: malformed values fall back to their
//! documented default and a warning is logged.

use crate::metadata::ProjectMetadata;
use crate::task::{Exposure, MAX_DURATION_DAYS, MaterialStatus, Task, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTaskRecord {
    pub id: TaskId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub start_date_override: Option<String>,
    /// JSON array text (`"[1, 2]"`) or a comma list (`"1,2"`).
    #[serde(default)]
    pub dependencies: Option<String>,
    #[serde(default)]
    pub subcontractor_id: Option<i32>,
    #[serde(default)]
    pub exposure: Option<String>,
    #[serde(default)]
    pub material_lead_time: Option<i64>,
    #[serde(default)]
    pub material_status: Option<String>,
    #[serde(default)]
    pub inspection_required: Option<i64>,
    #[serde(default)]
    pub percent_complete: Option<f64>,
    #[serde(default)]
    pub baseline_start_date: Option<String>,
    #[serde(default)]
    pub baseline_end_date: Option<String>,
}

impl RawTaskRecord {
    pub fn into_task(self) -> Task {
        let id = self.id;
        let duration = match self.duration {
            Some(days) if days > MAX_DURATION_DAYS => {
                tracing::warn!(
                    task_id = id,
                    duration = days,
                    limit = MAX_DURATION_DAYS,
                    "duration clamped to the limit"
                );
                MAX_DURATION_DAYS
            }
            Some(days) if days >= 0 => days,
            Some(days) => {
                tracing::warn!(task_id = id, duration = days, "negative duration treated as 0");
                0
            }
            None => {
                tracing::warn!(task_id = id, "missing duration treated as 0");
                0
            }
        };

        let mut task = Task::new(id, self.name.unwrap_or_default(), duration);
        task.phase = self.phase.unwrap_or_default();
        task.start_date_override = self
            .start_date_override
            .as_deref()
            .and_then(|raw| parse_optional_date(raw, id, "start_date_override"));
        task.predecessors = parse_dependency_list(self.dependencies.as_deref(), id);
        task.subcontractor_id = self.subcontractor_id.filter(|&sub| sub > 0);
        task.exposure = self
            .exposure
            .as_deref()
            .map(|raw| {
                Exposure::from_str(raw).unwrap_or_else(|| {
                    tracing::warn!(task_id = id, value = raw, "unknown exposure, using Outdoor");
                    Exposure::default()
                })
            })
            .unwrap_or_default();
        task.material_lead_time_days = self.material_lead_time.unwrap_or(0).max(0);
        task.material_status = self
            .material_status
            .as_deref()
            .map(|raw| {
                MaterialStatus::from_str(raw).unwrap_or_else(|| {
                    tracing::warn!(task_id = id, value = raw, "unknown material status");
                    MaterialStatus::default()
                })
            })
            .unwrap_or_default();
        task.inspection_required = self.inspection_required.unwrap_or(0) != 0;
        task.percent_complete = self
            .percent_complete
            .filter(|pct| pct.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);
        task.baseline_start = self
            .baseline_start_date
            .as_deref()
            .and_then(|raw| parse_optional_date(raw, id, "baseline_start_date"));
        task.baseline_finish = self
            .baseline_end_date
            .as_deref()
            .and_then(|raw| parse_optional_date(raw, id, "baseline_end_date"));
        task
    }
}

impl From<&Task> for RawTaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            name: Some(task.name.clone()),
            phase: Some(task.phase.clone()).filter(|p| !p.is_empty()),
            duration: Some(task.duration_days),
            start_date_override: task.start_date_override.map(format_date),
            dependencies: Some(format_dependency_list(&task.predecessors)),
            subcontractor_id: task.subcontractor_id,
            exposure: Some(task.exposure.as_str().to_string()),
            material_lead_time: Some(task.material_lead_time_days),
            material_status: Some(task.material_status.as_str().to_string()),
            inspection_required: Some(i64::from(task.inspection_required)),
            percent_complete: Some(task.percent_complete),
            baseline_start_date: task.baseline_start.map(format_date),
            baseline_end_date: task.baseline_finish.map(format_date),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProjectRecord {
    pub id: i32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub non_working_days: Vec<String>,
}

impl RawProjectRecord {
    /// A missing or malformed start date falls back to today.
    pub fn into_metadata(self) -> ProjectMetadata {
        let start = parse_project_start(self.start_date.as_deref());
        let non_working_days: BTreeSet<NaiveDate> = self
            .non_working_days
            .iter()
            .filter_map(|raw| parse_optional_date(raw, 0, "non_working_days"))
            .collect();

        let mut metadata = ProjectMetadata::new(self.id, self.name.unwrap_or_default(), start);
        metadata.client_name = self.client_name.unwrap_or_default();
        if let Some(status) = self.status.filter(|s| !s.trim().is_empty()) {
            metadata.status = status;
        }
        metadata.non_working_days = non_working_days;
        metadata
    }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse an ISO date, defaulting to today when absent or malformed.
pub fn parse_project_start(raw: Option<&str>) -> NaiveDate {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            Ok(date) => date,
            Err(err) => {
                tracing::warn!(value, error = %err, "malformed project start, using today");
                today()
            }
        },
        None => {
            tracing::warn!("missing project start, using today");
            today()
        }
    }
}

fn parse_optional_date(raw: &str, task_id: TaskId, field: &'static str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(err) => {
            tracing::warn!(task_id, field, value, error = %err, "ignoring malformed date");
            None
        }
    }
}

/// Decode a stored dependency list. Anything unreadable yields no dependencies.
pub fn parse_dependency_list(raw: Option<&str>, task_id: TaskId) -> Vec<TaskId> {
    let Some(text) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    if text.starts_with('[') {
        return match serde_json::from_str::<Vec<Value>>(text) {
            Ok(values) => values
                .iter()
                .filter_map(|value| match value {
                    Value::Number(n) => n.as_i64().and_then(|v| TaskId::try_from(v).ok()),
                    Value::String(s) => s.trim().parse::<TaskId>().ok(),
                    _ => None,
                })
                .collect(),
            Err(err) => {
                tracing::warn!(task_id, value = text, error = %err, "malformed dependency list");
                Vec::new()
            }
        };
    }

    let parsed: Result<Vec<TaskId>, _> = text
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.trim().parse::<TaskId>())
        .collect();
    match parsed {
        Ok(ids) => ids,
        Err(err) => {
            tracing::warn!(task_id, value = text, error = %err, "malformed dependency list");
            Vec::new()
        }
    }
}

pub fn format_dependency_list(ids: &[TaskId]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}
