//! Delay events and the duration surgery they perform.
//!
//! Applying an event adds `days_lost` to every affected task's duration;
//! reverting subtracts it again. Reverting is a compensating mutation, so it
//! only restores the old schedule if nothing else edited those durations.

use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{MAX_DURATION_DAYS, Task, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DelayReason {
    Weather,
    Material,
    Inspection,
    #[default]
    Other,
}

impl DelayReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelayReason::Weather => "Weather",
            DelayReason::Material => "Material",
            DelayReason::Inspection => "Inspection",
            DelayReason::Other => "Other",
        }
    }

    /// Unknown reasons map to `Other`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "weather" => DelayReason::Weather,
            "material" | "materials" => DelayReason::Material,
            "inspection" => DelayReason::Inspection,
            _ => DelayReason::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayEvent {
    pub id: i32,
    pub project_id: i32,
    #[serde(default)]
    pub reason: DelayReason,
    pub days_lost: i64,
    pub affected_task_ids: BTreeSet<TaskId>,
    pub event_date: NaiveDate,
}

impl DelayEvent {
    pub fn new(
        id: i32,
        project_id: i32,
        reason: DelayReason,
        days_lost: i64,
        affected: impl IntoIterator<Item = TaskId>,
        event_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            project_id,
            reason,
            days_lost,
            affected_task_ids: affected.into_iter().collect(),
            event_date,
        }
    }

    pub fn validate(&self) -> ScheduleResult<()> {
        if self.days_lost <= 0 {
            return Err(ScheduleError::InvalidDelay(format!(
                "delay event {} must lose a positive number of days (got {})",
                self.id, self.days_lost
            )));
        }
        if self.days_lost > MAX_DURATION_DAYS {
            return Err(ScheduleError::InvalidDelay(format!(
                "delay event {} loses {} days, more than the {MAX_DURATION_DAYS}-day limit",
                self.id, self.days_lost
            )));
        }
        if self.affected_task_ids.is_empty() {
            return Err(ScheduleError::InvalidDelay(format!(
                "delay event {} affects no tasks",
                self.id
            )));
        }
        Ok(())
    }
}

/// Lengthen every affected task by `days_lost`. Ids that match no task are
/// skipped. Returns the ids that were changed.
///
/// Fails without touching any task when a lengthened duration would pass
/// `MAX_DURATION_DAYS`.
pub fn apply_delay(tasks: &mut [Task], event: &DelayEvent) -> ScheduleResult<Vec<TaskId>> {
    let too_long = tasks
        .iter()
        .filter(|task| event.affected_task_ids.contains(&task.id))
        .find(|task| {
            task.duration_days
                .checked_add(event.days_lost)
                .is_none_or(|days| days > MAX_DURATION_DAYS)
        });
    if let Some(task) = too_long {
        return Err(ScheduleError::InvalidDelay(format!(
            "delay event {} would stretch task {} ({} days) past the {MAX_DURATION_DAYS}-day limit",
            event.id, task.id, task.duration_days
        )));
    }

    let mut touched = Vec::new();
    for task in tasks
        .iter_mut()
        .filter(|task| event.affected_task_ids.contains(&task.id))
    {
        task.duration_days += event.days_lost;
        touched.push(task.id);
        tracing::debug!(
            task_id = task.id,
            delay_id = event.id,
            duration = task.duration_days,
            "delay applied"
        );
    }
    warn_missing(event, &touched);
    Ok(touched)
}

/// Undo `apply_delay`. Durations never go below zero.
pub fn revert_delay(tasks: &mut [Task], event: &DelayEvent) -> Vec<TaskId> {
    let mut touched = Vec::new();
    for task in tasks
        .iter_mut()
        .filter(|task| event.affected_task_ids.contains(&task.id))
    {
        let reverted = task.duration_days.saturating_sub(event.days_lost);
        if reverted < 0 {
            tracing::warn!(
                task_id = task.id,
                delay_id = event.id,
                duration = task.duration_days,
                days_lost = event.days_lost,
                "duration edited since delay was applied, clamping at zero"
            );
        }
        task.duration_days = reverted.max(0);
        touched.push(task.id);
    }
    warn_missing(event, &touched);
    touched
}

fn warn_missing(event: &DelayEvent, touched: &[TaskId]) {
    for id in &event.affected_task_ids {
        if !touched.contains(id) {
            tracing::warn!(task_id = id, delay_id = event.id, "delay references unknown task");
        }
    }
}
