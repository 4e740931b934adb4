//! Baseline capture: freeze the computed dates of a run onto the tasks so later
//! runs can report variance against them.

use crate::engine::ScheduleOutcome;
use crate::task::{Task, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub task_id: TaskId,
    pub start: NaiveDate,
    pub finish: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub entries: Vec<BaselineEntry>,
}

impl BaselineSnapshot {
    pub fn from_outcome(outcome: &ScheduleOutcome) -> Self {
        let entries = outcome
            .tasks
            .iter()
            .map(|scheduled| BaselineEntry {
                task_id: scheduled.id(),
                start: scheduled.early_start,
                finish: scheduled.early_finish,
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, task_id: TaskId) -> Option<&BaselineEntry> {
        self.entries.iter().find(|entry| entry.task_id == task_id)
    }

    /// Overwrite baseline dates on every task present in the snapshot and
    /// return how many tasks were touched.
    pub fn apply_to(&self, tasks: &mut [Task]) -> usize {
        let by_id: HashMap<TaskId, &BaselineEntry> =
            self.entries.iter().map(|entry| (entry.task_id, entry)).collect();
        let mut applied = 0;
        for task in tasks.iter_mut() {
            if let Some(entry) = by_id.get(&task.id) {
                task.baseline_start = Some(entry.start);
                task.baseline_finish = Some(entry.finish);
                applied += 1;
            }
        }
        tracing::info!(applied, "baseline captured");
        applied
    }
}

/// Drop every baseline date so variance reads zero again.
pub fn clear_baseline(tasks: &mut [Task]) {
    for task in tasks.iter_mut() {
        task.baseline_start = None;
        task.baseline_finish = None;
    }
}
