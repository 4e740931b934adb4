use crate::task::{MAX_DURATION_DAYS, Task};
use std::collections::HashSet;

const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TaskValidationError {
    message: String,
}

impl TaskValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn validate_task(task: &Task) -> Result<(), TaskValidationError> {
    if task.duration_days <= 0 {
        return Err(TaskValidationError::new(format!(
            "task {} has non-positive duration {}",
            task.id, task.duration_days
        )));
    }

    if task.duration_days > MAX_DURATION_DAYS {
        return Err(TaskValidationError::new(format!(
            "task {} duration {} exceeds the {MAX_DURATION_DAYS}-day limit",
            task.id, task.duration_days
        )));
    }

    if task.material_lead_time_days < 0 {
        return Err(TaskValidationError::new(format!(
            "task {} has negative material lead time {}",
            task.id, task.material_lead_time_days
        )));
    }

    let pct = task.percent_complete;
    if !pct.is_finite() || pct < -EPSILON || pct > 100.0 + EPSILON {
        return Err(TaskValidationError::new(format!(
            "task {} has invalid percent_complete {} (must be between 0 and 100)",
            task.id, pct
        )));
    }

    if task.predecessors.contains(&task.id) {
        return Err(TaskValidationError::new(format!(
            "task {} lists itself as a predecessor",
            task.id
        )));
    }

    if let (Some(start), Some(finish)) = (task.baseline_start, task.baseline_finish) {
        if finish < start {
            return Err(TaskValidationError::new(format!(
                "task {} baseline finish {} precedes baseline start {}",
                task.id, finish, start
            )));
        }
    }

    Ok(())
}

pub fn validate_task_collection(tasks: &[Task]) -> Result<(), TaskValidationError> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id) {
            return Err(TaskValidationError::new(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        validate_task(task)?;
    }
    Ok(())
}
