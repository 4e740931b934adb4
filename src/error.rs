use crate::task::TaskId;
use crate::task_validation::TaskValidationError;

/// Failures of the strict scheduling operations.
///
/// The display path (`engine::compute_schedule`, `Schedule::refresh`) never
/// returns these; it recovers locally and logs instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("dependency cycle detected among tasks {task_ids:?}")]
    CycleDetected { task_ids: Vec<TaskId> },

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("delay event {0} not found")]
    DelayNotFound(i32),

    #[error("delay event {0} already recorded")]
    DuplicateDelay(i32),

    #[error("invalid delay event: {0}")]
    InvalidDelay(String),

    #[error("invalid task: {0}")]
    InvalidTask(#[from] TaskValidationError),

    #[error("invalid date '{0}'")]
    InvalidDate(String),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
