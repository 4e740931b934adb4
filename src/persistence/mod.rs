use crate::error::ScheduleError;
use crate::metadata::ProjectMetadata;
use crate::task_validation;
use crate::{Schedule, Task};
use serde_json::Error as SerdeJsonError;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("project {0} is not stored")]
    NotFound(i32),

    #[error("store connection lock poisoned")]
    LockPoisoned,
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub trait ScheduleStore {
    fn save_schedule(&self, schedule: &Schedule) -> PersistenceResult<()>;
    fn load_schedule(&self, project_id: i32) -> PersistenceResult<Option<Schedule>>;
    fn list_projects(&self) -> PersistenceResult<Vec<ProjectMetadata>>;
    fn delete_project(&self, project_id: i32) -> PersistenceResult<bool>;
}

pub fn validate_tasks(tasks: &[Task]) -> PersistenceResult<()> {
    task_validation::validate_task_collection(tasks)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

pub fn validate_schedule(schedule: &Schedule) -> PersistenceResult<()> {
    validate_tasks(schedule.tasks())
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    export_outcome_to_csv, load_schedule_from_csv, load_schedule_from_json, save_schedule_to_csv,
    save_schedule_to_json,
};
