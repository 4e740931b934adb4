pub mod baseline;
pub mod calculations;
pub mod calendar;
pub mod config;
pub mod delay;
pub mod engine;
pub mod error;
pub mod graph;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod logging;
pub mod metadata;
pub mod persistence;
pub mod portfolio;
pub mod records;
pub mod schedule;
pub mod task;
pub mod task_validation;
pub mod templates;

pub use baseline::BaselineSnapshot;
pub use calculations::CriticalityPolicy;
pub use calendar::{WorkCalendar, WorkCalendarConfig};
pub use config::SchedulerConfig;
pub use delay::{DelayEvent, DelayReason};
pub use engine::{
    EngineOptions, RefreshSummary, ScheduleOutcome, ScheduledTask, compute_schedule,
    compute_schedule_from_records,
};
pub use error::{ScheduleError, ScheduleResult};
pub use metadata::ProjectMetadata;
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteScheduleStore;
pub use persistence::{
    PersistenceError, ScheduleStore, export_outcome_to_csv, load_schedule_from_csv,
    load_schedule_from_json, save_schedule_to_csv, save_schedule_to_json, validate_schedule,
    validate_tasks,
};
pub use schedule::Schedule;
pub use task::{Exposure, MAX_DURATION_DAYS, MaterialStatus, Task, TaskId};
