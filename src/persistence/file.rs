use super::{PersistenceError, PersistenceResult};
use crate::calendar::{WorkCalendar, WorkCalendarConfig};
use crate::delay::DelayEvent;
use crate::engine::ScheduleOutcome;
use crate::metadata::ProjectMetadata;
use crate::records::RawTaskRecord;
use crate::{Schedule, Task};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct ScheduleSnapshot {
    metadata: ProjectMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calendar: Option<WorkCalendarConfig>,
    tasks: Vec<Task>,
    #[serde(default)]
    delay_events: Vec<DelayEvent>,
}

impl ScheduleSnapshot {
    fn from_schedule(schedule: &Schedule) -> PersistenceResult<Self> {
        super::validate_schedule(schedule)?;
        Ok(Self {
            metadata: schedule.metadata().clone(),
            calendar: Some(schedule.calendar_config()),
            tasks: schedule.tasks().to_vec(),
            delay_events: schedule.delay_events().to_vec(),
        })
    }

    fn into_schedule(self) -> PersistenceResult<Schedule> {
        super::validate_tasks(&self.tasks)?;
        let calendar = self
            .calendar
            .map(|config| WorkCalendar::from_config(&config))
            .unwrap_or_default();
        Ok(Schedule::from_parts(
            self.metadata,
            calendar,
            self.tasks,
            self.delay_events,
        ))
    }
}

pub fn save_schedule_to_json<P: AsRef<Path>>(
    schedule: &Schedule,
    path: P,
) -> PersistenceResult<()> {
    let snapshot = ScheduleSnapshot::from_schedule(schedule)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_schedule_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Schedule> {
    let file = File::open(path)?;
    let snapshot: ScheduleSnapshot = serde_json::from_reader(file)?;
    snapshot.into_schedule()
}

/// One CSV row. Task rows use the storage column names; a single row with
/// `metadata_json` set carries the project and calendar instead.
#[derive(Default, Serialize, Deserialize)]
struct TaskCsvRecord {
    id: i32,
    name: Option<String>,
    phase: Option<String>,
    duration: Option<i64>,
    start_date_override: Option<String>,
    dependencies: Option<String>,
    subcontractor_id: Option<i32>,
    exposure: Option<String>,
    material_lead_time: Option<i64>,
    material_status: Option<String>,
    inspection_required: Option<i64>,
    percent_complete: Option<f64>,
    baseline_start_date: Option<String>,
    baseline_end_date: Option<String>,
    #[serde(default)]
    metadata_json: String,
    #[serde(default)]
    calendar_json: String,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        let raw = RawTaskRecord::from(task);
        Self {
            id: raw.id,
            name: raw.name,
            phase: raw.phase,
            duration: raw.duration,
            start_date_override: raw.start_date_override,
            dependencies: raw.dependencies,
            subcontractor_id: raw.subcontractor_id,
            exposure: raw.exposure,
            material_lead_time: raw.material_lead_time,
            material_status: raw.material_status,
            inspection_required: raw.inspection_required,
            percent_complete: raw.percent_complete,
            baseline_start_date: raw.baseline_start_date,
            baseline_end_date: raw.baseline_end_date,
            metadata_json: String::new(),
            calendar_json: String::new(),
        }
    }
}

impl TaskCsvRecord {
    fn metadata_row(schedule: &Schedule) -> PersistenceResult<Self> {
        Ok(Self {
            name: Some("__metadata__".to_string()),
            metadata_json: serde_json::to_string(schedule.metadata())?,
            calendar_json: serde_json::to_string(&schedule.calendar_config())?,
            ..Self::default()
        })
    }

    fn is_metadata_row(&self) -> bool {
        !self.metadata_json.trim().is_empty()
    }

    /// Field-level problems are recovered by `RawTaskRecord::into_task`.
    fn into_task(self) -> Task {
        RawTaskRecord {
            id: self.id,
            name: self.name,
            phase: self.phase,
            duration: self.duration,
            start_date_override: self.start_date_override,
            dependencies: self.dependencies,
            subcontractor_id: self.subcontractor_id,
            exposure: self.exposure,
            material_lead_time: self.material_lead_time,
            material_status: self.material_status,
            inspection_required: self.inspection_required,
            percent_complete: self.percent_complete,
            baseline_start_date: self.baseline_start_date,
            baseline_end_date: self.baseline_end_date,
        }
        .into_task()
    }
}

/// Delay events are not part of the CSV layout; durations are written as
/// they stand, delays included.
pub fn save_schedule_to_csv<P: AsRef<Path>>(schedule: &Schedule, path: P) -> PersistenceResult<()> {
    super::validate_schedule(schedule)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.serialize(TaskCsvRecord::metadata_row(schedule)?)?;
    for task in schedule.tasks() {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_schedule_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Schedule> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut tasks = Vec::new();
    let mut metadata: Option<ProjectMetadata> = None;
    let mut calendar_config: Option<WorkCalendarConfig> = None;
    for record in reader.deserialize::<TaskCsvRecord>() {
        let record = record?;
        if record.is_metadata_row() {
            if metadata.is_some() {
                return Err(PersistenceError::InvalidData(
                    "CSV file contained multiple metadata rows".into(),
                ));
            }
            metadata = Some(serde_json::from_str(&record.metadata_json).map_err(|err| {
                PersistenceError::InvalidData(format!("invalid metadata json: {err}"))
            })?);
            if !record.calendar_json.trim().is_empty() {
                calendar_config =
                    Some(serde_json::from_str(&record.calendar_json).map_err(|err| {
                        PersistenceError::InvalidData(format!("invalid calendar json: {err}"))
                    })?);
            }
            continue;
        }
        tasks.push(record.into_task());
    }

    if tasks.is_empty() {
        return Err(PersistenceError::InvalidData(
            "CSV file contained no tasks".into(),
        ));
    }

    super::validate_tasks(&tasks)?;

    let calendar = calendar_config
        .map(|config| WorkCalendar::from_config(&config))
        .unwrap_or_default();
    Ok(Schedule::from_parts(
        metadata.unwrap_or_default(),
        calendar,
        tasks,
        Vec::new(),
    ))
}

#[derive(Serialize)]
struct ScheduledCsvRow<'a> {
    id: i32,
    name: &'a str,
    phase: &'a str,
    duration: i64,
    start_date: String,
    end_date: String,
    is_critical: bool,
    variance: i64,
}

/// Write the computed dates of one run, one row per task.
pub fn export_outcome_to_csv<P: AsRef<Path>>(
    outcome: &ScheduleOutcome,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for scheduled in &outcome.tasks {
        writer.serialize(ScheduledCsvRow {
            id: scheduled.id(),
            name: &scheduled.task.name,
            phase: &scheduled.task.phase,
            duration: scheduled.task.duration_days,
            start_date: scheduled.start_date(),
            end_date: scheduled.end_date(),
            is_critical: scheduled.is_critical,
            variance: scheduled.variance,
        })?;
    }
    writer.flush()?;
    Ok(())
}
