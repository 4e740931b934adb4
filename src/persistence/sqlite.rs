use super::{PersistenceError, PersistenceResult, ScheduleStore};
use crate::baseline::BaselineSnapshot;
use crate::calendar::{WorkCalendar, WorkCalendarConfig};
use crate::delay::{DelayEvent, DelayReason};
use crate::metadata::ProjectMetadata;
use crate::records::{
    RawProjectRecord, RawTaskRecord, format_date, format_dependency_list, parse_dependency_list,
};
use crate::task::TaskId;
use crate::templates::{TemplateLibrary, WbsTemplate};
use crate::Schedule;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed store for many projects.
///
/// Rows keep the loosely-typed storage layout (ISO date text, JSON dependency
/// lists) and are decoded through `records` on the way out.
pub struct SqliteScheduleStore {
    connection: Mutex<Connection>,
}

impl SqliteScheduleStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Self::seed_templates(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Self::seed_templates(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                client_name TEXT,
                start_date TEXT,
                status TEXT DEFAULT 'Planning',
                non_working_days TEXT DEFAULT '[]',
                calendar_json TEXT
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER NOT NULL,
                project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                name TEXT,
                phase TEXT,
                duration INTEGER,
                start_date_override TEXT,
                dependencies TEXT,
                subcontractor_id INTEGER,
                exposure TEXT DEFAULT 'Outdoor',
                material_lead_time INTEGER DEFAULT 0,
                material_status TEXT DEFAULT 'Not Ordered',
                inspection_required INTEGER DEFAULT 0,
                percent_complete REAL DEFAULT 0,
                baseline_start_date TEXT,
                baseline_end_date TEXT,
                PRIMARY KEY (project_id, id)
            );
            CREATE TABLE IF NOT EXISTS delay_events (
                id INTEGER NOT NULL,
                project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                reason TEXT,
                days_lost INTEGER NOT NULL,
                affected_task_ids TEXT NOT NULL,
                event_date TEXT NOT NULL,
                PRIMARY KEY (project_id, id)
            );
            CREATE TABLE IF NOT EXISTS wbs_library (
                category TEXT PRIMARY KEY,
                json_structure TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn seed_templates(connection: &Connection) -> PersistenceResult<()> {
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM wbs_library", [], |row| row.get(0))?;
        if count == 0 {
            for (category, template) in TemplateLibrary::builtin().iter() {
                connection.execute(
                    "INSERT INTO wbs_library (category, json_structure) VALUES (?1, ?2)",
                    params![category, template.to_json()?],
                )?;
            }
        }
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)
    }

    fn write_project(tx: &Transaction, schedule: &Schedule) -> PersistenceResult<()> {
        let metadata = schedule.metadata();
        let non_working: Vec<String> = metadata
            .non_working_days
            .iter()
            .map(|date| format_date(*date))
            .collect();
        tx.execute(
            "INSERT INTO projects (id, name, client_name, start_date, status, non_working_days, calendar_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                client_name = excluded.client_name,
                start_date = excluded.start_date,
                status = excluded.status,
                non_working_days = excluded.non_working_days,
                calendar_json = excluded.calendar_json",
            params![
                metadata.project_id,
                metadata.project_name,
                metadata.client_name,
                format_date(metadata.project_start_date),
                metadata.status,
                serde_json::to_string(&non_working)?,
                serde_json::to_string(&schedule.calendar_config())?,
            ],
        )?;
        Ok(())
    }

    fn write_tasks(tx: &Transaction, schedule: &Schedule) -> PersistenceResult<()> {
        let project_id = schedule.project_id();
        tx.execute("DELETE FROM tasks WHERE project_id = ?1", params![project_id])?;
        let mut stmt = tx.prepare(
            "INSERT INTO tasks (id, project_id, name, phase, duration, start_date_override,
                dependencies, subcontractor_id, exposure, material_lead_time, material_status,
                inspection_required, percent_complete, baseline_start_date, baseline_end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )?;
        for task in schedule.tasks() {
            let row = RawTaskRecord::from(task);
            stmt.execute(params![
                row.id,
                project_id,
                row.name,
                row.phase,
                row.duration,
                row.start_date_override,
                row.dependencies,
                row.subcontractor_id,
                row.exposure,
                row.material_lead_time,
                row.material_status,
                row.inspection_required,
                row.percent_complete,
                row.baseline_start_date,
                row.baseline_end_date,
            ])?;
        }
        Ok(())
    }

    fn write_delays(tx: &Transaction, schedule: &Schedule) -> PersistenceResult<()> {
        let project_id = schedule.project_id();
        tx.execute(
            "DELETE FROM delay_events WHERE project_id = ?1",
            params![project_id],
        )?;
        let mut stmt = tx.prepare(
            "INSERT INTO delay_events (id, project_id, reason, days_lost, affected_task_ids, event_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for event in schedule.delay_events() {
            let affected: Vec<TaskId> = event.affected_task_ids.iter().copied().collect();
            stmt.execute(params![
                event.id,
                project_id,
                event.reason.as_str(),
                event.days_lost,
                format_dependency_list(&affected),
                format_date(event.event_date),
            ])?;
        }
        Ok(())
    }

    fn write_schedule(tx: &Transaction, schedule: &Schedule) -> PersistenceResult<()> {
        super::validate_schedule(schedule)?;
        Self::write_project(tx, schedule)?;
        Self::write_tasks(tx, schedule)?;
        Self::write_delays(tx, schedule)?;
        Ok(())
    }

    fn read_project(
        conn: &Connection,
        project_id: i32,
    ) -> PersistenceResult<Option<(ProjectMetadata, WorkCalendar)>> {
        let row = conn
            .query_row(
                "SELECT id, name, client_name, start_date, status, non_working_days, calendar_json
                 FROM projects WHERE id = ?1",
                params![project_id],
                |row| {
                    Ok((
                        row.get::<_, i32>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, name, client_name, start_date, status, non_working, calendar_json)) = row
        else {
            return Ok(None);
        };

        let non_working_days = non_working
            .as_deref()
            .and_then(|text| serde_json::from_str::<Vec<String>>(text).ok())
            .unwrap_or_default();
        let metadata = RawProjectRecord {
            id,
            name,
            client_name,
            start_date,
            status,
            non_working_days,
        }
        .into_metadata();

        let calendar = match calendar_json.as_deref() {
            Some(text) if !text.trim().is_empty() => {
                let config: WorkCalendarConfig = serde_json::from_str(text)?;
                WorkCalendar::from_config(&config)
            }
            _ => WorkCalendar::default(),
        };
        Ok(Some((metadata, calendar)))
    }

    fn read_tasks(conn: &Connection, project_id: i32) -> PersistenceResult<Vec<crate::Task>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, phase, duration, start_date_override, dependencies, subcontractor_id,
                exposure, material_lead_time, material_status, inspection_required,
                percent_complete, baseline_start_date, baseline_end_date
             FROM tasks WHERE project_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok(RawTaskRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                phase: row.get(2)?,
                duration: row.get(3)?,
                start_date_override: row.get(4)?,
                dependencies: row.get(5)?,
                subcontractor_id: row.get(6)?,
                exposure: row.get(7)?,
                material_lead_time: row.get(8)?,
                material_status: row.get(9)?,
                inspection_required: row.get(10)?,
                percent_complete: row.get(11)?,
                baseline_start_date: row.get(12)?,
                baseline_end_date: row.get(13)?,
            })
        })?;

        let mut tasks = Vec::new();
        for raw in rows {
            tasks.push(raw?.into_task());
        }
        Ok(tasks)
    }

    fn read_delays(conn: &Connection, project_id: i32) -> PersistenceResult<Vec<DelayEvent>> {
        let mut stmt = conn.prepare(
            "SELECT id, reason, days_lost, affected_task_ids, event_date
             FROM delay_events WHERE project_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok((
                row.get::<_, i32>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, reason, days_lost, affected, event_date) = row?;
            let event_date = NaiveDate::parse_from_str(event_date.trim(), "%Y-%m-%d").map_err(
                |err| {
                    PersistenceError::InvalidData(format!(
                        "delay event {id} has invalid date '{event_date}': {err}"
                    ))
                },
            )?;
            events.push(DelayEvent::new(
                id,
                project_id,
                reason
                    .as_deref()
                    .map(DelayReason::parse_lenient)
                    .unwrap_or_default(),
                days_lost,
                parse_dependency_list(Some(affected.as_str()), id),
                event_date,
            ));
        }
        Ok(events)
    }

    fn read_schedule(conn: &Connection, project_id: i32) -> PersistenceResult<Option<Schedule>> {
        let Some((metadata, calendar)) = Self::read_project(conn, project_id)? else {
            return Ok(None);
        };
        let tasks = Self::read_tasks(conn, project_id)?;
        super::validate_tasks(&tasks)?;
        let delays = Self::read_delays(conn, project_id)?;
        Ok(Some(Schedule::from_parts(metadata, calendar, tasks, delays)))
    }

    /// Load, mutate and write back one project inside a single transaction.
    fn with_schedule<T, F>(&self, project_id: i32, mutate: F) -> PersistenceResult<T>
    where
        F: FnOnce(&mut Schedule) -> PersistenceResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut schedule =
            Self::read_schedule(&tx, project_id)?.ok_or(PersistenceError::NotFound(project_id))?;
        let result = mutate(&mut schedule)?;
        Self::write_schedule(&tx, &schedule)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn capture_baseline(&self, project_id: i32) -> PersistenceResult<BaselineSnapshot> {
        self.with_schedule(project_id, |schedule| Ok(schedule.capture_baseline()))
    }

    pub fn record_delay(&self, event: DelayEvent) -> PersistenceResult<Vec<TaskId>> {
        self.with_schedule(event.project_id, |schedule| {
            Ok(schedule.record_delay(event)?)
        })
    }

    pub fn remove_delay(&self, project_id: i32, delay_id: i32) -> PersistenceResult<DelayEvent> {
        self.with_schedule(project_id, |schedule| Ok(schedule.remove_delay(delay_id)?))
    }

    pub fn save_template(&self, category: &str, template: &WbsTemplate) -> PersistenceResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO wbs_library (category, json_structure) VALUES (?1, ?2)
             ON CONFLICT(category) DO UPDATE SET json_structure = excluded.json_structure",
            params![category, template.to_json()?],
        )?;
        Ok(())
    }

    pub fn load_templates(&self) -> PersistenceResult<TemplateLibrary> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT category, json_structure FROM wbs_library ORDER BY category")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut library = TemplateLibrary::default();
        for row in rows {
            let (category, json) = row?;
            let template = WbsTemplate::from_json(&json).map_err(|err| {
                PersistenceError::InvalidData(format!("template '{category}': {err}"))
            })?;
            library.insert(category, template);
        }
        Ok(library)
    }
}

impl ScheduleStore for SqliteScheduleStore {
    fn save_schedule(&self, schedule: &Schedule) -> PersistenceResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::write_schedule(&tx, schedule)?;
        tx.commit()?;
        Ok(())
    }

    fn load_schedule(&self, project_id: i32) -> PersistenceResult<Option<Schedule>> {
        let conn = self.lock()?;
        Self::read_schedule(&conn, project_id)
    }

    fn list_projects(&self) -> PersistenceResult<Vec<ProjectMetadata>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM projects ORDER BY id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i32>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut projects = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((metadata, _)) = Self::read_project(&conn, id)? {
                projects.push(metadata);
            }
        }
        Ok(projects)
    }

    fn delete_project(&self, project_id: i32) -> PersistenceResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;
        Ok(removed > 0)
    }
}
