use crate::baseline::{self, BaselineSnapshot};
use crate::calendar::{WorkCalendar, WorkCalendarConfig};
use crate::delay::{self, DelayEvent};
use crate::engine::{EngineOptions, RefreshSummary, ScheduleOutcome, compute_schedule};
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::ScheduleDag;
use crate::metadata::ProjectMetadata;
use crate::portfolio::ProjectSnapshot;
use crate::task::{MaterialStatus, Task, TaskId};
use crate::task_validation;
use crate::templates::{Chaining, WbsTemplate};
use chrono::NaiveDate;
use polars::prelude::*;

/// One project's editable state: metadata, calendar, tasks and the delay
/// events applied to them.
///
/// Every mutation invalidates the cached outcome; `refresh` recomputes it
/// through the pure engine.
#[derive(Debug, Clone)]
pub struct Schedule {
    metadata: ProjectMetadata,
    calendar: WorkCalendar,
    tasks: Vec<Task>,
    delay_events: Vec<DelayEvent>,
    options: EngineOptions,
    outcome: Option<ScheduleOutcome>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    pub fn new() -> Self {
        Self::new_with_metadata(ProjectMetadata::default())
    }

    pub fn new_with_metadata(metadata: ProjectMetadata) -> Self {
        Self::new_with_metadata_and_calendar(metadata, WorkCalendar::default())
    }

    pub fn new_with_metadata_and_calendar(
        metadata: ProjectMetadata,
        calendar: WorkCalendar,
    ) -> Self {
        Self::from_parts(metadata, calendar, Vec::new(), Vec::new())
    }

    /// Reassemble a schedule from stored parts without re-applying delays;
    /// stored durations already include them.
    pub fn from_parts(
        metadata: ProjectMetadata,
        calendar: WorkCalendar,
        tasks: Vec<Task>,
        delay_events: Vec<DelayEvent>,
    ) -> Self {
        Self {
            metadata,
            calendar,
            tasks,
            delay_events,
            options: EngineOptions::default(),
            outcome: None,
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn metadata(&self) -> &ProjectMetadata {
        &self.metadata
    }

    pub fn project_id(&self) -> i32 {
        self.metadata.project_id
    }

    pub fn project_name(&self) -> &str {
        &self.metadata.project_name
    }

    pub fn project_start_date(&self) -> NaiveDate {
        self.metadata.project_start_date
    }

    pub fn set_metadata(&mut self, metadata: ProjectMetadata) {
        self.metadata = metadata;
        self.invalidate();
    }

    pub fn set_project_name(&mut self, name: impl Into<String>) {
        self.metadata.project_name = name.into();
    }

    pub fn set_client_name(&mut self, client: impl Into<String>) {
        self.metadata.client_name = client.into();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.metadata.status = status.into();
    }

    pub fn set_project_start_date(&mut self, date: NaiveDate) {
        self.metadata.project_start_date = date;
        self.invalidate();
    }

    pub fn add_non_working_day(&mut self, date: NaiveDate) {
        if self.metadata.non_working_days.insert(date) {
            self.invalidate();
        }
    }

    pub fn remove_non_working_day(&mut self, date: NaiveDate) -> bool {
        let removed = self.metadata.non_working_days.remove(&date);
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Base calendar, without the project's own non-working days.
    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    pub fn calendar_config(&self) -> WorkCalendarConfig {
        self.calendar.to_config()
    }

    pub fn set_calendar(&mut self, calendar: WorkCalendar) {
        self.calendar = calendar;
        self.invalidate();
    }

    pub fn set_calendar_from_config(&mut self, config: &WorkCalendarConfig) {
        self.set_calendar(WorkCalendar::from_config(config));
    }

    /// The calendar the engine runs with: base calendar plus project blocked dates.
    pub fn effective_calendar(&self) -> WorkCalendar {
        let mut calendar = self.calendar.clone();
        for date in &self.metadata.non_working_days {
            calendar.add_blocked_date(*date);
        }
        calendar
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn set_options(&mut self, options: EngineOptions) {
        self.options = options;
        self.invalidate();
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn find_task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn next_task_id(&self) -> TaskId {
        self.tasks.iter().map(|task| task.id).max().unwrap_or(0) + 1
    }

    pub fn upsert_task(
        &mut self,
        id: TaskId,
        name: &str,
        duration_days: i64,
        predecessors: Option<Vec<TaskId>>,
    ) -> ScheduleResult<()> {
        let mut task = match self.find_task(id) {
            Some(existing) => existing.clone(),
            None => Task::new(id, name, duration_days),
        };
        task.name = name.to_string();
        task.duration_days = duration_days;
        if let Some(preds) = predecessors {
            task.predecessors = preds;
        }
        self.upsert_task_record(task)
    }

    pub fn upsert_task_record(&mut self, task: Task) -> ScheduleResult<()> {
        task_validation::validate_task(&task)?;
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
        self.invalidate();
        Ok(())
    }

    /// Remove a task and every dependency pointing at it.
    pub fn delete_task(&mut self, task_id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != task_id);
        if self.tasks.len() == before {
            return false;
        }
        for task in &mut self.tasks {
            task.predecessors.retain(|pred| *pred != task_id);
        }
        self.invalidate();
        true
    }

    pub fn update_task_duration(&mut self, task_id: TaskId, duration_days: i64) -> ScheduleResult<()> {
        let mut task = self.task_clone(task_id)?;
        task.duration_days = duration_days;
        self.upsert_task_record(task)
    }

    pub fn set_start_override(
        &mut self,
        task_id: TaskId,
        date: Option<NaiveDate>,
    ) -> ScheduleResult<()> {
        let mut task = self.task_clone(task_id)?;
        task.start_date_override = date;
        self.upsert_task_record(task)
    }

    pub fn set_percent_complete(&mut self, task_id: TaskId, percent: f64) -> ScheduleResult<()> {
        let mut task = self.task_clone(task_id)?;
        task.percent_complete = percent;
        self.upsert_task_record(task)
    }

    pub fn set_material_status(
        &mut self,
        task_id: TaskId,
        status: MaterialStatus,
    ) -> ScheduleResult<()> {
        let mut task = self.task_clone(task_id)?;
        task.material_status = status;
        self.upsert_task_record(task)
    }

    fn task_clone(&self, task_id: TaskId) -> ScheduleResult<Task> {
        self.find_task(task_id)
            .cloned()
            .ok_or(ScheduleError::TaskNotFound(task_id))
    }

    /// Append a template's tasks after the current highest id.
    pub fn apply_template(
        &mut self,
        template: &WbsTemplate,
        chaining: Chaining,
    ) -> ScheduleResult<Vec<TaskId>> {
        let new_tasks = template.instantiate(self.next_task_id(), chaining);
        for task in &new_tasks {
            task_validation::validate_task(task)?;
        }
        let ids = new_tasks.iter().map(|task| task.id).collect();
        self.tasks.extend(new_tasks);
        self.invalidate();
        Ok(ids)
    }

    fn invalidate(&mut self) {
        self.outcome = None;
    }

    /// Run the engine over the current state without caching anything.
    pub fn compute(&self) -> ScheduleOutcome {
        compute_schedule(
            &self.tasks,
            self.metadata.project_start_date,
            &self.effective_calendar(),
            &self.options,
        )
    }

    pub fn refresh(&mut self) -> RefreshSummary {
        let outcome = self.compute();
        let summary = outcome.summary.clone();
        self.outcome = Some(outcome);
        summary
    }

    /// Like `refresh`, but refuses to schedule a cyclic dependency graph.
    pub fn refresh_strict(&mut self) -> ScheduleResult<RefreshSummary> {
        ScheduleDag::build(&self.tasks).topological_order()?;
        Ok(self.refresh())
    }

    pub fn outcome(&self) -> Option<&ScheduleOutcome> {
        self.outcome.as_ref()
    }

    /// Cached outcome, computing it first when stale.
    pub fn current_outcome(&mut self) -> &ScheduleOutcome {
        if self.outcome.is_none() {
            self.outcome = Some(self.compute());
        }
        self.outcome.get_or_insert_with(ScheduleOutcome::default)
    }

    pub fn active_tasks_on(&mut self, date: NaiveDate) -> Vec<TaskId> {
        self.current_outcome()
            .active_on(date)
            .into_iter()
            .map(|task| task.id())
            .collect()
    }

    pub fn capture_baseline(&mut self) -> BaselineSnapshot {
        let snapshot = BaselineSnapshot::from_outcome(&self.compute());
        snapshot.apply_to(&mut self.tasks);
        self.invalidate();
        snapshot
    }

    pub fn clear_baseline(&mut self) {
        baseline::clear_baseline(&mut self.tasks);
        self.invalidate();
    }

    pub fn delay_events(&self) -> &[DelayEvent] {
        &self.delay_events
    }

    pub fn find_delay(&self, delay_id: i32) -> Option<&DelayEvent> {
        self.delay_events.iter().find(|event| event.id == delay_id)
    }

    pub fn next_delay_id(&self) -> i32 {
        self.delay_events.iter().map(|event| event.id).max().unwrap_or(0) + 1
    }

    /// Validate, apply and remember a delay event.
    pub fn record_delay(&mut self, event: DelayEvent) -> ScheduleResult<Vec<TaskId>> {
        event.validate()?;
        if self.find_delay(event.id).is_some() {
            return Err(ScheduleError::DuplicateDelay(event.id));
        }
        let touched = delay::apply_delay(&mut self.tasks, &event)?;
        tracing::info!(
            delay_id = event.id,
            reason = event.reason.as_str(),
            days_lost = event.days_lost,
            tasks = touched.len(),
            "delay recorded"
        );
        self.delay_events.push(event);
        self.invalidate();
        Ok(touched)
    }

    /// Revert and forget a delay event.
    pub fn remove_delay(&mut self, delay_id: i32) -> ScheduleResult<DelayEvent> {
        let position = self
            .delay_events
            .iter()
            .position(|event| event.id == delay_id)
            .ok_or(ScheduleError::DelayNotFound(delay_id))?;
        let event = self.delay_events.remove(position);
        delay::revert_delay(&mut self.tasks, &event);
        tracing::info!(delay_id, "delay removed");
        self.invalidate();
        Ok(event)
    }

    pub fn dataframe(&mut self) -> PolarsResult<DataFrame> {
        self.current_outcome().to_dataframe()
    }

    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            metadata: self.metadata.clone(),
            tasks: self.tasks.clone(),
        }
    }
}
