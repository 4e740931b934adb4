//! Pure scheduling entry point.
//!
//! `compute_schedule` takes a snapshot of one project's tasks and returns the
//! annotated schedule. It holds no state between calls and never writes back;
//! baseline capture and delay application live with the caller.

use crate::calculations::forward_pass::PassStrategy;
use crate::calculations::variance::{finish_variance_days, working_days_variance};
use crate::calculations::{CriticalityPass, CriticalityPolicy, ForwardPass};
use crate::calendar::WorkCalendar;
use crate::graph::ScheduleDag;
use crate::records::{RawTaskRecord, format_date, parse_project_start};
use crate::task::{Task, TaskId};
use chrono::NaiveDate;
use polars::prelude::PlSmallStr;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub criticality_policy: CriticalityPolicy,
    pub iteration_cap_factor: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            criticality_policy: CriticalityPolicy::default(),
            iteration_cap_factor: 2,
        }
    }
}

impl EngineOptions {
    /// Largest accepted iteration cap factor.
    pub const MAX_ITERATION_CAP_FACTOR: usize = 16;

    /// Cap factor brought into `1..=MAX_ITERATION_CAP_FACTOR`.
    pub fn effective_cap_factor(&self) -> usize {
        let factor = self.iteration_cap_factor;
        if factor > Self::MAX_ITERATION_CAP_FACTOR {
            tracing::warn!(
                requested = factor,
                limit = Self::MAX_ITERATION_CAP_FACTOR,
                "iteration cap factor clamped"
            );
        }
        factor.clamp(1, Self::MAX_ITERATION_CAP_FACTOR)
    }
}

/// A task plus the dates computed for it in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    #[serde(flatten)]
    pub task: Task,
    #[serde(rename = "start_date")]
    pub early_start: NaiveDate,
    #[serde(rename = "end_date")]
    pub early_finish: NaiveDate,
    pub is_critical: bool,
    /// Calendar days behind (+) or ahead of (-) the baseline finish.
    pub variance: i64,
    pub working_day_variance: i64,
}

impl ScheduledTask {
    pub fn id(&self) -> TaskId {
        self.task.id
    }

    pub fn start_date(&self) -> String {
        format_date(self.early_start)
    }

    pub fn end_date(&self) -> String {
        format_date(self.early_finish)
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.early_start <= date && date <= self.early_finish
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub task_count: usize,
    pub critical_count: usize,
    pub critical_path: Vec<TaskId>,
    pub latest_finish: Option<NaiveDate>,
    pub positive_variance_count: usize,
    pub negative_variance_count: usize,
    pub on_track_variance_count: usize,
    /// Tasks on dependency cycles; their dates are best-effort.
    pub cycle: Vec<TaskId>,
    pub converged: bool,
    pub dangling_references: usize,
}

impl RefreshSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("tasks={}", self.task_count));
        parts.push(format!("critical={}", self.critical_count));
        if let Some(date) = self.latest_finish {
            parts.push(format!("finish={}", date));
        }
        if self.positive_variance_count > 0 {
            parts.push(format!("variance+={}", self.positive_variance_count));
        }
        if self.negative_variance_count > 0 {
            parts.push(format!("variance-={}", self.negative_variance_count));
        }
        if self.on_track_variance_count > 0 {
            parts.push(format!("variance0={}", self.on_track_variance_count));
        }
        if !self.critical_path.is_empty() {
            let chain = self
                .critical_path
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("->");
            parts.push(format!("crit_path={}", chain));
        }
        if !self.cycle.is_empty() {
            let ids = self
                .cycle
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            parts.push(format!("cycle={}", ids));
        }
        if self.dangling_references > 0 {
            parts.push(format!("dangling={}", self.dangling_references));
        }
        parts.join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub tasks: Vec<ScheduledTask>,
    pub summary: RefreshSummary,
}

impl ScheduleOutcome {
    pub fn get(&self, task_id: TaskId) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|t| t.id() == task_id)
    }

    pub fn project_finish(&self) -> Option<NaiveDate> {
        self.summary.latest_finish
    }

    pub fn active_on(&self, date: NaiveDate) -> Vec<&ScheduledTask> {
        self.tasks.iter().filter(|t| t.is_active_on(date)).collect()
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let tasks = &self.tasks;
        let ids: Vec<i32> = tasks.iter().map(|t| t.task.id).collect();
        let names: Vec<&str> = tasks.iter().map(|t| t.task.name.as_str()).collect();
        let phases: Vec<&str> = tasks.iter().map(|t| t.task.phase.as_str()).collect();
        let durations: Vec<i64> = tasks.iter().map(|t| t.task.duration_days).collect();
        let starts: Vec<i32> = tasks.iter().map(|t| date_to_i32(t.early_start)).collect();
        let finishes: Vec<i32> = tasks.iter().map(|t| date_to_i32(t.early_finish)).collect();
        let baseline_finishes: Vec<Option<i32>> = tasks
            .iter()
            .map(|t| t.task.baseline_finish.map(date_to_i32))
            .collect();
        let critical: Vec<bool> = tasks.iter().map(|t| t.is_critical).collect();
        let variance: Vec<i64> = tasks.iter().map(|t| t.variance).collect();
        let exposure: Vec<&str> = tasks.iter().map(|t| t.task.exposure.as_str()).collect();
        let material: Vec<&str> = tasks
            .iter()
            .map(|t| t.task.material_status.as_str())
            .collect();

        let predecessor_rows: Vec<Series> = tasks
            .iter()
            .map(|t| Series::new(PlSmallStr::from_static(""), t.task.dependency_set()))
            .collect();

        let columns: Vec<Column> = vec![
            Series::new(PlSmallStr::from_static("id"), ids).into_column(),
            Series::new(PlSmallStr::from_static("name"), names).into_column(),
            Series::new(PlSmallStr::from_static("phase"), phases).into_column(),
            Series::new(PlSmallStr::from_static("duration_days"), durations).into_column(),
            Series::new(
                PlSmallStr::from_static("predecessors"),
                predecessor_rows.as_slice(),
            )
            .into_column(),
            Series::new(PlSmallStr::from_static("start_date"), starts)
                .cast(&DataType::Date)?
                .into_column(),
            Series::new(PlSmallStr::from_static("end_date"), finishes)
                .cast(&DataType::Date)?
                .into_column(),
            Series::new(PlSmallStr::from_static("baseline_finish"), baseline_finishes)
                .cast(&DataType::Date)?
                .into_column(),
            Series::new(PlSmallStr::from_static("is_critical"), critical).into_column(),
            Series::new(PlSmallStr::from_static("variance"), variance).into_column(),
            Series::new(PlSmallStr::from_static("exposure"), exposure).into_column(),
            Series::new(PlSmallStr::from_static("material_status"), material).into_column(),
        ];

        DataFrame::new(columns)
    }
}

fn date_to_i32(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

/// Compute start/end dates, criticality and variance for one project.
///
/// Never fails: duplicated ids keep their first occurrence, unknown
/// predecessors are ignored, and a dependency cycle yields a bounded
/// best-effort schedule flagged in the summary.
pub fn compute_schedule(
    tasks: &[Task],
    project_start: NaiveDate,
    calendar: &WorkCalendar,
    options: &EngineOptions,
) -> ScheduleOutcome {
    let mut seen = HashSet::with_capacity(tasks.len());
    let unique: Vec<Task> = tasks
        .iter()
        .filter(|task| {
            let fresh = seen.insert(task.id);
            if !fresh {
                tracing::warn!(task_id = task.id, "ignoring duplicated task id");
            }
            fresh
        })
        .cloned()
        .collect();

    if unique.is_empty() {
        return ScheduleOutcome::default();
    }

    let dag = ScheduleDag::build(&unique);
    let forward = ForwardPass::new(&unique, calendar, &dag, project_start)
        .execute(options.effective_cap_factor());
    let critical =
        CriticalityPass::new(&forward.dates, &dag).execute(options.criticality_policy);

    let fallback_start = calendar.next_working_day(project_start);
    let scheduled: Vec<ScheduledTask> = unique
        .into_iter()
        .map(|task| {
            let (early_start, early_finish) = forward
                .dates
                .get(&task.id)
                .copied()
                .unwrap_or((fallback_start, fallback_start));
            let variance = finish_variance_days(early_finish, task.baseline_finish);
            let working_day_variance =
                working_days_variance(calendar, early_finish, task.baseline_finish);
            ScheduledTask {
                is_critical: critical.contains(&task.id),
                task,
                early_start,
                early_finish,
                variance,
                working_day_variance,
            }
        })
        .collect();

    let summary = summarize(&scheduled, &forward.cycle, forward.strategy, &dag);
    tracing::info!(
        tasks = summary.task_count,
        critical = summary.critical_count,
        finish = ?summary.latest_finish,
        converged = summary.converged,
        "schedule computed"
    );

    ScheduleOutcome {
        tasks: scheduled,
        summary,
    }
}

/// Entry point for loosely-typed rows: project start and blocked dates as ISO
/// strings, dependencies as stored text.
pub fn compute_schedule_from_records(
    records: Vec<RawTaskRecord>,
    project_start: Option<&str>,
    blocked_dates: &[String],
    options: &EngineOptions,
) -> ScheduleOutcome {
    if records.is_empty() {
        return ScheduleOutcome::default();
    }
    let tasks: Vec<Task> = records.into_iter().map(RawTaskRecord::into_task).collect();
    let calendar = WorkCalendar::from_iso_strings(blocked_dates);
    compute_schedule(&tasks, parse_project_start(project_start), &calendar, options)
}

fn summarize(
    tasks: &[ScheduledTask],
    cycle: &[TaskId],
    strategy: PassStrategy,
    dag: &ScheduleDag,
) -> RefreshSummary {
    let mut summary = RefreshSummary {
        task_count: tasks.len(),
        cycle: cycle.to_vec(),
        converged: match strategy {
            PassStrategy::Topological => true,
            PassStrategy::FixedPoint { converged, .. } => converged,
        },
        dangling_references: dag.dangling_references().len(),
        ..RefreshSummary::default()
    };

    let mut critical_path: Vec<(NaiveDate, TaskId)> = Vec::new();
    for task in tasks {
        if task.is_critical {
            summary.critical_count += 1;
            critical_path.push((task.early_start, task.id()));
        }
        if task.task.has_baseline() {
            match task.variance {
                v if v > 0 => summary.positive_variance_count += 1,
                v if v < 0 => summary.negative_variance_count += 1,
                _ => summary.on_track_variance_count += 1,
            }
        }
    }

    critical_path.sort();
    summary.critical_path = critical_path.into_iter().map(|(_, id)| id).collect();
    summary.latest_finish = tasks.iter().map(|t| t.early_finish).max();
    summary
}
