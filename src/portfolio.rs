//! Cross-project views: schedule many projects at once and summarise them.

use crate::calendar::WorkCalendar;
use crate::engine::{EngineOptions, ScheduleOutcome, compute_schedule};
use crate::metadata::ProjectMetadata;
use crate::task::{MaterialStatus, Task, TaskId};
use chrono::{Days, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub metadata: ProjectMetadata,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSchedule {
    pub project_id: i32,
    pub project_name: String,
    pub outcome: ScheduleOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialAlert {
    pub project_id: i32,
    pub task_id: TaskId,
    pub task_name: String,
    pub lead_time_days: i64,
    pub task_start: NaiveDate,
    /// Latest date the material can be ordered and still arrive for the start.
    pub order_by: NaiveDate,
    pub overdue: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub project_count: usize,
    pub task_count: usize,
    pub active_task_count: usize,
    pub critical_task_count: usize,
    pub material_alerts: Vec<MaterialAlert>,
}

/// Projects are independent, so each one is scheduled on its own rayon task.
/// `base_calendar` supplies working weekdays and shared blocked dates; each
/// project adds its own non-working days on top.
pub fn schedule_portfolio(
    projects: &[ProjectSnapshot],
    base_calendar: &WorkCalendar,
    options: &EngineOptions,
) -> Vec<ProjectSchedule> {
    projects
        .par_iter()
        .map(|project| {
            let mut calendar = base_calendar.clone();
            for date in &project.metadata.non_working_days {
                calendar.add_blocked_date(*date);
            }
            ProjectSchedule {
                project_id: project.metadata.project_id,
                project_name: project.metadata.project_name.clone(),
                outcome: compute_schedule(
                    &project.tasks,
                    project.metadata.project_start_date,
                    &calendar,
                    options,
                ),
            }
        })
        .collect()
}

/// Tasks whose start <= `date` <= end, across all projects.
pub fn active_task_count(schedules: &[ProjectSchedule], date: NaiveDate) -> usize {
    schedules
        .iter()
        .map(|schedule| schedule.outcome.active_on(date).len())
        .sum()
}

/// Tasks with a lead time whose material has not been ordered, soonest first.
pub fn material_alerts(schedules: &[ProjectSchedule], as_of: NaiveDate) -> Vec<MaterialAlert> {
    let mut alerts: Vec<MaterialAlert> = schedules
        .iter()
        .flat_map(|schedule| {
            schedule
                .outcome
                .tasks
                .iter()
                .filter(|scheduled| {
                    scheduled.task.material_lead_time_days > 0
                        && scheduled.task.material_status == MaterialStatus::NotOrdered
                })
                .map(move |scheduled| {
                    let lead = scheduled.task.material_lead_time_days;
                    let order_by = scheduled
                        .early_start
                        .checked_sub_days(Days::new(lead.unsigned_abs()))
                        .unwrap_or(NaiveDate::MIN);
                    MaterialAlert {
                        project_id: schedule.project_id,
                        task_id: scheduled.id(),
                        task_name: scheduled.task.name.clone(),
                        lead_time_days: lead,
                        task_start: scheduled.early_start,
                        order_by,
                        overdue: order_by < as_of,
                    }
                })
        })
        .collect();
    alerts.sort_by_key(|alert| (alert.order_by, alert.project_id, alert.task_id));
    alerts
}

pub fn portfolio_stats(schedules: &[ProjectSchedule], as_of: NaiveDate) -> PortfolioStats {
    PortfolioStats {
        project_count: schedules.len(),
        task_count: schedules.iter().map(|s| s.outcome.tasks.len()).sum(),
        active_task_count: active_task_count(schedules, as_of),
        critical_task_count: schedules
            .iter()
            .map(|s| s.outcome.summary.critical_count)
            .sum(),
        material_alerts: material_alerts(schedules, as_of),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn projects_keep_their_own_blocked_dates() {
        let mut first = ProjectMetadata::new(1, "First", d(2024, 1, 1));
        first.non_working_days.insert(d(2024, 1, 1));
        let second = ProjectMetadata::new(2, "Second", d(2024, 1, 1));
        let projects = vec![
            ProjectSnapshot {
                metadata: first,
                tasks: vec![Task::new(1, "A", 1)],
            },
            ProjectSnapshot {
                metadata: second,
                tasks: vec![Task::new(1, "A", 1)],
            },
        ];

        let schedules =
            schedule_portfolio(&projects, &WorkCalendar::default(), &EngineOptions::default());
        assert_eq!(schedules[0].outcome.tasks[0].early_start, d(2024, 1, 2));
        assert_eq!(schedules[1].outcome.tasks[0].early_start, d(2024, 1, 1));
        assert_eq!(active_task_count(&schedules, d(2024, 1, 1)), 1);
        assert_eq!(active_task_count(&schedules, d(2024, 1, 2)), 1);
    }

    #[test]
    fn ordered_materials_raise_no_alert() {
        let mut window = Task::new(1, "Window Install", 3);
        window.material_lead_time_days = 21;
        let mut ordered = window.clone();
        ordered.id = 2;
        ordered.material_status = MaterialStatus::Ordered;

        let projects = vec![ProjectSnapshot {
            metadata: ProjectMetadata::new(1, "P", d(2024, 3, 4)),
            tasks: vec![window, ordered],
        }];
        let schedules =
            schedule_portfolio(&projects, &WorkCalendar::default(), &EngineOptions::default());
        let alerts = material_alerts(&schedules, d(2024, 2, 20));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].order_by, d(2024, 2, 12));
        assert!(alerts[0].overdue);
    }

    #[test]
    fn huge_lead_time_orders_at_earliest_date() {
        let mut slab = Task::new(1, "Slab", 2);
        slab.material_lead_time_days = i64::MAX;
        let projects = vec![ProjectSnapshot {
            metadata: ProjectMetadata::new(1, "P", d(2024, 3, 4)),
            tasks: vec![slab],
        }];
        let schedules =
            schedule_portfolio(&projects, &WorkCalendar::default(), &EngineOptions::default());
        let alerts = material_alerts(&schedules, d(2024, 2, 20));
        assert_eq!(alerts[0].order_by, NaiveDate::MIN);
        assert!(alerts[0].overdue);
    }
}
