use crate::calendar::WorkCalendar;
use crate::error::ScheduleError;
use crate::graph::ScheduleDag;
use crate::task::{MAX_DURATION_DAYS, Task, TaskId};
use chrono::NaiveDate;
use std::collections::HashMap;

pub type EarlyDates = HashMap<TaskId, (NaiveDate, NaiveDate)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStrategy {
    Topological,
    FixedPoint { iterations: usize, converged: bool },
}

#[derive(Debug, Clone)]
pub struct ForwardPassResult {
    pub dates: EarlyDates,
    pub strategy: PassStrategy,
    /// Tasks found on dependency cycles. Empty for a DAG.
    pub cycle: Vec<TaskId>,
}

/// Early start / early finish propagation.
///
/// A task starts on the latest of its floor (override date, or the project
/// start) and its predecessors' finish dates, normalized to a working day. It
/// finishes `duration` working days later, counting the start day.
pub struct ForwardPass<'a> {
    tasks: Vec<&'a Task>,
    calendar: &'a WorkCalendar,
    dag: &'a ScheduleDag,
    project_start: NaiveDate,
}

impl<'a> ForwardPass<'a> {
    pub fn new(
        tasks: &'a [Task],
        calendar: &'a WorkCalendar,
        dag: &'a ScheduleDag,
        project_start: NaiveDate,
    ) -> Self {
        // First occurrence wins for duplicated ids, matching the DAG.
        let mut seen = std::collections::HashSet::with_capacity(tasks.len());
        let tasks = tasks.iter().filter(|task| seen.insert(task.id)).collect();
        Self {
            tasks,
            calendar,
            dag,
            project_start,
        }
    }

    /// Topological pass, falling back to the capped fixed point when the graph
    /// has a cycle.
    pub fn execute(&self, iteration_cap_factor: usize) -> ForwardPassResult {
        match self.execute_strict() {
            Ok(dates) => ForwardPassResult {
                dates,
                strategy: PassStrategy::Topological,
                cycle: Vec::new(),
            },
            Err(ScheduleError::CycleDetected { task_ids }) => {
                tracing::warn!(
                    tasks = ?task_ids,
                    "dependency cycle detected, falling back to capped iteration"
                );
                let cap = self
                    .tasks
                    .len()
                    .max(1)
                    .saturating_mul(iteration_cap_factor.max(1));
                let (dates, iterations, converged) = self.execute_fixed_point(cap);
                ForwardPassResult {
                    dates,
                    strategy: PassStrategy::FixedPoint {
                        iterations,
                        converged,
                    },
                    cycle: task_ids,
                }
            }
            Err(other) => {
                // toposort only ever reports cycles
                tracing::error!(error = %other, "unexpected forward pass failure");
                let (dates, iterations, converged) = self.execute_fixed_point(self.tasks.len());
                ForwardPassResult {
                    dates,
                    strategy: PassStrategy::FixedPoint {
                        iterations,
                        converged,
                    },
                    cycle: Vec::new(),
                }
            }
        }
    }

    /// Single pass in dependency order. Fails on a cycle.
    pub fn execute_strict(&self) -> Result<EarlyDates, ScheduleError> {
        let order = self.dag.topological_order()?;
        let by_id: HashMap<TaskId, &Task> = self.tasks.iter().map(|t| (t.id, *t)).collect();
        let mut dates: EarlyDates = HashMap::with_capacity(order.len());

        for task_id in order {
            let Some(task) = by_id.get(&task_id) else {
                continue;
            };
            let pred_finish = self
                .dag
                .predecessors(task_id)
                .iter()
                .filter_map(|pred| dates.get(pred).map(|(_, ef)| *ef))
                .max();
            let floor = self.floor(task);
            let start = self
                .calendar
                .next_working_day(pred_finish.map_or(floor, |pf| pf.max(floor)));
            let finish = self.finish_for(task, start);
            tracing::debug!(task_id, %start, %finish, "scheduled task");
            dates.insert(task_id, (start, finish));
        }

        Ok(dates)
    }

    /// Repeated relaxation until nothing moves or `cap` passes have run.
    ///
    /// Starts only ever move later, so the loop is bounded even on a cyclic
    /// graph; the result is then not a true fixed point.
    pub fn execute_fixed_point(&self, cap: usize) -> (EarlyDates, usize, bool) {
        let mut dates: EarlyDates = self
            .tasks
            .iter()
            .map(|task| {
                let start = self.floor(task);
                (task.id, (start, self.finish_for(task, start)))
            })
            .collect();

        let mut iterations = 0;
        let mut converged = false;
        while iterations < cap {
            iterations += 1;
            let mut changed = false;

            for task in &self.tasks {
                let preds = self.dag.predecessors(task.id);
                if preds.is_empty() {
                    continue;
                }
                let Some(pred_finish) = preds
                    .iter()
                    .filter_map(|pred| dates.get(pred).map(|(_, ef)| *ef))
                    .max()
                else {
                    continue;
                };
                let candidate = self.calendar.next_working_day(pred_finish.max(self.floor(task)));
                let current = dates.get(&task.id).map(|(es, _)| *es);
                if current.is_none_or(|es| candidate > es) {
                    dates.insert(task.id, (candidate, self.finish_for(task, candidate)));
                    changed = true;
                }
            }

            if !changed {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(iterations, "forward pass hit its iteration cap without converging");
        }
        (dates, iterations, converged)
    }

    fn floor(&self, task: &Task) -> NaiveDate {
        self.calendar
            .next_working_day(task.start_date_override.unwrap_or(self.project_start))
    }

    fn finish_for(&self, task: &Task, start: NaiveDate) -> NaiveDate {
        self.calendar
            .add_working_days(start, task.duration_days.clamp(0, MAX_DURATION_DAYS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<Task> {
        vec![
            Task::new(4, "Roof", 2).with_predecessors([2, 3]),
            Task::new(3, "Plumbing", 1).with_predecessors([1]),
            Task::new(2, "Framing", 3).with_predecessors([1]),
            Task::new(1, "Foundation", 2),
        ]
    }

    #[test]
    fn fixed_point_matches_topological_pass_on_dag() {
        let tasks = sample();
        let calendar = WorkCalendar::default();
        let dag = ScheduleDag::build(&tasks);
        let pass = ForwardPass::new(&tasks, &calendar, &dag, d(2024, 1, 1));

        let strict = pass.execute_strict().unwrap();
        let (relaxed, _, converged) = pass.execute_fixed_point(tasks.len() * 2);
        assert!(converged);
        assert_eq!(strict, relaxed);
    }

    #[test]
    fn cycle_falls_back_and_stays_bounded() {
        let tasks = vec![
            Task::new(1, "A", 2).with_predecessors([2]),
            Task::new(2, "B", 2).with_predecessors([1]),
            Task::new(3, "C", 1),
        ];
        let calendar = WorkCalendar::default();
        let dag = ScheduleDag::build(&tasks);
        let pass = ForwardPass::new(&tasks, &calendar, &dag, d(2024, 1, 1));

        let result = pass.execute(2);
        assert_eq!(result.cycle, vec![1, 2]);
        assert_eq!(
            result.strategy,
            PassStrategy::FixedPoint {
                iterations: 6,
                converged: false
            }
        );
        assert_eq!(result.dates[&3], (d(2024, 1, 1), d(2024, 1, 1)));
        assert!(pass.execute_strict().is_err());
    }
}
