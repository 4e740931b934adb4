use crate::calculations::forward_pass::EarlyDates;
use crate::graph::ScheduleDag;
use crate::task::TaskId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;

/// How critical tasks are picked out of a forward-pass result.
///
/// Neither policy computes CPM float. `BackwardPropagation` walks back from the
/// tasks that finish on the project's last day and marks every predecessor that
/// hands off to an already-critical successor without a gap. With several
/// parallel chains finishing close together it can over- or under-mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalityPolicy {
    /// Only tasks finishing on the overall completion date.
    FinishDate,
    #[default]
    BackwardPropagation,
}

impl CriticalityPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriticalityPolicy::FinishDate => "finish_date",
            CriticalityPolicy::BackwardPropagation => "backward_propagation",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "finish_date" | "naive" => Some(CriticalityPolicy::FinishDate),
            "backward_propagation" | "backward" => Some(CriticalityPolicy::BackwardPropagation),
            _ => None,
        }
    }
}

pub struct CriticalityPass<'a> {
    dates: &'a EarlyDates,
    dag: &'a ScheduleDag,
}

impl<'a> CriticalityPass<'a> {
    pub fn new(dates: &'a EarlyDates, dag: &'a ScheduleDag) -> Self {
        Self { dates, dag }
    }

    pub fn project_finish(&self) -> Option<NaiveDate> {
        self.dates.values().map(|(_, ef)| *ef).max()
    }

    pub fn execute(&self, policy: CriticalityPolicy) -> HashSet<TaskId> {
        let Some(project_finish) = self.project_finish() else {
            return HashSet::new();
        };

        let mut critical: HashSet<TaskId> = self
            .dates
            .iter()
            .filter(|(_, (_, ef))| *ef >= project_finish)
            .map(|(id, _)| *id)
            .collect();

        if policy == CriticalityPolicy::FinishDate {
            return critical;
        }

        // Latest finishers first so successors are usually settled before
        // their predecessors; repeat the sweep to pick up ties.
        let mut order: Vec<(TaskId, NaiveDate)> =
            self.dates.iter().map(|(id, (_, ef))| (*id, *ef)).collect();
        order.sort_by_key(|&(id, ef)| (Reverse(ef), id));

        let mut changed = true;
        while changed {
            changed = false;
            for &(task_id, finish) in &order {
                if critical.contains(&task_id) {
                    continue;
                }
                let drives_critical = self.dag.successors(task_id).iter().any(|succ| {
                    critical.contains(succ)
                        && self
                            .dates
                            .get(succ)
                            .is_some_and(|(succ_start, _)| finish >= *succ_start)
                });
                if drives_critical {
                    tracing::debug!(task_id, "task drives a critical successor");
                    critical.insert(task_id);
                    changed = true;
                }
            }
        }

        critical
    }
}
