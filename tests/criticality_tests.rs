use chrono::NaiveDate;
use site_schedule::{
    CriticalityPolicy, EngineOptions, ScheduleOutcome, Task, WorkCalendar, compute_schedule,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn diamond() -> Vec<Task> {
    vec![
        Task::new(1, "Foundation", 2),
        Task::new(2, "Framing", 3).with_predecessors([1]),
        Task::new(3, "Plumbing rough-in", 1).with_predecessors([1]),
        Task::new(4, "Roofing", 2).with_predecessors([2, 3]),
    ]
}

fn run(tasks: &[Task], policy: CriticalityPolicy) -> ScheduleOutcome {
    let options = EngineOptions {
        criticality_policy: policy,
        ..EngineOptions::default()
    };
    compute_schedule(tasks, d(2024, 1, 1), &WorkCalendar::default(), &options)
}

fn critical_ids(outcome: &ScheduleOutcome) -> Vec<i32> {
    let mut ids: Vec<i32> = outcome
        .tasks
        .iter()
        .filter(|task| task.is_critical)
        .map(|task| task.id())
        .collect();
    ids.sort();
    ids
}

#[test]
fn diamond_dates() {
    let outcome = run(&diamond(), CriticalityPolicy::default());
    let expect = [
        (1, d(2024, 1, 1), d(2024, 1, 2)),
        (2, d(2024, 1, 2), d(2024, 1, 4)),
        (3, d(2024, 1, 2), d(2024, 1, 2)),
        (4, d(2024, 1, 4), d(2024, 1, 5)),
    ];
    for (id, start, finish) in expect {
        let task = outcome.get(id).unwrap();
        assert_eq!((task.early_start, task.early_finish), (start, finish), "task {id}");
    }
    assert_eq!(outcome.project_finish(), Some(d(2024, 1, 5)));
}

#[test]
fn backward_propagation_marks_the_driving_chain() {
    let outcome = run(&diamond(), CriticalityPolicy::BackwardPropagation);
    assert_eq!(critical_ids(&outcome), vec![1, 2, 4]);
    assert_eq!(outcome.summary.critical_path, vec![1, 2, 4]);
    assert_eq!(outcome.summary.critical_count, 3);
}

#[test]
fn finish_date_policy_only_marks_last_finishers() {
    let outcome = run(&diamond(), CriticalityPolicy::FinishDate);
    assert_eq!(critical_ids(&outcome), vec![4]);
}

#[test]
fn parallel_chains_finishing_together_are_both_critical() {
    let tasks = vec![
        Task::new(1, "Electrical", 3),
        Task::new(2, "HVAC", 3),
        Task::new(3, "Drywall", 1).with_predecessors([1]),
    ];
    let outcome = run(&tasks, CriticalityPolicy::BackwardPropagation);
    // 1 and 2 end Jan 3, 3 runs Jan 3 only
    assert_eq!(outcome.project_finish(), Some(d(2024, 1, 3)));
    assert_eq!(critical_ids(&outcome), vec![1, 2, 3]);
}

#[test]
fn at_least_one_task_is_critical() {
    let tasks = vec![Task::new(7, "Punch list", 1)];
    let outcome = run(&tasks, CriticalityPolicy::FinishDate);
    assert_eq!(critical_ids(&outcome), vec![7]);
}

#[test]
fn policy_names_parse() {
    assert_eq!(
        CriticalityPolicy::from_str("finish_date"),
        Some(CriticalityPolicy::FinishDate)
    );
    assert_eq!(
        CriticalityPolicy::from_str("backward"),
        Some(CriticalityPolicy::BackwardPropagation)
    );
    assert_eq!(CriticalityPolicy::from_str("float"), None);
}
