use chrono::NaiveDate;
use site_schedule::templates::{Chaining, WbsTemplate};
use site_schedule::{
    DelayEvent, DelayReason, MAX_DURATION_DAYS, ProjectMetadata, Schedule, ScheduleError,
    WorkCalendar,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn two_task_schedule() -> Schedule {
    let mut schedule =
        Schedule::new_with_metadata(ProjectMetadata::new(1, "Maple St", d(2024, 1, 1)));
    schedule.upsert_task(1, "A", 3, None).unwrap();
    schedule.upsert_task(2, "B", 2, Some(vec![1])).unwrap();
    schedule
}

fn dates(schedule: &mut Schedule, id: i32) -> (NaiveDate, NaiveDate) {
    let task = schedule.current_outcome().get(id).unwrap();
    (task.early_start, task.early_finish)
}

fn weather(id: i32, days: i64, affected: impl IntoIterator<Item = i32>) -> DelayEvent {
    DelayEvent::new(id, 1, DelayReason::Weather, days, affected, d(2024, 1, 2))
}

#[test]
fn delay_pushes_affected_task_and_successors() {
    let mut schedule = two_task_schedule();
    let touched = schedule.record_delay(weather(1, 5, [1])).unwrap();
    assert_eq!(touched, vec![1]);
    assert_eq!(schedule.find_task(1).unwrap().duration_days, 8);

    schedule.refresh();
    assert_eq!(dates(&mut schedule, 1), (d(2024, 1, 1), d(2024, 1, 10)));
    assert_eq!(dates(&mut schedule, 2), (d(2024, 1, 10), d(2024, 1, 11)));
}

#[test]
fn removing_delay_restores_previous_dates() {
    let mut schedule = two_task_schedule();
    schedule.record_delay(weather(1, 5, [1])).unwrap();
    let removed = schedule.remove_delay(1).unwrap();
    assert_eq!(removed.days_lost, 5);
    assert!(schedule.delay_events().is_empty());

    assert_eq!(schedule.find_task(1).unwrap().duration_days, 3);
    assert_eq!(dates(&mut schedule, 1), (d(2024, 1, 1), d(2024, 1, 3)));
    assert_eq!(dates(&mut schedule, 2), (d(2024, 1, 3), d(2024, 1, 4)));
}

#[test]
fn invalid_delays_are_rejected() {
    let mut schedule = two_task_schedule();
    assert!(matches!(
        schedule.record_delay(weather(1, 0, [1])),
        Err(ScheduleError::InvalidDelay(_))
    ));
    assert!(matches!(
        schedule.record_delay(weather(1, 2, std::iter::empty())),
        Err(ScheduleError::InvalidDelay(_))
    ));

    schedule.record_delay(weather(1, 2, [1])).unwrap();
    assert!(matches!(
        schedule.record_delay(weather(1, 2, [2])),
        Err(ScheduleError::DuplicateDelay(1))
    ));
    assert!(matches!(
        schedule.remove_delay(42),
        Err(ScheduleError::DelayNotFound(42))
    ));
}

#[test]
fn oversized_delays_leave_the_schedule_untouched() {
    let mut schedule = two_task_schedule();
    let before = dates(&mut schedule, 2);
    assert!(matches!(
        schedule.record_delay(weather(1, i64::MAX, [1])),
        Err(ScheduleError::InvalidDelay(_))
    ));

    // Stacked delays stop at the duration limit
    schedule.record_delay(weather(1, MAX_DURATION_DAYS - 3, [1])).unwrap();
    assert_eq!(schedule.find_task(1).unwrap().duration_days, MAX_DURATION_DAYS);
    assert!(matches!(
        schedule.record_delay(weather(2, 1, [1, 2])),
        Err(ScheduleError::InvalidDelay(_))
    ));
    assert_eq!(schedule.find_task(2).unwrap().duration_days, 2);
    assert_eq!(schedule.delay_events().len(), 1);

    schedule.remove_delay(1).unwrap();
    assert_eq!(dates(&mut schedule, 2), before);
}

#[test]
fn baseline_then_delay_reports_variance() {
    let mut schedule = two_task_schedule();
    let snapshot = schedule.capture_baseline();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(schedule.find_task(2).unwrap().baseline_finish, Some(d(2024, 1, 4)));

    let summary = schedule.refresh();
    assert_eq!(summary.on_track_variance_count, 2);

    schedule.record_delay(weather(1, 2, [1])).unwrap();
    let summary = schedule.refresh();
    let outcome = schedule.current_outcome();

    // A: Jan 1-5 vs baseline Jan 3. B: Jan 5-8 vs baseline Jan 4 (over a weekend).
    let a = outcome.get(1).unwrap();
    assert_eq!(a.variance, 2);
    assert_eq!(a.working_day_variance, 2);
    let b = outcome.get(2).unwrap();
    assert_eq!(b.early_finish, d(2024, 1, 8));
    assert_eq!(b.variance, 4);
    assert_eq!(b.working_day_variance, 2);
    assert_eq!(summary.positive_variance_count, 2);
}

#[test]
fn no_baseline_means_zero_variance() {
    let mut schedule = two_task_schedule();
    let summary = schedule.refresh();
    assert!(schedule.current_outcome().tasks.iter().all(|t| t.variance == 0));
    assert_eq!(summary.positive_variance_count + summary.negative_variance_count, 0);

    schedule.capture_baseline();
    schedule.clear_baseline();
    assert!(schedule.tasks().iter().all(|t| t.baseline_finish.is_none()));
}

#[test]
fn weekend_project_start_moves_to_monday() {
    let mut schedule =
        Schedule::new_with_metadata(ProjectMetadata::new(3, "Weekend", d(2024, 1, 6)));
    schedule.upsert_task(1, "Mobilize", 1, None).unwrap();
    assert_eq!(dates(&mut schedule, 1), (d(2024, 1, 8), d(2024, 1, 8)));
}

#[test]
fn project_holidays_are_respected() {
    let mut schedule = two_task_schedule();
    schedule.add_non_working_day(d(2024, 1, 2));
    // A now runs Jan 1, 3, 4
    assert_eq!(dates(&mut schedule, 1), (d(2024, 1, 1), d(2024, 1, 4)));

    assert!(schedule.remove_non_working_day(d(2024, 1, 2)));
    assert!(!schedule.remove_non_working_day(d(2024, 1, 2)));
    assert_eq!(dates(&mut schedule, 1), (d(2024, 1, 1), d(2024, 1, 3)));
}

#[test]
fn base_calendar_and_project_holidays_combine() {
    let mut schedule = Schedule::new_with_metadata_and_calendar(
        ProjectMetadata::new(1, "Combined", d(2024, 1, 1)),
        WorkCalendar::with_blocked_dates([d(2024, 1, 1)]),
    );
    schedule.add_non_working_day(d(2024, 1, 2));
    schedule.upsert_task(1, "A", 1, None).unwrap();
    assert_eq!(dates(&mut schedule, 1).0, d(2024, 1, 3));
}

#[test]
fn deleting_a_task_unlinks_successors() {
    let mut schedule = two_task_schedule();
    assert!(schedule.delete_task(1));
    assert!(!schedule.delete_task(1));
    assert!(schedule.find_task(2).unwrap().predecessors.is_empty());
    assert_eq!(dates(&mut schedule, 2), (d(2024, 1, 1), d(2024, 1, 2)));
}

#[test]
fn edits_invalidate_cached_outcome() {
    let mut schedule = two_task_schedule();
    schedule.refresh();
    assert!(schedule.outcome().is_some());

    schedule.update_task_duration(1, 1).unwrap();
    assert!(schedule.outcome().is_none());
    assert_eq!(dates(&mut schedule, 2).0, d(2024, 1, 1));

    assert!(matches!(
        schedule.update_task_duration(9, 1),
        Err(ScheduleError::TaskNotFound(9))
    ));
    assert!(matches!(
        schedule.update_task_duration(1, 0),
        Err(ScheduleError::InvalidTask(_))
    ));
}

#[test]
fn start_override_set_and_cleared() {
    let mut schedule = two_task_schedule();
    schedule.set_start_override(2, Some(d(2024, 1, 11))).unwrap();
    assert_eq!(dates(&mut schedule, 2).0, d(2024, 1, 11));
    schedule.set_start_override(2, None).unwrap();
    assert_eq!(dates(&mut schedule, 2).0, d(2024, 1, 3));
}

#[test]
fn strict_refresh_rejects_cycles() {
    let mut schedule = two_task_schedule();
    schedule.upsert_task(1, "A", 3, Some(vec![2])).unwrap();
    assert!(matches!(
        schedule.refresh_strict(),
        Err(ScheduleError::CycleDetected { .. })
    ));
    let summary = schedule.refresh();
    assert_eq!(summary.cycle, vec![1, 2]);
    assert_eq!(summary.task_count, 2);
}

#[test]
fn active_tasks_on_date() {
    let mut schedule = two_task_schedule();
    let mut active = schedule.active_tasks_on(d(2024, 1, 3));
    active.sort();
    assert_eq!(active, vec![1, 2]);
    assert!(schedule.active_tasks_on(d(2024, 1, 5)).is_empty());
}

#[test]
fn template_tasks_append_after_existing_ids() {
    let mut schedule = two_task_schedule();
    let template = WbsTemplate::residential();
    let ids = schedule.apply_template(&template, Chaining::Sequential).unwrap();
    assert_eq!(ids.len(), template.task_count());
    assert_eq!(ids[0], 3);
    assert_eq!(schedule.task_count(), 2 + template.task_count());

    let second = schedule.find_task(ids[1]).unwrap();
    assert_eq!(second.predecessors, vec![ids[0]]);

    let summary = schedule.refresh();
    assert!(summary.converged);
    assert!(summary.cycle.is_empty());
}

#[test]
fn dataframe_has_a_row_per_task() {
    let mut schedule = two_task_schedule();
    let df = schedule.dataframe().unwrap();
    assert_eq!(df.height(), 2);
    for column in ["id", "name", "start_date", "end_date", "is_critical", "variance"] {
        assert!(df.column(column).is_ok(), "missing column {column}");
    }
}
