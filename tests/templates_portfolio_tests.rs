use chrono::{Duration, NaiveDate};
use site_schedule::portfolio::{
    ProjectSnapshot, active_task_count, material_alerts, portfolio_stats, schedule_portfolio,
};
use site_schedule::templates::{Chaining, RESIDENTIAL, TemplateLibrary, WbsTemplate};
use site_schedule::{
    EngineOptions, Exposure, MaterialStatus, ProjectMetadata, Schedule, WorkCalendar,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn residential_project(id: i32, start: NaiveDate) -> Schedule {
    let mut schedule = Schedule::new_with_metadata(ProjectMetadata::new(id, "Lot", start));
    schedule
        .apply_template(&WbsTemplate::residential(), Chaining::Sequential)
        .unwrap();
    schedule
}

#[test]
fn residential_template_schedules_end_to_end() {
    let mut schedule = residential_project(1, d(2024, 1, 1));
    let outcome = schedule.current_outcome();

    let cure = outcome.tasks.iter().find(|t| t.task.name == "Cure Time").unwrap();
    assert_eq!((cure.early_start, cure.early_finish), (d(2024, 1, 3), d(2024, 1, 11)));
    assert_eq!(cure.task.phase, "Foundation");
    assert_eq!(cure.task.exposure, Exposure::Outdoor);

    let windows = outcome
        .tasks
        .iter()
        .find(|t| t.task.name == "Window Install")
        .unwrap();
    assert_eq!(windows.early_start, d(2024, 1, 19));
    assert_eq!(windows.task.material_lead_time_days, 21);

    // A single sequential chain is critical end to end.
    assert_eq!(outcome.summary.critical_count, 7);
}

#[test]
fn unchained_template_tasks_all_start_together() {
    let mut schedule = Schedule::new_with_metadata(ProjectMetadata::new(1, "Lot", d(2024, 1, 1)));
    schedule
        .apply_template(&WbsTemplate::residential(), Chaining::None)
        .unwrap();
    let outcome = schedule.current_outcome();
    assert!(outcome.tasks.iter().all(|t| t.early_start == d(2024, 1, 1)));
}

#[test]
fn template_json_round_trip() {
    let template = WbsTemplate::residential();
    let json = template.to_json().unwrap();
    assert_eq!(WbsTemplate::from_json(&json).unwrap(), template);
}

#[test]
fn library_lists_categories() {
    let mut library = TemplateLibrary::builtin();
    library.insert("Commercial", WbsTemplate::default());
    assert_eq!(library.categories(), vec!["Commercial", RESIDENTIAL]);
    assert_eq!(library.get(RESIDENTIAL).unwrap().task_count(), 7);
    assert!(library.get("Industrial").is_none());
}

#[test]
fn portfolio_flags_material_orders() {
    let first = residential_project(1, d(2024, 1, 1));
    let mut second = residential_project(2, d(2024, 3, 4));
    // Window Install is the sixth template task
    second.set_material_status(6, MaterialStatus::Ordered).unwrap();

    let schedules = schedule_portfolio(
        &[first.snapshot(), second.snapshot()],
        &WorkCalendar::default(),
        &EngineOptions::default(),
    );
    assert_eq!(schedules.len(), 2);

    let alerts = material_alerts(&schedules, d(2024, 1, 1));
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.project_id, 1);
    assert_eq!(alert.task_name, "Window Install");
    assert_eq!(alert.order_by, alert.task_start - Duration::days(21));
    assert!(alert.overdue);

    let early = material_alerts(&schedules, d(2023, 12, 1));
    assert!(!early[0].overdue);
}

#[test]
fn portfolio_stats_aggregate_projects() {
    let projects: Vec<ProjectSnapshot> = (1..=3)
        .map(|id| residential_project(id, d(2024, 1, 1)).snapshot())
        .collect();
    let schedules = schedule_portfolio(&projects, &WorkCalendar::default(), &EngineOptions::default());

    // Excavation runs Jan 1-3 in every project
    assert_eq!(active_task_count(&schedules, d(2024, 1, 2)), 3);

    let stats = portfolio_stats(&schedules, d(2024, 1, 2));
    assert_eq!(stats.project_count, 3);
    assert_eq!(stats.task_count, 21);
    assert_eq!(stats.active_task_count, 3);
    assert_eq!(stats.material_alerts.len(), 3);
}
