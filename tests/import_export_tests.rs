use chrono::NaiveDate;
use site_schedule::{
    DelayEvent, DelayReason, Exposure, MaterialStatus, PersistenceError, ProjectMetadata, Schedule,
    WorkCalendar, export_outcome_to_csv, load_schedule_from_csv, load_schedule_from_json,
    save_schedule_to_csv, save_schedule_to_json,
};
use tempfile::tempdir;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_schedule() -> Schedule {
    let mut metadata = ProjectMetadata::new(7, "Oak Ridge Duplex", d(2024, 1, 1));
    metadata.client_name = "Harbor Homes".to_string();
    metadata.non_working_days.insert(d(2024, 1, 15));
    let mut schedule = Schedule::new_with_metadata_and_calendar(
        metadata,
        WorkCalendar::with_blocked_dates([d(2024, 2, 19)]),
    );
    schedule.upsert_task(1, "Foundation", 5, None).unwrap();
    schedule.upsert_task(2, "Framing", 8, Some(vec![1])).unwrap();
    schedule.upsert_task(3, "Roofing", 4, Some(vec![2])).unwrap();
    schedule.set_start_override(3, Some(d(2024, 2, 1))).unwrap();
    schedule.set_material_status(3, MaterialStatus::Ordered).unwrap();
    schedule.set_percent_complete(1, 40.0).unwrap();
    schedule.capture_baseline();
    schedule
}

#[test]
fn json_round_trip_keeps_everything() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("schedule.json");

    let mut original = sample_schedule();
    original
        .record_delay(DelayEvent::new(
            1,
            7,
            DelayReason::Material,
            2,
            [2],
            d(2024, 1, 9),
        ))
        .unwrap();
    save_schedule_to_json(&original, &path).unwrap();

    let mut loaded = load_schedule_from_json(&path).unwrap();
    assert_eq!(loaded.metadata(), original.metadata());
    assert_eq!(loaded.tasks(), original.tasks());
    assert_eq!(loaded.delay_events(), original.delay_events());
    assert_eq!(loaded.calendar(), original.calendar());
    // Stored durations already include the delay; loading must not add it twice.
    assert_eq!(loaded.find_task(2).unwrap().duration_days, 10);
    assert_eq!(loaded.current_outcome(), original.current_outcome());
}

#[test]
fn csv_round_trip_keeps_tasks_and_metadata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("schedule.csv");

    let mut original = sample_schedule();
    save_schedule_to_csv(&original, &path).unwrap();
    let mut loaded = load_schedule_from_csv(&path).unwrap();

    assert_eq!(loaded.metadata(), original.metadata());
    assert_eq!(loaded.tasks(), original.tasks());
    assert_eq!(loaded.calendar(), original.calendar());
    assert!(loaded.delay_events().is_empty());
    assert_eq!(loaded.current_outcome(), original.current_outcome());
}

#[test]
fn csv_without_task_rows_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    let schedule = Schedule::new_with_metadata(ProjectMetadata::new(1, "Empty", d(2024, 1, 1)));
    save_schedule_to_csv(&schedule, &path).unwrap();

    match load_schedule_from_csv(&path) {
        Err(PersistenceError::InvalidData(message)) => {
            assert!(message.contains("no tasks"), "{message}")
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("empty CSV should not load"),
    }
}

#[test]
fn hand_written_csv_recovers_bad_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("manual.csv");
    std::fs::write(
        &path,
        "id,name,duration,dependencies,exposure,material_status\n\
         1,Survey,2,,Outdoor,Not Ordered\n\
         2,Layout,1,\"[1]\",Sideways,lost\n\
         3,Grade,3,\"1, 2\",,\n\
         4,Seed,1,\"1, x\",Indoor,\n",
    )
    .unwrap();

    let mut schedule = load_schedule_from_csv(&path).unwrap();
    assert_eq!(schedule.task_count(), 4);
    assert_eq!(schedule.find_task(2).unwrap().predecessors, vec![1]);
    assert_eq!(schedule.find_task(2).unwrap().exposure, Exposure::Outdoor);
    assert_eq!(schedule.find_task(2).unwrap().material_status, MaterialStatus::NotOrdered);
    assert_eq!(schedule.find_task(3).unwrap().predecessors, vec![1, 2]);
    // An unreadable list drops every dependency rather than guessing
    assert!(schedule.find_task(4).unwrap().predecessors.is_empty());
    assert_eq!(schedule.find_task(4).unwrap().exposure, Exposure::Indoor);

    let outcome = schedule.current_outcome();
    let grade = outcome.get(3).unwrap();
    assert!(grade.early_start >= outcome.get(2).unwrap().early_finish);
}

#[test]
fn csv_with_invalid_task_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    // Missing duration decodes to 0, which storage does not accept
    std::fs::write(&path, "id,name,duration\n1,Survey,2\n2,Layout,\n").unwrap();

    let err = load_schedule_from_csv(&path).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = load_schedule_from_json(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, PersistenceError::Io(_)));
}

#[test]
fn export_writes_one_row_per_task() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("export.csv");
    let mut schedule = sample_schedule();
    export_outcome_to_csv(schedule.current_outcome(), &path).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["id", "name", "phase", "duration", "start_date", "end_date", "is_critical", "variance"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "1");
    assert_eq!(&rows[0][4], "2024-01-01");
    assert_eq!(&rows[0][5], "2024-01-05");
}
