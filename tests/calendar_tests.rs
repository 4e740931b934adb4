use chrono::{Datelike, NaiveDate, Weekday};
use site_schedule::calendar::{WorkCalendar, WorkCalendarConfig};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn default_calendar_excludes_weekends_only() {
    let cal = WorkCalendar::default();
    // 2024-01-06 is a Saturday, 2024-01-07 a Sunday
    assert!(!cal.is_working_day(d(2024, 1, 6)));
    assert!(!cal.is_working_day(d(2024, 1, 7)));
    // New Year's Day is not blocked unless the project says so
    assert!(cal.is_working_day(d(2024, 1, 1)));
}

#[test]
fn five_day_task_from_monday_ends_friday() {
    let cal = WorkCalendar::default();
    let end = cal.add_working_days(d(2024, 1, 1), 5);
    assert_eq!(end, d(2024, 1, 5));
    assert_eq!(end.weekday(), Weekday::Fri);
}

#[test]
fn saturday_start_normalizes_to_monday() {
    let cal = WorkCalendar::default();
    assert_eq!(cal.next_working_day(d(2024, 1, 6)), d(2024, 1, 8));
    assert_eq!(cal.add_working_days(d(2024, 1, 6), 1), d(2024, 1, 8));
}

#[test]
fn blocked_dates_are_skipped() {
    let cal = WorkCalendar::with_blocked_dates([d(2024, 1, 8), d(2024, 1, 9)]);
    // Saturday, Sunday, then two blocked weekdays
    assert_eq!(cal.next_working_day(d(2024, 1, 6)), d(2024, 1, 10));
    // Fri 5th + 2 working days: 5th, then 10th
    assert_eq!(cal.add_working_days(d(2024, 1, 5), 2), d(2024, 1, 10));
}

#[test]
fn zero_duration_occupies_the_normalized_start() {
    let cal = WorkCalendar::default();
    assert_eq!(cal.add_working_days(d(2024, 1, 3), 0), d(2024, 1, 3));
    // Not the identity when the start is not a working day
    assert_eq!(cal.add_working_days(d(2024, 1, 7), 0), d(2024, 1, 8));
}

#[test]
fn range_helpers_agree() {
    let cal = WorkCalendar::with_blocked_dates([d(2024, 1, 3)]);
    let days = cal.working_days_in_range(d(2024, 1, 1), d(2024, 1, 7));
    assert_eq!(days.len() as i64, cal.count_working_days(d(2024, 1, 1), d(2024, 1, 7)));
    assert_eq!(days, vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 4), d(2024, 1, 5)]);
}

#[test]
fn six_day_week_counts_saturdays() {
    let mut cal = WorkCalendar::default();
    cal.set_working_days(vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ]);
    assert!(cal.is_working_day(d(2024, 1, 6)));
    assert_eq!(cal.add_working_days(d(2024, 1, 1), 6), d(2024, 1, 6));
}

#[test]
fn iso_strings_ignore_garbage() {
    let cal = WorkCalendar::from_iso_strings(["2024-01-02", "not-a-date", ""]);
    assert_eq!(cal.blocked_dates(), vec![d(2024, 1, 2)]);
}

#[test]
fn config_round_trip_through_json() {
    let cal = WorkCalendar::with_blocked_dates([d(2024, 12, 25), d(2024, 7, 4)]);
    let json = serde_json::to_string(&cal.to_config()).unwrap();
    let config: WorkCalendarConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config.blocked_dates(), &[d(2024, 7, 4), d(2024, 12, 25)]);
    assert_eq!(WorkCalendar::from_config(&config), cal);
}
