use crate::calendar::WorkCalendar;
use chrono::NaiveDate;

/// Calendar days between the baseline finish and the current finish.
/// Positive means behind baseline; zero when no baseline was captured.
pub fn finish_variance_days(current_finish: NaiveDate, baseline_finish: Option<NaiveDate>) -> i64 {
    baseline_finish
        .map(|baseline| (current_finish - baseline).num_days())
        .unwrap_or(0)
}

/// Same comparison measured in working days of `calendar`.
pub fn working_days_variance(
    calendar: &WorkCalendar,
    current_finish: NaiveDate,
    baseline_finish: Option<NaiveDate>,
) -> i64 {
    let Some(baseline) = baseline_finish else {
        return 0;
    };
    if baseline == current_finish {
        0
    } else if current_finish > baseline {
        calendar.count_working_days(baseline, current_finish) - 1
    } else {
        -(calendar.count_working_days(current_finish, baseline) - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn variance_sign_follows_slip_direction() {
        assert_eq!(finish_variance_days(d(2024, 1, 10), Some(d(2024, 1, 5))), 5);
        assert_eq!(finish_variance_days(d(2024, 1, 3), Some(d(2024, 1, 5))), -2);
        assert_eq!(finish_variance_days(d(2024, 1, 3), None), 0);
    }

    #[test]
    fn working_variance_skips_weekends() {
        let cal = WorkCalendar::default();
        // Fri -> next Mon is one working day late.
        assert_eq!(
            working_days_variance(&cal, d(2024, 1, 8), Some(d(2024, 1, 5))),
            1
        );
        assert_eq!(
            working_days_variance(&cal, d(2024, 1, 5), Some(d(2024, 1, 8))),
            -1
        );
        assert_eq!(working_days_variance(&cal, d(2024, 1, 5), None), 0);
    }
}
